use super::{has_cent_precision, LedgerPolicy};
use crate::database::{complete, IsolationLevel, LedgerStore, LedgerTx};
use crate::errors::{LedgerError, Result};
use crate::metrics;
use crate::models::DepositReceipt;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Credits client balances, capped by the client's outstanding obligations.
pub struct DepositEngine {
    store: Arc<dyn LedgerStore>,
    policy: LedgerPolicy,
}

impl DepositEngine {
    pub fn new(store: Arc<dyn LedgerStore>, policy: LedgerPolicy) -> Self {
        DepositEngine { store, policy }
    }

    /// Deposit `amount` into the balance of client `client_id`.
    ///
    /// The client row is locked before the outstanding total is summed, so a
    /// concurrent payment by the same client cannot change the total between
    /// the cap check and the credit.
    pub async fn deposit(&self, client_id: i64, amount: Decimal) -> Result<DepositReceipt> {
        if amount <= Decimal::ZERO || !has_cent_precision(amount) {
            metrics::record_rejection("deposit", "invalid_amount");
            warn!("Deposit of {} to profile {} rejected: invalid amount", amount, client_id);
            return Err(LedgerError::InvalidAmount(amount));
        }

        let mut tx = self.store.begin(IsolationLevel::ReadCommitted).await?;
        let outcome = self.credit(tx.as_mut(), client_id, amount).await;
        let outcome = complete(tx, outcome).await;

        match &outcome {
            Ok(receipt) => {
                metrics::DEPOSITS.inc();
                info!(
                    "Deposited {} to client {}, balance now {}",
                    amount, client_id, receipt.new_balance
                );
            }
            Err(err) if err.is_domain() => {
                metrics::record_rejection("deposit", err.error_type());
                warn!("Deposit of {} to profile {} rejected: {}", amount, client_id, err);
            }
            Err(err) => {
                error!("Deposit of {} to profile {} failed: {}", amount, client_id, err);
            }
        }

        outcome
    }

    /// Largest deposit accepted against the given outstanding total
    pub fn deposit_limit(&self, outstanding: Decimal) -> Decimal {
        outstanding * self.policy.deposit_cap_ratio
    }

    async fn credit(
        &self,
        tx: &mut dyn LedgerTx,
        client_id: i64,
        amount: Decimal,
    ) -> Result<DepositReceipt> {
        let client = tx.lock_profiles(&[client_id]).await?.into_iter().next();
        if !client.as_ref().map_or(false, |profile| profile.is_client()) {
            return Err(LedgerError::NotAClient(client_id));
        }

        let outstanding = tx.outstanding_total(client_id).await?;
        let limit = self.deposit_limit(outstanding);

        // With nothing outstanding the limit is zero and every deposit is refused.
        if amount > limit {
            return Err(LedgerError::DepositLimitExceeded { amount, limit });
        }

        let new_balance = tx.apply_balance_delta(client_id, amount).await?;

        Ok(DepositReceipt {
            client_id,
            amount,
            new_balance,
        })
    }
}
