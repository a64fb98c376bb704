use crate::database::{complete, IsolationLevel, LedgerStore, LedgerTx};
use crate::errors::{LedgerError, Result};
use crate::metrics;
use crate::models::{ActingProfile, ContractStatus, PaymentReceipt, ProfileType};
use chrono::Utc;
use rust_decimal::prelude::ToPrimitive;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Pays jobs by moving the job price from the client to the contractor.
pub struct PaymentEngine {
    store: Arc<dyn LedgerStore>,
}

impl PaymentEngine {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        PaymentEngine { store }
    }

    /// Pay job `job_id` on behalf of the acting client.
    ///
    /// The job row and both profile rows are locked for the whole transaction,
    /// so concurrent payments of one job serialize and all but the first see it
    /// as already paid.
    pub async fn pay_job(&self, job_id: i64, acting: &ActingProfile) -> Result<PaymentReceipt> {
        let mut tx = self.store.begin(IsolationLevel::ReadCommitted).await?;
        let outcome = Self::transfer(tx.as_mut(), job_id, acting).await;
        let outcome = complete(tx, outcome).await;

        match &outcome {
            Ok(receipt) => {
                metrics::JOBS_PAID.inc();
                if let Some(amount) = receipt.amount.to_f64() {
                    metrics::PAYMENT_VOLUME.observe(amount);
                }
                info!(
                    "Job {} paid: {} moved from client {} to contractor {}",
                    job_id, receipt.amount, receipt.client_id, receipt.contractor_id
                );
            }
            Err(err) if err.is_domain() => {
                metrics::record_rejection("pay_job", err.error_type());
                warn!("Payment of job {} by profile {} rejected: {}", job_id, acting.id, err);
            }
            Err(err) => {
                error!("Payment of job {} failed: {}", job_id, err);
            }
        }

        outcome
    }

    async fn transfer(
        tx: &mut dyn LedgerTx,
        job_id: i64,
        acting: &ActingProfile,
    ) -> Result<PaymentReceipt> {
        // Only clients pay; anyone else simply has no payable job with this id.
        if acting.profile_type != ProfileType::Client {
            return Err(LedgerError::JobNotFound(job_id));
        }

        let payable = tx
            .lock_payable_job(job_id, acting.id)
            .await?
            .filter(|payable| payable.contract_status != ContractStatus::Terminated)
            .ok_or(LedgerError::JobNotFound(job_id))?;

        if payable.job.paid {
            return Err(LedgerError::AlreadyPaid(job_id));
        }

        let price = payable.job.price;
        let profiles = tx
            .lock_profiles(&[payable.client_id, payable.contractor_id])
            .await?;

        let client = profiles
            .iter()
            .find(|profile| profile.id == payable.client_id)
            .ok_or_else(|| {
                LedgerError::Internal(format!("client {} of job {} is missing", payable.client_id, job_id))
            })?;

        if !profiles.iter().any(|profile| profile.id == payable.contractor_id) {
            return Err(LedgerError::Internal(format!(
                "contractor {} of job {} is missing",
                payable.contractor_id, job_id
            )));
        }

        // Balance as read under the row lock, never the caller's copy.
        if client.balance < price {
            return Err(LedgerError::InsufficientBalance {
                required: price,
                available: client.balance,
            });
        }

        tx.apply_balance_delta(payable.client_id, -price).await?;
        tx.apply_balance_delta(payable.contractor_id, price).await?;

        let paid_at = Utc::now();
        if !tx.mark_job_paid(job_id, paid_at).await? {
            return Err(LedgerError::AlreadyPaid(job_id));
        }

        Ok(PaymentReceipt {
            job_id,
            paid: true,
            amount: price,
            client_id: payable.client_id,
            contractor_id: payable.contractor_id,
            paid_at,
        })
    }
}
