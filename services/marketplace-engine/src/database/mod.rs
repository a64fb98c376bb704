//! Ledger store: transactional access to profiles, contracts and jobs.
//!
//! Every ledger operation opens exactly one [`LedgerTx`], performs all of its
//! reads and writes through it, and finishes with [`complete`]. No state is
//! cached between transactions.

pub mod fixtures;
pub mod memory;
pub mod postgres;

use crate::errors::Result;
use crate::models::{
    ClientPayments, Contract, DateRange, Job, PayableJob, Profile, ProfessionEarnings,
    ProfileType,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::error;

pub use memory::MemoryLedgerStore;
pub use postgres::PgLedgerStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IsolationLevel {
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

impl IsolationLevel {
    pub fn as_sql(&self) -> &'static str {
        match self {
            IsolationLevel::ReadCommitted => "READ COMMITTED",
            IsolationLevel::RepeatableRead => "REPEATABLE READ",
            IsolationLevel::Serializable => "SERIALIZABLE",
        }
    }
}

#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn begin(&self, isolation: IsolationLevel) -> Result<Box<dyn LedgerTx>>;
}

/// One open store transaction. Dropping it without `commit` rolls it back.
#[async_trait]
pub trait LedgerTx: Send {
    async fn find_profile(&mut self, profile_id: i64) -> Result<Option<Profile>>;

    /// Contract `contract_id` where the profile sits on the side named by `profile_type`.
    async fn find_contract_for_party(
        &mut self,
        contract_id: i64,
        profile_id: i64,
        profile_type: ProfileType,
    ) -> Result<Option<Contract>>;

    /// Non-terminated contracts where the profile is client or contractor.
    async fn list_active_contracts(&mut self, profile_id: i64) -> Result<Vec<Contract>>;

    /// Unpaid jobs of in-progress contracts where the profile is either party.
    async fn list_unpaid_jobs(&mut self, profile_id: i64) -> Result<Vec<Job>>;

    /// Locks job `job_id` if its contract belongs to `client_id`.
    async fn lock_payable_job(&mut self, job_id: i64, client_id: i64)
        -> Result<Option<PayableJob>>;

    /// Locks the given profiles in ascending id order and returns them in that order.
    async fn lock_profiles(&mut self, profile_ids: &[i64]) -> Result<Vec<Profile>>;

    /// Adds `delta` to the profile balance and returns the new balance.
    async fn apply_balance_delta(&mut self, profile_id: i64, delta: Decimal) -> Result<Decimal>;

    /// Marks an unpaid job paid. Returns false when the job was already paid.
    async fn mark_job_paid(&mut self, job_id: i64, paid_at: DateTime<Utc>) -> Result<bool>;

    /// Sum of unpaid job prices across the client's in-progress contracts.
    async fn outstanding_total(&mut self, client_id: i64) -> Result<Decimal>;

    async fn profession_earnings(&mut self, range: DateRange) -> Result<Vec<ProfessionEarnings>>;

    async fn client_payments(&mut self, range: DateRange) -> Result<Vec<ClientPayments>>;

    async fn commit(self: Box<Self>) -> Result<()>;

    async fn rollback(self: Box<Self>) -> Result<()>;
}

/// Commits on success and rolls back on failure.
///
/// A failed rollback is logged and the original error is returned, since the
/// store discards an unfinished transaction on its own.
pub async fn complete<T>(tx: Box<dyn LedgerTx>, outcome: Result<T>) -> Result<T> {
    match outcome {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                error!("Rollback failed after {}: {}", err, rollback_err);
            }
            Err(err)
        }
    }
}
