//! In-process ledger store.
//!
//! A transaction holds the store lock from `begin` until it is committed or
//! dropped, so transactions are fully serialized. Writes go to a working copy
//! that replaces the shared state only on commit.

use super::{IsolationLevel, LedgerStore, LedgerTx};
use crate::errors::{LedgerError, Result};
use crate::models::{
    ClientPayments, Contract, ContractStatus, DateRange, Job, PayableJob, Profile,
    ProfessionEarnings, ProfileType,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Full copy of the stored relations
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LedgerSnapshot {
    pub profiles: BTreeMap<i64, Profile>,
    pub contracts: BTreeMap<i64, Contract>,
    pub jobs: BTreeMap<i64, Job>,
}

impl LedgerSnapshot {
    pub fn total_balance(&self) -> Decimal {
        self.profiles.values().map(|p| p.balance).sum()
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryLedgerStore {
    state: Arc<Mutex<LedgerSnapshot>>,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn snapshot(&self) -> LedgerSnapshot {
        self.state.lock().await.clone()
    }

    pub async fn insert_profile(&self, profile: Profile) -> Result<()> {
        if profile.balance < Decimal::ZERO {
            return Err(LedgerError::InvalidAmount(profile.balance));
        }

        let mut state = self.state.lock().await;
        if state.profiles.contains_key(&profile.id) {
            return Err(LedgerError::Internal(format!(
                "profile {} already exists",
                profile.id
            )));
        }

        state.profiles.insert(profile.id, profile);
        Ok(())
    }

    pub async fn insert_contract(&self, contract: Contract) -> Result<()> {
        let mut state = self.state.lock().await;

        if contract.client_id == contract.contractor_id {
            return Err(LedgerError::Internal(format!(
                "contract {} names profile {} on both sides",
                contract.id, contract.client_id
            )));
        }

        let client_type = state.profiles.get(&contract.client_id).map(|p| p.profile_type);
        let contractor_type = state
            .profiles
            .get(&contract.contractor_id)
            .map(|p| p.profile_type);

        if client_type != Some(ProfileType::Client)
            || contractor_type != Some(ProfileType::Contractor)
        {
            return Err(LedgerError::Internal(format!(
                "contract {} must link a client to a contractor",
                contract.id
            )));
        }

        if state.contracts.contains_key(&contract.id) {
            return Err(LedgerError::Internal(format!(
                "contract {} already exists",
                contract.id
            )));
        }

        state.contracts.insert(contract.id, contract);
        Ok(())
    }

    /// Paid jobs may be loaded as history, as long as `paid` and `payment_date` agree.
    pub async fn insert_job(&self, job: Job) -> Result<()> {
        if job.price <= Decimal::ZERO {
            return Err(LedgerError::InvalidAmount(job.price));
        }

        if job.paid != job.payment_date.is_some() {
            return Err(LedgerError::Internal(format!(
                "job {} has inconsistent payment state",
                job.id
            )));
        }

        let mut state = self.state.lock().await;
        if !state.contracts.contains_key(&job.contract_id) {
            return Err(LedgerError::ContractNotFound(job.contract_id));
        }

        if state.jobs.contains_key(&job.id) {
            return Err(LedgerError::Internal(format!("job {} already exists", job.id)));
        }

        state.jobs.insert(job.id, job);
        Ok(())
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    async fn begin(&self, _isolation: IsolationLevel) -> Result<Box<dyn LedgerTx>> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();

        Ok(Box::new(MemoryLedgerTx { guard, working }))
    }
}

pub struct MemoryLedgerTx {
    guard: OwnedMutexGuard<LedgerSnapshot>,
    working: LedgerSnapshot,
}

impl MemoryLedgerTx {
    fn paid_in_range<'a>(&'a self, range: DateRange) -> impl Iterator<Item = (&'a Job, &'a Contract)> {
        self.working.jobs.values().filter_map(move |job| {
            let paid_at = job.payment_date?;
            if !job.paid || !range.contains(paid_at) {
                return None;
            }
            self.working
                .contracts
                .get(&job.contract_id)
                .map(|contract| (job, contract))
        })
    }
}

#[async_trait]
impl LedgerTx for MemoryLedgerTx {
    async fn find_profile(&mut self, profile_id: i64) -> Result<Option<Profile>> {
        Ok(self.working.profiles.get(&profile_id).cloned())
    }

    async fn find_contract_for_party(
        &mut self,
        contract_id: i64,
        profile_id: i64,
        profile_type: ProfileType,
    ) -> Result<Option<Contract>> {
        Ok(self
            .working
            .contracts
            .get(&contract_id)
            .filter(|contract| match profile_type {
                ProfileType::Client => contract.client_id == profile_id,
                ProfileType::Contractor => contract.contractor_id == profile_id,
            })
            .cloned())
    }

    async fn list_active_contracts(&mut self, profile_id: i64) -> Result<Vec<Contract>> {
        Ok(self
            .working
            .contracts
            .values()
            .filter(|contract| contract.is_party(profile_id) && contract.is_active())
            .cloned()
            .collect())
    }

    async fn list_unpaid_jobs(&mut self, profile_id: i64) -> Result<Vec<Job>> {
        let contracts = &self.working.contracts;

        Ok(self
            .working
            .jobs
            .values()
            .filter(|job| !job.paid)
            .filter(|job| {
                contracts.get(&job.contract_id).map_or(false, |contract| {
                    contract.status == ContractStatus::InProgress && contract.is_party(profile_id)
                })
            })
            .cloned()
            .collect())
    }

    async fn lock_payable_job(
        &mut self,
        job_id: i64,
        client_id: i64,
    ) -> Result<Option<PayableJob>> {
        let Some(job) = self.working.jobs.get(&job_id) else {
            return Ok(None);
        };

        Ok(self
            .working
            .contracts
            .get(&job.contract_id)
            .filter(|contract| contract.client_id == client_id)
            .map(|contract| PayableJob {
                job: job.clone(),
                client_id: contract.client_id,
                contractor_id: contract.contractor_id,
                contract_status: contract.status,
            }))
    }

    async fn lock_profiles(&mut self, profile_ids: &[i64]) -> Result<Vec<Profile>> {
        let mut ids = profile_ids.to_vec();
        ids.sort_unstable();
        ids.dedup();

        Ok(ids
            .iter()
            .filter_map(|id| self.working.profiles.get(id).cloned())
            .collect())
    }

    async fn apply_balance_delta(&mut self, profile_id: i64, delta: Decimal) -> Result<Decimal> {
        let profile = self.working.profiles.get_mut(&profile_id).ok_or_else(|| {
            LedgerError::Internal(format!("profile {} disappeared during update", profile_id))
        })?;

        let balance = profile.balance + delta;
        if balance < Decimal::ZERO {
            // Mirrors the CHECK (balance >= 0) constraint of the relational schema.
            return Err(LedgerError::Internal(format!(
                "balance of profile {} would become negative",
                profile_id
            )));
        }

        profile.balance = balance;
        Ok(balance)
    }

    async fn mark_job_paid(&mut self, job_id: i64, paid_at: DateTime<Utc>) -> Result<bool> {
        match self.working.jobs.get_mut(&job_id) {
            Some(job) if !job.paid => {
                job.paid = true;
                job.payment_date = Some(paid_at);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn outstanding_total(&mut self, client_id: i64) -> Result<Decimal> {
        let contracts = &self.working.contracts;

        Ok(self
            .working
            .jobs
            .values()
            .filter(|job| !job.paid)
            .filter(|job| {
                contracts.get(&job.contract_id).map_or(false, |contract| {
                    contract.client_id == client_id && contract.status == ContractStatus::InProgress
                })
            })
            .map(|job| job.price)
            .sum())
    }

    async fn profession_earnings(&mut self, range: DateRange) -> Result<Vec<ProfessionEarnings>> {
        let mut totals: BTreeMap<String, Decimal> = BTreeMap::new();

        for (job, contract) in self.paid_in_range(range) {
            if let Some(contractor) = self.working.profiles.get(&contract.contractor_id) {
                *totals.entry(contractor.profession.clone()).or_default() += job.price;
            }
        }

        Ok(totals
            .into_iter()
            .map(|(profession, total)| ProfessionEarnings { profession, total })
            .collect())
    }

    async fn client_payments(&mut self, range: DateRange) -> Result<Vec<ClientPayments>> {
        let mut totals: BTreeMap<i64, Decimal> = BTreeMap::new();

        for (job, contract) in self.paid_in_range(range) {
            *totals.entry(contract.client_id).or_default() += job.price;
        }

        Ok(totals
            .into_iter()
            .filter_map(|(client_id, total_paid)| {
                self.working
                    .profiles
                    .get(&client_id)
                    .map(|client| ClientPayments {
                        client_id,
                        first_name: client.first_name.clone(),
                        last_name: client.last_name.clone(),
                        total_paid,
                    })
            })
            .collect())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let MemoryLedgerTx { mut guard, working } = *self;
        *guard = working;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}
