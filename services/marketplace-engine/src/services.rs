use crate::database::LedgerStore;
use crate::errors::Result;
use crate::ledger::{
    ContractResolver, DepositEngine, LedgerPolicy, PaymentEngine, ReportingEngine,
};
use crate::models::{
    ActingProfile, ClientRanking, Contract, DateRange, DepositReceipt, Job, PaymentReceipt,
    Profile,
};
use rust_decimal::Decimal;
use std::sync::Arc;

/// Entry point for the request-handling layer: every ledger operation over one store.
pub struct MarketplaceService {
    contracts: ContractResolver,
    payments: PaymentEngine,
    deposits: DepositEngine,
    reports: ReportingEngine,
}

impl MarketplaceService {
    pub fn new(store: Arc<dyn LedgerStore>, policy: LedgerPolicy) -> Self {
        MarketplaceService {
            contracts: ContractResolver::new(store.clone()),
            payments: PaymentEngine::new(store.clone()),
            deposits: DepositEngine::new(store.clone(), policy),
            reports: ReportingEngine::new(store, policy),
        }
    }

    pub async fn authenticate(&self, profile_id: i64) -> Result<Profile> {
        self.contracts.authenticate(profile_id).await
    }

    pub async fn get_contract(&self, contract_id: i64, acting: &ActingProfile) -> Result<Contract> {
        self.contracts.resolve_contract(contract_id, acting).await
    }

    pub async fn list_contracts(&self, acting: &ActingProfile) -> Result<Vec<Contract>> {
        self.contracts.list_contracts(acting).await
    }

    pub async fn list_unpaid_jobs(&self, acting: &ActingProfile) -> Result<Vec<Job>> {
        self.contracts.list_unpaid_jobs(acting).await
    }

    pub async fn pay_job(&self, job_id: i64, acting: &ActingProfile) -> Result<PaymentReceipt> {
        self.payments.pay_job(job_id, acting).await
    }

    pub async fn deposit(&self, client_id: i64, amount: Decimal) -> Result<DepositReceipt> {
        self.deposits.deposit(client_id, amount).await
    }

    pub async fn best_profession(&self, range: DateRange) -> Result<String> {
        self.reports.best_profession(range).await
    }

    pub async fn best_clients(
        &self,
        range: DateRange,
        limit: Option<i64>,
    ) -> Result<Vec<ClientRanking>> {
        self.reports.best_clients(range, limit).await
    }
}
