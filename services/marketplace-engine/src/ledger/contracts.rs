use crate::database::{complete, IsolationLevel, LedgerStore};
use crate::errors::{LedgerError, Result};
use crate::models::{ActingProfile, Contract, Job, Profile};
use std::sync::Arc;
use tracing::debug;

/// Read access to contracts and jobs, restricted to the parties of each contract.
///
/// A contract or job the caller is not party to is reported exactly like one
/// that does not exist.
pub struct ContractResolver {
    store: Arc<dyn LedgerStore>,
}

impl ContractResolver {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        ContractResolver { store }
    }

    /// Resolve the calling profile from its id
    pub async fn authenticate(&self, profile_id: i64) -> Result<Profile> {
        let mut tx = self.store.begin(IsolationLevel::ReadCommitted).await?;
        let outcome = tx
            .find_profile(profile_id)
            .await
            .and_then(|profile| profile.ok_or(LedgerError::Unauthorized));

        complete(tx, outcome).await
    }

    /// Contract by id, if the acting profile sits on the side its type names
    pub async fn resolve_contract(
        &self,
        contract_id: i64,
        acting: &ActingProfile,
    ) -> Result<Contract> {
        let mut tx = self.store.begin(IsolationLevel::ReadCommitted).await?;
        let outcome = tx
            .find_contract_for_party(contract_id, acting.id, acting.profile_type)
            .await
            .and_then(|contract| contract.ok_or(LedgerError::ContractNotFound(contract_id)));

        if outcome.is_err() {
            debug!(
                "Contract {} not resolved for profile {}",
                contract_id, acting.id
            );
        }

        complete(tx, outcome).await
    }

    /// Non-terminated contracts of the acting profile
    pub async fn list_contracts(&self, acting: &ActingProfile) -> Result<Vec<Contract>> {
        let mut tx = self.store.begin(IsolationLevel::ReadCommitted).await?;
        let outcome = tx.list_active_contracts(acting.id).await;

        complete(tx, outcome).await
    }

    /// Unpaid jobs of the acting profile's in-progress contracts
    pub async fn list_unpaid_jobs(&self, acting: &ActingProfile) -> Result<Vec<Job>> {
        let mut tx = self.store.begin(IsolationLevel::ReadCommitted).await?;
        let outcome = tx.list_unpaid_jobs(acting.id).await;

        complete(tx, outcome).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::fixtures::demo_store;
    use crate::models::{ContractStatus, ProfileType};

    async fn resolver() -> ContractResolver {
        ContractResolver::new(Arc::new(demo_store().await.unwrap()))
    }

    fn acting(id: i64, profile_type: ProfileType) -> ActingProfile {
        ActingProfile { id, profile_type }
    }

    #[tokio::test]
    async fn test_client_resolves_own_contract() {
        let resolver = resolver().await;

        let contract = resolver
            .resolve_contract(2, &acting(1, ProfileType::Client))
            .await
            .unwrap();

        assert_eq!(contract.id, 2);
        assert_eq!(contract.client_id, 1);
        assert_eq!(contract.contractor_id, 6);
    }

    #[tokio::test]
    async fn test_contractor_resolves_own_contract() {
        let resolver = resolver().await;

        let contract = resolver
            .resolve_contract(3, &acting(6, ProfileType::Contractor))
            .await
            .unwrap();

        assert_eq!(contract.client_id, 2);
    }

    #[tokio::test]
    async fn test_foreign_contract_looks_like_missing_contract() {
        let resolver = resolver().await;

        // Contractor 7 is not a party to contract 2.
        let foreign = resolver
            .resolve_contract(2, &acting(7, ProfileType::Contractor))
            .await
            .unwrap_err();
        let missing = resolver
            .resolve_contract(999, &acting(7, ProfileType::Contractor))
            .await
            .unwrap_err();

        assert!(matches!(foreign, LedgerError::ContractNotFound(2)));
        assert!(matches!(missing, LedgerError::ContractNotFound(999)));
        assert_eq!(foreign.error_type(), missing.error_type());
    }

    #[tokio::test]
    async fn test_side_follows_profile_type() {
        let resolver = resolver().await;

        // Profile 1 is the client of contract 2, not its contractor.
        let result = resolver
            .resolve_contract(2, &acting(1, ProfileType::Contractor))
            .await;

        assert!(matches!(result, Err(LedgerError::ContractNotFound(2))));
    }

    #[tokio::test]
    async fn test_list_contracts_excludes_terminated() {
        let resolver = resolver().await;

        let contracts = resolver
            .list_contracts(&acting(1, ProfileType::Client))
            .await
            .unwrap();

        let ids: Vec<i64> = contracts.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![2]);
        assert!(contracts.iter().all(|c| c.status != ContractStatus::Terminated));
    }

    #[tokio::test]
    async fn test_list_contracts_for_contractor() {
        let resolver = resolver().await;

        let mut ids: Vec<i64> = resolver
            .list_contracts(&acting(7, ProfileType::Contractor))
            .await
            .unwrap()
            .iter()
            .map(|c| c.id)
            .collect();
        ids.sort_unstable();

        assert_eq!(ids, vec![4, 6, 7]);
    }

    #[tokio::test]
    async fn test_unpaid_jobs_only_from_in_progress_contracts() {
        let resolver = resolver().await;

        // Job 1 sits in terminated contract 1 and is excluded.
        let jobs = resolver
            .list_unpaid_jobs(&acting(1, ProfileType::Client))
            .await
            .unwrap();

        let ids: Vec<i64> = jobs.iter().map(|j| j.id).collect();
        assert_eq!(ids, vec![2]);
        assert!(jobs.iter().all(|j| !j.paid && j.payment_date.is_none()));
    }

    #[tokio::test]
    async fn test_authenticate_unknown_profile() {
        let resolver = resolver().await;

        assert!(matches!(
            resolver.authenticate(42).await,
            Err(LedgerError::Unauthorized)
        ));
        assert_eq!(resolver.authenticate(6).await.unwrap().profession, "Programmer");
    }
}
