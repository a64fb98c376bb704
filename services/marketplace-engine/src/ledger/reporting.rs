use super::LedgerPolicy;
use crate::database::{complete, IsolationLevel, LedgerStore};
use crate::errors::{LedgerError, Result};
use crate::metrics;
use crate::models::{ClientPayments, ClientRanking, DateRange, ProfessionEarnings};
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::debug;

pub const NO_DATA_AVAILABLE: &str = "No data available.";

/// Aggregates over paid jobs within a closed payment-date window.
///
/// Ties are broken deterministically: professions by name, clients by id,
/// both ascending.
pub struct ReportingEngine {
    store: Arc<dyn LedgerStore>,
    policy: LedgerPolicy,
}

impl ReportingEngine {
    pub fn new(store: Arc<dyn LedgerStore>, policy: LedgerPolicy) -> Self {
        ReportingEngine { store, policy }
    }

    /// Contractor profession that earned the most in `range`
    pub async fn best_profession(&self, range: DateRange) -> Result<String> {
        metrics::REPORT_QUERIES.with_label_values(&["best_profession"]).inc();

        let mut tx = self.store.begin(IsolationLevel::ReadCommitted).await?;
        let outcome = tx.profession_earnings(range).await;
        let earnings = complete(tx, outcome).await?;

        debug!("{} professions earned between {} and {}", earnings.len(), range.start, range.end);

        Ok(rank_professions(earnings)
            .into_iter()
            .next()
            .map(|best| best.profession)
            .unwrap_or_else(|| NO_DATA_AVAILABLE.to_string()))
    }

    /// Clients that paid the most in `range`, at most `limit` of them
    pub async fn best_clients(
        &self,
        range: DateRange,
        limit: Option<i64>,
    ) -> Result<Vec<ClientRanking>> {
        let limit = limit.unwrap_or(self.policy.best_clients_default_limit);
        if limit < 1 {
            metrics::record_rejection("best_clients", "invalid_limit");
            return Err(LedgerError::InvalidLimit(limit));
        }

        metrics::REPORT_QUERIES.with_label_values(&["best_clients"]).inc();

        let mut tx = self.store.begin(IsolationLevel::ReadCommitted).await?;
        let outcome = tx.client_payments(range).await;
        let payments = complete(tx, outcome).await?;

        let take = usize::try_from(limit).unwrap_or(usize::MAX);
        Ok(rank_clients(payments)
            .into_iter()
            .take(take)
            .map(ClientRanking::from)
            .collect())
    }
}

fn rank_professions(mut earnings: Vec<ProfessionEarnings>) -> Vec<ProfessionEarnings> {
    earnings.sort_by(|a, b| match b.total.cmp(&a.total) {
        Ordering::Equal => a.profession.cmp(&b.profession),
        other => other,
    });
    earnings
}

fn rank_clients(mut payments: Vec<ClientPayments>) -> Vec<ClientPayments> {
    payments.sort_by(|a, b| match b.total_paid.cmp(&a.total_paid) {
        Ordering::Equal => a.client_id.cmp(&b.client_id),
        other => other,
    });
    payments
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::fixtures::demo_store;
    use crate::database::MemoryLedgerStore;
    use crate::models::{Contract, ContractStatus, Job, Profile, ProfileType};
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn august_2020() -> DateRange {
        DateRange::new(
            Utc.with_ymd_and_hms(2020, 8, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2020, 8, 31, 23, 59, 59).unwrap(),
        )
        .unwrap()
    }

    async fn engine() -> ReportingEngine {
        let store = demo_store().await.unwrap();
        ReportingEngine::new(Arc::new(store), LedgerPolicy::default())
    }

    #[tokio::test]
    async fn test_best_profession() {
        let engine = engine().await;
        assert_eq!(engine.best_profession(august_2020()).await.unwrap(), "Programmer");
    }

    #[tokio::test]
    async fn test_best_profession_without_paid_jobs() {
        let engine = engine().await;
        let range = DateRange::new(
            Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2021, 12, 31, 0, 0, 0).unwrap(),
        )
        .unwrap();

        assert_eq!(engine.best_profession(range).await.unwrap(), NO_DATA_AVAILABLE);
    }

    #[tokio::test]
    async fn test_best_profession_tie_breaks_by_name() {
        let engine = engine().await;

        // On 2020-08-17 a Musician and a Fighter each earned 200.00.
        let range = DateRange::new(
            Utc.with_ymd_and_hms(2020, 8, 17, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2020, 8, 17, 23, 59, 59).unwrap(),
        )
        .unwrap();

        assert_eq!(engine.best_profession(range).await.unwrap(), "Fighter");
    }

    #[tokio::test]
    async fn test_window_bounds_are_inclusive() {
        let engine = engine().await;
        let instant = Utc.with_ymd_and_hms(2020, 8, 10, 19, 11, 26).unwrap();

        // Only job 11 (Musician, 21.00) was paid at this exact instant.
        let range = DateRange::new(instant, instant).unwrap();
        assert_eq!(engine.best_profession(range).await.unwrap(), "Musician");
    }

    #[tokio::test]
    async fn test_best_clients_default_limit_and_ties() {
        let engine = engine().await;

        let clients = engine.best_clients(august_2020(), None).await.unwrap();

        // Clients 1 and 2 both paid 442.00; the lower id wins the second slot.
        assert_eq!(
            clients,
            vec![
                ClientRanking {
                    id: 4,
                    full_name: "Ash Kethcum".to_string(),
                    total_paid: dec!(2020.00),
                },
                ClientRanking {
                    id: 1,
                    full_name: "Harry Potter".to_string(),
                    total_paid: dec!(442.00),
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_best_clients_limit_larger_than_data() {
        let engine = engine().await;

        let clients = engine.best_clients(august_2020(), Some(10)).await.unwrap();
        let ids: Vec<i64> = clients.iter().map(|c| c.id).collect();

        assert_eq!(ids, vec![4, 1, 2, 3]);
    }

    #[tokio::test]
    async fn test_best_clients_rejects_non_positive_limit() {
        let engine = engine().await;

        assert!(matches!(
            engine.best_clients(august_2020(), Some(0)).await,
            Err(LedgerError::InvalidLimit(0))
        ));
        assert!(matches!(
            engine.best_clients(august_2020(), Some(-3)).await,
            Err(LedgerError::InvalidLimit(-3))
        ));
    }

    #[tokio::test]
    async fn test_best_clients_single_winner() {
        let store = MemoryLedgerStore::new();
        let paid_at = Utc.with_ymd_and_hms(2023, 3, 1, 12, 0, 0).unwrap();

        for (id, first_name, profile_type) in [
            (1, "Anna", ProfileType::Client),
            (2, "Boris", ProfileType::Client),
            (3, "Carl", ProfileType::Contractor),
        ] {
            store
                .insert_profile(Profile {
                    id,
                    first_name: first_name.to_string(),
                    last_name: "Test".to_string(),
                    profession: "Builder".to_string(),
                    balance: Decimal::ZERO,
                    profile_type,
                })
                .await
                .unwrap();
        }

        for (contract_id, client_id, price) in [(1, 1, dec!(500.00)), (2, 2, dec!(300.00))] {
            store
                .insert_contract(Contract {
                    id: contract_id,
                    terms: "terms".to_string(),
                    status: ContractStatus::InProgress,
                    client_id,
                    contractor_id: 3,
                })
                .await
                .unwrap();
            store
                .insert_job(Job {
                    id: contract_id,
                    description: "work".to_string(),
                    price,
                    paid: true,
                    payment_date: Some(paid_at),
                    contract_id,
                })
                .await
                .unwrap();
        }

        let engine = ReportingEngine::new(Arc::new(store), LedgerPolicy::default());
        let range = DateRange::new(paid_at, paid_at).unwrap();
        let clients = engine.best_clients(range, Some(1)).await.unwrap();

        assert_eq!(
            clients,
            vec![ClientRanking {
                id: 1,
                full_name: "Anna Test".to_string(),
                total_paid: dec!(500.00),
            }]
        );
    }
}
