// Runs against a live database: DATABASE_URL=postgres://... cargo test -- --ignored

use marketplace_engine::{
    database::{IsolationLevel, LedgerStore, PgLedgerStore},
    ledger::LedgerPolicy,
    models::{ActingProfile, ProfileType},
    services::MarketplaceService,
    LedgerError,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Duration;

async fn connect() -> PgLedgerStore {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let store = PgLedgerStore::new(&url, 5, 1, Duration::from_secs(5))
        .await
        .expect("Failed to connect to database");
    store.migrate().await.expect("Failed to run migrations");
    store
}

async fn insert_profile(store: &PgLedgerStore, profile_type: ProfileType, balance: Decimal) -> i64 {
    sqlx::query_scalar(
        "INSERT INTO profiles (first_name, last_name, profession, balance, profile_type)
         VALUES ('Test', 'Profile', 'Tester', $1, $2)
         RETURNING id",
    )
    .bind(balance)
    .bind(profile_type)
    .fetch_one(store.pool())
    .await
    .unwrap()
}

/// Client with `balance`, a contractor, and one unpaid job priced `price`.
async fn seed(store: &PgLedgerStore, balance: Decimal, price: Decimal) -> (i64, i64, i64) {
    let client_id = insert_profile(store, ProfileType::Client, balance).await;
    let contractor_id = insert_profile(store, ProfileType::Contractor, dec!(0.00)).await;

    let contract_id: i64 = sqlx::query_scalar(
        "INSERT INTO contracts (terms, status, client_id, contractor_id)
         VALUES ('terms', 'in_progress', $1, $2)
         RETURNING id",
    )
    .bind(client_id)
    .bind(contractor_id)
    .fetch_one(store.pool())
    .await
    .unwrap();

    let job_id: i64 = sqlx::query_scalar(
        "INSERT INTO jobs (description, price, paid, contract_id)
         VALUES ('work', $1, FALSE, $2)
         RETURNING id",
    )
    .bind(price)
    .bind(contract_id)
    .fetch_one(store.pool())
    .await
    .unwrap();

    (client_id, contractor_id, job_id)
}

async fn balance(store: &PgLedgerStore, profile_id: i64) -> Decimal {
    let mut tx = store.begin(IsolationLevel::ReadCommitted).await.unwrap();
    let profile = tx.find_profile(profile_id).await.unwrap().unwrap();
    tx.commit().await.unwrap();
    profile.balance
}

#[tokio::test]
#[ignore]
async fn test_concurrent_payments_debit_once() {
    let store = Arc::new(connect().await);
    let (client_id, contractor_id, job_id) = seed(&store, dec!(500.00), dec!(120.00)).await;
    let service = Arc::new(MarketplaceService::new(store.clone(), LedgerPolicy::default()));
    let acting = ActingProfile {
        id: client_id,
        profile_type: ProfileType::Client,
    };

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let service = service.clone();
            tokio::spawn(async move { service.pay_job(job_id, &acting).await })
        })
        .collect();

    let mut successes = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => successes += 1,
            Err(LedgerError::AlreadyPaid(id)) => assert_eq!(id, job_id),
            Err(err) => panic!("unexpected error: {}", err),
        }
    }

    assert_eq!(successes, 1);
    assert_eq!(balance(&store, client_id).await, dec!(380.00));
    assert_eq!(balance(&store, contractor_id).await, dec!(120.00));
}

#[tokio::test]
#[ignore]
async fn test_deposit_cap_against_outstanding_jobs() {
    let store = Arc::new(connect().await);
    let (client_id, _, _) = seed(&store, dec!(10.00), dec!(400.00)).await;
    let service = MarketplaceService::new(store.clone(), LedgerPolicy::default());

    assert!(matches!(
        service.deposit(client_id, dec!(100.01)).await,
        Err(LedgerError::DepositLimitExceeded { .. })
    ));

    let receipt = service.deposit(client_id, dec!(100.00)).await.unwrap();
    assert_eq!(receipt.new_balance, dec!(110.00));
    assert_eq!(balance(&store, client_id).await, dec!(110.00));
}
