use super::{IsolationLevel, LedgerStore, LedgerTx};
use crate::errors::{LedgerError, Result};
use crate::models::{
    ClientPayments, Contract, ContractStatus, DateRange, Job, PayableJob, Profile,
    ProfessionEarnings, ProfileType,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Postgres, Transaction};
use std::time::Duration;
use tracing::info;

const PROFILE_COLUMNS: &str =
    "id, first_name, last_name, profession, balance, profile_type";
const CONTRACT_COLUMNS: &str = "id, terms, status, client_id, contractor_id";

pub struct PgLedgerStore {
    pool: PgPool,
}

impl PgLedgerStore {
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
        acquire_timeout: Duration,
    ) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(acquire_timeout)
            .connect(database_url)
            .await?;

        Ok(PgLedgerStore { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        PgLedgerStore { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Apply the versioned schema under `migrations/`
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("Database schema is up to date");
        Ok(())
    }
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
    async fn begin(&self, isolation: IsolationLevel) -> Result<Box<dyn LedgerTx>> {
        let mut tx = self.pool.begin().await?;

        // Must be the first statement of the transaction.
        sqlx::query(&format!(
            "SET TRANSACTION ISOLATION LEVEL {}",
            isolation.as_sql()
        ))
        .execute(&mut *tx)
        .await?;

        Ok(Box::new(PgLedgerTx { tx }))
    }
}

pub struct PgLedgerTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl LedgerTx for PgLedgerTx {
    async fn find_profile(&mut self, profile_id: i64) -> Result<Option<Profile>> {
        let profile = sqlx::query_as::<_, Profile>(&format!(
            "SELECT {} FROM profiles WHERE id = $1",
            PROFILE_COLUMNS
        ))
        .bind(profile_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(profile)
    }

    async fn find_contract_for_party(
        &mut self,
        contract_id: i64,
        profile_id: i64,
        profile_type: ProfileType,
    ) -> Result<Option<Contract>> {
        let party_column = match profile_type {
            ProfileType::Client => "client_id",
            ProfileType::Contractor => "contractor_id",
        };

        let contract = sqlx::query_as::<_, Contract>(&format!(
            "SELECT {} FROM contracts WHERE id = $1 AND {} = $2",
            CONTRACT_COLUMNS, party_column
        ))
        .bind(contract_id)
        .bind(profile_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(contract)
    }

    async fn list_active_contracts(&mut self, profile_id: i64) -> Result<Vec<Contract>> {
        let contracts = sqlx::query_as::<_, Contract>(&format!(
            r#"
            SELECT {} FROM contracts
            WHERE (client_id = $1 OR contractor_id = $1) AND status <> $2
            ORDER BY id
            "#,
            CONTRACT_COLUMNS
        ))
        .bind(profile_id)
        .bind(ContractStatus::Terminated)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(contracts)
    }

    async fn list_unpaid_jobs(&mut self, profile_id: i64) -> Result<Vec<Job>> {
        let jobs = sqlx::query_as::<_, Job>(
            r#"
            SELECT j.id, j.description, j.price, j.paid, j.payment_date, j.contract_id
            FROM jobs j
            JOIN contracts c ON c.id = j.contract_id
            WHERE j.paid = FALSE
              AND c.status = $2
              AND (c.client_id = $1 OR c.contractor_id = $1)
            ORDER BY j.id
            "#,
        )
        .bind(profile_id)
        .bind(ContractStatus::InProgress)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(jobs)
    }

    async fn lock_payable_job(
        &mut self,
        job_id: i64,
        client_id: i64,
    ) -> Result<Option<PayableJob>> {
        let row = sqlx::query_as::<
            _,
            (
                i64,
                String,
                Decimal,
                bool,
                Option<DateTime<Utc>>,
                i64,
                i64,
                i64,
                ContractStatus,
            ),
        >(
            r#"
            SELECT j.id, j.description, j.price, j.paid, j.payment_date, j.contract_id,
                   c.client_id, c.contractor_id, c.status
            FROM jobs j
            JOIN contracts c ON c.id = j.contract_id
            WHERE j.id = $1 AND c.client_id = $2
            FOR UPDATE OF j
            "#,
        )
        .bind(job_id)
        .bind(client_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(row.map(
            |(
                id,
                description,
                price,
                paid,
                payment_date,
                contract_id,
                client_id,
                contractor_id,
                contract_status,
            )| PayableJob {
                job: Job {
                    id,
                    description,
                    price,
                    paid,
                    payment_date,
                    contract_id,
                },
                client_id,
                contractor_id,
                contract_status,
            },
        ))
    }

    async fn lock_profiles(&mut self, profile_ids: &[i64]) -> Result<Vec<Profile>> {
        let profiles = sqlx::query_as::<_, Profile>(&format!(
            "SELECT {} FROM profiles WHERE id = ANY($1) ORDER BY id FOR UPDATE",
            PROFILE_COLUMNS
        ))
        .bind(profile_ids)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(profiles)
    }

    async fn apply_balance_delta(&mut self, profile_id: i64, delta: Decimal) -> Result<Decimal> {
        let balance = sqlx::query_scalar::<_, Decimal>(
            r#"
            UPDATE profiles
            SET balance = balance + $1, updated_at = NOW()
            WHERE id = $2
            RETURNING balance
            "#,
        )
        .bind(delta)
        .bind(profile_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        balance.ok_or_else(|| {
            LedgerError::Internal(format!("profile {} disappeared during update", profile_id))
        })
    }

    async fn mark_job_paid(&mut self, job_id: i64, paid_at: DateTime<Utc>) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE jobs
            SET paid = TRUE, payment_date = $1, updated_at = NOW()
            WHERE id = $2 AND paid = FALSE
            "#,
        )
        .bind(paid_at)
        .bind(job_id)
        .execute(&mut *self.tx)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn outstanding_total(&mut self, client_id: i64) -> Result<Decimal> {
        let total = sqlx::query_scalar::<_, Decimal>(
            r#"
            SELECT COALESCE(SUM(j.price), 0)
            FROM jobs j
            JOIN contracts c ON c.id = j.contract_id
            WHERE c.client_id = $1 AND c.status = $2 AND j.paid = FALSE
            "#,
        )
        .bind(client_id)
        .bind(ContractStatus::InProgress)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(total)
    }

    async fn profession_earnings(&mut self, range: DateRange) -> Result<Vec<ProfessionEarnings>> {
        let earnings = sqlx::query_as::<_, ProfessionEarnings>(
            r#"
            SELECT p.profession, SUM(j.price) AS total
            FROM jobs j
            JOIN contracts c ON c.id = j.contract_id
            JOIN profiles p ON p.id = c.contractor_id
            WHERE j.paid = TRUE AND j.payment_date BETWEEN $1 AND $2
            GROUP BY p.profession
            ORDER BY total DESC, p.profession ASC
            "#,
        )
        .bind(range.start)
        .bind(range.end)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(earnings)
    }

    async fn client_payments(&mut self, range: DateRange) -> Result<Vec<ClientPayments>> {
        let payments = sqlx::query_as::<_, ClientPayments>(
            r#"
            SELECT p.id AS client_id, p.first_name, p.last_name, SUM(j.price) AS total_paid
            FROM jobs j
            JOIN contracts c ON c.id = j.contract_id
            JOIN profiles p ON p.id = c.client_id
            WHERE j.paid = TRUE AND j.payment_date BETWEEN $1 AND $2
            GROUP BY p.id, p.first_name, p.last_name
            ORDER BY total_paid DESC, p.id ASC
            "#,
        )
        .bind(range.start)
        .bind(range.end)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(payments)
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}
