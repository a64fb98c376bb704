use crate::errors::{LedgerError, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Profile type enumeration, fixed at provisioning
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "profile_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ProfileType {
    Client,
    Contractor,
}

/// Contract status enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "contract_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ContractStatus {
    New,
    InProgress,
    Terminated,
}

/// Market participant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub profession: String,
    pub balance: Decimal,
    #[serde(rename = "type")]
    pub profile_type: ProfileType,
}

impl Profile {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn is_client(&self) -> bool {
        self.profile_type == ProfileType::Client
    }

    pub fn acting(&self) -> ActingProfile {
        ActingProfile {
            id: self.id,
            profile_type: self.profile_type,
        }
    }
}

/// Agreement between one client and one contractor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Contract {
    pub id: i64,
    pub terms: String,
    pub status: ContractStatus,
    pub client_id: i64,
    pub contractor_id: i64,
}

impl Contract {
    pub fn is_party(&self, profile_id: i64) -> bool {
        self.client_id == profile_id || self.contractor_id == profile_id
    }

    pub fn is_active(&self) -> bool {
        self.status != ContractStatus::Terminated
    }
}

/// Billable unit of work under a contract
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: i64,
    pub description: String,
    pub price: Decimal,
    pub paid: bool,
    pub payment_date: Option<DateTime<Utc>>,
    pub contract_id: i64,
}

/// Job row locked for payment, joined with the parties of its contract
#[derive(Debug, Clone, PartialEq)]
pub struct PayableJob {
    pub job: Job,
    pub client_id: i64,
    pub contractor_id: i64,
    pub contract_status: ContractStatus,
}

/// Identity of the caller, resolved before any ledger operation runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActingProfile {
    pub id: i64,
    pub profile_type: ProfileType,
}

/// Successful job payment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentReceipt {
    pub job_id: i64,
    pub paid: bool,
    pub amount: Decimal,
    pub client_id: i64,
    pub contractor_id: i64,
    pub paid_at: DateTime<Utc>,
}

/// Successful deposit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositReceipt {
    pub client_id: i64,
    pub amount: Decimal,
    pub new_balance: Decimal,
}

/// Deposit request body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepositRequest {
    pub amount: Decimal,
}

/// Sum of paid job prices for one contractor profession
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ProfessionEarnings {
    pub profession: String,
    pub total: Decimal,
}

/// Sum of paid job prices for one client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ClientPayments {
    pub client_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub total_paid: Decimal,
}

/// Entry of the best-clients report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientRanking {
    pub id: i64,
    pub full_name: String,
    pub total_paid: Decimal,
}

impl From<ClientPayments> for ClientRanking {
    fn from(payments: ClientPayments) -> Self {
        ClientRanking {
            id: payments.client_id,
            full_name: format!("{} {}", payments.first_name, payments.last_name),
            total_paid: payments.total_paid,
        }
    }
}

/// Closed reporting window `[start, end]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DateRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        if start > end {
            return Err(LedgerError::InvalidDateRange(format!(
                "start {} is after end {}",
                start, end
            )));
        }

        Ok(DateRange { start, end })
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant <= self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use rust_decimal_macros::dec;

    #[test]
    fn test_date_range_is_closed() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 1, 31, 0, 0, 0).unwrap();
        let range = DateRange::new(start, end).unwrap();

        assert!(range.contains(start));
        assert!(range.contains(end));
        assert!(!range.contains(end + Duration::microseconds(1)));
        assert!(!range.contains(start - Duration::microseconds(1)));
    }

    #[test]
    fn test_date_range_rejects_inverted_bounds() {
        let start = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

        assert!(matches!(
            DateRange::new(start, end),
            Err(LedgerError::InvalidDateRange(_))
        ));
    }

    #[test]
    fn test_client_ranking_full_name() {
        let ranking = ClientRanking::from(ClientPayments {
            client_id: 4,
            first_name: "Ash".to_string(),
            last_name: "Kethcum".to_string(),
            total_paid: dec!(2020.00),
        });

        assert_eq!(ranking.full_name, "Ash Kethcum");
        assert_eq!(ranking.total_paid, dec!(2020.00));
    }

    #[test]
    fn test_profile_serializes_type_field() {
        let profile = Profile {
            id: 1,
            first_name: "Harry".to_string(),
            last_name: "Potter".to_string(),
            profession: "Wizard".to_string(),
            balance: dec!(1150.00),
            profile_type: ProfileType::Client,
        };

        let value = serde_json::to_value(&profile).unwrap();
        assert_eq!(value["type"], "client");
        assert_eq!(value["firstName"], "Harry");
    }
}
