//! Demo dataset for the in-memory backend and for tests.

use super::MemoryLedgerStore;
use crate::errors::Result;
use crate::models::{Contract, ContractStatus, Job, Profile, ProfileType};
use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn profile(
    id: i64,
    first_name: &str,
    last_name: &str,
    profession: &str,
    balance: Decimal,
    profile_type: ProfileType,
) -> Profile {
    Profile {
        id,
        first_name: first_name.to_string(),
        last_name: last_name.to_string(),
        profession: profession.to_string(),
        balance,
        profile_type,
    }
}

fn contract(id: i64, status: ContractStatus, client_id: i64, contractor_id: i64) -> Contract {
    Contract {
        id,
        terms: "bla bla bla".to_string(),
        status,
        client_id,
        contractor_id,
    }
}

fn job(id: i64, price: Decimal, contract_id: i64, payment_date: Option<DateTime<Utc>>) -> Job {
    Job {
        id,
        description: "work".to_string(),
        price,
        paid: payment_date.is_some(),
        payment_date,
        contract_id,
    }
}

fn paid_at(month: u32, day: u32, hour: u32) -> Option<DateTime<Utc>> {
    Utc.with_ymd_and_hms(2020, month, day, hour, 11, 26).single()
}

/// Eight profiles, nine contracts and fourteen jobs, five of them unpaid.
pub async fn load_demo_data(store: &MemoryLedgerStore) -> Result<()> {
    use ContractStatus::*;
    use ProfileType::*;

    let profiles = vec![
        profile(1, "Harry", "Potter", "Wizard", dec!(1150.00), Client),
        profile(2, "Mr", "Robot", "Hacker", dec!(231.11), Client),
        profile(3, "John", "Snow", "Knows nothing", dec!(451.30), Client),
        profile(4, "Ash", "Kethcum", "Pokemon master", dec!(1.30), Client),
        profile(5, "John", "Lenon", "Musician", dec!(64.00), Contractor),
        profile(6, "Linus", "Torvalds", "Programmer", dec!(1214.00), Contractor),
        profile(7, "Alan", "Turing", "Programmer", dec!(22.00), Contractor),
        profile(8, "Aragorn", "II Elessar Telcontarvalds", "Fighter", dec!(314.00), Contractor),
    ];

    let contracts = vec![
        contract(1, Terminated, 1, 5),
        contract(2, InProgress, 1, 6),
        contract(3, InProgress, 2, 6),
        contract(4, InProgress, 2, 7),
        contract(5, New, 3, 8),
        contract(6, InProgress, 3, 7),
        contract(7, InProgress, 4, 7),
        contract(8, InProgress, 4, 6),
        contract(9, InProgress, 4, 8),
    ];

    let jobs = vec![
        job(1, dec!(200.00), 1, None),
        job(2, dec!(201.00), 2, None),
        job(3, dec!(202.00), 3, None),
        job(4, dec!(200.00), 4, None),
        job(5, dec!(200.00), 7, None),
        job(6, dec!(2020.00), 7, paid_at(8, 15, 19)),
        job(7, dec!(200.00), 2, paid_at(8, 15, 19)),
        job(8, dec!(200.00), 3, paid_at(8, 16, 19)),
        job(9, dec!(200.00), 1, paid_at(8, 17, 19)),
        job(10, dec!(200.00), 5, paid_at(8, 17, 19)),
        job(11, dec!(21.00), 1, paid_at(8, 10, 19)),
        job(12, dec!(21.00), 2, paid_at(8, 15, 19)),
        job(13, dec!(121.00), 3, paid_at(8, 15, 19)),
        job(14, dec!(121.00), 3, paid_at(8, 14, 23)),
    ];

    for p in profiles {
        store.insert_profile(p).await?;
    }
    for c in contracts {
        store.insert_contract(c).await?;
    }
    for j in jobs {
        store.insert_job(j).await?;
    }

    Ok(())
}

pub async fn demo_store() -> Result<MemoryLedgerStore> {
    let store = MemoryLedgerStore::new();
    load_demo_data(&store).await?;
    Ok(store)
}
