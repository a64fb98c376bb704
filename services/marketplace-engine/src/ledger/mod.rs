//! Ledger core: contract access, job payment, deposits and reporting.
//!
//! Each engine call runs in one store transaction and either commits all of
//! its effects or none of them.
//!
//! # Invariants
//!
//! - Profile balances never go negative
//! - A job moves from unpaid to paid at most once, and only through [`PaymentEngine`]
//! - A payment moves exactly the job price from client to contractor

pub mod contracts;
pub mod deposits;
pub mod payments;
pub mod reporting;

use crate::config::LedgerConfig;
use rust_decimal::Decimal;

pub use contracts::ContractResolver;
pub use deposits::DepositEngine;
pub use payments::PaymentEngine;
pub use reporting::{ReportingEngine, NO_DATA_AVAILABLE};

/// Business limits applied by the engines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerPolicy {
    /// Fraction of the outstanding job total a single deposit may reach
    pub deposit_cap_ratio: Decimal,
    pub best_clients_default_limit: i64,
}

impl Default for LedgerPolicy {
    fn default() -> Self {
        LedgerPolicy {
            deposit_cap_ratio: Decimal::new(25, 2),
            best_clients_default_limit: 2,
        }
    }
}

impl From<&LedgerConfig> for LedgerPolicy {
    fn from(config: &LedgerConfig) -> Self {
        LedgerPolicy {
            deposit_cap_ratio: Decimal::new(i64::from(config.deposit_cap_percent), 2),
            best_clients_default_limit: config.best_clients_default_limit,
        }
    }
}

/// Money amounts carry at most two fractional digits.
pub(crate) fn has_cent_precision(amount: Decimal) -> bool {
    amount.normalize().scale() <= 2
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_policy_from_config() {
        let policy = LedgerPolicy::from(&LedgerConfig {
            deposit_cap_percent: 25,
            best_clients_default_limit: 3,
        });

        assert_eq!(policy.deposit_cap_ratio, dec!(0.25));
        assert_eq!(policy.best_clients_default_limit, 3);
    }

    #[test]
    fn test_cent_precision() {
        assert!(has_cent_precision(dec!(100.01)));
        assert!(has_cent_precision(dec!(100.010)));
        assert!(has_cent_precision(dec!(5)));
        assert!(!has_cent_precision(dec!(0.001)));
    }
}
