use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{Transaction, Warning};

/// One reconciliation window: the rows between two period boundaries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Period {
    pub index: usize,
    /// Brought-forward balance for the period, when printed.
    pub opening_balance: Option<Decimal>,
    /// Balance after the period's last row, post-reconciliation.
    pub closing_balance: Option<Decimal>,
    /// First transaction of the period (inclusive).
    pub start: usize,
    /// One past the period's last transaction.
    pub end: usize,
    pub reconciled: bool,
    pub cascade_recalculated: bool,
}

impl Period {
    pub fn new(index: usize, start: usize) -> Self {
        Self {
            index,
            opening_balance: None,
            closing_balance: None,
            start,
            end: start,
            reconciled: true,
            cascade_recalculated: false,
        }
    }

    pub fn transaction_count(&self) -> usize {
        self.end - self.start
    }
}

/// Printed summary figures captured from a period's non-ledger rows.
///
/// These are compared against the summed ledger during reconciliation but
/// never contribute amounts themselves.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PrintedTotals {
    pub total_in: Option<Decimal>,
    pub total_out: Option<Decimal>,
    pub closing_balance: Option<Decimal>,
}

/// The complete output of one statement parse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatementResult {
    pub transactions: Vec<Transaction>,
    pub periods: Vec<Period>,
    /// First period's brought-forward balance.
    pub opening_balance: Option<Decimal>,
    /// Last transaction's balance, post-reconciliation.
    pub closing_balance: Option<Decimal>,
    pub total_money_in: Decimal,
    pub total_money_out: Decimal,
    pub warnings: Vec<Warning>,
    /// Weighted mean of per-transaction confidence, 0..=100.
    pub confidence_overall: u8,
    /// True when the parse was cancelled before the stream was exhausted.
    pub partial: bool,
    /// False only when strict mode was requested and a period failed to
    /// reconcile.
    pub success: bool,
}

impl StatementResult {
    pub fn reconciled(&self) -> bool {
        self.periods.iter().all(|p| p.reconciled)
    }
}
