use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// A token carried unusable coordinates and was dropped.
    InvalidToken,
    /// A page required a header but none was found in the scan window.
    MissingHeader,
    /// A date-shaped string failed to parse; the line was treated as text.
    UnparseableDate,
    /// A date's year was inferred across a year boundary.
    CrossYearDate,
    /// A date fell outside the statement period window.
    DateOutOfWindow,
    /// A type code had no mapping; position fallback was used.
    UnknownTypeCode,
    /// Both directions were populated on one row and had to be netted.
    AmbiguousDirection,
    /// The reconciler exchanged money_in and money_out.
    DirectionSwapped,
    /// The reconciler entered cascade recalculation for a period.
    CascadeRecalculated,
    /// A row's balance change did not match its amounts.
    BalanceMismatch,
    /// A period could not be reconciled after swap and cascade attempts.
    PeriodUnreconciled,
    /// An incomplete transaction fragment was discarded.
    DiscardedFragment,
    /// A printed period total disagreed with the summed transactions.
    TotalsMismatch,
    /// The printed closing balance disagreed with the ledger and was
    /// overridden.
    ClosingBalanceOverride,
}

/// A recoverable problem recorded during parsing or reconciliation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Warning {
    pub kind: WarningKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_index: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_index: Option<usize>,
}

impl Warning {
    pub fn new(kind: WarningKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            page_index: None,
            transaction_index: None,
        }
    }

    pub fn with_page(mut self, page_index: u32) -> Self {
        self.page_index = Some(page_index);
        self
    }

    pub fn with_transaction(mut self, index: usize) -> Self {
        self.transaction_index = Some(index);
        self
    }
}
