use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::amounts::AmountHit;
use crate::models::{Warning, WarningKind};
use crate::profile::BankProfile;

/// The transaction currently being assembled from stream lines.
///
/// Amounts accumulate across lines and are re-classified as a set each
/// time a new amount arrives, so a debit on one line and its balance on
/// the next resolve the same way as both printed together.
#[derive(Debug, Default)]
pub(crate) struct PartialTxn {
    pub date: Option<NaiveDate>,
    /// A split-year date prefix (`DD/MM/YYY`) awaiting its final digit.
    pub split_prefix: Option<String>,
    pub date_warning: Option<WarningKind>,
    pub description_lines: Vec<String>,
    pub amounts: Vec<AmountHit>,
    pub money_in: Decimal,
    pub money_out: Decimal,
    pub balance: Option<Decimal>,
    pub type_code: Option<String>,
    /// Warnings from the latest classification of `amounts`.
    pub class_warnings: Vec<Warning>,
    pub source_page: u32,
    pub source_line_index: usize,
}

impl PartialTxn {
    pub fn start_full(date: NaiveDate, page: u32, line_index: usize) -> Self {
        Self {
            date: Some(date),
            source_page: page,
            source_line_index: line_index,
            ..Self::default()
        }
    }

    pub fn start_split(prefix: String, page: u32, line_index: usize) -> Self {
        Self {
            split_prefix: Some(prefix),
            source_page: page,
            source_line_index: line_index,
            ..Self::default()
        }
    }

    pub fn started(&self) -> bool {
        self.date.is_some() || self.split_prefix.is_some()
    }

    pub fn pending_year_digit(&self) -> bool {
        self.date.is_none() && self.split_prefix.is_some()
    }

    pub fn has_direction(&self) -> bool {
        !self.money_in.is_zero() || !self.money_out.is_zero()
    }

    /// The previous lines carried description text but no amounts yet.
    pub fn desc_only_so_far(&self) -> bool {
        !self.description_lines.is_empty() && self.amounts.is_empty()
    }

    /// Complete enough to emit without waiting for more lines: the date
    /// is fully formed and the row's balance story is settled.
    pub fn is_emittable_now(&self, profile: &BankProfile) -> bool {
        if self.date.is_none() {
            return false;
        }
        match (self.has_direction(), self.balance.is_some()) {
            (true, true) => true,
            (false, true) => profile.balance_only_rows,
            _ => false,
        }
    }

    /// Complete enough to emit when the stream moves on (next date,
    /// period boundary, end of stream): a balance may legitimately never
    /// arrive for banks that omit it.
    pub fn is_emittable_on_flush(&self, profile: &BankProfile) -> bool {
        if self.is_emittable_now(profile) {
            return true;
        }
        self.date.is_some() && self.has_direction() && profile.allow_missing_balance
    }

    pub fn description(&self) -> String {
        self.description_lines
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}
