use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    CardPayment,
    DirectDebit,
    StandingOrder,
    Transfer,
    Fee,
    Interest,
    Atm,
    Credit,
    Cheque,
    BroughtForward,
    CarriedForward,
    PeriodBreak,
    Other,
}

impl TransactionType {
    /// Map a profile `transaction_types` key to its enum value.
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "card_payment" => Some(Self::CardPayment),
            "direct_debit" => Some(Self::DirectDebit),
            "standing_order" => Some(Self::StandingOrder),
            "transfer" | "online_transfer" => Some(Self::Transfer),
            "fee" => Some(Self::Fee),
            "interest" => Some(Self::Interest),
            "atm_withdrawal" => Some(Self::Atm),
            "automated_credit" | "credit" => Some(Self::Credit),
            "cheque" => Some(Self::Cheque),
            "other" => Some(Self::Other),
            _ => None,
        }
    }

    /// True for the engine's synthetic marker rows, which never carry
    /// ledger amounts.
    pub fn is_marker(self) -> bool {
        matches!(
            self,
            Self::BroughtForward | Self::CarriedForward | Self::PeriodBreak
        )
    }
}

/// A single ledger row emitted by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub date: NaiveDate,
    pub description: String,
    /// Amount credited; zero when none.
    pub money_in: Decimal,
    /// Amount debited; zero when none.
    pub money_out: Decimal,
    /// Running balance as printed by the PDF (or recalculated by the
    /// reconciler), when the row carried one.
    pub balance: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_code: Option<String>,
    pub transaction_type: TransactionType,
    /// Extraction confidence, 0..=100.
    pub confidence: u8,
    pub source_page: u32,
    pub source_line_index: usize,
}

impl Transaction {
    pub fn new(date: NaiveDate, description: impl Into<String>) -> Self {
        Self {
            date,
            description: description.into(),
            money_in: Decimal::ZERO,
            money_out: Decimal::ZERO,
            balance: None,
            type_code: None,
            transaction_type: TransactionType::Other,
            confidence: 100,
            source_page: 0,
            source_line_index: 0,
        }
    }

    pub fn with_money_in(mut self, amount: Decimal) -> Self {
        self.money_in = amount;
        self
    }

    pub fn with_money_out(mut self, amount: Decimal) -> Self {
        self.money_out = amount;
        self
    }

    pub fn with_balance(mut self, balance: Decimal) -> Self {
        self.balance = Some(balance);
        self
    }

    pub fn with_type(mut self, transaction_type: TransactionType) -> Self {
        self.transaction_type = transaction_type;
        self
    }

    pub fn with_source(mut self, page: u32, line_index: usize) -> Self {
        self.source_page = page;
        self.source_line_index = line_index;
        self
    }

    /// Signed ledger effect of this row.
    pub fn signed_amount(&self) -> Decimal {
        self.money_in - self.money_out
    }

    pub fn is_marker(&self) -> bool {
        self.transaction_type.is_marker()
    }
}

/// Score extraction confidence from row completeness.
///
/// Deductions: missing description −20, both amounts zero −25, missing
/// balance −10. Bonuses: full row +5, reasonable description length +5.
/// (A missing date never reaches scoring; dateless fragments are discarded
/// with a warning before emission.) Clamped to 0..=100.
pub fn score_confidence(txn: &Transaction) -> u8 {
    let mut score: i32 = 100;

    let desc = txn.description.trim();
    if desc.len() < 3 {
        score -= 20;
    }
    if txn.money_in.is_zero() && txn.money_out.is_zero() {
        score -= 25;
    }
    if txn.balance.is_none() {
        score -= 10;
    }

    if (!txn.money_in.is_zero() || !txn.money_out.is_zero()) && txn.balance.is_some() {
        score += 5;
    }
    if (10..=200).contains(&desc.len()) {
        score += 5;
    }

    score.clamp(0, 100) as u8
}
