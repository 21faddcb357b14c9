use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rust_decimal::Decimal;

use bankproof::engine::{parse, ParseOptions};
use bankproof::models::{StatementResult, Token, TokenSource, VecTokenSource};
use bankproof::profile::{
    BankProfile, ClassificationConfig, ClassificationStrategy, ColumnRole, ColumnSpec,
    DefaultThresholds,
};

const LINE_STEP: f32 = 12.0;

/// Lays out fixture tokens the way a PDF page would: one call per
/// statement line, each cell at an explicit x with width equal to its
/// character count (so an amount's right edge is `x0 + len`).
pub struct StatementBuilder {
    tokens: Vec<Token>,
    page: u32,
    y: f32,
}

impl StatementBuilder {
    pub fn new() -> Self {
        Self {
            tokens: Vec::new(),
            page: 0,
            y: 40.0,
        }
    }

    pub fn line(mut self, cells: &[(&str, f32)]) -> Self {
        for (text, x0) in cells {
            let width = text.chars().count() as f32;
            self.tokens
                .push(Token::new(*text, self.page, *x0, *x0 + width, self.y));
        }
        self.y += LINE_STEP;
        self
    }

    pub fn page_break(mut self) -> Self {
        self.page += 1;
        self.y = 40.0;
        self
    }

    pub fn build(self) -> Vec<Token> {
        self.tokens
    }
}

pub fn run(profile: &BankProfile, tokens: Vec<Token>, options: &ParseOptions) -> StatementResult {
    let mut source = VecTokenSource::new(tokens);
    parse(&mut source, profile, options).expect("parse should succeed")
}

pub fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}

/// Monzo-shaped profile: split-year dates, hybrid classification,
/// signed amounts, FX annotations.
pub fn monzo_like() -> BankProfile {
    BankProfile {
        name: "monzo-test".to_string(),
        date_formats: vec!["%d/%m/%Y".to_string()],
        split_year_dates: true,
        classification_strategy: ClassificationStrategy::Hybrid,
        classification: ClassificationConfig {
            money_in_keywords: vec!["transfer from".to_string(), "refund".to_string()],
            money_out_keywords: vec!["card payment".to_string(), "direct debit".to_string()],
            ..ClassificationConfig::default()
        },
        fx_markers: vec!["USD".to_string(), "EUR".to_string()],
        default_thresholds: Some(DefaultThresholds {
            money_out_right: 55.0,
            money_in_right: 85.0,
            balance_right: 115.0,
        }),
        ..BankProfile::default()
    }
}

/// Santander-shaped profile: ordinal yearless dates, strict column
/// layout with a balance on every row.
pub fn santander_like() -> BankProfile {
    BankProfile {
        name: "santander-test".to_string(),
        date_formats: vec!["%d %b %Y".to_string(), "%d %b".to_string()],
        classification_strategy: ClassificationStrategy::ColumnPosition,
        balance_only_rows: true,
        columns: vec![
            ColumnSpec {
                name: "Money out".to_string(),
                role: ColumnRole::MoneyOut,
            },
            ColumnSpec {
                name: "Money in".to_string(),
                role: ColumnRole::MoneyIn,
            },
            ColumnSpec {
                name: "Balance".to_string(),
                role: ColumnRole::Balance,
            },
        ],
        default_thresholds: Some(DefaultThresholds {
            money_out_right: 65.0,
            money_in_right: 85.0,
            balance_right: 105.0,
        }),
        ..BankProfile::default()
    }
}

/// NatWest-shaped profile: printed type codes decide direction.
pub fn natwest_like() -> BankProfile {
    let mut transaction_types = std::collections::BTreeMap::new();
    transaction_types.insert(
        "direct_debit".to_string(),
        vec!["dd".to_string(), "direct debit".to_string()],
    );
    transaction_types.insert(
        "automated_credit".to_string(),
        vec!["bac".to_string(), "automated credit".to_string()],
    );
    transaction_types.insert("cheque".to_string(), vec!["chq".to_string()]);

    BankProfile {
        name: "natwest-test".to_string(),
        date_formats: vec!["%d/%m/%Y".to_string(), "%d %b %Y".to_string()],
        classification_strategy: ClassificationStrategy::TypeCode,
        allow_missing_balance: true,
        balance_only_rows: true,
        classification: ClassificationConfig {
            money_in_codes: vec!["BAC".to_string(), "FPI".to_string()],
            money_out_codes: vec!["DD".to_string(), "POS".to_string(), "CHG".to_string()],
            type_code_position_threshold: Some(95.0),
            ..ClassificationConfig::default()
        },
        default_thresholds: Some(DefaultThresholds {
            money_out_right: 65.0,
            money_in_right: 85.0,
            balance_right: 105.0,
        }),
        transaction_types,
        ..BankProfile::default()
    }
}

/// Token source that trips a cancellation flag partway through the
/// stream.
pub struct CancelAfter {
    inner: std::vec::IntoIter<Token>,
    remaining: usize,
    flag: Arc<AtomicBool>,
}

impl CancelAfter {
    pub fn new(tokens: Vec<Token>, after: usize, flag: Arc<AtomicBool>) -> Self {
        Self {
            inner: tokens.into_iter(),
            remaining: after,
            flag,
        }
    }
}

impl TokenSource for CancelAfter {
    fn next_token(&mut self) -> Option<Token> {
        if self.remaining == 0 {
            self.flag.store(true, Ordering::Relaxed);
        } else {
            self.remaining -= 1;
        }
        self.inner.next()
    }
}

/// The invariants every parse result must hold, regardless of fixture.
pub fn assert_core_invariants(result: &StatementResult) {
    for (index, txn) in result.transactions.iter().enumerate() {
        assert!(
            txn.money_in >= Decimal::ZERO && txn.money_out >= Decimal::ZERO,
            "transaction {index} has a negative amount"
        );
        assert!(
            txn.money_in.is_zero() || txn.money_out.is_zero(),
            "transaction {index} carries both directions"
        );
    }

    for pair in result.transactions.windows(2) {
        assert!(
            pair[0].source_line_index <= pair[1].source_line_index,
            "transactions emitted out of stream order"
        );
    }

    let mut seen_non_break = false;
    for txn in &result.transactions {
        if txn.transaction_type == bankproof::models::TransactionType::PeriodBreak {
            assert!(
                seen_non_break,
                "period break not preceded by any transaction"
            );
        } else {
            seen_non_break = true;
        }
    }
}
