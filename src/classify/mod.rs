mod column;
mod hybrid;
mod keyword;
mod type_code;

pub use column::ColumnPositionClassifier;
pub use hybrid::HybridClassifier;
pub use keyword::KeywordClassifier;
pub use type_code::TypeCodeClassifier;

use rust_decimal::{Decimal, RoundingStrategy};

use crate::amounts::AmountHit;
use crate::error::ParseError;
use crate::layout::ColumnModel;
use crate::models::{Warning, WarningKind};
use crate::profile::{BankProfile, ClassificationStrategy};

/// Everything a strategy may consult when assigning a row's amounts.
#[derive(Debug, Clone, Copy)]
pub struct RowContext<'a> {
    pub amounts: &'a [AmountHit],
    pub description: &'a str,
    pub type_code: Option<&'a str>,
    pub columns: Option<&'a ColumnModel>,
    /// The previous line carried description text but no amounts.
    pub prior_desc_only: bool,
}

/// A classified row: at most one directional amount non-zero, plus the
/// printed balance when the row carried one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassifiedRow {
    pub money_in: Decimal,
    pub money_out: Decimal,
    pub balance: Option<Decimal>,
    pub warnings: Vec<Warning>,
}

impl ClassifiedRow {
    pub fn has_direction(&self) -> bool {
        !self.money_in.is_zero() || !self.money_out.is_zero()
    }

    /// Collapse a double-filled row into its net direction.
    ///
    /// Netting combines two extracted values, so the banker's rounding
    /// rule applies here (and only here).
    pub fn net_directions(&mut self) {
        if self.money_in.is_zero() || self.money_out.is_zero() {
            return;
        }
        let net = (self.money_in - self.money_out)
            .round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven);
        if net >= Decimal::ZERO {
            self.money_in = net;
            self.money_out = Decimal::ZERO;
        } else {
            self.money_in = Decimal::ZERO;
            self.money_out = -net;
        }
        self.warnings.push(Warning::new(
            WarningKind::AmbiguousDirection,
            "both directions populated on one row; netted",
        ));
    }
}

/// Add a signed directional value to a row: negative values always debit.
pub(crate) fn add_directional(row: &mut ClassifiedRow, value: Decimal, credit: bool) {
    if value < Decimal::ZERO {
        row.money_out += -value;
    } else if credit {
        row.money_in += value;
    } else {
        row.money_out += value;
    }
}

/// Strategy chosen by the bank profile. Banks differ only in data, so a
/// tagged variant is all the polymorphism this needs.
pub enum Classifier {
    ColumnPosition(ColumnPositionClassifier),
    TypeCode(TypeCodeClassifier),
    Keyword(KeywordClassifier),
    Hybrid(HybridClassifier),
}

impl Classifier {
    pub fn for_profile(profile: &BankProfile) -> Result<Self, ParseError> {
        Ok(match profile.classification_strategy {
            ClassificationStrategy::ColumnPosition => {
                Self::ColumnPosition(ColumnPositionClassifier::new(profile))
            }
            ClassificationStrategy::TypeCode => Self::TypeCode(TypeCodeClassifier::new(profile)),
            ClassificationStrategy::Keyword => Self::Keyword(KeywordClassifier::new(profile)),
            ClassificationStrategy::Hybrid => Self::Hybrid(HybridClassifier::new(profile)),
        })
    }

    pub fn classify(&self, ctx: RowContext<'_>) -> ClassifiedRow {
        let mut row = match self {
            Self::ColumnPosition(c) => c.classify(ctx),
            Self::TypeCode(c) => c.classify(ctx),
            Self::Keyword(c) => c.classify(ctx),
            Self::Hybrid(c) => c.classify(ctx),
        };
        if !self.allows_both_directions() {
            row.net_directions();
        }
        row
    }

    fn allows_both_directions(&self) -> bool {
        match self {
            Self::ColumnPosition(c) => c.allow_both_directions(),
            Self::TypeCode(c) => c.allow_both_directions(),
            Self::Keyword(_) => false,
            Self::Hybrid(c) => c.allow_both_directions(),
        }
    }
}
