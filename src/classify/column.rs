use rust_decimal::Decimal;

use super::{add_directional, ClassifiedRow, RowContext};
use crate::profile::{BankProfile, ColumnRole};

/// Classify amounts purely by where their right edges fall relative to
/// the page's column model.
pub struct ColumnPositionClassifier {
    allow_both: bool,
}

impl ColumnPositionClassifier {
    pub fn new(profile: &BankProfile) -> Self {
        Self {
            allow_both: profile.allow_both_directions,
        }
    }

    pub fn allow_both_directions(&self) -> bool {
        self.allow_both
    }

    pub fn classify(&self, ctx: RowContext<'_>) -> ClassifiedRow {
        let mut row = ClassifiedRow::default();
        if ctx.amounts.is_empty() {
            return row;
        }

        let Some(model) = ctx.columns else {
            return classify_by_sign(ctx);
        };

        if let [single] = ctx.amounts {
            match model.classify(single.right_edge) {
                ColumnRole::Balance => row.balance = Some(single.value),
                ColumnRole::MoneyIn => {
                    // A lone amount past the money-in column after a bare
                    // description line is the row's balance, not a credit.
                    if ctx.prior_desc_only {
                        row.balance = Some(single.value);
                    } else {
                        add_directional(&mut row, single.value, true);
                    }
                }
                ColumnRole::MoneyOut => add_directional(&mut row, single.value, false),
            }
            return row;
        }

        for hit in ctx.amounts {
            match model.classify(hit.right_edge) {
                ColumnRole::Balance => row.balance = Some(hit.value),
                ColumnRole::MoneyIn => add_directional(&mut row, hit.value, true),
                ColumnRole::MoneyOut => add_directional(&mut row, hit.value, false),
            }
        }

        row
    }
}

/// Fallback when no column model exists: the rightmost amount is the
/// balance and the others carry their direction in their sign.
fn classify_by_sign(ctx: RowContext<'_>) -> ClassifiedRow {
    let mut row = ClassifiedRow::default();
    match ctx.amounts {
        [] => {}
        [single] => row.balance = Some(single.value),
        [directional @ .., balance] => {
            row.balance = Some(balance.value);
            for hit in directional {
                add_directional(&mut row, hit.value, hit.value >= Decimal::ZERO);
            }
        }
    }
    row
}
