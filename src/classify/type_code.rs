use std::collections::BTreeSet;

use super::{add_directional, ClassifiedRow, ColumnPositionClassifier, RowContext};
use crate::models::{Warning, WarningKind};
use crate::profile::BankProfile;

/// Classify by the bank's printed transaction-type token (`FPI`, `DD`,
/// `CHG`, ...), falling back to geometry when the code is unknown.
pub struct TypeCodeClassifier {
    in_codes: BTreeSet<String>,
    out_codes: BTreeSet<String>,
    position_threshold: Option<f32>,
    fallback: ColumnPositionClassifier,
    allow_both: bool,
}

impl TypeCodeClassifier {
    pub fn new(profile: &BankProfile) -> Self {
        let upper = |codes: &[String]| codes.iter().map(|c| c.to_uppercase()).collect();
        Self {
            in_codes: upper(&profile.classification.money_in_codes),
            out_codes: upper(&profile.classification.money_out_codes),
            position_threshold: profile.classification.type_code_position_threshold,
            fallback: ColumnPositionClassifier::new(profile),
            allow_both: profile.allow_both_directions,
        }
    }

    pub fn allow_both_directions(&self) -> bool {
        self.allow_both
    }

    pub fn classify(&self, ctx: RowContext<'_>) -> ClassifiedRow {
        let Some(code) = ctx.type_code.map(str::to_uppercase) else {
            return self.fallback.classify(ctx);
        };

        let credit = if self.in_codes.contains(&code) {
            true
        } else if self.out_codes.contains(&code) {
            false
        } else {
            let mut row = self.fallback.classify(ctx);
            row.warnings.push(Warning::new(
                WarningKind::UnknownTypeCode,
                format!("unknown type code '{code}'; classified by position"),
            ));
            return row;
        };

        let mut row = ClassifiedRow::default();
        match ctx.amounts {
            [] => {}
            [single] => {
                let past_balance_threshold = self
                    .position_threshold
                    .is_some_and(|t| single.right_edge > t);
                if past_balance_threshold {
                    row.balance = Some(single.value);
                } else {
                    add_directional(&mut row, single.value.abs(), credit);
                }
            }
            [directional, .., balance] => {
                add_directional(&mut row, directional.value.abs(), credit);
                row.balance = Some(balance.value);
            }
        }
        row
    }
}
