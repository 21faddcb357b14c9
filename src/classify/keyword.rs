use super::{add_directional, ClassifiedRow, RowContext};
use crate::profile::BankProfile;

/// Classify by directional keywords in the description.
///
/// Statements without amount columns or type codes (single-column
/// layouts) print the direction in the narrative instead. The default
/// direction is money-out: spending rows dominate and rarely say so.
pub struct KeywordClassifier {
    in_keywords: Vec<String>,
    out_keywords: Vec<String>,
}

impl KeywordClassifier {
    pub fn new(profile: &BankProfile) -> Self {
        let lower = |keywords: &[String]| keywords.iter().map(|k| k.to_lowercase()).collect();
        Self {
            in_keywords: lower(&profile.classification.money_in_keywords),
            out_keywords: lower(&profile.classification.money_out_keywords),
        }
    }

    /// True when the description names a credit.
    pub fn is_credit(&self, description: &str) -> bool {
        let lowered = description.to_lowercase();
        if self.in_keywords.iter().any(|kw| lowered.contains(kw)) {
            return true;
        }
        if !self.out_keywords.iter().any(|kw| lowered.contains(kw)) {
            tracing::debug!(description, "no directional keyword; defaulting to money out");
        }
        false
    }

    pub fn classify(&self, ctx: RowContext<'_>) -> ClassifiedRow {
        let mut row = ClassifiedRow::default();
        let credit = self.is_credit(ctx.description);

        match ctx.amounts {
            [] => {}
            [single] => add_directional(&mut row, single.value, credit),
            [directional, .., balance] => {
                add_directional(&mut row, directional.value, credit);
                row.balance = Some(balance.value);
            }
        }
        row
    }
}
