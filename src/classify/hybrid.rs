use super::{ClassifiedRow, ColumnPositionClassifier, KeywordClassifier, RowContext};
use crate::profile::BankProfile;

/// Geometry when it is unambiguous, keywords when it is not.
///
/// A row carrying an amount and a balance with distinct right edges is
/// decided by column position alone; a row yielding a single amount has
/// no geometry to compare, so the description decides its direction.
pub struct HybridClassifier {
    position: ColumnPositionClassifier,
    keyword: KeywordClassifier,
    allow_both: bool,
}

impl HybridClassifier {
    pub fn new(profile: &BankProfile) -> Self {
        Self {
            position: ColumnPositionClassifier::new(profile),
            keyword: KeywordClassifier::new(profile),
            allow_both: profile.allow_both_directions,
        }
    }

    pub fn allow_both_directions(&self) -> bool {
        self.allow_both
    }

    pub fn classify(&self, ctx: RowContext<'_>) -> ClassifiedRow {
        match ctx.amounts {
            [_single] => self.keyword.classify(ctx),
            amounts if amounts.len() >= 2 && distinct_edges(ctx) => self.position.classify(ctx),
            _ => self.position.classify(ctx),
        }
    }
}

fn distinct_edges(ctx: RowContext<'_>) -> bool {
    for pair in ctx.amounts.windows(2) {
        if (pair[0].right_edge - pair[1].right_edge).abs() < f32::EPSILON {
            return false;
        }
    }
    true
}
