use regex::Regex;

use crate::error::ParseError;
use crate::models::{Line, Warning, WarningKind};
use crate::profile::{BankProfile, ColumnRole, DefaultThresholds};

/// The amount columns in force for one page: each role with the right
/// edge of its header text.
///
/// Classification works on an amount's right edge because statement
/// amounts are right-aligned under their headers.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnModel {
    /// `(role, header right edge)`, sorted left to right.
    columns: Vec<(ColumnRole, f32)>,
    pub page_index: u32,
}

impl ColumnModel {
    pub fn new(mut columns: Vec<(ColumnRole, f32)>, page_index: u32) -> Self {
        columns.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
        Self {
            columns,
            page_index,
        }
    }

    pub fn from_defaults(defaults: &DefaultThresholds) -> Self {
        Self::new(
            vec![
                (ColumnRole::MoneyIn, defaults.money_in_right),
                (ColumnRole::MoneyOut, defaults.money_out_right),
                (ColumnRole::Balance, defaults.balance_right),
            ],
            0,
        )
    }

    /// Assign an amount to a column by its right edge.
    ///
    /// The threshold between two adjacent columns is the midpoint of
    /// their header right edges; comparisons are inclusive on the left
    /// column, so an amount sitting exactly on a threshold classifies
    /// left.
    pub fn classify(&self, right_edge: f32) -> ColumnRole {
        for pair in self.columns.windows(2) {
            let threshold = (pair[0].1 + pair[1].1) / 2.0;
            if right_edge <= threshold {
                return pair[0].0;
            }
        }
        self.columns
            .last()
            .map(|(role, _)| *role)
            .unwrap_or(ColumnRole::Balance)
    }

    pub fn right_edge(&self, role: ColumnRole) -> Option<f32> {
        self.columns
            .iter()
            .find(|(r, _)| *r == role)
            .map(|(_, x)| *x)
    }
}

/// Maintains the active `ColumnModel` across pages.
///
/// Headers reflow per page with different margins, so a single cached
/// threshold set corrupts classification; the tracker re-reads every
/// header occurrence and otherwise inherits the previous page's model.
#[derive(Debug)]
pub struct ColumnTracker {
    matchers: Vec<(Regex, ColumnRole)>,
    scan_lines: u32,
    require_header: bool,
    current: Option<ColumnModel>,
    current_page: Option<u32>,
    lines_into_page: u32,
    header_seen_on_page: bool,
}

impl ColumnTracker {
    pub fn new(profile: &BankProfile) -> Result<Self, ParseError> {
        let mut matchers = Vec::with_capacity(profile.columns.len());
        for spec in &profile.columns {
            let pattern = format!("(?i){}", regex::escape(&spec.name).replace(' ', r"\s+"));
            let regex = Regex::new(&pattern).map_err(|e| {
                ParseError::ProfileInvalid(format!(
                    "{}: bad column name '{}': {e}",
                    profile.name, spec.name
                ))
            })?;
            matchers.push((regex, spec.role));
        }

        Ok(Self {
            matchers,
            scan_lines: profile.header_scan_lines,
            require_header: profile.require_header_per_page,
            current: profile.default_thresholds.as_ref().map(ColumnModel::from_defaults),
            current_page: None,
            lines_into_page: 0,
            header_seen_on_page: false,
        })
    }

    /// Feed one reconstructed line; updates the model when the line is a
    /// recognized header. Returns whether the line was a header, plus a
    /// warning when a page exhausts its scan window without one and the
    /// profile requires one.
    pub fn observe(&mut self, line: &Line) -> (bool, Option<Warning>) {
        if self.current_page != Some(line.page_index) {
            self.current_page = Some(line.page_index);
            self.lines_into_page = 0;
            self.header_seen_on_page = false;
        }
        self.lines_into_page += 1;

        if self.try_header(line) {
            self.header_seen_on_page = true;
            return (true, None);
        }

        if self.require_header
            && !self.header_seen_on_page
            && self.lines_into_page == self.scan_lines
        {
            let warning = Warning::new(
                WarningKind::MissingHeader,
                format!(
                    "no column header within the first {} lines of page {}",
                    self.scan_lines, line.page_index
                ),
            )
            .with_page(line.page_index);
            return (false, Some(warning));
        }

        (false, None)
    }

    /// True when the line contained every configured column name.
    fn try_header(&mut self, line: &Line) -> bool {
        if self.matchers.is_empty() {
            return false;
        }

        let mut columns = Vec::with_capacity(self.matchers.len());
        for (regex, role) in &self.matchers {
            let m = match regex.find(&line.text) {
                Some(m) => m,
                None => return false,
            };
            let right = match line.x_at_end(m.end()) {
                Some(x) => x,
                None => return false,
            };
            columns.push((*role, right));
        }

        let model = ColumnModel::new(columns, line.page_index);
        tracing::debug!(
            page = line.page_index,
            line = line.index,
            "Updated column model from header"
        );
        self.current = Some(model);
        true
    }

    pub fn model(&self) -> Option<&ColumnModel> {
        self.current.as_ref()
    }
}
