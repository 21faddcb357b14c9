use regex::Regex;
use rust_decimal::Decimal;

use crate::error::ParseError;
use crate::models::Line;
use crate::profile::BankProfile;

/// A monetary value found on a line, keyed by the x coordinate of its
/// rightmost digit (amounts are right-aligned under their columns).
#[derive(Debug, Clone, PartialEq)]
pub struct AmountHit {
    pub value: Decimal,
    pub right_edge: f32,
    pub start: usize,
    pub end: usize,
}

/// Finds GBP-equivalent amounts on a line.
///
/// Foreign-currency annotations (`Amount: USD -38.04`) are masked out
/// before scanning so their figures can never surface as ledger amounts.
/// Trailing `OD`/`DB` suffixes negate the value (overdrawn balances);
/// `CR` leaves it positive.
pub struct AmountExtractor {
    money: Regex,
    fx: Option<Regex>,
    suffix: Regex,
}

impl AmountExtractor {
    pub fn new(profile: &BankProfile) -> Result<Self, ParseError> {
        let money = Regex::new(r"-?\d{1,3}(?:,\d{3})*\.\d{2}")
            .map_err(|e| ParseError::ProfileInvalid(format!("bad amount pattern: {e}")))?;

        let fx = if profile.fx_markers.is_empty() {
            None
        } else {
            let currencies = profile
                .fx_markers
                .iter()
                .map(|c| regex::escape(c))
                .collect::<Vec<_>>()
                .join("|");
            let pattern = format!(r"(?i)Amount:\s*(?:{currencies})\s*-?[\d,]+(?:\.\d+)?\.?");
            Some(Regex::new(&pattern).map_err(|e| {
                ParseError::ProfileInvalid(format!(
                    "{}: bad fx markers: {e}",
                    profile.name
                ))
            })?)
        };

        let suffix = Regex::new(r"^\s?(CR|DB|OD)\b")
            .map_err(|e| ParseError::ProfileInvalid(format!("bad suffix pattern: {e}")))?;

        Ok(Self { money, fx, suffix })
    }

    pub fn extract(&self, line: &Line) -> Vec<AmountHit> {
        self.extract_from(&line.text)
            .into_iter()
            .map(|(value, start, end)| AmountHit {
                value,
                right_edge: line.x_at_end(end).unwrap_or(end as f32),
                start,
                end,
            })
            .collect()
    }

    /// Scan bare text, without geometry. Used for summary and period
    /// boundary rows where only the value matters.
    pub fn extract_values(&self, text: &str) -> Vec<Decimal> {
        self.extract_from(text)
            .into_iter()
            .map(|(value, _, _)| value)
            .collect()
    }

    fn extract_from(&self, text: &str) -> Vec<(Decimal, usize, usize)> {
        let masked = self.mask_foreign(text);
        let mut hits = Vec::new();

        for m in self.money.find_iter(&masked) {
            // A match starting mid-number (e.g. inside an account number)
            // is not an amount.
            if let Some(prev) = masked[..m.start()].chars().next_back() {
                if prev.is_ascii_digit() || prev == ',' || prev == '.' {
                    continue;
                }
            }

            let mut value = match parse_amount(m.as_str()) {
                Some(v) => v,
                None => continue,
            };
            if let Some(caps) = self.suffix.captures(&masked[m.end()..]) {
                if matches!(&caps[1], "OD" | "DB") {
                    value = -value;
                }
            }
            hits.push((value, m.start(), m.end()));
        }

        hits
    }

    /// True when the line carries a foreign-currency annotation.
    pub fn has_foreign_marker(&self, text: &str) -> bool {
        self.fx.as_ref().is_some_and(|re| re.is_match(text))
    }

    /// Blank out `Amount: CUR n` spans, preserving byte offsets so run
    /// lookups stay valid.
    fn mask_foreign(&self, text: &str) -> String {
        let Some(fx) = &self.fx else {
            return text.to_string();
        };
        let mut masked = text.to_string();
        for m in fx.find_iter(text) {
            masked.replace_range(m.range(), &" ".repeat(m.len()));
        }
        masked
    }
}

fn parse_amount(raw: &str) -> Option<Decimal> {
    raw.replace(',', "").parse().ok()
}
