use chrono::{Datelike, Duration, NaiveDate};
use regex::Regex;

use crate::error::ParseError;
use crate::models::WarningKind;
use crate::profile::BankProfile;

/// Dates more than this far outside the statement period are flagged.
const PERIOD_WINDOW_DAYS: i64 = 35;

/// Outcome of scanning a line for a leading date.
#[derive(Debug, Clone, PartialEq)]
pub enum DateScan {
    /// A fully-formed date; `end` is the byte offset just past it.
    Full {
        date: NaiveDate,
        end: usize,
        warning: Option<WarningKind>,
    },
    /// A split-year prefix (`DD/MM/YYY`); the final digit arrives on a
    /// later line.
    Split { prefix: String, end: usize },
    /// Date-shaped text that failed to parse; the line is not a date.
    Invalid { message: String },
    None,
}

#[derive(Debug)]
struct CompiledFormat {
    regex: Regex,
    chrono: String,
    has_year: bool,
}

/// Parses transaction dates according to the bank profile.
///
/// Handles ordinal suffixes, yearless dates (inferred from the statement
/// period, including cross-year boundaries) and split-year dates whose
/// final digit prints on a separate line.
#[derive(Debug)]
pub struct DateEngine {
    formats: Vec<CompiledFormat>,
    split_prefix: Option<Regex>,
    ordinal: Regex,
    month_dot: Regex,
    period: Option<(NaiveDate, NaiveDate)>,
}

impl DateEngine {
    pub fn new(
        profile: &BankProfile,
        period: Option<(NaiveDate, NaiveDate)>,
    ) -> Result<Self, ParseError> {
        let mut formats = Vec::with_capacity(profile.date_formats.len());
        for chrono_format in &profile.date_formats {
            let pattern = format_to_regex(chrono_format).map_err(|e| {
                ParseError::ProfileInvalid(format!(
                    "{}: bad date format '{chrono_format}': {e}",
                    profile.name
                ))
            })?;
            let regex = Regex::new(&pattern).map_err(|e| {
                ParseError::ProfileInvalid(format!(
                    "{}: bad date format '{chrono_format}': {e}",
                    profile.name
                ))
            })?;
            formats.push(CompiledFormat {
                regex,
                chrono: chrono_format.clone(),
                has_year: chrono_format.contains("%Y") || chrono_format.contains("%y"),
            });
        }

        let split_prefix = if profile.split_year_dates {
            Some(
                Regex::new(r"^\s*(\d{1,2}/\d{1,2}/\d{3})(?:\D|$)")
                    .map_err(|e| ParseError::ProfileInvalid(format!("bad split pattern: {e}")))?,
            )
        } else {
            None
        };

        let ordinal = Regex::new(r"(?i)(\d{1,2})(st|nd|rd|th)\b")
            .map_err(|e| ParseError::ProfileInvalid(format!("bad ordinal pattern: {e}")))?;
        let month_dot = Regex::new(r"([A-Za-z]{3})\.")
            .map_err(|e| ParseError::ProfileInvalid(format!("bad month pattern: {e}")))?;

        Ok(Self {
            formats,
            split_prefix,
            ordinal,
            month_dot,
            period,
        })
    }

    pub fn set_period(&mut self, period: (NaiveDate, NaiveDate)) {
        self.period = Some(period);
    }

    pub fn period(&self) -> Option<(NaiveDate, NaiveDate)> {
        self.period
    }

    /// Scan for a date at the start of a line.
    ///
    /// Full date formats are tried before the split-year prefix, so a line
    /// carrying a complete date always starts a new transaction even while
    /// a year digit is pending.
    pub fn scan_line_start(&self, text: &str) -> DateScan {
        for format in &self.formats {
            let m = match format.regex.find(text) {
                Some(m) => m,
                None => continue,
            };
            let raw = m.as_str().trim();
            match self.parse_matched(raw, format) {
                Ok((date, warning)) => {
                    return DateScan::Full {
                        date,
                        end: m.end(),
                        warning,
                    }
                }
                Err(message) => return DateScan::Invalid { message },
            }
        }

        if let Some(split) = &self.split_prefix {
            if let Some(m) = split.captures(text).and_then(|caps| caps.get(1)) {
                return DateScan::Split {
                    prefix: m.as_str().to_string(),
                    end: m.end(),
                };
            }
        }

        DateScan::None
    }

    /// Complete a split-year prefix with its final digit.
    pub fn complete_split(&self, prefix: &str, digit: char) -> Option<NaiveDate> {
        let full = format!("{prefix}{digit}");
        NaiveDate::parse_from_str(&full, "%d/%m/%Y").ok()
    }

    /// Warn when a date falls outside the statement period window.
    pub fn check_window(&self, date: NaiveDate) -> Option<WarningKind> {
        let (start, end) = self.period?;
        let window = Duration::days(PERIOD_WINDOW_DAYS);
        if date < start - window || date > end + window {
            Some(WarningKind::DateOutOfWindow)
        } else {
            None
        }
    }

    fn parse_matched(
        &self,
        raw: &str,
        format: &CompiledFormat,
    ) -> Result<(NaiveDate, Option<WarningKind>), String> {
        let normalized = self.normalize(raw);

        if format.has_year {
            let date = NaiveDate::parse_from_str(&normalized, &format.chrono)
                .map_err(|e| format!("could not parse date '{raw}': {e}"))?;
            Ok((date, self.check_window(date)))
        } else {
            // Parse day and month against a leap-safe placeholder year,
            // then infer the real year from the statement period.
            let with_year = format!("{normalized} 2000");
            let chrono = format!("{} %Y", format.chrono);
            let placeholder = NaiveDate::parse_from_str(&with_year, &chrono)
                .map_err(|e| format!("could not parse date '{raw}': {e}"))?;
            self.infer_year(placeholder.day(), placeholder.month())
        }
    }

    fn normalize(&self, raw: &str) -> String {
        let stripped = self.ordinal.replace_all(raw, "$1");
        let no_month_dots = self.month_dot.replace_all(&stripped, "$1");
        no_month_dots
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Pick the year for a yearless date.
    ///
    /// Try both period years, preferring one that lands inside the period.
    /// A Nov/Dec date on a statement starting in Jan/Feb belongs to the
    /// previous year. Periods spanning a year boundary pick the candidate
    /// closer to a period bound. Anything else defaults to the period's
    /// starting year with a warning.
    fn infer_year(
        &self,
        day: u32,
        month: u32,
    ) -> Result<(NaiveDate, Option<WarningKind>), String> {
        let (start, end) = self
            .period
            .ok_or_else(|| "no statement period available for year inference".to_string())?;

        let mut years = vec![start.year()];
        if end.year() != start.year() {
            years.push(end.year());
        }
        for year in &years {
            if let Some(date) = NaiveDate::from_ymd_opt(*year, month, day) {
                if date >= start && date <= end {
                    return Ok((date, None));
                }
            }
        }

        if start.month() <= 2 && month >= 11 {
            let date = NaiveDate::from_ymd_opt(start.year() - 1, month, day)
                .ok_or_else(|| format!("invalid date {day}/{month}"))?;
            return Ok((date, Some(WarningKind::CrossYearDate)));
        }

        if start.year() != end.year() {
            let candidates: Vec<NaiveDate> = years
                .iter()
                .filter_map(|y| NaiveDate::from_ymd_opt(*y, month, day))
                .collect();
            if let Some(best) = candidates.into_iter().min_by_key(|d| {
                let from_start = (*d - start).num_days().abs();
                let from_end = (*d - end).num_days().abs();
                from_start.min(from_end)
            }) {
                return Ok((best, self.check_window(best)));
            }
        }

        // Feb 29 and similar: fall through the period years in order and
        // accept the first calendar-valid candidate.
        for year in &years {
            if let Some(date) = NaiveDate::from_ymd_opt(*year, month, day) {
                let warning = if date >= start && date <= end {
                    None
                } else {
                    Some(WarningKind::DateOutOfWindow)
                };
                return Ok((date, warning));
            }
        }

        Err(format!("invalid date {day}/{month}"))
    }
}

/// Translate a chrono format string into a matching regex, anchored to
/// the start of the line.
fn format_to_regex(format: &str) -> Result<String, String> {
    let mut pattern = String::from(r"^\s*");
    let mut chars = format.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '%' {
            match chars.next() {
                Some('d') => pattern.push_str(r"\d{1,2}(?:st|nd|rd|th)?"),
                Some('m') => pattern.push_str(r"\d{1,2}"),
                Some('Y') => pattern.push_str(r"\d{4}"),
                Some('y') => pattern.push_str(r"\d{2}"),
                Some('b') => pattern.push_str(r"[A-Za-z]{3}\.?"),
                Some('B') => pattern.push_str(r"[A-Za-z]{3,9}"),
                Some(other) => return Err(format!("unsupported date specifier %{other}")),
                None => return Err("trailing % in date format".to_string()),
            }
        } else if ch == ' ' {
            pattern.push_str(r"\s+");
        } else {
            pattern.push_str(&regex::escape(&ch.to_string()));
        }
    }

    Ok(pattern)
}
