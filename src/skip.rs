use regex::Regex;

use crate::error::ParseError;
use crate::profile::BankProfile;

/// Universal noise patterns: page furniture, regulator boilerplate and
/// account-header labels that appear across banks.
///
/// This set is deliberately small and hand-picked; anything
/// bank-specific belongs in the profile's `skip_patterns`, because
/// patterns broad enough for one bank (e.g. a bare "Balance") match
/// legitimate rows on another.
const UNIVERSAL_PATTERNS: &[&str] = &[
    r"(?i)---\s*Page\s+\d+\s*---",
    r"(?i)^\s*Page\s+\d+(\s+of\s+\d+)?\s*$",
    r"(?i)Financial\s+Services\s+Compensation\s+Scheme",
    r"(?i)\bFSCS\b",
    r"(?i)Prudential\s+Regulation\s+Authority",
    r"(?i)Financial\s+Conduct\s+Authority",
    r"(?i)authorised\s+by\s+the|regulated\s+by\s+the",
    r"(?i)Registered\s+(Office|in)",
    r"(?i)Sort\s+code\s*:",
    r"(?i)Account\s+(number|name)\s*:",
    r"(?i)\b(IBAN|BIC)\s*:",
    r"(?i)^\s*\(GBP\)\s*\(GBP\)\s*$",
    r"(?i)Total\s+(money|paid)\s+(in|out)",
    r"(?i)Total\s+(outgoings|deposits)",
    r"(?i)Continued\s+on\s+(reverse|next\s+page)",
];

/// Decides whether a line is statement noise rather than ledger content.
pub struct SkipFilter {
    universal: Vec<Regex>,
    bank: Vec<Regex>,
}

impl SkipFilter {
    pub fn new(profile: &BankProfile) -> Result<Self, ParseError> {
        let universal = UNIVERSAL_PATTERNS
            .iter()
            .map(|p| Regex::new(p))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| ParseError::ProfileInvalid(format!("bad universal pattern: {e}")))?;

        let bank = profile
            .skip_patterns
            .iter()
            .map(|p| {
                Regex::new(p).map_err(|e| {
                    ParseError::ProfileInvalid(format!(
                        "{}: bad skip pattern '{p}': {e}",
                        profile.name
                    ))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { universal, bank })
    }

    pub fn should_skip(&self, text: &str) -> bool {
        if text.trim().is_empty() {
            return true;
        }
        self.universal.iter().any(|re| re.is_match(text))
            || self.bank.iter().any(|re| re.is_match(text))
    }
}

/// Recognizes printed summary rows before they are skipped, so their
/// figures still feed period assertions and statement metadata.
pub struct SummaryMatcher {
    total_in: Regex,
    total_out: Regex,
    closing: Regex,
}

/// Which summary figure a line carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryKind {
    TotalIn,
    TotalOut,
    ClosingBalance,
}

impl SummaryMatcher {
    pub fn new() -> Result<Self, ParseError> {
        let compile = |p: &str| {
            Regex::new(p).map_err(|e| ParseError::ProfileInvalid(format!("bad summary pattern: {e}")))
        };
        Ok(Self {
            total_in: compile(r"(?i)Total\s+(money|paid)\s+in|Total\s+deposits")?,
            total_out: compile(r"(?i)Total\s+(money|paid)\s+out|Total\s+outgoings")?,
            closing: compile(r"(?i)balance\s+at\s+close\s+of\s+business|closing\s+balance")?,
        })
    }

    pub fn classify(&self, text: &str) -> Option<SummaryKind> {
        if self.total_in.is_match(text) {
            Some(SummaryKind::TotalIn)
        } else if self.total_out.is_match(text) {
            Some(SummaryKind::TotalOut)
        } else if self.closing.is_match(text) {
            Some(SummaryKind::ClosingBalance)
        } else {
            None
        }
    }
}
