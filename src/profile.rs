use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ParseError;
use crate::models::TransactionType;

fn default_y_tolerance() -> f32 {
    1.2
}

fn default_x_tolerance() -> f32 {
    0.5
}

fn default_header_scan_lines() -> u32 {
    8
}

fn default_period_boundary_pattern() -> String {
    r"(?i)balance\s+brought\s+forward|brought\s+forward".to_string()
}

fn default_carried_forward_pattern() -> String {
    r"(?i)balance\s+carried\s+forward|carried\s+forward".to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnRole {
    MoneyIn,
    MoneyOut,
    Balance,
}

/// A header column name and the ledger role of amounts under it.
///
/// Keeping the role in data lets one code path serve both column orders
/// seen in the wild ("Paid In, Withdrawn" and "Withdrawn, Paid In").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    pub role: ColumnRole,
}

/// Fallback column right edges used until the first header is seen.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DefaultThresholds {
    pub money_in_right: f32,
    pub money_out_right: f32,
    pub balance_right: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationStrategy {
    ColumnPosition,
    TypeCode,
    Keyword,
    Hybrid,
}

/// Strategy-specific knobs; unused fields are simply left empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassificationConfig {
    pub money_in_codes: Vec<String>,
    pub money_out_codes: Vec<String>,
    pub money_in_keywords: Vec<String>,
    pub money_out_keywords: Vec<String>,
    /// Amounts whose right edge passes this are balances when a row
    /// yields a single amount (type-code strategy).
    pub type_code_position_threshold: Option<f32>,
}

/// Declarative description of one bank's statement format.
///
/// Banks differ only in data; the engine itself is bank-agnostic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BankProfile {
    pub name: String,
    /// Strings the upstream resolver matches against statement headers.
    pub identifiers: Vec<String>,
    /// chrono format strings tried in order; formats without a year
    /// trigger period-based year inference.
    pub date_formats: Vec<String>,
    /// Dates print as DD/MM/YYY with the final year digit on a later line.
    pub split_year_dates: bool,
    pub period_boundary_pattern: String,
    pub carried_forward_pattern: String,
    /// Captures the statement period from a `start - end` header line.
    pub period_pattern: Option<String>,
    pub columns: Vec<ColumnSpec>,
    pub default_thresholds: Option<DefaultThresholds>,
    pub classification_strategy: ClassificationStrategy,
    pub classification: ClassificationConfig,
    /// Bank-specific noise patterns, applied after the universal set.
    pub skip_patterns: Vec<String>,
    /// Currency codes whose `Amount: CUR n` annotations are foreign.
    pub fx_markers: Vec<String>,
    /// Rows may carry a directional amount without a printed balance.
    pub allow_missing_balance: bool,
    /// Rows may complete with a balance alone (brought-forward, fees).
    pub balance_only_rows: bool,
    /// Permit both directions non-zero on one row.
    pub allow_both_directions: bool,
    pub x_tolerance: f32,
    pub y_tolerance: f32,
    /// Lines searched for a header at the top of each page.
    pub header_scan_lines: u32,
    pub require_header_per_page: bool,
    /// Keyword lists keyed by transaction-type name (`direct_debit`, ...).
    pub transaction_types: BTreeMap<String, Vec<String>>,
}

impl Default for BankProfile {
    fn default() -> Self {
        Self {
            name: String::new(),
            identifiers: Vec::new(),
            date_formats: vec!["%d/%m/%Y".to_string()],
            split_year_dates: false,
            period_boundary_pattern: default_period_boundary_pattern(),
            carried_forward_pattern: default_carried_forward_pattern(),
            period_pattern: None,
            columns: Vec::new(),
            default_thresholds: None,
            classification_strategy: ClassificationStrategy::ColumnPosition,
            classification: ClassificationConfig::default(),
            skip_patterns: Vec::new(),
            fx_markers: Vec::new(),
            allow_missing_balance: false,
            balance_only_rows: false,
            allow_both_directions: false,
            x_tolerance: default_x_tolerance(),
            y_tolerance: default_y_tolerance(),
            header_scan_lines: default_header_scan_lines(),
            require_header_per_page: false,
            transaction_types: BTreeMap::new(),
        }
    }
}

impl BankProfile {
    /// Load a profile from a TOML descriptor.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read bank profile: {}", path.display()))?;

        let profile: BankProfile = toml::from_str(&content)
            .with_context(|| format!("Failed to parse bank profile: {}", path.display()))?;

        Ok(profile)
    }

    /// Check the profile is internally usable before a parse starts.
    ///
    /// Regex compilation is re-done by the components that own the
    /// patterns; this front-loads the failures so a bad descriptor is
    /// rejected as `ProfileInvalid` rather than surfacing mid-parse.
    pub fn validate(&self) -> Result<(), ParseError> {
        if self.name.is_empty() {
            return Err(ParseError::ProfileInvalid("profile has no name".into()));
        }
        if self.date_formats.is_empty() && !self.split_year_dates {
            return Err(ParseError::ProfileInvalid(format!(
                "{}: no date formats configured",
                self.name
            )));
        }

        for (label, pattern) in [
            ("period_boundary_pattern", Some(&self.period_boundary_pattern)),
            ("carried_forward_pattern", Some(&self.carried_forward_pattern)),
            ("period_pattern", self.period_pattern.as_ref()),
        ] {
            if let Some(pattern) = pattern {
                Regex::new(pattern).map_err(|e| {
                    ParseError::ProfileInvalid(format!("{}: bad {label}: {e}", self.name))
                })?;
            }
        }
        for pattern in &self.skip_patterns {
            Regex::new(pattern).map_err(|e| {
                ParseError::ProfileInvalid(format!("{}: bad skip pattern: {e}", self.name))
            })?;
        }

        match self.classification_strategy {
            ClassificationStrategy::ColumnPosition | ClassificationStrategy::Hybrid => {
                if self.columns.is_empty() && self.default_thresholds.is_none() {
                    return Err(ParseError::ProfileInvalid(format!(
                        "{}: position classification needs columns or default_thresholds",
                        self.name
                    )));
                }
            }
            ClassificationStrategy::TypeCode => {
                if self.classification.money_in_codes.is_empty()
                    && self.classification.money_out_codes.is_empty()
                {
                    return Err(ParseError::ProfileInvalid(format!(
                        "{}: type_code classification needs code lists",
                        self.name
                    )));
                }
            }
            ClassificationStrategy::Keyword => {
                if self.classification.money_in_keywords.is_empty()
                    && self.classification.money_out_keywords.is_empty()
                {
                    return Err(ParseError::ProfileInvalid(format!(
                        "{}: keyword classification needs keyword lists",
                        self.name
                    )));
                }
            }
        }

        for key in self.transaction_types.keys() {
            if TransactionType::from_key(key).is_none() {
                return Err(ParseError::ProfileInvalid(format!(
                    "{}: unknown transaction type key '{key}'",
                    self.name
                )));
            }
        }

        Ok(())
    }

    /// Classify a description against the profile's transaction-type
    /// keyword lists.
    pub fn detect_transaction_type(&self, description: &str) -> TransactionType {
        let lowered = description.to_lowercase();
        for (key, keywords) in &self.transaction_types {
            if keywords.iter().any(|kw| lowered.contains(&kw.to_lowercase())) {
                if let Some(kind) = TransactionType::from_key(key) {
                    return kind;
                }
            }
        }
        TransactionType::Other
    }
}

/// Read-only collection of bank profiles, loaded once at startup and
/// shared by reference across parses.
#[derive(Debug, Default)]
pub struct ProfileRegistry {
    profiles: BTreeMap<String, BankProfile>,
}

impl ProfileRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every `*.toml` descriptor in a directory.
    pub fn load_dir(dir: &Path) -> Result<Self> {
        let mut registry = Self::new();

        let entries = std::fs::read_dir(dir)
            .with_context(|| format!("Failed to read profile directory: {}", dir.display()))?;

        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("toml") {
                continue;
            }
            let profile = BankProfile::load(&path)?;
            profile
                .validate()
                .with_context(|| format!("Invalid profile: {}", path.display()))?;
            tracing::debug!(bank = %profile.name, "Loaded bank profile");
            registry.insert(profile);
        }

        tracing::info!(count = registry.len(), "Loaded bank profiles");
        Ok(registry)
    }

    pub fn insert(&mut self, profile: BankProfile) {
        self.profiles.insert(profile.name.to_lowercase(), profile);
    }

    pub fn get(&self, name: &str) -> Option<&BankProfile> {
        self.profiles.get(&name.to_lowercase())
    }

    /// Match profile identifiers against a statement's header text.
    ///
    /// Only the first 2000 characters are searched so transfers that
    /// mention another bank's name deep in the ledger cannot misidentify
    /// the statement.
    pub fn detect(&self, text: &str) -> Option<&BankProfile> {
        let header: String = text.chars().take(2000).collect::<String>().to_lowercase();
        self.profiles.values().find(|profile| {
            profile
                .identifiers
                .iter()
                .any(|id| header.contains(&id.to_lowercase()))
        })
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.profiles.values().map(|p| p.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}
