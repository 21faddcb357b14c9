//! The per-line event loop that turns reconstructed lines into
//! transactions, and the orchestrator gluing every component together.

mod state;

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::NaiveDate;
use regex::Regex;
use rust_decimal::Decimal;

use crate::amounts::{AmountExtractor, AmountHit};
use crate::classify::{Classifier, RowContext};
use crate::dates::{DateEngine, DateScan};
use crate::error::ParseError;
use crate::layout::{ColumnTracker, LineReconstructor};
use crate::models::{
    score_confidence, Line, PrintedTotals, StatementResult, TokenSource, Transaction,
    TransactionType, Warning, WarningKind,
};
use crate::profile::BankProfile;
use crate::reconcile::Reconciler;
use crate::skip::{SkipFilter, SummaryKind, SummaryMatcher};

use state::PartialTxn;

/// Per-call options; the profile stays immutable across parses.
#[derive(Debug, Clone, Default)]
pub struct ParseOptions {
    /// Fail the result when any period cannot be reconciled.
    pub require_strict: bool,
    /// Statement period for year inference, when the caller knows it.
    pub statement_period: Option<(NaiveDate, NaiveDate)>,
    /// Cooperative cancellation flag, checked between lines.
    pub cancel: Option<Arc<AtomicBool>>,
}

impl ParseOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_strict(mut self) -> Self {
        self.require_strict = true;
        self
    }

    pub fn with_period(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.statement_period = Some((start, end));
        self
    }

    pub fn with_cancel(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }
}

/// Parse one statement's token stream against a bank profile.
///
/// All state lives in this call; the engine is reentrant and separate
/// statements may be parsed in parallel by the caller.
pub fn parse(
    source: &mut dyn TokenSource,
    profile: &BankProfile,
    options: &ParseOptions,
) -> Result<StatementResult, ParseError> {
    profile.validate()?;
    if options.is_cancelled() {
        return Err(ParseError::Cancelled);
    }

    let reconstructor = LineReconstructor::new(profile.y_tolerance, profile.x_tolerance);
    let (lines, layout_warnings) = reconstructor.reconstruct(source)?;

    let mut engine = StatementEngine::new(profile, options.statement_period)?;
    engine.warnings = layout_warnings;
    Ok(engine.run(lines, options))
}

struct StatementEngine<'a> {
    profile: &'a BankProfile,
    skip: SkipFilter,
    summary: SummaryMatcher,
    dates: DateEngine,
    amounts: AmountExtractor,
    classifier: Classifier,
    columns: ColumnTracker,
    boundary: Regex,
    carried_forward: Regex,
    period_capture: Option<Regex>,
    year_digit: Regex,
    rate_line: Regex,
    type_codes: BTreeSet<String>,

    partial: PartialTxn,
    carry_over: Vec<String>,
    transactions: Vec<Transaction>,
    warnings: Vec<Warning>,
    printed: Vec<PrintedTotals>,
    period_index: usize,
    last_date: Option<NaiveDate>,
}

impl<'a> StatementEngine<'a> {
    fn new(
        profile: &'a BankProfile,
        period: Option<(NaiveDate, NaiveDate)>,
    ) -> Result<Self, ParseError> {
        let compile = |label: &str, pattern: &str| {
            Regex::new(pattern).map_err(|e| {
                ParseError::ProfileInvalid(format!("{}: bad {label}: {e}", profile.name))
            })
        };

        let boundary = compile("period_boundary_pattern", &profile.period_boundary_pattern)?;
        let carried_forward =
            compile("carried_forward_pattern", &profile.carried_forward_pattern)?;
        let period_capture = profile
            .period_pattern
            .as_deref()
            .map(|p| compile("period_pattern", p))
            .transpose()?;
        let year_digit = compile("year digit pattern", r"^\s*(\d)(?:\s+(\S.*))?\s*$")?;
        let rate_line = compile("rate pattern", r"(?i)\brate:")?;

        // Directional codes plus any short single-token keywords from the
        // type map (codes like CHQ that carry a type but no direction).
        let type_codes: BTreeSet<String> = profile
            .classification
            .money_in_codes
            .iter()
            .chain(&profile.classification.money_out_codes)
            .chain(
                profile
                    .transaction_types
                    .values()
                    .flatten()
                    .filter(|kw| kw.len() <= 4 && !kw.contains(' ')),
            )
            .map(|c| c.to_uppercase())
            .collect();

        Ok(Self {
            profile,
            skip: SkipFilter::new(profile)?,
            summary: SummaryMatcher::new()?,
            dates: DateEngine::new(profile, period)?,
            amounts: AmountExtractor::new(profile)?,
            classifier: Classifier::for_profile(profile)?,
            columns: ColumnTracker::new(profile)?,
            boundary,
            carried_forward,
            period_capture,
            year_digit,
            rate_line,
            type_codes,
            partial: PartialTxn::default(),
            carry_over: Vec::new(),
            transactions: Vec::new(),
            warnings: Vec::new(),
            printed: vec![PrintedTotals::default()],
            period_index: 0,
            last_date: None,
        })
    }

    fn run(mut self, lines: Vec<Line>, options: &ParseOptions) -> StatementResult {
        let mut partial_result = false;
        let mut iter = lines.into_iter();
        // Single re-queue slot for trailing text split off a consumed
        // line; processed before the next stream line.
        let mut requeued: Option<Line> = None;

        loop {
            let line = match requeued.take().or_else(|| iter.next()) {
                Some(line) => line,
                None => break,
            };
            if options.is_cancelled() {
                tracing::info!("Parse cancelled; returning partial result");
                partial_result = true;
                break;
            }
            self.process_line(&line, &mut requeued);
        }

        self.flush();
        self.finish(options, partial_result)
    }

    fn process_line(&mut self, line: &Line, requeued: &mut Option<Line>) {
        let text = line.text.clone();

        if self.try_capture_period(&text) {
            return;
        }

        // Period boundaries and summary rows are read before the skip
        // filter so their balances feed statement metadata even when the
        // same line matches a noise pattern.
        if self.boundary.is_match(&text) {
            self.handle_period_boundary(line);
            return;
        }
        if self.carried_forward.is_match(&text) {
            self.handle_carried_forward(&text);
            return;
        }
        if let Some(kind) = self.summary.classify(&text) {
            self.capture_summary(kind, &text);
            return;
        }

        if self.skip.should_skip(&text) {
            tracing::trace!(line = line.index, "Skipped noise line");
            return;
        }

        let (was_header, header_warning) = self.columns.observe(line);
        if let Some(warning) = header_warning {
            self.warnings.push(warning);
        }
        if was_header {
            return;
        }

        // A line opening with a complete date always starts a new
        // transaction, even while a year digit is pending.
        match self.dates.scan_line_start(&text) {
            DateScan::Full { date, end, warning } => {
                self.start_transaction(line, date, end, warning);
                return;
            }
            DateScan::Split { prefix, end } => {
                self.start_split(line, prefix, end);
                return;
            }
            DateScan::Invalid { message } => {
                self.warnings
                    .push(Warning::new(WarningKind::UnparseableDate, message).with_page(line.page_index));
            }
            DateScan::None => {}
        }

        if self.partial.pending_year_digit() {
            if self.try_complete_year(line, requeued) {
                return;
            }
        }

        self.absorb_content(line);
    }

    /// Capture the statement period from a header line when the caller
    /// did not supply one. Returns true when the line was the period
    /// header, which is metadata rather than ledger content.
    fn try_capture_period(&mut self, text: &str) -> bool {
        if self.dates.period().is_some() {
            return false;
        }
        let Some(regex) = &self.period_capture else {
            return false;
        };
        let Some(caps) = regex.captures(text) else {
            return false;
        };
        let (Some(start), Some(end)) = (caps.get(1), caps.get(2)) else {
            return false;
        };
        match (
            parse_period_date(start.as_str()),
            parse_period_date(end.as_str()),
        ) {
            (Some(start), Some(end)) => {
                tracing::debug!(%start, %end, "Captured statement period");
                self.dates.set_period((start, end));
                true
            }
            _ => false,
        }
    }

    fn start_transaction(
        &mut self,
        line: &Line,
        date: NaiveDate,
        end: usize,
        warning: Option<WarningKind>,
    ) {
        self.flush();
        self.last_date = Some(date);
        self.partial = PartialTxn::start_full(date, line.page_index, line.index);
        self.partial.date_warning = warning;
        self.attach_carry_over();

        let rest = line.slice_from(end.min(line.text.len()));
        if !rest.is_blank() {
            self.absorb_content(&rest);
        }
    }

    fn start_split(&mut self, line: &Line, prefix: String, end: usize) {
        self.flush();
        self.partial = PartialTxn::start_split(prefix, line.page_index, line.index);
        // Carry-over attaches only once the date is fully formed.

        let rest = line.slice_from(end.min(line.text.len()));
        if !rest.is_blank() {
            self.absorb_content(&rest);
        }
    }

    /// Consume a lone leading digit to finish a split-year date.
    fn try_complete_year(&mut self, line: &Line, requeued: &mut Option<Line>) -> bool {
        let Some(caps) = self.year_digit.captures(&line.text) else {
            return false;
        };
        let Some(digit) = caps.get(1).and_then(|m| m.as_str().chars().next()) else {
            return false;
        };

        let Some(prefix) = self.partial.split_prefix.take() else {
            return false;
        };
        match self.dates.complete_split(&prefix, digit) {
            Some(date) => {
                self.partial.date = Some(date);
                self.partial.date_warning = self.dates.check_window(date);
                self.last_date = Some(date);
                self.attach_carry_over();
                if self.partial.is_emittable_now(self.profile) {
                    self.emit();
                }
            }
            None => {
                self.warnings.push(
                    Warning::new(
                        WarningKind::UnparseableDate,
                        format!("could not complete split date '{prefix}{digit}'"),
                    )
                    .with_page(line.page_index),
                );
                self.discard_partial();
            }
        }

        // Trailing text on the digit line belongs to the transaction
        // body; re-queue it for ordinary classification.
        if let Some(trailing) = caps.get(2) {
            *requeued = Some(line.slice_from(trailing.start()));
        }
        true
    }

    /// Handle description, FX annotations and amounts on one line.
    fn absorb_content(&mut self, line: &Line) {
        let text = &line.text;
        let has_fx_amount = self.amounts.has_foreign_marker(text);
        let is_rate = !has_fx_amount && self.rate_line.is_match(text);
        let is_fx = has_fx_amount || is_rate;

        if is_fx && !self.partial.started() {
            // FX annotation in the quiet window after an emit: it belongs
            // to the next transaction, like any other carry-over line.
            self.carry_over.push(text.trim().to_string());
            return;
        }
        if is_fx {
            self.attach_carry_over();
        }
        if is_rate {
            // Conversion-rate lines are pure narrative; their figures are
            // exchange rates, not amounts.
            self.partial.description_lines.push(text.trim().to_string());
            return;
        }

        let hits = self.amounts.extract(line);

        if hits.is_empty() && !is_fx {
            let stripped = text.trim();
            if stripped.is_empty() {
                return;
            }
            if self.partial.started() {
                self.partial.description_lines.push(stripped.to_string());
            } else {
                // Quiet window between an emit and the next date: this
                // line describes the next transaction.
                self.carry_over.push(stripped.to_string());
            }
            return;
        }

        if !self.partial.started() {
            tracing::debug!(
                line = line.index,
                "amount-bearing line outside any transaction; ignored"
            );
            return;
        }

        let prior_desc_only = self.partial.desc_only_so_far();

        let mut desc = strip_amount_spans(text, &hits);
        if self.partial.type_code.is_none() {
            if let Some((code, rest)) = self.take_type_code(&desc) {
                self.partial.type_code = Some(code);
                desc = rest;
            }
        }
        let trimmed = desc.trim();
        if !trimmed.is_empty() {
            self.partial.description_lines.push(trimmed.to_string());
        }

        if !hits.is_empty() {
            self.partial.amounts.extend(hits);
            self.reclassify(prior_desc_only);
        }

        if self.partial.is_emittable_now(self.profile) {
            self.emit();
        }
    }

    /// Re-run classification over every amount collected so far.
    fn reclassify(&mut self, prior_desc_only: bool) {
        let description = self.partial.description();
        let ctx = RowContext {
            amounts: &self.partial.amounts,
            description: &description,
            type_code: self.partial.type_code.as_deref(),
            columns: self.columns.model(),
            prior_desc_only,
        };
        let row = self.classifier.classify(ctx);
        self.partial.money_in = row.money_in;
        self.partial.money_out = row.money_out;
        self.partial.balance = row.balance;
        self.partial.class_warnings = row.warnings;
    }

    fn take_type_code(&self, text: &str) -> Option<(String, String)> {
        if self.type_codes.is_empty() {
            return None;
        }
        let trimmed = text.trim_start();
        let token_end = trimmed
            .find(char::is_whitespace)
            .unwrap_or(trimmed.len());
        let token = trimmed[..token_end].to_uppercase();
        if self.type_codes.contains(&token) {
            Some((token, trimmed[token_end..].to_string()))
        } else {
            None
        }
    }

    fn attach_carry_over(&mut self) {
        if self.carry_over.is_empty() {
            return;
        }
        let buffered = std::mem::take(&mut self.carry_over);
        tracing::debug!(lines = buffered.len(), "Attached carried-over description");
        self.partial.description_lines.extend(buffered);
    }

    /// Emit the current transaction if it can stand alone, otherwise
    /// discard it with a warning.
    fn flush(&mut self) {
        if self.partial.is_emittable_on_flush(self.profile) {
            self.emit();
        } else if self.partial.started() {
            self.warnings.push(
                Warning::new(
                    WarningKind::DiscardedFragment,
                    format!(
                        "discarded incomplete transaction fragment '{}'",
                        self.partial.description()
                    ),
                )
                .with_page(self.partial.source_page),
            );
            self.discard_partial();
        } else {
            self.partial = PartialTxn::default();
        }
    }

    fn discard_partial(&mut self) {
        tracing::warn!(
            page = self.partial.source_page,
            line = self.partial.source_line_index,
            "Discarding incomplete transaction fragment"
        );
        self.partial = PartialTxn::default();
    }

    fn emit(&mut self) {
        let partial = std::mem::take(&mut self.partial);
        let Some(date) = partial.date else {
            return;
        };

        let description = partial.description();
        let transaction_type = self.detect_type(partial.type_code.as_deref(), &description);

        let mut txn = Transaction::new(date, description);
        txn.money_in = partial.money_in;
        txn.money_out = partial.money_out;
        txn.balance = partial.balance;
        txn.type_code = partial.type_code;
        txn.transaction_type = transaction_type;
        txn.source_page = partial.source_page;
        txn.source_line_index = partial.source_line_index;
        txn.confidence = score_confidence(&txn);

        let index = self.transactions.len();
        if let Some(kind) = partial.date_warning {
            let message = match kind {
                WarningKind::CrossYearDate => {
                    format!("date {} resolved across a year boundary", txn.date)
                }
                _ => format!("date {} falls outside the statement period", txn.date),
            };
            self.warnings
                .push(Warning::new(kind, message).with_transaction(index));
        }
        for warning in partial.class_warnings {
            self.warnings.push(warning.with_transaction(index));
        }

        tracing::debug!(
            date = %txn.date,
            money_in = %txn.money_in,
            money_out = %txn.money_out,
            "Emitted transaction"
        );
        self.last_date = Some(date);
        self.transactions.push(txn);
    }

    fn detect_type(&self, type_code: Option<&str>, description: &str) -> TransactionType {
        if let Some(code) = type_code {
            let from_code = self.profile.detect_transaction_type(code);
            if from_code != TransactionType::Other {
                return from_code;
            }
        }
        self.profile.detect_transaction_type(description)
    }

    /// A brought-forward line: the opening marker on first sight, a
    /// synthetic period break afterwards.
    fn handle_period_boundary(&mut self, line: &Line) {
        self.flush();

        let printed_balance = self.amounts.extract_values(&line.text).last().copied();
        let date = match self.dates.scan_line_start(&line.text) {
            DateScan::Full { date, .. } => Some(date),
            _ => None,
        }
        .or(self.last_date)
        .or_else(|| self.dates.period().map(|(start, _)| start))
        .unwrap_or_default();

        // Consecutive boundary lines describe the same break; keep one
        // marker and adopt the later printed balance if the first had none.
        if let Some(last) = self.transactions.last_mut() {
            if last.is_marker() {
                if last.balance.is_none() {
                    last.balance = printed_balance;
                }
                return;
            }
        }

        let first = self.transactions.is_empty();
        if !first {
            self.period_index += 1;
            self.printed.push(PrintedTotals::default());
        }
        let kind = if first {
            TransactionType::BroughtForward
        } else {
            TransactionType::PeriodBreak
        };

        let hits = self.amounts.extract(line);
        let description = strip_amount_spans(&line.text, &hits).trim().to_string();

        let mut marker = Transaction::new(date, description).with_type(kind);
        marker.balance = printed_balance;
        marker.source_page = line.page_index;
        marker.source_line_index = line.index;

        tracing::info!(
            period = self.period_index,
            balance = ?printed_balance,
            "Period boundary"
        );
        self.last_date = Some(date);
        self.transactions.push(marker);
    }

    fn handle_carried_forward(&mut self, text: &str) {
        self.flush();
        if let Some(balance) = self.amounts.extract_values(text).last().copied() {
            let totals = &mut self.printed[self.period_index];
            totals.closing_balance.get_or_insert(balance);
            tracing::debug!(period = self.period_index, %balance, "Carried-forward balance");
        }
    }

    fn capture_summary(&mut self, kind: SummaryKind, text: &str) {
        let Some(value) = self.amounts.extract_values(text).last().copied() else {
            return;
        };
        let totals = &mut self.printed[self.period_index];
        match kind {
            SummaryKind::TotalIn => {
                totals.total_in.get_or_insert(value);
            }
            SummaryKind::TotalOut => {
                totals.total_out.get_or_insert(value);
            }
            SummaryKind::ClosingBalance => {
                totals.closing_balance.get_or_insert(value);
            }
        }
    }

    fn finish(mut self, options: &ParseOptions, partial: bool) -> StatementResult {
        let periods = Reconciler::new().run(&mut self.transactions, &self.printed, &mut self.warnings);

        let opening_balance = periods.first().and_then(|p| p.opening_balance);
        let closing_balance = self.transactions.iter().rev().find_map(|t| t.balance);
        let total_money_in: Decimal = self.transactions.iter().map(|t| t.money_in).sum();
        let total_money_out: Decimal = self.transactions.iter().map(|t| t.money_out).sum();

        let scored: Vec<u32> = self
            .transactions
            .iter()
            .filter(|t| !t.is_marker())
            .map(|t| t.confidence as u32)
            .collect();
        let confidence_overall = if scored.is_empty() {
            0
        } else {
            let count = scored.len() as u32;
            ((scored.iter().sum::<u32>() + count / 2) / count).min(100) as u8
        };

        let reconciled = periods.iter().all(|p| p.reconciled);
        let success = reconciled || !options.require_strict;

        tracing::info!(
            transactions = self.transactions.len(),
            periods = periods.len(),
            warnings = self.warnings.len(),
            reconciled,
            "Parse complete"
        );

        StatementResult {
            transactions: self.transactions,
            periods,
            opening_balance,
            closing_balance,
            total_money_in,
            total_money_out,
            warnings: self.warnings,
            confidence_overall,
            partial,
            success,
        }
    }
}

/// Remove extracted amount spans from a line's text, leaving the
/// narrative (and any FX annotation, whose figures were never extracted).
fn strip_amount_spans(text: &str, hits: &[AmountHit]) -> String {
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    for hit in hits {
        if hit.start > cursor {
            out.push_str(&text[cursor..hit.start]);
        }
        cursor = hit.end.max(cursor);
    }
    if cursor < text.len() {
        out.push_str(&text[cursor..]);
    }
    out
}

fn parse_period_date(raw: &str) -> Option<NaiveDate> {
    for format in ["%d/%m/%Y", "%d-%m-%Y", "%d %b %Y", "%d %B %Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(raw.trim(), format) {
            return Some(date);
        }
    }
    None
}
