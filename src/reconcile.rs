use rust_decimal::Decimal;

use crate::models::{Period, PrintedTotals, Transaction, Warning, WarningKind};

/// Per-period balance validation and self-healing.
///
/// Statements misprint in two known ways: a row's direction is flipped
/// relative to its balance movement, and the first row after a
/// brought-forward repeats the brought-forward balance, throwing every
/// subsequent printed balance off. The reconciler corrects the first by
/// swapping direction when that strictly improves the error, and the
/// second by recomputing the rest of the period from the running balance
/// (at most one such cascade per period).
pub struct Reconciler {
    epsilon: Decimal,
    totals_tolerance: Decimal,
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::new()
    }
}

impl Reconciler {
    pub fn new() -> Self {
        Self {
            epsilon: Decimal::new(1, 2),
            totals_tolerance: Decimal::new(50, 2),
        }
    }

    /// Reconcile all periods in place and return their summaries.
    ///
    /// `printed` carries per-period summary figures captured from
    /// non-ledger rows, aligned by period index.
    pub fn run(
        &self,
        transactions: &mut [Transaction],
        printed: &[PrintedTotals],
        warnings: &mut Vec<Warning>,
    ) -> Vec<Period> {
        let mut periods = segment_periods(transactions);

        for period in &mut periods {
            self.reconcile_period(transactions, period, warnings);
            self.assert_period_totals(
                transactions,
                period,
                printed.get(period.index),
                warnings,
            );
        }

        periods
    }

    fn reconcile_period(
        &self,
        transactions: &mut [Transaction],
        period: &mut Period,
        warnings: &mut Vec<Warning>,
    ) {
        let mut prev_balance = period.opening_balance;
        let mut cascade = false;
        let mut rows_seen = 0usize;

        for index in period.start..period.end {
            let txn = &mut transactions[index];

            if txn.is_marker() {
                if let Some(balance) = txn.balance {
                    prev_balance = Some(balance);
                }
                continue;
            }
            rows_seen += 1;

            let mut computed = txn.signed_amount();

            if cascade {
                // Printed balances are untrustworthy for the rest of this
                // period; recompute from the running balance.
                if let Some(prev) = prev_balance {
                    let recalculated = prev + computed;
                    txn.balance = Some(recalculated);
                    prev_balance = Some(recalculated);
                }
                continue;
            }

            let Some(prev) = prev_balance else {
                // No baseline yet: the first balance we see becomes it.
                if txn.balance.is_some() {
                    prev_balance = txn.balance;
                    if period.opening_balance.is_none() {
                        period.opening_balance = txn.balance.map(|b| b - computed);
                    }
                }
                continue;
            };

            let Some(balance) = txn.balance else {
                // Row without a printed balance: carry the running balance.
                prev_balance = Some(prev + computed);
                continue;
            };

            let expected = balance - prev;
            if (expected - computed).abs() <= self.epsilon {
                prev_balance = Some(balance);
                continue;
            }

            // Direction swap, accepted only on strict improvement.
            let swapped = -computed;
            if (expected - swapped).abs() < (expected - computed).abs() {
                std::mem::swap(&mut txn.money_in, &mut txn.money_out);
                computed = swapped;
                warnings.push(
                    Warning::new(
                        WarningKind::DirectionSwapped,
                        format!(
                            "swapped direction of '{}' to match balance movement",
                            truncate(&txn.description)
                        ),
                    )
                    .with_transaction(index),
                );
                tracing::debug!(index, "Swapped transaction direction");
                if (expected - computed).abs() <= self.epsilon {
                    prev_balance = Some(balance);
                    continue;
                }
            }

            // Brought-forward quirk: the first row of a period printing
            // the unchanged brought-forward balance while carrying an
            // amount. The printed balances that follow are off by the
            // same shift.
            if rows_seen == 1 && expected.abs() <= self.epsilon && !computed.is_zero() {
                let corrected = prev + computed;
                txn.balance = Some(corrected);
                prev_balance = Some(corrected);
                cascade = true;
                period.cascade_recalculated = true;
                warnings.push(
                    Warning::new(
                        WarningKind::CascadeRecalculated,
                        format!(
                            "period {}: first row repeats brought-forward balance; recalculating period balances",
                            period.index
                        ),
                    )
                    .with_transaction(index),
                );
                tracing::info!(period = period.index, "Cascade recalculation engaged");
                continue;
            }

            period.reconciled = false;
            warnings.push(
                Warning::new(
                    WarningKind::BalanceMismatch,
                    format!(
                        "balance mismatch: expected delta {expected}, amounts give {computed}"
                    ),
                )
                .with_transaction(index),
            );
            prev_balance = Some(balance);
        }

        period.closing_balance = prev_balance;

        if !period.reconciled {
            warnings.push(Warning::new(
                WarningKind::PeriodUnreconciled,
                format!("period {} failed reconciliation", period.index),
            ));
        }
    }

    /// Soft assertions against the statement's printed summary figures.
    fn assert_period_totals(
        &self,
        transactions: &[Transaction],
        period: &Period,
        printed: Option<&PrintedTotals>,
        warnings: &mut Vec<Warning>,
    ) {
        let Some(printed) = printed else { return };

        let rows = &transactions[period.start..period.end];
        let total_in: Decimal = rows.iter().map(|t| t.money_in).sum();
        let total_out: Decimal = rows.iter().map(|t| t.money_out).sum();

        if let Some(expected) = printed.total_in {
            if (total_in - expected).abs() > self.totals_tolerance {
                warnings.push(Warning::new(
                    WarningKind::TotalsMismatch,
                    format!(
                        "period {}: money in sums to {total_in}, statement prints {expected}",
                        period.index
                    ),
                ));
            }
        }
        if let Some(expected) = printed.total_out {
            if (total_out - expected).abs() > self.totals_tolerance {
                warnings.push(Warning::new(
                    WarningKind::TotalsMismatch,
                    format!(
                        "period {}: money out sums to {total_out}, statement prints {expected}",
                        period.index
                    ),
                ));
            }
        }
        if let (Some(closing), Some(printed_closing)) =
            (period.closing_balance, printed.closing_balance)
        {
            if (closing - printed_closing).abs() > self.epsilon {
                warnings.push(Warning::new(
                    WarningKind::ClosingBalanceOverride,
                    format!(
                        "period {}: ledger closes at {closing}, statement prints {printed_closing}; using ledger value",
                        period.index
                    ),
                ));
            }
        }
    }
}

/// Split the transaction list into periods at `PeriodBreak` markers.
///
/// A break marker opens the period it precedes; its printed balance is
/// that period's brought-forward.
fn segment_periods(transactions: &[Transaction]) -> Vec<Period> {
    let mut periods = Vec::new();
    let mut current = Period::new(0, 0);

    for (index, txn) in transactions.iter().enumerate() {
        if txn.transaction_type == crate::models::TransactionType::PeriodBreak
            && index > current.start
        {
            current.end = index;
            periods.push(current);
            current = Period::new(periods.len(), index);
        }
        if txn.is_marker() && current.opening_balance.is_none() && index == current.start {
            current.opening_balance = txn.balance;
        }
    }

    current.end = transactions.len();
    periods.push(current);
    periods
}

fn truncate(description: &str) -> &str {
    let end = description
        .char_indices()
        .nth(40)
        .map(|(i, _)| i)
        .unwrap_or(description.len());
    &description[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TransactionType;
    use chrono::NaiveDate;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    fn marker(kind: TransactionType, balance: &str) -> Transaction {
        Transaction::new(date(1), "BALANCE BROUGHT FORWARD")
            .with_type(kind)
            .with_balance(dec(balance))
    }

    fn row(day: u32, money_in: &str, money_out: &str, balance: &str) -> Transaction {
        Transaction::new(date(day), format!("row {day}"))
            .with_money_in(dec(money_in))
            .with_money_out(dec(money_out))
            .with_balance(dec(balance))
    }

    #[test]
    fn test_consistent_period_passes_untouched() {
        let mut txns = vec![
            marker(TransactionType::BroughtForward, "1000.00"),
            row(2, "0.00", "100.00", "900.00"),
            row(3, "50.00", "0.00", "950.00"),
        ];
        let mut warnings = Vec::new();
        let periods = Reconciler::new().run(&mut txns, &[], &mut warnings);

        assert_eq!(periods.len(), 1);
        assert!(periods[0].reconciled);
        assert!(!periods[0].cascade_recalculated);
        assert_eq!(periods[0].opening_balance, Some(dec("1000.00")));
        assert_eq!(periods[0].closing_balance, Some(dec("950.00")));
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_direction_swap_applied() {
        let mut txns = vec![
            marker(TransactionType::BroughtForward, "1000.00"),
            row(2, "45.67", "0.00", "954.33"),
        ];
        let mut warnings = Vec::new();
        let periods = Reconciler::new().run(&mut txns, &[], &mut warnings);

        assert_eq!(txns[1].money_out, dec("45.67"));
        assert_eq!(txns[1].money_in, Decimal::ZERO);
        assert!(periods[0].reconciled);
        assert!(warnings
            .iter()
            .any(|w| w.kind == WarningKind::DirectionSwapped));
    }

    #[test]
    fn test_cascade_recalculation_after_brought_forward_quirk() {
        let mut txns = vec![
            marker(TransactionType::BroughtForward, "500.00"),
            // Misprinted: repeats the brought-forward balance.
            row(2, "0.00", "100.00", "500.00"),
            // Printed balances continue from the misprint.
            row(3, "0.00", "50.00", "450.00"),
        ];
        let mut warnings = Vec::new();
        let periods = Reconciler::new().run(&mut txns, &[], &mut warnings);

        assert_eq!(txns[1].balance, Some(dec("400.00")));
        assert_eq!(txns[2].balance, Some(dec("350.00")));
        assert!(periods[0].cascade_recalculated);
        assert!(periods[0].reconciled);
        assert!(warnings
            .iter()
            .any(|w| w.kind == WarningKind::CascadeRecalculated));
    }

    #[test]
    fn test_unresolvable_mismatch_keeps_pdf_balance() {
        let mut txns = vec![
            marker(TransactionType::BroughtForward, "1000.00"),
            row(2, "0.00", "100.00", "900.00"),
            row(3, "0.00", "10.00", "700.00"),
        ];
        let mut warnings = Vec::new();
        let periods = Reconciler::new().run(&mut txns, &[], &mut warnings);

        assert!(!periods[0].reconciled);
        assert_eq!(txns[2].balance, Some(dec("700.00")));
        assert!(warnings
            .iter()
            .any(|w| w.kind == WarningKind::BalanceMismatch && w.transaction_index == Some(2)));
        assert!(warnings
            .iter()
            .any(|w| w.kind == WarningKind::PeriodUnreconciled));
    }

    #[test]
    fn test_periods_segmented_at_break_markers() {
        let mut txns = vec![
            marker(TransactionType::BroughtForward, "100.00"),
            row(2, "0.00", "10.00", "90.00"),
            marker(TransactionType::PeriodBreak, "200.00"),
            row(10, "0.00", "20.00", "180.00"),
        ];
        let mut warnings = Vec::new();
        let periods = Reconciler::new().run(&mut txns, &[], &mut warnings);

        assert_eq!(periods.len(), 2);
        assert_eq!(periods[0].start, 0);
        assert_eq!(periods[0].end, 2);
        assert_eq!(periods[1].opening_balance, Some(dec("200.00")));
        assert!(periods.iter().all(|p| p.reconciled));
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_missing_balance_rows_carry_running_balance() {
        let mut txns = vec![
            marker(TransactionType::BroughtForward, "100.00"),
            Transaction::new(date(2), "fee").with_money_out(dec("5.00")),
            row(3, "0.00", "10.00", "85.00"),
        ];
        let mut warnings = Vec::new();
        let periods = Reconciler::new().run(&mut txns, &[], &mut warnings);

        assert!(periods[0].reconciled);
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_reconciliation_is_a_fixed_point() {
        let mut txns = vec![
            marker(TransactionType::BroughtForward, "1000.00"),
            row(2, "45.67", "0.00", "954.33"),
            row(3, "0.00", "100.00", "854.33"),
        ];
        let mut first_warnings = Vec::new();
        Reconciler::new().run(&mut txns, &[], &mut first_warnings);

        let snapshot = txns.clone();
        let mut second_warnings = Vec::new();
        let periods = Reconciler::new().run(&mut txns, &[], &mut second_warnings);

        assert_eq!(txns, snapshot);
        assert!(periods.iter().all(|p| p.reconciled));
        assert!(second_warnings
            .iter()
            .all(|w| w.kind != WarningKind::DirectionSwapped));
    }

    #[test]
    fn test_printed_totals_mismatch_warns() {
        let mut txns = vec![
            marker(TransactionType::BroughtForward, "100.00"),
            row(2, "0.00", "10.00", "90.00"),
        ];
        let printed = vec![PrintedTotals {
            total_in: Some(dec("500.00")),
            total_out: None,
            closing_balance: Some(dec("90.00")),
        }];
        let mut warnings = Vec::new();
        Reconciler::new().run(&mut txns, &printed, &mut warnings);

        assert!(warnings.iter().any(|w| w.kind == WarningKind::TotalsMismatch));
        assert!(warnings
            .iter()
            .all(|w| w.kind != WarningKind::ClosingBalanceOverride));
    }
}
