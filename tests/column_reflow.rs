//! Per-page column reflow: each page's header re-anchors the
//! money-in/out/balance thresholds, and comparisons stay inclusive on
//! the left column.

mod support;

use bankproof::engine::ParseOptions;
use chrono::NaiveDate;
use support::{assert_core_invariants, dec, run, santander_like, StatementBuilder};

#[test]
fn test_header_reflow_reclassifies_amounts_per_page() {
    let start = NaiveDate::from_ymd_opt(2024, 1, 9).unwrap();
    let end = NaiveDate::from_ymd_opt(2024, 2, 7).unwrap();

    let tokens = StatementBuilder::new()
        // Page 1 header: out right edge 65, in 85, balance 105.
        .line(&[("Money out", 56.0), ("Money in", 77.0), ("Balance", 98.0)])
        .line(&[("Balance brought forward", 10.0), ("1,000.00", 97.0)])
        .line(&[("9th Jan", 0.0), ("Refund", 20.0), ("20.00", 80.0), ("1,020.00", 97.0)])
        // Page 2 header shifts right: out 79, in 94, balance 117.
        .page_break()
        .line(&[("Money out", 70.0), ("Money in", 86.0), ("Balance", 110.0)])
        // Right edge exactly 94: the money-in column's own edge.
        .line(&[("10th Jan", 0.0), ("Payment received", 20.0), ("40.00", 89.0), ("1,060.00", 111.0)])
        .build();

    let options = ParseOptions::new().with_period(start, end);
    let result = run(&santander_like(), tokens, &options);
    assert_core_invariants(&result);

    assert_eq!(result.transactions.len(), 3, "{:?}", result.transactions);

    let page_one = &result.transactions[1];
    assert_eq!(page_one.money_in, dec("20.00"));
    assert_eq!(page_one.balance, Some(dec("1020.00")));

    // On page 1 thresholds, right edge 94 would have read as balance
    // territory's neighbour; page 2's header must place it in money in.
    let page_two = &result.transactions[2];
    assert_eq!(page_two.money_in, dec("40.00"));
    assert_eq!(page_two.money_out, dec("0.00"));
    assert_eq!(page_two.balance, Some(dec("1060.00")));
    assert_eq!(page_two.source_page, 1);

    assert!(result.periods.iter().all(|p| p.reconciled));
}

#[test]
fn test_amount_on_threshold_goes_to_left_column() {
    let start = NaiveDate::from_ymd_opt(2024, 1, 9).unwrap();
    let end = NaiveDate::from_ymd_opt(2024, 2, 7).unwrap();

    // Defaults: out 65, in 85 -> threshold at 75. Right edge exactly 75
    // classifies as money out.
    let tokens = StatementBuilder::new()
        .line(&[("Balance brought forward", 10.0), ("100.00", 98.0)])
        .line(&[("9th Jan", 0.0), ("Card payment", 20.0), ("10.00", 70.0), ("90.00", 98.0)])
        .build();

    let options = ParseOptions::new().with_period(start, end);
    let result = run(&santander_like(), tokens, &options);
    assert_core_invariants(&result);

    let txn = &result.transactions[1];
    assert_eq!(txn.money_out, dec("10.00"));
    assert_eq!(txn.money_in, dec("0.00"));
}
