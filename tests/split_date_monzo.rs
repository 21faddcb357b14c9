//! Split-year dates: `DD/MM/YYY` on one line, the final digit on a
//! later line, with trailing text on the digit line re-queued into the
//! transaction body.

mod support;

use bankproof::engine::ParseOptions;
use chrono::NaiveDate;
use support::{assert_core_invariants, dec, monzo_like, run, StatementBuilder};

#[test]
fn test_split_dates_reassemble_and_trailing_text_requeues() {
    let tokens = StatementBuilder::new()
        .line(&[("08/08/202", 0.0)])
        .line(&[("4", 0.0)])
        .line(&[("Merchant X", 10.0)])
        .line(&[("-30.00", 79.0), ("10.39", 105.0)])
        .line(&[("08/08/202", 0.0)])
        .line(&[("Another Merchant", 10.0)])
        .line(&[("4", 0.0), ("extra", 5.0)])
        .line(&[("-5.00", 80.0), ("5.39", 106.0)])
        .build();

    let result = run(&monzo_like(), tokens, &ParseOptions::new());
    assert_core_invariants(&result);

    assert_eq!(result.transactions.len(), 2, "{:?}", result.transactions);
    let expected_date = NaiveDate::from_ymd_opt(2024, 8, 8).unwrap();

    let first = &result.transactions[0];
    assert_eq!(first.date, expected_date);
    assert_eq!(first.description, "Merchant X");
    assert_eq!(first.money_out, dec("30.00"));
    assert_eq!(first.balance, Some(dec("10.39")));

    let second = &result.transactions[1];
    assert_eq!(second.date, expected_date);
    assert_eq!(second.description, "Another Merchant extra");
    assert_eq!(second.money_out, dec("5.00"));
    assert_eq!(second.balance, Some(dec("5.39")));
}

#[test]
fn test_inline_complete_date_wins_over_pending_year_digit() {
    // The second transaction starts with a complete date while the first
    // still waits for its year digit; the date must win and the orphaned
    // fragment is discarded with a warning.
    let tokens = StatementBuilder::new()
        .line(&[("08/08/202", 0.0)])
        .line(&[("Orphan fragment", 10.0)])
        .line(&[("09/08/2024", 0.0), ("Shop", 20.0)])
        .line(&[("-12.00", 79.0), ("88.00", 105.0)])
        .build();

    let result = run(&monzo_like(), tokens, &ParseOptions::new());
    assert_core_invariants(&result);

    assert_eq!(result.transactions.len(), 1);
    assert_eq!(
        result.transactions[0].date,
        NaiveDate::from_ymd_opt(2024, 8, 9).unwrap()
    );
    assert!(result
        .warnings
        .iter()
        .any(|w| w.kind == bankproof::models::WarningKind::DiscardedFragment));
}

#[test]
fn test_description_between_split_prefix_and_digit_is_kept() {
    // Layout B: date alone, description while the year digit is pending.
    let tokens = StatementBuilder::new()
        .line(&[("30/05/202", 0.0)])
        .line(&[("Coffee House", 10.0), ("-15.02", 78.0), ("19.23", 105.0)])
        .line(&[("4", 0.0)])
        .build();

    let result = run(&monzo_like(), tokens, &ParseOptions::new());
    assert_core_invariants(&result);

    assert_eq!(result.transactions.len(), 1);
    let txn = &result.transactions[0];
    assert_eq!(txn.date, NaiveDate::from_ymd_opt(2024, 5, 30).unwrap());
    assert_eq!(txn.description, "Coffee House");
    assert_eq!(txn.money_out, dec("15.02"));
    assert_eq!(txn.balance, Some(dec("19.23")));
}
