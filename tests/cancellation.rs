//! Cooperative cancellation: a flag tripped mid-stream yields a clean
//! partial result with everything emitted so far.

mod support;

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use bankproof::engine::{parse, ParseOptions};
use bankproof::error::ParseError;
use bankproof::models::VecTokenSource;
use support::{monzo_like, CancelAfter, StatementBuilder};

fn fixture() -> Vec<bankproof::models::Token> {
    StatementBuilder::new()
        .line(&[("07/08/2024", 0.0), ("Shop one", 15.0), ("-8.00", 80.0), ("92.00", 105.0)])
        .line(&[("08/08/2024", 0.0), ("Shop two", 15.0), ("-3.50", 80.0), ("88.50", 105.0)])
        .build()
}

#[test]
fn test_cancel_mid_stream_returns_partial_result() {
    let flag = Arc::new(AtomicBool::new(false));
    let mut source = CancelAfter::new(fixture(), 2, Arc::clone(&flag));
    let options = ParseOptions::new().with_cancel(Arc::clone(&flag));

    let result = parse(&mut source, &monzo_like(), &options).unwrap();
    assert!(result.partial);
    assert!(result.success);
    // Nothing beyond what was processed before the flag tripped.
    assert!(result.transactions.len() < 2);
}

#[test]
fn test_cancel_before_start_is_a_clean_error() {
    let flag = Arc::new(AtomicBool::new(true));
    let mut source = VecTokenSource::new(fixture());
    let options = ParseOptions::new().with_cancel(flag);

    let err = parse(&mut source, &monzo_like(), &options).unwrap_err();
    assert!(matches!(err, ParseError::Cancelled));
}
