//! The shipped profile descriptors must load, validate and detect.

mod support;

use bankproof::profile::{ClassificationStrategy, ProfileRegistry};
use std::path::Path;

#[test]
fn test_shipped_profiles_load_and_validate() {
    let registry = ProfileRegistry::load_dir(Path::new("profiles")).unwrap();
    assert_eq!(registry.len(), 3);

    let monzo = registry.get("monzo").unwrap();
    assert!(monzo.split_year_dates);
    assert_eq!(monzo.classification_strategy, ClassificationStrategy::Hybrid);
    assert!(monzo.fx_markers.iter().any(|c| c == "USD"));

    let santander = registry.get("santander").unwrap();
    assert_eq!(
        santander.classification_strategy,
        ClassificationStrategy::ColumnPosition
    );
    assert_eq!(santander.columns.len(), 3);

    let natwest = registry.get("natwest").unwrap();
    assert_eq!(
        natwest.classification_strategy,
        ClassificationStrategy::TypeCode
    );
    assert!(natwest.allow_missing_balance);
}

#[test]
fn test_detection_from_header_text() {
    let registry = ProfileRegistry::load_dir(Path::new("profiles")).unwrap();

    let header = "Monzo Bank Limited\nPersonal Account statement\n01/05/2024 - 31/05/2024";
    let detected = registry.detect(header).unwrap();
    assert_eq!(detected.name, "monzo");

    assert!(registry.detect("Some other bank plc").is_none());
}
