use hps_core::errors::{ErrorInfo, HpsError};
use hps_core::SweepMethod;

fn sample_info(code: &str, message: &str) -> ErrorInfo {
    ErrorInfo::new(code, message)
        .with_context("sweep_id", "1")
        .with_context("reason", "example")
}

#[test]
fn method_error_surface() {
    let err = "bogus".parse::<SweepMethod>().unwrap_err();
    assert!(matches!(err, HpsError::Method(_)));
    assert_eq!(err.info().code, "invalid-method");
    assert_eq!(err.info().context.get("method").map(String::as_str), Some("bogus"));
    assert!(!err.is_retryable());
}

#[test]
fn not_found_error_surface() {
    let err = HpsError::sweep_not_found(42);
    assert_eq!(err.info().code, "sweep-not-found");
    assert_eq!(err.info().context.get("sweep_id").map(String::as_str), Some("42"));

    let err = HpsError::run_not_found(7);
    assert_eq!(err.info().code, "run-not-found");
}

#[test]
fn overflow_error_surface() {
    let err = HpsError::Overflow(sample_info("combination-overflow", "too many combinations"));
    assert_eq!(err.info().code, "combination-overflow");
    assert!(!err.is_retryable());
}

#[test]
fn storage_error_is_retryable() {
    let err = HpsError::Storage(sample_info("sqlite-busy", "database is locked"));
    assert!(err.is_retryable());
    assert!(err.info().context.contains_key("reason"));
}

#[test]
fn display_includes_context_and_hint() {
    let err = HpsError::Space(sample_info("empty-candidates", "no values").with_hint("add one"));
    let rendered = err.to_string();
    assert!(rendered.starts_with("space error: no values (code: empty-candidates)"));
    assert!(rendered.contains("reason=example"));
    assert!(rendered.ends_with("hint: add one"));
}

#[test]
fn errors_serialize_with_family_tag() {
    let err = HpsError::Config(ErrorInfo::new("busy-timeout", "must be positive"));
    let json = serde_json::to_value(&err).expect("serialize");
    assert_eq!(json["family"], "Config");
    assert_eq!(json["detail"]["code"], "busy-timeout");
}
