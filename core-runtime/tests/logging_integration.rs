//! Integration tests for the logging system
//!
//! The global subscriber can only be installed once per process, so a single
//! test owns `init_logging` and checks both the first and the repeated call.

use bridge_traits::LogLevel;
use core_runtime::logging::{init_logging, redact_if_sensitive, strip_path, LogFormat, LoggingConfig};
use core_runtime::Error;

#[test]
fn test_init_logging_once_per_process() {
    let config = LoggingConfig::default()
        .with_format(LogFormat::Compact)
        .with_level(LogLevel::Debug);

    init_logging(config.clone()).unwrap();
    tracing::debug!(target: "core_catalog::query", page = 1u64, "fetch issued");

    let second = init_logging(config);
    assert!(matches!(second, Err(Error::Logging(_))));
}

#[test]
fn test_format_selection() {
    #[cfg(debug_assertions)]
    assert_eq!(LogFormat::default(), LogFormat::Pretty);

    #[cfg(not(debug_assertions))]
    assert_eq!(LogFormat::default(), LogFormat::Json);
}

#[test]
fn test_upload_file_names_are_logged_without_directories() {
    let picked = "/home/listener/Downloads/demo take 3.mp3";
    assert_eq!(strip_path(picked), "demo take 3.mp3");
    assert_eq!(redact_if_sensitive("file", strip_path(picked)), "demo take 3.mp3");
}

#[test]
fn test_credentials_never_reach_logs() {
    for field in ["api_key", "session_token", "Cookie", "password"] {
        assert_eq!(redact_if_sensitive(field, "value"), "[REDACTED]");
    }
}
