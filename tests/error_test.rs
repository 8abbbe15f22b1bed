//! Tests for error types

use soup_scope::Error;
use std::error::Error as _;

#[test]
fn test_not_found_error() {
    let error = Error::NotFound {
        table: "experiment_3".to_string(),
    };
    let error_str = format!("{error}");
    assert!(error_str.contains("Not found"));
    assert!(error_str.contains("experiment_3"));
}

#[test]
fn test_schema_error() {
    let error = Error::Schema {
        table: "experiment_1".to_string(),
        expected: "[id: Int64]".to_string(),
        found: "[x: Utf8]".to_string(),
    };
    let error_str = format!("{error}");
    assert!(error_str.contains("Schema error"));
    assert!(error_str.contains("[id: Int64]"));
    assert!(error_str.contains("[x: Utf8]"));
    assert!(error_str.contains("Refusing to overwrite"));
}

#[test]
fn test_write_error() {
    let error = Error::Write("expression at position 0 is empty".to_string());
    let error_str = format!("{error}");
    assert!(error_str.contains("Write error"));
    assert!(error_str.contains("retry the whole persist call"));
}

#[test]
fn test_malformed_name_error() {
    let error = Error::MalformedName("experiment_abc".to_string());
    assert!(format!("{error}").contains("experiment_abc"));
}

#[test]
fn test_persist_failed_error() {
    let error = Error::PersistFailed {
        steps_run: 17,
        source: Box::new(Error::Write("disk full".to_string())),
    };
    let error_str = format!("{error}");
    assert!(error_str.contains("17 steps"));
    assert!(error_str.contains("disk full"));
    assert_eq!(error.steps_run(), Some(17));
    assert!(error.source().is_some());
}

#[test]
fn test_steps_run_absent_on_other_errors() {
    assert_eq!(Error::Simulation("boom".to_string()).steps_run(), None);
}

#[test]
fn test_storage_error() {
    let error = Error::StorageError("file not found".to_string());
    let error_str = format!("{error}");
    assert!(error_str.contains("Storage error"));
    assert!(error_str.contains("file not found"));
}

#[test]
fn test_invalid_input_error() {
    let error = Error::InvalidInput("table name 'a-b' is not an identifier".to_string());
    let error_str = format!("{error}");
    assert!(error_str.contains("Invalid input"));
    assert!(error_str.contains("a-b"));
}

#[test]
fn test_invalid_config_error() {
    let error = Error::InvalidConfig("palette must not be empty".to_string());
    assert!(format!("{error}").contains("Invalid configuration"));
}

#[test]
fn test_io_error_conversion() {
    let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
    let error: Error = io_error.into();
    let error_str = format!("{error}");
    assert!(error_str.contains("IO error"));
}

#[test]
fn test_json_error_conversion() {
    let json_error = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
    let error: Error = json_error.into();
    assert!(format!("{error}").contains("JSON error"));
}

#[test]
fn test_error_debug_format() {
    let error = Error::MalformedName("experiment_".to_string());
    let debug_str = format!("{error:?}");
    assert!(debug_str.contains("MalformedName"));
}
