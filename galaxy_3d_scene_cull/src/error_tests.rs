//! Unit tests for error.rs
//!
//! Tests all Error variants and their implementations (Display, Debug, Clone, std::error::Error).

use crate::error::{Error, Result};

// ============================================================================
// ERROR DISPLAY TESTS
// ============================================================================

#[test]
fn test_invalid_config_display() {
    let err = Error::InvalidConfig("page_size must be > 0".to_string());
    let display = format!("{}", err);
    assert!(display.contains("Invalid configuration"));
    assert!(display.contains("page_size"));
}

#[test]
fn test_already_exists_display() {
    let err = Error::AlreadyExists("scenario 'main'".to_string());
    assert_eq!(format!("{}", err), "Already exists: scenario 'main'");
}

#[test]
fn test_backend_error_display() {
    let err = Error::BackendError("shadow atlas full".to_string());
    let display = format!("{}", err);
    assert!(display.contains("Backend error"));
    assert!(display.contains("shadow atlas full"));
}

// ============================================================================
// ERROR TRAIT IMPLEMENTATIONS
// ============================================================================

#[test]
fn test_error_is_std_error() {
    let err = Error::AlreadyExists("x".to_string());
    let _: &dyn std::error::Error = &err;
}

#[test]
fn test_error_debug() {
    let debug = format!("{:?}", Error::InvalidConfig("test".to_string()));
    assert!(debug.contains("InvalidConfig"));
    assert!(debug.contains("test"));
}

#[test]
fn test_error_clone() {
    let err1 = Error::BackendError("device lost".to_string());
    let err2 = err1.clone();
    assert_eq!(format!("{}", err1), format!("{}", err2));
}

// ============================================================================
// RESULT ALIAS
// ============================================================================

fn checked_page_size(page_size: usize) -> Result<usize> {
    if page_size == 0 {
        return Err(Error::InvalidConfig("page_size must be > 0".to_string()));
    }
    Ok(page_size)
}

#[test]
fn test_result_ok() {
    assert_eq!(checked_page_size(64).unwrap(), 64);
}

#[test]
fn test_result_question_mark_propagation() {
    fn pages_for(count: usize, page_size: usize) -> Result<usize> {
        let size = checked_page_size(page_size)?;
        Ok(count.div_ceil(size))
    }
    assert_eq!(pages_for(300, 256).unwrap(), 2);
    assert!(matches!(pages_for(300, 0), Err(Error::InvalidConfig(_))));
}
