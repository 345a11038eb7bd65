/// Unit tests for DiError and DiResult
use ferrous_cyclotron::{DiError, DiResult};
use std::error::Error;

#[test]
fn test_error_display_not_bootstrapped() {
    let display_str = DiError::NotBootstrapped.to_string();
    assert_eq!(
        display_str,
        "You must call bootstrap from a root scope before calling connect"
    );
}

#[test]
fn test_error_display_cyclic_reconnect() {
    let display_str = format!("{}", DiError::CyclicReconnect("heartbeat"));
    assert_eq!(
        display_str,
        "Cyclically resolved services may connect to themselves only once: heartbeat"
    );
}

#[test]
fn test_error_display_read_only() {
    let display_str = format!("{}", DiError::ReadOnly("clock"));
    assert_eq!(display_str, "Cannot write to read-only service: clock");
}

#[test]
fn test_error_display_disposed() {
    let display_str = format!("{}", DiError::Disposed("session"));
    assert_eq!(display_str, "Service already disposed: session");
}

#[test]
fn test_error_display_provider() {
    let error = DiError::provider("session", "token expired");
    assert_eq!(error.to_string(), "Provider session failed: token expired");
    assert_eq!(
        error,
        DiError::Provider {
            name: "session",
            message: "token expired".to_string(),
        }
    );
}

#[test]
fn test_error_display_type_mismatch() {
    let display_str = format!("{}", DiError::TypeMismatch("runtime"));
    assert_eq!(display_str, "Type mismatch for: runtime");
}

#[test]
fn test_error_display_depth_exceeded() {
    let display_str = format!("{}", DiError::DepthExceeded(1024));
    assert_eq!(display_str, "Max depth 1024 exceeded");
}

#[test]
fn test_error_display_config() {
    let display_str = format!("{}", DiError::Config("max_depth: invalid digit".to_string()));
    assert_eq!(display_str, "Invalid runtime options: max_depth: invalid digit");
}

#[test]
fn test_error_is_std_error() {
    let error: Box<dyn Error> = Box::new(DiError::NotBootstrapped);
    assert!(error.source().is_none());
}

#[test]
fn test_di_result_propagates_with_question_mark() {
    fn inner() -> DiResult<u8> {
        Err(DiError::Disposed("inner"))
    }
    fn outer() -> DiResult<u8> {
        let value = inner()?;
        Ok(value + 1)
    }
    assert_eq!(outer(), Err(DiError::Disposed("inner")));
}
