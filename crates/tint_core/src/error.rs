//! Error types for the object core

use crate::type_registry::StructKind;
use std::fmt;
use thiserror::Error;

/// Result type for core operations
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors that can occur in the object core
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// Construction of an entity could not complete
    #[error("Failed to allocate {kind}: {message}")]
    AllocationFailed {
        kind: StructKind,
        message: String,
    },

    /// An option was missing or of the wrong type
    #[error("Option error: {0}")]
    Option(String),
}

impl CoreError {
    /// Create an allocation failure
    pub fn allocation_failed(kind: StructKind, message: impl Into<String>) -> Self {
        CoreError::AllocationFailed {
            kind,
            message: message.into(),
        }
    }
}

/// Integer status crossing the module boundary.
///
/// `0` is success, a positive value is an error and a negative value is an
/// issue worth a message that does not stop the caller.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Status(pub i32);

impl Status {
    /// Success
    pub const OK: Status = Status(0);

    /// A positive error code
    pub const fn error(code: i32) -> Self {
        let code = if code < 0 { -code } else { code };
        Status(if code == 0 { 1 } else { code })
    }

    /// A negative issue code
    pub const fn issue(code: i32) -> Self {
        let code = if code < 0 { -code } else { code };
        Status(if code == 0 { -1 } else { -code })
    }

    #[inline]
    pub const fn is_ok(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_error(&self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub const fn is_issue(&self) -> bool {
        self.0 < 0
    }

    /// Raw integer value
    #[inline]
    pub const fn code(&self) -> i32 {
        self.0
    }
}

impl fmt::Debug for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            0 => write!(f, "Status(ok)"),
            c if c > 0 => write!(f, "Status(error {})", c),
            c => write!(f, "Status(issue {})", -c),
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i32> for Status {
    fn from(code: i32) -> Self {
        Status(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classes() {
        assert!(Status::OK.is_ok());
        assert!(Status::error(3).is_error());
        assert!(Status::error(-3).is_error());
        assert!(Status::issue(2).is_issue());
        assert_eq!(Status::error(0).code(), 1);
        assert_eq!(Status::issue(0).code(), -1);
    }

    #[test]
    fn test_error_display() {
        let err = CoreError::allocation_failed(StructKind::Connector, "max is 0");
        assert_eq!(err.to_string(), "Failed to allocate Connector: max is 0");
    }
}
