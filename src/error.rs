//! Error handling for the schematic printer
//!
//! Hard failures only. The soft outcomes of a build run (unreachable path,
//! unconfirmed placement, material shortfall, unloaded region) are reported
//! through outcome enums in their own modules and never surface here.

use std::error::Error as StdError;
use std::fmt;

/// Main error type for the schematic printer
#[derive(Debug)]
pub enum PrinterError {
    // Schematic Errors
    InvalidSchematic {
        reason: String,
    },
    PaletteIdOutOfRange {
        pid: u16,
        palette_len: usize,
    },

    // Persistence Errors
    SaveFailed {
        path: String,
        error: String,
    },
    LoadFailed {
        path: String,
        error: String,
    },
    CorruptedData {
        reason: String,
    },

    // Configuration Errors
    InvalidConfig {
        field: String,
        value: String,
        reason: String,
    },

    // System Errors
    IoError {
        path: String,
        error: String,
    },
    SerializationError {
        context: String,
        error: String,
    },
    DeserializationError {
        context: String,
        error: String,
    },

    // Generic fallback for unexpected errors
    Internal {
        message: String,
    },
}

impl fmt::Display for PrinterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrinterError::InvalidSchematic { reason } => write!(f, "Invalid schematic: {}", reason),
            PrinterError::PaletteIdOutOfRange { pid, palette_len } => write!(
                f,
                "Palette id {} out of range for palette of {} entries",
                pid, palette_len
            ),

            PrinterError::SaveFailed { path, error } => {
                write!(f, "Save failed for {}: {}", path, error)
            }
            PrinterError::LoadFailed { path, error } => {
                write!(f, "Load failed for {}: {}", path, error)
            }
            PrinterError::CorruptedData { reason } => write!(f, "Data corrupted: {}", reason),

            PrinterError::InvalidConfig {
                field,
                value,
                reason,
            } => write!(f, "Invalid config: {} = {} ({})", field, value, reason),

            PrinterError::IoError { path, error } => write!(f, "IO error for {}: {}", path, error),
            PrinterError::SerializationError { context, error } => {
                write!(f, "Serialization error in {}: {}", context, error)
            }
            PrinterError::DeserializationError { context, error } => {
                write!(f, "Deserialization error in {}: {}", context, error)
            }

            PrinterError::Internal { message } => write!(f, "Internal error: {}", message),
        }
    }
}

impl StdError for PrinterError {}

/// Type alias for Results in the schematic printer
pub type PrinterResult<T> = Result<T, PrinterError>;

// Conversion traits for common error types

impl From<std::io::Error> for PrinterError {
    fn from(error: std::io::Error) -> Self {
        PrinterError::IoError {
            path: String::new(),
            error: error.to_string(),
        }
    }
}

impl From<serde_json::Error> for PrinterError {
    fn from(error: serde_json::Error) -> Self {
        PrinterError::DeserializationError {
            context: "json".to_string(),
            error: error.to_string(),
        }
    }
}

impl From<crate::persistence::PersistenceError> for PrinterError {
    fn from(err: crate::persistence::PersistenceError) -> Self {
        use crate::persistence::PersistenceError;
        match err {
            PersistenceError::SaveFailed { path, error } => PrinterError::SaveFailed { path, error },
            PersistenceError::LoadFailed { path, error } => PrinterError::LoadFailed { path, error },
            PersistenceError::IoError(e) => PrinterError::IoError {
                path: String::new(),
                error: e,
            },
            PersistenceError::SerializationError(e) => PrinterError::SerializationError {
                context: "persistence".to_string(),
                error: e,
            },
            PersistenceError::CorruptedData(e) => PrinterError::CorruptedData { reason: e },
        }
    }
}

// Helper functions for common error patterns

/// Convert Option to Result with context
pub trait OptionExt<T> {
    fn ok_or_printer<F>(self, f: F) -> PrinterResult<T>
    where
        F: FnOnce() -> PrinterError;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_printer<F>(self, f: F) -> PrinterResult<T>
    where
        F: FnOnce() -> PrinterError,
    {
        self.ok_or_else(f)
    }
}

/// Extension trait for adding context to errors
pub trait ErrorContext<T> {
    fn context(self, msg: &str) -> PrinterResult<T>;
    fn with_context<F>(self, f: F) -> PrinterResult<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ErrorContext<T> for Result<T, E>
where
    E: fmt::Display,
{
    fn context(self, msg: &str) -> PrinterResult<T> {
        self.map_err(|e| PrinterError::Internal {
            message: format!("{}: {}", msg, e),
        })
    }

    fn with_context<F>(self, f: F) -> PrinterResult<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| PrinterError::Internal {
            message: format!("{}: {}", f(), e),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PrinterError::PaletteIdOutOfRange {
            pid: 7,
            palette_len: 3,
        };
        assert_eq!(
            err.to_string(),
            "Palette id 7 out of range for palette of 3 entries"
        );
    }

    #[test]
    fn test_option_ext() {
        let opt: Option<i32> = None;
        let result = opt.ok_or_printer(|| PrinterError::Internal {
            message: "test".to_string(),
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_error_context_keeps_cause() {
        let result: Result<i32, std::io::Error> = Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "file not found",
        ));
        let err = result
            .context("loading schematic")
            .expect_err("context must keep the error");
        assert_eq!(
            err.to_string(),
            "Internal error: loading schematic: file not found"
        );
    }

    #[test]
    fn test_persistence_error_conversion() {
        let err: PrinterError = crate::persistence::PersistenceError::CorruptedData(
            "truncated".to_string(),
        )
        .into();
        assert!(matches!(err, PrinterError::CorruptedData { .. }));
    }
}
