//! Console error codes.
//!
//! Each failure prints as `Exx: message` on the console.

use crate::hal::StorageError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleError {
    UnknownCommand,
    /// Argument did not parse (number, mode name, slot).
    InvalidValue,
    MissingArg,
    /// Parsed but outside the accepted limits.
    OutOfRange,
    /// Destructive command issued without `confirm`.
    RequiresConfirm,
    /// Settings log commit failed.
    Storage,
}

impl ConsoleError {
    const fn describe(self) -> (&'static str, &'static str) {
        match self {
            Self::UnknownCommand => ("E01", "unknown command"),
            Self::InvalidValue => ("E02", "invalid value"),
            Self::MissingArg => ("E03", "missing argument"),
            Self::OutOfRange => ("E04", "out of range"),
            Self::RequiresConfirm => ("E05", "requires 'confirm'"),
            Self::Storage => ("E06", "settings not saved"),
        }
    }

    pub const fn code(&self) -> &'static str {
        self.describe().0
    }

    pub const fn message(&self) -> &'static str {
        self.describe().1
    }
}

impl From<StorageError> for ConsoleError {
    fn from(_: StorageError) -> Self {
        ConsoleError::Storage
    }
}

impl core::fmt::Display for ConsoleError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let (code, message) = self.describe();
        write!(f, "{}: {}", code, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_distinct() {
        let all = [
            ConsoleError::UnknownCommand,
            ConsoleError::InvalidValue,
            ConsoleError::MissingArg,
            ConsoleError::OutOfRange,
            ConsoleError::RequiresConfirm,
            ConsoleError::Storage,
        ];
        for (i, a) in all.iter().enumerate() {
            for b in &all[i + 1..] {
                assert_ne!(a.code(), b.code());
            }
        }
    }

    #[test]
    fn test_storage_failure_maps_to_e06() {
        let e: ConsoleError = StorageError::CommitFailed.into();
        assert_eq!(e.to_string(), "E06: settings not saved");
    }
}
