//! Firmware error taxonomy.
//!
//! Errors at this layer are few and fatal-ish: a malformed hart range is a
//! caller bug, and a failed cold-boot allocation aborts bring-up. The
//! numeric codes are part of the firmware ABI and must stay stable.

use core::fmt;

/// Result type used throughout the firmware runtime.
pub type Result<T> = core::result::Result<T, Error>;

/// Errors surfaced across the firmware call boundary.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Error {
    /// A hart range or event argument was malformed. Rejected wholesale,
    /// with zero partial effect.
    InvalidArgument,
    /// Scratch-store allocation failed at cold boot, or the subsystem was
    /// used before the cold-boot hart initialized it.
    OutOfMemory,
    /// The platform or a collaborator does not implement the operation.
    NotSupported,
    /// A collaborator failed in a way it could not describe further.
    Failed,
}

impl Error {
    /// The stable negative ABI code for this error.
    pub const fn code(self) -> isize {
        match self {
            Error::Failed => -1,
            Error::NotSupported => -2,
            Error::InvalidArgument => -3,
            Error::OutOfMemory => -4,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let desc = match self {
            Error::InvalidArgument => "invalid argument",
            Error::OutOfMemory => "out of memory",
            Error::NotSupported => "not supported",
            Error::Failed => "operation failed",
        };
        write!(f, "{}", desc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(Error::Failed.code(), -1);
        assert_eq!(Error::NotSupported.code(), -2);
        assert_eq!(Error::InvalidArgument.code(), -3);
        assert_eq!(Error::OutOfMemory.code(), -4);
    }

    #[test]
    fn display() {
        assert_eq!(format!("{}", Error::OutOfMemory), "out of memory");
    }
}
