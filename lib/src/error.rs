//! Translation of native status codes into typed errors.
//!
//! Every native call of the backend returns an integer status. [`ErrorKind::from_status`] maps it
//! to one of a closed set of kinds; codes we do not know about map to [`ErrorKind::Other`] so the
//! translation is total. Errors raised by this crate before reaching the native layer (the device
//! is closed, or there is no device at all) are represented by their own [`Error`] variants.

use std::fmt;
use std::os::raw::c_int;

use nix::errno::Errno;
use thiserror::Error;

use crate::bindings;

/// Typed view of a native status code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Success,
    Io,
    InvalidParam,
    AccessDenied,
    NoMem,
    NoDevice,
    NotSupported,
    Busy,
    Timeout,
    Interrupted,
    Pipe,
    Other,
}

impl ErrorKind {
    /// Translates a native status code. Never fails: unknown codes, including positive ones,
    /// become [`ErrorKind::Other`].
    pub const fn from_status(status: c_int) -> Self {
        match status {
            bindings::UVC_SUCCESS => ErrorKind::Success,
            bindings::UVC_ERROR_IO | bindings::UVC_ERROR_OVERFLOW => ErrorKind::Io,
            bindings::UVC_ERROR_INVALID_PARAM => ErrorKind::InvalidParam,
            bindings::UVC_ERROR_ACCESS => ErrorKind::AccessDenied,
            bindings::UVC_ERROR_NO_DEVICE
            | bindings::UVC_ERROR_NOT_FOUND
            | bindings::UVC_ERROR_INVALID_DEVICE => ErrorKind::NoDevice,
            bindings::UVC_ERROR_BUSY | bindings::UVC_ERROR_CALLBACK_EXISTS => ErrorKind::Busy,
            bindings::UVC_ERROR_TIMEOUT => ErrorKind::Timeout,
            bindings::UVC_ERROR_PIPE => ErrorKind::Pipe,
            bindings::UVC_ERROR_INTERRUPTED => ErrorKind::Interrupted,
            bindings::UVC_ERROR_NO_MEM => ErrorKind::NoMem,
            bindings::UVC_ERROR_NOT_SUPPORTED | bindings::UVC_ERROR_INVALID_MODE => {
                ErrorKind::NotSupported
            }
            _ => ErrorKind::Other,
        }
    }

    /// Returns the canonical native status code for this kind.
    pub const fn to_status(self) -> c_int {
        match self {
            ErrorKind::Success => bindings::UVC_SUCCESS,
            ErrorKind::Io => bindings::UVC_ERROR_IO,
            ErrorKind::InvalidParam => bindings::UVC_ERROR_INVALID_PARAM,
            ErrorKind::AccessDenied => bindings::UVC_ERROR_ACCESS,
            ErrorKind::NoMem => bindings::UVC_ERROR_NO_MEM,
            ErrorKind::NoDevice => bindings::UVC_ERROR_NO_DEVICE,
            ErrorKind::NotSupported => bindings::UVC_ERROR_NOT_SUPPORTED,
            ErrorKind::Busy => bindings::UVC_ERROR_BUSY,
            ErrorKind::Timeout => bindings::UVC_ERROR_TIMEOUT,
            ErrorKind::Interrupted => bindings::UVC_ERROR_INTERRUPTED,
            ErrorKind::Pipe => bindings::UVC_ERROR_PIPE,
            ErrorKind::Other => bindings::UVC_ERROR_OTHER,
        }
    }

    pub const fn is_success(self) -> bool {
        matches!(self, ErrorKind::Success)
    }

    /// Turns a native status into a `Result`, keeping the kind as error.
    pub fn check(status: c_int) -> std::result::Result<(), ErrorKind> {
        match Self::from_status(status) {
            ErrorKind::Success => Ok(()),
            kind => Err(kind),
        }
    }

    /// Translates the status of a call that is known to have failed. A failure reported with a
    /// success status is itself an anomaly and becomes [`ErrorKind::Other`].
    pub fn from_failure(status: c_int) -> Self {
        match Self::from_status(status) {
            ErrorKind::Success => ErrorKind::Other,
            kind => kind,
        }
    }
}

impl From<c_int> for ErrorKind {
    fn from(status: c_int) -> Self {
        Self::from_status(status)
    }
}

impl From<ErrorKind> for c_int {
    fn from(kind: ErrorKind) -> Self {
        kind.to_status()
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ErrorKind::Success => "success",
            ErrorKind::Io => "input/output error",
            ErrorKind::InvalidParam => "invalid parameter",
            ErrorKind::AccessDenied => "access denied",
            ErrorKind::NoMem => "insufficient memory",
            ErrorKind::NoDevice => "no such device",
            ErrorKind::NotSupported => "operation not supported",
            ErrorKind::Busy => "resource busy",
            ErrorKind::Timeout => "operation timed out",
            ErrorKind::Interrupted => "system call interrupted",
            ErrorKind::Pipe => "pipe error",
            ErrorKind::Other => "unknown error",
        })
    }
}

impl From<ErrorKind> for Errno {
    fn from(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::Success => Errno::UnknownErrno,
            ErrorKind::Io => Errno::EIO,
            ErrorKind::InvalidParam => Errno::EINVAL,
            ErrorKind::AccessDenied => Errno::EACCES,
            ErrorKind::NoMem => Errno::ENOMEM,
            ErrorKind::NoDevice => Errno::ENODEV,
            ErrorKind::NotSupported => Errno::ENOTSUP,
            ErrorKind::Busy => Errno::EBUSY,
            ErrorKind::Timeout => Errno::ETIMEDOUT,
            ErrorKind::Interrupted => Errno::EINTR,
            ErrorKind::Pipe => Errno::EPIPE,
            ErrorKind::Other => Errno::EIO,
        }
    }
}

/// Error type of the device operations.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("device closed")]
    DeviceClosed,
    #[error("device not found")]
    DeviceNotFound,
    #[error("native error: {0}")]
    Native(ErrorKind),
}

impl Error {
    /// Returns the translated kind of a native error, `None` for guard errors.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Error::Native(kind) => Some(*kind),
            Error::DeviceClosed | Error::DeviceNotFound => None,
        }
    }

    /// Whether this error was raised before any native call was attempted.
    pub fn is_guard(&self) -> bool {
        self.kind().is_none()
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error::Native(kind)
    }
}

impl From<Error> for Errno {
    fn from(err: Error) -> Self {
        match err {
            Error::DeviceClosed => Errno::EBADF,
            Error::DeviceNotFound => Errno::ENODEV,
            Error::Native(kind) => kind.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Runs a native status through the translator, mapping success to `Ok`.
pub(crate) fn check(status: c_int) -> Result<()> {
    ErrorKind::check(status).map_err(Error::Native)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_codes() {
        let table = [
            (bindings::UVC_SUCCESS, ErrorKind::Success),
            (bindings::UVC_ERROR_IO, ErrorKind::Io),
            (bindings::UVC_ERROR_INVALID_PARAM, ErrorKind::InvalidParam),
            (bindings::UVC_ERROR_ACCESS, ErrorKind::AccessDenied),
            (bindings::UVC_ERROR_NO_DEVICE, ErrorKind::NoDevice),
            (bindings::UVC_ERROR_NOT_FOUND, ErrorKind::NoDevice),
            (bindings::UVC_ERROR_BUSY, ErrorKind::Busy),
            (bindings::UVC_ERROR_TIMEOUT, ErrorKind::Timeout),
            (bindings::UVC_ERROR_OVERFLOW, ErrorKind::Io),
            (bindings::UVC_ERROR_PIPE, ErrorKind::Pipe),
            (bindings::UVC_ERROR_INTERRUPTED, ErrorKind::Interrupted),
            (bindings::UVC_ERROR_NO_MEM, ErrorKind::NoMem),
            (bindings::UVC_ERROR_NOT_SUPPORTED, ErrorKind::NotSupported),
            (bindings::UVC_ERROR_INVALID_DEVICE, ErrorKind::NoDevice),
            (bindings::UVC_ERROR_INVALID_MODE, ErrorKind::NotSupported),
            (bindings::UVC_ERROR_CALLBACK_EXISTS, ErrorKind::Busy),
            (bindings::UVC_ERROR_OTHER, ErrorKind::Other),
        ];

        for (status, kind) in table {
            assert_eq!(ErrorKind::from_status(status), kind, "status {}", status);
        }
    }

    #[test]
    fn test_translation_is_total_and_stable() {
        let samples = [
            i32::MIN,
            i32::MIN + 1,
            -100_000,
            -98,
            -53,
            -49,
            -13,
            1,
            2,
            64,
            i32::MAX,
        ];

        for status in samples {
            let first = ErrorKind::from_status(status);
            assert_eq!(first, ErrorKind::Other, "status {}", status);
            assert_eq!(ErrorKind::from_status(status), first);
        }

        for status in -128..=128 {
            assert_eq!(
                ErrorKind::from_status(status),
                ErrorKind::from_status(status)
            );
        }
    }

    #[test]
    fn test_kind_status_round_trip() {
        let kinds = [
            ErrorKind::Success,
            ErrorKind::Io,
            ErrorKind::InvalidParam,
            ErrorKind::AccessDenied,
            ErrorKind::NoMem,
            ErrorKind::NoDevice,
            ErrorKind::NotSupported,
            ErrorKind::Busy,
            ErrorKind::Timeout,
            ErrorKind::Interrupted,
            ErrorKind::Pipe,
            ErrorKind::Other,
        ];

        for kind in kinds {
            assert_eq!(ErrorKind::from_status(kind.to_status()), kind);
        }
    }

    #[test]
    fn test_check() {
        assert_eq!(check(bindings::UVC_SUCCESS), Ok(()));
        assert_eq!(
            check(bindings::UVC_ERROR_PIPE),
            Err(Error::Native(ErrorKind::Pipe))
        );
        assert_eq!(ErrorKind::check(bindings::UVC_SUCCESS), Ok(()));
        assert_eq!(
            ErrorKind::check(bindings::UVC_ERROR_TIMEOUT),
            Err(ErrorKind::Timeout)
        );
        assert_eq!(ErrorKind::check(42), Err(ErrorKind::Other));
        assert_eq!(ErrorKind::from_failure(0), ErrorKind::Other);
        assert_eq!(ErrorKind::from_failure(-4), ErrorKind::NoDevice);
    }

    #[test]
    fn test_into_errno() {
        assert_eq!(Errno::from(Error::DeviceClosed), Errno::EBADF);
        assert_eq!(Errno::from(Error::DeviceNotFound), Errno::ENODEV);
        assert_eq!(Errno::from(Error::Native(ErrorKind::Busy)), Errno::EBUSY);
        assert!(Error::DeviceClosed.is_guard());
        assert!(!Error::Native(ErrorKind::Io).is_guard());
    }
}
