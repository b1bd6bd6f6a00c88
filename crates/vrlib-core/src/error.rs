//! Error types for vrlib.
//!
//! All fallible operations across the library return [`Result<T>`], which
//! uses [`Error`] as the error type. Transport-layer, framing-layer, and
//! peripheral-level failures are all captured here.

use std::fmt;

/// The error type for all vrlib operations.
///
/// The framing variants ([`Timeout`](Error::Timeout),
/// [`MalformedFrame`](Error::MalformedFrame),
/// [`PayloadTooLarge`](Error::PayloadTooLarge),
/// [`PeripheralRejected`](Error::PeripheralRejected),
/// [`UnexpectedFrame`](Error::UnexpectedFrame)) are returned unchanged by
/// every driver operation. None of them poison the driver: the next call
/// starts a fresh exchange.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No frame, or not enough of one, arrived before the deadline.
    ///
    /// Usually the module is unpowered, the baud rate is wrong, or (for
    /// recognition) nobody spoke a loaded command in time.
    #[error("timeout waiting for response")]
    Timeout,

    /// A frame failed structural validation (bad end sentinel, declared
    /// length out of range, or a payload too short for its command).
    #[error("malformed frame: {0}")]
    MalformedFrame(String),

    /// A caller-built payload does not fit in the frame length field.
    #[error("payload too large: {len} bytes exceeds maximum of {max}")]
    PayloadTooLarge { len: usize, max: usize },

    /// The module answered with the generic error opcode.
    #[error("peripheral rejected command with code 0x{code:02X}")]
    PeripheralRejected { code: u8, payload: Vec<u8> },

    /// A well-formed frame arrived whose command is not a valid reply to
    /// the operation in progress.
    #[error("unexpected frame with command 0x{command:02X}")]
    UnexpectedFrame { command: u8 },

    /// An invalid parameter was passed to a driver operation.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// A transport-level error (serial port open or configuration).
    #[error("transport error: {0}")]
    Transport(String),

    /// No connection to the module has been established.
    #[error("not connected")]
    NotConnected,

    /// The connection to the module was lost unexpectedly.
    #[error("connection lost")]
    ConnectionLost,

    /// An underlying I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Fieldless classification of an [`Error`], for callers that only need to
/// branch on the failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Timeout,
    MalformedFrame,
    PayloadTooLarge,
    PeripheralRejected,
    UnexpectedFrame,
    InvalidParameter,
    Transport,
    NotConnected,
    ConnectionLost,
    Io,
}

impl Error {
    /// Return the category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Timeout => ErrorKind::Timeout,
            Error::MalformedFrame(_) => ErrorKind::MalformedFrame,
            Error::PayloadTooLarge { .. } => ErrorKind::PayloadTooLarge,
            Error::PeripheralRejected { .. } => ErrorKind::PeripheralRejected,
            Error::UnexpectedFrame { .. } => ErrorKind::UnexpectedFrame,
            Error::InvalidParameter(_) => ErrorKind::InvalidParameter,
            Error::Transport(_) => ErrorKind::Transport,
            Error::NotConnected => ErrorKind::NotConnected,
            Error::ConnectionLost => ErrorKind::ConnectionLost,
            Error::Io(_) => ErrorKind::Io,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Timeout => "timeout",
            ErrorKind::MalformedFrame => "malformed frame",
            ErrorKind::PayloadTooLarge => "payload too large",
            ErrorKind::PeripheralRejected => "peripheral rejected",
            ErrorKind::UnexpectedFrame => "unexpected frame",
            ErrorKind::InvalidParameter => "invalid parameter",
            ErrorKind::Transport => "transport",
            ErrorKind::NotConnected => "not connected",
            ErrorKind::ConnectionLost => "connection lost",
            ErrorKind::Io => "I/O",
        };
        f.write_str(name)
    }
}

/// A convenience `Result` alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_timeout() {
        assert_eq!(Error::Timeout.to_string(), "timeout waiting for response");
    }

    #[test]
    fn error_display_malformed() {
        let e = Error::MalformedFrame("bad end sentinel 0x0B".into());
        assert_eq!(e.to_string(), "malformed frame: bad end sentinel 0x0B");
    }

    #[test]
    fn error_display_payload_too_large() {
        let e = Error::PayloadTooLarge { len: 300, max: 249 };
        assert_eq!(
            e.to_string(),
            "payload too large: 300 bytes exceeds maximum of 249"
        );
    }

    #[test]
    fn error_display_peripheral_rejected() {
        let e = Error::PeripheralRejected {
            code: 0x07,
            payload: vec![0x07],
        };
        assert_eq!(e.to_string(), "peripheral rejected command with code 0x07");
    }

    #[test]
    fn error_display_unexpected_frame() {
        let e = Error::UnexpectedFrame { command: 0x0D };
        assert_eq!(e.to_string(), "unexpected frame with command 0x0D");
    }

    #[test]
    fn error_display_invalid_parameter() {
        let e = Error::InvalidParameter("group 9 out of range".into());
        assert_eq!(e.to_string(), "invalid parameter: group 9 out of range");
    }

    #[test]
    fn error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe broken");
        let e: Error = io_err.into();
        assert!(matches!(e, Error::Io(_)));
        assert_eq!(e.kind(), ErrorKind::Io);
        assert!(e.to_string().contains("pipe broken"));
    }

    #[test]
    fn error_kind_matches_variant() {
        assert_eq!(Error::Timeout.kind(), ErrorKind::Timeout);
        assert_eq!(
            Error::MalformedFrame(String::new()).kind(),
            ErrorKind::MalformedFrame
        );
        assert_eq!(
            Error::PayloadTooLarge { len: 1, max: 0 }.kind(),
            ErrorKind::PayloadTooLarge
        );
        assert_eq!(
            Error::PeripheralRejected {
                code: 0,
                payload: vec![]
            }
            .kind(),
            ErrorKind::PeripheralRejected
        );
        assert_eq!(
            Error::UnexpectedFrame { command: 0 }.kind(),
            ErrorKind::UnexpectedFrame
        );
        assert_eq!(Error::NotConnected.kind(), ErrorKind::NotConnected);
    }

    #[test]
    fn error_kind_display() {
        assert_eq!(ErrorKind::PeripheralRejected.to_string(), "peripheral rejected");
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}
        assert_send::<Error>();
        assert_sync::<Error>();
    }

    #[test]
    fn result_alias_works() {
        let ok: Result<u8> = Ok(5);
        assert!(matches!(ok, Ok(5)));

        let err: Result<u8> = Err(Error::Timeout);
        assert!(err.is_err());
    }
}
