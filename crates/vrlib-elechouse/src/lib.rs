//! Elechouse Voice Recognition V3 protocol driver for vrlib.
//!
//! This crate implements the module's framed serial protocol
//! (`AA LEN CMD [SUB] PAYLOAD.. 0A`). It provides:
//!
//! - **Frame codec** ([`frame`]) -- build frames and validate complete ones,
//!   under either [`LengthConvention`].
//! - **Frame receiver** ([`receiver`]) -- byte-at-a-time state machine that
//!   reads one frame from a [`Transport`](vrlib_core::Transport) under a
//!   deadline, skipping line noise.
//! - **Record lists** ([`records`]) -- sort and de-duplicate record IDs.
//! - **Command builders** ([`commands`]) -- request frames for every module
//!   command, and parsers for their replies into [`responses`] types.
//! - **VoiceRecognizer** ([`driver`]) -- the dispatcher tying it all to a
//!   transport, one exchange at a time.
//! - **VoiceRecognizerBuilder** ([`builder`]) -- fluent construction with
//!   configurable timeouts and serial settings.
//!
//! # Example
//!
//! ```
//! use vrlib_elechouse::commands;
//! use vrlib_elechouse::frame::{parse_frame, LengthConvention};
//!
//! // Load records 1, 2 and 5 (duplicates and order do not matter).
//! let bytes = commands::load(&[5, 2, 1, 2])
//!     .unwrap()
//!     .encode(LengthConvention::default())
//!     .unwrap();
//! assert_eq!(bytes, vec![0xAA, 0x04, 0x30, 0x01, 0x02, 0x05, 0x0A]);
//!
//! // The module's "recognized record 5" notification.
//! let frame = parse_frame(&[0xAA, 0x02, 0x0D, 0x05, 0x0A], LengthConvention::default()).unwrap();
//! assert_eq!(commands::parse_recognition(&frame).unwrap().record, 5);
//! ```

pub mod builder;
pub mod commands;
pub mod driver;
pub mod frame;
pub mod receiver;
pub mod records;
pub mod responses;

pub use builder::VoiceRecognizerBuilder;
pub use driver::{DEFAULT_TIMEOUT, DriverConfig, TRAIN_TIMEOUT, VoiceRecognizer};
pub use frame::{Frame, LengthConvention};
pub use responses::*;
