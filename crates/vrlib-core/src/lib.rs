//! vrlib-core: Core traits, types, and error definitions for vrlib.
//!
//! This crate defines the abstractions shared by every vrlib crate: the
//! byte-level [`Transport`] consumed by protocol engines, the module-level
//! types used in command arguments, and the common [`Error`] type.
//!
//! # Key types
//!
//! - [`Transport`] -- byte-level communication channel
//! - [`Group`], [`SystemGroup`], [`GroupControl`] -- record grouping
//! - [`IoMode`], [`PulseWidth`], [`BaudRate`] -- module output settings
//! - [`Error`] / [`ErrorKind`] / [`Result`] -- error handling

pub mod error;
pub mod transport;
pub mod types;

pub use error::{Error, ErrorKind, Result};
pub use transport::Transport;
pub use types::*;
