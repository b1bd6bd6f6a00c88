//! Transport implementations for vrlib.
//!
//! This crate provides [`SerialTransport`], the concrete
//! [`Transport`](vrlib_core::Transport) for modules attached over a UART or
//! USB-serial adapter.

pub mod serial;

pub use serial::{FlowControl, Parity, SerialConfig, SerialTransport, StopBits};
