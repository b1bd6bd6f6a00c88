//! vrlib-test-harness: Test utilities and mock transports for vrlib.
//!
//! This crate provides [`MockTransport`] for deterministic unit testing of
//! protocol engines without a physical voice recognition module.

pub mod mock_serial;

pub use mock_serial::MockTransport;
