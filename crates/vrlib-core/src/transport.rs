//! Transport trait for module communication.
//!
//! The [`Transport`] trait abstracts over the byte-serial link to a voice
//! recognition module. A serial port implementation lives in
//! `vrlib-transport`, and a scripted mock for tests in `vrlib-test-harness`.
//!
//! Protocol engines (e.g. the frame receiver in `vrlib-elechouse`) operate on
//! a `Transport` rather than directly on a serial port, enabling both real
//! hardware control and deterministic unit testing.

use async_trait::async_trait;
use std::time::Duration;
use tokio::time::Instant;

use crate::error::{Error, Result};

/// Asynchronous byte-level transport to a module.
///
/// A transport is owned by exactly one driver and is never shared between
/// concurrent exchanges.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send raw bytes to the module.
    ///
    /// Implementations should not return until every byte has been handed to
    /// the underlying link (serial TX buffer flushed).
    async fn send(&mut self, data: &[u8]) -> Result<()>;

    /// Receive bytes from the module into the provided buffer.
    ///
    /// Returns the number of bytes actually read. Will wait up to `timeout`
    /// for data to arrive; returns [`Error::Timeout`] if no data is received
    /// within that time.
    async fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize>;

    /// Receive exactly one byte, failing with [`Error::Timeout`] once
    /// `deadline` has passed.
    ///
    /// The deadline is absolute, so a caller reading a whole frame one byte
    /// at a time shares a single time budget across all of its reads.
    async fn receive_byte(&mut self, deadline: Instant) -> Result<u8> {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(Error::Timeout);
        }
        let mut byte = [0u8; 1];
        match self.receive(&mut byte, remaining).await? {
            0 => Err(Error::ConnectionLost),
            _ => Ok(byte[0]),
        }
    }

    /// Number of received bytes currently buffered and readable without
    /// waiting.
    async fn bytes_available(&mut self) -> Result<usize>;

    /// Drop any buffered, not yet read input.
    async fn discard_input(&mut self) -> Result<()>;

    /// Close the transport connection.
    ///
    /// After calling `close()`, subsequent `send()` and `receive()` calls
    /// should return [`Error::NotConnected`].
    async fn close(&mut self) -> Result<()>;

    /// Check whether the transport is currently connected.
    fn is_connected(&self) -> bool;
}
