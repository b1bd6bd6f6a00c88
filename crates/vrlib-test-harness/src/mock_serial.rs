//! Mock transport for deterministic testing of protocol engines.
//!
//! [`MockTransport`] implements the [`Transport`] trait with pre-loaded
//! request/response pairs, plus an input queue for bytes the module sends
//! without being asked (recognition events, line noise).
//!
//! # Example
//!
//! ```
//! use vrlib_test_harness::MockTransport;
//!
//! let mut mock = MockTransport::new();
//! // When the driver sends "clear", answer with the clear acknowledgement.
//! mock.expect(&[0xAA, 0x01, 0x31, 0x0A], &[0xAA, 0x02, 0x31, 0x00, 0x0A]);
//! // A recognition event already waiting on the line.
//! mock.inject(&[0xAA, 0x02, 0x0D, 0x05, 0x0A]);
//! ```

use async_trait::async_trait;
use std::collections::VecDeque;
use std::time::Duration;

use vrlib_core::error::{Error, Result};
use vrlib_core::transport::Transport;

/// A pre-loaded request and the reply (if any) it triggers.
#[derive(Debug, Clone)]
struct Expectation {
    request: Vec<u8>,
    response: Option<Vec<u8>>,
}

/// A mock [`Transport`] for testing protocol engines without hardware.
///
/// Expectations are consumed in order. When `send()` is called, the sent
/// data is recorded and matched against the next expectation, and the
/// expectation's response is appended to the input queue. `receive()` drains
/// the input queue and reports [`Error::Timeout`] immediately once it is
/// empty, so timeout paths run without real waiting.
#[derive(Debug)]
pub struct MockTransport {
    expectations: VecDeque<Expectation>,
    /// Bytes waiting to be read.
    incoming: VecDeque<u8>,
    connected: bool,
    /// Log of all bytes sent through this transport, one entry per `send()`.
    sent_log: Vec<Vec<u8>>,
    /// Number of bytes thrown away by `discard_input()`.
    discarded: usize,
}

impl MockTransport {
    /// Create a new mock transport in the connected state.
    pub fn new() -> Self {
        MockTransport {
            expectations: VecDeque::new(),
            incoming: VecDeque::new(),
            connected: true,
            sent_log: Vec::new(),
            discarded: 0,
        }
    }

    /// Add an expected request/response pair.
    ///
    /// When `send()` is called with data matching `request`, `response`
    /// becomes readable.
    pub fn expect(&mut self, request: &[u8], response: &[u8]) {
        self.expectations.push_back(Expectation {
            request: request.to_vec(),
            response: Some(response.to_vec()),
        });
    }

    /// Add an expected request that the module never answers.
    pub fn expect_silence(&mut self, request: &[u8]) {
        self.expectations.push_back(Expectation {
            request: request.to_vec(),
            response: None,
        });
    }

    /// Queue bytes as if the module had sent them unprompted.
    pub fn inject(&mut self, data: &[u8]) {
        self.incoming.extend(data.iter().copied());
    }

    /// Return a reference to all data that has been sent through this transport.
    pub fn sent_data(&self) -> &[Vec<u8>] {
        &self.sent_log
    }

    /// Return the number of expectations that have not yet been consumed.
    pub fn remaining_expectations(&self) -> usize {
        self.expectations.len()
    }

    /// Return the number of queued bytes not yet read.
    pub fn unread(&self) -> usize {
        self.incoming.len()
    }

    /// Return the total number of bytes dropped by `discard_input()`.
    pub fn discarded(&self) -> usize {
        self.discarded
    }

    /// Set the connected state of the mock transport.
    ///
    /// When set to `false`, subsequent calls return [`Error::NotConnected`].
    pub fn set_connected(&mut self, connected: bool) {
        self.connected = connected;
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        if !self.connected {
            return Err(Error::NotConnected);
        }

        self.sent_log.push(data.to_vec());

        let Some(expectation) = self.expectations.pop_front() else {
            return Err(Error::Transport(
                "no more expectations in mock transport".into(),
            ));
        };
        if data != expectation.request.as_slice() {
            return Err(Error::Transport(format!(
                "unexpected send data: expected {:02X?}, got {:02X?}",
                expectation.request, data
            )));
        }
        if let Some(response) = expectation.response {
            self.incoming.extend(response);
        }
        Ok(())
    }

    async fn receive(&mut self, buf: &mut [u8], _timeout: Duration) -> Result<usize> {
        if !self.connected {
            return Err(Error::NotConnected);
        }
        if self.incoming.is_empty() {
            return Err(Error::Timeout);
        }

        let n = self.incoming.len().min(buf.len());
        for (slot, byte) in buf.iter_mut().zip(self.incoming.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    async fn bytes_available(&mut self) -> Result<usize> {
        if !self.connected {
            return Err(Error::NotConnected);
        }
        Ok(self.incoming.len())
    }

    async fn discard_input(&mut self) -> Result<()> {
        if !self.connected {
            return Err(Error::NotConnected);
        }
        self.discarded += self.incoming.len();
        self.incoming.clear();
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.connected = false;
        self.incoming.clear();
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}
