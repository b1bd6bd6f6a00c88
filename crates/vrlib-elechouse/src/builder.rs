//! VoiceRecognizerBuilder -- fluent builder for [`VoiceRecognizer`] instances.
//!
//! Separates configuration from construction so that callers can set serial
//! port parameters, timeouts and the length convention before the transport
//! is opened.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use vrlib_core::BaudRate;
//! use vrlib_elechouse::builder::VoiceRecognizerBuilder;
//!
//! # async fn example() -> vrlib_core::Result<()> {
//! let mut vr = VoiceRecognizerBuilder::new()
//!     .serial_port("/dev/ttyUSB0")
//!     .baud_rate(BaudRate::B9600)
//!     .command_timeout(Duration::from_millis(500))
//!     .build()
//!     .await?;
//! vr.clear().await?;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use vrlib_core::error::{Error, Result};
use vrlib_core::transport::Transport;
use vrlib_core::types::BaudRate;

use crate::driver::{DEFAULT_TIMEOUT, DriverConfig, TRAIN_TIMEOUT, VoiceRecognizer};
use crate::frame::LengthConvention;

/// Fluent builder for [`VoiceRecognizer`].
///
/// Defaults match a module fresh from the factory: 9600 baud, one second
/// per reply, ten seconds per training step.
#[derive(Debug, Clone)]
pub struct VoiceRecognizerBuilder {
    serial_port: Option<String>,
    baud_rate: BaudRate,
    command_timeout: Duration,
    train_timeout: Duration,
    convention: LengthConvention,
    discard_stale_input: bool,
}

impl Default for VoiceRecognizerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl VoiceRecognizerBuilder {
    pub fn new() -> Self {
        VoiceRecognizerBuilder {
            serial_port: None,
            baud_rate: BaudRate::B9600,
            command_timeout: DEFAULT_TIMEOUT,
            train_timeout: TRAIN_TIMEOUT,
            convention: LengthConvention::default(),
            discard_stale_input: true,
        }
    }

    /// Set the serial port path (e.g. `/dev/ttyUSB0` or `COM3`).
    pub fn serial_port(mut self, port: &str) -> Self {
        self.serial_port = Some(port.to_string());
        self
    }

    /// Host-side baud rate. Must match what the module is configured for.
    pub fn baud_rate(mut self, rate: BaudRate) -> Self {
        self.baud_rate = rate;
        self
    }

    /// Time to wait for each reply to an ordinary command (default: 1s).
    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Time to wait for each frame while training (default: 10s).
    pub fn train_timeout(mut self, timeout: Duration) -> Self {
        self.train_timeout = timeout;
        self
    }

    /// How the frame length byte is counted (default:
    /// [`LengthConvention::ExcludesEnd`]).
    pub fn length_convention(mut self, convention: LengthConvention) -> Self {
        self.convention = convention;
        self
    }

    /// Drop buffered input before each request (default: true).
    pub fn discard_stale_input(mut self, enabled: bool) -> Self {
        self.discard_stale_input = enabled;
        self
    }

    /// Build a [`VoiceRecognizer`] with a caller-provided transport.
    ///
    /// This is the entry point for testing (pass a `MockTransport` from
    /// `vrlib-test-harness`) and for callers that manage the transport
    /// themselves.
    pub fn build_with_transport(self, transport: Box<dyn Transport>) -> Result<VoiceRecognizer> {
        if self.command_timeout.is_zero() {
            return Err(Error::InvalidParameter(
                "command_timeout must be non-zero".into(),
            ));
        }
        if self.train_timeout.is_zero() {
            return Err(Error::InvalidParameter(
                "train_timeout must be non-zero".into(),
            ));
        }
        let config = DriverConfig {
            command_timeout: self.command_timeout,
            train_timeout: self.train_timeout,
            convention: self.convention,
            discard_stale_input: self.discard_stale_input,
        };
        Ok(VoiceRecognizer::new(transport, config))
    }

    /// Build a [`VoiceRecognizer`] over a serial port.
    ///
    /// Requires that [`serial_port()`](Self::serial_port) has been called.
    pub async fn build(self) -> Result<VoiceRecognizer> {
        let port = self
            .serial_port
            .as_ref()
            .ok_or_else(|| Error::InvalidParameter("serial_port is required for build()".into()))?;
        let transport =
            vrlib_transport::SerialTransport::open(port, self.baud_rate).await?;
        self.build_with_transport(Box::new(transport))
    }
}
