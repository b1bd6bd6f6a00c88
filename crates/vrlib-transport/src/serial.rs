//! Serial port transport for module communication.
//!
//! [`SerialTransport`] implements the [`Transport`] trait over a UART,
//! USB-serial adapter, or any OS serial device. The module always uses
//! 8 data bits; baud rate, parity, stop bits and flow control are
//! configurable through [`SerialConfig`] and default to 9600 8N1 without
//! flow control, the factory setting.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use vrlib_core::BaudRate;
//! use vrlib_core::transport::Transport;
//! use vrlib_transport::SerialTransport;
//!
//! # async fn example() -> vrlib_core::Result<()> {
//! let mut transport = SerialTransport::open("/dev/ttyUSB0", BaudRate::B9600).await?;
//!
//! // "clear recognizer" frame
//! transport.send(&[0xAA, 0x01, 0x31, 0x0A]).await?;
//!
//! let mut buf = [0u8; 64];
//! let n = transport.receive(&mut buf, Duration::from_secs(1)).await?;
//! # Ok(())
//! # }
//! ```

use std::io;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_serial::{ClearBuffer, SerialPort, SerialPortBuilderExt, SerialStream};
use tracing::{debug, error, info, trace, warn};

use vrlib_core::error::{Error, Result};
use vrlib_core::transport::Transport;
use vrlib_core::types::BaudRate;

/// Serial line settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SerialConfig {
    pub baud_rate: BaudRate,
    pub stop_bits: StopBits,
    pub parity: Parity,
    pub flow_control: FlowControl,
}

impl SerialConfig {
    /// 8N1 without flow control at the given rate.
    pub fn new(baud_rate: BaudRate) -> Self {
        SerialConfig {
            baud_rate,
            stop_bits: StopBits::One,
            parity: Parity::None,
            flow_control: FlowControl::None,
        }
    }
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self::new(BaudRate::B9600)
    }
}

/// Number of stop bits per character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopBits {
    One,
    Two,
}

impl From<StopBits> for tokio_serial::StopBits {
    fn from(bits: StopBits) -> Self {
        match bits {
            StopBits::One => tokio_serial::StopBits::One,
            StopBits::Two => tokio_serial::StopBits::Two,
        }
    }
}

/// Parity checking mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parity {
    None,
    Odd,
    Even,
}

impl From<Parity> for tokio_serial::Parity {
    fn from(parity: Parity) -> Self {
        match parity {
            Parity::None => tokio_serial::Parity::None,
            Parity::Odd => tokio_serial::Parity::Odd,
            Parity::Even => tokio_serial::Parity::Even,
        }
    }
}

/// Flow control mode. Bare module UARTs have no handshake lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowControl {
    None,
    Software,
    Hardware,
}

impl From<FlowControl> for tokio_serial::FlowControl {
    fn from(flow: FlowControl) -> Self {
        match flow {
            FlowControl::None => tokio_serial::FlowControl::None,
            FlowControl::Software => tokio_serial::FlowControl::Software,
            FlowControl::Hardware => tokio_serial::FlowControl::Hardware,
        }
    }
}

/// Classify a port I/O failure. An unplugged adapter shows up as a broken
/// pipe or not-connected error.
fn io_error(e: io::Error) -> Error {
    match e.kind() {
        io::ErrorKind::BrokenPipe | io::ErrorKind::NotConnected => Error::ConnectionLost,
        _ => Error::Io(e),
    }
}

/// Serial port transport to a voice recognition module.
pub struct SerialTransport {
    stream: Option<SerialStream>,
    port_name: String,
    config: SerialConfig,
}

impl SerialTransport {
    /// Open `port` at `baud_rate`, 8N1, no flow control.
    pub async fn open(port: &str, baud_rate: BaudRate) -> Result<Self> {
        Self::open_with_config(port, SerialConfig::new(baud_rate)).await
    }

    /// Open `port` with explicit line settings.
    pub async fn open_with_config(port: &str, config: SerialConfig) -> Result<Self> {
        debug!(port, ?config, "opening serial port");

        let stream = tokio_serial::new(port, config.baud_rate.bps())
            .data_bits(tokio_serial::DataBits::Eight)
            .stop_bits(config.stop_bits.into())
            .parity(config.parity.into())
            .flow_control(config.flow_control.into())
            .open_native_async()
            .map_err(|e| {
                error!(port, error = %e, "failed to open serial port");
                Error::Transport(format!("failed to open serial port {port}: {e}"))
            })?;

        info!(port, baud = config.baud_rate.bps(), "serial port opened");
        Ok(SerialTransport {
            stream: Some(stream),
            port_name: port.to_string(),
            config,
        })
    }

    /// The OS name of the port.
    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    /// Line settings currently in effect.
    pub fn config(&self) -> &SerialConfig {
        &self.config
    }

    /// Change the host-side baud rate without reopening the port.
    ///
    /// Use after the module has acknowledged a baud rate change.
    pub fn set_baud_rate(&mut self, baud_rate: BaudRate) -> Result<()> {
        let stream = self.stream.as_mut().ok_or(Error::NotConnected)?;
        stream
            .set_baud_rate(baud_rate.bps())
            .map_err(|e| Error::Transport(format!("{}: {e}", self.port_name)))?;
        self.config.baud_rate = baud_rate;
        info!(port = %self.port_name, baud = baud_rate.bps(), "baud rate changed");
        Ok(())
    }
}

#[async_trait]
impl Transport for SerialTransport {
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        let stream = self.stream.as_mut().ok_or(Error::NotConnected)?;
        trace!(port = %self.port_name, data = ?data, "tx");

        let written = match stream.write_all(data).await {
            Ok(()) => stream.flush().await,
            Err(e) => Err(e),
        };
        written.map_err(|e| {
            error!(port = %self.port_name, error = %e, "serial write failed");
            io_error(e)
        })
    }

    async fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize> {
        let stream = self.stream.as_mut().ok_or(Error::NotConnected)?;

        let n = tokio::time::timeout(timeout, stream.read(buf))
            .await
            .map_err(|_| Error::Timeout)?
            .map_err(|e| {
                error!(port = %self.port_name, error = %e, "serial read failed");
                io_error(e)
            })?;
        trace!(port = %self.port_name, data = ?&buf[..n], "rx");
        Ok(n)
    }

    async fn bytes_available(&mut self) -> Result<usize> {
        let stream = self.stream.as_ref().ok_or(Error::NotConnected)?;
        let n = stream
            .bytes_to_read()
            .map_err(|e| Error::Transport(format!("{}: {e}", self.port_name)))?;
        Ok(n as usize)
    }

    async fn discard_input(&mut self) -> Result<()> {
        let stream = self.stream.as_ref().ok_or(Error::NotConnected)?;
        stream
            .clear(ClearBuffer::Input)
            .map_err(|e| Error::Transport(format!("{}: {e}", self.port_name)))
    }

    async fn close(&mut self) -> Result<()> {
        let Some(mut stream) = self.stream.take() else {
            return Ok(());
        };
        if let Err(e) = stream.flush().await {
            warn!(port = %self.port_name, error = %e, "flush before close failed");
        }
        info!(port = %self.port_name, "serial port closed");
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.stream.is_some()
    }
}
