//! # vrlib -- Host-side driver for serial voice recognition modules
//!
//! `vrlib` is an asynchronous Rust library for driving the Elechouse Voice
//! Recognition V3 module over a serial link: training voice commands,
//! loading them into the recognizer, managing groups and signatures, and
//! waiting for recognition events.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::time::Duration;
//! use vrlib::elechouse::VoiceRecognizerBuilder;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> vrlib::Result<()> {
//!     let mut vr = VoiceRecognizerBuilder::new()
//!         .serial_port("/dev/ttyUSB0")
//!         .build()
//!         .await?;
//!
//!     vr.load(&[0, 1, 2]).await?;
//!     loop {
//!         match vr.recognize_with_timeout(Duration::from_secs(5)).await {
//!             Ok(hit) => println!("heard record {}", hit.record),
//!             Err(e) if e.kind() == vrlib::ErrorKind::Timeout => continue,
//!             Err(e) => return Err(e),
//!         }
//!     }
//! }
//! ```
//!
//! ## Architecture
//!
//! | Crate                | Purpose                                        |
//! |----------------------|------------------------------------------------|
//! | `vrlib-core`         | [`Transport`] trait, module types, errors      |
//! | `vrlib-transport`    | Serial port transport                          |
//! | `vrlib-elechouse`    | V3 frame protocol and command dispatcher       |
//! | **`vrlib`**          | This facade crate -- re-exports everything     |
//!
//! ## Error Handling
//!
//! Every operation returns [`Result<T>`]. Use [`Error::kind`] to branch on
//! the failure category without matching variant fields:
//!
//! ```
//! use vrlib::{Error, ErrorKind};
//!
//! let err = Error::UnexpectedFrame { command: 0x0D };
//! assert_eq!(err.kind(), ErrorKind::UnexpectedFrame);
//! ```

pub use vrlib_core::*;

/// Serial transport.
pub mod transport {
    pub use vrlib_transport::*;
}

/// Elechouse Voice Recognition V3 backend.
///
/// Provides [`VoiceRecognizer`](elechouse::VoiceRecognizer) and
/// [`VoiceRecognizerBuilder`](elechouse::VoiceRecognizerBuilder).
pub mod elechouse {
    pub use vrlib_elechouse::*;
}
