//! Byte-at-a-time frame receiver.
//!
//! [`FrameReceiver`] is a small state machine that is fed one byte at a time
//! and yields a [`Frame`] once a complete, structurally valid frame has been
//! seen:
//!
//! ```text
//! AwaitHead -> AwaitLength -> AwaitBody(n) -> AwaitEnd -> Complete
//! ```
//!
//! Bytes before a head sentinel are line noise and are skipped. A bad
//! declared length or a missing end sentinel fails with
//! [`Error::MalformedFrame`] and leaves the receiver back in `AwaitHead`.
//!
//! [`FrameReceiver::receive`] drives the machine from a [`Transport`] under a
//! single deadline covering the whole frame; individual bytes do not extend
//! it.

use tokio::time::Instant;
use tracing::{debug, trace};

use vrlib_core::{Error, Result, Transport};

use crate::frame::{FRAME_END, FRAME_HEAD, Frame, LengthConvention, MAX_LENGTH};

/// Position of the receiver within a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiveState {
    /// Scanning for the head sentinel.
    AwaitHead,
    /// Head seen, next byte is the declared length.
    AwaitLength,
    /// Collecting bytes; `remaining` still to come.
    AwaitBody { remaining: usize },
    /// Body collected, next byte must be the end sentinel.
    AwaitEnd,
    /// A frame was just produced.
    Complete,
}

/// Frame receive state machine.
#[derive(Debug)]
pub struct FrameReceiver {
    convention: LengthConvention,
    state: ReceiveState,
    body: Vec<u8>,
    /// Noise bytes skipped while scanning for a head, since the last frame.
    skipped: usize,
}

impl FrameReceiver {
    /// Create a receiver in the `AwaitHead` state.
    pub fn new(convention: LengthConvention) -> Self {
        FrameReceiver {
            convention,
            state: ReceiveState::AwaitHead,
            body: Vec::new(),
            skipped: 0,
        }
    }

    /// Current state.
    pub fn state(&self) -> ReceiveState {
        self.state
    }

    /// Number of noise bytes skipped before the current (or last) frame.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Return to `AwaitHead`, dropping any partial frame.
    pub fn reset(&mut self) {
        self.state = ReceiveState::AwaitHead;
        self.body.clear();
    }

    /// Feed one byte.
    ///
    /// Returns `Ok(Some(frame))` when `byte` completes a frame, `Ok(None)`
    /// when more bytes are needed.
    pub fn push(&mut self, byte: u8) -> Result<Option<Frame>> {
        match self.state {
            ReceiveState::Complete => {
                self.reset();
                self.skipped = 0;
                self.push(byte)
            }
            ReceiveState::AwaitHead => {
                if byte == FRAME_HEAD {
                    self.state = ReceiveState::AwaitLength;
                } else {
                    self.skipped += 1;
                    trace!(byte, "skipping noise byte before frame head");
                }
                Ok(None)
            }
            ReceiveState::AwaitLength => {
                let declared = byte as usize;
                if declared > MAX_LENGTH {
                    return self.fail(format!("declared length {declared} exceeds {MAX_LENGTH}"));
                }
                if self.convention.body_len(declared).is_none() {
                    return self.fail(format!("declared length {declared} too small"));
                }
                self.body.clear();
                self.body.reserve(declared);
                self.state = ReceiveState::AwaitBody {
                    remaining: declared,
                };
                Ok(None)
            }
            ReceiveState::AwaitBody { remaining } => {
                self.body.push(byte);
                let remaining = remaining - 1;
                if remaining > 0 {
                    self.state = ReceiveState::AwaitBody { remaining };
                    return Ok(None);
                }
                self.state = ReceiveState::AwaitEnd;
                match self.convention {
                    LengthConvention::ExcludesEnd => Ok(None),
                    // The declared length already covered the end sentinel.
                    LengthConvention::IncludesEnd => match self.body.pop() {
                        Some(end) => self.finish(end),
                        None => self.fail("empty frame body".into()),
                    },
                }
            }
            ReceiveState::AwaitEnd => self.finish(byte),
        }
    }

    /// Validate the end sentinel and emit the collected frame.
    fn finish(&mut self, end: u8) -> Result<Option<Frame>> {
        if end != FRAME_END {
            return self.fail(format!("bad end byte 0x{end:02X}"));
        }
        let frame = Frame::from_body(&self.body);
        self.body.clear();
        match frame {
            Ok(frame) => {
                self.state = ReceiveState::Complete;
                Ok(Some(frame))
            }
            Err(e) => {
                self.state = ReceiveState::AwaitHead;
                Err(e)
            }
        }
    }

    fn fail(&mut self, reason: String) -> Result<Option<Frame>> {
        debug!(reason = %reason, "discarding malformed frame");
        self.reset();
        Err(Error::MalformedFrame(reason))
    }

    /// Read bytes from `transport` until a frame completes or `deadline`
    /// passes.
    ///
    /// A deadline expiry at any point yields [`Error::Timeout`]; a structural
    /// mismatch yields [`Error::MalformedFrame`]. Neither is retried here.
    pub async fn receive(
        &mut self,
        transport: &mut dyn Transport,
        deadline: Instant,
    ) -> Result<Frame> {
        if self.state == ReceiveState::Complete {
            self.reset();
            self.skipped = 0;
        }
        loop {
            let byte = match transport.receive_byte(deadline).await {
                Ok(byte) => byte,
                Err(Error::Timeout) => {
                    trace!(state = ?self.state, "deadline expired while receiving frame");
                    self.reset();
                    return Err(Error::Timeout);
                }
                Err(e) => {
                    self.reset();
                    return Err(e);
                }
            };
            if let Some(frame) = self.push(byte)? {
                if self.skipped > 0 {
                    debug!(skipped = self.skipped, "skipped noise before frame");
                }
                return Ok(frame);
            }
        }
    }
}

/// Receive one frame with a fresh receiver.
pub async fn receive_frame(
    transport: &mut dyn Transport,
    deadline: Instant,
    convention: LengthConvention,
) -> Result<Frame> {
    FrameReceiver::new(convention)
        .receive(transport, deadline)
        .await
}
