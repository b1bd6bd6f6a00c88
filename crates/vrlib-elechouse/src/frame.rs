//! Voice Recognition V3 frame encoder and structural parser.
//!
//! Every message in either direction is one length-delimited frame:
//!
//! ```text
//! 0xAA <len> <cmd> [<sub>] [<payload>...] 0x0A
//! ```
//!
//! - Head: `0xAA`
//! - `len`: declared length, see [`LengthConvention`]
//! - `cmd`: command byte
//! - `sub`: sub-command byte, present only for group (`0x32`) and test
//!   (`0xEE`) frames
//! - `payload`: zero or more bytes
//! - End: `0x0A`
//!
//! Byte-at-a-time reception from a live transport is handled by
//! [`FrameReceiver`](crate::receiver::FrameReceiver); [`parse_frame`] checks a
//! complete buffer.

use bytes::{BufMut, BytesMut};
use vrlib_core::{Error, Result};

/// Frame head sentinel.
pub const FRAME_HEAD: u8 = 0xAA;

/// Frame end sentinel.
pub const FRAME_END: u8 = 0x0A;

/// Largest declared length accepted in either direction.
///
/// The length byte could express 255, but nothing the module sends comes
/// close. Anything above this on receive is treated as line corruption.
pub const MAX_LENGTH: usize = 250;

// ---------------------------------------------------------------
// Command codes
// ---------------------------------------------------------------

pub const CMD_CHECK_SYSTEM: u8 = 0x00;
pub const CMD_CHECK_BSR: u8 = 0x01;
pub const CMD_CHECK_TRAIN: u8 = 0x02;
pub const CMD_CHECK_SIG: u8 = 0x03;

pub const CMD_RESET_DEFAULT: u8 = 0x10;
pub const CMD_SET_BAUD_RATE: u8 = 0x11;
pub const CMD_SET_IO_MODE: u8 = 0x12;
pub const CMD_SET_PULSE_WIDTH: u8 = 0x13;
pub const CMD_RESET_IO: u8 = 0x14;
pub const CMD_SET_AUTO_LOAD: u8 = 0x15;

pub const CMD_TRAIN: u8 = 0x20;
pub const CMD_SIG_TRAIN: u8 = 0x21;
pub const CMD_SET_SIG: u8 = 0x22;

pub const CMD_LOAD: u8 = 0x30;
pub const CMD_CLEAR: u8 = 0x31;
pub const CMD_GROUP: u8 = 0x32;

pub const CMD_TEST: u8 = 0xEE;

/// Unsolicited: a loaded record was recognized.
pub const CMD_VOICE_RECOGNIZED: u8 = 0x0D;
/// Unsolicited: training prompt ("Speak now", "Success", ...).
pub const CMD_PROMPT: u8 = 0x0A;
/// Generic error reply.
pub const CMD_ERROR: u8 = 0xFF;

// Sub-commands of CMD_GROUP
pub const SUB_GROUP_SET: u8 = 0x00;
pub const SUB_GROUP_SET_USER: u8 = 0x01;
pub const SUB_GROUP_LOAD_SYSTEM: u8 = 0x02;
pub const SUB_GROUP_LOAD_USER: u8 = 0x03;
pub const SUB_GROUP_CHECK_USER: u8 = 0x04;

// Sub-commands of CMD_TEST
pub const SUB_TEST_WRITE: u8 = 0x00;
pub const SUB_TEST_READ: u8 = 0x01;

/// Returns `true` if frames with this command carry a sub-command byte.
pub fn has_subcommand(command: u8) -> bool {
    matches!(command, CMD_GROUP | CMD_TEST)
}

/// How the declared length byte relates to the frame contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LengthConvention {
    /// `len` counts `cmd` through the last payload byte; `END` follows.
    #[default]
    ExcludesEnd,
    /// `len` also counts the `END` byte. This is what shipping module
    /// firmware sends.
    IncludesEnd,
}

impl LengthConvention {
    /// Bytes counted by `len` beyond command, sub-command and payload.
    pub fn overhead(&self) -> usize {
        match self {
            LengthConvention::ExcludesEnd => 0,
            LengthConvention::IncludesEnd => 1,
        }
    }

    /// Declared length for a body (command through payload) of `body_len` bytes.
    pub fn declared_len(&self, body_len: usize) -> usize {
        body_len + self.overhead()
    }

    /// Body length implied by a declared length, or `None` if the declared
    /// length cannot hold even a command byte.
    pub fn body_len(&self, declared: usize) -> Option<usize> {
        declared.checked_sub(self.overhead()).filter(|&n| n >= 1)
    }

    /// Largest sub-command plus payload size that fits in a frame.
    pub fn max_payload(&self) -> usize {
        MAX_LENGTH - 1 - self.overhead()
    }
}

/// One protocol message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Command byte.
    pub command: u8,
    /// Sub-command byte, for commands where [`has_subcommand`] holds.
    pub subcommand: Option<u8>,
    /// Payload bytes (may be empty).
    pub payload: Vec<u8>,
}

impl Frame {
    /// Create a frame without a sub-command.
    pub fn new(command: u8, payload: Vec<u8>) -> Self {
        Frame {
            command,
            subcommand: None,
            payload,
        }
    }

    /// Create a frame with a sub-command.
    pub fn with_subcommand(command: u8, subcommand: u8, payload: Vec<u8>) -> Self {
        Frame {
            command,
            subcommand: Some(subcommand),
            payload,
        }
    }

    /// Split a received body (command through last payload byte) into fields.
    pub fn from_body(body: &[u8]) -> Result<Self> {
        let (&command, rest) = body
            .split_first()
            .ok_or_else(|| Error::MalformedFrame("frame has no command byte".into()))?;
        match rest.split_first() {
            Some((&sub, payload)) if has_subcommand(command) => Ok(Frame::with_subcommand(
                command,
                sub,
                payload.to_vec(),
            )),
            _ => Ok(Frame::new(command, rest.to_vec())),
        }
    }

    /// Returns `true` if this is the module's generic error reply.
    pub fn is_error(&self) -> bool {
        self.command == CMD_ERROR
    }

    /// Encode into wire bytes under the given length convention.
    pub fn encode(&self, convention: LengthConvention) -> Result<Vec<u8>> {
        build_frame_with(convention, self.command, self.subcommand, &self.payload)
    }
}

/// Encode a frame with the default [`LengthConvention`].
///
/// # Example
///
/// ```
/// use vrlib_elechouse::frame::{build_frame, CMD_CLEAR};
///
/// let bytes = build_frame(CMD_CLEAR, None, &[]).unwrap();
/// assert_eq!(bytes, vec![0xAA, 0x01, 0x31, 0x0A]);
/// ```
pub fn build_frame(command: u8, subcommand: Option<u8>, payload: &[u8]) -> Result<Vec<u8>> {
    build_frame_with(LengthConvention::default(), command, subcommand, payload)
}

/// Encode a frame under an explicit [`LengthConvention`].
///
/// Fails with [`Error::PayloadTooLarge`] when the sub-command plus payload
/// would push the declared length past [`MAX_LENGTH`]; nothing is truncated.
pub fn build_frame_with(
    convention: LengthConvention,
    command: u8,
    subcommand: Option<u8>,
    payload: &[u8],
) -> Result<Vec<u8>> {
    let extra = subcommand.is_some() as usize + payload.len();
    let max = convention.max_payload();
    if extra > max {
        return Err(Error::PayloadTooLarge { len: extra, max });
    }

    let declared = convention.declared_len(1 + extra);
    let mut buf = BytesMut::with_capacity(2 + 1 + extra + 1);
    buf.put_u8(FRAME_HEAD);
    buf.put_u8(declared as u8);
    buf.put_u8(command);
    if let Some(sub) = subcommand {
        buf.put_u8(sub);
    }
    buf.put_slice(payload);
    buf.put_u8(FRAME_END);
    Ok(buf.to_vec())
}

/// Validate and decode one complete frame occupying all of `bytes`.
pub fn parse_frame(bytes: &[u8], convention: LengthConvention) -> Result<Frame> {
    let [head, declared, rest @ ..] = bytes else {
        return Err(Error::MalformedFrame(format!(
            "frame too short: {} bytes",
            bytes.len()
        )));
    };
    if *head != FRAME_HEAD {
        return Err(Error::MalformedFrame(format!("bad head byte 0x{head:02X}")));
    }
    let declared = *declared as usize;
    if declared > MAX_LENGTH {
        return Err(Error::MalformedFrame(format!(
            "declared length {declared} exceeds {MAX_LENGTH}"
        )));
    }
    let body_len = convention
        .body_len(declared)
        .ok_or_else(|| Error::MalformedFrame(format!("declared length {declared} too small")))?;
    if rest.len() != body_len + 1 {
        return Err(Error::MalformedFrame(format!(
            "declared length {declared} does not match {} trailing bytes",
            rest.len()
        )));
    }
    let (body, end) = rest.split_at(body_len);
    if end[0] != FRAME_END {
        return Err(Error::MalformedFrame(format!(
            "bad end byte 0x{:02X}",
            end[0]
        )));
    }
    Frame::from_body(body)
}
