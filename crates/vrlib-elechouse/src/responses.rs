//! Decoded replies from the module.
//!
//! These are the semantic results of dispatcher operations. Parsing from raw
//! frames lives in [`commands`](crate::commands).

use std::fmt;

use vrlib_core::{BaudRate, Group, GroupControl, IoMode, PulseWidth, RECOGNIZER_CAPACITY, RecordId};

/// Output of `check_system_settings`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemSettings {
    /// Raw trained-status byte reported first in the reply.
    pub trained_status: u8,
    pub baud_rate: BaudRate,
    pub io_mode: IoMode,
    pub pulse_width: PulseWidth,
    /// `true` when auto-load is enabled at power-up.
    pub auto_load: bool,
    pub group_control: GroupControl,
}

/// Output of `check_recognizer`: what is currently loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognizerState {
    /// Number of valid (loaded and trained) slots.
    pub valid_count: u8,
    /// Record held by each recognizer slot, `None` when the slot is empty.
    pub slots: [Option<RecordId>; RECOGNIZER_CAPACITY],
    /// Bit `i` set means slot `i` holds an untrained record.
    pub untrained_bitmap: u8,
    /// Group mode, when the firmware reports it.
    pub group_mode: Option<GroupControl>,
}

impl RecognizerState {
    /// Loaded records, in slot order.
    pub fn loaded(&self) -> Vec<RecordId> {
        self.slots.iter().flatten().copied().collect()
    }
}

/// Train state of one record as reported by `check_records`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrainStatus {
    Untrained,
    Trained,
    OutOfRange,
    Other(u8),
}

impl TrainStatus {
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            0x00 => TrainStatus::Untrained,
            0x01 => TrainStatus::Trained,
            0xFF => TrainStatus::OutOfRange,
            other => TrainStatus::Other(other),
        }
    }
}

/// Output of `check_records`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RecordCheck {
    pub trained_count: u8,
    pub entries: Vec<(RecordId, TrainStatus)>,
}

/// Per-record result of a training session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrainResult {
    Success,
    /// Nobody spoke in time.
    Timeout,
    OutOfRange,
    Other(u8),
}

impl TrainResult {
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            0x00 => TrainResult::Success,
            0x01 => TrainResult::Timeout,
            0x02 => TrainResult::OutOfRange,
            other => TrainResult::Other(other),
        }
    }
}

/// A progress message the module emits while training.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    /// Record being trained, if the prompt names one.
    pub record: Option<RecordId>,
    pub text: String,
}

impl fmt::Display for Prompt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.record {
            Some(r) => write!(f, "[{r}] {}", self.text),
            None => write!(f, "{}", self.text),
        }
    }
}

/// Output of `train` and `train_with_signature`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TrainOutcome {
    pub trained_count: u8,
    pub entries: Vec<(RecordId, TrainResult)>,
    /// Signature echoed by `train_with_signature`; empty otherwise.
    pub signature: Vec<u8>,
    /// Prompts received before the final reply, in arrival order.
    pub prompts: Vec<Prompt>,
}

/// Per-record result of loading into the recognizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStatus {
    Loaded,
    OutOfRange,
    Untrained,
    RecognizerFull,
    AlreadyLoaded,
    Other(u8),
}

impl LoadStatus {
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            0x00 => LoadStatus::Loaded,
            0xFF => LoadStatus::OutOfRange,
            0xFE => LoadStatus::Untrained,
            0xFD => LoadStatus::RecognizerFull,
            0xFC => LoadStatus::AlreadyLoaded,
            other => LoadStatus::Other(other),
        }
    }
}

/// Output of `load` and the group load operations.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LoadOutcome {
    pub loaded_count: u8,
    pub entries: Vec<(RecordId, LoadStatus)>,
}

/// Members of one user group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserGroupEntry {
    pub group: Group,
    pub records: Vec<RecordId>,
}

/// A recognition event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recognition {
    pub record: RecordId,
    /// Group mode in effect, when reported.
    pub group_mode: Option<u8>,
    /// Recognizer slot that matched, when reported.
    pub recognizer_index: Option<u8>,
    /// Signature of the matched record; empty when none or not reported.
    pub signature: Vec<u8>,
}

impl Recognition {
    /// Signature as text, if it is valid UTF-8 and non-empty.
    pub fn signature_str(&self) -> Option<&str> {
        if self.signature.is_empty() {
            return None;
        }
        std::str::from_utf8(&self.signature).ok()
    }
}
