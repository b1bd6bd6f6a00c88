//! Request builders and reply parsers for the V3 command set.
//!
//! Builders return a [`Frame`] ready for encoding; parsers take the reply
//! frame the dispatcher accepted and decode its payload. Nothing here does
//! I/O. Record list arguments are normalized before they are placed in a
//! frame, so every builder sees a sorted, duplicate-free list.

use vrlib_core::{
    BaudRate, EMPTY_SLOT, Error, Group, GroupControl, IoMode, PulseWidth, RECOGNIZER_CAPACITY,
    RecordId, Result, SystemGroup,
};

use crate::frame::*;
use crate::records::{ListRules, prepare};
use crate::responses::*;

/// Control byte asking the module to report its group control setting.
const GROUP_CONTROL_QUERY: u8 = 0xFE;

/// Bytes per user group in a check-user-group reply: group number plus
/// seven member slots.
const USER_GROUP_CHUNK: usize = 1 + RECOGNIZER_CAPACITY;

/// Rules for lists that go into the recognizer or a user group.
const RECOGNIZER_LIST: ListRules = ListRules {
    non_empty: true,
    max: Some(RECOGNIZER_CAPACITY),
};

fn check_record(record: RecordId) -> Result<()> {
    if record == EMPTY_SLOT {
        return Err(Error::InvalidParameter(format!(
            "record 0x{EMPTY_SLOT:02X} is reserved"
        )));
    }
    Ok(())
}

fn user_group(group: Group) -> Result<u8> {
    if group.is_all() {
        return Err(Error::InvalidParameter(
            "operation needs a single user group".into(),
        ));
    }
    Ok(group.value())
}

/// Fail with [`Error::MalformedFrame`] unless `payload` holds at least `min` bytes.
fn require(payload: &[u8], min: usize, what: &str) -> Result<()> {
    if payload.len() < min {
        return Err(Error::MalformedFrame(format!(
            "{what} reply too short: {} bytes, need {min}",
            payload.len()
        )));
    }
    Ok(())
}

/// Decode `(record, status)` pairs.
fn pairs<T>(data: &[u8], what: &str, decode: fn(u8) -> T) -> Result<Vec<(RecordId, T)>> {
    let chunks = data.chunks_exact(2);
    if !chunks.remainder().is_empty() {
        return Err(Error::MalformedFrame(format!(
            "{what} reply has a dangling status byte"
        )));
    }
    Ok(chunks.map(|p| (p[0], decode(p[1]))).collect())
}

// ---------------------------------------------------------------
// System commands
// ---------------------------------------------------------------

pub fn check_system_settings() -> Frame {
    Frame::new(CMD_CHECK_SYSTEM, Vec::new())
}

pub fn check_recognizer() -> Frame {
    Frame::new(CMD_CHECK_BSR, Vec::new())
}

/// Query train status of `records`; an empty list asks about every record.
pub fn check_records(records: &[RecordId]) -> Result<Frame> {
    let mut list = prepare(records, ListRules::default())?;
    if list.is_empty() {
        list.push(EMPTY_SLOT);
    }
    Ok(Frame::new(CMD_CHECK_TRAIN, list))
}

pub fn check_signature(record: RecordId) -> Result<Frame> {
    check_record(record)?;
    Ok(Frame::new(CMD_CHECK_SIG, vec![record]))
}

pub fn restore_system_settings() -> Frame {
    Frame::new(CMD_RESET_DEFAULT, Vec::new())
}

pub fn set_baud_rate(rate: BaudRate) -> Frame {
    Frame::new(CMD_SET_BAUD_RATE, vec![rate.to_byte()])
}

pub fn set_io_mode(mode: IoMode) -> Frame {
    Frame::new(CMD_SET_IO_MODE, vec![mode.to_byte()])
}

pub fn set_pulse_width(width: PulseWidth) -> Frame {
    Frame::new(CMD_SET_PULSE_WIDTH, vec![width.level()])
}

/// Reset output pins to their idle level; an empty list resets all of them.
pub fn reset_io(ios: &[u8]) -> Frame {
    let mut list = crate::records::normalize(ios);
    if list.is_empty() {
        list.push(0xFF);
    }
    Frame::new(CMD_RESET_IO, list)
}

/// Auto-load `records` at power-up. The leading bitmap marks which of the
/// following bytes are valid.
pub fn set_auto_load(records: &[RecordId]) -> Result<Frame> {
    let list = prepare(records, RECOGNIZER_LIST)?;
    let bitmap = ((1u16 << list.len()) - 1) as u8;
    let mut payload = Vec::with_capacity(1 + list.len());
    payload.push(bitmap);
    payload.extend_from_slice(&list);
    Ok(Frame::new(CMD_SET_AUTO_LOAD, payload))
}

pub fn disable_auto_load() -> Frame {
    Frame::new(CMD_SET_AUTO_LOAD, vec![0x00])
}

// ---------------------------------------------------------------
// Record commands
// ---------------------------------------------------------------

pub fn train(records: &[RecordId]) -> Result<Frame> {
    let list = prepare(
        records,
        ListRules {
            non_empty: true,
            max: None,
        },
    )?;
    Ok(Frame::new(CMD_TRAIN, list))
}

pub fn train_with_signature(record: RecordId, signature: &[u8]) -> Result<Frame> {
    check_record(record)?;
    let mut payload = Vec::with_capacity(1 + signature.len());
    payload.push(record);
    payload.extend_from_slice(signature);
    Ok(Frame::new(CMD_SIG_TRAIN, payload))
}

/// Attach `signature` to `record`. An empty signature deletes it.
pub fn set_signature(record: RecordId, signature: &[u8]) -> Result<Frame> {
    check_record(record)?;
    let mut payload = Vec::with_capacity(1 + signature.len());
    payload.push(record);
    payload.extend_from_slice(signature);
    Ok(Frame::new(CMD_SET_SIG, payload))
}

pub fn load(records: &[RecordId]) -> Result<Frame> {
    let list = prepare(records, RECOGNIZER_LIST)?;
    Ok(Frame::new(CMD_LOAD, list))
}

pub fn clear() -> Frame {
    Frame::new(CMD_CLEAR, Vec::new())
}

// ---------------------------------------------------------------
// Group commands
// ---------------------------------------------------------------

pub fn set_group_control(control: GroupControl) -> Frame {
    Frame::with_subcommand(CMD_GROUP, SUB_GROUP_SET, vec![control.to_byte()])
}

pub fn check_group_control() -> Frame {
    Frame::with_subcommand(CMD_GROUP, SUB_GROUP_SET, vec![GROUP_CONTROL_QUERY])
}

pub fn set_user_group(group: Group, records: &[RecordId]) -> Result<Frame> {
    let g = user_group(group)?;
    let list = prepare(records, RECOGNIZER_LIST)?;
    let mut payload = Vec::with_capacity(1 + list.len());
    payload.push(g);
    payload.extend_from_slice(&list);
    Ok(Frame::with_subcommand(CMD_GROUP, SUB_GROUP_SET_USER, payload))
}

pub fn load_system_group(group: SystemGroup) -> Frame {
    Frame::with_subcommand(CMD_GROUP, SUB_GROUP_LOAD_SYSTEM, vec![group.value()])
}

pub fn load_user_group(group: Group) -> Result<Frame> {
    let g = user_group(group)?;
    Ok(Frame::with_subcommand(CMD_GROUP, SUB_GROUP_LOAD_USER, vec![g]))
}

/// Query one user group, or all of them with [`Group::ALL`].
pub fn check_user_group(group: Group) -> Frame {
    Frame::with_subcommand(CMD_GROUP, SUB_GROUP_CHECK_USER, vec![group.value()])
}

// ---------------------------------------------------------------
// Test commands
// ---------------------------------------------------------------

pub fn test_read() -> Frame {
    Frame::with_subcommand(CMD_TEST, SUB_TEST_READ, Vec::new())
}

pub fn test_write(data: &[u8]) -> Frame {
    Frame::with_subcommand(CMD_TEST, SUB_TEST_WRITE, data.to_vec())
}

// ---------------------------------------------------------------
// Reply parsers
// ---------------------------------------------------------------

/// Payload layout: `STA BR IOM IOPW AL GRP`.
pub fn parse_system_settings(frame: &Frame) -> Result<SystemSettings> {
    let p = &frame.payload;
    require(p, 6, "system settings")?;
    let baud_rate = BaudRate::from_byte(p[1])
        .ok_or_else(|| Error::MalformedFrame(format!("unknown baud rate index {}", p[1])))?;
    let io_mode = IoMode::from_byte(p[2])
        .ok_or_else(|| Error::MalformedFrame(format!("unknown IO mode {}", p[2])))?;
    let pulse_width = PulseWidth::new(p[3])
        .map_err(|_| Error::MalformedFrame(format!("pulse width level {} out of range", p[3])))?;
    Ok(SystemSettings {
        trained_status: p[0],
        baud_rate,
        io_mode,
        pulse_width,
        auto_load: p[4] != 0,
        group_control: GroupControl::from_byte(p[5])?,
    })
}

/// Payload layout: `VN R0..R6 UNTRAINED [GRPM]`.
pub fn parse_recognizer(frame: &Frame) -> Result<RecognizerState> {
    let p = &frame.payload;
    require(p, 2 + RECOGNIZER_CAPACITY, "recognizer")?;
    let mut slots = [None; RECOGNIZER_CAPACITY];
    for (slot, &byte) in slots.iter_mut().zip(&p[1..=RECOGNIZER_CAPACITY]) {
        *slot = (byte != EMPTY_SLOT).then_some(byte);
    }
    let group_mode = p
        .get(2 + RECOGNIZER_CAPACITY)
        .map(|&b| GroupControl::from_byte(b))
        .transpose()?;
    Ok(RecognizerState {
        valid_count: p[0],
        slots,
        untrained_bitmap: p[1 + RECOGNIZER_CAPACITY],
        group_mode,
    })
}

/// Payload layout: `N (R STA)*`.
pub fn parse_record_check(frame: &Frame) -> Result<RecordCheck> {
    let p = &frame.payload;
    require(p, 1, "record check")?;
    Ok(RecordCheck {
        trained_count: p[0],
        entries: pairs(&p[1..], "record check", TrainStatus::from_byte)?,
    })
}

/// Payload layout: `R SIGLEN SIG..`.
pub fn parse_signature(frame: &Frame, record: RecordId) -> Result<Vec<u8>> {
    let p = &frame.payload;
    require(p, 2, "signature")?;
    if p[0] != record {
        return Err(Error::MalformedFrame(format!(
            "signature reply for record {}, asked for {record}",
            p[0]
        )));
    }
    let len = p[1] as usize;
    p.get(2..2 + len).map(<[u8]>::to_vec).ok_or_else(|| {
        Error::MalformedFrame(format!(
            "signature length {len} exceeds {} available bytes",
            p.len() - 2
        ))
    })
}

/// Payload layout: `N (R STA)*`.
pub fn parse_train(frame: &Frame) -> Result<TrainOutcome> {
    let p = &frame.payload;
    require(p, 1, "train")?;
    Ok(TrainOutcome {
        trained_count: p[0],
        entries: pairs(&p[1..], "train", TrainResult::from_byte)?,
        ..TrainOutcome::default()
    })
}

/// Payload layout: `N R STA SIG..`.
pub fn parse_signature_train(frame: &Frame) -> Result<TrainOutcome> {
    let p = &frame.payload;
    require(p, 3, "signature train")?;
    Ok(TrainOutcome {
        trained_count: p[0],
        entries: vec![(p[1], TrainResult::from_byte(p[2]))],
        signature: p[3..].to_vec(),
        prompts: Vec::new(),
    })
}

/// Payload layout: `N (R STA)*`. Takes the bytes after any sub-command.
pub fn parse_load(payload: &[u8]) -> Result<LoadOutcome> {
    require(payload, 1, "load")?;
    Ok(LoadOutcome {
        loaded_count: payload[0],
        entries: pairs(&payload[1..], "load", LoadStatus::from_byte)?,
    })
}

pub fn parse_group_control(frame: &Frame) -> Result<GroupControl> {
    require(&frame.payload, 1, "group control")?;
    GroupControl::from_byte(frame.payload[0])
}

/// Payload layout: `(G R0..R6)*`, one chunk per group.
pub fn parse_user_groups(frame: &Frame) -> Result<Vec<UserGroupEntry>> {
    let chunks = frame.payload.chunks_exact(USER_GROUP_CHUNK);
    if !chunks.remainder().is_empty() {
        return Err(Error::MalformedFrame(format!(
            "user group reply of {} bytes is not a multiple of {USER_GROUP_CHUNK}",
            frame.payload.len()
        )));
    }
    chunks
        .map(|chunk| {
            let group = Group::new(chunk[0]).map_err(|_| {
                Error::MalformedFrame(format!("user group {} out of range", chunk[0]))
            })?;
            let records = chunk[1..]
                .iter()
                .copied()
                .filter(|&r| r != EMPTY_SLOT)
                .collect();
            Ok(UserGroupEntry { group, records })
        })
        .collect()
}

/// Payload layout: `R TEXT..`. A record byte of `0xFF` means none.
pub fn parse_prompt(frame: &Frame) -> Prompt {
    match frame.payload.split_first() {
        Some((&record, text)) => Prompt {
            record: (record != EMPTY_SLOT).then_some(record),
            text: String::from_utf8_lossy(text).into_owned(),
        },
        None => Prompt {
            record: None,
            text: String::new(),
        },
    }
}

/// Short form: `R`. Long form: `00 GRPM R RI SIGLEN SIG..`.
pub fn parse_recognition(frame: &Frame) -> Result<Recognition> {
    match frame.payload.as_slice() {
        [record] => Ok(Recognition {
            record: *record,
            group_mode: None,
            recognizer_index: None,
            signature: Vec::new(),
        }),
        [0x00, group_mode, record, index, siglen, sig @ ..] => {
            let len = *siglen as usize;
            let signature = sig.get(..len).ok_or_else(|| {
                Error::MalformedFrame(format!(
                    "recognition signature length {len} exceeds {} available bytes",
                    sig.len()
                ))
            })?;
            Ok(Recognition {
                record: *record,
                group_mode: Some(*group_mode),
                recognizer_index: Some(*index),
                signature: signature.to_vec(),
            })
        }
        other => Err(Error::MalformedFrame(format!(
            "recognition payload of {} bytes has no known layout",
            other.len()
        ))),
    }
}
