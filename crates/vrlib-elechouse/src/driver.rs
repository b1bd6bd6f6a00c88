//! VoiceRecognizer -- the command dispatcher for a V3 module.
//!
//! Every public operation builds exactly one request frame, sends it, waits
//! for a reply whose command is meaningful for that operation, and decodes
//! the reply. Operations take `&mut self`, so only one exchange is ever in
//! flight and replies correlate with requests without any matching IDs.

use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use vrlib_core::error::{Error, Result};
use vrlib_core::transport::Transport;
use vrlib_core::types::*;

use crate::commands;
use crate::frame::{
    CMD_PROMPT, CMD_SIG_TRAIN, CMD_TRAIN, CMD_VOICE_RECOGNIZED, Frame, LengthConvention,
};
use crate::receiver::FrameReceiver;
use crate::responses::*;

/// Reply timeout for ordinary commands.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(1000);

/// Reply timeout while training. The module prompts the speaker twice per
/// record, so this is much longer than [`DEFAULT_TIMEOUT`].
pub const TRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Runtime settings for a [`VoiceRecognizer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverConfig {
    /// Time allowed for each reply frame of an ordinary command.
    pub command_timeout: Duration,
    /// Time allowed for each frame (prompt or final reply) while training.
    pub train_timeout: Duration,
    /// How the length byte is counted, in both directions.
    pub convention: LengthConvention,
    /// Drop buffered input before each request.
    pub discard_stale_input: bool,
}

impl Default for DriverConfig {
    fn default() -> Self {
        DriverConfig {
            command_timeout: DEFAULT_TIMEOUT,
            train_timeout: TRAIN_TIMEOUT,
            convention: LengthConvention::default(),
            discard_stale_input: true,
        }
    }
}

/// A connected Elechouse Voice Recognition V3 module.
///
/// Constructed via [`VoiceRecognizerBuilder`](crate::builder::VoiceRecognizerBuilder).
/// All module communication goes through the [`Transport`] provided at
/// build time. A failed operation leaves the driver usable; the next call
/// starts a fresh exchange.
pub struct VoiceRecognizer {
    transport: Box<dyn Transport>,
    receiver: FrameReceiver,
    config: DriverConfig,
}

impl VoiceRecognizer {
    /// Called by [`VoiceRecognizerBuilder`](crate::builder::VoiceRecognizerBuilder);
    /// callers should use the builder API instead.
    pub(crate) fn new(transport: Box<dyn Transport>, config: DriverConfig) -> Self {
        VoiceRecognizer {
            transport,
            receiver: FrameReceiver::new(config.convention),
            config,
        }
    }

    /// The settings this driver was built with.
    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    /// Returns `true` while the underlying transport is connected.
    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    /// Close the underlying transport.
    pub async fn close(&mut self) -> Result<()> {
        self.transport.close().await
    }

    // ---------------------------------------------------------------
    // Exchange plumbing
    // ---------------------------------------------------------------

    async fn discard_stale(&mut self) -> Result<()> {
        let stale = self.transport.bytes_available().await?;
        if stale > 0 {
            debug!(bytes = stale, "discarding stale input before request");
            self.transport.discard_input().await?;
        }
        Ok(())
    }

    async fn send_frame(&mut self, frame: &Frame) -> Result<()> {
        let bytes = frame.encode(self.config.convention)?;
        if self.config.discard_stale_input {
            self.discard_stale().await?;
        }
        debug!(
            command = %format_args!("0x{:02X}", frame.command),
            len = bytes.len(),
            "sending frame"
        );
        self.transport.send(&bytes).await
    }

    /// Wait for a frame whose command is in `accept`.
    ///
    /// Each awaited frame gets its own `timeout`. When `prompts` is given,
    /// prompt frames are collected and the wait continues; otherwise they
    /// are unexpected like any other stray frame.
    async fn await_reply(
        &mut self,
        accept: &[u8],
        timeout: Duration,
        mut prompts: Option<&mut Vec<Prompt>>,
    ) -> Result<Frame> {
        loop {
            let deadline = Instant::now() + timeout;
            let frame = self
                .receiver
                .receive(&mut *self.transport, deadline)
                .await?;

            if frame.is_error() {
                let code = frame.payload.first().copied().unwrap_or(0);
                debug!(code = %format_args!("0x{code:02X}"), "module rejected command");
                return Err(Error::PeripheralRejected {
                    code,
                    payload: frame.payload,
                });
            }
            if frame.command == CMD_PROMPT {
                if let Some(collected) = prompts.as_deref_mut() {
                    let prompt = commands::parse_prompt(&frame);
                    debug!(record = ?prompt.record, text = %prompt.text, "training prompt");
                    collected.push(prompt);
                    continue;
                }
            }
            if accept.contains(&frame.command) {
                return Ok(frame);
            }
            debug!(
                command = %format_args!("0x{:02X}", frame.command),
                "unexpected frame while awaiting reply"
            );
            return Err(Error::UnexpectedFrame {
                command: frame.command,
            });
        }
    }

    /// Send `frame` and wait for its echo reply under the command timeout.
    async fn exchange(&mut self, frame: Frame) -> Result<Frame> {
        self.send_frame(&frame).await?;
        let timeout = self.config.command_timeout;
        self.await_reply(&[frame.command], timeout, None).await
    }

    /// Like [`exchange`](Self::exchange) for commands with a sub-command:
    /// the reply must echo the sub-command that was sent.
    async fn sub_exchange(&mut self, frame: Frame) -> Result<Frame> {
        let sent = frame.subcommand;
        let reply = self.exchange(frame).await?;
        if reply.subcommand != sent {
            debug!(
                sent = ?sent,
                echoed = ?reply.subcommand,
                "reply does not echo the sub-command"
            );
            return Err(Error::UnexpectedFrame {
                command: reply.command,
            });
        }
        Ok(reply)
    }

    async fn ack(&mut self, frame: Frame) -> Result<()> {
        self.exchange(frame).await.map(drop)
    }

    // ---------------------------------------------------------------
    // System settings
    // ---------------------------------------------------------------

    /// Read baud rate, output settings, auto-load and group control.
    pub async fn check_system_settings(&mut self) -> Result<SystemSettings> {
        let reply = self.exchange(commands::check_system_settings()).await?;
        commands::parse_system_settings(&reply)
    }

    /// Restore factory settings (9600 baud, pulse mode, auto-load off).
    pub async fn restore_system_settings(&mut self) -> Result<()> {
        self.ack(commands::restore_system_settings()).await
    }

    /// Change the module's baud rate.
    ///
    /// The module switches once it has acknowledged; the host side must then
    /// reopen its transport at the new rate.
    pub async fn set_baud_rate(&mut self, rate: BaudRate) -> Result<()> {
        self.ack(commands::set_baud_rate(rate)).await
    }

    pub async fn set_io_mode(&mut self, mode: IoMode) -> Result<()> {
        self.ack(commands::set_io_mode(mode)).await
    }

    pub async fn set_pulse_width(&mut self, width: PulseWidth) -> Result<()> {
        self.ack(commands::set_pulse_width(width)).await
    }

    /// Return output pins to their idle level. An empty list resets all.
    pub async fn reset_io(&mut self, ios: &[u8]) -> Result<()> {
        self.ack(commands::reset_io(ios)).await
    }

    /// Records to load automatically at power-up (at most seven).
    pub async fn set_auto_load(&mut self, records: &[RecordId]) -> Result<()> {
        self.ack(commands::set_auto_load(records)?).await
    }

    pub async fn disable_auto_load(&mut self) -> Result<()> {
        self.ack(commands::disable_auto_load()).await
    }

    // ---------------------------------------------------------------
    // Recognizer and records
    // ---------------------------------------------------------------

    /// Read which records are loaded into the recognizer.
    pub async fn check_recognizer(&mut self) -> Result<RecognizerState> {
        let reply = self.exchange(commands::check_recognizer()).await?;
        commands::parse_recognizer(&reply)
    }

    /// Read the train status of `records`, or of every record if empty.
    pub async fn check_records(&mut self, records: &[RecordId]) -> Result<RecordCheck> {
        let reply = self.exchange(commands::check_records(records)?).await?;
        commands::parse_record_check(&reply)
    }

    /// Read the signature attached to `record`; empty when it has none.
    pub async fn check_signature(&mut self, record: RecordId) -> Result<Vec<u8>> {
        let reply = self.exchange(commands::check_signature(record)?).await?;
        commands::parse_signature(&reply, record)
    }

    /// Train `records` with the driver's train timeout.
    pub async fn train(&mut self, records: &[RecordId]) -> Result<TrainOutcome> {
        let timeout = self.config.train_timeout;
        self.train_with_timeout(records, timeout).await
    }

    /// Train `records`, allowing `timeout` for each prompt and the final
    /// reply.
    pub async fn train_with_timeout(
        &mut self,
        records: &[RecordId],
        timeout: Duration,
    ) -> Result<TrainOutcome> {
        let frame = commands::train(records)?;
        self.send_frame(&frame).await?;
        let mut prompts = Vec::new();
        let reply = self
            .await_reply(&[CMD_TRAIN], timeout, Some(&mut prompts))
            .await?;
        let mut outcome = commands::parse_train(&reply)?;
        outcome.prompts = prompts;
        Ok(outcome)
    }

    /// Train `record` and attach `signature` in one step.
    pub async fn train_with_signature(
        &mut self,
        record: RecordId,
        signature: &[u8],
    ) -> Result<TrainOutcome> {
        let frame = commands::train_with_signature(record, signature)?;
        self.send_frame(&frame).await?;
        let timeout = self.config.train_timeout;
        let mut prompts = Vec::new();
        let reply = self
            .await_reply(&[CMD_SIG_TRAIN], timeout, Some(&mut prompts))
            .await?;
        let mut outcome = commands::parse_signature_train(&reply)?;
        outcome.prompts = prompts;
        Ok(outcome)
    }

    pub async fn set_signature(&mut self, record: RecordId, signature: &[u8]) -> Result<()> {
        self.ack(commands::set_signature(record, signature)?).await
    }

    pub async fn delete_signature(&mut self, record: RecordId) -> Result<()> {
        self.set_signature(record, &[]).await
    }

    /// Load up to seven records into the recognizer.
    pub async fn load(&mut self, records: &[RecordId]) -> Result<LoadOutcome> {
        let reply = self.exchange(commands::load(records)?).await?;
        commands::parse_load(&reply.payload)
    }

    /// Empty the recognizer.
    pub async fn clear(&mut self) -> Result<()> {
        self.ack(commands::clear()).await
    }

    // ---------------------------------------------------------------
    // Groups
    // ---------------------------------------------------------------

    pub async fn set_group_control(&mut self, control: GroupControl) -> Result<()> {
        self.sub_exchange(commands::set_group_control(control))
            .await
            .map(drop)
    }

    pub async fn check_group_control(&mut self) -> Result<GroupControl> {
        let reply = self.sub_exchange(commands::check_group_control()).await?;
        commands::parse_group_control(&reply)
    }

    /// Define the members of a user group (at most seven records).
    pub async fn set_user_group(&mut self, group: Group, records: &[RecordId]) -> Result<()> {
        self.sub_exchange(commands::set_user_group(group, records)?)
            .await
            .map(drop)
    }

    /// Load a system group into the recognizer.
    pub async fn load_system_group(&mut self, group: SystemGroup) -> Result<LoadOutcome> {
        let reply = self.sub_exchange(commands::load_system_group(group)).await?;
        commands::parse_load(&reply.payload)
    }

    /// Load a user group into the recognizer.
    pub async fn load_user_group(&mut self, group: Group) -> Result<LoadOutcome> {
        let reply = self.sub_exchange(commands::load_user_group(group)?).await?;
        commands::parse_load(&reply.payload)
    }

    /// List the members of one user group, or all of them with [`Group::ALL`].
    pub async fn check_user_group(&mut self, group: Group) -> Result<Vec<UserGroupEntry>> {
        let reply = self.sub_exchange(commands::check_user_group(group)).await?;
        commands::parse_user_groups(&reply)
    }

    // ---------------------------------------------------------------
    // Factory test
    // ---------------------------------------------------------------

    /// Read the factory test register; returns the raw reply payload.
    pub async fn test_read(&mut self) -> Result<Vec<u8>> {
        let reply = self.sub_exchange(commands::test_read()).await?;
        Ok(reply.payload)
    }

    pub async fn test_write(&mut self, data: &[u8]) -> Result<()> {
        self.sub_exchange(commands::test_write(data)).await.map(drop)
    }

    // ---------------------------------------------------------------
    // Recognition
    // ---------------------------------------------------------------

    /// Wait for a recognition event using the command timeout.
    pub async fn recognize(&mut self) -> Result<Recognition> {
        let timeout = self.config.command_timeout;
        self.recognize_with_timeout(timeout).await
    }

    /// Wait up to `timeout` for the module to report a recognized record.
    ///
    /// Nothing is sent; the module reports recognitions on its own. Input
    /// already buffered is part of the wait, never discarded.
    pub async fn recognize_with_timeout(&mut self, timeout: Duration) -> Result<Recognition> {
        let frame = self
            .await_reply(&[CMD_VOICE_RECOGNIZED], timeout, None)
            .await?;
        let recognition = commands::parse_recognition(&frame)?;
        debug!(record = recognition.record, "record recognized");
        Ok(recognition)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vrlib_test_harness::MockTransport;

    use crate::frame::{
        CMD_CHECK_BSR, CMD_CHECK_SIG, CMD_CHECK_SYSTEM, CMD_CLEAR, CMD_GROUP, CMD_LOAD, CMD_TEST,
        build_frame,
    };

    const CLEAR: [u8; 4] = [0xAA, 0x01, 0x31, 0x0A];

    fn frame(command: u8, sub: Option<u8>, payload: &[u8]) -> Vec<u8> {
        build_frame(command, sub, payload).unwrap()
    }

    fn driver(mock: MockTransport) -> VoiceRecognizer {
        VoiceRecognizer::new(Box::new(mock), DriverConfig::default())
    }

    fn driver_with(mock: MockTransport, config: DriverConfig) -> VoiceRecognizer {
        VoiceRecognizer::new(Box::new(mock), config)
    }

    #[tokio::test]
    async fn clear_sends_minimal_frame() {
        let mut mock = MockTransport::new();
        mock.expect(&CLEAR, &frame(CMD_CLEAR, None, &[0x00]));
        let mut vr = driver(mock);
        vr.clear().await.unwrap();
    }

    #[tokio::test]
    async fn error_reply_is_rejection() {
        let mut mock = MockTransport::new();
        mock.expect(&CLEAR, &[0xAA, 0x02, 0xFF, 0x07, 0x0A]);
        let mut vr = driver(mock);
        match vr.clear().await {
            Err(Error::PeripheralRejected { code, payload }) => {
                assert_eq!(code, 0x07);
                assert_eq!(payload, vec![0x07]);
            }
            other => panic!("expected PeripheralRejected, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_error_reply_has_code_zero() {
        let mut mock = MockTransport::new();
        mock.expect(&CLEAR, &[0xAA, 0x01, 0xFF, 0x0A]);
        let mut vr = driver(mock);
        assert!(matches!(
            vr.clear().await,
            Err(Error::PeripheralRejected { code: 0, .. })
        ));
    }

    #[tokio::test]
    async fn recognize_firmware_length_frame() {
        let mut mock = MockTransport::new();
        mock.inject(&[0xAA, 0x03, 0x0D, 0x05, 0x0A]);
        let config = DriverConfig {
            convention: LengthConvention::IncludesEnd,
            ..DriverConfig::default()
        };
        let mut vr = driver_with(mock, config);
        let rec = vr.recognize().await.unwrap();
        assert_eq!(rec.record, 0x05);
        assert!(rec.signature.is_empty());
    }

    #[tokio::test]
    async fn firmware_length_frame_under_default_convention_times_out() {
        // Length 03 read as command plus two payload bytes; the end byte never comes.
        let mut mock = MockTransport::new();
        mock.inject(&[0xAA, 0x03, 0x0D, 0x05, 0x0A]);
        let mut vr = driver(mock);
        assert!(matches!(vr.recognize().await, Err(Error::Timeout)));
    }

    #[tokio::test]
    async fn default_length_error_reply_is_malformed_under_firmware_convention() {
        let mut mock = MockTransport::new();
        mock.expect(&[0xAA, 0x02, 0x31, 0x0A], &[0xAA, 0x02, 0xFF, 0x07, 0x0A]);
        let config = DriverConfig {
            convention: LengthConvention::IncludesEnd,
            ..DriverConfig::default()
        };
        let mut vr = driver_with(mock, config);
        assert!(matches!(vr.clear().await, Err(Error::MalformedFrame(_))));
    }

    #[tokio::test]
    async fn recognize_long_form_with_signature() {
        let mut mock = MockTransport::new();
        mock.inject(&frame(
            CMD_VOICE_RECOGNIZED,
            None,
            &[0x00, 0xFF, 0x03, 0x01, 0x04, b'l', b'a', b'm', b'p'],
        ));
        let mut vr = driver(mock);
        let rec = vr.recognize().await.unwrap();
        assert_eq!(rec.record, 3);
        assert_eq!(rec.recognizer_index, Some(1));
        assert_eq!(rec.signature_str(), Some("lamp"));
    }

    #[tokio::test]
    async fn recognize_times_out_on_silence() {
        let mut vr = driver(MockTransport::new());
        let result = vr.recognize_with_timeout(Duration::from_millis(50)).await;
        assert!(matches!(result, Err(Error::Timeout)));
    }

    #[tokio::test]
    async fn recognize_skips_leading_noise() {
        let mut mock = MockTransport::new();
        mock.inject(&[0x00, 0x13, 0x37]);
        mock.inject(&frame(CMD_VOICE_RECOGNIZED, None, &[0x09]));
        let mut vr = driver(mock);
        assert_eq!(vr.recognize().await.unwrap().record, 9);
    }

    #[tokio::test]
    async fn timeout_does_not_poison_driver() {
        let mut mock = MockTransport::new();
        mock.expect_silence(&CLEAR);
        mock.expect(&CLEAR, &frame(CMD_CLEAR, None, &[0x00]));
        let mut vr = driver(mock);
        assert!(matches!(vr.clear().await, Err(Error::Timeout)));
        vr.clear().await.unwrap();
    }

    #[tokio::test]
    async fn truncated_reply_times_out() {
        let mut mock = MockTransport::new();
        mock.expect(&CLEAR, &[0xAA, 0x02, 0x31]);
        let mut vr = driver(mock);
        assert!(matches!(vr.clear().await, Err(Error::Timeout)));
    }

    #[tokio::test]
    async fn malformed_reply() {
        let mut mock = MockTransport::new();
        mock.expect(&CLEAR, &[0xAA, 0x01, 0x31, 0x0B]);
        let mut vr = driver(mock);
        assert!(matches!(vr.clear().await, Err(Error::MalformedFrame(_))));
    }

    #[tokio::test]
    async fn reply_for_other_command_is_unexpected() {
        let mut mock = MockTransport::new();
        mock.expect(&CLEAR, &frame(CMD_LOAD, None, &[0x00]));
        let mut vr = driver(mock);
        assert!(matches!(
            vr.clear().await,
            Err(Error::UnexpectedFrame { command: 0x30 })
        ));
    }

    #[tokio::test]
    async fn recognition_during_command_is_unexpected() {
        let mut mock = MockTransport::new();
        mock.expect(&CLEAR, &frame(CMD_VOICE_RECOGNIZED, None, &[0x02]));
        let mut vr = driver(mock);
        assert!(matches!(
            vr.clear().await,
            Err(Error::UnexpectedFrame { command: 0x0D })
        ));
    }

    #[tokio::test]
    async fn prompt_outside_training_is_unexpected() {
        let mut mock = MockTransport::new();
        mock.expect(&CLEAR, &frame(CMD_PROMPT, None, b"\x01Speak now"));
        let mut vr = driver(mock);
        assert!(matches!(
            vr.clear().await,
            Err(Error::UnexpectedFrame { command: 0x0A })
        ));
    }

    #[tokio::test]
    async fn stale_input_is_discarded_before_request() {
        let mut mock = MockTransport::new();
        mock.inject(&frame(CMD_VOICE_RECOGNIZED, None, &[0x02]));
        mock.expect(&CLEAR, &frame(CMD_CLEAR, None, &[0x00]));
        let mut vr = driver(mock);
        vr.clear().await.unwrap();
    }

    #[tokio::test]
    async fn stale_input_kept_when_discard_disabled() {
        let mut mock = MockTransport::new();
        mock.inject(&frame(CMD_VOICE_RECOGNIZED, None, &[0x02]));
        mock.expect(&CLEAR, &frame(CMD_CLEAR, None, &[0x00]));
        let config = DriverConfig {
            discard_stale_input: false,
            ..DriverConfig::default()
        };
        let mut vr = driver_with(mock, config);
        assert!(matches!(
            vr.clear().await,
            Err(Error::UnexpectedFrame { command: 0x0D })
        ));
    }

    #[tokio::test]
    async fn train_collects_prompts() {
        let mut reply = frame(CMD_PROMPT, None, b"\x03Speak now");
        reply.extend(frame(CMD_PROMPT, None, b"\x03Speak again"));
        reply.extend(frame(CMD_TRAIN, None, &[0x01, 0x03, 0x00]));

        let mut mock = MockTransport::new();
        mock.expect(&[0xAA, 0x02, 0x20, 0x03, 0x0A], &reply);
        let mut vr = driver(mock);
        let outcome = vr.train(&[3, 3]).await.unwrap();
        assert_eq!(outcome.trained_count, 1);
        assert_eq!(
            outcome.entries,
            vec![(3, crate::responses::TrainResult::Success)]
        );
        assert_eq!(outcome.prompts.len(), 2);
        assert_eq!(outcome.prompts[0].record, Some(3));
        assert_eq!(outcome.prompts[1].text, "Speak again");
    }

    #[tokio::test]
    async fn train_times_out_without_reply() {
        let mut mock = MockTransport::new();
        mock.expect_silence(&[0xAA, 0x02, 0x20, 0x01, 0x0A]);
        let mut vr = driver(mock);
        let result = vr.train_with_timeout(&[1], Duration::from_millis(20)).await;
        assert!(matches!(result, Err(Error::Timeout)));
    }

    #[tokio::test]
    async fn train_with_signature_echoes_signature() {
        let mut reply = frame(CMD_PROMPT, None, b"\x02Speak now");
        reply.extend(frame(CMD_SIG_TRAIN, None, &[0x01, 0x02, 0x00, b'o', b'n']));

        let mut mock = MockTransport::new();
        mock.expect(&frame(CMD_SIG_TRAIN, None, &[0x02, b'o', b'n']), &reply);
        let mut vr = driver(mock);
        let outcome = vr.train_with_signature(2, b"on").await.unwrap();
        assert_eq!(outcome.signature, b"on".to_vec());
        assert_eq!(outcome.prompts.len(), 1);
    }

    #[tokio::test]
    async fn invalid_arguments_send_nothing() {
        // No expectations: any send would fail with a transport error.
        let mut vr = driver(MockTransport::new());
        assert!(matches!(
            vr.load(&[0, 1, 2, 3, 4, 5, 6, 7]).await,
            Err(Error::InvalidParameter(_))
        ));
        assert!(matches!(vr.train(&[]).await, Err(Error::InvalidParameter(_))));
        assert!(matches!(
            vr.load_user_group(Group::ALL).await,
            Err(Error::InvalidParameter(_))
        ));
    }

    #[tokio::test]
    async fn oversized_signature_is_rejected_locally() {
        let mut vr = driver(MockTransport::new());
        let sig = vec![b's'; 260];
        assert!(matches!(
            vr.set_signature(1, &sig).await,
            Err(Error::PayloadTooLarge { .. })
        ));
    }

    #[tokio::test]
    async fn load_normalizes_and_decodes() {
        let mut mock = MockTransport::new();
        mock.expect(
            &frame(CMD_LOAD, None, &[1, 2, 5, 9]),
            &frame(CMD_LOAD, None, &[3, 1, 0x00, 2, 0x00, 5, 0xFE, 9, 0x00]),
        );
        let mut vr = driver(mock);
        let outcome = vr.load(&[5, 2, 2, 9, 1]).await.unwrap();
        assert_eq!(outcome.loaded_count, 3);
        assert_eq!(outcome.entries[2], (5, LoadStatus::Untrained));
    }

    #[tokio::test]
    async fn check_system_settings_decodes() {
        let mut mock = MockTransport::new();
        mock.expect(
            &frame(CMD_CHECK_SYSTEM, None, &[]),
            &frame(CMD_CHECK_SYSTEM, None, &[0x00, 0x05, 0x02, 0x0F, 0x01, 0x81]),
        );
        let mut vr = driver(mock);
        let s = vr.check_system_settings().await.unwrap();
        assert_eq!(s.baud_rate, BaudRate::B38400);
        assert_eq!(s.io_mode, IoMode::Set);
        assert_eq!(s.pulse_width.level(), 15);
        assert!(s.auto_load);
        assert_eq!(s.group_control, GroupControl::User(Group::new(1).unwrap()));
    }

    #[tokio::test]
    async fn check_recognizer_decodes() {
        let mut mock = MockTransport::new();
        mock.expect(
            &frame(CMD_CHECK_BSR, None, &[]),
            &frame(
                CMD_CHECK_BSR,
                None,
                &[1, 0x07, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x00, 0xFF],
            ),
        );
        let mut vr = driver(mock);
        let state = vr.check_recognizer().await.unwrap();
        assert_eq!(state.loaded(), vec![7]);
        assert_eq!(state.group_mode, Some(GroupControl::Disabled));
    }

    #[tokio::test]
    async fn check_records_all() {
        let mut mock = MockTransport::new();
        mock.expect(
            &[0xAA, 0x02, 0x02, 0xFF, 0x0A],
            &frame(0x02, None, &[1, 0, 1, 1, 0]),
        );
        let mut vr = driver(mock);
        let check = vr.check_records(&[]).await.unwrap();
        assert_eq!(check.trained_count, 1);
        assert_eq!(check.entries.len(), 2);
    }

    #[tokio::test]
    async fn check_signature_decodes() {
        let mut mock = MockTransport::new();
        mock.expect(
            &frame(CMD_CHECK_SIG, None, &[4]),
            &frame(CMD_CHECK_SIG, None, &[4, 3, b'f', b'a', b'n']),
        );
        let mut vr = driver(mock);
        assert_eq!(vr.check_signature(4).await.unwrap(), b"fan".to_vec());
    }

    #[tokio::test]
    async fn settings_writes() {
        let mut mock = MockTransport::new();
        mock.expect(&[0xAA, 0x02, 0x11, 0x05, 0x0A], &frame(0x11, None, &[0x00]));
        mock.expect(&[0xAA, 0x02, 0x12, 0x01, 0x0A], &frame(0x12, None, &[0x00]));
        mock.expect(&[0xAA, 0x02, 0x13, 0x03, 0x0A], &frame(0x13, None, &[0x00]));
        mock.expect(&[0xAA, 0x02, 0x14, 0xFF, 0x0A], &frame(0x14, None, &[0x00]));
        mock.expect(
            &[0xAA, 0x04, 0x15, 0x03, 0x01, 0x02, 0x0A],
            &frame(0x15, None, &[0x00]),
        );
        mock.expect(&[0xAA, 0x02, 0x15, 0x00, 0x0A], &frame(0x15, None, &[0x00]));
        mock.expect(&[0xAA, 0x01, 0x10, 0x0A], &frame(0x10, None, &[0x00]));
        let mut vr = driver(mock);
        vr.set_baud_rate(BaudRate::B38400).await.unwrap();
        vr.set_io_mode(IoMode::Toggle).await.unwrap();
        vr.set_pulse_width(PulseWidth::new(3).unwrap()).await.unwrap();
        vr.reset_io(&[]).await.unwrap();
        vr.set_auto_load(&[2, 1]).await.unwrap();
        vr.disable_auto_load().await.unwrap();
        vr.restore_system_settings().await.unwrap();
    }

    #[tokio::test]
    async fn delete_signature_sends_bare_record() {
        let mut mock = MockTransport::new();
        mock.expect(&[0xAA, 0x02, 0x22, 0x06, 0x0A], &frame(0x22, None, &[0x00]));
        let mut vr = driver(mock);
        vr.delete_signature(6).await.unwrap();
    }

    #[tokio::test]
    async fn check_group_control_decodes() {
        let mut mock = MockTransport::new();
        mock.expect(
            &[0xAA, 0x03, 0x32, 0x00, 0xFE, 0x0A],
            &frame(CMD_GROUP, Some(0x00), &[0x81]),
        );
        let mut vr = driver(mock);
        assert_eq!(
            vr.check_group_control().await.unwrap(),
            GroupControl::User(Group::new(1).unwrap())
        );
    }

    #[tokio::test]
    async fn group_reply_with_other_subcommand_is_unexpected() {
        let mut mock = MockTransport::new();
        mock.expect(
            &frame(CMD_GROUP, Some(0x04), &[0x01]),
            &frame(CMD_GROUP, Some(0x02), &[0x00]),
        );
        let mut vr = driver(mock);
        assert!(matches!(
            vr.check_user_group(Group::new(1).unwrap()).await,
            Err(Error::UnexpectedFrame { command: 0x32 })
        ));
    }

    #[tokio::test]
    async fn group_reply_without_subcommand_is_unexpected() {
        let group = Group::new(3).unwrap();
        let mut mock = MockTransport::new();
        // Count byte 01 lands in the sub-command slot and fails the echo.
        mock.expect(
            &frame(CMD_GROUP, Some(0x03), &[3]),
            &frame(CMD_GROUP, None, &[0x01, 0x03, 0x00]),
        );
        mock.expect(
            &frame(CMD_GROUP, Some(0x01), &[3, 5]),
            &frame(CMD_GROUP, None, &[]),
        );
        let mut vr = driver(mock);
        assert!(matches!(
            vr.load_user_group(group).await,
            Err(Error::UnexpectedFrame { command: 0x32 })
        ));
        assert!(matches!(
            vr.set_user_group(group, &[5]).await,
            Err(Error::UnexpectedFrame { command: 0x32 })
        ));
    }

    #[tokio::test]
    async fn check_all_user_groups() {
        let mut payload = vec![0, 1, 2, 3, 0xFF, 0xFF, 0xFF, 0xFF];
        payload.extend_from_slice(&[1, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF]);
        let mut mock = MockTransport::new();
        mock.expect(
            &frame(CMD_GROUP, Some(0x04), &[0xFF]),
            &frame(CMD_GROUP, Some(0x04), &payload),
        );
        let mut vr = driver(mock);
        let groups = vr.check_user_group(Group::ALL).await.unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].records, vec![1, 2, 3]);
        assert!(groups[1].records.is_empty());
    }

    #[tokio::test]
    async fn group_writes_and_loads() {
        let group = Group::new(3).unwrap();
        let mut mock = MockTransport::new();
        mock.expect(
            &frame(CMD_GROUP, Some(0x00), &[0xFF]),
            &frame(CMD_GROUP, Some(0x00), &[]),
        );
        mock.expect(
            &frame(CMD_GROUP, Some(0x01), &[3, 4, 8]),
            &frame(CMD_GROUP, Some(0x01), &[0x00]),
        );
        mock.expect(
            &frame(CMD_GROUP, Some(0x03), &[3]),
            &frame(CMD_GROUP, Some(0x03), &[2, 4, 0x00, 8, 0x00]),
        );
        mock.expect(
            &frame(CMD_GROUP, Some(0x02), &[0]),
            &frame(CMD_GROUP, Some(0x02), &[1, 0, 0xFC]),
        );
        let mut vr = driver(mock);
        vr.set_group_control(GroupControl::Disabled).await.unwrap();
        vr.set_user_group(group, &[8, 4]).await.unwrap();
        let user = vr.load_user_group(group).await.unwrap();
        assert_eq!(user.loaded_count, 2);
        let system = vr
            .load_system_group(SystemGroup::new(0).unwrap())
            .await
            .unwrap();
        assert_eq!(system.entries, vec![(0, LoadStatus::AlreadyLoaded)]);
    }

    #[tokio::test]
    async fn test_register_round_trip() {
        let mut mock = MockTransport::new();
        mock.expect(
            &frame(CMD_TEST, Some(0x00), &[0x12, 0x34]),
            &frame(CMD_TEST, Some(0x00), &[]),
        );
        mock.expect(
            &frame(CMD_TEST, Some(0x01), &[]),
            &frame(CMD_TEST, Some(0x01), &[0x12, 0x34]),
        );
        let mut vr = driver(mock);
        vr.test_write(&[0x12, 0x34]).await.unwrap();
        assert_eq!(vr.test_read().await.unwrap(), vec![0x12, 0x34]);
    }

    #[tokio::test]
    async fn firmware_length_exchange() {
        let mut mock = MockTransport::new();
        mock.expect(&[0xAA, 0x02, 0x31, 0x0A], &[0xAA, 0x03, 0x31, 0x00, 0x0A]);
        let config = DriverConfig {
            convention: LengthConvention::IncludesEnd,
            ..DriverConfig::default()
        };
        let mut vr = driver_with(mock, config);
        vr.clear().await.unwrap();
    }

    #[tokio::test]
    async fn disconnected_transport() {
        let mut mock = MockTransport::new();
        mock.set_connected(false);
        let mut vr = driver(mock);
        assert!(!vr.is_connected());
        assert!(matches!(vr.clear().await, Err(Error::NotConnected)));
    }

    #[tokio::test]
    async fn close_disconnects() {
        let mut vr = driver(MockTransport::new());
        assert!(vr.is_connected());
        vr.close().await.unwrap();
        assert!(!vr.is_connected());
    }
}
