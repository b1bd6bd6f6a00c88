// vrlib test application -- CLI tool for exercising an Elechouse Voice
// Recognition V3 module against real hardware or a mock transport.
//
// Usage:
//   vrlib-test-app --port /dev/ttyUSB0 settings
//   vrlib-test-app --port /dev/ttyUSB0 train 0 1 2
//   vrlib-test-app --port /dev/ttyUSB0 load 0 1 2
//   vrlib-test-app --port /dev/ttyUSB0 listen --count 10
//   vrlib-test-app --port /dev/ttyUSB0 group user-set 1 3 4 5
//   vrlib-test-app --port /dev/ttyUSB0 io-mode toggle
//   vrlib-test-app --mock --firmware-length recognizer
//   RUST_LOG=vrlib_elechouse=trace vrlib-test-app --port COM3 clear

use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{ArgAction, Parser, Subcommand};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use vrlib::elechouse::commands;
use vrlib::elechouse::frame::{
    CMD_CHECK_BSR, CMD_CHECK_SYSTEM, CMD_CLEAR, CMD_RESET_DEFAULT, CMD_RESET_IO,
    CMD_SET_BAUD_RATE, CMD_SET_IO_MODE, CMD_SET_PULSE_WIDTH, CMD_VOICE_RECOGNIZED,
};
use vrlib::elechouse::{
    Frame, LengthConvention, LoadOutcome, TrainOutcome, VoiceRecognizer, VoiceRecognizerBuilder,
};
use vrlib::{
    BaudRate, ErrorKind, Group, GroupControl, IoMode, PulseWidth, RecordId, SystemGroup,
};
use vrlib_test_harness::MockTransport;

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// vrlib test application -- drives a voice recognition module from the
/// command line.
#[derive(Parser)]
#[command(name = "vrlib-test-app", version, about)]
struct Cli {
    /// Serial port path (e.g. /dev/ttyUSB0, COM3). Required unless --mock.
    #[arg(long)]
    port: Option<String>,

    /// Baud rate the module is configured for.
    #[arg(long, default_value_t = 9600)]
    baud: u32,

    /// Use a scripted mock transport instead of a real serial port.
    #[arg(long)]
    mock: bool,

    /// Reply timeout for ordinary commands, in milliseconds.
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Per-step timeout while training, in milliseconds.
    #[arg(long)]
    train_timeout_ms: Option<u64>,

    /// Count the end byte in the frame length, as module firmware does.
    #[arg(long)]
    firmware_length: bool,

    /// Keep buffered input instead of discarding it before each request.
    #[arg(long)]
    keep_stale: bool,

    /// Increase log verbosity (-v debug, -vv trace). RUST_LOG overrides.
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print baud rate, output settings, auto-load and group control.
    Settings,

    /// Print what is loaded in the recognizer.
    Recognizer,

    /// Print train status of records (all records when none given).
    Records { ids: Vec<RecordId> },

    /// Read, set or delete a record's signature.
    Signature {
        id: RecordId,
        /// Set the signature to this text.
        #[arg(long, conflicts_with = "delete")]
        set: Option<String>,
        /// Delete the signature.
        #[arg(long)]
        delete: bool,
    },

    /// Train records, following the module's spoken prompts.
    Train {
        #[arg(required = true)]
        ids: Vec<RecordId>,
        /// Attach this signature (single record only).
        #[arg(long)]
        signature: Option<String>,
    },

    /// Load up to seven records into the recognizer.
    Load {
        #[arg(required = true)]
        ids: Vec<RecordId>,
    },

    /// Empty the recognizer.
    Clear,

    /// Wait for recognition events.
    Listen {
        /// Number of listening windows (0 = run until Ctrl-C).
        #[arg(long, default_value_t = 1)]
        count: u32,
        /// Length of each window in milliseconds.
        #[arg(long, default_value_t = 5000)]
        wait_ms: u64,
    },

    /// Records loaded at power-up (none given disables auto-load).
    AutoLoad { ids: Vec<RecordId> },

    /// Output pin behaviour on recognition: pulse, toggle, set or clear.
    IoMode { mode: IoMode },

    /// Output pulse width level (0-15).
    PulseWidth { level: u8 },

    /// Change the module's baud rate. Reconnect with --baud afterwards.
    SetBaud { bps: u32 },

    /// Return output pins to idle (all pins when none given).
    ResetIo { ios: Vec<u8> },

    /// Group operations.
    Group {
        #[command(subcommand)]
        action: GroupAction,
    },

    /// Restore factory settings.
    Restore,
}

#[derive(Subcommand)]
enum GroupAction {
    /// Print the group control setting.
    Get,
    /// Set group control: off, sys:N or user:N.
    Set { control: String },
    /// Define the members of a user group.
    UserSet {
        group: u8,
        #[arg(required = true)]
        ids: Vec<RecordId>,
    },
    /// List members of a user group (all groups when none given).
    UserCheck { group: Option<u8> },
    /// Load a system group into the recognizer.
    LoadSystem { group: u8 },
    /// Load a user group into the recognizer.
    LoadUser { group: u8 },
}

fn parse_group_control(s: &str) -> Result<GroupControl> {
    if s.eq_ignore_ascii_case("off") {
        return Ok(GroupControl::Disabled);
    }
    let (kind, n) = s
        .split_once(':')
        .with_context(|| format!("expected off, sys:N or user:N, got {s:?}"))?;
    let n: u8 = n.parse().with_context(|| format!("bad group number {n:?}"))?;
    match kind {
        "sys" => Ok(GroupControl::System(SystemGroup::new(n)?)),
        "user" => Ok(GroupControl::User(Group::new(n)?)),
        _ => bail!("unknown group kind {kind:?}; use sys or user"),
    }
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "warn,vrlib_elechouse=debug,vrlib_transport=debug",
        _ => "debug,vrlib_elechouse=trace,vrlib_transport=trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

// ---------------------------------------------------------------------------
// Driver construction
// ---------------------------------------------------------------------------

/// Encode a canned module reply.
fn reply(frame: Frame, convention: LengthConvention) -> Result<Vec<u8>> {
    Ok(frame.encode(convention)?)
}

fn script(
    mock: &mut MockTransport,
    convention: LengthConvention,
    request: Frame,
    response: Frame,
) -> Result<()> {
    mock.expect(&request.encode(convention)?, &reply(response, convention)?);
    Ok(())
}

/// A mock pre-loaded with plausible replies for the read-only commands, so
/// `--mock` exercises the full request/reply path. Other commands run
/// against an unscripted mock and fail at the first send.
fn scripted_mock(command: &Command, convention: LengthConvention) -> Result<MockTransport> {
    let mut mock = MockTransport::new();
    match command {
        Command::Settings => script(
            &mut mock,
            convention,
            commands::check_system_settings(),
            Frame::new(CMD_CHECK_SYSTEM, vec![0x00, 0x03, 0x00, 0x00, 0x00, 0xFF]),
        )?,
        Command::Recognizer => script(
            &mut mock,
            convention,
            commands::check_recognizer(),
            Frame::new(
                CMD_CHECK_BSR,
                vec![2, 0x00, 0x01, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x00, 0xFF],
            ),
        )?,
        Command::Clear => script(
            &mut mock,
            convention,
            commands::clear(),
            Frame::new(CMD_CLEAR, vec![0x00]),
        )?,
        Command::Restore => script(
            &mut mock,
            convention,
            commands::restore_system_settings(),
            Frame::new(CMD_RESET_DEFAULT, vec![0x00]),
        )?,
        Command::IoMode { mode } => script(
            &mut mock,
            convention,
            commands::set_io_mode(*mode),
            Frame::new(CMD_SET_IO_MODE, vec![0x00]),
        )?,
        Command::PulseWidth { level } => {
            if let Ok(width) = PulseWidth::new(*level) {
                script(
                    &mut mock,
                    convention,
                    commands::set_pulse_width(width),
                    Frame::new(CMD_SET_PULSE_WIDTH, vec![0x00]),
                )?;
            }
        }
        Command::SetBaud { bps } => {
            if let Ok(rate) = BaudRate::from_bps(*bps) {
                script(
                    &mut mock,
                    convention,
                    commands::set_baud_rate(rate),
                    Frame::new(CMD_SET_BAUD_RATE, vec![0x00]),
                )?;
            }
        }
        Command::ResetIo { ios } => script(
            &mut mock,
            convention,
            commands::reset_io(ios),
            Frame::new(CMD_RESET_IO, vec![0x00]),
        )?,
        Command::Listen { .. } => {
            mock.inject(&reply(
                Frame::new(CMD_VOICE_RECOGNIZED, vec![0x00]),
                convention,
            )?);
        }
        _ => {}
    }
    Ok(mock)
}

async fn create_driver(cli: &Cli) -> Result<VoiceRecognizer> {
    let convention = if cli.firmware_length {
        LengthConvention::IncludesEnd
    } else {
        LengthConvention::ExcludesEnd
    };
    let baud = BaudRate::from_bps(cli.baud)?;

    let mut builder = VoiceRecognizerBuilder::new()
        .baud_rate(baud)
        .length_convention(convention)
        .discard_stale_input(!cli.keep_stale);
    if let Some(ms) = cli.timeout_ms {
        builder = builder.command_timeout(Duration::from_millis(ms));
    }
    if let Some(ms) = cli.train_timeout_ms {
        builder = builder.train_timeout(Duration::from_millis(ms));
    }

    if cli.mock {
        let mock = scripted_mock(&cli.command, convention)?;
        let vr = builder
            .build_with_transport(Box::new(mock))
            .context("failed to build driver with mock transport")?;
        println!("Connected (mock transport)");
        Ok(vr)
    } else {
        let port = cli
            .port
            .as_deref()
            .context("--port is required when not using --mock")?;
        let vr = builder
            .serial_port(port)
            .build()
            .await
            .with_context(|| format!("failed to open {port}"))?;
        println!("Connected to {port} at {baud} baud");
        Ok(vr)
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

fn print_load(outcome: &LoadOutcome) {
    println!("Loaded: {}", outcome.loaded_count);
    for (record, status) in &outcome.entries {
        println!("  record {record:>3}: {status:?}");
    }
}

fn print_train(outcome: &TrainOutcome) {
    println!("Trained: {}", outcome.trained_count);
    for (record, result) in &outcome.entries {
        println!("  record {record:>3}: {result:?}");
    }
    if !outcome.signature.is_empty() {
        println!("  signature: {}", String::from_utf8_lossy(&outcome.signature));
    }
}

async fn cmd_settings(vr: &mut VoiceRecognizer) -> Result<()> {
    let s = vr.check_system_settings().await?;
    println!("Baud rate:     {}", s.baud_rate);
    println!("IO mode:       {}", s.io_mode);
    println!("Pulse width:   {}", s.pulse_width.level());
    println!("Auto-load:     {}", if s.auto_load { "on" } else { "off" });
    println!("Group control: {}", s.group_control);
    println!("Status:        0x{:02X}", s.trained_status);
    Ok(())
}

async fn cmd_recognizer(vr: &mut VoiceRecognizer) -> Result<()> {
    let state = vr.check_recognizer().await?;
    println!("Valid records: {}", state.valid_count);
    for (slot, record) in state.slots.iter().enumerate() {
        let untrained = state.untrained_bitmap & (1 << slot) != 0;
        match record {
            Some(r) if untrained => println!("  slot {slot}: {r} (untrained)"),
            Some(r) => println!("  slot {slot}: {r}"),
            None => println!("  slot {slot}: -"),
        }
    }
    if let Some(mode) = state.group_mode {
        println!("Group mode: {mode}");
    }
    Ok(())
}

async fn cmd_records(vr: &mut VoiceRecognizer, ids: &[RecordId]) -> Result<()> {
    let check = vr.check_records(ids).await?;
    println!("Trained: {}", check.trained_count);
    for (record, status) in &check.entries {
        println!("  record {record:>3}: {status:?}");
    }
    Ok(())
}

async fn cmd_signature(
    vr: &mut VoiceRecognizer,
    id: RecordId,
    set: Option<&str>,
    delete: bool,
) -> Result<()> {
    if delete {
        vr.delete_signature(id).await?;
        println!("Record {id}: signature deleted");
    } else if let Some(text) = set {
        vr.set_signature(id, text.as_bytes()).await?;
        println!("Record {id}: signature set to {text:?}");
    } else {
        let sig = vr.check_signature(id).await?;
        if sig.is_empty() {
            println!("Record {id}: no signature");
        } else {
            println!("Record {id}: {:?}", String::from_utf8_lossy(&sig));
        }
    }
    Ok(())
}

async fn cmd_train(
    vr: &mut VoiceRecognizer,
    ids: &[RecordId],
    signature: Option<&str>,
) -> Result<()> {
    println!("Training {ids:?}: speak when prompted...");
    let outcome = match signature {
        Some(sig) => {
            let [id] = ids else {
                bail!("--signature trains exactly one record");
            };
            vr.train_with_signature(*id, sig.as_bytes()).await?
        }
        None => vr.train(ids).await?,
    };
    for prompt in &outcome.prompts {
        println!("[module] {prompt}");
    }
    print_train(&outcome);
    Ok(())
}

async fn cmd_listen(vr: &mut VoiceRecognizer, count: u32, wait_ms: u64) -> Result<()> {
    let window = Duration::from_millis(wait_ms);
    println!("Listening (Ctrl-C to stop)...");
    let mut round = 0u32;
    while count == 0 || round < count {
        round += 1;
        match vr.recognize_with_timeout(window).await {
            Ok(hit) => {
                let sig = hit.signature_str().unwrap_or("");
                match hit.recognizer_index {
                    Some(idx) => println!("Recognized record {} (slot {idx}) {sig}", hit.record),
                    None => println!("Recognized record {} {sig}", hit.record),
                }
            }
            Err(e) if e.kind() == ErrorKind::Timeout => {
                debug!(round, "listening window elapsed");
                println!("(nothing recognized within {wait_ms} ms)");
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

async fn cmd_group(vr: &mut VoiceRecognizer, action: &GroupAction) -> Result<()> {
    match action {
        GroupAction::Get => {
            println!("Group control: {}", vr.check_group_control().await?);
        }
        GroupAction::Set { control } => {
            let control = parse_group_control(control)?;
            vr.set_group_control(control).await?;
            println!("Group control set to {control}");
        }
        GroupAction::UserSet { group, ids } => {
            let group = Group::new(*group)?;
            vr.set_user_group(group, ids).await?;
            println!("{group}: members set");
        }
        GroupAction::UserCheck { group } => {
            let group = match group {
                Some(g) => Group::new(*g)?,
                None => Group::ALL,
            };
            for entry in vr.check_user_group(group).await? {
                println!("{}: {:?}", entry.group, entry.records);
            }
        }
        GroupAction::LoadSystem { group } => {
            let outcome = vr.load_system_group(SystemGroup::new(*group)?).await?;
            print_load(&outcome);
        }
        GroupAction::LoadUser { group } => {
            let outcome = vr.load_user_group(Group::new(*group)?).await?;
            print_load(&outcome);
        }
    }
    Ok(())
}

async fn run(vr: &mut VoiceRecognizer, command: &Command) -> Result<()> {
    match command {
        Command::Settings => cmd_settings(vr).await,
        Command::Recognizer => cmd_recognizer(vr).await,
        Command::Records { ids } => cmd_records(vr, ids).await,
        Command::Signature { id, set, delete } => {
            cmd_signature(vr, *id, set.as_deref(), *delete).await
        }
        Command::Train { ids, signature } => cmd_train(vr, ids, signature.as_deref()).await,
        Command::Load { ids } => {
            let outcome = vr.load(ids).await?;
            print_load(&outcome);
            Ok(())
        }
        Command::Clear => {
            vr.clear().await?;
            println!("Recognizer cleared");
            Ok(())
        }
        Command::Listen { count, wait_ms } => cmd_listen(vr, *count, *wait_ms).await,
        Command::AutoLoad { ids } => {
            if ids.is_empty() {
                vr.disable_auto_load().await?;
                println!("Auto-load disabled");
            } else {
                vr.set_auto_load(ids).await?;
                println!("Auto-load set to {ids:?}");
            }
            Ok(())
        }
        Command::IoMode { mode } => {
            vr.set_io_mode(*mode).await?;
            println!("IO mode set to {mode}");
            Ok(())
        }
        Command::PulseWidth { level } => {
            vr.set_pulse_width(PulseWidth::new(*level)?).await?;
            println!("Pulse width set to level {level}");
            Ok(())
        }
        Command::SetBaud { bps } => {
            let rate = BaudRate::from_bps(*bps)?;
            vr.set_baud_rate(rate).await?;
            println!("Module baud rate set to {rate}; reconnect with --baud {}", rate.bps());
            Ok(())
        }
        Command::ResetIo { ios } => {
            vr.reset_io(ios).await?;
            if ios.is_empty() {
                println!("All output pins reset");
            } else {
                println!("Output pins {ios:?} reset");
            }
            Ok(())
        }
        Command::Group { action } => cmd_group(vr, action).await,
        Command::Restore => {
            vr.restore_system_settings().await?;
            println!("Factory settings restored");
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut vr = create_driver(&cli).await?;
    let result = run(&mut vr, &cli.command).await;
    if let Err(e) = vr.close().await {
        warn!(error = %e, "closing module connection failed");
    }
    result
}
