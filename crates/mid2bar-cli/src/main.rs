use clap::Parser;
use mid2bar_core::{
    encode_event, parse_command, AppError, Command, Event, FramePacer, PlayerCore, PlayerInputs,
};
use mid2bar_domain_timeline::{import_midi_path, MidiImportError};
use mid2bar_infra_audio_cpal::CpalAudioInputPort;
use mid2bar_infra_storage_fs::FsStorage;
use mid2bar_ports::audio::{AudioError, AudioInputPort};
use mid2bar_ports::backing::SilentBackingTrack;
use mid2bar_ports::settings::PlayerSettings;
use mid2bar_ports::storage::{StorageError, StoragePort, TimelineSourcePort};
use mid2bar_ports::tables::{MarkerRow, NoteRow};
use mid2bar_ports::types::DeviceId;
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::mpsc;
use std::thread;

#[derive(Parser, Debug)]
#[command(name = "mid2bar", about = "Headless falling-bar player with microphone scoring")]
struct Args {
    /// Standard MIDI file to import notes and markers from
    #[arg(long, conflicts_with = "notes")]
    midi: Option<PathBuf>,
    /// Note table (JSON)
    #[arg(long, requires = "markers")]
    notes: Option<PathBuf>,
    /// Marker table (JSON); overrides the markers of --midi
    #[arg(long)]
    markers: Option<PathBuf>,
    /// Lyric table (JSON)
    #[arg(long)]
    lyrics: Option<PathBuf>,
    /// Settings file; defaults to settings.json in the config dir
    #[arg(long)]
    settings: Option<PathBuf>,
    /// Score microphone input
    #[arg(long)]
    mic: bool,
    /// Channel the microphone is scored against
    #[arg(long, default_value_t = 0)]
    mic_channel: u8,
    /// Input device id as printed by --list-inputs
    #[arg(long)]
    input_device: Option<String>,
    /// Song length in seconds; defaults to the last note end plus REMAIN_TIME
    #[arg(long)]
    duration: Option<f64>,
    /// Print the available input devices and exit
    #[arg(long)]
    list_inputs: bool,
    /// Print events as JSON lines on stdout
    #[arg(long)]
    emit_events: bool,
    /// Read JSON commands from stdin, one per line
    #[arg(long)]
    stdin_commands: bool,
}

#[derive(thiserror::Error, Debug)]
enum CliError {
    #[error("either --midi or --notes/--markers is required")]
    MissingInput,
    #[error(transparent)]
    App(#[from] AppError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    MidiImport(#[from] MidiImportError),
    #[error(transparent)]
    Audio(#[from] AudioError),
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    if let Err(err) = run(args) {
        log::error!("{err}");
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<(), CliError> {
    if args.list_inputs {
        for device in CpalAudioInputPort::new().list_inputs()? {
            println!(
                "{}\t{}\t{} Hz, {} ch",
                device.id,
                device.name,
                device.default_config.sample_rate_hz,
                device.default_config.channels
            );
        }
        return Ok(());
    }

    let storage = FsStorage::default();
    let settings = match &args.settings {
        Some(path) => FsStorage::load_settings_from(path)?,
        None => storage.load_settings()?,
    };
    let inputs = load_inputs(&args, &storage, &settings)?;
    let duration = args.duration.unwrap_or_else(|| {
        inputs
            .notes
            .iter()
            .map(|n| n.end_seconds)
            .fold(0.0, f64::max)
            + settings.remain_time
    });

    let audio_input: Option<Box<dyn AudioInputPort>> = if args.mic {
        Some(Box::new(CpalAudioInputPort::new()))
    } else {
        None
    };
    let fps = settings.screen_fps;
    let mut core = PlayerCore::new(
        settings,
        inputs,
        Box::new(SilentBackingTrack::new(duration)),
        audio_input,
    )?;

    if args.mic {
        core.set_input_device(args.input_device.clone().map(DeviceId));
        core.handle_command(Command::SetMicChannel {
            channel: args.mic_channel,
        })?;
        core.handle_command(Command::SetMicInput { enabled: true })?;
    }

    let commands = args.stdin_commands.then(spawn_command_reader);
    core.handle_command(Command::Play)?;
    log::info!("playing {duration:.2}s at {fps} fps");

    let mut pacer = FramePacer::new(fps);
    let mut finished = false;
    while !finished {
        if let Err(err) = core.frame() {
            log::warn!("frame skipped: {err}");
        }

        if let Some(rx) = &commands {
            while let Ok(cmd) = rx.try_recv() {
                if let Err(err) = core.handle_command(cmd) {
                    log::warn!("command failed: {err}");
                }
            }
        }

        for event in core.drain_events() {
            finished |= matches!(event, Event::PlaybackFinished { .. });
            report_event(&event, args.emit_events);
        }
        pacer.wait();
    }

    for (idx, score) in core.page_scores().iter().enumerate() {
        if score.number_of_notes == 0 {
            continue;
        }
        log::info!(
            "page {idx} [{:.2}s, {:.2}s): {} notes, score {:.1} (match {:.1}, accuracy {:.1})",
            score.start_time,
            score.end_time,
            score.number_of_notes,
            score.weighted_score,
            score.pitch_match,
            score.pitch_accuracy
        );
    }
    Ok(())
}

fn load_inputs(
    args: &Args,
    storage: &FsStorage,
    settings: &PlayerSettings,
) -> Result<PlayerInputs, CliError> {
    let (notes, mut markers): (Vec<NoteRow>, Vec<MarkerRow>) = match (&args.midi, &args.notes) {
        (Some(path), _) => {
            let imported = import_midi_path(path, &settings.note_names)?;
            log::info!(
                "imported {}: {} notes, {} markers",
                path.display(),
                imported.notes.len(),
                imported.markers.len()
            );
            (imported.notes, imported.markers)
        }
        (None, Some(path)) => (storage.load_note_table(path)?, Vec::new()),
        (None, None) => return Err(CliError::MissingInput),
    };
    if let Some(path) = &args.markers {
        markers = storage.load_marker_table(path)?;
    }
    let lyrics = match &args.lyrics {
        Some(path) => storage.load_lyric_table(path)?,
        None => Vec::new(),
    };

    Ok(PlayerInputs {
        notes,
        markers,
        lyrics,
    })
}

fn spawn_command_reader() -> mpsc::Receiver<Command> {
    let (tx, rx) = mpsc::channel();
    let spawned = thread::Builder::new()
        .name("stdin-commands".to_string())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if line.trim().is_empty() {
                    continue;
                }
                match parse_command(&line) {
                    Ok(cmd) => {
                        if tx.send(cmd).is_err() {
                            break;
                        }
                    }
                    Err(err) => log::warn!("ignoring command {line:?}: {err}"),
                }
            }
        });
    if let Err(err) = spawned {
        log::warn!("stdin command reader not started: {err}");
    }
    rx
}

fn report_event(event: &Event, emit: bool) {
    match event {
        Event::PageChanged {
            index: Some(index),
            start_time: Some(start),
            end_time: Some(end),
        } => log::info!("page {index} [{start:.2}s, {end:.2}s)"),
        Event::MicInputChanged {
            enabled,
            error: Some(error),
        } => log::warn!("mic input {}: {error}", if *enabled { "on" } else { "off" }),
        Event::PlaybackFinished { time } => log::info!("finished at {time:.2}s"),
        Event::FrameSkipped { reason } => log::debug!("frame skipped: {reason}"),
        other => log::debug!("{other:?}"),
    }

    if emit {
        match encode_event(event) {
            Ok(line) => println!("{line}"),
            Err(err) => log::warn!("event not encoded: {err}"),
        }
    }
}
