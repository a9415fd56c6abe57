use std::collections::BTreeSet;
use std::io::{self, BufRead};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use clap::Parser;
use log::{error, info, warn};

use recorder_core::remote::server::forward_to;
use recorder_core::{
    resolve_device, AudioBackend, AudioDevice, CommandSource, ControlMessage, LevelMonitor, Recorder,
    RecorderController, RecorderDelegate, RecorderHandle, RecorderError, RecorderOptions, RecorderSettings, RecorderState,
    RemoteConfig, RemoteControlServer, StatusBroadcaster, TakeResult,
};
use recorder_cpal::CpalBackend;

#[derive(Parser)]
#[command(name = "multitrack-recorder")]
#[command(about = "Record every channel of a multi-channel input device to its own WAV file")]
#[command(long_about = "
Records each selected channel of an input device to <name>_<take>_<track>.wav.
Recording is started and stopped from the console or over OSC
(/start_recording, /stop_recording); status goes out as /recorder_status.

EXAMPLES:
  # List input devices
  multitrack-recorder --list-devices

  # Record tracks 1, 2 and 5 of an interface into ./takes
  multitrack-recorder --device \"Scarlett 18i20\" --save-dir takes --name Drums --tracks 1,2,5
")]
struct Args {
    /// List input devices and exit
    #[arg(long)]
    list_devices: bool,

    /// Input device name (default: last used device, else the first one)
    #[arg(long)]
    device: Option<String>,

    /// Directory takes are written to (default: from the settings file)
    #[arg(long)]
    save_dir: Option<PathBuf>,

    /// Custom name prefixed to every file of a take
    #[arg(long)]
    name: Option<String>,

    /// Tracks to record, 1-based and comma separated (default: all)
    #[arg(long, value_delimiter = ',')]
    tracks: Vec<usize>,

    /// Address the OSC command socket binds to
    #[arg(long, default_value_t = RemoteConfig::default().listen_addr)]
    listen: SocketAddr,

    /// Where /recorder_status is sent
    #[arg(long, default_value_t = RemoteConfig::default().status_target)]
    status_target: SocketAddr,

    /// Disable the OSC command socket
    #[arg(long)]
    no_remote: bool,

    /// Do not read commands from stdin (run until Ctrl-C)
    #[arg(long)]
    no_console: bool,

    /// Settings file remembering the save directory and device
    #[arg(long, default_value = "config.json")]
    settings: PathBuf,

    /// Do not write the per-take JSON sidecar
    #[arg(long)]
    no_metadata: bool,

    /// Frames per channel read per block
    #[arg(long, default_value_t = RecorderOptions::default().block_frames)]
    block_frames: usize,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let backend = Arc::new(CpalBackend::new());
    if args.list_devices {
        for device in backend.list_input_devices()? {
            println!("{}", device);
        }
        return Ok(());
    }

    let mut settings = RecorderSettings::load(&args.settings).unwrap_or_else(|e| {
        warn!("{}; using defaults", e);
        RecorderSettings::default()
    });

    let options = RecorderOptions {
        block_frames: args.block_frames,
        write_metadata: !args.no_metadata,
        ..Default::default()
    };
    let remote = RemoteConfig {
        listen_addr: args.listen,
        status_target: args.status_target,
    };

    let mut recorder = Recorder::new(backend, options)?;
    recorder.add_delegate(Arc::new(ConsoleDelegate));
    recorder.add_delegate(Arc::new(StatusBroadcaster::new(remote.status_target)?));

    let save_directory = args
        .save_dir
        .clone()
        .or_else(|| (!settings.save_directory.is_empty()).then(|| PathBuf::from(&settings.save_directory)));
    recorder.set_save_directory(save_directory);
    if let Some(name) = &args.name {
        recorder.set_custom_name(name.as_str());
    }

    let devices = recorder.input_devices();
    if devices.is_empty() {
        warn!("No input devices found");
    }
    let preferred = args.device.as_deref().unwrap_or(&settings.last_device_name);
    if let Some(device) = resolve_device(&devices, preferred) {
        if let Err(e) = recorder.select_device(device) {
            error!("{}", e);
        }
    }
    if !args.tracks.is_empty() {
        recorder.set_selected_tracks(to_track_indices(&args.tracks)?);
    }
    if let Some(number) = recorder.next_take_number() {
        info!("Next take number: {:04}", number);
    }

    let controller = RecorderController::new(recorder);
    let handle = controller.handle();
    let levels = controller.recorder().levels();

    let _server = if args.no_remote {
        None
    } else {
        Some(RemoteControlServer::start(remote.listen_addr, forward_to(handle.clone()))?)
    };

    let interrupt = handle.clone();
    ctrlc::set_handler(move || {
        info!("Interrupted, shutting down");
        let _ = interrupt.shutdown();
    })?;

    if args.no_console {
        info!("Console disabled; press Ctrl-C to quit");
    } else {
        let console = handle.clone();
        thread::Builder::new().name("console".into()).spawn(move || {
            let stdin = io::stdin();
            match read_console(stdin.lock(), &console, &devices, &levels) {
                ConsoleExit::Quit => {
                    let _ = console.shutdown();
                }
                ConsoleExit::Closed => info!("Console input closed; press Ctrl-C to quit"),
            }
        })?;
        println!("{}", HELP);
    }

    let recorder = controller.run();

    if let Some(dir) = recorder.save_directory() {
        settings.save_directory = dir.display().to_string();
    }
    if let Some(device) = recorder.device() {
        settings.last_device_name = device.name.clone();
    }
    if let Err(e) = settings.save(&args.settings) {
        warn!("{}", e);
    }
    Ok(())
}

const HELP: &str = "commands: start | stop | tracks 1,2,.. | name <text> | dir <path> | device <index|name> | devices | levels | quit";

/// Why the console stopped reading.
#[derive(Debug, PartialEq)]
enum ConsoleExit {
    /// The user asked to quit.
    Quit,
    /// Input reached end of file or the controller is gone.
    Closed,
}

/// Apply console lines until `quit` or end of input.
fn read_console(
    input: impl BufRead,
    console: &RecorderHandle,
    devices: &[AudioDevice],
    levels: &LevelMonitor,
) -> ConsoleExit {
    for line in input.lines() {
        let Ok(line) = line else { break };
        match parse_command(&line, devices) {
            Ok(ConsoleCommand::Send(message)) => {
                if console.send(message).is_err() {
                    break;
                }
            }
            Ok(ConsoleCommand::Levels) => print_levels(levels),
            Ok(ConsoleCommand::Devices) => devices.iter().for_each(|d| println!("{}", d)),
            Ok(ConsoleCommand::Help) => println!("{}", HELP),
            Ok(ConsoleCommand::Quit) => return ConsoleExit::Quit,
            Ok(ConsoleCommand::Empty) => {}
            Err(e) => println!("{}", e),
        }
    }
    ConsoleExit::Closed
}

#[derive(Debug, PartialEq)]
enum ConsoleCommand {
    Send(ControlMessage),
    Levels,
    Devices,
    Help,
    Quit,
    Empty,
}

fn parse_command(line: &str, devices: &[AudioDevice]) -> Result<ConsoleCommand, String> {
    let line = line.trim();
    let (word, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let rest = rest.trim();

    let command = match word {
        "" => ConsoleCommand::Empty,
        "start" => ConsoleCommand::Send(ControlMessage::Start(CommandSource::User)),
        "stop" => ConsoleCommand::Send(ControlMessage::Stop(CommandSource::User)),
        "tracks" => {
            let tracks = parse_tracks(rest)?;
            ConsoleCommand::Send(ControlMessage::SetSelectedTracks(to_track_indices(&tracks)?))
        }
        "name" => ConsoleCommand::Send(ControlMessage::SetCustomName(rest.to_string())),
        "dir" if rest.is_empty() => return Err("usage: dir <path>".into()),
        "dir" => ConsoleCommand::Send(ControlMessage::SetSaveDirectory(Some(PathBuf::from(rest)))),
        "device" => {
            let device = devices
                .iter()
                .find(|d| rest.parse::<usize>().is_ok_and(|i| d.index == i) || d.name == rest)
                .ok_or_else(|| format!("no input device '{}'", rest))?;
            ConsoleCommand::Send(ControlMessage::SelectDevice(device.clone()))
        }
        "devices" => ConsoleCommand::Devices,
        "levels" => ConsoleCommand::Levels,
        "help" => ConsoleCommand::Help,
        "quit" | "exit" => ConsoleCommand::Quit,
        other => return Err(format!("unknown command '{}'", other)),
    };
    Ok(command)
}

fn parse_tracks(list: &str) -> Result<Vec<usize>, String> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<usize>().map_err(|_| format!("invalid track '{}'", s)))
        .collect()
}

/// 1-based track numbers from the user to 0-based channel indices.
fn to_track_indices(tracks: &[usize]) -> Result<BTreeSet<usize>, String> {
    tracks
        .iter()
        .map(|&t| t.checked_sub(1).ok_or_else(|| "tracks are numbered from 1".to_string()))
        .collect()
}

fn print_levels(levels: &LevelMonitor) {
    let Some(snapshot) = levels.latest() else {
        println!("no levels yet");
        return;
    };
    for (channel, (level, peak)) in snapshot.levels.iter().zip(&snapshot.peaks).enumerate() {
        let bar = "#".repeat((level * 40.0).round() as usize);
        println!("{:>3} {:<40} {:.3} (peak {:.3})", channel + 1, bar, level, peak);
    }
}

/// Prints recorder events for the console user.
struct ConsoleDelegate;

impl RecorderDelegate for ConsoleDelegate {
    fn on_state_changed(&self, state: RecorderState) {
        info!("State: {}", state);
    }

    fn on_take_finished(&self, result: &TakeResult) {
        info!(
            "Take {:04} finished: {} file(s), {:.1}s",
            result.take.take_number,
            result.files.len(),
            result.duration_secs()
        );
        for file in &result.files {
            println!("  {}", file.display());
        }
        info!("Next take number: {:04}", result.take.take_number + 1);
    }

    fn on_error(&self, error: &RecorderError) {
        error!("{}", error);
    }

    fn on_warning(&self, warning: &RecorderError) {
        warn!("{}", warning);
    }
}
