mod monitor;
mod tone;

use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

use tessitura_core::types::{Event, Intent, PlaybackState};
use tessitura_core::{Config, EngineSettings, Orchestrator, SystemClock};

use monitor::WavMonitor;
use tone::ToneService;

const FRAME: Duration = Duration::from_millis(10);

const USAGE: &str = "usage: tessitura [--minutes N] [--out DIR] [--config FILE] \
                     [--monitor FILE.wav] [--seed N] [--no-conductor] [--verbose]";

fn init_logging(verbose: bool) {
    use simplelog::*;

    let log_level = if verbose { LevelFilter::Debug } else { LevelFilter::Warn };

    let log_path = dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tessitura")
        .join("tessitura.log");

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let log_file = File::create(&log_path).unwrap_or_else(|_| {
        File::create("/tmp/tessitura.log").expect("Cannot create log file")
    });

    WriteLogger::init(log_level, simplelog::Config::default(), log_file)
        .expect("Failed to initialize logger");

    log::info!("tessitura starting (log level: {:?})", log_level);
}

fn arg_value(args: &[String], flag: &str) -> Option<String> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1).cloned())
}

fn other_error(message: impl ToString) -> io::Error {
    io::Error::new(io::ErrorKind::Other, message.to_string())
}

fn report(event: &Event) {
    match event {
        Event::PlaybackStateChanged(state) => println!("state: {:?}", state),
        Event::WarmupStarted { total_ms, warmup_ms } => println!(
            "warming up for {:.1}s, recording starts in {:.1}s",
            *warmup_ms as f64 / 1000.0,
            *total_ms as f64 / 1000.0
        ),
        Event::HandshakeResult(ok) => {
            println!("planner {}", if *ok { "available" } else { "unavailable, using fallback plan" })
        }
        Event::ConductorStageChanged { name, is_ai } => {
            println!("stage: {}{}", name, if *is_ai { " (planned)" } else { "" })
        }
        Event::ConductorEngaged => println!("conductor engaged"),
        Event::RecordingAvailable { duration_secs } => {
            println!("recorded {:.1}s", duration_secs)
        }
        other => log::debug!("event {}", other.name()),
    }
}

fn main() -> io::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.iter().any(|a| a == "--help" || a == "-h") {
        println!("{}", USAGE);
        return Ok(());
    }
    let verbose = args.iter().any(|a| a == "--verbose" || a == "-v");
    init_logging(verbose);

    let config = match arg_value(&args, "--config") {
        Some(path) => Config::load_from(&PathBuf::from(path)),
        None => Config::load(),
    };
    let minutes = match arg_value(&args, "--minutes") {
        Some(v) => Some(v.parse::<u32>().map_err(|_| other_error(USAGE))?),
        None => None,
    };
    let rng_seed = match arg_value(&args, "--seed") {
        Some(v) => Some(v.parse::<u64>().map_err(|_| other_error(USAGE))?),
        None => None,
    };
    let out_dir = arg_value(&args, "--out")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    let conduct = !args.iter().any(|a| a == "--no-conductor");

    let settings = EngineSettings {
        timing: config.timing(),
        scheduler: config.scheduler(),
        rng_seed,
    };
    let sample_rate = settings.scheduler.sample_rate;
    let channels = settings.scheduler.channels;

    let mut orch = Orchestrator::new(
        config.session_defaults(),
        settings,
        Box::new(SystemClock::new()),
        Box::new(ToneService::new(sample_rate, channels)),
    );
    if let Some(path) = arg_value(&args, "--monitor") {
        let sink = WavMonitor::create(&PathBuf::from(path), sample_rate, channels)
            .map_err(other_error)?;
        orch.set_output(Box::new(sink));
    }
    let events = orch.subscribe();

    if let Some(m) = minutes {
        orch.dispatch(Intent::SetMaxDuration(m)).map_err(other_error)?;
    }
    orch.dispatch(Intent::SetConductor(conduct)).map_err(other_error)?;
    orch.dispatch(Intent::Record).map_err(other_error)?;

    loop {
        orch.tick();
        for event in events.try_iter() {
            report(&event);
        }
        if orch.state() == PlaybackState::Stopped {
            break;
        }
        std::thread::sleep(FRAME);
    }

    if orch.take().is_none() {
        return Err(other_error("session ended without a recording"));
    }
    let path = orch.export_to(&out_dir).map_err(other_error)?;
    println!("saved {}", path.display());
    log::info!("exported take to {}", path.display());
    Ok(())
}
