//! maze-runner: headless host for the duomaze simulation core.
//!
//! Usage:
//!   maze-runner --seed 12345 --level 0 --duration-ms 500 --cycles 4
//!   maze-runner --data-dir ./data --journal run.db
//!   maze-runner --ipc-mode

use anyhow::Result;
use chrono::Utc;
use duomaze_core::{
    audio::AudioControl,
    command::HostCommand,
    config::SimConfig,
    event::SimEvent,
    input::{InputSource, KeyBindings, RandomWalkInput, SharedInput},
    levels::{BuiltinLevels, LevelDir, LevelSource},
    lifecycle::{FrameOutcome, LevelLifecycle, LifecyclePhase},
    notify::{FanoutSink, LogSink, NotificationSink, RecordingSink},
    snapshot::WorldSnapshot,
    store::{new_run_id, JournalSink, JournalStore},
    types::{Epoch, LevelIndex},
    worker::WorkerReport,
};
use std::env;
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[derive(serde::Serialize)]
struct HostState {
    phase:           LifecyclePhase,
    epoch:           Option<Epoch>,
    level:           Option<LevelIndex>,
    level_completed: bool,
    volume:          f32,
    paused:          bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    outcome:         Option<FrameOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error:           Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    world:           Option<WorldSnapshot>,
}

struct Session {
    lifecycle: LevelLifecycle,
    audio:     AudioControl,
    recorder:  Arc<RecordingSink>,
    journal:   Option<Arc<JournalSink>>,
    bindings:  [KeyBindings; 2],
    run_id:    String,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let seed = parse_arg(&args, "--seed", 42u64);
    let level = parse_arg(&args, "--level", 0usize);
    let duration_ms = parse_arg(&args, "--duration-ms", 500u64);
    let cycles = parse_arg(&args, "--cycles", 1u32);
    let ipc_mode = args.iter().any(|a| a == "--ipc-mode");
    let data_dir = string_arg(&args, "--data-dir");
    let journal = string_arg(&args, "--journal");

    let (config, levels) = match data_dir {
        Some(dir) => {
            let levels: Arc<dyn LevelSource> = Arc::new(LevelDir::open(format!("{dir}/levels"))?);
            (SimConfig::load(dir)?, levels)
        }
        None => (SimConfig::default(), Arc::new(BuiltinLevels) as Arc<dyn LevelSource>),
    };

    let run_id = new_run_id();
    if !ipc_mode {
        println!("duomaze: maze-runner");
        println!("  run_id:      {run_id}");
        println!("  started:     {}", Utc::now().to_rfc3339());
        println!("  seed:        {seed}");
        println!("  level:       {level} of {}", levels.level_count());
        println!("  duration:    {duration_ms} ms");
        println!("  cycles:      {cycles}");
        println!("  data_dir:    {}", data_dir.unwrap_or("(built-in)"));
        println!("  journal:     {}", journal.unwrap_or("(none)"));
        println!();
    }

    if ipc_mode {
        let input = Arc::new(SharedInput::new());
        let mut session = Session::build(config, levels, input.clone(), journal, run_id)?;
        run_ipc_loop(&mut session, &input)?;
        session.lifecycle.stop()?;
    } else {
        let input = Arc::new(RandomWalkInput::new(seed));
        let mut session = Session::build(config, levels, input, journal, run_id)?;
        let reports = run_soak(&mut session, level, Duration::from_millis(duration_ms), cycles)?;
        print_summary(&session, &reports)?;
    }

    Ok(())
}

impl Session {
    fn build(
        config: SimConfig,
        levels: Arc<dyn LevelSource>,
        input: Arc<dyn InputSource>,
        journal: Option<&str>,
        run_id: String,
    ) -> Result<Self> {
        let recorder = Arc::new(RecordingSink::new());
        let mut sink = FanoutSink::new()
            .with(recorder.clone())
            .with(Arc::new(LogSink));

        let journal = match journal {
            Some(path) => {
                let store = JournalStore::open(path)?;
                store.migrate()?;
                let journal = Arc::new(JournalSink::new(store, run_id.clone())?);
                sink = sink.with(journal.clone());
                Some(journal)
            }
            None => None,
        };

        let sink: Arc<dyn NotificationSink> = Arc::new(sink);
        let lifecycle = LevelLifecycle::new(config, levels, input, sink)?;
        Ok(Self {
            lifecycle,
            audio: AudioControl::new(),
            recorder,
            journal,
            bindings: KeyBindings::defaults(),
            run_id,
        })
    }

    fn state(&self, outcome: Option<FrameOutcome>, error: Option<String>) -> HostState {
        HostState {
            phase:           self.lifecycle.phase(),
            epoch:           self.lifecycle.epoch(),
            level:           self.lifecycle.current_level(),
            level_completed: self.lifecycle.level_completed(),
            volume:          self.audio.volume(),
            paused:          self.audio.is_paused(),
            outcome,
            error,
            world:           self.lifecycle.snapshot(),
        }
    }
}

// ── Soak mode ────────────────────────────────────────────────────

/// Run `cycles` epochs of random-walk input, `duration` each.
/// A level completed by chance is advanced exactly as a host would.
fn run_soak(
    session: &mut Session,
    level: LevelIndex,
    duration: Duration,
    cycles: u32,
) -> Result<Vec<WorkerReport>> {
    let frame = Duration::from_millis(16);
    let advance = session.lifecycle.advance_signal();
    let mut reports = Vec::new();

    for cycle in 0..cycles {
        session.lifecycle.start_epoch(level)?;
        let mut elapsed = Duration::ZERO;
        while elapsed < duration {
            thread::sleep(frame);
            elapsed += frame;
            if session.lifecycle.level_completed() {
                advance.request();
            }
            match session.lifecycle.poll_frame()? {
                FrameOutcome::Advanced { level } => {
                    log::info!("cycle {cycle}: advanced to level {level}");
                    reports.extend_from_slice(session.lifecycle.last_reports());
                }
                FrameOutcome::ReturnedToMenu => break,
                FrameOutcome::Idle | FrameOutcome::Running => {}
            }
        }

        if let Some(world) = session.lifecycle.snapshot() {
            log::info!(
                "cycle {cycle}: epoch {} level {} primary ({:.1}, {:.1}) secondary ({:.1}, {:.1})",
                world.epoch, world.level,
                world.primary.x, world.primary.y,
                world.secondary.x, world.secondary.y,
            );
        }
        session.lifecycle.stop()?;
        reports.extend_from_slice(session.lifecycle.last_reports());
    }
    Ok(reports)
}

fn print_summary(session: &Session, reports: &[WorkerReport]) -> Result<()> {
    let events = session.recorder.events();
    let epochs = session
        .recorder
        .count_where(|e| matches!(e, SimEvent::EpochStarted { .. }));
    let completed = session
        .recorder
        .count_where(|e| matches!(e, SimEvent::LevelCompleted { .. }));
    let gates = session
        .recorder
        .count_where(|e| matches!(e, SimEvent::GateOpened { .. }));

    println!("=== RUN SUMMARY ===");
    println!("  run_id:           {}", session.run_id);
    println!("  epochs run:       {epochs}");
    println!("  gates opened:     {gates}");
    println!("  levels completed: {completed}");
    println!("  events seen:      {}", events.len());

    println!();
    println!("=== WORKERS ===");
    for report in reports {
        println!(
            "  epoch {:>3} | {:<16} | ticks: {:>6} | commits: {:>6}",
            report.epoch, report.name, report.ticks, report.commits
        );
    }

    if let Some(journal) = &session.journal {
        let rows = journal.count()?;
        println!();
        println!("=== JOURNAL ===");
        println!("  rows written:     {rows}");
        for event_type in ["epoch_started", "gate_opened", "level_completed"] {
            let n = journal.count_of_type(event_type)?;
            println!("  {event_type:<17} {n}");
        }
    }
    Ok(())
}

// ── IPC mode ─────────────────────────────────────────────────────

fn run_ipc_loop(session: &mut Session, input: &SharedInput) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut handle = stdin.lock();
    let mut buffer = String::new();
    let advance = session.lifecycle.advance_signal();

    loop {
        buffer.clear();
        let bytes_read = handle.read_line(&mut buffer)?;
        if bytes_read == 0 {
            break; // EOF
        }
        if buffer.trim().is_empty() {
            continue;
        }

        let cmd: HostCommand = match serde_json::from_str(&buffer) {
            Ok(c) => c,
            Err(e) => {
                let err_json = serde_json::json!({ "error": e.to_string() });
                writeln!(stdout, "{}", err_json)?;
                stdout.flush()?;
                continue;
            }
        };
        if cmd.is_quit() {
            break;
        }

        let mut outcome = None;
        let result = match cmd {
            HostCommand::Start { level } => {
                input.release_all();
                session.lifecycle.start_epoch(level)
            }
            HostCommand::Input { agent, input: keys } => {
                input.set(agent, keys);
                Ok(())
            }
            HostCommand::Keys { held } => {
                input.set_held(&session.bindings, &held);
                Ok(())
            }
            HostCommand::Advance => {
                advance.request();
                Ok(())
            }
            HostCommand::Frame => session.lifecycle.poll_frame().map(|o| {
                if o != FrameOutcome::Running && o != FrameOutcome::Idle {
                    input.release_all();
                }
                outcome = Some(o);
            }),
            HostCommand::Stop => {
                input.release_all();
                session.lifecycle.stop()
            }
            HostCommand::TogglePause => {
                session.audio.toggle_pause();
                Ok(())
            }
            HostCommand::SetVolume { volume } => {
                session.audio.set_volume(volume);
                Ok(())
            }
            HostCommand::GetState | HostCommand::Quit => Ok(()),
        };

        let error = result.err().map(|e| {
            log::warn!("command failed: {e}");
            e.to_string()
        });
        let state = session.state(outcome, error);
        writeln!(stdout, "{}", serde_json::to_string(&state)?)?;
        stdout.flush()?;
    }
    Ok(())
}

// ── Args ─────────────────────────────────────────────────────────

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}

fn string_arg<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}
