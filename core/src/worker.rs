//! Worker threads and their per-epoch lifetime.
//!
//! RULES:
//!   - Every worker implements TickWorker. `run_worker` owns the loop,
//!     the sleep and the RunControl check; workers only implement one tick.
//!   - A worker leaves its loop within one interval of RunControl::stop
//!     and performs no write after observing it.
//!   - The only way to obtain a `Quiesced` value for a used epoch is to
//!     join every one of its threads. LevelLifecycle demands one before it
//!     builds the next epoch.

use crate::{
    collision,
    config::SimConfig,
    error::{SimError, SimResult},
    input::InputSource,
    movement::{self, MoveBounds},
    notify::NotificationSink,
    state::SharedWorldState,
    types::{Agent, Epoch, Tick},
    validation::ValidationWorker,
};
use serde::{Deserialize, Serialize};
use std::{
    sync::{
        atomic::{AtomicU8, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

/// The contract every epoch worker must fulfil.
pub trait TickWorker: Send + 'static {
    /// Stable name, also used for the thread name.
    fn name(&self) -> &'static str;

    /// Sleep between ticks.
    fn interval(&self) -> Duration;

    /// One iteration against the epoch's state.
    /// Returns true when the tick changed shared state.
    fn tick(&mut self, state: &SharedWorldState) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum WorkerPhase {
    Idle     = 0,
    Running  = 1,
    Stopping = 2,
    Stopped  = 3,
}

/// Phase of one worker, observable from other threads.
#[derive(Debug)]
pub struct PhaseCell(AtomicU8);

impl Default for PhaseCell {
    fn default() -> Self {
        Self::new()
    }
}

impl PhaseCell {
    pub fn new() -> Self {
        Self(AtomicU8::new(WorkerPhase::Idle as u8))
    }

    pub fn get(&self) -> WorkerPhase {
        match self.0.load(Ordering::Acquire) {
            0 => WorkerPhase::Idle,
            1 => WorkerPhase::Running,
            2 => WorkerPhase::Stopping,
            _ => WorkerPhase::Stopped,
        }
    }

    fn set(&self, phase: WorkerPhase) {
        self.0.store(phase as u8, Ordering::Release);
    }
}

/// What one worker did during its epoch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkerReport {
    pub name:    &'static str,
    pub epoch:   Epoch,
    pub ticks:   Tick,
    /// Ticks that changed shared state.
    pub commits: u64,
}

/// Drive `worker` until the epoch's RunControl is cleared.
pub fn run_worker<W: TickWorker>(
    mut worker: W,
    state: &SharedWorldState,
    phase: &PhaseCell,
) -> WorkerReport {
    let name = worker.name();
    let interval = worker.interval();
    let mut ticks: Tick = 0;
    let mut commits = 0u64;

    phase.set(WorkerPhase::Running);
    log::debug!("{name} started (epoch {})", state.epoch());

    while state.is_running() {
        if worker.tick(state) {
            commits += 1;
        }
        ticks += 1;
        thread::sleep(interval);
    }

    phase.set(WorkerPhase::Stopping);
    log::debug!(
        "{name} stopping (epoch {}): {ticks} ticks, {commits} commits",
        state.epoch()
    );
    phase.set(WorkerPhase::Stopped);

    WorkerReport {
        name,
        epoch: state.epoch(),
        ticks,
        commits,
    }
}

// ── Agent worker ─────────────────────────────────────────────────

/// Moves one agent: sample input, resolve, collide, commit.
pub struct AgentWorker {
    agent:    Agent,
    epoch:    Epoch,
    input:    Arc<dyn InputSource>,
    bounds:   MoveBounds,
    speed:    f32,
    radius:   f32,
    interval: Duration,
}

impl AgentWorker {
    pub fn new(agent: Agent, epoch: Epoch, config: &SimConfig, input: Arc<dyn InputSource>) -> Self {
        Self {
            agent,
            epoch,
            input,
            bounds:   MoveBounds::from_config(config),
            speed:    config.agent_speed,
            radius:   config.agent_radius,
            interval: config.agent_interval(),
        }
    }
}

impl TickWorker for AgentWorker {
    fn name(&self) -> &'static str {
        match self.agent {
            Agent::Primary   => "agent-primary",
            Agent::Secondary => "agent-secondary",
        }
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    fn tick(&mut self, state: &SharedWorldState) -> bool {
        let input = self.input.sample(self.agent);
        if input.is_idle() {
            return false;
        }

        let current = state.position(self.agent);
        let candidate = movement::resolve(current, input, self.speed, &self.bounds);
        if candidate == current {
            return false;
        }

        // Gates may be one validation tick stale here.
        let gates = state.gates().snapshot();
        if collision::is_blocked(candidate, self.radius, self.agent, state.grid(), &gates) {
            return false;
        }
        state.commit_position(self.agent, self.epoch, candidate)
    }
}

// ── Worker set ───────────────────────────────────────────────────

struct WorkerHandle {
    name:   &'static str,
    phase:  Arc<PhaseCell>,
    handle: JoinHandle<WorkerReport>,
}

/// Proof that no thread of the previous epoch is alive.
///
/// Produced only by `WorkerSet::shutdown` (every thread joined) or by
/// `Quiesced::fresh` (no epoch has run yet).
#[derive(Debug)]
pub struct Quiesced {
    epoch:    Option<Epoch>,
    reports:  Vec<WorkerReport>,
    panicked: Vec<&'static str>,
}

impl Quiesced {
    pub(crate) fn fresh() -> Self {
        Self {
            epoch:    None,
            reports:  Vec::new(),
            panicked: Vec::new(),
        }
    }

    /// The epoch whose workers were joined, if any.
    pub fn epoch(&self) -> Option<Epoch> {
        self.epoch
    }

    pub fn reports(&self) -> &[WorkerReport] {
        &self.reports
    }

    /// Err if any joined worker had panicked.
    pub fn check(&self) -> SimResult<()> {
        match (self.panicked.first(), self.epoch) {
            (Some(&name), Some(epoch)) => Err(SimError::WorkerPanicked { name, epoch }),
            _ => Ok(()),
        }
    }
}

/// The three threads of one epoch.
pub struct WorkerSet {
    state:   Arc<SharedWorldState>,
    workers: Vec<WorkerHandle>,
}

impl WorkerSet {
    /// Spawn both agent workers and the validation worker against `state`.
    ///
    /// If a spawn fails, the threads already started are stopped and joined
    /// before the error is returned.
    pub fn spawn(
        state: &Arc<SharedWorldState>,
        config: &SimConfig,
        input: Arc<dyn InputSource>,
        sink: Arc<dyn NotificationSink>,
    ) -> SimResult<Self> {
        let epoch = state.epoch();
        let mut set = Self {
            state:   Arc::clone(state),
            workers: Vec::with_capacity(3),
        };

        let spawned = set
            .start(AgentWorker::new(Agent::Primary, epoch, config, Arc::clone(&input)))
            .and_then(|_| set.start(AgentWorker::new(Agent::Secondary, epoch, config, input)))
            .and_then(|_| set.start(ValidationWorker::new(epoch, config, sink)));

        if let Err(err) = spawned {
            log::error!("epoch {epoch}: {err}; stopping partially started workers");
            // Joined here; the proof is discarded because the caller gets an error.
            let _ = set.shutdown();
            return Err(err);
        }
        Ok(set)
    }

    fn start<W: TickWorker>(&mut self, worker: W) -> SimResult<()> {
        let name = worker.name();
        let phase = Arc::new(PhaseCell::new());
        let state = Arc::clone(&self.state);
        let thread_phase = Arc::clone(&phase);
        let handle = thread::Builder::new()
            .name(format!("{name}-e{}", self.state.epoch()))
            .spawn(move || run_worker(worker, &state, &thread_phase))
            .map_err(|source| SimError::WorkerSpawn { name, source })?;
        self.workers.push(WorkerHandle { name, phase, handle });
        Ok(())
    }

    pub fn epoch(&self) -> Epoch {
        self.state.epoch()
    }

    pub fn phases(&self) -> Vec<(&'static str, WorkerPhase)> {
        self.workers.iter().map(|w| (w.name, w.phase.get())).collect()
    }

    /// Clear RunControl, then join every thread. Never returns while any
    /// worker of this epoch is still alive.
    pub fn shutdown(self) -> Quiesced {
        let epoch = self.state.epoch();
        self.state.run().stop();

        let mut reports = Vec::with_capacity(self.workers.len());
        let mut panicked = Vec::new();
        for worker in self.workers {
            match worker.handle.join() {
                Ok(report) => reports.push(report),
                Err(_) => {
                    log::error!("{} of epoch {epoch} panicked", worker.name);
                    panicked.push(worker.name);
                }
            }
        }
        log::debug!("epoch {epoch}: all workers joined");

        Quiesced {
            epoch: Some(epoch),
            reports,
            panicked,
        }
    }
}
