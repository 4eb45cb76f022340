//! The level lifecycle manager: owner of every epoch.
//!
//! STATE MACHINE:
//!   Uninitialized ──start_epoch──▶ EpochActive
//!   EpochActive ──advance_or_reset / stop / start_epoch──▶ TearingDown
//!   TearingDown ──all workers joined──▶ EpochActive (next level)
//!                                     └▶ Uninitialized (menu)
//!
//! RULES:
//!   - Teardown is stop + join of all three workers, fully synchronous.
//!   - A new epoch is built only from a `Quiesced` proof, which only a
//!     completed join can produce.
//!   - Every epoch gets a brand new SharedWorldState. Nothing is reset
//!     in place, so a straggler could never reach the new state anyway.

use crate::{
    audio::MusicTrack,
    config::SimConfig,
    error::{SimError, SimResult},
    event::SimEvent,
    input::InputSource,
    levels::LevelSource,
    notify::NotificationSink,
    snapshot::WorldSnapshot,
    state::SharedWorldState,
    types::{Epoch, LevelIndex},
    worker::{Quiesced, WorkerPhase, WorkerReport, WorkerSet},
};
use serde::{Deserialize, Serialize};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecyclePhase {
    Uninitialized,
    EpochActive,
    TearingDown,
}

/// Result of a successful `advance_or_reset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AdvanceOutcome {
    Advanced { level: LevelIndex },
    ReturnedToMenu,
}

/// Result of one host-frame poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FrameOutcome {
    /// No epoch is running.
    Idle,
    /// An epoch is running; nothing changed.
    Running,
    Advanced { level: LevelIndex },
    ReturnedToMenu,
}

impl From<AdvanceOutcome> for FrameOutcome {
    fn from(outcome: AdvanceOutcome) -> Self {
        match outcome {
            AdvanceOutcome::Advanced { level } => Self::Advanced { level },
            AdvanceOutcome::ReturnedToMenu     => Self::ReturnedToMenu,
        }
    }
}

/// The host's "advance requested" flag. Cheap to clone and set from any
/// thread; consumed by `LevelLifecycle::poll_frame`.
#[derive(Debug, Clone, Default)]
pub struct AdvanceSignal(Arc<AtomicBool>);

impl AdvanceSignal {
    pub fn request(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Read and clear.
    fn take(&self) -> bool {
        self.0.swap(false, Ordering::AcqRel)
    }
}

struct ActiveEpoch {
    state:   Arc<SharedWorldState>,
    workers: WorkerSet,
}

enum Slot {
    Idle(Quiesced),
    Active(ActiveEpoch),
    TearingDown,
}

pub struct LevelLifecycle {
    config:        SimConfig,
    levels:        Arc<dyn LevelSource>,
    input:         Arc<dyn InputSource>,
    sink:          Arc<dyn NotificationSink>,
    advance:       AdvanceSignal,
    slot:          Slot,
    next_epoch:    Epoch,
    in_simulation: bool,
    last_reports:  Vec<WorkerReport>,
}

impl LevelLifecycle {
    pub fn new(
        config: SimConfig,
        levels: Arc<dyn LevelSource>,
        input: Arc<dyn InputSource>,
        sink: Arc<dyn NotificationSink>,
    ) -> SimResult<Self> {
        config.validate()?;
        if levels.level_count() == 0 {
            return Err(SimError::InvalidConfig {
                reason: "level source has no levels".to_string(),
            });
        }
        Ok(Self {
            config,
            levels,
            input,
            sink,
            advance:       AdvanceSignal::default(),
            slot:          Slot::Idle(Quiesced::fresh()),
            next_epoch:    1,
            in_simulation: false,
            last_reports:  Vec::new(),
        })
    }

    // ── Transitions ────────────────────────────────────────────

    /// Start `level` as a new epoch. A running epoch is torn down first.
    pub fn start_epoch(&mut self, level: LevelIndex) -> SimResult<()> {
        let proof = self.quiesce()?;
        self.begin_epoch(level, proof)
    }

    /// Tear down the completed level, then start the next one or return
    /// to non-simulation mode when it was the last.
    pub fn advance_or_reset(&mut self) -> SimResult<AdvanceOutcome> {
        let level = match &self.slot {
            Slot::Active(active) if active.state.goals().level_completed() => active.state.level(),
            Slot::Active(active) => {
                return Err(SimError::InvalidTransition {
                    reason: format!("level {} is not completed", active.state.level()),
                })
            }
            _ => {
                return Err(SimError::InvalidTransition {
                    reason: "no epoch is active".to_string(),
                })
            }
        };

        let proof = self.quiesce()?;
        let next = level + 1;
        if next < self.levels.level_count() {
            log::info!("Advancing to level {next}");
            self.begin_epoch(next, proof)?;
            Ok(AdvanceOutcome::Advanced { level: next })
        } else {
            log::info!("All {} levels completed", self.levels.level_count());
            self.leave_simulation(proof);
            Ok(AdvanceOutcome::ReturnedToMenu)
        }
    }

    /// Once per host frame: consume the advance request and act on it if
    /// the level is completed. A request while the level is still in
    /// progress is dropped.
    pub fn poll_frame(&mut self) -> SimResult<FrameOutcome> {
        let requested = self.advance.take();
        let completed = self.active().map(|a| a.state.goals().level_completed());
        match completed {
            None => Ok(FrameOutcome::Idle),
            Some(true) if requested => Ok(self.advance_or_reset()?.into()),
            Some(_) => Ok(FrameOutcome::Running),
        }
    }

    /// Tear down any running epoch and return to non-simulation mode.
    pub fn stop(&mut self) -> SimResult<()> {
        if !matches!(self.slot, Slot::Active(_)) {
            return Ok(());
        }
        let proof = self.quiesce()?;
        self.leave_simulation(proof);
        Ok(())
    }

    /// Stop and join the running epoch, if any. Leaves the slot in
    /// TearingDown; the caller must install the next slot.
    fn quiesce(&mut self) -> SimResult<Quiesced> {
        match std::mem::replace(&mut self.slot, Slot::TearingDown) {
            Slot::Idle(proof) => Ok(proof),
            Slot::Active(active) => {
                let epoch = active.state.epoch();
                let level = active.state.level();
                log::debug!("Tearing down epoch {epoch} (level {level})");

                let proof = active.workers.shutdown();
                self.last_reports = proof.reports().to_vec();
                self.sink.notify(SimEvent::EpochStopped { epoch, level });

                if let Err(err) = proof.check() {
                    self.leave_simulation(proof);
                    return Err(err);
                }
                Ok(proof)
            }
            Slot::TearingDown => Err(SimError::InvalidTransition {
                reason: "teardown already in progress".to_string(),
            }),
        }
    }

    /// Build and start a fresh epoch. `proof` ties the call to a finished
    /// teardown of whatever ran before. A level that fails to load sends
    /// the host back to non-simulation mode.
    fn begin_epoch(&mut self, level: LevelIndex, proof: Quiesced) -> SimResult<()> {
        let grid = match self.levels.load(level, &self.config) {
            Ok(grid) => grid,
            Err(err) => {
                log::error!("Cannot start level {level}: {err}");
                self.leave_simulation(proof);
                return Err(err);
            }
        };
        drop(proof);

        let epoch = self.next_epoch;
        self.next_epoch += 1;
        let state = Arc::new(SharedWorldState::new(epoch, level, grid));

        if !self.in_simulation {
            self.in_simulation = true;
            self.sink.notify(SimEvent::MusicChanged { track: MusicTrack::Gameplay });
        }
        self.sink.notify(SimEvent::EpochStarted { epoch, level });

        let workers = match WorkerSet::spawn(
            &state,
            &self.config,
            Arc::clone(&self.input),
            Arc::clone(&self.sink),
        ) {
            Ok(workers) => workers,
            Err(err) => {
                // WorkerSet::spawn has already joined what it started.
                self.sink.notify(SimEvent::EpochStopped { epoch, level });
                self.leave_simulation(Quiesced::fresh());
                return Err(err);
            }
        };

        log::info!("Epoch {epoch} started on level {level}");
        self.slot = Slot::Active(ActiveEpoch { state, workers });
        Ok(())
    }

    fn leave_simulation(&mut self, proof: Quiesced) {
        if self.in_simulation {
            self.in_simulation = false;
            let epoch = proof.epoch().unwrap_or(self.next_epoch - 1);
            self.sink.notify(SimEvent::ReturnedToMenu { epoch });
            self.sink.notify(SimEvent::MusicChanged { track: MusicTrack::Menu });
        }
        self.slot = Slot::Idle(proof);
    }

    // ── Accessors ──────────────────────────────────────────────

    pub fn phase(&self) -> LifecyclePhase {
        match self.slot {
            Slot::Idle(_)     => LifecyclePhase::Uninitialized,
            Slot::Active(_)   => LifecyclePhase::EpochActive,
            Slot::TearingDown => LifecyclePhase::TearingDown,
        }
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn level_count(&self) -> usize {
        self.levels.level_count()
    }

    /// Handle for the host's "advance" key.
    pub fn advance_signal(&self) -> AdvanceSignal {
        self.advance.clone()
    }

    fn active(&self) -> Option<&ActiveEpoch> {
        match &self.slot {
            Slot::Active(active) => Some(active),
            _ => None,
        }
    }

    /// The running epoch's shared state, for render or inspection threads.
    pub fn world(&self) -> Option<Arc<SharedWorldState>> {
        self.active().map(|a| Arc::clone(&a.state))
    }

    pub fn snapshot(&self) -> Option<WorldSnapshot> {
        self.active().map(|a| a.state.snapshot())
    }

    pub fn epoch(&self) -> Option<Epoch> {
        self.active().map(|a| a.state.epoch())
    }

    pub fn current_level(&self) -> Option<LevelIndex> {
        self.active().map(|a| a.state.level())
    }

    pub fn level_completed(&self) -> bool {
        self.active()
            .is_some_and(|a| a.state.goals().level_completed())
    }

    pub fn worker_phases(&self) -> Vec<(&'static str, WorkerPhase)> {
        self.active().map(|a| a.workers.phases()).unwrap_or_default()
    }

    /// Reports of the most recently joined epoch.
    pub fn last_reports(&self) -> &[WorkerReport] {
        &self.last_reports
    }
}

impl Drop for LevelLifecycle {
    fn drop(&mut self) {
        if let Err(err) = self.stop() {
            log::error!("Lifecycle teardown on drop failed: {err}");
        }
    }
}
