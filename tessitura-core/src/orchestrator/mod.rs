//! The session/recording lifecycle.
//!
//! [`Orchestrator`] owns the session state and every moving part around it:
//! the live generation session, the audio scheduler, the time tracker, the
//! snapshot log and the conductor. It is single-threaded; the host calls
//! [`Orchestrator::tick`] once per frame and feeds UI intents through
//! [`Orchestrator::dispatch`].

mod intents;
mod lifecycle;
mod transport;

use std::path::{Path, PathBuf};
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};

use tessitura_audio::{
    AudioScheduler, AudioSink, OutputLevels, RecordedTake, Rewind, SnapshotLog, TimeTracker,
};
use tessitura_types::{Event, PlaybackState, SessionGeneration, SessionState};

use crate::clock::Clock;
use crate::conductor::Conductor;
use crate::config::{EngineSettings, Timing};
use crate::error::{ServiceError, SessionError};
use crate::events::EventBus;
use crate::service::{
    AnyStyle, GenerationService, InboundMessage, LiveSession, PlanningService, StyleCatalog,
};
use crate::timers::{TimerKind, Timers};

/// Smoothing for the fade envelope.
const FADE_TIME_CONSTANT: f32 = 0.02;
/// Smoothing for a user volume change.
const VOLUME_TIME_CONSTANT: f32 = 0.05;

/// Stage shown to the user, as recorded into snapshots.
#[derive(Debug, Clone, PartialEq)]
struct StageLabel {
    name: String,
    is_ai: bool,
}

pub struct Orchestrator {
    session: SessionState,
    timing: Timing,
    clock: Box<dyn Clock>,
    /// Clock reading at output time zero.
    origin: Duration,
    events: EventBus,

    generation_service: Box<dyn GenerationService>,
    planner: Option<Box<dyn PlanningService>>,
    styles: Box<dyn StyleCatalog>,
    live: Option<Box<dyn LiveSession>>,
    generation: SessionGeneration,
    inbox_tx: Sender<InboundMessage>,
    inbox_rx: Receiver<InboundMessage>,
    pending_plan: Option<Receiver<Result<String, ServiceError>>>,
    pending_handshake: Option<Receiver<bool>>,

    state: PlaybackState,
    resume_to: Option<PlaybackState>,
    /// One-shot timers suspended by `pause`, with their remaining time.
    paused_timers: Vec<(TimerKind, Duration)>,
    elapsed: f64,
    looping: bool,
    timers: Timers,
    tracker: TimeTracker,
    rewind: Option<Rewind>,

    scheduler: AudioScheduler,
    snapshots: SnapshotLog,
    take: Option<RecordedTake>,

    conductor: Conductor,
    stage: Option<StageLabel>,
    /// Status message of the last snapshot applied during playback.
    applied_status: Option<String>,
    vocal_signal: Option<char>,
    last_prompt_push: Option<Duration>,
    auto_loop_remaining: u32,
}

impl Orchestrator {
    pub fn new(
        session: SessionState,
        settings: EngineSettings,
        clock: Box<dyn Clock>,
        generation_service: Box<dyn GenerationService>,
    ) -> Self {
        let (inbox_tx, inbox_rx) = crossbeam_channel::unbounded();
        let origin = clock.now();
        let mut scheduler = AudioScheduler::new(settings.scheduler);
        scheduler.set_master_immediately(0.0);
        let mut conductor = Conductor::new(settings.rng_seed);
        conductor.set_planner_available(false);

        Self {
            session,
            timing: settings.timing,
            clock,
            origin,
            events: EventBus::new(),
            generation_service,
            planner: None,
            styles: Box::new(AnyStyle),
            live: None,
            generation: SessionGeneration::new(0),
            inbox_tx,
            inbox_rx,
            pending_plan: None,
            pending_handshake: None,
            state: PlaybackState::Stopped,
            resume_to: None,
            paused_timers: Vec::new(),
            elapsed: 0.0,
            looping: false,
            timers: Timers::new(),
            tracker: TimeTracker::new(),
            rewind: None,
            scheduler,
            snapshots: SnapshotLog::new(),
            take: None,
            conductor,
            stage: None,
            applied_status: None,
            vocal_signal: None,
            last_prompt_push: None,
            auto_loop_remaining: 0,
        }
    }

    pub fn with_planner(mut self, planner: Box<dyn PlanningService>) -> Self {
        self.planner = Some(planner);
        self.conductor.set_planner_available(true);
        self
    }

    pub fn with_style_catalog(mut self, styles: Box<dyn StyleCatalog>) -> Self {
        self.styles = styles;
        self
    }

    /// Route the master output somewhere other than the null sink.
    pub fn set_output(&mut self, sink: Box<dyn AudioSink>) {
        self.scheduler.set_destination(sink);
    }

    pub fn subscribe(&mut self) -> Receiver<Event> {
        self.events.subscribe()
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn is_looping(&self) -> bool {
        self.looping
    }

    pub fn conductor(&self) -> &Conductor {
        &self.conductor
    }

    pub fn take(&self) -> Option<&RecordedTake> {
        self.take.as_ref()
    }

    pub fn recorded_duration(&self) -> Option<f64> {
        self.take.as_ref().map(|t| t.segment.end_secs())
    }

    pub fn snapshots(&self) -> &SnapshotLog {
        &self.snapshots
    }

    pub fn scheduler(&self) -> &AudioScheduler {
        &self.scheduler
    }

    pub fn output_levels(&self) -> OutputLevels {
        self.scheduler.output_levels()
    }

    pub fn vocal_signal(&self) -> Option<char> {
        self.vocal_signal
    }

    pub fn generation(&self) -> SessionGeneration {
        self.generation
    }

    pub fn is_timer_armed(&self, kind: TimerKind) -> bool {
        self.timers.is_armed(kind)
    }

    /// Write the recorded take into `dir` under its export name.
    pub fn export_to(&self, dir: &Path) -> Result<PathBuf, SessionError> {
        let take = self.take.as_ref().ok_or(SessionError::NoRecording)?;
        crate::export::write_take(take, &self.session, dir)
    }

    /// Advance everything to the clock's current time.
    pub fn tick(&mut self) {
        let now = self.clock.now();
        self.drain_inbox(now);
        self.poll_planner(now);
        while let Some(kind) = self.timers.pop_due(now) {
            self.on_timer(kind, now);
        }
        self.track_frame(now);
        self.rewind_frame(now);
        let until = self.output_time(now);
        self.scheduler.render(until);
    }

    fn on_timer(&mut self, kind: TimerKind, now: Duration) {
        log::trace!(target: "session", "timer {:?} fired", kind);
        match kind {
            TimerKind::WarmupEnd => {
                if self.state == PlaybackState::Warmup {
                    self.begin_preparing(now);
                }
            }
            TimerKind::PreparingEnd => {
                if self.state == PlaybackState::Preparing {
                    self.begin_recording(now);
                }
            }
            TimerKind::AutoStop => self.auto_stop(now),
            TimerKind::LoopWait => {
                if self.state == PlaybackState::LoopWaiting {
                    self.start_playback(0.0, now);
                }
            }
            TimerKind::EngagingCountdown => self.finish_engaging(),
            TimerKind::ConductorTick => self.conductor_step(now),
            TimerKind::VocalSignalExpiry => {
                self.vocal_signal = None;
                self.emit(Event::VocalSignalReceived(None));
                self.request_prompt_refresh(now);
            }
            TimerKind::PromptRefresh => self.push_prompts(now),
            TimerKind::AutoLoopCountdown => self.auto_loop_step(now),
        }
    }

    fn now(&self) -> Duration {
        self.clock.now()
    }

    fn output_time(&self, now: Duration) -> f64 {
        now.saturating_sub(self.origin).as_secs_f64()
    }

    fn emit(&mut self, event: Event) {
        self.events.emit(event);
    }

    fn set_state(&mut self, state: PlaybackState) {
        if self.state == state {
            return;
        }
        log::info!(target: "session", "{} -> {}", self.state, state);
        self.state = state;
        self.emit(Event::PlaybackStateChanged(state));
    }

    fn require(&self, action: &'static str, allowed: &[PlaybackState]) -> Result<(), SessionError> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(SessionError::InvalidState {
                action,
                state: self.state,
            })
        }
    }
}
