#![allow(dead_code)]
//! Test harness for tessitura-core integration tests: scripted generation
//! and planning services plus a hand-driven clock.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};

use tessitura_core::audio::SchedulerConfig;
use tessitura_core::types::{Event, PlaybackState, SessionGeneration, SessionState};
use tessitura_core::{
    Clock, EngineSettings, GenerationService, InboundMessage, LiveSession, ManualClock,
    Orchestrator, PlanRequest, PlanningService, SessionEvent, WeightedPrompt,
};
use tessitura_core::{ServiceError, Timing};

/// Frame length used when advancing the clock.
pub const FRAME: Duration = Duration::from_millis(16);

/// What the fake generation service saw.
#[derive(Default)]
pub struct StreamLog {
    pub connects: Vec<SessionGeneration>,
    pub inbox: Option<Sender<InboundMessage>>,
    /// Clock time of every prompt push, with the payload.
    pub pushes: Vec<(Duration, Vec<WeightedPrompt>)>,
    pub plays: usize,
    pub closes: usize,
    pub refuse_connect: bool,
}

pub struct FakeGeneration {
    log: Arc<Mutex<StreamLog>>,
    clock: ManualClock,
}

struct FakeSession {
    log: Arc<Mutex<StreamLog>>,
    clock: ManualClock,
}

impl GenerationService for FakeGeneration {
    fn connect(
        &mut self,
        generation: SessionGeneration,
        inbox: Sender<InboundMessage>,
    ) -> Result<Box<dyn LiveSession>, ServiceError> {
        let mut log = self.log.lock().unwrap();
        if log.refuse_connect {
            return Err(ServiceError::Unavailable("refused".into()));
        }
        log.connects.push(generation);
        log.inbox = Some(inbox);
        Ok(Box::new(FakeSession {
            log: self.log.clone(),
            clock: self.clock.clone(),
        }))
    }
}

impl LiveSession for FakeSession {
    fn set_weighted_prompts(&mut self, prompts: &[WeightedPrompt]) -> Result<(), ServiceError> {
        let now = self.clock.now();
        self.log.lock().unwrap().pushes.push((now, prompts.to_vec()));
        Ok(())
    }

    fn play(&mut self) -> Result<(), ServiceError> {
        self.log.lock().unwrap().plays += 1;
        Ok(())
    }

    fn close(&mut self) {
        self.log.lock().unwrap().closes += 1;
    }
}

/// Planner whose replies the test sends by hand.
#[derive(Default)]
pub struct PlannerLog {
    pub available: bool,
    pub requests: Vec<PlanRequest>,
    pub reply_to: Option<Sender<Result<String, ServiceError>>>,
}

pub struct FakePlanner {
    log: Arc<Mutex<PlannerLog>>,
}

impl PlanningService for FakePlanner {
    fn check_availability(&mut self) -> Receiver<bool> {
        let (tx, rx) = crossbeam_channel::bounded(1);
        let _ = tx.send(self.log.lock().unwrap().available);
        rx
    }

    fn request_plan(&mut self, request: PlanRequest) -> Receiver<Result<String, ServiceError>> {
        let (tx, rx) = crossbeam_channel::bounded(1);
        let mut log = self.log.lock().unwrap();
        log.requests.push(request);
        log.reply_to = Some(tx);
        rx
    }
}

/// Small sample rate keeps long takes cheap; the auto-loop is off unless a
/// test turns it on.
pub fn settings() -> EngineSettings {
    EngineSettings {
        timing: Timing {
            auto_loop_grace_secs: 0,
            ..Timing::default()
        },
        scheduler: SchedulerConfig {
            sample_rate: 1_000,
            channels: 2,
            ..SchedulerConfig::default()
        },
        rng_seed: Some(42),
    }
}

pub struct Harness {
    pub orch: Orchestrator,
    pub clock: ManualClock,
    pub stream: Arc<Mutex<StreamLog>>,
    pub planner: Option<Arc<Mutex<PlannerLog>>>,
    pub events: Receiver<Event>,
}

impl Harness {
    pub fn new() -> Self {
        Self::build(SessionState::new(), settings(), None)
    }

    pub fn with_settings(settings: EngineSettings) -> Self {
        Self::build(SessionState::new(), settings, None)
    }

    pub fn with_planner(available: bool) -> Self {
        Self::build(SessionState::new(), settings(), Some(available))
    }

    pub fn build(session: SessionState, settings: EngineSettings, planner: Option<bool>) -> Self {
        let clock = ManualClock::new();
        let stream = Arc::new(Mutex::new(StreamLog::default()));
        let generation = FakeGeneration {
            log: stream.clone(),
            clock: clock.clone(),
        };
        let mut orch =
            Orchestrator::new(session, settings, Box::new(clock.clone()), Box::new(generation));
        let planner = planner.map(|available| {
            let log = Arc::new(Mutex::new(PlannerLog {
                available,
                ..Default::default()
            }));
            (log.clone(), FakePlanner { log })
        });
        let planner_log = match planner {
            Some((log, fake)) => {
                orch = orch.with_planner(Box::new(fake));
                Some(log)
            }
            None => None,
        };
        let events = orch.subscribe();
        Self {
            orch,
            clock,
            stream,
            planner: planner_log,
            events,
        }
    }

    /// Advance the clock by `by`, ticking once per frame.
    pub fn advance(&mut self, by: Duration) {
        let mut left = by;
        while !left.is_zero() {
            let step = left.min(FRAME);
            self.clock.advance(step);
            self.orch.tick();
            left -= step;
        }
    }

    pub fn advance_ms(&mut self, ms: u64) {
        self.advance(Duration::from_millis(ms));
    }

    pub fn advance_secs(&mut self, secs: u64) {
        self.advance(Duration::from_secs(secs));
    }

    /// Everything emitted since the last call.
    pub fn drain_events(&self) -> Vec<Event> {
        self.events.try_iter().collect()
    }

    /// Record a take of about `secs` seconds with the conductor off.
    pub fn record_take(&mut self, secs: u64) {
        self.orch.record().unwrap();
        assert_eq!(self.orch.state(), PlaybackState::Recording);
        self.advance_secs(secs);
        self.orch.stop(true, false);
        assert!(self.orch.take().is_some());
    }

    /// Push a session message as generation `generation`.
    pub fn send_as(&self, generation: SessionGeneration, event: SessionEvent) {
        let log = self.stream.lock().unwrap();
        let inbox = log.inbox.as_ref().expect("no session connected");
        inbox.send(InboundMessage { generation, event }).unwrap();
    }

    /// Push a session message from the current session.
    pub fn send(&self, event: SessionEvent) {
        self.send_as(self.orch.generation(), event);
    }

    /// Answer the last plan request.
    pub fn reply_plan(&self, reply: Result<String, ServiceError>) {
        let planner = self.planner.as_ref().expect("no planner");
        let tx = planner.lock().unwrap().reply_to.take().expect("no plan request");
        let _ = tx.send(reply);
    }
}

/// Playback states in emission order.
pub fn states(events: &[Event]) -> Vec<PlaybackState> {
    events
        .iter()
        .filter_map(|e| match e {
            Event::PlaybackStateChanged(s) => Some(*s),
            _ => None,
        })
        .collect()
}

/// `frames` stereo frames of a constant value, as 16-bit PCM.
pub fn pcm(frames: usize, value: i16) -> Vec<u8> {
    std::iter::repeat(value.to_le_bytes())
        .take(frames * 2)
        .flatten()
        .collect()
}

/// A planner reply with stages every 20 seconds.
pub fn plan_json(stages: &[&str]) -> String {
    let stages: Vec<String> = stages
        .iter()
        .enumerate()
        .map(|(i, name)| {
            format!(
                r#"{{"stageName":"{}","stageStartTimeSec":{},"targets":[{{"parameterName":"Groove","targetValue":1.5}}]}}"#,
                name,
                i * 20
            )
        })
        .collect();
    format!(r#"{{"plan":[{}]}}"#, stages.join(","))
}
