//! The conductor: performs the session by following a plan of stages,
//! nudging prompts and channels toward each stage's targets a little at a
//! time.

mod fallback;
mod interpolate;

use std::collections::HashMap;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use tessitura_types::{
    ChannelRole, GenerationMode, PerformancePlanStage, PlanSource, PromptId, SessionState,
};

pub use fallback::fallback_plan;

/// Chance per tick of a vocal cue in vocalization mode.
const VOCAL_CUE_PROBABILITY: f64 = 0.05;
const VOWELS: [char; 5] = ['A', 'E', 'I', 'O', 'U'];

/// Instrument names recognised in stage names.
const KNOWN_INSTRUMENTS: [&str; 43] = [
    "Synthesizer",
    "Electric Guitar",
    "Acoustic Guitar",
    "Saxophone",
    "Trumpet",
    "Clarinet",
    "Flute",
    "Violin",
    "Cello",
    "Harmonica",
    "Piano",
    "Electric Piano",
    "Organ",
    "Strings",
    "Pads",
    "Brass Section",
    "Choir",
    "Bass Guitar",
    "Double Bass",
    "Synth Bass",
    "Tuba",
    "Drum Kit",
    "Electronic Drums",
    "Percussion",
    "Tabla",
    "Djembe",
    "Taiko Drums",
    "Recorder",
    "Mandocello",
    "Banjo",
    "Sitar",
    "Koto",
    "Accordion",
    "Oboe",
    "Bassoon",
    "Timpani",
    "Kalimba",
    "Didgeridoo",
    "Whistle",
    "Bell Synth",
    "Electric Violin",
    "Pan Flute",
    "Pipe Flute",
];

/// Number of prompts the conductor keeps audible for an evolution setting.
pub fn active_limit(evolution: f32, available: usize) -> usize {
    let extra = ((evolution + 10.0) * 9.0 / 20.0).floor().max(0.0) as usize;
    (3 + extra).min(available)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConductorPhase {
    #[default]
    Inactive,
    /// Enabled mid-session; counting down before taking control.
    Engaging,
    Active,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StageChange {
    pub name: String,
    pub is_ai: bool,
}

/// What one conductor step did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConductorOutput {
    pub stage_changed: Option<StageChange>,
    pub prompts_changed: bool,
    pub instruments_changed: bool,
    pub vocal_cue: Option<char>,
}

pub struct Conductor {
    phase: ConductorPhase,
    plan: Vec<PerformancePlanStage>,
    cursor: usize,
    source: PlanSource,
    planner_available: bool,
    /// Prompts currently in motion; at most two at a time.
    active_hands: Vec<PromptId>,
    /// Field id -> time of the last manual edit.
    touched: HashMap<String, Duration>,
    rng: StdRng,
}

impl Conductor {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            phase: ConductorPhase::Inactive,
            plan: Vec::new(),
            cursor: 0,
            source: PlanSource::Fallback,
            planner_available: true,
            active_hands: Vec::new(),
            touched: HashMap::new(),
            rng,
        }
    }

    pub fn phase(&self) -> ConductorPhase {
        self.phase
    }

    pub fn is_enabled(&self) -> bool {
        self.phase != ConductorPhase::Inactive
    }

    pub fn is_active(&self) -> bool {
        self.phase == ConductorPhase::Active
    }

    pub fn activate(&mut self) {
        self.phase = ConductorPhase::Active;
    }

    pub fn begin_engaging(&mut self) {
        self.phase = ConductorPhase::Engaging;
    }

    /// Hand control back to the user. Values already applied stay.
    pub fn deactivate(&mut self) {
        self.phase = ConductorPhase::Inactive;
        self.active_hands.clear();
    }

    pub fn planner_available(&self) -> bool {
        self.planner_available
    }

    pub fn set_planner_available(&mut self, available: bool) {
        self.planner_available = available;
    }

    pub fn plan(&self) -> &[PerformancePlanStage] {
        &self.plan
    }

    pub fn plan_source(&self) -> PlanSource {
        self.source
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn current_stage(&self) -> Option<&PerformancePlanStage> {
        self.plan.get(self.cursor)
    }

    pub fn build_fallback_plan(&mut self, session: &SessionState) {
        self.plan = fallback_plan(session, &mut self.rng);
        self.source = PlanSource::Fallback;
        self.cursor = 0;
        log::debug!(target: "conductor", "fallback plan with {} stages", self.plan.len());
    }

    pub fn adopt_plan(&mut self, stages: Vec<PerformancePlanStage>) {
        log::info!(target: "conductor", "adopting planner plan with {} stages", stages.len());
        self.plan = stages;
        self.source = PlanSource::Planner;
        self.cursor = 0;
    }

    pub fn reset_cursor(&mut self) {
        self.cursor = 0;
    }

    pub fn clear_hands(&mut self) {
        self.active_hands.clear();
    }

    /// Remember a manual edit so the conductor leaves the field alone for a
    /// while. `field` is a prompt id or a channel key.
    pub fn note_interaction(&mut self, field: &str, now: Duration) {
        self.touched.insert(field.to_string(), now);
    }

    fn cooling_down(&self, field: &str, now: Duration, evolution: f32) -> bool {
        let cooldown = Duration::from_millis((10_000.0 - evolution * 500.0).max(0.0) as u64);
        self.touched
            .get(field)
            .map(|t| now.saturating_sub(*t) < cooldown)
            .unwrap_or(false)
    }

    /// One conductor step at `elapsed` seconds into the take.
    ///
    /// With `drive` unset only the stage cursor moves: during replay the
    /// recorded snapshots own every parameter.
    pub fn tick(
        &mut self,
        session: &mut SessionState,
        elapsed: f64,
        now: Duration,
        drive: bool,
    ) -> ConductorOutput {
        let mut out = ConductorOutput::default();

        let advance = self
            .plan
            .get(self.cursor + 1)
            .is_some_and(|next| elapsed >= next.stage_start_time_sec);
        if advance {
            self.cursor += 1;
            let name = self.plan[self.cursor].stage_name.clone();
            log::debug!(target: "conductor", "stage {}: {}", self.cursor, name);
            if drive && self.sync_instruments_with_stage(&name, session) {
                out.instruments_changed = true;
            }
            out.stage_changed = Some(StageChange {
                name,
                is_ai: self.source == PlanSource::Planner,
            });
        }

        if !drive {
            return out;
        }

        if session.generation_mode == GenerationMode::Vocalization
            && session.instruments.is_vocal_instrument_active()
            && self.rng.gen_bool(VOCAL_CUE_PROBABILITY)
        {
            out.vocal_cue = Some(VOWELS[self.rng.gen_range(0..VOWELS.len())]);
        }

        let (prompts, instruments) = self.interpolate(session, now);
        out.prompts_changed |= prompts;
        out.instruments_changed |= instruments;
        out
    }

    /// Bring instruments named in a stage title into the ensemble. Returns
    /// whether anything changed.
    fn sync_instruments_with_stage(&mut self, stage_name: &str, session: &mut SessionState) -> bool {
        let lower = stage_name.to_lowercase();
        let mentioned: Vec<&str> = KNOWN_INSTRUMENTS
            .iter()
            .copied()
            .filter(|inst| lower.contains(&inst.to_lowercase()))
            .collect();

        let mut modified = false;
        for (index, mention) in mentioned.into_iter().enumerate() {
            if let Some(role) = session.instruments.role_of(mention) {
                let ch = session.instruments.get_mut(role);
                if !ch.active || ch.weight < 0.5 {
                    ch.active = true;
                    ch.weight = ch.weight.max(1.0);
                    modified = true;
                }
                continue;
            }
            if session.channels_locked {
                continue;
            }
            let role = match index {
                0 => ChannelRole::Lead,
                1 => ChannelRole::Alto,
                _ => ChannelRole::Harmonic,
            };
            let ch = session.instruments.get_mut(role);
            if ch.visible {
                log::debug!(target: "conductor", "{} now plays {}", role, mention);
                ch.instrument = mention.to_string();
                ch.active = true;
                ch.weight = 1.0;
                modified = true;
            }
        }
        modified
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stage(name: &str, start: f64) -> PerformancePlanStage {
        PerformancePlanStage::new(name, start)
    }

    #[test]
    fn active_limit_follows_evolution() {
        assert_eq!(active_limit(-10.0, 18), 3);
        assert_eq!(active_limit(0.0, 18), 7);
        assert_eq!(active_limit(10.0, 18), 12);
        assert_eq!(active_limit(10.0, 5), 5);
    }

    #[test]
    fn stage_advances_once_reached() {
        let mut c = Conductor::new(Some(1));
        let mut s = SessionState::new();
        c.adopt_plan(vec![stage("Intro", 0.0), stage("Groove", 15.0), stage("Outro", 30.0)]);
        c.activate();

        let out = c.tick(&mut s, 14.9, Duration::ZERO, true);
        assert!(out.stage_changed.is_none());
        let out = c.tick(&mut s, 15.0, Duration::ZERO, true);
        assert_eq!(
            out.stage_changed,
            Some(StageChange { name: "Groove".into(), is_ai: true })
        );
        assert_eq!(c.cursor(), 1);
        // one step per tick even when far behind
        let out = c.tick(&mut s, 100.0, Duration::ZERO, true);
        assert_eq!(out.stage_changed.unwrap().name, "Outro");
        assert!(c.tick(&mut s, 200.0, Duration::ZERO, true).stage_changed.is_none());
    }

    #[test]
    fn bookkeeping_tick_touches_nothing() {
        let mut c = Conductor::new(Some(1));
        let mut s = SessionState::new();
        let mut st = stage("Cello Solo", 10.0);
        st.targets.push(tessitura_types::ParameterTarget::new("Groove", 2.0));
        c.adopt_plan(vec![stage("Intro", 0.0), st]);
        let before = s.clone();
        let out = c.tick(&mut s, 12.0, Duration::ZERO, false);
        assert!(out.stage_changed.is_some());
        assert!(!out.prompts_changed && !out.instruments_changed);
        assert_eq!(s.instruments, before.instruments);
        assert_eq!(s.prompts, before.prompts);
    }

    #[test]
    fn stage_names_promote_instruments() {
        let mut c = Conductor::new(Some(1));
        let mut s = SessionState::new();
        assert!(c.sync_instruments_with_stage("Cello & Tabla Duet", &mut s));
        // KNOWN_INSTRUMENTS order decides the slot: Cello before Tabla
        assert_eq!(s.instruments.lead.instrument, "Cello");
        assert_eq!(s.instruments.alto.instrument, "Tabla");
    }

    #[test]
    fn locked_channels_only_reactivate() {
        let mut c = Conductor::new(Some(1));
        let mut s = SessionState::new();
        s.channels_locked = true;
        s.instruments.harmonic.active = false;
        assert!(c.sync_instruments_with_stage("Strings & Cello", &mut s));
        assert_eq!(s.instruments.lead.instrument, "Piano");
        assert!(s.instruments.harmonic.active);
        assert_eq!(s.instruments.harmonic.weight, 1.0);
        assert!(!c.sync_instruments_with_stage("Full Mix Section", &mut s));
    }

    #[test]
    fn hidden_target_channel_is_not_reassigned() {
        let mut c = Conductor::new(Some(1));
        let mut s = SessionState::new();
        s.instruments.lead.visible = false;
        assert!(!c.sync_instruments_with_stage("Sitar Solo", &mut s));
        assert_eq!(s.instruments.lead.instrument, "Piano");
    }

    #[test]
    fn vocal_cues_only_with_a_voice_in_vocal_mode() {
        let mut c = Conductor::new(Some(7));
        c.adopt_plan(vec![stage("Intro", 0.0)]);
        let mut s = SessionState::new();
        s.generation_mode = GenerationMode::Vocalization;
        let cues = (0..2_000)
            .filter_map(|_| c.tick(&mut s, 1.0, Duration::ZERO, true).vocal_cue)
            .count();
        assert_eq!(cues, 0);

        s.instruments.lead.instrument = "Gospel Vocals".into();
        let cues: Vec<char> = (0..2_000)
            .filter_map(|_| c.tick(&mut s, 1.0, Duration::ZERO, true).vocal_cue)
            .collect();
        // ~100 expected at 5 %
        assert!(cues.len() > 40 && cues.len() < 200, "{} cues", cues.len());
        assert!(cues.iter().all(|v| VOWELS.contains(v)));
    }
}
