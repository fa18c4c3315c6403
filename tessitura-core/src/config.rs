use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use tessitura_audio::SchedulerConfig;
use tessitura_types::{GlobalSettings, SessionState, TransportSettings};

const DEFAULT_CONFIG: &str = include_str!("../config.toml");

/// Warmup grows from its base length at one minute to base + span at the
/// longest take (55 minutes).
const WARMUP_SPAN_MINUTES: f64 = 54.0;

#[derive(Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    defaults: DefaultsConfig,
    #[serde(default)]
    timing: TimingConfig,
    #[serde(default)]
    audio: AudioConfig,
}

#[derive(Deserialize, Default)]
struct DefaultsConfig {
    genre: Option<String>,
    style: Option<String>,
    mood: Option<String>,
    key: Option<String>,
    bpm: Option<u32>,
    meter: Option<String>,
    max_duration_minutes: Option<u32>,
    fade_in_secs: Option<f64>,
    fade_out_secs: Option<f64>,
    volume: Option<f32>,
    evolution: Option<f32>,
}

#[derive(Deserialize, Default)]
struct TimingConfig {
    warmup_base_ms: Option<u64>,
    warmup_span_ms: Option<u64>,
    preparing_ms: Option<u64>,
    loop_wait_ms: Option<u64>,
    engaging_ms: Option<u64>,
    conductor_interval_ms: Option<u64>,
    prompt_refresh_ms: Option<u64>,
    vocal_signal_ms: Option<u64>,
    auto_loop_grace_secs: Option<u32>,
    auto_stop_margin_secs: Option<u64>,
}

#[derive(Deserialize, Default)]
struct AudioConfig {
    sample_rate: Option<u32>,
    channels: Option<u16>,
    buffering_latency_ms: Option<u64>,
    underrun_margin_ms: Option<u64>,
}

/// Every duration the lifecycle and the conductor run on.
#[derive(Debug, Clone, PartialEq)]
pub struct Timing {
    pub warmup_base: Duration,
    pub warmup_span: Duration,
    pub preparing: Duration,
    pub loop_wait: Duration,
    pub engaging: Duration,
    pub conductor_interval: Duration,
    pub prompt_refresh: Duration,
    pub vocal_signal: Duration,
    /// 0 disables the auto-loop countdown.
    pub auto_loop_grace_secs: u32,
    pub auto_stop_margin: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            warmup_base: Duration::from_millis(10_000),
            warmup_span: Duration::from_millis(20_000),
            preparing: Duration::from_millis(5_000),
            loop_wait: Duration::from_millis(5_000),
            engaging: Duration::from_millis(5_000),
            conductor_interval: Duration::from_millis(200),
            prompt_refresh: Duration::from_millis(200),
            vocal_signal: Duration::from_millis(2_000),
            auto_loop_grace_secs: 20,
            auto_stop_margin: Duration::from_secs(5),
        }
    }
}

impl Timing {
    /// Warmup length for a take of `minutes`, rounded to the millisecond.
    pub fn warmup_duration(&self, minutes: u32) -> Duration {
        let extra = f64::from(minutes.max(1) - 1) * self.warmup_span.as_millis() as f64
            / WARMUP_SPAN_MINUTES;
        let ms = (self.warmup_base.as_millis() as f64 + extra).round();
        Duration::from_millis(ms as u64)
    }

    /// Time after the start of recording at which it stops by itself.
    pub fn auto_stop_after(&self, minutes: u32) -> Duration {
        Duration::from_secs(u64::from(minutes) * 60) + self.auto_stop_margin
    }
}

/// Runtime settings handed to the orchestrator.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EngineSettings {
    pub timing: Timing,
    pub scheduler: SchedulerConfig,
    /// Fixed seed for the conductor's randomness; random when `None`.
    pub rng_seed: Option<u64>,
}

pub struct Config {
    defaults: DefaultsConfig,
    timing: TimingConfig,
    audio: AudioConfig,
}

impl Config {
    /// Embedded defaults merged with the user's config file, if any.
    pub fn load() -> Self {
        let mut config = Self::embedded();
        if let Some(path) = user_config_path() {
            if path.exists() {
                config.merge_file(&path);
            }
        }
        config
    }

    /// Embedded defaults merged with an explicit file.
    pub fn load_from(path: &Path) -> Self {
        let mut config = Self::embedded();
        config.merge_file(path);
        config
    }

    /// Embedded defaults merged with TOML text.
    pub fn from_toml_str(contents: &str) -> Result<Self, String> {
        let mut config = Self::embedded();
        let user: ConfigFile =
            toml::from_str(contents).map_err(|e| format!("invalid config: {}", e))?;
        config.merge(user);
        Ok(config)
    }

    fn embedded() -> Self {
        let base: ConfigFile =
            toml::from_str(DEFAULT_CONFIG).expect("Failed to parse embedded config.toml");
        Config {
            defaults: base.defaults,
            timing: base.timing,
            audio: base.audio,
        }
    }

    fn merge_file(&mut self, path: &Path) {
        match std::fs::read_to_string(path) {
            Ok(contents) => match toml::from_str::<ConfigFile>(&contents) {
                Ok(user) => self.merge(user),
                Err(e) => {
                    log::warn!(target: "config", "ignoring malformed config {}: {}", path.display(), e)
                }
            },
            Err(e) => {
                log::warn!(target: "config", "could not read config {}: {}", path.display(), e)
            }
        }
    }

    fn merge(&mut self, user: ConfigFile) {
        merge_defaults(&mut self.defaults, user.defaults);
        merge_timing(&mut self.timing, user.timing);
        merge_audio(&mut self.audio, user.audio);
    }

    /// Initial session state.
    pub fn session_defaults(&self) -> SessionState {
        let fallback = GlobalSettings::default();
        let transport = TransportSettings::default();
        let d = &self.defaults;
        let mut session = SessionState::new();
        session.settings = GlobalSettings {
            genre: d.genre.clone().unwrap_or(fallback.genre),
            style: d.style.clone().unwrap_or(fallback.style),
            mood: d.mood.clone().unwrap_or(fallback.mood),
            key: d.key.clone().unwrap_or(fallback.key),
            bpm: d.bpm.filter(|b| *b > 0).unwrap_or(fallback.bpm),
            meter: d.meter.clone().unwrap_or(fallback.meter),
            ..fallback
        };
        session.transport = TransportSettings {
            max_duration_minutes: d
                .max_duration_minutes
                .unwrap_or(transport.max_duration_minutes)
                .clamp(1, 55),
            fade_in_secs: d.fade_in_secs.unwrap_or(transport.fade_in_secs).max(0.0),
            fade_out_secs: d.fade_out_secs.unwrap_or(transport.fade_out_secs).max(0.0),
            volume: d.volume.unwrap_or(transport.volume).clamp(0.0, 1.0),
        };
        session.set_evolution(d.evolution.unwrap_or(0.0));
        session
    }

    pub fn timing(&self) -> Timing {
        let fallback = Timing::default();
        let t = &self.timing;
        let ms = |v: Option<u64>, f: Duration| v.map(Duration::from_millis).unwrap_or(f);
        Timing {
            warmup_base: ms(t.warmup_base_ms, fallback.warmup_base),
            warmup_span: ms(t.warmup_span_ms, fallback.warmup_span),
            preparing: ms(t.preparing_ms, fallback.preparing),
            loop_wait: ms(t.loop_wait_ms, fallback.loop_wait),
            engaging: ms(t.engaging_ms, fallback.engaging),
            conductor_interval: ms(t.conductor_interval_ms, fallback.conductor_interval)
                .max(Duration::from_millis(10)),
            prompt_refresh: ms(t.prompt_refresh_ms, fallback.prompt_refresh),
            vocal_signal: ms(t.vocal_signal_ms, fallback.vocal_signal),
            auto_loop_grace_secs: t
                .auto_loop_grace_secs
                .unwrap_or(fallback.auto_loop_grace_secs),
            auto_stop_margin: t
                .auto_stop_margin_secs
                .map(Duration::from_secs)
                .unwrap_or(fallback.auto_stop_margin),
        }
    }

    pub fn scheduler(&self) -> SchedulerConfig {
        let fallback = SchedulerConfig::default();
        let a = &self.audio;
        SchedulerConfig {
            sample_rate: a.sample_rate.filter(|r| *r > 0).unwrap_or(fallback.sample_rate),
            channels: a.channels.filter(|c| *c > 0).unwrap_or(fallback.channels),
            buffering_latency_secs: a
                .buffering_latency_ms
                .map(|v| v as f64 / 1000.0)
                .unwrap_or(fallback.buffering_latency_secs),
            underrun_margin_secs: a
                .underrun_margin_ms
                .map(|v| v as f64 / 1000.0)
                .unwrap_or(fallback.underrun_margin_secs),
        }
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            timing: self.timing(),
            scheduler: self.scheduler(),
            rng_seed: None,
        }
    }
}

fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("tessitura").join("config.toml"))
}

fn merge_defaults(base: &mut DefaultsConfig, user: DefaultsConfig) {
    if user.genre.is_some() {
        base.genre = user.genre;
    }
    if user.style.is_some() {
        base.style = user.style;
    }
    if user.mood.is_some() {
        base.mood = user.mood;
    }
    if user.key.is_some() {
        base.key = user.key;
    }
    if user.bpm.is_some() {
        base.bpm = user.bpm;
    }
    if user.meter.is_some() {
        base.meter = user.meter;
    }
    if user.max_duration_minutes.is_some() {
        base.max_duration_minutes = user.max_duration_minutes;
    }
    if user.fade_in_secs.is_some() {
        base.fade_in_secs = user.fade_in_secs;
    }
    if user.fade_out_secs.is_some() {
        base.fade_out_secs = user.fade_out_secs;
    }
    if user.volume.is_some() {
        base.volume = user.volume;
    }
    if user.evolution.is_some() {
        base.evolution = user.evolution;
    }
}

fn merge_timing(base: &mut TimingConfig, user: TimingConfig) {
    if user.warmup_base_ms.is_some() {
        base.warmup_base_ms = user.warmup_base_ms;
    }
    if user.warmup_span_ms.is_some() {
        base.warmup_span_ms = user.warmup_span_ms;
    }
    if user.preparing_ms.is_some() {
        base.preparing_ms = user.preparing_ms;
    }
    if user.loop_wait_ms.is_some() {
        base.loop_wait_ms = user.loop_wait_ms;
    }
    if user.engaging_ms.is_some() {
        base.engaging_ms = user.engaging_ms;
    }
    if user.conductor_interval_ms.is_some() {
        base.conductor_interval_ms = user.conductor_interval_ms;
    }
    if user.prompt_refresh_ms.is_some() {
        base.prompt_refresh_ms = user.prompt_refresh_ms;
    }
    if user.vocal_signal_ms.is_some() {
        base.vocal_signal_ms = user.vocal_signal_ms;
    }
    if user.auto_loop_grace_secs.is_some() {
        base.auto_loop_grace_secs = user.auto_loop_grace_secs;
    }
    if user.auto_stop_margin_secs.is_some() {
        base.auto_stop_margin_secs = user.auto_stop_margin_secs;
    }
}

fn merge_audio(base: &mut AudioConfig, user: AudioConfig) {
    if user.sample_rate.is_some() {
        base.sample_rate = user.sample_rate;
    }
    if user.channels.is_some() {
        base.channels = user.channels;
    }
    if user.buffering_latency_ms.is_some() {
        base.buffering_latency_ms = user.buffering_latency_ms;
    }
    if user.underrun_margin_ms.is_some() {
        base.underrun_margin_ms = user.underrun_margin_ms;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_config_matches_built_in_defaults() {
        let config = Config::embedded();
        assert_eq!(config.timing(), Timing::default());
        assert_eq!(config.scheduler(), SchedulerConfig::default());
        let session = config.session_defaults();
        assert_eq!(session.settings, GlobalSettings::default());
        assert_eq!(session.transport, TransportSettings::default());
    }

    #[test]
    fn user_values_override_field_by_field() {
        let config = Config::from_toml_str(
            "[defaults]\nbpm = 90\n[timing]\nloop_wait_ms = 1500\n[audio]\nsample_rate = 8000\n",
        )
        .unwrap();
        let session = config.session_defaults();
        assert_eq!(session.settings.bpm, 90);
        assert_eq!(session.settings.genre, "Jazz");
        assert_eq!(config.timing().loop_wait, Duration::from_millis(1_500));
        assert_eq!(config.timing().preparing, Duration::from_millis(5_000));
        assert_eq!(config.scheduler().sample_rate, 8_000);
        assert_eq!(config.scheduler().channels, 2);
    }

    #[test]
    fn malformed_text_is_an_error() {
        assert!(Config::from_toml_str("[defaults]\nbpm = \"fast\"").is_err());
    }

    #[test]
    fn malformed_file_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "not = [valid").unwrap();
        let config = Config::load_from(&path);
        assert_eq!(config.timing(), Timing::default());
    }

    #[test]
    fn warmup_scales_with_duration() {
        let timing = Timing::default();
        assert_eq!(timing.warmup_duration(1), Duration::from_millis(10_000));
        assert_eq!(timing.warmup_duration(3), Duration::from_millis(10_741));
        assert_eq!(timing.warmup_duration(55), Duration::from_millis(30_000));
    }

    #[test]
    fn auto_stop_has_margin() {
        assert_eq!(Timing::default().auto_stop_after(3), Duration::from_secs(185));
    }

    #[test]
    fn durations_are_clamped() {
        let config =
            Config::from_toml_str("[defaults]\nmax_duration_minutes = 500\nvolume = 3.0\n").unwrap();
        let session = config.session_defaults();
        assert_eq!(session.transport.max_duration_minutes, 55);
        assert_eq!(session.transport.volume, 1.0);
    }
}
