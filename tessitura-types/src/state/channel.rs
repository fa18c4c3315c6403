use serde::{Deserialize, Serialize};

use super::prompt::{ACTIVE_THRESHOLD, MAX_WEIGHT};

/// The five instrument roles of an ensemble.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelRole {
    Lead,
    Alto,
    Harmonic,
    Bass,
    Rhythm,
}

impl ChannelRole {
    pub const ALL: [ChannelRole; 5] = [
        ChannelRole::Lead,
        ChannelRole::Alto,
        ChannelRole::Harmonic,
        ChannelRole::Bass,
        ChannelRole::Rhythm,
    ];

    /// Lowercase key, also used as the cooldown field id for manual edits.
    pub fn key(self) -> &'static str {
        match self {
            ChannelRole::Lead => "lead",
            ChannelRole::Alto => "alto",
            ChannelRole::Harmonic => "harmonic",
            ChannelRole::Bass => "bass",
            ChannelRole::Rhythm => "rhythm",
        }
    }

    /// Capitalized label as it appears in prompt text.
    pub fn label(self) -> &'static str {
        match self {
            ChannelRole::Lead => "Lead",
            ChannelRole::Alto => "Alto",
            ChannelRole::Harmonic => "Harmonic",
            ChannelRole::Bass => "Bass",
            ChannelRole::Rhythm => "Rhythm",
        }
    }
}

impl std::fmt::Display for ChannelRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// One value per channel role.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelMap<T> {
    pub lead: T,
    pub alto: T,
    pub harmonic: T,
    pub bass: T,
    pub rhythm: T,
}

impl<T> ChannelMap<T> {
    pub fn from_fn(mut f: impl FnMut(ChannelRole) -> T) -> Self {
        Self {
            lead: f(ChannelRole::Lead),
            alto: f(ChannelRole::Alto),
            harmonic: f(ChannelRole::Harmonic),
            bass: f(ChannelRole::Bass),
            rhythm: f(ChannelRole::Rhythm),
        }
    }

    pub fn get(&self, role: ChannelRole) -> &T {
        match role {
            ChannelRole::Lead => &self.lead,
            ChannelRole::Alto => &self.alto,
            ChannelRole::Harmonic => &self.harmonic,
            ChannelRole::Bass => &self.bass,
            ChannelRole::Rhythm => &self.rhythm,
        }
    }

    pub fn get_mut(&mut self, role: ChannelRole) -> &mut T {
        match role {
            ChannelRole::Lead => &mut self.lead,
            ChannelRole::Alto => &mut self.alto,
            ChannelRole::Harmonic => &mut self.harmonic,
            ChannelRole::Bass => &mut self.bass,
            ChannelRole::Rhythm => &mut self.rhythm,
        }
    }

    /// Iterate in role order (lead, alto, harmonic, bass, rhythm).
    pub fn iter(&self) -> impl Iterator<Item = (ChannelRole, &T)> {
        ChannelRole::ALL.into_iter().map(move |r| (r, self.get(r)))
    }

    pub fn map<U>(&self, mut f: impl FnMut(&T) -> U) -> ChannelMap<U> {
        ChannelMap::from_fn(|r| f(self.get(r)))
    }
}

/// Instrument names treated as vocal regardless of the generic keyword check.
pub const VOCAL_STRINGS: [&str; 19] = [
    "Soprano Voice",
    "Coral Voices",
    "Coral Bass",
    "Solo Voice",
    "Vocal Chops",
    "Male Monastic Choir",
    "Powerhouse Soloist",
    "Bright Female Vocals",
    "Processed Vocals",
    "Children's Choir",
    "Gospel Vocals",
    "Distant Female Voice",
    "Backing Choir",
    "Soprano Choir",
    "Tenor/Alto Choir",
    "Bass Choir",
    "Deep Vocal Drone",
    "Alto Choir",
    "Choir",
];

/// Whether an instrument name denotes a voice.
pub fn is_vocal_instrument(name: &str) -> bool {
    let lower = name.to_lowercase();
    VOCAL_STRINGS
        .iter()
        .any(|v| lower.contains(&v.to_lowercase()))
        || ["voice", "choir", "vocals", "soprano"]
            .iter()
            .any(|k| lower.contains(k))
}

/// State of one ensemble channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelState {
    pub instrument: String,
    pub active: bool,
    /// 0.0 ..= 2.0
    pub weight: f32,
    /// Hidden channels are left out of the payload, the plan and the recording.
    pub visible: bool,
    /// Weight to restore when a muted channel is reactivated.
    #[serde(skip)]
    pub remembered_weight: Option<f32>,
}

impl ChannelState {
    pub fn new(instrument: impl Into<String>) -> Self {
        Self {
            instrument: instrument.into(),
            active: true,
            weight: 1.0,
            visible: true,
            remembered_weight: None,
        }
    }

    /// Mute or unmute. Muting remembers the weight and drops it to zero;
    /// unmuting restores the remembered weight (1.0 if there is none).
    pub fn set_active(&mut self, active: bool) {
        if active == self.active {
            return;
        }
        if active {
            self.weight = self.remembered_weight.take().unwrap_or(1.0);
        } else {
            if self.weight > ACTIVE_THRESHOLD {
                self.remembered_weight = Some(self.weight);
            }
            self.weight = 0.0;
        }
        self.active = active;
    }

    pub fn set_weight(&mut self, weight: f32) {
        self.weight = weight.clamp(0.0, MAX_WEIGHT);
    }

    /// Audible: active, visible and assigned an instrument.
    pub fn is_enabled(&self) -> bool {
        self.active && self.visible && !self.instrument.is_empty()
    }
}

/// The full ensemble.
pub type InstrumentSet = ChannelMap<ChannelState>;

impl Default for InstrumentSet {
    fn default() -> Self {
        Self {
            lead: ChannelState::new("Piano"),
            alto: ChannelState::new("Alto Saxophone"),
            harmonic: ChannelState::new("Strings"),
            bass: ChannelState::new("Bass Guitar"),
            rhythm: ChannelState::new("Drum Kit"),
        }
    }
}

impl InstrumentSet {
    /// Channels that are active, visible and assigned.
    pub fn enabled(&self) -> impl Iterator<Item = (ChannelRole, &ChannelState)> {
        self.iter().filter(|(_, c)| c.is_enabled())
    }

    pub fn enabled_count(&self) -> usize {
        self.enabled().count()
    }

    pub fn is_vocal_instrument_active(&self) -> bool {
        self.enabled().any(|(_, c)| is_vocal_instrument(&c.instrument))
    }

    /// Role currently playing the given instrument, if any.
    pub fn role_of(&self, instrument: &str) -> Option<ChannelRole> {
        self.iter()
            .find(|(_, c)| c.instrument == instrument)
            .map(|(r, _)| r)
    }
}
