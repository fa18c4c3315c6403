use serde::{Deserialize, Serialize};

/// Scale flavour appended to the key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ScaleMode {
    #[default]
    Natural,
    Minor,
}

/// Musical settings shared by the whole session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalSettings {
    pub genre: String,
    /// Empty until the user picks a style.
    pub style: String,
    /// "None" disables mood shaping.
    pub mood: String,
    pub key: String,
    pub scale_mode: ScaleMode,
    pub bpm: u32,
    pub meter: String,
    /// 0 means "let the service choose".
    pub seed: u32,
}

impl Default for GlobalSettings {
    fn default() -> Self {
        Self {
            genre: "Jazz".into(),
            style: "Acid Jazz".into(),
            mood: "None".into(),
            key: "C Major".into(),
            scale_mode: ScaleMode::Natural,
            bpm: 120,
            meter: "4/4".into(),
            seed: 0,
        }
    }
}

impl GlobalSettings {
    pub fn has_mood(&self) -> bool {
        !self.mood.is_empty() && self.mood != "None"
    }

    /// Check the fields every session needs. Genre/style pairing is checked
    /// separately against a style catalog.
    pub fn validate(&self) -> Result<(), String> {
        if self.genre.trim().is_empty() {
            return Err("genre selection required".into());
        }
        if self.style.trim().is_empty() {
            return Err("style selection required".into());
        }
        if self.key.trim().is_empty() {
            return Err("key selection required".into());
        }
        if self.meter.trim().is_empty() {
            return Err("meter selection required".into());
        }
        if self.bpm == 0 {
            return Err("bpm must be positive".into());
        }
        Ok(())
    }
}

/// Partial update of [`GlobalSettings`]; `None` fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GlobalSettingsUpdate {
    pub genre: Option<String>,
    pub style: Option<String>,
    pub mood: Option<String>,
    pub key: Option<String>,
    pub scale_mode: Option<ScaleMode>,
    pub bpm: Option<u32>,
    pub meter: Option<String>,
}

impl GlobalSettingsUpdate {
    /// Apply to settings, returning whether anything changed.
    pub fn apply_to(&self, settings: &mut GlobalSettings) -> bool {
        let before = settings.clone();
        if let Some(v) = &self.genre {
            settings.genre = v.clone();
        }
        if let Some(v) = &self.style {
            settings.style = v.clone();
        }
        if let Some(v) = &self.mood {
            settings.mood = v.clone();
        }
        if let Some(v) = &self.key {
            settings.key = v.clone();
        }
        if let Some(v) = self.scale_mode {
            settings.scale_mode = v;
        }
        if let Some(v) = self.bpm {
            settings.bpm = v;
        }
        if let Some(v) = &self.meter {
            settings.meter = v.clone();
        }
        *settings != before
    }
}

/// Length, fades and level of a take.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransportSettings {
    pub max_duration_minutes: u32,
    pub fade_in_secs: f64,
    pub fade_out_secs: f64,
    /// User volume, 0.0 ..= 1.0.
    pub volume: f32,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            max_duration_minutes: 3,
            fade_in_secs: 5.0,
            fade_out_secs: 10.0,
            volume: 0.8,
        }
    }
}

impl TransportSettings {
    pub fn total_secs(&self) -> f64 {
        f64::from(self.max_duration_minutes) * 60.0
    }
}
