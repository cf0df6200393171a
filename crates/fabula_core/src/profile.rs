//! Story profile produced by analysis of the seed.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Tone and voice of the seed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_getters::Getters)]
pub struct StyleProfile {
    tone: String,
    pacing: String,
    narrative_style: String,
}

impl StyleProfile {
    /// Create a style profile.
    pub fn new(
        tone: impl Into<String>,
        pacing: impl Into<String>,
        narrative_style: impl Into<String>,
    ) -> Self {
        Self {
            tone: tone.into(),
            pacing: pacing.into(),
            narrative_style: narrative_style.into(),
        }
    }
}

/// Brief description of one character as seen by the analyzer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_getters::Getters)]
pub struct CharacterSketch {
    role: String,
    traits: Vec<String>,
    arc: String,
}

impl CharacterSketch {
    /// Create a character sketch.
    pub fn new(role: impl Into<String>, traits: Vec<String>, arc: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            traits,
            arc: arc.into(),
        }
    }
}

/// Setting, rules, and atmosphere of the story world.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_getters::Getters)]
pub struct WorldProfile {
    setting: String,
    rules: Vec<String>,
    atmosphere: String,
}

impl WorldProfile {
    /// Create a world profile.
    pub fn new(
        setting: impl Into<String>,
        rules: Vec<String>,
        atmosphere: impl Into<String>,
    ) -> Self {
        Self {
            setting: setting.into(),
            rules,
            atmosphere: atmosphere.into(),
        }
    }
}

/// Structured understanding of the seed, created once per run.
///
/// Every field is required when decoding; a response missing any of them is
/// rejected rather than filled with defaults.
///
/// # Examples
///
/// ```
/// use fabula_core::StoryProfile;
///
/// let json = r#"{
///     "style": {"tone": "melancholy", "pacing": "slow", "narrative_style": "lyrical"},
///     "characters": {"Mara": {"role": "keeper", "traits": ["stubborn"], "arc": "lets go"}},
///     "world": {"setting": "a lighthouse", "rules": [], "atmosphere": "foggy"},
///     "themes": ["solitude"]
/// }"#;
///
/// let profile: StoryProfile = serde_json::from_str(json).unwrap();
/// assert_eq!(profile.style().tone(), "melancholy");
/// assert!(profile.characters().contains_key("Mara"));
///
/// let missing_world = r#"{"style": {"tone": "", "pacing": "", "narrative_style": ""},
///     "characters": {}, "themes": []}"#;
/// assert!(serde_json::from_str::<StoryProfile>(missing_world).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_getters::Getters)]
pub struct StoryProfile {
    style: StyleProfile,
    characters: BTreeMap<String, CharacterSketch>,
    world: WorldProfile,
    themes: Vec<String>,
}

impl StoryProfile {
    /// Create a story profile.
    pub fn new(
        style: StyleProfile,
        characters: BTreeMap<String, CharacterSketch>,
        world: WorldProfile,
        themes: Vec<String>,
    ) -> Self {
        Self {
            style,
            characters,
            world,
            themes,
        }
    }
}
