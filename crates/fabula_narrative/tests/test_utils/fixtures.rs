//! Story fixtures shared by pipeline tests.

use fabula_narrative::{FabulaConfig, PipelineSettingsBuilder, RetrySettingsBuilder};

pub const LIGHTHOUSE_SEED: &str = "Mara has kept the Skerry Light for thirty years. \
She talks to the lamp as if it were her sister. \
The supply boat has not come since the autumn storms.";

/// A well-formed analysis reply, wrapped in prose and a fence.
pub fn analysis_json() -> String {
    r#"Here is the analysis you asked for.
```json
{
  "style": {"tone": "melancholic", "pacing": "slow", "narrative_style": "lyrical"},
  "characters": {
    "Mara": {"role": "keeper", "traits": ["stubborn", "lonely"], "arc": "learns to leave"}
  },
  "world": {"setting": "a lighthouse on a northern skerry", "rules": ["the lamp must never go dark"], "atmosphere": "fog and salt"},
  "themes": ["isolation", "duty"]
}
```"#
        .to_string()
}

pub fn extraction_json() -> String {
    r#"{
  "Mara": {
    "name": "Mara",
    "aliases": ["the keeper"],
    "role": "protagonist",
    "occupation": "lighthouse keeper",
    "personality_traits": ["stubborn"],
    "friends": ["Ilse"],
    "family": [{"relation_type": "sister", "name": "Ada"}]
  },
  "Ilse": {"role": "ferrywoman", "friends": ["Mara"]}
}"#
    .to_string()
}

/// A style review reply for a scene with the given tone.
pub fn review_json(tone: &str) -> String {
    format!(
        r#"{{"tone": "{}", "narrative_voice": "close third", "character_consistency": "steady",
  "pacing": "measured", "strengths": ["imagery"], "suggestions": ["vary sentence length"]}}"#,
        tone
    )
}

/// Distinct, sentence-terminated prose for beat `n`.
pub fn scene_text(n: usize) -> String {
    format!("Scene {} begins here. It ends in the fog.", n)
}

/// Default configuration with zero backoff and the given chapter length.
pub fn fast_config(beats_per_chapter: usize) -> FabulaConfig {
    FabulaConfig::default()
        .with_pipeline(
            PipelineSettingsBuilder::default()
                .beats_per_chapter(beats_per_chapter)
                .build()
                .unwrap(),
        )
        .with_retry(
            RetrySettingsBuilder::default()
                .initial_backoff_ms(0u64)
                .max_backoff_ms(0u64)
                .build()
                .unwrap(),
        )
}
