//! Prompt templates with named placeholders.
//!
//! Templates use `{name}` placeholders where `name` is lowercase ASCII,
//! digits, or underscores. `{{` and `}}` render as literal braces; any other
//! brace is copied through untouched, so JSON examples inside a template need
//! no escaping. Rendering is strict: a placeholder with no value, or a value
//! the template never uses, is a `Template` error.

use fabula_error::{ConfigError, ConfigErrorKind, FabulaResult, StoryError, StoryErrorKind};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, instrument};

/// Placeholders the beat expansion template must use.
pub const BEAT_PLACEHOLDERS: &[&str] = &[
    "language",
    "context",
    "beat",
    "tone",
    "pacing",
    "narrative_style",
    "pov",
    "tense",
    "setting",
    "atmosphere",
    "themes",
    "characters",
];

const DEFAULT_ANALYSIS: &str = r#"Analyze the following story text and describe its core elements.

Return a JSON object with exactly these keys:
- "style": {"tone": string, "pacing": string, "narrative_style": string}
- "characters": an object mapping each character's name to {"role": string, "traits": [string], "arc": string}
- "world": {"setting": string, "rules": [string], "atmosphere": string}
- "themes": [string]

Story text:
{seed}"#;

const DEFAULT_BEAT_EXPANSION: &str = r#"Write the next scene of an ongoing story in {language}.

[STORY SO FAR]
{context}
[END STORY SO FAR]

[BEAT TO DRAMATIZE]
{beat}
[END BEAT]

[STYLE GUIDANCE]
- Tone: {tone}
- Pacing: {pacing}
- Narrative style: {narrative_style}
- Point of view: {pov}
- Tense: {tense}
- Setting: {setting}
- Atmosphere: {atmosphere}
- Themes: {themes}
- Characters: {characters}

Continue directly from the end of STORY SO FAR. Dramatize the beat as continuous prose in {language}. Do not restate the beat, summarize earlier events, or add headings or commentary."#;

const DEFAULT_CHARACTER_EXTRACTION: &str = r#"Analyze the following story text and extract a profile for every character mentioned.

Return a JSON object where each key is a character's canonical name and each value has these fields:
- "name": canonical name
- "aliases": other names or titles
- "role": narrative or mythic role
- "occupation": what they do
- "personality_traits": core emotional and behavioral traits
- "goals": personal motivations
- "fears": deepest anxieties
- "lovers", "friends", "enemies": names of related characters
- "family": list of {"relation_type": string, "name": string}
- "key_events": important scenes they appear in

Story text:
{seed}"#;

const DEFAULT_SCENE_REVIEW: &str = r#"Review the style of the following scene.

Consider tone and mood, narrative voice, character voice consistency, and pacing.

Return a JSON object with these keys:
- "tone": the overall tone of the scene
- "narrative_voice": a description of the narrative voice
- "character_consistency": how consistent the characters' voices are
- "pacing": an assessment of the pacing
- "strengths": [string]
- "suggestions": [string]

Scene:
{scene}"#;

const DEFAULT_REINFORCEMENT: &str = "IMPORTANT: your previous reply could not be parsed. Return valid JSON only: a single JSON object with no markdown fences, commentary, or trailing text.";

const DEFAULT_PROSE_SYSTEM: &str = "You are a creative writing assistant.";

const DEFAULT_ANALYSIS_SYSTEM: &str =
    "You are a story analysis assistant. Always respond with valid JSON.";

const DEFAULT_EXTRACTION_SYSTEM: &str = "You are a literary analyst specializing in character development. Always respond with valid JSON.";

const DEFAULT_REVIEW_SYSTEM: &str =
    "You are a literary editor reviewing prose style. Always respond with valid JSON.";

/// The instruction templates a run renders prompts from.
///
/// Construct once and pass to the analyzer, expander, and extractor. A TOML
/// override file may replace any subset of fields.
///
/// # Examples
///
/// ```
/// use fabula_narrative::PromptTemplates;
///
/// let templates = PromptTemplates::default();
/// let prompt = templates.analysis_prompt("A keeper finds a letter.").unwrap();
/// assert!(prompt.ends_with("A keeper finds a letter."));
///
/// let custom = PromptTemplates::from_toml_str(r#"analysis = "Summarize: {seed}""#).unwrap();
/// assert_eq!(custom.analysis_prompt("x").unwrap(), "Summarize: x");
///
/// assert!(PromptTemplates::from_toml_str(r#"analysis = "No seed here""#).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_getters::Getters)]
#[serde(default, deny_unknown_fields)]
pub struct PromptTemplates {
    analysis: String,
    beat_expansion: String,
    character_extraction: String,
    scene_review: String,
    reinforcement: String,
    prose_system: String,
    analysis_system: String,
    extraction_system: String,
    review_system: String,
}

impl Default for PromptTemplates {
    fn default() -> Self {
        Self {
            analysis: DEFAULT_ANALYSIS.to_string(),
            beat_expansion: DEFAULT_BEAT_EXPANSION.to_string(),
            character_extraction: DEFAULT_CHARACTER_EXTRACTION.to_string(),
            scene_review: DEFAULT_SCENE_REVIEW.to_string(),
            reinforcement: DEFAULT_REINFORCEMENT.to_string(),
            prose_system: DEFAULT_PROSE_SYSTEM.to_string(),
            analysis_system: DEFAULT_ANALYSIS_SYSTEM.to_string(),
            extraction_system: DEFAULT_EXTRACTION_SYSTEM.to_string(),
            review_system: DEFAULT_REVIEW_SYSTEM.to_string(),
        }
    }
}

impl PromptTemplates {
    /// Parse an override file's contents over the bundled templates.
    ///
    /// # Errors
    ///
    /// Returns a `Configuration` error for malformed TOML or unknown keys and
    /// a `Template` error when an overridden template has the wrong
    /// placeholders.
    pub fn from_toml_str(content: &str) -> Result<Self, StoryError> {
        let templates: PromptTemplates = toml::from_str(content).map_err(|e| {
            StoryError::new(StoryErrorKind::Configuration(format!(
                "invalid template override: {}",
                e
            )))
        })?;
        templates.validate()?;
        Ok(templates)
    }

    /// Load an override file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or fails validation.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> FabulaResult<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            ConfigError::new(ConfigErrorKind::Templates {
                path: path.as_ref().display().to_string(),
                reason: e.to_string(),
            })
        })?;
        let templates = Self::from_toml_str(&content)?;
        debug!("Loaded prompt template overrides");
        Ok(templates)
    }

    /// Check every template against the placeholders it will be given.
    ///
    /// # Errors
    ///
    /// Returns the first `Template` error found.
    pub fn validate(&self) -> Result<(), StoryError> {
        self.analysis_prompt("")?;
        self.extraction_prompt("")?;
        self.review_prompt("")?;
        let vars: Vec<(&str, &str)> = BEAT_PLACEHOLDERS.iter().map(|k| (*k, "")).collect();
        self.beat_prompt(&vars)?;
        for (name, fixed) in [
            ("reinforcement", &self.reinforcement),
            ("prose_system", &self.prose_system),
            ("analysis_system", &self.analysis_system),
            ("extraction_system", &self.extraction_system),
            ("review_system", &self.review_system),
        ] {
            render(name, fixed, &[])?;
        }
        Ok(())
    }

    /// Render the analysis prompt for a seed.
    pub fn analysis_prompt(&self, seed: &str) -> Result<String, StoryError> {
        render("analysis", &self.analysis, &[("seed", seed)])
    }

    /// Render the character extraction prompt for a seed.
    pub fn extraction_prompt(&self, seed: &str) -> Result<String, StoryError> {
        render(
            "character_extraction",
            &self.character_extraction,
            &[("seed", seed)],
        )
    }

    /// Render the style review prompt for one scene.
    pub fn review_prompt(&self, scene: &str) -> Result<String, StoryError> {
        render("scene_review", &self.scene_review, &[("scene", scene)])
    }

    /// Render the beat expansion prompt.
    ///
    /// The expander supplies every name in [`BEAT_PLACEHOLDERS`], so an
    /// override must use all of them.
    pub fn beat_prompt(&self, vars: &[(&str, &str)]) -> Result<String, StoryError> {
        render("beat_expansion", &self.beat_expansion, vars)
    }

    /// Append the structured-output reinforcement to a prompt.
    pub fn reinforce(&self, prompt: &str) -> String {
        format!("{}\n\n{}", prompt, self.reinforcement)
    }
}

/// Substitute `vars` into `template`.
///
/// # Errors
///
/// Returns a `Template` error naming every placeholder without a value and
/// every value without a placeholder.
///
/// # Examples
///
/// ```
/// use fabula_narrative::render;
///
/// let out = render("greeting", "Hello {name}! {{literal}} {\"json\": 1}", &[("name", "Mara")]).unwrap();
/// assert_eq!(out, "Hello Mara! {literal} {\"json\": 1}");
///
/// assert!(render("greeting", "Hello {name}", &[]).is_err());
/// assert!(render("greeting", "Hello", &[("name", "Mara")]).is_err());
/// ```
pub fn render(name: &str, template: &str, vars: &[(&str, &str)]) -> Result<String, StoryError> {
    let mut out = String::with_capacity(template.len());
    let mut used = vec![false; vars.len()];
    let mut unknown: Vec<&str> = Vec::new();
    let mut rest = template;

    while let Some(pos) = rest.find(['{', '}']) {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];

        if let Some(after) = tail.strip_prefix("{{") {
            out.push('{');
            rest = after;
            continue;
        }
        if let Some(after) = tail.strip_prefix("}}") {
            out.push('}');
            rest = after;
            continue;
        }
        if let Some((key, after)) = placeholder_at(tail) {
            match vars.iter().position(|(k, _)| *k == key) {
                Some(i) => {
                    used[i] = true;
                    out.push_str(vars[i].1);
                }
                None => {
                    if !unknown.contains(&key) {
                        unknown.push(key);
                    }
                }
            }
            rest = after;
            continue;
        }

        out.push_str(&tail[..1]);
        rest = &tail[1..];
    }
    out.push_str(rest);

    if !unknown.is_empty() {
        return Err(StoryError::new(StoryErrorKind::Template(format!(
            "template '{}' has no value for placeholder(s): {}",
            name,
            unknown.join(", ")
        ))));
    }

    let unused: Vec<&str> = vars
        .iter()
        .zip(&used)
        .filter(|(_, used)| !**used)
        .map(|((k, _), _)| *k)
        .collect();
    if !unused.is_empty() {
        return Err(StoryError::new(StoryErrorKind::Template(format!(
            "template '{}' is missing placeholder(s): {}",
            name,
            unused.join(", ")
        ))));
    }

    Ok(out)
}

/// Split `{name}` off the front of `text`, returning the name and the rest.
fn placeholder_at(text: &str) -> Option<(&str, &str)> {
    let inner = text.strip_prefix('{')?;
    let end = inner.find('}')?;
    let key = &inner[..end];
    is_placeholder(key).then(|| (key, &inner[end + 1..]))
}

fn is_placeholder(key: &str) -> bool {
    let mut chars = key.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_lowercase() || c == '_')
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}
