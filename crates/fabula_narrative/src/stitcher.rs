//! Chapter assembly and context advancement.

use crate::ContextWindow;
use fabula_core::{Beat, Chapter, GeneratedScene, Language};
use fabula_error::{StoryError, StoryErrorKind};
use tracing::{debug, info};

/// When chapters open and close.
///
/// Explicit markers in the beat sheet always open a chapter. A positive
/// `beats_per_chapter` also closes a chapter once it holds that many scenes;
/// zero leaves chapter boundaries to markers alone.
#[derive(Debug, Clone, PartialEq, Eq, derive_getters::Getters)]
pub struct ChapterPolicy {
    beats_per_chapter: usize,
    separator: String,
}

impl ChapterPolicy {
    /// Create a policy.
    pub fn new(beats_per_chapter: usize, separator: impl Into<String>) -> Self {
        Self {
            beats_per_chapter,
            separator: separator.into(),
        }
    }
}

impl Default for ChapterPolicy {
    fn default() -> Self {
        Self::new(5, "---")
    }
}

#[derive(Debug)]
struct OpenChapter {
    title: Option<String>,
    beat_indices: Vec<usize>,
    text: String,
}

/// Consumes scenes in beat order, producing chapters.
///
/// Every accepted scene advances the context window before the next beat is
/// expanded. Chapter boundaries never reset the window.
///
/// # Examples
///
/// ```
/// use fabula_core::{BeatSheet, GeneratedScene, Language};
/// use fabula_narrative::{ChapterPolicy, ContextWindow, NarrativeStitcher};
///
/// let beats = BeatSheet::from_entries(["# Landfall", "They row ashore", "They climb"]).unwrap();
/// let mut stitcher = NarrativeStitcher::new(
///     ContextWindow::new(4000),
///     ChapterPolicy::new(0, "---"),
///     Language::En,
/// );
///
/// for beat in &beats {
///     let scene = GeneratedScene::new(*beat.index(), Language::En, format!("Scene {}.", beat.index()));
///     assert!(stitcher.accept(&scene, beat).unwrap().is_empty());
/// }
/// assert_eq!(stitcher.context().current(), "Scene 1.\n\nScene 2.");
///
/// let chapter = stitcher.finish().unwrap();
/// assert_eq!(chapter.heading(), "Chapter 1: Landfall");
/// assert_eq!(chapter.text(), "Scene 1.\n\n---\n\nScene 2.");
/// ```
#[derive(Debug)]
pub struct NarrativeStitcher {
    window: ContextWindow,
    policy: ChapterPolicy,
    language: Language,
    next_beat: usize,
    next_chapter: usize,
    open: Option<OpenChapter>,
}

impl NarrativeStitcher {
    /// Create a stitcher expecting beat 1 and numbering from chapter 1.
    pub fn new(window: ContextWindow, policy: ChapterPolicy, language: Language) -> Self {
        Self::resuming(window, policy, language, 1, 1)
    }

    /// Create a stitcher that continues an earlier run.
    pub fn resuming(
        window: ContextWindow,
        policy: ChapterPolicy,
        language: Language,
        next_beat: usize,
        next_chapter: usize,
    ) -> Self {
        Self {
            window,
            policy,
            language,
            next_beat,
            next_chapter,
            open: None,
        }
    }

    /// The context window as it stands.
    pub fn context(&self) -> &ContextWindow {
        &self.window
    }

    /// Index of the beat whose scene must arrive next.
    pub fn next_beat(&self) -> usize {
        self.next_beat
    }

    /// Accept the scene for `beat`.
    ///
    /// Returns the chapters this scene closed: the previous chapter when the
    /// beat carries a marker, and the current one when it reaches the fixed
    /// count.
    ///
    /// # Errors
    ///
    /// Returns `SceneOutOfOrder` if the scene is not for the next expected
    /// beat. Nothing is changed in that case.
    pub fn accept(&mut self, scene: &GeneratedScene, beat: &Beat) -> Result<Vec<Chapter>, StoryError> {
        let found = *scene.beat_index();
        if found != self.next_beat || *beat.index() != found {
            return Err(StoryError::new(StoryErrorKind::SceneOutOfOrder {
                expected: self.next_beat,
                found,
            }));
        }

        let mut closed = Vec::new();
        if *beat.opens_chapter() {
            closed.extend(self.close());
        }

        let open = self.open.get_or_insert_with(|| OpenChapter {
            title: beat.chapter_title().clone(),
            beat_indices: Vec::new(),
            text: String::new(),
        });
        if !open.text.is_empty() {
            open.text.push_str("\n\n");
            if !self.policy.separator.is_empty() {
                open.text.push_str(&self.policy.separator);
                open.text.push_str("\n\n");
            }
        }
        open.text.push_str(scene.text().trim());
        open.beat_indices.push(found);
        let filled = open.beat_indices.len();

        self.window.advance(scene.text());
        self.next_beat += 1;
        debug!(
            beat_index = found,
            context_chars = self.window.current().chars().count(),
            "Scene stitched"
        );

        if self.policy.beats_per_chapter > 0 && filled >= self.policy.beats_per_chapter {
            closed.extend(self.close());
        }
        Ok(closed)
    }

    /// Close the open chapter, if it holds any scene.
    pub fn finish(&mut self) -> Option<Chapter> {
        self.close()
    }

    fn close(&mut self) -> Option<Chapter> {
        let open = self.open.take()?;
        let chapter = Chapter::new(
            self.next_chapter,
            open.title,
            self.language,
            open.beat_indices,
            open.text,
        );
        self.next_chapter += 1;
        info!(
            chapter = chapter.number(),
            beats = chapter.beat_indices().len(),
            "Chapter closed"
        );
        Some(chapter)
    }
}

/// Stitch a complete, ordered set of scenes into chapters.
///
/// # Errors
///
/// Returns `SceneOutOfOrder` on the first scene that is out of sequence, or
/// if scenes and beats do not pair up.
pub fn stitch(
    scenes: &[GeneratedScene],
    beats: &[Beat],
    window: ContextWindow,
    policy: ChapterPolicy,
    language: Language,
) -> Result<Vec<Chapter>, StoryError> {
    let mut stitcher = NarrativeStitcher::new(window, policy, language);
    let mut chapters = Vec::new();
    for (i, scene) in scenes.iter().enumerate() {
        let beat = beats.get(i).ok_or_else(|| {
            StoryError::new(StoryErrorKind::SceneOutOfOrder {
                expected: stitcher.next_beat(),
                found: *scene.beat_index(),
            })
        })?;
        chapters.extend(stitcher.accept(scene, beat)?);
    }
    chapters.extend(stitcher.finish());
    Ok(chapters)
}
