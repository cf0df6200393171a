//! Beats and the validated beat sheet.

use fabula_error::{StoryError, StoryErrorKind};
use serde::{Deserialize, Serialize};

/// One short author-written outline step.
///
/// Indices are 1-based and contiguous across the sheet; chapter markers do
/// not consume an index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_getters::Getters)]
pub struct Beat {
    index: usize,
    text: String,
    chapter_title: Option<String>,
    opens_chapter: bool,
}

impl Beat {
    /// Create a beat that does not open a chapter.
    pub fn new(index: usize, text: impl Into<String>) -> Self {
        Self {
            index,
            text: text.into(),
            chapter_title: None,
            opens_chapter: false,
        }
    }
}

/// The ordered, validated list of beats for a run.
///
/// Entries whose trimmed text starts with `#` are chapter markers: the next
/// beat opens a new chapter titled with the marker's remaining text. Blank
/// entries are ignored. A marker with no beat after it is rejected.
///
/// Deserializing goes through the same validation: a sheet is read and
/// written as its list of raw entries.
///
/// # Examples
///
/// ```
/// use fabula_core::BeatSheet;
///
/// let sheet = BeatSheet::from_entries([
///     "# The Storm",
///     "The keeper lights the lamp.",
///     "A ship appears on the rocks.",
/// ])
/// .unwrap();
///
/// assert_eq!(sheet.len(), 2);
/// let first = &sheet.beats()[0];
/// assert_eq!(*first.index(), 1);
/// assert!(*first.opens_chapter());
/// assert_eq!(first.chapter_title().as_deref(), Some("The Storm"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_getters::Getters)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct BeatSheet {
    beats: Vec<Beat>,
}

impl BeatSheet {
    /// Validate raw beat entries.
    ///
    /// # Errors
    ///
    /// Returns a `Configuration` error when no expandable beat remains or
    /// the last entry is a chapter marker with nothing to open.
    #[track_caller]
    pub fn from_entries<I, S>(entries: I) -> Result<Self, StoryError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut beats = Vec::new();
        let mut pending_marker: Option<Option<String>> = None;
        let mut last_marker = String::new();

        for entry in entries {
            let text = entry.as_ref().trim();
            if text.is_empty() {
                continue;
            }
            if let Some(title) = text.strip_prefix('#') {
                let title = title.trim_start_matches('#').trim();
                pending_marker = Some((!title.is_empty()).then(|| title.to_string()));
                last_marker = text.to_string();
                continue;
            }

            let mut beat = Beat::new(beats.len() + 1, text);
            if let Some(title) = pending_marker.take() {
                beat.opens_chapter = true;
                beat.chapter_title = title;
            }
            beats.push(beat);
        }

        if beats.is_empty() {
            return Err(StoryError::new(StoryErrorKind::Configuration(
                "beat sheet contains no beats".to_string(),
            )));
        }
        if pending_marker.is_some() {
            return Err(StoryError::new(StoryErrorKind::Configuration(format!(
                "chapter marker '{}' is not followed by a beat",
                last_marker
            ))));
        }

        Ok(Self { beats })
    }

    /// The raw entries this sheet was built from, with markers normalized
    /// to `# Title` (or `#` when untitled).
    pub fn entries(&self) -> Vec<String> {
        let mut entries = Vec::with_capacity(self.beats.len());
        for beat in &self.beats {
            if beat.opens_chapter {
                entries.push(match &beat.chapter_title {
                    Some(title) => format!("# {}", title),
                    None => "#".to_string(),
                });
            }
            entries.push(beat.text.clone());
        }
        entries
    }

    /// Number of expandable beats.
    pub fn len(&self) -> usize {
        self.beats.len()
    }

    /// Always false for a validated sheet.
    pub fn is_empty(&self) -> bool {
        self.beats.is_empty()
    }

    /// Beat by 1-based index.
    pub fn get(&self, index: usize) -> Option<&Beat> {
        index.checked_sub(1).and_then(|i| self.beats.get(i))
    }

    /// Iterate beats in order.
    pub fn iter(&self) -> std::slice::Iter<'_, Beat> {
        self.beats.iter()
    }

    /// Whether any beat was preceded by an explicit chapter marker.
    pub fn has_markers(&self) -> bool {
        self.beats.iter().any(|b| b.opens_chapter)
    }
}

impl TryFrom<Vec<String>> for BeatSheet {
    type Error = StoryError;

    fn try_from(entries: Vec<String>) -> Result<Self, Self::Error> {
        Self::from_entries(entries)
    }
}

impl From<BeatSheet> for Vec<String> {
    fn from(sheet: BeatSheet) -> Self {
        sheet.entries()
    }
}

impl<'a> IntoIterator for &'a BeatSheet {
    type Item = &'a Beat;
    type IntoIter = std::slice::Iter<'a, Beat>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_sheet_is_configuration_error() {
        let err = BeatSheet::from_entries(Vec::<String>::new()).unwrap_err();
        assert!(matches!(err.kind, StoryErrorKind::Configuration(_)));

        let err = BeatSheet::from_entries(["   ", "# Only a marker"]).unwrap_err();
        assert!(matches!(err.kind, StoryErrorKind::Configuration(_)));
    }

    #[test]
    fn markers_do_not_consume_indices() {
        let sheet = BeatSheet::from_entries(["one", "## Part Two", "two", "three"]).unwrap();
        let indices: Vec<usize> = sheet.iter().map(|b| *b.index()).collect();
        assert_eq!(indices, vec![1, 2, 3]);
        assert!(!*sheet.get(1).unwrap().opens_chapter());
        assert_eq!(sheet.get(2).unwrap().chapter_title().as_deref(), Some("Part Two"));
        assert!(sheet.get(4).is_none());
        assert!(sheet.get(0).is_none());
    }

    #[test]
    fn trailing_marker_is_rejected() {
        let err = BeatSheet::from_entries(["one", "two", "# Epilogue"]).unwrap_err();
        match err.kind {
            StoryErrorKind::Configuration(msg) => assert!(msg.contains("# Epilogue"), "{}", msg),
            other => panic!("unexpected error: {other:?}"),
        }
        // Blank entries after a marker do not count as a beat.
        assert!(BeatSheet::from_entries(["one", "#", "  "]).is_err());
    }

    #[test]
    fn deserializing_validates_entries() {
        let sheet: BeatSheet =
            serde_json::from_str(r##"["# Landfall", "She rows ashore", "She climbs"]"##).unwrap();
        assert_eq!(sheet.len(), 2);
        assert_eq!(sheet.get(1).unwrap().chapter_title().as_deref(), Some("Landfall"));

        assert!(serde_json::from_str::<BeatSheet>(r#"[]"#).is_err());
        assert!(serde_json::from_str::<BeatSheet>(r##"["a", "# Dangling"]"##).is_err());
        assert!(serde_json::from_str::<BeatSheet>(r#"{"beats": []}"#).is_err());

        let json = serde_json::to_value(&sheet).unwrap();
        assert_eq!(json, serde_json::json!(["# Landfall", "She rows ashore", "She climbs"]));
    }

    #[test]
    fn untitled_marker_opens_chapter_without_title() {
        let sheet = BeatSheet::from_entries(["#", "alpha"]).unwrap();
        let beat = sheet.get(1).unwrap();
        assert!(*beat.opens_chapter());
        assert!(beat.chapter_title().is_none());
        assert!(sheet.has_markers());
    }
}
