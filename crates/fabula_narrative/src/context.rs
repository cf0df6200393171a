//! Bounded window of recent prose handed to each beat expansion.

use tracing::trace;

/// Whether `c` ends a sentence.
fn is_terminator(c: char) -> bool {
    matches!(c, '.' | '!' | '?' | '…' | '。' | '！' | '？')
}

/// Closing punctuation that may follow a terminator inside the sentence.
fn is_closer(c: char) -> bool {
    matches!(
        c,
        '"' | '\'' | ')' | ']' | '”' | '’' | '»' | '」' | '』' | '）'
    )
}

/// Whether a terminator needs trailing whitespace to end a sentence.
fn is_wide(c: char) -> bool {
    matches!(c, '。' | '！' | '？')
}

/// Byte offsets where a new sentence starts, excluding offset zero and the
/// end of the text.
///
/// A sentence ends at a terminator followed by optional closing punctuation
/// and then whitespace. Full-width terminators end a sentence without
/// trailing whitespace.
fn sentence_starts(text: &str) -> Vec<usize> {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let mut starts = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let (_, c) = chars[i];
        if !is_terminator(c) {
            i += 1;
            continue;
        }

        let mut j = i + 1;
        while j < chars.len() && (is_terminator(chars[j].1) || is_closer(chars[j].1)) {
            j += 1;
        }

        let mut k = j;
        while k < chars.len() && chars[k].1.is_whitespace() {
            k += 1;
        }

        let boundary = k > j || is_wide(chars[j - 1].1) || is_wide(c);
        if boundary && k < chars.len() {
            starts.push(chars[k].0);
        }
        i = k.max(i + 1);
    }

    starts
}

/// Byte offsets of text following a blank line.
///
/// Scenes are joined with a blank line, so these also mark scene starts.
fn paragraph_starts(text: &str) -> Vec<usize> {
    let mut starts = Vec::new();
    let mut newlines = 0;
    for (at, c) in text.char_indices() {
        if c == '\n' {
            newlines += 1;
        } else if c.is_whitespace() {
            continue;
        } else {
            if newlines >= 2 && at > 0 {
                starts.push(at);
            }
            newlines = 0;
        }
    }
    starts
}

/// Every offset a trim may cut at: sentence and paragraph starts, ascending.
fn boundaries(text: &str) -> Vec<usize> {
    let mut all = sentence_starts(text);
    all.extend(paragraph_starts(text));
    all.sort_unstable();
    all.dedup();
    all
}

/// The most recent slice of generated prose, bounded by a character count.
///
/// Before any scene is appended the window may hold an excerpt of the seed;
/// the first [`advance`](Self::advance) replaces it, so afterwards the
/// window only ever contains generated scenes. Trimming drops whole
/// sentences, or whole paragraphs of prose without terminators, from the
/// oldest end. A single sentence longer than the capacity is kept whole,
/// but nothing older than it is.
///
/// # Examples
///
/// ```
/// use fabula_narrative::ContextWindow;
///
/// let mut window = ContextWindow::new(50);
/// window.advance("The lamp failed. The keeper climbed the long stairs.");
/// assert_eq!(window.current(), "The keeper climbed the long stairs.");
///
/// window.advance("Glass broke.");
/// assert_eq!(window.current(), "The keeper climbed the long stairs.\n\nGlass broke.");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextWindow {
    text: String,
    capacity: usize,
    holds_seed: bool,
}

impl ContextWindow {
    /// Create an empty window holding at most `capacity` characters.
    pub fn new(capacity: usize) -> Self {
        Self {
            text: String::new(),
            capacity,
            holds_seed: false,
        }
    }

    /// Create a window primed with the tail of the seed text.
    ///
    /// At most `excerpt_chars` characters (and never more than `capacity`)
    /// from the end of the seed are kept, cut on a sentence boundary where
    /// one fits. The seed is not generated prose, so an unbroken seed is cut
    /// mid-sentence rather than kept whole.
    pub fn seeded(capacity: usize, seed: &str, excerpt_chars: usize) -> Self {
        let excerpt = tail_excerpt(seed.trim(), excerpt_chars.min(capacity));
        Self {
            text: excerpt.to_string(),
            capacity,
            holds_seed: !excerpt.is_empty(),
        }
    }

    /// Text to hand to the next expansion.
    pub fn current(&self) -> &str {
        &self.text
    }

    /// Maximum characters retained.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Whether the window still holds only the seed excerpt.
    pub fn holds_seed(&self) -> bool {
        self.holds_seed
    }

    /// Append a scene, then trim from the oldest end.
    pub fn advance(&mut self, new_text: &str) {
        let new_text = new_text.trim();
        if self.holds_seed {
            self.text.clear();
            self.holds_seed = false;
        }
        if new_text.is_empty() {
            return;
        }
        if !self.text.is_empty() {
            self.text.push_str("\n\n");
        }
        self.text.push_str(new_text);

        let before = self.text.chars().count();
        let kept = trim_to(&self.text, self.capacity);
        if kept.len() != self.text.len() {
            self.text = kept.to_string();
            trace!(
                before,
                after = self.text.chars().count(),
                capacity = self.capacity,
                "Trimmed context window"
            );
        }
    }
}

/// The longest suffix of `text` starting at a boundary that fits in
/// `capacity` characters, or the text after the last boundary if none fits.
///
/// Text with no boundary at all is one sentence and is returned whole.
fn trim_to(text: &str, capacity: usize) -> &str {
    if text.chars().count() <= capacity {
        return text;
    }
    let starts = boundaries(text);
    let Some(&last) = starts.last() else {
        return text;
    };
    starts
        .iter()
        .find(|&&start| text[start..].chars().count() <= capacity)
        .map(|&start| &text[start..])
        .unwrap_or(&text[last..])
}

/// At most `limit` characters from the end of `text`.
///
/// Prefers a sentence or paragraph boundary, then a word boundary, and
/// falls back to a plain character cut for unbroken text.
fn tail_excerpt(text: &str, limit: usize) -> &str {
    if limit == 0 {
        return "";
    }
    let trimmed = trim_to(text, limit);
    let count = trimmed.chars().count();
    if count <= limit {
        return trimmed;
    }
    let cut = trimmed
        .char_indices()
        .nth(count - limit)
        .map(|(at, _)| at)
        .unwrap_or(0);
    let tail = &trimmed[cut..];
    match tail.find(char::is_whitespace) {
        Some(space) if !tail[space..].trim().is_empty() => tail[space..].trim_start(),
        _ => tail,
    }
}
