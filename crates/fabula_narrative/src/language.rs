//! Language and narrative voice detection for seed text.
//!
//! Detection is heuristic. Script distribution separates Chinese, Japanese,
//! and Korean from Latin-script text; function-word and diacritic counts then
//! pick among the Latin-script languages. Point of view and tense come from
//! pronoun and verb-marker counts and are advisory only.

use fabula_core::{Language, LanguageSelection, Pov, StyleHints, Tense};
use tracing::{debug, instrument};

/// Minimum function-word score before a Latin-script guess is trusted.
const MIN_WORD_SCORE: usize = 2;

/// Share of letters a script needs to count as dominant.
const DOMINANT_SHARE: f64 = 0.3;

/// Counts of letters by script.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct ScriptCounts {
    latin: usize,
    han: usize,
    kana: usize,
    hangul: usize,
}

impl ScriptCounts {
    fn of(text: &str) -> Self {
        let mut counts = Self::default();
        for c in text.chars() {
            match c as u32 {
                0xAC00..=0xD7AF | 0x1100..=0x11FF | 0x3130..=0x318F => counts.hangul += 1,
                0x3040..=0x30FF | 0x31F0..=0x31FF => counts.kana += 1,
                0x4E00..=0x9FFF | 0x3400..=0x4DBF => counts.han += 1,
                _ if c.is_alphabetic() => counts.latin += 1,
                _ => {}
            }
        }
        counts
    }

    fn total(&self) -> usize {
        self.latin + self.han + self.kana + self.hangul
    }
}

/// Function words per Latin-script language.
fn function_words(language: Language) -> &'static [&'static str] {
    match language {
        Language::En => &[
            "the", "and", "of", "to", "a", "in", "is", "was", "he", "she", "it", "that", "his",
            "her", "with", "for", "on", "at",
        ],
        Language::Es => &[
            "el", "los", "las", "que", "y", "un", "una", "es", "por", "con", "del", "se", "su",
            "pero", "muy", "como",
        ],
        Language::Fr => &[
            "le", "les", "des", "et", "une", "est", "dans", "il", "elle", "pas", "du", "au",
            "qui", "sur", "avec", "ce",
        ],
        Language::De => &[
            "der", "die", "das", "und", "ist", "nicht", "ein", "eine", "zu", "mit", "sich", "den",
            "dem", "auf", "ich", "auch",
        ],
        _ => &[],
    }
}

/// Diacritics that strongly suggest one Latin-script language.
fn diacritic_language(c: char) -> Option<Language> {
    match c {
        'ñ' | '¿' | '¡' => Some(Language::Es),
        'ç' | 'è' | 'ê' | 'à' | 'ù' | 'â' | 'î' | 'ô' | 'œ' => Some(Language::Fr),
        'ß' | 'ä' | 'ö' | 'ü' => Some(Language::De),
        _ => None,
    }
}

fn words(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphabetic() && c != '\'')
        .filter(|w| !w.is_empty())
        .map(|w| w.trim_matches('\'').to_lowercase())
}

/// Infer the dominant supported language of `text`.
///
/// Returns `None` when the evidence is indeterminate.
///
/// # Examples
///
/// ```
/// use fabula_core::Language;
/// use fabula_narrative::infer_language;
///
/// assert_eq!(infer_language("灯塔看守人在海边发现了一封信。"), Some(Language::Zh));
/// assert_eq!(infer_language("Der Wärter liest den Brief und ist nicht allein."), Some(Language::De));
/// assert_eq!(infer_language("12345 !!!"), None);
/// ```
pub fn infer_language(text: &str) -> Option<Language> {
    let scripts = ScriptCounts::of(text);
    let total = scripts.total();
    if total == 0 {
        return None;
    }
    let share = |n: usize| n as f64 / total as f64;

    if share(scripts.hangul) >= DOMINANT_SHARE && scripts.hangul >= scripts.han + scripts.kana {
        return Some(Language::Ko);
    }
    let cjk = scripts.han + scripts.kana;
    if share(cjk) >= DOMINANT_SHARE {
        // Any meaningful kana marks Japanese; Chinese uses none.
        return if scripts.kana * 10 >= cjk {
            Some(Language::Ja)
        } else {
            Some(Language::Zh)
        };
    }
    if share(scripts.latin) < DOMINANT_SHARE {
        return None;
    }

    let candidates = [Language::En, Language::Es, Language::Fr, Language::De];
    let mut scores = [0usize; 4];
    for word in words(text) {
        for (i, lang) in candidates.iter().enumerate() {
            if function_words(*lang).contains(&word.as_str()) {
                scores[i] += 1;
            }
        }
    }
    for c in text.chars().flat_map(char::to_lowercase) {
        let hit = diacritic_language(c).and_then(|lang| candidates.iter().position(|l| *l == lang));
        if let Some(i) = hit {
            scores[i] += 2;
        }
    }

    let mut ranked: Vec<(usize, Language)> = scores.into_iter().zip(candidates).collect();
    ranked.sort_by(|a, b| b.0.cmp(&a.0));
    let (best_score, best) = ranked[0];
    let runner_up = ranked[1].0;
    debug!(?ranked, "Latin-script language scores");

    (best_score >= MIN_WORD_SCORE && best_score > runner_up).then_some(best)
}

/// Pronoun sets (first, second, third person) for a language.
fn pronouns(language: Language) -> (&'static [&'static str], &'static [&'static str], &'static [&'static str]) {
    match language {
        Language::Es => (
            &["yo", "me", "mi", "mis", "nosotros", "nos"],
            &["tú", "te", "ti", "tu", "usted"],
            &["él", "ella", "ellos", "ellas", "lo", "le"],
        ),
        Language::Fr => (
            &["je", "j", "me", "moi", "mon", "ma", "mes", "nous"],
            &["tu", "te", "toi", "ton", "ta", "vous"],
            &["il", "elle", "ils", "elles", "lui", "son", "sa", "ses"],
        ),
        Language::De => (
            &["ich", "mich", "mir", "mein", "meine", "wir", "uns"],
            &["du", "dich", "dir", "dein", "deine"],
            &["er", "sie", "ihn", "ihm", "sein", "seine", "ihr"],
        ),
        Language::Zh => (&["我", "我们"], &["你", "你们"], &["他", "她", "他们", "她们"]),
        Language::Ja => (&["私", "僕", "俺"], &["あなた", "君"], &["彼", "彼女"]),
        Language::Ko => (&["나는", "내가", "저는", "제가"], &["너는", "네가", "당신"], &["그는", "그녀는", "그가"]),
        Language::En => (
            &["i", "me", "my", "mine", "we", "us", "our"],
            &["you", "your", "yours"],
            &["he", "she", "him", "her", "his", "they", "them", "their"],
        ),
    }
}

/// Past and present verb markers for a language.
fn tense_markers(language: Language) -> (&'static [&'static str], &'static [&'static str]) {
    match language {
        Language::Es => (
            &["era", "fue", "estaba", "había", "dijo", "tenía", "hizo", "vio"],
            &["es", "está", "hay", "dice", "tiene", "hace", "ve"],
        ),
        Language::Fr => (
            &["était", "fut", "avait", "dit", "fit", "vit", "alla"],
            &["est", "a", "dit", "fait", "voit", "va"],
        ),
        Language::De => (
            &["war", "hatte", "sagte", "ging", "kam", "sah", "wurde"],
            &["ist", "hat", "sagt", "geht", "kommt", "sieht", "wird"],
        ),
        Language::Zh => (&["了", "过"], &["正在", "在"]),
        Language::Ja => (&["た。", "だった"], &["る。", "です", "ます"]),
        Language::Ko => (&["었다", "았다", "였다"], &["는다", "ㄴ다", "이다"]),
        Language::En => (
            &[
                "was", "were", "had", "did", "said", "went", "came", "saw", "thought", "knew",
                "took", "found", "felt", "told",
            ],
            &[
                "is", "are", "am", "has", "does", "says", "goes", "comes", "sees", "thinks",
                "knows", "takes", "finds", "feels",
            ],
        ),
    }
}

fn uses_word_tokens(language: Language) -> bool {
    matches!(
        language,
        Language::En | Language::Es | Language::Fr | Language::De
    )
}

/// Count occurrences of `markers`, by whole word or by substring for
/// languages without word spacing.
fn count_markers(text: &str, lowered_words: &[String], language: Language, markers: &[&str]) -> usize {
    if uses_word_tokens(language) {
        lowered_words
            .iter()
            .filter(|w| markers.contains(&w.as_str()))
            .count()
    } else {
        markers.iter().map(|m| text.matches(m).count()).sum()
    }
}

/// Guess the narrative point of view.
pub fn detect_pov(text: &str, language: Language) -> Pov {
    let lowered: Vec<String> = words(text).collect();
    let (first, second, third) = pronouns(language);
    let first = count_markers(text, &lowered, language, first);
    let second = count_markers(text, &lowered, language, second);
    let third = count_markers(text, &lowered, language, third);
    debug!(first, second, third, "Pronoun counts");

    if first > second && first >= third && first > 0 {
        Pov::FirstPerson
    } else if second > first && second > third {
        Pov::SecondPerson
    } else {
        Pov::ThirdPerson
    }
}

/// Guess the narrative tense.
pub fn detect_tense(text: &str, language: Language) -> Tense {
    let lowered: Vec<String> = words(text).collect();
    let (past, present) = tense_markers(language);
    let mut past_count = count_markers(text, &lowered, language, past);
    let present_count = count_markers(text, &lowered, language, present);
    if language == Language::En {
        past_count += lowered
            .iter()
            .filter(|w| w.len() > 4 && w.ends_with("ed"))
            .count();
    }
    debug!(past = past_count, present = present_count, "Tense marker counts");

    if present_count > past_count {
        Tense::Present
    } else {
        Tense::Past
    }
}

/// Resolves the language and voice hints for a run.
#[derive(Debug, Clone, Copy, Default)]
pub struct LanguageDetector {
    fallback: Language,
}

impl LanguageDetector {
    /// Create a detector that falls back to English.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a detector with a different fallback language.
    pub fn with_fallback(fallback: Language) -> Self {
        Self { fallback }
    }

    /// Resolve style hints for `seed`.
    ///
    /// An explicit language is used as given. `Auto` infers it and falls
    /// back when inference is indeterminate.
    ///
    /// # Examples
    ///
    /// ```
    /// use fabula_core::{Language, LanguageSelection, Pov, Tense};
    /// use fabula_narrative::LanguageDetector;
    ///
    /// let detector = LanguageDetector::new();
    /// let seed = "Je marchais le long de la mer et je pensais à mon père.";
    ///
    /// let explicit = detector.detect(seed, LanguageSelection::Explicit(Language::En));
    /// assert_eq!(*explicit.language(), Language::En);
    ///
    /// let auto = detector.detect(seed, LanguageSelection::Auto);
    /// assert_eq!(*auto.language(), Language::Fr);
    /// assert_eq!(*auto.pov(), Pov::FirstPerson);
    /// ```
    #[instrument(skip(self, seed), fields(seed_chars = seed.chars().count()))]
    pub fn detect(&self, seed: &str, requested: LanguageSelection) -> StyleHints {
        let language = match requested {
            LanguageSelection::Explicit(language) => language,
            LanguageSelection::Auto => infer_language(seed).unwrap_or_else(|| {
                debug!(fallback = %self.fallback, "Language indeterminate, using fallback");
                self.fallback
            }),
        };
        let hints = StyleHints::new(
            language,
            detect_pov(seed, language),
            detect_tense(seed, language),
        );
        debug!(?hints, "Detected style hints");
        hints
    }
}
