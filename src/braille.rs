//! Static Braille mapping tables and the transliteration pass over them.
//!
//! Two scripts are supported: a Latin-based table shared by English and
//! French, and an Arabic table. The tables are fixed data, built once at
//! process start. Matching is longest-prefix so that multi-character keys
//! (the Arabic lam-alef ligature) are reachable; with only single-character
//! keys this degenerates to a plain per-character scan.

use std::collections::HashMap;
use std::sync::LazyLock;

/// Latin-script table, shared by English and French text.
const LATIN_ENTRIES: &[(&str, &str)] = &[
    ("a", "⠁"),
    ("b", "⠃"),
    ("c", "⠉"),
    ("d", "⠙"),
    ("e", "⠑"),
    ("f", "⠋"),
    ("g", "⠛"),
    ("h", "⠓"),
    ("i", "⠊"),
    ("j", "⠚"),
    ("k", "⠅"),
    ("l", "⠇"),
    ("m", "⠍"),
    ("n", "⠝"),
    ("o", "⠕"),
    ("p", "⠏"),
    ("q", "⠟"),
    ("r", "⠗"),
    ("s", "⠎"),
    ("t", "⠞"),
    ("u", "⠥"),
    ("v", "⠧"),
    ("w", "⠺"),
    ("x", "⠭"),
    ("y", "⠽"),
    ("z", "⠵"),
    ("é", "⠿"),
    ("à", "⠷"),
    ("ç", "⠯"),
    ("0", "⠴"),
    ("1", "⠂"),
    ("2", "⠆"),
    ("3", "⠒"),
    ("4", "⠲"),
    ("5", "⠢"),
    ("6", "⠖"),
    ("7", "⠶"),
    ("8", "⠦"),
    ("9", "⠔"),
    (" ", " "),
    (".", "⠲"),
    (",", "⠠"),
    ("!", "⠖"),
    ("?", "⠦"),
    ("-", "⠤"),
    ("_", "⠸⠤"),
    ("*", "⠔"),
    (":", "⠒"),
    (";", "⠰"),
    ("'", "⠄"),
    ("\"", "⠐"),
    ("(", "⠐"),
    (")", "⠐"),
    ("@", "⠈⠤"),
    ("&", "⠮"),
    ("/", "⠤⠆"),
];

/// Arabic-script table. `لا` is a two-character key (lam followed by alef).
const ARABIC_ENTRIES: &[(&str, &str)] = &[
    ("ا", "⠁"),
    ("ب", "⠃"),
    ("ت", "⠞"),
    ("ث", "⠹"),
    ("ج", "⠚"),
    ("ح", "⠓"),
    ("خ", "⠮"),
    ("د", "⠙"),
    ("ذ", "⠹"),
    ("ر", "⠗"),
    ("ز", "⠵"),
    ("س", "⠎"),
    ("ش", "⠩"),
    ("ص", "⠯"),
    ("ض", "⠿"),
    ("ط", "⠾"),
    ("ظ", "⠾"),
    ("ع", "⠯"),
    ("غ", "⠱"),
    ("ف", "⠋"),
    ("ق", "⠟"),
    ("ك", "⠅"),
    ("ل", "⠇"),
    ("م", "⠍"),
    ("ن", "⠝"),
    ("ه", "⠓"),
    ("و", "⠺"),
    ("ي", "⠊"),
    ("ى", "⠁"),
    ("ء", "⠄"),
    ("ئ", "⠢"),
    ("ؤ", "⠂"),
    ("ة", "⠤"),
    ("لا", "⠯"),
    ("أ", "⠁"),
    ("إ", "⠊"),
    ("آ", "⠜"),
];

/// Immutable mapping from script characters to Braille glyph strings.
pub struct BrailleTable {
    glyphs: HashMap<&'static str, &'static str>,
    max_key_chars: usize,
}

impl BrailleTable {
    fn new(entries: &'static [(&'static str, &'static str)]) -> Self {
        let glyphs: HashMap<_, _> = entries.iter().copied().collect();
        let max_key_chars = glyphs
            .keys()
            .map(|key| key.chars().count())
            .max()
            .unwrap_or(1);
        Self {
            glyphs,
            max_key_chars,
        }
    }

    /// Replace every table key found in `text` with its glyph, longest key
    /// first at each position. Characters matching no key pass through
    /// unchanged.
    pub fn apply(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut rest = text;
        while let Some(first) = rest.chars().next() {
            let matched = (1..=self.max_key_chars)
                .rev()
                .filter_map(|len| prefix_chars(rest, len))
                .find_map(|prefix| {
                    self.glyphs
                        .get(prefix)
                        .map(|glyph| (prefix.len(), *glyph))
                });
            match matched {
                Some((len, glyph)) => {
                    out.push_str(glyph);
                    rest = &rest[len..];
                }
                None => {
                    out.push(first);
                    rest = &rest[first.len_utf8()..];
                }
            }
        }
        out
    }
}

static LATIN: LazyLock<BrailleTable> = LazyLock::new(|| BrailleTable::new(LATIN_ENTRIES));
static ARABIC: LazyLock<BrailleTable> = LazyLock::new(|| BrailleTable::new(ARABIC_ENTRIES));

/// Select the table for a language code: `ara` is Arabic, everything else
/// (including unknown codes) is the Latin table.
pub fn table_for(language: &str) -> &'static BrailleTable {
    if language == "ara" {
        &ARABIC
    } else {
        &LATIN
    }
}

/// Transliterate `text` using the table selected by `language`.
///
/// No case folding happens here; callers lowercase first.
pub fn transliterate(text: &str, language: &str) -> String {
    table_for(language).apply(text)
}

/// The first `chars` characters of `s`, or None if `s` is shorter than that.
fn prefix_chars(s: &str, chars: usize) -> Option<&str> {
    let mut count = 0;
    for (idx, _) in s.char_indices() {
        if count == chars {
            return Some(&s[..idx]);
        }
        count += 1;
    }
    if count == chars {
        Some(s)
    } else {
        None
    }
}
