use std::borrow::Cow;

use lazy_static::lazy_static;
use regex::{Captures, Regex};
use strum::EnumCount;
use unicode_blocks::{find_unicode_block, UnicodeBlock};

use langsift_model::NgramOrder;

/// All Hangul blocks share one tag, all CJK ideograph blocks another.
const HANGUL_TAG: char = '\u{ac00}';
const CJK_TAG: char = '\u{4e00}';

/// Scripts folded to a single representative character. For these, language
/// identity lives at the block level; individual code points only add noise.
const BLOCK_TAGS: [(UnicodeBlock, char); 26] = [
    (unicode_blocks::ARABIC, '\u{0627}'),
    (unicode_blocks::DEVANAGARI, '\u{0905}'),
    (unicode_blocks::HEBREW, '\u{05d0}'),
    (unicode_blocks::CYRILLIC_SUPPLEMENT, '\u{0500}'),
    (unicode_blocks::THAI, '\u{0e01}'),
    (unicode_blocks::LAO, '\u{0e81}'),
    (unicode_blocks::TIBETAN, '\u{0f40}'),
    (unicode_blocks::MYANMAR, '\u{1000}'),
    (unicode_blocks::GEORGIAN, '\u{10d0}'),
    (unicode_blocks::ETHIOPIC, '\u{1200}'),
    (unicode_blocks::HANGUL_JAMO, HANGUL_TAG),
    (unicode_blocks::HANGUL_COMPATIBILITY_JAMO, HANGUL_TAG),
    (unicode_blocks::HANGUL_SYLLABLES, HANGUL_TAG),
    (unicode_blocks::HIRAGANA, '\u{3042}'),
    (unicode_blocks::KATAKANA, '\u{30a2}'),
    (unicode_blocks::CJK_RADICALS_SUPPLEMENT, CJK_TAG),
    (unicode_blocks::KANGXI_RADICALS, CJK_TAG),
    (unicode_blocks::CJK_SYMBOLS_AND_PUNCTUATION, CJK_TAG),
    (unicode_blocks::CJK_STROKES, CJK_TAG),
    (unicode_blocks::CJK_COMPATIBILITY, CJK_TAG),
    (unicode_blocks::CJK_UNIFIED_IDEOGRAPHS_EXTENSION_A, CJK_TAG),
    (unicode_blocks::CJK_UNIFIED_IDEOGRAPHS, CJK_TAG),
    (unicode_blocks::CJK_COMPATIBILITY_IDEOGRAPHS, CJK_TAG),
    (unicode_blocks::CJK_COMPATIBILITY_FORMS, CJK_TAG),
    (unicode_blocks::CJK_COMPATIBILITY_IDEOGRAPHS_SUPPLEMENT, CJK_TAG),
    (unicode_blocks::CJK_UNIFIED_IDEOGRAPHS_EXTENSION_B, CJK_TAG),
];

/// Fold a character into the reduced alphabet the profiles are trained on.
///
/// ASCII keeps only letters, Latin-1 keeps its letters but drops punctuation
/// and the two math signs, tagged scripts collapse to one char per script,
/// everything else passes through untouched.
pub fn fold(ch: char) -> char {
    let cp = ch as u32;
    if cp < 0x80 {
        return if ch.is_ascii_alphabetic() { ch } else { ' ' };
    }
    if cp < 0x100 {
        return match cp {
            0xa0..=0xbf | 0xd7 | 0xf7 => ' ',
            _ => ch,
        };
    }
    let Some(block) = find_unicode_block(ch) else {
        return ch;
    };
    for (tagged, tag) in &BLOCK_TAGS {
        if *tagged == block {
            return *tag;
        }
    }
    ch
}

pub(crate) fn is_latin_extended_additional(ch: char) -> bool {
    find_unicode_block(ch) == Some(unicode_blocks::LATIN_EXTENDED_ADDITIONAL)
}

// Vietnamese base vowels and the five combining marks they take, with the
// precomposed form of every (base, mark) pair. Row order follows the base
// string, one table per mark.
const VI_BASES: &str = "AEIOUYaeiouy\u{c2}\u{ca}\u{d4}\u{e2}\u{ea}\u{f4}\
                        \u{102}\u{103}\u{1a0}\u{1a1}\u{1af}\u{1b0}";
const VI_DMARKS: &str = "\u{300}\u{301}\u{303}\u{309}\u{323}";
const VI_COMPOSED: [&str; 5] = [
    "\u{c0}\u{c8}\u{cc}\u{d2}\u{d9}\u{1ef2}\u{e0}\u{e8}\u{ec}\u{f2}\u{f9}\u{1ef3}\
     \u{1ea6}\u{1ec0}\u{1ed2}\u{1ea7}\u{1ec1}\u{1ed3}\u{1eb0}\u{1eb1}\u{1edc}\u{1edd}\u{1eea}\u{1eeb}",
    "\u{c1}\u{c9}\u{cd}\u{d3}\u{da}\u{dd}\u{e1}\u{e9}\u{ed}\u{f3}\u{fa}\u{fd}\
     \u{1ea4}\u{1ebe}\u{1ed0}\u{1ea5}\u{1ebf}\u{1ed1}\u{1eae}\u{1eaf}\u{1eda}\u{1edb}\u{1ee8}\u{1ee9}",
    "\u{c3}\u{1ebc}\u{128}\u{d5}\u{168}\u{1ef8}\u{e3}\u{1ebd}\u{129}\u{f5}\u{169}\u{1ef9}\
     \u{1eaa}\u{1ec4}\u{1ed6}\u{1eab}\u{1ec5}\u{1ed7}\u{1eb4}\u{1eb5}\u{1ee0}\u{1ee1}\u{1eee}\u{1eef}",
    "\u{1ea2}\u{1eba}\u{1ec8}\u{1ece}\u{1ee6}\u{1ef6}\u{1ea3}\u{1ebb}\u{1ec9}\u{1ecf}\u{1ee7}\u{1ef7}\
     \u{1ea8}\u{1ec2}\u{1ed4}\u{1ea9}\u{1ec3}\u{1ed5}\u{1eb2}\u{1eb3}\u{1ede}\u{1edf}\u{1eec}\u{1eed}",
    "\u{1ea0}\u{1eb8}\u{1eca}\u{1ecc}\u{1ee4}\u{1ef4}\u{1ea1}\u{1eb9}\u{1ecb}\u{1ecd}\u{1ee5}\u{1ef5}\
     \u{1eac}\u{1ec6}\u{1ed8}\u{1ead}\u{1ec7}\u{1ed9}\u{1eb6}\u{1eb7}\u{1ee2}\u{1ee3}\u{1ef0}\u{1ef1}",
];

lazy_static! {
    static ref RE_VI_DMARK: Regex = Regex::new(&format!("([{VI_BASES}])([{VI_DMARKS}])"))
        .expect("Error compiling Vietnamese diacritic regex");
}

fn compose_vi(base: char, dmark: char) -> char {
    let base_idx = VI_BASES.chars().position(|c| c == base);
    let dmark_idx = VI_DMARKS.chars().position(|c| c == dmark);
    match (base_idx, dmark_idx) {
        (Some(bi), Some(di)) => VI_COMPOSED[di].chars().nth(bi).unwrap_or(base),
        _ => base,
    }
}

/// Rewrite base-vowel + combining-mark sequences to their precomposed form,
/// so Vietnamese text matches the profiles whichever way it was typed.
pub fn normalize_vi(text: &str) -> Cow<'_, str> {
    RE_VI_DMARK.replace_all(text, |caps: &Captures| {
        let mut chars = caps[0].chars();
        match (chars.next(), chars.next()) {
            (Some(base), Some(dmark)) => compose_vi(base, dmark).to_string(),
            _ => caps[0].to_string(),
        }
    })
}

/// Rolling window over the last three folded characters of a text stream.
///
/// The window starts on an implicit space sentinel and resets at every word
/// boundary, so grams never span across the space that ends a word; the
/// boundary space itself still shows up as gram context (` a`, `b `).
pub struct NgramWindow {
    window: [char; NgramOrder::COUNT],
    len: usize,
    capital_run: bool,
}

impl Default for NgramWindow {
    fn default() -> Self {
        Self::new()
    }
}

impl NgramWindow {
    pub fn new() -> Self {
        NgramWindow {
            window: [' '; NgramOrder::COUNT],
            len: 1,
            capital_run: false,
        }
    }

    /// Fold one raw character into the window.
    pub fn add_char(&mut self, raw: char) {
        let ch = fold(raw);
        let last = self.window[NgramOrder::COUNT - 1];
        if last == ' ' {
            self.window = [' '; NgramOrder::COUNT];
            self.len = 1;
            self.capital_run = false;
            if ch == ' ' {
                return;
            }
        }
        self.window = [self.window[1], self.window[2], ch];
        if self.len < NgramOrder::COUNT {
            self.len += 1;
        }

        // two consecutive uppercase chars mark an all-caps word; acronyms
        // carry no language signal and are suppressed until the word ends
        if ch.is_uppercase() {
            if last.is_uppercase() {
                self.capital_run = true;
            }
        } else {
            self.capital_run = false;
        }
    }

    /// The newest n-gram, or `None` when the window cannot supply one yet.
    pub fn get(&self, n: usize) -> Option<String> {
        if self.capital_run {
            return None;
        }
        if n < 1 || n > NgramOrder::COUNT || self.len < n {
            return None;
        }
        if n == 1 {
            let ch = self.window[NgramOrder::COUNT - 1];
            if ch == ' ' {
                return None;
            }
            return Some(ch.to_string());
        }
        Some(self.window[NgramOrder::COUNT - n..].iter().collect())
    }
}
