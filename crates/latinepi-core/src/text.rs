//! Text normalization, character offsets and Latin orthography helpers
//!
//! Corpus offsets count characters, while `regex` reports byte offsets.
//! [`OffsetMap`] converts between the two for a fixed string.

use once_cell::sync::Lazy;
use regex::Regex;

static LINE_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<\s*br\s*/?\s*>|/").unwrap());
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Leading dedication formula: `D M`, `D M S`, `DIS MANIBUS [SACRUM]`
static LEADING_FORMULA: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:DIS\s+MANIBUS(?:\s+SACRUM)?|D\s*M(?:\s*S)?)\b").unwrap()
});

// ============================================================================
// Normalization
// ============================================================================

/// Build the normalized view used by the extractors.
///
/// Uppercases, collapses `V` into `U`, turns `<br>`/`<br/>`/`/` line-break
/// markers into spaces, collapses runs of whitespace and trims.
pub fn normalize(text: &str) -> String {
    let upper = text.to_uppercase().replace('V', "U");
    let spaced = LINE_BREAK.replace_all(&upper, " ");
    WHITESPACE.replace_all(spaced.trim(), " ").into_owned()
}

/// Blank out a leading dedication formula in normalized text.
///
/// The formula is replaced by spaces of equal length so offsets are
/// unchanged; this keeps the `M` of `D M` from reading as a praenomen.
pub fn mask_dedication_formula(normalized: &str) -> String {
    match LEADING_FORMULA.find(normalized) {
        Some(m) => {
            let mut masked = String::with_capacity(normalized.len());
            masked.push_str(&" ".repeat(m.end() - m.start()));
            masked.push_str(&normalized[m.end()..]);
            masked
        }
        None => normalized.to_string(),
    }
}

// ============================================================================
// Character offsets
// ============================================================================

/// Number of characters in `s`
pub fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Slice `s` by character offsets `[start, end)`
pub fn slice_chars(s: &str, start: usize, end: usize) -> Option<&str> {
    if start > end {
        return None;
    }
    let map = OffsetMap::new(s);
    let from = map.byte_at_char(start)?;
    let to = map.byte_at_char(end)?;
    s.get(from..to)
}

/// Byte/character offset conversion for one string
#[derive(Debug, Clone)]
pub struct OffsetMap {
    /// Byte offset of every char boundary, including the end of the string
    boundaries: Vec<usize>,
}

impl OffsetMap {
    pub fn new(s: &str) -> Self {
        let mut boundaries: Vec<usize> = s.char_indices().map(|(i, _)| i).collect();
        boundaries.push(s.len());
        Self { boundaries }
    }

    /// Length in characters
    pub fn char_len(&self) -> usize {
        self.boundaries.len() - 1
    }

    /// Character offset for a byte offset on a char boundary
    pub fn char_at_byte(&self, byte: usize) -> usize {
        match self.boundaries.binary_search(&byte) {
            Ok(idx) => idx,
            Err(idx) => idx.saturating_sub(1),
        }
    }

    /// Byte offset of a character offset; `None` past the end
    pub fn byte_at_char(&self, ch: usize) -> Option<usize> {
        self.boundaries.get(ch).copied()
    }
}

// ============================================================================
// Orthography
// ============================================================================

pub fn is_vowel(c: char) -> bool {
    matches!(c.to_ascii_uppercase(), 'A' | 'E' | 'I' | 'O' | 'U')
}

/// Restore consonantal `V` in an uppercase word spelled with `U` only.
///
/// `U` becomes `V` word-initially before a vowel, between two vowels, and
/// after `L` or `R` before a vowel: `UIBIUS` -> `VIBIUS`,
/// `SEUERUS` -> `SEVERUS`, `SILUANUS` -> `SILVANUS`.
pub fn restore_v(word: &str) -> String {
    let chars: Vec<char> = word.chars().collect();
    chars
        .iter()
        .enumerate()
        .map(|(i, &c)| {
            if c != 'U' {
                return c;
            }
            let next_vowel = chars.get(i + 1).is_some_and(|&n| is_vowel(n));
            if !next_vowel {
                return c;
            }
            let consonantal = match i.checked_sub(1).map(|p| chars[p]) {
                None => true,
                Some(prev) => is_vowel(prev) || prev == 'L' || prev == 'R',
            };
            if consonantal {
                'V'
            } else {
                c
            }
        })
        .collect()
}

/// Capitalize the first letter of each whitespace-separated word
pub fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Display form of a normalized name: `UIBIA SABINA` -> `Vibia Sabina`
pub fn display_name(normalized: &str) -> String {
    let restored = normalized
        .split_whitespace()
        .map(restore_v)
        .collect::<Vec<_>>()
        .join(" ");
    title_case(&restored)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("d m  gaivs<br/>ivlivs / caesar "), "D M GAIUS IULIUS CAESAR");
        assert_eq!(normalize("VIXIT<BR>ANNIS"), "UIXIT ANNIS");
        assert_eq!(normalize("   "), "");
    }

    #[test]
    fn test_mask_dedication_formula() {
        let text = "D M MARCO UIBIO";
        let masked = mask_dedication_formula(text);
        assert_eq!(masked.len(), text.len());
        assert_eq!(masked.trim_start(), "MARCO UIBIO");

        let text = "DIS MANIBUS SACRUM M ANTONIUS";
        assert_eq!(mask_dedication_formula(text).trim_start(), "M ANTONIUS");

        // Only a leading formula is masked
        assert_eq!(mask_dedication_formula("M ANTONIUS"), "M ANTONIUS");
    }

    #[test]
    fn test_offset_map_multibyte() {
        let s = "Dīs M";
        let map = OffsetMap::new(s);
        assert_eq!(map.char_len(), 5);
        assert_eq!(map.byte_at_char(2), Some(3));
        assert_eq!(map.char_at_byte(3), 2);
        assert_eq!(map.byte_at_char(6), None);
        assert_eq!(slice_chars(s, 1, 3), Some("īs"));
        assert_eq!(slice_chars(s, 3, 9), None);
    }

    #[test]
    fn test_restore_v() {
        assert_eq!(restore_v("UIBIUS"), "VIBIUS");
        assert_eq!(restore_v("IULIUS"), "IULIUS");
        assert_eq!(restore_v("SEUERUS"), "SEVERUS");
        assert_eq!(restore_v("FLAUIA"), "FLAVIA");
        assert_eq!(restore_v("SILUANUS"), "SILVANUS");
        assert_eq!(restore_v("AURELIUS"), "AURELIUS");
        assert_eq!(restore_v("QUINTUS"), "QUINTUS");
    }

    #[test]
    fn test_display_name() {
        assert_eq!(display_name("UIBIA SABINA"), "Vibia Sabina");
        assert_eq!(display_name("GAIUS"), "Gaius");
        assert_eq!(title_case("marcus aurelius"), "Marcus Aurelius");
    }

    proptest! {
        #[test]
        fn prop_normalize_is_idempotent(s in "[a-zA-Z /<>]{0,40}") {
            let once = normalize(&s);
            prop_assert_eq!(normalize(&once), once.clone());
            prop_assert!(!once.contains('V'));
            prop_assert!(!once.contains("  "));
        }

        #[test]
        fn prop_offset_map_roundtrip(s in "\\PC{0,20}") {
            let map = OffsetMap::new(&s);
            for ch in 0..=map.char_len() {
                let byte = map.byte_at_char(ch).unwrap();
                prop_assert_eq!(map.char_at_byte(byte), ch);
            }
        }
    }
}
