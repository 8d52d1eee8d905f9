//! Rule-based annotation reconciliation
//!
//! Brings a record's annotations in line with corpus conventions:
//! person labels never sit on adjectives or particles, age and kinship
//! words carry their proper label, stock formulae are annotated as one
//! span, and Roman numerals right after an age prefix become AGE_YEARS.
//! Running the engine twice gives the same result as running it once.

use latinepi_core::text::OffsetMap;
use latinepi_core::{Annotation, Label};
use once_cell::sync::Lazy;
use regex::Regex;

/// Epithets and participles that are never names
const ADJECTIVES: &[&str] = &[
    "pia", "pius", "piae", "pii", "pientissimo", "pientissimae", "pientis",
    "carissimae", "carissimo", "carissimi", "carissimus",
    "dulcissimo", "dulcissimae", "dulcissimi", "dulcissimus",
    "optimo", "optimae", "optimi", "optimus",
    "sanctissimae", "sancto", "sanctae", "sanctus",
    "fidelissimo", "fidelissimae", "incomparabili", "incomparabilissimis",
    "clarissimi", "egregio", "benemerenti", "bene", "merenti", "merito", "meritae",
];

/// Relative pronouns, conjunctions and prepositions
const PARTICLES: &[&str] = &[
    "quae", "qui", "cum", "quo", "qua", "sine", "ulla", "omnibus", "intra",
    "neque", "unquam", "et", "ob", "de", "ex", "in", "ad",
];

const AGE_WORDS: &[&str] = &[
    "uixit", "uix", "uiuus", "annos", "annorum", "annis", "anno", "annum",
    "mensibus", "menses", "diebus", "dies",
];

const KINSHIP_WORDS: &[&str] = &[
    "coniugi", "coniux", "uxori", "uxor", "marito", "pater", "mater", "patri",
    "matri", "parentes", "libertus", "liberta", "liberti", "libertae",
    "liberto", "patrono", "patronus", "patronae", "frater", "fratri", "soror",
    "filius", "filia", "filii", "filiae", "filio", "conseruae",
];

const DEDICATION_VERBS: &[&str] = &[
    "fecit", "fecerunt", "posuit", "posuerunt", "curauit", "curauerunt",
    "faciendum",
];

/// Stock formulae, matched on text folded to `u` for `v`
const FORMULAE: &[(&str, Label)] = &[
    (r"\bdis\s+manibus\s+sacrum\b", Label::DedicationToTheGods),
    (r"\bdis\s+manibus\b", Label::DedicationToTheGods),
    (r"\bd\s*m\s*s\b", Label::DedicationToTheGods),
    (r"\bd\s*m\b", Label::DedicationToTheGods),
    (r"\bhic\s+situs\s+est\b", Label::FuneraryFormula),
    (r"\bhic\s+sita\s+est\b", Label::FuneraryFormula),
    (r"\bh\s*s\s*e\b", Label::FuneraryFormula),
    (r"\bsit\s+tibi\s+terra\s+leuis\b", Label::FuneraryFormula),
    (r"\bs\s*t\s*t\s*l\b", Label::FuneraryFormula),
    (r"\bbene\s+merenti\b", Label::BeneMerenti),
    (r"\bbene\s+merito\b", Label::BeneMerenti),
    (r"\bb\s*m\b", Label::BeneMerenti),
    (r"\bioui\s+optimo\s+maximo\b", Label::DedicationToTheGods),
    (r"\bi\s*o\s*m\b", Label::DedicationToTheGods),
];

static FORMULA_RULES: Lazy<Vec<(Regex, Label)>> = Lazy::new(|| {
    FORMULAE
        .iter()
        .filter_map(|(pattern, label)| match Regex::new(&format!("(?i){pattern}")) {
            Ok(regex) => Some((regex, *label)),
            Err(e) => {
                tracing::warn!("Skipping formula rule {}: {}", pattern, e);
                None
            }
        })
        .collect()
});

static ROMAN_NUMERAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[IVX]+$").unwrap());

/// Characters inspected on each side of a span for measurement context
pub const DEFAULT_CONTEXT_WINDOW: usize = 30;

/// Lowercase with `v` folded to `u`; preserves char and byte offsets
fn fold(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            'v' | 'V' => 'u',
            c if c.is_ascii() => c.to_ascii_lowercase(),
            c => c,
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct AnnotationRuleEngine {
    context_window: usize,
}

impl AnnotationRuleEngine {
    pub fn new() -> Self {
        Self {
            context_window: DEFAULT_CONTEXT_WINDOW,
        }
    }

    pub fn with_context_window(mut self, chars: usize) -> Self {
        self.context_window = chars;
        self
    }

    /// Reconcile `annotations` against `transcription`
    ///
    /// Output is sorted and free of duplicates.
    pub fn reconcile(&self, transcription: &str, annotations: &[Annotation]) -> Vec<Annotation> {
        if annotations.is_empty() {
            return Vec::new();
        }

        let text = SpanText::new(transcription);
        let formulae = self.find_formulas(transcription);

        let mut kept: Vec<Annotation> = annotations
            .iter()
            .filter_map(|annotation| self.filter_and_relabel(&text, &formulae, annotation))
            .collect();
        kept.extend(formulae.iter().copied());
        kept.sort();
        kept.dedup();

        let mut result = self.label_age_numerals(&text, &kept);
        result.sort();
        result.dedup();

        tracing::trace!(
            "Reconciled {} annotations into {}",
            annotations.len(),
            result.len()
        );
        result
    }

    /// Non-overlapping formula spans, leftmost and longest first
    pub fn find_formulas(&self, transcription: &str) -> Vec<Annotation> {
        let folded = fold(transcription);
        let map = OffsetMap::new(&folded);

        let mut matches = Vec::new();
        for (regex, label) in FORMULA_RULES.iter() {
            for m in regex.find_iter(&folded) {
                matches.push(Annotation::new(
                    map.char_at_byte(m.start()),
                    map.char_at_byte(m.end()),
                    *label,
                ));
            }
        }
        matches.sort_by_key(|a| (a.start, std::cmp::Reverse(a.end - a.start)));

        let mut selected: Vec<Annotation> = Vec::new();
        for candidate in matches {
            if selected.iter().all(|s| !s.overlaps(&candidate)) {
                selected.push(candidate);
            }
        }
        selected
    }

    fn filter_and_relabel(
        &self,
        text: &SpanText,
        formulae: &[Annotation],
        annotation: &Annotation,
    ) -> Option<Annotation> {
        if !annotation.is_valid_for(text.len()) {
            tracing::debug!("Dropping out-of-range annotation {:?}", annotation);
            return None;
        }
        let word = text.folded(annotation)?;
        if word.is_empty() {
            return None;
        }

        if annotation.label.is_person_or_kin()
            && (ADJECTIVES.contains(&word.as_str()) || PARTICLES.contains(&word.as_str()))
        {
            tracing::debug!("Dropping {} on non-name '{}'", annotation.label, word);
            return None;
        }

        if formulae
            .iter()
            .any(|f| annotation.is_within(f.start, f.end))
        {
            return None;
        }

        let label = relabel(&word).unwrap_or(annotation.label);
        if !label.is_age() || !self.in_measurement_context(text, annotation) {
            return Some(annotation.with_label(label));
        }

        // Measurement formula: keep a non-age source label, drop an age one
        if annotation.label.is_age() {
            tracing::debug!("Dropping age label on measurement '{}'", word);
            None
        } else {
            Some(*annotation)
        }
    }

    /// Uppercase numerals right after an AGE_PREFIX annotation
    fn label_age_numerals(&self, text: &SpanText, annotations: &[Annotation]) -> Vec<Annotation> {
        annotations
            .iter()
            .map(|annotation| {
                let is_numeral = text
                    .raw(annotation)
                    .map(|raw| ROMAN_NUMERAL.is_match(raw.trim()))
                    .unwrap_or(false);
                if is_numeral
                    && annotation.label != Label::AgeYears
                    && follows_age_prefix(annotations, annotation)
                    && !self.in_measurement_context(text, annotation)
                {
                    annotation.with_label(Label::AgeYears)
                } else {
                    *annotation
                }
            })
            .collect()
    }

    fn in_measurement_context(&self, text: &SpanText, annotation: &Annotation) -> bool {
        let from = annotation.start.saturating_sub(self.context_window);
        let to = (annotation.end + self.context_window).min(text.len());
        let window = text.folded_range(from, to).unwrap_or_default();
        (window.contains("pedes") && window.contains("fronte"))
            || (window.contains("locus") && window.contains("pedum"))
    }
}

impl Default for AnnotationRuleEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn relabel(word: &str) -> Option<Label> {
    if AGE_WORDS.contains(&word) {
        Some(Label::AgePrefix)
    } else if KINSHIP_WORDS.contains(&word) {
        Some(Label::Relationship)
    } else if DEDICATION_VERBS.contains(&word) {
        Some(Label::FuneraryFormula)
    } else {
        None
    }
}

/// True when the closest annotations ending before `annotation` include
/// an AGE_PREFIX
fn follows_age_prefix(annotations: &[Annotation], annotation: &Annotation) -> bool {
    let preceding = annotations.iter().filter(|a| a.end <= annotation.start);
    let Some(nearest_end) = preceding.clone().map(|a| a.end).max() else {
        return false;
    };
    preceding
        .filter(|a| a.end == nearest_end)
        .any(|a| a.label == Label::AgePrefix)
}

/// Character-offset access to a transcription
struct SpanText<'a> {
    raw: &'a str,
    folded: String,
    map: OffsetMap,
}

impl<'a> SpanText<'a> {
    fn new(raw: &'a str) -> Self {
        Self {
            raw,
            folded: fold(raw),
            map: OffsetMap::new(raw),
        }
    }

    fn len(&self) -> usize {
        self.map.char_len()
    }

    fn bytes(&self, start: usize, end: usize) -> Option<std::ops::Range<usize>> {
        Some(self.map.byte_at_char(start)?..self.map.byte_at_char(end)?)
    }

    fn raw(&self, annotation: &Annotation) -> Option<&'a str> {
        self.raw.get(self.bytes(annotation.start, annotation.end)?)
    }

    fn folded(&self, annotation: &Annotation) -> Option<String> {
        self.folded_range(annotation.start, annotation.end)
            .map(|s| s.trim().to_lowercase())
    }

    fn folded_range(&self, start: usize, end: usize) -> Option<String> {
        self.folded
            .get(self.bytes(start, end)?)
            .map(str::to_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> AnnotationRuleEngine {
        AnnotationRuleEngine::new()
    }

    #[test]
    fn test_empty_annotations() {
        assert!(engine().reconcile("DIS MANIBUS", &[]).is_empty());
    }

    #[test]
    fn test_formula_replaces_word_annotations() {
        let text = "DIS MANIBUS SACRUM";
        let annotations = [
            Annotation::new(0, 3, Label::Nomen),
            Annotation::new(4, 11, Label::Cognomen),
            Annotation::new(12, 18, Label::Cognomen),
        ];
        let result = engine().reconcile(text, &annotations);
        assert_eq!(result, vec![Annotation::new(0, 18, Label::DedicationToTheGods)]);
    }

    #[test]
    fn test_find_formulas_prefers_longest() {
        let formulae = engine().find_formulas("D M S IULIAE H S E");
        assert_eq!(
            formulae,
            vec![
                Annotation::new(0, 5, Label::DedicationToTheGods),
                Annotation::new(13, 18, Label::FuneraryFormula),
            ]
        );
    }

    #[test]
    fn test_v_and_u_are_equivalent() {
        let formulae = engine().find_formulas("IOVI OPTIMO MAXIMO");
        assert_eq!(formulae, vec![Annotation::new(0, 18, Label::DedicationToTheGods)]);
    }

    #[test]
    fn test_adjective_loses_person_label() {
        let text = "IULIAE PIAE";
        let annotations = [
            Annotation::new(0, 6, Label::Nomen),
            Annotation::new(7, 11, Label::Cognomen),
        ];
        let result = engine().reconcile(text, &annotations);
        assert_eq!(result, vec![Annotation::new(0, 6, Label::Nomen)]);
    }

    #[test]
    fn test_lone_bene_and_merenti_lose_person_label() {
        let merenti = engine().reconcile("FILIAE MERENTI", &[Annotation::new(7, 14, Label::Cognomen)]);
        assert!(merenti.is_empty());

        let bene = engine().reconcile("BENE FILIAE", &[Annotation::new(0, 4, Label::Nomen)]);
        assert!(bene.is_empty());
    }

    #[test]
    fn test_relabels_by_word() {
        let text = "UIXIT ANNIS XXV UXORI FECIT";
        let annotations = [
            Annotation::new(0, 5, Label::Cognomen),
            Annotation::new(6, 11, Label::AgeYears),
            Annotation::new(16, 21, Label::Nomen),
            Annotation::new(22, 27, Label::DedicatorName),
        ];
        let result = engine().reconcile(text, &annotations);
        assert_eq!(
            result,
            vec![
                Annotation::new(0, 5, Label::AgePrefix),
                Annotation::new(6, 11, Label::AgePrefix),
                Annotation::new(16, 21, Label::Relationship),
                Annotation::new(22, 27, Label::FuneraryFormula),
            ]
        );
    }

    #[test]
    fn test_numeral_after_age_prefix() {
        let text = "VIXIT ANNIS XXV";
        let annotations = [
            Annotation::new(6, 11, Label::AgePrefix),
            Annotation::new(12, 15, Label::Cognomen),
        ];
        let result = engine().reconcile(text, &annotations);
        assert_eq!(result[1], Annotation::new(12, 15, Label::AgeYears));
    }

    #[test]
    fn test_numeral_without_age_prefix_unchanged() {
        let text = "LEGIO XXV";
        let annotations = [
            Annotation::new(0, 5, Label::MilitaryUnit),
            Annotation::new(6, 9, Label::MilitaryUnit),
        ];
        let result = engine().reconcile(text, &annotations);
        assert_eq!(result, annotations.to_vec());
    }

    #[test]
    fn test_measurement_context_blocks_age() {
        let text = "IN FRONTE PEDES XII ANNOS";
        let annotations = [
            Annotation::new(16, 19, Label::AgeYears),
            Annotation::new(20, 25, Label::AgePrefix),
        ];
        assert!(engine().reconcile(text, &annotations).is_empty());
    }

    #[test]
    fn test_measurement_context_keeps_source_label() {
        let text = "LOCUS IN FRONTE PEDUM XII ANNIS";
        let annotations = [Annotation::new(26, 31, Label::Cognomen)];
        assert_eq!(engine().reconcile(text, &annotations), annotations.to_vec());
    }

    #[test]
    fn test_idempotent_on_mixed_record() {
        let text = "D M IULIAE PIAE VIXIT ANNIS XXV COIUGI B M FECIT";
        let annotations = [
            Annotation::new(4, 10, Label::Nomen),
            Annotation::new(11, 15, Label::Cognomen),
            Annotation::new(16, 21, Label::AgePrefix),
            Annotation::new(22, 27, Label::AgePrefix),
            Annotation::new(28, 31, Label::Nomen),
            Annotation::new(39, 42, Label::Cognomen),
        ];
        let once = engine().reconcile(text, &annotations);
        let twice = engine().reconcile(text, &once);
        assert_eq!(once, twice);
        assert!(once.contains(&Annotation::new(28, 31, Label::AgeYears)));
        assert!(once.contains(&Annotation::new(39, 42, Label::BeneMerenti)));
    }
}
