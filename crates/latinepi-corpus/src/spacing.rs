//! Spacing repair with annotation offset recalculation
//!
//! Digitization often splits one Latin word in two (`ANTO NINI`,
//! `fe cit`). A fixed, ordered table of broken forms is applied to the
//! transcription, replacing only the first occurrence of each pattern, and
//! every annotation is then moved through the recorded changes.
//!
//! Offset policy, for each change in text order:
//! - change entirely before the annotation: shift start and end
//! - change overlapping the annotation start: snap the start to the start
//!   of the replacement and shift the end (lossy by design of the corpus
//!   tooling; never repaired further)
//! - change starting strictly inside the annotation: shift the end only
//!
//! Annotations whose resulting span is invalid are dropped.

use latinepi_core::text::{char_len, OffsetMap};
use latinepi_core::Annotation;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Broken form (matched case-insensitively) and its repair
const SPACING_FIXES: &[(&str, &str)] = &[
    // Name fragments
    (r"\banto\s+nini\b", "antonini"),
    (r"\baure\s+li\b", "aureli"),
    (r"\baure\s+lius\b", "aurelius"),
    (r"\baure\s+lio\b", "aurelio"),
    (r"\blucretiu\s+s\b", "lucretius"),
    (r"\bcaturoni\s+s\b", "caturonis"),
    (r"\bcorn\s+elius\b", "cornelius"),
    (r"\bcorn\s+elia\b", "cornelia"),
    // Funerary formulae
    (r"\bhic\s+sita\s+e\s+st\b", "hic sita est"),
    (r"\bsita\s+e\s+st\b", "sita est"),
    (r"\bsitus\s+e\s+st\b", "situs est"),
    // Age statements
    (r"\ban\s+norum\b", "annorum"),
    (r"\ban\s+nos\b", "annos"),
    (r"\ban\s+nis\b", "annis"),
    (r"\ban\s+num\b", "annum"),
    (r"\ban\s+no\b", "anno"),
    (r"\bmen\s+sis\b", "mensis"),
    (r"\bmen\s+ses\b", "menses"),
    (r"\bmen\s+sibus\b", "mensibus"),
    (r"\bdie\s+bus\b", "diebus"),
    (r"\bdie\s+rum\b", "dierum"),
    // Verbs
    (r"\bvix\s+it\b", "vixit"),
    (r"\bvix\s+sit\b", "vixit"),
    (r"\bvi\s+xit\b", "vixit"),
    (r"\bvi\s+vus\b", "vivus"),
    (r"\bfe\s+cit\b", "fecit"),
    (r"\bfe\s+cerunt\b", "fecerunt"),
    (r"\bpo\s+suit\b", "posuit"),
    (r"\bmilita\s+vit\b", "militavit"),
    // Kinship
    (r"\bfili\s+o\b", "filio"),
    (r"\bfili\s+us\b", "filius"),
    (r"\bfili\s+a\b", "filia"),
    (r"\bfili\s+ae\b", "filiae"),
    (r"\bfili\s+i\b", "filii"),
    (r"\buxo\s+ri\b", "uxori"),
    (r"\bconiu\s+gi\b", "coniugi"),
    (r"\bconiu\s+x\b", "coniux"),
    (r"\bpat\s+ri\b", "patri"),
    (r"\bmat\s+ri\b", "matri"),
    // Superlatives
    (r"\bcari\s+ssimo\b", "carissimo"),
    (r"\bcari\s+ssimae\b", "carissimae"),
    (r"\bcari\s+ssimi\b", "carissimi"),
    (r"\bdulcis\s+simo\b", "dulcissimo"),
    (r"\bdulcis\s+simae\b", "dulcissimae"),
    (r"\bdulcis\s+simi\b", "dulcissimi"),
    (r"\bpientis\s+simo\b", "pientissimo"),
    (r"\bpientis\s+simae\b", "pientissimae"),
    (r"\bpientis\s+simi\b", "pientissimi"),
    (r"\bsanctis\s+simae\b", "sanctissimae"),
    (r"\boptim\s+o\b", "optimo"),
    (r"\boptim\s+ae\b", "optimae"),
    // Other
    (r"\bpatri\s+bus\b", "patribus"),
    (r"\bliberto\s+rum\b", "libertorum"),
    (r"\bmer\s+enti\b", "merenti"),
    (r"\bmer\s+ito\b", "merito"),
    (r"\bmessibus\b", "mensibus"),
];

/// One applied replacement, in coordinates of the input transcription
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpacingChange {
    pub original_start: usize,
    pub original_end: usize,
    /// Replacement length minus replaced length, in characters
    pub delta: isize,
    pub before: String,
    pub after: String,
}

impl std::fmt::Display for SpacingChange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "'{}' -> '{}' at {}",
            self.before, self.after, self.original_start
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpacingResult {
    pub transcription: String,
    pub annotations: Vec<Annotation>,
    /// Applied changes sorted by position
    pub changes: Vec<SpacingChange>,
    /// Annotations dropped because their adjusted span was invalid
    pub dropped: usize,
}

impl SpacingResult {
    pub fn is_changed(&self) -> bool {
        !self.changes.is_empty()
    }
}

#[derive(Debug, Clone)]
struct SpacingFix {
    regex: Regex,
    replacement: &'static str,
}

/// Applies the spacing repair table and recomputes offsets
#[derive(Debug, Clone)]
pub struct SpacingNormalizer {
    fixes: Vec<SpacingFix>,
}

impl SpacingNormalizer {
    pub fn new() -> Self {
        let fixes = SPACING_FIXES
            .iter()
            .filter_map(|&(pattern, replacement)| {
                match Regex::new(&format!("(?i){pattern}")) {
                    Ok(regex) => Some(SpacingFix {
                        regex,
                        replacement,
                    }),
                    Err(e) => {
                        tracing::warn!("Skipping spacing fix {}: {}", pattern, e);
                        None
                    }
                }
            })
            .collect();
        Self { fixes }
    }

    /// Repair the transcription and move every annotation accordingly
    pub fn normalize(&self, transcription: &str, annotations: &[Annotation]) -> SpacingResult {
        let (text, changes) = self.fix_text(transcription);
        let new_len = char_len(&text);

        let mut kept = Vec::with_capacity(annotations.len());
        let mut dropped = 0;
        for annotation in annotations {
            match adjust_span(annotation, &changes) {
                Some((start, end)) if start < end && end <= new_len => {
                    kept.push(Annotation::new(start, end, annotation.label));
                }
                _ => dropped += 1,
            }
        }

        if dropped > 0 {
            tracing::debug!(
                "Dropped {} annotations with unrecoverable offsets",
                dropped
            );
        }

        SpacingResult {
            transcription: text,
            annotations: kept,
            changes,
            dropped,
        }
    }

    /// Apply the repair table; returns the new text and the changes made
    pub fn fix_text(&self, transcription: &str) -> (String, Vec<SpacingChange>) {
        let mut current = transcription.to_string();
        let mut changes = Vec::new();
        // Replaced regions in current coordinates: (start, end, delta)
        let mut regions: Vec<(usize, usize, isize)> = Vec::new();

        for fix in &self.fixes {
            let Some(m) = fix.regex.find(&current) else {
                continue;
            };
            let map = OffsetMap::new(&current);
            let start = map.char_at_byte(m.start());
            let end = map.char_at_byte(m.end());

            if regions.iter().any(|&(rs, re, _)| start < re && rs < end) {
                tracing::debug!("Skipping '{}': overlaps an earlier repair", m.as_str());
                continue;
            }

            let range = m.range();
            let before = m.as_str().to_string();
            let after = match_case(&before, fix.replacement);
            let delta = char_len(&after) as isize - (end - start) as isize;

            let shift: isize = regions
                .iter()
                .filter(|&&(_, re, _)| re <= start)
                .map(|&(_, _, d)| d)
                .sum();
            let original_start = (start as isize - shift) as usize;
            let original_end = (end as isize - shift) as usize;

            current.replace_range(range, &after);

            for region in regions.iter_mut().filter(|r| r.0 >= end) {
                region.0 = (region.0 as isize + delta) as usize;
                region.1 = (region.1 as isize + delta) as usize;
            }
            regions.push((start, start + char_len(&after), delta));

            changes.push(SpacingChange {
                original_start,
                original_end,
                delta,
                before,
                after,
            });
        }

        changes.sort_by_key(|c| c.original_start);
        for change in &changes {
            tracing::trace!("Spacing fix {}", change);
        }
        (current, changes)
    }
}

impl Default for SpacingNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Give `replacement` the letter case of the matched text
fn match_case(matched: &str, replacement: &str) -> String {
    let mut letters = matched.chars().filter(|c| c.is_alphabetic());
    let Some(first) = letters.next() else {
        return replacement.to_string();
    };
    let rest_upper = letters.all(|c| c.is_uppercase());

    if first.is_uppercase() && rest_upper {
        replacement.to_uppercase()
    } else if first.is_uppercase() {
        let mut chars = replacement.chars();
        match chars.next() {
            Some(c) => c.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    } else {
        replacement.to_string()
    }
}

/// Move one annotation through the sorted changes
fn adjust_span(annotation: &Annotation, changes: &[SpacingChange]) -> Option<(usize, usize)> {
    let start = annotation.start as isize;
    let end = annotation.end as isize;
    let mut new_start = start;
    let mut new_end = end;

    for change in changes {
        let change_start = change.original_start as isize;
        let change_end = change.original_end as isize;

        if change_end <= start {
            new_start += change.delta;
            new_end += change.delta;
        } else if change_start <= start && start < change_end {
            new_start = change_start + (new_start - start);
            new_end += change.delta;
        } else if start < change_start && change_start < end {
            new_end += change.delta;
        }
    }

    (new_start >= 0 && new_end >= 0).then(|| (new_start as usize, new_end as usize))
}

#[cfg(test)]
mod tests {
    use super::*;
    use latinepi_core::Label;

    fn span<'a>(text: &'a str, a: &Annotation) -> &'a str {
        latinepi_core::text::slice_chars(text, a.start, a.end).unwrap()
    }

    #[test]
    fn test_joins_split_name() {
        let normalizer = SpacingNormalizer::new();
        let result = normalizer.normalize("ANTO NINI", &[Annotation::new(0, 9, Label::Cognomen)]);

        assert_eq!(result.transcription, "ANTONINI");
        assert_eq!(result.annotations, vec![Annotation::new(0, 8, Label::Cognomen)]);
        assert_eq!(result.changes.len(), 1);
        assert_eq!(result.changes[0].delta, -1);
        assert_eq!(result.dropped, 0);
    }

    #[test]
    fn test_match_case() {
        assert_eq!(match_case("ANTO NINI", "antonini"), "ANTONINI");
        assert_eq!(match_case("Aure lius", "aurelius"), "Aurelius");
        assert_eq!(match_case("fe cit", "fecit"), "fecit");
    }

    #[test]
    fn test_only_first_occurrence() {
        let (text, changes) = SpacingNormalizer::new().fix_text("fe cit et fe cit");
        assert_eq!(text, "fecit et fe cit");
        assert_eq!(changes.len(), 1);
    }

    #[test]
    fn test_changes_in_text_order() {
        let text = "fe cit an nis XX";
        let annotations = [
            Annotation::new(7, 13, Label::AgePrefix),
            Annotation::new(14, 16, Label::AgeYears),
        ];
        let result = SpacingNormalizer::new().normalize(text, &annotations);

        assert_eq!(result.transcription, "fecit annis XX");
        assert_eq!(result.changes[0].original_start, 0);
        assert_eq!(result.changes[1].original_start, 7);
        assert_eq!(span(&result.transcription, &result.annotations[0]), "annis");
        assert_eq!(span(&result.transcription, &result.annotations[1]), "XX");
    }

    #[test]
    fn test_change_inside_annotation_moves_end() {
        let text = "D M AURE LIUS FELIX";
        let result = SpacingNormalizer::new().normalize(text, &[Annotation::new(0, 19, Label::DedicatorName)]);
        assert_eq!(result.transcription, "D M AURELIUS FELIX");
        assert_eq!(result.annotations[0], Annotation::new(0, 18, Label::DedicatorName));
    }

    #[test]
    fn test_invalid_after_adjustment_is_dropped() {
        let result = SpacingNormalizer::new().normalize(
            "X ANTO NINI",
            &[Annotation::new(2, 3, Label::Nomen), Annotation::new(0, 1, Label::Praenomen)],
        );
        assert_eq!(result.dropped, 1);
        assert_eq!(result.annotations, vec![Annotation::new(0, 1, Label::Praenomen)]);
    }

    #[test]
    fn test_out_of_range_input_is_dropped() {
        let result = SpacingNormalizer::new().normalize("GAIUS", &[Annotation::new(0, 40, Label::Praenomen)]);
        assert!(result.annotations.is_empty());
        assert_eq!(result.dropped, 1);
        assert!(!result.is_changed());
    }

    #[test]
    fn test_non_ascii_offsets_are_characters() {
        let text = "Ætas fe cit";
        let result = SpacingNormalizer::new().normalize(text, &[Annotation::new(5, 11, Label::FuneraryFormula)]);
        assert_eq!(result.transcription, "Ætas fecit");
        assert_eq!(span(&result.transcription, &result.annotations[0]), "fecit");
    }
}
