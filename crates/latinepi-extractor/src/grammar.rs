//! Phase 1: grammatical template matching
//!
//! Recognizes names by grammatical position rather than lexical identity.
//! Case is approximated from word endings only (`-AE` genitive/dative
//! feminine, `-I` genitive masculine, `-US`/`-A` nominative), which covers
//! the first and second declension names that dominate funerary formulae.
//! Third declension and irregular names are converted with the same
//! heuristic and may come out wrong; that boundary is accepted.

use latinepi_core::text::{display_name, normalize};
use latinepi_core::{Entity, EntityMap, GrammaticalCase, Phase};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::lexicon::{is_dedication_verb, is_non_name, kin_nominative_value, PLURAL_DEDICATION_VERBS};
use crate::EntityExtractor;

// ============================================================================
// Template tables
// ============================================================================

/// Dative kin word after two feminine genitive names
const FEMININE_KIN: &[(&str, &str, f32)] = &[
    ("FILIAE", "daughter", 0.90),
    ("MATRI", "mother", 0.90),
    ("CONIUGI", "wife", 0.88),
    ("SORORI", "sister", 0.88),
    ("AUIAE", "grandmother", 0.85),
    ("NEPOTI", "granddaughter", 0.85),
];

/// Dative kin word after two masculine genitive names
const MASCULINE_KIN: &[(&str, &str, f32)] = &[
    ("PATRI", "father", 0.90),
    ("FILIO", "son", 0.90),
    ("FRATRI", "brother", 0.88),
    ("AUO", "grandfather", 0.85),
    ("NEPOTI", "grandson", 0.85),
];

/// Nominative kin word directly before a singular dedication verb
const DEDICATOR_KIN: &[(&str, &str, f32)] = &[
    ("PATER", "father", 0.88),
    ("MATER", "mother", 0.88),
    ("FILIUS", "son", 0.88),
    ("FILIA", "daughter", 0.88),
    ("CONIUX", "spouse", 0.85),
    ("FRATER", "brother", 0.85),
    ("SOROR", "sister", 0.85),
    ("HERES", "heir", 0.88),
];

const SENTIMENTS: &[(&str, &str)] = &[
    (r"\bCARISSIM[AOE]+\b", "dearest"),
    (r"\bPIISSIM[AOE]+\b", "most devoted"),
    (r"\bDULCISSIM[AOE]+\b", "sweetest"),
    (r"\bBENE\s+MERENTI\b", "well-deserving"),
    (r"\bINCOMPARABILI\b", "incomparable"),
];

const SENTIMENT_CONFIDENCE: f32 = 0.75;

const MASCULINE_DEDICATOR_KIN: &str = "PATER|MATER|FILIUS|FILIA|FRATER|SOROR|HERES";
const FEMININE_DEDICATOR_KIN: &str = "MATER|FILIA|SOROR|CONIUX|CONIUNX|UXOR|HERES|LIBERTA";

/// Which capture groups of a dedicator template form the name
#[derive(Debug, Clone, Copy)]
enum DedicatorShape {
    /// Names in groups 1 and 2
    Pair,
    /// Abbreviated praenomen kept as written in group 1, names in 2 and 3
    WithPraenomen,
}

struct DedicatorTemplate {
    regex: Regex,
    shape: DedicatorShape,
    confidence: f32,
}

fn compile_all<T>(items: impl IntoIterator<Item = (String, T)>) -> Vec<(Regex, T)> {
    items
        .into_iter()
        .filter_map(|(pattern, payload)| match Regex::new(&pattern) {
            Ok(regex) => Some((regex, payload)),
            Err(e) => {
                tracing::warn!("Skipping grammar template {}: {}", pattern, e);
                None
            }
        })
        .collect()
}

static FEMININE_GENITIVE: Lazy<Vec<(Regex, (&'static str, f32))>> = Lazy::new(|| {
    compile_all(FEMININE_KIN.iter().map(|(kin, value, conf)| {
        (format!(r"\b([A-Z]+AE)\s+([A-Z]+AE)\s+{kin}\b"), (*value, *conf))
    }))
});

static MASCULINE_GENITIVE: Lazy<Vec<(Regex, (&'static str, f32))>> = Lazy::new(|| {
    compile_all(MASCULINE_KIN.iter().map(|(kin, value, conf)| {
        (format!(r"\b([A-Z]+I)\s+([A-Z]+I)\s+{kin}\b"), (*value, *conf))
    }))
});

/// Dedicator name shapes tried for each dedication verb, most specific first
fn dedicator_shapes(verb: &str) -> [(String, (DedicatorShape, f32)); 5] {
    [
        (
            format!(r"\b([A-Z]+US)\s+([A-Z]+US)\s+(?:{MASCULINE_DEDICATOR_KIN})\s+{verb}\b"),
            (DedicatorShape::Pair, 0.85),
        ),
        (
            format!(r"\b([A-Z]{{1,3}}\.?)\s+([A-Z]+US)\s+([A-Z]+US)\s+{verb}\b"),
            (DedicatorShape::WithPraenomen, 0.85),
        ),
        (
            format!(r"\b([A-Z]+US)\s+([A-Z]+US)\s+{verb}\b"),
            (DedicatorShape::Pair, 0.82),
        ),
        (
            format!(r"\b([A-Z]+A)\s+([A-Z]+A)\s+(?:{FEMININE_DEDICATOR_KIN})\s+{verb}\b"),
            (DedicatorShape::Pair, 0.85),
        ),
        (
            format!(r"\b([A-Z]+A)\s+([A-Z]+A)\s+{verb}\b"),
            (DedicatorShape::Pair, 0.82),
        ),
    ]
}

static DEDICATOR_TEMPLATES: Lazy<Vec<DedicatorTemplate>> = Lazy::new(|| {
    compile_all(crate::lexicon::DEDICATION_VERBS.iter().flat_map(|verb| dedicator_shapes(verb)))
        .into_iter()
        .map(|(regex, (shape, confidence))| DedicatorTemplate {
            regex,
            shape,
            confidence,
        })
        .collect()
});

static DEDICATOR_RELATIONSHIP: Lazy<Vec<(Regex, (&'static str, f32))>> = Lazy::new(|| {
    compile_all(DEDICATOR_KIN.iter().map(|(kin, value, conf)| {
        (
            format!(r"\b{kin}\s+(?:FECIT|POSUIT|CURAUIT)\b"),
            (*value, *conf),
        )
    }))
});

static SENTIMENT: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    compile_all(
        SENTIMENTS
            .iter()
            .map(|(pattern, value)| (pattern.to_string(), *value)),
    )
});

static PATRONYMIC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b([A-Z]+US)\s+([A-Z]+I)\s+F\b").unwrap());
static FILIATION_SON: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b([A-Z]+I(?:S)?)\s+FILIUS\b").unwrap());
static FILIATION_DAUGHTER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b([A-Z]+I(?:S)?)\s+FILIA\b").unwrap());
static WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b[A-Z]+\b").unwrap());

// ============================================================================
// Case heuristics
// ============================================================================

/// `UIBIAE` -> `Vibia`
fn feminine_from_genitive(word: &str) -> String {
    display_name(&format!("{}A", word.strip_suffix("AE").unwrap_or(word)))
}

/// `IULII` -> `Iulius`, `MARCI` -> `Marcus`
fn masculine_from_genitive(word: &str) -> String {
    display_name(&format!("{}US", word.strip_suffix('I').unwrap_or(word)))
}

/// Third declension `-IS` genitives are kept as written
fn father_from_genitive(word: &str) -> String {
    if word.ends_with("IS") {
        display_name(word)
    } else {
        masculine_from_genitive(word)
    }
}

fn looks_nominative(word: &str) -> bool {
    const ENDINGS: &[&str] = &["US", "A", "ER", "OR", "X", "IS", "ES", "AS", "O"];
    word.len() >= 2 && !is_non_name(word) && ENDINGS.iter().any(|e| word.ends_with(e))
}

fn entity(value: impl Into<String>, confidence: f32) -> Entity {
    Entity::new(value, confidence, Phase::GrammarTemplates)
}

// ============================================================================
// Positional name candidates
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NamePosition {
    Dedicator,
    DeceasedGenitive,
    Unknown,
}

impl NamePosition {
    /// Case a name in this position should carry
    pub fn expected_case(&self) -> Option<GrammaticalCase> {
        match self {
            Self::Dedicator => Some(GrammaticalCase::Nominative),
            Self::DeceasedGenitive => Some(GrammaticalCase::Genitive),
            Self::Unknown => None,
        }
    }
}

/// An adjacent pair of name-shaped words and the role its position suggests
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NameCandidate {
    pub name: String,
    pub position: NamePosition,
    pub confidence: f32,
}

// ============================================================================
// Grammar template extractor
// ============================================================================

/// Extractor for names in formulaic grammatical positions
#[derive(Debug, Clone, Default)]
pub struct GrammarTemplateExtractor;

impl GrammarTemplateExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Two genitive names followed by a dative kin word
    pub fn genitive_relationships(&self, normalized: &str) -> EntityMap {
        let mut entities = EntityMap::new();

        let feminine = FEMININE_GENITIVE.iter().find_map(|(regex, kin)| {
            regex.captures(normalized).map(|caps| {
                let name = format!(
                    "{} {}",
                    feminine_from_genitive(&caps[1]),
                    feminine_from_genitive(&caps[2])
                );
                (name, 0.82, *kin)
            })
        });
        let masculine = || {
            MASCULINE_GENITIVE.iter().find_map(|(regex, kin)| {
                regex.captures(normalized).map(|caps| {
                    let name = format!(
                        "{} {}",
                        masculine_from_genitive(&caps[1]),
                        masculine_from_genitive(&caps[2])
                    );
                    (name, 0.80, *kin)
                })
            })
        };

        if let Some((name, confidence, (kin, kin_confidence))) = feminine.or_else(masculine) {
            entities.insert("deceased_name".to_string(), entity(name, confidence));
            entities.insert(
                "deceased_relationship".to_string(),
                entity(kin, kin_confidence),
            );
        }
        entities
    }

    /// Nominative names before a dedication verb, and the dedicator's kin word
    pub fn dedicator_patterns(&self, normalized: &str) -> EntityMap {
        let mut entities = EntityMap::new();

        let dedicator = DEDICATOR_TEMPLATES.iter().find_map(|template| {
            template.regex.captures_iter(normalized).find_map(|caps| {
                let value = match template.shape {
                    DedicatorShape::Pair => {
                        if is_non_name(&caps[1]) || is_non_name(&caps[2]) {
                            return None;
                        }
                        format!("{} {}", display_name(&caps[1]), display_name(&caps[2]))
                    }
                    DedicatorShape::WithPraenomen => {
                        if is_non_name(&caps[2]) || is_non_name(&caps[3]) {
                            return None;
                        }
                        format!(
                            "{} {} {}",
                            &caps[1],
                            display_name(&caps[2]),
                            display_name(&caps[3])
                        )
                    }
                };
                Some((value, template.confidence))
            })
        });
        if let Some((value, confidence)) = dedicator {
            entities.insert("dedicator".to_string(), entity(value, confidence));
        }

        let relationship = DEDICATOR_RELATIONSHIP
            .iter()
            .find(|(regex, _)| regex.is_match(normalized));
        if let Some((_, (value, confidence))) = relationship {
            entities.insert(
                "dedicator_relationship".to_string(),
                entity(*value, *confidence),
            );
        }
        entities
    }

    /// `NAME NAME-I F` reads as "child of NAME-us"
    pub fn patronymic_patterns(&self, normalized: &str) -> EntityMap {
        let mut entities = EntityMap::new();
        if let Some(caps) = PATRONYMIC.captures(normalized) {
            let father = masculine_from_genitive(&caps[2]);
            entities.insert(
                "patronymic".to_string(),
                entity(format!("child of {father}"), 0.90),
            );
            entities.insert("father_name".to_string(), entity(father, 0.85));
        }
        entities
    }

    /// Genitive father's name followed by `FILIUS` or `FILIA`
    pub fn filiation_patterns(&self, normalized: &str) -> EntityMap {
        let mut entities = EntityMap::new();
        let found = FILIATION_SON
            .captures(normalized)
            .map(|caps| (father_from_genitive(&caps[1]), "son"))
            .or_else(|| {
                FILIATION_DAUGHTER
                    .captures(normalized)
                    .map(|caps| (father_from_genitive(&caps[1]), "daughter"))
            });
        if let Some((father, filiation)) = found {
            entities.insert("father_name".to_string(), entity(father, 0.88));
            entities.insert("filiation".to_string(), entity(filiation, 0.92));
        }
        entities
    }

    /// Affectionate epithets (`PIISSIMAE`, `BENE MERENTI`, ...)
    pub fn sentiment_patterns(&self, normalized: &str) -> EntityMap {
        let mut entities = EntityMap::new();
        if let Some((_, value)) = SENTIMENT.iter().find(|(regex, _)| regex.is_match(normalized)) {
            entities.insert(
                "dedication_sentiment".to_string(),
                entity(*value, SENTIMENT_CONFIDENCE),
            );
        }
        entities
    }

    /// Coordinated dedicators before a plural dedication verb.
    ///
    /// Walks back from the verb over `ET`-separated conjuncts, each of the
    /// shape `name+ [kin]`, and emits `dedicator_N` slots in text order.
    pub fn multiple_dedicators(&self, normalized: &str) -> EntityMap {
        let mut entities = EntityMap::new();
        let words: Vec<&str> = normalized
            .split_whitespace()
            .map(|w| w.trim_matches(|c: char| !c.is_ascii_alphabetic()))
            .filter(|w| !w.is_empty())
            .collect();

        let Some(verb_at) = words
            .iter()
            .position(|w| PLURAL_DEDICATION_VERBS.contains(w))
        else {
            return entities;
        };

        let segments: Vec<&[&str]> = words[..verb_at].split(|w| *w == "ET").collect();
        if segments.len() < 2 {
            return entities;
        }

        let mut conjuncts = Vec::new();
        for segment in segments.iter().rev() {
            let Some(conjunct) = Conjunct::parse(segment) else {
                break;
            };
            let whole = conjunct.consumed == segment.len();
            conjuncts.push(conjunct);
            if !whole {
                break;
            }
        }
        if conjuncts.len() < 2 {
            return entities;
        }
        conjuncts.reverse();

        for (i, conjunct) in conjuncts.iter().enumerate() {
            let n = i + 1;
            let name = conjunct
                .names
                .iter()
                .map(|w| display_name(w))
                .collect::<Vec<_>>()
                .join(" ");
            entities.insert(format!("dedicator_{n}"), entity(name, 0.80));
            if let Some(kin) = conjunct.kin {
                entities.insert(format!("dedicator_{n}_relationship"), entity(kin, 0.85));
            }
        }
        entities.insert("multiple_dedicators".to_string(), entity("true", 0.90));
        entities
    }

    /// Adjacent name-shaped word pairs with a positional role guess
    pub fn candidate_names(&self, text: &str) -> Vec<NameCandidate> {
        let normalized = normalize(text);
        let words: Vec<&str> = WORD.find_iter(&normalized).map(|m| m.as_str()).collect();
        let name_shaped = |w: &str| {
            !is_non_name(w) && ["US", "A", "E", "UM"].iter().any(|e| w.ends_with(e))
        };

        words
            .windows(2)
            .enumerate()
            .filter(|(_, pair)| name_shaped(pair[0]) && name_shaped(pair[1]))
            .map(|(i, pair)| {
                let genitive = |w: &str| w.ends_with('I') || w.ends_with("AE");
                let (position, confidence) =
                    if words.get(i + 2).is_some_and(|next| is_dedication_verb(next)) {
                        (NamePosition::Dedicator, 0.75)
                    } else if genitive(pair[0]) && genitive(pair[1]) {
                        (NamePosition::DeceasedGenitive, 0.70)
                    } else {
                        (NamePosition::Unknown, 0.60)
                    };
                NameCandidate {
                    name: format!("{} {}", display_name(pair[0]), display_name(pair[1])),
                    position,
                    confidence,
                }
            })
            .collect()
    }
}

/// One `name+ [kin]` conjunct of a coordinated dedication
struct Conjunct<'a> {
    names: Vec<&'a str>,
    kin: Option<&'static str>,
    /// Words of the segment covered, counted from its end
    consumed: usize,
}

impl<'a> Conjunct<'a> {
    const MAX_NAMES: usize = 3;

    fn parse(segment: &[&'a str]) -> Option<Self> {
        let mut end = segment.len();
        let kin = segment.last().and_then(|w| kin_nominative_value(w));
        if kin.is_some() {
            end -= 1;
        }

        let mut start = end;
        while start > 0 && end - start < Self::MAX_NAMES && looks_nominative(segment[start - 1]) {
            start -= 1;
        }
        if start == end {
            return None;
        }

        Some(Self {
            names: segment[start..end].to_vec(),
            kin,
            consumed: segment.len() - start,
        })
    }
}

impl EntityExtractor for GrammarTemplateExtractor {
    fn phase(&self) -> Phase {
        Phase::GrammarTemplates
    }

    fn extract(&self, text: &str) -> EntityMap {
        let normalized = normalize(text);
        let mut entities = EntityMap::new();

        // Later templates override earlier ones on a shared slot
        entities.extend(self.genitive_relationships(&normalized));
        entities.extend(self.dedicator_patterns(&normalized));
        entities.extend(self.patronymic_patterns(&normalized));
        entities.extend(self.filiation_patterns(&normalized));
        entities.extend(self.sentiment_patterns(&normalized));
        entities.extend(self.multiple_dedicators(&normalized));

        tracing::debug!("Grammar templates found {} entities", entities.len());
        entities
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value<'a>(entities: &'a EntityMap, slot: &str) -> Option<&'a str> {
        entities.get(slot).map(|e| e.value.as_str())
    }

    #[test]
    fn test_every_dedicator_template_compiles() {
        let per_verb = dedicator_shapes("FECIT").len();
        assert_eq!(
            DEDICATOR_TEMPLATES.len(),
            crate::lexicon::DEDICATION_VERBS.len() * per_verb
        );
    }

    #[test]
    fn test_feminine_genitive_with_daughter() {
        let entities = GrammarTemplateExtractor::new().extract("VIBIAE SABINAE FILIAE PIISSIMAE");

        let name = value(&entities, "deceased_name").unwrap();
        assert!(name.contains("Vibia"));
        assert!(name.contains("Sabina"));
        assert_eq!(entities["deceased_name"].confidence, 0.82);
        assert_eq!(value(&entities, "deceased_relationship"), Some("daughter"));
        assert_eq!(value(&entities, "dedication_sentiment"), Some("most devoted"));
    }

    #[test]
    fn test_masculine_genitive_with_father() {
        let entities = GrammarTemplateExtractor::new().extract("GAII IULII PATRI");
        assert_eq!(value(&entities, "deceased_name"), Some("Gaius Iulius"));
        assert_eq!(entities["deceased_name"].confidence, 0.80);
        assert_eq!(value(&entities, "deceased_relationship"), Some("father"));
    }

    #[test]
    fn test_dedicator_with_kin() {
        let entities = GrammarTemplateExtractor::new().extract("VIBIUS PAULUS PATER FECIT");
        assert_eq!(value(&entities, "dedicator"), Some("Vibius Paulus"));
        assert_eq!(entities["dedicator"].confidence, 0.85);
        assert_eq!(value(&entities, "dedicator_relationship"), Some("father"));
    }

    #[test]
    fn test_dedicator_shapes() {
        let extractor = GrammarTemplateExtractor::new();

        let entities = extractor.extract("M ANTONIUS SEUERUS POSUIT");
        assert_eq!(value(&entities, "dedicator"), Some("M Antonius Severus"));

        let entities = extractor.extract("SEXTUS MARIUS FECIT");
        assert_eq!(value(&entities, "dedicator"), Some("Sextus Marius"));
        assert_eq!(entities["dedicator"].confidence, 0.82);

        let entities = extractor.extract("D M VIBIA TERTULLA FILIA FECIT");
        assert_eq!(value(&entities, "dedicator"), Some("Vibia Tertulla"));
        assert_eq!(value(&entities, "dedicator_relationship"), Some("daughter"));
    }

    #[test]
    fn test_patronymic() {
        let entities = GrammarTemplateExtractor::new().extract("MARCUS GAI F");
        assert_eq!(value(&entities, "patronymic"), Some("child of Gaus"));
        assert_eq!(value(&entities, "father_name"), Some("Gaus"));
    }

    #[test]
    fn test_filiation_overrides_patronymic_father() {
        let entities = GrammarTemplateExtractor::new().extract("LUCIUS CAESARIS FILIUS");
        assert_eq!(value(&entities, "father_name"), Some("Caesaris"));
        assert_eq!(entities["father_name"].confidence, 0.88);
        assert_eq!(value(&entities, "filiation"), Some("son"));

        let entities = GrammarTemplateExtractor::new().extract("IULIA MARCI FILIA");
        assert_eq!(value(&entities, "father_name"), Some("Marcus"));
        assert_eq!(value(&entities, "filiation"), Some("daughter"));
    }

    #[test]
    fn test_multiple_dedicators() {
        let text = "D M VIBIAE SABINAE FILIAE VIBIUS PAULUS PATER ET VIBIA TERTULLA MATER FECERUNT";
        let entities = GrammarTemplateExtractor::new().extract(text);

        assert_eq!(value(&entities, "dedicator_1"), Some("Vibius Paulus"));
        assert_eq!(value(&entities, "dedicator_1_relationship"), Some("father"));
        assert_eq!(value(&entities, "dedicator_2"), Some("Vibia Tertulla"));
        assert_eq!(value(&entities, "dedicator_2_relationship"), Some("mother"));
        assert_eq!(value(&entities, "multiple_dedicators"), Some("true"));
        assert_eq!(value(&entities, "deceased_name"), Some("Vibia Sabina"));
    }

    #[test]
    fn test_three_coordinated_dedicators() {
        let text = "PRIMUS ET SECUNDUS ET TERTIA LIBERTA POSUERUNT";
        let entities = GrammarTemplateExtractor::new().extract(text);
        assert_eq!(value(&entities, "dedicator_1"), Some("Primus"));
        assert_eq!(value(&entities, "dedicator_2"), Some("Secundus"));
        assert_eq!(value(&entities, "dedicator_3"), Some("Tertia"));
        assert_eq!(value(&entities, "dedicator_3_relationship"), Some("freedwoman"));
    }

    #[test]
    fn test_no_coordination_no_multiple_dedicators() {
        let entities = GrammarTemplateExtractor::new().extract("VIBIUS PAULUS FECERUNT");
        assert!(!entities.contains_key("multiple_dedicators"));
    }

    #[test]
    fn test_candidate_names() {
        let candidates =
            GrammarTemplateExtractor::new().candidate_names("D M VIBIA TERTULLA FECIT");
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].name, "Vibia Tertulla");
        assert_eq!(candidates[0].position, NamePosition::Dedicator);

        let candidates = GrammarTemplateExtractor::new().candidate_names("VIBIAE SABINAE");
        assert_eq!(candidates[0].position, NamePosition::DeceasedGenitive);
        assert_eq!(candidates[0].confidence, 0.70);
    }

    #[test]
    fn test_confidences_in_range() {
        let extractor = GrammarTemplateExtractor::new();
        for text in [
            "VIBIAE SABINAE FILIAE",
            "VIBIUS PAULUS PATER ET VIBIA TERTULLA MATER FECERUNT",
            "MARCUS GAI F",
        ] {
            for entity in extractor.extract(text).values() {
                assert!((0.80..=0.92).contains(&entity.confidence) || entity.confidence == 0.75);
            }
        }
    }
}
