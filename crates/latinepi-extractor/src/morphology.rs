//! Phase 2: case-based extraction
//!
//! Reads entities off grammatical case rather than word position:
//! genitive proper nouns name the deceased, nominative proper nouns next
//! to a dedication verb name the dedicator, dative kinship nouns give the
//! relationship and ablative proper nouns a location.

use std::sync::Arc;

use latinepi_core::{Entity, EntityMap, GrammaticalCase, Phase};
use serde::{Deserialize, Serialize};

use crate::lexicon::{is_dedication_verb, kin_lemma};
use crate::structure::StructureAnalysis;
use crate::tagger::{Gender, Number, PartOfSpeech, TaggerBackend, Token};
use crate::EntityExtractor;

/// Longest name assembled from consecutive proper nouns
const MAX_NAME_WORDS: usize = 3;

/// Confidence adjustment applied by [`MorphologyExtractor::validate_case`]
const CASE_AGREEMENT_DELTA: f32 = 0.10;

/// Morphological reading of one word
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseAnalysis {
    pub word: String,
    pub lemma: String,
    pub pos: PartOfSpeech,
    pub case: Option<GrammaticalCase>,
    pub gender: Option<Gender>,
    pub number: Option<Number>,
}

#[derive(Debug, Clone)]
pub struct MorphologyExtractor {
    backend: Arc<TaggerBackend>,
}

impl MorphologyExtractor {
    pub fn new(backend: Arc<TaggerBackend>) -> Self {
        Self { backend }
    }

    pub fn is_available(&self) -> bool {
        self.backend.get().is_some()
    }

    /// Tag `text`, or `None` when no backend is available
    fn tokens(&self, text: &str) -> Option<Vec<Token>> {
        let tagger = self.backend.get()?;
        match tagger.tag(text) {
            Ok(tokens) => Some(tokens),
            Err(e) => {
                tracing::warn!("Morphology tagging failed: {}", e);
                Some(Vec::new())
            }
        }
    }

    /// Run the phase; `None` means the phase is disabled
    pub fn try_extract(&self, text: &str) -> Option<EntityMap> {
        let tokens = self.tokens(text)?;
        Some(extract_from_tokens(&tokens))
    }

    pub fn case_analysis(&self, text: &str) -> Vec<CaseAnalysis> {
        self.tokens(text)
            .unwrap_or_default()
            .into_iter()
            .map(|t| CaseAnalysis {
                case: t.morph.case,
                gender: t.morph.gender,
                number: t.morph.number,
                word: t.text,
                lemma: t.lemma,
                pos: t.pos,
            })
            .collect()
    }

    /// Check that every proper noun in `entity_text` carries `expected` case.
    ///
    /// Returns whether the case agrees and the confidence adjustment to
    /// apply: positive on agreement, negative otherwise, zero when there is
    /// nothing to check.
    pub(crate) fn validate_case(&self, entity_text: &str, expected: GrammaticalCase) -> (bool, f32) {
        let Some(tokens) = self.tokens(entity_text) else {
            return (true, 0.0);
        };
        let cases: Vec<_> = tokens
            .iter()
            .filter(|t| t.pos == PartOfSpeech::ProperNoun)
            .filter_map(Token::case)
            .collect();
        if cases.is_empty() {
            return (true, 0.0);
        }
        if cases.iter().all(|c| *c == expected) {
            (true, CASE_AGREEMENT_DELTA)
        } else {
            (false, -CASE_AGREEMENT_DELTA)
        }
    }

    pub fn analyze_structure(&self, text: &str) -> Option<StructureAnalysis> {
        self.tokens(text)
            .map(|tokens| StructureAnalysis::from_tokens(&tokens))
    }
}

/// Lemmas of the first proper nouns carrying `case`, joined with spaces
fn proper_noun_name(tokens: &[Token], case: GrammaticalCase) -> Option<String> {
    let words: Vec<&str> = tokens
        .iter()
        .filter(|t| t.pos == PartOfSpeech::ProperNoun && t.has_case(case))
        .take(MAX_NAME_WORDS)
        .map(|t| t.lemma.as_str())
        .collect();
    (!words.is_empty()).then(|| words.join(" "))
}

fn entity(value: impl Into<String>, confidence: f32) -> Entity {
    Entity::new(value, confidence, Phase::Morphology)
}

fn extract_from_tokens(tokens: &[Token]) -> EntityMap {
    use GrammaticalCase::*;

    let mut entities = EntityMap::new();

    if let Some(name) = proper_noun_name(tokens, Genitive) {
        entities.insert(
            "deceased_name_morphology".to_string(),
            entity(name, 0.85).with_case(Genitive),
        );
    }

    let has_verb = tokens
        .iter()
        .any(|t| t.pos == PartOfSpeech::Verb && is_dedication_verb(&t.text));
    if has_verb {
        if let Some(name) = proper_noun_name(tokens, Nominative) {
            entities.insert(
                "dedicator_morphology".to_string(),
                entity(name, 0.82).with_case(Nominative),
            );
        }
    }

    let relationship = tokens
        .iter()
        .filter(|t| t.pos == PartOfSpeech::Noun && t.has_case(Dative))
        .find_map(|t| kin_lemma(&t.lemma).map(|(value, conf)| (t, value, conf)));
    if let Some((token, value, confidence)) = relationship {
        entities.insert(
            "relationship_morphology".to_string(),
            entity(value, confidence)
                .with_case(Dative)
                .with_lemma(token.lemma.clone()),
        );
    }

    if let Some(name) = proper_noun_name(tokens, Ablative) {
        entities.insert(
            "location_morphology".to_string(),
            entity(name, 0.75).with_case(Ablative),
        );
    }

    entities
}

impl EntityExtractor for MorphologyExtractor {
    fn phase(&self) -> Phase {
        Phase::Morphology
    }

    fn extract(&self, text: &str) -> EntityMap {
        match self.try_extract(text) {
            Some(entities) => {
                tracing::debug!("Morphology found {} entities", entities.len());
                entities
            }
            None => {
                tracing::warn!("Morphology phase disabled: no tagging backend");
                EntityMap::new()
            }
        }
    }
}
