//! Phase 3: dependency-relation extraction
//!
//! Walks the relations produced by the tagging backend. Intended for
//! inscriptions with several people, where positional templates confuse
//! who dedicated the stone to whom.

use std::sync::Arc;

use latinepi_core::{Entity, EntityMap, GrammaticalCase, Phase};
use serde::{Deserialize, Serialize};

use crate::lexicon::kin_lemma;
use crate::structure::StructureAnalysis;
use crate::tagger::{DepRelation, PartOfSpeech, TaggerBackend, Token};
use crate::EntityExtractor;

/// Kinship lemmas accepted as objects of the dedication
const OBJECT_KIN: &[&str] = &["pater", "mater", "filius", "filia", "coniunx", "uxor"];

/// One node of the dependency tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependencyNode {
    pub index: usize,
    pub word: String,
    pub lemma: String,
    pub pos: PartOfSpeech,
    pub relation: Option<DepRelation>,
    pub head: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct DependencyExtractor {
    backend: Arc<TaggerBackend>,
}

impl DependencyExtractor {
    pub fn new(backend: Arc<TaggerBackend>) -> Self {
        Self { backend }
    }

    pub fn is_available(&self) -> bool {
        self.backend.get().is_some()
    }

    fn tokens(&self, text: &str) -> Option<Vec<Token>> {
        let tagger = self.backend.get()?;
        match tagger.tag(text) {
            Ok(tokens) => Some(tokens),
            Err(e) => {
                tracing::warn!("Dependency tagging failed: {}", e);
                Some(Vec::new())
            }
        }
    }

    /// Run the phase; `None` means the phase is disabled
    pub fn try_extract(&self, text: &str) -> Option<EntityMap> {
        let tokens = self.tokens(text)?;
        Some(extract_from_tokens(&tokens))
    }

    pub fn dependency_tree(&self, text: &str) -> Vec<DependencyNode> {
        self.tokens(text)
            .unwrap_or_default()
            .into_iter()
            .map(|t| DependencyNode {
                index: t.index,
                word: t.text,
                lemma: t.lemma,
                pos: t.pos,
                relation: t.relation,
                head: t.head,
            })
            .collect()
    }

    pub fn analyze_structure(&self, text: &str) -> Option<StructureAnalysis> {
        self.tokens(text)
            .map(|tokens| StructureAnalysis::from_tokens(&tokens))
    }
}

/// Token whose `index` is `index`; taggers need not number from zero
fn token_at(tokens: &[Token], index: usize) -> Option<&Token> {
    tokens.iter().find(|t| t.index == index)
}

/// Lemma of `head` followed by the lemmas of its `flat` dependents
fn phrase(tokens: &[Token], head: &Token) -> String {
    std::iter::once(head)
        .chain(
            tokens
                .iter()
                .filter(|t| t.relation == Some(DepRelation::Flat) && t.head == Some(head.index)),
        )
        .map(|t| t.lemma.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

fn entity(value: impl Into<String>, confidence: f32) -> Entity {
    Entity::new(value, confidence, Phase::Dependencies)
}

fn extract_from_tokens(tokens: &[Token]) -> EntityMap {
    let mut entities = EntityMap::new();
    let with_relation = |relation: DepRelation| {
        tokens
            .iter()
            .filter(move |t| t.relation == Some(relation))
    };

    let subject = with_relation(DepRelation::Nsubj).find_map(|t| {
        let verb = token_at(tokens, t.head?).filter(|v| v.pos == PartOfSpeech::Verb)?;
        Some((t, verb.text.to_lowercase()))
    });
    if let Some((token, verb)) = subject {
        entities.insert(
            "dedicator_dependency".to_string(),
            entity(phrase(tokens, token), 0.88)
                .with_case(GrammaticalCase::Nominative)
                .with_relation(format!("subject_of_{verb}")),
        );
    }

    let object = with_relation(DepRelation::Iobj)
        .chain(with_relation(DepRelation::Obl))
        .filter(|t| OBJECT_KIN.contains(&t.lemma.as_str()))
        .find_map(|t| kin_lemma(&t.lemma).map(|(value, _)| (t, value)));
    if let Some((token, value)) = object {
        entities.insert(
            "relationship_dependency".to_string(),
            entity(value, 0.90)
                .with_relation("indirect_object")
                .with_lemma(token.lemma.clone()),
        );
    }

    let genitive = with_relation(DepRelation::Nmod)
        .find(|t| t.has_case(GrammaticalCase::Genitive) && t.pos.is_nominal());
    if let Some(token) = genitive {
        entities.insert(
            "deceased_name_dependency".to_string(),
            entity(phrase(tokens, token), 0.86)
                .with_case(GrammaticalCase::Genitive)
                .with_relation("genitive_modifier"),
        );
    }

    if tokens.iter().any(|t| t.text == "ET") {
        entities.insert("has_coordination".to_string(), entity("true", 0.95));
    }

    let coordinated: Vec<String> = with_relation(DepRelation::Conj)
        .filter(|t| t.pos.is_nominal())
        .map(|t| phrase(tokens, t))
        .collect();
    if !coordinated.is_empty() {
        entities.insert(
            "coordinated_dedicators".to_string(),
            entity(coordinated.join(", "), 0.82).with_relation("coordination"),
        );
    }

    entities
}

impl EntityExtractor for DependencyExtractor {
    fn phase(&self) -> Phase {
        Phase::Dependencies
    }

    fn extract(&self, text: &str) -> EntityMap {
        match self.try_extract(text) {
            Some(entities) => {
                tracing::debug!("Dependency analysis found {} entities", entities.len());
                entities
            }
            None => {
                tracing::warn!("Dependency phase disabled: no tagging backend");
                EntityMap::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tagger::Tagger;

    fn extractor() -> DependencyExtractor {
        DependencyExtractor::new(Arc::new(TaggerBackend::rule()))
    }

    #[test]
    fn test_subject_and_object() {
        let entities =
            extractor().extract("D M VIBIAE SABINAE FILIAE PIISSIMAE VIBIUS PAULUS PATER FECIT");

        let dedicator = &entities["dedicator_dependency"];
        assert_eq!(dedicator.value, "Vibius Paulus");
        assert_eq!(dedicator.confidence, 0.88);
        assert_eq!(dedicator.relation.as_deref(), Some("subject_of_fecit"));

        let relationship = &entities["relationship_dependency"];
        assert_eq!(relationship.value, "daughter");
        assert_eq!(relationship.relation.as_deref(), Some("indirect_object"));

        let deceased = &entities["deceased_name_dependency"];
        assert_eq!(deceased.value, "Vibia Sabina");
        assert_eq!(deceased.relation.as_deref(), Some("genitive_modifier"));

        assert!(!entities.contains_key("has_coordination"));
    }

    #[test]
    fn test_coordination() {
        let entities =
            extractor().extract("VIBIUS PAULUS PATER ET VIBIA TERTULLA MATER FECERUNT");
        assert_eq!(entities["has_coordination"].value, "true");
        assert_eq!(entities["coordinated_dedicators"].value, "Vibia Tertulla");
        assert_eq!(
            entities["dedicator_dependency"].relation.as_deref(),
            Some("subject_of_fecerunt")
        );
    }

    #[test]
    fn test_dependency_tree() {
        let tree = extractor().dependency_tree("VIBIUS PAULUS FECIT");
        assert_eq!(tree.len(), 3);
        assert_eq!(tree[0].relation, Some(DepRelation::Nsubj));
        assert_eq!(tree[0].head, Some(2));
        assert_eq!(tree[1].relation, Some(DepRelation::Flat));
        assert_eq!(tree[2].relation, Some(DepRelation::Root));
    }

    /// Rule tagger output renumbered from `offset`, optionally with every
    /// head pointing outside the sentence
    struct ShiftedTagger {
        offset: usize,
        dangling_heads: bool,
    }

    impl Tagger for ShiftedTagger {
        fn name(&self) -> &str {
            "shifted"
        }

        fn tag(&self, text: &str) -> latinepi_core::Result<Vec<Token>> {
            let tokens = crate::rule_tagger::RuleTagger::new().tag(text)?;
            Ok(tokens
                .into_iter()
                .map(|mut t| {
                    t.index += self.offset;
                    t.head = match t.head {
                        Some(_) if self.dangling_heads => Some(999),
                        Some(head) => Some(head + self.offset),
                        None => None,
                    };
                    t
                })
                .collect())
        }
    }

    fn shifted(offset: usize, dangling_heads: bool) -> DependencyExtractor {
        let tagger = ShiftedTagger { offset, dangling_heads };
        DependencyExtractor::new(Arc::new(TaggerBackend::ready(Arc::new(tagger))))
    }

    #[test]
    fn test_token_indices_not_starting_at_zero() {
        let text = "VIBIUS PAULUS PATER ET VIBIA TERTULLA MATER FECERUNT";
        let expected = extractor().extract(text);
        let entities = shifted(10, false).extract(text);

        assert_eq!(entities["dedicator_dependency"].value, expected["dedicator_dependency"].value);
        assert_eq!(
            entities["dedicator_dependency"].relation.as_deref(),
            Some("subject_of_fecerunt")
        );
        assert_eq!(entities["coordinated_dedicators"].value, "Vibia Tertulla");
    }

    #[test]
    fn test_unresolved_head_is_skipped() {
        let entities = shifted(0, true).extract("VIBIUS PAULUS FECIT");
        assert!(!entities.contains_key("dedicator_dependency"));
    }

    #[test]
    fn test_unavailable_backend() {
        let extractor = DependencyExtractor::new(Arc::new(TaggerBackend::unavailable()));
        assert!(extractor.try_extract("VIBIUS PAULUS FECIT").is_none());
        assert!(extractor.extract("VIBIUS PAULUS FECIT").is_empty());
        assert!(extractor.dependency_tree("VIBIUS").is_empty());
    }
}
