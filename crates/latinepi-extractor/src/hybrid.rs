//! Hybrid orchestration of the extraction phases
//!
//! Phases 0 and 1 always run. The tagger-backed phases run only when the
//! cheap phases leave gaps and a backend is available, since tagging costs
//! far more than regex matching.

use std::collections::btree_map::Entry;
use std::sync::Arc;

use latinepi_core::{Agreement, ConfidenceSource, Entity, EntityMap, ExtractionConfig, Phase};

use crate::dependency::DependencyExtractor;
use crate::grammar::{GrammarTemplateExtractor, NameCandidate};
use crate::morphology::MorphologyExtractor;
use crate::pattern::PatternExtractor;
use crate::report::{ExtractionReport, ExtractionStatistics};
use crate::tagger::TaggerBackend;
use crate::EntityExtractor;

/// Slot variants folded into one canonical slot, canonical name first
const CONSOLIDATION_GROUPS: &[(&str, &[&str])] = &[
    (
        "deceased_name",
        &["deceased_name", "deceased_name_morphology", "deceased_name_dependency"],
    ),
    (
        "dedicator",
        &["dedicator", "dedicator_morphology", "dedicator_dependency"],
    ),
    (
        "relationship",
        &[
            "relationship",
            "relationship_morphology",
            "relationship_dependency",
            "deceased_relationship",
        ],
    ),
    ("location", &["location", "location_morphology"]),
];

const AGREEMENT_BOOST: f32 = 0.05;
const MAX_CONSOLIDATED_CONFIDENCE: f32 = 0.98;

/// Result of one orchestrated run
struct Run {
    entities: EntityMap,
    phases: Vec<Phase>,
}

// ============================================================================
// Hybrid Orchestrator
// ============================================================================

/// Runs the extraction phases and merges their output
pub struct HybridOrchestrator {
    pattern: PatternExtractor,
    grammar: GrammarTemplateExtractor,
    morphology: MorphologyExtractor,
    dependency: DependencyExtractor,
    use_morphology: bool,
    use_dependencies: bool,
    /// Entities below this confidence are dropped
    min_confidence: f32,
}

impl HybridOrchestrator {
    /// Create an orchestrator over a shared tagging backend
    pub fn new(backend: Arc<TaggerBackend>) -> Self {
        let defaults = ExtractionConfig::default();
        Self {
            pattern: PatternExtractor::new(),
            grammar: GrammarTemplateExtractor::new(),
            morphology: MorphologyExtractor::new(Arc::clone(&backend)),
            dependency: DependencyExtractor::new(backend),
            use_morphology: defaults.use_morphology,
            use_dependencies: defaults.use_dependencies,
            min_confidence: defaults.min_confidence,
        }
    }

    pub fn from_config(config: &ExtractionConfig, backend: Arc<TaggerBackend>) -> Self {
        Self::new(backend)
            .with_morphology(config.use_morphology)
            .with_dependencies(config.use_dependencies)
            .with_min_confidence(config.min_confidence)
    }

    pub fn with_morphology(mut self, enabled: bool) -> Self {
        self.use_morphology = enabled;
        self
    }

    pub fn with_dependencies(mut self, enabled: bool) -> Self {
        self.use_dependencies = enabled;
        self
    }

    /// Set minimum confidence
    pub fn with_min_confidence(mut self, min_confidence: f32) -> Self {
        self.min_confidence = min_confidence.clamp(0.0, 1.0);
        self
    }

    /// Extract a consolidated entity set
    pub fn extract(&self, text: &str) -> EntityMap {
        self.run(text, false).entities
    }

    /// Like [`extract`](Self::extract), also keeping displaced candidates
    /// as alternatives
    pub fn extract_verbose(&self, text: &str) -> EntityMap {
        self.run(text, true).entities
    }

    /// Verbose extraction plus diagnostics from every available phase
    pub fn report(&self, text: &str) -> ExtractionReport {
        let Run { entities, phases } = self.run(text, true);
        let tagged = self.morphology.is_available();

        ExtractionReport {
            text: text.to_string(),
            statistics: ExtractionStatistics::from_entities(&entities),
            entities,
            phases_used: phases,
            case_analysis: tagged.then(|| self.morphology.case_analysis(text)),
            dependency_tree: tagged.then(|| self.dependency.dependency_tree(text)),
            structure: self.morphology.analyze_structure(text),
            name_candidates: self.checked_candidates(text, tagged),
        }
    }

    /// Positional name candidates, rescored by case agreement when a
    /// tagger is available
    fn checked_candidates(&self, text: &str, tagged: bool) -> Vec<NameCandidate> {
        let mut candidates = self.grammar.candidate_names(text);
        if !tagged {
            return candidates;
        }
        for candidate in &mut candidates {
            let Some(expected) = candidate.position.expected_case() else {
                continue;
            };
            let (agrees, delta) = self.morphology.validate_case(&candidate.name, expected);
            if !agrees {
                tracing::debug!("Candidate '{}' is not {:?}", candidate.name, expected);
            }
            candidate.confidence = (candidate.confidence + delta).clamp(0.0, 1.0);
        }
        candidates
    }

    fn run(&self, text: &str, verbose: bool) -> Run {
        let mut phases = vec![Phase::PatternMatching, Phase::GrammarTemplates];
        let mut entities = self.pattern.extract(text);
        merge_entities(&mut entities, self.grammar.extract(text), verbose);

        if self.use_morphology && needs_morphology(&entities) {
            match self.morphology.try_extract(text) {
                Some(found) => {
                    tracing::debug!("Morphology found {} entities", found.len());
                    phases.push(Phase::Morphology);
                    merge_entities(&mut entities, found, verbose);
                }
                None => tracing::warn!("Skipping morphology phase: no tagging backend"),
            }
        }

        if self.use_dependencies && needs_dependencies(&entities) {
            match self.dependency.try_extract(text) {
                Some(found) => {
                    tracing::debug!("Dependency analysis found {} entities", found.len());
                    phases.push(Phase::Dependencies);
                    merge_entities(&mut entities, found, verbose);
                }
                None => tracing::warn!("Skipping dependency phase: no tagging backend"),
            }
        }

        let min_confidence = self.min_confidence;
        entities.retain(|_, e| e.confidence >= min_confidence);
        let mut entities = consolidate(entities);
        entities.retain(|_, e| e.confidence >= min_confidence);

        tracing::debug!(
            "Extracted {} entities using phases {:?}",
            entities.len(),
            phases
        );
        Run { entities, phases }
    }
}

impl Default for HybridOrchestrator {
    fn default() -> Self {
        Self::new(Arc::new(TaggerBackend::default()))
    }
}

/// The deceased or the dedicator is still missing, or little was found
fn needs_morphology(entities: &EntityMap) -> bool {
    let has_prefix = |prefix: &str| entities.keys().any(|k| k.starts_with(prefix));
    !has_prefix("deceased") || !has_prefix("dedicator") || entities.len() < 3
}

/// Several dedicators, or a crowded inscription
fn needs_dependencies(entities: &EntityMap) -> bool {
    entities
        .keys()
        .any(|k| k.contains("dedicator_1") || k.contains("dedicator_2"))
        || entities.len() > 8
}

// ============================================================================
// Merging
// ============================================================================

/// Merge one phase's output into the accumulator.
///
/// A higher-confidence candidate replaces the current entry; on an exact
/// tie the current entry stays and the candidate is kept as an
/// alternative. In verbose mode a displaced entry is kept as an
/// alternative of its replacement.
pub fn merge_entities(accumulator: &mut EntityMap, incoming: EntityMap, verbose: bool) {
    for (slot, candidate) in incoming {
        match accumulator.entry(slot) {
            Entry::Vacant(entry) => {
                entry.insert(candidate);
            }
            Entry::Occupied(mut entry) => {
                let current = entry.get_mut();
                if candidate.confidence > current.confidence {
                    let displaced = std::mem::replace(current, candidate);
                    if verbose {
                        current.push_alternative(displaced.value, displaced.source);
                    }
                } else if candidate.confidence == current.confidence {
                    current.push_alternative(candidate.value, candidate.source);
                }
            }
        }
    }
}

fn agreement_key(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Collapse slot variants from different phases into canonical slots.
///
/// The first highest-confidence variant becomes the canonical entity. When
/// several variants exist, all of them are recorded as confidence sources;
/// if their values agree the confidence is boosted by 0.05 per extra
/// variant (capped at 0.98), otherwise the disagreement is marked.
pub fn consolidate(mut entities: EntityMap) -> EntityMap {
    for (canonical, variants) in CONSOLIDATION_GROUPS {
        let found: Vec<(&str, Entity)> = variants
            .iter()
            .filter_map(|slot| entities.remove(*slot).map(|e| (*slot, e)))
            .collect();
        if found.is_empty() {
            continue;
        }

        let mut best = 0;
        for (i, (_, entity)) in found.iter().enumerate() {
            if entity.confidence > found[best].1.confidence {
                best = i;
            }
        }

        let mut chosen = found[best].1.clone();
        if found.len() > 1 {
            let first = agreement_key(&found[0].1.value);
            let agree = found
                .iter()
                .all(|(_, e)| agreement_key(&e.value) == first);

            if agree {
                let boost = AGREEMENT_BOOST * (found.len() - 1) as f32;
                let boosted = (chosen.confidence + boost).min(MAX_CONSOLIDATED_CONFIDENCE);
                chosen.set_confidence(chosen.confidence.max(boosted));
                chosen.agreement = Some(Agreement::High);
            } else {
                chosen.agreement = Some(Agreement::Low);
            }

            chosen.confidence_sources = found
                .iter()
                .map(|(slot, e)| ConfidenceSource {
                    slot: slot.to_string(),
                    value: e.value.clone(),
                    confidence: e.confidence,
                })
                .collect();
        }

        entities.insert(canonical.to_string(), chosen);
    }
    entities
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(value: &str, confidence: f32, phase: Phase) -> Entity {
        Entity::new(value, confidence, phase)
    }

    fn map(entries: &[(&str, Entity)]) -> EntityMap {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_merge_keeps_higher_confidence() {
        let mut acc = map(&[("nomen", entity("Iulius", 0.75, Phase::PatternMatching))]);
        merge_entities(
            &mut acc,
            map(&[("nomen", entity("Iulia", 0.88, Phase::GrammarTemplates))]),
            false,
        );
        assert_eq!(acc["nomen"].value, "Iulia");
        assert!(acc["nomen"].alternatives.is_empty());

        merge_entities(
            &mut acc,
            map(&[("nomen", entity("Iunia", 0.60, Phase::Morphology))]),
            false,
        );
        assert_eq!(acc["nomen"].value, "Iulia");
    }

    #[test]
    fn test_merge_verbose_records_displaced() {
        let mut acc = map(&[("nomen", entity("Iulius", 0.75, Phase::PatternMatching))]);
        merge_entities(
            &mut acc,
            map(&[("nomen", entity("Iulia", 0.88, Phase::GrammarTemplates))]),
            true,
        );
        assert_eq!(acc["nomen"].alternatives.len(), 1);
        assert_eq!(acc["nomen"].alternatives[0].value, "Iulius");
        assert_eq!(acc["nomen"].alternatives[0].phase, Phase::PatternMatching);
    }

    #[test]
    fn test_merge_tie_keeps_existing() {
        let mut acc = map(&[("dedicator", entity("Vibius Paulus", 0.85, Phase::GrammarTemplates))]);
        merge_entities(
            &mut acc,
            map(&[("dedicator", entity("Paulus", 0.85, Phase::Morphology))]),
            false,
        );
        let dedicator = &acc["dedicator"];
        assert_eq!(dedicator.value, "Vibius Paulus");
        assert_eq!(dedicator.source, Phase::GrammarTemplates);
        assert_eq!(dedicator.alternatives[0].value, "Paulus");
    }

    #[test]
    fn test_consolidate_agreement_boost() {
        let entities = map(&[
            ("deceased_name", entity("Vibia Sabina", 0.82, Phase::GrammarTemplates)),
            ("deceased_name_morphology", entity("VIBIA SABINA ", 0.85, Phase::Morphology)),
            ("deceased_name_dependency", entity("vibia sabina", 0.86, Phase::Dependencies)),
        ]);
        let consolidated = consolidate(entities);

        assert_eq!(consolidated.len(), 1);
        let deceased = &consolidated["deceased_name"];
        assert_eq!(deceased.value, "vibia sabina");
        assert!((deceased.confidence - 0.96).abs() < 1e-5);
        assert_eq!(deceased.agreement, Some(Agreement::High));
        assert_eq!(deceased.confidence_sources.len(), 3);
    }

    #[test]
    fn test_consolidate_disagreement() {
        let entities = map(&[
            ("relationship", entity("son", 0.85, Phase::PatternMatching)),
            ("deceased_relationship", entity("daughter", 0.90, Phase::GrammarTemplates)),
        ]);
        let consolidated = consolidate(entities);

        let relationship = &consolidated["relationship"];
        assert_eq!(relationship.value, "daughter");
        assert_eq!(relationship.confidence, 0.90);
        assert_eq!(relationship.agreement, Some(Agreement::Low));
        assert!(!consolidated.contains_key("deceased_relationship"));
    }

    #[test]
    fn test_consolidate_single_variant_unmarked() {
        let entities = map(&[("location_morphology", entity("Narbone", 0.75, Phase::Morphology))]);
        let consolidated = consolidate(entities);
        assert_eq!(consolidated["location"].value, "Narbone");
        assert_eq!(consolidated["location"].agreement, None);
        assert!(consolidated["location"].confidence_sources.is_empty());
    }

    #[test]
    fn test_consolidate_cap() {
        let entities = map(&[
            ("dedicator", entity("Paulus", 0.97, Phase::GrammarTemplates)),
            ("dedicator_morphology", entity("Paulus", 0.96, Phase::Morphology)),
            ("dedicator_dependency", entity("Paulus", 0.99, Phase::Dependencies)),
        ]);
        let consolidated = consolidate(entities);
        // The boost never lowers an already higher confidence
        assert_eq!(consolidated["dedicator"].confidence, 0.99);
    }

    #[test]
    fn test_need_predicates() {
        let mut entities = EntityMap::new();
        assert!(needs_morphology(&entities));
        assert!(!needs_dependencies(&entities));

        for slot in ["deceased_name", "dedicator", "praenomen"] {
            entities.insert(slot.to_string(), entity("x", 0.9, Phase::PatternMatching));
        }
        assert!(!needs_morphology(&entities));

        entities.insert("dedicator_1".to_string(), entity("x", 0.8, Phase::GrammarTemplates));
        assert!(needs_dependencies(&entities));
    }

    #[test]
    fn test_orchestrated_extraction() {
        let orchestrator = HybridOrchestrator::default();
        let entities = orchestrator.extract("VIBIAE SABINAE FILIAE");

        let deceased = &entities["deceased_name"];
        assert_eq!(deceased.value, "Vibia Sabina");
        assert_eq!(deceased.agreement, Some(Agreement::High));
        assert!((deceased.confidence - 0.90).abs() < 1e-5);

        let relationship = &entities["relationship"];
        assert_eq!(relationship.value, "daughter");
        assert!((relationship.confidence - 0.98).abs() < 1e-5);
        assert_eq!(relationship.confidence_sources.len(), 3);

        assert!(!entities.contains_key("deceased_name_morphology"));
        assert!(!entities.contains_key("deceased_relationship"));
    }

    #[test]
    fn test_resolved_inscription_skips_morphology() {
        let orchestrator = HybridOrchestrator::default();
        let report =
            orchestrator.report("D M VIBIAE SABINAE FILIAE PIISSIMAE VIBIUS PAULUS PATER FECIT");

        assert_eq!(
            report.phases_used,
            vec![Phase::PatternMatching, Phase::GrammarTemplates]
        );
        assert_eq!(report.entities["dedicator"].value, "Vibius Paulus");
        assert_eq!(report.entities["dedicator"].confidence, 0.85);
        assert_eq!(report.entities["status"].value, "dis manibus");
        assert!(report.case_analysis.is_some());
        assert!(!report.name_candidates.is_empty());
    }

    #[test]
    fn test_min_confidence_filter() {
        let orchestrator = HybridOrchestrator::default().with_min_confidence(0.9);
        let entities = orchestrator.extract("D M GAIUS IULIUS CAESAR");
        assert!(entities.values().all(|e| e.confidence >= 0.9));
        assert!(entities.contains_key("status"));
        assert!(!entities.contains_key("nomen"));
    }

    #[test]
    fn test_report_rescores_candidates_by_case() {
        let report = HybridOrchestrator::default().report("D M VIBIA TERTULLA FECIT");
        let candidate = &report.name_candidates[0];
        assert_eq!(candidate.name, "Vibia Tertulla");
        assert!((candidate.confidence - 0.85).abs() < 1e-6);

        let untagged = HybridOrchestrator::new(Arc::new(TaggerBackend::unavailable()))
            .report("D M VIBIA TERTULLA FECIT");
        assert_eq!(untagged.name_candidates[0].confidence, 0.75);
    }

    #[test]
    fn test_without_backend_phases_are_skipped() {
        let orchestrator = HybridOrchestrator::new(Arc::new(TaggerBackend::unavailable()));
        let report = orchestrator.report("VIBIAE SABINAE FILIAE");
        assert_eq!(
            report.phases_used,
            vec![Phase::PatternMatching, Phase::GrammarTemplates]
        );
        assert!(report.case_analysis.is_none());
        assert_eq!(report.entities["deceased_name"].value, "Vibia Sabina");
    }
}
