//! latinepi Extractor - Hybrid entity extraction pipeline
//!
//! Extracts names, relationships, ages and dedications from Latin
//! inscriptions in up to four phases:
//! - Phase 0: literal pattern matching against known names and formulae
//! - Phase 1: grammatical templates for unknown names in formulaic positions
//! - Phase 2: case-based extraction over a tagging backend (optional)
//! - Phase 3: dependency-relation extraction (optional)
//!
//! [`HybridOrchestrator`] runs the phases, merges their output and
//! consolidates slot variants into one confidence-ranked entity set.

use latinepi_core::{EntityMap, Phase};

pub mod dependency;
pub mod grammar;
pub mod hybrid;
pub mod lexicon;
pub mod morphology;
pub mod pattern;
pub mod report;
pub mod rule_tagger;
pub mod structure;
pub mod tagger;

pub use dependency::{DependencyExtractor, DependencyNode};
pub use grammar::{GrammarTemplateExtractor, NameCandidate, NamePosition};
pub use hybrid::HybridOrchestrator;
pub use morphology::{CaseAnalysis, MorphologyExtractor};
pub use pattern::PatternExtractor;
pub use report::ExtractionReport;
pub use rule_tagger::RuleTagger;
pub use structure::{Complexity, InscriptionType, StructureAnalysis};
pub use tagger::{DepRelation, PartOfSpeech, Tagger, TaggerBackend, Token};

/// Trait for single-phase entity extractors.
///
/// Extraction never fails on degraded input: an extractor that cannot
/// recognize anything returns an empty map (or, for pattern matching, the
/// low-confidence fallback entity).
pub trait EntityExtractor: Send + Sync {
    /// Phase recorded as the source of every produced entity
    fn phase(&self) -> Phase;

    fn extract(&self, text: &str) -> EntityMap;
}
