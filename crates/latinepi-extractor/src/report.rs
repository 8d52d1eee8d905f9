//! Extraction report for introspection

use std::collections::BTreeMap;

use latinepi_core::{EntityMap, Phase};
use serde::{Deserialize, Serialize};

use crate::dependency::DependencyNode;
use crate::grammar::NameCandidate;
use crate::morphology::CaseAnalysis;
use crate::structure::StructureAnalysis;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionStatistics {
    /// Entity count keyed by the phase that produced the surviving value
    pub entities_by_phase: BTreeMap<String, usize>,
    pub total_entities: usize,
}

impl ExtractionStatistics {
    pub fn from_entities(entities: &EntityMap) -> Self {
        let mut entities_by_phase: BTreeMap<String, usize> = Phase::ALL
            .iter()
            .map(|phase| (phase.as_str().to_string(), 0))
            .collect();
        for entity in entities.values() {
            *entities_by_phase
                .entry(entity.source.as_str().to_string())
                .or_default() += 1;
        }
        Self {
            entities_by_phase,
            total_entities: entities.len(),
        }
    }
}

/// Verbose extraction result with per-phase diagnostics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionReport {
    pub text: String,
    pub entities: EntityMap,
    /// Phases that actually ran, in order
    pub phases_used: Vec<Phase>,
    pub statistics: ExtractionStatistics,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub case_analysis: Option<Vec<CaseAnalysis>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dependency_tree: Option<Vec<DependencyNode>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub structure: Option<StructureAnalysis>,
    pub name_candidates: Vec<NameCandidate>,
}

impl ExtractionReport {
    pub fn to_json_pretty(&self) -> latinepi_core::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
