//! Extracted entities with confidence and provenance

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Slot name to entity. Ordered so output is deterministic.
pub type EntityMap = BTreeMap<String, Entity>;

// ============================================================================
// Phase
// ============================================================================

/// Extraction phase that produced an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    PatternMatching,
    GrammarTemplates,
    Morphology,
    Dependencies,
}

impl Phase {
    pub const ALL: [Phase; 4] = [
        Self::PatternMatching,
        Self::GrammarTemplates,
        Self::Morphology,
        Self::Dependencies,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PatternMatching => "pattern_matching",
            Self::GrammarTemplates => "grammar_templates",
            Self::Morphology => "morphology",
            Self::Dependencies => "dependencies",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Grammatical Case
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GrammaticalCase {
    Nominative,
    Genitive,
    Dative,
    Accusative,
    Ablative,
    Vocative,
}

impl GrammaticalCase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Nominative => "nominative",
            Self::Genitive => "genitive",
            Self::Dative => "dative",
            Self::Accusative => "accusative",
            Self::Ablative => "ablative",
            Self::Vocative => "vocative",
        }
    }
}

impl std::fmt::Display for GrammaticalCase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for GrammaticalCase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "nominative" | "nom" => Ok(Self::Nominative),
            "genitive" | "gen" => Ok(Self::Genitive),
            "dative" | "dat" => Ok(Self::Dative),
            "accusative" | "acc" => Ok(Self::Accusative),
            "ablative" | "abl" => Ok(Self::Ablative),
            "vocative" | "voc" => Ok(Self::Vocative),
            _ => Err(format!("unknown case: {s}")),
        }
    }
}

// ============================================================================
// Provenance
// ============================================================================

/// A candidate value that lost (or tied) during merging
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alternative {
    pub value: String,
    pub phase: Phase,
}

/// One variant folded into a consolidated slot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceSource {
    pub slot: String,
    pub value: String,
    pub confidence: f32,
}

/// Whether all consolidated variants agreed on the value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Agreement {
    High,
    Low,
}

// ============================================================================
// Entity
// ============================================================================

/// A single extracted slot value.
///
/// `value`, `confidence` and `source` are always present; everything else
/// is optional metadata or merge provenance and is omitted from JSON when
/// empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub value: String,
    pub confidence: f32,
    pub source: Phase,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub case: Option<GrammaticalCase>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relation: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lemma: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alternatives: Vec<Alternative>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub confidence_sources: Vec<ConfidenceSource>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agreement: Option<Agreement>,
}

impl Entity {
    /// Create an entity; confidence is clamped to `[0, 1]`
    pub fn new(value: impl Into<String>, confidence: f32, source: Phase) -> Self {
        Self {
            value: value.into(),
            confidence: clamp_confidence(confidence),
            source,
            case: None,
            relation: None,
            lemma: None,
            alternatives: Vec::new(),
            confidence_sources: Vec::new(),
            agreement: None,
        }
    }

    pub fn with_case(mut self, case: GrammaticalCase) -> Self {
        self.case = Some(case);
        self
    }

    pub fn with_relation(mut self, relation: impl Into<String>) -> Self {
        self.relation = Some(relation.into());
        self
    }

    pub fn with_lemma(mut self, lemma: impl Into<String>) -> Self {
        self.lemma = Some(lemma.into());
        self
    }

    pub fn set_confidence(&mut self, confidence: f32) {
        self.confidence = clamp_confidence(confidence);
    }

    pub fn push_alternative(&mut self, value: impl Into<String>, phase: Phase) {
        self.alternatives.push(Alternative {
            value: value.into(),
            phase,
        });
    }
}

fn clamp_confidence(confidence: f32) -> f32 {
    if confidence.is_nan() {
        0.0
    } else {
        confidence.clamp(0.0, 1.0)
    }
}
