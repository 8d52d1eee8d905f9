//! Span annotations over inscription transcriptions
//!
//! An annotation is a half-open `[start, end)` range counted in characters
//! (Unicode scalar values) plus a label from a closed vocabulary. On the
//! wire an annotation is the triple `[start, end, "LABEL"]`.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::text::slice_chars;

// ============================================================================
// Labels
// ============================================================================

/// Closed label vocabulary of the annotated corpus
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Label {
    // Names
    Praenomen,
    Nomen,
    Cognomen,
    DedicatorName,

    // Kinship
    Relationship,
    Filiation,

    // Age statements
    AgePrefix,
    AgeYears,
    AgeMonths,
    AgeDays,
    AgeHours,

    // Formulae
    FuneraryFormula,
    DedicationToTheGods,
    BeneMerenti,

    // Career and origin
    MilitaryUnit,
    MilitaryRank,
    Occupation,
    Tribe,
    Place,
    SocialStatus,
}

impl Label {
    /// All labels in declaration order
    pub const ALL: [Label; 20] = [
        Self::Praenomen,
        Self::Nomen,
        Self::Cognomen,
        Self::DedicatorName,
        Self::Relationship,
        Self::Filiation,
        Self::AgePrefix,
        Self::AgeYears,
        Self::AgeMonths,
        Self::AgeDays,
        Self::AgeHours,
        Self::FuneraryFormula,
        Self::DedicationToTheGods,
        Self::BeneMerenti,
        Self::MilitaryUnit,
        Self::MilitaryRank,
        Self::Occupation,
        Self::Tribe,
        Self::Place,
        Self::SocialStatus,
    ];

    /// Get the corpus string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Praenomen => "PRAENOMEN",
            Self::Nomen => "NOMEN",
            Self::Cognomen => "COGNOMEN",
            Self::DedicatorName => "DEDICATOR_NAME",
            Self::Relationship => "RELATIONSHIP",
            Self::Filiation => "FILIATION",
            Self::AgePrefix => "AGE_PREFIX",
            Self::AgeYears => "AGE_YEARS",
            Self::AgeMonths => "AGE_MONTHS",
            Self::AgeDays => "AGE_DAYS",
            Self::AgeHours => "AGE_HOURS",
            Self::FuneraryFormula => "FUNERARY_FORMULA",
            Self::DedicationToTheGods => "DEDICATION_TO_THE_GODS",
            Self::BeneMerenti => "BENE_MERENTI",
            Self::MilitaryUnit => "MILITARY_UNIT",
            Self::MilitaryRank => "MILITARY_RANK",
            Self::Occupation => "OCCUPATION",
            Self::Tribe => "TRIBE",
            Self::Place => "PLACE",
            Self::SocialStatus => "SOCIAL_STATUS",
        }
    }

    /// Labels describing an age statement
    pub fn is_age(&self) -> bool {
        matches!(
            self,
            Self::AgePrefix | Self::AgeYears | Self::AgeMonths | Self::AgeDays | Self::AgeHours
        )
    }

    /// Labels that should only ever cover a person name or kin term
    pub fn is_person_or_kin(&self) -> bool {
        matches!(
            self,
            Self::Cognomen | Self::Nomen | Self::Relationship | Self::DedicatorName
        )
    }
}

impl std::str::FromStr for Label {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|label| label.as_str() == s)
            .ok_or_else(|| format!("unknown label: {s}"))
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Annotation
// ============================================================================

/// A labelled character span `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Annotation {
    pub start: usize,
    pub end: usize,
    pub label: Label,
}

impl Annotation {
    pub fn new(start: usize, end: usize, label: Label) -> Self {
        Self { start, end, label }
    }

    /// Same span, different label
    pub fn with_label(self, label: Label) -> Self {
        Self { label, ..self }
    }

    /// Check `start < end <= text_len`
    pub fn is_valid_for(&self, text_len: usize) -> bool {
        self.start < self.end && self.end <= text_len
    }

    /// Check whether this span lies entirely inside `[start, end)`
    pub fn is_within(&self, start: usize, end: usize) -> bool {
        self.start >= start && self.end <= end
    }

    /// Check whether two spans share at least one character
    pub fn overlaps(&self, other: &Annotation) -> bool {
        self.start < other.end && other.start < self.end
    }
}

impl Serialize for Annotation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        (self.start, self.end, self.label).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Annotation {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let (start, end, label) = <(usize, usize, Label)>::deserialize(deserializer)?;
        Ok(Self { start, end, label })
    }
}

// ============================================================================
// Inscription
// ============================================================================

/// An immutable transcription with its annotations.
///
/// Pipelines never edit an inscription in place; any change to the text
/// yields a new inscription whose offsets were recomputed as a whole.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inscription {
    transcription: String,
    annotations: Vec<Annotation>,
}

impl Inscription {
    pub fn new(transcription: impl Into<String>, annotations: Vec<Annotation>) -> Self {
        Self {
            transcription: transcription.into(),
            annotations,
        }
    }

    pub fn transcription(&self) -> &str {
        &self.transcription
    }

    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    /// Length of the transcription in characters
    pub fn char_len(&self) -> usize {
        self.transcription.chars().count()
    }

    /// Surface text of an annotation, if its span is valid
    pub fn span_text(&self, annotation: &Annotation) -> Option<&str> {
        slice_chars(&self.transcription, annotation.start, annotation.end)
    }

    pub fn into_parts(self) -> (String, Vec<Annotation>) {
        (self.transcription, self.annotations)
    }
}
