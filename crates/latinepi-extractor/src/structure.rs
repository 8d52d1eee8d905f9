//! Sentence-level summary of a tagged inscription

use latinepi_core::GrammaticalCase;
use serde::{Deserialize, Serialize};

use crate::tagger::{DepRelation, PartOfSpeech, Token};

const MAIN_VERBS: &[&str] = &["FECIT", "FECERUNT", "POSUIT", "POSUERUNT"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    Simple,
    Moderate,
    Complex,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InscriptionType {
    Dedication,
    Epitaph,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructureAnalysis {
    pub word_count: usize,
    pub has_main_verb: bool,
    pub main_verb: Option<String>,
    pub subject_count: usize,
    pub has_genitive: bool,
    pub has_dative: bool,
    pub has_coordination: bool,
    pub complexity: Complexity,
    pub inscription_type: InscriptionType,
}

impl StructureAnalysis {
    pub fn from_tokens(tokens: &[Token]) -> Self {
        let main_verb = tokens
            .iter()
            .find(|t| MAIN_VERBS.contains(&t.text.as_str()))
            .map(|t| t.text.clone());
        let subject_count = tokens
            .iter()
            .filter(|t| t.relation == Some(DepRelation::Nsubj))
            .count();
        let has_genitive = tokens.iter().any(|t| t.has_case(GrammaticalCase::Genitive));
        let has_dative = tokens.iter().any(|t| t.has_case(GrammaticalCase::Dative));
        let has_coordination = tokens
            .iter()
            .any(|t| t.pos == PartOfSpeech::Cconj && t.text == "ET");

        let mut score = 0;
        if subject_count > 1 {
            score += 2;
        }
        if has_coordination {
            score += 2;
        }
        if has_genitive && has_dative {
            score += 1;
        }
        let complexity = match score {
            s if s >= 4 => Complexity::Complex,
            s if s >= 2 => Complexity::Moderate,
            _ => Complexity::Simple,
        };

        let inscription_type = if main_verb.is_some() {
            InscriptionType::Dedication
        } else if has_genitive && has_dative {
            InscriptionType::Epitaph
        } else {
            InscriptionType::Unknown
        };

        Self {
            word_count: tokens.len(),
            has_main_verb: main_verb.is_some(),
            main_verb,
            subject_count,
            has_genitive,
            has_dative,
            has_coordination,
            complexity,
            inscription_type,
        }
    }
}
