//! Tagging backend seam for the morphology and dependency phases
//!
//! A [`Tagger`] turns an inscription into tokens carrying lemma, part of
//! speech, case and a shallow dependency relation. [`TaggerBackend`] wraps
//! a tagger loader and initializes it at most once per process; a failed
//! load is cached as "unavailable" and the dependent phases are skipped.

use std::sync::Arc;

use latinepi_core::{GrammaticalCase, TaggerKind};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

use crate::rule_tagger::RuleTagger;

/// Universal Dependencies coarse part of speech
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PartOfSpeech {
    #[serde(rename = "PROPN")]
    ProperNoun,
    #[serde(rename = "NOUN")]
    Noun,
    #[serde(rename = "VERB")]
    Verb,
    #[serde(rename = "ADJ")]
    Adj,
    #[serde(rename = "CCONJ")]
    Cconj,
    #[serde(rename = "NUM")]
    Num,
    #[serde(rename = "X")]
    X,
}

impl PartOfSpeech {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ProperNoun => "PROPN",
            Self::Noun => "NOUN",
            Self::Verb => "VERB",
            Self::Adj => "ADJ",
            Self::Cconj => "CCONJ",
            Self::Num => "NUM",
            Self::X => "X",
        }
    }

    pub fn is_nominal(&self) -> bool {
        matches!(self, Self::ProperNoun | Self::Noun)
    }
}

impl std::fmt::Display for PartOfSpeech {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Masculine,
    Feminine,
    Neuter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Number {
    Singular,
    Plural,
}

/// Inflectional features of one token
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Morphology {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub case: Option<GrammaticalCase>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<Gender>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number: Option<Number>,
}

/// Shallow dependency relation (UD labels)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DepRelation {
    Root,
    Nsubj,
    Flat,
    Conj,
    Cc,
    Iobj,
    Obj,
    Nmod,
    Appos,
    Obl,
    Amod,
    Nummod,
    Dep,
}

impl DepRelation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Root => "root",
            Self::Nsubj => "nsubj",
            Self::Flat => "flat",
            Self::Conj => "conj",
            Self::Cc => "cc",
            Self::Iobj => "iobj",
            Self::Obj => "obj",
            Self::Nmod => "nmod",
            Self::Appos => "appos",
            Self::Obl => "obl",
            Self::Amod => "amod",
            Self::Nummod => "nummod",
            Self::Dep => "dep",
        }
    }
}

impl std::fmt::Display for DepRelation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One tagged word
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    /// Position in the token sequence
    pub index: usize,
    /// Surface form, normalized spelling
    pub text: String,
    pub lemma: String,
    pub pos: PartOfSpeech,
    #[serde(default)]
    pub morph: Morphology,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relation: Option<DepRelation>,
    /// Index of the head token; `None` for the root
    #[serde(skip_serializing_if = "Option::is_none")]
    pub head: Option<usize>,
}

impl Token {
    pub fn case(&self) -> Option<GrammaticalCase> {
        self.morph.case
    }

    pub fn has_case(&self, case: GrammaticalCase) -> bool {
        self.morph.case == Some(case)
    }
}

/// Trait for tagging backends
pub trait Tagger: Send + Sync {
    /// Backend name for logging
    fn name(&self) -> &str;

    /// Tag an inscription
    fn tag(&self, text: &str) -> latinepi_core::Result<Vec<Token>>;
}

type Loader = Box<dyn Fn() -> anyhow::Result<Arc<dyn Tagger>> + Send + Sync>;

/// Lazily initialized, shareable tagging backend.
///
/// Initialization runs on first use and its outcome, success or failure,
/// is kept for the lifetime of the backend.
pub struct TaggerBackend {
    loader: Option<Loader>,
    cell: OnceCell<Option<Arc<dyn Tagger>>>,
}

impl TaggerBackend {
    /// Backend initialized by `loader` on first use
    pub fn new<F>(loader: F) -> Self
    where
        F: Fn() -> anyhow::Result<Arc<dyn Tagger>> + Send + Sync + 'static,
    {
        Self {
            loader: Some(Box::new(loader)),
            cell: OnceCell::new(),
        }
    }

    /// Backend wrapping an already constructed tagger
    pub fn ready(tagger: Arc<dyn Tagger>) -> Self {
        Self {
            loader: None,
            cell: OnceCell::with_value(Some(tagger)),
        }
    }

    /// Backend that never provides a tagger
    pub fn unavailable() -> Self {
        Self {
            loader: None,
            cell: OnceCell::with_value(None),
        }
    }

    /// Built-in rule tagger
    pub fn rule() -> Self {
        Self::new(|| Ok(Arc::new(RuleTagger::new()) as Arc<dyn Tagger>))
    }

    pub fn from_kind(kind: TaggerKind) -> Self {
        match kind {
            TaggerKind::Rule => Self::rule(),
            TaggerKind::None => Self::unavailable(),
        }
    }

    /// The tagger, loading it on first call
    pub fn get(&self) -> Option<Arc<dyn Tagger>> {
        self.cell
            .get_or_init(|| {
                let loader = self.loader.as_ref()?;
                match loader() {
                    Ok(tagger) => {
                        tracing::info!("Tagging backend '{}' loaded", tagger.name());
                        Some(tagger)
                    }
                    Err(e) => {
                        tracing::warn!("Tagging backend unavailable: {}", e);
                        None
                    }
                }
            })
            .clone()
    }

    /// Whether a load has been attempted and succeeded
    pub fn is_loaded(&self) -> bool {
        matches!(self.cell.get(), Some(Some(_)))
    }
}

impl Default for TaggerBackend {
    fn default() -> Self {
        Self::rule()
    }
}

impl std::fmt::Debug for TaggerBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match self.cell.get() {
            None => "pending",
            Some(None) => "unavailable",
            Some(Some(_)) => "loaded",
        };
        f.debug_struct("TaggerBackend").field("state", &state).finish()
    }
}
