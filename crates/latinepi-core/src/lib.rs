//! latinepi Core - Shared data model, errors, and text helpers
//!
//! This crate defines the abstractions shared by both pipelines:
//! - Inscriptions and character-offset annotations (corpus format)
//! - Extracted entities with confidence and provenance
//! - Text normalization for Latin epigraphic transcriptions
//! - Roman numeral conversion
//! - Configuration management

pub mod annotation;
pub mod config;
pub mod entity;
pub mod numeral;
pub mod text;

pub use annotation::{Annotation, Inscription, Label};
pub use config::{
    AppConfig, ConfigError, ExtractionConfig, LoggingConfig, OutputConfig, OutputFormat, TaggerKind,
};
pub use entity::{
    Agreement, Alternative, ConfidenceSource, Entity, EntityMap, GrammaticalCase, Phase,
};

use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Core error types for latinepi operations
#[derive(Error, Debug)]
pub enum EpiError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Tagger error: {0}")]
    Tagger(String),

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, EpiError>;
