//! latinepi Corpus - Annotation reconciliation pipeline
//!
//! Repairs machine-generated span annotations in a JSONL training corpus:
//! - [`SpacingNormalizer`] joins words split by digitization and recomputes
//!   every annotation offset
//! - [`AnnotationRuleEngine`] filters, merges and relabels spans with
//!   closed-lexicon rules
//! - [`BatchProcessor`] runs either step (or both) over a corpus file, one
//!   record at a time

pub mod batch;
pub mod record;
pub mod rules;
pub mod spacing;

pub use batch::{BatchProcessor, BatchStatistics, BatchStep};
pub use record::CorpusRecord;
pub use rules::AnnotationRuleEngine;
pub use spacing::{SpacingChange, SpacingNormalizer, SpacingResult};
