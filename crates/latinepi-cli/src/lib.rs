//! latinepi CLI support
//!
//! File-level collaborators of the `latinepi` binary: reading inscription
//! files and flattening extraction results for output.

pub mod input;
pub mod output;

pub use input::{read_inscriptions, InscriptionRecord};
pub use output::{flatten_entities, write_results, FlattenOptions};
