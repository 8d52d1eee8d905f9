//! Line-by-line corpus processing
//!
//! Records are handled one at a time and written as soon as they are done,
//! so memory stays flat regardless of corpus size. A line that is not a
//! JSON object is copied to the output untouched and counted.

use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use latinepi_core::Annotation;
use serde::{Deserialize, Serialize};

use crate::record::CorpusRecord;
use crate::rules::AnnotationRuleEngine;
use crate::spacing::SpacingNormalizer;

/// Which reconciliation to run over each record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStep {
    FixSpacing,
    FixAnnotations,
    /// Spacing repair followed by rule reconciliation
    Clean,
}

impl BatchStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FixSpacing => "fix_spacing",
            Self::FixAnnotations => "fix_annotations",
            Self::Clean => "clean",
        }
    }

    fn fixes_spacing(&self) -> bool {
        matches!(self, Self::FixSpacing | Self::Clean)
    }

    fn fixes_annotations(&self) -> bool {
        matches!(self, Self::FixAnnotations | Self::Clean)
    }
}

impl std::fmt::Display for BatchStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchStatistics {
    pub total_records: usize,
    pub modified_records: usize,
    pub spacing_changes: usize,
    /// Annotations lost because their span became invalid after a text edit
    pub dropped_after_adjustment: usize,
    pub annotations_removed: usize,
    pub annotations_added: usize,
    pub malformed_annotations: usize,
    pub unparseable_lines: usize,
}

impl BatchStatistics {
    fn log_summary(&self, step: BatchStep) {
        tracing::info!(
            step = %step,
            total = self.total_records,
            modified = self.modified_records,
            "Corpus pass complete"
        );
        if step.fixes_spacing() {
            tracing::info!(
                "Spacing: {} changes, {} annotations dropped after adjustment",
                self.spacing_changes,
                self.dropped_after_adjustment
            );
        }
        if step.fixes_annotations() {
            tracing::info!(
                "Annotations: {} removed, {} added",
                self.annotations_removed,
                self.annotations_added
            );
        }
        if self.malformed_annotations > 0 || self.unparseable_lines > 0 {
            tracing::warn!(
                "Skipped {} malformed annotations and {} unparseable lines",
                self.malformed_annotations,
                self.unparseable_lines
            );
        }
    }
}

#[derive(Debug, Clone)]
pub struct BatchProcessor {
    step: BatchStep,
    spacing: SpacingNormalizer,
    rules: AnnotationRuleEngine,
}

impl BatchProcessor {
    pub fn new(step: BatchStep) -> Self {
        Self {
            step,
            spacing: SpacingNormalizer::new(),
            rules: AnnotationRuleEngine::new(),
        }
    }

    pub fn with_rules(mut self, rules: AnnotationRuleEngine) -> Self {
        self.rules = rules;
        self
    }

    pub fn step(&self) -> BatchStep {
        self.step
    }

    pub fn process_file(
        &self,
        input: impl AsRef<Path>,
        output: impl AsRef<Path>,
    ) -> latinepi_core::Result<BatchStatistics> {
        let (input, output) = (input.as_ref(), output.as_ref());
        tracing::info!("Running {} on {} -> {}", self.step, input.display(), output.display());

        let reader = BufReader::new(File::open(input)?);
        let writer = BufWriter::new(File::create(output)?);
        self.process(reader, writer)
    }

    pub fn process<R: BufRead, W: Write>(
        &self,
        input: R,
        mut output: W,
    ) -> latinepi_core::Result<BatchStatistics> {
        let mut stats = BatchStatistics::default();

        for (line_no, line) in input.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                writeln!(output, "{line}")?;
                continue;
            }

            let record = match CorpusRecord::from_json_line(&line) {
                Ok(record) => record,
                Err(e) => {
                    tracing::warn!("Line {}: not a corpus record ({}), copied as is", line_no + 1, e);
                    stats.unparseable_lines += 1;
                    writeln!(output, "{line}")?;
                    continue;
                }
            };

            stats.total_records += 1;
            let record = self.process_record(record, &mut stats);
            writeln!(output, "{}", record.to_json_line()?)?;
        }

        output.flush()?;
        stats.log_summary(self.step);
        Ok(stats)
    }

    /// Apply the configured step to one record
    ///
    /// Malformed annotation entries are removed from the record.
    pub fn process_record(&self, mut record: CorpusRecord, stats: &mut BatchStatistics) -> CorpusRecord {
        let (original, malformed) = record.parse_annotations();
        stats.malformed_annotations += malformed;

        let mut transcription = record.transcription.clone();
        let mut annotations = original.clone();

        if self.step.fixes_spacing() {
            let result = self.spacing.normalize(&transcription, &annotations);
            stats.spacing_changes += result.changes.len();
            stats.dropped_after_adjustment += result.dropped;
            transcription = result.transcription;
            annotations = result.annotations;
        }

        if self.step.fixes_annotations() {
            let reconciled = self.rules.reconcile(&transcription, &annotations);
            let before: BTreeSet<Annotation> = annotations.iter().copied().collect();
            let after: BTreeSet<Annotation> = reconciled.iter().copied().collect();
            stats.annotations_removed += before.difference(&after).count();
            stats.annotations_added += after.difference(&before).count();
            annotations = reconciled;
        }

        if transcription != record.transcription || annotations != original || malformed > 0 {
            stats.modified_records += 1;
            record.transcription = transcription;
            record.set_annotations(&annotations);
        }
        record
    }
}
