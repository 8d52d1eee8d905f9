//! One line of an annotated JSON Lines corpus

use latinepi_core::Annotation;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Annotated corpus record
///
/// Fields other than `id`, `transcription` and `annotations` are kept
/// verbatim so that a processing step never loses data it does not own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorpusRecord {
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub id: Value,
    #[serde(default)]
    pub transcription: String,
    #[serde(default)]
    pub annotations: Vec<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CorpusRecord {
    pub fn new(transcription: impl Into<String>, annotations: &[Annotation]) -> Self {
        let mut record = Self {
            id: Value::Null,
            transcription: transcription.into(),
            annotations: Vec::new(),
            extra: Map::new(),
        };
        record.set_annotations(annotations);
        record
    }

    pub fn with_id(mut self, id: impl Into<Value>) -> Self {
        self.id = id.into();
        self
    }

    pub fn from_json_line(line: &str) -> latinepi_core::Result<Self> {
        Ok(serde_json::from_str(line)?)
    }

    pub fn to_json_line(&self) -> latinepi_core::Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Well-formed annotations and the number of malformed entries skipped
    pub fn parse_annotations(&self) -> (Vec<Annotation>, usize) {
        let mut parsed = Vec::with_capacity(self.annotations.len());
        let mut malformed = 0;
        for value in &self.annotations {
            match serde_json::from_value::<Annotation>(value.clone()) {
                Ok(annotation) => parsed.push(annotation),
                Err(e) => {
                    tracing::debug!("Skipping malformed annotation {}: {}", value, e);
                    malformed += 1;
                }
            }
        }
        (parsed, malformed)
    }

    pub fn set_annotations(&mut self, annotations: &[Annotation]) {
        self.annotations = annotations
            .iter()
            .filter_map(|a| serde_json::to_value(a).ok())
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use latinepi_core::Label;
    use serde_json::json;

    #[test]
    fn test_unknown_fields_survive() {
        let line = r#"{"id":"HD000001","transcription":"D M","annotations":[[0,3,"DEDICATION_TO_THE_GODS"]],"source":"EDH"}"#;
        let record = CorpusRecord::from_json_line(line).unwrap();
        assert_eq!(record.extra["source"], "EDH");

        let written: Value = serde_json::from_str(&record.to_json_line().unwrap()).unwrap();
        assert_eq!(written["source"], "EDH");
        assert_eq!(written["id"], "HD000001");
    }

    #[test]
    fn test_parse_annotations_counts_malformed() {
        let record = CorpusRecord {
            id: Value::Null,
            transcription: "GAIUS IULIUS".to_string(),
            annotations: vec![
                json!([0, 5, "PRAENOMEN"]),
                json!([6, 12, "NOT_A_LABEL"]),
                json!({"start": 6}),
            ],
            extra: Map::new(),
        };
        let (annotations, malformed) = record.parse_annotations();
        assert_eq!(annotations, vec![Annotation::new(0, 5, Label::Praenomen)]);
        assert_eq!(malformed, 2);
    }

    #[test]
    fn test_missing_fields_default() {
        let record = CorpusRecord::from_json_line("{}").unwrap();
        assert!(record.transcription.is_empty());
        assert!(record.annotations.is_empty());
        assert!(!record.to_json_line().unwrap().contains("\"id\""));
    }

    #[test]
    fn test_set_annotations_wire_format() {
        let record = CorpusRecord::new("IULIA", &[Annotation::new(0, 5, Label::Nomen)]).with_id(7);
        assert_eq!(record.annotations, vec![json!([0, 5, "NOMEN"])]);
        assert_eq!(record.id, json!(7));
    }
}
