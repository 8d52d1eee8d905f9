//! Corpus reconciliation integration tests

use std::fs;

use latinepi_core::text::{char_len, slice_chars};
use latinepi_core::{Annotation, Label};
use latinepi_corpus::{AnnotationRuleEngine, BatchProcessor, BatchStep, SpacingNormalizer};
use proptest::prelude::*;
use serde_json::Value;

// =============================================================================
// Scenarios
// =============================================================================

#[test]
fn test_split_name_scenario() {
    let result = SpacingNormalizer::new().normalize(
        "D M ANTO NINI FILIO",
        &[
            Annotation::new(4, 13, Label::Cognomen),
            Annotation::new(14, 19, Label::Relationship),
        ],
    );

    assert_eq!(result.transcription, "D M ANTONINI FILIO");
    assert_eq!(result.annotations[0], Annotation::new(4, 12, Label::Cognomen));
    assert_eq!(
        slice_chars(&result.transcription, 13, 18),
        Some("FILIO")
    );
    assert_eq!(result.annotations[1], Annotation::new(13, 18, Label::Relationship));
}

#[test]
fn test_formula_merge_scenario() {
    let text = "DIS MANIBUS SACRUM AURELIAE";
    let annotations = [
        Annotation::new(0, 3, Label::Nomen),
        Annotation::new(4, 11, Label::Nomen),
        Annotation::new(12, 18, Label::Cognomen),
        Annotation::new(19, 27, Label::Nomen),
    ];
    let result = AnnotationRuleEngine::new().reconcile(text, &annotations);
    assert_eq!(
        result,
        vec![
            Annotation::new(0, 18, Label::DedicationToTheGods),
            Annotation::new(19, 27, Label::Nomen),
        ]
    );
}

#[test]
fn test_age_numeral_scenario() {
    let engine = AnnotationRuleEngine::new();
    let text = "ANNIS XXV";

    let with_prefix = engine.reconcile(
        text,
        &[
            Annotation::new(0, 5, Label::AgePrefix),
            Annotation::new(6, 9, Label::Cognomen),
        ],
    );
    assert_eq!(with_prefix[1].label, Label::AgeYears);

    let alone = engine.reconcile(text, &[Annotation::new(6, 9, Label::Cognomen)]);
    assert_eq!(alone, vec![Annotation::new(6, 9, Label::Cognomen)]);
}

#[test]
fn test_clean_file_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("corpus.jsonl");
    let output = dir.path().join("cleaned.jsonl");
    fs::write(
        &input,
        concat!(
            r#"{"id":1,"transcription":"D M IULIAE UIXIT AN NIS XXV","annotations":[[0,3,"NOMEN"],[4,10,"NOMEN"],[11,16,"AGE_PREFIX"],[24,27,"COGNOMEN"]],"region":"Baetica"}"#,
            "\n",
            r#"{"id":2,"transcription":"GAIUS","annotations":[]}"#,
            "\n",
        ),
    )
    .unwrap();

    let stats = BatchProcessor::new(BatchStep::Clean)
        .process_file(&input, &output)
        .unwrap();
    assert_eq!(stats.total_records, 2);
    assert_eq!(stats.modified_records, 1);
    assert_eq!(stats.spacing_changes, 1);

    let written = fs::read_to_string(&output).unwrap();
    let first: Value = serde_json::from_str(written.lines().next().unwrap()).unwrap();
    assert_eq!(first["transcription"], "D M IULIAE UIXIT ANNIS XXV");
    assert_eq!(first["region"], "Baetica");
    assert_eq!(
        first["annotations"],
        serde_json::json!([
            [0, 3, "DEDICATION_TO_THE_GODS"],
            [4, 10, "NOMEN"],
            [11, 16, "AGE_PREFIX"],
            [23, 26, "AGE_YEARS"]
        ])
    );
}

#[test]
fn test_missing_input_file() {
    let dir = tempfile::tempdir().unwrap();
    let result = BatchProcessor::new(BatchStep::FixSpacing)
        .process_file(dir.path().join("absent.jsonl"), dir.path().join("out.jsonl"));
    assert!(result.is_err());
}

// =============================================================================
// Properties
// =============================================================================

fn corpus_word() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("D M".to_string()),
        Just("DIS MANIBUS".to_string()),
        Just("ANTO NINI".to_string()),
        Just("fe cit".to_string()),
        Just("AN NIS".to_string()),
        Just("VIXIT".to_string()),
        Just("PIAE".to_string()),
        Just("ET".to_string()),
        Just("FILIAE".to_string()),
        Just("PEDES".to_string()),
        Just("FRONTE".to_string()),
        Just("B M".to_string()),
        "[IVX]{1,4}",
        "[A-Z]{2,7}",
    ]
}

fn record() -> impl Strategy<Value = (String, Vec<Annotation>)> {
    prop::collection::vec(corpus_word(), 1..10)
        .prop_map(|words| words.join(" "))
        .prop_flat_map(|text| {
            let len = char_len(&text);
            let span = (0..len, 1..=len.max(1), prop::sample::select(Label::ALL.to_vec()))
                .prop_map(|(start, end, label)| Annotation::new(start, end, label));
            (Just(text), prop::collection::vec(span, 0..8))
        })
}

proptest! {
    #[test]
    fn prop_spacing_offsets_valid((text, annotations) in record()) {
        let result = SpacingNormalizer::new().normalize(&text, &annotations);
        let len = char_len(&result.transcription);
        for annotation in &result.annotations {
            prop_assert!(annotation.start < annotation.end);
            prop_assert!(annotation.end <= len);
        }
        prop_assert_eq!(result.annotations.len() + result.dropped, annotations.len());
    }

    #[test]
    fn prop_reconcile_idempotent((text, annotations) in record()) {
        let engine = AnnotationRuleEngine::new();
        let once = engine.reconcile(&text, &annotations);
        let twice = engine.reconcile(&text, &once);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn prop_reconcile_offsets_valid((text, annotations) in record()) {
        let len = char_len(&text);
        for annotation in AnnotationRuleEngine::new().reconcile(&text, &annotations) {
            prop_assert!(annotation.is_valid_for(len));
        }
    }
}
