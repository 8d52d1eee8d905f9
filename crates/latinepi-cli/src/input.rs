//! Inscription file reading (CSV with header row, or JSON)

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use latinepi_core::{EpiError, Result};
use serde_json::{Map, Value};

/// One input row: column or key name to value
pub type InscriptionRecord = Map<String, Value>;

/// Read all inscriptions from a `.csv` or `.json` file
///
/// A JSON file holds either a list of objects or a single object.
pub fn read_inscriptions(path: impl AsRef<Path>) -> Result<Vec<InscriptionRecord>> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(EpiError::InvalidInput(format!(
            "File not found: {}",
            path.display()
        )));
    }

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    match extension.as_str() {
        "csv" => read_csv(path),
        "json" => read_json(path),
        other => Err(EpiError::UnsupportedFormat(format!(
            "'.{other}'; only .csv and .json are supported"
        ))),
    }
}

fn read_csv(path: &Path) -> Result<Vec<InscriptionRecord>> {
    let mut reader = csv::Reader::from_path(path).map_err(csv_error)?;
    let headers = reader.headers().map_err(csv_error)?.clone();

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row.map_err(csv_error)?;
        let record: InscriptionRecord = headers
            .iter()
            .zip(row.iter())
            .map(|(key, value)| (key.to_string(), Value::String(value.to_string())))
            .collect();
        records.push(record);
    }

    if records.is_empty() {
        return Err(EpiError::InvalidInput(
            "CSV file is empty or contains no data rows".to_string(),
        ));
    }
    tracing::debug!("Read {} rows from {}", records.len(), path.display());
    Ok(records)
}

fn csv_error(e: csv::Error) -> EpiError {
    EpiError::InvalidInput(format!("CSV parsing error: {e}"))
}

fn read_json(path: &Path) -> Result<Vec<InscriptionRecord>> {
    let reader = BufReader::new(File::open(path)?);
    let data: Value = serde_json::from_reader(reader).map_err(|e| {
        EpiError::InvalidInput(format!(
            "Invalid JSON at line {}, column {}: {}",
            e.line(),
            e.column(),
            e
        ))
    })?;

    match data {
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(i, item)| match item {
                Value::Object(record) => Ok(record),
                _ => Err(EpiError::InvalidInput(format!(
                    "JSON list must contain only objects (item {} is not)",
                    i + 1
                ))),
            })
            .collect(),
        Value::Object(record) => Ok(vec![record]),
        _ => Err(EpiError::InvalidInput(
            "JSON must be an object or a list of objects".to_string(),
        )),
    }
}

/// Inscription text from `text` or `Text`; `None` when missing or blank
pub fn record_text(record: &InscriptionRecord) -> Option<&str> {
    record
        .get("text")
        .or_else(|| record.get("Text"))
        .and_then(Value::as_str)
        .filter(|text| !text.trim().is_empty())
}

/// Identifier from `id` or `Id`
pub fn record_id(record: &InscriptionRecord) -> Option<&Value> {
    record.get("id").or_else(|| record.get("Id"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_text_fallbacks() {
        let record: InscriptionRecord = json!({"Text": "D M", "Id": 4}).as_object().unwrap().clone();
        assert_eq!(record_text(&record), Some("D M"));
        assert_eq!(record_id(&record), Some(&json!(4)));

        let blank: InscriptionRecord = json!({"text": "  "}).as_object().unwrap().clone();
        assert_eq!(record_text(&blank), None);
        assert_eq!(record_id(&blank), None);
    }
}
