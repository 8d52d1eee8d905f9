//! Result flattening and JSON/CSV writing

use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use latinepi_core::{EntityMap, OutputConfig, OutputFormat, Result};
use serde_json::{Map, Number, Value};

pub const ID_COLUMN: &str = "inscription_id";

/// Caller-side confidence filter applied while flattening
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlattenOptions {
    pub confidence_threshold: f32,
    pub flag_ambiguous: bool,
}

impl FlattenOptions {
    pub fn new(confidence_threshold: f32) -> Self {
        Self {
            confidence_threshold,
            flag_ambiguous: false,
        }
    }

    pub fn with_flag_ambiguous(mut self, flag: bool) -> Self {
        self.flag_ambiguous = flag;
        self
    }
}

impl From<&OutputConfig> for FlattenOptions {
    fn from(config: &OutputConfig) -> Self {
        Self::new(config.confidence_threshold).with_flag_ambiguous(config.flag_ambiguous)
    }
}

/// Flatten entities into `slot`, `slot_confidence` and `slot_ambiguous`
///
/// Entities below the threshold are omitted unless ambiguity flagging is
/// on, in which case they are kept and marked.
pub fn flatten_entities(
    id: Option<&Value>,
    entities: &EntityMap,
    options: FlattenOptions,
) -> Map<String, Value> {
    let mut row = Map::new();
    if let Some(id) = id {
        row.insert(ID_COLUMN.to_string(), id.clone());
    }

    for (slot, entity) in entities {
        let below = entity.confidence < options.confidence_threshold;
        if below && !options.flag_ambiguous {
            continue;
        }
        row.insert(slot.clone(), Value::String(entity.value.clone()));
        row.insert(format!("{slot}_confidence"), confidence_value(entity.confidence));
        if below {
            row.insert(format!("{slot}_ambiguous"), Value::Bool(true));
        }
    }
    row
}

/// JSON number with the shortest decimal form of an `f32`
fn confidence_value(confidence: f32) -> Value {
    format!("{confidence}")
        .parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

pub fn write_results(
    path: impl AsRef<Path>,
    rows: &[Map<String, Value>],
    format: OutputFormat,
) -> Result<()> {
    let file = File::create(path.as_ref())?;
    match format {
        OutputFormat::Json => {
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, rows)?;
            writeln!(writer)?;
            writer.flush()?;
        }
        OutputFormat::Csv => write_csv(file, rows)?,
    }
    Ok(())
}

/// `inscription_id` first, then every other key in sorted order
pub fn csv_columns(rows: &[Map<String, Value>]) -> Vec<String> {
    let keys: BTreeSet<&String> = rows.iter().flat_map(|row| row.keys()).collect();
    let mut columns: Vec<String> = Vec::with_capacity(keys.len());
    if keys.iter().any(|k| k.as_str() == ID_COLUMN) {
        columns.push(ID_COLUMN.to_string());
    }
    columns.extend(
        keys.into_iter()
            .filter(|k| k.as_str() != ID_COLUMN)
            .cloned(),
    );
    columns
}

fn write_csv<W: Write>(writer: W, rows: &[Map<String, Value>]) -> Result<()> {
    if rows.is_empty() {
        return Ok(());
    }
    let columns = csv_columns(rows);
    let mut writer = csv::Writer::from_writer(writer);
    writer.write_record(&columns).map_err(anyhow::Error::from)?;
    for row in rows {
        let cells = columns.iter().map(|column| match row.get(column) {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        });
        writer.write_record(cells).map_err(anyhow::Error::from)?;
    }
    writer.flush()?;
    Ok(())
}
