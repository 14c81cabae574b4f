//! Row codec for the CSV store file.
//!
//! One row per record with the columns `id`, `payload` and `vector`. The
//! payload is a JSON object (`{}` when empty) and the vector a JSON array of
//! floats, or the literal `null`. Columns are located by header name, so files
//! written with a different column order still load.

use std::fs::File;
use std::io::{BufReader, Write};
use std::path::Path;

use serde_json::Value;
use tempfile::NamedTempFile;
use tracing::warn;

use crate::error::{VectorError, VectorResult};
use crate::models::{CONTENT_KEY, Payload, VectorRecord};

pub const HEADERS: [&str; 3] = ["id", "payload", "vector"];
pub const NULL_VECTOR: &str = "null";

/// Column positions resolved from the header row
#[derive(Debug, Clone, Copy)]
struct Columns {
    id: usize,
    payload: Option<usize>,
    vector: Option<usize>,
}

impl Columns {
    fn resolve(headers: &csv::StringRecord) -> VectorResult<Option<Self>> {
        if headers.is_empty() || headers.iter().all(|h| h.trim().is_empty()) {
            return Ok(None);
        }

        let position = |name: &str| headers.iter().position(|h| h.trim() == name);

        let id = position("id").ok_or_else(|| VectorError::MalformedRecord {
            location: "header".to_string(),
            reason: "missing 'id' column".to_string(),
        })?;

        Ok(Some(Self {
            id,
            payload: position("payload"),
            vector: position("vector"),
        }))
    }
}

/// Reads every row of `path`.
///
/// Rows whose vector cannot be parsed are kept with `vector: None`. A row
/// without an id aborts the load, since it could not be addressed afterwards.
pub fn read_records(path: &Path) -> VectorResult<Vec<VectorRecord>> {
    let file = File::open(path)?;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(BufReader::new(file));

    let Some(columns) = Columns::resolve(reader.headers()?)? else {
        return Ok(Vec::new());
    };

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        let line = row.position().map(|p| p.line()).unwrap_or_default();
        records.push(decode_row(&row, columns, line)?);
    }

    Ok(records)
}

fn decode_row(row: &csv::StringRecord, columns: Columns, line: u64) -> VectorResult<VectorRecord> {
    let id = row.get(columns.id).unwrap_or_default().trim();
    if id.is_empty() {
        return Err(VectorError::MalformedRecord {
            location: format!("line {}", line),
            reason: "empty id".to_string(),
        });
    }

    let payload = columns
        .payload
        .and_then(|i| row.get(i))
        .map(decode_payload)
        .unwrap_or_default();

    let vector = match columns.vector.and_then(|i| row.get(i)) {
        Some(raw) => decode_vector(raw).unwrap_or_else(|reason| {
            warn!(id, line, %reason, "Keeping record without a usable vector");
            None
        }),
        None => None,
    };

    Ok(VectorRecord {
        id: id.to_string(),
        vector,
        payload,
    })
}

/// Non-object payload text is kept verbatim under `content`.
fn decode_payload(raw: &str) -> Payload {
    let raw = raw.trim();
    if raw.is_empty() {
        return Payload::new();
    }

    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => map,
        _ => {
            let mut payload = Payload::new();
            payload.insert(CONTENT_KEY.to_string(), Value::String(raw.to_string()));
            payload
        }
    }
}

/// `Ok(None)` for the null marker, `Err` for anything unparseable.
fn decode_vector(raw: &str) -> Result<Option<Vec<f32>>, String> {
    let raw = raw.trim();
    if raw.is_empty() || raw.eq_ignore_ascii_case(NULL_VECTOR) {
        return Ok(None);
    }

    let values: Vec<f32> = serde_json::from_str(raw).map_err(|e| e.to_string())?;
    if values.is_empty() {
        return Err("empty vector".to_string());
    }
    if values.iter().any(|v| !v.is_finite()) {
        return Err("vector contains non-finite values".to_string());
    }

    Ok(Some(values))
}

fn encode_row(record: &VectorRecord) -> VectorResult<[String; 3]> {
    let payload = serde_json::to_string(&record.payload)?;
    let vector = match &record.vector {
        Some(values) => serde_json::to_string(values)?,
        None => NULL_VECTOR.to_string(),
    };

    Ok([record.id.clone(), payload, vector])
}

/// Rewrites `path` with `records`.
///
/// Rows go to a temporary file in the same directory which then replaces
/// `path` by rename, so readers see either the old or the new file.
pub fn write_records(path: &Path, records: &[VectorRecord]) -> VectorResult<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir)?;
    {
        let mut writer = csv::Writer::from_writer(tmp.as_file_mut());
        writer.write_record(HEADERS)?;
        for record in records {
            writer.write_record(encode_row(record)?)?;
        }
        writer.flush()?;
    }

    tmp.as_file_mut().flush()?;
    tmp.as_file().sync_all()?;
    tmp.persist(path)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn write_raw(dir: &tempfile::TempDir, contents: &str) -> std::path::PathBuf {
        let path = dir.path().join("vectors.csv");
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vectors.csv");

        let mut payload = Payload::new();
        payload.insert("content".to_string(), json!("a, \"quoted\" value"));
        payload.insert("tags".to_string(), json!(["x", "y"]));
        let records = vec![
            VectorRecord::new("doc1", vec![0.1, 0.2, 0.3]).with_payload(payload),
            VectorRecord {
                id: "doc2".to_string(),
                vector: None,
                payload: Payload::new(),
            },
        ];

        write_records(&path, &records).unwrap();
        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.starts_with("id,payload,vector\n"));
        assert!(raw.contains("doc2,{},null"));

        assert_eq!(read_records(&path).unwrap(), records);
    }

    #[test]
    fn test_reads_columns_in_any_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_raw(
            &dir,
            "id,vector,payload\n\
             doc1,\"[0.1, 0.2, 0.3]\",\"{\"\"content\"\": \"\"Document 1\"\"}\"\n",
        );

        let records = read_records(&path).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].vector, Some(vec![0.1, 0.2, 0.3]));
        assert_eq!(records[0].content(), Some("Document 1"));
    }

    #[test]
    fn test_unparseable_vector_is_retained_as_null() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_raw(
            &dir,
            "id,payload,vector\ndoc1,{},not-a-vector\ndoc2,{},null\ndoc3,{},\n",
        );

        let records = read_records(&path).unwrap();
        assert_eq!(records.len(), 3);
        assert!(records.iter().all(VectorRecord::is_malformed));
    }

    #[test]
    fn test_plain_text_payload_becomes_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_raw(&dir, "id,payload,vector\ndoc1,just text,[1.0]\n");

        let records = read_records(&path).unwrap();
        assert_eq!(records[0].content(), Some("just text"));
    }

    #[test]
    fn test_empty_id_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_raw(&dir, "id,payload,vector\n,{},[1.0]\n");

        let err = read_records(&path).unwrap_err();
        assert!(matches!(err, VectorError::MalformedRecord { ref location, .. } if location == "line 2"));
    }

    #[test]
    fn test_missing_id_column_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_raw(&dir, "key,payload,vector\na,{},[1.0]\n");

        assert!(matches!(
            read_records(&path),
            Err(VectorError::MalformedRecord { .. })
        ));
    }

    #[test]
    fn test_empty_file_has_no_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_raw(&dir, "");
        assert!(read_records(&path).unwrap().is_empty());

        let path = write_raw(&dir, "id,payload,vector\n");
        assert!(read_records(&path).unwrap().is_empty());
    }
}
