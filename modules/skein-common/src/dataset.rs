//! File formats shared by the batch jobs: the JSON Lines embedding dataset
//! and the final JSON cluster artifact. Writes go through a temp file and a
//! rename so a fatal error never leaves a partial output at the destination.

use std::fs;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use serde::Serialize;

use crate::error::SkeinError;
use crate::types::EmbeddingRecord;

/// Write the embedding dataset: one JSON object per line, file order
/// preserved.
pub fn write_records(path: &Path, records: &[EmbeddingRecord]) -> Result<(), SkeinError> {
    atomic_write(path, |out| {
        for record in records {
            let line = serde_json::to_string(record)
                .map_err(|e| SkeinError::DataFormat(e.to_string()))?;
            writeln!(out, "{line}").map_err(io_err(path))?;
        }
        Ok(())
    })
}

/// Read the embedding dataset back, in file order. Blank lines are skipped;
/// a malformed line is a fatal `DataFormat` error.
pub fn read_records(path: &Path) -> Result<Vec<EmbeddingRecord>, SkeinError> {
    let file = fs::File::open(path).map_err(io_err(path))?;
    let reader = BufReader::new(file);

    let mut records = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line.map_err(io_err(path))?;
        if line.trim().is_empty() {
            continue;
        }
        let record: EmbeddingRecord = serde_json::from_str(&line).map_err(|e| {
            SkeinError::DataFormat(format!("{}:{}: {e}", path.display(), idx + 1))
        })?;
        records.push(record);
    }
    Ok(records)
}

/// Write a pretty-printed JSON value (the cluster artifact).
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), SkeinError> {
    atomic_write(path, |out| {
        serde_json::to_writer_pretty(&mut *out, value)
            .map_err(|e| SkeinError::DataFormat(e.to_string()))?;
        writeln!(out).map_err(io_err(path))?;
        Ok(())
    })
}

fn atomic_write<F>(path: &Path, write: F) -> Result<(), SkeinError>
where
    F: FnOnce(&mut BufWriter<fs::File>) -> Result<(), SkeinError>,
{
    let tmp = path.with_extension("tmp");
    let file = fs::File::create(&tmp).map_err(io_err(&tmp))?;
    let mut out = BufWriter::new(file);

    write(&mut out)?;
    out.flush().map_err(io_err(&tmp))?;
    drop(out);

    fs::rename(&tmp, path).map_err(io_err(path))?;
    Ok(())
}

fn io_err(path: &Path) -> impl Fn(std::io::Error) -> SkeinError + '_ {
    move |e| SkeinError::Io(format!("{}: {e}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(link: &str) -> EmbeddingRecord {
        EmbeddingRecord {
            link: link.to_string(),
            title: "T".to_string(),
            summary: "S".to_string(),
            tags: vec!["news".to_string()],
            combined: "Title: T\n\nContent: S".to_string(),
            n_tokens: 5,
            embedding: vec![0.1, 0.2, 0.3],
        }
    }

    #[test]
    fn dataset_round_trips_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("embeddings.jsonl");

        let records = vec![record("https://a.test"), record("https://b.test")];
        write_records(&path, &records).unwrap();

        let back = read_records(&path).unwrap();
        assert_eq!(back.len(), 2);
        assert_eq!(back[0].link, "https://a.test");
        assert_eq!(back[1].link, "https://b.test");
        assert_eq!(back[0].embedding, vec![0.1, 0.2, 0.3]);
    }

    #[test]
    fn malformed_line_is_a_data_format_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.jsonl");
        fs::write(&path, "not json\n").unwrap();

        let err = read_records(&path).unwrap_err();
        assert!(matches!(err, SkeinError::DataFormat(_)));
    }
}
