use std::collections::HashSet;
use std::path::Path;

use tracing::info;

use skein_common::{dataset, EmbeddingRecord, SkeinError};

/// Load the embedding dataset for clustering: read, dedup by link, check
/// vector dimensions.
pub fn load_dataset(path: &Path) -> Result<Vec<EmbeddingRecord>, SkeinError> {
    let records = dataset::read_records(path)?;
    let total = records.len();
    let records = dedup_by_link(records);
    if records.len() < total {
        info!(
            dropped = total - records.len(),
            kept = records.len(),
            "dropped duplicate links"
        );
    }
    validate_dimensions(&records)?;
    Ok(records)
}

/// Keep the first-encountered row per link, in file order.
pub fn dedup_by_link(records: Vec<EmbeddingRecord>) -> Vec<EmbeddingRecord> {
    let mut seen = HashSet::new();
    records
        .into_iter()
        .filter(|r| seen.insert(r.link.clone()))
        .collect()
}

/// Every vector must be nonempty and of the same dimensionality. A mismatch
/// means the dataset mixes embedding models and the run cannot continue.
pub fn validate_dimensions(records: &[EmbeddingRecord]) -> Result<(), SkeinError> {
    let Some(first) = records.first() else {
        return Ok(());
    };
    let dims = first.embedding.len();
    if dims == 0 {
        return Err(SkeinError::DataFormat(format!(
            "empty embedding vector for {}",
            first.link
        )));
    }
    for record in records {
        if record.embedding.len() != dims {
            return Err(SkeinError::DataFormat(format!(
                "embedding for {} has {} dims, expected {}",
                record.link,
                record.embedding.len(),
                dims
            )));
        }
    }
    Ok(())
}
