use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::store::CandidateStore;
use crate::models::BuildingRecord;

pub const ENRICHED_FILE: &str = "buildings_enriched.json";
pub const EMBEDDINGS_FILE: &str = "buildings_with_embeddings.json";

/// Errors raised while reading the dataset from disk
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Expected a JSON array in {0}")]
    NotAnArray(PathBuf),
}

/// Load every region under `root` into a store.
///
/// Each region directory holds `buildings_enriched.json` and optionally
/// `buildings_with_embeddings.json`. Missing files are skipped; the region
/// name is the directory name.
pub fn load_store<S: AsRef<str>>(root: &Path, regions: &[S]) -> Result<CandidateStore, DatasetError> {
    let mut embeddings = HashMap::new();
    for region in regions {
        let path = root.join(region.as_ref()).join(EMBEDDINGS_FILE);
        if let Some(records) = read_array(&path)? {
            let before = embeddings.len();
            collect_embeddings(records, &mut embeddings);
            tracing::debug!("Loaded {} embeddings from {}", embeddings.len() - before, path.display());
        }
    }

    let mut buildings = Vec::new();
    for region in regions {
        let region = region.as_ref();
        let path = root.join(region).join(ENRICHED_FILE);
        let Some(records) = read_array(&path)? else {
            tracing::warn!("Dataset file {} not found, skipping region {}", path.display(), region);
            continue;
        };

        let mut skipped = 0usize;
        for record in records {
            match BuildingRecord::from_json(region, record) {
                Ok(b) => buildings.push(b),
                Err(_) => skipped += 1,
            }
        }
        if skipped > 0 {
            tracing::debug!("Skipped {} records without building_id in {}", skipped, path.display());
        }
    }

    let store = CandidateStore::from_parts(buildings, embeddings);
    tracing::info!(
        "Loaded {} buildings ({} with embeddings) from {}",
        store.len(),
        store.embedded_count(),
        root.display()
    );
    Ok(store)
}

/// Read a JSON array file, `None` when the file does not exist
fn read_array(path: &Path) -> Result<Option<Vec<Value>>, DatasetError> {
    if !path.exists() {
        return Ok(None);
    }

    let raw = std::fs::read_to_string(path).map_err(|source| DatasetError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let json: Value = serde_json::from_str(&raw).map_err(|source| DatasetError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    match json {
        Value::Array(items) => Ok(Some(items)),
        _ => Err(DatasetError::NotAnArray(path.to_path_buf())),
    }
}

fn collect_embeddings(records: Vec<Value>, out: &mut HashMap<String, Vec<f32>>) {
    for record in records {
        let Some(id) = record.get("building_id").and_then(Value::as_str) else {
            continue;
        };
        let Some(values) = record.get("embedding").and_then(Value::as_array) else {
            continue;
        };
        let vector: Option<Vec<f32>> = values.iter().map(|v| v.as_f64().map(|f| f as f32)).collect();
        if let Some(vector) = vector.filter(|v| !v.is_empty()) {
            out.insert(id.to_string(), vector);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("housing-dataset-{}-{}", name, uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn write(dir: &Path, region: &str, file: &str, value: Value) {
        let region_dir = dir.join(region);
        std::fs::create_dir_all(&region_dir).unwrap();
        std::fs::write(region_dir.join(file), value.to_string()).unwrap();
    }

    #[test]
    fn test_load_regions_and_merge_embeddings() {
        let root = scratch_dir("merge");
        write(
            &root,
            "san_mateo",
            ENRICHED_FILE,
            json!([
                {"building_id": "sm_1", "title": "One", "lat": 37.5, "lon": -122.3},
                {"title": "no id"},
                {"building_id": "sm_2", "title": "Two"}
            ]),
        );
        write(
            &root,
            "san_mateo",
            EMBEDDINGS_FILE,
            json!([
                {"building_id": "sm_1", "embedding": [0.5, 0.5]},
                {"building_id": "sm_2", "embedding": "broken"}
            ]),
        );
        write(&root, "santa_clara", ENRICHED_FILE, json!([{"building_id": "sc_1"}]));

        let store = load_store(&root, &["san_mateo", "santa_clara", "alameda"]).unwrap();

        assert_eq!(store.len(), 3);
        assert_eq!(store.embedded_count(), 1);
        assert_eq!(store.get("sm_1").unwrap().region, "san_mateo");
        assert_eq!(store.get("sc_1").unwrap().region, "santa_clara");
        assert!(store.get("sm_2").unwrap().embedding.is_none());

        std::fs::remove_dir_all(root).ok();
    }

    #[test]
    fn test_missing_root_yields_empty_store() {
        let root = std::env::temp_dir().join(format!("housing-missing-{}", uuid::Uuid::new_v4()));
        let store = load_store(&root, &["san_francisco"]).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let root = scratch_dir("malformed");
        write(&root, "sf", ENRICHED_FILE, json!({"not": "an array"}));
        assert!(matches!(load_store(&root, &["sf"]), Err(DatasetError::NotAnArray(_))));
        std::fs::remove_dir_all(root).ok();
    }
}
