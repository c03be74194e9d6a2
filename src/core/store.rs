use std::collections::HashMap;
use std::sync::Arc;

use crate::models::BuildingRecord;

/// Read-only collection of buildings keyed by identifier.
///
/// Built once per dataset load; a refresh builds a new store and swaps it in
/// whole, so records are never mutated in place.
#[derive(Debug, Default)]
pub struct CandidateStore {
    buildings: Vec<Arc<BuildingRecord>>,
    index: HashMap<String, usize>,
}

impl CandidateStore {
    /// Merge building records with embeddings by identifier.
    ///
    /// Embeddings may cover any subset of buildings. The first record seen for
    /// a duplicated identifier wins.
    pub fn from_parts(
        buildings: impl IntoIterator<Item = BuildingRecord>,
        mut embeddings: HashMap<String, Vec<f32>>,
    ) -> Self {
        let mut store = Self::default();

        for mut building in buildings {
            if store.index.contains_key(&building.id) {
                tracing::warn!("Duplicate building id {} in dataset, keeping first", building.id);
                continue;
            }
            if building.embedding.is_none() {
                building.embedding = embeddings.remove(&building.id).filter(|e| !e.is_empty());
            }
            store.index.insert(building.id.clone(), store.buildings.len());
            store.buildings.push(Arc::new(building));
        }

        store
    }

    pub fn len(&self) -> usize {
        self.buildings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buildings.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Arc<BuildingRecord>> {
        self.index.get(id).map(|&i| &self.buildings[i])
    }

    pub fn buildings(&self) -> &[Arc<BuildingRecord>] {
        &self.buildings
    }

    pub fn embedded_count(&self) -> usize {
        self.buildings.iter().filter(|b| b.embedding.is_some()).count()
    }
}
