/// HNSW graph for one collection
use hnsw_rs::prelude::*;
use std::collections::HashMap;
use thiserror::Error;

/// HNSW layer cap used by hnsw_rs
const MAX_LAYER: usize = 16;

#[derive(Error, Debug)]
pub enum GraphError {
    #[error("Invalid dimension: expected {expected}, got {actual}")]
    InvalidDimension { expected: usize, actual: usize },
}

/// HNSW construction and search parameters
#[derive(Debug, Clone, Copy)]
pub struct GraphParams {
    pub m: usize,
    pub ef_construction: usize,
    pub ef_search: usize,
    pub max_elements: usize,
}

impl Default for GraphParams {
    fn default() -> Self {
        Self {
            m: 16,
            ef_construction: 200,
            ef_search: 64,
            max_elements: 100_000,
        }
    }
}

struct LiveEntry {
    slot: usize,
    vector: Vec<f32>,
}

/// Approximate nearest-neighbor graph keyed by chunk row id
///
/// hnsw_rs cannot delete points, so every changed vector takes a new slot and
/// the `live` map records which slot currently represents each row. Search
/// over-fetches by the number of stale slots and drops them; if that still
/// leaves too few hits, it scans the live vectors exactly. Distance is cosine
/// distance (`1 - cos`), lower is closer.
pub struct CollectionGraph {
    hnsw: Hnsw<'static, f32, DistCosine>,
    /// row id per slot
    slots: Vec<i64>,
    /// row id -> current slot and vector
    live: HashMap<i64, LiveEntry>,
    dimension: usize,
    params: GraphParams,
}

impl CollectionGraph {
    /// Create an empty graph
    pub fn new(dimension: usize, params: GraphParams) -> Self {
        Self {
            hnsw: new_hnsw(params),
            slots: Vec::new(),
            live: HashMap::new(),
            dimension,
            params,
        }
    }

    /// Build a graph from persisted (row id, vector) pairs
    pub fn build(
        dimension: usize,
        params: GraphParams,
        items: Vec<(i64, Vec<f32>)>,
    ) -> Result<Self, GraphError> {
        let mut graph = Self::new(dimension, params);
        for (row, vector) in items {
            graph.upsert(row, vector)?;
        }
        Ok(graph)
    }

    /// Insert a vector, replacing any previous vector for the same row
    ///
    /// Returns false when the row already holds exactly this vector, in which
    /// case the graph is left untouched.
    pub fn upsert(&mut self, row: i64, vector: Vec<f32>) -> Result<bool, GraphError> {
        if vector.len() != self.dimension {
            return Err(GraphError::InvalidDimension {
                expected: self.dimension,
                actual: vector.len(),
            });
        }

        if self.live.get(&row).is_some_and(|entry| entry.vector == vector) {
            return Ok(false);
        }

        let slot = self.slots.len();
        self.hnsw.insert((vector.as_slice(), slot));
        self.slots.push(row);
        self.live.insert(row, LiveEntry { slot, vector });

        Ok(true)
    }

    /// Forget a row; its slot becomes stale
    pub fn remove(&mut self, row: i64) -> bool {
        self.live.remove(&row).is_some()
    }

    /// k nearest live rows with their distances, ascending
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(i64, f32)>, GraphError> {
        if query.len() != self.dimension {
            return Err(GraphError::InvalidDimension {
                expected: self.dimension,
                actual: query.len(),
            });
        }

        if k == 0 || self.live.is_empty() {
            return Ok(Vec::new());
        }

        let want = (k + self.stale_count()).min(self.slots.len());
        let ef = self.params.ef_search.max(want);

        let mut results: Vec<(i64, f32)> = self
            .hnsw
            .search(query, want, ef)
            .into_iter()
            .filter_map(|neighbour| {
                let slot = neighbour.d_id;
                let row = *self.slots.get(slot)?;
                let entry = self.live.get(&row)?;
                (entry.slot == slot).then_some((row, neighbour.distance))
            })
            .collect();

        if results.len() < k.min(self.live.len()) {
            tracing::debug!(
                "Graph returned {} of {} live rows, scanning exactly",
                results.len(),
                self.live.len()
            );
            results = self.exact_search(query);
        }

        results.sort_by(|a, b| a.1.total_cmp(&b.1));
        results.truncate(k);

        Ok(results)
    }

    fn exact_search(&self, query: &[f32]) -> Vec<(i64, f32)> {
        self.live
            .iter()
            .map(|(row, entry)| (*row, cosine_distance(query, &entry.vector)))
            .collect()
    }

    /// Rebuild the HNSW structure from live vectors only, dropping stale slots
    pub fn compact(&mut self) {
        let mut entries: Vec<(i64, LiveEntry)> = self.live.drain().collect();
        entries.sort_by_key(|(_, entry)| entry.slot);

        self.hnsw = new_hnsw(self.params);
        self.slots.clear();
        for (row, entry) in entries {
            let slot = self.slots.len();
            self.hnsw.insert((entry.vector.as_slice(), slot));
            self.slots.push(row);
            self.live.insert(
                row,
                LiveEntry {
                    slot,
                    vector: entry.vector,
                },
            );
        }
    }

    /// Number of live rows
    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn params(&self) -> GraphParams {
        self.params
    }

    /// Slots no longer representing any row
    pub fn stale_count(&self) -> usize {
        self.slots.len() - self.live.len()
    }

    /// Stale slots outnumber live ones
    pub fn needs_compaction(&self) -> bool {
        self.stale_count() > self.live.len()
    }
}

fn new_hnsw(params: GraphParams) -> Hnsw<'static, f32, DistCosine> {
    Hnsw::<f32, DistCosine>::new(
        params.m,
        params.max_elements,
        MAX_LAYER,
        params.ef_construction,
        DistCosine,
    )
}

/// Same metric as `DistCosine`; a zero vector is maximally far
fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }
    (1.0 - dot / (norm_a * norm_b)).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(dimension: usize, axis: usize) -> Vec<f32> {
        let mut v = vec![0.0; dimension];
        v[axis] = 1.0;
        v
    }

    #[test]
    fn test_graph_creation() {
        let graph = CollectionGraph::new(8, GraphParams::default());
        assert_eq!(graph.dimension(), 8);
        assert_eq!(graph.len(), 0);
        assert!(graph.is_empty());
        assert!(graph.search(&unit(8, 0), 3).unwrap().is_empty());
    }

    #[test]
    fn test_insert_and_search() {
        let mut graph = CollectionGraph::new(8, GraphParams::default());

        let mut near = vec![0.0; 8];
        near[0] = 0.9;
        near[1] = 0.1;

        graph.upsert(1, unit(8, 0)).unwrap();
        graph.upsert(2, unit(8, 1)).unwrap();
        graph.upsert(3, near).unwrap();

        let results = graph.search(&unit(8, 0), 2).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0, 1);
        assert_eq!(results[1].0, 3);
        assert!(results[0].1 <= results[1].1);
    }

    #[test]
    fn test_upsert_replaces() {
        let mut graph = CollectionGraph::new(8, GraphParams::default());

        assert!(graph.upsert(1, unit(8, 0)).unwrap());
        assert!(graph.upsert(1, unit(8, 1)).unwrap());

        assert_eq!(graph.len(), 1);
        assert_eq!(graph.stale_count(), 1);

        let results = graph.search(&unit(8, 0), 5).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0, 1);
        // the surviving vector is the orthogonal one
        assert!(results[0].1 > 0.5);
    }

    #[test]
    fn test_identical_upsert_is_noop() {
        let mut graph = CollectionGraph::new(8, GraphParams::default());

        assert!(graph.upsert(1, unit(8, 0)).unwrap());
        for _ in 0..100 {
            assert!(!graph.upsert(1, unit(8, 0)).unwrap());
        }

        assert_eq!(graph.stale_count(), 0);
        let results = graph.search(&unit(8, 0), 5).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0, 1);
        assert!(results[0].1 < 1e-6);
    }

    #[test]
    fn test_remove() {
        let mut graph = CollectionGraph::new(8, GraphParams::default());
        graph.upsert(1, unit(8, 0)).unwrap();
        graph.upsert(2, unit(8, 1)).unwrap();

        assert!(graph.remove(1));
        assert!(!graph.remove(1));

        let results = graph.search(&unit(8, 0), 5).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0, 2);
    }

    #[test]
    fn test_dimension_validation() {
        let mut graph = CollectionGraph::new(8, GraphParams::default());
        assert!(graph.upsert(1, vec![1.0; 4]).is_err());
        assert!(graph.search(&[1.0; 4], 1).is_err());
    }

    #[test]
    fn test_compaction_threshold() {
        let mut graph = CollectionGraph::new(4, GraphParams::default());
        graph.upsert(1, vec![1.0, 0.0, 0.0, 0.0]).unwrap();
        graph.upsert(2, vec![0.0, 1.0, 0.0, 0.0]).unwrap();
        assert!(!graph.needs_compaction());

        graph.upsert(1, vec![1.0, 1.0, 0.0, 0.0]).unwrap();
        graph.upsert(2, vec![0.0, 1.0, 1.0, 0.0]).unwrap();
        assert!(!graph.needs_compaction());

        graph.upsert(1, vec![1.0, 0.0, 1.0, 0.0]).unwrap();
        assert!(graph.needs_compaction());

        graph.compact();
        assert_eq!(graph.stale_count(), 0);
        assert_eq!(graph.len(), 2);
        assert_eq!(graph.search(&[1.0, 0.0, 1.0, 0.0], 1).unwrap()[0].0, 1);
    }

    #[test]
    fn test_stale_heavy_graph_still_finds_live_rows() {
        let mut graph = CollectionGraph::new(4, GraphParams::default());
        for i in 0..100 {
            graph
                .upsert(7, vec![1.0, 0.001 * i as f32, 0.0, 0.0])
                .unwrap();
        }

        assert_eq!(graph.len(), 1);
        let results = graph.search(&[1.0, 0.0, 0.0, 0.0], 5).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0, 7);
    }

    #[test]
    fn test_cosine_distance() {
        assert!(cosine_distance(&unit(4, 0), &unit(4, 0)).abs() < 1e-6);
        assert!((cosine_distance(&unit(4, 0), &unit(4, 1)) - 1.0).abs() < 1e-6);
        assert_eq!(cosine_distance(&[0.0; 4], &unit(4, 1)), 1.0);
    }
}
