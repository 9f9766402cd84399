//! HNSW approximate nearest-neighbour index over unit-normalized embeddings
//!
//! The index is populated once with canonical skill embeddings and then only
//! read. Similarity is the inner product, which equals cosine similarity for
//! unit vectors. Searching takes `&self` and allocates its own scratch space,
//! so a built index can be shared across threads behind an `Arc`.

use crate::config::IndexConfig;
use crate::error::{Result, SkillFitError};
use crate::processing::embeddings::dot;
use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

/// Levels above this are never drawn; keeps a pathological RNG draw cheap.
const MAX_LEVEL: usize = 16;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexParams {
    pub dimension: usize,
    /// Maximum links per node on upper layers (`M`); layer 0 allows twice as many
    pub max_connections: usize,
    /// Candidate list size while linking new nodes
    pub ef_construction: usize,
    /// Candidate list size while answering queries
    pub ef_search: usize,
    /// Seed for level assignment, so identical inputs give identical graphs
    pub seed: u64,
}

impl Default for IndexParams {
    fn default() -> Self {
        Self {
            dimension: 384,
            max_connections: 32,
            ef_construction: 200,
            ef_search: 64,
            seed: 42,
        }
    }
}

impl IndexParams {
    pub fn from_config(dimension: usize, config: &IndexConfig) -> Self {
        Self {
            dimension,
            max_connections: config.max_connections,
            ef_construction: config.ef_construction,
            ef_search: config.ef_search,
            seed: config.seed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub label: String,
    pub similarity: f32,
}

/// A node id scored against the current query.
///
/// Orders by similarity, then prefers the earlier-inserted node, so heap and
/// sort results are fully deterministic.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    similarity: f32,
    id: usize,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.similarity
            .total_cmp(&other.similarity)
            .then_with(|| other.id.cmp(&self.id))
    }
}

/// Layered proximity graph. `links[id][layer]` holds the neighbours of node
/// `id` on `layer`; a node exists on every layer up to its drawn level.
struct HnswGraph {
    vectors: Vec<Vec<f32>>,
    labels: Vec<String>,
    links: Vec<Vec<Vec<usize>>>,
    entry_point: Option<usize>,
    max_level: usize,
}

impl HnswGraph {
    fn build(params: &IndexParams, vectors: Vec<Vec<f32>>, labels: Vec<String>) -> Self {
        let m = params.max_connections.max(2);
        let ef_construction = params.ef_construction.max(1);
        let level_mult = 1.0 / (m as f64).ln();
        let mut rng = StdRng::seed_from_u64(params.seed);

        let count = vectors.len();
        let mut graph = Self {
            vectors,
            labels,
            links: Vec::with_capacity(count),
            entry_point: None,
            max_level: 0,
        };

        for id in 0..count {
            let level = random_level(&mut rng, level_mult);
            graph.insert(id, level, m, ef_construction);
        }

        graph
    }

    fn len(&self) -> usize {
        self.vectors.len()
    }

    fn insert(&mut self, id: usize, level: usize, m: usize, ef_construction: usize) {
        self.links.push(vec![Vec::new(); level + 1]);

        let entry = match self.entry_point {
            Some(entry) => entry,
            None => {
                self.entry_point = Some(id);
                self.max_level = level;
                return;
            }
        };

        let query = self.vectors[id].clone();
        let mut closest = self.score(&query, entry);
        for layer in (level + 1..=self.max_level).rev() {
            closest = self.greedy_closest(&query, closest, layer);
        }

        let mut entry_points = vec![closest];
        for layer in (0..=level.min(self.max_level)).rev() {
            let found = self.search_layer(&query, &entry_points, ef_construction, layer);
            let selected = self.select_neighbors(&found, m);
            let cap = if layer == 0 { m * 2 } else { m };

            self.links[id][layer] = selected.iter().map(|c| c.id).collect();
            for neighbor in &selected {
                self.links[neighbor.id][layer].push(id);
                if self.links[neighbor.id][layer].len() > cap {
                    self.shrink(neighbor.id, layer, cap);
                }
            }

            entry_points = found;
        }

        if level > self.max_level {
            self.max_level = level;
            self.entry_point = Some(id);
        }
    }

    fn score(&self, query: &[f32], id: usize) -> Candidate {
        Candidate {
            similarity: dot(query, &self.vectors[id]),
            id,
        }
    }

    /// Hill-climb on a single layer with a beam of one
    fn greedy_closest(&self, query: &[f32], start: Candidate, layer: usize) -> Candidate {
        let mut current = start;
        loop {
            let mut improved = false;
            for &neighbor in &self.links[current.id][layer] {
                let candidate = self.score(query, neighbor);
                if candidate > current {
                    current = candidate;
                    improved = true;
                }
            }
            if !improved {
                return current;
            }
        }
    }

    /// Beam search on one layer; returns up to `ef` nodes, best first
    fn search_layer(
        &self,
        query: &[f32],
        entry_points: &[Candidate],
        ef: usize,
        layer: usize,
    ) -> Vec<Candidate> {
        let mut visited = vec![false; self.len()];
        let mut candidates: BinaryHeap<Candidate> = BinaryHeap::new();
        let mut results: BinaryHeap<Reverse<Candidate>> = BinaryHeap::new();

        for &entry in entry_points {
            if !visited[entry.id] {
                visited[entry.id] = true;
                candidates.push(entry);
                results.push(Reverse(entry));
            }
        }
        while results.len() > ef {
            results.pop();
        }

        while let Some(current) = candidates.pop() {
            if let Some(Reverse(worst)) = results.peek() {
                if results.len() >= ef && current < *worst {
                    break;
                }
            }

            for &neighbor in &self.links[current.id][layer] {
                if visited[neighbor] {
                    continue;
                }
                visited[neighbor] = true;

                let candidate = self.score(query, neighbor);
                let admit = match results.peek() {
                    Some(Reverse(worst)) => results.len() < ef || candidate > *worst,
                    None => true,
                };
                if admit {
                    candidates.push(candidate);
                    results.push(Reverse(candidate));
                    if results.len() > ef {
                        results.pop();
                    }
                }
            }
        }

        let mut found: Vec<Candidate> = results.into_iter().map(|Reverse(c)| c).collect();
        found.sort_by(|a, b| b.cmp(a));
        found
    }

    /// Neighbour selection heuristic: keep a candidate only if it is closer to
    /// the query than to every neighbour already kept, then top up with the
    /// pruned ones so well-clustered data still gets `m` links.
    fn select_neighbors(&self, candidates: &[Candidate], m: usize) -> Vec<Candidate> {
        let mut selected: Vec<Candidate> = Vec::with_capacity(m);
        let mut pruned: Vec<Candidate> = Vec::new();

        for &candidate in candidates {
            if selected.len() >= m {
                break;
            }
            let diverse = selected.iter().all(|kept| {
                dot(&self.vectors[candidate.id], &self.vectors[kept.id]) < candidate.similarity
            });
            if diverse {
                selected.push(candidate);
            } else {
                pruned.push(candidate);
            }
        }

        for candidate in pruned {
            if selected.len() >= m {
                break;
            }
            selected.push(candidate);
        }

        selected
    }

    fn shrink(&mut self, node: usize, layer: usize, cap: usize) {
        let base = &self.vectors[node];
        let mut scored: Vec<Candidate> = self.links[node][layer]
            .iter()
            .map(|&id| Candidate {
                similarity: dot(base, &self.vectors[id]),
                id,
            })
            .collect();
        scored.sort_by(|a, b| b.cmp(a));

        let kept = self.select_neighbors(&scored, cap);
        self.links[node][layer] = kept.into_iter().map(|c| c.id).collect();
    }

    fn knn(&self, query: &[f32], k: usize, ef_search: usize) -> Vec<Candidate> {
        let entry = match self.entry_point {
            Some(entry) if k > 0 => entry,
            _ => return Vec::new(),
        };

        let mut closest = self.score(query, entry);
        for layer in (1..=self.max_level).rev() {
            closest = self.greedy_closest(query, closest, layer);
        }

        let mut found = self.search_layer(query, &[closest], ef_search.max(k), 0);
        found.truncate(k);
        found
    }
}

fn random_level(rng: &mut StdRng, level_mult: f64) -> usize {
    let uniform: f64 = rng.gen_range(f64::EPSILON..1.0);
    ((-uniform.ln() * level_mult).floor() as usize).min(MAX_LEVEL)
}

/// Build-once, query-many ANN index
pub struct VectorIndex {
    params: IndexParams,
    graph: Option<HnswGraph>,
}

impl VectorIndex {
    pub fn new(params: IndexParams) -> Self {
        Self {
            params,
            graph: None,
        }
    }

    /// Build the index from parallel embedding/label lists.
    ///
    /// Embeddings must be unit-normalized for scores to be cosine similarities.
    /// An index can be built exactly once; a new vocabulary needs a new index.
    pub fn build(&mut self, embeddings: Vec<Vec<f32>>, labels: Vec<String>) -> Result<()> {
        if self.graph.is_some() {
            return Err(SkillFitError::InvalidInput(
                "Index already built; construct a new index to rebuild".to_string(),
            ));
        }
        if embeddings.len() != labels.len() {
            return Err(SkillFitError::LabelCountMismatch {
                vectors: embeddings.len(),
                labels: labels.len(),
            });
        }
        if let Some(bad) = embeddings.iter().find(|v| v.len() != self.params.dimension) {
            return Err(SkillFitError::DimensionMismatch {
                expected: self.params.dimension,
                actual: bad.len(),
            });
        }

        let graph = HnswGraph::build(&self.params, embeddings, labels);
        info!(
            "HNSW index built: {} vectors, dim={}, M={}, levels={}",
            graph.len(),
            self.params.dimension,
            self.params.max_connections,
            graph.max_level + 1
        );
        self.graph = Some(graph);
        Ok(())
    }

    /// For each query, up to `top_k` hits ordered by descending similarity.
    ///
    /// `top_k` is clamped to the number of indexed vectors.
    pub fn search(&self, queries: &[Vec<f32>], top_k: usize) -> Result<Vec<Vec<SearchHit>>> {
        let graph = self.graph.as_ref().ok_or(SkillFitError::IndexNotBuilt)?;
        let k = top_k.min(graph.len());

        queries
            .iter()
            .map(|query| {
                if query.len() != self.params.dimension {
                    return Err(SkillFitError::DimensionMismatch {
                        expected: self.params.dimension,
                        actual: query.len(),
                    });
                }

                let hits: Vec<SearchHit> = graph
                    .knn(query, k, self.params.ef_search)
                    .into_iter()
                    .filter_map(|c| {
                        graph.labels.get(c.id).map(|label| SearchHit {
                            label: label.clone(),
                            similarity: c.similarity,
                        })
                    })
                    .collect();
                debug!("ANN query returned {} hits (k={})", hits.len(), k);
                Ok(hits)
            })
            .collect()
    }

    pub fn is_built(&self) -> bool {
        self.graph.is_some()
    }

    pub fn len(&self) -> usize {
        self.graph.as_ref().map(|g| g.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn params(&self) -> &IndexParams {
        &self.params
    }
}
