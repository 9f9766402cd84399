//! In-memory skill knowledge graph and structural similarity
//!
//! Schema:
//!   (Skill)-[RelatedTo {weight}]->(Skill)   skills present in both resume and job
//!   (Skill)-[BelongsTo]->(Category)
//!
//! Nodes live in an arena indexed by position; ids map to positions and each
//! node keeps the positions of its outgoing edges. Once built the graph is
//! plain data and can be shared read-only.

use crate::processing::ontology::UNKNOWN_CATEGORY;
use log::{debug, info, warn};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

const COVERAGE_WEIGHT: f32 = 0.40;
const JACCARD_WEIGHT: f32 = 0.35;
const CATEGORY_WEIGHT: f32 = 0.25;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    Skill,
    Category,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EdgeKind {
    RelatedTo,
    BelongsTo,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    pub kind: NodeKind,
    pub label: String,
    pub properties: BTreeMap<String, serde_json::Value>,
}

impl GraphNode {
    pub fn skill(label: &str, in_resume: bool, in_job: bool) -> Self {
        let mut properties = BTreeMap::new();
        properties.insert("in_resume".to_string(), serde_json::Value::Bool(in_resume));
        properties.insert("in_job".to_string(), serde_json::Value::Bool(in_job));
        Self {
            id: skill_id(label),
            kind: NodeKind::Skill,
            label: label.to_string(),
            properties,
        }
    }

    pub fn category(label: &str) -> Self {
        Self {
            id: category_id(label),
            kind: NodeKind::Category,
            label: label.to_string(),
            properties: BTreeMap::new(),
        }
    }

    fn flag(&self, name: &str) -> bool {
        self.properties
            .get(name)
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }

    pub fn in_resume(&self) -> bool {
        self.flag("in_resume")
    }

    pub fn in_job(&self) -> bool {
        self.flag("in_job")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub source_id: String,
    pub target_id: String,
    pub kind: EdgeKind,
    pub weight: f32,
}

pub fn skill_id(label: &str) -> String {
    format!("skill:{}", label.to_lowercase())
}

pub fn category_id(label: &str) -> String {
    format!("category:{}", label.to_lowercase())
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SkillGraph {
    nodes: Vec<GraphNode>,
    edges: Vec<GraphEdge>,
    #[serde(skip)]
    positions: HashMap<String, usize>,
    #[serde(skip)]
    outgoing: Vec<Vec<usize>>,
}

impl SkillGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node, keeping the existing one if the id is already present.
    /// Returns the node's arena position.
    pub fn add_node(&mut self, node: GraphNode) -> usize {
        if let Some(&position) = self.positions.get(&node.id) {
            return position;
        }
        let position = self.nodes.len();
        self.positions.insert(node.id.clone(), position);
        self.nodes.push(node);
        self.outgoing.push(Vec::new());
        position
    }

    /// Add a directed edge. Edges with an unknown endpoint are rejected.
    pub fn add_edge(&mut self, edge: GraphEdge) -> bool {
        let source = match (
            self.positions.get(&edge.source_id),
            self.positions.contains_key(&edge.target_id),
        ) {
            (Some(&source), true) => source,
            _ => {
                warn!(
                    "Dropping edge {} -> {}: unknown endpoint",
                    edge.source_id, edge.target_id
                );
                return false;
            }
        };
        self.outgoing[source].push(self.edges.len());
        self.edges.push(edge);
        true
    }

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.positions.get(id).map(|&p| &self.nodes[p])
    }

    pub fn nodes(&self) -> &[GraphNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[GraphEdge] {
        &self.edges
    }

    /// Outgoing `(target node, edge)` pairs of a node
    pub fn neighbors(&self, id: &str) -> Vec<(&GraphNode, &GraphEdge)> {
        let Some(&position) = self.positions.get(id) else {
            return Vec::new();
        };
        self.outgoing[position]
            .iter()
            .filter_map(|&e| {
                let edge = &self.edges[e];
                self.node(&edge.target_id).map(|target| (target, edge))
            })
            .collect()
    }

    pub fn has_edge(&self, source_id: &str, target_id: &str, kind: EdgeKind) -> bool {
        self.neighbors(source_id)
            .iter()
            .any(|(target, edge)| target.id == target_id && edge.kind == kind)
    }

    pub fn skill_ids(&self) -> HashSet<&str> {
        self.nodes
            .iter()
            .filter(|n| n.kind == NodeKind::Skill)
            .map(|n| n.id.as_str())
            .collect()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }
}

/// Builds skill graphs for one resume/job pair and scores their overlap
#[derive(Debug, Clone, Default)]
pub struct SkillGraphBuilder;

impl SkillGraphBuilder {
    pub fn new() -> Self {
        Self
    }

    /// One Skill node per distinct skill (case-insensitive), optional Category
    /// nodes with BelongsTo edges, and RelatedTo edges between every pair of
    /// skills present on both sides.
    pub fn build_skill_graph(
        &self,
        resume_skills: &[String],
        job_skills: &[String],
        skill_categories: Option<&HashMap<String, String>>,
    ) -> SkillGraph {
        let mut graph = SkillGraph::new();

        let resume_set = lowercase_set(resume_skills);
        let job_set = lowercase_set(job_skills);

        // First surface form wins as the label; BTreeMap keeps node order stable
        let mut distinct: BTreeMap<String, &str> = BTreeMap::new();
        for skill in job_skills.iter().chain(resume_skills.iter()) {
            let key = skill.to_lowercase();
            distinct.entry(key).or_insert(skill.as_str());
        }

        for (key, label) in &distinct {
            graph.add_node(GraphNode::skill(
                label,
                resume_set.contains(key),
                job_set.contains(key),
            ));
        }

        if let Some(categories) = skill_categories {
            let lowered: HashMap<String, &str> = categories
                .iter()
                .map(|(skill, category)| (skill.to_lowercase(), category.as_str()))
                .collect();

            for label in distinct.values() {
                let category = categories
                    .get(*label)
                    .map(|c| c.as_str())
                    .or_else(|| lowered.get(&label.to_lowercase()).copied())
                    .unwrap_or(UNKNOWN_CATEGORY);
                graph.add_node(GraphNode::category(category));
                graph.add_edge(GraphEdge {
                    source_id: skill_id(label),
                    target_id: category_id(category),
                    kind: EdgeKind::BelongsTo,
                    weight: 1.0,
                });
            }
        }

        let mut overlap: Vec<&String> = resume_set.intersection(&job_set).collect();
        overlap.sort();
        for (i, first) in overlap.iter().enumerate() {
            for second in &overlap[i + 1..] {
                let (source, target) = (skill_id(first), skill_id(second));
                if graph.has_edge(&source, &target, EdgeKind::RelatedTo)
                    || graph.has_edge(&target, &source, EdgeKind::RelatedTo)
                {
                    continue;
                }
                graph.add_edge(GraphEdge {
                    source_id: source,
                    target_id: target,
                    kind: EdgeKind::RelatedTo,
                    weight: 1.0,
                });
            }
        }

        info!(
            "Built skill graph: {} nodes, {} edges",
            graph.node_count(),
            graph.edge_count()
        );
        graph
    }

    /// Structural similarity in [0, 1]:
    /// `0.40 * coverage + 0.35 * jaccard + 0.25 * category_overlap`.
    pub fn compute_graph_similarity(
        &self,
        graph: &SkillGraph,
        resume_skills: &[String],
        job_skills: &[String],
    ) -> f32 {
        if job_skills.is_empty() {
            return 0.0;
        }

        let resume_set = lowercase_set(resume_skills);
        let job_set = lowercase_set(job_skills);

        let intersection = resume_set.intersection(&job_set).count();
        let union = resume_set.union(&job_set).count();
        let jaccard = if union == 0 {
            0.0
        } else {
            intersection as f32 / union as f32
        };
        let coverage = if job_set.is_empty() {
            0.0
        } else {
            intersection as f32 / job_set.len() as f32
        };

        let mut resume_categories: HashSet<&str> = HashSet::new();
        let mut job_categories: HashSet<&str> = HashSet::new();
        for node in graph.nodes().iter().filter(|n| n.kind == NodeKind::Skill) {
            for (target, edge) in graph.neighbors(&node.id) {
                if edge.kind != EdgeKind::BelongsTo || target.kind != NodeKind::Category {
                    continue;
                }
                if node.in_resume() {
                    resume_categories.insert(target.id.as_str());
                }
                if node.in_job() {
                    job_categories.insert(target.id.as_str());
                }
            }
        }

        let category_overlap = if job_categories.is_empty() {
            0.0
        } else {
            resume_categories.intersection(&job_categories).count() as f32
                / job_categories.len() as f32
        };

        let score = COVERAGE_WEIGHT * coverage
            + JACCARD_WEIGHT * jaccard
            + CATEGORY_WEIGHT * category_overlap;

        debug!(
            "Graph similarity: coverage={:.3}, jaccard={:.3}, cat_overlap={:.3} -> {:.3}",
            coverage, jaccard, category_overlap, score
        );
        score.min(1.0)
    }
}

fn lowercase_set(skills: &[String]) -> HashSet<String> {
    skills.iter().map(|s| s.to_lowercase()).collect()
}

/// Optional materialization target for built graphs.
///
/// Calls are fire-and-forget: implementations log their own failures and
/// scoring never reads anything back.
pub trait GraphSink: Send + Sync {
    fn materialize(&self, graph: &SkillGraph);
}

/// Keeps the most recent graphs in memory
pub struct InMemoryGraphSink {
    capacity: usize,
    graphs: Mutex<VecDeque<SkillGraph>>,
}

impl InMemoryGraphSink {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            graphs: Mutex::new(VecDeque::new()),
        }
    }

    pub fn latest(&self) -> Option<SkillGraph> {
        self.graphs.lock().back().cloned()
    }

    pub fn len(&self) -> usize {
        self.graphs.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl GraphSink for InMemoryGraphSink {
    fn materialize(&self, graph: &SkillGraph) {
        let mut graphs = self.graphs.lock();
        if graphs.len() == self.capacity {
            graphs.pop_front();
        }
        graphs.push_back(graph.clone());
    }
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum GraphRecord<'a> {
    Node(&'a GraphNode),
    Edge(&'a GraphEdge),
}

/// Appends every node and edge as one JSON object per line
pub struct JsonLinesGraphSink {
    path: PathBuf,
}

impl JsonLinesGraphSink {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn write(&self, graph: &SkillGraph) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let mut writer = BufWriter::new(file);

        let records = graph
            .nodes()
            .iter()
            .map(GraphRecord::Node)
            .chain(graph.edges().iter().map(GraphRecord::Edge));
        for record in records {
            serde_json::to_writer(&mut writer, &record)?;
            writer.write_all(b"\n")?;
        }
        writer.flush()
    }
}

impl GraphSink for JsonLinesGraphSink {
    fn materialize(&self, graph: &SkillGraph) {
        match self.write(graph) {
            Ok(()) => info!(
                "Graph written to {}: {} nodes, {} edges",
                self.path.display(),
                graph.node_count(),
                graph.edge_count()
            ),
            Err(e) => warn!("Failed to write graph to {}: {}", self.path.display(), e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn skills(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_graph_similarity_example() {
        let builder = SkillGraphBuilder::new();
        let resume = skills(&["Python", "SQL"]);
        let job = skills(&["Python", "Java"]);
        let graph = builder.build_skill_graph(&resume, &job, None);

        let score = builder.compute_graph_similarity(&graph, &resume, &job);
        let expected = 0.40 * 0.5 + 0.35 * (1.0 / 3.0);
        assert!((score - expected).abs() < 1e-5);
        assert!((score - 0.3167).abs() < 1e-3);
    }

    #[test]
    fn test_skill_nodes_and_flags() {
        let builder = SkillGraphBuilder::new();
        let graph = builder.build_skill_graph(
            &skills(&["Python", "SQL"]),
            &skills(&["python", "Java"]),
            None,
        );

        assert_eq!(graph.skill_ids().len(), 3);
        let python = graph.node("skill:python").unwrap();
        assert!(python.in_resume() && python.in_job());
        assert_eq!(python.label, "python");

        let java = graph.node("skill:java").unwrap();
        assert!(!java.in_resume() && java.in_job());
        assert!(graph.node("skill:sql").unwrap().in_resume());
    }

    #[test]
    fn test_related_edges_connect_overlap_pairs_once() {
        let builder = SkillGraphBuilder::new();
        let shared = skills(&["A", "B", "C", "D"]);
        let graph = builder.build_skill_graph(&shared, &shared, None);

        let related: Vec<&GraphEdge> = graph
            .edges()
            .iter()
            .filter(|e| e.kind == EdgeKind::RelatedTo)
            .collect();
        assert_eq!(related.len(), 6);
        assert!(related.iter().all(|e| e.source_id != e.target_id));
        assert!(related.iter().all(|e| e.weight == 1.0));
    }

    #[test]
    fn test_category_nodes_and_overlap() {
        let builder = SkillGraphBuilder::new();
        let resume = skills(&["Python", "Docker"]);
        let job = skills(&["Java", "Kubernetes"]);
        let categories: HashMap<String, String> = [
            ("Python", "Programming Language"),
            ("Java", "Programming Language"),
            ("Docker", "DevOps"),
        ]
        .iter()
        .map(|(s, c)| (s.to_string(), c.to_string()))
        .collect();

        let graph = builder.build_skill_graph(&resume, &job, Some(&categories));
        assert!(graph.node("category:programming language").is_some());
        assert!(graph.node("category:unknown").is_some());
        assert!(graph.has_edge(
            "skill:python",
            "category:programming language",
            EdgeKind::BelongsTo
        ));
        assert_eq!(
            graph
                .edges()
                .iter()
                .filter(|e| e.kind == EdgeKind::BelongsTo)
                .count(),
            4
        );

        // Job categories: {programming language, unknown}; resume covers one
        let score = builder.compute_graph_similarity(&graph, &resume, &job);
        assert!((score - 0.25 * 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_empty_job_skills_score_zero() {
        let builder = SkillGraphBuilder::new();
        let resume = skills(&["Python"]);
        let graph = builder.build_skill_graph(&resume, &[], None);
        assert_eq!(builder.compute_graph_similarity(&graph, &resume, &[]), 0.0);
    }

    #[test]
    fn test_full_overlap_with_categories_scores_one() {
        let builder = SkillGraphBuilder::new();
        let both = skills(&["Rust", "Go"]);
        let categories: HashMap<String, String> = both
            .iter()
            .map(|s| (s.clone(), "Programming Language".to_string()))
            .collect();
        let graph = builder.build_skill_graph(&both, &both, Some(&categories));

        let score = builder.compute_graph_similarity(&graph, &both, &both);
        assert!((score - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_edges_require_existing_nodes() {
        let mut graph = SkillGraph::new();
        graph.add_node(GraphNode::skill("Python", true, false));
        let added = graph.add_edge(GraphEdge {
            source_id: skill_id("Python"),
            target_id: category_id("Nowhere"),
            kind: EdgeKind::BelongsTo,
            weight: 1.0,
        });

        assert!(!added);
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn test_parallel_edges_of_different_kinds_allowed() {
        let mut graph = SkillGraph::new();
        graph.add_node(GraphNode::skill("A", true, true));
        graph.add_node(GraphNode::skill("B", true, true));
        for kind in [EdgeKind::RelatedTo, EdgeKind::BelongsTo] {
            assert!(graph.add_edge(GraphEdge {
                source_id: skill_id("A"),
                target_id: skill_id("B"),
                kind,
                weight: 1.0,
            }));
        }
        assert_eq!(graph.neighbors("skill:a").len(), 2);
    }

    #[test]
    fn test_in_memory_sink_is_bounded() {
        let sink = InMemoryGraphSink::new(2);
        let builder = SkillGraphBuilder::new();
        for name in ["A", "B", "C"] {
            let graph = builder.build_skill_graph(&skills(&[name]), &skills(&[name]), None);
            sink.materialize(&graph);
        }

        assert_eq!(sink.len(), 2);
        assert!(sink.latest().unwrap().node("skill:c").is_some());
    }

    #[test]
    fn test_json_lines_sink_writes_records() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("graphs").join("graph.jsonl");
        let sink = JsonLinesGraphSink::new(path.clone());

        let builder = SkillGraphBuilder::new();
        let graph = builder.build_skill_graph(
            &skills(&["Python", "SQL"]),
            &skills(&["Python", "SQL"]),
            None,
        );
        sink.materialize(&graph);

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<serde_json::Value> = content
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), graph.node_count() + graph.edge_count());
        assert_eq!(lines[0]["type"], "node");
        assert_eq!(lines.last().unwrap()["type"], "edge");
    }
}
