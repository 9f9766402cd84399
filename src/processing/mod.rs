//! Skill normalization, graph scoring and matching

pub mod embeddings;
pub mod explainer;
pub mod ontology;
pub mod pipeline;
pub mod scoring;
pub mod service;
pub mod skill_extractor;
pub mod skill_graph;
pub mod skill_normalizer;
pub mod vector_index;
