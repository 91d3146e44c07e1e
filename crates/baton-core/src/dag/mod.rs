//! Agent topology: flow specification to validated DAG.
//!
//! A flow is one of:
//!
//! - `""` or `"auto"`: the default `coordinator -> general-purpose`
//! - graph text starting with `digraph`
//! - `@relative/path.dot`: graph text read from a file next to the goal
//! - a bare fragment of edge statements, wrapped into a graph body
//!
//! After parsing, the graph is normalized: every original entry node hangs
//! off `coordinator` (which becomes the only entry), a
//! `coordinator -> project-critic-council` edge is ensured, and the result
//! must be acyclic. Nodes live in a name-indexed map; edges are name sets,
//! so the structure has no internal references to untangle.

mod parser;

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use crate::error::EngineError;
use crate::models::{COORDINATOR, CRITIC_COUNCIL, GENERAL_PURPOSE};

pub use parser::{is_graph_text, parse_dot, wrap_fragment, ParsedGraph};

/// A node and its neighbours, by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DagNode {
    pub name: String,
    pub predecessors: BTreeSet<String>,
    pub successors: BTreeSet<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dag {
    nodes: BTreeMap<String, DagNode>,
    entry_nodes: Vec<String>,
}

impl Dag {
    /// Resolve a flow specification and build the normalized DAG.
    /// `base_dir` anchors `@file` references.
    pub fn parse_flow(spec: &str, base_dir: &Path) -> Result<Self, EngineError> {
        let text = resolve_flow_text(spec, base_dir)?;
        let graph = parse_dot(&text)
            .map_err(|e| EngineError::Config(format!("Invalid flow: {}", e)))?;
        Self::build(&graph)
    }

    /// Build from parsed nodes and edges, then normalize and validate.
    pub fn build(graph: &ParsedGraph) -> Result<Self, EngineError> {
        let mut dag = Dag::default();
        for name in &graph.nodes {
            dag.ensure_node(name);
        }
        for (from, to) in &graph.edges {
            dag.add_edge(from, to);
        }
        dag.recompute_entry_nodes();

        if dag.entry_nodes.is_empty() {
            return Err(EngineError::Config(
                "Flow has no entry node: every node has a predecessor, so the graph contains a cycle"
                    .to_string(),
            ));
        }

        dag.inject_coordinator();
        dag.inject_critic_council();
        dag.check_acyclic()?;

        tracing::debug!(
            "[Dag] Built flow with {} nodes: {}",
            dag.nodes.len(),
            dag.agents().join(", ")
        );
        Ok(dag)
    }

    fn ensure_node(&mut self, name: &str) {
        self.nodes
            .entry(name.to_string())
            .or_insert_with(|| DagNode {
                name: name.to_string(),
                ..Default::default()
            });
    }

    fn add_edge(&mut self, from: &str, to: &str) {
        self.ensure_node(from);
        self.ensure_node(to);
        if let Some(node) = self.nodes.get_mut(from) {
            node.successors.insert(to.to_string());
        }
        if let Some(node) = self.nodes.get_mut(to) {
            node.predecessors.insert(from.to_string());
        }
    }

    fn recompute_entry_nodes(&mut self) {
        // BTreeMap iteration keeps this sorted.
        self.entry_nodes = self
            .nodes
            .values()
            .filter(|n| n.predecessors.is_empty())
            .map(|n| n.name.clone())
            .collect();
    }

    /// Hang every original entry node off the coordinator.
    fn inject_coordinator(&mut self) {
        if self.entry_nodes.len() == 1 && self.entry_nodes[0] == COORDINATOR {
            return;
        }
        let entries: Vec<String> = self
            .entry_nodes
            .iter()
            .filter(|e| e.as_str() != COORDINATOR)
            .cloned()
            .collect();
        for entry in &entries {
            tracing::debug!("[Dag] Injecting coordinator -> {}", entry);
            self.add_edge(COORDINATOR, entry);
        }
        self.recompute_entry_nodes();
    }

    fn inject_critic_council(&mut self) {
        self.add_edge(COORDINATOR, CRITIC_COUNCIL);
        self.recompute_entry_nodes();
    }

    /// Depth-first search with a recursion stack; an edge into a node that is
    /// still on the stack closes a cycle.
    fn check_acyclic(&self) -> Result<(), EngineError> {
        let mut visited: BTreeSet<&str> = BTreeSet::new();
        let mut on_stack: BTreeSet<&str> = BTreeSet::new();

        for name in self.nodes.keys() {
            if !visited.contains(name.as_str()) {
                self.visit(name, &mut visited, &mut on_stack)?;
            }
        }
        Ok(())
    }

    fn visit<'a>(
        &'a self,
        name: &'a str,
        visited: &mut BTreeSet<&'a str>,
        on_stack: &mut BTreeSet<&'a str>,
    ) -> Result<(), EngineError> {
        visited.insert(name);
        on_stack.insert(name);

        if let Some(node) = self.nodes.get(name) {
            for next in &node.successors {
                if on_stack.contains(next.as_str()) {
                    return Err(EngineError::Config(format!(
                        "Flow contains a cycle: edge {} -> {}",
                        name, next
                    )));
                }
                if !visited.contains(next.as_str()) {
                    self.visit(next, visited, on_stack)?;
                }
            }
        }

        on_stack.remove(name);
        Ok(())
    }

    // ─── Queries ──────────────────────────────────────────────────────────

    pub fn entry_nodes(&self) -> &[String] {
        &self.entry_nodes
    }

    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    pub fn node(&self, name: &str) -> Option<&DagNode> {
        self.nodes.get(name)
    }

    /// Successor names, sorted. Empty for unknown nodes.
    pub fn successors(&self, name: &str) -> Vec<String> {
        self.nodes
            .get(name)
            .map(|n| n.successors.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn predecessors(&self, name: &str) -> Vec<String> {
        self.nodes
            .get(name)
            .map(|n| n.predecessors.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn is_terminal(&self, name: &str) -> bool {
        self.nodes
            .get(name)
            .map(|n| n.successors.is_empty())
            .unwrap_or(true)
    }

    /// All node names, sorted.
    pub fn agents(&self) -> Vec<String> {
        self.nodes.keys().cloned().collect()
    }

    /// `""` for a terminal node; otherwise control returns to the hub.
    pub fn next_agent(&self, current: &str) -> String {
        if self.is_terminal(current) {
            String::new()
        } else {
            COORDINATOR.to_string()
        }
    }

    /// Deterministic DOT rendering: nodes sorted, then each node's successors.
    pub fn to_dot(&self) -> String {
        let mut out = String::from("digraph flow {\n");
        for node in self.nodes.values() {
            if node.successors.is_empty() && node.predecessors.is_empty() {
                out.push_str(&format!("    {};\n", dot_id(&node.name)));
            }
            for next in &node.successors {
                out.push_str(&format!("    {} -> {};\n", dot_id(&node.name), dot_id(next)));
            }
        }
        out.push_str("}\n");
        out
    }
}

fn dot_id(name: &str) -> String {
    let plain = name
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if plain {
        name.to_string()
    } else {
        format!("\"{}\"", name.replace('"', "\\\""))
    }
}

/// Turn a flow specification into graph text.
fn resolve_flow_text(spec: &str, base_dir: &Path) -> Result<String, EngineError> {
    let trimmed = spec.trim();

    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("auto") {
        return Ok(format!("digraph flow {{ {} -> \"{}\" }}", COORDINATOR, GENERAL_PURPOSE));
    }

    if let Some(relative) = trimmed.strip_prefix('@') {
        let path = base_dir.join(relative.trim());
        let text = std::fs::read_to_string(&path).map_err(|e| {
            EngineError::Config(format!("Failed to read flow file '{}': {}", path.display(), e))
        })?;
        tracing::info!("[Dag] Loaded flow from {}", path.display());
        return if is_graph_text(&text) {
            Ok(text)
        } else {
            Ok(wrap_fragment(&text))
        };
    }

    if is_graph_text(trimmed) {
        Ok(trimmed.to_string())
    } else {
        Ok(wrap_fragment(trimmed))
    }
}
