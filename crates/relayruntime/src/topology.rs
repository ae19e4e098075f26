use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use relaycore::{NodeId, Workflow, WorkflowError};
use std::collections::HashMap;

/// Graph view of a workflow's nodes and edges
///
/// Only used to check what the editor stored. Execution order comes from
/// the node list, never from this graph.
pub struct Topology {
    graph: DiGraph<NodeId, String>,
    index: HashMap<NodeId, NodeIndex>,
}

impl Topology {
    /// Build the graph, rejecting duplicate node ids and edges to unknown nodes
    pub fn build(workflow: &Workflow) -> Result<Self, WorkflowError> {
        let mut graph = DiGraph::new();
        let mut index = HashMap::new();

        for node in &workflow.nodes {
            if index.contains_key(&node.id) {
                return Err(WorkflowError::DuplicateNode(node.id.clone()));
            }
            let idx = graph.add_node(node.id.clone());
            index.insert(node.id.clone(), idx);
        }

        for edge in &workflow.edges {
            let lookup = |node: &NodeId| {
                index.get(node).copied().ok_or_else(|| WorkflowError::DanglingEdge {
                    edge: edge.id.clone(),
                    node: node.clone(),
                })
            };
            let from = lookup(&edge.source)?;
            let to = lookup(&edge.target)?;
            graph.add_edge(from, to, edge.id.clone());
        }

        Ok(Self { graph, index })
    }

    /// [`Topology::build`] plus a cycle check
    pub fn validate(workflow: &Workflow) -> Result<Self, WorkflowError> {
        let topology = Self::build(workflow)?;
        if !topology.is_acyclic() {
            return Err(WorkflowError::CyclicDependency);
        }
        Ok(topology)
    }

    pub fn is_acyclic(&self) -> bool {
        toposort(&self.graph, None).is_ok()
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn successors(&self, node_id: &str) -> Vec<&str> {
        let Some(idx) = self.index.get(node_id) else {
            return Vec::new();
        };
        let mut found: Vec<&str> = self
            .graph
            .neighbors_directed(*idx, Direction::Outgoing)
            .map(|n| self.graph[n].as_str())
            .collect();
        found.sort_unstable();
        found
    }

    /// Nodes with no incoming edge
    pub fn roots(&self) -> Vec<&str> {
        let mut found: Vec<&str> = self
            .graph
            .node_indices()
            .filter(|idx| {
                self.graph
                    .neighbors_directed(*idx, Direction::Incoming)
                    .next()
                    .is_none()
            })
            .map(|idx| self.graph[idx].as_str())
            .collect();
        found.sort_unstable();
        found
    }
}
