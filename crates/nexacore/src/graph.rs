use crate::error::WorkflowError;
use crate::workflow::{ModuleId, Workflow};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use std::collections::{HashMap, VecDeque};

/// Module dependency graph: one node per distinct module id, one edge per connection.
#[derive(Debug, Clone)]
pub struct ModuleGraph {
    graph: DiGraph<ModuleId, ()>,
    indices: HashMap<ModuleId, NodeIndex>,
}

impl ModuleGraph {
    pub fn from_workflow(workflow: &Workflow) -> Result<Self, WorkflowError> {
        let mut graph = DiGraph::new();
        let mut indices = HashMap::new();

        for module in &workflow.modules {
            if !indices.contains_key(&module.id) {
                let idx = graph.add_node(module.id.clone());
                indices.insert(module.id.clone(), idx);
            }
        }

        for conn in &workflow.connections {
            let from = lookup(&indices, &conn.from.module)?;
            let to = lookup(&indices, &conn.to.module)?;
            graph.add_edge(from, to, ());
        }

        Ok(Self { graph, indices })
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Module ids in declaration order.
    pub fn module_ids(&self) -> impl Iterator<Item = &str> {
        self.graph.node_indices().map(|idx| self.graph[idx].as_str())
    }

    /// Number of connections feeding `module_id`.
    pub fn dependency_count(&self, module_id: &str) -> usize {
        self.indices
            .get(module_id)
            .map(|&idx| self.graph.edges_directed(idx, Direction::Incoming).count())
            .unwrap_or(0)
    }

    /// Consumers of `module_id`, once per connection.
    pub fn dependents(&self, module_id: &str) -> Vec<&str> {
        let Some(&idx) = self.indices.get(module_id) else {
            return Vec::new();
        };
        let mut dependents: Vec<&str> = self
            .graph
            .neighbors_directed(idx, Direction::Outgoing)
            .map(|n| self.graph[n].as_str())
            .collect();
        // petgraph lists neighbors newest-first
        dependents.reverse();
        dependents
    }

    /// Kahn's algorithm. Fails without a partial order when the graph has a cycle.
    pub fn topological_order(&self) -> Result<Vec<ModuleId>, WorkflowError> {
        let mut pending: Vec<usize> = self
            .graph
            .node_indices()
            .map(|idx| self.graph.edges_directed(idx, Direction::Incoming).count())
            .collect();

        let mut queue: VecDeque<NodeIndex> = self
            .graph
            .node_indices()
            .filter(|idx| pending[idx.index()] == 0)
            .collect();

        let mut order = Vec::with_capacity(self.graph.node_count());
        while let Some(idx) = queue.pop_front() {
            order.push(self.graph[idx].clone());
            let mut successors: Vec<NodeIndex> =
                self.graph.neighbors_directed(idx, Direction::Outgoing).collect();
            successors.reverse();
            for next in successors {
                let count = &mut pending[next.index()];
                *count -= 1;
                if *count == 0 {
                    queue.push_back(next);
                }
            }
        }

        if order.len() < self.graph.node_count() {
            let modules = self
                .graph
                .node_indices()
                .filter(|idx| pending[idx.index()] > 0)
                .map(|idx| self.graph[idx].clone())
                .collect();
            return Err(WorkflowError::CyclicDependency { modules });
        }

        Ok(order)
    }
}

fn lookup(indices: &HashMap<ModuleId, NodeIndex>, module: &str) -> Result<NodeIndex, WorkflowError> {
    indices
        .get(module)
        .copied()
        .ok_or_else(|| WorkflowError::UnknownModule {
            module: module.to_string(),
        })
}
