// src/dag/graph.rs

use std::collections::{HashMap, HashSet, VecDeque};

use petgraph::algo::{tarjan_scc, toposort};
use petgraph::graphmap::DiGraphMap;
use tracing::debug;

use crate::dag::subtask::{Subtask, SubtaskId};
use crate::errors::DecompositionError;

/// Adjacency kept per subtask.
#[derive(Debug, Clone)]
struct GraphNode {
    /// Index into `TaskGraph::subtasks`.
    position: usize,
    /// Direct dependents: subtasks that list this one as a dependency.
    dependents: Vec<SubtaskId>,
}

/// Validated, immutable dependency graph of one task's subtasks.
///
/// Construction rejects unknown dependency ids, duplicate subtask ids and
/// cycles, so everything downstream can assume a well-formed DAG.
#[derive(Debug, Clone)]
pub struct TaskGraph {
    /// Subtasks in decomposition order.
    subtasks: Vec<Subtask>,
    nodes: HashMap<SubtaskId, GraphNode>,
}

impl TaskGraph {
    /// Validate `subtasks` and build forward (dependency -> dependent) edges.
    pub fn new(subtasks: Vec<Subtask>) -> Result<Self, DecompositionError> {
        let mut nodes: HashMap<SubtaskId, GraphNode> = HashMap::with_capacity(subtasks.len());

        // First pass: one node per subtask id.
        for (position, subtask) in subtasks.iter().enumerate() {
            let node = GraphNode {
                position,
                dependents: Vec::new(),
            };
            if nodes.insert(subtask.id.clone(), node).is_some() {
                return Err(DecompositionError::DuplicateSubtask(subtask.id.clone()));
            }
        }

        // Second pass: populate dependents, rejecting dangling references.
        for subtask in &subtasks {
            for dep in &subtask.dependencies {
                match nodes.get_mut(dep) {
                    Some(node) => node.dependents.push(subtask.id.clone()),
                    None => {
                        return Err(DecompositionError::InvalidDependency {
                            subtask: subtask.id.clone(),
                            dependency: dep.clone(),
                        });
                    }
                }
            }
        }

        ensure_acyclic(&subtasks)?;

        debug!(subtasks = subtasks.len(), "task graph validated");

        Ok(Self { subtasks, nodes })
    }

    pub fn len(&self) -> usize {
        self.subtasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subtasks.is_empty()
    }

    /// All subtasks in decomposition order.
    pub fn subtasks(&self) -> &[Subtask] {
        &self.subtasks
    }

    pub fn get(&self, id: &str) -> Option<&Subtask> {
        let node = self.nodes.get(id)?;
        self.subtasks.get(node.position)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    /// Position of `id` in decomposition order.
    pub(crate) fn position(&self, id: &str) -> Option<usize> {
        self.nodes.get(id).map(|n| n.position)
    }

    /// Immediate dependencies of a subtask.
    pub fn dependencies_of(&self, id: &str) -> impl Iterator<Item = &str> {
        self.get(id)
            .into_iter()
            .flat_map(|s| s.dependencies.iter().map(String::as_str))
    }

    /// Immediate dependents of a subtask.
    pub fn dependents_of(&self, id: &str) -> &[SubtaskId] {
        self.nodes
            .get(id)
            .map(|n| n.dependents.as_slice())
            .unwrap_or(&[])
    }

    /// Subtasks with no dependencies, in decomposition order.
    pub fn roots(&self) -> impl Iterator<Item = &Subtask> {
        self.subtasks.iter().filter(|s| s.dependencies.is_empty())
    }

    /// Every subtask reachable from `id` through dependent edges, excluding
    /// `id` itself, in breadth-first order.
    pub fn descendants_of(&self, id: &str) -> Vec<&str> {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut order = Vec::new();
        let mut queue: VecDeque<&str> = self.dependents_of(id).iter().map(String::as_str).collect();

        while let Some(name) = queue.pop_front() {
            if !seen.insert(name) {
                continue;
            }
            order.push(name);
            queue.extend(self.dependents_of(name).iter().map(String::as_str));
        }

        order
    }
}

fn ensure_acyclic(subtasks: &[Subtask]) -> Result<(), DecompositionError> {
    // Edge direction: dependency -> dependent.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for subtask in subtasks {
        graph.add_node(subtask.id.as_str());
    }

    for subtask in subtasks {
        for dep in &subtask.dependencies {
            graph.add_edge(dep.as_str(), subtask.id.as_str(), ());
        }
    }

    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => Err(DecompositionError::CyclicDependency {
            cycle: extract_cycle(&graph, cycle.node_id()),
        }),
    }
}

/// Walk the strongly connected component containing `start` until a node
/// repeats, and return that closed path.
fn extract_cycle<'a>(graph: &DiGraphMap<&'a str, ()>, start: &'a str) -> Vec<SubtaskId> {
    let component: HashSet<&'a str> = tarjan_scc(graph)
        .into_iter()
        .find(|scc| scc.contains(&start))
        .map(|scc| scc.into_iter().collect())
        .unwrap_or_default();

    let mut path: Vec<&'a str> = vec![start];
    let mut current = start;

    while let Some(next) = graph.neighbors(current).find(|n| component.contains(n)) {
        if let Some(pos) = path.iter().position(|&p| p == next) {
            let mut cycle: Vec<SubtaskId> = path[pos..].iter().map(|s| s.to_string()).collect();
            cycle.push(next.to_string());
            return cycle;
        }
        path.push(next);
        current = next;
    }

    vec![start.to_string()]
}
