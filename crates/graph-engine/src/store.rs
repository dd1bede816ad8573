use crate::record::{EdgeRecord, NodeRecord};
use serde::Serialize;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, instrument};

/// Position of an edge in the append-only edge log.
pub type EdgePos = usize;

/// Result of a time-windowed expansion.
///
/// `nodes` never repeats an id. `edges` may: an edge joining two discovered
/// nodes is emitted once from each endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Subgraph {
    pub nodes: Vec<NodeRecord>,
    pub edges: Vec<EdgeRecord>,
}

/// Sizes of the store tables at a point in time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GraphStats {
    pub nodes: usize,
    pub edges: usize,
    /// Distinct ids present in the adjacency index, with or without a node record.
    pub indexed_ids: usize,
}

#[derive(Debug, Default)]
struct GraphTables {
    nodes: HashMap<String, NodeRecord>,
    edges: Vec<EdgeRecord>,
    /// Node id -> edge log positions, in insertion order.
    adjacency: HashMap<String, Vec<EdgePos>>,
}

/// Shared in-memory graph: node table, edge log and undirected adjacency index.
///
/// A single lock guards all three tables. Upserts hold it exclusively for the
/// whole batch, so an expansion sees either none or all of a batch.
#[derive(Debug, Default)]
pub struct GraphStore {
    tables: RwLock<GraphTables>,
}

impl GraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    // Only allocation failure can panic while a guard is held, and that aborts,
    // so a poisoned lock still guards consistent tables.
    fn read(&self) -> RwLockReadGuard<'_, GraphTables> {
        self.tables.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, GraphTables> {
        self.tables.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Inserts or replaces each node by id. Last write wins, no attribute merge.
    #[instrument(skip_all, fields(batch = batch.len()))]
    pub fn upsert_nodes(&self, batch: Vec<NodeRecord>) {
        let mut tables = self.write();
        for node in batch {
            tables.nodes.insert(node.id.clone(), node);
        }
        debug!(total = tables.nodes.len(), "nodes upserted");
    }

    /// Appends each edge to the log in batch order and indexes it under both endpoints.
    #[instrument(skip_all, fields(batch = batch.len()))]
    pub fn upsert_edges(&self, batch: Vec<EdgeRecord>) {
        let mut tables = self.write();
        let GraphTables {
            edges, adjacency, ..
        } = &mut *tables;

        edges.reserve(batch.len());
        for edge in batch {
            let pos = edges.len();
            adjacency.entry(edge.src.clone()).or_default().push(pos);
            adjacency.entry(edge.dst.clone()).or_default().push(pos);
            edges.push(edge);
        }
        debug!(total = edges.len(), "edges appended");
    }

    /// Breadth-first expansion from `seeds` over edges whose timestamp lies in
    /// `[window_start, window_end]`, stopping `max_hops` edges away from the seeds.
    ///
    /// Ids reached only through edges are traversed but not reported as nodes.
    #[instrument(skip(self, seeds), fields(seed_count = seeds.len()))]
    pub fn expand_time_window(
        &self,
        seeds: &[String],
        window_start: i64,
        window_end: i64,
        max_hops: u32,
    ) -> Subgraph {
        let tables = self.read();
        let mut out = Subgraph::default();

        let mut visited: HashSet<&str> = HashSet::new();
        let mut queue: VecDeque<(&str, u32)> = VecDeque::new();
        for seed in seeds {
            if visited.insert(seed.as_str()) {
                queue.push_back((seed.as_str(), 0));
            }
        }

        while let Some((id, hops)) = queue.pop_front() {
            if let Some(node) = tables.nodes.get(id) {
                out.nodes.push(node.clone());
            }
            if hops >= max_hops {
                continue;
            }
            let Some(positions) = tables.adjacency.get(id) else {
                continue;
            };
            for &pos in positions {
                let edge = &tables.edges[pos];
                if edge.timestamp < window_start || edge.timestamp > window_end {
                    continue;
                }
                out.edges.push(edge.clone());
                let next = edge.far_end(id);
                if visited.insert(next) {
                    queue.push_back((next, hops + 1));
                }
            }
        }

        debug!(
            nodes = out.nodes.len(),
            edges = out.edges.len(),
            "expansion finished"
        );
        out
    }

    pub fn stats(&self) -> GraphStats {
        let tables = self.read();
        GraphStats {
            nodes: tables.nodes.len(),
            edges: tables.edges.len(),
            indexed_ids: tables.adjacency.len(),
        }
    }

    /// Edge log positions indexed under `id`, in insertion order.
    pub fn incident_positions(&self, id: &str) -> Vec<EdgePos> {
        self.read().adjacency.get(id).cloned().unwrap_or_default()
    }
}
