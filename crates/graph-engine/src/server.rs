//! gRPC front end for the graph store.
//!
//! Handlers only translate between wire messages and records; all state lives
//! in the shared [`GraphStore`].

use crate::config::EngineConfig;
use crate::error::EngineResult;
use crate::record::{EdgeRecord, NodeRecord};
use crate::store::{GraphStats, GraphStore};
use std::sync::Arc;
use tonic::transport::Server;
use tonic::{Request, Response, Status};
use tracing::{debug, info, instrument};

pub mod proto {
    tonic::include_proto!("graph");
}

use proto::graph_engine_server::{GraphEngine, GraphEngineServer};
use proto::{
    Ack, Edge, ExpandRequest, GraphFragment, Node, StatsRequest, StatsResponse,
    UpsertEdgesRequest, UpsertNodesRequest,
};

impl From<Node> for NodeRecord {
    fn from(n: Node) -> Self {
        Self {
            id: n.id,
            kind: n.r#type,
            timestamp: n.ts,
            attributes: n.attrs,
        }
    }
}

impl From<NodeRecord> for Node {
    fn from(n: NodeRecord) -> Self {
        Self {
            id: n.id,
            r#type: n.kind,
            ts: n.timestamp,
            attrs: n.attributes,
        }
    }
}

impl From<Edge> for EdgeRecord {
    fn from(e: Edge) -> Self {
        Self {
            src: e.src,
            dst: e.dst,
            kind: e.r#type,
            weight: e.weight,
            timestamp: e.ts,
            attributes: e.attrs,
        }
    }
}

impl From<EdgeRecord> for Edge {
    fn from(e: EdgeRecord) -> Self {
        Self {
            src: e.src,
            dst: e.dst,
            r#type: e.kind,
            weight: e.weight,
            ts: e.timestamp,
            attrs: e.attributes,
        }
    }
}

impl From<GraphStats> for StatsResponse {
    fn from(s: GraphStats) -> Self {
        Self {
            nodes: s.nodes as u64,
            edges: s.edges as u64,
            indexed_ids: s.indexed_ids as u64,
        }
    }
}

#[derive(Clone, Default)]
pub struct GraphEngineService {
    store: Arc<GraphStore>,
}

impl GraphEngineService {
    pub fn new(store: Arc<GraphStore>) -> Self {
        Self { store }
    }

    pub fn into_server(self) -> GraphEngineServer<Self> {
        GraphEngineServer::new(self)
    }
}

#[tonic::async_trait]
impl GraphEngine for GraphEngineService {
    #[instrument(skip(self, request))]
    async fn upsert_nodes(
        &self,
        request: Request<UpsertNodesRequest>,
    ) -> Result<Response<Ack>, Status> {
        let req = request.into_inner();
        debug!(count = req.nodes.len(), "UpsertNodes");

        let batch = req.nodes.into_iter().map(NodeRecord::from).collect();
        self.store.upsert_nodes(batch);
        Ok(Response::new(Ack { ok: true }))
    }

    #[instrument(skip(self, request))]
    async fn upsert_edges(
        &self,
        request: Request<UpsertEdgesRequest>,
    ) -> Result<Response<Ack>, Status> {
        let req = request.into_inner();
        debug!(count = req.edges.len(), "UpsertEdges");

        let batch = req.edges.into_iter().map(EdgeRecord::from).collect();
        self.store.upsert_edges(batch);
        Ok(Response::new(Ack { ok: true }))
    }

    #[instrument(skip(self, request))]
    async fn expand_time_window(
        &self,
        request: Request<ExpandRequest>,
    ) -> Result<Response<GraphFragment>, Status> {
        let req = request.into_inner();
        let window = req.window.unwrap_or_default();
        debug!(
            seeds = req.seed_ids.len(),
            start_ms = window.start_ms,
            end_ms = window.end_ms,
            max_hops = req.max_hops,
            "ExpandTimeWindow"
        );

        let sub = self.store.expand_time_window(
            &req.seed_ids,
            window.start_ms,
            window.end_ms,
            req.max_hops,
        );

        Ok(Response::new(GraphFragment {
            nodes: sub.nodes.into_iter().map(Node::from).collect(),
            edges: sub.edges.into_iter().map(Edge::from).collect(),
        }))
    }

    #[instrument(skip(self, _request))]
    async fn get_stats(
        &self,
        _request: Request<StatsRequest>,
    ) -> Result<Response<StatsResponse>, Status> {
        Ok(Response::new(self.store.stats().into()))
    }
}

/// Serves the gRPC API on `config.listen_addr` until the process is stopped.
pub async fn serve(config: &EngineConfig, store: Arc<GraphStore>) -> EngineResult<()> {
    info!(addr = %config.listen_addr, "GraphEngine listening");

    Server::builder()
        .add_service(GraphEngineService::new(store).into_server())
        .serve(config.listen_addr)
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proto::TimeWindow;
    use std::collections::HashMap;

    fn node(id: &str, attrs: &[(&str, &str)]) -> Node {
        Node {
            id: id.to_string(),
            r#type: "entity".to_string(),
            ts: 0,
            attrs: attrs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    fn edge(src: &str, dst: &str, ts: i64) -> Edge {
        Edge {
            src: src.to_string(),
            dst: dst.to_string(),
            r#type: "MENTION".to_string(),
            weight: 0.5,
            ts,
            attrs: HashMap::new(),
        }
    }

    fn expand(seeds: &[&str], start_ms: i64, end_ms: i64, max_hops: u32) -> ExpandRequest {
        ExpandRequest {
            seed_ids: seeds.iter().map(|s| s.to_string()).collect(),
            window: Some(TimeWindow { start_ms, end_ms }),
            max_hops,
        }
    }

    async fn seeded() -> GraphEngineService {
        let service = GraphEngineService::default();
        let ack = service
            .upsert_nodes(Request::new(UpsertNodesRequest {
                nodes: vec![node("ent:TATA", &[("name", "TATA")]), node("doc:1", &[])],
            }))
            .await
            .unwrap()
            .into_inner();
        assert!(ack.ok);

        let ack = service
            .upsert_edges(Request::new(UpsertEdgesRequest {
                edges: vec![edge("ent:TATA", "doc:1", 100), edge("ent:FOX", "doc:1", 200)],
            }))
            .await
            .unwrap()
            .into_inner();
        assert!(ack.ok);
        service
    }

    #[tokio::test]
    async fn test_expand_maps_records_back_to_wire() {
        let service = seeded().await;
        let fragment = service
            .expand_time_window(Request::new(expand(&["ent:TATA"], 0, 150, 2)))
            .await
            .unwrap()
            .into_inner();

        let ids: Vec<_> = fragment.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["ent:TATA", "doc:1"]);
        assert_eq!(fragment.nodes[0].attrs.get("name").map(String::as_str), Some("TATA"));

        // TATA-doc:1 is emitted from both ends; FOX-doc:1 is outside the window.
        assert_eq!(fragment.edges.len(), 2);
        assert!(fragment.edges.iter().all(|e| e.src == "ent:TATA"));
        assert_eq!(fragment.edges[0].weight, 0.5);
        assert_eq!(fragment.edges[0].r#type, "MENTION");
    }

    #[tokio::test]
    async fn test_edge_only_node_is_not_reported() {
        let service = seeded().await;
        let fragment = service
            .expand_time_window(Request::new(expand(&["ent:FOX"], 0, 1_000, 1)))
            .await
            .unwrap()
            .into_inner();

        let ids: Vec<_> = fragment.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["doc:1"]);
        assert_eq!(fragment.edges.len(), 1);
    }

    #[tokio::test]
    async fn test_absent_window_defaults_to_epoch_zero() {
        let service = GraphEngineService::default();
        service
            .upsert_nodes(Request::new(UpsertNodesRequest {
                nodes: vec![node("A", &[]), node("B", &[]), node("C", &[])],
            }))
            .await
            .unwrap();
        service
            .upsert_edges(Request::new(UpsertEdgesRequest {
                edges: vec![edge("A", "B", 0), edge("A", "C", 5)],
            }))
            .await
            .unwrap();

        let mut req = expand(&["A"], 0, 0, 1);
        req.window = None;

        let fragment = service
            .expand_time_window(Request::new(req))
            .await
            .unwrap()
            .into_inner();
        let ids: Vec<_> = fragment.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["A", "B"]);
        assert_eq!(fragment.edges.len(), 1);
        assert!(fragment.edges.iter().all(|e| e.ts == 0));
    }

    #[tokio::test]
    async fn test_wire_weight_is_taken_verbatim() {
        let service = GraphEngineService::default();
        let mut zero = edge("a", "b", 1);
        zero.weight = 0.0;
        service
            .upsert_edges(Request::new(UpsertEdgesRequest { edges: vec![zero] }))
            .await
            .unwrap();

        let fragment = service
            .expand_time_window(Request::new(expand(&["a"], 0, 1, 1)))
            .await
            .unwrap()
            .into_inner();
        assert_eq!(fragment.edges[0].weight, 0.0);
    }

    #[tokio::test]
    async fn test_stats() {
        let service = seeded().await;
        let stats = service
            .get_stats(Request::new(StatsRequest {}))
            .await
            .unwrap()
            .into_inner();
        assert_eq!(stats.nodes, 2);
        assert_eq!(stats.edges, 2);
        assert_eq!(stats.indexed_ids, 3);
    }
}
