use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use reggraph_cache::{tags, TagCache};
use reggraph_core::{CacheSettings, ComplianceStore, Result, TenantId};

use crate::DependencyGraph;

/// Cache key for a tenant's dependency graph (namespaced by tenant inside
/// the cache).
pub const DEPENDENCY_GRAPH_KEY: &str = "dependency-graph";

/// The cache instance shared by graph builders and their consumers.
pub type GraphCache = TagCache<Arc<DependencyGraph>>;

/// Loads a tenant's active edges and materializes the adjacency indexes,
/// caching the result under the `dependency-graph` tag. Deterministic for a
/// fixed edge set; a store failure propagates and nothing partial is cached.
#[derive(Clone)]
pub struct GraphBuilder {
    store: Arc<dyn ComplianceStore>,
    cache: Arc<GraphCache>,
    graph_ttl: Duration,
}

impl GraphBuilder {
    pub fn new(store: Arc<dyn ComplianceStore>, cache: Arc<GraphCache>) -> Self {
        Self {
            store,
            cache,
            graph_ttl: CacheSettings::default().graph_ttl,
        }
    }

    pub fn with_graph_ttl(mut self, ttl: Duration) -> Self {
        self.graph_ttl = ttl;
        self
    }

    pub fn cache(&self) -> &Arc<GraphCache> {
        &self.cache
    }

    /// Returns the cached graph when present, otherwise rebuilds from the
    /// store's current active edge set.
    pub async fn build(&self, tenant_id: TenantId) -> Result<Arc<DependencyGraph>> {
        if let Some(graph) = self.cache.get(tenant_id, DEPENDENCY_GRAPH_KEY) {
            debug!(tenant = %tenant_id, "dependency graph cache hit");
            return Ok(graph);
        }

        let edges = self.store.active_edges(tenant_id).await?;
        let graph = Arc::new(DependencyGraph::from_edges(edges));
        self.cache.set(
            tenant_id,
            DEPENDENCY_GRAPH_KEY,
            graph.clone(),
            Some(self.graph_ttl),
            vec![tags::DEPENDENCY_GRAPH.to_string()],
        );
        info!(
            tenant = %tenant_id,
            edges = graph.edge_count(),
            nodes = graph.node_count(),
            "dependency graph rebuilt"
        );
        Ok(graph)
    }
}
