use reggraph_core::{EntityId, NodeKind, TenantId};

use crate::TagCache;

/// Tag vocabulary shared by everything that writes to or invalidates the
/// cache.
pub mod tags {
    use reggraph_core::{EntityId, NodeKind};

    pub const DEPENDENCY_GRAPH: &str = "dependency-graph";
    pub const RISK_SCORES: &str = "risk-scores";
    pub const IMPACT_ANALYSIS: &str = "impact-analysis";

    pub fn regulation(id: EntityId) -> String {
        format!("regulation:{id}")
    }

    pub fn entity(kind: NodeKind, id: EntityId) -> String {
        format!("entity:{kind}:{id}")
    }
}

/// Grouped invalidation entry points. Store wrappers call these after any
/// entity or edge mutation, before reporting success to their caller.
impl<V> TagCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// A regulation changed: its cached analyses, the tenant's graph, and all
    /// derived risk state are stale.
    pub fn invalidate_regulation(&self, tenant_id: TenantId, regulation_id: EntityId) -> usize {
        self.invalidate_scoped(
            tenant_id,
            &[
                tags::regulation(regulation_id),
                tags::DEPENDENCY_GRAPH.to_string(),
                tags::RISK_SCORES.to_string(),
                tags::IMPACT_ANALYSIS.to_string(),
            ],
        )
    }

    /// A department/budget/service/KPI changed.
    pub fn invalidate_entity(&self, tenant_id: TenantId, kind: NodeKind, id: EntityId) -> usize {
        self.invalidate_scoped(
            tenant_id,
            &[
                tags::entity(kind, id),
                tags::DEPENDENCY_GRAPH.to_string(),
                tags::RISK_SCORES.to_string(),
            ],
        )
    }

    /// An edge was created, re-weighted, or deactivated.
    pub fn invalidate_edges(&self, tenant_id: TenantId) -> usize {
        self.invalidate_scoped(tenant_id, &[tags::DEPENDENCY_GRAPH.to_string()])
    }
}
