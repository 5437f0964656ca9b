use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    AuditEntry, Budget, Department, EntityId, GraphEvent, ImpactEdge, Kpi, NodeKind, NodeRef,
    Regulation, RegulationImpact, Result, RiskScore, Service, Tenant, TenantId,
};

/// Persistence boundary. The engine only ever reaches durable state through
/// this trait; implementations own connection handling, timeouts, and retry.
#[async_trait]
pub trait ComplianceStore: Send + Sync {
    async fn find_tenant(&self, id: TenantId) -> Result<Option<Tenant>>;
    async fn find_regulation(&self, id: EntityId) -> Result<Option<Regulation>>;
    async fn find_department(&self, id: EntityId) -> Result<Option<Department>>;
    async fn find_budget(&self, id: EntityId) -> Result<Option<Budget>>;
    async fn find_service(&self, id: EntityId) -> Result<Option<Service>>;
    async fn find_kpi(&self, id: EntityId) -> Result<Option<Kpi>>;

    /// All active edges for the tenant.
    async fn active_edges(&self, tenant_id: TenantId) -> Result<Vec<ImpactEdge>>;

    /// All active, non-draft regulations for the tenant.
    async fn active_regulations(&self, tenant_id: TenantId) -> Result<Vec<Regulation>>;

    /// Active regulations effective before `date`, excluding one regulation.
    async fn regulations_active_before(
        &self,
        tenant_id: TenantId,
        date: DateTime<Utc>,
        excluding: EntityId,
    ) -> Result<Vec<Regulation>>;

    /// Atomic wipe-and-insert of one regulation's derived impact rows.
    async fn replace_regulation_impacts(
        &self,
        regulation_id: EntityId,
        impacts: Vec<RegulationImpact>,
    ) -> Result<()>;

    /// Idempotent upsert keyed on (tenant, entity).
    async fn upsert_risk_score(&self, score: RiskScore) -> Result<()>;

    /// Append-only.
    async fn append_audit_log(&self, entry: AuditEntry) -> Result<()>;
}

/// Outbound notification seam. Delivery is best-effort and per-tenant;
/// implementations must never let a failed delivery surface into engine
/// results.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, tenant_id: TenantId, event: GraphEvent) -> Result<()>;
}

/// Current display name of the entity behind `node`, if it exists.
pub async fn display_name(store: &dyn ComplianceStore, node: NodeRef) -> Result<Option<String>> {
    Ok(match node.kind {
        NodeKind::Regulation => store.find_regulation(node.id).await?.map(|r| r.name),
        NodeKind::Department => store.find_department(node.id).await?.map(|d| d.name),
        NodeKind::Budget => store.find_budget(node.id).await?.map(|b| b.name),
        NodeKind::Service => store.find_service(node.id).await?.map(|s| s.name),
        NodeKind::Kpi => store.find_kpi(node.id).await?.map(|k| k.name),
    })
}
