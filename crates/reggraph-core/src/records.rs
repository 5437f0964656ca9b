use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EntityId, NodeRef, RiskLevel, TenantId, TraversedEdge};

/// Materialized impact of one regulation on one reachable node.
/// Rows for a regulation are replaced wholesale on every propagation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegulationImpact {
    pub regulation_id: EntityId,
    pub tenant_id: TenantId,
    pub target: NodeRef,
    pub score: f64,
    pub level: RiskLevel,
    pub path: Vec<TraversedEdge>,
}

/// Aggregate risk exposure of one entity across all active regulations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskScore {
    pub tenant_id: TenantId,
    pub entity: NodeRef,
    pub base_score: f64,
    pub adjusted_score: f64,
    pub level: RiskLevel,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: Uuid,
    pub tenant_id: TenantId,
    pub action: String,
    pub detail: serde_json::Value,
    pub recorded_at: DateTime<Utc>,
}

impl AuditEntry {
    pub fn new<A: Into<String>>(tenant_id: TenantId, action: A, detail: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            tenant_id,
            action: action.into(),
            detail,
            recorded_at: Utc::now(),
        }
    }
}
