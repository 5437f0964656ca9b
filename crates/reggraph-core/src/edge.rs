use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EdgeId, ImpactType, NodeRef, TenantId};

/// A directed, weighted dependency between two graph nodes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImpactEdge {
    pub id: EdgeId,
    pub tenant_id: TenantId,
    pub source: NodeRef,
    pub target: NodeRef,
    /// In [0, 1].
    pub weight: f64,
    pub impact_type: ImpactType,
    pub category: Option<String>,
    /// Free-form condition payload, consulted for `Conditional` edges.
    pub condition: Option<serde_json::Value>,
    pub active: bool,
}

impl ImpactEdge {
    pub fn new(
        tenant_id: TenantId,
        source: NodeRef,
        target: NodeRef,
        impact_type: ImpactType,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            tenant_id,
            source,
            target,
            weight: 1.0,
            impact_type,
            category: None,
            condition: None,
            active: true,
        }
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_category<S: Into<String>>(mut self, category: S) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_condition(mut self, condition: serde_json::Value) -> Self {
        self.condition = Some(condition);
        self
    }

    /// Identity of the edge within the graph: (source, target) pair.
    pub fn key(&self) -> (NodeRef, NodeRef) {
        (self.source, self.target)
    }
}

/// An edge as it was accepted during a propagation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraversedEdge {
    pub source: NodeRef,
    pub target: NodeRef,
    pub weight: f64,
    pub impact_type: ImpactType,
}

impl From<&ImpactEdge> for TraversedEdge {
    fn from(edge: &ImpactEdge) -> Self {
        Self {
            source: edge.source,
            target: edge.target,
            weight: edge.weight,
            impact_type: edge.impact_type,
        }
    }
}
