use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

use reggraph_core::{
    ComplianceStore, EntityId, NodeKind, NodeRef, PropagationOptions, RegGraphError, Regulation,
    Result, TenantId,
};
use reggraph_graph::{GraphCache, PropagationEngine, PropagationResult, PropagationSeed};

const TIMELINE_MAX_DEPTH: usize = 5;
/// Prior regulations contribute at half strength to the before state.
const PRIOR_REGULATION_WEIGHT: f64 = 0.5;
/// Deltas at or below this magnitude are noise and not reported.
const DELTA_FLOOR: f64 = 0.01;

/// Per-node change between the before and after states.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImpactDelta {
    pub node: NodeRef,
    pub before: f64,
    pub after: f64,
    pub delta: f64,
    pub percent_change: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImpactComparison {
    pub regulation_id: EntityId,
    pub tenant_id: TenantId,
    pub before_date: DateTime<Utc>,
    pub after_date: DateTime<Utc>,
    /// Sorted by |delta|, largest first.
    pub deltas: Vec<ImpactDelta>,
}

/// Straight-line before/after comparison of one regulation against the
/// baseline formed by every regulation already effective at the reference
/// date.
pub struct TimelineEngine {
    store: Arc<dyn ComplianceStore>,
    cache: Arc<GraphCache>,
}

impl TimelineEngine {
    pub fn new(store: Arc<dyn ComplianceStore>, cache: Arc<GraphCache>) -> Self {
        Self { store, cache }
    }

    pub async fn compare_impact(
        &self,
        regulation_id: EntityId,
        before_date: DateTime<Utc>,
        after_date: DateTime<Utc>,
    ) -> Result<ImpactComparison> {
        let regulation = self
            .store
            .find_regulation(regulation_id)
            .await?
            .ok_or_else(|| RegGraphError::NotFound(format!("regulation {regulation_id}")))?;
        let tenant_id = regulation.tenant_id;

        let prior = self
            .store
            .regulations_active_before(tenant_id, before_date, regulation_id)
            .await?;
        debug!(
            tenant = %tenant_id,
            regulation = %regulation_id,
            prior = prior.len(),
            "building timeline baseline"
        );

        let mut before: HashMap<NodeRef, f64> = HashMap::new();
        for prior_regulation in &prior {
            let result = self.propagate(tenant_id, prior_regulation).await?;
            let source = prior_regulation.node();
            for (node, impacted) in &result.nodes {
                if *node == source {
                    continue;
                }
                *before.entry(*node).or_insert(0.0) +=
                    impacted.impact_score * PRIOR_REGULATION_WEIGHT;
            }
        }

        let after_result = self.propagate(tenant_id, &regulation).await?;
        let source = regulation.node();
        let mut after: HashMap<NodeRef, f64> = HashMap::new();
        for (node, impacted) in &after_result.nodes {
            if *node == source {
                continue;
            }
            after.insert(*node, impacted.impact_score);
        }

        let mut keys: HashSet<NodeRef> = before.keys().copied().collect();
        keys.extend(after.keys().copied());

        let mut deltas = Vec::new();
        for node in keys {
            let before_score = before.get(&node).copied().unwrap_or(0.0);
            let after_score = after.get(&node).copied().unwrap_or(0.0);
            let delta = after_score - before_score;
            if delta.abs() <= DELTA_FLOOR {
                continue;
            }
            let percent_change = if before_score == 0.0 {
                100.0
            } else {
                delta / before_score * 100.0
            };
            deltas.push(ImpactDelta {
                node,
                before: before_score,
                after: after_score,
                delta,
                percent_change,
            });
        }
        deltas.sort_by(|a, b| {
            b.delta
                .abs()
                .partial_cmp(&a.delta.abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        Ok(ImpactComparison {
            regulation_id,
            tenant_id,
            before_date,
            after_date,
            deltas,
        })
    }

    async fn propagate(
        &self,
        tenant_id: TenantId,
        regulation: &Regulation,
    ) -> Result<PropagationResult> {
        let engine = PropagationEngine::new(tenant_id, self.store.clone(), self.cache.clone())
            .with_options(PropagationOptions::default().with_max_depth(TIMELINE_MAX_DEPTH));
        engine
            .propagate(
                PropagationSeed::new(NodeKind::Regulation, regulation.id)
                    .with_initial_impact(regulation.severity.initial_impact()),
            )
            .await
    }
}
