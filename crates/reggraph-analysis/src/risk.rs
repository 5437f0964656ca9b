use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use reggraph_core::{
    AuditEntry, ComplianceStore, EntityId, EventPublisher, GraphEvent, NodeKind, NodeRef,
    PropagationOptions, RegGraphError, Regulation, RegulationImpact, Result, RiskLevel, RiskScore,
    Severity, TenantId,
};
use reggraph_graph::{GraphCache, PropagationEngine, PropagationResult, PropagationSeed};

const RISK_MAX_DEPTH: usize = 10;

/// Weight of a regulation's contributions when rolled into aggregate risk.
pub fn severity_multiplier(severity: Severity) -> f64 {
    match severity {
        Severity::Critical => 2.0,
        Severity::High => 1.5,
        Severity::Medium => 1.0,
        Severity::Low => 0.5,
    }
}

/// Aggregate exposure of one entity across all active regulations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskCalculationResult {
    pub entity: NodeRef,
    /// Adjusted score divided by the number of active regulations.
    pub base_risk_score: f64,
    /// Sum of severity-weighted contributions.
    pub adjusted_risk_score: f64,
    pub risk_level: RiskLevel,
    /// Contribution per regulation id.
    pub risk_factors: HashMap<EntityId, f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepartmentRisk {
    pub department_id: EntityId,
    pub name: String,
    pub code: String,
    pub base_risk_score: f64,
    pub adjusted_risk_score: f64,
    pub risk_level: RiskLevel,
}

/// Runs one propagation per active regulation and folds the per-node impacts
/// into risk scores. Consumes the propagation engine only; one engine is
/// constructed per regulation, so runs stay independent.
pub struct RiskAggregator {
    store: Arc<dyn ComplianceStore>,
    cache: Arc<GraphCache>,
    publisher: Arc<dyn EventPublisher>,
}

impl RiskAggregator {
    pub fn new(
        store: Arc<dyn ComplianceStore>,
        cache: Arc<GraphCache>,
        publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            store,
            cache,
            publisher,
        }
    }

    /// Recalculates every entity's risk for the tenant, persists the scores
    /// and each regulation's impact rows, and returns the results sorted by
    /// adjusted score, highest exposure first.
    pub async fn calculate_all_risks(
        &self,
        tenant_id: TenantId,
    ) -> Result<Vec<RiskCalculationResult>> {
        match self.recalculate(tenant_id).await {
            Ok(results) => Ok(results),
            Err(e) => {
                self.publish(
                    tenant_id,
                    GraphEvent::RecalculationError {
                        timestamp: Utc::now(),
                        message: e.to_string(),
                    },
                )
                .await;
                Err(e)
            }
        }
    }

    async fn recalculate(&self, tenant_id: TenantId) -> Result<Vec<RiskCalculationResult>> {
        let started = Instant::now();
        let regulations = self.store.active_regulations(tenant_id).await?;
        self.publish(
            tenant_id,
            GraphEvent::RecalculationStart {
                timestamp: Utc::now(),
                regulation_count: regulations.len(),
            },
        )
        .await;

        let mut totals: HashMap<NodeRef, f64> = HashMap::new();
        let mut factors: HashMap<NodeRef, HashMap<EntityId, f64>> = HashMap::new();
        let total = regulations.len();

        for (index, regulation) in regulations.iter().enumerate() {
            let result = self.propagate_regulation(tenant_id, regulation).await?;
            self.materialize_impacts(tenant_id, regulation, &result)
                .await?;

            let multiplier = severity_multiplier(regulation.severity);
            let source = regulation.node();
            for (node, impacted) in &result.nodes {
                if *node == source {
                    continue;
                }
                let contribution = impacted.impact_score * multiplier;
                *totals.entry(*node).or_insert(0.0) += contribution;
                factors
                    .entry(*node)
                    .or_default()
                    .insert(regulation.id, contribution);
            }

            let completed = index + 1;
            self.publish(
                tenant_id,
                GraphEvent::RecalculationProgress {
                    timestamp: Utc::now(),
                    completed,
                    total,
                    fraction: completed as f64 / total as f64,
                },
            )
            .await;
        }

        let regulation_count = total.max(1) as f64;
        let mut results: Vec<RiskCalculationResult> = totals
            .into_iter()
            .map(|(entity, adjusted)| {
                let base = adjusted / regulation_count;
                RiskCalculationResult {
                    entity,
                    base_risk_score: base,
                    adjusted_risk_score: adjusted,
                    risk_level: RiskLevel::from_score(base),
                    risk_factors: factors.remove(&entity).unwrap_or_default(),
                }
            })
            .collect();
        results.sort_by(|a, b| {
            b.adjusted_risk_score
                .partial_cmp(&a.adjusted_risk_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        for result in &results {
            self.store
                .upsert_risk_score(RiskScore {
                    tenant_id,
                    entity: result.entity,
                    base_score: result.base_risk_score,
                    adjusted_score: result.adjusted_risk_score,
                    level: result.risk_level,
                })
                .await?;
        }
        self.store
            .append_audit_log(AuditEntry::new(
                tenant_id,
                "risk.recalculated",
                json!({ "regulations": total, "entities": results.len() }),
            ))
            .await?;

        let duration_ms = started.elapsed().as_millis() as u64;
        self.publish(
            tenant_id,
            GraphEvent::RecalculationComplete {
                timestamp: Utc::now(),
                affected_entities: results.iter().map(|r| r.entity).collect(),
                duration_ms,
            },
        )
        .await;
        self.publish(
            tenant_id,
            GraphEvent::RiskUpdate {
                timestamp: Utc::now(),
                entity_count: results.len(),
            },
        )
        .await;

        info!(
            tenant = %tenant_id,
            regulations = total,
            entities = results.len(),
            duration_ms,
            "risk recalculation finished"
        );
        Ok(results)
    }

    /// Department rows only, enriched with name and code, highest exposure
    /// first.
    pub async fn department_risk_ranking(
        &self,
        tenant_id: TenantId,
    ) -> Result<Vec<DepartmentRisk>> {
        let risks = self.calculate_all_risks(tenant_id).await?;
        let mut ranking = Vec::new();
        for risk in risks
            .into_iter()
            .filter(|r| r.entity.kind == NodeKind::Department)
        {
            let (name, code) = match self.store.find_department(risk.entity.id).await? {
                Some(department) => (department.name, department.code),
                None => (risk.entity.id.to_string(), String::new()),
            };
            ranking.push(DepartmentRisk {
                department_id: risk.entity.id,
                name,
                code,
                base_risk_score: risk.base_risk_score,
                adjusted_risk_score: risk.adjusted_risk_score,
                risk_level: risk.risk_level,
            });
        }
        Ok(ranking)
    }

    /// Re-propagates a single regulation and replaces its materialized impact
    /// rows.
    pub async fn analyze_regulation(&self, regulation_id: EntityId) -> Result<PropagationResult> {
        let regulation = self
            .store
            .find_regulation(regulation_id)
            .await?
            .ok_or_else(|| RegGraphError::NotFound(format!("regulation {regulation_id}")))?;
        let tenant_id = regulation.tenant_id;

        let result = self.propagate_regulation(tenant_id, &regulation).await?;
        self.materialize_impacts(tenant_id, &regulation, &result)
            .await?;
        self.publish(
            tenant_id,
            GraphEvent::ImpactUpdate {
                timestamp: Utc::now(),
                regulation_id,
                affected_count: result.total_affected,
            },
        )
        .await;
        Ok(result)
    }

    async fn propagate_regulation(
        &self,
        tenant_id: TenantId,
        regulation: &Regulation,
    ) -> Result<PropagationResult> {
        let engine = PropagationEngine::new(tenant_id, self.store.clone(), self.cache.clone())
            .with_options(PropagationOptions::default().with_max_depth(RISK_MAX_DEPTH));
        engine
            .propagate(
                PropagationSeed::new(NodeKind::Regulation, regulation.id)
                    .with_initial_impact(regulation.severity.initial_impact()),
            )
            .await
    }

    async fn materialize_impacts(
        &self,
        tenant_id: TenantId,
        regulation: &Regulation,
        result: &PropagationResult,
    ) -> Result<()> {
        let source = regulation.node();
        let rows = result
            .nodes
            .iter()
            .filter(|(node, _)| **node != source)
            .map(|(node, impacted)| RegulationImpact {
                regulation_id: regulation.id,
                tenant_id,
                target: *node,
                score: impacted.impact_score,
                level: RiskLevel::from_score(impacted.impact_score),
                path: impacted.path.clone(),
            })
            .collect();
        self.store
            .replace_regulation_impacts(regulation.id, rows)
            .await
    }

    async fn publish(&self, tenant_id: TenantId, event: GraphEvent) {
        if let Err(e) = self.publisher.publish(tenant_id, event).await {
            warn!(tenant = %tenant_id, "event publish failed: {e}");
        }
    }
}
