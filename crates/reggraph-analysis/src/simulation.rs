use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use reggraph_core::{ComplianceStore, EntityId, EventPublisher, GraphEvent, TenantId};
use reggraph_graph::GraphCache;

use crate::{ImpactComparison, TimelineEngine};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SimulationStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

/// One what-if comparison of a regulation against a reference date. The
/// record is the unit of truth for a simulation's outcome: a failed run
/// carries the error message and no partial comparison.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationRun {
    pub id: Uuid,
    pub tenant_id: TenantId,
    pub regulation_id: EntityId,
    pub before_date: DateTime<Utc>,
    pub after_date: DateTime<Utc>,
    pub status: SimulationStatus,
    pub error: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub comparison: Option<ImpactComparison>,
}

impl SimulationRun {
    pub fn new(
        tenant_id: TenantId,
        regulation_id: EntityId,
        before_date: DateTime<Utc>,
        after_date: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            tenant_id,
            regulation_id,
            before_date,
            after_date,
            status: SimulationStatus::Pending,
            error: None,
            started_at: None,
            finished_at: None,
            comparison: None,
        }
    }
}

/// Drives a [`SimulationRun`] through its lifecycle and announces each stage.
pub struct SimulationRunner {
    timeline: TimelineEngine,
    publisher: Arc<dyn EventPublisher>,
}

impl SimulationRunner {
    pub fn new(
        store: Arc<dyn ComplianceStore>,
        cache: Arc<GraphCache>,
        publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            timeline: TimelineEngine::new(store, cache),
            publisher,
        }
    }

    pub async fn run(&self, mut run: SimulationRun) -> SimulationRun {
        run.status = SimulationStatus::Running;
        run.started_at = Some(Utc::now());
        self.publish(
            run.tenant_id,
            GraphEvent::SimulationStart {
                timestamp: Utc::now(),
                simulation_id: run.id,
            },
        )
        .await;

        match self
            .timeline
            .compare_impact(run.regulation_id, run.before_date, run.after_date)
            .await
        {
            Ok(comparison) => {
                self.publish(
                    run.tenant_id,
                    GraphEvent::SimulationProgress {
                        timestamp: Utc::now(),
                        simulation_id: run.id,
                        fraction: 1.0,
                    },
                )
                .await;
                self.publish(
                    run.tenant_id,
                    GraphEvent::SimulationComplete {
                        timestamp: Utc::now(),
                        simulation_id: run.id,
                        delta_count: comparison.deltas.len(),
                    },
                )
                .await;
                info!(
                    simulation = %run.id,
                    deltas = comparison.deltas.len(),
                    "simulation completed"
                );
                run.status = SimulationStatus::Completed;
                run.comparison = Some(comparison);
            }
            Err(e) => {
                self.publish(
                    run.tenant_id,
                    GraphEvent::SimulationError {
                        timestamp: Utc::now(),
                        simulation_id: run.id,
                        message: e.to_string(),
                    },
                )
                .await;
                warn!(simulation = %run.id, "simulation failed: {e}");
                run.status = SimulationStatus::Failed;
                run.error = Some(e.to_string());
            }
        }

        run.finished_at = Some(Utc::now());
        run
    }

    async fn publish(&self, tenant_id: TenantId, event: GraphEvent) {
        if let Err(e) = self.publisher.publish(tenant_id, event).await {
            warn!(tenant = %tenant_id, "event publish failed: {e}");
        }
    }
}
