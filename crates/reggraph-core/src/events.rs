use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{EntityId, EventPublisher, NodeRef, Result, TenantId};

/// Notification emitted by the recalculation, impact, and simulation paths.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GraphEvent {
    RecalculationStart {
        timestamp: DateTime<Utc>,
        regulation_count: usize,
    },
    RecalculationProgress {
        timestamp: DateTime<Utc>,
        completed: usize,
        total: usize,
        fraction: f64,
    },
    RecalculationComplete {
        timestamp: DateTime<Utc>,
        affected_entities: Vec<NodeRef>,
        duration_ms: u64,
    },
    RecalculationError {
        timestamp: DateTime<Utc>,
        message: String,
    },
    ImpactUpdate {
        timestamp: DateTime<Utc>,
        regulation_id: EntityId,
        affected_count: usize,
    },
    RiskUpdate {
        timestamp: DateTime<Utc>,
        entity_count: usize,
    },
    SimulationStart {
        timestamp: DateTime<Utc>,
        simulation_id: Uuid,
    },
    SimulationProgress {
        timestamp: DateTime<Utc>,
        simulation_id: Uuid,
        fraction: f64,
    },
    SimulationComplete {
        timestamp: DateTime<Utc>,
        simulation_id: Uuid,
        delta_count: usize,
    },
    SimulationError {
        timestamp: DateTime<Utc>,
        simulation_id: Uuid,
        message: String,
    },
}

/// An event together with the tenant it belongs to.
#[derive(Debug, Clone)]
pub struct TenantEvent {
    pub tenant_id: TenantId,
    pub event: GraphEvent,
}

const FANOUT_BUFFER: usize = 1024;
const SUBSCRIBER_BUFFER: usize = 256;

/// In-process publisher. `publish` hands the event to a fan-out worker over a
/// bounded channel and returns immediately, so engine paths never block on
/// delivery; the worker re-broadcasts per tenant to whoever subscribed.
#[derive(Clone)]
pub struct EventBus {
    tx: mpsc::Sender<TenantEvent>,
    subscribers: Arc<DashMap<TenantId, broadcast::Sender<TenantEvent>>>,
}

impl EventBus {
    /// Must be called from within a tokio runtime; the fan-out worker is
    /// spawned here and runs until the bus is dropped.
    pub fn new() -> Self {
        let (tx, mut rx) = mpsc::channel::<TenantEvent>(FANOUT_BUFFER);
        let subscribers: Arc<DashMap<TenantId, broadcast::Sender<TenantEvent>>> =
            Arc::new(DashMap::new());

        let fanout = subscribers.clone();
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                if let Some(sender) = fanout.get(&event.tenant_id) {
                    if sender.send(event.clone()).is_err() {
                        debug!(tenant = %event.tenant_id, "no live subscribers for event");
                    }
                }
            }
        });

        Self { tx, subscribers }
    }

    /// Subscribe to all events for one tenant.
    pub fn subscribe(&self, tenant_id: TenantId) -> broadcast::Receiver<TenantEvent> {
        self.subscribers
            .entry(tenant_id)
            .or_insert_with(|| broadcast::channel(SUBSCRIBER_BUFFER).0)
            .subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventPublisher for EventBus {
    async fn publish(&self, tenant_id: TenantId, event: GraphEvent) -> Result<()> {
        if let Err(e) = self.tx.try_send(TenantEvent { tenant_id, event }) {
            warn!(tenant = %tenant_id, "event dropped: {e}");
        }
        Ok(())
    }
}

/// Publisher that discards everything. Useful in tests and batch tooling.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopPublisher;

#[async_trait]
impl EventPublisher for NoopPublisher {
    async fn publish(&self, _tenant_id: TenantId, _event: GraphEvent) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_discriminants_are_screaming_snake_case() {
        let event = GraphEvent::RecalculationStart {
            timestamp: Utc::now(),
            regulation_count: 3,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "RECALCULATION_START");

        let event = GraphEvent::SimulationError {
            timestamp: Utc::now(),
            simulation_id: Uuid::new_v4(),
            message: "boom".into(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "SIMULATION_ERROR");
    }

    #[tokio::test]
    async fn bus_delivers_to_tenant_subscribers_only() {
        let bus = EventBus::new();
        let tenant_a = Uuid::new_v4();
        let tenant_b = Uuid::new_v4();

        let mut rx_a = bus.subscribe(tenant_a);
        let mut rx_b = bus.subscribe(tenant_b);

        bus.publish(
            tenant_a,
            GraphEvent::RiskUpdate {
                timestamp: Utc::now(),
                entity_count: 7,
            },
        )
        .await
        .unwrap();

        let received = tokio::time::timeout(std::time::Duration::from_secs(1), rx_a.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(received.tenant_id, tenant_a);

        assert!(tokio::time::timeout(std::time::Duration::from_millis(50), rx_b.recv())
            .await
            .is_err());
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_best_effort() {
        let bus = EventBus::new();
        let result = bus
            .publish(
                Uuid::new_v4(),
                GraphEvent::RecalculationError {
                    timestamp: Utc::now(),
                    message: "store offline".into(),
                },
            )
            .await;
        assert!(result.is_ok());
    }
}
