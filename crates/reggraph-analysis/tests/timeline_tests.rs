use std::sync::Arc;

use chrono::{Duration, Utc};
use uuid::Uuid;

use reggraph_analysis::TimelineEngine;
use reggraph_core::{
    Department, ImpactEdge, ImpactType, MemoryStore, NodeRef, RegGraphError, Regulation, Severity,
    Tenant, TenantId,
};
use reggraph_graph::GraphCache;

struct Fixture {
    store: Arc<MemoryStore>,
    cache: Arc<GraphCache>,
    tenant: TenantId,
}

impl Fixture {
    fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let tenant = Tenant::new("acme", "Acme Corp");
        let tenant_id = tenant.id;
        store.put_tenant(tenant);
        Self {
            store,
            cache: Arc::new(GraphCache::new()),
            tenant: tenant_id,
        }
    }

    fn engine(&self) -> TimelineEngine {
        TimelineEngine::new(self.store.clone(), self.cache.clone())
    }

    fn department(&self, code: &str) -> Department {
        let department = Department::new(self.tenant, code, format!("{code} dept"));
        self.store.put_department(department.clone()).unwrap();
        department
    }

    fn direct_edge(&self, source: NodeRef, target: NodeRef, weight: f64) {
        self.store
            .insert_edge(
                ImpactEdge::new(self.tenant, source, target, ImpactType::Direct)
                    .with_weight(weight),
            )
            .unwrap();
    }
}

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

#[tokio::test]
async fn before_and_after_states_produce_ranked_deltas() {
    let fx = Fixture::new();
    let now = Utc::now();

    // Baseline regulation, already effective: seeds 0.8, weighted 0.5.
    let prior = Regulation::new(fx.tenant, "SOX", "Sarbanes-Oxley", Severity::High)
        .with_effective_date(now - Duration::days(60));
    fx.store.put_regulation(prior.clone()).unwrap();

    // Regulation under comparison: Critical seeds 1.0.
    let target = Regulation::new(fx.tenant, "AI-ACT", "AI Act", Severity::Critical)
        .with_effective_date(now);
    fx.store.put_regulation(target.clone()).unwrap();

    let d1 = fx.department("D1");
    let d2 = fx.department("D2");
    let d3 = fx.department("D3");
    let d4 = fx.department("D4");

    fx.direct_edge(prior.node(), d1.node(), 1.0);
    fx.direct_edge(prior.node(), d3.node(), 1.0);
    fx.direct_edge(prior.node(), d4.node(), 1.0);
    fx.direct_edge(target.node(), d1.node(), 1.0);
    fx.direct_edge(target.node(), d2.node(), 0.5);
    fx.direct_edge(target.node(), d3.node(), 0.4);

    let comparison = fx
        .engine()
        .compare_impact(target.id, now, now + Duration::days(1))
        .await
        .unwrap();

    // D1: before 0.8*0.5 = 0.4, after 1.0  -> +0.6 (150%)
    // D2: before 0,            after 0.5   -> +0.5 (100%)
    // D3: before 0.4,          after 0.4   -> 0, suppressed
    // D4: before 0.4,          after 0     -> -0.4 (-100%)
    assert_eq!(comparison.deltas.len(), 3);

    let first = &comparison.deltas[0];
    assert_eq!(first.node, d1.node());
    assert!(approx(first.before, 0.4));
    assert!(approx(first.after, 1.0));
    assert!(approx(first.delta, 0.6));
    assert!(approx(first.percent_change, 150.0));

    let second = &comparison.deltas[1];
    assert_eq!(second.node, d2.node());
    assert!(approx(second.delta, 0.5));
    assert!(approx(second.percent_change, 100.0));

    let third = &comparison.deltas[2];
    assert_eq!(third.node, d4.node());
    assert!(approx(third.delta, -0.4));
    assert!(approx(third.percent_change, -100.0));
}

#[tokio::test]
async fn regulations_effective_after_the_reference_are_excluded() {
    let fx = Fixture::new();
    let now = Utc::now();

    let future = Regulation::new(fx.tenant, "DORA", "Operational Resilience", Severity::High)
        .with_effective_date(now + Duration::days(90));
    fx.store.put_regulation(future.clone()).unwrap();

    let target = Regulation::new(fx.tenant, "AI-ACT", "AI Act", Severity::Critical)
        .with_effective_date(now);
    fx.store.put_regulation(target.clone()).unwrap();

    let d1 = fx.department("D1");
    fx.direct_edge(future.node(), d1.node(), 1.0);
    fx.direct_edge(target.node(), d1.node(), 1.0);

    let comparison = fx
        .engine()
        .compare_impact(target.id, now, now + Duration::days(1))
        .await
        .unwrap();

    // The future regulation contributes nothing to the baseline.
    assert_eq!(comparison.deltas.len(), 1);
    assert!(approx(comparison.deltas[0].before, 0.0));
    assert!(approx(comparison.deltas[0].after, 1.0));
    assert!(approx(comparison.deltas[0].percent_change, 100.0));
}

#[tokio::test]
async fn missing_regulation_is_not_found() {
    let fx = Fixture::new();
    let err = fx
        .engine()
        .compare_impact(Uuid::new_v4(), Utc::now(), Utc::now())
        .await
        .unwrap_err();
    assert!(matches!(err, RegGraphError::NotFound(_)));
}
