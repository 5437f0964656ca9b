use std::sync::Arc;

use uuid::Uuid;

use reggraph_analysis::RiskAggregator;
use reggraph_core::{
    Department, EventBus, GraphEvent, ImpactEdge, ImpactType, MemoryStore, NodeRef, NoopPublisher,
    RegGraphError, Regulation, RiskLevel, Service, Severity, Tenant, TenantId,
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

    fn aggregator(&self) -> RiskAggregator {
        RiskAggregator::new(
            self.store.clone(),
            self.cache.clone(),
            Arc::new(NoopPublisher),
        )
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

/// Two regulations of different severities hitting one department.
fn two_regulation_fixture() -> (Fixture, Regulation, Regulation, Department) {
    let fx = Fixture::new();
    let r1 = Regulation::new(fx.tenant, "AI-ACT", "AI Act", Severity::Critical);
    fx.store.put_regulation(r1.clone()).unwrap();
    let r2 = Regulation::new(fx.tenant, "SOX", "Sarbanes-Oxley", Severity::Medium);
    fx.store.put_regulation(r2.clone()).unwrap();
    let d1 = Department::new(fx.tenant, "FIN", "Finance");
    fx.store.put_department(d1.clone()).unwrap();

    fx.direct_edge(r1.node(), d1.node(), 1.0);
    fx.direct_edge(r2.node(), d1.node(), 1.0);
    (fx, r1, r2, d1)
}

#[tokio::test]
async fn severity_weighted_aggregation_across_regulations() {
    let (fx, r1, r2, d1) = two_regulation_fixture();

    let results = fx.aggregator().calculate_all_risks(fx.tenant).await.unwrap();
    assert_eq!(results.len(), 1);

    let risk = &results[0];
    assert_eq!(risk.entity, d1.node());
    // Critical seeds 1.0 (x2.0), Medium seeds 0.5 (x1.0).
    assert!(approx(risk.adjusted_risk_score, 2.5));
    assert!(approx(risk.base_risk_score, 1.25));
    assert_eq!(risk.risk_level, RiskLevel::Critical);

    assert_eq!(risk.risk_factors.len(), 2);
    assert!(approx(risk.risk_factors[&r1.id], 2.0));
    assert!(approx(risk.risk_factors[&r2.id], 0.5));
}

#[tokio::test]
async fn results_are_sorted_by_adjusted_score() {
    let (fx, r1, _r2, d1) = two_regulation_fixture();
    let payroll = Service::new(fx.tenant, "PAYROLL", "Payroll");
    fx.store.put_service(payroll.clone()).unwrap();
    fx.direct_edge(r1.node(), payroll.node(), 0.2);

    let results = fx.aggregator().calculate_all_risks(fx.tenant).await.unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].entity, d1.node());
    assert_eq!(results[1].entity, payroll.node());
    // 1.0 x 0.2 x 0.8 service weight, x2.0 severity.
    assert!(approx(results[1].adjusted_risk_score, 0.32));
}

#[tokio::test]
async fn scores_and_impact_rows_are_persisted() {
    let (fx, r1, r2, d1) = two_regulation_fixture();

    fx.aggregator().calculate_all_risks(fx.tenant).await.unwrap();

    let scores = fx.store.risk_scores(fx.tenant);
    assert_eq!(scores.len(), 1);
    assert_eq!(scores[0].entity, d1.node());
    assert!(approx(scores[0].adjusted_score, 2.5));

    let r1_rows = fx.store.regulation_impacts(r1.id);
    assert_eq!(r1_rows.len(), 1);
    assert_eq!(r1_rows[0].target, d1.node());
    assert!(approx(r1_rows[0].score, 1.0));
    assert_eq!(r1_rows[0].path.len(), 1);

    let r2_rows = fx.store.regulation_impacts(r2.id);
    assert_eq!(r2_rows.len(), 1);
    assert!(approx(r2_rows[0].score, 0.5));

    let audit = fx.store.audit_entries(fx.tenant);
    assert_eq!(audit.len(), 1);
    assert_eq!(audit[0].action, "risk.recalculated");
}

#[tokio::test]
async fn tenant_without_regulations_scores_nothing() {
    let fx = Fixture::new();
    let results = fx.aggregator().calculate_all_risks(fx.tenant).await.unwrap();
    assert!(results.is_empty());
    assert!(fx.store.risk_scores(fx.tenant).is_empty());
}

#[tokio::test]
async fn department_ranking_filters_and_enriches() {
    let (fx, r1, _r2, d1) = two_regulation_fixture();
    let payroll = Service::new(fx.tenant, "PAYROLL", "Payroll");
    fx.store.put_service(payroll.clone()).unwrap();
    fx.direct_edge(r1.node(), payroll.node(), 0.9);

    let ranking = fx
        .aggregator()
        .department_risk_ranking(fx.tenant)
        .await
        .unwrap();

    assert_eq!(ranking.len(), 1);
    assert_eq!(ranking[0].department_id, d1.id);
    assert_eq!(ranking[0].name, "Finance");
    assert_eq!(ranking[0].code, "FIN");
    assert!(approx(ranking[0].adjusted_risk_score, 2.5));
}

#[tokio::test]
async fn analyze_regulation_replaces_impact_rows() {
    let (fx, r1, _r2, d1) = two_regulation_fixture();
    let aggregator = fx.aggregator();

    let result = aggregator.analyze_regulation(r1.id).await.unwrap();
    assert_eq!(result.total_affected, 1);

    let rows = fx.store.regulation_impacts(r1.id);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].target, d1.node());

    // A rerun after the graph changed replaces, not appends.
    let ops = Department::new(fx.tenant, "OPS", "Operations");
    fx.store.put_department(ops.clone()).unwrap();
    fx.direct_edge(r1.node(), ops.node(), 0.8);
    fx.cache.invalidate_edges(fx.tenant);

    let result = aggregator.analyze_regulation(r1.id).await.unwrap();
    assert_eq!(result.total_affected, 2);
    assert_eq!(fx.store.regulation_impacts(r1.id).len(), 2);
}

#[tokio::test]
async fn analyze_unknown_regulation_is_not_found() {
    let fx = Fixture::new();
    let err = fx
        .aggregator()
        .analyze_regulation(Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, RegGraphError::NotFound(_)));
}

#[tokio::test]
async fn recalculation_publishes_lifecycle_events() {
    let (fx, _r1, _r2, _d1) = two_regulation_fixture();
    let bus = Arc::new(EventBus::new());
    let mut rx = bus.subscribe(fx.tenant);

    let aggregator = RiskAggregator::new(fx.store.clone(), fx.cache.clone(), bus.clone());
    aggregator.calculate_all_risks(fx.tenant).await.unwrap();

    let mut kinds = Vec::new();
    for _ in 0..5 {
        let event = tokio::time::timeout(std::time::Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        kinds.push(match event.event {
            GraphEvent::RecalculationStart { .. } => "start",
            GraphEvent::RecalculationProgress { .. } => "progress",
            GraphEvent::RecalculationComplete { .. } => "complete",
            GraphEvent::RiskUpdate { .. } => "risk",
            _ => "other",
        });
    }
    assert_eq!(kinds, vec!["start", "progress", "progress", "complete", "risk"]);
}
