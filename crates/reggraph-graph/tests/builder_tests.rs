use std::sync::Arc;

use reggraph_core::{
    Department, ImpactEdge, ImpactType, MemoryStore, NodeKind, Regulation, Severity, Tenant,
};
use reggraph_graph::{GraphBuilder, GraphCache};

struct Fixture {
    store: Arc<MemoryStore>,
    cache: Arc<GraphCache>,
    builder: GraphBuilder,
    tenant: uuid::Uuid,
    regulation: Regulation,
    department: Department,
}

impl Fixture {
    fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let cache = Arc::new(GraphCache::new());
        let tenant = Tenant::new("acme", "Acme Corp");
        let tenant_id = tenant.id;
        store.put_tenant(tenant);

        let regulation = Regulation::new(tenant_id, "GDPR", "Data Protection", Severity::High);
        store.put_regulation(regulation.clone()).unwrap();
        let department = Department::new(tenant_id, "FIN", "Finance");
        store.put_department(department.clone()).unwrap();

        let builder = GraphBuilder::new(store.clone(), cache.clone());
        Self {
            store,
            cache,
            builder,
            tenant: tenant_id,
            regulation,
            department,
        }
    }

    fn link(&self) {
        self.store
            .insert_edge(
                ImpactEdge::new(
                    self.tenant,
                    self.regulation.node(),
                    self.department.node(),
                    ImpactType::Direct,
                )
                .with_weight(0.7),
            )
            .unwrap();
    }
}

#[tokio::test]
async fn repeated_builds_reuse_the_cached_graph() {
    let fx = Fixture::new();
    fx.link();

    let first = fx.builder.build(fx.tenant).await.unwrap();
    let second = fx.builder.build(fx.tenant).await.unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.edge_count(), 1);
}

#[tokio::test]
async fn edge_mutation_plus_invalidation_forces_rebuild() {
    let fx = Fixture::new();

    let empty = fx.builder.build(fx.tenant).await.unwrap();
    assert!(empty.is_empty());

    // Mutation followed by the documented invalidation routine.
    fx.link();
    fx.cache.invalidate_edges(fx.tenant);

    let rebuilt = fx.builder.build(fx.tenant).await.unwrap();
    assert!(!Arc::ptr_eq(&empty, &rebuilt));
    assert_eq!(rebuilt.edge_count(), 1);
}

#[tokio::test]
async fn regulation_invalidation_forces_rebuild() {
    let fx = Fixture::new();
    fx.link();

    let first = fx.builder.build(fx.tenant).await.unwrap();
    fx.cache.invalidate_regulation(fx.tenant, fx.regulation.id);
    let second = fx.builder.build(fx.tenant).await.unwrap();
    assert!(!Arc::ptr_eq(&first, &second));
}

#[tokio::test]
async fn entity_invalidation_forces_rebuild() {
    let fx = Fixture::new();
    fx.link();

    let first = fx.builder.build(fx.tenant).await.unwrap();
    fx.cache
        .invalidate_entity(fx.tenant, NodeKind::Department, fx.department.id);
    let second = fx.builder.build(fx.tenant).await.unwrap();
    assert!(!Arc::ptr_eq(&first, &second));
}

#[tokio::test]
async fn other_tenants_graphs_survive_invalidation() {
    let fx = Fixture::new();
    fx.link();

    let other = Tenant::new("globex", "Globex");
    let other_id = other.id;
    fx.store.put_tenant(other);

    let ours = fx.builder.build(fx.tenant).await.unwrap();
    let theirs = fx.builder.build(other_id).await.unwrap();

    fx.cache.invalidate_edges(fx.tenant);

    let theirs_again = fx.builder.build(other_id).await.unwrap();
    assert!(Arc::ptr_eq(&theirs, &theirs_again));

    let ours_again = fx.builder.build(fx.tenant).await.unwrap();
    assert!(!Arc::ptr_eq(&ours, &ours_again));
}
