use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::{
    validate_edge, validate_edge_unique, validate_regulation_update, AuditEntry, Budget,
    ComplianceStore, Department, EdgeId, EntityId, ImpactEdge, Kpi, NodeKind, NodeRef,
    RegGraphError, Regulation, RegulationImpact, RegulationStatus, Result, RiskScore, Service,
    Tenant, TenantId,
};

/// In-process [`ComplianceStore`]. Mutations run the structural validators
/// before committing, so the store never holds an edge set that violates the
/// graph invariants. Backs the test suites and small single-node deployments.
#[derive(Default)]
pub struct MemoryStore {
    tenants: DashMap<TenantId, Tenant>,
    regulations: DashMap<EntityId, Regulation>,
    departments: DashMap<EntityId, Department>,
    budgets: DashMap<EntityId, Budget>,
    services: DashMap<EntityId, Service>,
    kpis: DashMap<EntityId, Kpi>,
    edges: RwLock<Vec<ImpactEdge>>,
    impacts: RwLock<HashMap<EntityId, Vec<RegulationImpact>>>,
    risk_scores: RwLock<HashMap<(TenantId, NodeRef), RiskScore>>,
    audit_log: RwLock<Vec<AuditEntry>>,
    fail_reads: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every read fail with an upstream error until reset. Test hook
    /// for exercising store-failure paths.
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    fn read_guard(&self) -> Result<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(RegGraphError::Upstream("simulated read failure".into()));
        }
        Ok(())
    }

    pub fn put_tenant(&self, tenant: Tenant) {
        self.tenants.insert(tenant.id, tenant);
    }

    pub fn put_regulation(&self, regulation: Regulation) -> Result<()> {
        if let Some(current) = self.regulations.get(&regulation.id) {
            validate_regulation_update(&current, &regulation)?;
        }
        let conflict = self.regulations.iter().any(|r| {
            r.id != regulation.id
                && r.tenant_id == regulation.tenant_id
                && r.code == regulation.code
        });
        if conflict {
            return Err(RegGraphError::Conflict(format!(
                "regulation code {} already used in tenant",
                regulation.code
            )));
        }
        self.regulations.insert(regulation.id, regulation);
        Ok(())
    }

    pub fn put_department(&self, department: Department) -> Result<()> {
        let conflict = self.departments.iter().any(|d| {
            d.id != department.id
                && d.tenant_id == department.tenant_id
                && d.code == department.code
        });
        if conflict {
            return Err(RegGraphError::Conflict(format!(
                "department code {} already used in tenant",
                department.code
            )));
        }
        self.departments.insert(department.id, department);
        Ok(())
    }

    pub fn put_budget(&self, budget: Budget) -> Result<()> {
        let conflict = self
            .budgets
            .iter()
            .any(|b| b.id != budget.id && b.tenant_id == budget.tenant_id && b.code == budget.code);
        if conflict {
            return Err(RegGraphError::Conflict(format!(
                "budget code {} already used in tenant",
                budget.code
            )));
        }
        self.budgets.insert(budget.id, budget);
        Ok(())
    }

    pub fn put_service(&self, service: Service) -> Result<()> {
        let conflict = self.services.iter().any(|s| {
            s.id != service.id && s.tenant_id == service.tenant_id && s.code == service.code
        });
        if conflict {
            return Err(RegGraphError::Conflict(format!(
                "service code {} already used in tenant",
                service.code
            )));
        }
        self.services.insert(service.id, service);
        Ok(())
    }

    pub fn put_kpi(&self, kpi: Kpi) -> Result<()> {
        let conflict = self
            .kpis
            .iter()
            .any(|k| k.id != kpi.id && k.tenant_id == kpi.tenant_id && k.code == kpi.code);
        if conflict {
            return Err(RegGraphError::Conflict(format!(
                "kpi code {} already used in tenant",
                kpi.code
            )));
        }
        self.kpis.insert(kpi.id, kpi);
        Ok(())
    }

    /// Validates the edge, checks both endpoints live in the edge's tenant,
    /// and rejects a second active edge on the same (source, target) pair.
    pub fn insert_edge(&self, edge: ImpactEdge) -> Result<EdgeId> {
        validate_edge(&edge)?;
        for node in [&edge.source, &edge.target] {
            match self.node_tenant(node) {
                None => {
                    return Err(RegGraphError::NotFound(format!("entity {node}")));
                }
                Some(tenant) if tenant != edge.tenant_id => {
                    return Err(RegGraphError::Invalid(format!(
                        "edge endpoint {node} belongs to another tenant"
                    )));
                }
                Some(_) => {}
            }
        }
        let mut edges = self.edges.write();
        validate_edge_unique(&edges, &edge)?;
        let id = edge.id;
        edges.push(edge);
        Ok(id)
    }

    pub fn deactivate_edge(&self, id: EdgeId) -> Result<bool> {
        let mut edges = self.edges.write();
        match edges.iter_mut().find(|e| e.id == id) {
            Some(edge) => {
                edge.active = false;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn edge(&self, id: EdgeId) -> Option<ImpactEdge> {
        self.edges.read().iter().find(|e| e.id == id).cloned()
    }

    pub fn regulation_impacts(&self, regulation_id: EntityId) -> Vec<RegulationImpact> {
        self.impacts
            .read()
            .get(&regulation_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn risk_scores(&self, tenant_id: TenantId) -> Vec<RiskScore> {
        self.risk_scores
            .read()
            .values()
            .filter(|s| s.tenant_id == tenant_id)
            .cloned()
            .collect()
    }

    pub fn audit_entries(&self, tenant_id: TenantId) -> Vec<AuditEntry> {
        self.audit_log
            .read()
            .iter()
            .filter(|e| e.tenant_id == tenant_id)
            .cloned()
            .collect()
    }

    fn node_tenant(&self, node: &NodeRef) -> Option<TenantId> {
        match node.kind {
            NodeKind::Regulation => self.regulations.get(&node.id).map(|r| r.tenant_id),
            NodeKind::Department => self.departments.get(&node.id).map(|d| d.tenant_id),
            NodeKind::Budget => self.budgets.get(&node.id).map(|b| b.tenant_id),
            NodeKind::Service => self.services.get(&node.id).map(|s| s.tenant_id),
            NodeKind::Kpi => self.kpis.get(&node.id).map(|k| k.tenant_id),
        }
    }
}

#[async_trait]
impl ComplianceStore for MemoryStore {
    async fn find_tenant(&self, id: TenantId) -> Result<Option<Tenant>> {
        self.read_guard()?;
        Ok(self.tenants.get(&id).map(|t| t.value().clone()))
    }

    async fn find_regulation(&self, id: EntityId) -> Result<Option<Regulation>> {
        self.read_guard()?;
        Ok(self.regulations.get(&id).map(|r| r.value().clone()))
    }

    async fn find_department(&self, id: EntityId) -> Result<Option<Department>> {
        self.read_guard()?;
        Ok(self.departments.get(&id).map(|d| d.value().clone()))
    }

    async fn find_budget(&self, id: EntityId) -> Result<Option<Budget>> {
        self.read_guard()?;
        Ok(self.budgets.get(&id).map(|b| b.value().clone()))
    }

    async fn find_service(&self, id: EntityId) -> Result<Option<Service>> {
        self.read_guard()?;
        Ok(self.services.get(&id).map(|s| s.value().clone()))
    }

    async fn find_kpi(&self, id: EntityId) -> Result<Option<Kpi>> {
        self.read_guard()?;
        Ok(self.kpis.get(&id).map(|k| k.value().clone()))
    }

    async fn active_edges(&self, tenant_id: TenantId) -> Result<Vec<ImpactEdge>> {
        self.read_guard()?;
        Ok(self
            .edges
            .read()
            .iter()
            .filter(|e| e.tenant_id == tenant_id && e.active)
            .cloned()
            .collect())
    }

    async fn active_regulations(&self, tenant_id: TenantId) -> Result<Vec<Regulation>> {
        self.read_guard()?;
        Ok(self
            .regulations
            .iter()
            .filter(|r| {
                r.tenant_id == tenant_id && r.active && r.status != RegulationStatus::Draft
            })
            .map(|r| r.value().clone())
            .collect())
    }

    async fn regulations_active_before(
        &self,
        tenant_id: TenantId,
        date: DateTime<Utc>,
        excluding: EntityId,
    ) -> Result<Vec<Regulation>> {
        self.read_guard()?;
        Ok(self
            .regulations
            .iter()
            .filter(|r| {
                r.tenant_id == tenant_id
                    && r.id != excluding
                    && r.active
                    && r.status != RegulationStatus::Draft
                    && r.effective_date < date
            })
            .map(|r| r.value().clone())
            .collect())
    }

    async fn replace_regulation_impacts(
        &self,
        regulation_id: EntityId,
        impacts: Vec<RegulationImpact>,
    ) -> Result<()> {
        self.impacts.write().insert(regulation_id, impacts);
        Ok(())
    }

    async fn upsert_risk_score(&self, score: RiskScore) -> Result<()> {
        self.risk_scores
            .write()
            .insert((score.tenant_id, score.entity), score);
        Ok(())
    }

    async fn append_audit_log(&self, entry: AuditEntry) -> Result<()> {
        self.audit_log.write().push(entry);
        Ok(())
    }
}
