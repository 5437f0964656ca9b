use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EntityId, NodeRef, RegulationStatus, Severity, TenantId};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tenant {
    pub id: TenantId,
    pub code: String,
    pub name: String,
}

impl Tenant {
    pub fn new<C: Into<String>, N: Into<String>>(code: C, name: N) -> Self {
        Self {
            id: Uuid::new_v4(),
            code: code.into(),
            name: name.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Regulation {
    pub id: EntityId,
    pub tenant_id: TenantId,
    pub code: String,
    pub name: String,
    pub severity: Severity,
    pub status: RegulationStatus,
    pub effective_date: DateTime<Utc>,
    pub expiration_date: Option<DateTime<Utc>>,
    /// Strictly increases on every update.
    pub version: u32,
    pub active: bool,
}

impl Regulation {
    pub fn new<C: Into<String>, N: Into<String>>(
        tenant_id: TenantId,
        code: C,
        name: N,
        severity: Severity,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            tenant_id,
            code: code.into(),
            name: name.into(),
            severity,
            status: RegulationStatus::Active,
            effective_date: Utc::now(),
            expiration_date: None,
            version: 1,
            active: true,
        }
    }

    pub fn with_status(mut self, status: RegulationStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_effective_date(mut self, date: DateTime<Utc>) -> Self {
        self.effective_date = date;
        self
    }

    pub fn with_expiration_date(mut self, date: DateTime<Utc>) -> Self {
        self.expiration_date = Some(date);
        self
    }

    pub fn node(&self) -> NodeRef {
        NodeRef::regulation(self.id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Department {
    pub id: EntityId,
    pub tenant_id: TenantId,
    pub code: String,
    pub name: String,
    pub parent: Option<EntityId>,
    pub active: bool,
}

impl Department {
    pub fn new<C: Into<String>, N: Into<String>>(tenant_id: TenantId, code: C, name: N) -> Self {
        Self {
            id: Uuid::new_v4(),
            tenant_id,
            code: code.into(),
            name: name.into(),
            parent: None,
            active: true,
        }
    }

    pub fn with_parent(mut self, parent: EntityId) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn node(&self) -> NodeRef {
        NodeRef::department(self.id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Budget {
    pub id: EntityId,
    pub tenant_id: TenantId,
    pub code: String,
    pub name: String,
    pub amount: f64,
    pub currency: String,
    pub fiscal_year: i32,
    pub active: bool,
}

impl Budget {
    pub fn new<C: Into<String>, N: Into<String>>(
        tenant_id: TenantId,
        code: C,
        name: N,
        amount: f64,
        fiscal_year: i32,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            tenant_id,
            code: code.into(),
            name: name.into(),
            amount,
            currency: "USD".to_string(),
            fiscal_year,
            active: true,
        }
    }

    pub fn with_currency<S: Into<String>>(mut self, currency: S) -> Self {
        self.currency = currency.into();
        self
    }

    pub fn node(&self) -> NodeRef {
        NodeRef::budget(self.id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    pub id: EntityId,
    pub tenant_id: TenantId,
    pub code: String,
    pub name: String,
    pub service_type: String,
    pub status: String,
    pub active: bool,
}

impl Service {
    pub fn new<C: Into<String>, N: Into<String>>(tenant_id: TenantId, code: C, name: N) -> Self {
        Self {
            id: Uuid::new_v4(),
            tenant_id,
            code: code.into(),
            name: name.into(),
            service_type: "internal".to_string(),
            status: "operational".to_string(),
            active: true,
        }
    }

    pub fn with_service_type<S: Into<String>>(mut self, service_type: S) -> Self {
        self.service_type = service_type.into();
        self
    }

    pub fn node(&self) -> NodeRef {
        NodeRef::service(self.id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Kpi {
    pub id: EntityId,
    pub tenant_id: TenantId,
    pub code: String,
    pub name: String,
    pub unit: String,
    pub target: f64,
    pub current: f64,
    pub frequency: String,
    pub active: bool,
}

impl Kpi {
    pub fn new<C: Into<String>, N: Into<String>>(
        tenant_id: TenantId,
        code: C,
        name: N,
        target: f64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            tenant_id,
            code: code.into(),
            name: name.into(),
            unit: "%".to_string(),
            target,
            current: 0.0,
            frequency: "monthly".to_string(),
            active: true,
        }
    }

    pub fn with_unit<S: Into<String>>(mut self, unit: S) -> Self {
        self.unit = unit.into();
        self
    }

    pub fn with_current(mut self, current: f64) -> Self {
        self.current = current;
        self
    }

    pub fn node(&self) -> NodeRef {
        NodeRef::kpi(self.id)
    }
}
