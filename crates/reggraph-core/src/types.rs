use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::RegGraphError;

pub type TenantId = Uuid;
pub type EntityId = Uuid;
pub type EdgeId = Uuid;

/// Closed set of entity kinds that participate in the dependency graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeKind {
    Regulation,
    Department,
    Budget,
    Service,
    Kpi,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NodeKind::Regulation => "REGULATION",
            NodeKind::Department => "DEPARTMENT",
            NodeKind::Budget => "BUDGET",
            NodeKind::Service => "SERVICE",
            NodeKind::Kpi => "KPI",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for NodeKind {
    type Err = RegGraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "REGULATION" => Ok(NodeKind::Regulation),
            "DEPARTMENT" => Ok(NodeKind::Department),
            "BUDGET" => Ok(NodeKind::Budget),
            "SERVICE" => Ok(NodeKind::Service),
            "KPI" => Ok(NodeKind::Kpi),
            other => Err(RegGraphError::Invalid(format!(
                "unknown node kind: {other}"
            ))),
        }
    }
}

/// Typed node identity. The `Display` form `KIND:id` is the canonical string
/// key used for cache tags and serialized maps; in-process code compares the
/// pair structurally and never parses on hot paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeRef {
    pub kind: NodeKind,
    pub id: EntityId,
}

impl Serialize for NodeRef {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for NodeRef {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let key = String::deserialize(deserializer)?;
        key.parse().map_err(serde::de::Error::custom)
    }
}

impl NodeRef {
    pub fn new(kind: NodeKind, id: EntityId) -> Self {
        Self { kind, id }
    }

    pub fn regulation(id: EntityId) -> Self {
        Self::new(NodeKind::Regulation, id)
    }

    pub fn department(id: EntityId) -> Self {
        Self::new(NodeKind::Department, id)
    }

    pub fn budget(id: EntityId) -> Self {
        Self::new(NodeKind::Budget, id)
    }

    pub fn service(id: EntityId) -> Self {
        Self::new(NodeKind::Service, id)
    }

    pub fn kpi(id: EntityId) -> Self {
        Self::new(NodeKind::Kpi, id)
    }
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

impl FromStr for NodeRef {
    type Err = RegGraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, id) = s
            .split_once(':')
            .ok_or_else(|| RegGraphError::Invalid(format!("malformed node key: {s}")))?;
        Ok(Self {
            kind: kind.parse()?,
            id: id
                .parse()
                .map_err(|_| RegGraphError::Invalid(format!("malformed node id: {id}")))?,
        })
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Initial impact a regulation of this severity injects at the seed node.
    pub fn initial_impact(self) -> f64 {
        match self {
            Severity::Critical => 1.0,
            Severity::High => 0.8,
            Severity::Medium => 0.5,
            Severity::Low => 0.3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RegulationStatus {
    Draft,
    Active,
    Superseded,
    Revoked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImpactType {
    Direct,
    Indirect,
    Conditional,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    /// Categorical bucket for an impact or risk score.
    pub fn from_score(score: f64) -> Self {
        if score >= 0.9 {
            RiskLevel::Critical
        } else if score >= 0.7 {
            RiskLevel::High
        } else if score >= 0.5 {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }
}
