use crate::{ImpactEdge, RegGraphError, Regulation, Result};

/// Structural checks on a single edge: endpoints and weight range.
pub fn validate_edge(edge: &ImpactEdge) -> Result<()> {
    if edge.source == edge.target {
        return Err(RegGraphError::Invalid(format!(
            "self-loop edge on {}",
            edge.source
        )));
    }
    if !(0.0..=1.0).contains(&edge.weight) {
        return Err(RegGraphError::Invalid(format!(
            "edge weight {} outside [0, 1]",
            edge.weight
        )));
    }
    Ok(())
}

/// At most one active edge may exist for any (source, target) pair within a
/// tenant.
pub fn validate_edge_unique(existing: &[ImpactEdge], candidate: &ImpactEdge) -> Result<()> {
    let duplicate = existing.iter().any(|e| {
        e.id != candidate.id
            && e.active
            && e.tenant_id == candidate.tenant_id
            && e.key() == candidate.key()
    });
    if duplicate {
        return Err(RegGraphError::Invalid(format!(
            "active edge {} -> {} already exists",
            candidate.source, candidate.target
        )));
    }
    Ok(())
}

/// Regulation versions strictly increase on update.
pub fn validate_regulation_update(current: &Regulation, updated: &Regulation) -> Result<()> {
    if updated.version <= current.version {
        return Err(RegGraphError::Invalid(format!(
            "regulation {} version must increase ({} -> {})",
            current.code, current.version, updated.version
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ImpactType, NodeRef, Severity};
    use uuid::Uuid;

    fn edge(weight: f64) -> ImpactEdge {
        let tenant = Uuid::new_v4();
        ImpactEdge::new(
            tenant,
            NodeRef::regulation(Uuid::new_v4()),
            NodeRef::department(Uuid::new_v4()),
            ImpactType::Direct,
        )
        .with_weight(weight)
    }

    #[test]
    fn rejects_self_loops() {
        let mut e = edge(0.5);
        e.target = e.source;
        assert!(matches!(validate_edge(&e), Err(RegGraphError::Invalid(_))));
    }

    #[test]
    fn rejects_out_of_range_weights() {
        assert!(validate_edge(&edge(-0.01)).is_err());
        assert!(validate_edge(&edge(1.01)).is_err());
        assert!(validate_edge(&edge(0.0)).is_ok());
        assert!(validate_edge(&edge(1.0)).is_ok());
    }

    #[test]
    fn rejects_duplicate_active_edges() {
        let first = edge(0.5);
        let mut second = first.clone();
        second.id = Uuid::new_v4();
        assert!(validate_edge_unique(std::slice::from_ref(&first), &second).is_err());

        let mut inactive = first.clone();
        inactive.active = false;
        assert!(validate_edge_unique(std::slice::from_ref(&inactive), &second).is_ok());
    }

    #[test]
    fn regulation_version_must_increase() {
        let tenant = Uuid::new_v4();
        let current = Regulation::new(tenant, "GDPR", "General Data Protection", Severity::High);
        let mut updated = current.clone();
        assert!(validate_regulation_update(&current, &updated).is_err());
        updated.version = 2;
        assert!(validate_regulation_update(&current, &updated).is_ok());
    }
}
