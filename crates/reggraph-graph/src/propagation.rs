use serde::{Deserialize, Serialize};
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use reggraph_core::{
    display_name, ComplianceStore, EntityId, ImpactType, NodeKind, NodeRef, PropagationOptions,
    RegGraphError, Result, TenantId, TraversedEdge,
};

use crate::{GraphBuilder, GraphCache};

/// Multiplier applied per edge by impact type.
pub fn type_multiplier(impact_type: ImpactType) -> f64 {
    match impact_type {
        ImpactType::Direct => 1.0,
        ImpactType::Indirect => 0.6,
        ImpactType::Conditional => 0.3,
    }
}

/// Multiplier applied per edge by the kind of the target node. The table is
/// fixed; note that REGULATION targets sit above 1.0, so impact amplifies
/// when a traversal crosses into a regulation node.
pub fn target_kind_weight(kind: NodeKind) -> f64 {
    match kind {
        NodeKind::Regulation => 1.2,
        NodeKind::Department => 1.0,
        NodeKind::Budget => 0.9,
        NodeKind::Service => 0.8,
        NodeKind::Kpi => 0.7,
    }
}

/// Evaluates a conditional edge's payload. `required` wins over `threshold`
/// when both keys are present; an empty or non-object payload passes.
fn condition_holds(condition: &serde_json::Value) -> bool {
    let Some(object) = condition.as_object() else {
        return true;
    };
    if let Some(required) = object.get("required") {
        return required.as_bool() == Some(true);
    }
    if let Some(threshold) = object.get("threshold") {
        return threshold.as_f64().is_some_and(|v| v > 0.0);
    }
    true
}

/// Starting point of a propagation run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PropagationSeed {
    pub kind: NodeKind,
    pub id: EntityId,
    /// In [0, 1].
    pub initial_impact: f64,
}

impl PropagationSeed {
    pub fn new(kind: NodeKind, id: EntityId) -> Self {
        Self {
            kind,
            id,
            initial_impact: 1.0,
        }
    }

    pub fn with_initial_impact(mut self, initial_impact: f64) -> Self {
        self.initial_impact = initial_impact;
        self
    }

    pub fn node(&self) -> NodeRef {
        NodeRef::new(self.kind, self.id)
    }
}

/// One node reached by a propagation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImpactedNode {
    pub id: EntityId,
    pub kind: NodeKind,
    pub display_name: String,
    /// Intensity of the strongest surviving path; never additive across
    /// paths.
    pub impact_score: f64,
    pub depth: usize,
    pub path: Vec<TraversedEdge>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropagationResult {
    pub source_id: EntityId,
    pub source_kind: NodeKind,
    /// Reached nodes excluding the seed.
    pub total_affected: usize,
    /// Deepest level observed among reached nodes.
    pub max_depth: usize,
    pub nodes: HashMap<NodeRef, ImpactedNode>,
    /// Edges in traversal acceptance order; each (source, target) pair
    /// appears at most once.
    pub edges: Vec<TraversedEdge>,
    pub execution_time_ms: u64,
    /// Set when cooperative cancellation cut the run short.
    pub cancelled: bool,
}

/// Breadth-first weighted impact traversal over one tenant's dependency
/// graph. One engine per run-context; each `propagate` call owns its frontier,
/// visited set, and result buffers, so engines for different tenants (or the
/// same tenant) may run in parallel.
pub struct PropagationEngine {
    tenant_id: TenantId,
    store: Arc<dyn ComplianceStore>,
    builder: GraphBuilder,
    options: PropagationOptions,
    cancel: CancellationToken,
}

impl PropagationEngine {
    pub fn new(
        tenant_id: TenantId,
        store: Arc<dyn ComplianceStore>,
        cache: Arc<GraphCache>,
    ) -> Self {
        Self {
            tenant_id,
            store: store.clone(),
            builder: GraphBuilder::new(store, cache),
            options: PropagationOptions::default(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_options(mut self, options: PropagationOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn options(&self) -> &PropagationOptions {
        &self.options
    }

    /// Expands impact outward from `seed`. A seed that matches no stored
    /// entity still yields a result holding only the seed node.
    pub async fn propagate(&self, seed: PropagationSeed) -> Result<PropagationResult> {
        self.options.validate()?;
        if !(0.0..=1.0).contains(&seed.initial_impact) {
            return Err(RegGraphError::Invalid(format!(
                "initial_impact {} outside [0, 1]",
                seed.initial_impact
            )));
        }

        let started = Instant::now();
        let graph = self.builder.build(self.tenant_id).await?;

        let source = seed.node();
        let mut names: HashMap<NodeRef, String> = HashMap::new();
        let mut nodes: HashMap<NodeRef, ImpactedNode> = HashMap::new();
        let mut edges: Vec<TraversedEdge> = Vec::new();
        let mut visited: HashSet<(NodeRef, NodeRef)> = HashSet::new();
        let mut frontier: VecDeque<(NodeRef, f64, usize)> = VecDeque::new();
        let mut cancelled = false;

        let source_name = self.resolve_name(&mut names, source).await;
        nodes.insert(
            source,
            ImpactedNode {
                id: seed.id,
                kind: seed.kind,
                display_name: source_name,
                impact_score: seed.initial_impact,
                depth: 0,
                path: Vec::new(),
            },
        );
        frontier.push_back((source, seed.initial_impact, 0));

        'expand: while let Some((current, impact, depth)) = frontier.pop_front() {
            for edge in graph.outgoing(&current) {
                if self.cancel.is_cancelled() {
                    cancelled = true;
                    break 'expand;
                }
                if !edge.active {
                    continue;
                }
                if edge.impact_type == ImpactType::Indirect && !self.options.include_indirect {
                    continue;
                }
                if edge.impact_type == ImpactType::Conditional {
                    if let Some(condition) = &edge.condition {
                        if !condition_holds(condition) {
                            trace!(edge = %edge.id, "conditional edge did not hold");
                            continue;
                        }
                    }
                }

                let next = impact
                    * edge.weight
                    * type_multiplier(edge.impact_type)
                    * target_kind_weight(edge.target.kind);
                if next < self.options.impact_threshold {
                    continue;
                }
                if depth + 1 > self.options.max_depth {
                    continue;
                }
                if !visited.insert((edge.source, edge.target)) {
                    continue;
                }

                let traversed = TraversedEdge::from(edge.as_ref());
                edges.push(traversed.clone());

                match nodes.entry(edge.target) {
                    Entry::Occupied(mut occupied) => {
                        let node = occupied.get_mut();
                        node.impact_score = node.impact_score.max(next);
                        node.path.push(traversed);
                    }
                    Entry::Vacant(vacant) => {
                        let name = self.resolve_name(&mut names, edge.target).await;
                        vacant.insert(ImpactedNode {
                            id: edge.target.id,
                            kind: edge.target.kind,
                            display_name: name,
                            impact_score: next,
                            depth: depth + 1,
                            path: vec![traversed],
                        });
                    }
                }

                if depth + 1 < self.options.max_depth {
                    frontier.push_back((edge.target, next, depth + 1));
                }
            }
        }

        let max_depth = nodes.values().map(|n| n.depth).max().unwrap_or(0);
        let total_affected = nodes.len().saturating_sub(1);
        let execution_time_ms = started.elapsed().as_millis() as u64;
        debug!(
            tenant = %self.tenant_id,
            source = %source,
            total_affected,
            max_depth,
            cancelled,
            execution_time_ms,
            "propagation finished"
        );

        Ok(PropagationResult {
            source_id: seed.id,
            source_kind: seed.kind,
            total_affected,
            max_depth,
            nodes,
            edges,
            execution_time_ms,
            cancelled,
        })
    }

    /// Current entity name, falling back to the bare id when the store has
    /// no answer. Failures never abort a traversal.
    async fn resolve_name(&self, memo: &mut HashMap<NodeRef, String>, node: NodeRef) -> String {
        if let Some(name) = memo.get(&node) {
            return name.clone();
        }
        let name = match display_name(self.store.as_ref(), node).await {
            Ok(Some(name)) => name,
            Ok(None) => node.id.to_string(),
            Err(e) => {
                debug!(node = %node, "name lookup failed, using id: {e}");
                node.id.to_string()
            }
        };
        memo.insert(node, name.clone());
        name
    }
}
