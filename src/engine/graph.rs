//! Workflow graph description.
//!
//! A graph is a flat list of [`WorkflowNode`]s. Each node carries a phase
//! index and a [`NodeKind`] holding exactly the data its kind needs, so a
//! decision without a condition or an action without a strategy cannot be
//! expressed at all.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::calculator::Metrics;
use crate::strategy::StrategyId;
use crate::style::{Metric, Position, StyleTarget};
use crate::{Error, Result};

/// Identifier of a node within one graph.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// A boolean test over the current metrics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    InRange(Metric),
    BelowMin(Metric),
    AboveMax(Metric),
    AllInRange,
    /// True when any of the listed metrics is outside its range.
    AnyOutOfRange(Vec<Metric>),
}

impl Condition {
    #[must_use]
    pub fn holds(&self, metrics: &Metrics, target: &StyleTarget) -> bool {
        let position = |metric: Metric| target.range(metric).position(metrics.get(metric));
        match self {
            Condition::InRange(metric) => position(*metric) == Position::Within,
            Condition::BelowMin(metric) => position(*metric) == Position::Below,
            Condition::AboveMax(metric) => position(*metric) == Position::Above,
            Condition::AllInRange => Metric::ALL.iter().all(|&m| position(m) == Position::Within),
            Condition::AnyOutOfRange(list) => list.iter().any(|&m| position(m) != Position::Within),
        }
    }
}

/// One arm of a [`Gate::FirstOutOfRange`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    pub metric: Metric,
    pub to: NodeId,
}

/// A many-way branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "gate", rename_all = "snake_case")]
pub enum Gate {
    /// Branch on where one metric sits relative to its range.
    Position {
        metric: Metric,
        below: NodeId,
        within: NodeId,
        above: NodeId,
    },
    /// Follow the first route whose metric is out of range.
    FirstOutOfRange { routes: Vec<Route>, otherwise: NodeId },
}

impl Gate {
    #[must_use]
    pub fn route(&self, metrics: &Metrics, target: &StyleTarget) -> &NodeId {
        match self {
            Gate::Position {
                metric,
                below,
                within,
                above,
            } => match target.range(*metric).position(metrics.get(*metric)) {
                Position::Below => below,
                Position::Within => within,
                Position::Above => above,
            },
            Gate::FirstOutOfRange { routes, otherwise } => routes
                .iter()
                .find(|r| !target.range(r.metric).contains(metrics.get(r.metric)))
                .map_or(otherwise, |r| &r.to),
        }
    }

    fn successors(&self) -> Vec<&NodeId> {
        match self {
            Gate::Position {
                below,
                within,
                above,
                ..
            } => vec![below, within, above],
            Gate::FirstOutOfRange { routes, otherwise } => routes
                .iter()
                .map(|r| &r.to)
                .chain(std::iter::once(otherwise))
                .collect(),
        }
    }
}

/// How a terminal node labels the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndKind {
    Completed,
    ManualReview,
}

/// Kind-specific node data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeKind {
    Start {
        next: NodeId,
    },
    Decision {
        condition: Condition,
        when_true: NodeId,
        when_false: NodeId,
    },
    MultiDecision {
        gate: Gate,
    },
    Action {
        strategy: StrategyId,
        metric: Metric,
        next: NodeId,
        /// Where to go when the strategy cannot help. Defaults to `next`.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        on_no_change: Option<NodeId>,
    },
    End {
        outcome: EndKind,
    },
}

impl NodeKind {
    /// Every node this one can transition to.
    #[must_use]
    pub fn successors(&self) -> Vec<&NodeId> {
        match self {
            NodeKind::Start { next } => vec![next],
            NodeKind::Decision {
                when_true,
                when_false,
                ..
            } => vec![when_true, when_false],
            NodeKind::MultiDecision { gate } => gate.successors(),
            NodeKind::Action {
                next, on_no_change, ..
            } => std::iter::once(next).chain(on_no_change.as_ref()).collect(),
            NodeKind::End { .. } => Vec::new(),
        }
    }
}

/// One step in a workflow graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowNode {
    pub id: NodeId,
    /// Correction stage; transitions may never lower it.
    pub phase: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(flatten)]
    pub kind: NodeKind,
}

impl WorkflowNode {
    pub fn new(id: impl Into<String>, phase: u32, kind: NodeKind) -> Self {
        Self {
            id: NodeId::new(id),
            phase,
            label: None,
            kind,
        }
    }

    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// A structurally checked set of workflow nodes.
///
/// Construction guarantees unique ids, exactly one start node, at least one
/// end node and that every successor reference resolves. Phase ordering is
/// enforced while the graph is traversed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkflowGraph {
    start: NodeId,
    nodes: BTreeMap<NodeId, WorkflowNode>,
}

impl WorkflowGraph {
    pub fn new(nodes: Vec<WorkflowNode>) -> Result<Self> {
        let mut map = BTreeMap::new();
        for node in nodes {
            if map.contains_key(&node.id) {
                return Err(Error::InvalidGraph(format!("duplicate node id '{}'", node.id)));
            }
            map.insert(node.id.clone(), node);
        }

        let starts: Vec<&NodeId> = map
            .values()
            .filter(|n| matches!(n.kind, NodeKind::Start { .. }))
            .map(|n| &n.id)
            .collect();
        let start = match starts.as_slice() {
            [only] => (*only).clone(),
            [] => return Err(Error::InvalidGraph("graph has no start node".into())),
            _ => {
                return Err(Error::InvalidGraph(format!(
                    "graph has {} start nodes",
                    starts.len()
                )))
            }
        };
        if !map.values().any(|n| matches!(n.kind, NodeKind::End { .. })) {
            return Err(Error::InvalidGraph("graph has no end node".into()));
        }
        for node in map.values() {
            if let Some(missing) = node.kind.successors().into_iter().find(|s| !map.contains_key(*s)) {
                return Err(Error::UnknownNode(missing.clone()));
            }
        }

        Ok(Self { start, nodes: map })
    }

    /// Parse a JSON array of nodes.
    pub fn from_json(json: &str) -> Result<Self> {
        let nodes: Vec<WorkflowNode> = serde_json::from_str(json)?;
        Self::new(nodes)
    }

    #[must_use]
    pub fn start(&self) -> &NodeId {
        &self.start
    }

    pub fn node(&self, id: &NodeId) -> Result<&WorkflowNode> {
        self.nodes.get(id).ok_or_else(|| Error::UnknownNode(id.clone()))
    }

    pub fn nodes(&self) -> impl Iterator<Item = &WorkflowNode> {
        self.nodes.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Strategies referenced by action nodes, without duplicates.
    #[must_use]
    pub fn strategies(&self) -> BTreeSet<StrategyId> {
        self.nodes
            .values()
            .filter_map(|n| match n.kind {
                NodeKind::Action { strategy, .. } => Some(strategy),
                _ => None,
            })
            .collect()
    }

    /// The built-in graph: OG, then color, FG, ABV and bitterness, then a
    /// final validation before ending.
    #[must_use]
    pub fn standard() -> Self {
        let nodes = standard_nodes();
        let start = NodeId::new("start");
        Self {
            start,
            nodes: nodes.into_iter().map(|n| (n.id.clone(), n)).collect(),
        }
    }
}

fn check(metric: Metric, pass: &str, fail: &str) -> NodeKind {
    NodeKind::Decision {
        condition: Condition::InRange(metric),
        when_true: pass.into(),
        when_false: fail.into(),
    }
}

fn action(strategy: StrategyId, metric: Metric, next: &str, on_no_change: Option<&str>) -> NodeKind {
    NodeKind::Action {
        strategy,
        metric,
        next: next.into(),
        on_no_change: on_no_change.map(NodeId::from),
    }
}

fn standard_nodes() -> Vec<WorkflowNode> {
    use Metric::*;
    use StrategyId::*;

    vec![
        WorkflowNode::new("start", 0, NodeKind::Start { next: "og_check".into() }),
        WorkflowNode::new("og_check", 1, check(OriginalGravity, "srm_gate", "og_adjust")),
        WorkflowNode::new("og_adjust", 1, action(AdjustBaseFermentables, OriginalGravity, "srm_gate", None))
            .with_label("Correct original gravity with base malt"),
        WorkflowNode::new(
            "srm_gate",
            2,
            NodeKind::MultiDecision {
                gate: Gate::Position {
                    metric: Srm,
                    below: "srm_darken".into(),
                    within: "fg_check".into(),
                    above: "srm_lighten".into(),
                },
            },
        ),
        WorkflowNode::new("srm_darken", 2, action(AdjustSpecialtyFermentables, Srm, "fg_check", None))
            .with_label("Darken with specialty grain"),
        WorkflowNode::new("srm_lighten", 2, action(AdjustSpecialtyFermentables, Srm, "fg_check", None))
            .with_label("Lighten by cutting specialty grain"),
        WorkflowNode::new("fg_check", 3, check(FinalGravity, "abv_check", "fg_adjust")),
        WorkflowNode::new("fg_adjust", 3, action(ScaleFermentables, FinalGravity, "abv_check", None))
            .with_label("Scale the grist for final gravity"),
        WorkflowNode::new("abv_check", 4, check(Abv, "ibu_check", "abv_sugar")),
        WorkflowNode::new("abv_sugar", 4, action(AdjustSugarAdjunct, Abv, "ibu_check", Some("abv_base")))
            .with_label("Correct alcohol with sugar"),
        WorkflowNode::new("abv_base", 4, action(AdjustBaseFermentables, Abv, "ibu_check", None))
            .with_label("Correct alcohol with base malt"),
        WorkflowNode::new("ibu_check", 5, check(Ibu, "validate", "ibu_adjust")),
        WorkflowNode::new(
            "ibu_adjust",
            5,
            action(AdjustBitteringAgents, Ibu, "validate", Some("manual_review")),
        )
        .with_label("Correct bitterness with boil hops"),
        WorkflowNode::new(
            "validate",
            6,
            NodeKind::Decision {
                condition: Condition::AllInRange,
                when_true: "complete".into(),
                when_false: "manual_review".into(),
            },
        ),
        WorkflowNode::new("complete", 7, NodeKind::End { outcome: EndKind::Completed }),
        WorkflowNode::new("manual_review", 7, NodeKind::End { outcome: EndKind::ManualReview }),
    ]
}
