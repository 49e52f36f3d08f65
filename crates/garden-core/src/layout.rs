//! Phyllotactic (sunflower-seed) garden layout.
//!
//! Contacts are sorted, truncated to `max_nodes`, and placed at
//! `radius = C·√(i+1)`, `angle = i·golden_angle`. Sorting is the only source
//! of index assignment, so the same population always yields identical
//! positions.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::{EngineConfig, NodeSizes};
use crate::constants::{LARGE_POPULATION, MEDIUM_POPULATION, ROTATION_SPREAD};
use crate::contact::Contact;
use crate::error::EngineError;
use crate::health::{HealthSnapshot, HealthState, classify_all};
use crate::time::CivilDate;

/// How the population is ordered before placement.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutMode {
    /// Most recently contacted at the center.
    #[default]
    Frequency,
    /// High importance at the center, then by recency within a tier.
    Tier,
}

impl LayoutMode {
    pub fn as_str(self) -> &'static str {
        match self {
            LayoutMode::Frequency => "frequency",
            LayoutMode::Tier => "tier",
        }
    }
}

impl fmt::Display for LayoutMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LayoutMode {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "frequency" => Ok(LayoutMode::Frequency),
            "tier" => Ok(LayoutMode::Tier),
            other => Err(EngineError::InvalidArgument(format!(
                "unknown layout mode '{other}' (expected 'frequency' or 'tier')"
            ))),
        }
    }
}

/// Population-driven node size tier. More contacts, smaller nodes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeSize {
    Small,
    Medium,
    Large,
}

impl NodeSize {
    /// Small above 100 nodes, Medium above 50, Large otherwise.
    pub fn for_population(n: usize) -> Self {
        if n > LARGE_POPULATION {
            NodeSize::Small
        } else if n > MEDIUM_POPULATION {
            NodeSize::Medium
        } else {
            NodeSize::Large
        }
    }

    pub fn diameter(self, sizes: &NodeSizes) -> f64 {
        match self {
            NodeSize::Small => sizes.small,
            NodeSize::Medium => sizes.medium,
            NodeSize::Large => sizes.large,
        }
    }
}

/// A contact placed on the garden plane. Origin is the layout center.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionedNode {
    pub contact_id: String,
    pub x: f64,
    pub y: f64,
    pub size: NodeSize,
    pub diameter: f64,
    pub state: HealthState,
    pub color: &'static str,
    /// Cosmetic tilt in degrees. Never influences position or order.
    pub rotation: i32,
}

/// Stable cosmetic rotation from the contact id: summed character codes
/// folded into `[-ROTATION_SPREAD, ROTATION_SPREAD]`.
pub fn rotation_for_id(id: &str) -> i32 {
    let span = (2 * ROTATION_SPREAD + 1) as u64;
    let sum: u64 = id.chars().map(|c| c as u64).sum();
    (sum % span) as i32 - ROTATION_SPREAD
}

/// Indices into `snapshots` in placement order.
///
/// Remaining ties fall back to contact id, so the order depends only on the
/// population, not on the order it was supplied in.
pub fn placement_order(contacts: &[Contact], snapshots: &[HealthSnapshot], mode: LayoutMode) -> Vec<usize> {
    let mut order: Vec<usize> = (0..snapshots.len()).collect();
    let days = |i: usize| snapshots[i].days_since_contact;
    match mode {
        LayoutMode::Frequency => {
            order.sort_by(|&a, &b| {
                days(a)
                    .cmp(&days(b))
                    .then_with(|| contacts[a].id.cmp(&contacts[b].id))
            });
        }
        LayoutMode::Tier => {
            order.sort_by(|&a, &b| {
                contacts[b]
                    .importance_tier
                    .cmp(&contacts[a].importance_tier)
                    .then(days(a).cmp(&days(b)))
                    .then_with(|| contacts[a].id.cmp(&contacts[b].id))
            });
        }
    }
    order
}

/// Place the first `max_nodes` entries of `order` on the spiral.
pub fn place(
    snapshots: &[HealthSnapshot],
    order: &[usize],
    max_nodes: usize,
    config: &EngineConfig,
) -> Vec<PositionedNode> {
    let n = order.len().min(max_nodes);
    if n == 0 {
        return Vec::new();
    }

    let density = config.spiral.density(n);
    let golden = config.spiral.golden_angle();
    let size = NodeSize::for_population(n);
    let diameter = size.diameter(&config.node_sizes);

    order[..n]
        .iter()
        .enumerate()
        .map(|(i, &idx)| {
            let snap = &snapshots[idx];
            let radius = density * ((i + 1) as f64).sqrt();
            let angle = i as f64 * golden;
            PositionedNode {
                contact_id: snap.contact_id.clone(),
                x: radius * angle.cos(),
                y: radius * angle.sin(),
                size,
                diameter,
                state: snap.state,
                color: snap.color,
                rotation: rotation_for_id(&snap.contact_id),
            }
        })
        .collect()
}

/// Classify, order, truncate and place a population.
pub fn layout_with(
    contacts: &[Contact],
    now: CivilDate,
    mode: LayoutMode,
    max_nodes: usize,
    config: &EngineConfig,
) -> Vec<PositionedNode> {
    let snapshots = classify_all(contacts, now);
    let order = placement_order(contacts, &snapshots, mode);
    place(&snapshots, &order, max_nodes, config)
}

/// [`layout_with`] using the default constants; `max_nodes` defaults to 300.
pub fn layout(
    contacts: &[Contact],
    now: CivilDate,
    mode: LayoutMode,
    max_nodes: Option<usize>,
) -> Vec<PositionedNode> {
    let config = EngineConfig::default();
    let max_nodes = max_nodes.unwrap_or(config.max_nodes);
    layout_with(contacts, now, mode, max_nodes, &config)
}
