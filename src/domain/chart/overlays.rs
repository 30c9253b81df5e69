use super::value_objects::ChartPoint;
use crate::domain::errors::ChartError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

pub const DEFAULT_OVERLAY_COLOR: &str = "#2962FF";

/// Horizontal line at a fixed price
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceLineOverlay {
    pub id: String,
    pub price: f64,
    pub color: String,
}

impl PriceLineOverlay {
    pub fn new(id: impl Into<String>, price: f64, color: Option<String>) -> Result<Self, ChartError> {
        let id = checked_id(id.into())?;
        if !price.is_finite() {
            return Err(ChartError::InvalidOverlay(format!("price line {} has price {}", id, price)));
        }
        Ok(Self { id, price, color: color.unwrap_or_else(|| DEFAULT_OVERLAY_COLOR.to_string()) })
    }
}

/// Straight line through two anchors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendLineOverlay {
    pub id: String,
    pub anchor1: ChartPoint,
    pub anchor2: ChartPoint,
    pub color: String,
}

impl TrendLineOverlay {
    pub fn new(
        id: impl Into<String>,
        anchor1: ChartPoint,
        anchor2: ChartPoint,
        color: Option<String>,
    ) -> Result<Self, ChartError> {
        let id = checked_id(id.into())?;
        if !anchor1.price.is_finite() || !anchor2.price.is_finite() {
            return Err(ChartError::InvalidOverlay(format!("trend line {} has a non-finite anchor", id)));
        }
        Ok(Self {
            id,
            anchor1,
            anchor2,
            color: color.unwrap_or_else(|| DEFAULT_OVERLAY_COLOR.to_string()),
        })
    }
}

fn checked_id(id: String) -> Result<String, ChartError> {
    if id.trim().is_empty() {
        return Err(ChartError::InvalidOverlay("overlay id cannot be empty".to_string()));
    }
    Ok(id)
}

/// Any overlay the surface can materialize
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Overlay {
    PriceLine(PriceLineOverlay),
    TrendLine(TrendLineOverlay),
}

impl Overlay {
    pub fn id(&self) -> &str {
        match self {
            Overlay::PriceLine(line) => &line.id,
            Overlay::TrendLine(line) => &line.id,
        }
    }
}

impl From<PriceLineOverlay> for Overlay {
    fn from(line: PriceLineOverlay) -> Self {
        Overlay::PriceLine(line)
    }
}

impl From<TrendLineOverlay> for Overlay {
    fn from(line: TrendLineOverlay) -> Self {
        Overlay::TrendLine(line)
    }
}

/// Commands needed to move the surface from one overlay set to another.
/// Removals are applied before additions.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OverlayDelta {
    pub to_add: Vec<Overlay>,
    pub to_remove: Vec<String>,
}

impl OverlayDelta {
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }
}

/// Desired overlay set on the host side.
///
/// An id whose content is replaced is marked stale and comes out of the next
/// delta as a remove followed by an add.
#[derive(Debug, Clone, Default)]
pub struct OverlayManager {
    desired: BTreeMap<String, Overlay>,
    stale: BTreeSet<String>,
}

impl OverlayManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id-only diff: removals are `previous - current`, additions are the
    /// current overlays whose id was not previously materialized.
    pub fn diff(previous: &BTreeSet<String>, current: &BTreeMap<String, Overlay>) -> OverlayDelta {
        let to_remove = previous.iter().filter(|id| !current.contains_key(*id)).cloned().collect();
        let to_add = current
            .iter()
            .filter(|(id, _)| !previous.contains(*id))
            .map(|(_, overlay)| overlay.clone())
            .collect();
        OverlayDelta { to_add, to_remove }
    }

    pub fn upsert(&mut self, overlay: impl Into<Overlay>) {
        let overlay = overlay.into();
        let id = overlay.id().to_string();
        if let Some(old) = self.desired.insert(id.clone(), overlay) {
            if self.desired.get(&id) != Some(&old) {
                self.stale.insert(id);
            }
        }
    }

    pub fn remove(&mut self, id: &str) -> bool {
        self.stale.remove(id);
        self.desired.remove(id).is_some()
    }

    pub fn clear(&mut self) {
        self.desired.clear();
        self.stale.clear();
    }

    pub fn desired(&self) -> &BTreeMap<String, Overlay> {
        &self.desired
    }

    pub fn ids(&self) -> BTreeSet<String> {
        self.desired.keys().cloned().collect()
    }

    /// Delta against what the surface currently has. Content changes of
    /// already materialized ids become remove + add.
    pub fn delta_against(&self, materialized: &BTreeSet<String>) -> OverlayDelta {
        let mut delta = Self::diff(materialized, &self.desired);
        for id in self.stale.iter().filter(|id| materialized.contains(*id)) {
            if let Some(overlay) = self.desired.get(id) {
                delta.to_remove.push(id.clone());
                delta.to_add.push(overlay.clone());
            }
        }
        delta
    }

    /// Called once a delta has been handed to the surface
    pub fn mark_delivered(&mut self) {
        self.stale.clear();
    }
}
