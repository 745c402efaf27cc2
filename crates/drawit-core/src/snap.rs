//! Snap targets: registry of mounted targets and pull-zone geometry.

use crate::error::{DiagramError, DiagramResult};
use crate::model::EntityId;
use kurbo::{Point, Rect, Size};
use std::collections::HashMap;

/// Source of page-space bounding boxes for mounted targets.
///
/// The host environment implements this; the core never inspects a UI tree.
pub trait BoundingBoxProvider {
    /// Current box of `target`, or `None` when it is not mounted.
    fn bounding_box(&self, target: EntityId) -> Option<Rect>;
}

impl BoundingBoxProvider for HashMap<EntityId, Rect> {
    fn bounding_box(&self, target: EntityId) -> Option<Rect> {
        self.get(&target).copied()
    }
}

impl<P: BoundingBoxProvider + ?Sized> BoundingBoxProvider for &P {
    fn bounding_box(&self, target: EntityId) -> Option<Rect> {
        (**self).bounding_box(target)
    }
}

/// A registered snap target.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapTarget {
    /// Entity whose box defines the pull zone.
    pub target: EntityId,
    /// Caller-defined type tag, matched against a draggable's accepted types.
    pub kind: String,
    /// Pull-zone scale: 0 = no pull, 1 = the target's own box.
    pub strength: f64,
}

impl SnapTarget {
    /// Pull zone for this target given its actual box.
    pub fn zone(&self, bounds: Rect) -> Rect {
        expanded_box(bounds, self.strength)
    }
}

/// A snap target matched by a drag, with the box it was matched against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnapMatch<'a> {
    pub target: &'a SnapTarget,
    pub bounds: Rect,
}

impl SnapMatch<'_> {
    /// Page-space point the dragged element locks to.
    pub fn center(&self) -> Point {
        self.bounds.center()
    }
}

/// Targets currently available for snapping, in registration order.
#[derive(Debug, Clone, Default)]
pub struct SnapTargetRegistry {
    targets: Vec<SnapTarget>,
}

impl SnapTargetRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a target when it mounts.
    ///
    /// Registering a target again updates its type and strength in place,
    /// keeping its position in the order.
    pub fn register(
        &mut self,
        target: EntityId,
        kind: impl Into<String>,
        strength: f64,
    ) -> DiagramResult<()> {
        if !strength.is_finite() || strength < 0.0 {
            return Err(DiagramError::validation(
                "snap target",
                format!("strength must be a finite value >= 0, got {strength}"),
            ));
        }
        let kind = kind.into();
        if let Some(existing) = self.targets.iter_mut().find(|t| t.target == target) {
            existing.kind = kind;
            existing.strength = strength;
        } else {
            log::debug!("Registered snap target {target} ({kind}, strength {strength})");
            self.targets.push(SnapTarget {
                target,
                kind,
                strength,
            });
        }
        Ok(())
    }

    /// Remove a target when it unmounts. Returns whether it was registered.
    pub fn unregister(&mut self, target: EntityId) -> bool {
        let before = self.targets.len();
        self.targets.retain(|t| t.target != target);
        before != self.targets.len()
    }

    /// Targets whose type is one of `types`, in registration order.
    pub fn targets_by_type<S: AsRef<str>>(&self, types: &[S]) -> Vec<&SnapTarget> {
        self.targets
            .iter()
            .filter(|t| types.iter().any(|ty| ty.as_ref() == t.kind))
            .collect()
    }

    pub fn get(&self, target: EntityId) -> Option<&SnapTarget> {
        self.targets.iter().find(|t| t.target == target)
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn clear(&mut self) {
        self.targets.clear();
    }
}

/// Scale `bounds` by `strength` around its own center.
pub fn expanded_box(bounds: Rect, strength: f64) -> Rect {
    let size = bounds.size();
    let expanded = Size::new(size.width * strength, size.height * strength);
    let x = bounds.x0 - (expanded.width - size.width) / 2.0;
    let y = bounds.y0 - (expanded.height - size.height) / 2.0;
    Rect::from_origin_size((x, y), expanded)
}

/// Strict containment: points on the edge are outside.
pub fn is_point_within_rect(point: Point, rect: Rect) -> bool {
    point.x > rect.x0 && point.x < rect.x1 && point.y > rect.y0 && point.y < rect.y1
}

/// First target, in the given order, whose pull zone contains `point`.
///
/// Targets without a box (unmounted) are skipped. Matching is first-match,
/// not nearest-match.
pub fn snap_target_in_range<'a, P>(
    point: Point,
    targets: &[&'a SnapTarget],
    provider: &P,
) -> Option<SnapMatch<'a>>
where
    P: BoundingBoxProvider + ?Sized,
{
    targets.iter().find_map(|&target| {
        let bounds = provider.bounding_box(target.target)?;
        is_point_within_rect(point, target.zone(bounds)).then_some(SnapMatch { target, bounds })
    })
}
