//! Drag interaction: turns pointer gestures into committed entity positions.
//!
//! A [`DragController`] owns one draggable record. A primary press freezes
//! the pointer's offset from the element's top-left corner; each move
//! re-derives the element position from the pointer, locking onto the center
//! of the first snap target whose pull zone contains it; the release commits
//! the last emitted position as a full record.
//!
//! Pointer positions are page coordinates. The controller's `offset` is the
//! page position of the containing layer and converts between page and local
//! space. The host must keep it unchanged for the length of a gesture.

use crate::input::{MouseButton, PointerEvent};
use crate::model::{Entity, EntityId, NodeModel, PointModel};
use crate::snap::{BoundingBoxProvider, SnapTargetRegistry, snap_target_in_range};
use kurbo::{Point, Rect, Size, Vec2};
use serde::{Deserialize, Serialize};

/// A record that can be moved by dragging.
pub trait Draggable: Clone + Into<Entity> {
    fn id(&self) -> EntityId;

    /// Position in local coordinates.
    fn location(&self) -> Point;

    /// Full record with the position replaced.
    fn with_location(&self, location: Point) -> Self;
}

impl Draggable for NodeModel {
    fn id(&self) -> EntityId {
        self.id
    }

    fn location(&self) -> Point {
        NodeModel::location(self)
    }

    fn with_location(&self, location: Point) -> Self {
        Self {
            x: location.x,
            y: location.y,
            ..self.clone()
        }
    }
}

impl Draggable for PointModel {
    fn id(&self) -> EntityId {
        self.id
    }

    fn location(&self) -> Point {
        PointModel::location(self)
    }

    fn with_location(&self, location: Point) -> Self {
        Self {
            x: location.x,
            y: location.y,
            ..self.clone()
        }
    }
}

/// Per-draggable settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DragOptions {
    /// Snap target types this draggable is pulled towards.
    pub snap_targets: Vec<String>,
}

impl DragOptions {
    pub fn snapping_to<I, S>(types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            snap_targets: types.into_iter().map(Into::into).collect(),
        }
    }
}

/// Gesture state.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum DragState {
    #[default]
    Idle,
    Dragging {
        /// Pointer offset from the element's local origin, frozen at press.
        rel: Vec2,
        /// Local position when the gesture started.
        origin: Point,
    },
}

/// Notification produced by a gesture transition.
#[derive(Debug, Clone, PartialEq)]
pub enum DragEvent<E> {
    Started {
        id: EntityId,
        origin: Point,
    },
    Moved {
        id: EntityId,
        position: Point,
        /// Snap target the position locked onto, if any.
        snapped_to: Option<EntityId>,
    },
    /// The gesture finished; `model` is the full record to commit.
    Ended {
        origin: Point,
        position: Point,
        model: E,
    },
}

/// Drag state machine for one entity.
#[derive(Debug, Clone)]
pub struct DragController<E> {
    model: E,
    options: DragOptions,
    offset: Vec2,
    position: Point,
    state: DragState,
}

impl<E: Draggable> DragController<E> {
    /// Create an idle controller for `model`.
    pub fn new(model: E, options: DragOptions) -> Self {
        let position = model.location();
        Self {
            model,
            options,
            offset: Vec2::ZERO,
            position,
            state: DragState::Idle,
        }
    }

    /// Set the containing layer's page offset.
    pub fn with_offset(mut self, offset: Vec2) -> Self {
        self.offset = offset;
        self
    }

    pub fn set_offset(&mut self, offset: Vec2) {
        if self.is_dragging() && offset != self.offset {
            log::warn!(
                "Layer offset changed during a drag of {}; positions will drift",
                self.model.id()
            );
        }
        self.offset = offset;
    }

    pub fn offset(&self) -> Vec2 {
        self.offset
    }

    pub fn id(&self) -> EntityId {
        self.model.id()
    }

    pub fn model(&self) -> &E {
        &self.model
    }

    pub fn options(&self) -> &DragOptions {
        &self.options
    }

    /// Last emitted position in local coordinates.
    pub fn position(&self) -> Point {
        self.position
    }

    /// The record at its current, possibly uncommitted, position.
    pub fn live_model(&self) -> E {
        self.model.with_location(self.position)
    }

    pub fn state(&self) -> DragState {
        self.state
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, DragState::Dragging { .. })
    }

    /// Whether move and release events should be routed here.
    pub fn is_capturing(&self) -> bool {
        self.is_dragging()
    }

    /// Take a freshly rendered record. Ignored while a gesture is active.
    pub fn sync_model(&mut self, model: E) {
        if self.is_dragging() {
            return;
        }
        self.position = model.location();
        self.model = model;
    }

    /// Feed any pointer event through the state machine.
    pub fn handle_pointer_event<P>(
        &mut self,
        event: PointerEvent,
        registry: &SnapTargetRegistry,
        provider: &P,
    ) -> Option<DragEvent<E>>
    where
        P: BoundingBoxProvider + ?Sized,
    {
        match event {
            PointerEvent::Down { position, button } => self.press(position, button, provider),
            PointerEvent::Move { position } => self.pointer_move(position, registry, provider),
            PointerEvent::Up { button, .. } => self.release(button),
        }
    }

    /// Start a gesture. Non-primary buttons and presses during a gesture
    /// are ignored.
    pub fn press<P>(
        &mut self,
        page: Point,
        button: MouseButton,
        provider: &P,
    ) -> Option<DragEvent<E>>
    where
        P: BoundingBoxProvider + ?Sized,
    {
        if !button.is_primary() || self.is_dragging() {
            return None;
        }

        let id = self.model.id();
        let bounds = provider.bounding_box(id).unwrap_or_else(|| {
            log::debug!("No bounding box for {id}; using its model position");
            Rect::from_origin_size(self.position + self.offset, Size::ZERO)
        });
        let rel = page - (bounds.origin() - self.offset);
        let origin = self.position;

        self.state = DragState::Dragging { rel, origin };
        log::debug!("Drag started on {id} at {origin:?} (rel {rel:?})");

        Some(DragEvent::Started { id, origin })
    }

    /// Recompute the position for a pointer move during a gesture.
    pub fn pointer_move<P>(
        &mut self,
        page: Point,
        registry: &SnapTargetRegistry,
        provider: &P,
    ) -> Option<DragEvent<E>>
    where
        P: BoundingBoxProvider + ?Sized,
    {
        let DragState::Dragging { rel, .. } = self.state else {
            return None;
        };

        let id = self.model.id();
        let candidate = page - rel;
        let targets = registry.targets_by_type(&self.options.snap_targets);

        let (position, snapped_to) =
            match snap_target_in_range(candidate + self.offset, &targets, provider) {
                Some(hit) => (hit.center() - self.offset, Some(hit.target.target)),
                None => (candidate, None),
            };

        self.position = position;
        log::trace!("Drag of {id} moved to {position:?} (snapped to {snapped_to:?})");

        Some(DragEvent::Moved {
            id,
            position,
            snapped_to,
        })
    }

    /// Finish a gesture, committing the last emitted position.
    pub fn release(&mut self, button: MouseButton) -> Option<DragEvent<E>> {
        let DragState::Dragging { origin, .. } = self.state else {
            return None;
        };
        if !button.is_primary() {
            return None;
        }

        self.state = DragState::Idle;
        let position = self.position;
        let model = self.model.with_location(position);
        self.model = model.clone();
        log::debug!(
            "Drag of {} ended at {position:?} (from {origin:?})",
            model.id()
        );

        Some(DragEvent::Ended {
            origin,
            position,
            model,
        })
    }
}
