//! Node and link layers.
//!
//! A layer maps one collection of the model to caller-supplied renderers
//! and owns a drag controller for every draggable entity it shows. Drag
//! releases are committed back through the [`Diagram`] controller.

use crate::config::EditorConfig;
use crate::diagram::{ChangeSink, Diagram};
use crate::drag::{DragController, DragEvent, DragOptions, Draggable};
use crate::error::{DiagramError, DiagramResult};
use crate::input::PointerEvent;
use crate::model::{DiagramModel, Entity, EntityId, LinkModel, NodeModel, PointModel};
use crate::snap::{BoundingBoxProvider, SnapTargetRegistry};
use kurbo::Vec2;
use std::borrow::Cow;
use std::collections::{HashMap, HashSet};

/// Draws entities of one type tag.
pub trait EntityRenderer<M> {
    type Output;

    /// Type tag this renderer handles.
    fn entity_type(&self) -> &str;

    /// Draw `model`. `value` is the whole diagram, with in-progress drag
    /// positions applied.
    fn render(&self, model: &M, value: &DiagramModel) -> Self::Output;
}

/// Type tag -> renderer lookup, built once per render pass.
pub struct RendererTable<'r, R> {
    by_type: HashMap<&'r str, &'r R>,
}

impl<'r, R> RendererTable<'r, R> {
    /// Index `renderers` by type. The first renderer for a type wins.
    pub fn build<M>(renderers: &'r [R]) -> Self
    where
        R: EntityRenderer<M>,
    {
        let mut by_type = HashMap::with_capacity(renderers.len());
        for renderer in renderers {
            by_type.entry(renderer.entity_type()).or_insert(renderer);
        }
        Self { by_type }
    }

    /// Renderer for `entity_type`, or an error naming the entity.
    pub fn resolve(&self, entity_type: &str, id: EntityId) -> DiagramResult<&'r R> {
        self.by_type
            .get(entity_type)
            .copied()
            .ok_or_else(|| DiagramError::UnregisteredType {
                entity_type: entity_type.to_string(),
                id,
            })
    }

    pub fn len(&self) -> usize {
        self.by_type.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_type.is_empty()
    }
}

/// Drag controllers for every draggable entity of one layer.
#[derive(Debug, Clone)]
pub struct DragLayer<E> {
    offset: Vec2,
    options: DragOptions,
    controllers: HashMap<EntityId, DragController<E>>,
}

impl<E: Draggable> DragLayer<E> {
    pub fn new(options: DragOptions) -> Self {
        Self {
            offset: Vec2::ZERO,
            options,
            controllers: HashMap::new(),
        }
    }

    pub fn offset(&self) -> Vec2 {
        self.offset
    }

    /// Set the layer's page offset on every controller.
    pub fn set_offset(&mut self, offset: Vec2) {
        self.offset = offset;
        for controller in self.controllers.values_mut() {
            controller.set_offset(offset);
        }
    }

    /// Match controllers to the records currently in the model.
    ///
    /// New records get a controller, idle controllers take the new record,
    /// and controllers whose record is gone are dropped unless mid-gesture.
    pub fn sync<'a, I>(&mut self, records: I)
    where
        I: IntoIterator<Item = &'a E>,
        E: 'a,
    {
        let mut present = HashSet::new();
        for record in records {
            let id = record.id();
            present.insert(id);
            match self.controllers.get_mut(&id) {
                Some(controller) => controller.sync_model(record.clone()),
                None => {
                    let controller = DragController::new(record.clone(), self.options.clone())
                        .with_offset(self.offset);
                    self.controllers.insert(id, controller);
                }
            }
        }
        self.controllers
            .retain(|id, controller| controller.is_dragging() || present.contains(id));
    }

    pub fn controller(&self, id: EntityId) -> Option<&DragController<E>> {
        self.controllers.get(&id)
    }

    pub fn len(&self) -> usize {
        self.controllers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.controllers.is_empty()
    }

    /// Whether any gesture of this layer is active.
    pub fn is_capturing(&self) -> bool {
        self.controllers.values().any(DragController::is_capturing)
    }

    /// Route a pointer event.
    ///
    /// A press goes to the controller of `hit`; moves and releases go to
    /// every controller currently capturing.
    pub fn handle_pointer_event<P>(
        &mut self,
        hit: Option<EntityId>,
        event: PointerEvent,
        registry: &SnapTargetRegistry,
        provider: &P,
    ) -> Vec<DragEvent<E>>
    where
        P: BoundingBoxProvider + ?Sized,
    {
        match event {
            PointerEvent::Down { .. } => hit
                .and_then(|id| self.controllers.get_mut(&id))
                .and_then(|c| c.handle_pointer_event(event, registry, provider))
                .into_iter()
                .collect(),
            PointerEvent::Move { .. } | PointerEvent::Up { .. } => self
                .controllers
                .values_mut()
                .filter(|c| c.is_capturing())
                .filter_map(|c| c.handle_pointer_event(event, registry, provider))
                .collect(),
        }
    }

    /// Put the records of rejected `Ended` events back at their origin.
    pub fn revert_ended(&mut self, events: &[DragEvent<E>]) {
        for event in events {
            if let DragEvent::Ended { origin, model, .. } = event {
                if let Some(controller) = self.controllers.get_mut(&model.id()) {
                    log::warn!("Reverting drag of {} to {:?}", model.id(), origin);
                    controller.sync_model(model.with_location(*origin));
                }
            }
        }
    }

    /// `value` with in-progress drag positions applied.
    pub fn overlay<'v>(&self, value: &'v DiagramModel) -> Cow<'v, DiagramModel> {
        let mut dragging = self.controllers.values().filter(|c| c.is_dragging()).peekable();
        if dragging.peek().is_none() {
            return Cow::Borrowed(value);
        }
        let mut live = value.clone();
        for controller in dragging {
            live.upsert(controller.live_model().into());
        }
        Cow::Owned(live)
    }
}

/// Commit the records of every `Ended` event in one update.
fn commit_ended<E, S>(
    events: &[DragEvent<E>],
    diagram: &mut Diagram<S>,
    value: &DiagramModel,
) -> DiagramResult<()>
where
    E: Draggable,
    S: ChangeSink,
{
    let ended: Vec<Entity> = events
        .iter()
        .filter_map(|event| match event {
            DragEvent::Ended { model, .. } => Some(model.clone().into()),
            _ => None,
        })
        .collect();
    diagram.change_entities(value, ended)
}

/// Layer presenting the diagram's nodes; nodes are draggable.
#[derive(Debug, Clone)]
pub struct LayerNodes {
    drags: DragLayer<NodeModel>,
}

impl LayerNodes {
    pub fn new(config: &EditorConfig) -> Self {
        Self {
            drags: DragLayer::new(DragOptions::snapping_to(config.node_snap_types.clone())),
        }
    }

    pub fn with_offset(mut self, offset: Vec2) -> Self {
        self.drags.set_offset(offset);
        self
    }

    pub fn set_offset(&mut self, offset: Vec2) {
        self.drags.set_offset(offset);
    }

    pub fn drags(&self) -> &DragLayer<NodeModel> {
        &self.drags
    }

    /// Render every node with the renderer registered for its type.
    ///
    /// Nodes are visited in id order. Fails on the first node whose type
    /// has no renderer.
    pub fn render<R>(&mut self, value: &DiagramModel, renderers: &[R]) -> DiagramResult<Vec<R::Output>>
    where
        R: EntityRenderer<NodeModel>,
    {
        let table = RendererTable::build::<NodeModel>(renderers);
        self.drags.sync(value.nodes.values());

        let live = self.drags.overlay(value);
        let mut nodes: Vec<&NodeModel> = live.nodes.values().collect();
        nodes.sort_by_key(|node| node.id);

        nodes
            .into_iter()
            .map(|node| {
                let renderer = table.resolve(&node.entity_type, node.id)?;
                Ok(renderer.render(node, &live))
            })
            .collect()
    }

    /// Route a pointer event and commit finished node drags.
    pub fn handle_pointer_event<P, S>(
        &mut self,
        hit: Option<EntityId>,
        event: PointerEvent,
        registry: &SnapTargetRegistry,
        provider: &P,
        diagram: &mut Diagram<S>,
        value: &DiagramModel,
    ) -> DiagramResult<Vec<DragEvent<NodeModel>>>
    where
        P: BoundingBoxProvider + ?Sized,
        S: ChangeSink,
    {
        let events = self.drags.handle_pointer_event(hit, event, registry, provider);
        if let Err(e) = commit_ended(&events, diagram, value) {
            self.drags.revert_ended(&events);
            return Err(e);
        }
        Ok(events)
    }
}

/// Layer presenting the diagram's links; link points are draggable.
#[derive(Debug, Clone)]
pub struct LayerLinks {
    drags: DragLayer<PointModel>,
}

impl LayerLinks {
    pub fn new(config: &EditorConfig) -> Self {
        Self {
            drags: DragLayer::new(DragOptions::snapping_to(config.point_snap_types.clone())),
        }
    }

    pub fn with_offset(mut self, offset: Vec2) -> Self {
        self.drags.set_offset(offset);
        self
    }

    pub fn set_offset(&mut self, offset: Vec2) {
        self.drags.set_offset(offset);
    }

    pub fn drags(&self) -> &DragLayer<PointModel> {
        &self.drags
    }

    /// Render every link with the renderer registered for its type.
    ///
    /// Renderers resolve the link's points from the `value` they receive,
    /// which carries live positions of points being dragged.
    pub fn render<R>(&mut self, value: &DiagramModel, renderers: &[R]) -> DiagramResult<Vec<R::Output>>
    where
        R: EntityRenderer<LinkModel>,
    {
        let table = RendererTable::build::<LinkModel>(renderers);
        self.drags.sync(value.points.values());

        let live = self.drags.overlay(value);
        let mut links: Vec<&LinkModel> = live.links.values().collect();
        links.sort_by_key(|link| link.id);

        links
            .into_iter()
            .map(|link| {
                let renderer = table.resolve(&link.entity_type, link.id)?;
                Ok(renderer.render(link, &live))
            })
            .collect()
    }

    /// Route a pointer event and commit finished point drags.
    pub fn handle_pointer_event<P, S>(
        &mut self,
        hit: Option<EntityId>,
        event: PointerEvent,
        registry: &SnapTargetRegistry,
        provider: &P,
        diagram: &mut Diagram<S>,
        value: &DiagramModel,
    ) -> DiagramResult<Vec<DragEvent<PointModel>>>
    where
        P: BoundingBoxProvider + ?Sized,
        S: ChangeSink,
    {
        let events = self.drags.handle_pointer_event(hit, event, registry, provider);
        if let Err(e) = commit_ended(&events, diagram, value) {
            self.drags.revert_ended(&events);
            return Err(e);
        }
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LinkConfig, NodeConfig};
    use crate::store;
    use kurbo::{Point, Rect};

    struct Label(&'static str);

    impl EntityRenderer<NodeModel> for Label {
        type Output = String;

        fn entity_type(&self) -> &str {
            self.0
        }

        fn render(&self, model: &NodeModel, _value: &DiagramModel) -> String {
            format!("{}@{},{}", self.0, model.x, model.y)
        }
    }

    struct Path;

    impl EntityRenderer<LinkModel> for Path {
        type Output = Vec<Point>;

        fn entity_type(&self) -> &str {
            "default"
        }

        fn render(&self, model: &LinkModel, value: &DiagramModel) -> Vec<Point> {
            value.link_points(model).iter().map(|p| p.location()).collect()
        }
    }

    fn model_with_node(entity_type: &str) -> (DiagramModel, EntityId) {
        let partial = NodeConfig {
            entity_type: Some(entity_type.to_string()),
            x: Some(10.0),
            y: Some(20.0),
            ..NodeConfig::default()
        };
        let value = DiagramModel::new();
        let (id, patch) = store::plan_add_node(&value, &EditorConfig::default(), partial).unwrap();
        (patch.apply(&value), id)
    }

    #[test]
    fn test_renderer_table_first_wins() {
        let renderers = [Label("a"), Label("b"), Label("a")];
        let table = RendererTable::build::<NodeModel>(&renderers[..]);
        assert_eq!(table.len(), 2);
        let id = crate::model::make_uid();
        assert!(std::ptr::eq(table.resolve("a", id).unwrap(), &renderers[0]));
    }

    #[test]
    fn test_render_nodes() {
        let (value, _) = model_with_node("task");
        let mut layer = LayerNodes::new(&EditorConfig::default());
        let out = layer.render(&value, &[Label("task")]).unwrap();
        assert_eq!(out, vec!["task@10,20".to_string()]);
        assert_eq!(layer.drags().len(), 1);
    }

    #[test]
    fn test_render_missing_renderer_fails() {
        let (value, id) = model_with_node("task");
        let mut layer = LayerNodes::new(&EditorConfig::default());
        let err = layer.render(&value, &[Label("default")]).unwrap_err();
        assert_eq!(
            err,
            DiagramError::UnregisteredType {
                entity_type: "task".to_string(),
                id,
            }
        );
    }

    #[test]
    fn test_node_drag_commits_through_diagram() {
        let (value, id) = model_with_node("default");
        let mut emitted = Vec::new();
        let mut layer = LayerNodes::new(&EditorConfig::default());
        let registry = SnapTargetRegistry::new();
        let mut boxes = HashMap::new();
        boxes.insert(id, Rect::new(10.0, 20.0, 60.0, 70.0));

        layer.render(&value, &[Label("default")]).unwrap();
        {
            let mut diagram =
                Diagram::new(EditorConfig::default(), |m: DiagramModel| emitted.push(m)).unwrap();
            let mut send = |hit: Option<EntityId>, event: PointerEvent| {
                layer
                    .handle_pointer_event(hit, event, &registry, &boxes, &mut diagram, &value)
                    .unwrap()
            };

            // A press on nothing starts nothing.
            assert!(send(None, PointerEvent::press(Point::new(15.0, 25.0))).is_empty());
            assert_eq!(send(Some(id), PointerEvent::press(Point::new(15.0, 25.0))).len(), 1);
            send(None, PointerEvent::moved(Point::new(105.0, 205.0)));
            let ended = send(None, PointerEvent::release(Point::new(105.0, 205.0)));
            assert!(matches!(ended[..], [DragEvent::Ended { .. }]));
        }

        assert_eq!(emitted.len(), 1);
        let node = &emitted[0].nodes[&id];
        assert_eq!(node.location(), Point::new(100.0, 200.0));
        assert_eq!(node.ports, value.nodes[&id].ports);
    }

    #[test]
    fn test_render_shows_live_drag_position() {
        let value = DiagramModel::new();
        let (link_id, patch) =
            store::plan_add_link(&value, &EditorConfig::default(), LinkConfig::default()).unwrap();
        let value = patch.apply(&value);
        let end = value.links[&link_id].points[1];

        let mut layer = LayerLinks::new(&EditorConfig::default());
        let registry = SnapTargetRegistry::new();
        let boxes: HashMap<EntityId, Rect> = HashMap::new();
        layer.render(&value, &[Path]).unwrap();

        let mut emitted = Vec::new();
        let mut diagram =
            Diagram::new(EditorConfig::default(), |m: DiagramModel| emitted.push(m)).unwrap();
        layer
            .handle_pointer_event(
                Some(end),
                PointerEvent::press(Point::new(100.0, 100.0)),
                &registry,
                &boxes,
                &mut diagram,
                &value,
            )
            .unwrap();
        layer
            .handle_pointer_event(
                None,
                PointerEvent::moved(Point::new(150.0, 120.0)),
                &registry,
                &boxes,
                &mut diagram,
                &value,
            )
            .unwrap();

        let paths = layer.render(&value, &[Path]).unwrap();
        assert_eq!(paths, vec![vec![Point::new(0.0, 0.0), Point::new(150.0, 120.0)]]);
        assert!(layer.drags().is_capturing());
        drop(diagram);
        assert!(emitted.is_empty());
    }

    #[test]
    fn test_sync_drops_removed_records() {
        let (value, id) = model_with_node("default");
        let mut layer = DragLayer::new(DragOptions::default());
        layer.sync(value.nodes.values());
        assert!(layer.controller(id).is_some());

        layer.sync(std::iter::empty::<&NodeModel>());
        assert!(layer.controller(id).is_none());

        // Records seen more than once, or in any order, keep one controller each.
        let (other, other_id) = model_with_node("default");
        let both: Vec<&NodeModel> = value.nodes.values().chain(other.nodes.values()).collect();
        layer.sync(both.iter().copied().chain(value.nodes.values()));
        assert_eq!(layer.len(), 2);
        layer.sync(other.nodes.values());
        assert!(layer.controller(id).is_none());
        assert!(layer.controller(other_id).is_some());
    }

    #[test]
    fn test_set_offset_reaches_controllers() {
        let (value, id) = model_with_node("default");
        let mut layer = DragLayer::new(DragOptions::default());
        layer.sync(value.nodes.values());
        layer.set_offset(Vec2::new(3.0, 4.0));
        assert_eq!(layer.controller(id).unwrap().offset(), Vec2::new(3.0, 4.0));

        let (other, other_id) = model_with_node("default");
        layer.sync(other.nodes.values());
        assert_eq!(layer.controller(other_id).unwrap().offset(), Vec2::new(3.0, 4.0));
    }

    #[test]
    fn test_rejected_release_reverts_controller() {
        let value = DiagramModel::new();
        let (link_id, patch) =
            store::plan_add_link(&value, &EditorConfig::default(), LinkConfig::default()).unwrap();
        let value = patch.apply(&value);
        let end = value.links[&link_id].points[1];

        let mut layer = LayerLinks::new(&EditorConfig::default());
        let registry = SnapTargetRegistry::new();
        let boxes: HashMap<EntityId, Rect> = HashMap::new();
        layer.render(&value, &[Path]).unwrap();

        let mut emitted = Vec::new();
        let mut diagram =
            Diagram::new(EditorConfig::default(), |m: DiagramModel| emitted.push(m)).unwrap();
        layer
            .handle_pointer_event(
                Some(end),
                PointerEvent::press(Point::new(100.0, 100.0)),
                &registry,
                &boxes,
                &mut diagram,
                &value,
            )
            .unwrap();
        layer
            .handle_pointer_event(
                None,
                PointerEvent::moved(Point::new(150.0, 120.0)),
                &registry,
                &boxes,
                &mut diagram,
                &value,
            )
            .unwrap();

        // The link disappears while its point is being dragged.
        let mut removed = value.clone();
        removed.links.clear();
        let err = layer
            .handle_pointer_event(
                None,
                PointerEvent::release(Point::new(150.0, 120.0)),
                &registry,
                &boxes,
                &mut diagram,
                &removed,
            )
            .unwrap_err();
        assert!(matches!(err, DiagramError::Integrity { .. }));

        let controller = layer.drags().controller(end).unwrap();
        assert!(!controller.is_dragging());
        assert_eq!(controller.position(), Point::new(100.0, 100.0));
        assert_eq!(controller.model().location(), Point::new(100.0, 100.0));
        assert!(!layer.drags().is_capturing());
        drop(diagram);
        assert!(emitted.is_empty());
    }
}
