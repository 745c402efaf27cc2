//! Headless host: owns the authoritative model and replays actions.

use crate::error::{AppError, AppResult};
use crate::render::TextRenderer;
use crate::script::{Action, LayerKind, RendererTypes, Script};
use drawit_core::{
    ChangeSink, Diagram, DiagramModel, EditorConfig, EntityId, LayerLinks, LayerNodes,
    PointerEvent, SnapTargetRegistry, store,
};
use kurbo::Rect;
use std::collections::HashMap;

/// Change sink that holds the latest emitted model until the host takes it.
#[derive(Debug, Default)]
pub struct ModelSlot {
    next: Option<DiagramModel>,
    changes: usize,
}

impl ModelSlot {
    pub fn take(&mut self) -> Option<DiagramModel> {
        self.next.take()
    }

    /// Number of change notifications received so far.
    pub fn changes(&self) -> usize {
        self.changes
    }
}

impl ChangeSink for ModelSlot {
    fn on_change(&mut self, model: DiagramModel) {
        self.changes += 1;
        self.next = Some(model);
    }
}

/// One editing session.
pub struct Session {
    model: DiagramModel,
    diagram: Diagram<ModelSlot>,
    registry: SnapTargetRegistry,
    boxes: HashMap<EntityId, Rect>,
    nodes: LayerNodes,
    links: LayerLinks,
    node_renderers: Vec<TextRenderer>,
    link_renderers: Vec<TextRenderer>,
    names: HashMap<String, EntityId>,
}

impl Session {
    pub fn new(config: EditorConfig, renderers: &RendererTypes) -> AppResult<Self> {
        let nodes = LayerNodes::new(&config);
        let links = LayerLinks::new(&config);
        let diagram = Diagram::new(config, ModelSlot::default())?;
        Ok(Self {
            model: DiagramModel::new(),
            diagram,
            registry: SnapTargetRegistry::new(),
            boxes: HashMap::new(),
            nodes,
            links,
            node_renderers: TextRenderer::for_types(&renderers.nodes),
            link_renderers: TextRenderer::for_types(&renderers.links),
            names: HashMap::new(),
        })
    }

    /// Build a session from a script's settings and starting model.
    ///
    /// `config` takes precedence over the script's own settings.
    pub fn from_script(script: &Script, config: Option<EditorConfig>) -> AppResult<Self> {
        let config = config.or_else(|| script.config.clone()).unwrap_or_default();
        let mut session = Self::new(config, &script.renderers)?;
        if let Some(model) = &script.model {
            session.load_model(model.clone())?;
        }
        Ok(session)
    }

    /// Replace the current model after checking its invariants.
    pub fn load_model(&mut self, model: DiagramModel) -> AppResult<()> {
        store::validate(&model)?;
        log::info!("Loaded model with {} records", model.len());
        self.model = model;
        Ok(())
    }

    pub fn model(&self) -> &DiagramModel {
        &self.model
    }

    pub fn changes(&self) -> usize {
        self.diagram.sink().changes()
    }

    pub fn registry(&self) -> &SnapTargetRegistry {
        &self.registry
    }

    /// Store whatever the controller emitted as the new current model.
    fn accept_change(&mut self) {
        if let Some(next) = self.diagram.sink_mut().take() {
            self.model = next;
        }
    }

    /// Replay every action of `script` in order.
    pub fn run(&mut self, script: &Script) -> AppResult<()> {
        for (i, action) in script.actions.iter().enumerate() {
            log::debug!("Action {i}: {action:?}");
            self.apply(action.clone())?;
        }
        Ok(())
    }

    pub fn apply(&mut self, action: Action) -> AppResult<()> {
        match action {
            Action::AddNode { name, node } => {
                self.check_name(name.as_deref())?;
                let id = self.diagram.add_node(&self.model, node)?;
                self.accept_change();
                if let Some(name) = name {
                    self.names.insert(name, id);
                }
                Ok(())
            }
            Action::AddLink { name, link } => {
                self.check_name(name.as_deref())?;
                let id = self.diagram.add_link(&self.model, link)?;
                self.accept_change();
                if let Some(name) = name {
                    self.names.insert(name, id);
                }
                Ok(())
            }
            Action::RegisterSnapTarget {
                target,
                kind,
                strength,
            } => {
                let id = self.resolve(&target)?;
                self.registry.register(id, kind, strength)?;
                Ok(())
            }
            Action::UnregisterSnapTarget { target } => {
                let id = self.resolve(&target)?;
                if !self.registry.unregister(id) {
                    log::warn!("Snap target {target} was not registered");
                }
                Ok(())
            }
            Action::SetBox { target, rect } => {
                let id = self.resolve(&target)?;
                self.boxes.insert(id, rect);
                Ok(())
            }
            Action::SetOffset { layer, offset } => {
                match layer {
                    LayerKind::Nodes => self.nodes.set_offset(offset),
                    LayerKind::Links => self.links.set_offset(offset),
                }
                Ok(())
            }
            Action::Pointer { layer, hit, event } => {
                let hit = hit.as_deref().map(|r| self.resolve(r)).transpose()?;
                self.pointer(layer, hit, event)
            }
        }
    }

    /// Render both layers and route one pointer event to `layer`.
    pub fn pointer(
        &mut self,
        layer: LayerKind,
        hit: Option<EntityId>,
        event: PointerEvent,
    ) -> AppResult<()> {
        self.render()?;
        match layer {
            LayerKind::Nodes => {
                self.nodes.handle_pointer_event(
                    hit,
                    event,
                    &self.registry,
                    &self.boxes,
                    &mut self.diagram,
                    &self.model,
                )?;
            }
            LayerKind::Links => {
                self.links.handle_pointer_event(
                    hit,
                    event,
                    &self.registry,
                    &self.boxes,
                    &mut self.diagram,
                    &self.model,
                )?;
            }
        }
        self.accept_change();
        Ok(())
    }

    /// Render every node, then every link, one line each.
    pub fn render(&mut self) -> AppResult<Vec<String>> {
        let mut lines = self.nodes.render(&self.model, &self.node_renderers)?;
        lines.extend(self.links.render(&self.model, &self.link_renderers)?);
        Ok(lines)
    }

    fn check_name(&self, name: Option<&str>) -> AppResult<()> {
        match name {
            Some(name) if self.names.contains_key(name) => {
                Err(AppError::DuplicateName(name.to_string()))
            }
            _ => Ok(()),
        }
    }

    /// Resolve an entity reference: an id, `name`, `name/slot` or `name/index`.
    pub fn resolve(&self, reference: &str) -> AppResult<EntityId> {
        let unknown = || AppError::UnknownReference(reference.to_string());
        if let Ok(id) = reference.parse::<EntityId>() {
            return Ok(id);
        }

        let (name, part) = match reference.split_once('/') {
            Some((name, part)) => (name, Some(part)),
            None => (reference, None),
        };
        let id = *self.names.get(name).ok_or_else(unknown)?;
        let Some(part) = part else {
            return Ok(id);
        };

        if let Some(node) = self.model.nodes.get(&id) {
            return node.ports.get(part).copied().ok_or_else(unknown);
        }
        if let Some(link) = self.model.links.get(&id) {
            let index: usize = part.parse().map_err(|_| unknown())?;
            return link.points.get(index).copied().ok_or_else(unknown);
        }
        Err(unknown())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drawit_core::{LinkConfig, NodeConfig};
    use kurbo::{Point, Vec2};

    fn session() -> Session {
        Session::new(EditorConfig::default(), &RendererTypes::default()).unwrap()
    }

    fn add_named_link(session: &mut Session, name: &str) {
        session
            .apply(Action::AddLink {
                name: Some(name.to_string()),
                link: LinkConfig::default(),
            })
            .unwrap();
    }

    #[test]
    fn test_host_feeds_model_back() {
        let mut session = session();
        session
            .apply(Action::AddNode {
                name: Some("a".to_string()),
                node: NodeConfig::default(),
            })
            .unwrap();
        session
            .apply(Action::AddNode {
                name: None,
                node: NodeConfig::default(),
            })
            .unwrap();

        assert_eq!(session.changes(), 2);
        assert_eq!(session.model().nodes.len(), 2);
        assert_eq!(session.model().ports.len(), 4);
    }

    #[test]
    fn test_resolve_references() {
        let mut session = session();
        session
            .apply(Action::AddNode {
                name: Some("a".to_string()),
                node: NodeConfig::default(),
            })
            .unwrap();
        add_named_link(&mut session, "l");

        let node = session.resolve("a").unwrap();
        let left = session.resolve("a/left").unwrap();
        assert_eq!(session.model().nodes[&node].ports["left"], left);
        let link = session.resolve("l").unwrap();
        assert_eq!(session.resolve("l/1").unwrap(), session.model().links[&link].points[1]);
        assert_eq!(session.resolve(&left.to_string()).unwrap(), left);

        for bad in ["b", "a/top", "l/2", "l/x"] {
            assert!(matches!(session.resolve(bad), Err(AppError::UnknownReference(_))));
        }
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut session = session();
        add_named_link(&mut session, "l");
        let err = session
            .apply(Action::AddLink {
                name: Some("l".to_string()),
                link: LinkConfig::default(),
            })
            .unwrap_err();
        assert!(matches!(err, AppError::DuplicateName(_)));
        assert_eq!(session.model().links.len(), 1);
    }

    #[test]
    fn test_drag_point_onto_port() {
        let mut session = session();
        session
            .apply(Action::AddNode {
                name: Some("a".to_string()),
                node: NodeConfig::default(),
            })
            .unwrap();
        add_named_link(&mut session, "l");

        let actions = [
            Action::RegisterSnapTarget {
                target: "a/right".to_string(),
                kind: "port".to_string(),
                strength: 2.0,
            },
            Action::SetBox {
                target: "a/right".to_string(),
                rect: Rect::new(290.0, 290.0, 310.0, 310.0),
            },
            Action::Pointer {
                layer: LayerKind::Links,
                hit: Some("l/1".to_string()),
                event: PointerEvent::press(Point::new(100.0, 100.0)),
            },
            Action::Pointer {
                layer: LayerKind::Links,
                hit: None,
                event: PointerEvent::moved(Point::new(305.0, 295.0)),
            },
            Action::Pointer {
                layer: LayerKind::Links,
                hit: None,
                event: PointerEvent::release(Point::new(305.0, 295.0)),
            },
        ];
        for action in actions {
            session.apply(action).unwrap();
        }

        let point = session.resolve("l/1").unwrap();
        assert_eq!(session.model().points[&point].location(), Point::new(300.0, 300.0));
        assert_eq!(session.changes(), 3);
    }

    #[test]
    fn test_node_layer_offset() {
        let mut session = session();
        session
            .apply(Action::AddNode {
                name: Some("a".to_string()),
                node: NodeConfig::default(),
            })
            .unwrap();
        session
            .apply(Action::SetOffset {
                layer: LayerKind::Nodes,
                offset: Vec2::new(50.0, 50.0),
            })
            .unwrap();
        let node = session.resolve("a").unwrap();

        session
            .pointer(LayerKind::Nodes, Some(node), PointerEvent::press(Point::new(50.0, 50.0)))
            .unwrap();
        session
            .pointer(LayerKind::Nodes, None, PointerEvent::moved(Point::new(80.0, 90.0)))
            .unwrap();
        session
            .pointer(LayerKind::Nodes, None, PointerEvent::release(Point::new(80.0, 90.0)))
            .unwrap();

        assert_eq!(session.model().nodes[&node].location(), Point::new(30.0, 40.0));
    }

    #[test]
    fn test_render_fails_for_unknown_type() {
        let mut session = session();
        session
            .apply(Action::AddNode {
                name: None,
                node: NodeConfig {
                    entity_type: Some("task".to_string()),
                    ..NodeConfig::default()
                },
            })
            .unwrap();
        assert!(matches!(
            session.render(),
            Err(AppError::Diagram(drawit_core::DiagramError::UnregisteredType { .. }))
        ));
    }

    #[test]
    fn test_load_model_validates() {
        let mut session = session();
        add_named_link(&mut session, "l");
        let mut broken = session.model().clone();
        broken.links.clear();
        assert!(session.load_model(broken).is_err());
        assert_eq!(session.model().links.len(), 1);
    }

    #[test]
    fn test_run_script_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(
            &mut file,
            br#"{
                "config": { "default_port_slots": ["in"] },
                "actions": [
                    { "action": "addNode", "name": "a", "node": { "x": 10, "y": 10 } },
                    { "action": "addLink", "name": "l", "link": { "points": [ { "x": 0, "y": 0 } ] } },
                    { "action": "pointer", "layer": "links", "hit": "l/0",
                      "event": { "Down": { "position": { "x": 0, "y": 0 }, "button": "Left" } } },
                    { "action": "pointer", "layer": "links",
                      "event": { "Move": { "position": { "x": 7, "y": 3 } } } },
                    { "action": "pointer", "layer": "links",
                      "event": { "Up": { "position": { "x": 7, "y": 3 }, "button": "Left" } } }
                ]
            }"#,
        )
        .unwrap();

        let script = Script::load(file.path()).unwrap();
        let mut session = Session::from_script(&script, None).unwrap();
        session.run(&script).unwrap();

        let node = session.resolve("a").unwrap();
        assert_eq!(session.model().nodes[&node].ports.len(), 1);
        let point = session.resolve("l/0").unwrap();
        assert_eq!(session.model().points[&point].location(), Point::new(7.0, 3.0));
        assert_eq!(session.render().unwrap().len(), 2);
    }
}
