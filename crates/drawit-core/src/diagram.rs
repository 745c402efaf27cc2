//! Diagram controller: structural edits and per-entity changes.
//!
//! The controller keeps no copy of the model. Each operation takes the
//! host's current model, computes the next one and hands it to the change
//! sink; the host stores it and passes it back on the next call.

use crate::config::{EditorConfig, LinkConfig, NodeConfig};
use crate::error::DiagramResult;
use crate::model::{DiagramModel, Entity, EntityId, LinkModel, NodeModel, PointModel, PortModel};
use crate::store::{self, ModelPatch};

/// Receives the complete next model after every mutation.
pub trait ChangeSink {
    fn on_change(&mut self, model: DiagramModel);
}

impl<F: FnMut(DiagramModel)> ChangeSink for F {
    fn on_change(&mut self, model: DiagramModel) {
        self(model)
    }
}

/// Top-level controller for one diagram.
pub struct Diagram<S> {
    config: EditorConfig,
    on_change: S,
}

impl<S: ChangeSink> Diagram<S> {
    /// Create a controller after checking `config`.
    pub fn new(config: EditorConfig, on_change: S) -> DiagramResult<Self> {
        config.validate()?;
        Ok(Self { config, on_change })
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn sink(&self) -> &S {
        &self.on_change
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.on_change
    }

    pub fn into_sink(self) -> S {
        self.on_change
    }

    /// Single mutation path: merge `patch` over `value` and notify.
    fn update_value(&mut self, value: &DiagramModel, patch: ModelPatch) {
        log::trace!("Updating collections {:?}", patch.touched());
        let next = patch.apply(value);
        self.on_change.on_change(next);
    }

    /// Add a node and its ports in one update.
    pub fn add_node(&mut self, value: &DiagramModel, partial: NodeConfig) -> DiagramResult<EntityId> {
        let (id, patch) = store::plan_add_node(value, &self.config, partial)?;
        log::debug!("Adding node {id}");
        self.update_value(value, patch);
        Ok(id)
    }

    /// Add a link and its points in one update.
    pub fn add_link(&mut self, value: &DiagramModel, partial: LinkConfig) -> DiagramResult<EntityId> {
        let (id, patch) = store::plan_add_link(value, &self.config, partial)?;
        log::debug!("Adding link {id}");
        self.update_value(value, patch);
        Ok(id)
    }

    /// Replace one full record in its collection.
    pub fn change_entity(&mut self, value: &DiagramModel, entity: Entity) -> DiagramResult<()> {
        self.change_entities(value, vec![entity])
    }

    /// Replace several full records in one update.
    ///
    /// With `validate_changes` on, the batch must keep the model valid or
    /// nothing is emitted. An empty batch emits nothing.
    pub fn change_entities(
        &mut self,
        value: &DiagramModel,
        entities: Vec<Entity>,
    ) -> DiagramResult<()> {
        if entities.is_empty() {
            return Ok(());
        }
        if !self.config.validate_changes {
            let patch = store::plan_change_entities(value, entities);
            self.update_value(value, patch);
            return Ok(());
        }
        match store::apply_checked_changes(value, entities) {
            Ok(next) => {
                self.on_change.on_change(next);
                Ok(())
            }
            Err(e) => {
                log::warn!("Rejected change: {e}");
                Err(e)
            }
        }
    }

    pub fn change_node(&mut self, value: &DiagramModel, node: NodeModel) -> DiagramResult<()> {
        self.change_entity(value, Entity::Node(node))
    }

    pub fn change_port(&mut self, value: &DiagramModel, port: PortModel) -> DiagramResult<()> {
        self.change_entity(value, Entity::Port(port))
    }

    pub fn change_link(&mut self, value: &DiagramModel, link: LinkModel) -> DiagramResult<()> {
        self.change_entity(value, Entity::Link(link))
    }

    pub fn change_point(&mut self, value: &DiagramModel, point: PointModel) -> DiagramResult<()> {
        self.change_entity(value, Entity::Point(point))
    }
}
