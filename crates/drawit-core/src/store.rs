//! Entity store: patches, structural edits and integrity checks.
//!
//! Everything here is a pure function of the current model. Structural
//! edits produce a [`ModelPatch`] holding the complete next collection for
//! every collection they touch; nothing is written until the patch is
//! applied, so a failed edit leaves the model as it was.

use crate::config::{EditorConfig, LinkConfig, NodeConfig, PointConfig};
use crate::error::{DiagramError, DiagramResult};
use crate::model::{
    DiagramModel, Entity, EntityId, EntityKind, LinkModel, NodeModel, PointModel, PortModel,
    make_uid,
};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Next state for the collections touched by one update.
///
/// Applying a patch is `{...current, ...patch}`: each present collection
/// replaces the current one wholesale, absent collections are kept.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelPatch {
    pub nodes: Option<HashMap<EntityId, NodeModel>>,
    pub ports: Option<HashMap<EntityId, PortModel>>,
    pub links: Option<HashMap<EntityId, LinkModel>>,
    pub points: Option<HashMap<EntityId, PointModel>>,
}

impl ModelPatch {
    /// Merge the patch over `current`, producing the next model.
    pub fn apply(self, current: &DiagramModel) -> DiagramModel {
        DiagramModel {
            nodes: self.nodes.unwrap_or_else(|| current.nodes.clone()),
            ports: self.ports.unwrap_or_else(|| current.ports.clone()),
            links: self.links.unwrap_or_else(|| current.links.clone()),
            points: self.points.unwrap_or_else(|| current.points.clone()),
        }
    }

    /// Collections this patch replaces.
    pub fn touched(&self) -> Vec<EntityKind> {
        let mut kinds = Vec::new();
        if self.nodes.is_some() {
            kinds.push(EntityKind::Nodes);
        }
        if self.ports.is_some() {
            kinds.push(EntityKind::Ports);
        }
        if self.links.is_some() {
            kinds.push(EntityKind::Links);
        }
        if self.points.is_some() {
            kinds.push(EntityKind::Points);
        }
        kinds
    }
}

/// Tracks ids claimed by a single structural edit.
struct IdClaims<'a> {
    model: &'a DiagramModel,
    claimed: HashSet<EntityId>,
}

impl<'a> IdClaims<'a> {
    fn new(model: &'a DiagramModel) -> Self {
        Self {
            model,
            claimed: HashSet::new(),
        }
    }

    /// Take the requested id, or a fresh one.
    fn claim(&mut self, kind: EntityKind, requested: Option<EntityId>) -> DiagramResult<EntityId> {
        let id = requested.unwrap_or_else(make_uid);
        if self.model.contains_id(id) {
            return Err(DiagramError::integrity(kind, id, "id is already in use"));
        }
        if !self.claimed.insert(id) {
            return Err(DiagramError::integrity(kind, id, "id is requested twice"));
        }
        Ok(id)
    }
}

/// Build the patch for a new node and its ports.
///
/// Ports come from `partial.ports` when present, otherwise one default port
/// per configured slot. Returns the new node id alongside the patch.
pub fn plan_add_node(
    model: &DiagramModel,
    config: &EditorConfig,
    partial: NodeConfig,
) -> DiagramResult<(EntityId, ModelPatch)> {
    partial.validate()?;

    let mut ids = IdClaims::new(model);
    let node_id = ids.claim(EntityKind::Nodes, partial.id)?;

    let slots = partial.ports.unwrap_or_else(|| {
        config
            .default_port_slots
            .iter()
            .map(|slot| (slot.clone(), Default::default()))
            .collect()
    });

    let mut node_ports = BTreeMap::new();
    let mut ports = model.ports.clone();
    for (slot, port) in slots {
        let port_id = ids.claim(EntityKind::Ports, port.id)?;
        ports.insert(
            port_id,
            PortModel {
                id: port_id,
                entity_type: port
                    .entity_type
                    .unwrap_or_else(|| config.default_type.clone()),
                parent_id: node_id,
                position: slot.clone(),
            },
        );
        node_ports.insert(slot, port_id);
    }

    let node = NodeModel {
        id: node_id,
        entity_type: partial
            .entity_type
            .unwrap_or_else(|| config.default_type.clone()),
        ports: node_ports,
        x: partial.x.unwrap_or(0.0),
        y: partial.y.unwrap_or(0.0),
    };

    let mut nodes = model.nodes.clone();
    nodes.insert(node_id, node);

    Ok((
        node_id,
        ModelPatch {
            nodes: Some(nodes),
            ports: Some(ports),
            ..ModelPatch::default()
        },
    ))
}

/// Build the patch for a new link and its points.
///
/// The link's `points` list keeps the order of the resolved input.
pub fn plan_add_link(
    model: &DiagramModel,
    config: &EditorConfig,
    partial: LinkConfig,
) -> DiagramResult<(EntityId, ModelPatch)> {
    partial.validate()?;

    let mut ids = IdClaims::new(model);
    let link_id = ids.claim(EntityKind::Links, partial.id)?;

    let path = partial.points.unwrap_or_else(|| {
        config
            .default_link_points
            .iter()
            .map(|p| PointConfig::at(p.x, p.y))
            .collect()
    });

    let mut order = Vec::with_capacity(path.len());
    let mut points = model.points.clone();
    for point in path {
        let point_id = ids.claim(EntityKind::Points, point.id)?;
        points.insert(
            point_id,
            PointModel {
                id: point_id,
                entity_type: point
                    .entity_type
                    .unwrap_or_else(|| config.default_type.clone()),
                parent_id: link_id,
                x: point.x.unwrap_or(0.0),
                y: point.y.unwrap_or(0.0),
            },
        );
        order.push(point_id);
    }

    let link = LinkModel {
        id: link_id,
        entity_type: partial
            .entity_type
            .unwrap_or_else(|| config.default_type.clone()),
        points: order,
    };

    let mut links = model.links.clone();
    links.insert(link_id, link);

    Ok((
        link_id,
        ModelPatch {
            links: Some(links),
            points: Some(points),
            ..ModelPatch::default()
        },
    ))
}

/// Build the patch replacing one full record in its collection.
pub fn plan_change_entity(model: &DiagramModel, entity: Entity) -> ModelPatch {
    plan_change_entities(model, std::iter::once(entity))
}

/// Build one patch replacing several full records.
///
/// Later records win when two share an id.
pub fn plan_change_entities(
    model: &DiagramModel,
    entities: impl IntoIterator<Item = Entity>,
) -> ModelPatch {
    let mut patch = ModelPatch::default();
    for entity in entities {
        match entity {
            Entity::Node(node) => {
                patch
                    .nodes
                    .get_or_insert_with(|| model.nodes.clone())
                    .insert(node.id, node);
            }
            Entity::Port(port) => {
                patch
                    .ports
                    .get_or_insert_with(|| model.ports.clone())
                    .insert(port.id, port);
            }
            Entity::Link(link) => {
                patch
                    .links
                    .get_or_insert_with(|| model.links.clone())
                    .insert(link.id, link);
            }
            Entity::Point(point) => {
                patch
                    .points
                    .get_or_insert_with(|| model.points.clone())
                    .insert(point.id, point);
            }
        }
    }
    patch
}

/// Apply a batch of full records, checking them before and after the merge.
///
/// Every record must fit the current model, and must still fit the merged
/// model, so records in one batch cannot invalidate each other. Returns the
/// merged model.
pub fn apply_checked_changes(
    model: &DiagramModel,
    entities: Vec<Entity>,
) -> DiagramResult<DiagramModel> {
    for entity in &entities {
        check_entity(model, entity)?;
    }
    let next = plan_change_entities(model, entities.iter().cloned()).apply(model);
    for entity in &entities {
        check_entity(&next, entity)?;
    }
    Ok(next)
}

/// Check that a record's references resolve in `model`, that ownership
/// stays consistent in both directions, and that its id is not used by an
/// entity of another kind.
pub fn check_entity(model: &DiagramModel, entity: &Entity) -> DiagramResult<()> {
    let id = entity.id();
    let kind = entity.kind();

    for other in [
        EntityKind::Nodes,
        EntityKind::Ports,
        EntityKind::Links,
        EntityKind::Points,
    ] {
        if other != kind && model.entity(other, id).is_some() {
            return Err(DiagramError::integrity(
                kind,
                id,
                format!("id is already used by a {other}"),
            ));
        }
    }

    match entity {
        Entity::Node(node) => {
            for (slot, port_id) in &node.ports {
                match model.ports.get(port_id) {
                    Some(port) if port.parent_id == node.id && port.position == *slot => {}
                    Some(port) if port.parent_id == node.id => {
                        return Err(DiagramError::integrity(
                            kind,
                            id,
                            format!(
                                "slot '{slot}' points at port {port_id} registered under '{}'",
                                port.position
                            ),
                        ));
                    }
                    Some(_) => {
                        return Err(DiagramError::integrity(
                            kind,
                            id,
                            format!("slot '{slot}' points at port {port_id} owned by another node"),
                        ));
                    }
                    None => {
                        return Err(DiagramError::integrity(
                            kind,
                            id,
                            format!("slot '{slot}' references missing port {port_id}"),
                        ));
                    }
                }
            }
        }
        Entity::Port(port) => {
            if !model.nodes.contains_key(&port.parent_id) {
                return Err(DiagramError::integrity(
                    kind,
                    id,
                    format!("parent node {} does not exist", port.parent_id),
                ));
            }
            // A node listing the port, before or after the change, must be its
            // parent and list it under its own slot.
            let previous = model.ports.get(&port.id).map(|p| p.parent_id);
            for owner_id in previous.into_iter().chain([port.parent_id]) {
                let Some(owner) = model.nodes.get(&owner_id) else {
                    continue;
                };
                for (slot, listed) in &owner.ports {
                    if *listed != port.id {
                        continue;
                    }
                    if owner.id != port.parent_id {
                        return Err(DiagramError::integrity(
                            kind,
                            id,
                            format!("still listed by node {} under slot '{slot}'", owner.id),
                        ));
                    }
                    if *slot != port.position {
                        return Err(DiagramError::integrity(
                            kind,
                            id,
                            format!(
                                "position '{}' differs from slot '{slot}' listing it",
                                port.position
                            ),
                        ));
                    }
                }
            }
        }
        Entity::Link(link) => {
            for point_id in &link.points {
                match model.points.get(point_id) {
                    Some(point) if point.parent_id == link.id => {}
                    Some(_) => {
                        return Err(DiagramError::integrity(
                            kind,
                            id,
                            format!("point {point_id} is owned by another link"),
                        ));
                    }
                    None => {
                        return Err(DiagramError::integrity(
                            kind,
                            id,
                            format!("references missing point {point_id}"),
                        ));
                    }
                }
            }
        }
        Entity::Point(point) => {
            if !model.links.contains_key(&point.parent_id) {
                return Err(DiagramError::integrity(
                    kind,
                    id,
                    format!("parent link {} does not exist", point.parent_id),
                ));
            }
            let previous = model.points.get(&point.id).map(|p| p.parent_id);
            for owner_id in previous.into_iter().chain([point.parent_id]) {
                if let Some(owner) = model.links.get(&owner_id) {
                    if owner.id != point.parent_id && owner.points.contains(&point.id) {
                        return Err(DiagramError::integrity(
                            kind,
                            id,
                            format!("still listed by link {}", owner.id),
                        ));
                    }
                }
            }
        }
    }
    Ok(())
}

/// Check every referential invariant of a whole model.
///
/// Record keys must match record ids, every reference must resolve, and
/// no id may appear in two collections.
pub fn validate(model: &DiagramModel) -> DiagramResult<()> {
    let mut seen = HashSet::new();

    macro_rules! check_keys {
        ($collection:expr, $kind:expr) => {
            for (key, record) in &$collection {
                if *key != record.id {
                    return Err(DiagramError::integrity(
                        $kind,
                        *key,
                        format!("stored under key {key} but has id {}", record.id),
                    ));
                }
                if !seen.insert(*key) {
                    return Err(DiagramError::integrity(
                        $kind,
                        *key,
                        "id appears in more than one collection",
                    ));
                }
            }
        };
    }

    check_keys!(model.nodes, EntityKind::Nodes);
    check_keys!(model.ports, EntityKind::Ports);
    check_keys!(model.links, EntityKind::Links);
    check_keys!(model.points, EntityKind::Points);

    for node in model.nodes.values() {
        check_entity(model, &Entity::Node(node.clone()))?;
    }
    for port in model.ports.values() {
        check_entity(model, &Entity::Port(port.clone()))?;
    }
    for link in model.links.values() {
        check_entity(model, &Entity::Link(link.clone()))?;
    }
    for point in model.points.values() {
        check_entity(model, &Entity::Point(point.clone()))?;
    }
    Ok(())
}
