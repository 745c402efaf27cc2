//! Normalized diagram records.
//!
//! Every entity lives in a flat `id -> record` collection. Relationships are
//! expressed by id only, so any single record can be replaced without
//! touching the records around it.

use kurbo::Point;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use uuid::Uuid;

/// Identifier shared by all entity kinds.
pub type EntityId = Uuid;

/// Type tag used when a record does not name one.
pub const DEFAULT_TYPE: &str = "default";

/// Generate a new process-unique identifier.
pub fn make_uid() -> EntityId {
    Uuid::new_v4()
}

fn default_type() -> String {
    DEFAULT_TYPE.to_string()
}

/// The four entity collections of a diagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Nodes,
    Ports,
    Links,
    Points,
}

impl EntityKind {
    /// Singular name, used in messages.
    pub fn name(self) -> &'static str {
        match self {
            EntityKind::Nodes => "node",
            EntityKind::Ports => "port",
            EntityKind::Links => "link",
            EntityKind::Points => "point",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A node and the ports it owns, keyed by slot name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeModel {
    pub id: EntityId,
    #[serde(rename = "type", default = "default_type")]
    pub entity_type: String,
    /// Slot name -> port id. Fixed at creation.
    #[serde(default)]
    pub ports: BTreeMap<String, EntityId>,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
}

/// A port registered under a slot of its parent node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortModel {
    pub id: EntityId,
    #[serde(rename = "type", default = "default_type")]
    pub entity_type: String,
    #[serde(rename = "parentID")]
    pub parent_id: EntityId,
    /// Slot name this port was registered under.
    pub position: String,
}

/// A link, as an ordered path of points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkModel {
    pub id: EntityId,
    #[serde(rename = "type", default = "default_type")]
    pub entity_type: String,
    #[serde(default)]
    pub points: Vec<EntityId>,
}

/// An anchor point of a link, in local diagram coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointModel {
    pub id: EntityId,
    #[serde(rename = "type", default = "default_type")]
    pub entity_type: String,
    #[serde(rename = "parentID")]
    pub parent_id: EntityId,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
}

impl NodeModel {
    /// Node position in local coordinates.
    pub fn location(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

impl PointModel {
    /// Point position in local coordinates.
    pub fn location(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// A single full record of any kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Entity {
    Node(NodeModel),
    Port(PortModel),
    Link(LinkModel),
    Point(PointModel),
}

impl Entity {
    pub fn id(&self) -> EntityId {
        match self {
            Entity::Node(node) => node.id,
            Entity::Port(port) => port.id,
            Entity::Link(link) => link.id,
            Entity::Point(point) => point.id,
        }
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            Entity::Node(_) => EntityKind::Nodes,
            Entity::Port(_) => EntityKind::Ports,
            Entity::Link(_) => EntityKind::Links,
            Entity::Point(_) => EntityKind::Points,
        }
    }
}

impl From<NodeModel> for Entity {
    fn from(node: NodeModel) -> Self {
        Entity::Node(node)
    }
}

impl From<PortModel> for Entity {
    fn from(port: PortModel) -> Self {
        Entity::Port(port)
    }
}

impl From<LinkModel> for Entity {
    fn from(link: LinkModel) -> Self {
        Entity::Link(link)
    }
}

impl From<PointModel> for Entity {
    fn from(point: PointModel) -> Self {
        Entity::Point(point)
    }
}

/// The complete diagram state exchanged with the host.
///
/// All four collections are always present; missing keys deserialize as
/// empty collections.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagramModel {
    pub nodes: HashMap<EntityId, NodeModel>,
    pub ports: HashMap<EntityId, PortModel>,
    pub links: HashMap<EntityId, LinkModel>,
    pub points: HashMap<EntityId, PointModel>,
}

impl DiagramModel {
    /// Create an empty diagram.
    pub fn new() -> Self {
        Self::default()
    }

    /// Check whether `id` is used by an entity of any kind.
    pub fn contains_id(&self, id: EntityId) -> bool {
        self.nodes.contains_key(&id)
            || self.ports.contains_key(&id)
            || self.links.contains_key(&id)
            || self.points.contains_key(&id)
    }

    /// Look up a record of any kind by id.
    pub fn entity(&self, kind: EntityKind, id: EntityId) -> Option<Entity> {
        match kind {
            EntityKind::Nodes => self.nodes.get(&id).cloned().map(Entity::Node),
            EntityKind::Ports => self.ports.get(&id).cloned().map(Entity::Port),
            EntityKind::Links => self.links.get(&id).cloned().map(Entity::Link),
            EntityKind::Points => self.points.get(&id).cloned().map(Entity::Point),
        }
    }

    /// Insert or replace a full record in its collection.
    pub fn upsert(&mut self, entity: Entity) {
        match entity {
            Entity::Node(node) => {
                self.nodes.insert(node.id, node);
            }
            Entity::Port(port) => {
                self.ports.insert(port.id, port);
            }
            Entity::Link(link) => {
                self.links.insert(link.id, link);
            }
            Entity::Point(point) => {
                self.points.insert(point.id, point);
            }
        }
    }

    /// Resolve a node's slots to port records.
    pub fn node_ports<'a>(
        &'a self,
        node: &'a NodeModel,
    ) -> impl Iterator<Item = (&'a str, Option<&'a PortModel>)> + 'a {
        node.ports
            .iter()
            .map(|(slot, id)| (slot.as_str(), self.ports.get(id)))
    }

    /// Resolve a link's path to point records, in path order.
    pub fn link_points<'a>(&'a self, link: &'a LinkModel) -> Vec<&'a PointModel> {
        link.points
            .iter()
            .filter_map(|id| self.points.get(id))
            .collect()
    }

    /// Total number of records across all collections.
    pub fn len(&self) -> usize {
        self.nodes.len() + self.ports.len() + self.links.len() + self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Serialize the diagram to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize a diagram from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
