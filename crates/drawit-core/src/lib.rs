//! DrawIt Core Library
//!
//! Normalized diagram model, snap targets and drag interaction for node/link
//! diagram editors. The core holds no UI state: hosts own the model, supply
//! bounding boxes and pointer events, and receive every next model through a
//! [`ChangeSink`].

pub mod config;
pub mod diagram;
pub mod drag;
pub mod error;
pub mod input;
pub mod layers;
pub mod model;
pub mod snap;
pub mod store;

pub use config::{EditorConfig, LinkConfig, NodeConfig, PointConfig, PortConfig};
pub use diagram::{ChangeSink, Diagram};
pub use drag::{DragController, DragEvent, DragOptions, DragState, Draggable};
pub use error::{DiagramError, DiagramResult};
pub use input::{MouseButton, PointerEvent};
pub use layers::{DragLayer, EntityRenderer, LayerLinks, LayerNodes, RendererTable};
pub use model::{
    DEFAULT_TYPE, DiagramModel, Entity, EntityId, EntityKind, LinkModel, NodeModel, PointModel,
    PortModel, make_uid,
};
pub use snap::{BoundingBoxProvider, SnapMatch, SnapTarget, SnapTargetRegistry};
pub use store::ModelPatch;
