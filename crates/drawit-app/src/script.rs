//! JSON session scripts.
//!
//! A script optionally carries editor settings and a starting model, then a
//! list of actions replayed in order against a [`Session`](crate::Session).
//!
//! ```json
//! {
//!   "actions": [
//!     { "action": "addNode", "name": "a", "node": { "x": 10, "y": 10 } },
//!     { "action": "addLink", "name": "l" },
//!     { "action": "registerSnapTarget", "target": "a/left", "kind": "port", "strength": 2 },
//!     { "action": "setBox", "target": "a/left", "rect": { "x0": 0, "y0": 0, "x1": 10, "y1": 10 } },
//!     { "action": "pointer", "layer": "links", "hit": "l/1",
//!       "event": { "Down": { "position": { "x": 100, "y": 100 }, "button": "Left" } } }
//!   ]
//! }
//! ```

use crate::error::{AppError, AppResult};
use drawit_core::{DiagramModel, EditorConfig, LinkConfig, NodeConfig, PointerEvent};
use kurbo::{Rect, Vec2};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Which layer a pointer event or offset applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerKind {
    Nodes,
    Links,
}

/// Type tags the host has renderers for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererTypes {
    pub nodes: Vec<String>,
    pub links: Vec<String>,
}

impl Default for RendererTypes {
    fn default() -> Self {
        Self {
            nodes: vec![drawit_core::DEFAULT_TYPE.to_string()],
            links: vec![drawit_core::DEFAULT_TYPE.to_string()],
        }
    }
}

/// One step of a session.
///
/// Entity references are either a raw id, a name bound by `addNode`/`addLink`,
/// `name/slot` for a node's port, or `name/index` for a link's point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Action {
    AddNode {
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        node: NodeConfig,
    },
    AddLink {
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        link: LinkConfig,
    },
    RegisterSnapTarget {
        target: String,
        kind: String,
        #[serde(default = "default_strength")]
        strength: f64,
    },
    UnregisterSnapTarget {
        target: String,
    },
    /// Page-space bounding box of a mounted entity.
    SetBox {
        target: String,
        rect: Rect,
    },
    SetOffset {
        layer: LayerKind,
        offset: Vec2,
    },
    Pointer {
        layer: LayerKind,
        #[serde(default)]
        hit: Option<String>,
        event: PointerEvent,
    },
}

fn default_strength() -> f64 {
    1.0
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Script {
    pub config: Option<EditorConfig>,
    pub model: Option<DiagramModel>,
    pub renderers: RendererTypes,
    pub actions: Vec<Action>,
}

impl Script {
    pub fn from_json(json: &str) -> AppResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> AppResult<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| AppError::io(path, e))?;
        Self::from_json(&json)
    }
}

/// Read editor settings from a JSON file.
pub fn load_config(path: &Path) -> AppResult<EditorConfig> {
    let json = std::fs::read_to_string(path).map_err(|e| AppError::io(path, e))?;
    let config = EditorConfig::from_json(&json)?;
    config.validate()?;
    Ok(config)
}
