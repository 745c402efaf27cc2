//! Editor settings and typed inputs for structural edits.

use crate::error::{DiagramError, DiagramResult};
use crate::model::{DEFAULT_TYPE, EntityId};
use kurbo::Point;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Settings shared by the controller and the layers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Type tag given to entities that do not name one.
    pub default_type: String,
    /// Slots created for a node when the caller supplies no ports.
    pub default_port_slots: Vec<String>,
    /// Path used for a link when the caller supplies no points.
    pub default_link_points: Vec<Point>,
    /// Snap target types a dragged node is pulled towards.
    pub node_snap_types: Vec<String>,
    /// Snap target types a dragged link point is pulled towards.
    pub point_snap_types: Vec<String>,
    /// Check references of records passed to the change entry points.
    pub validate_changes: bool,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            default_type: DEFAULT_TYPE.to_string(),
            default_port_slots: vec!["left".to_string(), "right".to_string()],
            default_link_points: vec![Point::new(0.0, 0.0), Point::new(100.0, 100.0)],
            node_snap_types: Vec::new(),
            point_snap_types: vec!["port".to_string()],
            validate_changes: true,
        }
    }
}

impl EditorConfig {
    /// Parse settings from JSON; absent fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Check the defaults are usable for structural edits.
    pub fn validate(&self) -> DiagramResult<()> {
        check_type("editor config", Some(&self.default_type))?;
        for slot in &self.default_port_slots {
            check_slot(slot)?;
        }
        if self.default_link_points.is_empty() {
            return Err(DiagramError::validation(
                "editor config",
                "default link needs at least one point",
            ));
        }
        for point in &self.default_link_points {
            check_coordinate("editor config", "x", Some(point.x))?;
            check_coordinate("editor config", "y", Some(point.y))?;
        }
        Ok(())
    }
}

/// Caller overrides for a new port.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PortConfig {
    pub id: Option<EntityId>,
    #[serde(rename = "type")]
    pub entity_type: Option<String>,
}

/// Caller overrides for a new node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NodeConfig {
    pub id: Option<EntityId>,
    #[serde(rename = "type")]
    pub entity_type: Option<String>,
    pub x: Option<f64>,
    pub y: Option<f64>,
    /// Replaces the default slots entirely when present.
    pub ports: Option<BTreeMap<String, PortConfig>>,
}

/// Caller overrides for a new link point.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PointConfig {
    pub id: Option<EntityId>,
    #[serde(rename = "type")]
    pub entity_type: Option<String>,
    pub x: Option<f64>,
    pub y: Option<f64>,
}

/// Caller overrides for a new link.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LinkConfig {
    pub id: Option<EntityId>,
    #[serde(rename = "type")]
    pub entity_type: Option<String>,
    /// Replaces the default path entirely when present.
    pub points: Option<Vec<PointConfig>>,
}

impl PortConfig {
    pub fn with_type(entity_type: impl Into<String>) -> Self {
        Self {
            entity_type: Some(entity_type.into()),
            ..Self::default()
        }
    }
}

impl NodeConfig {
    /// Node with the given slots, each using default port settings.
    pub fn with_slots<I, S>(slots: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ports: Some(
                slots
                    .into_iter()
                    .map(|slot| (slot.into(), PortConfig::default()))
                    .collect(),
            ),
            ..Self::default()
        }
    }

    pub(crate) fn validate(&self) -> DiagramResult<()> {
        check_type("node", self.entity_type.as_ref())?;
        check_coordinate("node", "x", self.x)?;
        check_coordinate("node", "y", self.y)?;
        if let Some(ports) = &self.ports {
            for (slot, port) in ports {
                check_slot(slot)?;
                check_type("port", port.entity_type.as_ref())?;
            }
        }
        Ok(())
    }
}

impl PointConfig {
    pub fn at(x: f64, y: f64) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            ..Self::default()
        }
    }

    pub(crate) fn validate(&self) -> DiagramResult<()> {
        check_type("point", self.entity_type.as_ref())?;
        check_coordinate("point", "x", self.x)?;
        check_coordinate("point", "y", self.y)
    }
}

impl LinkConfig {
    /// Link through the given local coordinates, in order.
    pub fn through(points: impl IntoIterator<Item = Point>) -> Self {
        Self {
            points: Some(points.into_iter().map(|p| PointConfig::at(p.x, p.y)).collect()),
            ..Self::default()
        }
    }

    pub(crate) fn validate(&self) -> DiagramResult<()> {
        check_type("link", self.entity_type.as_ref())?;
        if let Some(points) = &self.points {
            if points.is_empty() {
                return Err(DiagramError::validation("link", "points must not be empty"));
            }
            for point in points {
                point.validate()?;
            }
        }
        Ok(())
    }
}

fn check_type(subject: &'static str, entity_type: Option<&String>) -> DiagramResult<()> {
    match entity_type {
        Some(t) if t.trim().is_empty() => {
            Err(DiagramError::validation(subject, "type must not be empty"))
        }
        _ => Ok(()),
    }
}

fn check_slot(slot: &str) -> DiagramResult<()> {
    if slot.trim().is_empty() {
        return Err(DiagramError::validation("node", "slot names must not be empty"));
    }
    Ok(())
}

fn check_coordinate(subject: &'static str, axis: &str, value: Option<f64>) -> DiagramResult<()> {
    match value {
        Some(v) if !v.is_finite() => Err(DiagramError::validation(
            subject,
            format!("{axis} must be finite, got {v}"),
        )),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EditorConfig::default();
        assert_eq!(config.default_port_slots, vec!["left", "right"]);
        assert_eq!(
            config.default_link_points,
            vec![Point::new(0.0, 0.0), Point::new(100.0, 100.0)]
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_from_partial_json() {
        let config = EditorConfig::from_json(r#"{"default_port_slots": ["top"]}"#).unwrap();
        assert_eq!(config.default_port_slots, vec!["top"]);
        assert_eq!(config.default_type, DEFAULT_TYPE);
        assert!(config.validate_changes);
    }

    #[test]
    fn test_config_rejects_empty_default_link() {
        let config = EditorConfig {
            default_link_points: Vec::new(),
            ..EditorConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(DiagramError::Validation { .. })
        ));
    }

    #[test]
    fn test_node_config_rejects_empty_slot() {
        let config = NodeConfig::with_slots([""]);
        assert!(matches!(
            config.validate(),
            Err(DiagramError::Validation { subject: "node", .. })
        ));
    }

    #[test]
    fn test_node_config_rejects_blank_type() {
        let config = NodeConfig {
            entity_type: Some("  ".to_string()),
            ..NodeConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_point_config_rejects_nan() {
        let config = PointConfig::at(f64::NAN, 0.0);
        assert!(matches!(
            config.validate(),
            Err(DiagramError::Validation { subject: "point", .. })
        ));
    }

    #[test]
    fn test_link_config_rejects_empty_path() {
        let config = LinkConfig {
            points: Some(Vec::new()),
            ..LinkConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let result: Result<NodeConfig, _> = serde_json::from_str(r#"{"colour": "red"}"#);
        assert!(result.is_err());
    }
}
