//! Plain-text renderers used by the headless host.

use drawit_core::{DiagramModel, EntityRenderer, LinkModel, NodeModel};

/// Renders any node or link of one type as a single line of text.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRenderer {
    entity_type: String,
}

impl TextRenderer {
    pub fn new(entity_type: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
        }
    }

    /// One renderer per type tag.
    pub fn for_types<S: AsRef<str>>(types: &[S]) -> Vec<Self> {
        types.iter().map(|t| Self::new(t.as_ref())).collect()
    }
}

impl EntityRenderer<NodeModel> for TextRenderer {
    type Output = String;

    fn entity_type(&self) -> &str {
        &self.entity_type
    }

    fn render(&self, node: &NodeModel, value: &DiagramModel) -> String {
        let slots: Vec<&str> = value
            .node_ports(node)
            .map(|(slot, port)| if port.is_some() { slot } else { "?" })
            .collect();
        format!(
            "node {} [{}] at ({}, {}) ports [{}]",
            node.id,
            node.entity_type,
            node.x,
            node.y,
            slots.join(", ")
        )
    }
}

impl EntityRenderer<LinkModel> for TextRenderer {
    type Output = String;

    fn entity_type(&self) -> &str {
        &self.entity_type
    }

    fn render(&self, link: &LinkModel, value: &DiagramModel) -> String {
        let path: Vec<String> = value
            .link_points(link)
            .iter()
            .map(|p| format!("({}, {})", p.x, p.y))
            .collect();
        format!("link {} [{}] {}", link.id, link.entity_type, path.join(" -> "))
    }
}
