use std::path::PathBuf;

use codeswarm_core::entity_id;
use codeswarm_types::NodeType;

/// One code entity found in the source tree.
#[derive(Debug, Clone)]
pub struct SourceEntity {
    /// Content-addressed id, stable across restarts (see [`entity_id`])
    pub entity_id: String,
    pub node_type: NodeType,
    pub name: String,
    pub full_name: String,
    /// Project-relative forward-slash path
    pub file_path: String,
    pub start_line: u32,
    pub end_line: u32,
}

impl SourceEntity {
    /// Build an entity, deriving its id from (file_path, node_type,
    /// full_name).
    pub fn with_hashed_id(
        node_type: NodeType,
        name: impl Into<String>,
        full_name: impl Into<String>,
        file_path: impl Into<String>,
        start_line: u32,
        end_line: u32,
    ) -> Self {
        let name = name.into();
        let full_name = full_name.into();
        let file_path = file_path.into();
        Self {
            entity_id: entity_id(&file_path, node_type, &full_name),
            node_type,
            name,
            full_name,
            file_path,
            start_line,
            end_line,
        }
    }
}

/// Source discovery seam. The production implementation parses the tree
/// with a CST parser; the runtime only cares about the entity list and the
/// stability of the ids.
pub trait SourceDiscovery: Send + Sync {
    fn discover(
        &self,
        roots: &[PathBuf],
        languages: Option<&[String]>,
    ) -> anyhow::Result<Vec<SourceEntity>>;
}
