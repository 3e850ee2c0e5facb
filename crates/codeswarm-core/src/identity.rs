use codeswarm_types::NodeType;
use sha2::{Digest, Sha256};

/// Stable content-addressed id for a source entity.
///
/// Hashing (file_path, node_type, qualified_name) keeps the id identical
/// across restarts and across line-number drift; only moving or renaming the
/// entity changes it.
pub fn entity_id(file_path: &str, node_type: NodeType, qualified_name: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(file_path.as_bytes());
    hasher.update([0u8]);
    hasher.update(node_type.as_str().as_bytes());
    hasher.update([0u8]);
    hasher.update(qualified_name.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// First two characters of an agent id, the state-directory shard key.
pub fn shard_prefix(agent_id: &str) -> &str {
    if agent_id.len() >= 2 {
        &agent_id[..2]
    } else {
        agent_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_id_is_stable() {
        let a = entity_id("src/lexer.py", NodeType::Function, "lexer.parse");
        let b = entity_id("src/lexer.py", NodeType::Function, "lexer.parse");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_entity_id_distinguishes_all_parts() {
        let base = entity_id("src/lexer.py", NodeType::Function, "lexer.parse");
        assert_ne!(
            base,
            entity_id("src/parser.py", NodeType::Function, "lexer.parse")
        );
        assert_ne!(
            base,
            entity_id("src/lexer.py", NodeType::Method, "lexer.parse")
        );
        assert_ne!(
            base,
            entity_id("src/lexer.py", NodeType::Function, "lexer.scan")
        );
    }

    #[test]
    fn test_shard_prefix() {
        assert_eq!(shard_prefix("ab12cd"), "ab");
        assert_eq!(shard_prefix("a"), "a");
    }
}
