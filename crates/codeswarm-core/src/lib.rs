mod identity;
mod ignore;
mod layout;
mod path;

pub use identity::{entity_id, shard_prefix};
pub use ignore::{DEFAULT_IGNORE_PATTERNS, IgnoreFilter};
pub use layout::SwarmLayout;
pub use path::{Error, PathResolver, Result, normalize_path, to_project_relative};
