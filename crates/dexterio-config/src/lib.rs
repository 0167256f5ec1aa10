//! dexterio-config
//!
//! Loading and validation for everything that shapes a run before the first
//! bar is processed: the declarative playbook catalog, the run configuration,
//! a content hash for reproducibility, and the repo-root resolver.

pub mod hash;
pub mod playbook;
pub mod repo_root;
pub mod run_config;

pub use hash::{hash_config, load_layered_yaml, LoadedConfig};
pub use playbook::{BypassTable, MinuteWindow, Playbook, PlaybookCatalog, ScoringWeights};
pub use repo_root::resolve_repo_root;
pub use run_config::RunConfig;
