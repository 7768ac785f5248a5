pub mod loader;
pub mod schema;

pub use loader::{find_config_path, load_config, resolve_dir, save_config};
pub use schema::{AgentDefaults, Backend, Config, ProviderConfig, TraceConfig};
