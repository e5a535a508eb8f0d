pub mod loader;
pub mod model;

pub use loader::{ConfigLoader, ENV_API_KEYS, apply_env_overrides};
pub use model::{AppConfig, ProviderSettings};
