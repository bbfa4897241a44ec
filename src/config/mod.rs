pub mod loader;
pub mod schema;

pub use loader::{load_config, merge_with_cli_args, CliOverrides, DEFAULT_CONFIG_PATH};
pub use schema::{
    Config, GenerateToggles, GenerationConfig, InputConfig, NonStringEnumPolicy, SecurityConfig,
    SplitConfig,
};
