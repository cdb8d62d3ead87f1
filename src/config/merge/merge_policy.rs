//! Merge rules: built-in defaults and source precedence.

use config::builder::DefaultState;
use config::Config;
use config::ConfigBuilder;
use config::ConfigError;

/// Extensions tracked by `init` when neither configuration nor the CLI name any.
pub const DEFAULT_EXTENSIONS: &[&str] = &[".exe", ".map", ".fr3", ".dll", ".xsd", ".wav", ".jpg"];

/// Create a Config builder with merge policy defaults applied.
///
/// Sources added afterwards override these in the order they are added.
pub fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let extensions: Vec<String> = DEFAULT_EXTENSIONS.iter().map(|ext| ext.to_string()).collect();

    Config::builder()
        .set_default("tracking.extensions", extensions)?
        .set_default("tracking.ignored", Vec::<String>::new())?
        .set_default("server.bind", "127.0.0.1:8080")?
        .set_default("server.root", ".")?
        .set_default("client.connect_timeout_secs", 10)?
        .set_default("client.request_timeout_secs", 300)
}
