use super::schema::{Config, InputConfig};
use crate::error::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_PATH: &str = "./.config/oapi-go-gen.yaml";

/// Load configuration from file or return default
pub fn load_config(custom_path: Option<&Path>) -> Result<Config> {
    let config_path = match custom_path {
        Some(path) => path.to_path_buf(),
        None => PathBuf::from(DEFAULT_CONFIG_PATH),
    };

    if config_path.exists() {
        let content = fs::read_to_string(&config_path)?;
        let config: Config = serde_yaml::from_str(&content).map_err(|e| {
            Error::config(format!(
                "Failed to parse config file {}: {e}",
                config_path.display()
            ))
        })?;
        tracing::debug!(path = %config_path.display(), "loaded configuration");
        Ok(config)
    } else if custom_path.is_some() {
        // Custom path specified but doesn't exist - error
        Err(Error::config(format!(
            "Config file not found: {}",
            config_path.display()
        )))
    } else {
        // Default path doesn't exist - use built-in defaults
        Ok(Config::default())
    }
}

/// Overrides taken from the command line
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    pub spec: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub package: Option<String>,
    pub strict: bool,
}

/// Merge config with CLI arguments (CLI takes precedence)
pub fn merge_with_cli_args(mut config: Config, cli: CliOverrides) -> Config {
    // An input path on the command line replaces whatever input the file named
    if let Some(spec_path) = cli.spec {
        let format = config.input.as_ref().and_then(|i| i.format.clone());
        config.input = Some(InputConfig {
            format,
            source: Some(spec_path),
            document: None,
        });
    }

    if let Some(output_path) = cli.output {
        config.output = Some(output_path);
    }

    if let Some(package) = cli.package {
        config.generation.package = package;
    }

    if cli.strict {
        config.generation.strict = true;
    }

    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_from_explicit_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "package: store\ninput:\n  source: api.yaml\nstrict: true").unwrap();

        let config = load_config(Some(file.path())).unwrap();
        assert_eq!(config.generation.package, "store");
        assert!(config.generation.strict);
        assert_eq!(
            config.input.unwrap().source,
            Some(PathBuf::from("api.yaml"))
        );
    }

    #[test]
    fn missing_explicit_path_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(Some(&dir.path().join("nope.yaml"))).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn malformed_file_is_a_config_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "package: [unterminated").unwrap();
        assert!(matches!(
            load_config(Some(file.path())),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn cli_overrides_win() {
        let mut config = Config::default();
        config.input = Some(InputConfig {
            format: Some("swagger".into()),
            source: None,
            document: Some(serde_yaml::Value::Null),
        });

        let merged = merge_with_cli_args(
            config,
            CliOverrides {
                spec: Some(PathBuf::from("cli.yaml")),
                output: Some(PathBuf::from("out")),
                package: Some("cli".into()),
                strict: true,
            },
        );

        let input = merged.input.unwrap();
        assert_eq!(input.source, Some(PathBuf::from("cli.yaml")));
        assert!(input.document.is_none());
        assert_eq!(input.format.as_deref(), Some("swagger"));
        assert_eq!(merged.output, Some(PathBuf::from("out")));
        assert_eq!(merged.generation.package, "cli");
        assert!(merged.generation.strict);
    }
}
