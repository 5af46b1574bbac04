use serde::Deserialize;
use std::env;
use std::path::PathBuf;

fn parse_env_or<T: std::str::FromStr>(var: &str, default: T) -> T
where
    T::Err: std::fmt::Display,
{
    match env::var(var) {
        Ok(val) => match val.parse() {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!("Invalid value '{}' for {}: {}. Using default.", val, var, e);
                default
            }
        },
        Err(_) => default,
    }
}

fn parse_env_opt<T: std::str::FromStr>(var: &str) -> Option<T>
where
    T::Err: std::fmt::Display,
{
    match env::var(var) {
        Ok(val) => match val.parse() {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                tracing::warn!("Invalid value '{}' for {}: {}. Ignoring.", val, var, e);
                None
            }
        },
        Err(_) => None,
    }
}

pub const DEFAULT_PIPELINE_STATES: &str =
    "rechazo:-1000:-1,tibio:0:4,interesado:5:9,caliente:10:1000";

/// Parse a `PIPELINE_STATES` value.
/// Format: comma-separated `name:min:max` triples, e.g. `tibio:0:4,caliente:5:100`
pub fn parse_pipeline_states(raw: &str) -> Vec<PipelineStateSeed> {
    raw.split(',')
        .filter(|entry| !entry.trim().is_empty())
        .filter_map(|entry| {
            let mut parts = entry.trim().splitn(3, ':');
            let name = parts.next()?.trim();
            let min = parts.next()?.trim().parse::<i64>().ok();
            let max = parts.next()?.trim().parse::<i64>().ok();
            match (name.is_empty(), min, max) {
                (false, Some(score_min), Some(score_max)) => Some(PipelineStateSeed {
                    name: name.to_string(),
                    score_min,
                    score_max,
                }),
                _ => {
                    tracing::warn!(
                        "Invalid pipeline state '{}' in PIPELINE_STATES, skipping",
                        entry
                    );
                    None
                }
            }
        })
        .collect()
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub import: ImportConfig,
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub auth_token: Option<String>,
    pub local_path: Option<String>,
    pub busy_timeout_ms: u64,
    pub journal_mode: String,
    pub synchronous: String,
}

impl DatabaseConfig {
    /// Local file database with default pragmas.
    pub fn local(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            auth_token: None,
            local_path: None,
            busy_timeout_ms: 5000,
            journal_mode: "WAL".to_string(),
            synchronous: "NORMAL".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Root under which `team_<id>/chat_<id>/<kind>/` directories are created.
    pub media_root: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImportConfig {
    /// Prefix the exporter puts in front of the counterparty in archive names.
    pub archive_prefix: String,
    /// Parent directory for per-import scratch workspaces. System temp when unset.
    pub scratch_dir: Option<PathBuf>,
    /// Minimum digit count for a bare archive name to be read as a phone number.
    pub min_phone_digits: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    pub states: Vec<PipelineStateSeed>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PipelineStateSeed {
    pub name: String,
    pub score_min: i64,
    pub score_max: i64,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            archive_prefix: "Chat de WhatsApp con ".to_string(),
            scratch_dir: None,
            min_phone_digits: 7,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").unwrap_or_else(|_| "file:chatlead.db".to_string()),
                auth_token: env::var("DATABASE_AUTH_TOKEN").ok(),
                local_path: env::var("DATABASE_LOCAL_PATH").ok(),
                busy_timeout_ms: parse_env_or("DATABASE_BUSY_TIMEOUT_MS", 5000),
                journal_mode: env::var("DATABASE_JOURNAL_MODE")
                    .unwrap_or_else(|_| "WAL".to_string()),
                synchronous: env::var("DATABASE_SYNCHRONOUS")
                    .unwrap_or_else(|_| "NORMAL".to_string()),
            },
            storage: StorageConfig {
                media_root: env::var("MEDIA_ROOT")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| PathBuf::from("media")),
            },
            import: ImportConfig {
                archive_prefix: env::var("ARCHIVE_PREFIX")
                    .unwrap_or_else(|_| "Chat de WhatsApp con ".to_string()),
                scratch_dir: parse_env_opt::<PathBuf>("SCRATCH_DIR"),
                min_phone_digits: parse_env_or("MIN_PHONE_DIGITS", 7),
            },
            pipeline: PipelineConfig {
                states: parse_pipeline_states(
                    &env::var("PIPELINE_STATES")
                        .unwrap_or_else(|_| DEFAULT_PIPELINE_STATES.to_string()),
                ),
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_config_defaults() {
        std::env::remove_var("MEDIA_ROOT");
        std::env::remove_var("ARCHIVE_PREFIX");
        std::env::remove_var("MIN_PHONE_DIGITS");
        std::env::remove_var("PIPELINE_STATES");

        let config = Config::default();
        assert_eq!(config.storage.media_root, PathBuf::from("media"));
        assert_eq!(config.import.archive_prefix, "Chat de WhatsApp con ");
        assert_eq!(config.import.min_phone_digits, 7);
        assert_eq!(config.pipeline.states.len(), 4);
        assert_eq!(config.pipeline.states[0].name, "rechazo");
        assert_eq!(config.pipeline.states[0].score_max, -1);
    }

    #[test]
    #[serial]
    fn test_config_from_env() {
        std::env::set_var("MEDIA_ROOT", "/srv/media");
        std::env::set_var("MIN_PHONE_DIGITS", "8");
        std::env::set_var("PIPELINE_STATES", "frio:0:3,caliente:4:50");

        let config = Config::default();
        assert_eq!(config.storage.media_root, PathBuf::from("/srv/media"));
        assert_eq!(config.import.min_phone_digits, 8);
        assert_eq!(config.pipeline.states.len(), 2);
        assert_eq!(config.pipeline.states[1].name, "caliente");

        std::env::remove_var("MEDIA_ROOT");
        std::env::remove_var("MIN_PHONE_DIGITS");
        std::env::remove_var("PIPELINE_STATES");
    }

    #[test]
    #[serial]
    fn test_parse_env_or_invalid_value_falls_back() {
        std::env::set_var("__TEST_PARSE_DIGITS", "seven");
        let result: usize = parse_env_or("__TEST_PARSE_DIGITS", 7);
        assert_eq!(result, 7);
        std::env::remove_var("__TEST_PARSE_DIGITS");
    }

    #[test]
    fn test_parse_pipeline_states_skips_malformed() {
        let states = parse_pipeline_states("rechazo:-10:-1, bad entry ,tibio:0:x,caliente:1:9");
        assert_eq!(
            states,
            vec![
                PipelineStateSeed {
                    name: "rechazo".to_string(),
                    score_min: -10,
                    score_max: -1,
                },
                PipelineStateSeed {
                    name: "caliente".to_string(),
                    score_min: 1,
                    score_max: 9,
                },
            ]
        );
    }
}
