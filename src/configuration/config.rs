#[cfg(test)]
#[path = "config_test.rs"]
mod tests;

use std::collections::HashMap;
use std::env;
use std::path;

use anyhow::bail;
use anyhow::Result;
use dashmap::DashMap;
use once_cell::sync::Lazy;
use strum::EnumIter;
use strum::EnumVariantNames;
use strum::IntoEnumIterator;
use tokio::fs;

use crate::domain::models::BackendName;

static CONFIG: Lazy<DashMap<String, String>> = Lazy::new(DashMap::new);

const ENV_PREFIX: &str = "TERRIER_";

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, EnumIter, EnumVariantNames, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum ConfigKey {
    Backend,
    BackendHealthCheckTimeout,
    ConfigFile,
    EscalationLink,
    EscalationMarkers,
    GeminiToken,
    GeminiUrl,
    Model,
    Streaming,
    Temperature,
}

impl ConfigKey {
    /// Environment variable overriding the key, e.g. `TERRIER_GEMINI_TOKEN`.
    pub fn env_var(&self) -> String {
        return format!(
            "{ENV_PREFIX}{}",
            self.to_string().to_uppercase().replace('-', "_")
        );
    }

    fn description(&self) -> &'static str {
        match self {
            ConfigKey::Backend => return "The backend hosting the model answering questions.",
            ConfigKey::BackendHealthCheckTimeout => {
                return "Time to wait in milliseconds before timing out when doing a healthcheck for a backend."
            }
            ConfigKey::ConfigFile => return "Path to configuration file.",
            ConfigKey::EscalationLink => {
                return "Contact link attached to answers where the model could not find the requested information."
            }
            ConfigKey::EscalationMarkers => {
                return "Comma separated phrases that mark an answer as not found. Matched case-insensitively."
            }
            ConfigKey::GeminiToken => return "Gemini API key when using the Gemini backend.",
            ConfigKey::GeminiUrl => return "Gemini API URL when using the Gemini backend.",
            ConfigKey::Model => return "The model on the backend to answer with.",
            ConfigKey::Streaming => {
                return "Stream answers into the chat as they are generated instead of waiting for the full answer."
            }
            ConfigKey::Temperature => {
                return "Sampling temperature. Kept low so answers are formatted consistently."
            }
        }
    }
}

pub struct Config {}

impl Config {
    pub fn get(key: ConfigKey) -> String {
        if let Some(val) = CONFIG.get(&key.to_string()) {
            return val.to_string();
        }

        return "".to_string();
    }

    pub fn set(key: ConfigKey, value: &str) {
        CONFIG.insert(key.to_string(), value.to_string());
    }

    pub fn get_bool(key: ConfigKey) -> bool {
        return Config::get(key) == "true";
    }

    pub fn default(key: ConfigKey) -> String {
        let config_path = dirs::config_dir()
            .unwrap_or_else(|| return path::PathBuf::from("."))
            .join("terrier/config.toml");
        let default_backend = BackendName::Gemini.to_string();

        let res: &str = match key {
            ConfigKey::Backend => &default_backend,
            ConfigKey::BackendHealthCheckTimeout => "1000",
            ConfigKey::ConfigFile => config_path.to_str().unwrap_or("config.toml"),
            ConfigKey::EscalationLink => "mailto:thehub@sfc.edu",
            ConfigKey::EscalationMarkers => "cannot find,can't find",
            ConfigKey::GeminiToken => "",
            ConfigKey::GeminiUrl => "https://generativelanguage.googleapis.com",
            ConfigKey::Model => "gemini-3-flash-preview",
            ConfigKey::Streaming => "true",
            ConfigKey::Temperature => "0.2",
        };

        return res.to_string();
    }

    fn validate(key: ConfigKey, val: &str) -> Result<()> {
        match key {
            ConfigKey::Backend => {
                if BackendName::parse(val.to_string()).is_none() {
                    let names = BackendName::iter()
                        .map(|e| return e.to_string())
                        .collect::<Vec<String>>();
                    bail!(format!(
                        "Invalid value for '{key}': {val}\nPossible values are: {}",
                        names.join(", ")
                    ));
                }
            }
            ConfigKey::BackendHealthCheckTimeout => {
                if val.parse::<u64>().is_err() {
                    bail!(format!(
                        "Invalid value for '{key}': {val}\nExpected milliseconds"
                    ));
                }
            }
            ConfigKey::Streaming => {
                if val != "true" && val != "false" {
                    bail!(format!(
                        "Invalid value for '{key}': {val}\nPossible values are: true, false"
                    ));
                }
            }
            ConfigKey::Temperature => {
                let temperature = val.parse::<f32>().unwrap_or(-1.0);
                if !(0.0..=2.0).contains(&temperature) {
                    bail!(format!(
                        "Invalid value for '{key}': {val}\nExpected a number between 0 and 2"
                    ));
                }
            }
            _ => (),
        }

        return Ok(());
    }

    /// Resolves every key from defaults, then the TOML file, then environment
    /// variables. Nothing is written to the global config.
    pub async fn resolve(
        config_path: &path::Path,
        env_vars: &HashMap<String, String>,
    ) -> Result<HashMap<ConfigKey, String>> {
        let mut values = ConfigKey::iter()
            .map(|key| return (key, Config::default(key)))
            .collect::<HashMap<ConfigKey, String>>();
        values.insert(
            ConfigKey::ConfigFile,
            config_path.to_string_lossy().to_string(),
        );

        if config_path.exists() {
            let toml_str = fs::read_to_string(config_path).await?;
            let doc = toml_str.parse::<toml_edit::Document>()?;

            for key in ConfigKey::iter() {
                if let Some(val) = doc.get(&key.to_string()) {
                    if let Some(val_int) = val.as_integer() {
                        values.insert(key, val_int.to_string());
                    } else if let Some(val_float) = val.as_float() {
                        values.insert(key, val_float.to_string());
                    } else if let Some(val_bool) = val.as_bool() {
                        values.insert(key, val_bool.to_string());
                    } else if let Some(val_str) = val.as_str() {
                        if val_str.is_empty() {
                            continue;
                        }
                        values.insert(key, val_str.to_string());
                    }
                }
            }
        }

        for key in ConfigKey::iter() {
            if let Some(val) = env_vars.get(&key.env_var()) {
                if val.is_empty() {
                    continue;
                }
                values.insert(key, val.to_string());
            }
        }

        for (key, val) in values.iter() {
            if let Err(err) = Config::validate(*key, val) {
                bail!(format!(
                    "Configuration from {} is invalid. {err}",
                    config_path.to_string_lossy()
                ));
            }
        }

        return Ok(values);
    }

    /// Loads configuration into the process-wide store. `config_file` falls
    /// back to `TERRIER_CONFIG_FILE`, then the default location.
    pub async fn load(config_file: Option<path::PathBuf>) -> Result<()> {
        let env_vars = env::vars()
            .filter(|(name, _)| return name.starts_with(ENV_PREFIX))
            .collect::<HashMap<String, String>>();

        let config_path = config_file.unwrap_or_else(|| {
            return env_vars
                .get(&ConfigKey::ConfigFile.env_var())
                .map(path::PathBuf::from)
                .unwrap_or_else(|| {
                    return path::PathBuf::from(Config::default(ConfigKey::ConfigFile));
                });
        });

        let values = Config::resolve(&config_path, &env_vars).await?;
        for (key, val) in values.iter() {
            Config::set(*key, val);
        }

        tracing::debug!(
            backend = Config::get(ConfigKey::Backend),
            model = Config::get(ConfigKey::Model),
            streaming = Config::get(ConfigKey::Streaming),
            temperature = Config::get(ConfigKey::Temperature),
            config_file = Config::get(ConfigKey::ConfigFile),
            "config"
        );

        return Ok(());
    }

    pub fn serialize_default() -> String {
        let toml_str = ConfigKey::iter()
            .filter_map(|key| {
                if key == ConfigKey::ConfigFile {
                    return None;
                }

                let description = key.description();
                let mut val = Config::default(key);
                if val.is_empty() {
                    val = format!("# {key} = \"\"");
                } else if val.parse::<f64>().is_ok() || val == "true" || val == "false" {
                    val = format!("{key} = {val}");
                } else {
                    val = format!("{key} = \"{val}\"");
                }

                return Some(format!("# {description}\n{val}"));
            })
            .collect::<Vec<String>>()
            .join("\n\n");

        return toml_str;
    }
}
