use anyhow::{Context, Result};
use figment::{
    Figment,
    providers::{Env, Format, Json, Toml, Yaml},
};

use super::Settings;

// Embed the default config at compile time
const DEFAULT_CONFIG: &str = include_str!("../../default-config.toml");

/// Layered configuration: embedded defaults, user file, repository file, env vars
pub struct DirwatchConfig {
    figment: Figment,
}

impl DirwatchConfig {
    pub fn load_with_custom_config(custom_config: Option<&str>) -> Result<Self> {
        let mut figment = Figment::new().merge(Toml::string(DEFAULT_CONFIG)); // Embedded defaults

        // If custom config is specified, use only that + defaults + env vars
        if let Some(custom_path) = custom_config {
            figment = match custom_path.rsplit('.').next() {
                Some("json") => figment.merge(Json::file(custom_path)),
                Some("yaml") | Some("yml") => figment.merge(Yaml::file(custom_path)),
                _ => figment.merge(Toml::file(custom_path)),
            };
        } else {
            // Standard priority: user config -> repo config
            figment = figment
                .merge(Toml::file(Self::user_config_path()))
                .merge(Toml::file("dirwatch.toml"))
                .merge(Json::file("dirwatch.json"))
                .merge(Yaml::file("dirwatch.yaml"))
                .merge(Yaml::file("dirwatch.yml"));
        }

        // Environment variables always have highest priority
        figment = figment.merge(Env::prefixed("DIRWATCH_").split("__"));

        Ok(DirwatchConfig { figment })
    }

    /// Extract and validate the typed settings
    pub fn settings(&self) -> Result<Settings> {
        let settings: Settings = self
            .figment
            .extract()
            .context("Failed to parse dirwatch configuration")?;
        settings.validate()?;
        Ok(settings)
    }

    fn user_config_path() -> String {
        match std::env::var("HOME") {
            Ok(home) => format!("{}/.config/dirwatch/config.toml", home),
            Err(_) => "~/.config/dirwatch/config.toml".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_loading() {
        let config = DirwatchConfig::load_with_custom_config(None);
        assert!(config.is_ok(), "Should load default config successfully");
    }

    #[test]
    fn test_custom_config_loading() {
        // Missing custom file falls back to the embedded defaults
        let config = DirwatchConfig::load_with_custom_config(Some("non_existent.toml")).unwrap();
        let settings = config.settings().unwrap();
        assert_eq!(settings.results.page_size, 10);
    }

    #[test]
    fn test_embedded_task_defaults() {
        let config = DirwatchConfig::load_with_custom_config(Some("non_existent.toml")).unwrap();
        let task = config.settings().unwrap().task.default_task_config();
        assert_eq!(task.magic_word, "TODO");
        assert_eq!(task.interval, 60.0);
    }
}
