use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    pub store: StoreSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreSettings {
    /// Base URL of the live store's REST endpoint.
    pub base_url: String,
    pub auth_token: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EngineConfig {
    pub engine: EngineSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EngineSettings {
    #[serde(default = "default_tolerance_meters")]
    pub tolerance_meters: f64,
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
}

fn default_tolerance_meters() -> f64 {
    15.0
}

fn default_listen_addr() -> String {
    "0.0.0.0:8080".to_string()
}

pub fn load_store_config() -> anyhow::Result<StoreConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/store"))
        .build()?;

    Ok(settings.try_deserialize()?)
}

pub fn load_engine_config() -> anyhow::Result<EngineConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/engine"))
        .build()?;

    Ok(settings.try_deserialize()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_settings_defaults() {
        let settings: EngineSettings = toml::from_str("").unwrap();
        assert_eq!(settings.tolerance_meters, 15.0);
        assert_eq!(settings.listen_addr, "0.0.0.0:8080");
    }

    #[test]
    fn test_engine_settings_overrides() {
        let settings: EngineSettings =
            toml::from_str("tolerance_meters = 25.0\nlisten_addr = \"127.0.0.1:9000\"").unwrap();
        assert_eq!(settings.tolerance_meters, 25.0);
        assert_eq!(settings.listen_addr, "127.0.0.1:9000");
    }
}
