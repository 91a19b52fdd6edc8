use anyhow::Result;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::de::DeserializeOwned;
use serde::Serialize;

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads configuration by layering `config/Config.toml` and
    /// `RVAULT_`-prefixed environment variables over the type's defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration files cannot be read or parsed.
    pub fn load<T>() -> Result<T>
    where
        T: Default + Serialize + DeserializeOwned,
    {
        Self::load_from(Toml::file("config/Config.toml"))
    }

    /// Loads configuration from an explicit TOML file path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration files cannot be read or parsed.
    pub fn load_path<T>(path: &str) -> Result<T>
    where
        T: Default + Serialize + DeserializeOwned,
    {
        Self::load_from(Toml::file(path))
    }

    fn load_from<T>(toml: figment::providers::Data<figment::providers::Toml>) -> Result<T>
    where
        T: Default + Serialize + DeserializeOwned,
    {
        let config: T = Figment::from(Serialized::defaults(T::default()))
            .merge(toml)
            .merge(Env::prefixed("RVAULT_").split("__"))
            .extract()?;

        Ok(config)
    }
}
