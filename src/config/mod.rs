mod env_overrides;
mod loader;
mod locale;
#[cfg(test)]
pub(crate) mod test_env;
mod types;
mod validate;

pub use locale::SUPPORTED_LOCALES;
pub use types::{
    Config, DispatchConfig, GenerationConfig, HealthConfig, LogFormat, LoggingConfig,
    StoreBackend, StoreConfig, TelegramConfig, chatrelay_dir,
};
