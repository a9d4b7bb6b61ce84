//! Persisted configuration: per-instance settings and per-mod metadata.
pub mod mod_config;
pub mod settings;
pub mod validation;

pub use mod_config::{ModConfig, ModSetting};
pub use settings::{InstancePath, InstanceSetting, InstanceSettings};
pub use validation::{SettingSpec, SettingValue, ValueKind};
