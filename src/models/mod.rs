pub mod config_model;
pub mod preset_model;
pub mod route_model;

pub use config_model::{
    AppConfig, ModelFamily, ProxyAuthMode, ProxyConfig, SchedulingConfig, SchedulingMode,
    UpstreamProxyConfig, ZaiConfig, ZaiDispatchMode, ZaiModelDefaults,
};
pub use preset_model::Preset;
pub use route_model::{MappedModel, MappingNamespace, Resolution};
