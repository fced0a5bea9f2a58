//! 模型映射路由
//!
//! 将客户端请求的模型名改写为实际使用的目标模型：
//! - `router`：模式匹配、规则集、合并
//! - `presets`：内置预设与用户预设
//! - `config`：配置存储与乐观更新事务
//! - `services`：面向界面和分发路径的统一入口

pub mod config;
pub mod logger;
pub mod models;
pub mod presets;
pub mod router;
pub mod services;

pub use config::{ApplyError, ConfigManager, ConfigStore, FileConfigStore, MemoryConfigStore};
pub use models::{AppConfig, MappedModel, MappingNamespace, Preset, Resolution};
pub use presets::PresetStore;
pub use router::{merge, resolve, MatchKind, Rule, RuleSet, ValidationError};
pub use services::{MappingError, ModelMappingService};
