//! 配置模块
//!
//! - `store`：权威配置存储（文件 / 内存）
//! - `manager`：乐观更新与整体回滚的事务管理器

mod manager;
mod store;

pub use manager::{ApplyError, ConfigManager};
pub use store::{
    default_config_path, ConfigStore, ConfigStoreError, FileConfigStore, MemoryConfigStore,
};
