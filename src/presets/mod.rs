//! 映射预设模块
//!
//! - 内置预设：固定 id 和内容，不可删除
//! - 用户预设：由当前自定义映射快照创建，保存在客户端本地存储

mod builtin;
mod storage;
mod store;

pub use builtin::{
    builtin_presets, is_builtin, BUILTIN_PRESET_IDS, DEFAULT_PRESET_ID, USER_PRESET_ID_PREFIX,
};
pub use storage::{
    default_storage_path, KeyValueStore, MemoryKeyValueStore, SqliteKeyValueStore, StorageError,
};
pub use store::{PresetError, PresetStore, USER_PRESETS_KEY};
