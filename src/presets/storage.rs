//! 客户端本地键值存储
//!
//! 用户预设保存在本地存储中，而不是权威配置里。
//! 提供 SQLite 实现和内存实现（用于测试或嵌入方）。

use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// 本地存储错误
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("数据库错误: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("序列化失败: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("无法获取主目录")]
    NoHomeDir,
}

/// 本地键值存储接口
pub trait KeyValueStore: Send + Sync {
    /// 读取键，不存在时返回 None
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// 写入键（整体覆盖）
    fn write(&self, key: &str, value: &[u8]) -> Result<(), StorageError>;
}

/// 获取默认的本地存储路径: ~/.model-router/presets.db
pub fn default_storage_path() -> Result<PathBuf, StorageError> {
    let home = dirs::home_dir().ok_or(StorageError::NoHomeDir)?;
    Ok(home.join(".model-router").join("presets.db"))
}

/// 基于 SQLite 的键值存储
pub struct SqliteKeyValueStore {
    conn: Mutex<Connection>,
}

impl SqliteKeyValueStore {
    /// 打开（或创建）数据库文件
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        Self::with_connection(conn)
    }

    /// 打开默认位置的数据库
    pub fn open_default() -> Result<Self, StorageError> {
        Self::open(&default_storage_path()?)
    }

    /// 使用内存数据库
    pub fn open_in_memory() -> Result<Self, StorageError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StorageError> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS kv_store (
                key TEXT PRIMARY KEY,
                value BLOB NOT NULL,
                updated_at INTEGER NOT NULL
            )",
            [],
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl KeyValueStore for SqliteKeyValueStore {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let conn = self.conn.lock();
        let value = conn
            .query_row(
                "SELECT value FROM kv_store WHERE key = ?1",
                params![key],
                |row| row.get::<_, Vec<u8>>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn write(&self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO kv_store (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, chrono::Utc::now().timestamp()],
        )?;
        Ok(())
    }
}

/// 内存键值存储
#[derive(Default)]
pub struct MemoryKeyValueStore {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn write(&self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        self.entries.lock().insert(key.to_string(), value.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_memory_store_roundtrip() {
        let store = MemoryKeyValueStore::new();
        assert!(store.read("presets").unwrap().is_none());

        store.write("presets", b"[]").unwrap();
        assert_eq!(store.read("presets").unwrap(), Some(b"[]".to_vec()));
    }

    #[test]
    fn test_sqlite_store_overwrite() {
        let store = SqliteKeyValueStore::open_in_memory().unwrap();
        assert!(store.read("presets").unwrap().is_none());

        store.write("presets", b"first").unwrap();
        store.write("presets", b"second").unwrap();
        assert_eq!(store.read("presets").unwrap(), Some(b"second".to_vec()));
    }

    #[test]
    fn test_sqlite_store_persists_across_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("presets.db");

        {
            let store = SqliteKeyValueStore::open(&path).unwrap();
            store.write("presets", b"saved").unwrap();
        }

        let reopened = SqliteKeyValueStore::open(&path).unwrap();
        assert_eq!(reopened.read("presets").unwrap(), Some(b"saved".to_vec()));
    }
}
