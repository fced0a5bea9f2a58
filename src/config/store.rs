//! 权威配置存储
//!
//! 核心只依赖“整体替换当前配置”这一原语，且写入必须原子：
//! 并发读取方不能看到写了一半的文件。

use crate::models::AppConfig;
use async_trait::async_trait;
use fs2::FileExt;
use parking_lot::Mutex;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use thiserror::Error;

/// 配置存储错误
#[derive(Error, Debug)]
pub enum ConfigStoreError {
    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("配置序列化失败: {0}")]
    Serialize(#[from] serde_json::Error),

    /// 后端拒绝了该配置
    #[error("配置被拒绝: {0}")]
    Rejected(String),

    /// 后端不可用
    #[error("配置存储不可用: {0}")]
    Unavailable(String),

    #[error("无法获取主目录")]
    NoHomeDir,
}

/// 权威配置存储接口
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// 读取当前配置
    async fn load(&self) -> Result<AppConfig, ConfigStoreError>;

    /// 整体替换当前配置
    async fn persist(&self, config: &AppConfig) -> Result<(), ConfigStoreError>;
}

/// 获取默认配置文件路径: ~/.model-router/config.json
pub fn default_config_path() -> Result<PathBuf, ConfigStoreError> {
    let home = dirs::home_dir().ok_or(ConfigStoreError::NoHomeDir)?;
    Ok(home.join(".model-router").join("config.json"))
}

/// 原子写入 JSON 文件，防止配置损坏
///
/// 临时文件 + 校验 + 重命名；写入期间持有 `<file>.lock` 排他锁，串行化多个写入方
pub(crate) fn write_json_file_atomic(path: &Path, config: &AppConfig) -> Result<(), ConfigStoreError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let lock_path = path.with_extension("lock");
    let lock_file = fs::OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(&lock_path)?;
    lock_file.lock_exclusive()?;

    let temp_path = path.with_extension("tmp");
    let content = serde_json::to_string_pretty(config)?;
    let mut temp_file = fs::File::create(&temp_path)?;
    temp_file.write_all(content.as_bytes())?;
    temp_file.sync_all()?;
    drop(temp_file);

    // 验证写入内容可以被解析
    let verify_content = fs::read_to_string(&temp_path)?;
    let _: AppConfig = serde_json::from_str(&verify_content)?;

    fs::rename(&temp_path, path)?;
    lock_file.unlock()?;

    tracing::debug!("[ConfigStore] 已写入配置文件: {}", path.display());
    Ok(())
}

/// 基于 JSON 文件的配置存储
#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// 使用默认路径
    pub fn open_default() -> Result<Self, ConfigStoreError> {
        Ok(Self::new(default_config_path()?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ConfigStore for FileConfigStore {
    async fn load(&self) -> Result<AppConfig, ConfigStoreError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(
                    "[ConfigStore] 配置文件不存在，使用默认配置: {}",
                    self.path.display()
                );
                Ok(AppConfig::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn persist(&self, config: &AppConfig) -> Result<(), ConfigStoreError> {
        let path = self.path.clone();
        let config = config.clone();
        tokio::task::spawn_blocking(move || write_json_file_atomic(&path, &config))
            .await
            .map_err(|e| ConfigStoreError::Unavailable(format!("写入任务失败: {e}")))?
    }
}

type Normalizer = Box<dyn Fn(&mut AppConfig) + Send + Sync>;

/// 内存配置存储
///
/// 支持注入写入失败，以及模拟后端对配置的规范化
pub struct MemoryConfigStore {
    config: Mutex<AppConfig>,
    fail_persist: AtomicBool,
    persist_count: AtomicUsize,
    normalizer: Option<Normalizer>,
}

impl MemoryConfigStore {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config: Mutex::new(config),
            fail_persist: AtomicBool::new(false),
            persist_count: AtomicUsize::new(0),
            normalizer: None,
        }
    }

    /// 每次成功写入前对配置做规范化
    pub fn with_normalizer<F>(mut self, normalizer: F) -> Self
    where
        F: Fn(&mut AppConfig) + Send + Sync + 'static,
    {
        self.normalizer = Some(Box::new(normalizer));
        self
    }

    /// 设置后续写入是否失败
    pub fn set_fail_persist(&self, fail: bool) {
        self.fail_persist.store(fail, Ordering::SeqCst);
    }

    /// 当前保存的配置
    pub fn snapshot(&self) -> AppConfig {
        self.config.lock().clone()
    }

    /// 成功写入次数
    pub fn persist_count(&self) -> usize {
        self.persist_count.load(Ordering::SeqCst)
    }
}

impl Default for MemoryConfigStore {
    fn default() -> Self {
        Self::new(AppConfig::default())
    }
}

#[async_trait]
impl ConfigStore for MemoryConfigStore {
    async fn load(&self) -> Result<AppConfig, ConfigStoreError> {
        Ok(self.snapshot())
    }

    async fn persist(&self, config: &AppConfig) -> Result<(), ConfigStoreError> {
        if self.fail_persist.load(Ordering::SeqCst) {
            return Err(ConfigStoreError::Unavailable(
                "memory store is set to fail".to_string(),
            ));
        }

        let mut stored = config.clone();
        if let Some(normalize) = &self.normalizer {
            normalize(&mut stored);
        }
        *self.config.lock() = stored;
        self.persist_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
