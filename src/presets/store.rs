//! 预设存储
//!
//! 管理内置预设和用户预设的生命周期。用户预设作为一个整体集合
//! 序列化到本地键值存储；加载失败（缺失或损坏）视为空列表。

use super::builtin::{builtin_presets, is_builtin, DEFAULT_PRESET_ID, USER_PRESET_ID_PREFIX};
use super::storage::{KeyValueStore, StorageError};
use crate::models::Preset;
use crate::router::RuleSet;
use std::sync::Arc;
use thiserror::Error;

/// 用户预设在本地存储中的键
pub const USER_PRESETS_KEY: &str = "custom_model_presets";

/// 用户预设的默认描述
const USER_PRESET_DESCRIPTION: &str = "Saved from the current custom mapping";

/// 预设操作错误
#[derive(Error, Debug)]
pub enum PresetError {
    /// 当前映射为空，不能保存为预设
    #[error("当前没有可保存的映射")]
    EmptyRuleSet,

    /// 预设名称为空
    #[error("预设名称不能为空")]
    NameRequired,

    /// 内置预设不可删除
    #[error("内置预设不可删除: {0}")]
    NotDeletable(String),

    /// 预设不存在
    #[error("预设不存在: {0}")]
    NotFound(String),

    /// 本地存储失败
    #[error("保存预设失败: {0}")]
    Storage(#[from] StorageError),
}

/// 预设存储
pub struct PresetStore {
    storage: Arc<dyn KeyValueStore>,
    builtins: Vec<Preset>,
    user_presets: Vec<Preset>,
}

impl PresetStore {
    /// 从本地存储加载用户预设
    ///
    /// 读取或解析失败都不会返回错误，只记录警告并当作空列表
    pub fn load(storage: Arc<dyn KeyValueStore>) -> Self {
        let user_presets = match storage.read(USER_PRESETS_KEY) {
            Ok(Some(bytes)) => Self::decode(&bytes),
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::warn!("[Presets] 读取用户预设失败，按空列表处理: {}", e);
                Vec::new()
            }
        };

        tracing::debug!("[Presets] 已加载 {} 个用户预设", user_presets.len());

        Self {
            storage,
            builtins: builtin_presets(),
            user_presets,
        }
    }

    fn decode(bytes: &[u8]) -> Vec<Preset> {
        let presets: Vec<Preset> = match serde_json::from_slice(bytes) {
            Ok(presets) => presets,
            Err(e) => {
                tracing::warn!("[Presets] 用户预设数据损坏，按空列表处理: {}", e);
                return Vec::new();
            }
        };

        // 与内置 id 冲突或重复的条目无法被区分，直接丢弃
        let mut accepted: Vec<Preset> = Vec::with_capacity(presets.len());
        for preset in presets {
            if is_builtin(&preset.id) || accepted.iter().any(|p| p.id == preset.id) {
                tracing::warn!("[Presets] 丢弃 id 冲突的用户预设: {}", preset.id);
                continue;
            }
            if preset.rules.is_empty() {
                tracing::warn!("[Presets] 丢弃没有映射的用户预设: {}", preset.id);
                continue;
            }
            accepted.push(preset);
        }
        accepted
    }

    /// 所有预设：内置预设在前（固定顺序），用户预设在后（创建顺序）
    pub fn list(&self) -> Vec<Preset> {
        self.builtins
            .iter()
            .chain(self.user_presets.iter())
            .cloned()
            .collect()
    }

    pub fn builtin_presets(&self) -> &[Preset] {
        &self.builtins
    }

    pub fn user_presets(&self) -> &[Preset] {
        &self.user_presets
    }

    /// 按 id 查找预设
    pub fn get(&self, id: &str) -> Option<&Preset> {
        self.builtins
            .iter()
            .chain(self.user_presets.iter())
            .find(|p| p.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// 选中的预设仍然存在则原样返回，否则回退到默认预设
    pub fn fallback_selection<'a>(&self, selected: &'a str) -> &'a str {
        if self.contains(selected) {
            selected
        } else {
            DEFAULT_PRESET_ID
        }
    }

    /// 用规则集快照创建用户预设
    pub fn create(&mut self, name: &str, rules: RuleSet) -> Result<Preset, PresetError> {
        if rules.is_empty() {
            return Err(PresetError::EmptyRuleSet);
        }
        let name = name.trim();
        if name.is_empty() {
            return Err(PresetError::NameRequired);
        }

        let preset = Preset::new(&self.next_id(), name, USER_PRESET_DESCRIPTION, rules);

        let mut updated = self.user_presets.clone();
        updated.push(preset.clone());
        self.persist(&updated)?;
        self.user_presets = updated;

        tracing::info!("[Presets] 已保存用户预设: {} ({})", preset.name, preset.id);
        Ok(preset)
    }

    /// 删除用户预设，返回被删除的预设
    ///
    /// 调用方应检查返回的 id 是否为当前选中项，必要时调用 `fallback_selection`
    pub fn delete(&mut self, id: &str) -> Result<Preset, PresetError> {
        if is_builtin(id) {
            return Err(PresetError::NotDeletable(id.to_string()));
        }
        let pos = self
            .user_presets
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| PresetError::NotFound(id.to_string()))?;

        let mut updated = self.user_presets.clone();
        let removed = updated.remove(pos);
        self.persist(&updated)?;
        self.user_presets = updated;

        tracing::info!("[Presets] 已删除用户预设: {} ({})", removed.name, removed.id);
        Ok(removed)
    }

    fn persist(&self, presets: &[Preset]) -> Result<(), PresetError> {
        let bytes = serde_json::to_vec(presets).map_err(StorageError::from)?;
        self.storage.write(USER_PRESETS_KEY, &bytes)?;
        Ok(())
    }

    /// 生成用户预设 id: custom_<毫秒时间戳>，冲突时递增直到唯一
    fn next_id(&self) -> String {
        let mut millis = chrono::Utc::now().timestamp_millis();
        loop {
            let id = format!("{USER_PRESET_ID_PREFIX}{millis}");
            if !self.contains(&id) {
                return id;
            }
            millis += 1;
        }
    }
}
