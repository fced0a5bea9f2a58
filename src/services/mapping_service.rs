//! 模型映射服务
//!
//! 面向设置界面和请求分发路径的统一入口：
//! 解析模型名、管理预设、增删改自定义规则。所有配置变更都经过
//! `ConfigManager` 的乐观更新协议，失败时整体回滚。

use crate::config::{ApplyError, ConfigManager, ConfigStoreError, FileConfigStore};
use crate::models::{
    AppConfig, MappedModel, MappingNamespace, ModelFamily, Preset, Resolution, ZaiModelDefaults,
};
use crate::presets::{PresetError, PresetStore, SqliteKeyValueStore};
use crate::router::{merge, Rule, RuleSet, ValidationError};
use parking_lot::Mutex;
use std::sync::Arc;
use thiserror::Error;

/// 映射服务错误
#[derive(Error, Debug)]
pub enum MappingError {
    #[error("规则无效: {0}")]
    Validation(#[from] ValidationError),

    #[error("{0}")]
    Preset(#[from] PresetError),

    #[error("{0}")]
    Apply(#[from] ApplyError),

    #[error("加载配置失败: {0}")]
    Load(#[from] ConfigStoreError),
}

impl MappingError {
    /// 获取错误类型字符串
    pub fn error_type(&self) -> &'static str {
        match self {
            MappingError::Validation(_) => "validation_error",
            MappingError::Preset(PresetError::EmptyRuleSet) => "empty_rule_set",
            MappingError::Preset(PresetError::NameRequired) => "name_required",
            MappingError::Preset(PresetError::NotDeletable(_)) => "not_deletable",
            MappingError::Preset(PresetError::NotFound(_)) => "preset_not_found",
            MappingError::Preset(PresetError::Storage(_)) => "preset_storage_error",
            MappingError::Apply(_) => "apply_error",
            MappingError::Load(_) => "config_load_error",
        }
    }
}

/// 模型映射服务
pub struct ModelMappingService {
    config: Arc<ConfigManager>,
    presets: Mutex<PresetStore>,
}

impl ModelMappingService {
    pub fn new(config: Arc<ConfigManager>, presets: PresetStore) -> Self {
        Self {
            config,
            presets: Mutex::new(presets),
        }
    }

    /// 使用默认位置的配置文件和预设数据库
    pub async fn open_default() -> Result<Self, MappingError> {
        let store = Arc::new(FileConfigStore::open_default()?);
        let config = ConfigManager::load(store).await?;
        let storage = SqliteKeyValueStore::open_default().map_err(PresetError::from)?;
        let presets = PresetStore::load(Arc::new(storage));
        Ok(Self::new(Arc::new(config), presets))
    }

    pub fn config_manager(&self) -> &Arc<ConfigManager> {
        &self.config
    }

    // ========== 解析 ==========

    /// 在主命名空间中解析模型名
    pub fn resolve(&self, model: &str) -> Option<String> {
        self.resolve_in(MappingNamespace::Primary, model)
            .map(|r| r.target)
    }

    /// 在 z.ai 命名空间中解析模型名（含家族默认值）
    pub fn resolve_zai(&self, model: &str) -> Option<String> {
        self.resolve_in(MappingNamespace::Zai, model)
            .map(|r| r.target)
    }

    /// 解析并返回命中详情
    pub fn resolve_in(&self, namespace: MappingNamespace, model: &str) -> Option<Resolution> {
        self.config
            .read(|config| config.resolve_model(namespace, model))
    }

    /// 请求分发使用：未命中时原样透传
    pub fn map_model(&self, model: &str) -> MappedModel {
        let mapped = MappedModel::new(model, self.resolve_in(MappingNamespace::Primary, model));
        if mapped.is_mapped() {
            tracing::debug!("[ModelMapping] {} -> {}", mapped.requested, mapped.actual);
        }
        mapped
    }

    /// 当前自定义映射（用于展示）
    pub fn custom_mapping(&self) -> RuleSet {
        self.config.rules(MappingNamespace::Primary)
    }

    pub fn zai_mapping(&self) -> RuleSet {
        self.config.rules(MappingNamespace::Zai)
    }

    pub fn zai_family_defaults(&self) -> ZaiModelDefaults {
        self.config.read(|config| config.proxy.zai.models.clone())
    }

    // ========== 预设 ==========

    pub fn list_presets(&self) -> Vec<Preset> {
        self.presets.lock().list()
    }

    /// 将当前自定义映射保存为用户预设
    pub fn create_preset(&self, name: &str) -> Result<Preset, MappingError> {
        let rules = self.custom_mapping();
        Ok(self.presets.lock().create(name, rules)?)
    }

    /// 删除用户预设
    ///
    /// 若被删除的是当前选中项，调用方应通过 `fallback_selection` 重新选择
    pub fn delete_preset(&self, id: &str) -> Result<Preset, MappingError> {
        Ok(self.presets.lock().delete(id)?)
    }

    /// 选中项仍然存在则原样返回，否则返回默认预设 id
    pub fn fallback_selection(&self, selected: &str) -> String {
        self.presets.lock().fallback_selection(selected).to_string()
    }

    /// 预览应用预设后的映射，不提交
    pub fn preview_preset(&self, id: &str) -> Result<RuleSet, MappingError> {
        let preset_rules = self.preset_rules(id)?;
        Ok(merge(&self.custom_mapping(), &preset_rules))
    }

    /// 将预设合并到自定义映射并提交
    ///
    /// 预设中没有的自定义规则保持不变
    pub async fn apply_preset(&self, id: &str) -> Result<RuleSet, MappingError> {
        let preset_rules = self.preset_rules(id)?;
        let rules = self
            .config
            .apply(MappingNamespace::Primary, |current| {
                merge(&current, &preset_rules)
            })
            .await?;

        tracing::info!("[ModelMapping] 已应用预设: {} ({} 条规则)", id, rules.len());
        Ok(rules)
    }

    fn preset_rules(&self, id: &str) -> Result<RuleSet, MappingError> {
        self.presets
            .lock()
            .get(id)
            .map(|preset| preset.rules.clone())
            .ok_or_else(|| PresetError::NotFound(id.to_string()).into())
    }

    // ========== 主命名空间规则 ==========

    pub async fn upsert_rule(&self, pattern: &str, target: &str) -> Result<RuleSet, MappingError> {
        self.upsert_rule_in(MappingNamespace::Primary, pattern, target)
            .await
    }

    /// 删除规则；规则不存在时返回 false 且不提交
    pub async fn remove_rule(&self, pattern: &str) -> Result<bool, MappingError> {
        self.remove_rule_in(MappingNamespace::Primary, pattern)
            .await
    }

    pub async fn reset_rules(&self) -> Result<RuleSet, MappingError> {
        self.reset_rules_in(MappingNamespace::Primary).await
    }

    // ========== z.ai 命名空间 ==========

    pub async fn upsert_zai_rule(&self, pattern: &str, target: &str) -> Result<RuleSet, MappingError> {
        self.upsert_rule_in(MappingNamespace::Zai, pattern, target)
            .await
    }

    pub async fn remove_zai_rule(&self, pattern: &str) -> Result<bool, MappingError> {
        self.remove_rule_in(MappingNamespace::Zai, pattern).await
    }

    pub async fn reset_zai_rules(&self) -> Result<RuleSet, MappingError> {
        self.reset_rules_in(MappingNamespace::Zai).await
    }

    /// 设置某个模型家族的默认目标
    pub async fn set_zai_family_default(
        &self,
        family: ModelFamily,
        model: &str,
    ) -> Result<ZaiModelDefaults, MappingError> {
        let model = model.trim();
        if model.is_empty() {
            return Err(ValidationError::EmptyTarget {
                pattern: family.to_string(),
            }
            .into());
        }

        let committed = self
            .config
            .update(|config| config.proxy.zai.models.set(family, model.to_string()))
            .await?;

        tracing::info!("[ModelMapping] z.ai {} 默认模型: {}", family, model);
        Ok(committed.proxy.zai.models)
    }

    // ========== 通用 ==========

    /// 对任意配置字段执行乐观更新
    pub async fn update_config<F>(&self, mutate: F) -> Result<AppConfig, MappingError>
    where
        F: FnOnce(&mut AppConfig),
    {
        Ok(self.config.update(mutate).await?)
    }

    async fn upsert_rule_in(
        &self,
        namespace: MappingNamespace,
        pattern: &str,
        target: &str,
    ) -> Result<RuleSet, MappingError> {
        // 先校验，无效规则不会触发任何变更
        let rule = Rule::new(pattern, target)?;
        let rules = self
            .config
            .apply(namespace, |mut current| {
                current.upsert(rule);
                current
            })
            .await?;

        tracing::info!("[ModelMapping] [{}] 已保存规则: {}", namespace, pattern);
        Ok(rules)
    }

    async fn remove_rule_in(
        &self,
        namespace: MappingNamespace,
        pattern: &str,
    ) -> Result<bool, MappingError> {
        if !self.config.read(|config| config.mapping(namespace).contains(pattern)) {
            return Ok(false);
        }

        self.config
            .apply(namespace, |mut current| {
                current.remove(pattern);
                current
            })
            .await?;

        tracing::info!("[ModelMapping] [{}] 已删除规则: {}", namespace, pattern);
        Ok(true)
    }

    async fn reset_rules_in(&self, namespace: MappingNamespace) -> Result<RuleSet, MappingError> {
        let rules = self
            .config
            .apply(namespace, |_| RuleSet::new())
            .await?;

        tracing::info!("[ModelMapping] [{}] 已重置映射", namespace);
        Ok(rules)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MemoryConfigStore;
    use crate::presets::{MemoryKeyValueStore, DEFAULT_PRESET_ID};
    use crate::router::MatchKind;

    fn service_with(store: Arc<MemoryConfigStore>) -> ModelMappingService {
        let config = ConfigManager::with_config(store.clone(), store.snapshot());
        let presets = PresetStore::load(Arc::new(MemoryKeyValueStore::new()));
        ModelMappingService::new(Arc::new(config), presets)
    }

    fn service() -> (Arc<MemoryConfigStore>, ModelMappingService) {
        let store = Arc::new(MemoryConfigStore::default());
        let service = service_with(store.clone());
        (store, service)
    }

    #[tokio::test]
    async fn test_end_to_end_scenario() {
        let (_, service) = service();
        assert!(service.custom_mapping().is_empty());

        service.apply_preset(DEFAULT_PRESET_ID).await.unwrap();
        assert_eq!(
            service.resolve("gpt-4-turbo").as_deref(),
            Some("gemini-3-pro-high")
        );

        service
            .upsert_rule("gpt-4-turbo", "claude-sonnet-4-5")
            .await
            .unwrap();
        assert_eq!(
            service.resolve("gpt-4-turbo").as_deref(),
            Some("claude-sonnet-4-5")
        );

        service.reset_rules().await.unwrap();
        assert_eq!(service.resolve("gpt-4-turbo"), None);
    }

    #[tokio::test]
    async fn test_apply_preset_keeps_unrelated_rules() {
        let (_, service) = service();
        service.upsert_rule("my-model", "gemini-3-flash").await.unwrap();
        service.upsert_rule("gpt-4*", "custom-target").await.unwrap();

        let rules = service.apply_preset("performance").await.unwrap();

        assert_eq!(rules.get("my-model"), Some("gemini-3-flash"));
        assert_eq!(rules.get("gpt-4*"), Some("claude-opus-4-6-thinking"));
    }

    #[tokio::test]
    async fn test_apply_preset_failure_rolls_back() {
        let (store, service) = service();
        service.upsert_rule("my-model", "gemini-3-flash").await.unwrap();
        let before = service.config_manager().config();

        store.set_fail_persist(true);
        let err = service.apply_preset(DEFAULT_PRESET_ID).await.unwrap_err();

        assert_eq!(err.error_type(), "apply_error");
        assert_eq!(service.config_manager().config(), before);
        assert_eq!(service.resolve("gpt-4-turbo"), None);
    }

    #[tokio::test]
    async fn test_apply_unknown_preset() {
        let (store, service) = service();
        let err = service.apply_preset("custom_0").await.unwrap_err();

        assert_eq!(err.error_type(), "preset_not_found");
        assert_eq!(store.persist_count(), 0);
    }

    #[tokio::test]
    async fn test_invalid_rule_is_rejected_before_commit() {
        let (store, service) = service();

        let err = service.upsert_rule("gpt-*-turbo", "x").await.unwrap_err();
        assert_eq!(err.error_type(), "validation_error");
        let err = service.upsert_rule("gpt-4*", "  ").await.unwrap_err();
        assert_eq!(err.error_type(), "validation_error");

        assert_eq!(store.persist_count(), 0);
        assert!(service.custom_mapping().is_empty());
    }

    #[tokio::test]
    async fn test_remove_rule() {
        let (store, service) = service();
        service.upsert_rule("gpt-4*", "gemini-3-flash").await.unwrap();

        assert!(!service.remove_rule("gpt-5*").await.unwrap());
        assert_eq!(store.persist_count(), 1);

        assert!(service.remove_rule("gpt-4*").await.unwrap());
        assert_eq!(store.persist_count(), 2);
        assert!(service.custom_mapping().is_empty());
    }

    #[tokio::test]
    async fn test_create_preset_from_current_mapping() {
        let (_, service) = service();
        let err = service.create_preset("Empty").unwrap_err();
        assert_eq!(err.error_type(), "empty_rule_set");

        service.upsert_rule("gpt-4*", "gemini-3-flash").await.unwrap();
        let preset = service.create_preset("My preset").unwrap();

        let presets = service.list_presets();
        assert_eq!(presets.len(), 5);
        assert_eq!(presets[4].id, preset.id);
        assert_eq!(presets[4].rules.get("gpt-4*"), Some("gemini-3-flash"));
    }

    #[tokio::test]
    async fn test_delete_preset() {
        let (_, service) = service();
        let err = service.delete_preset(DEFAULT_PRESET_ID).unwrap_err();
        assert_eq!(err.error_type(), "not_deletable");

        let err = service.delete_preset("custom_0").unwrap_err();
        assert_eq!(err.error_type(), "preset_not_found");

        service.upsert_rule("gpt-4*", "gemini-3-flash").await.unwrap();
        let preset = service.create_preset("Mine").unwrap();
        service.delete_preset(&preset.id).unwrap();
        assert_eq!(service.fallback_selection(&preset.id), DEFAULT_PRESET_ID);
        assert_eq!(service.list_presets().len(), 4);
    }

    #[tokio::test]
    async fn test_preview_does_not_commit() {
        let (store, service) = service();
        service.upsert_rule("my-model", "gemini-3-flash").await.unwrap();

        let preview = service.preview_preset("cost-effective").unwrap();

        assert_eq!(preview.get("my-model"), Some("gemini-3-flash"));
        assert_eq!(preview.get("gpt-4*"), Some("gemini-3-flash"));
        assert_eq!(service.custom_mapping().len(), 1);
        assert_eq!(store.persist_count(), 1);
    }

    #[tokio::test]
    async fn test_zai_namespace_is_independent() {
        let (_, service) = service();
        service.upsert_rule("claude-*", "gemini-3-flash").await.unwrap();
        service
            .upsert_zai_rule("claude-opus-4*", "glm-5")
            .await
            .unwrap();

        assert_eq!(
            service.resolve("claude-opus-4-6").as_deref(),
            Some("gemini-3-flash")
        );
        assert_eq!(service.resolve_zai("claude-opus-4-6").as_deref(), Some("glm-5"));

        let fallback = service
            .resolve_in(MappingNamespace::Zai, "claude-sonnet-4-5")
            .unwrap();
        assert_eq!(fallback.kind, MatchKind::FamilyDefault);
        assert_eq!(fallback.target, "glm-4.7");

        service.reset_rules().await.unwrap();
        assert_eq!(service.zai_mapping().len(), 1);

        assert!(service.remove_zai_rule("claude-opus-4*").await.unwrap());
        service.reset_zai_rules().await.unwrap();
        assert!(service.zai_mapping().is_empty());
    }

    #[tokio::test]
    async fn test_set_zai_family_default() {
        let (store, service) = service();

        let defaults = service
            .set_zai_family_default(ModelFamily::Haiku, "glm-4.7-flash")
            .await
            .unwrap();
        assert_eq!(defaults.haiku, "glm-4.7-flash");
        assert_eq!(
            service.resolve_zai("claude-3-5-haiku-latest").as_deref(),
            Some("glm-4.7-flash")
        );
        assert_eq!(store.snapshot().proxy.zai.models.haiku, "glm-4.7-flash");

        let err = service
            .set_zai_family_default(ModelFamily::Opus, " ")
            .await
            .unwrap_err();
        assert_eq!(err.error_type(), "validation_error");
        assert_eq!(service.zai_family_defaults().opus, "glm-4.7");
    }

    #[tokio::test]
    async fn test_map_model_passthrough() {
        let (_, service) = service();
        service.upsert_rule("gpt-4o*", "gemini-3-flash").await.unwrap();

        let mapped = service.map_model("gpt-4o-mini");
        assert_eq!(mapped.actual, "gemini-3-flash");
        assert_eq!(mapped.resolution.unwrap().pattern.as_deref(), Some("gpt-4o*"));

        let passthrough = service.map_model("llama-3");
        assert_eq!(passthrough.actual, "llama-3");
        assert!(!passthrough.is_mapped());
    }

    #[tokio::test]
    async fn test_update_config_rolls_back_other_fields() {
        let (store, service) = service();
        service.upsert_rule("gpt-4*", "gemini-3-flash").await.unwrap();

        store.set_fail_persist(true);
        let err = service
            .update_config(|config| {
                config.proxy.allow_lan_access = true;
                config.proxy.custom_mapping.clear();
            })
            .await
            .unwrap_err();

        assert_eq!(err.error_type(), "apply_error");
        assert!(!service.config_manager().config().proxy.allow_lan_access);
        assert_eq!(
            service.resolve("gpt-4-turbo").as_deref(),
            Some("gemini-3-flash")
        );
    }
}
