//! 配置事务管理器
//!
//! 乐观更新 + 整体回滚：
//! 1. 快照完整配置 `old`
//! 2. 计算候选配置并立即发布（调用方和订阅者马上可见）
//! 3. 异步请求存储持久化
//! 4. 成功后按需重新加载，以存储规范化后的结果为准
//! 5. 失败时丢弃候选配置，恢复为完整的 `old`，错误返回给调用方，不自动重试
//!
//! 管理器不对并发调用排队；重叠的调用以最后到达存储的提交为准。

use super::store::{ConfigStore, ConfigStoreError};
use crate::logger::sanitize_log_message;
use crate::models::{AppConfig, MappingNamespace};
use crate::router::RuleSet;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;

/// 提交失败错误（发生时配置已回滚）
#[derive(Error, Debug)]
pub enum ApplyError {
    #[error("保存配置失败，已回滚: {0}")]
    Persist(#[from] ConfigStoreError),
}

/// 配置事务管理器
pub struct ConfigManager {
    store: Arc<dyn ConfigStore>,
    state: watch::Sender<AppConfig>,
    reconcile: bool,
}

impl ConfigManager {
    /// 从存储加载配置并创建管理器
    pub async fn load(store: Arc<dyn ConfigStore>) -> Result<Self, ConfigStoreError> {
        let config = store.load().await?;
        Ok(Self::with_config(store, config))
    }

    /// 使用已有配置创建管理器（不读取存储）
    pub fn with_config(store: Arc<dyn ConfigStore>, config: AppConfig) -> Self {
        let (state, _) = watch::channel(config);
        Self {
            store,
            state,
            reconcile: true,
        }
    }

    /// 提交成功后是否重新加载存储中的配置，默认开启
    pub fn with_reconcile(mut self, reconcile: bool) -> Self {
        self.reconcile = reconcile;
        self
    }

    /// 当前配置快照
    pub fn config(&self) -> AppConfig {
        self.state.borrow().clone()
    }

    /// 在不克隆的情况下读取当前配置
    ///
    /// 闭包内不要调用本管理器的其它方法
    pub fn read<R>(&self, f: impl FnOnce(&AppConfig) -> R) -> R {
        f(&self.state.borrow())
    }

    /// 当前某个命名空间的规则集
    pub fn rules(&self, namespace: MappingNamespace) -> RuleSet {
        self.read(|config| config.mapping(namespace).clone())
    }

    /// 订阅配置变化（乐观更新、提交、回滚都会通知）
    pub fn subscribe(&self) -> watch::Receiver<AppConfig> {
        self.state.subscribe()
    }

    /// 从存储重新加载配置并发布
    pub async fn reload(&self) -> Result<AppConfig, ConfigStoreError> {
        let config = self.store.load().await?;
        self.state.send_replace(config.clone());
        tracing::debug!("[ConfigStore] 已重新加载配置");
        Ok(config)
    }

    /// 对某个命名空间的规则集执行乐观更新
    ///
    /// 返回提交后（可能经过规范化）的规则集
    pub async fn apply<F>(&self, namespace: MappingNamespace, mutate: F) -> Result<RuleSet, ApplyError>
    where
        F: FnOnce(RuleSet) -> RuleSet,
    {
        let committed = self
            .update(|config| {
                let rules = std::mem::take(config.mapping_mut(namespace));
                *config.mapping_mut(namespace) = mutate(rules);
            })
            .await?;
        Ok(committed.mapping(namespace).clone())
    }

    /// 对任意字段执行乐观更新
    ///
    /// 返回提交后（可能经过规范化）的完整配置
    pub async fn update<F>(&self, mutate: F) -> Result<AppConfig, ApplyError>
    where
        F: FnOnce(&mut AppConfig),
    {
        let old = self.config();
        let mut candidate = old.clone();
        mutate(&mut candidate);

        self.state.send_replace(candidate.clone());
        tracing::debug!("[ConfigStore] 已应用乐观更新");

        if let Err(e) = self.store.persist(&candidate).await {
            self.state.send_replace(old);
            tracing::error!(
                "[ConfigStore] 保存配置失败，已回滚: {}",
                sanitize_log_message(&e.to_string())
            );
            return Err(ApplyError::Persist(e));
        }

        tracing::info!("[ConfigStore] 配置已保存");

        if !self.reconcile {
            return Ok(candidate);
        }

        match self.store.load().await {
            Ok(authoritative) => {
                self.state.send_replace(authoritative.clone());
                Ok(authoritative)
            }
            Err(e) => {
                // 已提交成功，保留乐观结果
                tracing::warn!(
                    "[ConfigStore] 提交后重新加载失败，保留本地配置: {}",
                    sanitize_log_message(&e.to_string())
                );
                Ok(candidate)
            }
        }
    }
}
