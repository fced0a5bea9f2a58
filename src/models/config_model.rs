//! 配置模型
//!
//! 应用配置的强类型聚合。默认值只在构造 / 反序列化时提供一次，
//! JSON 字段名与已存储的配置保持兼容。

use crate::models::route_model::{MappingNamespace, Resolution};
use crate::router::{MatchKind, RuleSet};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// 应用配置（权威配置的完整对象）
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_theme")]
    pub theme: String,
    #[serde(default = "default_true")]
    pub auto_refresh: bool,
    /// 分钟
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval: i32,
    #[serde(default)]
    pub proxy: ProxyConfig,

    /// 未识别的字段原样保留，提交时不会丢失
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AppConfig {
    pub fn new() -> Self {
        Self {
            language: default_language(),
            theme: default_theme(),
            auto_refresh: true,
            refresh_interval: default_refresh_interval(),
            proxy: ProxyConfig::default(),
            extra: Map::new(),
        }
    }

    /// 获取指定命名空间的规则集
    pub fn mapping(&self, namespace: MappingNamespace) -> &RuleSet {
        match namespace {
            MappingNamespace::Primary => &self.proxy.custom_mapping,
            MappingNamespace::Zai => &self.proxy.zai.model_mapping,
        }
    }

    pub fn mapping_mut(&mut self, namespace: MappingNamespace) -> &mut RuleSet {
        match namespace {
            MappingNamespace::Primary => &mut self.proxy.custom_mapping,
            MappingNamespace::Zai => &mut self.proxy.zai.model_mapping,
        }
    }

    /// 在指定命名空间中解析模型名
    pub fn resolve_model(&self, namespace: MappingNamespace, model: &str) -> Option<Resolution> {
        match namespace {
            MappingNamespace::Primary => self.proxy.resolve_model(model),
            MappingNamespace::Zai => self.proxy.zai.resolve_model(model),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// 认证策略
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProxyAuthMode {
    Off,
    Strict,
    AllExceptHealth,
    #[default]
    Auto,
}

/// 账号调度模式
///
/// 调度本身不在本 crate 内实现，这里只保存用户选择
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum SchedulingMode {
    CacheFirst,
    #[default]
    Balance,
    PerformanceFirst,
}

/// 账号调度配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SchedulingConfig {
    #[serde(default)]
    pub mode: SchedulingMode,
    #[serde(default = "default_max_wait_seconds")]
    pub max_wait_seconds: u64,
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            mode: SchedulingMode::default(),
            max_wait_seconds: default_max_wait_seconds(),
        }
    }
}

/// 上游代理配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct UpstreamProxyConfig {
    /// 是否启用
    #[serde(default)]
    pub enabled: bool,
    /// 代理地址 (http://, https://, socks5://)
    #[serde(default)]
    pub url: String,
}

/// 反代服务配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProxyConfig {
    /// 是否启用反代服务
    #[serde(default)]
    pub enabled: bool,

    /// 是否允许局域网访问
    /// - false: 仅本机访问 127.0.0.1（默认）
    /// - true: 允许局域网访问 0.0.0.0
    #[serde(default)]
    pub allow_lan_access: bool,

    #[serde(default)]
    pub auth_mode: ProxyAuthMode,

    /// 监听端口
    #[serde(default = "default_port")]
    pub port: u16,

    /// API 密钥
    #[serde(default = "generate_api_key")]
    pub api_key: String,

    /// 管理后台密码（未设置时使用 api_key）
    #[serde(default)]
    pub admin_password: Option<String>,

    /// 是否自动启动
    #[serde(default)]
    pub auto_start: bool,

    /// 自定义模型映射表（主命名空间）
    #[serde(default)]
    pub custom_mapping: RuleSet,

    /// API 请求超时时间(秒)
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,

    /// 是否开启请求日志记录
    #[serde(default = "default_true")]
    pub enable_logging: bool,

    #[serde(default)]
    pub upstream_proxy: UpstreamProxyConfig,

    /// z.ai 分发器配置（次级映射命名空间）
    #[serde(default)]
    pub zai: ZaiConfig,

    #[serde(default)]
    pub scheduling: SchedulingConfig,

    /// 固定账号模式的账号ID，None 表示轮询
    #[serde(default)]
    pub preferred_account_id: Option<String>,

    /// 未识别的字段（如 experimental、perplexity），原样保留，提交时不会丢失
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            allow_lan_access: false,
            auth_mode: ProxyAuthMode::default(),
            port: default_port(),
            api_key: generate_api_key(),
            admin_password: None,
            auto_start: false,
            custom_mapping: RuleSet::new(),
            request_timeout: default_request_timeout(),
            enable_logging: true,
            upstream_proxy: UpstreamProxyConfig::default(),
            zai: ZaiConfig::default(),
            scheduling: SchedulingConfig::default(),
            preferred_account_id: None,
            extra: Map::new(),
        }
    }
}

impl ProxyConfig {
    /// 获取实际的监听地址
    pub fn bind_address(&self) -> &'static str {
        if self.allow_lan_access {
            "0.0.0.0"
        } else {
            "127.0.0.1"
        }
    }

    /// 解析 Auto 认证策略：允许局域网访问时只放行健康检查，否则不认证
    pub fn effective_auth_mode(&self) -> ProxyAuthMode {
        match self.auth_mode {
            ProxyAuthMode::Auto if self.allow_lan_access => ProxyAuthMode::AllExceptHealth,
            ProxyAuthMode::Auto => ProxyAuthMode::Off,
            other => other,
        }
    }

    /// 在主命名空间中解析模型名
    pub fn resolve_model(&self, model: &str) -> Option<Resolution> {
        self.custom_mapping
            .find_match(model)
            .map(|found| Resolution::from_match(MappingNamespace::Primary, found))
    }
}

/// z.ai 分发模式
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ZaiDispatchMode {
    /// 不使用 z.ai
    #[default]
    Off,
    /// 所有 Anthropic 协议请求都走 z.ai
    Exclusive,
    /// z.ai 作为共享池中的一个额外槽位
    Pooled,
    /// 仅在 Google 账号池不可用时使用
    Fallback,
}

/// 模型家族
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelFamily {
    Opus,
    Sonnet,
    Haiku,
}

impl ModelFamily {
    pub const ALL: [ModelFamily; 3] = [ModelFamily::Opus, ModelFamily::Sonnet, ModelFamily::Haiku];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelFamily::Opus => "opus",
            ModelFamily::Sonnet => "sonnet",
            ModelFamily::Haiku => "haiku",
        }
    }

    /// 从 Claude 模型名识别家族，非 Claude 模型返回 None
    pub fn detect(model: &str) -> Option<Self> {
        let lower = model.to_ascii_lowercase();
        if !lower.starts_with("claude") {
            return None;
        }
        Self::ALL
            .into_iter()
            .find(|family| lower.contains(family.as_str()))
    }
}

impl std::str::FromStr for ModelFamily {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "opus" => Ok(ModelFamily::Opus),
            "sonnet" => Ok(ModelFamily::Sonnet),
            "haiku" => Ok(ModelFamily::Haiku),
            _ => Err(format!("Invalid model family: {s}")),
        }
    }
}

impl std::fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 各模型家族的默认目标（直接键值，不参与通配匹配）
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ZaiModelDefaults {
    #[serde(default = "default_zai_opus_model")]
    pub opus: String,
    #[serde(default = "default_zai_sonnet_model")]
    pub sonnet: String,
    #[serde(default = "default_zai_haiku_model")]
    pub haiku: String,
}

impl Default for ZaiModelDefaults {
    fn default() -> Self {
        Self {
            opus: default_zai_opus_model(),
            sonnet: default_zai_sonnet_model(),
            haiku: default_zai_haiku_model(),
        }
    }
}

impl ZaiModelDefaults {
    pub fn get(&self, family: ModelFamily) -> &str {
        match family {
            ModelFamily::Opus => &self.opus,
            ModelFamily::Sonnet => &self.sonnet,
            ModelFamily::Haiku => &self.haiku,
        }
    }

    pub fn set(&mut self, family: ModelFamily, model: String) {
        match family {
            ModelFamily::Opus => self.opus = model,
            ModelFamily::Sonnet => self.sonnet = model,
            ModelFamily::Haiku => self.haiku = model,
        }
    }
}

/// z.ai 配置（Anthropic 兼容）
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ZaiConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_zai_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub dispatch_mode: ZaiDispatchMode,
    /// 按模型覆盖的映射，与主命名空间互不影响
    #[serde(default)]
    pub model_mapping: RuleSet,
    #[serde(default)]
    pub models: ZaiModelDefaults,

    /// 未识别的字段（如 mcp），原样保留，提交时不会丢失
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for ZaiConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: default_zai_base_url(),
            api_key: String::new(),
            dispatch_mode: ZaiDispatchMode::Off,
            model_mapping: RuleSet::new(),
            models: ZaiModelDefaults::default(),
            extra: Map::new(),
        }
    }
}

impl ZaiConfig {
    /// 在 z.ai 命名空间中解析模型名
    ///
    /// 先匹配 model_mapping，未命中时对 Claude 模型回退到家族默认值
    pub fn resolve_model(&self, model: &str) -> Option<Resolution> {
        if let Some(found) = self.model_mapping.find_match(model) {
            return Some(Resolution::from_match(MappingNamespace::Zai, found));
        }

        ModelFamily::detect(model).map(|family| Resolution {
            namespace: MappingNamespace::Zai,
            target: self.models.get(family).to_string(),
            pattern: None,
            kind: MatchKind::FamilyDefault,
        })
    }
}

fn default_language() -> String {
    "zh".to_string()
}

fn default_theme() -> String {
    "system".to_string()
}

fn default_refresh_interval() -> i32 {
    15
}

fn default_true() -> bool {
    true
}

fn default_port() -> u16 {
    8045
}

fn generate_api_key() -> String {
    format!("sk-{}", uuid::Uuid::new_v4().simple())
}

fn default_request_timeout() -> u64 {
    120
}

fn default_max_wait_seconds() -> u64 {
    60
}

fn default_zai_base_url() -> String {
    "https://api.z.ai/api/anthropic".to_string()
}

fn default_zai_opus_model() -> String {
    "glm-4.7".to_string()
}

fn default_zai_sonnet_model() -> String {
    "glm-4.7".to_string()
}

fn default_zai_haiku_model() -> String {
    "glm-4.5-air".to_string()
}
