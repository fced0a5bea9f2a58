//! 路由模型
//!
//! 模型映射解析结果的数据结构定义。

use crate::router::{MatchKind, RuleMatch};
use serde::{Deserialize, Serialize};

/// 映射命名空间
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MappingNamespace {
    /// 主映射表 (proxy.custom_mapping)
    Primary,
    /// z.ai 分发器映射表 (proxy.zai)
    Zai,
}

impl MappingNamespace {
    pub fn as_str(&self) -> &'static str {
        match self {
            MappingNamespace::Primary => "primary",
            MappingNamespace::Zai => "zai",
        }
    }
}

impl std::fmt::Display for MappingNamespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 模型解析结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    /// 命中的命名空间
    pub namespace: MappingNamespace,
    /// 目标模型
    pub target: String,
    /// 命中的模式（家族默认值没有模式）
    pub pattern: Option<String>,
    /// 匹配方式
    pub kind: MatchKind,
}

impl Resolution {
    pub(crate) fn from_match(namespace: MappingNamespace, found: RuleMatch<'_>) -> Self {
        Self {
            namespace,
            target: found.target.to_string(),
            pattern: Some(found.pattern.to_string()),
            kind: found.kind,
        }
    }
}

/// 请求分发使用的映射结果：未命中时保留原模型名
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappedModel {
    /// 客户端请求的模型名
    pub requested: String,
    /// 实际使用的模型名
    pub actual: String,
    /// 命中信息，None 表示原样透传
    pub resolution: Option<Resolution>,
}

impl MappedModel {
    /// 根据解析结果生成映射结果
    pub fn new(requested: &str, resolution: Option<Resolution>) -> Self {
        let actual = resolution
            .as_ref()
            .map(|r| r.target.clone())
            .unwrap_or_else(|| requested.to_string());
        Self {
            requested: requested.to_string(),
            actual,
            resolution,
        }
    }

    /// 是否发生了改写
    pub fn is_mapped(&self) -> bool {
        self.resolution.is_some()
    }
}
