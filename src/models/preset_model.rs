use crate::router::RuleSet;
use serde::{Deserialize, Serialize};

/// 映射预设
///
/// 内置预设与用户预设只通过 id 区分，不保存类型字段
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Preset {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// 已存储预设使用 `mappings` 字段名，需保持不变
    #[serde(rename = "mappings", alias = "rules", default)]
    pub rules: RuleSet,
}

impl Preset {
    pub fn new(id: &str, name: &str, description: &str, rules: RuleSet) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            rules,
        }
    }
}
