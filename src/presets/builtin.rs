//! 内置预设
//!
//! 固定 id、固定内容，进程生命周期内存在，不可删除或修改

use crate::models::Preset;
use crate::router::{Rule, RuleSet};

/// 默认选中的预设
pub const DEFAULT_PRESET_ID: &str = "default";

/// 内置预设 id（按展示顺序）
pub const BUILTIN_PRESET_IDS: [&str; 4] = ["default", "performance", "cost-effective", "balanced"];

/// 用户预设 id 前缀，与内置 id 不相交
pub const USER_PRESET_ID_PREFIX: &str = "custom_";

const DEFAULT_MAPPINGS: &[(&str, &str)] = &[
    ("gpt-4*", "gemini-3-pro-high"),
    ("gpt-4o*", "gemini-3-flash"),
    ("gpt-3.5*", "gemini-2.5-flash"),
    ("o1-*", "gemini-3-pro-high"),
    ("o3-*", "gemini-3-pro-high"),
    ("claude-3-5-sonnet-*", "claude-sonnet-4-5"),
    ("claude-3-opus-*", "claude-opus-4-6-thinking"),
    ("claude-opus-4-6*", "claude-opus-4-6-thinking"),
    ("claude-haiku-*", "gemini-2.5-flash"),
    ("claude-3-haiku-*", "gemini-2.5-flash"),
];

const PERFORMANCE_MAPPINGS: &[(&str, &str)] = &[
    ("gpt-4*", "claude-opus-4-6-thinking"),
    ("gpt-4o*", "claude-sonnet-4-5"),
    ("gpt-3.5*", "gemini-3-flash"),
    ("o1-*", "claude-opus-4-6-thinking"),
    ("o3-*", "claude-opus-4-6-thinking"),
    ("claude-3-5-sonnet-*", "claude-sonnet-4-5"),
    ("claude-3-opus-*", "claude-opus-4-6-thinking"),
    ("claude-opus-4-6*", "claude-opus-4-6-thinking"),
    ("claude-haiku-*", "claude-sonnet-4-5"),
    ("claude-3-haiku-*", "claude-sonnet-4-5"),
];

const COST_EFFECTIVE_MAPPINGS: &[(&str, &str)] = &[
    ("gpt-4*", "gemini-3-flash"),
    ("gpt-4o*", "gemini-2.5-flash"),
    ("gpt-3.5*", "gemini-2.5-flash"),
    ("o1-*", "gemini-3-flash"),
    ("o3-*", "gemini-3-flash"),
    ("claude-3-5-sonnet-*", "gemini-3-flash"),
    ("claude-3-opus-*", "gemini-3-flash"),
    // 所有 opus 4 都降到 flash
    ("claude-opus-4-*", "gemini-3-flash"),
    ("claude-haiku-*", "gemini-2.5-flash"),
    ("claude-3-haiku-*", "gemini-2.5-flash"),
];

const BALANCED_MAPPINGS: &[(&str, &str)] = &[
    ("gpt-4*", "gemini-3-pro-high"),
    ("gpt-4o*", "gemini-3-flash"),
    ("gpt-3.5*", "gemini-2.5-flash"),
    ("o1-*", "claude-sonnet-4-5"),
    ("o3-*", "claude-sonnet-4-5"),
    ("claude-3-5-sonnet-*", "claude-sonnet-4-5"),
    ("claude-3-opus-*", "gemini-3-pro-high"),
    ("claude-opus-4-5*", "gemini-3-pro-high"),
    ("claude-opus-4-6*", "claude-opus-4-6-thinking"),
    ("claude-haiku-*", "gemini-2.5-flash"),
    ("claude-3-haiku-*", "gemini-2.5-flash"),
];

fn table(pairs: &[(&str, &str)]) -> RuleSet {
    pairs
        .iter()
        .map(|(pattern, target)| Rule::from_validated(pattern, target))
        .collect()
}

/// 检查 id 是否属于内置预设
pub fn is_builtin(id: &str) -> bool {
    BUILTIN_PRESET_IDS.contains(&id)
}

/// 构造全部内置预设
pub fn builtin_presets() -> Vec<Preset> {
    vec![
        Preset::new(
            "default",
            "Default",
            "Route OpenAI and legacy Claude models to Gemini 3, keep Claude 4.x on Claude",
            table(DEFAULT_MAPPINGS),
        ),
        Preset::new(
            "performance",
            "Performance First",
            "Send everything to the strongest Claude models",
            table(PERFORMANCE_MAPPINGS),
        ),
        Preset::new(
            "cost-effective",
            "Cost Effective",
            "Prefer Gemini Flash models to save quota",
            table(COST_EFFECTIVE_MAPPINGS),
        ),
        Preset::new(
            "balanced",
            "Balanced",
            "Gemini for chat models, Claude Sonnet for reasoning models",
            table(BALANCED_MAPPINGS),
        ),
    ]
}
