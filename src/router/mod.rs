//! 模型映射路由模块
//!
//! 将客户端（OpenAI / Anthropic / Gemini 协议）请求的模型名改写为实际后端模型。
//!
//! 模式：
//! - 精确匹配: `gpt-4o` -> `gemini-3-flash`
//! - 前缀通配: `gpt-4*` -> `gemini-3-pro-high`
//!
//! 匹配优先级：
//! - 精确匹配优先于任何通配符
//! - 通配符按前缀长度（最具体者胜）
//! - 同长度时后插入者胜
//!
//! 合并：
//! - 叠加合并，overlay 覆盖同名模式，保留 base 中其它规则

mod merge;
mod pattern;
mod rules;

pub use merge::{merge, merge_layers};
pub use pattern::{Pattern, ValidationError, WILDCARD};
pub use rules::{resolve, MatchKind, Rule, RuleMatch, RuleSet};
