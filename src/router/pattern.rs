//! 映射模式
//!
//! 模式只有两种形态：
//! - 精确匹配: `gpt-4o`
//! - 前缀通配: `gpt-4*`（`*` 只能作为最后一个字符出现，且前缀不能为空）

use thiserror::Error;

/// 通配符
pub const WILDCARD: char = '*';

/// 规则校验错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// 模式为空（或只有通配符）
    #[error("映射模式不能为空")]
    EmptyPattern,

    /// `*` 出现在末尾以外的位置
    #[error("通配符位置无效: {pattern}（`*` 只能出现在末尾）")]
    InvalidWildcardPosition { pattern: String },

    /// 目标模型为空
    #[error("模式 {pattern} 的目标模型不能为空")]
    EmptyTarget { pattern: String },
}

/// 已校验的模式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pattern<'a> {
    /// 精确匹配
    Exact(&'a str),
    /// 前缀通配，保存去掉 `*` 后的前缀
    Prefix(&'a str),
}

impl<'a> Pattern<'a> {
    /// 解析并校验模式
    pub fn parse(raw: &'a str) -> Result<Self, ValidationError> {
        if raw.trim().is_empty() {
            return Err(ValidationError::EmptyPattern);
        }

        match raw.find(WILDCARD) {
            None => Ok(Pattern::Exact(raw)),
            Some(pos) if pos + WILDCARD.len_utf8() == raw.len() => {
                let prefix = &raw[..pos];
                if prefix.trim().is_empty() {
                    return Err(ValidationError::EmptyPattern);
                }
                Ok(Pattern::Prefix(prefix))
            }
            Some(_) => Err(ValidationError::InvalidWildcardPosition {
                pattern: raw.to_string(),
            }),
        }
    }

    /// 对已知合法的模式分类（不做校验）
    pub(crate) fn classify(raw: &'a str) -> Self {
        match raw.strip_suffix(WILDCARD) {
            Some(prefix) => Pattern::Prefix(prefix),
            None => Pattern::Exact(raw),
        }
    }

    /// 是否为精确匹配模式
    pub fn is_exact(&self) -> bool {
        matches!(self, Pattern::Exact(_))
    }

    /// 检查模型名是否匹配此模式
    pub fn matches(&self, model: &str) -> bool {
        match self {
            Pattern::Exact(exact) => *exact == model,
            Pattern::Prefix(prefix) => model.starts_with(prefix),
        }
    }
}

/// 校验目标模型名
pub(crate) fn validate_target(pattern: &str, target: &str) -> Result<(), ValidationError> {
    if target.trim().is_empty() {
        return Err(ValidationError::EmptyTarget {
            pattern: pattern.to_string(),
        });
    }
    Ok(())
}
