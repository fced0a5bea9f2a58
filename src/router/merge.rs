//! 规则集合并
//!
//! 叠加合并：overlay 中的每条规则按插入语义写入 base 的副本，
//! 同名模式以 overlay 为准并采用 overlay 的相对顺序，仅存在于 base 中的规则原样保留。

use super::rules::{Rule, RuleSet};

/// 合并两个规则集
pub fn merge(base: &RuleSet, overlay: &RuleSet) -> RuleSet {
    let mut merged = base.clone();
    for (pattern, target) in overlay.iter() {
        merged.upsert(Rule::from_validated(pattern, target));
    }
    merged
}

/// 按顺序合并多层规则集，后面的层覆盖前面的层
pub fn merge_layers<'a, I>(layers: I) -> RuleSet
where
    I: IntoIterator<Item = &'a RuleSet>,
{
    layers
        .into_iter()
        .fold(RuleSet::new(), |acc, layer| merge(&acc, layer))
}
