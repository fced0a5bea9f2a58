//! 映射规则
//!
//! 提供模型映射规则集定义和匹配功能

use super::pattern::{validate_target, Pattern, ValidationError};
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// 映射规则 - 定义模型模式到目标模型的映射
///
/// 只能通过 `Rule::new` 构造，持有的模式和目标总是合法的
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Rule {
    /// 模型模式（精确或前缀通配）
    pattern: String,
    /// 目标模型
    target: String,
}

impl Rule {
    /// 创建并校验映射规则
    pub fn new(pattern: &str, target: &str) -> Result<Self, ValidationError> {
        Pattern::parse(pattern)?;
        validate_target(pattern, target)?;
        Ok(Self::from_validated(pattern, target))
    }

    /// 由已校验过的数据（规则集内已有条目、内置表）构造
    pub(crate) fn from_validated(pattern: &str, target: &str) -> Self {
        Self {
            pattern: pattern.to_string(),
            target: target.to_string(),
        }
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    /// 检查是否为精确匹配规则
    pub fn is_exact(&self) -> bool {
        Pattern::classify(&self.pattern).is_exact()
    }

    /// 检查模型是否匹配此规则
    pub fn matches(&self, model: &str) -> bool {
        Pattern::classify(&self.pattern).matches(model)
    }
}

/// 匹配方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    /// 精确匹配
    Exact,
    /// 前缀通配匹配
    Wildcard,
    /// 模型家族默认值（仅 z.ai 命名空间）
    FamilyDefault,
}

/// 单条匹配结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleMatch<'a> {
    /// 命中的模式
    pub pattern: &'a str,
    /// 目标模型
    pub target: &'a str,
    /// 匹配方式
    pub kind: MatchKind,
}

/// 规则集 - 模式到目标模型的映射
///
/// 模式唯一；插入已存在的模式会覆盖目标并移到插入顺序末尾。
/// 插入顺序只用于同等具体程度时的决胜（后插入者胜）。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleSet {
    rules: IndexMap<String, String>,
}

impl RuleSet {
    /// 创建空规则集
    pub fn new() -> Self {
        Self::default()
    }

    /// 从 (模式, 目标) 列表创建规则集，遇到非法规则立即返回错误
    pub fn from_pairs<'a, I>(pairs: I) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut set = Self::new();
        for (pattern, target) in pairs {
            set.insert(pattern, target)?;
        }
        Ok(set)
    }

    /// 插入规则
    pub fn insert(&mut self, pattern: &str, target: &str) -> Result<(), ValidationError> {
        let rule = Rule::new(pattern, target)?;
        self.upsert(rule);
        Ok(())
    }

    /// 插入已校验的规则
    ///
    /// 已存在的模式先移除再追加，使其成为最近插入的规则
    pub fn upsert(&mut self, rule: Rule) {
        self.rules.shift_remove(&rule.pattern);
        self.rules.insert(rule.pattern, rule.target);
    }

    /// 移除规则，返回是否存在
    pub fn remove(&mut self, pattern: &str) -> bool {
        self.rules.shift_remove(pattern).is_some()
    }

    /// 获取模式对应的目标
    pub fn get(&self, pattern: &str) -> Option<&str> {
        self.rules.get(pattern).map(String::as_str)
    }

    /// 检查是否存在模式
    pub fn contains(&self, pattern: &str) -> bool {
        self.rules.contains_key(pattern)
    }

    /// 按插入顺序遍历规则
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.rules.iter().map(|(p, t)| (p.as_str(), t.as_str()))
    }

    /// 按插入顺序返回所有规则
    pub fn entries(&self) -> Vec<Rule> {
        self.rules
            .iter()
            .map(|(pattern, target)| Rule::from_validated(pattern, target))
            .collect()
    }

    /// 规则数量
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// 检查是否为空
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// 清空所有规则
    pub fn clear(&mut self) {
        self.rules.clear();
    }

    /// 查找模型的最佳匹配规则
    ///
    /// 按以下优先级匹配：
    /// 1. 精确匹配无条件优先于任何通配符
    /// 2. 通配符中前缀最长者胜
    /// 3. 前缀长度相同时，后插入者胜
    pub fn find_match(&self, model: &str) -> Option<RuleMatch<'_>> {
        if let Some((pattern, target)) = self.rules.get_key_value(model) {
            if Pattern::classify(pattern).is_exact() {
                return Some(RuleMatch {
                    pattern,
                    target,
                    kind: MatchKind::Exact,
                });
            }
        }

        let mut best: Option<(usize, RuleMatch<'_>)> = None;
        for (pattern, target) in &self.rules {
            let Pattern::Prefix(prefix) = Pattern::classify(pattern) else {
                continue;
            };
            if !model.starts_with(prefix) {
                continue;
            }
            // `>=` 让后插入的同长度规则覆盖之前的候选
            if best.as_ref().map_or(true, |(len, _)| prefix.len() >= *len) {
                best = Some((
                    prefix.len(),
                    RuleMatch {
                        pattern,
                        target,
                        kind: MatchKind::Wildcard,
                    },
                ));
            }
        }

        best.map(|(_, found)| found)
    }

    /// 解析模型名，未命中时返回 None（调用方自行回退到原模型名）
    pub fn resolve(&self, model: &str) -> Option<&str> {
        self.find_match(model).map(|found| found.target)
    }
}

/// 解析模型名
pub fn resolve(model: &str, rules: &RuleSet) -> Option<String> {
    rules.resolve(model).map(str::to_string)
}

impl Serialize for RuleSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.rules.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for RuleSet {
    /// 宽松反序列化：非法的历史规则会被跳过并记录警告，不影响整个配置加载
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw: Option<IndexMap<String, String>> = Option::deserialize(deserializer)?;
        let mut set = RuleSet::new();
        for (pattern, target) in raw.unwrap_or_default() {
            if let Err(e) = set.insert(&pattern, &target) {
                tracing::warn!("[ModelMapping] 跳过无效的映射规则 {} -> {}: {}", pattern, target, e);
            }
        }
        Ok(set)
    }
}

impl FromIterator<Rule> for RuleSet {
    fn from_iter<T: IntoIterator<Item = Rule>>(iter: T) -> Self {
        let mut set = RuleSet::new();
        for rule in iter {
            set.upsert(rule);
        }
        set
    }
}


#[cfg(test)]
mod rule_set_tests {
    use super::*;

    fn patterns(set: &RuleSet) -> Vec<&str> {
        set.iter().map(|(p, _)| p).collect()
    }

    #[test]
    fn test_new_rule_set() {
        let set = RuleSet::new();
        assert!(set.is_empty());
        assert_eq!(set.resolve("gpt-4"), None);
    }

    #[test]
    fn test_exact_beats_wildcard() {
        let set = RuleSet::from_pairs([("gpt-4*", "A"), ("gpt-4", "B")]).unwrap();
        assert_eq!(set.resolve("gpt-4"), Some("B"));

        // 插入顺序相反时结果不变
        let set = RuleSet::from_pairs([("gpt-4", "B"), ("gpt-4*", "A")]).unwrap();
        assert_eq!(set.resolve("gpt-4"), Some("B"));
    }

    #[test]
    fn test_exact_beats_longer_wildcard() {
        let set =
            RuleSet::from_pairs([("gpt-4", "exact"), ("gpt-4-turbo-preview*", "wild")]).unwrap();
        assert_eq!(set.resolve("gpt-4"), Some("exact"));
        assert_eq!(set.resolve("gpt-4-turbo-preview-1106"), Some("wild"));
    }

    #[test]
    fn test_longest_prefix_wins() {
        let set = RuleSet::from_pairs([("gpt-4*", "A"), ("gpt-4o*", "B")]).unwrap();
        assert_eq!(set.resolve("gpt-4o-mini"), Some("B"));
        assert_eq!(set.resolve("gpt-4-turbo"), Some("A"));

        let set = RuleSet::from_pairs([("gpt-4o*", "B"), ("gpt-4*", "A")]).unwrap();
        assert_eq!(set.resolve("gpt-4o-mini"), Some("B"));
    }

    #[test]
    fn test_tie_break_last_inserted() {
        let mut set = RuleSet::new();
        set.insert("gpt-4*", "A").unwrap();
        set.insert("gpt-4*", "B").unwrap();
        assert_eq!(set.resolve("gpt-4x"), Some("B"));

        set.insert("gpt-4*", "A").unwrap();
        assert_eq!(set.resolve("gpt-4x"), Some("A"));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_no_match() {
        let set = RuleSet::from_pairs([("gpt-4*", "A")]).unwrap();
        assert_eq!(set.resolve("unknown-model"), None);
        assert_eq!(resolve("unknown-model", &set), None);
        assert_eq!(resolve("gpt-4-0613", &set), Some("A".to_string()));
    }

    #[test]
    fn test_wildcard_key_is_not_exact_match() {
        // 模型名本身以 `*` 结尾时，不应被当成精确匹配
        let set = RuleSet::from_pairs([("gpt-4*", "A")]).unwrap();
        let found = set.find_match("gpt-4*").unwrap();
        assert_eq!(found.kind, MatchKind::Wildcard);
    }

    #[test]
    fn test_find_match_reports_kind() {
        let set = RuleSet::from_pairs([("claude-3-opus-*", "A"), ("claude-3-opus-20240229", "B")])
            .unwrap();

        let exact = set.find_match("claude-3-opus-20240229").unwrap();
        assert_eq!(exact.kind, MatchKind::Exact);
        assert_eq!(exact.pattern, "claude-3-opus-20240229");

        let wildcard = set.find_match("claude-3-opus-latest").unwrap();
        assert_eq!(wildcard.kind, MatchKind::Wildcard);
        assert_eq!(wildcard.pattern, "claude-3-opus-*");
        assert_eq!(wildcard.target, "A");
    }

    #[test]
    fn test_insert_moves_to_end() {
        let mut set = RuleSet::from_pairs([("a*", "1"), ("b*", "2"), ("c*", "3")]).unwrap();
        set.insert("a*", "4").unwrap();

        assert_eq!(patterns(&set), vec!["b*", "c*", "a*"]);
        assert_eq!(set.get("a*"), Some("4"));
    }

    #[test]
    fn test_remove_keeps_order() {
        let mut set = RuleSet::from_pairs([("a*", "1"), ("b*", "2"), ("c*", "3")]).unwrap();

        assert!(set.remove("b*"));
        assert!(!set.remove("b*"));
        assert_eq!(patterns(&set), vec!["a*", "c*"]);
    }

    #[test]
    fn test_invalid_insert_leaves_set_untouched() {
        let mut set = RuleSet::from_pairs([("gpt-4*", "A")]).unwrap();
        let before = set.clone();

        assert!(set.insert("*flash*", "B").is_err());
        assert!(set.insert("gpt-4*", "").is_err());
        assert_eq!(set, before);
        assert_eq!(set.get("gpt-4*"), Some("A"));
    }

    #[test]
    fn test_entries_in_insertion_order() {
        let set = RuleSet::from_pairs([("x*", "A"), ("y", "B")]).unwrap();
        let entries = set.entries();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0], Rule::new("x*", "A").unwrap());
        assert_eq!(entries[1], Rule::new("y", "B").unwrap());
    }

    #[test]
    fn test_serialize_as_object() {
        let set = RuleSet::from_pairs([("gpt-4*", "gemini-3-pro-high"), ("o1-*", "A")]).unwrap();
        let json = serde_json::to_string(&set).unwrap();
        assert_eq!(json, r#"{"gpt-4*":"gemini-3-pro-high","o1-*":"A"}"#);
    }

    #[test]
    fn test_deserialize_skips_invalid_rules() {
        let json = r#"{"gpt-4*":"A","*-preview":"B","":"C","claude-3":" ","o3-*":"D"}"#;
        let set: RuleSet = serde_json::from_str(json).unwrap();

        assert_eq!(patterns(&set), vec!["gpt-4*", "o3-*"]);
    }

    #[test]
    fn test_deserialize_null_as_empty() {
        let set: RuleSet = serde_json::from_str("null").unwrap();
        assert!(set.is_empty());
    }
}
