//! 匹配规则

use di_abstractions::MatchingRule;
use infrastructure_common::{BuildKey, TypeInfo};
use std::sync::Arc;

/// 按目标类型匹配
#[derive(Debug, Clone)]
pub struct TypeMatchingRule {
    types: Vec<TypeInfo>,
}

impl TypeMatchingRule {
    /// 匹配类型 `T`
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            types: vec![TypeInfo::of::<T>()],
        }
    }

    /// 追加可匹配的类型
    pub fn or<T: ?Sized + 'static>(mut self) -> Self {
        self.types.push(TypeInfo::of::<T>());
        self
    }
}

impl MatchingRule for TypeMatchingRule {
    fn matches(&self, target: &BuildKey) -> bool {
        self.types.contains(&target.type_info())
    }
}

/// 按目标名称匹配
#[derive(Debug, Clone)]
pub struct NameMatchingRule {
    name: String,
}

impl NameMatchingRule {
    /// 匹配名称为 `name` 的目标
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl MatchingRule for NameMatchingRule {
    fn matches(&self, target: &BuildKey) -> bool {
        target.name() == Some(self.name.as_str())
    }
}

/// 自定义谓词匹配
#[derive(Clone)]
pub struct PredicateMatchingRule {
    predicate: Arc<dyn Fn(&BuildKey) -> bool + Send + Sync>,
}

impl PredicateMatchingRule {
    /// 使用谓词创建规则
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&BuildKey) -> bool + Send + Sync + 'static,
    {
        Self {
            predicate: Arc::new(predicate),
        }
    }
}

impl MatchingRule for PredicateMatchingRule {
    fn matches(&self, target: &BuildKey) -> bool {
        (self.predicate)(target)
    }
}
