//! 分层策略表实现

use dashmap::DashMap;
use di_abstractions::{PolicyObject, PolicyStore};
use infrastructure_common::BuildKey;
use std::any::TypeId;
use std::sync::Arc;

type PolicyKey = (TypeId, Option<BuildKey>);

/// 策略表
///
/// 可以叠加在内层策略表之上：本层找不到时继续查找内层。
/// 容器级持久策略表是最内层，每棵构建树在其上叠加一层操作级策略表。
/// 读写都可以并发进行。
#[derive(Default)]
pub struct PolicyList {
    policies: DashMap<PolicyKey, PolicyObject>,
    inner: Option<Arc<PolicyList>>,
}

impl PolicyList {
    /// 创建独立的策略表
    pub fn new() -> Self {
        Self::default()
    }

    /// 创建叠加在 `inner` 之上的策略表
    pub fn with_inner(inner: Arc<PolicyList>) -> Self {
        Self {
            policies: DashMap::new(),
            inner: Some(inner),
        }
    }

    /// 内层策略表
    pub fn inner(&self) -> Option<&Arc<PolicyList>> {
        self.inner.as_ref()
    }

    /// 本层策略数量
    pub fn len(&self) -> usize {
        self.policies.len()
    }

    /// 本层是否为空
    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }
}

impl PolicyStore for PolicyList {
    fn get_raw(&self, kind: TypeId, key: Option<&BuildKey>, local_only: bool) -> Option<PolicyObject> {
        if let Some(policy) = self.policies.get(&(kind, key.cloned())) {
            return Some(policy.value().clone());
        }
        if local_only {
            return None;
        }
        self.inner
            .as_ref()
            .and_then(|inner| inner.get_raw(kind, key, false))
    }

    fn set_raw(&self, kind: TypeId, key: Option<BuildKey>, policy: PolicyObject) {
        self.policies.insert((kind, key), policy);
    }

    fn clear_raw(&self, kind: TypeId, key: Option<&BuildKey>) -> bool {
        self.policies.remove(&(kind, key.cloned())).is_some()
    }

    fn clear_all(&self) {
        self.policies.clear();
    }
}

impl std::fmt::Debug for PolicyList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolicyList")
            .field("len", &self.policies.len())
            .field("has_inner", &self.inner.is_some())
            .finish()
    }
}
