//! 策略表抽象接口
//!
//! 策略按 (策略种类, 构建键) 存放。策略种类就是策略 trait 对象的类型，
//! 例如 `dyn BuildPlanPolicy`。

use crate::context::BuilderContext;
use infrastructure_common::{BuildError, BuildKey};
use std::any::{Any, TypeId};
use std::sync::Arc;

/// 类型擦除后的策略对象，内部保存的是 `Arc<P>`
pub type PolicyObject = Arc<dyn Any + Send + Sync>;

/// 策略表 trait
///
/// 对象安全的底层接口。`key` 为 `None` 表示该策略种类的默认策略。
pub trait PolicyStore: Send + Sync {
    /// 查找策略；`local_only` 为 false 时会继续查找内层策略表
    fn get_raw(&self, kind: TypeId, key: Option<&BuildKey>, local_only: bool) -> Option<PolicyObject>;

    /// 写入策略
    fn set_raw(&self, kind: TypeId, key: Option<BuildKey>, policy: PolicyObject);

    /// 删除本层的策略，返回是否存在
    fn clear_raw(&self, kind: TypeId, key: Option<&BuildKey>) -> bool;

    /// 清空本层所有策略
    fn clear_all(&self);
}

/// 策略表的泛型便捷方法
///
/// 查找顺序：精确键（逐层） → 去掉名称的通用键（逐层） → 默认策略（逐层）
pub trait PolicyStoreExt: PolicyStore {
    /// 按优先级查找策略
    fn get<P>(&self, key: &BuildKey) -> Option<Arc<P>>
    where
        P: ?Sized + Send + Sync + 'static,
    {
        self.get_no_default::<P>(key, false)
            .or_else(|| {
                key.name()
                    .and_then(|_| self.get_no_default::<P>(&key.without_name(), false))
            })
            .or_else(|| self.get_default::<P>())
    }

    /// 仅按精确键查找
    fn get_no_default<P>(&self, key: &BuildKey, local_only: bool) -> Option<Arc<P>>
    where
        P: ?Sized + Send + Sync + 'static,
    {
        self.get_raw(TypeId::of::<P>(), Some(key), local_only)
            .and_then(|policy| policy.downcast_ref::<Arc<P>>().cloned())
    }

    /// 查找默认策略
    fn get_default<P>(&self) -> Option<Arc<P>>
    where
        P: ?Sized + Send + Sync + 'static,
    {
        self.get_raw(TypeId::of::<P>(), None, false)
            .and_then(|policy| policy.downcast_ref::<Arc<P>>().cloned())
    }

    /// 写入策略
    fn set<P>(&self, key: BuildKey, policy: Arc<P>)
    where
        P: ?Sized + Send + Sync + 'static,
    {
        self.set_raw(TypeId::of::<P>(), Some(key), Arc::new(policy));
    }

    /// 写入默认策略
    fn set_default<P>(&self, policy: Arc<P>)
    where
        P: ?Sized + Send + Sync + 'static,
    {
        self.set_raw(TypeId::of::<P>(), None, Arc::new(policy));
    }

    /// 删除策略
    fn clear<P>(&self, key: &BuildKey) -> bool
    where
        P: ?Sized + Send + Sync + 'static,
    {
        self.clear_raw(TypeId::of::<P>(), Some(key))
    }

    /// 删除默认策略
    fn clear_default<P>(&self) -> bool
    where
        P: ?Sized + Send + Sync + 'static,
    {
        self.clear_raw(TypeId::of::<P>(), None)
    }
}

impl<S: PolicyStore + ?Sized> PolicyStoreExt for S {}

/// 构建计划策略
///
/// 负责真正创建对象，并通过 [`BuilderContext::set_existing`] 交出结果
pub trait BuildPlanPolicy: Send + Sync {
    /// 执行构建计划
    fn build_up(&self, context: &mut dyn BuilderContext) -> Result<(), BuildError>;
}

/// 构建键映射策略
///
/// 把一个逻辑目标重定向到另一个，例如接口 -> 实现
pub trait BuildKeyMappingPolicy: Send + Sync {
    /// 映射构建键
    fn map(&self, build_key: &BuildKey) -> BuildKey;
}

/// 注入指令
///
/// 外部配置翻译出的注入指令，负责把自身转换为策略
pub trait InjectionMember: Send + Sync {
    /// 为指定构建键写入策略
    fn add_policies(&self, build_key: &BuildKey, policies: &dyn PolicyStore);
}
