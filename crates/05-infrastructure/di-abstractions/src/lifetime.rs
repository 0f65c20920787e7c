//! 生命周期抽象接口

use infrastructure_common::{BuiltObject, LifetimeError};
use std::sync::Arc;

/// 可释放资源
pub trait Disposable: Send + Sync {
    /// 释放资源
    fn dispose(&self) -> anyhow::Result<()>;

    /// 资源描述，用于日志和错误报告
    fn description(&self) -> String {
        std::any::type_name::<Self>().to_string()
    }
}

/// 生命周期资源容器 trait
///
/// 记录构建过程中创建的可释放资源，在所属作用域结束时统一释放
pub trait LifetimeContainer: Send + Sync {
    /// 登记资源
    fn track(&self, resource: Arc<dyn Disposable>);

    /// 移除资源（不释放），返回是否存在
    fn remove(&self, resource: &Arc<dyn Disposable>) -> bool;

    /// 是否包含资源
    fn contains(&self, resource: &Arc<dyn Disposable>) -> bool;

    /// 已登记资源数量
    fn len(&self) -> usize;

    /// 是否为空
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 按登记的逆序释放全部资源
    ///
    /// 单个资源释放失败不影响其余资源；重复调用不产生任何效果。
    fn release_all(&self) -> Result<(), LifetimeError>;
}

/// 生命周期策略
///
/// 决定构建结果是否被保存、保存多久。具体的存储方式由实现决定。
pub trait LifetimePolicy: Send + Sync {
    /// 获取已保存的值
    fn get_value(&self) -> Option<BuiltObject>;

    /// 保存值
    fn set_value(&self, value: BuiltObject);

    /// 移除已保存的值
    fn remove_value(&self);

    /// 尚未保存值时保存 `value`
    ///
    /// 已有值时保留原值并返回它。需要跨线程保持唯一的实现应覆盖此方法，
    /// 让检查和写入在同一把锁内完成。
    fn set_value_if_absent(&self, value: BuiltObject) -> Option<BuiltObject> {
        if let Some(stored) = self.get_value() {
            return Some(stored);
        }
        self.set_value(value);
        None
    }

    /// 值是否只在当前构建树内有效
    fn is_build_scoped(&self) -> bool {
        false
    }

    /// 需要随作用域释放时返回自身
    fn as_disposable(self: Arc<Self>) -> Option<Arc<dyn Disposable>> {
        None
    }
}

/// 比较两个资源引用是否指向同一对象
pub fn same_resource(left: &Arc<dyn Disposable>, right: &Arc<dyn Disposable>) -> bool {
    std::ptr::eq(
        Arc::as_ptr(left) as *const (),
        Arc::as_ptr(right) as *const (),
    )
}
