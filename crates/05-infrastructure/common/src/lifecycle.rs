//! 组件生命周期类型

use serde::{Deserialize, Serialize};

/// 组件生命周期类型
///
/// 由生命周期管理器工厂转换为具体的生命周期策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifetime {
    /// 单例模式 - 容器作用域内只创建一个实例
    Singleton,
    /// 作用域模式 - 同一棵构建树内共享实例
    Scoped,
    /// 瞬时模式 - 每次请求都创建新实例
    #[default]
    Transient,
}

impl Lifetime {
    /// 实例是否会在构建之间保留
    pub fn is_cached(&self) -> bool {
        !matches!(self, Self::Transient)
    }
}
