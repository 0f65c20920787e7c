//! 依赖解析抽象接口
//!
//! 解析覆盖在默认的策略驱动解析之前被查询，调用方可以借此为某一次构建
//! 提供一次性的替代值。

use crate::context::BuilderContext;
use infrastructure_common::{BuildError, BuildKey, BuiltObject};
use std::sync::Arc;

/// 依赖解析策略
pub trait DependencyResolverPolicy: Send + Sync {
    /// 产出依赖值
    fn resolve(&self, context: &mut dyn BuilderContext) -> Result<BuiltObject, BuildError>;
}

/// 解析覆盖 trait
pub trait ResolverOverride: Send + Sync {
    /// 为依赖返回替代解析器，不处理该依赖时返回 `None`
    fn get_resolver(
        &self,
        context: &dyn BuilderContext,
        dependency: &BuildKey,
    ) -> Option<Arc<dyn DependencyResolverPolicy>>;
}
