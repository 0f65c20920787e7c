//! 构建上下文抽象接口
//!
//! 一次构建操作的可变工作记录，贯穿整条策略链

use crate::lifetime::LifetimeContainer;
use crate::policy::PolicyStore;
use crate::recovery::RecoveryStack;
use crate::resolver::{DependencyResolverPolicy, ResolverOverride};
use infrastructure_common::{BuildError, BuildKey, BuiltObject};
use std::sync::Arc;

/// 子构建的定制回调
pub type ChildCustomization<'a> = &'a mut dyn FnMut(&mut dyn BuilderContext) -> Result<(), BuildError>;

/// 构建上下文 trait
///
/// 同一棵构建树内的所有上下文共享持久策略表、生命周期容器、恢复栈和策略链
pub trait BuilderContext {
    /// 当前构建键，策略可以重定向
    fn build_key(&self) -> &BuildKey;

    /// 重定向构建键
    fn set_build_key(&mut self, build_key: BuildKey);

    /// 创建上下文时的构建键，之后不再变化
    fn original_build_key(&self) -> &BuildKey;

    /// 已有实例或构建结果
    fn existing(&self) -> Option<&BuiltObject>;

    /// 设置构建结果
    fn set_existing(&mut self, existing: Option<BuiltObject>);

    /// 构建是否已完成，完成后剩余策略不再执行
    fn build_complete(&self) -> bool;

    /// 标记构建完成状态
    fn set_build_complete(&mut self, complete: bool);

    /// 当前操作描述，仅用于诊断
    fn current_operation(&self) -> Option<&str>;

    /// 设置当前操作描述
    fn set_current_operation(&mut self, operation: Option<String>);

    /// 操作级策略表（可写，构建结束即消失）
    fn policies(&self) -> &dyn PolicyStore;

    /// 容器级持久策略表
    fn persistent_policies(&self) -> &dyn PolicyStore;

    /// 生命周期资源容器
    fn lifetime(&self) -> &dyn LifetimeContainer;

    /// 恢复栈
    fn recovery_stack(&self) -> &dyn RecoveryStack;

    /// 从根到当前上下文正在进行的构建键
    fn key_chain(&self) -> Vec<BuildKey>;

    /// 追加解析覆盖
    fn add_resolver_override(&mut self, resolver_override: Arc<dyn ResolverOverride>);

    /// 查询解析覆盖
    fn get_overridden_resolver(&self, dependency: &BuildKey) -> Option<Arc<dyn DependencyResolverPolicy>>;

    /// 在当前构建树上为新构建键执行一次子构建
    fn new_build_up(&mut self, build_key: BuildKey) -> Result<BuiltObject, BuildError>;

    /// 执行子构建，子上下文带有一层只在该子构建期间生效的策略
    fn new_build_up_with(
        &mut self,
        build_key: BuildKey,
        customize: ChildCustomization<'_>,
    ) -> Result<BuiltObject, BuildError>;

    /// 解析依赖：先查询解析覆盖，再执行子构建
    fn resolve_dependency(&mut self, dependency: BuildKey) -> Result<BuiltObject, BuildError>;
}

impl dyn BuilderContext + '_ {
    /// 解析强类型依赖
    pub fn resolve<T>(&mut self, name: Option<&str>) -> Result<Arc<T>, BuildError>
    where
        T: Send + Sync + 'static,
    {
        let key = BuildKey::of::<T>().with_name(name.map(str::to_string));
        self.resolve_dependency(key.clone())?
            .downcast::<T>()
            .map_err(|_| BuildError::type_mismatch::<T>(key))
    }

    /// 以强类型获取构建结果
    pub fn existing_as<T>(&self) -> Option<Arc<T>>
    where
        T: Send + Sync + 'static,
    {
        self.existing()
            .cloned()
            .and_then(|existing| existing.downcast::<T>().ok())
    }
}
