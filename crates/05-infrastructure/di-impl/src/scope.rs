//! 容器作用域
//!
//! 持有一组配置好的持久策略、生命周期资源容器和策略链，
//! 每次顶层构建请求在这里创建一棵新的构建树。

use crate::context::BuildContext;
use crate::injection::{BuildKeyMapping, FactoryBuildPlan};
use crate::interception::{
    HandlerPipeline, InterceptedInstance, PipelineManager, PolicyDefinition, PolicyDefinitionRegistry,
};
use crate::lifetime_container::{lifetime_policy_for, ContainerControlledLifetime, LifetimeContainerImpl};
use crate::policy_list::PolicyList;
use crate::strategies::{default_strategy_chain, InterceptOnBuild};
use crate::strategy_chain::StrategyChain;
use chrono::{DateTime, Utc};
use di_abstractions::{
    BuildKeyMappingPolicy, BuildPlanPolicy, BuilderContext, CallHandler, InjectionMember,
    LifetimeContainer, LifetimePolicy, PolicyStoreExt, RecoveryStack, ResolverOverride,
};
use infrastructure_common::{
    BuildError, BuildFailure, BuildKey, BuiltObject, ConfigResult, ContainerConfig, Lifetime,
    LifetimeError,
};
use std::sync::Arc;
use tracing::{debug, debug_span, info, warn};
use uuid::Uuid;

/// 容器作用域
///
/// 注册和构建可以在多个线程上同时进行：持久策略表是并发映射，
/// 每次构建拥有自己的上下文、操作级策略层和恢复栈。
pub struct ContainerScope {
    id: Uuid,
    created_at: DateTime<Utc>,
    config: Arc<ContainerConfig>,
    persistent_policies: Arc<PolicyList>,
    lifetime: Arc<LifetimeContainerImpl>,
    strategies: Arc<StrategyChain>,
    definitions: Arc<PolicyDefinitionRegistry>,
    pipelines: Arc<PipelineManager>,
}

impl ContainerScope {
    /// 使用默认配置创建作用域
    pub fn new() -> Self {
        let config = ContainerConfig::default();
        let strategies = default_strategy_chain(&config);
        Self::assemble(config, strategies)
    }

    /// 使用给定配置创建作用域
    pub fn with_config(config: ContainerConfig) -> ConfigResult<Self> {
        config.validate()?;
        let strategies = default_strategy_chain(&config);
        Ok(Self::assemble(config, strategies))
    }

    /// 使用自定义策略链创建作用域
    pub fn with_strategies(config: ContainerConfig, strategies: StrategyChain) -> ConfigResult<Self> {
        config.validate()?;
        Ok(Self::assemble(config, strategies))
    }

    fn assemble(config: ContainerConfig, strategies: StrategyChain) -> Self {
        let persistent_policies = Arc::new(PolicyList::new());
        let definitions = Arc::new(PolicyDefinitionRegistry::new());
        let pipelines = Arc::new(PipelineManager::new(config.cache_pipelines));
        persistent_policies.set_default(definitions.clone());
        persistent_policies.set_default(pipelines.clone());

        let scope = Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            config: Arc::new(config),
            persistent_policies,
            lifetime: Arc::new(LifetimeContainerImpl::new()),
            strategies: Arc::new(strategies),
            definitions,
            pipelines,
        };
        info!(
            scope = %scope.id,
            strategies = ?scope.strategies,
            "创建容器作用域"
        );
        scope
    }

    /// 作用域标识
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// 创建时间
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// 容器配置
    pub fn config(&self) -> &ContainerConfig {
        &self.config
    }

    /// 持久策略表
    pub fn persistent_policies(&self) -> &PolicyList {
        &self.persistent_policies
    }

    /// 生命周期资源容器
    pub fn lifetime(&self) -> &LifetimeContainerImpl {
        &self.lifetime
    }

    /// 策略链
    pub fn strategies(&self) -> &StrategyChain {
        &self.strategies
    }

    /// 管道管理器
    pub fn pipelines(&self) -> &PipelineManager {
        &self.pipelines
    }

    /// 注册工厂，返回注册使用的构建键
    pub fn register_factory<T, F>(&self, name: Option<&str>, lifetime: Lifetime, factory: F) -> BuildKey
    where
        T: Send + Sync + 'static,
        F: Fn(&mut dyn BuilderContext) -> Result<T, BuildError> + Send + Sync + 'static,
    {
        let key = BuildKey::of::<T>().with_name(name.map(str::to_string));
        info!(build_key = %key, lifetime = ?lifetime, "注册工厂");
        self.persistent_policies
            .set::<dyn BuildPlanPolicy>(key.clone(), Arc::new(FactoryBuildPlan::typed(factory)));
        self.persistent_policies
            .set::<dyn LifetimePolicy>(key.clone(), lifetime_policy_for(lifetime));
        key
    }

    /// 注册已有实例
    ///
    /// 实例由作用域持有，作用域释放时一并释放
    pub fn register_instance<T>(&self, name: Option<&str>, instance: T) -> BuildKey
    where
        T: Send + Sync + 'static,
    {
        let key = BuildKey::of::<T>().with_name(name.map(str::to_string));
        info!(build_key = %key, "注册实例");
        let policy = Arc::new(ContainerControlledLifetime::with_value(Arc::new(instance)));
        self.lifetime.track(policy.clone());
        self.persistent_policies.set::<dyn LifetimePolicy>(key.clone(), policy);
        key
    }

    /// 注册构建键映射
    pub fn register_mapping(&self, from: BuildKey, to: BuildKey) {
        info!(from = %from, to = %to, "注册构建键映射");
        self.persistent_policies
            .set::<dyn BuildKeyMappingPolicy>(from, Arc::new(BuildKeyMapping::new(to)));
    }

    /// 对构建键应用注入指令
    pub fn register_members(&self, key: &BuildKey, members: &[Arc<dyn InjectionMember>]) {
        debug!(build_key = %key, members = members.len(), "应用注入指令");
        for member in members {
            member.add_policies(key, self.persistent_policies.as_ref());
        }
    }

    /// 注册具名调用处理器实例
    pub fn register_call_handler<H>(&self, name: &str, handler: H) -> BuildKey
    where
        H: CallHandler + 'static,
    {
        let key = BuildKey::named::<dyn CallHandler>(name);
        info!(handler = %key, "注册调用处理器");
        let handler: Arc<dyn CallHandler> = Arc::new(handler);
        let plan = FactoryBuildPlan::new(move |_| Ok(Arc::new(handler.clone()) as BuiltObject));
        self.persistent_policies
            .set::<dyn BuildPlanPolicy>(key.clone(), Arc::new(plan));
        key
    }

    /// 登记拦截策略定义
    pub fn add_policy_definition(&self, definition: PolicyDefinition) {
        info!(policy = definition.name(), handlers = definition.handlers().len(), "登记拦截策略");
        definition.configure(self.persistent_policies.as_ref());
        self.definitions.add(definition);
        // 已缓存的管道可能不再完整
        self.pipelines.clear();
    }

    /// 为构建键开启拦截
    pub fn enable_interception(&self, key: BuildKey) {
        info!(build_key = %key, "开启拦截");
        self.persistent_policies.set(key, Arc::new(InterceptOnBuild));
    }

    /// 执行一次顶层构建
    pub fn build_up(
        &self,
        build_key: BuildKey,
        existing: Option<BuiltObject>,
        overrides: Vec<Arc<dyn ResolverOverride>>,
    ) -> Result<BuiltObject, BuildFailure> {
        self.run_operation("build_up", build_key, existing, overrides, |context| {
            context.execute_build_up()
        })
    }

    /// 按类型解析
    ///
    /// 构建结果被拦截时返回被包装的对象
    pub fn resolve<T>(&self, name: Option<&str>) -> Result<Arc<T>, BuildFailure>
    where
        T: Send + Sync + 'static,
    {
        self.resolve_with_overrides(name, Vec::new())
    }

    /// 带解析覆盖的按类型解析
    pub fn resolve_with_overrides<T>(
        &self,
        name: Option<&str>,
        overrides: Vec<Arc<dyn ResolverOverride>>,
    ) -> Result<Arc<T>, BuildFailure>
    where
        T: Send + Sync + 'static,
    {
        let key = BuildKey::of::<T>().with_name(name.map(str::to_string));
        self.run_operation("resolve", key.clone(), None, overrides, move |context| {
            let built = context.execute_build_up()?;
            let built = match built.downcast::<InterceptedInstance>() {
                Ok(intercepted) => intercepted.target().clone(),
                Err(built) => built,
            };
            built
                .downcast::<T>()
                .map_err(|_| BuildError::type_mismatch::<T>(key))
        })
    }

    /// 解析为被拦截的实例
    ///
    /// 目标没有开启拦截或没有匹配的处理器时，返回管道为空的实例
    pub fn resolve_intercepted<T>(&self, name: Option<&str>) -> Result<InterceptedInstance, BuildFailure>
    where
        T: Send + Sync + 'static,
    {
        let key = BuildKey::of::<T>().with_name(name.map(str::to_string));
        self.run_operation("resolve_intercepted", key.clone(), None, Vec::new(), move |context| {
            let built = context.execute_build_up()?;
            Ok(match built.downcast::<InterceptedInstance>() {
                Ok(intercepted) => intercepted.as_ref().clone(),
                Err(built) => InterceptedInstance::new(key, built, HandlerPipeline::default()),
            })
        })
    }

    /// 为目标组装调用处理管道
    pub fn assemble_pipeline(&self, target: &BuildKey) -> Result<HandlerPipeline, BuildFailure> {
        let pipelines = self.pipelines.clone();
        self.run_operation("assemble_pipeline", target.clone(), None, Vec::new(), |context| {
            let target = context.original_build_key().clone();
            pipelines.get_or_assemble(context, &target)
        })
    }

    /// 拆除对象
    pub fn tear_down(&self, build_key: BuildKey, existing: BuiltObject) -> Result<(), BuildFailure> {
        self.run_operation("tear_down", build_key, Some(existing), Vec::new(), |context| {
            context.execute_tear_down()
        })
    }

    /// 释放作用域持有的生命周期资源
    ///
    /// 按登记的逆序释放，可重复调用
    pub fn dispose(&self) -> Result<(), LifetimeError> {
        info!(scope = %self.id, resources = self.lifetime.len(), "释放容器作用域");
        self.lifetime.release_all()
    }

    fn run_operation<R, F>(
        &self,
        operation: &'static str,
        build_key: BuildKey,
        existing: Option<BuiltObject>,
        overrides: Vec<Arc<dyn ResolverOverride>>,
        body: F,
    ) -> Result<R, BuildFailure>
    where
        F: FnOnce(&mut BuildContext) -> Result<R, BuildError>,
    {
        let operation_id = Uuid::new_v4();
        let span = debug_span!("build", operation, build_key = %build_key, %operation_id);
        let _entered = span.enter();

        let mut context = BuildContext::new_root(
            self.strategies.clone(),
            self.persistent_policies.clone(),
            self.lifetime.clone(),
            self.config.clone(),
            build_key.clone(),
            existing,
        );
        for resolver_override in overrides {
            context.add_resolver_override(resolver_override);
        }
        let recovery_stack = context.recovery_stack_handle();

        match body(&mut context) {
            Ok(result) => {
                recovery_stack.discard();
                debug!("构建完成");
                Ok(result)
            }
            Err(source) => {
                let key_chain = context.failure_chain_for(&source);
                let failed_key = key_chain.last().cloned().unwrap_or(build_key);
                warn!(build_key = %failed_key, error = %source, "构建失败，执行补偿");

                let recovery_failures = recovery_stack.execute_recovery();
                for failure in &recovery_failures {
                    warn!("补偿操作失败: {}", failure);
                }
                Err(BuildFailure {
                    build_key: failed_key,
                    key_chain,
                    source,
                    recovery_failures,
                })
            }
        }
    }
}

impl Default for ContainerScope {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ContainerScope {
    fn drop(&mut self) {
        if let Err(err) = self.lifetime.release_all() {
            warn!(scope = %self.id, "释放容器作用域时出错: {}", err);
        }
    }
}

impl std::fmt::Debug for ContainerScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContainerScope")
            .field("id", &self.id)
            .field("created_at", &self.created_at)
            .field("config", &self.config)
            .field("strategies", &self.strategies)
            .field("definitions", &self.definitions.len())
            .finish_non_exhaustive()
    }
}
