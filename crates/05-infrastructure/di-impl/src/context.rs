//! 构建上下文实现

use crate::lifetime_container::LifetimeContainerImpl;
use crate::policy_list::PolicyList;
use crate::recovery_stack::RecoveryStackImpl;
use crate::resolver_overrides::CompositeResolverOverride;
use crate::strategy_chain::StrategyChain;
use di_abstractions::{
    BuilderContext, ChildCustomization, DependencyResolverPolicy, LifetimeContainer, PolicyStore,
    RecoveryStack, ResolverOverride,
};
use infrastructure_common::{BuildError, BuildKey, BuiltObject, ContainerConfig};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

/// 整棵构建树共享的状态
///
/// 子上下文原样复制这些引用；其余字段都是每个上下文独有的
#[derive(Clone)]
struct BuildTree {
    strategies: Arc<StrategyChain>,
    persistent_policies: Arc<PolicyList>,
    lifetime: Arc<LifetimeContainerImpl>,
    recovery_stack: Arc<RecoveryStackImpl>,
    config: Arc<ContainerConfig>,
    failure: Arc<Mutex<Option<FailureRecord>>>,
}

/// 最近一次失败时正在进行的构建链
struct FailureRecord {
    key_chain: Vec<BuildKey>,
    failed_key: Option<BuildKey>,
}

impl FailureRecord {
    /// `error` 是否是本记录的失败沿着祖先上下文向上传递
    fn carries(&self, key_chain: &[BuildKey], error: &BuildError) -> bool {
        self.key_chain.starts_with(key_chain) && self.failed_key.as_ref() == error.build_key()
    }
}

/// 构建上下文
pub struct BuildContext {
    tree: BuildTree,
    policies: Arc<PolicyList>,
    resolver_overrides: CompositeResolverOverride,
    in_progress: Vec<BuildKey>,
    depth: usize,
    original_build_key: BuildKey,
    build_key: BuildKey,
    existing: Option<BuiltObject>,
    build_complete: bool,
    current_operation: Option<String>,
}

impl BuildContext {
    /// 为一次顶层构建请求创建根上下文
    ///
    /// 根上下文获得新的操作级策略层和新的恢复栈
    pub fn new_root(
        strategies: Arc<StrategyChain>,
        persistent_policies: Arc<PolicyList>,
        lifetime: Arc<LifetimeContainerImpl>,
        config: Arc<ContainerConfig>,
        build_key: BuildKey,
        existing: Option<BuiltObject>,
    ) -> Self {
        let policies = Arc::new(PolicyList::with_inner(persistent_policies.clone()));
        Self {
            tree: BuildTree {
                strategies,
                persistent_policies,
                lifetime,
                recovery_stack: Arc::new(RecoveryStackImpl::new()),
                config,
                failure: Arc::new(Mutex::new(None)),
            },
            policies,
            resolver_overrides: CompositeResolverOverride::new(),
            in_progress: Vec::new(),
            depth: 0,
            original_build_key: build_key.clone(),
            build_key,
            existing,
            build_complete: false,
            current_operation: None,
        }
    }

    /// 为子构建创建上下文
    ///
    /// 共享构建树状态，继承父上下文的解析覆盖；`policies` 为 `None` 时
    /// 沿用父上下文的操作级策略层。
    pub fn new_child(
        parent: &BuildContext,
        build_key: BuildKey,
        policies: Option<Arc<PolicyList>>,
    ) -> Result<Self, BuildError> {
        let mut key_chain = parent.key_chain();
        if parent.tree.config.enable_circular_build_detection && key_chain.contains(&build_key) {
            key_chain.push(build_key.clone());
            return Err(BuildError::CircularBuild {
                build_key,
                key_chain,
            });
        }

        let depth = parent.depth + 1;
        let max_depth = parent.tree.config.max_build_depth;
        if depth > max_depth {
            return Err(BuildError::DepthExceeded {
                build_key,
                max_depth,
            });
        }

        Ok(Self {
            tree: parent.tree.clone(),
            policies: policies.unwrap_or_else(|| parent.policies.clone()),
            resolver_overrides: CompositeResolverOverride::inherit(&parent.resolver_overrides),
            in_progress: key_chain,
            depth,
            original_build_key: build_key.clone(),
            build_key,
            existing: None,
            build_complete: false,
            current_operation: None,
        })
    }

    /// 在本上下文上执行策略链
    pub fn execute_build_up(&mut self) -> Result<BuiltObject, BuildError> {
        let strategies = self.tree.strategies.clone();
        let result = strategies.execute_build_up(self);
        if let Err(err) = &result {
            self.record_failure(self.key_chain(), err);
        }
        result
    }

    /// 在本上下文上执行拆除
    pub fn execute_tear_down(&mut self) -> Result<(), BuildError> {
        let strategies = self.tree.strategies.clone();
        let result = strategies.execute_tear_down(self);
        if let Err(err) = &result {
            self.record_failure(self.key_chain(), err);
        }
        result
    }

    /// 最近一次失败时正在进行的构建链
    pub fn failure_chain(&self) -> Option<Vec<BuildKey>> {
        self.tree.failure.lock().as_ref().map(|record| record.key_chain.clone())
    }

    /// `error` 发生时正在进行的构建链
    ///
    /// 错误来自某个子构建并原样传递到这里时返回子构建记录的链，
    /// 否则返回本上下文自己的链。被调用方处理掉的子构建失败不会被报告。
    pub fn failure_chain_for(&self, error: &BuildError) -> Vec<BuildKey> {
        let key_chain = self.key_chain();
        match self.tree.failure.lock().as_ref() {
            Some(record) if record.carries(&key_chain, error) => record.key_chain.clone(),
            _ => key_chain,
        }
    }

    /// 构建深度，根上下文为 0
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// 容器配置
    pub fn config(&self) -> &ContainerConfig {
        &self.tree.config
    }

    /// 解析覆盖链
    pub fn resolver_overrides(&self) -> &CompositeResolverOverride {
        &self.resolver_overrides
    }

    /// 恢复栈的共享引用
    pub fn recovery_stack_handle(&self) -> Arc<RecoveryStackImpl> {
        self.tree.recovery_stack.clone()
    }

    /// 记录失败
    ///
    /// 祖先上下文传递同一个错误时保留更深的记录；
    /// 其余情况（另一分支的新失败、本上下文自己的失败）覆盖旧记录。
    fn record_failure(&self, key_chain: Vec<BuildKey>, error: &BuildError) {
        let mut failure = self.tree.failure.lock();
        if failure.as_ref().is_some_and(|record| record.carries(&key_chain, error)) {
            return;
        }
        *failure = Some(FailureRecord {
            failed_key: error.build_key().cloned(),
            key_chain,
        });
    }

    fn spawn_child(
        &self,
        build_key: BuildKey,
        policies: Option<Arc<PolicyList>>,
    ) -> Result<BuildContext, BuildError> {
        BuildContext::new_child(self, build_key.clone(), policies).map_err(|err| {
            let mut attempted = self.key_chain();
            attempted.push(build_key);
            self.record_failure(attempted, &err);
            err
        })
    }
}

impl BuilderContext for BuildContext {
    fn build_key(&self) -> &BuildKey {
        &self.build_key
    }

    fn set_build_key(&mut self, build_key: BuildKey) {
        self.build_key = build_key;
    }

    fn original_build_key(&self) -> &BuildKey {
        &self.original_build_key
    }

    fn existing(&self) -> Option<&BuiltObject> {
        self.existing.as_ref()
    }

    fn set_existing(&mut self, existing: Option<BuiltObject>) {
        self.existing = existing;
    }

    fn build_complete(&self) -> bool {
        self.build_complete
    }

    fn set_build_complete(&mut self, complete: bool) {
        self.build_complete = complete;
    }

    fn current_operation(&self) -> Option<&str> {
        self.current_operation.as_deref()
    }

    fn set_current_operation(&mut self, operation: Option<String>) {
        self.current_operation = operation;
    }

    fn policies(&self) -> &dyn PolicyStore {
        self.policies.as_ref()
    }

    fn persistent_policies(&self) -> &dyn PolicyStore {
        self.tree.persistent_policies.as_ref()
    }

    fn lifetime(&self) -> &dyn LifetimeContainer {
        self.tree.lifetime.as_ref()
    }

    fn recovery_stack(&self) -> &dyn RecoveryStack {
        self.tree.recovery_stack.as_ref()
    }

    fn key_chain(&self) -> Vec<BuildKey> {
        let mut chain = self.in_progress.clone();
        chain.push(self.original_build_key.clone());
        if self.build_key != self.original_build_key {
            chain.push(self.build_key.clone());
        }
        chain
    }

    fn add_resolver_override(&mut self, resolver_override: Arc<dyn ResolverOverride>) {
        self.resolver_overrides.add(resolver_override);
    }

    fn get_overridden_resolver(&self, dependency: &BuildKey) -> Option<Arc<dyn DependencyResolverPolicy>> {
        self.resolver_overrides.get_resolver(self, dependency)
    }

    fn new_build_up(&mut self, build_key: BuildKey) -> Result<BuiltObject, BuildError> {
        let mut child = self.spawn_child(build_key, None)?;
        debug!(parent = %self.build_key, child = %child.build_key, "执行子构建");
        child.execute_build_up()
    }

    fn new_build_up_with(
        &mut self,
        build_key: BuildKey,
        customize: ChildCustomization<'_>,
    ) -> Result<BuiltObject, BuildError> {
        let layer = Arc::new(PolicyList::with_inner(self.policies.clone()));
        let mut child = self.spawn_child(build_key, Some(layer))?;
        if let Err(err) = customize(&mut child) {
            child.record_failure(child.key_chain(), &err);
            return Err(err);
        }
        debug!(parent = %self.build_key, child = %child.build_key, "执行定制子构建");
        child.execute_build_up()
    }

    fn resolve_dependency(&mut self, dependency: BuildKey) -> Result<BuiltObject, BuildError> {
        if let Some(resolver) = self.get_overridden_resolver(&dependency) {
            debug!(dependency = %dependency, "使用解析覆盖");
            return resolver.resolve(self);
        }
        self.new_build_up(dependency)
    }
}

impl std::fmt::Debug for BuildContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuildContext")
            .field("build_key", &self.build_key)
            .field("original_build_key", &self.original_build_key)
            .field("depth", &self.depth)
            .field("build_complete", &self.build_complete)
            .field("current_operation", &self.current_operation)
            .finish_non_exhaustive()
    }
}
