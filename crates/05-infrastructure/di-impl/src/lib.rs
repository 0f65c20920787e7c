//! # 依赖注入具体实现
//!
//! 提供对象构建流水线的执行核心：
//! - 两层策略表（持久层 + 每次构建的操作层）
//! - 构建上下文与固定策略链
//! - 解析覆盖链、生命周期资源容器、恢复栈
//! - 调用处理管道的组装与缓存
//! - 容器作用域，作为以上部件的入口

pub mod context;
pub mod injection;
pub mod interception;
pub mod lifetime_container;
pub mod policy_list;
pub mod recovery_stack;
pub mod resolver_overrides;
pub mod scope;
pub mod strategies;
pub mod strategy_chain;

pub use context::BuildContext;
pub use injection::{
    BuildKeyMapping, FactoryBuildPlan, InjectionFactory, InjectionMethod, InjectionMethodsPolicy,
};
pub use interception::{
    as_call_handler, assemble_pipeline, CallHandlerReference, HandlerPipeline, InterceptedInstance,
    NameMatchingRule, PipelineManager, PolicyDefinition, PolicyDefinitionRegistry,
    PredicateMatchingRule, TypeMatchingRule, TypedCallHandler,
};
pub use lifetime_container::{
    lifetime_policy_for, ContainerControlledLifetime, LifetimeContainerImpl, PerBuildLifetime,
    TransientLifetime,
};
pub use policy_list::PolicyList;
pub use recovery_stack::RecoveryStackImpl;
pub use resolver_overrides::{CompositeResolverOverride, DependencyOverride, LiteralValueResolver};
pub use scope::ContainerScope;
pub use strategies::{
    default_strategy_chain, BuildKeyMappingStrategy, BuildPlanStrategy, InterceptOnBuild,
    InterceptionStrategy, LifetimeStrategy, MethodInjectionStrategy,
};
pub use strategy_chain::{StagedStrategyChain, StrategyChain};
