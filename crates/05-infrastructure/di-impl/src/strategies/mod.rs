//! 内置构建策略

mod build_key_mapping;
mod build_plan;
mod interception;
mod lifetime;
mod method_injection;

pub use build_key_mapping::BuildKeyMappingStrategy;
pub use build_plan::BuildPlanStrategy;
pub use interception::{InterceptOnBuild, InterceptionStrategy};
pub use lifetime::LifetimeStrategy;
pub use method_injection::MethodInjectionStrategy;

use crate::strategy_chain::{StagedStrategyChain, StrategyChain};
use di_abstractions::BuilderStage;
use infrastructure_common::ContainerConfig;
use std::sync::Arc;

/// 默认策略链：映射 -> 生命周期 -> 创建 -> 方法注入 -> 拦截
pub fn default_strategy_chain(config: &ContainerConfig) -> StrategyChain {
    StagedStrategyChain::new()
        .add_new::<BuildKeyMappingStrategy>(BuilderStage::TypeMapping)
        .add_new::<LifetimeStrategy>(BuilderStage::Lifetime)
        .add_new::<BuildPlanStrategy>(BuilderStage::Creation)
        .add_new::<MethodInjectionStrategy>(BuilderStage::Initialization)
        .add(
            Arc::new(InterceptionStrategy::new(config.enable_interception)),
            BuilderStage::PostInitialization,
        )
        .make_strategy_chain()
}
