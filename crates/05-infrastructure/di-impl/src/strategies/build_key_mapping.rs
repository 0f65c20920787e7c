//! 构建键映射策略

use di_abstractions::{BuildKeyMappingPolicy, BuilderContext, BuilderStrategy, PolicyStoreExt};
use infrastructure_common::BuildError;
use tracing::debug;

/// 按映射策略重定向构建键，后续策略作用于新的目标
#[derive(Debug, Default)]
pub struct BuildKeyMappingStrategy;

impl BuilderStrategy for BuildKeyMappingStrategy {
    fn name(&self) -> &'static str {
        "BuildKeyMappingStrategy"
    }

    fn pre_build_up(&self, context: &mut dyn BuilderContext) -> Result<(), BuildError> {
        let Some(policy) = context
            .policies()
            .get::<dyn BuildKeyMappingPolicy>(context.build_key())
        else {
            return Ok(());
        };

        let mapped = policy.map(context.build_key());
        if &mapped != context.build_key() {
            debug!(from = %context.build_key(), to = %mapped, "重定向构建键");
            context.set_build_key(mapped);
        }
        Ok(())
    }
}
