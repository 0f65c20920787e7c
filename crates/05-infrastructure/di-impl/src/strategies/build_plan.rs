//! 构建计划策略

use di_abstractions::{BuildPlanPolicy, BuilderContext, BuilderStrategy, PolicyStoreExt};
use infrastructure_common::BuildError;

/// 执行构建计划创建对象
///
/// 已有实例时跳过；找不到构建计划时以无法解析依赖失败
#[derive(Debug, Default)]
pub struct BuildPlanStrategy;

impl BuilderStrategy for BuildPlanStrategy {
    fn name(&self) -> &'static str {
        "BuildPlanStrategy"
    }

    fn pre_build_up(&self, context: &mut dyn BuilderContext) -> Result<(), BuildError> {
        if context.existing().is_some() {
            return Ok(());
        }

        let plan = context
            .policies()
            .get::<dyn BuildPlanPolicy>(context.build_key())
            .ok_or_else(|| BuildError::unresolved(context.build_key().clone()))?;

        context.set_current_operation(Some(format!("创建 {}", context.build_key())));
        plan.build_up(context)?;
        context.set_current_operation(None);
        Ok(())
    }
}
