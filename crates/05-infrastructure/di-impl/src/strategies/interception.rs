//! 拦截策略

use crate::interception::{assemble_pipeline, InterceptedInstance, PipelineManager};
use di_abstractions::{BuilderContext, BuilderStrategy, CallHandler, PolicyStoreExt};
use infrastructure_common::BuildError;
use tracing::debug;

/// 标记构建结果需要拦截
///
/// 按请求的构建键登记；登记为默认策略时作用于所有目标
#[derive(Debug, Clone, Copy, Default)]
pub struct InterceptOnBuild;

/// 为标记了拦截的构建结果组装管道并包装
///
/// 管道按请求的构建键匹配，而不是按映射后的实现类型。
/// 没有任何处理器匹配时保留原对象。
#[derive(Debug, Default)]
pub struct InterceptionStrategy {
    enabled: bool,
}

impl InterceptionStrategy {
    /// 创建拦截策略，`enabled` 为 `false` 时不做任何处理
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }
}

impl BuilderStrategy for InterceptionStrategy {
    fn name(&self) -> &'static str {
        "InterceptionStrategy"
    }

    fn pre_build_up(&self, context: &mut dyn BuilderContext) -> Result<(), BuildError> {
        if !self.enabled {
            return Ok(());
        }
        let Some(existing) = context.existing().cloned() else {
            return Ok(());
        };
        if existing.is::<InterceptedInstance>() {
            return Ok(());
        }

        let target = context.original_build_key().clone();
        // 处理器本身不参与拦截
        if target.is::<dyn CallHandler>() {
            return Ok(());
        }
        if context.policies().get::<InterceptOnBuild>(&target).is_none() {
            return Ok(());
        }

        let pipeline = match context.policies().get_default::<PipelineManager>() {
            Some(manager) => manager.get_or_assemble(context, &target)?,
            None => assemble_pipeline(context, &target)?,
        };
        if pipeline.is_empty() {
            return Ok(());
        }

        debug!(target = %target, handlers = pipeline.len(), "包装被拦截的实例");
        context.set_existing(Some(std::sync::Arc::new(InterceptedInstance::new(
            target, existing, pipeline,
        ))));
        Ok(())
    }
}
