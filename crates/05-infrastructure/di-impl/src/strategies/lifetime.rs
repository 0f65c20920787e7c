//! 生命周期策略

use crate::lifetime_container::ContainerControlledLifetime;
use di_abstractions::{
    BuilderContext, BuilderStrategy, LifetimePolicy, PolicyStoreExt, RecoveryAction,
};
use infrastructure_common::BuildError;
use std::sync::Arc;
use tracing::debug;

/// 应用生命周期策略
///
/// 构建前：已保存值时直接复用并标记构建完成。
/// 构建后：保存新值，登记生命周期管理器，并压入补偿操作；
/// 构建树失败时补偿操作会移除这个尚未完成的实例。
/// 生命周期策略只按精确构建键查找，不同名称的实例互不共享。
#[derive(Debug, Default)]
pub struct LifetimeStrategy;

impl BuilderStrategy for LifetimeStrategy {
    fn name(&self) -> &'static str {
        "LifetimeStrategy"
    }

    fn pre_build_up(&self, context: &mut dyn BuilderContext) -> Result<(), BuildError> {
        let Some(policy) = context
            .policies()
            .get_no_default::<dyn LifetimePolicy>(context.build_key(), false)
        else {
            return Ok(());
        };

        if let Some(value) = policy.get_value() {
            debug!(build_key = %context.build_key(), "复用已保存的实例");
            context.set_existing(Some(value));
            context.set_build_complete(true);
        }
        Ok(())
    }

    fn post_build_up(&self, context: &mut dyn BuilderContext) -> Result<(), BuildError> {
        let Some(existing) = context.existing().cloned() else {
            return Ok(());
        };
        let build_key = context.build_key().clone();
        let Some(policy) = context
            .policies()
            .get_no_default::<dyn LifetimePolicy>(&build_key, false)
        else {
            return Ok(());
        };

        if policy.is_build_scoped() {
            // 写入操作级策略层，只在本构建树内可见
            let scoped: Arc<dyn LifetimePolicy> = Arc::new(ContainerControlledLifetime::with_value(existing));
            context.policies().set::<dyn LifetimePolicy>(build_key, scoped);
            return Ok(());
        }

        // 并发构建同一个键时以先保存者为准，后完成的构建改用已保存的实例
        if let Some(stored) = policy.set_value_if_absent(existing) {
            context.set_existing(Some(stored));
            return Ok(());
        }

        if let Some(resource) = policy.clone().as_disposable() {
            if !context.lifetime().contains(&resource) {
                context.lifetime().track(resource);
            }
        }

        let stored = policy.clone();
        context.recovery_stack().push(RecoveryAction::new(
            format!("移除未完成构建的实例 {build_key}"),
            move || {
                stored.remove_value();
                Ok(())
            },
        ))
    }

    fn pre_tear_down(&self, context: &mut dyn BuilderContext) -> Result<(), BuildError> {
        if let Some(policy) = context
            .policies()
            .get_no_default::<dyn LifetimePolicy>(context.build_key(), false)
        {
            debug!(build_key = %context.build_key(), "移除已保存的实例");
            policy.remove_value();
        }
        Ok(())
    }
}
