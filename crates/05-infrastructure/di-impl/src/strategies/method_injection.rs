//! 方法注入策略

use crate::injection::InjectionMethodsPolicy;
use di_abstractions::{BuilderContext, BuilderStrategy, PolicyStoreExt};
use infrastructure_common::BuildError;

/// 对新建对象依次调用登记的注入方法
#[derive(Debug, Default)]
pub struct MethodInjectionStrategy;

impl BuilderStrategy for MethodInjectionStrategy {
    fn name(&self) -> &'static str {
        "MethodInjectionStrategy"
    }

    fn pre_build_up(&self, context: &mut dyn BuilderContext) -> Result<(), BuildError> {
        let Some(target) = context.existing().cloned() else {
            return Ok(());
        };
        let Some(policy) = context
            .policies()
            .get::<InjectionMethodsPolicy>(context.build_key())
        else {
            return Ok(());
        };

        for method in policy.methods() {
            context.set_current_operation(Some(format!("调用注入方法 {}", method.name())));
            method.invoke(&target, context)?;
        }
        context.set_current_operation(None);
        Ok(())
    }
}
