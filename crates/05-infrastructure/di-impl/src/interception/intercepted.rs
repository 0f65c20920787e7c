//! 被拦截的实例

use super::pipeline::HandlerPipeline;
use di_abstractions::{MethodInvocation, MethodReturn};
use infrastructure_common::{BuildKey, BuiltObject};
use serde_json::Value;
use std::sync::Arc;

/// 被拦截的实例
///
/// 包装构建结果和为其组装的管道。通过 [`InterceptedInstance::invoke`]
/// 发起的调用先经过管道，再到达目标对象。
#[derive(Clone)]
pub struct InterceptedInstance {
    target_key: BuildKey,
    target: BuiltObject,
    pipeline: HandlerPipeline,
}

impl InterceptedInstance {
    /// 包装构建结果
    pub fn new(target_key: BuildKey, target: BuiltObject, pipeline: HandlerPipeline) -> Self {
        Self {
            target_key,
            target,
            pipeline,
        }
    }

    /// 拦截目标的构建键
    pub fn target_key(&self) -> &BuildKey {
        &self.target_key
    }

    /// 被包装的对象
    pub fn target(&self) -> &BuiltObject {
        &self.target
    }

    /// 以强类型获取被包装的对象
    pub fn target_as<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.target.clone().downcast::<T>().ok()
    }

    /// 调用处理管道
    pub fn pipeline(&self) -> &HandlerPipeline {
        &self.pipeline
    }

    /// 发起一次经过管道的调用
    ///
    /// `dispatch` 在管道最内层执行，负责把调用分派到目标对象上的具体方法
    pub fn invoke<F>(&self, method: impl Into<String>, arguments: Vec<Value>, dispatch: F) -> MethodReturn
    where
        F: Fn(&BuiltObject, &MethodInvocation) -> MethodReturn,
    {
        let mut input = MethodInvocation::new(self.target_key.clone(), method, arguments);
        let target = |invocation: &MethodInvocation| dispatch(&self.target, invocation);
        self.pipeline.invoke(&mut input, &target)
    }
}

impl std::fmt::Debug for InterceptedInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterceptedInstance")
            .field("target_key", &self.target_key)
            .field("pipeline", &self.pipeline)
            .finish_non_exhaustive()
    }
}
