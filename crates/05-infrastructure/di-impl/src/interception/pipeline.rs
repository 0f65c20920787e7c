//! 调用处理管道

use super::policy_definition::{as_call_handler, PolicyDefinitionRegistry};
use dashmap::DashMap;
use di_abstractions::{
    BuilderContext, CallHandler, InvocationTarget, MethodInvocation, MethodReturn, NextHandler,
    PolicyStoreExt, RecoveryAction,
};
use infrastructure_common::{BuildError, BuildKey};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// 调用处理管道
///
/// 处理器按管道顺序进入、逆序返回，最内层是目标方法
#[derive(Clone, Default)]
pub struct HandlerPipeline {
    handlers: Vec<Arc<dyn CallHandler>>,
}

impl HandlerPipeline {
    /// 按给定顺序创建管道
    pub fn new(handlers: Vec<Arc<dyn CallHandler>>) -> Self {
        Self { handlers }
    }

    /// 处理器数量
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// 处理器，按管道顺序
    pub fn handlers(&self) -> &[Arc<dyn CallHandler>] {
        &self.handlers
    }

    /// 让一次调用经过管道
    pub fn invoke(&self, input: &mut MethodInvocation, target: InvocationTarget<'_>) -> MethodReturn {
        NextHandler::new(&self.handlers, target).proceed(input)
    }
}

impl std::fmt::Debug for HandlerPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerPipeline")
            .field("handlers", &self.handlers.len())
            .finish()
    }
}

/// 为目标组装调用处理管道
///
/// 按登记顺序遍历匹配的策略定义，每个定义内按处理器列表顺序，
/// 逐个通过子构建得到处理器实例。任何处理器构建失败都会使组装失败。
pub fn assemble_pipeline(context: &mut dyn BuilderContext, target: &BuildKey) -> Result<HandlerPipeline, BuildError> {
    let Some(registry) = context.policies().get_default::<PolicyDefinitionRegistry>() else {
        return Ok(HandlerPipeline::default());
    };

    let mut handlers = Vec::new();
    for definition in registry.matching(target) {
        for handler_key in definition.handler_keys() {
            let built = context.new_build_up(handler_key.clone())?;
            let handler = as_call_handler(built)
                .ok_or_else(|| BuildError::type_mismatch::<dyn CallHandler>(handler_key))?;
            handlers.push(handler);
        }
    }

    debug!(target = %target, handlers = handlers.len(), "组装调用处理管道");
    Ok(HandlerPipeline::new(handlers))
}

/// 管道管理器
///
/// 按目标缓存已组装的管道。新写入的缓存项同时在恢复栈上登记移除操作，
/// 构建树失败时不会留下由失败构建产生的管道。
///
/// 每次清空缓存都会推进代数；组装开始后代数变化的管道只返回给本次构建，不写入缓存。
#[derive(Debug, Default)]
pub struct PipelineManager {
    cache_enabled: bool,
    generation: AtomicU64,
    pipelines: DashMap<BuildKey, HandlerPipeline>,
}

impl PipelineManager {
    /// 创建管道管理器
    pub fn new(cache_enabled: bool) -> Self {
        Self {
            cache_enabled,
            generation: AtomicU64::new(0),
            pipelines: DashMap::new(),
        }
    }

    /// 是否缓存管道
    pub fn cache_enabled(&self) -> bool {
        self.cache_enabled
    }

    /// 获取已缓存的管道
    pub fn get(&self, target: &BuildKey) -> Option<HandlerPipeline> {
        self.pipelines.get(target).map(|entry| entry.value().clone())
    }

    /// 获取管道，不存在时组装
    pub fn get_or_assemble(
        self: &Arc<Self>,
        context: &mut dyn BuilderContext,
        target: &BuildKey,
    ) -> Result<HandlerPipeline, BuildError> {
        if self.cache_enabled {
            if let Some(pipeline) = self.get(target) {
                return Ok(pipeline);
            }
        }

        let generation = self.generation();
        let pipeline = assemble_pipeline(context, target)?;
        if !self.cache_enabled {
            return Ok(pipeline);
        }

        // 并发组装时以先写入者为准；在条目锁内检查代数，
        // 检查通过后才发生的清空会在拿到同一把锁后移除这一项
        let (pipeline, inserted) = match self.pipelines.entry(target.clone()) {
            dashmap::mapref::entry::Entry::Occupied(entry) => (entry.get().clone(), false),
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                if self.generation() != generation {
                    debug!(target = %target, "策略定义已变化，管道不写入缓存");
                    return Ok(pipeline);
                }
                entry.insert(pipeline.clone());
                (pipeline, true)
            }
        };

        if inserted {
            let manager = Arc::clone(self);
            let key = target.clone();
            context.recovery_stack().push(RecoveryAction::new(
                format!("移除调用处理管道 {target}"),
                move || {
                    manager.pipelines.remove(&key);
                    Ok(())
                },
            ))?;
        }
        Ok(pipeline)
    }

    /// 移除某个目标的管道
    pub fn invalidate(&self, target: &BuildKey) -> bool {
        self.pipelines.remove(target).is_some()
    }

    /// 清空缓存
    ///
    /// 正在组装中的管道不会再写入缓存
    pub fn clear(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.pipelines.clear();
    }

    /// 缓存代数，每次清空加一
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// 已缓存的管道数量
    pub fn len(&self) -> usize {
        self.pipelines.len()
    }

    /// 是否没有缓存
    pub fn is_empty(&self) -> bool {
        self.pipelines.is_empty()
    }
}
