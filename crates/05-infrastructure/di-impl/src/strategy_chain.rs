//! 策略链实现

use di_abstractions::{BuilderContext, BuilderStage, BuilderStrategy};
use infrastructure_common::{BuildError, BuiltObject};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// 策略链
///
/// 容器配置时组装，之后不可变，被所有构建共享
#[derive(Clone, Default)]
pub struct StrategyChain {
    strategies: Vec<Arc<dyn BuilderStrategy>>,
}

impl StrategyChain {
    /// 按给定顺序创建策略链
    pub fn new(strategies: Vec<Arc<dyn BuilderStrategy>>) -> Self {
        Self { strategies }
    }

    /// 策略数量
    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    /// 策略名称，按执行顺序
    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|strategy| strategy.name()).collect()
    }

    /// 执行构建
    ///
    /// 正向执行 `pre_build_up`，直到全部执行完或某个策略标记构建完成；
    /// 然后对已执行过的策略逆序执行 `post_build_up`。任一步失败立即中止。
    pub fn execute_build_up(&self, context: &mut dyn BuilderContext) -> Result<BuiltObject, BuildError> {
        let mut executed = 0;
        for strategy in &self.strategies {
            if context.build_complete() {
                break;
            }
            debug!(strategy = strategy.name(), build_key = %context.build_key(), "执行构建前处理");
            strategy.pre_build_up(context)?;
            executed += 1;
        }

        for strategy in self.strategies[..executed].iter().rev() {
            strategy.post_build_up(context)?;
        }

        context
            .existing()
            .cloned()
            .ok_or_else(|| BuildError::unresolved(context.build_key().clone()))
    }

    /// 执行拆除
    pub fn execute_tear_down(&self, context: &mut dyn BuilderContext) -> Result<(), BuildError> {
        let mut executed = 0;
        for strategy in &self.strategies {
            if context.build_complete() {
                break;
            }
            debug!(strategy = strategy.name(), build_key = %context.build_key(), "执行拆除前处理");
            strategy.pre_tear_down(context)?;
            executed += 1;
        }

        for strategy in self.strategies[..executed].iter().rev() {
            strategy.post_tear_down(context)?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for StrategyChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.strategy_names()).finish()
    }
}

/// 分阶段的策略链构建器
#[derive(Default)]
pub struct StagedStrategyChain {
    stages: BTreeMap<BuilderStage, Vec<Arc<dyn BuilderStrategy>>>,
}

impl StagedStrategyChain {
    /// 创建空的构建器
    pub fn new() -> Self {
        Self::default()
    }

    /// 在指定阶段追加策略
    pub fn add(mut self, strategy: Arc<dyn BuilderStrategy>, stage: BuilderStage) -> Self {
        self.stages.entry(stage).or_default().push(strategy);
        self
    }

    /// 在指定阶段追加默认构造的策略
    pub fn add_new<S>(self, stage: BuilderStage) -> Self
    where
        S: BuilderStrategy + Default + 'static,
    {
        self.add(Arc::new(S::default()), stage)
    }

    /// 生成策略链
    pub fn make_strategy_chain(&self) -> StrategyChain {
        StrategyChain::new(self.stages.values().flatten().cloned().collect())
    }
}
