//! 构建策略抽象接口

use crate::context::BuilderContext;
use infrastructure_common::BuildError;

/// 构建策略 trait
///
/// 策略链正向执行 `pre_*`，反向执行 `post_*`
pub trait BuilderStrategy: Send + Sync {
    /// 策略名称
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// 构建前处理
    fn pre_build_up(&self, _context: &mut dyn BuilderContext) -> Result<(), BuildError> {
        Ok(())
    }

    /// 构建后处理
    fn post_build_up(&self, _context: &mut dyn BuilderContext) -> Result<(), BuildError> {
        Ok(())
    }

    /// 拆除前处理
    fn pre_tear_down(&self, _context: &mut dyn BuilderContext) -> Result<(), BuildError> {
        Ok(())
    }

    /// 拆除后处理
    fn post_tear_down(&self, _context: &mut dyn BuilderContext) -> Result<(), BuildError> {
        Ok(())
    }
}

/// 构建阶段
///
/// 策略链按阶段排序，同一阶段内按添加顺序
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BuilderStage {
    /// 准备
    Setup,
    /// 构建键映射
    TypeMapping,
    /// 生命周期
    Lifetime,
    /// 创建前
    PreCreation,
    /// 创建
    Creation,
    /// 初始化（注入）
    Initialization,
    /// 初始化后（拦截包装）
    PostInitialization,
}
