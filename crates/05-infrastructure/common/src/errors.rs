//! 错误类型定义

use crate::metadata::{format_key_chain, BuildKey};
use thiserror::Error;

/// 装箱的底层错误
pub type BoxedError = Box<dyn std::error::Error + Send + Sync>;

/// 配置错误类型
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("配置加载失败: {source}")]
    LoadError {
        #[from]
        source: config::ConfigError,
    },

    #[error("配置验证失败: {message}")]
    ValidationError { message: String },
}

/// 构建错误类型
///
/// 构建策略在构建过程中产生的失败。任何一种都会中止整棵构建树。
#[derive(Error, Debug)]
pub enum BuildError {
    #[error("无法解析依赖: {build_key}")]
    UnresolvedDependency { build_key: BuildKey },

    #[error("检测到循环构建: {build_key}, 构建链: {}", format_key_chain(.key_chain))]
    CircularBuild {
        build_key: BuildKey,
        key_chain: Vec<BuildKey>,
    },

    #[error("构建深度超过上限 {max_depth}: {build_key}")]
    DepthExceeded { build_key: BuildKey, max_depth: usize },

    #[error("构建策略执行失败: {build_key}, 操作: {operation}, 原因: {source}")]
    StrategyFailed {
        build_key: BuildKey,
        operation: String,
        source: BoxedError,
    },

    #[error("构建结果类型不匹配: {build_key}, 期望类型: {expected}")]
    TypeMismatch {
        build_key: BuildKey,
        expected: &'static str,
    },

    #[error("恢复栈已关闭，无法再登记补偿操作")]
    RecoveryStackClosed,
}

impl BuildError {
    /// 创建无法解析依赖错误
    pub fn unresolved(build_key: BuildKey) -> Self {
        Self::UnresolvedDependency { build_key }
    }

    /// 创建策略执行失败错误，保留原始错误用于诊断
    pub fn strategy_failed(
        build_key: BuildKey,
        operation: impl Into<String>,
        source: impl Into<BoxedError>,
    ) -> Self {
        Self::StrategyFailed {
            build_key,
            operation: operation.into(),
            source: source.into(),
        }
    }

    /// 创建类型不匹配错误
    pub fn type_mismatch<T: ?Sized + 'static>(build_key: BuildKey) -> Self {
        Self::TypeMismatch {
            build_key,
            expected: std::any::type_name::<T>(),
        }
    }

    /// 出错的构建键（如果错误携带）
    pub fn build_key(&self) -> Option<&BuildKey> {
        match self {
            Self::UnresolvedDependency { build_key }
            | Self::CircularBuild { build_key, .. }
            | Self::DepthExceeded { build_key, .. }
            | Self::StrategyFailed { build_key, .. }
            | Self::TypeMismatch { build_key, .. } => Some(build_key),
            Self::RecoveryStackClosed => None,
        }
    }
}

/// 补偿操作失败
#[derive(Error, Debug)]
#[error("补偿操作执行失败: {description}, 原因: {source}")]
pub struct RecoveryFailure {
    pub description: String,
    pub source: BoxedError,
}

/// 构建失败
///
/// 交还给顶层调用方的错误：失败的构建键、失败时正在进行的构建链、
/// 首要原因，以及回滚过程中收集到的补偿失败。
#[derive(Error, Debug)]
#[error("构建失败: {build_key}, 构建链: {}, 原因: {source}", format_key_chain(.key_chain))]
pub struct BuildFailure {
    pub build_key: BuildKey,
    pub key_chain: Vec<BuildKey>,
    pub source: BuildError,
    pub recovery_failures: Vec<RecoveryFailure>,
}

impl BuildFailure {
    /// 首要原因
    pub fn cause(&self) -> &BuildError {
        &self.source
    }

    /// 是否为无法解析依赖
    pub fn is_unresolved(&self) -> bool {
        matches!(self.source, BuildError::UnresolvedDependency { .. })
    }

    /// 是否为循环构建
    pub fn is_circular(&self) -> bool {
        matches!(self.source, BuildError::CircularBuild { .. })
    }
}

/// 生命周期资源释放失败
#[derive(Error, Debug)]
#[error("释放资源失败: {description}, 原因: {source}")]
pub struct ReleaseFailure {
    pub description: String,
    pub source: BoxedError,
}

/// 生命周期管理错误类型
#[derive(Error, Debug)]
pub enum LifetimeError {
    #[error("释放生命周期资源失败，共 {} 项", .failures.len())]
    ReleaseFailed { failures: Vec<ReleaseFailure> },
}

/// 方法调用错误
///
/// 调用处理管道中目标方法或处理器产生的异常
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvocationError {
    #[error("目标方法执行失败: {method}, 原因: {message}")]
    TargetFailed { method: String, message: String },

    #[error("调用处理器拒绝执行: {handler}, 原因: {message}")]
    Rejected { handler: String, message: String },
}

/// 结果类型别名
pub type ConfigResult<T> = Result<T, ConfigError>;
pub type BuildResult<T> = Result<T, BuildError>;
pub type LifetimeResult<T> = Result<T, LifetimeError>;
pub type InvocationResult<T> = Result<T, InvocationError>;
