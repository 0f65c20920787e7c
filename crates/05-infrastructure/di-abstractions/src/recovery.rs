//! 恢复栈抽象接口

use infrastructure_common::{BuildError, RecoveryFailure};

type RecoveryFn = Box<dyn FnOnce() -> anyhow::Result<()> + Send>;

/// 补偿操作
///
/// 构建失败时执行，用于撤销已经产生的部分副作用
pub struct RecoveryAction {
    description: String,
    action: RecoveryFn,
}

impl RecoveryAction {
    /// 创建补偿操作
    pub fn new<F>(description: impl Into<String>, action: F) -> Self
    where
        F: FnOnce() -> anyhow::Result<()> + Send + 'static,
    {
        Self {
            description: description.into(),
            action: Box::new(action),
        }
    }

    /// 操作描述
    pub fn description(&self) -> &str {
        &self.description
    }

    /// 执行补偿
    pub fn recover(self) -> Result<(), RecoveryFailure> {
        let Self { description, action } = self;
        action().map_err(|err| RecoveryFailure {
            description,
            source: err.into(),
        })
    }
}

impl std::fmt::Debug for RecoveryAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecoveryAction")
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

/// 恢复栈 trait
///
/// 后进先出。构建成功后被丢弃，失败后被逆序执行；两种情况之后都不再可用。
pub trait RecoveryStack: Send + Sync {
    /// 压入补偿操作，栈已关闭时返回 [`BuildError::RecoveryStackClosed`]
    fn push(&self, action: RecoveryAction) -> Result<(), BuildError>;

    /// 待执行的补偿操作数量
    fn len(&self) -> usize;

    /// 是否为空
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 是否已关闭
    fn is_closed(&self) -> bool;

    /// 逆序执行全部补偿操作并关闭栈，返回收集到的失败
    fn execute_recovery(&self) -> Vec<RecoveryFailure>;

    /// 构建成功时丢弃全部补偿操作并关闭栈
    fn discard(&self);
}
