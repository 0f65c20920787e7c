//! 恢复栈实现

use di_abstractions::{RecoveryAction, RecoveryStack};
use infrastructure_common::{BuildError, RecoveryFailure};
use parking_lot::Mutex;
use tracing::{debug, warn};

#[derive(Debug, Default)]
struct RecoveryState {
    actions: Vec<RecoveryAction>,
    closed: bool,
}

/// 恢复栈
///
/// 每棵构建树一个，树内所有上下文共享
#[derive(Debug, Default)]
pub struct RecoveryStackImpl {
    state: Mutex<RecoveryState>,
}

impl RecoveryStackImpl {
    /// 创建新的恢复栈
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecoveryStack for RecoveryStackImpl {
    fn push(&self, action: RecoveryAction) -> Result<(), BuildError> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(BuildError::RecoveryStackClosed);
        }
        debug!("登记补偿操作: {}", action.description());
        state.actions.push(action);
        Ok(())
    }

    fn len(&self) -> usize {
        self.state.lock().actions.len()
    }

    fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    fn execute_recovery(&self) -> Vec<RecoveryFailure> {
        let actions = {
            let mut state = self.state.lock();
            state.closed = true;
            std::mem::take(&mut state.actions)
        };

        let mut failures = Vec::new();
        for action in actions.into_iter().rev() {
            debug!("执行补偿操作: {}", action.description());
            if let Err(failure) = action.recover() {
                warn!("{}", failure);
                failures.push(failure);
            }
        }
        failures
    }

    fn discard(&self) {
        let mut state = self.state.lock();
        state.closed = true;
        state.actions.clear();
    }
}
