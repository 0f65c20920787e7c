//! 生命周期资源容器与生命周期管理器实现

use di_abstractions::{same_resource, Disposable, LifetimeContainer, LifetimePolicy};
use infrastructure_common::{BuiltObject, Lifetime, LifetimeError, ReleaseFailure};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use tracing::{debug, warn};

/// 生命周期资源容器
///
/// 由容器作用域持有，被并发执行的多棵构建树共享
#[derive(Default)]
pub struct LifetimeContainerImpl {
    resources: Mutex<Vec<Arc<dyn Disposable>>>,
}

impl LifetimeContainerImpl {
    /// 创建新的资源容器
    pub fn new() -> Self {
        Self::default()
    }
}

impl LifetimeContainer for LifetimeContainerImpl {
    fn track(&self, resource: Arc<dyn Disposable>) {
        debug!("登记生命周期资源: {}", resource.description());
        self.resources.lock().push(resource);
    }

    fn remove(&self, resource: &Arc<dyn Disposable>) -> bool {
        let mut resources = self.resources.lock();
        match resources.iter().rposition(|tracked| same_resource(tracked, resource)) {
            Some(index) => {
                resources.remove(index);
                true
            }
            None => false,
        }
    }

    fn contains(&self, resource: &Arc<dyn Disposable>) -> bool {
        self.resources
            .lock()
            .iter()
            .any(|tracked| same_resource(tracked, resource))
    }

    fn len(&self) -> usize {
        self.resources.lock().len()
    }

    fn release_all(&self) -> Result<(), LifetimeError> {
        let resources = std::mem::take(&mut *self.resources.lock());
        if resources.is_empty() {
            return Ok(());
        }

        debug!("释放 {} 个生命周期资源", resources.len());
        let mut failures = Vec::new();
        for resource in resources.into_iter().rev() {
            if let Err(err) = resource.dispose() {
                warn!("释放资源失败: {}: {}", resource.description(), err);
                failures.push(ReleaseFailure {
                    description: resource.description(),
                    source: err.into(),
                });
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(LifetimeError::ReleaseFailed { failures })
        }
    }
}

impl std::fmt::Debug for LifetimeContainerImpl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifetimeContainerImpl")
            .field("len", &self.len())
            .finish()
    }
}

/// 容器控制的生命周期（单例）
///
/// 值保存在管理器里，作用域结束时随资源容器一起释放
#[derive(Default)]
pub struct ContainerControlledLifetime {
    value: RwLock<Option<BuiltObject>>,
}

impl ContainerControlledLifetime {
    /// 创建空的管理器
    pub fn new() -> Self {
        Self::default()
    }

    /// 创建已保存值的管理器
    pub fn with_value(value: BuiltObject) -> Self {
        Self {
            value: RwLock::new(Some(value)),
        }
    }
}

impl LifetimePolicy for ContainerControlledLifetime {
    fn get_value(&self) -> Option<BuiltObject> {
        self.value.read().clone()
    }

    fn set_value(&self, value: BuiltObject) {
        *self.value.write() = Some(value);
    }

    fn remove_value(&self) {
        self.value.write().take();
    }

    fn set_value_if_absent(&self, value: BuiltObject) -> Option<BuiltObject> {
        let mut stored = self.value.write();
        match stored.as_ref() {
            Some(winner) => Some(winner.clone()),
            None => {
                *stored = Some(value);
                None
            }
        }
    }

    fn as_disposable(self: Arc<Self>) -> Option<Arc<dyn Disposable>> {
        Some(self)
    }
}

impl Disposable for ContainerControlledLifetime {
    fn dispose(&self) -> anyhow::Result<()> {
        self.remove_value();
        Ok(())
    }
}

/// 构建树级生命周期
///
/// 值写入构建树的操作级策略表，构建结束后随之消失
#[derive(Debug, Default)]
pub struct PerBuildLifetime;

impl LifetimePolicy for PerBuildLifetime {
    fn get_value(&self) -> Option<BuiltObject> {
        None
    }

    fn set_value(&self, _value: BuiltObject) {}

    fn remove_value(&self) {}

    fn is_build_scoped(&self) -> bool {
        true
    }
}

/// 瞬时生命周期，不保存任何值
#[derive(Debug, Default)]
pub struct TransientLifetime;

impl LifetimePolicy for TransientLifetime {
    fn get_value(&self) -> Option<BuiltObject> {
        None
    }

    fn set_value(&self, _value: BuiltObject) {}

    fn remove_value(&self) {}
}

/// 生命周期管理器工厂
pub fn lifetime_policy_for(lifetime: Lifetime) -> Arc<dyn LifetimePolicy> {
    match lifetime {
        Lifetime::Singleton => Arc::new(ContainerControlledLifetime::new()),
        Lifetime::Scoped => Arc::new(PerBuildLifetime),
        Lifetime::Transient => Arc::new(TransientLifetime),
    }
}
