//! 注入指令与基础策略对象
//!
//! 外部配置解析得到的注入指令在这里被转换为构建策略可以读取的策略对象

use di_abstractions::{
    BuildKeyMappingPolicy, BuildPlanPolicy, BuilderContext, InjectionMember, PolicyStore,
    PolicyStoreExt,
};
use infrastructure_common::{BuildError, BuildKey, BuiltObject};
use std::sync::Arc;

type FactoryFn = dyn Fn(&mut dyn BuilderContext) -> Result<BuiltObject, BuildError> + Send + Sync;
type MethodFn = dyn Fn(&BuiltObject, &mut dyn BuilderContext) -> Result<(), BuildError> + Send + Sync;

/// 基于工厂函数的构建计划
#[derive(Clone)]
pub struct FactoryBuildPlan {
    factory: Arc<FactoryFn>,
}

impl FactoryBuildPlan {
    /// 使用返回类型擦除对象的工厂
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn(&mut dyn BuilderContext) -> Result<BuiltObject, BuildError> + Send + Sync + 'static,
    {
        Self {
            factory: Arc::new(factory),
        }
    }

    /// 使用返回具体类型的工厂
    pub fn typed<T, F>(factory: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&mut dyn BuilderContext) -> Result<T, BuildError> + Send + Sync + 'static,
    {
        Self::new(move |context| factory(context).map(|value| Arc::new(value) as BuiltObject))
    }
}

impl BuildPlanPolicy for FactoryBuildPlan {
    fn build_up(&self, context: &mut dyn BuilderContext) -> Result<(), BuildError> {
        let built = (self.factory)(context)?;
        context.set_existing(Some(built));
        Ok(())
    }
}

/// 固定目标的构建键映射
#[derive(Debug, Clone)]
pub struct BuildKeyMapping {
    target: BuildKey,
}

impl BuildKeyMapping {
    /// 映射到 `target`
    pub fn new(target: BuildKey) -> Self {
        Self { target }
    }

    /// 映射到类型 `T`，保留请求中的名称
    pub fn to<T: ?Sized + 'static>() -> Self {
        Self::new(BuildKey::of::<T>())
    }
}

impl BuildKeyMappingPolicy for BuildKeyMapping {
    fn map(&self, build_key: &BuildKey) -> BuildKey {
        match self.target.name() {
            Some(_) => self.target.clone(),
            None => self
                .target
                .clone()
                .with_name(build_key.name().map(str::to_string)),
        }
    }
}

/// 构建完成后调用的注入方法
#[derive(Clone)]
pub struct InjectionMethod {
    name: String,
    method: Arc<MethodFn>,
}

impl InjectionMethod {
    /// 创建注入方法
    pub fn new<F>(name: impl Into<String>, method: F) -> Self
    where
        F: Fn(&BuiltObject, &mut dyn BuilderContext) -> Result<(), BuildError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            method: Arc::new(method),
        }
    }

    /// 方法名称
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 对构建结果调用方法
    pub fn invoke(&self, target: &BuiltObject, context: &mut dyn BuilderContext) -> Result<(), BuildError> {
        (self.method)(target, context)
    }
}

impl InjectionMember for InjectionMethod {
    fn add_policies(&self, build_key: &BuildKey, policies: &dyn PolicyStore) {
        let mut methods = policies
            .get_no_default::<InjectionMethodsPolicy>(build_key, true)
            .map(|existing| existing.methods.clone())
            .unwrap_or_default();
        methods.push(self.clone());
        policies.set(build_key.clone(), Arc::new(InjectionMethodsPolicy { methods }));
    }
}

/// 某个构建键上登记的全部注入方法
#[derive(Clone, Default)]
pub struct InjectionMethodsPolicy {
    methods: Vec<InjectionMethod>,
}

impl InjectionMethodsPolicy {
    /// 注入方法，按登记顺序
    pub fn methods(&self) -> &[InjectionMethod] {
        &self.methods
    }
}

/// 以工厂函数充当构造器的注入指令
#[derive(Clone)]
pub struct InjectionFactory {
    plan: FactoryBuildPlan,
}

impl InjectionFactory {
    /// 创建注入工厂
    pub fn new<T, F>(factory: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&mut dyn BuilderContext) -> Result<T, BuildError> + Send + Sync + 'static,
    {
        Self {
            plan: FactoryBuildPlan::typed(factory),
        }
    }

    /// 从已有构建计划创建
    pub fn from_plan(plan: FactoryBuildPlan) -> Self {
        Self { plan }
    }
}

impl InjectionMember for InjectionFactory {
    fn add_policies(&self, build_key: &BuildKey, policies: &dyn PolicyStore) {
        policies.set::<dyn BuildPlanPolicy>(build_key.clone(), Arc::new(self.plan.clone()));
    }
}
