//! 拦截策略定义

use crate::injection::FactoryBuildPlan;
use crate::lifetime_container::lifetime_policy_for;
use di_abstractions::{
    BuildPlanPolicy, BuilderContext, CallHandler, InjectionMember, LifetimePolicy, MatchingRule,
    PolicyStore, PolicyStoreExt,
};
use infrastructure_common::{BuildError, BuildKey, BuiltObject, Lifetime, TypeInfo};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::debug;

type HandlerFactory = dyn Fn(&mut dyn BuilderContext) -> Result<Arc<dyn CallHandler>, BuildError> + Send + Sync;

/// 把构建产物还原为调用处理器
pub fn as_call_handler(built: BuiltObject) -> Option<Arc<dyn CallHandler>> {
    built
        .downcast::<Arc<dyn CallHandler>>()
        .ok()
        .map(|handler| handler.as_ref().clone())
}

/// 按类型给出的调用处理器
///
/// 处理器类型、构造所需的注入指令和该处理器实例的生命周期
#[derive(Clone)]
pub struct TypedCallHandler {
    name: String,
    handler_type: TypeInfo,
    factory: Arc<HandlerFactory>,
    lifetime: Lifetime,
    injection_members: Vec<Arc<dyn InjectionMember>>,
}

impl TypedCallHandler {
    /// 创建按类型给出的调用处理器
    pub fn new<H, F>(name: impl Into<String>, lifetime: Lifetime, factory: F) -> Self
    where
        H: CallHandler + 'static,
        F: Fn(&mut dyn BuilderContext) -> Result<H, BuildError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            handler_type: TypeInfo::of::<H>(),
            factory: Arc::new(move |context: &mut dyn BuilderContext| {
                factory(context).map(|handler| Arc::new(handler) as Arc<dyn CallHandler>)
            }),
            lifetime,
            injection_members: Vec::new(),
        }
    }

    /// 追加注入指令
    pub fn with_injection_member(mut self, member: Arc<dyn InjectionMember>) -> Self {
        self.injection_members.push(member);
        self
    }

    /// 处理器名称
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 处理器类型
    pub fn handler_type(&self) -> TypeInfo {
        self.handler_type
    }

    /// 处理器生命周期
    pub fn lifetime(&self) -> Lifetime {
        self.lifetime
    }
}

/// 调用处理器引用
#[derive(Clone)]
pub enum CallHandlerReference {
    /// 已在容器中登记的具名处理器
    Named(String),
    /// 按类型创建的处理器
    Typed(TypedCallHandler),
}

/// 拦截策略定义
///
/// 匹配规则全部满足时作用于目标；没有规则时作用于所有目标
#[derive(Clone)]
pub struct PolicyDefinition {
    name: String,
    matching_rules: Vec<Arc<dyn MatchingRule>>,
    handlers: Vec<CallHandlerReference>,
}

impl PolicyDefinition {
    /// 创建策略定义
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            matching_rules: Vec::new(),
            handlers: Vec::new(),
        }
    }

    /// 策略名称
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 添加匹配规则
    pub fn with_matching_rule(mut self, rule: impl MatchingRule + 'static) -> Self {
        self.matching_rules.push(Arc::new(rule));
        self
    }

    /// 引用已登记的具名处理器
    pub fn add_call_handler(mut self, name: impl Into<String>) -> Self {
        self.handlers.push(CallHandlerReference::Named(name.into()));
        self
    }

    /// 添加按类型创建的处理器
    pub fn add_call_handler_type(mut self, handler: TypedCallHandler) -> Self {
        self.handlers.push(CallHandlerReference::Typed(handler));
        self
    }

    /// 处理器引用，按添加顺序
    pub fn handlers(&self) -> &[CallHandlerReference] {
        &self.handlers
    }

    /// 是否作用于目标
    pub fn matches(&self, target: &BuildKey) -> bool {
        self.matching_rules.iter().all(|rule| rule.matches(target))
    }

    /// 处理器引用对应的构建键
    pub fn handler_build_key(&self, reference: &CallHandlerReference) -> BuildKey {
        match reference {
            CallHandlerReference::Named(name) => BuildKey::named::<dyn CallHandler>(name.clone()),
            CallHandlerReference::Typed(handler) => {
                BuildKey::named::<dyn CallHandler>(format!("{}.{}", self.name, handler.name))
            }
        }
    }

    /// 全部处理器的构建键，按添加顺序
    pub fn handler_keys(&self) -> Vec<BuildKey> {
        self.handlers
            .iter()
            .map(|reference| self.handler_build_key(reference))
            .collect()
    }

    /// 把按类型给出的处理器登记为可构建目标
    ///
    /// 处理器因此与其他对象一样经过策略链构建，享有同样的依赖注入
    pub fn configure(&self, policies: &dyn PolicyStore) {
        for reference in &self.handlers {
            let CallHandlerReference::Typed(handler) = reference else {
                continue;
            };
            let key = self.handler_build_key(reference);
            debug!(policy = %self.name, handler = %key, "登记调用处理器");

            let factory = handler.factory.clone();
            let plan = FactoryBuildPlan::new(move |context| {
                factory(context).map(|handler| Arc::new(handler) as BuiltObject)
            });
            policies.set::<dyn BuildPlanPolicy>(key.clone(), Arc::new(plan));
            policies.set::<dyn LifetimePolicy>(key.clone(), lifetime_policy_for(handler.lifetime));
            for member in &handler.injection_members {
                member.add_policies(&key, policies);
            }
        }
    }
}

/// 策略定义登记表
///
/// 保留登记顺序，管道中处理器的顺序由此决定
#[derive(Default)]
pub struct PolicyDefinitionRegistry {
    definitions: RwLock<Vec<Arc<PolicyDefinition>>>,
}

impl PolicyDefinitionRegistry {
    /// 创建空的登记表
    pub fn new() -> Self {
        Self::default()
    }

    /// 登记策略定义
    pub fn add(&self, definition: PolicyDefinition) {
        self.definitions.write().push(Arc::new(definition));
    }

    /// 策略定义数量
    pub fn len(&self) -> usize {
        self.definitions.read().len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.definitions.read().is_empty()
    }

    /// 作用于目标的策略定义，按登记顺序
    pub fn matching(&self, target: &BuildKey) -> Vec<Arc<PolicyDefinition>> {
        self.definitions
            .read()
            .iter()
            .filter(|definition| definition.matches(target))
            .cloned()
            .collect()
    }
}
