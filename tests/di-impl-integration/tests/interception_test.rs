//! 调用拦截集成测试


use common::{init_test_logger, EventLog};
use di_abstractions::{CallHandler, MethodInvocation, MethodReturn, NextHandler};
use di_impl::{
    ContainerScope, NameMatchingRule, PolicyDefinition, PredicateMatchingRule, TypeMatchingRule,
    TypedCallHandler,
};
use infrastructure_common::{BuildKey, BuiltObject, ContainerConfig, InvocationError, Lifetime};
use serde_json::{json, Value};
use std::sync::Arc;

#[derive(Debug)]
struct Pricing {
    base: i64,
}

impl Pricing {
    fn quote(&self, quantity: i64) -> i64 {
        self.base * quantity
    }
}

struct Inventory;

struct Missing;

/// 记录进入和返回的处理器
struct Tracing {
    label: &'static str,
    log: EventLog,
}

impl CallHandler for Tracing {
    fn invoke(&self, input: &mut MethodInvocation, next: NextHandler<'_>) -> MethodReturn {
        self.log.push(format!("{} in", self.label));
        let result = next.proceed(input);
        self.log.push(format!("{} out", self.label));
        result
    }
}

/// 不调用下一阶段，直接给出返回值
struct ShortCircuit {
    label: &'static str,
    log: EventLog,
}

impl CallHandler for ShortCircuit {
    fn invoke(&self, _input: &mut MethodInvocation, _next: NextHandler<'_>) -> MethodReturn {
        self.log.push(format!("{} short", self.label));
        Ok(json!("cached"))
    }
}

fn dispatch_pricing(target: &BuiltObject, input: &MethodInvocation) -> MethodReturn {
    let pricing = target
        .downcast_ref::<Pricing>()
        .ok_or_else(|| InvocationError::TargetFailed {
            method: input.method.clone(),
            message: "目标不是 Pricing".to_string(),
        })?;
    match input.method.as_str() {
        "quote" => {
            let quantity = input.argument(0).and_then(Value::as_i64).unwrap_or_default();
            Ok(json!(pricing.quote(quantity)))
        }
        other => Err(InvocationError::TargetFailed {
            method: other.to_string(),
            message: "未知方法".to_string(),
        }),
    }
}

fn pricing_scope(log: &EventLog, short_circuit_second: bool) -> ContainerScope {
    let scope = ContainerScope::new();
    scope.register_factory(None, Lifetime::Singleton, |_| Ok(Pricing { base: 10 }));
    scope.enable_interception(BuildKey::of::<Pricing>());

    scope.register_call_handler("h1", Tracing { label: "h1", log: log.clone() });
    if short_circuit_second {
        scope.register_call_handler("h2", ShortCircuit { label: "h2", log: log.clone() });
    } else {
        scope.register_call_handler("h2", Tracing { label: "h2", log: log.clone() });
    }
    scope.register_call_handler("h3", Tracing { label: "h3", log: log.clone() });

    scope.add_policy_definition(
        PolicyDefinition::new("p1")
            .with_matching_rule(TypeMatchingRule::of::<Pricing>())
            .add_call_handler("h1")
            .add_call_handler("h2"),
    );
    scope.add_policy_definition(PolicyDefinition::new("p2").add_call_handler("h3"));
    scope
}

/// 测试处理器按策略登记顺序进入并逆序返回
#[test]
fn test_pipeline_runs_handlers_as_onion() {
    init_test_logger();
    let log = EventLog::new();
    let scope = pricing_scope(&log, false);

    let pricing = scope.resolve_intercepted::<Pricing>(None).unwrap();
    assert_eq!(pricing.pipeline().len(), 3);

    let result = pricing.invoke("quote", vec![json!(3)], |target, input| {
        log.push("target");
        dispatch_pricing(target, input)
    });
    assert_eq!(result, Ok(json!(30)));
    assert_eq!(
        log.events(),
        vec!["h1 in", "h2 in", "h3 in", "target", "h3 out", "h2 out", "h1 out"]
    );
}

/// 测试短路的处理器跳过后续处理器和目标方法
#[test]
fn test_short_circuit_skips_rest_of_pipeline() {
    init_test_logger();
    let log = EventLog::new();
    let scope = pricing_scope(&log, true);

    let pricing = scope.resolve_intercepted::<Pricing>(None).unwrap();
    let result = pricing.invoke("quote", vec![json!(3)], |target, input| {
        log.push("target");
        dispatch_pricing(target, input)
    });

    assert_eq!(result, Ok(json!("cached")));
    assert_eq!(log.events(), vec!["h1 in", "h2 short", "h1 out"]);
    assert_eq!(log.count("h3 in"), 0);
}

/// 测试目标方法的异常沿管道返回
#[test]
fn test_target_errors_flow_back_through_handlers() {
    init_test_logger();
    let log = EventLog::new();
    let scope = pricing_scope(&log, false);

    let pricing = scope.resolve_intercepted::<Pricing>(None).unwrap();
    let result = pricing.invoke("refund", Vec::new(), dispatch_pricing);
    assert!(matches!(result, Err(InvocationError::TargetFailed { .. })));
    assert_eq!(log.events().last().map(String::as_str), Some("h1 out"));
}

/// 测试被拦截的对象仍可按原类型解析
#[test]
fn test_resolve_unwraps_intercepted_instance() {
    init_test_logger();
    let log = EventLog::new();
    let scope = pricing_scope(&log, false);

    let intercepted = scope.resolve_intercepted::<Pricing>(None).unwrap();
    let plain = scope.resolve::<Pricing>(None).unwrap();
    assert_eq!(plain.quote(2), 20);
    assert!(Arc::ptr_eq(&intercepted.target_as::<Pricing>().unwrap(), &plain));
}

/// 测试只有匹配的策略参与组装
#[test]
fn test_matching_rules_select_policies() {
    init_test_logger();
    let log = EventLog::new();
    let scope = pricing_scope(&log, false);
    scope.add_policy_definition(
        PolicyDefinition::new("eu-only")
            .with_matching_rule(TypeMatchingRule::of::<Pricing>())
            .with_matching_rule(NameMatchingRule::new("eu"))
            .add_call_handler("h1"),
    );

    // p1 只匹配 Pricing，p2 没有规则
    assert_eq!(scope.assemble_pipeline(&BuildKey::of::<Inventory>()).unwrap().len(), 1);
    assert_eq!(scope.assemble_pipeline(&BuildKey::of::<Pricing>()).unwrap().len(), 3);
    assert_eq!(scope.assemble_pipeline(&BuildKey::named::<Pricing>("eu")).unwrap().len(), 4);
}

/// 测试按类型给出的处理器经由构建流水线创建并注入依赖
#[test]
fn test_typed_handler_receives_injected_dependencies() {
    init_test_logger();

    struct Limit(i64);

    struct LimitGuard {
        limit: Arc<Limit>,
    }

    impl CallHandler for LimitGuard {
        fn invoke(&self, input: &mut MethodInvocation, next: NextHandler<'_>) -> MethodReturn {
            let quantity = input.argument(0).and_then(Value::as_i64).unwrap_or_default();
            if quantity > self.limit.0 {
                return Err(InvocationError::Rejected {
                    handler: "LimitGuard".to_string(),
                    message: format!("数量 {quantity} 超过上限"),
                });
            }
            next.proceed(input)
        }
    }

    let scope = ContainerScope::new();
    scope.register_instance(None, Limit(5));
    scope.register_factory(None, Lifetime::Singleton, |_| Ok(Pricing { base: 7 }));
    scope.enable_interception(BuildKey::of::<Pricing>());
    scope.add_policy_definition(
        PolicyDefinition::new("limits")
            .with_matching_rule(PredicateMatchingRule::new(|key| key.is::<Pricing>()))
            .add_call_handler_type(TypedCallHandler::new("guard", Lifetime::Singleton, |context| {
                Ok(LimitGuard {
                    limit: context.resolve::<Limit>(None)?,
                })
            })),
    );

    let pricing = scope.resolve_intercepted::<Pricing>(None).unwrap();
    assert_eq!(pricing.invoke("quote", vec![json!(2)], dispatch_pricing), Ok(json!(14)));
    assert!(matches!(
        pricing.invoke("quote", vec![json!(9)], dispatch_pricing),
        Err(InvocationError::Rejected { .. })
    ));
}

/// 测试引用未登记的处理器时构建失败
#[test]
fn test_missing_named_handler_fails_the_build() {
    init_test_logger();
    let scope = ContainerScope::new();
    scope.register_factory(None, Lifetime::Singleton, |_| Ok(Pricing { base: 1 }));
    scope.enable_interception(BuildKey::of::<Pricing>());
    scope.add_policy_definition(PolicyDefinition::new("broken").add_call_handler("absent"));

    let failure = scope.resolve::<Pricing>(None).unwrap_err();
    assert!(failure.is_unresolved());
    assert_eq!(failure.build_key, BuildKey::named::<dyn CallHandler>("absent"));

    // 失败的构建不会留下单例或管道
    assert!(scope.pipelines().get(&BuildKey::of::<Pricing>()).is_none());
}

/// 测试失败的构建树移除其间缓存的管道
#[test]
fn test_failed_build_removes_cached_pipeline() {
    init_test_logger();
    struct Checkout;

    let log = EventLog::new();
    let scope = pricing_scope(&log, false);
    scope.register_factory(None, Lifetime::Transient, |context| {
        context.resolve::<Pricing>(None)?;
        context.resolve::<Missing>(None)?;
        Ok(Checkout)
    });

    assert!(scope.resolve::<Checkout>(None).is_err());
    assert!(scope.pipelines().get(&BuildKey::of::<Pricing>()).is_none());

    scope.resolve::<Pricing>(None).unwrap();
    assert!(scope.pipelines().get(&BuildKey::of::<Pricing>()).is_some());
}

/// 测试关闭拦截后不组装管道
#[test]
fn test_interception_can_be_disabled_by_config() {
    init_test_logger();
    let config = ContainerConfig {
        enable_interception: false,
        ..ContainerConfig::default()
    };
    let scope = ContainerScope::with_config(config).unwrap();
    scope.register_factory(None, Lifetime::Singleton, |_| Ok(Pricing { base: 1 }));
    scope.enable_interception(BuildKey::of::<Pricing>());
    scope.add_policy_definition(PolicyDefinition::new("any").add_call_handler("absent"));

    let pricing = scope.resolve_intercepted::<Pricing>(None).unwrap();
    assert!(pricing.pipeline().is_empty());
}
