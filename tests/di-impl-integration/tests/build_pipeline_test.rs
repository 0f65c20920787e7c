//! 构建流水线集成测试


use common::{init_test_logger, EventLog, RecordingResource};
use di_abstractions::{
    BuilderContext, InjectionMember, LifetimeContainer, PolicyStoreExt, RecoveryAction,
};
use di_impl::{ContainerScope, DependencyOverride, InjectionMethod, PolicyList};
use infrastructure_common::{BuildError, BuildKey, Lifetime, LifetimeError};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Debug, PartialEq)]
struct ConnectionString(String);

#[derive(Debug)]
struct Database {
    connection: Arc<ConnectionString>,
}

#[derive(Debug)]
struct Repository {
    database: Arc<Database>,
}

#[derive(Debug)]
struct Service {
    repository: Arc<Repository>,
}

#[derive(Debug)]
struct Unregistered;

struct Cache {
    serial: usize,
}

#[derive(Debug)]
struct Reporting;

/// 测试未注册的构建键
#[test]
fn test_unregistered_key_fails_as_unresolved() {
    init_test_logger();
    let scope = ContainerScope::new();

    let failure = scope.resolve::<Unregistered>(None).unwrap_err();
    assert!(failure.is_unresolved());
    assert_eq!(failure.build_key, BuildKey::of::<Unregistered>());
    assert_eq!(failure.key_chain, vec![BuildKey::of::<Unregistered>()]);
    assert!(failure.recovery_failures.is_empty());
}

/// 测试失败的构建键和构建链指向最深处的依赖
#[test]
fn test_nested_unresolved_dependency_reports_chain() {
    init_test_logger();
    let scope = ContainerScope::new();
    scope.register_factory(None, Lifetime::Transient, |context| {
        Ok(Database {
            connection: context.resolve::<ConnectionString>(None)?,
        })
    });
    scope.register_factory(None, Lifetime::Transient, |context| {
        Ok(Repository {
            database: context.resolve::<Database>(None)?,
        })
    });

    let failure = scope.resolve::<Repository>(None).unwrap_err();
    assert!(failure.is_unresolved());
    assert_eq!(failure.build_key, BuildKey::of::<ConnectionString>());
    assert_eq!(
        failure.key_chain,
        vec![
            BuildKey::of::<Repository>(),
            BuildKey::of::<Database>(),
            BuildKey::of::<ConnectionString>(),
        ]
    );
}

#[derive(Debug)]
struct Top;
struct Optional;
struct Required;

/// 测试被工厂处理掉的可选依赖失败不会被报告
#[test]
fn test_handled_optional_failure_is_not_reported() {
    init_test_logger();
    let scope = ContainerScope::new();
    scope.register_factory(None, Lifetime::Transient, |context| {
        let _ = context.resolve::<Optional>(None);
        context.resolve::<Required>(None)?;
        Ok(Top)
    });

    let failure = scope.resolve::<Top>(None).unwrap_err();
    assert!(failure.is_unresolved());
    assert_eq!(failure.build_key, BuildKey::of::<Required>());
    assert_eq!(
        failure.key_chain,
        vec![BuildKey::of::<Top>(), BuildKey::of::<Required>()]
    );
}

/// 测试处理掉可选依赖失败后，工厂自身的失败指向它自己
#[test]
fn test_own_failure_after_handled_dependency_names_the_factory() {
    init_test_logger();
    let scope = ContainerScope::new();
    scope.register_factory::<Top, _>(None, Lifetime::Transient, |context| {
        let _ = context.resolve::<Optional>(None);
        Err(BuildError::strategy_failed(
            BuildKey::of::<Top>(),
            "校验",
            anyhow::anyhow!("配置不完整"),
        ))
    });

    let failure = scope.resolve::<Top>(None).unwrap_err();
    assert!(matches!(failure.cause(), BuildError::StrategyFailed { .. }));
    assert_eq!(failure.build_key, BuildKey::of::<Top>());
    assert_eq!(failure.key_chain, vec![BuildKey::of::<Top>()]);
}

/// 测试依赖按注入链逐层解析
#[test]
fn test_dependencies_resolve_through_factories() {
    init_test_logger();
    let scope = ContainerScope::new();
    scope.register_instance(None, ConnectionString("postgres://localhost/ads".to_string()));
    scope.register_factory(None, Lifetime::Singleton, |context| {
        Ok(Database {
            connection: context.resolve::<ConnectionString>(None)?,
        })
    });
    scope.register_factory(None, Lifetime::Transient, |context| {
        Ok(Repository {
            database: context.resolve::<Database>(None)?,
        })
    });

    let first = scope.resolve::<Repository>(None).unwrap();
    let second = scope.resolve::<Repository>(None).unwrap();
    assert!(Arc::ptr_eq(&first.database, &second.database));
    assert_eq!(first.database.connection.0, "postgres://localhost/ads");
}

/// 测试构建中登记的资源按登记的逆序释放
#[test]
fn test_tracked_resources_release_in_reverse_order() {
    init_test_logger();
    let scope = ContainerScope::new();
    let log = EventLog::new();

    let factory_log = log.clone();
    scope.register_factory(None, Lifetime::Transient, move |context| {
        context.lifetime().track(RecordingResource::new("first", &factory_log));
        context.lifetime().track(RecordingResource::new("second", &factory_log));
        context.lifetime().track(RecordingResource::new("third", &factory_log));
        Ok(Reporting)
    });

    scope.resolve::<Reporting>(None).unwrap();
    assert_eq!(scope.lifetime().len(), 3);

    scope.dispose().unwrap();
    assert_eq!(log.events(), vec!["release third", "release second", "release first"]);

    // 重复释放不会再次释放任何资源
    scope.dispose().unwrap();
    assert_eq!(log.events().len(), 3);
}

/// 测试单个资源释放失败不影响其余资源
#[test]
fn test_release_failures_are_collected() {
    init_test_logger();
    let scope = ContainerScope::new();
    let log = EventLog::new();
    scope.lifetime().track(RecordingResource::new("pool", &log));
    scope.lifetime().track(RecordingResource::failing("socket", &log));
    scope.lifetime().track(RecordingResource::failing("file", &log));

    let err = scope.dispose().unwrap_err();
    let LifetimeError::ReleaseFailed { failures } = err;
    let descriptions: Vec<_> = failures.iter().map(|failure| failure.description.as_str()).collect();
    assert_eq!(descriptions, vec!["file", "socket"]);
    assert_eq!(log.events(), vec!["release file", "release socket", "release pool"]);
}

/// 测试失败的构建按逆序执行补偿操作并移除未完成的单例
#[test]
fn test_failed_build_runs_recovery_in_reverse() {
    init_test_logger();
    let scope = ContainerScope::new();
    let log = EventLog::new();
    let serial = Arc::new(AtomicUsize::new(0));

    let cache_serial = serial.clone();
    scope.register_factory(None, Lifetime::Singleton, move |_| {
        Ok(Cache {
            serial: cache_serial.fetch_add(1, Ordering::SeqCst),
        })
    });

    let factory_log = log.clone();
    scope.register_factory(None, Lifetime::Transient, move |context| {
        for step in ["open", "reserve"] {
            let recovery_log = factory_log.clone();
            context.recovery_stack().push(RecoveryAction::new(format!("undo {step}"), move || {
                recovery_log.push(format!("undo {step}"));
                Ok(())
            }))?;
        }
        context.resolve::<Cache>(None)?;
        context.resolve::<Unregistered>(None)?;
        Ok(Reporting)
    });

    let failure = scope.resolve::<Reporting>(None).unwrap_err();
    assert!(failure.is_unresolved());
    assert_eq!(failure.build_key, BuildKey::of::<Unregistered>());
    assert_eq!(log.events(), vec!["undo reserve", "undo open"]);
    assert_eq!(log.count("undo open"), 1);

    // 未完成构建中登记的单例已被移除，重新解析会创建新实例
    let cache = scope.resolve::<Cache>(None).unwrap();
    assert_eq!(cache.serial, 1);
    assert_eq!(scope.resolve::<Cache>(None).unwrap().serial, 1);
}

/// 测试补偿失败被收集且不掩盖首要原因
#[test]
fn test_recovery_failures_do_not_mask_primary_cause() {
    init_test_logger();
    let scope = ContainerScope::new();
    let log = EventLog::new();

    let factory_log = log.clone();
    scope.register_factory::<Reporting, _>(None, Lifetime::Transient, move |context| {
        let first = factory_log.clone();
        context.recovery_stack().push(RecoveryAction::new("undo first", move || {
            first.push("undo first");
            Ok(())
        }))?;
        context
            .recovery_stack()
            .push(RecoveryAction::new("undo broken", || Err(anyhow::anyhow!("磁盘不可写"))))?;
        Err(BuildError::strategy_failed(
            BuildKey::of::<Reporting>(),
            "生成报表",
            anyhow::anyhow!("模板缺失"),
        ))
    });

    let failure = scope.resolve::<Reporting>(None).unwrap_err();
    assert!(matches!(failure.cause(), BuildError::StrategyFailed { .. }));
    assert_eq!(failure.recovery_failures.len(), 1);
    assert_eq!(failure.recovery_failures[0].description, "undo broken");
    assert_eq!(log.events(), vec!["undo first"]);
}

/// 测试策略查找优先级
#[test]
fn test_policy_lookup_precedence() {
    init_test_logger();
    #[derive(Debug, PartialEq)]
    struct Timeout(u64);

    let persistent = Arc::new(PolicyList::new());
    let operation = PolicyList::with_inner(persistent.clone());
    let named = BuildKey::named::<Database>("primary");

    operation.set(named.clone(), Arc::new(Timeout(1)));
    persistent.set(named.clone(), Arc::new(Timeout(2)));
    persistent.set(BuildKey::of::<Database>(), Arc::new(Timeout(3)));
    persistent.set_default(Arc::new(Timeout(4)));

    assert_eq!(*operation.get::<Timeout>(&named).unwrap(), Timeout(1));
    operation.clear::<Timeout>(&named);
    assert_eq!(*operation.get::<Timeout>(&named).unwrap(), Timeout(2));
    persistent.clear::<Timeout>(&named);
    assert_eq!(*operation.get::<Timeout>(&named).unwrap(), Timeout(3));
    persistent.clear::<Timeout>(&BuildKey::of::<Database>());
    assert_eq!(*operation.get::<Timeout>(&named).unwrap(), Timeout(4));
}

/// 测试解析覆盖在构建树内继承，并且不泄漏到后续构建
#[test]
fn test_resolver_overrides_are_inherited_and_scoped() {
    init_test_logger();
    let scope = ContainerScope::new();
    scope.register_instance(None, ConnectionString("default".to_string()));
    scope.register_factory(None, Lifetime::Transient, |context| {
        Ok(Database {
            connection: context.resolve::<ConnectionString>(None)?,
        })
    });
    scope.register_factory(None, Lifetime::Transient, |context| {
        Ok(Repository {
            database: context.resolve::<Database>(None)?,
        })
    });

    // 覆盖在根上登记，在孙级构建中生效
    let repository = scope
        .resolve_with_overrides::<Repository>(
            None,
            vec![Arc::new(DependencyOverride::new(ConnectionString("override".to_string())))],
        )
        .unwrap();
    assert_eq!(repository.database.connection.0, "override");

    let repository = scope.resolve::<Repository>(None).unwrap();
    assert_eq!(repository.database.connection.0, "default");
}

/// 测试子构建自身登记的覆盖优先于继承的覆盖
#[test]
fn test_child_override_wins_over_parent_override() {
    init_test_logger();
    let scope = ContainerScope::new();
    scope.register_factory(None, Lifetime::Transient, |context| {
        Ok(Database {
            connection: context.resolve::<ConnectionString>(None)?,
        })
    });
    scope.register_factory(None, Lifetime::Transient, |context| {
        context.add_resolver_override(Arc::new(DependencyOverride::new(ConnectionString(
            "repository".to_string(),
        ))));
        Ok(Repository {
            database: context.resolve::<Database>(None)?,
        })
    });
    scope.register_factory(None, Lifetime::Transient, |context| {
        Ok(Service {
            repository: context.resolve::<Repository>(None)?,
        })
    });

    // 调用方的覆盖在根上下文，仓储的覆盖在子上下文
    let service = scope
        .resolve_with_overrides::<Service>(
            None,
            vec![Arc::new(DependencyOverride::new(ConnectionString("caller".to_string())))],
        )
        .unwrap();
    assert_eq!(service.repository.database.connection.0, "repository");
}

/// 测试循环依赖被检测并报告完整构建链
#[test]
fn test_circular_dependency_is_detected() {
    init_test_logger();
    #[derive(Debug)]
    struct Left;
    struct Right;

    let scope = ContainerScope::new();
    scope.register_factory(None, Lifetime::Transient, |context| {
        context.resolve::<Right>(None)?;
        Ok(Left)
    });
    scope.register_factory(None, Lifetime::Transient, |context| {
        context.resolve::<Left>(None)?;
        Ok(Right)
    });

    let failure = scope.resolve::<Left>(None).unwrap_err();
    assert!(failure.is_circular());
    let occurrences = failure
        .key_chain
        .iter()
        .filter(|key| **key == BuildKey::of::<Left>())
        .count();
    assert!(occurrences >= 2);
    assert_eq!(
        failure.key_chain,
        vec![BuildKey::of::<Left>(), BuildKey::of::<Right>(), BuildKey::of::<Left>()]
    );
}

/// 测试构建键映射重定向到另一个注册
#[test]
fn test_mapping_retargets_to_named_registration() {
    init_test_logger();
    let scope = ContainerScope::new();
    scope.register_factory(Some("internal"), Lifetime::Singleton, |_| {
        Ok(ConnectionString("internal".to_string()))
    });
    scope.register_mapping(
        BuildKey::named::<ConnectionString>("public"),
        BuildKey::named::<ConnectionString>("internal"),
    );

    let public = scope.resolve::<ConnectionString>(Some("public")).unwrap();
    let internal = scope.resolve::<ConnectionString>(Some("internal")).unwrap();
    assert!(Arc::ptr_eq(&public, &internal));
}

/// 测试构建树级生命周期在一次构建内共享
#[test]
fn test_scoped_lifetime_is_shared_within_one_build() {
    init_test_logger();
    struct Session;
    struct Pair(Arc<Session>, Arc<Session>);

    let scope = ContainerScope::new();
    scope.register_factory(None, Lifetime::Scoped, |_| Ok(Session));
    scope.register_factory(None, Lifetime::Transient, |context| {
        Ok(Pair(
            context.resolve::<Session>(None)?,
            context.resolve::<Session>(None)?,
        ))
    });

    let first = scope.resolve::<Pair>(None).unwrap();
    let second = scope.resolve::<Pair>(None).unwrap();
    assert!(Arc::ptr_eq(&first.0, &first.1));
    assert!(!Arc::ptr_eq(&first.0, &second.0));
}

/// 测试注入方法在构建后调用
#[test]
fn test_injection_methods_run_after_construction() {
    init_test_logger();
    struct Wired {
        connection: Mutex<Option<Arc<ConnectionString>>>,
    }

    let scope = ContainerScope::new();
    scope.register_instance(None, ConnectionString("injected".to_string()));
    let key = scope.register_factory(None, Lifetime::Transient, |_| {
        Ok(Wired {
            connection: Mutex::new(None),
        })
    });
    let method: Arc<dyn InjectionMember> = Arc::new(InjectionMethod::new(
        "set_connection",
        |target, context: &mut dyn BuilderContext| {
            let wired = target
                .downcast_ref::<Wired>()
                .ok_or_else(|| BuildError::type_mismatch::<Wired>(BuildKey::of::<Wired>()))?;
            *wired.connection.lock() = Some(context.resolve::<ConnectionString>(None)?);
            Ok(())
        },
    ));
    scope.register_members(&key, &[method]);

    let wired = scope.resolve::<Wired>(None).unwrap();
    let connection = wired.connection.lock().clone().unwrap();
    assert_eq!(connection.0, "injected");
}

/// 测试拆除单例后重新解析得到新实例
#[test]
fn test_tear_down_releases_singleton_value() {
    init_test_logger();
    let scope = ContainerScope::new();
    let serial = Arc::new(AtomicUsize::new(0));
    let cache_serial = serial.clone();
    let key = scope.register_factory(None, Lifetime::Singleton, move |_| {
        Ok(Cache {
            serial: cache_serial.fetch_add(1, Ordering::SeqCst),
        })
    });

    let cache = scope.resolve::<Cache>(None).unwrap();
    assert_eq!(cache.serial, 0);
    scope.tear_down(key, cache).unwrap();
    assert_eq!(scope.resolve::<Cache>(None).unwrap().serial, 1);
}
