//! 容器配置集成测试


use common::init_test_logger;
use di_impl::ContainerScope;
use infrastructure_common::{BuildError, ContainerConfig, Lifetime};
use std::io::Write;

#[derive(Debug)]
struct Node;

/// 测试从配置文件加载并创建作用域
#[test]
fn test_scope_from_config_file() {
    init_test_logger();
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(file, "max_build_depth = 4").unwrap();
    writeln!(file, "enable_circular_build_detection = false").unwrap();
    file.flush().unwrap();

    let config = ContainerConfig::load(file.path()).unwrap();
    assert_eq!(config.max_build_depth, 4);
    assert!(!config.enable_circular_build_detection);
    assert!(config.cache_pipelines);

    // 关闭循环检测后由深度上限终止失控的构建
    let scope = ContainerScope::with_config(config).unwrap();
    scope.register_factory(None, Lifetime::Transient, |context| {
        context.resolve::<Node>(None)?;
        Ok(Node)
    });
    let failure = scope.resolve::<Node>(None).unwrap_err();
    assert!(matches!(failure.cause(), BuildError::DepthExceeded { max_depth: 4, .. }));
    assert_eq!(failure.key_chain.len(), 6);
}

/// 测试缺少配置文件时使用默认值
#[test]
fn test_missing_config_file_uses_defaults() {
    init_test_logger();
    let dir = tempfile::tempdir().unwrap();
    let config = ContainerConfig::load(dir.path().join("absent.toml")).unwrap();
    assert_eq!(config, ContainerConfig::default());
}

/// 测试无效配置被拒绝
#[test]
fn test_invalid_config_is_rejected() {
    init_test_logger();
    assert!(ContainerConfig::from_toml_str("max_build_depth = 0").is_err());
    assert!(ContainerConfig::from_toml_str("max_build_depth = \"deep\"").is_err());
}
