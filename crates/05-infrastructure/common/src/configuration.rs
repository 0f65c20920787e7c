//! 容器配置

use crate::errors::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// 环境变量前缀，例如 `DI_MAX_BUILD_DEPTH=32`
pub const CONFIG_ENV_PREFIX: &str = "DI";

/// 容器配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerConfig {
    /// 是否启用循环构建检测
    pub enable_circular_build_detection: bool,
    /// 最大构建深度
    pub max_build_depth: usize,
    /// 是否启用拦截
    pub enable_interception: bool,
    /// 是否缓存已组装的调用处理管道
    pub cache_pipelines: bool,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            enable_circular_build_detection: true,
            max_build_depth: 100,
            enable_interception: true,
            cache_pipelines: true,
        }
    }
}

impl ContainerConfig {
    /// 从 TOML 文本加载配置
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        let config: Self = config::Config::builder()
            .add_source(config::File::from_str(content, config::FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// 从配置文件加载，并允许环境变量覆盖
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let config: Self = config::Config::builder()
            .add_source(config::File::from(path.as_ref()).required(false))
            .add_source(config::Environment::with_prefix(CONFIG_ENV_PREFIX).try_parsing(true))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// 验证配置
    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_build_depth == 0 {
            return Err(ConfigError::ValidationError {
                message: "max_build_depth 必须大于 0".to_string(),
            });
        }
        Ok(())
    }
}
