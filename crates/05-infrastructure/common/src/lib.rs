//! # Infrastructure Common
//!
//! 对象构建运行时的公共类型。
//!
//! ## 核心类型
//!
//! - [`BuildKey`] - 构建键（类型 + 可选名称）
//! - [`BuiltObject`] - 构建产物
//! - [`Lifetime`] - 生命周期类型
//! - [`ContainerConfig`] - 容器配置
//! - [`BuildError`] / [`BuildFailure`] - 构建错误
//!
//! ## 设计原则
//!
//! - 构建键按结构相等（类型 + 名称）
//! - 原始失败始终是首要报告原因，补偿/释放失败只做附加信息

pub mod configuration;
pub mod errors;
pub mod lifecycle;
pub mod metadata;

pub use configuration::*;
pub use errors::*;
pub use lifecycle::*;
pub use metadata::*;
