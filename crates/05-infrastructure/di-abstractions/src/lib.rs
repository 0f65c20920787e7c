//! # Dependency Injection Abstractions
//!
//! 构建管道抽象层，定义构建策略在执行时能看到的全部接口。
//!
//! ## 核心接口
//!
//! - [`BuilderContext`] - 构建上下文
//! - [`BuilderStrategy`] - 构建策略
//! - [`PolicyStore`] - 分层策略表
//! - [`LifetimeContainer`] - 生命周期资源跟踪
//! - [`RecoveryStack`] - 失败回滚的补偿栈
//! - [`ResolverOverride`] - 解析覆盖
//! - [`CallHandler`] - 方法调用拦截处理器

pub mod context;
pub mod interception;
pub mod lifetime;
pub mod policy;
pub mod recovery;
pub mod resolver;
pub mod strategy;

pub use context::*;
pub use interception::*;
pub use lifetime::*;
pub use policy::*;
pub use recovery::*;
pub use resolver::*;
pub use strategy::*;
