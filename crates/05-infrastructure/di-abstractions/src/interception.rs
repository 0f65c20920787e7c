//! 方法调用拦截抽象接口
//!
//! 调用处理器按洋葱模型执行：进入时按管道顺序，返回时按逆序。
//! 处理器可以不调用下一阶段而直接给出返回值，从而短路后续处理器和目标方法。

use infrastructure_common::{BuildKey, InvocationError};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// 方法调用结果：返回值或异常
pub type MethodReturn = Result<Value, InvocationError>;

/// 目标方法
pub type InvocationTarget<'a> = &'a dyn Fn(&MethodInvocation) -> MethodReturn;

/// 一次方法调用
#[derive(Debug, Clone, PartialEq)]
pub struct MethodInvocation {
    /// 被拦截对象的构建键
    pub target_key: BuildKey,
    /// 方法名
    pub method: String,
    /// 参数
    pub arguments: Vec<Value>,
    /// 处理器之间共享的调用数据
    pub invocation_context: HashMap<String, Value>,
}

impl MethodInvocation {
    /// 创建方法调用
    pub fn new(target_key: BuildKey, method: impl Into<String>, arguments: Vec<Value>) -> Self {
        Self {
            target_key,
            method: method.into(),
            arguments,
            invocation_context: HashMap::new(),
        }
    }

    /// 按位置获取参数
    pub fn argument(&self, index: usize) -> Option<&Value> {
        self.arguments.get(index)
    }
}

/// 调用处理器 trait
pub trait CallHandler: Send + Sync {
    /// 处理调用；调用 `next.proceed(input)` 进入下一阶段
    fn invoke(&self, input: &mut MethodInvocation, next: NextHandler<'_>) -> MethodReturn;
}

/// 管道中的下一阶段：剩余处理器或目标方法
pub struct NextHandler<'a> {
    remaining: &'a [Arc<dyn CallHandler>],
    target: InvocationTarget<'a>,
}

impl<'a> NextHandler<'a> {
    /// 创建下一阶段
    pub fn new(remaining: &'a [Arc<dyn CallHandler>], target: InvocationTarget<'a>) -> Self {
        Self { remaining, target }
    }

    /// 剩余处理器数量
    pub fn remaining(&self) -> usize {
        self.remaining.len()
    }

    /// 进入下一阶段
    pub fn proceed(self, input: &mut MethodInvocation) -> MethodReturn {
        match self.remaining.split_first() {
            Some((handler, rest)) => handler.invoke(input, NextHandler::new(rest, self.target)),
            None => (self.target)(input),
        }
    }
}

/// 匹配规则 trait
///
/// 判断一个策略定义是否作用于某个拦截目标
pub trait MatchingRule: Send + Sync {
    /// 是否匹配
    fn matches(&self, target: &BuildKey) -> bool;
}
