//! 方法调用拦截
//!
//! 策略定义把匹配规则和调用处理器列表关联起来；构建时为每个被拦截目标
//! 组装一次调用处理管道，之后每次调用都经过该管道。

mod intercepted;
mod matching_rules;
mod pipeline;
mod policy_definition;

pub use intercepted::InterceptedInstance;
pub use matching_rules::{NameMatchingRule, PredicateMatchingRule, TypeMatchingRule};
pub use pipeline::{assemble_pipeline, HandlerPipeline, PipelineManager};
pub use policy_definition::{
    as_call_handler, CallHandlerReference, PolicyDefinition, PolicyDefinitionRegistry, TypedCallHandler,
};
