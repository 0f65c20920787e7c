//! 元数据定义
//!
//! 提供类型信息与构建键

use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// 构建产物
///
/// 构建管道产出的对象统一以该形式在策略之间传递
pub type BuiltObject = Arc<dyn Any + Send + Sync>;

/// 类型信息
#[derive(Debug, Clone, Copy)]
pub struct TypeInfo {
    /// 类型ID
    pub id: TypeId,
    /// 完整类型名称（包含模块路径）
    pub full_name: &'static str,
}

impl TypeInfo {
    /// 从类型获取类型信息
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            full_name: std::any::type_name::<T>(),
        }
    }

    /// 获取简短的类型名称（不包含模块路径）
    pub fn short_name(&self) -> &'static str {
        // 泛型参数里也可能带 `::`，只截取最外层路径
        let head = self.full_name.split('<').next().unwrap_or(self.full_name);
        let offset = head.rfind("::").map_or(0, |idx| idx + 2);
        &self.full_name[offset..]
    }
}

impl PartialEq for TypeInfo {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeInfo {}

impl Hash for TypeInfo {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// 构建键
///
/// 标识"构建什么"：主体类型加上可选的区分名称。
/// 相等性按结构比较（类型 + 名称），是策略表查找和构建操作的身份。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BuildKey {
    type_info: TypeInfo,
    name: Option<String>,
}

impl BuildKey {
    /// 创建不带名称的构建键
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            type_info: TypeInfo::of::<T>(),
            name: None,
        }
    }

    /// 创建带名称的构建键
    pub fn named<T: ?Sized + 'static>(name: impl Into<String>) -> Self {
        Self {
            type_info: TypeInfo::of::<T>(),
            name: Some(name.into()),
        }
    }

    /// 从类型信息和可选名称创建构建键
    pub fn new(type_info: TypeInfo, name: Option<String>) -> Self {
        Self { type_info, name }
    }

    /// 类型信息
    pub fn type_info(&self) -> TypeInfo {
        self.type_info
    }

    /// 类型ID
    pub fn type_id(&self) -> TypeId {
        self.type_info.id
    }

    /// 区分名称
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// 是否为指定类型
    pub fn is<T: ?Sized + 'static>(&self) -> bool {
        self.type_info.id == TypeId::of::<T>()
    }

    /// 去掉名称后的通用键
    pub fn without_name(&self) -> Self {
        Self {
            type_info: self.type_info,
            name: None,
        }
    }

    /// 替换名称
    pub fn with_name(mut self, name: Option<String>) -> Self {
        self.name = name;
        self
    }
}

impl fmt::Display for BuildKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{}[{}]", self.type_info.short_name(), name),
            None => f.write_str(self.type_info.short_name()),
        }
    }
}

/// 将构建链格式化为 `A -> B -> C`
pub fn format_key_chain(chain: &[BuildKey]) -> String {
    chain
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" -> ")
}
