//! 解析覆盖实现

use di_abstractions::{BuilderContext, DependencyResolverPolicy, ResolverOverride};
use infrastructure_common::{BuildError, BuildKey, BuiltObject, TypeInfo};
use std::sync::Arc;

/// 组合解析覆盖
///
/// 先按登记顺序查询自身的覆盖，再查询从父上下文继承的覆盖链，
/// 第一个非空结果胜出。子上下文因此总能看到父上下文的全部覆盖，
/// 并且自身登记的覆盖优先。
#[derive(Clone, Default)]
pub struct CompositeResolverOverride {
    overrides: Vec<Arc<dyn ResolverOverride>>,
    inherited: Option<Arc<CompositeResolverOverride>>,
}

impl CompositeResolverOverride {
    /// 创建空的覆盖链
    pub fn new() -> Self {
        Self::default()
    }

    /// 创建继承 `parent` 的覆盖链
    pub fn inherit(parent: &CompositeResolverOverride) -> Self {
        let inherited = (!parent.is_empty()).then(|| Arc::new(parent.clone()));
        Self {
            overrides: Vec::new(),
            inherited,
        }
    }

    /// 追加覆盖
    pub fn add(&mut self, resolver_override: Arc<dyn ResolverOverride>) {
        self.overrides.push(resolver_override);
    }

    /// 批量追加覆盖
    pub fn add_range<I>(&mut self, overrides: I)
    where
        I: IntoIterator<Item = Arc<dyn ResolverOverride>>,
    {
        self.overrides.extend(overrides);
    }

    /// 覆盖总数（包含继承的）
    pub fn len(&self) -> usize {
        self.overrides.len() + self.inherited.as_ref().map_or(0, |inherited| inherited.len())
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ResolverOverride for CompositeResolverOverride {
    fn get_resolver(
        &self,
        context: &dyn BuilderContext,
        dependency: &BuildKey,
    ) -> Option<Arc<dyn DependencyResolverPolicy>> {
        self.overrides
            .iter()
            .find_map(|resolver_override| resolver_override.get_resolver(context, dependency))
            .or_else(|| {
                self.inherited
                    .as_ref()
                    .and_then(|inherited| inherited.get_resolver(context, dependency))
            })
    }
}

/// 固定值解析器
pub struct LiteralValueResolver {
    value: BuiltObject,
}

impl LiteralValueResolver {
    /// 创建固定值解析器
    pub fn new(value: BuiltObject) -> Self {
        Self { value }
    }
}

impl DependencyResolverPolicy for LiteralValueResolver {
    fn resolve(&self, _context: &mut dyn BuilderContext) -> Result<BuiltObject, BuildError> {
        Ok(self.value.clone())
    }
}

/// 依赖覆盖
///
/// 为指定类型的依赖提供替代值。未指定名称时匹配该类型的所有名称。
pub struct DependencyOverride {
    dependency_type: TypeInfo,
    name: Option<String>,
    resolver: Arc<LiteralValueResolver>,
}

impl DependencyOverride {
    /// 覆盖类型为 `T` 的依赖
    pub fn new<T>(value: T) -> Self
    where
        T: Send + Sync + 'static,
    {
        Self::from_object(TypeInfo::of::<T>(), None, Arc::new(value))
    }

    /// 覆盖类型为 `T`、名称为 `name` 的依赖
    pub fn named<T>(name: impl Into<String>, value: T) -> Self
    where
        T: Send + Sync + 'static,
    {
        Self::from_object(TypeInfo::of::<T>(), Some(name.into()), Arc::new(value))
    }

    /// 用已经构建好的对象覆盖
    pub fn from_object(dependency_type: TypeInfo, name: Option<String>, value: BuiltObject) -> Self {
        Self {
            dependency_type,
            name,
            resolver: Arc::new(LiteralValueResolver::new(value)),
        }
    }
}

impl ResolverOverride for DependencyOverride {
    fn get_resolver(
        &self,
        _context: &dyn BuilderContext,
        dependency: &BuildKey,
    ) -> Option<Arc<dyn DependencyResolverPolicy>> {
        let type_matches = dependency.type_info() == self.dependency_type;
        let name_matches = self
            .name
            .as_deref()
            .map_or(true, |name| dependency.name() == Some(name));
        if type_matches && name_matches {
            Some(self.resolver.clone())
        } else {
            None
        }
    }
}
