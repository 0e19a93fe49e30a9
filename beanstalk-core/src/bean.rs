use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::sync::Arc;

use crate::bean_factory::DefaultListableBeanFactory;
use crate::factory_bean::{FactoryBean, FactoryBeanAdapter};
use crate::lifecycle::{Lifecycle, LifecycleAdapter, SmartLifecycle};
use crate::utils::naming::default_bean_name;
use crate::{ContainerError, ContainerResult, Scope};

/// 容器内部保存的共享 Bean 实例
pub type SharedBean = Arc<dyn Any + Send + Sync>;

/// 类型描述符 - 注册时显式声明，替代反射式的类型发现
#[derive(Clone, Copy)]
pub struct TypeDescriptor {
    id: TypeId,
    name: &'static str,
}

impl TypeDescriptor {
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is<T: ?Sized + 'static>(&self) -> bool {
        self.id == TypeId::of::<T>()
    }
}

impl PartialEq for TypeDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeDescriptor {}

impl Hash for TypeDescriptor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeDescriptor({})", self.name)
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// 实例提供者 - 负责创建 Bean 实例
///
/// 创建时可以通过 `factory` 解析依赖。
pub trait InstanceSupplier: Send + Sync {
    /// 创建 Bean 实例
    fn create(
        &self,
        factory: &DefaultListableBeanFactory,
    ) -> ContainerResult<Box<dyn Any + Send + Sync>>;

    /// 创建出的实例类型
    fn type_descriptor(&self) -> TypeDescriptor;
}

/// 生命周期回调类型
pub type InitCallback =
    Box<dyn Fn(&mut (dyn Any + Send + Sync)) -> ContainerResult<()> + Send + Sync>;
pub type DestroyCallback = Box<dyn Fn(&(dyn Any + Send + Sync)) -> ContainerResult<()> + Send + Sync>;

/// Bean 定义 - 描述如何创建和管理 Bean
pub struct BeanDefinition {
    /// Bean 的名称
    pub name: String,

    /// Bean 的作用域
    pub scope: Scope,

    /// 是否延迟初始化（仅对单例有效）
    pub lazy: bool,

    /// 必须先于本 Bean 创建的 Bean（depends-on）
    pub dependencies: Vec<String>,

    pub(crate) supplier: Box<dyn InstanceSupplier>,

    /// 非空表示该 Bean 是一个 FactoryBean，按名称获取时返回其产出的对象
    pub(crate) factory_bean: Option<FactoryBeanAdapter>,

    /// 非空表示该 Bean 参与 start/stop 生命周期
    pub(crate) lifecycle: Option<LifecycleAdapter>,

    /// 初始化回调（@PostConstruct）
    pub(crate) init_callback: Option<InitCallback>,

    /// 销毁回调（@PreDestroy）
    pub(crate) destroy_callback: Option<DestroyCallback>,
}

impl BeanDefinition {
    /// 创建新的 Bean 定义
    pub fn new<S>(name: impl Into<String>, supplier: S) -> Self
    where
        S: InstanceSupplier + 'static,
    {
        Self {
            name: name.into(),
            scope: Scope::default(),
            lazy: false,
            dependencies: Vec::new(),
            supplier: Box::new(supplier),
            factory_bean: None,
            lifecycle: None,
            init_callback: None,
            destroy_callback: None,
        }
    }

    /// 使用函数创建 Bean 定义
    pub fn of<T, F>(name: impl Into<String>, supplier_fn: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&DefaultListableBeanFactory) -> ContainerResult<T> + Send + Sync + 'static,
    {
        Self::new(name, FunctionSupplier::new(supplier_fn))
    }

    /// 以类型名的 camelCase 形式作为 Bean 名称，例如 `ConnectionPool` → `connectionPool`
    pub fn of_type<T, F>(supplier_fn: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&DefaultListableBeanFactory) -> ContainerResult<T> + Send + Sync + 'static,
    {
        Self::of(default_bean_name::<T>(), supplier_fn)
    }

    /// 注册一个 FactoryBean：按名称获取得到它产出的对象，`&name` 得到它本身
    pub fn factory_bean<F, S>(name: impl Into<String>, supplier_fn: S) -> Self
    where
        F: FactoryBean,
        S: Fn(&DefaultListableBeanFactory) -> ContainerResult<F> + Send + Sync + 'static,
    {
        let mut definition = Self::of(name, supplier_fn);
        definition.factory_bean = Some(FactoryBeanAdapter::of::<F>());
        definition
    }

    /// 设置作用域
    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    /// 设置延迟初始化
    pub fn with_lazy(mut self, lazy: bool) -> Self {
        self.lazy = lazy;
        self
    }

    /// 设置依赖列表
    pub fn with_dependencies<I, N>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<String>,
    {
        self.dependencies = dependencies.into_iter().map(Into::into).collect();
        self
    }

    /// 声明该 Bean 实现了 [`Lifecycle`]
    pub fn with_lifecycle<T>(mut self) -> Self
    where
        T: Lifecycle + Any,
    {
        self.lifecycle = Some(LifecycleAdapter::plain::<T>());
        self
    }

    /// 声明该 Bean 实现了 [`SmartLifecycle`]（带阶段、自动启动和异步停止）
    pub fn with_smart_lifecycle<T>(mut self) -> Self
    where
        T: SmartLifecycle + Any,
    {
        self.lifecycle = Some(LifecycleAdapter::smart::<T>());
        self
    }

    /// 设置初始化回调
    pub fn with_init<T, F>(mut self, init_fn: F) -> Self
    where
        T: Any,
        F: Fn(&mut T) -> ContainerResult<()> + Send + Sync + 'static,
    {
        let bean_name = self.name.clone();
        self.init_callback = Some(Box::new(move |bean: &mut (dyn Any + Send + Sync)| {
            let target = bean.downcast_mut::<T>().ok_or_else(|| ContainerError::TypeMismatch {
                name: bean_name.clone(),
                expected: std::any::type_name::<T>().to_string(),
                found: "unknown".to_string(),
            })?;
            init_fn(target)
        }));
        self
    }

    /// 设置销毁回调
    pub fn with_destroy<T, F>(mut self, destroy_fn: F) -> Self
    where
        T: Any,
        F: Fn(&T) -> ContainerResult<()> + Send + Sync + 'static,
    {
        let bean_name = self.name.clone();
        self.destroy_callback = Some(Box::new(move |bean: &(dyn Any + Send + Sync)| {
            let target = bean.downcast_ref::<T>().ok_or_else(|| ContainerError::TypeMismatch {
                name: bean_name.clone(),
                expected: std::any::type_name::<T>().to_string(),
                found: "unknown".to_string(),
            })?;
            destroy_fn(target)
        }));
        self
    }

    /// 实例本身的类型（FactoryBean 时为工厂类型）
    pub fn bean_type(&self) -> TypeDescriptor {
        self.supplier.type_descriptor()
    }

    /// 按名称获取时对外暴露的类型（FactoryBean 时为产出对象的声明类型）
    pub fn exposed_type(&self) -> TypeDescriptor {
        match &self.factory_bean {
            Some(adapter) => adapter.product_type(),
            None => self.bean_type(),
        }
    }

    pub fn is_factory_bean(&self) -> bool {
        self.factory_bean.is_some()
    }

    pub fn is_lifecycle(&self) -> bool {
        self.lifecycle.is_some()
    }
}

impl fmt::Debug for BeanDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BeanDefinition")
            .field("name", &self.name)
            .field("scope", &self.scope)
            .field("lazy", &self.lazy)
            .field("dependencies", &self.dependencies)
            .field("type_name", &self.bean_type().name())
            .field("factory_bean", &self.is_factory_bean())
            .field("lifecycle", &self.is_lifecycle())
            .finish()
    }
}

/// 简单的函数提供者实现
pub struct FunctionSupplier<T, F> {
    supplier_fn: F,
    _phantom: PhantomData<fn() -> T>,
}

impl<T, F> FunctionSupplier<T, F>
where
    T: Any + Send + Sync,
    F: Fn(&DefaultListableBeanFactory) -> ContainerResult<T> + Send + Sync,
{
    pub fn new(supplier_fn: F) -> Self {
        Self {
            supplier_fn,
            _phantom: PhantomData,
        }
    }
}

impl<T, F> InstanceSupplier for FunctionSupplier<T, F>
where
    T: Any + Send + Sync,
    F: Fn(&DefaultListableBeanFactory) -> ContainerResult<T> + Send + Sync,
{
    fn create(
        &self,
        factory: &DefaultListableBeanFactory,
    ) -> ContainerResult<Box<dyn Any + Send + Sync>> {
        let instance = (self.supplier_fn)(factory)?;
        Ok(Box::new(instance))
    }

    fn type_descriptor(&self) -> TypeDescriptor {
        TypeDescriptor::of::<T>()
    }
}
