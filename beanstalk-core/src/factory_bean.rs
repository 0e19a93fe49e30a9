//! FactoryBean - 工厂式生产者
//!
//! 一个 FactoryBean 自身由容器管理，但按名称获取时返回的是它产出的对象。
//! 产出对象的销毁不由 FactoryBean 负责。

use std::any::Any;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::bean::{SharedBean, TypeDescriptor};
use crate::{ContainerError, ContainerResult, Scope};

/// 工厂式生产者
pub trait FactoryBean: Send + Sync + 'static {
    /// 产出对象的类型
    type Object: Any + Send + Sync;

    /// 获取产出对象
    ///
    /// `Ok(None)` 表示合法的空结果，不是错误。尚未完成自身初始化时返回
    /// [`ContainerError::FactoryBeanNotInitialized`]。
    fn get_object(&self) -> ContainerResult<Option<Arc<Self::Object>>>;

    /// 尽力给出产出对象的类型，不得触发实例化
    ///
    /// 必须在任何初始化完成之前就可以安全调用。
    fn object_type(&self) -> Option<TypeDescriptor> {
        Some(TypeDescriptor::of::<Self::Object>())
    }

    /// 多次 `get_object` 是否保证返回同一个引用
    fn is_singleton(&self) -> bool {
        true
    }
}

/// 类型擦除后的 FactoryBean 调用表，注册时按具体类型生成
#[derive(Clone, Copy)]
pub(crate) struct FactoryBeanAdapter {
    product_type: TypeDescriptor,
    get_object: fn(&str, &SharedBean) -> ContainerResult<Option<SharedBean>>,
    object_type: fn(&SharedBean) -> Option<TypeDescriptor>,
    is_singleton: fn(&SharedBean) -> bool,
}

impl FactoryBeanAdapter {
    pub(crate) fn of<F: FactoryBean>() -> Self {
        Self {
            product_type: TypeDescriptor::of::<F::Object>(),
            get_object: erased_get_object::<F>,
            object_type: erased_object_type::<F>,
            is_singleton: erased_is_singleton::<F>,
        }
    }

    /// 注册时声明的产出类型，无需实例化
    pub(crate) fn product_type(&self) -> TypeDescriptor {
        self.product_type
    }

    /// `name` 为注册名，仅用于错误信息
    pub(crate) fn get_object(&self, name: &str, factory: &SharedBean) -> ContainerResult<Option<SharedBean>> {
        (self.get_object)(name, factory)
    }

    pub(crate) fn object_type(&self, factory: &SharedBean) -> Option<TypeDescriptor> {
        (self.object_type)(factory)
    }

    pub(crate) fn is_singleton(&self, factory: &SharedBean) -> bool {
        (self.is_singleton)(factory)
    }
}

fn erased_get_object<F: FactoryBean>(
    name: &str,
    factory: &SharedBean,
) -> ContainerResult<Option<SharedBean>> {
    let factory = factory
        .downcast_ref::<F>()
        .ok_or_else(|| ContainerError::TypeMismatch {
            name: name.to_string(),
            expected: std::any::type_name::<F>().to_string(),
            found: format!("{:?}", (**factory).type_id()),
        })?;
    Ok(factory.get_object()?.map(|object| object as SharedBean))
}

fn erased_object_type<F: FactoryBean>(factory: &SharedBean) -> Option<TypeDescriptor> {
    factory.downcast_ref::<F>().and_then(|f| f.object_type())
}

fn erased_is_singleton<F: FactoryBean>(factory: &SharedBean) -> bool {
    factory
        .downcast_ref::<F>()
        .map_or(true, |f| f.is_singleton())
}

type CreateFn<T> = Box<dyn Fn() -> ContainerResult<Option<T>> + Send + Sync>;

/// 通用的 FactoryBean 实现
///
/// 必须先调用 [`initialize`](Self::initialize)，之前的 `get_object` 返回
/// `FactoryBeanNotInitialized`。单例模式下最多创建一次，并发调用也只会创建一次。
pub struct CachingFactoryBean<T> {
    name: String,
    scope: Scope,
    create_fn: CreateFn<T>,
    initialized: AtomicBool,
    instance: Mutex<Option<Option<Arc<T>>>>,
}

impl<T> CachingFactoryBean<T>
where
    T: Any + Send + Sync,
{
    /// 创建新的 FactoryBean，`create_fn` 可以返回 `None` 表示空结果
    pub fn new<F>(name: impl Into<String>, scope: Scope, create_fn: F) -> Self
    where
        F: Fn() -> ContainerResult<Option<T>> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            scope,
            create_fn: Box::new(create_fn),
            initialized: AtomicBool::new(false),
            instance: Mutex::new(None),
        }
    }

    pub fn singleton<F>(name: impl Into<String>, create_fn: F) -> Self
    where
        F: Fn() -> ContainerResult<T> + Send + Sync + 'static,
    {
        Self::new(name, Scope::Singleton, move || create_fn().map(Some))
    }

    pub fn prototype<F>(name: impl Into<String>, create_fn: F) -> Self
    where
        F: Fn() -> ContainerResult<T> + Send + Sync + 'static,
    {
        Self::new(name, Scope::Prototype, move || create_fn().map(Some))
    }

    /// 标记自身初始化完成（afterPropertiesSet）
    pub fn initialize(&self) {
        if !self.initialized.swap(true, Ordering::AcqRel) {
            tracing::debug!("FactoryBean '{}' initialized", self.name);
        }
    }

    /// 初始化完成后返回自身，便于在 supplier 中链式使用
    pub fn initialized(self) -> Self {
        self.initialize();
        self
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn create(&self) -> ContainerResult<Option<Arc<T>>> {
        let created = (self.create_fn)()
            .map_err(|e| ContainerError::creation(self.name.clone(), e))?
            .map(Arc::new);
        tracing::trace!("FactoryBean '{}' produced a new object", self.name);
        Ok(created)
    }
}

impl<T> FactoryBean for CachingFactoryBean<T>
where
    T: Any + Send + Sync,
{
    type Object = T;

    fn get_object(&self) -> ContainerResult<Option<Arc<T>>> {
        if !self.is_initialized() {
            return Err(ContainerError::FactoryBeanNotInitialized(self.name.clone()));
        }

        if self.scope.is_prototype() {
            return self.create();
        }

        let mut instance = self.instance.lock();
        if let Some(cached) = instance.as_ref() {
            return Ok(cached.clone());
        }
        let created = self.create()?;
        *instance = Some(created.clone());
        Ok(created)
    }

    fn is_singleton(&self) -> bool {
        self.scope.is_singleton()
    }
}
