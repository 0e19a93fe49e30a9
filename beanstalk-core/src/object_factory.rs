//! ObjectFactory - 按需提供对象
//!
//! 最小的提供者契约：无参数的 `get_object()`。任何 `Fn() -> ContainerResult<T>`
//! 都是一个 ObjectFactory；[`BeanProvider`] 则把查找延迟到调用时，常用于打破
//! 创建期的依赖环。

use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::sync::{Arc, Weak};

use crate::bean_factory::{downcast_bean, BeanFactory, BeanFactoryExt, DefaultListableBeanFactory};
use crate::{ContainerError, ContainerResult};

/// 对象提供者
///
/// 调用方不应假设返回对象的作用域。
pub trait ObjectFactory<T>: Send + Sync {
    fn get_object(&self) -> ContainerResult<T>;
}

impl<T, F> ObjectFactory<T> for F
where
    F: Fn() -> ContainerResult<T> + Send + Sync,
{
    fn get_object(&self) -> ContainerResult<T> {
        self()
    }
}

/// 基于注册表的延迟查找
///
/// 只持有注册表的弱引用，注册表释放后调用会返回 `IllegalState`。
pub struct BeanProvider<T> {
    factory: Weak<DefaultListableBeanFactory>,
    name: Option<String>,
    _phantom: PhantomData<fn() -> T>,
}

impl<T> BeanProvider<T>
where
    T: Any + Send + Sync,
{
    pub(crate) fn new(factory: Weak<DefaultListableBeanFactory>, name: Option<String>) -> Self {
        Self {
            factory,
            name,
            _phantom: PhantomData,
        }
    }

    fn factory(&self) -> ContainerResult<Arc<DefaultListableBeanFactory>> {
        self.factory.upgrade().ok_or_else(|| {
            ContainerError::IllegalState(format!(
                "Bean factory backing provider for '{}' has been dropped",
                std::any::type_name::<T>()
            ))
        })
    }

    /// 存在时返回对象；未注册或产出为空时返回 `None`
    pub fn get_if_available(&self) -> ContainerResult<Option<Arc<T>>> {
        let factory = self.factory()?;
        match &self.name {
            Some(name) if !factory.contains_bean(name) => Ok(None),
            Some(name) => factory
                .find_bean(name)?
                .map(|bean| downcast_bean(&*factory, name, bean))
                .transpose(),
            None => factory.find_bean_by_type::<T>(),
        }
    }
}

impl<T> ObjectFactory<Arc<T>> for BeanProvider<T>
where
    T: Any + Send + Sync,
{
    fn get_object(&self) -> ContainerResult<Arc<T>> {
        let factory = self.factory()?;
        match &self.name {
            Some(name) => factory.get_bean_as::<T>(name),
            None => factory.get_bean_by_type::<T>(),
        }
    }
}

impl<T> Clone for BeanProvider<T> {
    fn clone(&self) -> Self {
        Self {
            factory: Weak::clone(&self.factory),
            name: self.name.clone(),
            _phantom: PhantomData,
        }
    }
}

impl<T> fmt::Debug for BeanProvider<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BeanProvider")
            .field("type", &std::any::type_name::<T>())
            .field("name", &self.name)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Clock {
        ticks: AtomicUsize,
    }

    #[test]
    fn test_closure_is_an_object_factory() {
        let counter = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&counter);
        let factory = move || -> ContainerResult<usize> { Ok(seen.fetch_add(1, Ordering::SeqCst)) };

        assert_eq!(factory.get_object().unwrap(), 0);
        assert_eq!(factory.get_object().unwrap(), 1);
    }

    #[test]
    fn test_object_factory_propagates_creation_error() {
        let factory = || -> ContainerResult<Clock> {
            Err(ContainerError::creation("clock", ContainerError::Config("no time source".into())))
        };

        match factory.get_object() {
            Err(ContainerError::BeanCreation { name, .. }) => assert_eq!(name, "clock"),
            _ => panic!("expected a creation error"),
        }
    }

    #[test]
    fn test_provider_resolves_lazily() {
        let factory = DefaultListableBeanFactory::new();
        let provider = factory.get_bean_provider::<Clock>();

        assert!(provider.get_if_available().unwrap().is_none());
        assert!(matches!(provider.get_object(), Err(ContainerError::BeanNotFound(_))));

        factory
            .register_singleton("clock", |_| {
                Ok(Clock {
                    ticks: AtomicUsize::new(7),
                })
            })
            .unwrap();

        let clock = provider.get_object().unwrap();
        assert_eq!(clock.ticks.load(Ordering::SeqCst), 7);
        let again = provider.get_if_available().unwrap().unwrap();
        assert!(Arc::ptr_eq(&clock, &again));
    }

    #[test]
    fn test_named_provider() {
        let factory = DefaultListableBeanFactory::new();
        let provider = factory.get_named_bean_provider::<Clock>("clock");
        assert!(provider.get_if_available().unwrap().is_none());

        factory
            .register_singleton("clock", |_| {
                Ok(Clock {
                    ticks: AtomicUsize::new(0),
                })
            })
            .unwrap();
        assert!(provider.get_if_available().unwrap().is_some());

        let wrong = factory.get_named_bean_provider::<String>("clock");
        assert!(matches!(wrong.get_object(), Err(ContainerError::TypeMismatch { .. })));
    }

    #[test]
    fn test_provider_outliving_factory() {
        let factory = DefaultListableBeanFactory::new();
        let provider = factory.get_bean_provider::<Clock>();
        drop(factory);

        assert!(matches!(provider.get_object(), Err(ContainerError::IllegalState(_))));
    }
}
