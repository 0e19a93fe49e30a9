//! Bean Factory - 核心容器接口
//!
//! 接口分层与 Spring 的 BeanFactory 体系一致：
//! - [`BeanFactory`]：按名称访问，可以作为 trait object 使用
//! - [`ListableBeanFactory`]：按注册顺序列举、按类型查找名称
//! - [`BeanFactoryExt`]：泛型的按类型访问，对所有可列举工厂自动实现
//! - [`ConfigurableBeanFactory`]：注册、冻结、预实例化和销毁

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::{ReentrantMutex, RwLock};

use crate::bean::{BeanDefinition, SharedBean, TypeDescriptor};
use crate::constants::{is_factory_dereference, transformed_bean_name, FACTORY_BEAN_PREFIX};
use crate::factory_bean::FactoryBean;
use crate::lifecycle::ManagedLifecycle;
use crate::object_factory::BeanProvider;
use crate::utils::dependency::{validate_dependency_graph, CreationTracker};
use crate::{ContainerError, ContainerResult, Scope};

/// BeanFactory - 最基础的容器接口
///
/// 注意：此 trait 不包含泛型方法，因此可以作为 trait object 使用
pub trait BeanFactory: Send + Sync {
    /// 通过名称获取 Bean，FactoryBean 产出空对象时返回 `Ok(None)`
    ///
    /// 名称以 `&` 开头时返回 FactoryBean 本身。
    fn find_bean(&self, name: &str) -> ContainerResult<Option<SharedBean>>;

    /// 通过名称获取 Bean，空对象视为错误
    fn get_bean(&self, name: &str) -> ContainerResult<SharedBean> {
        self.find_bean(name)?
            .ok_or_else(|| ContainerError::NullBean(name.to_string()))
    }

    /// 检查是否包含指定名称的 Bean
    fn contains_bean(&self, name: &str) -> bool;

    /// 多次获取是否返回同一个实例，不会触发实例化
    fn is_singleton(&self, name: &str) -> ContainerResult<bool>;

    /// 按名称获取时得到的类型，不会触发实例化
    fn get_type(&self, name: &str) -> ContainerResult<Option<TypeDescriptor>>;

    fn is_type_match(&self, name: &str, type_descriptor: TypeDescriptor) -> ContainerResult<bool> {
        Ok(self.get_type(name)? == Some(type_descriptor))
    }
}

/// ListableBeanFactory - 可列举的 Bean 工厂
pub trait ListableBeanFactory: BeanFactory {
    /// 所有 Bean 的名称，按注册顺序
    fn get_bean_names(&self) -> Vec<String>;

    /// 指定类型的所有 Bean 名称
    ///
    /// 匹配 FactoryBean 自身类型时返回 `&name`。
    fn get_bean_names_for_type(&self, type_descriptor: TypeDescriptor) -> Vec<String>;

    fn get_bean_definition_count(&self) -> usize;
}

/// BeanFactoryExt - 按类型访问的泛型扩展
///
/// 提供泛型方法，不能作为 trait object 使用
pub trait BeanFactoryExt: ListableBeanFactory {
    /// 按名称获取并转换为具体类型
    fn get_bean_as<T: Any + Send + Sync>(&self, name: &str) -> ContainerResult<Arc<T>> {
        let bean = self.get_bean(name)?;
        downcast_bean(self, name, bean)
    }

    /// 通过类型获取唯一的 Bean
    fn get_bean_by_type<T: Any + Send + Sync>(&self) -> ContainerResult<Arc<T>> {
        let type_name = std::any::type_name::<T>();
        let mut candidates = self.get_bean_names_for_type(TypeDescriptor::of::<T>());
        match candidates.len() {
            0 => Err(ContainerError::BeanNotFound(format!(
                "No bean found for type '{}'",
                type_name
            ))),
            1 => self.get_bean_as::<T>(&candidates.remove(0)),
            _ => Err(ContainerError::NoUniqueBean {
                type_name: type_name.to_string(),
                candidates,
            }),
        }
    }

    /// 同 [`get_bean_by_type`](Self::get_bean_by_type)，但未注册或产出为空时返回 `None`
    fn find_bean_by_type<T: Any + Send + Sync>(&self) -> ContainerResult<Option<Arc<T>>> {
        let mut candidates = self.get_bean_names_for_type(TypeDescriptor::of::<T>());
        match candidates.len() {
            0 => Ok(None),
            1 => {
                let name = candidates.remove(0);
                self.find_bean(&name)?
                    .map(|bean| downcast_bean(self, &name, bean))
                    .transpose()
            }
            _ => Err(ContainerError::NoUniqueBean {
                type_name: std::any::type_name::<T>().to_string(),
                candidates,
            }),
        }
    }

    /// 指定类型的所有 Bean，按注册顺序；产出为空的 FactoryBean 被跳过
    fn get_beans_of_type<T: Any + Send + Sync>(&self) -> ContainerResult<Vec<(String, Arc<T>)>> {
        let mut beans = Vec::new();
        for name in self.get_bean_names_for_type(TypeDescriptor::of::<T>()) {
            if let Some(bean) = self.find_bean(&name)? {
                let bean = downcast_bean(self, &name, bean)?;
                beans.push((name, bean));
            }
        }
        Ok(beans)
    }

    fn contains_bean_by_type<T: Any + Send + Sync>(&self) -> bool {
        !self
            .get_bean_names_for_type(TypeDescriptor::of::<T>())
            .is_empty()
    }
}

impl<B: ListableBeanFactory + ?Sized> BeanFactoryExt for B {}

// 转换已取得的实例，不再重新获取（原型 Bean 每次获取都会新建）
pub(crate) fn downcast_bean<B, T>(factory: &B, name: &str, bean: SharedBean) -> ContainerResult<Arc<T>>
where
    B: BeanFactory + ?Sized,
    T: Any + Send + Sync,
{
    bean.downcast::<T>().map_err(|_| ContainerError::TypeMismatch {
        name: name.to_string(),
        expected: std::any::type_name::<T>().to_string(),
        found: factory
            .get_type(name)
            .ok()
            .flatten()
            .map_or("unknown", |t| t.name())
            .to_string(),
    })
}

/// ConfigurableBeanFactory - 可配置的 Bean 工厂
pub trait ConfigurableBeanFactory: ListableBeanFactory {
    /// 注册 Bean 定义
    fn register_bean_definition(&self, definition: BeanDefinition) -> ContainerResult<()>;

    /// 移除 Bean 定义，已创建的单例会被销毁
    fn remove_bean_definition(&self, name: &str) -> ContainerResult<()>;

    fn contains_bean_definition(&self, name: &str) -> bool;

    fn is_factory_bean(&self, name: &str) -> ContainerResult<bool>;

    /// 冻结配置（不再允许修改 Bean 定义）
    fn freeze_configuration(&self);

    fn is_configuration_frozen(&self) -> bool;

    /// 按注册顺序创建所有非延迟的单例
    ///
    /// FactoryBean 只创建工厂本身，产出对象在首次访问时创建。
    fn preinstantiate_singletons(&self) -> ContainerResult<()>;

    /// 按创建顺序的逆序销毁所有单例
    fn destroy_singletons(&self) -> ContainerResult<()>;
}

#[derive(Default)]
struct DefinitionMap {
    by_name: HashMap<String, Arc<BeanDefinition>>,
    // 注册顺序
    names: Vec<String>,
}

#[derive(Default)]
struct SingletonCache {
    instances: HashMap<String, SharedBean>,
    // 创建顺序
    order: Vec<String>,
}

/// DefaultListableBeanFactory - 默认的 Bean 容器实现
///
/// 单例创建由一把可重入锁串行化：同一线程在创建过程中解析依赖可以重入，
/// 其他线程则等待创建完成后直接读取缓存。创建时不持有任何定义表或缓存的锁。
pub struct DefaultListableBeanFactory {
    definitions: RwLock<DefinitionMap>,

    singletons: RwLock<SingletonCache>,

    /// 单例 FactoryBean 产出对象的缓存，`None` 表示产出为空
    factory_object_cache: RwLock<HashMap<String, Option<SharedBean>>>,

    singleton_lock: ReentrantMutex<()>,

    /// 循环依赖检测
    creation_tracker: CreationTracker,

    configuration_frozen: RwLock<bool>,

    self_ref: Weak<DefaultListableBeanFactory>,
}

impl DefaultListableBeanFactory {
    /// 创建新的 Bean 工厂
    pub fn new() -> Arc<Self> {
        Arc::new_cyclic(|self_ref| Self {
            definitions: RwLock::new(DefinitionMap::default()),
            singletons: RwLock::new(SingletonCache::default()),
            factory_object_cache: RwLock::new(HashMap::new()),
            singleton_lock: ReentrantMutex::new(()),
            creation_tracker: CreationTracker::new(),
            configuration_frozen: RwLock::new(false),
            self_ref: Weak::clone(self_ref),
        })
    }

    /// 注册单例 Bean
    pub fn register_singleton<T, F>(&self, name: impl Into<String>, supplier: F) -> ContainerResult<()>
    where
        T: Any + Send + Sync,
        F: Fn(&DefaultListableBeanFactory) -> ContainerResult<T> + Send + Sync + 'static,
    {
        self.register_bean_definition(BeanDefinition::of(name, supplier))
    }

    /// 注册原型 Bean
    pub fn register_prototype<T, F>(&self, name: impl Into<String>, supplier: F) -> ContainerResult<()>
    where
        T: Any + Send + Sync,
        F: Fn(&DefaultListableBeanFactory) -> ContainerResult<T> + Send + Sync + 'static,
    {
        self.register_bean_definition(BeanDefinition::of(name, supplier).with_scope(Scope::Prototype))
    }

    /// 注册单例 FactoryBean
    pub fn register_factory_bean<F, S>(&self, name: impl Into<String>, supplier: S) -> ContainerResult<()>
    where
        F: FactoryBean,
        S: Fn(&DefaultListableBeanFactory) -> ContainerResult<F> + Send + Sync + 'static,
    {
        self.register_bean_definition(BeanDefinition::factory_bean(name, supplier))
    }

    pub fn get_bean_definition(&self, name: &str) -> ContainerResult<Arc<BeanDefinition>> {
        self.definitions
            .read()
            .by_name
            .get(transformed_bean_name(name))
            .cloned()
            .ok_or_else(|| ContainerError::BeanNotFound(name.to_string()))
    }

    /// 声明的 depends-on 列表
    pub fn get_dependencies(&self, name: &str) -> Vec<String> {
        self.get_bean_definition(name)
            .map(|definition| definition.dependencies.clone())
            .unwrap_or_default()
    }

    /// 声明依赖于指定 Bean 的所有 Bean，按注册顺序
    pub fn get_dependents(&self, name: &str) -> Vec<String> {
        let definitions = self.definitions.read();
        definitions
            .names
            .iter()
            .filter(|candidate| {
                definitions
                    .by_name
                    .get(candidate.as_str())
                    .is_some_and(|d| d.dependencies.iter().any(|dep| dep == name))
            })
            .cloned()
            .collect()
    }

    /// 校验 depends-on 图：依赖必须已注册且不能成环
    pub fn validate_dependencies(&self) -> ContainerResult<()> {
        let (order, graph) = {
            let definitions = self.definitions.read();
            let graph: HashMap<String, Vec<String>> = definitions
                .by_name
                .iter()
                .map(|(name, d)| (name.clone(), d.dependencies.clone()))
                .collect();
            (definitions.names.clone(), graph)
        };

        validate_dependency_graph(&order, &graph)
            .map_err(|e| ContainerError::DependencyValidationFailed(e.to_string()))
    }

    /// 已创建的单例实例（FactoryBean 时为工厂本身）
    pub fn get_singleton(&self, name: &str) -> Option<SharedBean> {
        self.singletons
            .read()
            .instances
            .get(transformed_bean_name(name))
            .cloned()
    }

    /// 已创建的单例名称，按创建顺序
    pub fn get_singleton_names(&self) -> Vec<String> {
        self.singletons.read().order.clone()
    }

    /// 当前线程是否正在创建该 Bean
    pub fn is_currently_in_creation(&self, name: &str) -> bool {
        self.creation_tracker
            .is_creating(transformed_bean_name(name))
    }

    /// 参与生命周期管理的单例，按注册顺序
    ///
    /// 尚未创建的延迟单例不会被创建，也不会出现在结果中。
    pub fn get_lifecycle_beans(&self) -> ContainerResult<Vec<(String, ManagedLifecycle)>> {
        let names = self.definitions.read().names.clone();
        let mut beans = Vec::new();

        for name in names {
            let definition = match self.get_bean_definition(&name) {
                Ok(definition) => definition,
                Err(_) => continue,
            };
            let Some(adapter) = definition.lifecycle else {
                continue;
            };
            if !definition.scope.is_singleton() {
                continue;
            }

            let instance = match self.get_singleton(&name) {
                Some(instance) => instance,
                None if definition.lazy => continue,
                None => self.get_instance(&definition)?,
            };

            let managed = adapter
                .resolve(&instance)
                .ok_or_else(|| ContainerError::TypeMismatch {
                    name: name.clone(),
                    expected: adapter.bean_type().name().to_string(),
                    found: definition.bean_type().name().to_string(),
                })?;
            beans.push((name, managed));
        }

        Ok(beans)
    }

    /// 按类型延迟查找的提供者
    pub fn get_bean_provider<T: Any + Send + Sync>(&self) -> BeanProvider<T> {
        BeanProvider::new(Weak::clone(&self.self_ref), None)
    }

    /// 按名称延迟查找的提供者
    pub fn get_named_bean_provider<T: Any + Send + Sync>(
        &self,
        name: impl Into<String>,
    ) -> BeanProvider<T> {
        BeanProvider::new(Weak::clone(&self.self_ref), Some(name.into()))
    }

    fn check_not_frozen(&self, action: &str) -> ContainerResult<()> {
        if *self.configuration_frozen.read() {
            return Err(ContainerError::IllegalState(format!(
                "Cannot {}: configuration is frozen",
                action
            )));
        }
        Ok(())
    }

    fn do_get_bean(&self, name: &str) -> ContainerResult<Option<SharedBean>> {
        tracing::trace!("Requesting bean: '{}'", name);

        let bean_name = transformed_bean_name(name);
        let definition = self.get_bean_definition(bean_name).map_err(|e| {
            tracing::debug!("Bean '{}' not found in container", bean_name);
            e
        })?;

        let dereference = is_factory_dereference(name);
        if dereference && !definition.is_factory_bean() {
            return Err(ContainerError::NotAFactoryBean(bean_name.to_string()));
        }

        if !dereference && definition.is_factory_bean() && self.creation_tracker.is_creating(bean_name)
        {
            tracing::debug!(
                "FactoryBean '{}' requested while still under creation",
                bean_name
            );
            return Err(ContainerError::FactoryBeanNotInitialized(bean_name.to_string()));
        }

        let instance = self.get_instance(&definition)?;
        if dereference {
            return Ok(Some(instance));
        }
        self.get_object_for_instance(&definition, instance)
    }

    /// 获取原始实例：单例走缓存，原型每次新建
    fn get_instance(&self, definition: &Arc<BeanDefinition>) -> ContainerResult<SharedBean> {
        let name = definition.name.as_str();
        match definition.scope {
            Scope::Singleton => {
                if let Some(bean) = self.get_singleton(name) {
                    tracing::trace!("Returning cached instance of singleton bean '{}'", name);
                    return Ok(bean);
                }

                let _creation = self.singleton_lock.lock();
                if let Some(bean) = self.get_singleton(name) {
                    return Ok(bean);
                }

                tracing::debug!("Creating shared instance of singleton bean '{}'", name);
                let bean = self.create_bean(definition)?;

                let mut singletons = self.singletons.write();
                singletons
                    .instances
                    .insert(name.to_string(), Arc::clone(&bean));
                singletons.order.push(name.to_string());
                Ok(bean)
            }
            Scope::Prototype => {
                tracing::trace!("Creating new instance of prototype bean '{}'", name);
                self.create_bean(definition)
            }
        }
    }

    /// 创建 Bean 实例：depends-on → 实例化 → 初始化回调
    fn create_bean(&self, definition: &BeanDefinition) -> ContainerResult<SharedBean> {
        let name = definition.name.as_str();

        if !self.creation_tracker.start_creating(name) {
            let mut chain = self.creation_tracker.current_creating();
            chain.push(name.to_string());
            return Err(ContainerError::CircularDependency(chain.join(" -> ")));
        }

        // 任何返回路径都要清理创建标记
        struct CreationGuard<'a> {
            tracker: &'a CreationTracker,
            name: &'a str,
        }

        impl Drop for CreationGuard<'_> {
            fn drop(&mut self) {
                self.tracker.finish_creating(self.name);
            }
        }

        let _guard = CreationGuard {
            tracker: &self.creation_tracker,
            name,
        };

        for dependency in &definition.dependencies {
            tracing::trace!("Bean '{}' depends on '{}'", name, dependency);
            self.do_get_bean(dependency)
                .map_err(|e| ContainerError::creation(name, e))?;
        }

        let mut instance = definition
            .supplier
            .create(self)
            .map_err(|e| ContainerError::creation(name, e))?;

        if let Some(init) = &definition.init_callback {
            init(instance.as_mut()).map_err(|e| ContainerError::creation(name, e))?;
        }

        Ok(Arc::from(instance))
    }

    /// FactoryBean 时返回其产出对象，否则返回实例本身
    fn get_object_for_instance(
        &self,
        definition: &BeanDefinition,
        instance: SharedBean,
    ) -> ContainerResult<Option<SharedBean>> {
        let Some(adapter) = definition.factory_bean else {
            return Ok(Some(instance));
        };
        let name = definition.name.as_str();

        if !(definition.scope.is_singleton() && adapter.is_singleton(&instance)) {
            return adapter
                .get_object(name, &instance)
                .map_err(|e| ContainerError::creation(name, e));
        }

        if let Some(cached) = self.factory_object_cache.read().get(name) {
            return Ok(cached.clone());
        }

        let _creation = self.singleton_lock.lock();
        if let Some(cached) = self.factory_object_cache.read().get(name) {
            return Ok(cached.clone());
        }

        let object = adapter
            .get_object(name, &instance)
            .map_err(|e| ContainerError::creation(name, e))?;
        if object.is_none() {
            tracing::debug!("FactoryBean '{}' produced an absent object", name);
        }
        self.factory_object_cache
            .write()
            .insert(name.to_string(), object.clone());
        Ok(object)
    }

    fn destroy_bean(&self, name: &str, bean: &SharedBean) -> ContainerResult<()> {
        let Ok(definition) = self.get_bean_definition(name) else {
            return Ok(());
        };
        if let Some(destroy) = &definition.destroy_callback {
            tracing::debug!("Invoking destroy callback on bean '{}'", name);
            destroy(bean.as_ref()).map_err(|e| ContainerError::lifecycle(name, e))?;
        }
        Ok(())
    }
}

impl BeanFactory for DefaultListableBeanFactory {
    fn find_bean(&self, name: &str) -> ContainerResult<Option<SharedBean>> {
        self.do_get_bean(name)
    }

    fn contains_bean(&self, name: &str) -> bool {
        match self.definitions.read().by_name.get(transformed_bean_name(name)) {
            Some(definition) => !is_factory_dereference(name) || definition.is_factory_bean(),
            None => false,
        }
    }

    fn is_singleton(&self, name: &str) -> ContainerResult<bool> {
        let definition = self.get_bean_definition(name)?;
        if !definition.scope.is_singleton() {
            return Ok(false);
        }
        match definition.factory_bean {
            Some(adapter) if !is_factory_dereference(name) => Ok(self
                .get_singleton(name)
                .map_or(true, |factory| adapter.is_singleton(&factory))),
            _ => Ok(true),
        }
    }

    fn get_type(&self, name: &str) -> ContainerResult<Option<TypeDescriptor>> {
        let definition = self.get_bean_definition(name)?;
        match definition.factory_bean {
            Some(adapter) if !is_factory_dereference(name) => Ok(self
                .get_singleton(name)
                .and_then(|factory| adapter.object_type(&factory))
                .or(Some(adapter.product_type()))),
            _ => Ok(Some(definition.bean_type())),
        }
    }
}

impl ListableBeanFactory for DefaultListableBeanFactory {
    fn get_bean_names(&self) -> Vec<String> {
        self.definitions.read().names.clone()
    }

    fn get_bean_names_for_type(&self, type_descriptor: TypeDescriptor) -> Vec<String> {
        let definitions = self.definitions.read();
        let mut names = Vec::new();
        for name in &definitions.names {
            let Some(definition) = definitions.by_name.get(name) else {
                continue;
            };
            if definition.exposed_type() == type_descriptor {
                names.push(name.clone());
            }
            if definition.is_factory_bean() && definition.bean_type() == type_descriptor {
                names.push(format!("{}{}", FACTORY_BEAN_PREFIX, name));
            }
        }
        names
    }

    fn get_bean_definition_count(&self) -> usize {
        self.definitions.read().names.len()
    }
}

impl ConfigurableBeanFactory for DefaultListableBeanFactory {
    fn register_bean_definition(&self, definition: BeanDefinition) -> ContainerResult<()> {
        let name = definition.name.clone();
        tracing::trace!(
            "Attempting to register bean: name='{}', type='{}', scope={}",
            name,
            definition.bean_type(),
            definition.scope
        );

        if name.is_empty() || is_factory_dereference(&name) {
            return Err(ContainerError::Config(format!(
                "Invalid bean name '{}': must be non-empty and not start with '{}'",
                name, FACTORY_BEAN_PREFIX
            )));
        }
        if let Some(adapter) = &definition.lifecycle {
            if adapter.bean_type() != definition.bean_type() {
                return Err(ContainerError::TypeMismatch {
                    name,
                    expected: adapter.bean_type().name().to_string(),
                    found: definition.bean_type().name().to_string(),
                });
            }
        }
        self.check_not_frozen("register bean definition")?;

        let mut definitions = self.definitions.write();
        if definitions.by_name.contains_key(&name) {
            tracing::warn!("Bean '{}' already exists, registration failed", name);
            return Err(ContainerError::BeanAlreadyExists(name));
        }
        definitions.by_name.insert(name.clone(), Arc::new(definition));
        definitions.names.push(name.clone());

        tracing::debug!("Bean definition registered: '{}'", name);
        Ok(())
    }

    fn remove_bean_definition(&self, name: &str) -> ContainerResult<()> {
        self.check_not_frozen("remove bean definition")?;

        let definition = {
            let mut definitions = self.definitions.write();
            let definition = definitions
                .by_name
                .remove(name)
                .ok_or_else(|| ContainerError::BeanNotFound(name.to_string()))?;
            definitions.names.retain(|n| n != name);
            definition
        };

        self.factory_object_cache.write().remove(name);
        let removed = {
            let mut singletons = self.singletons.write();
            singletons.order.retain(|n| n != name);
            singletons.instances.remove(name)
        };
        tracing::debug!("Bean definition removed: '{}'", name);

        match (removed, &definition.destroy_callback) {
            (Some(bean), Some(destroy)) => {
                destroy(bean.as_ref()).map_err(|e| ContainerError::lifecycle(name, e))
            }
            _ => Ok(()),
        }
    }

    fn contains_bean_definition(&self, name: &str) -> bool {
        self.definitions.read().by_name.contains_key(name)
    }

    fn is_factory_bean(&self, name: &str) -> ContainerResult<bool> {
        Ok(self.get_bean_definition(name)?.is_factory_bean())
    }

    fn freeze_configuration(&self) {
        *self.configuration_frozen.write() = true;
        tracing::debug!("Bean factory configuration frozen");
    }

    fn is_configuration_frozen(&self) -> bool {
        *self.configuration_frozen.read()
    }

    fn preinstantiate_singletons(&self) -> ContainerResult<()> {
        let names = self.definitions.read().names.clone();
        tracing::debug!("Pre-instantiating singletons among {} bean definitions", names.len());

        for name in names {
            let definition = self.get_bean_definition(&name)?;
            if definition.scope.is_singleton() && !definition.lazy {
                self.get_instance(&definition)?;
            }
        }
        Ok(())
    }

    fn destroy_singletons(&self) -> ContainerResult<()> {
        tracing::info!("Destroying singleton beans");

        self.factory_object_cache.write().clear();
        let SingletonCache {
            mut instances,
            order,
        } = std::mem::take(&mut *self.singletons.write());

        let mut errors = Vec::new();
        for name in order.iter().rev() {
            let Some(bean) = instances.remove(name) else {
                continue;
            };
            if let Err(e) = self.destroy_bean(name, &bean) {
                tracing::warn!("Failed to destroy bean '{}': {}", name, e);
                errors.push(e);
            }
        }

        tracing::debug!("Destroyed {} singleton bean(s)", order.len());
        ContainerError::collect("Destroying singletons", errors)
    }
}

impl fmt::Debug for DefaultListableBeanFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefaultListableBeanFactory")
            .field("definitions", &self.get_bean_names())
            .field("singletons", &self.get_singleton_names())
            .field("frozen", &self.is_configuration_frozen())
            .finish()
    }
}
