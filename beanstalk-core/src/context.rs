use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};

use crate::bean::{BeanDefinition, SharedBean, TypeDescriptor};
use crate::bean_factory::{
    BeanFactory, ConfigurableBeanFactory, DefaultListableBeanFactory, ListableBeanFactory,
};
use crate::config::{Environment, PropertySource};
use crate::constants::{
    DEFAULT_TIMEOUT_PER_SHUTDOWN_PHASE_MS, ENVIRONMENT_BEAN_NAME, TIMEOUT_PER_SHUTDOWN_PHASE_KEY,
};
use crate::factory_bean::FactoryBean;
use crate::lifecycle::Lifecycle;
use crate::lifecycle_processor::DefaultLifecycleProcessor;
use crate::{ContainerError, ContainerResult, Scope};

/// Shutdown hook类型
pub type ShutdownHook = Box<dyn Fn() -> ContainerResult<()> + Send + Sync>;

/// 上下文状态：Created → Active → Closed，不可逆
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    Created,
    Active,
    Closed,
}

impl fmt::Display for ContextState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextState::Created => write!(f, "created"),
            ContextState::Active => write!(f, "active"),
            ContextState::Closed => write!(f, "closed"),
        }
    }
}

/// 应用上下文
///
/// 持有 BeanFactory、Environment、生命周期处理器和 shutdown hooks。
/// 刷新之后才能获取 Bean，关闭之后不能再获取。
pub struct ApplicationContext {
    display_name: String,

    /// Bean 工厂 - 负责 Bean 的创建和管理
    bean_factory: Arc<DefaultListableBeanFactory>,

    environment: Environment,

    lifecycle_processor: DefaultLifecycleProcessor,

    /// 按注册顺序执行
    shutdown_hooks: RwLock<Vec<ShutdownHook>>,

    state: RwLock<ContextState>,

    // refresh 与 close 互斥
    startup_shutdown_monitor: Mutex<()>,
}

impl ApplicationContext {
    /// 构建器模式创建上下文
    pub fn builder() -> ApplicationContextBuilder {
        ApplicationContextBuilder::new()
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// 获取内部的 BeanFactory
    pub fn bean_factory(&self) -> &Arc<DefaultListableBeanFactory> {
        &self.bean_factory
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    pub fn lifecycle_processor(&self) -> &DefaultLifecycleProcessor {
        &self.lifecycle_processor
    }

    pub fn state(&self) -> ContextState {
        *self.state.read()
    }

    pub fn is_active(&self) -> bool {
        self.state() == ContextState::Active
    }

    /// 注册 Bean 定义，刷新后配置冻结，注册会失败
    pub fn register_bean_definition(&self, definition: BeanDefinition) -> ContainerResult<()> {
        self.bean_factory.register_bean_definition(definition)
    }

    pub fn register_singleton<T, F>(&self, name: impl Into<String>, supplier: F) -> ContainerResult<()>
    where
        T: Any + Send + Sync,
        F: Fn(&DefaultListableBeanFactory) -> ContainerResult<T> + Send + Sync + 'static,
    {
        self.bean_factory.register_singleton(name, supplier)
    }

    pub fn register_prototype<T, F>(&self, name: impl Into<String>, supplier: F) -> ContainerResult<()>
    where
        T: Any + Send + Sync,
        F: Fn(&DefaultListableBeanFactory) -> ContainerResult<T> + Send + Sync + 'static,
    {
        self.bean_factory.register_prototype(name, supplier)
    }

    pub fn register_factory_bean<B, S>(&self, name: impl Into<String>, supplier: S) -> ContainerResult<()>
    where
        B: FactoryBean,
        S: Fn(&DefaultListableBeanFactory) -> ContainerResult<B> + Send + Sync + 'static,
    {
        self.bean_factory.register_factory_bean(name, supplier)
    }

    /// 注册 shutdown hook
    ///
    /// Shutdown hook 会在应用关闭时按注册顺序执行，先于生命周期 Bean 的停止
    pub fn register_shutdown_hook<F>(&self, hook: F)
    where
        F: Fn() -> ContainerResult<()> + Send + Sync + 'static,
    {
        let mut hooks = self.shutdown_hooks.write();
        hooks.push(Box::new(hook));
        tracing::debug!("Registered shutdown hook, total: {}", hooks.len());
    }

    /// 刷新上下文：校验依赖 → 冻结配置 → 预实例化单例 → 启动生命周期 Bean
    ///
    /// 只能调用一次。失败时销毁已创建的单例并进入 Closed 状态。
    pub fn refresh(&self) -> ContainerResult<()> {
        let _monitor = self.startup_shutdown_monitor.lock();
        {
            let mut state = self.state.write();
            if *state != ContextState::Created {
                return Err(ContainerError::IllegalState(format!(
                    "{} cannot be refreshed: it is {}",
                    self.display_name, *state
                )));
            }
            *state = ContextState::Active;
        }

        tracing::info!("Refreshing {}", self.display_name);
        let started = Instant::now();

        match self.do_refresh() {
            Ok(()) => {
                tracing::info!(
                    "{} refreshed with {} bean definition(s) in {:?}",
                    self.display_name,
                    self.bean_factory.get_bean_definition_count(),
                    started.elapsed()
                );
                Ok(())
            }
            Err(e) => {
                tracing::error!(
                    "Refresh of {} failed, destroying created singletons: {}",
                    self.display_name,
                    e
                );
                if let Err(destroy_error) = self.bean_factory.destroy_singletons() {
                    tracing::warn!("Failed to destroy singletons after refresh failure: {}", destroy_error);
                }
                *self.state.write() = ContextState::Closed;
                Err(e)
            }
        }
    }

    fn do_refresh(&self) -> ContainerResult<()> {
        self.bean_factory.validate_dependencies()?;
        self.bean_factory.freeze_configuration();
        self.bean_factory.preinstantiate_singletons()?;

        if let Err(e) = self.lifecycle_processor.on_refresh() {
            // 已启动的组件需要停下来
            if let Err(stop_error) = self.lifecycle_processor.on_close() {
                tracing::warn!("Failed to stop lifecycle beans after start failure: {}", stop_error);
            }
            return Err(e);
        }
        Ok(())
    }

    /// 关闭上下文：shutdown hooks → 停止生命周期 Bean → 销毁单例
    ///
    /// 幂等，某一步失败不会阻止后续步骤，所有失败汇总后返回。
    pub fn close(&self) -> ContainerResult<()> {
        let _monitor = self.startup_shutdown_monitor.lock();
        let previous = {
            let mut state = self.state.write();
            let previous = *state;
            *state = ContextState::Closed;
            previous
        };
        if previous == ContextState::Closed {
            tracing::debug!("{} is already closed", self.display_name);
            return Ok(());
        }

        tracing::info!("Closing {}", self.display_name);
        let mut errors = Vec::new();

        let hooks = self.shutdown_hooks.read();
        tracing::debug!("Executing {} shutdown hook(s)", hooks.len());
        for (idx, hook) in hooks.iter().enumerate() {
            if let Err(e) = hook() {
                tracing::warn!("Shutdown hook {} failed: {}", idx + 1, e);
                errors.push(ContainerError::lifecycle(format!("shutdown hook {}", idx + 1), e));
            }
        }
        drop(hooks);

        if previous == ContextState::Active {
            if let Err(e) = self.lifecycle_processor.on_close() {
                errors.push(e);
            }
        }

        if let Err(e) = self.bean_factory.destroy_singletons() {
            errors.push(e);
        }

        tracing::info!("{} closed", self.display_name);
        ContainerError::collect(format!("Closing {}", self.display_name), errors)
    }

    fn assert_active(&self) -> ContainerResult<()> {
        match self.state() {
            ContextState::Active => Ok(()),
            ContextState::Created => Err(ContainerError::IllegalState(format!(
                "{} has not been refreshed yet",
                self.display_name
            ))),
            ContextState::Closed => Err(ContainerError::IllegalState(format!(
                "{} has been closed already",
                self.display_name
            ))),
        }
    }
}

impl fmt::Debug for ApplicationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApplicationContext")
            .field("display_name", &self.display_name)
            .field("state", &self.state())
            .field("bean_factory", &self.bean_factory)
            .finish()
    }
}

impl BeanFactory for ApplicationContext {
    fn find_bean(&self, name: &str) -> ContainerResult<Option<SharedBean>> {
        self.assert_active()?;
        self.bean_factory.find_bean(name)
    }

    fn contains_bean(&self, name: &str) -> bool {
        self.bean_factory.contains_bean(name)
    }

    fn is_singleton(&self, name: &str) -> ContainerResult<bool> {
        self.assert_active()?;
        self.bean_factory.is_singleton(name)
    }

    fn get_type(&self, name: &str) -> ContainerResult<Option<TypeDescriptor>> {
        self.assert_active()?;
        self.bean_factory.get_type(name)
    }
}

impl ListableBeanFactory for ApplicationContext {
    fn get_bean_names(&self) -> Vec<String> {
        self.bean_factory.get_bean_names()
    }

    fn get_bean_names_for_type(&self, type_descriptor: TypeDescriptor) -> Vec<String> {
        self.bean_factory.get_bean_names_for_type(type_descriptor)
    }

    fn get_bean_definition_count(&self) -> usize {
        self.bean_factory.get_bean_definition_count()
    }
}

impl Lifecycle for ApplicationContext {
    /// 启动所有生命周期 Bean，包括未声明自动启动的
    fn start(&self) -> ContainerResult<()> {
        self.assert_active()?;
        self.lifecycle_processor.start()
    }

    fn stop(&self) -> ContainerResult<()> {
        if !self.is_active() {
            return Ok(());
        }
        self.lifecycle_processor.stop()
    }

    fn is_running(&self) -> bool {
        self.is_active() && self.lifecycle_processor.is_running()
    }
}

/// 应用上下文构建器
pub struct ApplicationContextBuilder {
    display_name: String,
    environment: Environment,
    definitions: Vec<BeanDefinition>,
    timeout_per_shutdown_phase: Option<Duration>,
}

impl ApplicationContextBuilder {
    pub fn new() -> Self {
        Self {
            display_name: "ApplicationContext".to_string(),
            environment: Environment::new(),
            definitions: Vec::new(),
            timeout_per_shutdown_phase: None,
        }
    }

    pub fn display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = name.into();
        self
    }

    /// 使用已有的 Environment（共享其配置源）
    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    /// 构建前读取配置，例如初始化日志
    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    /// 添加配置源到 Environment
    pub fn add_property_source(self, source: Box<dyn PropertySource>) -> Self {
        self.environment.add_property_source(source);
        self
    }

    pub fn register(mut self, definition: BeanDefinition) -> Self {
        self.definitions.push(definition);
        self
    }

    pub fn register_singleton<T, F>(self, name: impl Into<String>, supplier: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&DefaultListableBeanFactory) -> ContainerResult<T> + Send + Sync + 'static,
    {
        self.register(BeanDefinition::of(name, supplier))
    }

    pub fn register_prototype<T, F>(self, name: impl Into<String>, supplier: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&DefaultListableBeanFactory) -> ContainerResult<T> + Send + Sync + 'static,
    {
        self.register(BeanDefinition::of(name, supplier).with_scope(Scope::Prototype))
    }

    pub fn register_factory_bean<B, S>(self, name: impl Into<String>, supplier: S) -> Self
    where
        B: FactoryBean,
        S: Fn(&DefaultListableBeanFactory) -> ContainerResult<B> + Send + Sync + 'static,
    {
        self.register(BeanDefinition::factory_bean(name, supplier))
    }

    /// 每个停止阶段的超时；未设置时读取 `lifecycle.timeout-per-shutdown-phase`（毫秒）
    pub fn timeout_per_shutdown_phase(mut self, timeout: Duration) -> Self {
        self.timeout_per_shutdown_phase = Some(timeout);
        self
    }

    /// 构建上下文（Created 状态），注册定义出错时立即返回
    pub fn build(self) -> ContainerResult<Arc<ApplicationContext>> {
        let bean_factory = DefaultListableBeanFactory::new();

        let environment = self.environment.clone();
        bean_factory.register_singleton(ENVIRONMENT_BEAN_NAME, move |_| Ok(environment.clone()))?;
        for definition in self.definitions {
            bean_factory.register_bean_definition(definition)?;
        }

        let timeout = self.timeout_per_shutdown_phase.unwrap_or_else(|| {
            Duration::from_millis(self.environment.get_u64_or(
                TIMEOUT_PER_SHUTDOWN_PHASE_KEY,
                DEFAULT_TIMEOUT_PER_SHUTDOWN_PHASE_MS,
            ))
        });
        let lifecycle_processor = DefaultLifecycleProcessor::new(Arc::clone(&bean_factory))
            .with_timeout_per_shutdown_phase(timeout);

        tracing::debug!(
            "Built {} with {} bean definition(s)",
            self.display_name,
            bean_factory.get_bean_definition_count()
        );

        Ok(Arc::new(ApplicationContext {
            display_name: self.display_name,
            bean_factory,
            environment: self.environment,
            lifecycle_processor,
            shutdown_hooks: RwLock::new(Vec::new()),
            state: RwLock::new(ContextState::Created),
            startup_shutdown_monitor: Mutex::new(()),
        }))
    }

    /// 构建并立即刷新
    pub fn build_and_refresh(self) -> ContainerResult<Arc<ApplicationContext>> {
        let context = self.build()?;
        context.refresh()?;
        Ok(context)
    }
}

impl Default for ApplicationContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bean_factory::BeanFactoryExt;
    use crate::config::MapPropertySource;
    use crate::lifecycle::tests::Switch;
    use crate::lifecycle::SmartLifecycle;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Greeter {
        greeting: String,
    }

    #[derive(Default)]
    struct Server(Switch);

    impl Lifecycle for Server {
        fn start(&self) -> ContainerResult<()> {
            self.0.start()
        }

        fn stop(&self) -> ContainerResult<()> {
            self.0.stop()
        }

        fn is_running(&self) -> bool {
            self.0.is_running()
        }
    }

    impl SmartLifecycle for Server {}

    fn greeter_context() -> Arc<ApplicationContext> {
        ApplicationContext::builder()
            .display_name("test context")
            .register_singleton("greeter", |_| {
                Ok(Greeter {
                    greeting: "hello".into(),
                })
            })
            .build()
            .unwrap()
    }

    #[test]
    fn test_state_machine() {
        let context = greeter_context();
        assert_eq!(context.state(), ContextState::Created);
        match context.get_bean("greeter") {
            Err(ContainerError::IllegalState(message)) => {
                assert_eq!(message, "test context has not been refreshed yet");
            }
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }

        context.refresh().unwrap();
        assert!(context.is_active());
        assert_eq!(context.get_bean_as::<Greeter>("greeter").unwrap().greeting, "hello");
        assert!(matches!(context.refresh(), Err(ContainerError::IllegalState(_))));

        context.close().unwrap();
        assert_eq!(context.state(), ContextState::Closed);
        assert!(matches!(
            context.get_bean("greeter"),
            Err(ContainerError::IllegalState(ref m)) if m.ends_with("closed already")
        ));
        context.close().unwrap();
        assert!(matches!(context.refresh(), Err(ContainerError::IllegalState(_))));
    }

    #[test]
    fn test_refresh_freezes_configuration() {
        let context = greeter_context();
        context.refresh().unwrap();
        assert!(context.bean_factory().is_configuration_frozen());
        assert!(matches!(
            context.register_singleton("late", |_| Ok(1u8)),
            Err(ContainerError::IllegalState(_))
        ));
    }

    #[test]
    fn test_refresh_failure_destroys_created_singletons() {
        let destroyed = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&destroyed);
        let context = ApplicationContext::builder()
            .register(
                BeanDefinition::of("greeter", |_| {
                    Ok(Greeter {
                        greeting: "hi".into(),
                    })
                })
                .with_destroy(move |_: &Greeter| {
                    seen.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }),
            )
            .register_singleton("broken", |_| {
                Err::<Greeter, _>(ContainerError::Config("missing endpoint".into()))
            })
            .build()
            .unwrap();

        match context.refresh() {
            Err(ContainerError::BeanCreation { name, .. }) => assert_eq!(name, "broken"),
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(destroyed.load(Ordering::SeqCst), 1);
        assert_eq!(context.state(), ContextState::Closed);
        context.close().unwrap();
        assert_eq!(destroyed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_refresh_rejects_invalid_dependency_graph() {
        let context = ApplicationContext::builder()
            .register(BeanDefinition::of("a", |_| Ok(1u32)).with_dependencies(["b"]))
            .register(BeanDefinition::of("b", |_| Ok(2u32)).with_dependencies(["a"]))
            .build()
            .unwrap();

        assert!(matches!(
            context.refresh(),
            Err(ContainerError::DependencyValidationFailed(_))
        ));
        assert_eq!(context.state(), ContextState::Closed);
    }

    #[test]
    fn test_duplicate_registration_fails_at_build() {
        let result = ApplicationContext::builder()
            .register_singleton("greeter", |_| Ok(1u8))
            .register_singleton("greeter", |_| Ok(2u8))
            .build();
        assert!(matches!(result, Err(ContainerError::BeanAlreadyExists(_))));
    }

    #[test]
    fn test_lifecycle_beans_follow_context() {
        let context = ApplicationContext::builder()
            .register(BeanDefinition::of("server", |_| Ok(Server::default())).with_smart_lifecycle::<Server>())
            .build_and_refresh()
            .unwrap();

        let server = context.get_bean_as::<Server>("server").unwrap();
        assert!(server.is_running());
        assert!(context.is_running());

        context.stop().unwrap();
        assert!(!server.is_running());
        assert!(!context.is_running());

        context.start().unwrap();
        assert!(server.is_running());

        context.close().unwrap();
        assert!(!server.is_running());
        assert_eq!(server.0.starts.load(Ordering::SeqCst), 2);
        assert_eq!(server.0.stops.load(Ordering::SeqCst), 2);

        context.stop().unwrap();
        assert!(matches!(context.start(), Err(ContainerError::IllegalState(_))));
    }

    #[test]
    fn test_shutdown_hooks_run_in_order_and_failures_are_collected() {
        let context = greeter_context();
        context.refresh().unwrap();

        let order = Arc::new(Mutex::new(Vec::new()));
        for idx in 1..=3 {
            let order = Arc::clone(&order);
            context.register_shutdown_hook(move || {
                order.lock().push(idx);
                if idx == 2 {
                    return Err(ContainerError::IllegalState("flush failed".into()));
                }
                Ok(())
            });
        }

        match context.close() {
            Err(ContainerError::Lifecycle { name, .. }) => assert_eq!(name, "shutdown hook 2"),
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(*order.lock(), vec![1, 2, 3]);
        assert!(context.bean_factory().get_singleton_names().is_empty());
    }

    #[test]
    fn test_environment_is_a_bean() {
        let context = ApplicationContext::builder()
            .add_property_source(Box::new(
                MapPropertySource::new("app").with_property("greeting", "welcome"),
            ))
            .register_singleton("greeter", |factory| {
                let env = factory.get_bean_by_type::<Environment>()?;
                Ok(Greeter {
                    greeting: env.get_string_or("greeting", "hello"),
                })
            })
            .build_and_refresh()
            .unwrap();

        assert_eq!(context.get_bean_as::<Greeter>("greeter").unwrap().greeting, "welcome");
        assert!(context.contains_bean(ENVIRONMENT_BEAN_NAME));
    }

    #[test]
    fn test_shutdown_timeout_from_environment() {
        let context = ApplicationContext::builder()
            .add_property_source(Box::new(
                MapPropertySource::new("app").with_property(TIMEOUT_PER_SHUTDOWN_PHASE_KEY, 250),
            ))
            .build()
            .unwrap();
        assert_eq!(
            context.lifecycle_processor().timeout_per_shutdown_phase(),
            Duration::from_millis(250)
        );

        let explicit = ApplicationContext::builder()
            .timeout_per_shutdown_phase(Duration::from_secs(1))
            .build()
            .unwrap();
        assert_eq!(
            explicit.lifecycle_processor().timeout_per_shutdown_phase(),
            Duration::from_secs(1)
        );
    }
}
