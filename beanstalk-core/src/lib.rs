// beanstalk-core: 显式注册的 Bean 容器
//
// 提供类型安全的 Bean 注册表，支持：
// - 单例和原型作用域，depends-on 依赖与循环检测
// - FactoryBean（`&name` 获取工厂自身）
// - 生命周期管理（init/destroy 回调、按阶段启动停止）
// - 分层配置（TOML、环境变量）与日志初始化

pub mod bean;
pub mod bean_factory;
pub mod config;
pub mod constants;
pub mod context;
pub mod error;
pub mod executor;
pub mod factory_bean;
pub mod lifecycle;
pub mod lifecycle_processor;
pub mod logging;
pub mod object_factory;
pub mod scope;
pub mod utils;

// 重新导出常用类型
pub use bean::{BeanDefinition, SharedBean, TypeDescriptor};
pub use bean_factory::{
    BeanFactory, BeanFactoryExt, ConfigurableBeanFactory, DefaultListableBeanFactory,
    ListableBeanFactory,
};
pub use config::{
    ConfigValue, Environment, EnvironmentPropertySource, MapPropertySource, PropertySource,
    TomlPropertySource,
};
pub use context::{ApplicationContext, ApplicationContextBuilder, ContextState, ShutdownHook};
pub use error::{ContainerError, ContainerResult};
pub use executor::{TaskHandle, ThreadPoolTaskExecutor};
pub use factory_bean::{CachingFactoryBean, FactoryBean};
pub use lifecycle::{CompositeLifecycle, Lifecycle, ManagedLifecycle, SmartLifecycle, StopCallback};
pub use lifecycle_processor::DefaultLifecycleProcessor;
pub use logging::{LogFormat, LogLevel, LoggingConfig};
pub use object_factory::{BeanProvider, ObjectFactory};
pub use scope::Scope;

/// Prelude 模块，包含常用的 traits 和类型
pub mod prelude {
    pub use crate::bean::{BeanDefinition, SharedBean, TypeDescriptor};
    pub use crate::bean_factory::{
        BeanFactory, BeanFactoryExt, ConfigurableBeanFactory, DefaultListableBeanFactory,
        ListableBeanFactory,
    };
    pub use crate::config::{
        self, ConfigValue, Environment, EnvironmentPropertySource, MapPropertySource,
        PropertySource, TomlPropertySource,
    };
    pub use crate::context::{ApplicationContext, ContextState};
    pub use crate::error::{ContainerError, ContainerResult};
    pub use crate::executor::{TaskHandle, ThreadPoolTaskExecutor};
    pub use crate::factory_bean::{CachingFactoryBean, FactoryBean};
    pub use crate::lifecycle::{Lifecycle, SmartLifecycle, StopCallback};
    pub use crate::logging::{LogFormat, LogLevel, LoggingConfig};
    pub use crate::object_factory::{BeanProvider, ObjectFactory};
    pub use crate::scope::Scope;
    pub use crate::utils;
    // Re-export anyhow for convenience
    pub use anyhow::{anyhow, Context};
}
