//! 容器常量定义
//!
//! 名称前缀与配置键集中在这里，避免在注册表、上下文和执行器之间硬编码

/// FactoryBean 解引用前缀：`&name` 返回 FactoryBean 自身，而不是它产出的对象
pub const FACTORY_BEAN_PREFIX: &str = "&";

/// 上下文自动注册的 Environment Bean 名称
pub const ENVIRONMENT_BEAN_NAME: &str = "environment";

/// SmartLifecycle 默认阶段（最后启动、最先停止）
pub const DEFAULT_PHASE: i32 = i32::MAX;

/// 普通 Lifecycle 组件所在的阶段
pub const PLAIN_LIFECYCLE_PHASE: i32 = 0;

/// 每个停止阶段等待异步回调的默认超时（毫秒）
pub const DEFAULT_TIMEOUT_PER_SHUTDOWN_PHASE_MS: u64 = 30_000;

/// 配置键：每个停止阶段的超时（毫秒）
pub const TIMEOUT_PER_SHUTDOWN_PHASE_KEY: &str = "lifecycle.timeout-per-shutdown-phase";

/// 线程池执行器配置键（相对于调用方给定的前缀）
pub const EXECUTOR_CORE_POOL_SIZE_KEY: &str = "core-pool-size";
pub const EXECUTOR_MAX_POOL_SIZE_KEY: &str = "max-pool-size";
pub const EXECUTOR_THREAD_NAME_PREFIX_KEY: &str = "thread-name-prefix";
pub const EXECUTOR_WAIT_ON_SHUTDOWN_KEY: &str = "wait-for-tasks-to-complete-on-shutdown";
pub const EXECUTOR_AWAIT_TERMINATION_MS_KEY: &str = "await-termination-ms";

/// 默认线程名前缀
pub const DEFAULT_THREAD_NAME_PREFIX: &str = "task-";

/// 判断名称是否为 FactoryBean 解引用形式
///
/// # Example
/// ```
/// use beanstalk_core::constants::is_factory_dereference;
///
/// assert!(is_factory_dereference("&connectionFactory"));
/// assert!(!is_factory_dereference("connectionFactory"));
/// ```
pub fn is_factory_dereference(name: &str) -> bool {
    name.starts_with(FACTORY_BEAN_PREFIX)
}

/// 去掉所有 `&` 前缀，得到注册时使用的 Bean 名称
///
/// # Example
/// ```
/// use beanstalk_core::constants::transformed_bean_name;
///
/// assert_eq!(transformed_bean_name("&&pool"), "pool");
/// assert_eq!(transformed_bean_name("pool"), "pool");
/// ```
pub fn transformed_bean_name(name: &str) -> &str {
    name.trim_start_matches(FACTORY_BEAN_PREFIX)
}
