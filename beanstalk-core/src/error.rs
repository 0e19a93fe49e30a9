//! 容器统一错误类型
//!
//! 所有对外接口都返回 [`ContainerResult`]。底层原因统一使用 `anyhow::Error` 承载，
//! 通过 `.context()` 补充上下文。

use thiserror::Error;

/// 容器操作的结果类型
pub type ContainerResult<T> = std::result::Result<T, ContainerError>;

/// 容器错误
#[derive(Debug, Error)]
pub enum ContainerError {
    /// 未注册的 Bean 名称
    #[error("Bean '{0}' not found")]
    BeanNotFound(String),

    /// 按类型查找时存在多个候选
    #[error("No unique bean of type '{type_name}': found {candidates:?}")]
    NoUniqueBean {
        type_name: String,
        candidates: Vec<String>,
    },

    #[error("Bean '{0}' already exists")]
    BeanAlreadyExists(String),

    /// 创建实例失败（CreationError），包装底层原因
    #[error("Error creating bean '{name}': {source}")]
    BeanCreation {
        name: String,
        #[source]
        source: anyhow::Error,
    },

    /// FactoryBean 尚未完成自身初始化（可稍后重试）
    #[error("FactoryBean '{0}' is not fully initialized yet")]
    FactoryBeanNotInitialized(String),

    /// FactoryBean 产出了空对象，而调用方要求必须存在
    #[error("Bean '{0}' resolved to an absent object")]
    NullBean(String),

    #[error("Bean '{name}' is of type '{found}', expected '{expected}'")]
    TypeMismatch {
        name: String,
        expected: String,
        found: String,
    },

    #[error("Bean '{0}' is not a FactoryBean")]
    NotAFactoryBean(String),

    #[error("Circular dependency detected: {0}")]
    CircularDependency(String),

    #[error("Dependency validation failed: {0}")]
    DependencyValidationFailed(String),

    /// start/stop/destroy 回调失败
    #[error("Lifecycle failure in '{name}': {source}")]
    Lifecycle {
        name: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Illegal state: {0}")]
    IllegalState(String),

    #[error("Task rejected: {0}")]
    TaskRejected(String),

    #[error("Task failed: {0}")]
    TaskFailed(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to initialize logging: {0}")]
    LoggingInitFailed(String),

    /// 多个独立失败的汇总（例如组合组件的 stop、单例销毁）
    #[error("{context}: {} failure(s): {}", .errors.len(), join_messages(.errors))]
    Aggregate {
        context: String,
        errors: Vec<ContainerError>,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ContainerError {
    /// 将任意错误包装为指定 Bean 的创建失败
    ///
    /// 循环依赖和 FactoryBean 未初始化保持原样向上传递，以便调用方仍能识别它们；
    /// 同一个 Bean 的创建错误不会被重复包装。
    pub fn creation(name: impl Into<String>, error: ContainerError) -> Self {
        let name = name.into();
        match error {
            e @ (ContainerError::CircularDependency(_)
            | ContainerError::FactoryBeanNotInitialized(_)) => e,
            ContainerError::BeanCreation { name: inner, source } if inner == name => {
                ContainerError::BeanCreation { name: inner, source }
            }
            other => ContainerError::BeanCreation {
                name,
                source: anyhow::Error::new(other),
            },
        }
    }

    pub fn lifecycle(name: impl Into<String>, error: ContainerError) -> Self {
        match error {
            e @ ContainerError::Lifecycle { .. } => e,
            other => ContainerError::Lifecycle {
                name: name.into(),
                source: anyhow::Error::new(other),
            },
        }
    }

    /// 是否可以在稍后重试（目前仅 FactoryBean 未初始化）
    pub fn is_retryable(&self) -> bool {
        matches!(self, ContainerError::FactoryBeanNotInitialized(_))
    }

    /// 把错误列表收敛成单个结果：空列表为 Ok，单个错误原样返回，多个则汇总
    pub fn collect(context: impl Into<String>, mut errors: Vec<ContainerError>) -> ContainerResult<()> {
        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(ContainerError::Aggregate {
                context: context.into(),
                errors,
            }),
        }
    }
}

fn join_messages(errors: &[ContainerError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
