use std::any::Any;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::bean::{SharedBean, TypeDescriptor};
use crate::constants::{DEFAULT_PHASE, PLAIN_LIFECYCLE_PHASE};
use crate::{ContainerError, ContainerResult};

/// 生命周期管理 trait
///
/// 两个状态：stopped（初始）和 running。
/// - `start()` 在已运行时不做任何事
/// - `stop()` 在已停止时不做任何事，返回时组件必须已完全停下
/// - `is_running()` 是纯查询
pub trait Lifecycle: Send + Sync {
    fn start(&self) -> ContainerResult<()>;

    fn stop(&self) -> ContainerResult<()>;

    fn is_running(&self) -> bool;
}

/// 异步停止完成后的通知
///
/// 由组件在真正停下之后调用 [`run`](Self::run)，可以在任意线程上调用。
pub struct StopCallback {
    name: String,
    notify: Option<Sender<String>>,
}

impl StopCallback {
    pub(crate) fn new(name: impl Into<String>, notify: Sender<String>) -> Self {
        Self {
            name: name.into(),
            notify: Some(notify),
        }
    }

    /// 不关联任何等待方的回调
    pub fn detached(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            notify: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// 通知容器该组件已停止
    pub fn run(self) {
        tracing::trace!("Stop callback fired for '{}'", self.name);
        if let Some(notify) = self.notify {
            // 等待方可能已超时离开
            let _ = notify.send(self.name);
        }
    }
}

/// 带阶段、自动启动和异步停止能力的生命周期组件
///
/// 阶段值越小越先启动、越后停止。
pub trait SmartLifecycle: Lifecycle {
    /// 容器刷新完成后是否自动启动
    fn is_auto_startup(&self) -> bool {
        true
    }

    fn phase(&self) -> i32 {
        DEFAULT_PHASE
    }

    /// 异步停止：完成后必须调用 `callback.run()`
    ///
    /// 默认实现同步停止后立即回调。
    fn stop_with_callback(&self, callback: StopCallback) -> ContainerResult<()> {
        let result = self.stop();
        callback.run();
        result
    }
}

/// 容器持有的生命周期组件
#[derive(Clone)]
pub enum ManagedLifecycle {
    Plain(Arc<dyn Lifecycle>),
    Smart(Arc<dyn SmartLifecycle>),
}

impl ManagedLifecycle {
    pub fn phase(&self) -> i32 {
        match self {
            ManagedLifecycle::Plain(_) => PLAIN_LIFECYCLE_PHASE,
            ManagedLifecycle::Smart(smart) => smart.phase(),
        }
    }

    /// 普通 Lifecycle 不会被自动启动
    pub fn is_auto_startup(&self) -> bool {
        match self {
            ManagedLifecycle::Plain(_) => false,
            ManagedLifecycle::Smart(smart) => smart.is_auto_startup(),
        }
    }

    pub fn is_smart(&self) -> bool {
        matches!(self, ManagedLifecycle::Smart(_))
    }

    pub fn stop_with_callback(&self, callback: StopCallback) -> ContainerResult<()> {
        match self {
            ManagedLifecycle::Plain(plain) => {
                let result = plain.stop();
                callback.run();
                result
            }
            ManagedLifecycle::Smart(smart) => smart.stop_with_callback(callback),
        }
    }
}

impl Lifecycle for ManagedLifecycle {
    fn start(&self) -> ContainerResult<()> {
        match self {
            ManagedLifecycle::Plain(plain) => plain.start(),
            ManagedLifecycle::Smart(smart) => smart.start(),
        }
    }

    fn stop(&self) -> ContainerResult<()> {
        match self {
            ManagedLifecycle::Plain(plain) => plain.stop(),
            ManagedLifecycle::Smart(smart) => smart.stop(),
        }
    }

    fn is_running(&self) -> bool {
        match self {
            ManagedLifecycle::Plain(plain) => plain.is_running(),
            ManagedLifecycle::Smart(smart) => smart.is_running(),
        }
    }
}

/// 注册时按具体类型生成，把共享实例还原为生命周期组件
#[derive(Clone, Copy)]
pub(crate) struct LifecycleAdapter {
    bean_type: TypeDescriptor,
    resolve: fn(&SharedBean) -> Option<ManagedLifecycle>,
}

impl LifecycleAdapter {
    pub(crate) fn plain<T: Lifecycle + Any>() -> Self {
        Self {
            bean_type: TypeDescriptor::of::<T>(),
            resolve: resolve_plain::<T>,
        }
    }

    pub(crate) fn smart<T: SmartLifecycle + Any>() -> Self {
        Self {
            bean_type: TypeDescriptor::of::<T>(),
            resolve: resolve_smart::<T>,
        }
    }

    pub(crate) fn bean_type(&self) -> TypeDescriptor {
        self.bean_type
    }

    pub(crate) fn resolve(&self, bean: &SharedBean) -> Option<ManagedLifecycle> {
        (self.resolve)(bean)
    }
}

fn resolve_plain<T: Lifecycle + Any>(bean: &SharedBean) -> Option<ManagedLifecycle> {
    Arc::clone(bean)
        .downcast::<T>()
        .ok()
        .map(|bean| ManagedLifecycle::Plain(bean as Arc<dyn Lifecycle>))
}

fn resolve_smart<T: SmartLifecycle + Any>(bean: &SharedBean) -> Option<ManagedLifecycle> {
    Arc::clone(bean)
        .downcast::<T>()
        .ok()
        .map(|bean| ManagedLifecycle::Smart(bean as Arc<dyn SmartLifecycle>))
}

/// 组合生命周期组件
///
/// - `start()` 按添加顺序启动子组件，遇到第一个失败即返回，已启动的子组件保持运行
/// - `stop()` 按相反顺序停止子组件，某个子组件失败不会阻止其余子组件停止，
///   全部处理完后返回失败汇总；此后组合组件报告未运行
/// - `is_running()` 仅当自身已启动且所有子组件都在运行时为 true
pub struct CompositeLifecycle {
    name: String,
    children: Vec<(String, Arc<dyn Lifecycle>)>,
    started: AtomicBool,
    // start 与 stop 互斥
    monitor: Mutex<()>,
}

impl CompositeLifecycle {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            children: Vec::new(),
            started: AtomicBool::new(false),
            monitor: Mutex::new(()),
        }
    }

    pub fn with_child(mut self, name: impl Into<String>, child: Arc<dyn Lifecycle>) -> Self {
        self.children.push((name.into(), child));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn children(&self) -> impl Iterator<Item = (&str, &Arc<dyn Lifecycle>)> {
        self.children.iter().map(|(name, child)| (name.as_str(), child))
    }
}

impl Lifecycle for CompositeLifecycle {
    fn start(&self) -> ContainerResult<()> {
        let _monitor = self.monitor.lock();
        for (name, child) in &self.children {
            if child.is_running() {
                continue;
            }
            tracing::debug!("Starting '{}' in composite '{}'", name, self.name);
            child
                .start()
                .map_err(|e| ContainerError::lifecycle(name.clone(), e))?;
        }
        self.started.store(true, Ordering::Release);
        Ok(())
    }

    fn stop(&self) -> ContainerResult<()> {
        let _monitor = self.monitor.lock();
        self.started.store(false, Ordering::Release);

        let mut errors = Vec::new();
        for (name, child) in self.children.iter().rev() {
            if !child.is_running() {
                continue;
            }
            tracing::debug!("Stopping '{}' in composite '{}'", name, self.name);
            if let Err(e) = child.stop() {
                tracing::warn!("Failed to stop '{}' in composite '{}': {}", name, self.name, e);
                errors.push(ContainerError::lifecycle(name.clone(), e));
            }
        }
        ContainerError::collect(format!("Stopping composite '{}'", self.name), errors)
    }

    fn is_running(&self) -> bool {
        self.started.load(Ordering::Acquire)
            && self.children.iter().all(|(_, child)| child.is_running())
    }
}
