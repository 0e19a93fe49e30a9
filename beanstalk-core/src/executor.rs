//! 线程池任务执行器
//!
//! `ThreadPoolTaskExecutor` 是一个 SmartLifecycle 组件，内部持有 tokio 多线程运行时：
//! 阻塞任务（`execute` / `submit`）跑在运行时的阻塞线程池上，`spawn` 的 future
//! 跑在工作线程上。停止后提交任务会被拒绝。

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tokio::runtime::{Builder, Handle, Runtime};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::config::Environment;
use crate::constants::{
    DEFAULT_PHASE, DEFAULT_THREAD_NAME_PREFIX, EXECUTOR_AWAIT_TERMINATION_MS_KEY,
    EXECUTOR_CORE_POOL_SIZE_KEY, EXECUTOR_MAX_POOL_SIZE_KEY, EXECUTOR_THREAD_NAME_PREFIX_KEY,
    EXECUTOR_WAIT_ON_SHUTDOWN_KEY,
};
use crate::lifecycle::{Lifecycle, SmartLifecycle, StopCallback};
use crate::{ContainerError, ContainerResult};

/// 已提交任务的结果句柄
pub struct TaskHandle<R> {
    receiver: oneshot::Receiver<R>,
}

impl<R> TaskHandle<R> {
    /// 阻塞等待任务结果，不能在异步上下文中调用
    pub fn wait(self) -> ContainerResult<R> {
        self.receiver.blocking_recv().map_err(|_| task_failed())
    }

    pub async fn join(self) -> ContainerResult<R> {
        self.receiver.await.map_err(|_| task_failed())
    }
}

fn task_failed() -> ContainerError {
    ContainerError::TaskFailed("task panicked or was cancelled before completion".to_string())
}

/// 已提交但尚未结束的阻塞任务计数，归零时唤醒等待者
#[derive(Default)]
struct TaskCounter {
    count: Mutex<usize>,
    drained: Condvar,
}

impl TaskCounter {
    fn get(&self) -> usize {
        *self.count.lock()
    }

    /// 等待计数归零，`timeout` 为 `None` 时不限时；返回是否已归零
    fn wait_drained(&self, timeout: Option<Duration>) -> bool {
        let mut count = self.count.lock();
        match timeout {
            None => {
                while *count > 0 {
                    self.drained.wait(&mut count);
                }
            }
            Some(timeout) => {
                let deadline = Instant::now() + timeout;
                while *count > 0 {
                    if self.drained.wait_until(&mut count, deadline).timed_out() {
                        break;
                    }
                }
            }
        }
        *count == 0
    }
}

// 提交时计数，任务结束或被取消时归还
struct ActiveTask(Arc<TaskCounter>);

impl ActiveTask {
    fn new(counter: &Arc<TaskCounter>) -> Self {
        *counter.count.lock() += 1;
        Self(Arc::clone(counter))
    }
}

impl Drop for ActiveTask {
    fn drop(&mut self) {
        let mut count = self.0.count.lock();
        *count -= 1;
        if *count == 0 {
            self.0.drained.notify_all();
        }
    }
}

/// 关闭运行时所需的参数，可以移交给后台线程
struct Shutdown {
    prefix: String,
    wait_for_tasks: bool,
    await_termination: Duration,
    tasks: Arc<TaskCounter>,
}

impl Shutdown {
    /// 返回时所有阻塞任务都已结束（或等待超时）
    fn run(self, runtime: Runtime) {
        let timeout = (!self.await_termination.is_zero()).then_some(self.await_termination);
        if self.wait_for_tasks {
            // 排队中的任务也要跑完，之后才关闭运行时
            tracing::debug!(
                "Waiting for {} task(s) of '{}' to complete",
                self.tasks.get(),
                self.prefix
            );
            self.drain(timeout);
            runtime.shutdown_background();
        } else {
            // 排队中的任务被取消，正在执行的阻塞任务无法中断
            runtime.shutdown_background();
            self.drain(timeout);
        }
        tracing::info!("Executor '{}' shut down", self.prefix);
    }

    fn drain(&self, timeout: Option<Duration>) {
        if !self.tasks.wait_drained(timeout) {
            tracing::warn!(
                "Executor '{}' still has {} running task(s) after {:?}",
                self.prefix,
                self.tasks.get(),
                self.await_termination
            );
        }
    }
}

/// 基于 tokio 运行时的线程池执行器
pub struct ThreadPoolTaskExecutor {
    core_pool_size: usize,
    max_pool_size: usize,
    thread_name_prefix: String,
    wait_for_tasks_to_complete_on_shutdown: bool,
    await_termination: Duration,
    phase: i32,
    auto_startup: bool,

    runtime: Mutex<Option<Runtime>>,
    active_tasks: Arc<TaskCounter>,
}

impl ThreadPoolTaskExecutor {
    pub fn new() -> Self {
        Self {
            core_pool_size: 1,
            max_pool_size: 1,
            thread_name_prefix: DEFAULT_THREAD_NAME_PREFIX.to_string(),
            wait_for_tasks_to_complete_on_shutdown: false,
            await_termination: Duration::ZERO,
            phase: DEFAULT_PHASE,
            auto_startup: true,
            runtime: Mutex::new(None),
            active_tasks: Arc::new(TaskCounter::default()),
        }
    }

    /// 从 `{prefix}.core-pool-size` 等配置项读取设置，未配置的保持默认值
    pub fn from_environment(env: &Environment, prefix: &str) -> ContainerResult<Self> {
        let key = |name: &str| format!("{}.{}", prefix, name);
        let defaults = Self::new();

        let core_pool_size = read_usize(env, &key(EXECUTOR_CORE_POOL_SIZE_KEY), defaults.core_pool_size)?;
        // 只配置了核心线程数时最大线程数跟随它
        let max_pool_size = read_usize(env, &key(EXECUTOR_MAX_POOL_SIZE_KEY), core_pool_size)?;
        let thread_name_prefix =
            env.get_string_or(&key(EXECUTOR_THREAD_NAME_PREFIX_KEY), &defaults.thread_name_prefix);
        let wait = env.get_bool_or(
            &key(EXECUTOR_WAIT_ON_SHUTDOWN_KEY),
            defaults.wait_for_tasks_to_complete_on_shutdown,
        );
        let await_termination_ms = env.get_u64_or(&key(EXECUTOR_AWAIT_TERMINATION_MS_KEY), 0);

        let executor = defaults
            .core_pool_size(core_pool_size)
            .max_pool_size(max_pool_size)
            .thread_name_prefix(thread_name_prefix)
            .wait_for_tasks_to_complete_on_shutdown(wait)
            .await_termination(Duration::from_millis(await_termination_ms));
        executor.validate()?;
        Ok(executor)
    }

    pub fn core_pool_size(mut self, size: usize) -> Self {
        self.core_pool_size = size;
        self
    }

    pub fn max_pool_size(mut self, size: usize) -> Self {
        self.max_pool_size = size;
        self
    }

    pub fn thread_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name_prefix = prefix.into();
        self
    }

    pub fn wait_for_tasks_to_complete_on_shutdown(mut self, wait: bool) -> Self {
        self.wait_for_tasks_to_complete_on_shutdown = wait;
        self
    }

    /// 停止时最多等待任务结束的时间，零表示一直等到任务结束
    pub fn await_termination(mut self, timeout: Duration) -> Self {
        self.await_termination = timeout;
        self
    }

    pub fn with_phase(mut self, phase: i32) -> Self {
        self.phase = phase;
        self
    }

    pub fn with_auto_startup(mut self, auto_startup: bool) -> Self {
        self.auto_startup = auto_startup;
        self
    }

    pub fn get_thread_name_prefix(&self) -> &str {
        &self.thread_name_prefix
    }

    /// 已提交但尚未结束的阻塞任务数
    pub fn active_count(&self) -> usize {
        self.active_tasks.get()
    }

    fn validate(&self) -> ContainerResult<()> {
        if self.core_pool_size == 0 {
            return Err(ContainerError::Config(
                "core pool size must be greater than 0".to_string(),
            ));
        }
        if self.max_pool_size < self.core_pool_size {
            return Err(ContainerError::Config(format!(
                "max pool size ({}) must not be less than core pool size ({})",
                self.max_pool_size, self.core_pool_size
            )));
        }
        Ok(())
    }

    /// 创建运行时，与 `start` 相同
    pub fn initialize(&self) -> ContainerResult<()> {
        self.start()
    }

    fn handle(&self) -> ContainerResult<Handle> {
        self.runtime
            .lock()
            .as_ref()
            .map(|runtime| runtime.handle().clone())
            .ok_or_else(|| {
                ContainerError::TaskRejected(format!(
                    "executor '{}' is not running",
                    self.thread_name_prefix
                ))
            })
    }

    /// 在线程池中执行阻塞任务，不关心结果
    pub fn execute<F>(&self, task: F) -> ContainerResult<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let handle = self.handle()?;
        let active = ActiveTask::new(&self.active_tasks);
        handle.spawn_blocking(move || {
            let _active = active;
            task()
        });
        Ok(())
    }

    /// 提交阻塞任务，通过返回的句柄取得结果
    pub fn submit<F, R>(&self, task: F) -> ContainerResult<TaskHandle<R>>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let handle = self.handle()?;
        let active = ActiveTask::new(&self.active_tasks);
        let (sender, receiver) = oneshot::channel();
        handle.spawn_blocking(move || {
            let _active = active;
            // 接收方已放弃结果
            let _ = sender.send(task());
        });
        Ok(TaskHandle { receiver })
    }

    /// 在工作线程上运行 future
    pub fn spawn<F>(&self, future: F) -> ContainerResult<JoinHandle<F::Output>>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        Ok(self.handle()?.spawn(future))
    }

    fn shutdown_plan(&self) -> Shutdown {
        Shutdown {
            prefix: self.thread_name_prefix.clone(),
            wait_for_tasks: self.wait_for_tasks_to_complete_on_shutdown,
            await_termination: self.await_termination,
            tasks: Arc::clone(&self.active_tasks),
        }
    }
}

fn read_usize(env: &Environment, key: &str, default: usize) -> ContainerResult<usize> {
    match env.get_i64(key) {
        Some(value) => usize::try_from(value)
            .map_err(|_| ContainerError::Config(format!("'{}' must not be negative, got {}", key, value))),
        None => Ok(default),
    }
}

impl Default for ThreadPoolTaskExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifecycle for ThreadPoolTaskExecutor {
    fn start(&self) -> ContainerResult<()> {
        self.validate()?;

        let mut guard = self.runtime.lock();
        if guard.is_some() {
            return Ok(());
        }

        let prefix = self.thread_name_prefix.clone();
        let counter = AtomicUsize::new(0);
        let runtime = Builder::new_multi_thread()
            .worker_threads(self.core_pool_size)
            .max_blocking_threads(self.max_pool_size)
            .thread_name_fn(move || format!("{}{}", prefix, counter.fetch_add(1, Ordering::SeqCst) + 1))
            .enable_all()
            .build()
            .map_err(|e| ContainerError::Other(e.into()))?;

        *guard = Some(runtime);
        tracing::info!(
            "Executor '{}' started (core: {}, max: {})",
            self.thread_name_prefix,
            self.core_pool_size,
            self.max_pool_size
        );
        Ok(())
    }

    fn stop(&self) -> ContainerResult<()> {
        let runtime = self.runtime.lock().take();
        if let Some(runtime) = runtime {
            self.shutdown_plan().run(runtime);
        }
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.runtime.lock().is_some()
    }
}

impl SmartLifecycle for ThreadPoolTaskExecutor {
    fn is_auto_startup(&self) -> bool {
        self.auto_startup
    }

    fn phase(&self) -> i32 {
        self.phase
    }

    /// 在后台线程中关闭运行时，任务全部结束后回调
    fn stop_with_callback(&self, callback: StopCallback) -> ContainerResult<()> {
        let Some(runtime) = self.runtime.lock().take() else {
            callback.run();
            return Ok(());
        };

        let shutdown = self.shutdown_plan();
        std::thread::Builder::new()
            .name(format!("{}shutdown", self.thread_name_prefix))
            .spawn(move || {
                shutdown.run(runtime);
                callback.run();
            })
            .map_err(|e| ContainerError::Other(e.into()))?;
        Ok(())
    }
}

impl Drop for ThreadPoolTaskExecutor {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.get_mut().take() {
            runtime.shutdown_background();
        }
    }
}

impl std::fmt::Debug for ThreadPoolTaskExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadPoolTaskExecutor")
            .field("core_pool_size", &self.core_pool_size)
            .field("max_pool_size", &self.max_pool_size)
            .field("thread_name_prefix", &self.thread_name_prefix)
            .field("running", &self.is_running())
            .field("active_tasks", &self.active_count())
            .finish()
    }
}
