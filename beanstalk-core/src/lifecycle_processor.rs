//! 生命周期处理器 - 按阶段启动和停止容器中的生命周期 Bean
//!
//! 启动：阶段升序，同一阶段内按注册顺序，depends-on 的 Bean 先启动。
//! 停止：阶段降序，同一阶段内按注册逆序，依赖方先停止。SmartLifecycle 通过
//! `stop_with_callback` 异步停止，每个阶段最多等待 `timeout_per_shutdown_phase`。

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::bean_factory::DefaultListableBeanFactory;
use crate::constants::DEFAULT_TIMEOUT_PER_SHUTDOWN_PHASE_MS;
use crate::lifecycle::{Lifecycle, ManagedLifecycle, StopCallback};
use crate::{ContainerError, ContainerResult};

type LifecycleBeans = HashMap<String, ManagedLifecycle>;

pub struct DefaultLifecycleProcessor {
    bean_factory: Arc<DefaultListableBeanFactory>,
    timeout_per_shutdown_phase: Duration,
    running: AtomicBool,
    // 串行化所有 start/stop
    monitor: Mutex<()>,
}

impl DefaultLifecycleProcessor {
    pub fn new(bean_factory: Arc<DefaultListableBeanFactory>) -> Self {
        Self {
            bean_factory,
            timeout_per_shutdown_phase: Duration::from_millis(DEFAULT_TIMEOUT_PER_SHUTDOWN_PHASE_MS),
            running: AtomicBool::new(false),
            monitor: Mutex::new(()),
        }
    }

    pub fn with_timeout_per_shutdown_phase(mut self, timeout: Duration) -> Self {
        self.timeout_per_shutdown_phase = timeout;
        self
    }

    pub fn timeout_per_shutdown_phase(&self) -> Duration {
        self.timeout_per_shutdown_phase
    }

    /// 容器刷新完成：只启动自动启动的 SmartLifecycle
    pub fn on_refresh(&self) -> ContainerResult<()> {
        let _monitor = self.monitor.lock();
        self.start_beans(true)?;
        self.running.store(true, Ordering::Release);
        Ok(())
    }

    /// 容器关闭：停止所有生命周期 Bean
    pub fn on_close(&self) -> ContainerResult<()> {
        let _monitor = self.monitor.lock();
        let result = self.stop_beans();
        self.running.store(false, Ordering::Release);
        result
    }

    fn start_beans(&self, auto_startup_only: bool) -> ContainerResult<()> {
        let ordered = self.bean_factory.get_lifecycle_beans()?;

        let mut phases: BTreeMap<i32, Vec<String>> = BTreeMap::new();
        for (name, bean) in &ordered {
            if !auto_startup_only || bean.is_auto_startup() {
                phases.entry(bean.phase()).or_default().push(name.clone());
            }
        }

        let beans: LifecycleBeans = ordered.into_iter().collect();
        let mut visited = HashSet::new();
        for (phase, names) in &phases {
            tracing::debug!("Starting beans in phase {}", phase);
            for name in names {
                self.do_start(&beans, name, auto_startup_only, &mut visited)?;
            }
        }
        Ok(())
    }

    fn do_start(
        &self,
        beans: &LifecycleBeans,
        name: &str,
        auto_startup_only: bool,
        visited: &mut HashSet<String>,
    ) -> ContainerResult<()> {
        if !visited.insert(name.to_string()) {
            return Ok(());
        }
        let Some(bean) = beans.get(name) else {
            return Ok(());
        };

        for dependency in self.bean_factory.get_dependencies(name) {
            self.do_start(beans, &dependency, auto_startup_only, visited)?;
        }

        // 作为依赖被带起的普通 Lifecycle 也会启动
        if !bean.is_running() && (!auto_startup_only || !bean.is_smart() || bean.is_auto_startup()) {
            tracing::debug!("Starting bean '{}' (phase {})", name, bean.phase());
            bean.start()
                .map_err(|e| ContainerError::lifecycle(name, e))?;
        }
        Ok(())
    }

    fn stop_beans(&self) -> ContainerResult<()> {
        let ordered = self.bean_factory.get_lifecycle_beans()?;

        let mut phases: BTreeMap<i32, Vec<String>> = BTreeMap::new();
        for (name, bean) in &ordered {
            phases.entry(bean.phase()).or_default().push(name.clone());
        }

        let beans: LifecycleBeans = ordered.into_iter().collect();
        let mut visited = HashSet::new();
        let mut errors = Vec::new();
        for (phase, names) in phases.iter().rev() {
            self.stop_phase(*phase, names, &beans, &mut visited, &mut errors);
        }

        ContainerError::collect("Stopping lifecycle beans", errors)
    }

    fn stop_phase(
        &self,
        phase: i32,
        names: &[String],
        beans: &LifecycleBeans,
        visited: &mut HashSet<String>,
        errors: &mut Vec<ContainerError>,
    ) {
        tracing::debug!("Stopping beans in phase {}", phase);

        let (notify, stopped) = mpsc::channel();
        let mut pending = HashSet::new();
        for name in names.iter().rev() {
            self.do_stop(beans, name, &notify, &mut pending, visited, errors);
        }
        drop(notify);

        let deadline = Instant::now() + self.timeout_per_shutdown_phase;
        while !pending.is_empty() {
            match stopped.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
                Ok(name) => {
                    pending.remove(&name);
                }
                Err(RecvTimeoutError::Timeout) => {
                    tracing::warn!(
                        "Shutdown phase {} ended with bean(s) still running after {:?}: {:?}",
                        phase,
                        self.timeout_per_shutdown_phase,
                        pending
                    );
                    break;
                }
                Err(RecvTimeoutError::Disconnected) => {
                    tracing::warn!(
                        "Shutdown phase {}: stop callback(s) dropped without completing: {:?}",
                        phase,
                        pending
                    );
                    break;
                }
            }
        }
    }

    fn do_stop(
        &self,
        beans: &LifecycleBeans,
        name: &str,
        notify: &Sender<String>,
        pending: &mut HashSet<String>,
        visited: &mut HashSet<String>,
        errors: &mut Vec<ContainerError>,
    ) {
        if !visited.insert(name.to_string()) {
            return;
        }
        let Some(bean) = beans.get(name) else {
            return;
        };

        for dependent in self.bean_factory.get_dependents(name) {
            self.do_stop(beans, &dependent, notify, pending, visited, errors);
        }

        if !bean.is_running() {
            return;
        }

        tracing::debug!("Stopping bean '{}' (phase {})", name, bean.phase());
        let result = if bean.is_smart() {
            pending.insert(name.to_string());
            let result = bean.stop_with_callback(StopCallback::new(name, notify.clone()));
            if result.is_err() {
                pending.remove(name);
            }
            result
        } else {
            bean.stop()
        };

        if let Err(e) = result {
            tracing::warn!("Failed to stop bean '{}': {}", name, e);
            errors.push(ContainerError::lifecycle(name, e));
        }
    }
}

impl Lifecycle for DefaultLifecycleProcessor {
    /// 启动所有生命周期 Bean，包括未声明自动启动的
    fn start(&self) -> ContainerResult<()> {
        let _monitor = self.monitor.lock();
        self.start_beans(false)?;
        self.running.store(true, Ordering::Release);
        Ok(())
    }

    fn stop(&self) -> ContainerResult<()> {
        let _monitor = self.monitor.lock();
        let result = self.stop_beans();
        self.running.store(false, Ordering::Release);
        result
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bean::BeanDefinition;
    use crate::bean_factory::{BeanFactoryExt, ConfigurableBeanFactory};
    use crate::lifecycle::tests::Switch;
    use crate::lifecycle::SmartLifecycle;

    type Log = Arc<Mutex<Vec<String>>>;

    struct Phased {
        name: &'static str,
        phase: i32,
        auto_startup: bool,
        fail_on_stop: bool,
        running: AtomicBool,
        log: Log,
    }

    impl Phased {
        fn new(name: &'static str, phase: i32, log: &Log) -> Self {
            Self {
                name,
                phase,
                auto_startup: true,
                fail_on_stop: false,
                running: AtomicBool::new(false),
                log: Arc::clone(log),
            }
        }
    }

    impl Lifecycle for Phased {
        fn start(&self) -> ContainerResult<()> {
            self.running.store(true, Ordering::SeqCst);
            self.log.lock().push(format!("start:{}", self.name));
            Ok(())
        }

        fn stop(&self) -> ContainerResult<()> {
            self.log.lock().push(format!("stop:{}", self.name));
            if self.fail_on_stop {
                return Err(ContainerError::IllegalState("connections still open".into()));
            }
            self.running.store(false, Ordering::SeqCst);
            Ok(())
        }

        fn is_running(&self) -> bool {
            self.running.load(Ordering::SeqCst)
        }
    }

    impl SmartLifecycle for Phased {
        fn is_auto_startup(&self) -> bool {
            self.auto_startup
        }

        fn phase(&self) -> i32 {
            self.phase
        }
    }

    /// 在后台线程上停止
    #[derive(Default)]
    struct Background {
        running: Arc<AtomicBool>,
        // 持有回调但从不触发
        hang: bool,
        held: Mutex<Option<StopCallback>>,
    }

    impl Lifecycle for Background {
        fn start(&self) -> ContainerResult<()> {
            self.running.store(true, Ordering::SeqCst);
            Ok(())
        }

        fn stop(&self) -> ContainerResult<()> {
            self.running.store(false, Ordering::SeqCst);
            Ok(())
        }

        fn is_running(&self) -> bool {
            self.running.load(Ordering::SeqCst)
        }
    }

    impl SmartLifecycle for Background {
        fn stop_with_callback(&self, callback: StopCallback) -> ContainerResult<()> {
            if self.hang {
                *self.held.lock() = Some(callback);
                return Ok(());
            }
            let running = Arc::clone(&self.running);
            std::thread::spawn(move || {
                std::thread::sleep(Duration::from_millis(50));
                running.store(false, Ordering::SeqCst);
                callback.run();
            });
            Ok(())
        }
    }

    fn register_phased(factory: &DefaultListableBeanFactory, bean: impl Fn() -> Phased + Send + Sync + 'static) {
        let name = bean().name;
        factory
            .register_bean_definition(
                BeanDefinition::of(name, move |_| Ok(bean())).with_smart_lifecycle::<Phased>(),
            )
            .unwrap();
    }

    fn entries(log: &Log) -> Vec<String> {
        log.lock().clone()
    }

    #[test]
    fn test_phase_ordering() {
        let factory = DefaultListableBeanFactory::new();
        let log: Log = Arc::default();
        for (name, phase) in [("late", 10), ("early", -5), ("middle", 0), ("middle2", 0)] {
            let log = Arc::clone(&log);
            register_phased(&factory, move || Phased::new(name, phase, &log));
        }
        factory.preinstantiate_singletons().unwrap();

        let processor = DefaultLifecycleProcessor::new(Arc::clone(&factory));
        processor.on_refresh().unwrap();
        assert!(processor.is_running());
        assert_eq!(
            entries(&log),
            vec!["start:early", "start:middle", "start:middle2", "start:late"]
        );

        log.lock().clear();
        processor.on_close().unwrap();
        assert!(!processor.is_running());
        assert_eq!(
            entries(&log),
            vec!["stop:late", "stop:middle2", "stop:middle", "stop:early"]
        );
    }

    #[test]
    fn test_dependencies_start_first_and_stop_last() {
        let factory = DefaultListableBeanFactory::new();
        let log: Log = Arc::default();

        let web_log = Arc::clone(&log);
        factory
            .register_bean_definition(
                BeanDefinition::of("web", move |_| Ok(Phased::new("web", 0, &web_log)))
                    .with_smart_lifecycle::<Phased>()
                    .with_dependencies(["db"]),
            )
            .unwrap();
        let db_log = Arc::clone(&log);
        register_phased(&factory, move || Phased::new("db", 5, &db_log));

        let processor = DefaultLifecycleProcessor::new(Arc::clone(&factory));
        processor.on_refresh().unwrap();
        processor.on_close().unwrap();

        assert_eq!(
            entries(&log),
            vec!["start:db", "start:web", "stop:web", "stop:db"]
        );
    }

    #[test]
    fn test_refresh_starts_auto_startup_beans_only() {
        let factory = DefaultListableBeanFactory::new();
        let log: Log = Arc::default();

        let manual_log = Arc::clone(&log);
        register_phased(&factory, move || Phased {
            auto_startup: false,
            ..Phased::new("manual", 0, &manual_log)
        });
        factory
            .register_bean_definition(
                BeanDefinition::of("switch", |_| Ok(Switch::default())).with_lifecycle::<Switch>(),
            )
            .unwrap();

        let processor = DefaultLifecycleProcessor::new(Arc::clone(&factory));
        processor.on_refresh().unwrap();
        assert!(entries(&log).is_empty());
        let switch = factory.get_bean_as::<Switch>("switch").unwrap();
        assert!(!switch.is_running());

        processor.start().unwrap();
        assert_eq!(entries(&log), vec!["start:manual"]);
        assert!(switch.is_running());

        processor.stop().unwrap();
        assert!(!switch.is_running());
        assert_eq!(switch.stops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_waits_for_asynchronous_stop() {
        let factory = DefaultListableBeanFactory::new();
        factory
            .register_bean_definition(
                BeanDefinition::of("worker", |_| Ok(Background::default()))
                    .with_smart_lifecycle::<Background>(),
            )
            .unwrap();

        let processor = DefaultLifecycleProcessor::new(Arc::clone(&factory));
        processor.on_refresh().unwrap();
        let worker = factory.get_bean_as::<Background>("worker").unwrap();
        assert!(worker.is_running());

        processor.on_close().unwrap();
        assert!(!worker.is_running());
    }

    #[test]
    fn test_shutdown_phase_timeout_is_not_fatal() {
        let factory = DefaultListableBeanFactory::new();
        factory
            .register_bean_definition(
                BeanDefinition::of("stuck", |_| {
                    Ok(Background {
                        hang: true,
                        ..Background::default()
                    })
                })
                .with_smart_lifecycle::<Background>(),
            )
            .unwrap();

        let processor = DefaultLifecycleProcessor::new(Arc::clone(&factory))
            .with_timeout_per_shutdown_phase(Duration::from_millis(50));
        processor.on_refresh().unwrap();

        let started = Instant::now();
        processor.on_close().unwrap();
        let elapsed = started.elapsed();

        assert!(elapsed >= Duration::from_millis(50));
        assert!(elapsed < Duration::from_secs(5));
        assert!(!processor.is_running());
    }

    #[test]
    fn test_stop_failures_are_aggregated() {
        let factory = DefaultListableBeanFactory::new();
        let log: Log = Arc::default();
        for name in ["first", "second", "third"] {
            let log = Arc::clone(&log);
            register_phased(&factory, move || Phased {
                fail_on_stop: name != "second",
                ..Phased::new(name, 0, &log)
            });
        }

        let processor = DefaultLifecycleProcessor::new(Arc::clone(&factory));
        processor.on_refresh().unwrap();

        match processor.on_close().unwrap_err() {
            ContainerError::Aggregate { context, errors } => {
                assert_eq!(context, "Stopping lifecycle beans");
                assert_eq!(errors.len(), 2);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!factory.get_bean_as::<Phased>("second").unwrap().is_running());
        assert!(entries(&log).ends_with(&[
            "stop:third".to_string(),
            "stop:second".to_string(),
            "stop:first".to_string()
        ]));
    }
}
