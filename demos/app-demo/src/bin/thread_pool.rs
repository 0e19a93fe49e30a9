use std::time::Duration;

use beanstalk_core::prelude::*;

fn main() -> anyhow::Result<()> {
    LoggingConfig::from_env().show_thread_names(true).init()?;

    let context = ApplicationContext::builder()
        .display_name("thread-pool")
        .add_property_source(Box::new(
            MapPropertySource::new("executor")
                .with_property("executor.core-pool-size", 2)
                .with_property("executor.thread-name-prefix", "demo-pool-")
                .with_property("executor.wait-for-tasks-to-complete-on-shutdown", true)
                .with_property("executor.await-termination-ms", 5000),
        ))
        .register(
            BeanDefinition::of("taskExecutor", |factory| {
                let env = factory.get_bean_by_type::<Environment>()?;
                ThreadPoolTaskExecutor::from_environment(&env, "executor")
            })
            .with_smart_lifecycle::<ThreadPoolTaskExecutor>(),
        )
        .build_and_refresh()?;

    let executor = context.get_bean_as::<ThreadPoolTaskExecutor>("taskExecutor")?;

    let handles = (1..=4)
        .map(|n| {
            executor.submit(move || {
                std::thread::sleep(Duration::from_millis(20));
                let thread = std::thread::current();
                format!("task {} ran on {}", n, thread.name().unwrap_or("unnamed"))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    for handle in handles {
        println!("{}", handle.wait()?);
    }

    // 关闭上下文时执行器随之停止
    context.close()?;
    println!("executor running after close: {}", executor.is_running());
    Ok(())
}
