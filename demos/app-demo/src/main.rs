use app_demo::beans::{self, Person};
use beanstalk_core::prelude::*;

fn main() -> anyhow::Result<()> {
    LoggingConfig::from_env().init()?;

    let context = beans::register(ApplicationContext::builder().display_name("app-demo"))
        .build_and_refresh()?;

    let person = context.get_bean_by_type::<Person>()?;
    println!("{}", person);

    context.close()?;
    Ok(())
}
