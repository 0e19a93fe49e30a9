use app_demo::beans::{self, Person};
use beanstalk_core::prelude::*;

const CONFIG_FILE: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/beans.toml");

fn main() -> anyhow::Result<()> {
    let file = TomlPropertySource::from_file(CONFIG_FILE)?;
    let builder = ApplicationContext::builder()
        .display_name("from-config")
        .add_property_source(Box::new(file))
        // APP_PERSON_NAME=tom 覆盖 person.name
        .add_property_source(Box::new(EnvironmentPropertySource::new("APP_")));

    LoggingConfig::from_env()
        .from_environment(builder.environment())?
        .init()?;

    let context = beans::register_from_config(builder).build_and_refresh()?;
    let person = context.get_bean_by_type::<Person>()?;
    println!("{}", person);

    context.close()?;
    Ok(())
}
