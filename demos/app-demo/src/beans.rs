use std::fmt;
use std::sync::Arc;

use beanstalk_core::prelude::*;
use beanstalk_core::ApplicationContextBuilder;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Address {
    pub city: String,
    pub street: String,
}

#[derive(Debug)]
pub struct Person {
    pub name: String,
    pub age: u32,
    pub address: Arc<Address>,
}

impl fmt::Display for Person {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Person{{name='{}', age={}, address={}, {}}}",
            self.name, self.age, self.address.street, self.address.city
        )
    }
}

/// `person.*` 配置
#[derive(Debug, Deserialize)]
pub struct PersonProperties {
    pub name: String,
    pub age: u32,
    pub address: Address,
}

/// 注册固定值的 address 与 person
pub fn register(builder: ApplicationContextBuilder) -> ApplicationContextBuilder {
    builder
        .register(BeanDefinition::of_type(|_| {
            Ok(Address {
                city: "Hangzhou".to_string(),
                street: "Wensan Road".to_string(),
            })
        }))
        .register(
            BeanDefinition::of("person", |factory| {
                let address = factory.get_bean_as::<Address>("address")?;
                Ok(Person {
                    name: "jerry".to_string(),
                    age: 18,
                    address,
                })
            })
            .with_dependencies(["address"]),
        )
}

/// 从 Environment 绑定 `person.*` 创建 person
pub fn register_from_config(builder: ApplicationContextBuilder) -> ApplicationContextBuilder {
    builder.register_singleton("person", |factory| {
        let env = factory.get_bean_by_type::<Environment>()?;
        let properties: PersonProperties = env.bind("person")?;
        tracing::debug!("Bound person properties: {:?}", properties);
        Ok(Person {
            name: properties.name,
            age: properties.age,
            address: Arc::new(properties.address),
        })
    })
}
