//! app-demo 共享的 Bean 定义
pub mod beans;
