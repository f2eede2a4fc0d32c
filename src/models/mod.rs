//! 数据模型模块

pub mod post;
pub mod user;
