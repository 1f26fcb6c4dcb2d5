//! 应用层 - 查询（读操作）
//!
//! CQRS 查询侧：处理所有读操作

mod admin_queries;
mod health_queries;

pub mod handlers;

pub use admin_queries::*;
pub use health_queries::*;
