//! 租户隔离
//! 作用域解析、HTTP 中间件与按作用域过滤的读取入口

pub mod middleware;
pub mod scope;
pub mod scoped_repository;

pub use middleware::{require_tenant_scope, PATH_TENANT_PARAM};
pub use scope::{Scope, ScopeResolver, HEADER_TENANT_SLUG};
pub use scoped_repository::ScopedRepository;
