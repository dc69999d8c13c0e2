//! DupLynx 重复文件动作分发服务
//! 按租户隔离的重复组保管机指派、处置动作与审计追踪

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod repository;
pub mod routes;
pub mod seed;
pub mod services;
pub mod telemetry;
pub mod tenancy;
