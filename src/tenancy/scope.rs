//! 租户作用域解析

use serde::Serialize;
use std::sync::Arc;

use crate::{
    error::{AppError, Result, ScopeViolation},
    services::TenantDirectory,
};

/// 携带租户标识的请求头
pub const HEADER_TENANT_SLUG: &str = "X-Duplynx-Tenant";

/// 已解析的租户作用域
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Scope {
    pub tenant_slug: String,
}

impl Scope {
    pub fn new(tenant_slug: impl Into<String>) -> Self {
        Self {
            tenant_slug: tenant_slug.into(),
        }
    }

    /// 请求体中携带的租户必须与作用域一致；空值视为未携带
    pub fn ensure_matches(&self, requested: Option<&str>) -> Result<()> {
        match requested.map(str::trim).filter(|s| !s.is_empty()) {
            Some(slug) if slug != self.tenant_slug => Err(AppError::scope_violation(
                Some(&self.tenant_slug),
                slug,
                ScopeViolation::BODY_MISMATCH,
            )),
            _ => Ok(()),
        }
    }
}

fn token(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|s| !s.is_empty())
}

pub struct ScopeResolver {
    directory: Arc<TenantDirectory>,
}

impl ScopeResolver {
    pub fn new(directory: Arc<TenantDirectory>) -> Self {
        Self { directory }
    }

    /// 由请求头与路径参数解析作用域
    ///
    /// 请求头优先；路径参数存在时必须与请求头一致。
    pub async fn resolve(&self, header: Option<&str>, path: Option<&str>) -> Result<Scope> {
        let header = token(header);
        let path = token(path);

        let active = header.or(path).ok_or(AppError::ScopeRequired)?;

        if self.directory.tenant(active).await?.is_none() {
            tracing::warn!(
                current_tenant = ?header,
                requested_slug = active,
                "Tenant scope rejected: tenant not registered"
            );
            return Err(AppError::scope_violation(
                header,
                active,
                ScopeViolation::TENANT_NOT_REGISTERED,
            ));
        }

        if let Some(path) = path {
            if path != active {
                tracing::warn!(
                    current_tenant = active,
                    requested_slug = path,
                    "Tenant scope rejected: path mismatch"
                );
                return Err(AppError::scope_violation(
                    Some(active),
                    path,
                    ScopeViolation::PATH_MISMATCH,
                ));
            }
        }

        Ok(Scope::new(active))
    }
}
