pub mod cache;
pub mod http;
#[cfg(test)]
pub(crate) mod mock;
pub mod utils;

use crate::session::Session;
use async_trait::async_trait;
use serde_json::Value;
use shared::dto::common::MutationResponse;
use shared::error::Result;
use shared::query::ListQuery;
use std::fmt;
use std::sync::Arc;

pub use cache::CachedApi;
pub use http::HttpApi;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationMethod {
    Post,
    Put,
    Delete,
}

impl fmt::Display for MutationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MutationMethod::Post => "POST",
            MutationMethod::Put => "PUT",
            MutationMethod::Delete => "DELETE",
        })
    }
}

/// Backend calls made by list controllers. Implemented over HTTP by
/// [`HttpApi`]; tests substitute scripted fakes.
#[async_trait]
pub trait ListApi: Send + Sync + 'static {
    /// Raw JSON body of a list response.
    async fn get_list(&self, session: &Session, path: &str, query: &ListQuery) -> Result<String>;

    /// CSV bytes of an export.
    async fn export(&self, session: &Session, path: &str, query: &ListQuery) -> Result<Vec<u8>>;

    async fn mutate(
        &self,
        session: &Session,
        method: MutationMethod,
        path: &str,
        body: Option<Value>,
    ) -> Result<MutationResponse>;

    /// Forgets anything remembered for `path`. No-op unless the API caches.
    fn invalidate(&self, _path: &str) {}
}

#[async_trait]
impl<A: ListApi> ListApi for Arc<A> {
    async fn get_list(&self, session: &Session, path: &str, query: &ListQuery) -> Result<String> {
        (**self).get_list(session, path, query).await
    }

    async fn export(&self, session: &Session, path: &str, query: &ListQuery) -> Result<Vec<u8>> {
        (**self).export(session, path, query).await
    }

    async fn mutate(
        &self,
        session: &Session,
        method: MutationMethod,
        path: &str,
        body: Option<Value>,
    ) -> Result<MutationResponse> {
        (**self).mutate(session, method, path, body).await
    }

    fn invalidate(&self, path: &str) {
        (**self).invalidate(path)
    }
}
