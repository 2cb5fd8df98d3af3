use super::{ListApi, MutationMethod};
use crate::session::Session;
use async_trait::async_trait;
use serde_json::Value;
use shared::dto::common::MutationResponse;
use shared::error::{ClientError, Result};
use shared::query::ListQuery;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// One call the mock received, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCall {
    List { path: String, query: String },
    Export { path: String, query: String },
    Mutate {
        method: MutationMethod,
        path: String,
        body: Option<Value>,
    },
}

struct ScriptedReply<T> {
    delay: Duration,
    result: Result<T>,
}

#[derive(Default)]
struct MockState {
    lists: VecDeque<ScriptedReply<String>>,
    default_list: Option<String>,
    mutations: VecDeque<Result<MutationResponse>>,
    export: Vec<u8>,
    calls: Vec<RecordedCall>,
    invalidated: Vec<String>,
}

/// Scripted in-memory `ListApi`. Clones share the same script and call log.
///
/// Like the real API it refuses to do anything without a session token.
#[derive(Clone, Default)]
pub struct MockApi {
    state: Arc<Mutex<MockState>>,
}

impl MockApi {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn push_list(&self, body: impl Into<String>) {
        self.push_list_delayed(body, Duration::ZERO);
    }

    pub fn push_list_delayed(&self, body: impl Into<String>, delay: Duration) {
        self.lock().lists.push_back(ScriptedReply {
            delay,
            result: Ok(body.into()),
        });
    }

    pub fn push_list_error(&self, error: ClientError) {
        self.lock().lists.push_back(ScriptedReply {
            delay: Duration::ZERO,
            result: Err(error),
        });
    }

    /// Body returned once the scripted list replies run out.
    pub fn set_default_list(&self, body: impl Into<String>) {
        self.lock().default_list = Some(body.into());
    }

    pub fn push_mutation(&self, result: Result<MutationResponse>) {
        self.lock().mutations.push_back(result);
    }

    pub fn set_export(&self, bytes: impl Into<Vec<u8>>) {
        self.lock().export = bytes.into();
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.lock().calls.clone()
    }

    pub fn list_calls(&self) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|call| matches!(call, RecordedCall::List { .. }))
            .count()
    }

    pub fn mutation_calls(&self) -> Vec<RecordedCall> {
        self.lock()
            .calls
            .iter()
            .filter(|call| matches!(call, RecordedCall::Mutate { .. }))
            .cloned()
            .collect()
    }

    pub fn last_list_query(&self) -> Option<String> {
        self.lock().calls.iter().rev().find_map(|call| match call {
            RecordedCall::List { query, .. } => Some(query.clone()),
            _ => None,
        })
    }

    pub fn invalidated(&self) -> Vec<String> {
        self.lock().invalidated.clone()
    }

    fn require_token(session: &Session) -> Result<()> {
        session
            .token()
            .map(|_| ())
            .ok_or_else(|| ClientError::Auth("no session token".to_string()))
    }
}

#[async_trait]
impl ListApi for MockApi {
    async fn get_list(&self, session: &Session, path: &str, query: &ListQuery) -> Result<String> {
        Self::require_token(session)?;
        let reply = {
            let mut state = self.lock();
            state.calls.push(RecordedCall::List {
                path: path.to_string(),
                query: query.to_query_string(),
            });
            match state.lists.pop_front() {
                Some(reply) => reply,
                None => ScriptedReply {
                    delay: Duration::ZERO,
                    result: state
                        .default_list
                        .clone()
                        .ok_or_else(|| ClientError::Network("no scripted list response".to_string())),
                },
            }
        };
        if !reply.delay.is_zero() {
            tokio::time::sleep(reply.delay).await;
        }
        reply.result
    }

    async fn export(&self, session: &Session, path: &str, query: &ListQuery) -> Result<Vec<u8>> {
        Self::require_token(session)?;
        let mut state = self.lock();
        state.calls.push(RecordedCall::Export {
            path: path.to_string(),
            query: query.to_query_string(),
        });
        Ok(state.export.clone())
    }

    async fn mutate(
        &self,
        session: &Session,
        method: MutationMethod,
        path: &str,
        body: Option<Value>,
    ) -> Result<MutationResponse> {
        Self::require_token(session)?;
        let mut state = self.lock();
        state.calls.push(RecordedCall::Mutate {
            method,
            path: path.to_string(),
            body,
        });
        state
            .mutations
            .pop_front()
            .unwrap_or_else(|| Ok(MutationResponse::ok()))
    }

    fn invalidate(&self, path: &str) {
        self.lock().invalidated.push(path.to_string());
    }
}
