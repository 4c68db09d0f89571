use crate::error::PluginError;
use crate::resource::{ResourceKey, ResourceStore};
use crate::BoxFuture;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Trait implemented by every executor plugin
///
/// An executor applies one idempotent mutation to the resource named by the
/// request. It receives the shared resource store so that all executors in one
/// dispatch see the same backend.
pub trait Executor: Send + Sync {
    /// Name the executor is registered under
    fn name(&self) -> &str;

    fn execute<'a>(
        &'a self,
        store: &'a dyn ResourceStore,
        request: &'a ActionRequest,
    ) -> BoxFuture<'a, ExecuteResult>;
}

/// One incoming action request
#[derive(Debug, Clone, PartialEq)]
pub struct ActionRequest {
    /// The resource to act on
    pub key: ResourceKey,
    /// `true` applies the action, `false` reverts it
    pub cond_val: bool,
    /// Value of the evaluated expression, informational only
    pub expr_val: f64,
    /// Opaque payload decoded by the individual executor
    pub action_data: Vec<u8>,
    /// Named parameters carried alongside the payload
    pub parameters: BTreeMap<String, String>,
    /// Executors to run, in order
    pub executors: Vec<String>,
}

impl ActionRequest {
    pub fn new(key: ResourceKey, cond_val: bool) -> Self {
        Self {
            key,
            cond_val,
            expr_val: 0.0,
            action_data: Vec::new(),
            parameters: BTreeMap::new(),
            executors: Vec::new(),
        }
    }

    pub fn with_action_data(mut self, action_data: impl Into<Vec<u8>>) -> Self {
        self.action_data = action_data.into();
        self
    }

    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }

    pub fn with_executors<I, S>(mut self, executors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.executors = executors.into_iter().map(Into::into).collect();
        self
    }

    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters.get(name).map(String::as_str)
    }
}

/// Successful executor outcome
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecuteResponse {
    /// Human-readable description of what happened
    pub data: String,
}

impl ExecuteResponse {
    pub fn new(data: impl Into<String>) -> Self {
        Self { data: data.into() }
    }
}

/// Failed executor outcome, keeping the partial result description
#[derive(Debug, Clone, Error, PartialEq)]
#[error("{source}")]
pub struct ExecuteFailure {
    pub data: String,
    pub source: PluginError,
}

impl ExecuteFailure {
    pub fn new(data: impl Into<String>, source: PluginError) -> Self {
        Self {
            data: data.into(),
            source,
        }
    }
}

pub type ExecuteResult = Result<ExecuteResponse, ExecuteFailure>;
