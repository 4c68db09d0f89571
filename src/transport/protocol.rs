//! Wire messages
//!
//! Every message is one JSON object on its own line. Requests are tagged by
//! `method` with their arguments under `params`.

use crate::executors::ActionRequest;
use crate::observers::MetricRequest;
use crate::resource::ResourceKey;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Arguments of an `execute` call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecuteParams {
    pub group: String,
    pub version: String,
    /// Plural resource name
    pub resources: String,
    pub resource_name: String,
    /// Empty for cluster-scoped resources
    pub namespace: String,
    pub cond_val: bool,
    pub expr_val: f64,
    /// Executor payload; a JSON string is passed through as raw text, any other
    /// value is re-encoded as JSON
    pub action_data: Value,
    pub parameters: BTreeMap<String, String>,
    pub executors: Vec<String>,
}

impl ExecuteParams {
    fn action_bytes(&self) -> Vec<u8> {
        match &self.action_data {
            Value::Null => Vec::new(),
            Value::String(raw) => raw.as_bytes().to_vec(),
            other => other.to_string().into_bytes(),
        }
    }

    pub fn into_action_request(self) -> ActionRequest {
        let action_data = self.action_bytes();
        let key = ResourceKey::new(
            self.group,
            self.version,
            self.resources,
            self.namespace,
            self.resource_name,
        );

        let mut request = ActionRequest::new(key, self.cond_val)
            .with_action_data(action_data)
            .with_executors(self.executors);
        request.expr_val = self.expr_val;
        request.parameters = self.parameters;
        request
    }
}

/// Requests accepted by the executor server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", content = "params", rename_all = "snake_case")]
pub enum ExecutorRequest {
    Execute(ExecuteParams),
}

/// Executor server response
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutorReply {
    pub data: String,
    pub error: Option<String>,
}

/// Requests accepted by the observer server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", content = "params", rename_all = "snake_case")]
pub enum ObserverRequest {
    GetPluginNames,
    PluginCapabilities,
    GetMetrics(MetricRequest),
}

/// Observer server response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObserverReply {
    pub result: Option<Value>,
    pub error: Option<String>,
}

impl ObserverReply {
    pub fn ok(result: Value) -> Self {
        Self {
            result: Some(result),
            error: None,
        }
    }

    pub fn err(error: impl Into<String>) -> Self {
        Self {
            result: None,
            error: Some(error.into()),
        }
    }
}
