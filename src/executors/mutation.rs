//! Resource mutation engine
//!
//! Every executor runs the same non-atomic two-step transaction: fetch the
//! resource, change its metadata maps in memory, write it back. A resource that
//! has disappeared is a soft success. A conflicting concurrent write surfaces as
//! the store's conflict error and is never retried.

use crate::error::{PluginError, StoreError};
use crate::executors::{ActionRequest, ExecuteFailure, ExecuteResponse, ExecuteResult};
use crate::resource::{Resource, ResourceStore};
use log::{debug, error, info, warn};
use serde::Deserialize;
use std::collections::BTreeMap;

/// Label set carried in action data, shaped like object metadata
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct LabelSet {
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

impl LabelSet {
    /// Decode a label set from raw action data
    pub fn decode(action_data: &[u8]) -> Result<Self, PluginError> {
        serde_json::from_slice(action_data).map_err(|e| {
            error!(
                "Failed to unmarshal action data {} with error {}",
                String::from_utf8_lossy(action_data),
                e
            );
            PluginError::Decode(e.to_string())
        })
    }
}

/// Merge (`apply == true`) or remove (`apply == false`) a label set
///
/// Removal ignores absent keys and leaves a missing label map untouched, so a
/// repeated revert is a no-op.
pub fn apply_labels(resource: &mut Resource, set: &BTreeMap<String, String>, apply: bool) {
    if apply {
        let labels = resource.labels_mut();
        for (key, value) in set {
            labels.insert(key.clone(), value.clone());
        }
    } else if let Some(labels) = resource.labels.as_mut() {
        for key in set.keys() {
            labels.remove(key);
        }
    }
}

/// Mirror one key/value pair into both labels and annotations, or remove it from both
pub fn apply_tag(resource: &mut Resource, key: &str, value: &str, apply: bool) {
    let annotations = resource.annotations_mut();
    if apply {
        annotations.insert(key.to_string(), value.to_string());
    } else {
        annotations.remove(key);
    }

    let labels = resource.labels_mut();
    if apply {
        labels.insert(key.to_string(), value.to_string());
    } else {
        labels.remove(key);
    }
}

/// Run one fetch-mutate-update cycle for the request's resource
///
/// `mutate` changes the in-memory copy and returns the description reported on
/// success. On any failure after the fetch the modified copy is dropped.
pub async fn mutate_resource<F>(
    store: &dyn ResourceStore,
    request: &ActionRequest,
    mutate: F,
) -> ExecuteResult
where
    F: FnOnce(&mut Resource) -> Result<String, PluginError> + Send,
{
    let key = &request.key;

    let mut resource = match store.get(key).await {
        Ok(resource) => resource,
        Err(StoreError::NotFound(_)) => {
            warn!(
                "get resource {} (in namespace {}) returned not found",
                key,
                key.namespace_str()
            );
            return Ok(ExecuteResponse::new(format!(
                "Resource {} not found in namespace {}",
                key,
                key.namespace_str()
            )));
        }
        Err(e) => {
            error!(
                "get resource {} (in namespace {}) error: {}",
                key,
                key.namespace_str(),
                e
            );
            return Err(ExecuteFailure::new(
                format!("get resource {} error: {}", key, e),
                e.into(),
            ));
        }
    };

    debug!("start processing resource {}", resource.display_name());
    let data = mutate(&mut resource).map_err(|e| ExecuteFailure::new(e.to_string(), e))?;

    if let Err(e) = store.update(key, resource).await {
        error!("update resource {} error: {}", key, e);
        return Err(ExecuteFailure::new(
            format!("update resource {} error: {}", key, e),
            e.into(),
        ));
    }

    info!("{} processing completed", key);
    Ok(ExecuteResponse::new(data))
}
