use crate::error::PluginError;
use crate::executors::mutation::{apply_tag, mutate_resource};
use crate::executors::{ActionRequest, ExecuteFailure, ExecuteResult, Executor};
use crate::resource::ResourceStore;
use crate::BoxFuture;
use log::debug;

/// Default registration name of the tag executor
pub const TAG_EXECUTOR: &str = "resourceTagger";

/// Request parameter naming the tag key
pub const TAGGING_KEY: &str = "tagging-key";

/// Request parameter naming the tag value
pub const TAGGING_VALUE: &str = "tagging-value";

/// Tags a resource by writing one key/value pair into both its labels and its
/// annotations, or removes the key from both on revert
pub struct TagExecutor {
    name: String,
}

impl TagExecutor {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Default for TagExecutor {
    fn default() -> Self {
        Self::new(TAG_EXECUTOR)
    }
}

impl Executor for TagExecutor {
    fn name(&self) -> &str {
        &self.name
    }

    fn execute<'a>(
        &'a self,
        store: &'a dyn ResourceStore,
        request: &'a ActionRequest,
    ) -> BoxFuture<'a, ExecuteResult> {
        Box::pin(async move {
            let Some(tag_key) = request.parameter(TAGGING_KEY) else {
                let err = PluginError::Decode(format!("missing '{}' parameter", TAGGING_KEY));
                return Err(ExecuteFailure::new(err.to_string(), err));
            };
            let tag_value = request.parameter(TAGGING_VALUE).unwrap_or_default();

            mutate_resource(store, request, |resource| {
                apply_tag(resource, tag_key, tag_value, request.cond_val);
                debug!(
                    "after {}, the annotations {:?}, the labels {:?}",
                    if request.cond_val { "adding" } else { "deleting" },
                    resource.annotations,
                    resource.labels
                );

                let outcome = if request.cond_val { "tagged" } else { "untagged" };
                Ok(format!(
                    "Resource {} in namespace '{}' is {}",
                    request.key,
                    request.key.namespace_str(),
                    outcome
                ))
            })
            .await
        })
    }
}
