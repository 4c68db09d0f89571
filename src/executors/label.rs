use crate::executors::mutation::{apply_labels, mutate_resource, LabelSet};
use crate::executors::{ActionRequest, ExecuteResult, Executor};
use crate::resource::ResourceStore;
use crate::BoxFuture;
use log::info;

/// Default registration name of the label executor
pub const LABEL_EXECUTOR: &str = "resourceUpdater";

/// Adds or removes the labels carried in the request's action data
///
/// The action data is object metadata JSON (`{"labels": {...}}`). When the
/// condition holds the labels are merged into the resource, otherwise every
/// listed key is removed.
pub struct LabelExecutor {
    name: String,
}

impl LabelExecutor {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Default for LabelExecutor {
    fn default() -> Self {
        Self::new(LABEL_EXECUTOR)
    }
}

impl Executor for LabelExecutor {
    fn name(&self) -> &str {
        &self.name
    }

    fn execute<'a>(
        &'a self,
        store: &'a dyn ResourceStore,
        request: &'a ActionRequest,
    ) -> BoxFuture<'a, ExecuteResult> {
        Box::pin(async move {
            mutate_resource(store, request, |resource| {
                let set = LabelSet::decode(&request.action_data)?;
                apply_labels(resource, &set.labels, request.cond_val);

                let namespace = request.key.namespace_str();
                let outcome = if request.cond_val {
                    "labeled"
                } else {
                    "un-labeled"
                };
                info!(
                    "Resource {} in namespace '{}' is {}",
                    resource.display_name(),
                    namespace,
                    outcome
                );
                Ok(format!(
                    "Resource {} in namespace '{}' is {}",
                    request.key, namespace, outcome
                ))
            })
            .await
        })
    }
}
