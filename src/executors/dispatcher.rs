use crate::executors::label::LABEL_EXECUTOR;
use crate::executors::tagger::TAG_EXECUTOR;
use crate::executors::{
    ActionRequest, ExecuteResponse, ExecuteResult, Executor, LabelExecutor, TagExecutor,
};
use crate::registry::Registry;
use crate::resource::ResourceStore;
use log::{debug, error, info, warn};
use std::sync::Arc;

/// Registry holding the built-in label and tag executors
pub fn builtin_executors() -> Registry<dyn Executor> {
    let mut registry: Registry<dyn Executor> = Registry::new("executor");
    registry.register(LABEL_EXECUTOR, Arc::new(LabelExecutor::default()));
    registry.register(TAG_EXECUTOR, Arc::new(TagExecutor::default()));
    for name in registry.names() {
        info!("Executor [{}] registration is successful", name);
    }
    registry
}

/// Runs the executors named in a request, in order, against one resource store
///
/// The policy is sequential and fail-fast:
/// - an empty executor list is an immediate empty success
/// - unknown executor names are logged and skipped
/// - the first failing executor stops the chain and its failure is returned
/// - otherwise the result of the last executor that ran is returned
pub struct ExecutionDispatcher {
    registry: Arc<Registry<dyn Executor>>,
    store: Arc<dyn ResourceStore>,
}

impl ExecutionDispatcher {
    pub fn new(registry: Arc<Registry<dyn Executor>>, store: Arc<dyn ResourceStore>) -> Self {
        Self { registry, store }
    }

    pub fn registry(&self) -> &Registry<dyn Executor> {
        &self.registry
    }

    /// Dispatch one action request
    pub async fn dispatch(&self, request: &ActionRequest) -> ExecuteResult {
        debug!(
            "ResourceName: {}, namespace: {}, exprval: {}, condval: {}, executors: {:?}",
            request.key.name,
            request.key.namespace_str(),
            request.expr_val,
            request.cond_val,
            request.executors
        );

        if request.executors.is_empty() {
            warn!("{} executor is empty, return..", request.key);
            return Ok(ExecuteResponse::default());
        }

        let mut response = ExecuteResponse::default();
        for name in &request.executors {
            let Some(executor) = self.registry.lookup(name) else {
                warn!(
                    "{} executor {} is not registered, skipping",
                    request.key, name
                );
                continue;
            };

            match executor.execute(self.store.as_ref(), request).await {
                Ok(result) => response = result,
                Err(failure) => {
                    error!("{} run {} error: {}", request.key, name, failure);
                    return Err(failure);
                }
            }
        }

        Ok(response)
    }
}
