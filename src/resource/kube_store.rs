//! Kubernetes-backed resource store
//!
//! Uses the dynamic (untyped) API so any group/version/resource triple can be
//! addressed without generated types. Objects are fetched and written back whole;
//! there is no patching and no optimistic-concurrency retry.

use crate::error::StoreError;
use crate::resource::{Resource, ResourceKey, ResourceStore};
use crate::BoxFuture;
use anyhow::Context;
use kube::api::{Api, ApiResource, DynamicObject, PostParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::Client;
use log::{debug, info};
use std::path::Path;

/// Resource store talking to a Kubernetes API server
#[derive(Clone)]
pub struct KubeResourceStore {
    client: Client,
}

impl KubeResourceStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Connect using an explicit kubeconfig or, when none is given, the inferred
    /// in-cluster / default configuration
    pub async fn connect(kubeconfig: Option<&Path>) -> anyhow::Result<Self> {
        let config = match kubeconfig {
            Some(path) => {
                info!("Loading kubeconfig from {}", path.display());
                let kubeconfig = Kubeconfig::read_from(path)
                    .with_context(|| format!("failed to read kubeconfig {}", path.display()))?;
                kube::Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
                    .await
                    .context("failed to build client configuration from kubeconfig")?
            }
            None => kube::Config::infer()
                .await
                .context("failed to infer Kubernetes client configuration")?,
        };

        let client = Client::try_from(config).context("failed to create Kubernetes client")?;
        Ok(Self::new(client))
    }

    fn api(&self, key: &ResourceKey) -> Api<DynamicObject> {
        let resource = ApiResource {
            group: key.group.clone(),
            version: key.version.clone(),
            api_version: key.api_version(),
            kind: key.resource.clone(),
            plural: key.resource.clone(),
        };

        match key.namespace.as_deref() {
            Some(namespace) => {
                Api::namespaced_with(self.client.clone(), namespace, &resource)
            }
            None => Api::all_with(self.client.clone(), &resource),
        }
    }

    fn to_resource(object: &DynamicObject) -> Result<Resource, StoreError> {
        let body = serde_json::to_value(object)
            .map_err(|e| StoreError::Backend(format!("failed to encode object: {}", e)))?;

        Ok(Resource {
            kind: object
                .types
                .as_ref()
                .map(|types| types.kind.clone())
                .unwrap_or_default(),
            name: object.metadata.name.clone().unwrap_or_default(),
            labels: object.metadata.labels.clone(),
            annotations: object.metadata.annotations.clone(),
            body,
        })
    }

    fn to_object(resource: Resource) -> Result<DynamicObject, StoreError> {
        let mut object: DynamicObject = serde_json::from_value(resource.body)
            .map_err(|e| StoreError::Backend(format!("failed to decode object: {}", e)))?;
        object.metadata.labels = resource.labels;
        object.metadata.annotations = resource.annotations;
        Ok(object)
    }
}

/// Map API errors onto store error kinds
fn classify(key: &ResourceKey, err: kube::Error) -> StoreError {
    match err {
        kube::Error::Api(response) if response.code == 404 => StoreError::NotFound(format!(
            "{} in namespace {}",
            key,
            key.namespace_str()
        )),
        kube::Error::Api(response) if response.code == 409 => {
            StoreError::Conflict(response.message)
        }
        other => StoreError::Backend(other.to_string()),
    }
}

impl ResourceStore for KubeResourceStore {
    fn get<'a>(&'a self, key: &'a ResourceKey) -> BoxFuture<'a, Result<Resource, StoreError>> {
        Box::pin(async move {
            debug!("get {} (namespace '{}')", key, key.namespace_str());
            let object = self
                .api(key)
                .get(&key.name)
                .await
                .map_err(|e| classify(key, e))?;
            Self::to_resource(&object)
        })
    }

    fn update<'a>(
        &'a self,
        key: &'a ResourceKey,
        resource: Resource,
    ) -> BoxFuture<'a, Result<(), StoreError>> {
        Box::pin(async move {
            debug!("replace {} (namespace '{}')", key, key.namespace_str());
            let object = Self::to_object(resource)?;
            self.api(key)
                .replace(&key.name, &PostParams::default(), &object)
                .await
                .map_err(|e| classify(key, e))?;
            Ok(())
        })
    }
}
