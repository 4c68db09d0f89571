/// Resource identity and the mutable object model
pub mod model;

/// Resource store collaborator trait and in-memory implementation
pub mod store;

/// Kubernetes-backed resource store
pub mod kube_store;

pub use kube_store::KubeResourceStore;
pub use model::{Resource, ResourceKey};
pub use store::{MemoryStore, ResourceStore};
