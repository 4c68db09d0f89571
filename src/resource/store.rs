use crate::error::StoreError;
use crate::resource::{Resource, ResourceKey};
use crate::BoxFuture;
use log::debug;
use std::collections::HashMap;
use std::sync::Mutex;

/// Key/value object store holding cluster resources
///
/// `get` must report a missing object as `StoreError::NotFound` so callers can
/// tell it apart from transport or server failures.
pub trait ResourceStore: Send + Sync {
    fn get<'a>(&'a self, key: &'a ResourceKey) -> BoxFuture<'a, Result<Resource, StoreError>>;

    fn update<'a>(
        &'a self,
        key: &'a ResourceKey,
        resource: Resource,
    ) -> BoxFuture<'a, Result<(), StoreError>>;
}

/// In-memory resource store
///
/// Holds objects in a mutex-guarded map. Get and update failures can be injected
/// to exercise error paths.
#[derive(Default)]
pub struct MemoryStore {
    objects: Mutex<HashMap<ResourceKey, Resource>>,
    get_error: Mutex<Option<StoreError>>,
    update_error: Mutex<Option<StoreError>>,
    update_count: Mutex<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an object
    pub fn insert(&self, key: ResourceKey, resource: Resource) {
        self.objects
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key, resource);
    }

    /// Current copy of an object, if present
    pub fn snapshot(&self, key: &ResourceKey) -> Option<Resource> {
        self.objects
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()
    }

    /// Make every subsequent `get` fail with `error`
    pub fn fail_gets_with(&self, error: StoreError) {
        *self.get_error.lock().unwrap_or_else(|e| e.into_inner()) = Some(error);
    }

    /// Make every subsequent `update` fail with `error`
    pub fn fail_updates_with(&self, error: StoreError) {
        *self.update_error.lock().unwrap_or_else(|e| e.into_inner()) = Some(error);
    }

    /// Number of updates that reached the store, failed ones included
    pub fn update_count(&self) -> usize {
        *self.update_count.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl ResourceStore for MemoryStore {
    fn get<'a>(&'a self, key: &'a ResourceKey) -> BoxFuture<'a, Result<Resource, StoreError>> {
        Box::pin(async move {
            if let Some(error) = self
                .get_error
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .clone()
            {
                return Err(error);
            }

            self.snapshot(key)
                .ok_or_else(|| StoreError::NotFound(key.to_string()))
        })
    }

    fn update<'a>(
        &'a self,
        key: &'a ResourceKey,
        resource: Resource,
    ) -> BoxFuture<'a, Result<(), StoreError>> {
        Box::pin(async move {
            *self.update_count.lock().unwrap_or_else(|e| e.into_inner()) += 1;

            if let Some(error) = self
                .update_error
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .clone()
            {
                return Err(error);
            }

            let mut objects = self.objects.lock().unwrap_or_else(|e| e.into_inner());
            if !objects.contains_key(key) {
                return Err(StoreError::NotFound(key.to_string()));
            }
            debug!("memory store updated {}", key);
            objects.insert(key.clone(), resource);
            Ok(())
        })
    }
}
