/// Executor trait and request/response types
pub mod executor;

/// Fetch-mutate-update cycle and the label/tag mutations
pub mod mutation;

/// Label executor driven by decoded action data
pub mod label;

/// Tag executor driven by request parameters
pub mod tagger;

/// Sequential, fail-fast execution dispatcher
pub mod dispatcher;

pub use dispatcher::{builtin_executors, ExecutionDispatcher};
pub use executor::{ActionRequest, ExecuteFailure, ExecuteResponse, ExecuteResult, Executor};
pub use label::LabelExecutor;
pub use tagger::TagExecutor;
