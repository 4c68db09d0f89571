/// Request and response messages for both servers
pub mod protocol;

/// Unix socket listener and connection loop
pub mod server;

/// Request handlers binding the protocol to the dispatchers
pub mod handlers;

pub use handlers::{ExecutorHandler, ObserverHandler};
pub use protocol::{ExecuteParams, ExecutorReply, ExecutorRequest, ObserverReply, ObserverRequest};
pub use server::{shutdown_signal, Handler, SocketServer};
