use crate::executors::ExecutionDispatcher;
use crate::observers::ObserverDispatcher;
use crate::transport::protocol::{ExecutorReply, ExecutorRequest, ObserverReply, ObserverRequest};
use crate::transport::Handler;
use crate::BoxFuture;
use log::warn;
use serde::Serialize;

/// Serves `execute` requests through an execution dispatcher
pub struct ExecutorHandler {
    dispatcher: ExecutionDispatcher,
}

impl ExecutorHandler {
    pub fn new(dispatcher: ExecutionDispatcher) -> Self {
        Self { dispatcher }
    }

    pub async fn execute(&self, request: ExecutorRequest) -> ExecutorReply {
        let ExecutorRequest::Execute(params) = request;
        match self.dispatcher.dispatch(&params.into_action_request()).await {
            Ok(response) => ExecutorReply {
                data: response.data,
                error: None,
            },
            Err(failure) => ExecutorReply {
                error: Some(failure.source.to_string()),
                data: failure.data,
            },
        }
    }
}

impl Handler for ExecutorHandler {
    fn handle<'a>(&'a self, line: &'a str) -> BoxFuture<'a, String> {
        Box::pin(async move {
            let reply = match serde_json::from_str::<ExecutorRequest>(line) {
                Ok(request) => self.execute(request).await,
                Err(e) => {
                    warn!("Malformed executor request: {}", e);
                    ExecutorReply {
                        data: String::new(),
                        error: Some(format!("malformed request: {}", e)),
                    }
                }
            };
            encode(&reply)
        })
    }

    fn error_reply(&self, message: &str) -> String {
        encode(&ExecutorReply {
            data: String::new(),
            error: Some(message.to_string()),
        })
    }
}

/// Serves plugin discovery and metric requests through an observer dispatcher
pub struct ObserverHandler {
    dispatcher: ObserverDispatcher,
}

impl ObserverHandler {
    pub fn new(dispatcher: ObserverDispatcher) -> Self {
        Self { dispatcher }
    }

    pub async fn respond(&self, request: ObserverRequest) -> ObserverReply {
        let result = match request {
            ObserverRequest::GetPluginNames => {
                serde_json::to_value(self.dispatcher.get_plugin_names())
            }
            ObserverRequest::PluginCapabilities => {
                serde_json::to_value(self.dispatcher.get_capabilities())
            }
            ObserverRequest::GetMetrics(request) => {
                match self.dispatcher.get_metrics(&request).await {
                    Ok(result) => serde_json::to_value(result),
                    Err(e) => return ObserverReply::err(e.to_string()),
                }
            }
        };

        match result {
            Ok(value) => ObserverReply::ok(value),
            Err(e) => ObserverReply::err(format!("failed to encode result: {}", e)),
        }
    }
}

impl Handler for ObserverHandler {
    fn handle<'a>(&'a self, line: &'a str) -> BoxFuture<'a, String> {
        Box::pin(async move {
            let reply = match serde_json::from_str::<ObserverRequest>(line) {
                Ok(request) => self.respond(request).await,
                Err(e) => {
                    warn!("Malformed observer request: {}", e);
                    ObserverReply::err(format!("malformed request: {}", e))
                }
            };
            encode(&reply)
        })
    }

    fn error_reply(&self, message: &str) -> String {
        encode(&ObserverReply::err(message))
    }
}

fn encode<T: Serialize>(reply: &T) -> String {
    serde_json::to_string(reply).unwrap_or_else(|e| {
        format!(
            r#"{{"error":"failed to encode reply: {}"}}"#,
            e.to_string().replace('"', "'")
        )
    })
}
