//! Worker-side half of the transport: reads line-framed JSON-RPC requests
//! from stdin, dispatches them to registered method handlers, and writes
//! line-framed responses to stdout.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use notary402_types::rpc::{ListToolsResult, RpcOutcome, RpcRequest, RpcResponse, ToolDescriptor};
use notary402_types::ErrorKind;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Stdin, Stdout};
use tracing::{error, instrument, warn};

pub type HandlerResult = Result<Value, (ErrorKind, String)>;
pub type Handler =
    Arc<dyn Fn(Value) -> Pin<Box<dyn Future<Output = HandlerResult> + Send>> + Send + Sync>;

/// A named operation this worker exposes, together with the JSON schemas a
/// caller should validate `params`/`result` against.
pub struct Method {
    pub descriptor: ToolDescriptor,
    pub handler: Handler,
}

/// Registers methods and serves them over the process's own stdio.
pub struct WorkerServer {
    methods: HashMap<String, Method>,
}

impl Default for WorkerServer {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkerServer {
    pub fn new() -> Self {
        WorkerServer {
            methods: HashMap::new(),
        }
    }

    pub fn register(&mut self, name: &str, method: Method) {
        self.methods.insert(name.to_string(), method);
    }

    #[instrument(skip_all)]
    pub async fn serve(self, stdin: Stdin, mut stdout: Stdout) -> std::io::Result<()> {
        let methods = Arc::new(self.methods);
        let mut lines = BufReader::new(stdin).lines();
        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            let methods = methods.clone();
            let response = Self::handle_line(&methods, &line).await;
            let encoded = serde_json::to_string(&response).expect("RpcResponse always serializes");
            stdout.write_all(encoded.as_bytes()).await?;
            stdout.write_all(b"\n").await?;
            stdout.flush().await?;
        }
        Ok(())
    }

    async fn handle_line(methods: &HashMap<String, Method>, line: &str) -> RpcResponse {
        let request: RpcRequest = match serde_json::from_str(line) {
            Ok(request) => request,
            Err(err) => {
                warn!(error = %err, "unparseable request line");
                return RpcResponse {
                    id: 0,
                    outcome: RpcOutcome::Err {
                        error: notary402_types::rpc::RpcError {
                            kind: ErrorKind::ErrValidation,
                            message: format!("malformed request: {err}"),
                        },
                    },
                };
            }
        };

        if request.method == "list_tools" {
            let tools = methods.values().map(|m| m.descriptor.clone()).collect();
            let result = ListToolsResult { tools };
            return RpcResponse {
                id: request.id,
                outcome: RpcOutcome::Ok {
                    result: serde_json::to_value(result).expect("serializable"),
                },
            };
        }

        let outcome = match methods.get(&request.method) {
            Some(method) => match (method.handler)(request.params).await {
                Ok(result) => RpcOutcome::Ok { result },
                Err((kind, message)) => RpcOutcome::Err {
                    error: notary402_types::rpc::RpcError { kind, message },
                },
            },
            None => {
                error!(method = %request.method, "no such method");
                RpcOutcome::Err {
                    error: notary402_types::rpc::RpcError {
                        kind: ErrorKind::ErrValidation,
                        message: format!("unknown method: {}", request.method),
                    },
                }
            }
        };

        RpcResponse {
            id: request.id,
            outcome,
        }
    }
}
