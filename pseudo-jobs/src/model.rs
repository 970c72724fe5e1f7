//! The external model capability: send ordered messages, get text back.

use std::collections::{BTreeMap, VecDeque};
use std::io;
use std::process::Stdio;
use std::sync::Mutex;

use async_trait::async_trait;
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

use pseudo_core::{ChatMessage, Config, ModelCommand};

use crate::error::ModelError;

#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Send `messages` to the model named `model_ref` and return its reply.
    async fn send(&self, model_ref: &str, messages: &[ChatMessage]) -> Result<String, ModelError>;
}

// ---------------------------------------------------------------------------
// CommandModel
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct CommandRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
}

/// Runs one configured argv per request. The request is written to the
/// child's stdin as JSON (`{"model": .., "messages": [{"role", "text"}]}`);
/// its stdout is the reply.
#[derive(Debug, Clone, Default)]
pub struct CommandModel {
    models: BTreeMap<String, ModelCommand>,
}

impl CommandModel {
    pub fn new(models: BTreeMap<String, ModelCommand>) -> Self {
        Self { models }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.models.clone())
    }
}

#[async_trait]
impl ModelClient for CommandModel {
    async fn send(&self, model_ref: &str, messages: &[ChatMessage]) -> Result<String, ModelError> {
        let command = self
            .models
            .get(model_ref)
            .ok_or_else(|| ModelError::UnknownModel(model_ref.to_string()))?;
        let (program, args) = command
            .command
            .split_first()
            .ok_or_else(|| ModelError::Provider(format!("model '{model_ref}' has an empty command")))?;

        let payload = serde_json::to_vec(&CommandRequest {
            model: model_ref,
            messages,
        })
        .map_err(|e| ModelError::Provider(format!("cannot encode request: {e}")))?;

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ModelError::Network(format!("cannot start {program}: {e}")))?;
        debug!(model = model_ref, program = %program, bytes = payload.len(), "model request");

        // Feed stdin while stdout and stderr are drained; a child that echoes
        // a large request would otherwise block on a full pipe.
        let stdin = child.stdin.take();
        let write = async move {
            match stdin {
                Some(mut stdin) => {
                    let written = stdin.write_all(&payload).await;
                    drop(stdin);
                    written
                }
                None => Ok(()),
            }
        };
        let (written, output) = tokio::join!(write, child.wait_with_output());
        let output = output.map_err(|e| ModelError::Network(format!("wait for {program}: {e}")))?;
        match written {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
                debug!(model = model_ref, program = %program, "model command closed stdin early");
            }
            Err(e) if output.status.success() => {
                return Err(ModelError::Network(format!("write to {program}: {e}")));
            }
            Err(e) => warn!(model = model_ref, program = %program, error = %e, "request not fully written"),
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ModelError::Provider(format!(
                "{program} exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }
        let reply = String::from_utf8_lossy(&output.stdout).into_owned();
        if reply.trim().is_empty() {
            return Err(ModelError::EmptyResponse);
        }
        Ok(reply)
    }
}

// ---------------------------------------------------------------------------
// ScriptedModel
// ---------------------------------------------------------------------------

type Responder = Box<dyn Fn(&[ChatMessage]) -> Result<String, ModelError> + Send + Sync>;

/// Deterministic stand-in for a real model. Records every request.
pub struct ScriptedModel {
    respond: Responder,
    calls: Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedModel {
    /// Answer each request by calling `respond` with its messages.
    pub fn from_fn<F>(respond: F) -> Self
    where
        F: Fn(&[ChatMessage]) -> Result<String, ModelError> + Send + Sync + 'static,
    {
        Self {
            respond: Box::new(respond),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Answer requests with `replies` in order; then report an empty response.
    pub fn replying<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let queue: Mutex<VecDeque<String>> =
            Mutex::new(replies.into_iter().map(Into::into).collect());
        Self::from_fn(move |_| {
            queue
                .lock()
                .ok()
                .and_then(|mut q| q.pop_front())
                .ok_or(ModelError::EmptyResponse)
        })
    }

    /// Every request received so far, in arrival order.
    pub fn calls(&self) -> Vec<Vec<ChatMessage>> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ModelClient for ScriptedModel {
    async fn send(&self, _model_ref: &str, messages: &[ChatMessage]) -> Result<String, ModelError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(messages.to_vec());
        }
        (self.respond)(messages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model(argv: &[&str]) -> CommandModel {
        let mut models = BTreeMap::new();
        models.insert(
            "local".to_string(),
            ModelCommand {
                command: argv.iter().map(|s| s.to_string()).collect(),
            },
        );
        CommandModel::new(models)
    }

    #[tokio::test]
    async fn unknown_model_ref_is_rejected() {
        let err = model(&["cat"])
            .send("remote", &[ChatMessage::user("hi")])
            .await
            .unwrap_err();
        assert!(matches!(err, ModelError::UnknownModel(name) if name == "remote"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn command_reads_request_from_stdin() {
        let reply = model(&["cat"])
            .send("local", &[ChatMessage::system("be brief"), ChatMessage::user("hi")])
            .await
            .unwrap();
        let request: serde_json::Value = serde_json::from_str(&reply).unwrap();
        assert_eq!(request["model"], "local");
        assert_eq!(request["messages"][0]["role"], "system");
        assert_eq!(request["messages"][1]["text"], "hi");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failing_command_is_provider_error() {
        let err = model(&["sh", "-c", "echo quota >&2; exit 3"])
            .send("local", &[ChatMessage::user("hi")])
            .await
            .unwrap_err();
        match err {
            ModelError::Provider(msg) => assert!(msg.contains("quota"), "got: {msg}"),
            other => panic!("expected provider error, got {other:?}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn silent_command_is_empty_response() {
        let err = model(&["true"])
            .send("local", &[ChatMessage::user("hi")])
            .await
            .unwrap_err();
        assert!(matches!(err, ModelError::EmptyResponse));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn large_request_is_echoed_without_blocking() {
        let text = "x".repeat(1_000_000);
        let reply = tokio::time::timeout(
            std::time::Duration::from_secs(30),
            model(&["cat"]).send("local", &[ChatMessage::user(text.clone())]),
        )
        .await
        .expect("model command finished")
        .unwrap();
        let request: serde_json::Value = serde_json::from_str(&reply).unwrap();
        assert_eq!(request["messages"][0]["text"].as_str().map(str::len), Some(text.len()));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn command_ignoring_stdin_keeps_its_exit_status() {
        let text = "x".repeat(1_000_000);
        let err = model(&["sh", "-c", "echo quota >&2; exit 3"])
            .send("local", &[ChatMessage::user(text.clone())])
            .await
            .unwrap_err();
        assert!(matches!(err, ModelError::Provider(ref msg) if msg.contains("quota")), "got: {err:?}");

        let err = model(&["true"])
            .send("local", &[ChatMessage::user(text)])
            .await
            .unwrap_err();
        assert!(matches!(err, ModelError::EmptyResponse), "got: {err:?}");
    }

    #[tokio::test]
    async fn scripted_model_replays_in_order() {
        let model = ScriptedModel::replying(["one", "two"]);
        let msgs = [ChatMessage::user("x")];
        assert_eq!(model.send("m", &msgs).await.unwrap(), "one");
        assert_eq!(model.send("m", &msgs).await.unwrap(), "two");
        assert!(model.send("m", &msgs).await.is_err());
        assert_eq!(model.calls().len(), 3);
    }
}
