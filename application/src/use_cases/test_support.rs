//! Scripted port implementations shared by the use case tests.

use crate::ports::llm_gateway::{GatewayError, LlmGateway, LlmSession};
use crate::ports::tool_gateway::{ToolGatewayError, ToolGatewayPort, ToolOutput};
use async_trait::async_trait;
use serde_json::Value;
use shardguard_domain::{CapabilityEntry, CapabilityRegistry, Model, Redactor, RuleSet, RuleSpec};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub type Script = Arc<Mutex<VecDeque<Result<String, GatewayError>>>>;

pub fn script(responses: Vec<Result<String, GatewayError>>) -> Script {
    Arc::new(Mutex::new(VecDeque::from(responses)))
}

pub fn email_redactor() -> Redactor {
    let rules = RuleSet::compile(&[RuleSpec::new(
        "email",
        r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}",
    )])
    .unwrap();
    Redactor::new(rules)
}

pub fn registry() -> CapabilityRegistry {
    let mut registry = CapabilityRegistry::new();
    registry.register_server("file-server", "File operations");
    registry.register(CapabilityEntry::new("file-server", "read_file", "Read a file"));
    registry.register(CapabilityEntry::new("file-server", "write_file", "Write a file"));
    registry
}

pub struct ScriptedSession {
    model: Model,
    script: Script,
    prompts: Arc<Mutex<Vec<String>>>,
    delay: Option<Duration>,
    closed: Arc<AtomicBool>,
}

impl ScriptedSession {
    pub fn new(responses: Vec<Result<String, GatewayError>>) -> Self {
        Self::from_script(script(responses), Arc::new(Mutex::new(Vec::new())))
    }

    fn from_script(script: Script, prompts: Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            model: Model::new("mock-model").unwrap(),
            script,
            prompts,
            delay: None,
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmSession for ScriptedSession {
    fn model(&self) -> &Model {
        &self.model
    }

    async fn send(&self, content: &str) -> Result<String, GatewayError> {
        self.prompts.lock().unwrap().push(content.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(GatewayError::RequestFailed("script exhausted".into())))
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// Hands out a fresh [`ScriptedSession`] per `create_session`, all reading
/// from one script.
pub struct ScriptedGateway {
    script: Script,
    prompts: Arc<Mutex<Vec<String>>>,
    sessions_created: AtomicUsize,
    sessions: Mutex<Vec<Arc<AtomicBool>>>,
    delay: Option<Duration>,
}

impl ScriptedGateway {
    pub fn new(responses: Vec<Result<String, GatewayError>>) -> Self {
        Self {
            script: script(responses),
            prompts: Arc::new(Mutex::new(Vec::new())),
            sessions_created: AtomicUsize::new(0),
            sessions: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn sessions_created(&self) -> usize {
        self.sessions_created.load(Ordering::SeqCst)
    }

    pub fn all_sessions_closed(&self) -> bool {
        self.sessions
            .lock()
            .unwrap()
            .iter()
            .all(|closed| closed.load(Ordering::SeqCst))
    }
}

#[async_trait]
impl LlmGateway for ScriptedGateway {
    fn provider_name(&self) -> &str {
        "scripted"
    }

    async fn create_session(&self, _model: &Model) -> Result<Box<dyn LlmSession>, GatewayError> {
        self.sessions_created.fetch_add(1, Ordering::SeqCst);
        let mut session = ScriptedSession::from_script(self.script.clone(), self.prompts.clone());
        session.delay = self.delay;
        self.sessions.lock().unwrap().push(session.closed.clone());
        Ok(Box::new(session))
    }
}

/// Tool gateway returning canned outputs per `server.tool` and recording
/// every dispatched call.
pub struct MockToolGateway {
    registry: CapabilityRegistry,
    outputs: HashMap<String, Result<ToolOutput, ToolGatewayError>>,
    calls: Mutex<Vec<(String, String, Value)>>,
}

impl MockToolGateway {
    pub fn new(registry: CapabilityRegistry) -> Self {
        Self {
            registry,
            outputs: HashMap::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_output(
        mut self,
        capability: &str,
        output: Result<ToolOutput, ToolGatewayError>,
    ) -> Self {
        self.outputs.insert(capability.to_string(), output);
        self
    }

    pub fn calls(&self) -> Vec<(String, String, Value)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ToolGatewayPort for MockToolGateway {
    async fn list_capabilities(&self) -> Result<CapabilityRegistry, ToolGatewayError> {
        Ok(self.registry.clone())
    }

    async fn call_tool(
        &self,
        server: &str,
        tool: &str,
        args: Value,
    ) -> Result<ToolOutput, ToolGatewayError> {
        self.calls
            .lock()
            .unwrap()
            .push((server.to_string(), tool.to_string(), args));
        self.outputs
            .get(&format!("{server}.{tool}"))
            .cloned()
            .unwrap_or(Ok(ToolOutput::NoContent))
    }
}
