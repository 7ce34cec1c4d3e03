//! Fake collaborators for tests.

use crate::error::{BridgeError, Result};
use crate::realtime::{
    ConnectionState, ErrorObserver, FunctionTool, RealtimeSession, SessionObserver, SessionUpdate,
};
use crate::video::{AgentConnectRequest, TokenSigner, VideoPlatform};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

pub const TEST_API_KEY: &str = "test-api-key";
pub const TEST_SECRET: &str = "test-secret";

/// Session that records configuration calls instead of talking to an agent.
pub struct FakeSession {
    updates: Mutex<Vec<SessionUpdate>>,
    tools: Mutex<Vec<String>>,
    observers: Mutex<(usize, usize)>,
    state: Mutex<ConnectionState>,
    fail_updates: bool,
    fail_tools: bool,
}

impl FakeSession {
    pub fn new() -> Self {
        Self::build(false, false)
    }

    pub fn failing_updates() -> Self {
        Self::build(true, false)
    }

    pub fn failing_tools() -> Self {
        Self::build(false, true)
    }

    fn build(fail_updates: bool, fail_tools: bool) -> Self {
        Self {
            updates: Mutex::new(Vec::new()),
            tools: Mutex::new(Vec::new()),
            observers: Mutex::new((0, 0)),
            state: Mutex::new(ConnectionState::Connected),
            fail_updates,
            fail_tools,
        }
    }

    pub fn updates(&self) -> Vec<SessionUpdate> {
        self.updates.lock().unwrap().clone()
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.tools.lock().unwrap().clone()
    }

    /// (error observers, session-update observers)
    pub fn observer_counts(&self) -> (usize, usize) {
        *self.observers.lock().unwrap()
    }

    pub fn set_state(&self, state: ConnectionState) {
        *self.state.lock().unwrap() = state;
    }
}

#[async_trait]
impl RealtimeSession for FakeSession {
    fn on_error(&self, _observer: ErrorObserver) {
        self.observers.lock().unwrap().0 += 1;
    }

    fn on_session_update(&self, _observer: SessionObserver) {
        self.observers.lock().unwrap().1 += 1;
    }

    async fn update_session(&self, update: SessionUpdate) -> Result<()> {
        if self.fail_updates {
            return Err(BridgeError::Realtime("simulated update failure".to_string()));
        }
        self.updates.lock().unwrap().push(update);
        Ok(())
    }

    async fn add_tool(&self, tool: FunctionTool) -> Result<()> {
        if self.fail_tools {
            return Err(BridgeError::Realtime("simulated tool failure".to_string()));
        }
        self.tools.lock().unwrap().push(tool.name);
        Ok(())
    }

    fn state(&self) -> ConnectionState {
        *self.state.lock().unwrap()
    }

    async fn disconnect(&self) {
        self.set_state(ConnectionState::Disconnected);
    }
}

/// How the fake platform answers bridge requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bridge {
    Succeed,
    Fail,
    Hang,
    /// Bridge succeeds but the session rejects tool registration.
    BrokenSession,
}

/// Video platform that signs real tokens and fakes the agent bridge.
pub struct FakePlatform {
    signer: TokenSigner,
    bridge: Bridge,
    fail_tokens: bool,
    attempts: Mutex<Vec<String>>,
    sessions: Mutex<Vec<Arc<FakeSession>>>,
}

impl FakePlatform {
    pub fn new(bridge: Bridge) -> Self {
        Self {
            signer: TokenSigner::new(TEST_SECRET),
            bridge,
            fail_tokens: false,
            attempts: Mutex::new(Vec::new()),
            sessions: Mutex::new(Vec::new()),
        }
    }

    pub fn with_failing_tokens(mut self) -> Self {
        self.fail_tokens = true;
        self
    }

    pub fn signer(&self) -> &TokenSigner {
        &self.signer
    }

    /// cids of every bridge attempt, in order.
    pub fn attempts(&self) -> Vec<String> {
        self.attempts.lock().unwrap().clone()
    }

    /// Sessions handed out, in order.
    pub fn sessions(&self) -> Vec<Arc<FakeSession>> {
        self.sessions.lock().unwrap().clone()
    }
}

#[async_trait]
impl VideoPlatform for FakePlatform {
    fn api_key(&self) -> &str {
        TEST_API_KEY
    }

    fn generate_user_token(&self, user_id: &str) -> Result<String> {
        if self.fail_tokens {
            return Err(BridgeError::Token(
                jsonwebtoken::errors::ErrorKind::InvalidKeyFormat.into(),
            ));
        }
        self.signer
            .user_token(user_id, std::time::Duration::from_secs(3600))
    }

    async fn connect_openai(
        &self,
        request: AgentConnectRequest<'_>,
    ) -> Result<Arc<dyn RealtimeSession>> {
        self.attempts.lock().unwrap().push(request.call.cid());

        let session = match self.bridge {
            Bridge::Succeed => FakeSession::new(),
            Bridge::BrokenSession => FakeSession::failing_tools(),
            Bridge::Fail => {
                return Err(BridgeError::Connect("simulated bridge failure".to_string()))
            }
            Bridge::Hang => std::future::pending().await,
        };

        let session = Arc::new(session);
        self.sessions.lock().unwrap().push(Arc::clone(&session));
        Ok(session)
    }
}
