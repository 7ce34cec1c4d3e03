//! Stream Video platform client.

use super::token::TokenSigner;
use super::{AgentConnectRequest, VideoPlatform};
use crate::config::{Credentials, StreamSettings};
use crate::error::{BridgeError, Result};
use crate::realtime::{RealtimeSession, WsRealtimeSession};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::http::{header, HeaderValue};
use tracing::{debug, instrument};
use url::Url;

/// Path of the platform's agent bridge endpoint.
const CONNECT_AGENT_PATH: &str = "/video/connect_agent";

/// Video platform client backed by the Stream Video API.
pub struct StreamVideoClient {
    api_key: String,
    signer: TokenSigner,
    base_url: Url,
    token_validity: Duration,
}

impl StreamVideoClient {
    /// Create a client from credentials and platform settings.
    pub fn new(credentials: &Credentials, settings: &StreamSettings) -> Result<Self> {
        let base_url = Url::parse(&settings.base_url).map_err(|e| {
            BridgeError::Config(format!("Invalid stream.base_url '{}': {}", settings.base_url, e))
        })?;

        Ok(Self {
            api_key: credentials.stream_api_key.clone(),
            signer: TokenSigner::new(&credentials.stream_api_secret),
            base_url,
            token_validity: settings.token_validity(),
        })
    }

    /// WebSocket URL of the agent bridge for a call.
    pub fn bridge_url(&self, request: &AgentConnectRequest<'_>) -> Result<Url> {
        let mut url = self.base_url.clone();
        let scheme = match url.scheme() {
            "https" | "wss" => "wss",
            "http" | "ws" => "ws",
            other => {
                return Err(BridgeError::Config(format!(
                    "Unsupported stream.base_url scheme: {}",
                    other
                )))
            }
        };
        url.set_scheme(scheme)
            .map_err(|_| BridgeError::Config(format!("Cannot use scheme {}", scheme)))?;

        let path = format!("{}{}", url.path().trim_end_matches('/'), CONNECT_AGENT_PATH);
        url.set_path(&path);

        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("call_type", &request.call.call_type)
                .append_pair("call_id", &request.call.id)
                .append_pair("api_key", &self.api_key)
                .append_pair("stream-auth-type", "jwt")
                .append_pair("openai_key", request.openai_api_key);
            if let Some(model) = request.model {
                query.append_pair("model", model);
            }
        }

        Ok(url)
    }

    /// Handshake request for the agent bridge, authorized as the agent user.
    fn bridge_request(&self, request: &AgentConnectRequest<'_>) -> Result<Request> {
        let token = self.signer.call_token(
            request.agent_user_id,
            &[request.call.cid()],
            self.token_validity,
        )?;
        let url = self.bridge_url(request)?;

        let mut ws_request = url.as_str().into_client_request()?;
        let headers = ws_request.headers_mut();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|e| BridgeError::Connect(e.to_string()))?,
        );
        headers.insert("openai-beta", HeaderValue::from_static("realtime=v1"));

        Ok(ws_request)
    }

    /// Signer for tokens issued by this client.
    pub fn signer(&self) -> &TokenSigner {
        &self.signer
    }
}

#[async_trait]
impl VideoPlatform for StreamVideoClient {
    fn api_key(&self) -> &str {
        &self.api_key
    }

    fn generate_user_token(&self, user_id: &str) -> Result<String> {
        self.signer.user_token(user_id, self.token_validity)
    }

    #[instrument(skip(self, request), fields(cid = %request.call, agent = request.agent_user_id))]
    async fn connect_openai(
        &self,
        request: AgentConnectRequest<'_>,
    ) -> Result<Arc<dyn RealtimeSession>> {
        let ws_request = self.bridge_request(&request)?;
        debug!("Opening agent bridge");

        let session = WsRealtimeSession::connect(ws_request)
            .await
            .map_err(|e| match e {
                BridgeError::WebSocket(e) => BridgeError::Connect(e.to_string()),
                other => other,
            })?;

        Ok(Arc::new(session))
    }
}
