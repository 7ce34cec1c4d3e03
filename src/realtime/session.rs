//! WebSocket-backed realtime session.

use super::events::{ClientEvent, ConversationItem, RealtimeError, ServerEvent, SessionConfig};
use super::{
    ConnectionState, ErrorObserver, FunctionTool, RealtimeSession, SessionObserver,
    SessionUpdate, ToolRegistry,
};
use crate::error::{BridgeError, Result};
use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, instrument, warn};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

const OUTGOING_BUFFER: usize = 64;

/// How long `disconnect` waits for the close frame to be flushed.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Default)]
struct Configuration {
    instructions: Option<String>,
    tools: ToolRegistry,
}

impl Configuration {
    fn session_update(&self) -> ClientEvent {
        ClientEvent::SessionUpdate {
            session: SessionConfig {
                instructions: self.instructions.clone(),
                tools: self.tools.definitions(),
                tool_choice: (!self.tools.is_empty()).then(|| "auto".to_string()),
            },
        }
    }
}

/// Transport-independent session state: configuration, observers and
/// event dispatch.
pub struct SessionCore {
    config: Mutex<Configuration>,
    error_observers: RwLock<Vec<ErrorObserver>>,
    update_observers: RwLock<Vec<SessionObserver>>,
    state: Mutex<ConnectionState>,
}

impl Default for SessionCore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionCore {
    pub fn new() -> Self {
        Self {
            config: Mutex::new(Configuration::default()),
            error_observers: RwLock::new(Vec::new()),
            update_observers: RwLock::new(Vec::new()),
            state: Mutex::new(ConnectionState::Idle),
        }
    }

    pub fn state(&self) -> ConnectionState {
        *lock(&self.state)
    }

    pub fn set_state(&self, state: ConnectionState) {
        *lock(&self.state) = state;
    }

    /// Move an active connection to a terminal state. No-op otherwise.
    pub fn close_with(&self, state: ConnectionState) {
        let mut current = lock(&self.state);
        if current.is_active() {
            *current = state;
        }
    }

    pub fn add_error_observer(&self, observer: ErrorObserver) {
        self.error_observers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(observer);
    }

    pub fn add_update_observer(&self, observer: SessionObserver) {
        self.update_observers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(observer);
    }

    /// Merge an update and return the `session.update` to send.
    pub fn apply_update(&self, update: SessionUpdate) -> ClientEvent {
        let mut config = lock(&self.config);
        if let Some(instructions) = update.instructions {
            config.instructions = Some(instructions);
        }
        config.session_update()
    }

    /// Register a tool and return the `session.update` to send.
    pub fn register_tool(&self, tool: FunctionTool) -> ClientEvent {
        let mut config = lock(&self.config);
        config.tools.add(tool);
        config.session_update()
    }

    /// Notify every error observer.
    pub fn report_error(&self, error: &RealtimeError) {
        let observers = self
            .error_observers
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        for observer in observers.iter() {
            observer(error);
        }
    }

    fn report_session(&self, session: &serde_json::Value) {
        let observers = self
            .update_observers
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        for observer in observers.iter() {
            observer(session);
        }
    }

    /// Dispatch one incoming event. Returns the events to send in reply.
    pub fn handle_event(&self, event: ServerEvent) -> Vec<ClientEvent> {
        match event {
            ServerEvent::Error { error } => {
                self.report_error(&error);
                Vec::new()
            }
            ServerEvent::SessionCreated { session } | ServerEvent::SessionUpdated { session } => {
                self.report_session(&session);
                Vec::new()
            }
            ServerEvent::OutputItemDone { item } if item.kind == "function_call" => {
                let (Some(call_id), Some(name)) = (item.call_id, item.name) else {
                    warn!("Function call item without call_id or name");
                    return Vec::new();
                };

                // Tool handlers run outside the config lock.
                let tools = lock(&self.config).tools.clone();
                let output = tools.call(&name, item.arguments.as_deref().unwrap_or_default());

                vec![
                    ClientEvent::ConversationItemCreate {
                        item: ConversationItem::function_call_output(&call_id, &output),
                    },
                    ClientEvent::ResponseCreate {},
                ]
            }
            _ => Vec::new(),
        }
    }
}

enum Outgoing {
    Event(ClientEvent),
    Close,
}

/// Realtime session driven over a WebSocket.
///
/// A reader task dispatches incoming events through [`SessionCore`]; a
/// writer task owns the sink. The writer stops when the reader ends, when
/// the session disconnects, or when the session is dropped.
pub struct WsRealtimeSession {
    core: Arc<SessionCore>,
    outgoing: mpsc::Sender<Outgoing>,
    reader: Mutex<Option<JoinHandle<()>>>,
    writer: Mutex<Option<JoinHandle<()>>>,
}

impl WsRealtimeSession {
    /// Open the WebSocket described by `request` and start the session tasks.
    #[instrument(skip(request), fields(host = request.uri().host().unwrap_or_default()))]
    pub async fn connect(request: Request) -> Result<Self> {
        let core = Arc::new(SessionCore::new());
        core.set_state(ConnectionState::Connecting);

        let ws = match connect_async(request).await {
            Ok((ws, _response)) => ws,
            Err(e) => {
                core.set_state(ConnectionState::Failed);
                return Err(BridgeError::WebSocket(e));
            }
        };
        core.set_state(ConnectionState::Connected);
        info!("Realtime session connected");

        let (sink, stream) = ws.split();
        let (tx, rx) = mpsc::channel(OUTGOING_BUFFER);

        let writer = tokio::spawn(write_loop(sink, rx));
        let reader = tokio::spawn(read_loop(stream, Arc::clone(&core), tx.clone()));

        Ok(Self {
            core,
            outgoing: tx,
            reader: Mutex::new(Some(reader)),
            writer: Mutex::new(Some(writer)),
        })
    }

    #[cfg(test)]
    fn writer_finished(&self) -> bool {
        lock(&self.writer)
            .as_ref()
            .map_or(true, JoinHandle::is_finished)
    }

    async fn send(&self, event: ClientEvent) -> Result<()> {
        if !self.core.state().is_active() {
            return Err(BridgeError::SessionClosed);
        }
        self.outgoing
            .send(Outgoing::Event(event))
            .await
            .map_err(|_| BridgeError::SessionClosed)
    }
}

impl Drop for WsRealtimeSession {
    fn drop(&mut self) {
        if let Some(reader) = lock(&self.reader).take() {
            reader.abort();
        }
    }
}

#[async_trait]
impl RealtimeSession for WsRealtimeSession {
    fn on_error(&self, observer: ErrorObserver) {
        self.core.add_error_observer(observer);
    }

    fn on_session_update(&self, observer: SessionObserver) {
        self.core.add_update_observer(observer);
    }

    async fn update_session(&self, update: SessionUpdate) -> Result<()> {
        let event = self.core.apply_update(update);
        self.send(event).await
    }

    async fn add_tool(&self, tool: FunctionTool) -> Result<()> {
        debug!(tool = %tool.name, "Registering tool");
        let event = self.core.register_tool(tool);
        self.send(event).await
    }

    fn state(&self) -> ConnectionState {
        self.core.state()
    }

    async fn disconnect(&self) {
        self.core.close_with(ConnectionState::Disconnected);
        let _ = self.outgoing.send(Outgoing::Close).await;
        let reader = lock(&self.reader).take();
        if let Some(reader) = reader {
            reader.abort();
        }

        let writer = lock(&self.writer).take();
        if let Some(writer) = writer {
            if tokio::time::timeout(CLOSE_TIMEOUT, writer).await.is_err() {
                warn!("Timed out flushing realtime close frame");
            }
        }
    }
}

async fn write_loop(mut sink: SplitSink<WsStream, Message>, mut rx: mpsc::Receiver<Outgoing>) {
    while let Some(outgoing) = rx.recv().await {
        let message = match outgoing {
            Outgoing::Event(event) => match serde_json::to_string(&event) {
                Ok(text) => Message::Text(text.into()),
                Err(e) => {
                    warn!(error = %e, "Failed to encode realtime event");
                    continue;
                }
            },
            Outgoing::Close => {
                let _ = sink.close().await;
                return;
            }
        };

        if let Err(e) = sink.send(message).await {
            warn!(error = %e, "Failed to send realtime event");
            return;
        }
    }
}

async fn read_loop(
    mut stream: SplitStream<WsStream>,
    core: Arc<SessionCore>,
    outgoing: mpsc::Sender<Outgoing>,
) {
    let closed = 'read: loop {
        let Some(message) = stream.next().await else {
            break ConnectionState::Disconnected;
        };
        match message {
            Ok(Message::Text(text)) => {
                let event = match serde_json::from_str::<ServerEvent>(&text) {
                    Ok(event) => event,
                    Err(e) => {
                        debug!(error = %e, "Ignoring unparseable realtime event");
                        continue;
                    }
                };
                for reply in core.handle_event(event) {
                    if outgoing.send(Outgoing::Event(reply)).await.is_err() {
                        break 'read ConnectionState::Disconnected;
                    }
                }
            }
            Ok(Message::Close(frame)) => {
                debug!(?frame, "Realtime connection closed by peer");
                break ConnectionState::Disconnected;
            }
            Ok(_) => {}
            Err(e) => {
                core.report_error(&RealtimeError::transport(e.to_string()));
                break ConnectionState::Failed;
            }
        }
    };

    info!(state = ?closed, "Realtime session ended");
    core.close_with(closed);
    // The writer may already be gone.
    let _ = outgoing.send(Outgoing::Close).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::realtime::events::OutputItem;
    use serde_json::{json, Value};
    use tokio_tungstenite::tungstenite::client::IntoClientRequest;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn weather_like_tool() -> FunctionTool {
        FunctionTool::new(
            "lookup",
            "Look something up",
            json!({
                "type": "object",
                "properties": {"key": {"type": "string"}},
                "required": ["key"]
            }),
            |args: Value| Ok(json!({ "found": args["key"] })),
        )
    }

    fn function_call(arguments: &str) -> ServerEvent {
        ServerEvent::OutputItemDone {
            item: OutputItem {
                kind: "function_call".to_string(),
                call_id: Some("call_1".to_string()),
                name: Some("lookup".to_string()),
                arguments: Some(arguments.to_string()),
            },
        }
    }

    #[test]
    fn test_function_call_is_answered() {
        let core = SessionCore::new();
        core.register_tool(weather_like_tool());

        let replies = core.handle_event(function_call(r#"{"key":"abc"}"#));
        assert_eq!(replies.len(), 2);
        match &replies[0] {
            ClientEvent::ConversationItemCreate { item } => {
                assert_eq!(item.kind, "function_call_output");
                assert_eq!(item.call_id, "call_1");
                let output: Value = serde_json::from_str(&item.output).unwrap();
                assert_eq!(output, json!({"found": "abc"}));
            }
            other => panic!("expected conversation item, got {:?}", other),
        }
        assert_eq!(replies[1], ClientEvent::ResponseCreate {});
    }

    #[test]
    fn test_invalid_arguments_become_error_output() {
        let core = SessionCore::new();
        core.register_tool(weather_like_tool());

        let replies = core.handle_event(function_call("{}"));
        match &replies[0] {
            ClientEvent::ConversationItemCreate { item } => {
                let output: Value = serde_json::from_str(&item.output).unwrap();
                assert!(output["error"].as_str().unwrap().contains("key"));
            }
            other => panic!("expected conversation item, got {:?}", other),
        }
    }

    #[test]
    fn test_observers_receive_events() {
        let core = SessionCore::new();
        let errors = Arc::new(AtomicUsize::new(0));
        let updates = Arc::new(AtomicUsize::new(0));

        let seen = Arc::clone(&errors);
        core.add_error_observer(Box::new(move |_: &RealtimeError| {
            seen.fetch_add(1, Ordering::SeqCst);
        }));
        let seen = Arc::clone(&updates);
        core.add_update_observer(Box::new(move |_: &Value| {
            seen.fetch_add(1, Ordering::SeqCst);
        }));

        core.handle_event(ServerEvent::Error {
            error: RealtimeError::transport("lost"),
        });
        core.handle_event(ServerEvent::SessionCreated { session: json!({}) });
        core.handle_event(ServerEvent::SessionUpdated { session: json!({}) });
        core.handle_event(ServerEvent::Other);

        assert_eq!(errors.load(Ordering::SeqCst), 1);
        assert_eq!(updates.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_session_update_carries_full_configuration() {
        let core = SessionCore::new();
        core.apply_update(SessionUpdate::instructions("Be helpful."));
        let event = core.register_tool(weather_like_tool());

        match event {
            ClientEvent::SessionUpdate { session } => {
                assert_eq!(session.instructions.as_deref(), Some("Be helpful."));
                assert_eq!(session.tools.len(), 1);
                assert_eq!(session.tool_choice.as_deref(), Some("auto"));
            }
            other => panic!("expected session update, got {:?}", other),
        }
    }

    #[test]
    fn test_close_only_from_active_states() {
        let core = SessionCore::new();
        core.close_with(ConnectionState::Failed);
        assert_eq!(core.state(), ConnectionState::Idle);

        core.set_state(ConnectionState::Connected);
        core.close_with(ConnectionState::Failed);
        core.close_with(ConnectionState::Disconnected);
        assert_eq!(core.state(), ConnectionState::Failed);
    }

    type ServerSocket = WebSocketStream<TcpStream>;

    /// Connect a session to a local WebSocket server and return both ends.
    async fn connected_pair() -> (WsRealtimeSession, ServerSocket) {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            tokio_tungstenite::accept_async(stream).await.unwrap()
        });

        let request = format!("ws://{}", addr).into_client_request().unwrap();
        let session = WsRealtimeSession::connect(request).await.unwrap();
        (session, server.await.unwrap())
    }

    async fn next_event(server: &mut ServerSocket) -> Value {
        loop {
            let message = tokio::time::timeout(Duration::from_secs(5), server.next())
                .await
                .expect("timed out waiting for event")
                .expect("socket closed")
                .unwrap();
            if let Message::Text(text) = message {
                return serde_json::from_str(&text).unwrap();
            }
        }
    }

    async fn wait_for(condition: impl Fn() -> bool) {
        for _ in 0..200 {
            if condition() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("condition not reached");
    }

    #[tokio::test]
    async fn test_socket_session_configures_and_answers_calls() {
        let (session, mut server) = connected_pair().await;
        assert_eq!(session.state(), ConnectionState::Connected);

        session
            .update_session(SessionUpdate::instructions("Be brief."))
            .await
            .unwrap();
        let event = next_event(&mut server).await;
        assert_eq!(event["type"], "session.update");
        assert_eq!(event["session"]["instructions"], "Be brief.");

        session.add_tool(weather_like_tool()).await.unwrap();
        let event = next_event(&mut server).await;
        assert_eq!(event["session"]["tools"][0]["name"], "lookup");

        let call = json!({
            "type": "response.output_item.done",
            "item": {
                "type": "function_call",
                "call_id": "call_7",
                "name": "lookup",
                "arguments": "{\"key\":\"abc\"}"
            }
        });
        server.send(Message::Text(call.to_string().into())).await.unwrap();

        let output = next_event(&mut server).await;
        assert_eq!(output["type"], "conversation.item.create");
        assert_eq!(output["item"]["type"], "function_call_output");
        assert_eq!(output["item"]["call_id"], "call_7");
        let result: Value = serde_json::from_str(output["item"]["output"].as_str().unwrap()).unwrap();
        assert_eq!(result, json!({"found": "abc"}));

        assert_eq!(next_event(&mut server).await["type"], "response.create");
    }

    #[tokio::test]
    async fn test_peer_close_ends_session_and_writer() {
        let (session, mut server) = connected_pair().await;

        server.close(None).await.unwrap();

        wait_for(|| session.state() == ConnectionState::Disconnected).await;
        wait_for(|| session.writer_finished()).await;
        assert!(matches!(
            session.update_session(SessionUpdate::instructions("late")).await,
            Err(BridgeError::SessionClosed)
        ));
    }

    #[tokio::test]
    async fn test_transport_error_fails_session_and_reports() {
        let (session, server) = connected_pair().await;
        let errors = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&errors);
        session.on_error(Box::new(move |_: &RealtimeError| {
            seen.fetch_add(1, Ordering::SeqCst);
        }));

        // Dropping the socket skips the closing handshake.
        drop(server);

        wait_for(|| session.state() == ConnectionState::Failed).await;
        assert_eq!(errors.load(Ordering::SeqCst), 1);
        wait_for(|| session.writer_finished()).await;
    }

    #[tokio::test]
    async fn test_disconnect_sends_close_frame() {
        let (session, mut server) = connected_pair().await;

        session.disconnect().await;
        assert_eq!(session.state(), ConnectionState::Disconnected);
        assert!(session.writer_finished());

        let message = tokio::time::timeout(Duration::from_secs(5), server.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert!(matches!(message, Message::Close(_)));
    }
}
