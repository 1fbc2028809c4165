/// Interactor
///
/// The session state machine. Owns the relay WebSocket, the handshake
/// context, the subscription registry and all timers, and exposes the
/// public connect/approve/reject/update/kill/disconnect operations.
///
/// Concurrency model: one writer task drains an outbound channel and owns
/// the ping interval, one reader task dispatches inbound frames. Every
/// connection carries an epoch; timers and loops check it before acting,
/// so nothing left over from a previous socket can fire after a
/// transition to `disconnected`.
///
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use log::{debug, warn};
use serde::Serialize;
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Instant, interval_at, sleep, timeout};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use url::Url;
use uuid::Uuid;

use crate::constants::{
    CLOSE_CODE_GOING_AWAY, CLOSE_CODE_SECURITY, CONNECT_TIMEOUT_SECS,
    ERROR_CODE_REJECTED_BY_USER, ERROR_CODE_SERVER, MAX_RECONNECT_ATTEMPTS,
    PING_INTERVAL_SECS, RECONNECT_DELAY_MS, SEND_TIMEOUT_SECS,
    SESSION_REQUEST_TIMEOUT_SECS,
};
use crate::crypto::EncryptionEnvelope;
use crate::error::{Error, Result};
use crate::event::WcEvent;
use crate::frame::{AckMessage, FrameType, RelayFrame};
use crate::handlers::{
    BinanceHandler, CallbackSlot, EthereumHandler, IbcHandler, TrustHandler,
};
use crate::rpc::{
    ChainId, JsonRpcErrorResponse, JsonRpcRequest, JsonRpcResponse, payload_id,
};
use crate::session::Session;
use crate::store::SessionStore;
use crate::subscription::SubscriptionRegistry;
use crate::types::{
    PeerMeta, SessionApproval, SessionRequestParams, SessionUpdateParams,
};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Paused,
}

#[derive(Clone, Copy, Debug)]
pub struct ReconnectPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        ReconnectPolicy {
            max_attempts: MAX_RECONNECT_ATTEMPTS,
            delay: Duration::from_millis(RECONNECT_DELAY_MS),
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct InteractorConfig {
    pub connect_timeout: Duration,
    /// Window for the first `wc_sessionRequest` on a brand new session.
    pub session_request_timeout: Duration,
    pub send_timeout: Duration,
    pub ping_interval: Duration,
    /// `None` disables automatic reconnection.
    pub reconnect: Option<ReconnectPolicy>,
}

impl Default for InteractorConfig {
    fn default() -> Self {
        InteractorConfig {
            connect_timeout: Duration::from_secs(CONNECT_TIMEOUT_SECS),
            session_request_timeout: Duration::from_secs(SESSION_REQUEST_TIMEOUT_SECS),
            send_timeout: Duration::from_secs(SEND_TIMEOUT_SECS),
            ping_interval: Duration::from_secs(PING_INTERVAL_SECS),
            reconnect: Some(ReconnectPolicy::default()),
        }
    }
}

enum Outbound {
    Text(String, Option<oneshot::Sender<()>>),
    Close(u16),
}

struct Link {
    state: ConnectionState,
    outbound: Option<mpsc::UnboundedSender<Outbound>>,
    epoch: u64,
    user_cancelled: bool,
    watchdog: Option<JoinHandle<()>>,
    reconnects_left: u32,
}

impl Link {
    fn new() -> Link {
        Link {
            state: ConnectionState::Disconnected,
            outbound: None,
            epoch: 0,
            user_cancelled: false,
            watchdog: None,
            reconnects_left: 0,
        }
    }
}

struct Handshake {
    handshake_id: i64,
    peer_id: Option<String>,
    peer_meta: Option<PeerMeta>,
    chain_type: Option<String>,
}

impl Handshake {
    fn new() -> Handshake {
        Handshake {
            handshake_id: -1,
            peer_id: None,
            peer_meta: None,
            chain_type: None,
        }
    }

    fn reset(&mut self) {
        *self = Handshake::new();
    }
}

#[derive(Default)]
struct Callbacks {
    session_request: CallbackSlot<dyn Fn(i64, SessionRequestParams) + Send + Sync>,
    session_killed: CallbackSlot<dyn Fn() + Send + Sync>,
    connected: CallbackSlot<dyn Fn() + Send + Sync>,
    disconnect: CallbackSlot<dyn Fn(Option<Error>) + Send + Sync>,
    custom_request: CallbackSlot<dyn Fn(i64, Value, Option<u64>) + Send + Sync>,
    error: CallbackSlot<dyn Fn(Error) + Send + Sync>,
    ack: CallbackSlot<dyn Fn(AckMessage) + Send + Sync>,
}

struct Inner {
    session: Session,
    client_id: String,
    client_meta: PeerMeta,
    config: InteractorConfig,
    store: Option<Box<dyn SessionStore>>,
    link: Mutex<Link>,
    handshake: Mutex<Handshake>,
    topics: SubscriptionRegistry,
    callbacks: Callbacks,
    ethereum: EthereumHandler,
    binance: BinanceHandler,
    trust: TrustHandler,
    ibc: IbcHandler,
}

pub struct Interactor {
    inner: Arc<Inner>,
}

impl Interactor {
    pub fn new(
        session: Session,
        client_meta: PeerMeta,
        config: InteractorConfig,
        store: Option<Box<dyn SessionStore>>,
    ) -> Interactor {
        Interactor {
            inner: Arc::new(Inner {
                session,
                client_id: Uuid::new_v4().to_string(),
                client_meta,
                config,
                store,
                link: Mutex::new(Link::new()),
                handshake: Mutex::new(Handshake::new()),
                topics: SubscriptionRegistry::new(),
                callbacks: Callbacks::default(),
                ethereum: EthereumHandler::default(),
                binance: BinanceHandler::default(),
                trust: TrustHandler::default(),
                ibc: IbcHandler::default(),
            }),
        }
    }

    pub fn session(&self) -> &Session {
        &self.inner.session
    }

    pub fn client_id(&self) -> &str {
        &self.inner.client_id
    }

    pub fn client_meta(&self) -> &PeerMeta {
        &self.inner.client_meta
    }

    pub fn state(&self) -> ConnectionState {
        self.inner.link.lock().unwrap().state
    }

    pub fn handshake_id(&self) -> i64 {
        self.inner.handshake.lock().unwrap().handshake_id
    }

    pub fn peer_id(&self) -> Option<String> {
        self.inner.handshake.lock().unwrap().peer_id.clone()
    }

    pub fn peer_meta(&self) -> Option<PeerMeta> {
        self.inner.handshake.lock().unwrap().peer_meta.clone()
    }

    pub fn chain_type(&self) -> Option<String> {
        self.inner.handshake.lock().unwrap().chain_type.clone()
    }

    pub fn ethereum(&self) -> &EthereumHandler {
        &self.inner.ethereum
    }

    pub fn binance(&self) -> &BinanceHandler {
        &self.inner.binance
    }

    pub fn trust(&self) -> &TrustHandler {
        &self.inner.trust
    }

    pub fn ibc(&self) -> &IbcHandler {
        &self.inner.ibc
    }

    pub fn on_session_request(
        &self,
        f: impl Fn(i64, SessionRequestParams) + Send + Sync + 'static,
    ) {
        self.inner.callbacks.session_request.set(Arc::new(f));
    }

    pub fn on_session_killed(&self, f: impl Fn() + Send + Sync + 'static) {
        self.inner.callbacks.session_killed.set(Arc::new(f));
    }

    pub fn on_connected(&self, f: impl Fn() + Send + Sync + 'static) {
        self.inner.callbacks.connected.set(Arc::new(f));
    }

    pub fn on_disconnect(&self, f: impl Fn(Option<Error>) + Send + Sync + 'static) {
        self.inner.callbacks.disconnect.set(Arc::new(f));
    }

    pub fn on_custom_request(
        &self,
        f: impl Fn(i64, Value, Option<u64>) + Send + Sync + 'static,
    ) {
        self.inner.callbacks.custom_request.set(Arc::new(f));
    }

    pub fn on_error(&self, f: impl Fn(Error) + Send + Sync + 'static) {
        self.inner.callbacks.error.set(Arc::new(f));
    }

    pub fn on_receive_ack(&self, f: impl Fn(AckMessage) + Send + Sync + 'static) {
        self.inner.callbacks.ack.set(Arc::new(f));
    }

    /// Open the relay socket and subscribe to the session topic and our
    /// client id. Resolves once connected, or fails after the connect
    /// window elapses.
    pub async fn connect(&self) -> Result<()> {
        self.inner.connect_inner(false).await
    }

    /// Close with "going away" and park the state machine; `resume`
    /// reopens the socket.
    pub fn pause(&self) {
        let mut link = self.inner.link.lock().unwrap();
        if link.state != ConnectionState::Connected {
            return;
        }
        link.state = ConnectionState::Paused;
        link.epoch += 1;
        if let Some(watchdog) = link.watchdog.take() {
            watchdog.abort();
        }
        if let Some(sender) = link.outbound.take() {
            let _ = sender.send(Outbound::Close(CLOSE_CODE_GOING_AWAY));
        }
        drop(link);
        self.inner.topics.reset();
    }

    pub async fn resume(&self) -> Result<()> {
        self.inner.connect_inner(false).await
    }

    /// User-initiated disconnect. Idempotent; cancels every timer and any
    /// scheduled reconnect.
    pub async fn disconnect(&self) {
        let epoch = {
            let mut link = self.inner.link.lock().unwrap();
            link.user_cancelled = true;
            link.epoch
        };
        self.inner.teardown(epoch, None, false);
    }

    /// Answer a pending `wc_sessionRequest`.
    pub async fn approve_session(&self, approval: SessionApproval) -> Result<()> {
        let handshake_id = self.handshake_id();
        if handshake_id <= 0 {
            return Err(Error::SessionInvalid);
        }
        let response = JsonRpcResponse::new(handshake_id, approval);
        self.inner.encrypt_and_send(&response).await
    }

    /// Convenience payload for `approve_session`, carrying our client id
    /// and metadata as the responding peer.
    pub fn session_approval(
        &self,
        chain_id: ChainId,
        accounts: Vec<String>,
    ) -> SessionApproval {
        SessionApproval {
            approved: true,
            chain_id,
            accounts,
            peer_id: Some(self.inner.client_id.clone()),
            peer_meta: Some(self.inner.client_meta.clone()),
        }
    }

    pub async fn reject_session(&self, message: &str) -> Result<()> {
        let handshake_id = self.handshake_id();
        if handshake_id <= 0 {
            return Err(Error::SessionInvalid);
        }
        let response = JsonRpcErrorResponse::new(handshake_id, ERROR_CODE_SERVER, message);
        self.inner.encrypt_and_send(&response).await
    }

    /// Send a session update with a fresh id. `method` picks the wire
    /// name (`wc_sessionUpdate` or the `dc_` alias).
    pub async fn update_session(
        &self,
        params: SessionUpdateParams,
        method: WcEvent,
    ) -> Result<()> {
        if self.state() != ConnectionState::Connected {
            return Err(Error::Transport("socket not connected".to_string()));
        }
        let request = JsonRpcRequest::new(payload_id(), method.as_str(), vec![params]);
        self.inner.encrypt_and_send(&request).await
    }

    /// Send `{approved:false, chainId:null, accounts:null}`, fire
    /// `on_session_killed` and disconnect without reconnecting.
    pub async fn kill_session(&self, method: WcEvent) -> Result<()> {
        let request = JsonRpcRequest::new(
            payload_id(),
            method.as_str(),
            vec![SessionUpdateParams::kill()],
        );
        self.inner.link.lock().unwrap().user_cancelled = true;
        self.inner.encrypt_and_send(&request).await?;
        if let Some(cb) = self.inner.callbacks.session_killed.get() {
            cb();
        }
        self.disconnect().await;
        Ok(())
    }

    pub async fn approve_request<R: Serialize>(&self, id: i64, result: R) -> Result<()> {
        let response = JsonRpcResponse::new(id, result);
        self.inner.encrypt_and_send(&response).await
    }

    /// Reject with the EIP-1193 user-rejection code.
    pub async fn reject_request(&self, id: i64, message: &str) -> Result<()> {
        let response =
            JsonRpcErrorResponse::new(id, ERROR_CODE_REJECTED_BY_USER, message);
        self.inner.encrypt_and_send(&response).await
    }
}

impl Inner {
    async fn connect_inner(self: &Arc<Inner>, is_reconnect: bool) -> Result<()> {
        let epoch = {
            let mut link = self.link.lock().unwrap();
            match link.state {
                ConnectionState::Connected => return Ok(()),
                ConnectionState::Connecting => {
                    return Err(Error::Transport(
                        "connect already in progress".to_string(),
                    ));
                }
                ConnectionState::Disconnected | ConnectionState::Paused => {}
            }
            link.state = ConnectionState::Connecting;
            link.epoch += 1;
            if !is_reconnect {
                link.user_cancelled = false;
                link.reconnects_left =
                    self.config.reconnect.map_or(0, |p| p.max_attempts);
            }
            link.epoch
        };

        let url = relay_url(&self.session.bridge);
        debug!("connecting to bridge {url}");
        let dialed = match timeout(self.config.connect_timeout, connect_async(url.as_str()))
            .await
        {
            Err(_) => Err(Error::SessionRequestTimeout),
            Ok(Err(e)) => Err(Error::from(e)),
            Ok(Ok((socket, _response))) => Ok(socket),
        };
        let socket = match dialed {
            Ok(socket) => socket,
            Err(error) => {
                // reconnect attempts keep retrying silently; a user
                // initiated connect surfaces immediately
                self.teardown(epoch, Some(error.clone()), is_reconnect);
                return Err(error);
            }
        };

        let (sink, stream) = socket.split();
        let (sender, receiver) = mpsc::unbounded_channel();
        {
            let mut link = self.link.lock().unwrap();
            if link.epoch != epoch {
                // disconnect() raced the dial; drop the fresh socket
                return Err(Error::Transport("connect cancelled".to_string()));
            }
            link.state = ConnectionState::Connected;
            link.outbound = Some(sender);
        }
        tokio::spawn(write_loop(sink, receiver, self.config.ping_interval));
        let reader = self.clone();
        tokio::spawn(async move { reader.read_loop(stream, epoch).await });

        let session_topic = self.session.topic.clone();
        self.subscribe(&session_topic).await?;
        let client_id = self.client_id.clone();
        self.subscribe(&client_id).await?;

        // A store hit for an unchanged session means we are resuming:
        // restore the peer identity and skip the handshake watchdog.
        if !self.restore_from_store().await? {
            let watchdog = self.clone();
            let handle =
                tokio::spawn(async move { watchdog.handshake_watchdog(epoch).await });
            self.link.lock().unwrap().watchdog = Some(handle);
        }

        if let Some(cb) = self.callbacks.connected.get() {
            cb();
        }
        Ok(())
    }

    async fn restore_from_store(self: &Arc<Inner>) -> Result<bool> {
        let Some(store) = &self.store else {
            return Ok(false);
        };
        let Some(stored) = store.load(&self.session.topic) else {
            return Ok(false);
        };
        if stored.session != self.session {
            return Ok(false);
        }
        debug!("resuming stored session on topic {}", self.session.topic);
        {
            let mut handshake = self.handshake.lock().unwrap();
            handshake.peer_id = Some(stored.peer_id.clone());
            handshake.peer_meta = Some(stored.peer_meta);
        }
        // acks arrive addressed to the peer id
        self.subscribe(&stored.peer_id).await?;
        Ok(true)
    }

    async fn handshake_watchdog(self: Arc<Inner>, epoch: u64) {
        sleep(self.config.session_request_timeout).await;
        let pending = self.handshake.lock().unwrap().handshake_id < 0;
        if pending {
            warn!("no session request within the handshake window");
            self.teardown(epoch, Some(Error::SessionRequestTimeout), false);
        }
    }

    /// Single exit path for every transition to `disconnected`. Returns
    /// false if the epoch already rotated (someone else got there first).
    fn teardown(
        self: &Arc<Inner>,
        epoch: u64,
        error: Option<Error>,
        allow_reconnect: bool,
    ) -> bool {
        let reconnect = {
            let mut link = self.link.lock().unwrap();
            if link.epoch != epoch || link.state == ConnectionState::Disconnected {
                return false;
            }
            link.epoch += 1;
            link.state = ConnectionState::Disconnected;
            if let Some(watchdog) = link.watchdog.take() {
                watchdog.abort();
            }
            if let Some(sender) = link.outbound.take() {
                let _ = sender.send(Outbound::Close(1000));
            }
            let reconnect = allow_reconnect
                && !link.user_cancelled
                && self.config.reconnect.is_some()
                && link.reconnects_left > 0;
            if reconnect {
                link.reconnects_left -= 1;
            }
            reconnect
        };

        self.topics.reset();
        self.handshake.lock().unwrap().reset();

        if reconnect {
            let policy = self.config.reconnect.unwrap();
            let inner = self.clone();
            tokio::spawn(async move {
                sleep(policy.delay).await;
                if inner.link.lock().unwrap().user_cancelled {
                    return;
                }
                debug!("reconnecting to bridge");
                let _ = inner.connect_inner(true).await;
            });
        } else if let Some(cb) = self.callbacks.disconnect.get() {
            cb(error);
        }
        true
    }

    async fn read_loop(self: Arc<Inner>, mut stream: SplitStream<WsStream>, epoch: u64) {
        let mut close_code: Option<u16> = None;
        let mut transport_error: Option<Error> = None;

        while let Some(next) = stream.next().await {
            if self.link.lock().unwrap().epoch != epoch {
                return;
            }
            match next {
                Ok(Message::Text(text)) => self.handle_text(text.as_str()).await,
                Ok(Message::Close(frame)) => {
                    close_code = frame.map(|f| u16::from(f.code));
                    break;
                }
                // pongs and relay pings are handled by the protocol layer
                Ok(_) => {}
                Err(e) => {
                    transport_error = Some(Error::Transport(e.to_string()));
                    break;
                }
            }
        }

        let fatal = close_code == Some(CLOSE_CODE_SECURITY);
        let error = if fatal {
            Some(Error::Security(format!(
                "relay closed the socket with code {CLOSE_CODE_SECURITY}"
            )))
        } else {
            transport_error
        };
        self.teardown(epoch, error, !fatal);
    }

    async fn handle_text(self: &Arc<Inner>, text: &str) {
        // historical relay heartbeat, answered at the application level
        if text == "ping" {
            if let Some(sender) = self.link.lock().unwrap().outbound.clone() {
                let _ = sender.send(Outbound::Text("pong".to_string(), None));
            }
            return;
        }

        let frame: RelayFrame = match serde_json::from_str(text) {
            Ok(frame) => frame,
            Err(e) => {
                debug!("discarding malformed frame: {e}");
                self.fire_error(Error::BadJsonRpcRequest);
                return;
            }
        };

        match frame.frame_type {
            FrameType::Ack => {
                if let Some(cb) = self.callbacks.ack.get() {
                    cb(frame.into_ack_message());
                }
            }
            FrameType::Sub => {}
            FrameType::Pub => {
                if let Err(error) = self.handle_publish(frame).await {
                    // adversaries can relay garbage; report and keep the
                    // socket open
                    warn!("inbound message error: {error}");
                    self.fire_error(error);
                }
            }
        }
    }

    async fn handle_publish(self: &Arc<Inner>, frame: RelayFrame) -> Result<()> {
        let envelope = frame.envelope()?.ok_or(Error::BadJsonRpcRequest)?;
        let plaintext = envelope.decrypt(&self.session.key)?;
        let value: Value = serde_json::from_slice(&plaintext)?;
        debug!("inbound payload: {value}");

        let id = value.get("id").and_then(Value::as_i64);
        let method = value
            .get("method")
            .and_then(Value::as_str)
            .map(str::to_string);
        let timestamp = frame.timestamp;

        if let Some(method) = method {
            if let Some(event) = WcEvent::from_method(&method) {
                return self.handle_event(event, id, &value, timestamp).await;
            }
        }
        // unknown method, or a bare response: the application decides
        if let Some(id) = id {
            if let Some(cb) = self.callbacks.custom_request.get() {
                cb(id, value, timestamp);
            }
        }
        Ok(())
    }

    async fn handle_event(
        self: &Arc<Inner>,
        event: WcEvent,
        id: Option<i64>,
        value: &Value,
        timestamp: Option<u64>,
    ) -> Result<()> {
        let id = id.ok_or(Error::BadJsonRpcRequest)?;
        let params = value.get("params").cloned().unwrap_or(Value::Null);

        match event {
            WcEvent::SessionRequest | WcEvent::DcSessionRequest => {
                let list: Vec<SessionRequestParams> = serde_json::from_value(params)?;
                let param = list.into_iter().next().ok_or(Error::BadJsonRpcRequest)?;
                {
                    let mut handshake = self.handshake.lock().unwrap();
                    handshake.handshake_id = id;
                    handshake.peer_id = Some(param.peer_id.clone());
                    handshake.peer_meta = Some(param.peer_meta.clone());
                    handshake.chain_type = param.chain_type.clone();
                }
                if let Some(watchdog) = self.link.lock().unwrap().watchdog.take() {
                    watchdog.abort();
                }
                // acks for our responses arrive addressed to the peer id
                self.subscribe(&param.peer_id).await?;
                if let Some(cb) = self.callbacks.session_request.get() {
                    cb(id, param);
                }
                Ok(())
            }
            WcEvent::SessionUpdate | WcEvent::DcSessionUpdate => {
                let list: Vec<SessionUpdateParams> = serde_json::from_value(params)?;
                let param = list.into_iter().next().ok_or(Error::BadJsonRpcRequest)?;
                if !param.approved {
                    debug!("peer killed the session");
                    self.session_killed_by_peer();
                }
                Ok(())
            }
            WcEvent::DcKillSession => {
                self.session_killed_by_peer();
                Ok(())
            }
            WcEvent::DcInstantRequest => {
                if let Some(cb) = self.callbacks.custom_request.get() {
                    cb(id, value.clone(), timestamp);
                }
                Ok(())
            }
            WcEvent::EthSign
            | WcEvent::PersonalSign
            | WcEvent::EthSignTypedData
            | WcEvent::EthSignTransaction
            | WcEvent::EthSendTransaction => {
                self.ethereum.handle(event, id, &params, timestamp)
            }
            WcEvent::BnbSign | WcEvent::BnbTransactionConfirm => {
                self.binance.handle(event, id, &params)
            }
            WcEvent::TrustSignTransaction | WcEvent::GetAccounts => {
                self.trust.handle(event, id, &params, timestamp)
            }
            WcEvent::CosmosSendTransaction => self.ibc.handle(id, &params, timestamp),
        }
    }

    fn session_killed_by_peer(self: &Arc<Inner>) {
        if let Some(cb) = self.callbacks.session_killed.get() {
            cb();
        }
        let epoch = {
            let mut link = self.link.lock().unwrap();
            link.user_cancelled = true;
            link.epoch
        };
        self.teardown(epoch, None, false);
    }

    fn fire_error(&self, error: Error) {
        if let Some(cb) = self.callbacks.error.get() {
            cb(error);
        }
    }

    async fn subscribe(self: &Arc<Inner>, topic: &str) -> Result<()> {
        // idempotent: a topic is announced to the relay at most once per
        // connection
        if !self.topics.insert(topic) {
            return Ok(());
        }
        debug!("subscribing to topic {topic}");
        self.send_frame(&RelayFrame::subscribe(topic), false).await
    }

    async fn encrypt_and_send<T: Serialize>(self: &Arc<Inner>, payload: &T) -> Result<()> {
        let plaintext = serde_json::to_vec(payload)?;
        let envelope = EncryptionEnvelope::encrypt(&plaintext, &self.session.key)?;
        let topic = self
            .handshake
            .lock()
            .unwrap()
            .peer_id
            .clone()
            .unwrap_or_else(|| self.session.topic.clone());
        let frame = RelayFrame::publish(&topic, &envelope)?;
        self.send_frame(&frame, true).await
    }

    async fn send_frame(self: &Arc<Inner>, frame: &RelayFrame, wait_write: bool) -> Result<()> {
        let text = serde_json::to_string(frame)?;
        let sender = self
            .link
            .lock()
            .unwrap()
            .outbound
            .clone()
            .ok_or_else(|| Error::Transport("socket not connected".to_string()))?;

        if !wait_write {
            return sender
                .send(Outbound::Text(text, None))
                .map_err(|_| Error::Transport("socket closed".to_string()));
        }

        let (done_tx, done_rx) = oneshot::channel();
        sender
            .send(Outbound::Text(text, Some(done_tx)))
            .map_err(|_| Error::Transport("socket closed".to_string()))?;
        match timeout(self.config.send_timeout, done_rx).await {
            Err(_) => Err(Error::SessionRequestTimeout),
            Ok(Err(_)) => Err(Error::Transport("socket closed".to_string())),
            Ok(Ok(())) => Ok(()),
        }
    }
}

async fn write_loop(
    mut sink: SplitSink<WsStream, Message>,
    mut receiver: mpsc::UnboundedReceiver<Outbound>,
    ping_interval: Duration,
) {
    let mut ping = interval_at(Instant::now() + ping_interval, ping_interval);
    loop {
        tokio::select! {
            command = receiver.recv() => match command {
                None => break,
                Some(Outbound::Text(text, done)) => {
                    if sink.send(Message::Text(text.into())).await.is_err() {
                        warn!("websocket write failed");
                        break;
                    }
                    if let Some(done) = done {
                        let _ = done.send(());
                    }
                }
                Some(Outbound::Close(code)) => {
                    let frame = CloseFrame {
                        code: CloseCode::from(code),
                        reason: "".into(),
                    };
                    let _ = sink.send(Message::Close(Some(frame))).await;
                    break;
                }
            },
            _ = ping.tick() => {
                if sink.send(Message::Ping(Vec::new().into())).await.is_err() {
                    break;
                }
            }
        }
    }
}

fn relay_url(bridge: &Url) -> Url {
    let mut url = bridge.clone();
    let scheme = match url.scheme() {
        "https" => "wss",
        "http" => "ws",
        _ => return url,
    };
    let _ = url.set_scheme(scheme);
    url
}
