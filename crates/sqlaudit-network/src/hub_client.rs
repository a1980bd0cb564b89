//! 실시간 푸시 허브 WebSocket 클라이언트.
//!
//! `PushChannel` 포트 구현. `tokio-tungstenite` 로 허브에 직접 연결하고,
//! 핸드셰이크 후 서버 호출을 [`PushEvent`] 로 변환해 채널로 보낸다.
//! 재연결은 호출자(스케줄러)가 담당한다.

use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use sqlaudit_core::error::CoreError;
use sqlaudit_core::ports::push::{PushChannel, PushConnection, PushControl, PushEvent};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use crate::auth::TokenManager;
use crate::hub_protocol::{self, HubMessage};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsWriter = Arc<Mutex<SplitSink<WsStream, Message>>>;

/// 킵얼라이브 핑 주기
const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(15);

/// 핸드셰이크 응답 대기 시간
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// 이벤트 채널 버퍼
const EVENT_BUFFER: usize = 64;

/// 허브 URL을 WebSocket URL로 변환하고 액세스 토큰을 붙인다
pub fn websocket_url(hub_url: &str, token: &str) -> Result<url::Url, CoreError> {
    let mut url = url::Url::parse(hub_url)
        .map_err(|e| CoreError::Config(format!("잘못된 허브 URL: {hub_url}: {e}")))?;
    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => {
            return Err(CoreError::Config(format!(
                "지원하지 않는 허브 URL 스킴: {other}"
            )))
        }
    };
    url.set_scheme(scheme)
        .map_err(|_| CoreError::Config(format!("허브 URL 스킴 변환 실패: {hub_url}")))?;
    url.query_pairs_mut().append_pair("access_token", token);
    Ok(url)
}

/// 푸시 허브 클라이언트 (`PushChannel` 포트 구현)
pub struct HubPushClient {
    hub_url: String,
    token_manager: Arc<TokenManager>,
}

impl HubPushClient {
    /// 새 허브 클라이언트 생성
    pub fn new(hub_url: &str, token_manager: Arc<TokenManager>) -> Self {
        Self {
            hub_url: hub_url.trim_end_matches('/').to_string(),
            token_manager,
        }
    }

    /// 핸드셰이크 응답 대기
    ///
    /// 응답과 같은 메시지에 이어 붙은 프레임은 남겨서 반환한다.
    async fn await_handshake(read: &mut SplitStream<WsStream>) -> Result<Vec<String>, CoreError> {
        let first = tokio::time::timeout(HANDSHAKE_TIMEOUT, read.next())
            .await
            .map_err(|_| CoreError::Network("허브 핸드셰이크 시간 초과".to_string()))?;

        let text = match first {
            Some(Ok(Message::Text(text))) => text.as_str().to_string(),
            Some(Ok(other)) => {
                return Err(CoreError::Network(format!(
                    "예상치 못한 핸드셰이크 응답: {other:?}"
                )))
            }
            Some(Err(e)) => return Err(CoreError::Network(format!("허브 수신 실패: {e}"))),
            None => return Err(CoreError::Network("핸드셰이크 중 연결 종료".to_string())),
        };

        let mut frames = hub_protocol::split_frames(&text);
        let response = frames
            .next()
            .ok_or_else(|| CoreError::Network("빈 핸드셰이크 응답".to_string()))?;
        hub_protocol::parse_handshake_response(response)?;
        Ok(frames.map(str::to_string).collect())
    }

    /// 프레임 하나를 처리. 연결을 계속 읽어야 하면 true.
    async fn handle_frame(frame: &str, tx: &mpsc::Sender<PushEvent>) -> bool {
        let message = match hub_protocol::parse_message(frame) {
            Ok(message) => message,
            Err(e) => {
                warn!("허브 프레임 디코딩 실패, 무시: {e}");
                return true;
            }
        };

        match message {
            HubMessage::Invocation { target, arguments } => {
                match hub_protocol::invocation_to_event(&target, arguments) {
                    Ok(Some(event)) => {
                        debug!("푸시 이벤트 수신: {}", event.kind());
                        tx.send(event).await.is_ok()
                    }
                    Ok(None) => {
                        debug!("알 수 없는 허브 호출 무시: {target}");
                        true
                    }
                    Err(e) => {
                        warn!("{target} 인자 디코딩 실패, 무시: {e}");
                        true
                    }
                }
            }
            HubMessage::Completion {
                invocation_id,
                error: Some(error),
            } => {
                warn!("허브 호출 실패 (id={invocation_id:?}): {error}");
                true
            }
            HubMessage::Completion { .. } | HubMessage::Ping | HubMessage::Other(_) => true,
            HubMessage::Close { error } => {
                info!("허브가 연결을 종료함: {}", error.unwrap_or_default());
                false
            }
        }
    }

    /// 수신 루프. 종료 시 `tx` 가 드롭되어 이벤트 채널이 닫힌다.
    async fn read_loop(
        mut read: SplitStream<WsStream>,
        pending: Vec<String>,
        tx: mpsc::Sender<PushEvent>,
    ) {
        for frame in &pending {
            if !Self::handle_frame(frame, &tx).await {
                return;
            }
        }

        while let Some(msg) = read.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    for frame in hub_protocol::split_frames(text.as_str()) {
                        if !Self::handle_frame(frame, &tx).await {
                            debug!("허브 수신 루프 종료");
                            return;
                        }
                    }
                }
                Ok(Message::Close(_)) => break,
                Ok(Message::Binary(_)) => debug!("바이너리 허브 메시지 무시"),
                Ok(_) => {} // Ping/Pong은 자동 처리
                Err(e) => {
                    warn!("허브 WebSocket 수신 에러: {e}");
                    break;
                }
            }
        }
        debug!("허브 수신 루프 종료");
    }

    /// 킵얼라이브 루프
    async fn keepalive_loop(write: WsWriter) {
        let mut interval = tokio::time::interval(KEEPALIVE_INTERVAL);
        interval.tick().await;
        loop {
            interval.tick().await;
            let mut sink = write.lock().await;
            if let Err(e) = sink
                .send(Message::Text(hub_protocol::encode_ping().into()))
                .await
            {
                debug!("킵얼라이브 전송 실패, 중단: {e}");
                break;
            }
        }
    }
}

#[async_trait]
impl PushChannel for HubPushClient {
    async fn connect(&self) -> Result<PushConnection, CoreError> {
        let token = self.token_manager.get_token().await?;
        let url = websocket_url(&self.hub_url, &token)?;

        let mut display_url = url.clone();
        display_url.set_query(None);
        info!("푸시 허브 연결: {display_url}");

        let (ws_stream, _) = tokio_tungstenite::connect_async(url.as_str())
            .await
            .map_err(|e| CoreError::Network(format!("허브 연결 실패: {e}")))?;

        let (mut write, mut read) = ws_stream.split();
        write
            .send(Message::Text(hub_protocol::handshake_request().into()))
            .await
            .map_err(|e| CoreError::Network(format!("핸드셰이크 전송 실패: {e}")))?;

        let pending = Self::await_handshake(&mut read).await?;
        debug!("허브 핸드셰이크 완료");

        let write: WsWriter = Arc::new(Mutex::new(write));
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);

        let reader = tokio::spawn(Self::read_loop(read, pending, tx));
        let keepalive = tokio::spawn(Self::keepalive_loop(write.clone()));

        Ok(PushConnection {
            events: rx,
            control: Box::new(HubControl {
                write,
                next_invocation: AtomicU64::new(1),
                tasks: vec![reader, keepalive],
            }),
        })
    }
}

/// 열린 허브 연결의 제어 핸들
struct HubControl {
    write: WsWriter,
    next_invocation: AtomicU64,
    tasks: Vec<JoinHandle<()>>,
}

impl HubControl {
    async fn send_frame(&self, frame: String) -> Result<(), CoreError> {
        let mut sink = self.write.lock().await;
        sink.send(Message::Text(frame.into()))
            .await
            .map_err(|e| CoreError::Network(format!("허브 전송 실패: {e}")))
    }

    async fn group_call(&self, method: &str, group: &str) -> Result<(), CoreError> {
        let id = self.next_invocation.fetch_add(1, Ordering::Relaxed).to_string();
        let frame = hub_protocol::encode_group_call(method, group, &id)?;
        debug!("{method}({group}) 전송");
        self.send_frame(frame).await
    }
}

#[async_trait]
impl PushControl for HubControl {
    async fn join_group(&self, group: &str) -> Result<(), CoreError> {
        self.group_call(hub_protocol::METHOD_JOIN_GROUP, group).await
    }

    async fn leave_group(&self, group: &str) -> Result<(), CoreError> {
        self.group_call(hub_protocol::METHOD_LEAVE_GROUP, group).await
    }

    async fn close(&self) -> Result<(), CoreError> {
        for task in &self.tasks {
            task.abort();
        }
        let mut sink = self.write.lock().await;
        sink.send(Message::Close(None))
            .await
            .map_err(|e| CoreError::Network(format!("허브 종료 실패: {e}")))
    }
}

impl Drop for HubControl {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}
