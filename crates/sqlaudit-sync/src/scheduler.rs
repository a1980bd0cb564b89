//! 풀/푸시 스케줄러.
//!
//! 상태: Idle → Running → Idle. Running 안에서 푸시 채널은 Connected / Reconnecting 을 오간다.
//!
//! - 풀 루프: 고정 주기로 개요와 서버 목록을 가져와 병합한다. 경고 전용 주기가 설정되면
//!   경고만 가져오는 루프를 하나 더 돌린다.
//! - 푸시 감독 루프: 연결, 그룹 구독, 이벤트 병합, 끊기면 지수 백오프로 무한 재연결.
//! - 범위 변경: 풀 루프만 새 범위로 다시 시작하고, 푸시 연결은 유지한 채 그룹만 갈아탄다.
//!
//! 시작/중지/범위 변경마다 세대가 증가하므로 그 전에 출발한 풀 결과는 병합되지 않는다.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use sqlaudit_core::config::AppConfig;
use sqlaudit_core::error::CoreError;
use sqlaudit_core::models::snapshot::ServerScope;
use sqlaudit_core::ports::api_client::DashboardApi;
use sqlaudit_core::ports::push::{PushChannel, PushConnection};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::connectivity::{PullHealth, PushStatus, DEFAULT_OFFLINE_THRESHOLD};
use crate::events::{SyncEvent, SyncEventBus};
use crate::reconcile::{AlertsPullResult, MergeOutcome, PullResult, ReconciliationEngine};

/// 푸시 재연결 초기 대기
const INITIAL_PUSH_BACKOFF: Duration = Duration::from_secs(1);

/// 중지 시 푸시 연결 정리 대기 한도
const PUSH_SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// 동기화 설정
///
/// 시작 시 한 번 만들어 생성자에 넘긴다. 바꾸려면 스케줄러를 다시 만든다.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncConfig {
    /// 전체 풀 주기
    pub refresh_interval: Duration,
    /// 경고 전용 풀 주기 (None이면 비활성)
    pub alerts_refresh_interval: Option<Duration>,
    /// 실시간 푸시 사용 여부
    pub push_enabled: bool,
    /// 푸시 재연결 최대 대기
    pub push_max_backoff: Duration,
    /// 차트 기본 조회 기간 (시간)
    pub default_chart_hours: u32,
    /// 차트 최대 점 개수
    pub max_chart_points: usize,
    /// 보안 이벤트 페이지 크기
    pub security_page_size: u32,
    /// 오프라인 표시 임계값 (연속 풀 실패 횟수)
    pub offline_threshold: u64,
}

impl SyncConfig {
    /// 앱 설정에서 생성
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            refresh_interval: config.refresh_interval(),
            alerts_refresh_interval: config.alerts_refresh_interval(),
            push_enabled: config.dashboard.push_enabled,
            push_max_backoff: Duration::from_secs(config.server.push_max_retry_secs.max(1)),
            default_chart_hours: config.dashboard.default_chart_hours,
            max_chart_points: config.dashboard.max_chart_points,
            security_page_size: config.dashboard.security_page_size,
            offline_threshold: DEFAULT_OFFLINE_THRESHOLD,
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::from_app_config(&AppConfig::default_config())
    }
}

/// 스케줄러 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running { scope: ServerScope },
}

/// 실행 중 자원
struct Running {
    scope: ServerScope,
    shutdown_tx: watch::Sender<bool>,
    scope_tx: watch::Sender<ServerScope>,
    pull_tasks: Vec<JoinHandle<()>>,
    push_task: Option<JoinHandle<()>>,
}

/// 풀 한 번에 필요한 협력자 묶음
#[derive(Clone)]
struct Puller {
    api: Arc<dyn DashboardApi>,
    engine: Arc<ReconciliationEngine>,
    health: Arc<PullHealth>,
    events: Arc<SyncEventBus>,
}

#[derive(Debug, Clone, Copy)]
enum PullKind {
    Full,
    Alerts,
}

impl PullKind {
    fn name(self) -> &'static str {
        match self {
            PullKind::Full => "pull",
            PullKind::Alerts => "alerts pull",
        }
    }
}

impl Puller {
    /// 개요와 서버 목록을 동시에 받아 병합
    async fn pull_full(&self, generation: u64, scope: ServerScope) -> Result<MergeOutcome, CoreError> {
        let (overview, servers) =
            futures::try_join!(self.api.fetch_overview(scope), self.api.fetch_servers())?;
        Ok(self.engine.merge_pull(PullResult {
            generation,
            scope,
            overview,
            servers: Some(servers),
            received_at: Utc::now(),
        }))
    }

    async fn pull_alerts(&self, generation: u64, scope: ServerScope) -> Result<MergeOutcome, CoreError> {
        let alerts = self.api.fetch_alerts(scope).await?;
        Ok(self.engine.merge_alerts_pull(AlertsPullResult {
            generation,
            scope,
            alerts,
            received_at: Utc::now(),
        }))
    }

    async fn pull(&self, kind: PullKind, generation: u64, scope: ServerScope) -> Result<MergeOutcome, CoreError> {
        match kind {
            PullKind::Full => self.pull_full(generation, scope).await,
            PullKind::Alerts => self.pull_alerts(generation, scope).await,
        }
    }

    /// 풀 결과 기록. 루프를 계속할지 반환한다.
    ///
    /// 인증 실패는 재시도하지 않고 루프를 멈춘다. 응답 본문 해석 실패는 페이로드 거부로 본다.
    fn record(&self, kind: PullKind, result: &Result<MergeOutcome, CoreError>) -> bool {
        match result {
            Ok(outcome) => {
                self.health.record_success();
                debug!("{} 결과: {:?}", kind.name(), outcome);
                true
            }
            Err(e) if e.is_auth() => {
                warn!("{} 인증 실패, 풀 중단: {e}", kind.name());
                self.events.publish(SyncEvent::AuthenticationRequired {
                    message: e.to_string(),
                });
                false
            }
            Err(CoreError::Serialization(e)) => {
                warn!("{} 응답 해석 실패, 스냅샷 유지: {e}", kind.name());
                self.events.publish(SyncEvent::PayloadRejected {
                    source: kind.name(),
                    reason: e.to_string(),
                });
                true
            }
            Err(e) => {
                warn!("{} 실패, 마지막 스냅샷 유지: {e}", kind.name());
                self.health.record_failure();
                self.events.publish(SyncEvent::PullFailed {
                    message: e.to_string(),
                });
                true
            }
        }
    }
}

/// 풀/푸시 스케줄러
pub struct Scheduler {
    config: SyncConfig,
    puller: Puller,
    push: Option<Arc<dyn PushChannel>>,
    state_tx: watch::Sender<SchedulerState>,
    push_status_tx: Arc<watch::Sender<PushStatus>>,
    running: Mutex<Option<Running>>,
}

impl Scheduler {
    /// 새 스케줄러 생성 (Idle)
    ///
    /// `push` 가 None 이거나 설정에서 비활성이면 풀만 돌린다.
    pub fn new(
        config: SyncConfig,
        engine: Arc<ReconciliationEngine>,
        api: Arc<dyn DashboardApi>,
        push: Option<Arc<dyn PushChannel>>,
        events: Arc<SyncEventBus>,
    ) -> Self {
        let health = Arc::new(PullHealth::new(config.offline_threshold));
        let (state_tx, _) = watch::channel(SchedulerState::Idle);
        let (push_status_tx, _) = watch::channel(PushStatus::Disabled);
        Self {
            config,
            puller: Puller {
                api,
                engine,
                health,
                events,
            },
            push,
            state_tx,
            push_status_tx: Arc::new(push_status_tx),
            running: Mutex::new(None),
        }
    }

    pub fn state(&self) -> SchedulerState {
        *self.state_tx.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<SchedulerState> {
        self.state_tx.subscribe()
    }

    pub fn push_status(&self) -> PushStatus {
        *self.push_status_tx.borrow()
    }

    pub fn subscribe_push_status(&self) -> watch::Receiver<PushStatus> {
        self.push_status_tx.subscribe()
    }

    /// 풀 상태 추적기
    pub fn health(&self) -> &Arc<PullHealth> {
        &self.puller.health
    }

    /// 풀 주기와 푸시 구독 시작
    ///
    /// tokio 런타임 안에서 호출해야 한다. 이미 실행 중이면 `set_scope` 와 같다.
    /// 인증 실패로 멈춘 풀 루프도 이때 다시 띄운다.
    pub fn start(&self, scope: ServerScope) {
        let mut running = self.running.lock();
        if running.is_some() {
            drop(running);
            self.set_scope(scope);
            return;
        }

        let generation = self.puller.engine.gate().advance();
        self.puller.engine.store().set_scope(scope);

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (scope_tx, scope_rx) = watch::channel(scope);

        let pull_tasks = self.spawn_pull_loops(generation, scope, &shutdown_rx);
        let push_task = match (&self.push, self.config.push_enabled) {
            (Some(channel), true) => Some(tokio::spawn(run_push_supervisor(
                channel.clone(),
                self.puller.engine.clone(),
                self.puller.events.clone(),
                self.push_status_tx.clone(),
                scope_rx,
                shutdown_rx,
                self.config.push_max_backoff,
            ))),
            _ => {
                info!("푸시 비활성, 주기적 풀만 사용");
                None
            }
        };

        *running = Some(Running {
            scope,
            shutdown_tx,
            scope_tx,
            pull_tasks,
            push_task,
        });
        self.state_tx.send_replace(SchedulerState::Running { scope });
        info!(
            "스케줄러 시작: 범위={scope}, 풀 주기={}ms, gen={generation}",
            self.config.refresh_interval.as_millis()
        );
    }

    /// 풀 주기와 푸시 구독 중지
    ///
    /// 진행 중인 풀은 취소되고, 이미 응답을 받았더라도 세대가 바뀌었으므로 병합되지 않는다.
    pub async fn stop(&self) {
        let running = {
            let mut guard = self.running.lock();
            if guard.is_none() {
                return;
            }
            // 태스크 정리 전에 세대 증가
            self.puller.engine.gate().advance();
            guard.take()
        };
        let Some(running) = running else {
            return;
        };

        let _ = running.shutdown_tx.send(true);
        for task in &running.pull_tasks {
            task.abort();
        }
        if let Some(mut task) = running.push_task {
            if tokio::time::timeout(PUSH_SHUTDOWN_GRACE, &mut task).await.is_err() {
                warn!("푸시 연결 정리 시간 초과, 강제 종료");
                task.abort();
            }
        }

        self.set_push_status(PushStatus::Disabled);
        self.state_tx.send_replace(SchedulerState::Idle);
        info!("스케줄러 중지 (범위={})", running.scope);
    }

    /// 활성 범위 변경
    ///
    /// Running 이면 풀 루프를 새 범위로 다시 시작하고 (즉시 한 번 풀), 푸시 연결은 유지한 채
    /// 구독 그룹만 바꾼다. 스냅샷 컬렉션은 다음 풀 병합까지 그대로 둔다.
    /// 범위가 같아도 끝난 풀 루프(인증 실패)가 있으면 다시 시작한다.
    pub fn set_scope(&self, scope: ServerScope) {
        let mut guard = self.running.lock();
        let Some(running) = guard.as_mut() else {
            self.puller.engine.store().set_scope(scope);
            return;
        };
        let stalled = running.pull_tasks.iter().any(|task| task.is_finished());
        if running.scope == scope && !stalled {
            return;
        }
        if stalled {
            info!("멈춘 풀 루프 재시작 (범위={scope})");
        }

        let generation = self.puller.engine.gate().advance();
        for task in running.pull_tasks.drain(..) {
            task.abort();
        }
        self.puller.engine.store().set_scope(scope);

        let shutdown_rx = running.shutdown_tx.subscribe();
        running.pull_tasks = self.spawn_pull_loops(generation, scope, &shutdown_rx);
        running.scope = scope;
        let _ = running.scope_tx.send(scope);

        self.state_tx.send_replace(SchedulerState::Running { scope });
        info!("범위 변경: {scope} (gen={generation})");
    }

    /// 즉시 전체 풀 한 번
    ///
    /// Idle 상태에서도 동작한다. 결과는 주기 풀과 같은 규칙으로 기록된다.
    pub async fn refresh_now(&self) -> Result<MergeOutcome, CoreError> {
        let generation = self.puller.engine.gate().current();
        let scope = self.puller.engine.store().scope();
        let result = self.puller.pull(PullKind::Full, generation, scope).await;
        self.puller.record(PullKind::Full, &result);
        result
    }

    fn spawn_pull_loops(
        &self,
        generation: u64,
        scope: ServerScope,
        shutdown_rx: &watch::Receiver<bool>,
    ) -> Vec<JoinHandle<()>> {
        let mut tasks = vec![spawn_pull_loop(
            self.puller.clone(),
            PullKind::Full,
            self.config.refresh_interval,
            Instant::now(),
            generation,
            scope,
            shutdown_rx.clone(),
        )];
        if let Some(period) = self.config.alerts_refresh_interval {
            // 시작 직후 전체 풀이 경고도 가져오므로 첫 주기 뒤부터
            tasks.push(spawn_pull_loop(
                self.puller.clone(),
                PullKind::Alerts,
                period,
                Instant::now() + period,
                generation,
                scope,
                shutdown_rx.clone(),
            ));
        }
        tasks
    }

    fn set_push_status(&self, status: PushStatus) {
        set_push_status(&self.push_status_tx, &self.puller.events, status);
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        if let Some(running) = self.running.get_mut().take() {
            let _ = running.shutdown_tx.send(true);
            for task in running.pull_tasks {
                task.abort();
            }
            if let Some(task) = running.push_task {
                task.abort();
            }
        }
    }
}

// ============================================================
// 풀 루프
// ============================================================

fn spawn_pull_loop(
    puller: Puller,
    kind: PullKind,
    period: Duration,
    first_tick: Instant,
    generation: u64,
    scope: ServerScope,
    mut shutdown_rx: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval_at(first_tick, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let result = puller.pull(kind, generation, scope).await;
                    if !puller.record(kind, &result) {
                        break;
                    }
                }
                _ = shutdown_rx.changed() => {
                    break;
                }
            }
        }
        debug!("{} 루프 종료 (gen={generation})", kind.name());
    })
}

// ============================================================
// 푸시 감독 루프
// ============================================================

enum PumpExit {
    Shutdown,
    Dropped,
}

fn set_push_status(tx: &watch::Sender<PushStatus>, events: &SyncEventBus, status: PushStatus) {
    let changed = tx.send_if_modified(|current| {
        let changed = *current != status;
        *current = status;
        changed
    });
    if changed {
        events.publish(SyncEvent::PushStatusChanged(status));
    }
}

async fn run_push_supervisor(
    channel: Arc<dyn PushChannel>,
    engine: Arc<ReconciliationEngine>,
    events: Arc<SyncEventBus>,
    status_tx: Arc<watch::Sender<PushStatus>>,
    mut scope_rx: watch::Receiver<ServerScope>,
    mut shutdown_rx: watch::Receiver<bool>,
    max_backoff: Duration,
) {
    let mut backoff = INITIAL_PUSH_BACKOFF;
    let mut attempt: u64 = 0;

    loop {
        set_push_status(&status_tx, &events, PushStatus::Reconnecting);
        attempt += 1;

        let connected = tokio::select! {
            result = channel.connect() => result,
            _ = shutdown_rx.changed() => break,
        };

        match connected {
            Ok(connection) => {
                let scope = *scope_rx.borrow_and_update();
                match connection.control.join_group(&scope.group_name()).await {
                    Ok(()) => {
                        info!("푸시 구독 시작: {} (시도 {attempt})", scope.group_name());
                        set_push_status(&status_tx, &events, PushStatus::Connected);
                        backoff = INITIAL_PUSH_BACKOFF;
                        attempt = 0;
                        match pump(connection, &engine, scope, &mut scope_rx, &mut shutdown_rx).await {
                            PumpExit::Shutdown => break,
                            PumpExit::Dropped => warn!("푸시 연결 끊김, 재연결 대기"),
                        }
                    }
                    Err(e) => {
                        warn!("푸시 그룹 구독 실패: {e}");
                        let _ = connection.control.close().await;
                    }
                }
            }
            Err(e) if e.is_auth() => {
                warn!("푸시 인증 실패, 푸시 중단 (풀은 계속): {e}");
                events.publish(SyncEvent::AuthenticationRequired {
                    message: e.to_string(),
                });
                break;
            }
            Err(e) => {
                warn!("푸시 연결 실패 (시도 {attempt}, {}초 후 재시도): {e}", backoff.as_secs());
            }
        }

        set_push_status(&status_tx, &events, PushStatus::Reconnecting);
        tokio::select! {
            _ = tokio::time::sleep(backoff) => {}
            _ = shutdown_rx.changed() => break,
        }
        backoff = (backoff * 2).min(max_backoff);
    }

    set_push_status(&status_tx, &events, PushStatus::Disabled);
    debug!("푸시 감독 루프 종료");
}

/// 연결 하나에서 이벤트를 받아 병합
///
/// 이벤트 채널이 닫히면 `Dropped`, 종료 신호를 받으면 연결을 닫고 `Shutdown`.
async fn pump(
    mut connection: PushConnection,
    engine: &ReconciliationEngine,
    mut joined: ServerScope,
    scope_rx: &mut watch::Receiver<ServerScope>,
    shutdown_rx: &mut watch::Receiver<bool>,
) -> PumpExit {
    loop {
        tokio::select! {
            event = connection.events.recv() => {
                let Some(event) = event else {
                    return PumpExit::Dropped;
                };
                let kind = event.kind();
                let outcome = engine.merge_push(event, Utc::now());
                debug!("푸시 {kind} 병합: {:?}", outcome);
            }
            changed = scope_rx.changed() => {
                if changed.is_err() {
                    let _ = connection.control.close().await;
                    return PumpExit::Shutdown;
                }
                let next = *scope_rx.borrow_and_update();
                if next == joined {
                    continue;
                }
                if let Err(e) = connection.control.leave_group(&joined.group_name()).await {
                    warn!("푸시 그룹 해제 실패: {e}");
                }
                if let Err(e) = connection.control.join_group(&next.group_name()).await {
                    warn!("푸시 그룹 재구독 실패, 재연결: {e}");
                    let _ = connection.control.close().await;
                    return PumpExit::Dropped;
                }
                info!("푸시 그룹 변경: {} → {}", joined.group_name(), next.group_name());
                joined = next;
            }
            _ = shutdown_rx.changed() => {
                let _ = connection.control.close().await;
                return PumpExit::Shutdown;
            }
        }
    }
}
