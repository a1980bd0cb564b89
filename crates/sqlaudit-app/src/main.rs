//! # sqlaudit-app
//!
//! SQLAUDIT 대시보드 헤드리스 실행기.
//! 설정 로드, 인증, 어댑터 와이어링, 동기화 수명 주기 관리.

mod console;
mod lifecycle;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use directories::ProjectDirs;
use sqlaudit_core::config::AppConfig;
use sqlaudit_core::config_manager::{ConfigManager, CONFIG_FILE_NAME};
use sqlaudit_core::models::snapshot::ServerScope;
use sqlaudit_core::ports::push::PushChannel;
use sqlaudit_network::auth::TokenManager;
use sqlaudit_network::http_client::HttpDashboardClient;
use sqlaudit_network::hub_client::HubPushClient;
use sqlaudit_sync::dashboard::Dashboard;
use sqlaudit_sync::events::SyncEvent;
use sqlaudit_sync::scheduler::SyncConfig;
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::lifecycle::LifecycleManager;

const ENV_TOKEN: &str = "SQLAUDIT_TOKEN";
const ENV_USERNAME: &str = "SQLAUDIT_USERNAME";
const ENV_PASSWORD: &str = "SQLAUDIT_PASSWORD";

/// 외부 토큰의 기본 유효 시간 (초)
const EXTERNAL_TOKEN_TTL_SECS: i64 = 3600;

/// `--once` 출력 시 표시할 최대 경고 수
const ONCE_ALERT_LIMIT: usize = 20;

/// SQLAUDIT 대시보드 동기화 클라이언트
///
/// SQL Server 모니터링 백엔드의 스냅샷을 폴링/푸시로 동기화한다.
#[derive(Parser, Debug)]
#[command(name = "sqlaudit")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// 설정 파일 경로 (기본: 플랫폼 설정 디렉토리의 config.json)
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// REST API 기본 URL
    #[arg(long, short = 's')]
    server: Option<String>,

    /// 푸시 허브 URL
    #[arg(long)]
    hub: Option<String>,

    /// 단일 서버 범위 (생략 시 전체 서버)
    #[arg(long)]
    server_id: Option<i64>,

    /// 로그 레벨 (trace, debug, info, warn, error)
    #[arg(long, short = 'l', default_value = "info")]
    log_level: String,

    /// 푸시 채널 비활성화 (폴링만 사용)
    #[arg(long)]
    no_push: bool,

    /// 한 번 풀 후 요약을 출력하고 종료
    #[arg(long)]
    once: bool,
}

/// 설정 파일 경로 결정 (CLI 인자 또는 플랫폼별 기본 경로)
fn resolve_config_path(explicit: Option<PathBuf>) -> PathBuf {
    explicit
        .or_else(|| {
            ProjectDirs::from("com", "sqlaudit", "dashboard")
                .map(|p| p.config_dir().join(CONFIG_FILE_NAME))
        })
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME))
}

/// 파일 → 환경 변수 → CLI 순으로 설정 적용
fn load_config(args: &Args) -> Result<AppConfig> {
    let path = resolve_config_path(args.config.clone());
    let mut config = match ConfigManager::with_path(path.clone()) {
        Ok(manager) => {
            info!("설정 파일: {}", manager.config_path().display());
            manager.get()
        }
        Err(e) => {
            warn!("설정 파일 로드 실패 ({}), 기본 설정 사용: {}", path.display(), e);
            AppConfig::default_config()
        }
    };

    config.apply_env_overrides(|key| std::env::var(key).ok());

    if let Some(ref server) = args.server {
        config.server.base_url = server.clone();
    }
    if let Some(ref hub) = args.hub {
        config.server.hub_url = hub.clone();
    }
    if args.no_push {
        config.dashboard.push_enabled = false;
    }

    config
        .validate()
        .map_err(|e| anyhow!("설정 검증 실패: {}", e))?;
    Ok(config)
}

/// 외부 토큰이 있으면 사용하고, 없으면 계정으로 로그인
async fn authenticate(tokens: &TokenManager) -> Result<()> {
    if let Ok(token) = std::env::var(ENV_TOKEN) {
        tokens.set_token(token, EXTERNAL_TOKEN_TTL_SECS).await;
        info!("외부 토큰 사용 ({})", ENV_TOKEN);
        return Ok(());
    }

    let username = std::env::var(ENV_USERNAME)
        .map_err(|_| anyhow!("{} 또는 {}/{} 환경 변수가 필요합니다", ENV_TOKEN, ENV_USERNAME, ENV_PASSWORD))?;
    let password = std::env::var(ENV_PASSWORD)
        .map_err(|_| anyhow!("{} 환경 변수가 필요합니다", ENV_PASSWORD))?;

    let user = tokens
        .login(&username, &password)
        .await
        .map_err(|e| anyhow!("로그인 실패: {}", e))?;
    info!("로그인: {}", user.display_name());
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_filter = format!(
        "sqlaudit={0},sqlaudit_app={0},sqlaudit_core={0},sqlaudit_network={0},sqlaudit_sync={0}",
        args.log_level
    );
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_filter)),
        )
        .init();

    info!("SQLAUDIT 대시보드 클라이언트 시작");

    let config = load_config(&args)?;
    info!(
        "서버: {}, 허브: {}, 푸시: {}",
        config.server.base_url, config.server.hub_url, config.dashboard.push_enabled
    );

    // ── 어댑터 생성 (DI 와이어링) ──

    let tokens = Arc::new(TokenManager::new(&config.server.base_url));
    authenticate(&tokens).await?;

    let api = HttpDashboardClient::new(&config.server.base_url, tokens.clone(), config.request_timeout())
        .context("HTTP 클라이언트 생성 실패")?
        .with_max_retries(config.server.max_retries);

    let push: Option<Arc<dyn PushChannel>> = if config.dashboard.push_enabled {
        Some(Arc::new(HubPushClient::new(&config.server.hub_url, tokens.clone())))
    } else {
        None
    };

    let dashboard = Arc::new(Dashboard::new(
        SyncConfig::from_app_config(&config),
        Arc::new(api),
        push,
    ));
    let scope = ServerScope::from_server_id(args.server_id);

    // ── 단발 모드 ──

    if args.once {
        dashboard.set_scope(scope);
        let outcome = dashboard
            .refresh_now()
            .await
            .map_err(|e| anyhow!("풀 실패: {}", e))?;
        info!("풀 결과: {:?}", outcome);

        let snapshot = dashboard.snapshot();
        println!(
            "{}",
            console::summary_line(&snapshot, *dashboard.health().borrow(), dashboard.push_status())
        );
        for line in console::open_alert_lines(&snapshot, chrono::Utc::now(), ONCE_ALERT_LIMIT) {
            println!("  {line}");
        }
        tokens.logout().await;
        return Ok(());
    }

    // ── 상시 동기화 ──

    let lifecycle = Arc::new(LifecycleManager::new());
    dashboard.start(scope);

    // 스냅샷 변경 로그
    {
        let dashboard = dashboard.clone();
        let mut snapshots = dashboard.subscribe();
        let mut shutdown_rx = lifecycle.subscribe();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    changed = snapshots.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let snapshot = snapshots.borrow_and_update().clone();
                        info!(
                            "{}",
                            console::summary_line(
                                &snapshot,
                                *dashboard.health().borrow(),
                                dashboard.push_status(),
                            )
                        );
                    }
                    _ = shutdown_rx.changed() => break,
                }
            }
        });
    }

    // 동기화 이벤트 로그 + 인증 만료 시 종료
    {
        let mut events = dashboard.events();
        let lifecycle = lifecycle.clone();
        let mut shutdown_rx = lifecycle.subscribe();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    received = events.recv() => match received {
                        Ok(event) => {
                            let text = console::describe_event(&event);
                            match event {
                                SyncEvent::AuthenticationRequired { .. } => {
                                    error!("{}", text);
                                    lifecycle.shutdown();
                                    break;
                                }
                                SyncEvent::PullFailed { .. } | SyncEvent::PayloadRejected { .. } => {
                                    warn!("{}", text);
                                }
                                _ => info!("{}", text),
                            }
                        }
                        Err(RecvError::Lagged(skipped)) => {
                            warn!("이벤트 {}개 누락", skipped);
                        }
                        Err(RecvError::Closed) => break,
                    },
                    _ = shutdown_rx.changed() => break,
                }
            }
        });
    }

    lifecycle.wait().await.context("시그널 대기 실패")?;

    info!("동기화 중지 중...");
    dashboard.stop().await;
    tokens.logout().await;
    info!("SQLAUDIT 대시보드 클라이언트 종료");
    Ok(())
}
