//! 라이프사이클 관리.
//!
//! 종료 신호 전파와 OS 시그널 대기.

use tokio::sync::watch;
use tracing::info;

/// 라이프사이클 관리자
pub struct LifecycleManager {
    shutdown_tx: watch::Sender<bool>,
}

impl LifecycleManager {
    pub fn new() -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self { shutdown_tx }
    }

    /// 종료 수신기
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.shutdown_tx.subscribe()
    }

    /// 종료 신호 발송 (여러 번 호출해도 한 번만 알림)
    pub fn shutdown(&self) {
        let sent = self.shutdown_tx.send_if_modified(|down| {
            let first = !*down;
            *down = true;
            first
        });
        if sent {
            info!("종료 신호 발송");
        }
    }

    pub fn is_shutdown(&self) -> bool {
        *self.shutdown_tx.borrow()
    }

    /// OS 시그널(SIGINT, SIGTERM / Ctrl+C) 또는 내부 종료 신호 대기
    pub async fn wait(&self) -> std::io::Result<()> {
        let mut shutdown_rx = self.subscribe();
        if *shutdown_rx.borrow_and_update() {
            return Ok(());
        }

        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            let mut sigint = signal(SignalKind::interrupt())?;
            let mut sigterm = signal(SignalKind::terminate())?;

            tokio::select! {
                _ = sigint.recv() => info!("SIGINT 수신"),
                _ = sigterm.recv() => info!("SIGTERM 수신"),
                _ = shutdown_rx.changed() => {}
            }
        }

        #[cfg(not(unix))]
        {
            tokio::select! {
                result = tokio::signal::ctrl_c() => {
                    result?;
                    info!("Ctrl+C 수신");
                }
                _ = shutdown_rx.changed() => {}
            }
        }

        self.shutdown();
        Ok(())
    }
}

impl Default for LifecycleManager {
    fn default() -> Self {
        Self::new()
    }
}
