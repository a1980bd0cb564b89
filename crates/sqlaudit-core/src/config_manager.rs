//! 설정 파일 관리.
//!
//! 대시보드 설정을 JSON 파일 하나로 보관한다. 기본 경로 결정은 바이너리가 담당한다.
//! 디스크에 쓰는 설정은 항상 검증을 통과한 것이며, 임시 파일에 쓴 뒤 교체한다.

use crate::config::AppConfig;
use crate::error::CoreError;
use parking_lot::RwLock;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// 설정 파일 이름
pub const CONFIG_FILE_NAME: &str = "config.json";

/// 대시보드 설정 저장소
#[derive(Debug, Clone)]
pub struct ConfigManager {
    current: Arc<RwLock<AppConfig>>,
    path: PathBuf,
}

impl ConfigManager {
    /// 파일에서 설정을 읽는다. 파일이 없으면 기본 설정을 써 둔다.
    pub fn with_path(path: PathBuf) -> Result<Self, CoreError> {
        ensure_parent_dir(&path)?;

        let initial = match path.try_exists() {
            Ok(true) => read_config(&path)?,
            Ok(false) => {
                let defaults = AppConfig::default_config();
                write_config(&path, &defaults)?;
                info!("기본 대시보드 설정 작성: {}", path.display());
                defaults
            }
            Err(e) => return Err(config_io("설정 파일 확인", &path, e)),
        };

        Ok(Self {
            current: Arc::new(RwLock::new(initial)),
            path,
        })
    }

    /// `dir/config.json` 사용
    pub fn in_dir(dir: &Path) -> Result<Self, CoreError> {
        Self::with_path(dir.join(CONFIG_FILE_NAME))
    }

    pub fn get(&self) -> AppConfig {
        self.current.read().clone()
    }

    pub fn config_path(&self) -> &Path {
        &self.path
    }

    /// 설정 전체 교체. 검증 실패 시 메모리와 파일 모두 그대로 둔다.
    pub fn update(&self, next: AppConfig) -> Result<(), CoreError> {
        next.validate()?;
        let mut current = self.current.write();
        write_config(&self.path, &next)?;
        *current = next;
        debug!("대시보드 설정 저장: {}", self.path.display());
        Ok(())
    }

    /// 현재 설정을 수정해 저장하고 저장된 값을 반환
    ///
    /// 읽기-수정-쓰기 동안 쓰기 잠금을 유지하므로 동시 수정이 서로를 덮어쓰지 않는다.
    pub fn update_with<F>(&self, edit: F) -> Result<AppConfig, CoreError>
    where
        F: FnOnce(&mut AppConfig),
    {
        let mut current = self.current.write();
        let mut next = current.clone();
        edit(&mut next);
        next.validate()?;
        write_config(&self.path, &next)?;
        *current = next.clone();
        Ok(next)
    }

    /// 외부에서 수정된 파일 다시 읽기
    pub fn reload(&self) -> Result<(), CoreError> {
        let fresh = read_config(&self.path)?;
        *self.current.write() = fresh;
        info!("대시보드 설정 다시 읽음: {}", self.path.display());
        Ok(())
    }
}

fn config_io(action: &str, path: &Path, e: std::io::Error) -> CoreError {
    CoreError::Config(format!("{action} 실패: {}: {e}", path.display()))
}

fn ensure_parent_dir(path: &Path) -> Result<(), CoreError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() && !parent.exists() => {
            fs::create_dir_all(parent).map_err(|e| config_io("설정 디렉토리 생성", parent, e))?;
            info!("설정 디렉토리 생성: {}", parent.display());
            Ok(())
        }
        _ => Ok(()),
    }
}

/// 읽기 + 파싱 + 검증
fn read_config(path: &Path) -> Result<AppConfig, CoreError> {
    let raw = fs::read_to_string(path).map_err(|e| config_io("설정 파일 읽기", path, e))?;
    let parsed: AppConfig = serde_json::from_str(&raw)
        .map_err(|e| CoreError::Config(format!("설정 파일 파싱 실패: {}: {e}", path.display())))?;
    parsed.validate()?;
    Ok(parsed)
}

/// `<path>.tmp` 에 쓴 뒤 rename
fn write_config(path: &Path, config: &AppConfig) -> Result<(), CoreError> {
    let body = serde_json::to_vec_pretty(config)
        .map_err(|e| CoreError::Config(format!("설정 직렬화 실패: {e}")))?;

    let mut staging = path.as_os_str().to_owned();
    staging.push(".tmp");
    let staging = PathBuf::from(staging);

    fs::write(&staging, body).map_err(|e| config_io("임시 설정 파일 쓰기", &staging, e))?;
    fs::rename(&staging, path).map_err(|e| config_io("설정 파일 교체", path, e))
}
