//! JWT 인증 토큰 관리.
//!
//! 대시보드 서버 로그인, 토큰 갱신, 만료 관리를 담당한다.
//! 요청 어댑터는 [`TokenManager::get_token`] 만 사용하며, 인증 실패를 재시도하지 않는다.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlaudit_core::error::CoreError;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// 만료 전 자동 갱신 여유 시간 (분)
const REFRESH_MARGIN_MINUTES: i64 = 5;

/// 서버가 만료 시간을 주지 않을 때 기본값 (초)
const DEFAULT_EXPIRES_IN_SECS: i64 = 3600;

/// 로그인 사용자 정보
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "userID")]
    pub user_id: i64,
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub role: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub full_name: Option<String>,
}

impl User {
    /// 표시 이름 (fullName → 이름 조합 → username)
    pub fn display_name(&self) -> String {
        if let Some(full) = self.full_name.as_ref().filter(|s| !s.is_empty()) {
            return full.clone();
        }
        match (&self.first_name, &self.last_name) {
            (Some(first), Some(last)) => format!("{first} {last}"),
            _ => self.username.clone(),
        }
    }
}

/// 로그인 요청 본문
#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

/// 서버 응답 (로그인/리프레시)
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    token: Option<String>,
    user: Option<User>,
    expires_in: Option<i64>,
    success: Option<bool>,
}

/// 내부 토큰 상태
#[derive(Debug, Clone)]
struct TokenState {
    access_token: String,
    expires_at: DateTime<Utc>,
    user: Option<User>,
}

/// JWT 토큰 매니저 (로그인/갱신/만료 관리)
#[derive(Clone)]
pub struct TokenManager {
    base_url: String,
    client: reqwest::Client,
    state: Arc<RwLock<Option<TokenState>>>,
}

impl TokenManager {
    /// 새 토큰 매니저 생성
    ///
    /// `base_url` 은 REST API 루트 (예: "https://localhost:7001/api").
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
            state: Arc::new(RwLock::new(None)),
        }
    }

    /// 사용자 이름/비밀번호 로그인 → JWT 토큰 획득
    pub async fn login(&self, username: &str, password: &str) -> Result<User, CoreError> {
        let url = format!("{}/auth/login", self.base_url);
        let resp = self
            .client
            .post(&url)
            .json(&LoginRequest { username, password })
            .send()
            .await
            .map_err(|e| CoreError::Auth(format!("로그인 요청 실패: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(CoreError::Auth(format!("로그인 실패 ({status}): {text}")));
        }

        let login: LoginResponse = resp
            .json()
            .await
            .map_err(|e| CoreError::Auth(format!("로그인 응답 파싱 실패: {e}")))?;

        let state = Self::state_from_response(login, None)?;
        let user = state
            .user
            .clone()
            .ok_or_else(|| CoreError::Auth("로그인 응답에 사용자 정보 없음".to_string()))?;

        info!("로그인 성공: {} (만료 {})", user.username, state.expires_at);
        *self.state.write().await = Some(state);
        Ok(user)
    }

    /// 토큰 갱신 (현재 토큰을 Bearer로 전송)
    pub async fn refresh(&self) -> Result<(), CoreError> {
        let current = self
            .state
            .read()
            .await
            .clone()
            .ok_or_else(|| CoreError::Auth("인증되지 않음".to_string()))?;

        let url = format!("{}/auth/refresh", self.base_url);
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&current.access_token)
            .send()
            .await
            .map_err(|e| CoreError::Auth(format!("토큰 갱신 요청 실패: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(CoreError::Auth(format!(
                "토큰 갱신 실패 ({status}): {text}"
            )));
        }

        let refreshed: LoginResponse = resp
            .json()
            .await
            .map_err(|e| CoreError::Auth(format!("갱신 응답 파싱 실패: {e}")))?;

        let state = Self::state_from_response(refreshed, current.user)?;
        debug!("토큰 갱신 성공, 새 만료: {}", state.expires_at);
        *self.state.write().await = Some(state);
        Ok(())
    }

    /// 외부에서 발급받은 토큰 설정 (환경 변수 등)
    pub async fn set_token(&self, token: impl Into<String>, expires_in_secs: i64) {
        let expires_at = Utc::now() + Duration::seconds(expires_in_secs);
        *self.state.write().await = Some(TokenState {
            access_token: token.into(),
            expires_at,
            user: None,
        });
        debug!("외부 토큰 설정, 만료: {expires_at}");
    }

    /// 유효한 액세스 토큰 반환 (만료 임박 시 자동 갱신)
    pub async fn get_token(&self) -> Result<String, CoreError> {
        let needs_refresh = {
            let state = self.state.read().await;
            match &*state {
                Some(s) => Utc::now() + Duration::minutes(REFRESH_MARGIN_MINUTES) >= s.expires_at,
                None => return Err(CoreError::Auth("인증되지 않음".to_string())),
            }
        };

        if needs_refresh {
            if let Err(e) = self.refresh().await {
                warn!("자동 토큰 갱신 실패: {e}");
            }
        }

        let state = self.state.read().await;
        match &*state {
            Some(s) if Utc::now() < s.expires_at => Ok(s.access_token.clone()),
            Some(_) => Err(CoreError::Auth("토큰 만료됨".to_string())),
            None => Err(CoreError::Auth("인증되지 않음".to_string())),
        }
    }

    /// 로그인된 사용자
    pub async fn current_user(&self) -> Option<User> {
        self.state.read().await.as_ref().and_then(|s| s.user.clone())
    }

    /// 로그아웃 (로컬 토큰 폐기)
    pub async fn logout(&self) {
        *self.state.write().await = None;
        debug!("로그아웃 완료");
    }

    /// 현재 인증 상태 확인
    pub async fn is_authenticated(&self) -> bool {
        let state = self.state.read().await;
        state.as_ref().is_some_and(|s| Utc::now() < s.expires_at)
    }

    fn state_from_response(
        resp: LoginResponse,
        previous_user: Option<User>,
    ) -> Result<TokenState, CoreError> {
        if resp.success == Some(false) {
            return Err(CoreError::Auth("서버가 인증을 거부함".to_string()));
        }
        let access_token = resp
            .token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| CoreError::Auth("응답에 토큰 없음".to_string()))?;
        let expires_at =
            Utc::now() + Duration::seconds(resp.expires_in.unwrap_or(DEFAULT_EXPIRES_IN_SECS));
        Ok(TokenState {
            access_token,
            expires_at,
            user: resp.user.or(previous_user),
        })
    }
}
