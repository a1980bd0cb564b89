//! # sqlaudit-network
//!
//! 대시보드 서버와의 REST API, 실시간 푸시 허브 통신을 담당하는 어댑터.
//! JWT 인증 토큰 관리와 조회 요청 재시도를 포함한다.
//!
//! ## 사용 예시
//!
//! ```rust,ignore
//! use sqlaudit_network::auth::TokenManager;
//! use sqlaudit_network::http_client::HttpDashboardClient;
//! use sqlaudit_network::hub_client::HubPushClient;
//!
//! let tokens = Arc::new(TokenManager::new(&config.server.base_url));
//! tokens.login("dba", &password).await?;
//! let api = HttpDashboardClient::new(&config.server.base_url, tokens.clone(), config.request_timeout())?;
//! let push = HubPushClient::new(&config.server.hub_url, tokens);
//! ```

pub mod auth;
pub mod http_client;
pub mod hub_client;
pub mod hub_protocol;
