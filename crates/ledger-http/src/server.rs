//! Read-only introspection surface served to peers doing recipient
//! reachability / root-config lookups. Exactly the two routes the
//! reference service exposes, with the same headers and status codes.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use ledger_core::AccountKey;
use ledger_store::AccountStore;
use tower_http::cors::{Any, CorsLayer};

pub struct HttpServerState {
    pub store: Arc<AccountStore>,
}

pub struct HttpServer {
    state: Arc<HttpServerState>,
}

fn plain_text_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("max-age=86400"),
    );
    headers
}

async fn is_reachable_account(
    State(state): State<Arc<HttpServerState>>,
    Path((debtor_id, creditor_id)): Path<(i64, i64)>,
) -> impl IntoResponse {
    let key = AccountKey::new(debtor_id, creditor_id);
    let reachable = match state.store.get_account(&key) {
        Ok(Some(account)) => !account.is_deleted(),
        Ok(None) => false,
        Err(e) => {
            tracing::warn!(error = %e, %key, "store error while checking reachability");
            false
        }
    };
    let headers = plain_text_headers();
    if reachable {
        (StatusCode::NO_CONTENT, headers)
    } else {
        (StatusCode::NOT_FOUND, headers)
    }
}

async fn get_account_config_data(
    State(state): State<Arc<HttpServerState>>,
    Path((debtor_id, creditor_id)): Path<(i64, i64)>,
) -> impl IntoResponse {
    let key = AccountKey::new(debtor_id, creditor_id);
    let headers = plain_text_headers();
    match state.store.get_account(&key) {
        Ok(Some(account)) if !account.is_deleted() => {
            (StatusCode::OK, headers, account.config_data).into_response()
        }
        _ => (StatusCode::NOT_FOUND, headers, String::new()).into_response(),
    }
}

impl HttpServer {
    pub fn new(state: Arc<HttpServerState>) -> Self {
        Self { state }
    }

    pub fn router(&self) -> Router {
        let cors = CorsLayer::new()
            .allow_methods(Any)
            .allow_origin(Any)
            .allow_headers(Any);

        Router::new()
            .route("/accounts/:debtor_id/:creditor_id/reachable", get(is_reachable_account))
            .route("/accounts/:debtor_id/:creditor_id/config", get(get_account_config_data))
            .layer(cors)
            .with_state(self.state.clone())
    }

    pub async fn serve(self, addr: std::net::SocketAddr) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!(%addr, "HTTP introspection server started");
        axum::serve(listener, self.router()).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledger_core::Account;
    use tower::ServiceExt;

    fn temp_store() -> Arc<AccountStore> {
        let dir = tempfile::tempdir().unwrap();
        Arc::new(AccountStore::open(dir.path()).unwrap())
    }

    #[tokio::test]
    async fn reachable_returns_204_for_existing_account() {
        let store = temp_store();
        let key = AccountKey::new(1, 2);
        store.put_account(&Account::new(key, 0, 0)).unwrap();
        let server = HttpServer::new(Arc::new(HttpServerState { store }));
        let response = server
            .router()
            .oneshot(
                axum::http::Request::builder()
                    .uri("/accounts/1/2/reachable")
                    .body(axum::body::Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn reachable_returns_404_for_missing_account() {
        let store = temp_store();
        let server = HttpServer::new(Arc::new(HttpServerState { store }));
        let response = server
            .router()
            .oneshot(
                axum::http::Request::builder()
                    .uri("/accounts/1/2/reachable")
                    .body(axum::body::Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn config_returns_stored_config_data() {
        let store = temp_store();
        let key = AccountKey::new(1, 2);
        let mut account = Account::new(key, 0, 0);
        account.config_data = "hello".to_string();
        store.put_account(&account).unwrap();
        let server = HttpServer::new(Arc::new(HttpServerState { store }));
        let response = server
            .router()
            .oneshot(
                axum::http::Request::builder()
                    .uri("/accounts/1/2/config")
                    .body(axum::body::Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
