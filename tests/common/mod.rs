#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Request, Response},
};
use gov_portal::{
    AppConfig, AppState, create_router,
    repository::{Repository, RepositoryState, memory::InMemoryRepository},
    roles::{Role, RoleId, seed_roles},
};
use serde::de::DeserializeOwned;
use std::{sync::Arc, time::SystemTime};
use tower::ServiceExt;
use uuid::Uuid;

/// Router over a seeded in-memory repository, plus handles to poke at it directly.
pub struct TestApp {
    pub state: AppState,
    pub repo: Arc<InMemoryRepository>,
}

impl TestApp {
    pub async fn new() -> Self {
        let repo = Arc::new(InMemoryRepository::new());
        seed_roles(repo.as_ref()).await;

        let state = AppState::new(repo.clone() as RepositoryState, AppConfig::default());
        TestApp { state, repo }
    }

    pub fn router(&self) -> Router {
        create_router(self.state.clone())
    }

    pub async fn token_for(&self, role: RoleId) -> (Uuid, String) {
        let role = self.repo.get_role(role).await.unwrap();
        let user = Uuid::new_v4();
        (user, self.token_with(user, &role))
    }

    pub fn token_with(&self, user: Uuid, role: &Role) -> String {
        self.state
            .verifier
            .issue(user, role, "portal", SystemTime::now())
            .unwrap()
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router().oneshot(request).await.unwrap()
    }
}

pub fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

pub fn json(method: &str, uri: &str, token: Option<&str>, body: serde_json::Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("Content-Type", "application/json");
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub async fn read_json<T: DeserializeOwned>(response: Response<Body>) -> T {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
