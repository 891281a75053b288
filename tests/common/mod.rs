#![allow(dead_code)]

use admin_gateway::{
    AppConfig, AppResult, AppState, MemoryAuditSink,
    models::{AdminDashboardStats, User, UserRole},
    repository::{Repository, UserDirectory},
};
use async_trait::async_trait;
use axum::{body::Body, http::Request, response::Response};
use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};
use uuid::Uuid;

pub const ADMIN_ID: Uuid = Uuid::from_u128(1);
pub const USER_ID: Uuid = Uuid::from_u128(2);
pub const UNKNOWN_ID: Uuid = Uuid::from_u128(99);

// --- Mock Directory + Repository ---

// Counts every call into the wrapped admin operations so tests can assert
// "handler invoked exactly once / zero times".
pub struct MockRepo {
    pub users: Mutex<HashMap<Uuid, User>>,
    pub existing_comments: Vec<i64>,
    pub directory_delay: Option<Duration>,
    pub delete_calls: AtomicUsize,
    pub role_change_calls: AtomicUsize,
    pub stats_calls: AtomicUsize,
}

impl Default for MockRepo {
    fn default() -> Self {
        let users = [
            user(ADMIN_ID, "admin@example.com", "admin"),
            user(USER_ID, "user1@example.com", "user"),
        ]
        .into_iter()
        .map(|u| (u.id, u))
        .collect();

        MockRepo {
            users: Mutex::new(users),
            existing_comments: vec![1],
            directory_delay: None,
            delete_calls: AtomicUsize::new(0),
            role_change_calls: AtomicUsize::new(0),
            stats_calls: AtomicUsize::new(0),
        }
    }
}

pub fn user(id: Uuid, email: &str, role: &str) -> User {
    User {
        id,
        email: email.to_string(),
        role: role.to_string(),
    }
}

#[async_trait]
impl UserDirectory for MockRepo {
    async fn find_user(&self, id: Uuid) -> AppResult<Option<User>> {
        if let Some(delay) = self.directory_delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.users.lock().unwrap().get(&id).cloned())
    }
}

#[async_trait]
impl Repository for MockRepo {
    async fn change_user_role(&self, id: Uuid, role: UserRole) -> AppResult<Option<User>> {
        self.role_change_calls.fetch_add(1, Ordering::SeqCst);
        let mut users = self.users.lock().unwrap();
        Ok(users.get_mut(&id).map(|u| {
            u.role = role.as_str().to_string();
            u.clone()
        }))
    }

    async fn delete_comment_admin(&self, id: i64) -> AppResult<bool> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.existing_comments.contains(&id))
    }

    async fn get_stats(&self) -> AppResult<AdminDashboardStats> {
        self.stats_calls.fetch_add(1, Ordering::SeqCst);
        Ok(AdminDashboardStats {
            total_users: self.users.lock().unwrap().len() as i64,
            total_comments: self.existing_comments.len() as i64,
        })
    }
}

// --- State Helpers ---

pub struct TestContext {
    pub repo: Arc<MockRepo>,
    pub sink: Arc<MemoryAuditSink>,
    pub state: AppState,
}

pub fn test_context(repo: MockRepo, config: AppConfig) -> TestContext {
    let repo = Arc::new(repo);
    let sink = Arc::new(MemoryAuditSink::new());
    let state = AppState {
        repo: repo.clone(),
        directory: repo.clone(),
        audit_sink: sink.clone(),
        config,
    };
    TestContext { repo, sink, state }
}

pub fn default_context() -> TestContext {
    test_context(MockRepo::default(), AppConfig::default())
}

// --- Request Helpers ---

pub fn admin_request(method: &str, uri: &str, caller: Option<Uuid>, body: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(id) = caller {
        builder = builder.header("x-user-id", id.to_string());
    }
    match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
