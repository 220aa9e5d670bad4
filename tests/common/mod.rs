//! In-memory doubles for the storage and notification seams, mirroring the
//! guarded-update semantics of the Postgres implementations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use uuid::Uuid;

use chat_service::error::AppError;
use chat_service::models::{ConnectionRequest, Message, RequestStatus, UserProfile};
use chat_service::repository::{ConnectionRequestRepository, MessageRepository, UserRepository};
use chat_service::workflow::{WorkflowRun, WorkflowStore};

#[derive(Default)]
pub struct InMemoryMessageRepository {
    messages: Mutex<Vec<Message>>,
    fail_creates: AtomicBool,
}

impl InMemoryMessageRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_creates(&self, fail: bool) {
        self.fail_creates.store(fail, Ordering::SeqCst);
    }

    pub fn all(&self) -> Vec<Message> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl MessageRepository for InMemoryMessageRepository {
    async fn create(&self, message: &Message) -> Result<(), AppError> {
        if self.fail_creates.load(Ordering::SeqCst) {
            return Err(AppError::Storage(sqlx::Error::PoolClosed));
        }
        self.messages.lock().unwrap().push(message.clone());
        Ok(())
    }

    async fn thread_between(&self, a: Uuid, b: Uuid) -> Result<Vec<Message>, AppError> {
        let mut messages: Vec<Message> = self
            .messages
            .lock()
            .unwrap()
            .iter()
            .filter(|m| {
                (m.from_user_id == a && m.to_user_id == b)
                    || (m.from_user_id == b && m.to_user_id == a)
            })
            .cloned()
            .collect();
        messages.sort_by(|x, y| y.created_at.cmp(&x.created_at));
        Ok(messages)
    }

    async fn mark_seen(&self, from_user_id: Uuid, to_user_id: Uuid) -> Result<u64, AppError> {
        let mut guard = self.messages.lock().unwrap();
        let mut marked = 0;
        for message in guard.iter_mut() {
            if message.from_user_id == from_user_id
                && message.to_user_id == to_user_id
                && !message.seen
            {
                message.seen = true;
                marked += 1;
            }
        }
        Ok(marked)
    }

    async fn recent_for(&self, user_id: Uuid) -> Result<Vec<Message>, AppError> {
        let mut messages: Vec<Message> = self
            .messages
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.to_user_id == user_id)
            .cloned()
            .collect();
        messages.sort_by(|x, y| y.created_at.cmp(&x.created_at));
        Ok(messages)
    }
}

#[derive(Default)]
pub struct InMemoryUserRepository {
    users: Mutex<HashMap<Uuid, UserProfile>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, user: UserProfile) {
        self.users.lock().unwrap().insert(user.id, user);
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find(&self, id: Uuid) -> Result<Option<UserProfile>, AppError> {
        Ok(self.users.lock().unwrap().get(&id).cloned())
    }
}

#[derive(Default)]
pub struct InMemoryConnectionRequestRepository {
    requests: Mutex<HashMap<Uuid, ConnectionRequest>>,
}

impl InMemoryConnectionRequestRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, request: ConnectionRequest) {
        self.requests.lock().unwrap().insert(request.id, request);
    }

    pub fn set_status(&self, id: Uuid, status: RequestStatus) {
        if let Some(request) = self.requests.lock().unwrap().get_mut(&id) {
            request.status = status;
        }
    }
}

#[async_trait]
impl ConnectionRequestRepository for InMemoryConnectionRequestRepository {
    async fn find(&self, id: Uuid) -> Result<Option<ConnectionRequest>, AppError> {
        Ok(self.requests.lock().unwrap().get(&id).cloned())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SentNotification {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Records every delivery; can be told to fail to exercise retry paths.
#[derive(Default)]
pub struct RecordingNotificationSender {
    sent: Mutex<Vec<SentNotification>>,
    fail: AtomicBool,
}

impl RecordingNotificationSender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<SentNotification> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl chat_service::services::NotificationSender for RecordingNotificationSender {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), AppError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(AppError::Notification("provider unavailable".into()));
        }
        self.sent.lock().unwrap().push(SentNotification {
            to: to.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryWorkflowStore {
    runs: Mutex<HashMap<Uuid, WorkflowRun>>,
}

impl InMemoryWorkflowStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: Uuid) -> Option<WorkflowRun> {
        self.runs.lock().unwrap().get(&id).cloned()
    }
}

#[async_trait]
impl WorkflowStore for InMemoryWorkflowStore {
    async fn insert(&self, run: &WorkflowRun) -> Result<(), AppError> {
        self.runs.lock().unwrap().insert(run.id, run.clone());
        Ok(())
    }

    async fn due(&self, now: DateTime<Utc>, limit: i64) -> Result<Vec<WorkflowRun>, AppError> {
        let mut due: Vec<WorkflowRun> = self
            .runs
            .lock()
            .unwrap()
            .values()
            .filter(|r| r.completed_at.is_none() && r.wake_at <= now)
            .cloned()
            .collect();
        due.sort_by(|x, y| x.wake_at.cmp(&y.wake_at));
        due.truncate(limit as usize);
        Ok(due)
    }

    async fn suspend(
        &self,
        id: Uuid,
        from_step: i32,
        wake_at: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        let mut guard = self.runs.lock().unwrap();
        match guard.get_mut(&id) {
            Some(run) if run.step == from_step && run.completed_at.is_none() => {
                run.step += 1;
                run.wake_at = wake_at;
                run.retry_count = 0;
                run.last_error = None;
                run.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn complete(&self, id: Uuid, from_step: i32) -> Result<bool, AppError> {
        let mut guard = self.runs.lock().unwrap();
        match guard.get_mut(&id) {
            Some(run) if run.step == from_step && run.completed_at.is_none() => {
                run.completed_at = Some(Utc::now());
                run.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn record_failure(&self, id: Uuid, error: &str) -> Result<(), AppError> {
        let mut guard = self.runs.lock().unwrap();
        if let Some(run) = guard.get_mut(&id) {
            if run.completed_at.is_none() {
                run.retry_count += 1;
                run.last_error = Some(error.to_string());
                run.updated_at = Utc::now();
            }
        }
        Ok(())
    }

    async fn pending_stats(&self) -> Result<(i64, i64), AppError> {
        let guard = self.runs.lock().unwrap();
        let pending = guard.values().filter(|r| r.completed_at.is_none()).count() as i64;
        let now = Utc::now();
        let age = guard
            .values()
            .filter(|r| r.completed_at.is_none() && r.wake_at <= now)
            .map(|r| (now - r.wake_at).num_seconds())
            .max()
            .unwrap_or(0);
        Ok((pending, age))
    }
}

pub fn user(username: &str) -> UserProfile {
    UserProfile {
        id: Uuid::new_v4(),
        username: username.to_string(),
        full_name: format!("{} Example", capitalize(username)),
        email: format!("{username}@example.com"),
        profile_picture: None,
    }
}

pub fn pending_request(from_user_id: Uuid, to_user_id: Uuid) -> ConnectionRequest {
    ConnectionRequest {
        id: Uuid::new_v4(),
        from_user_id,
        to_user_id,
        status: RequestStatus::Pending,
        created_at: Utc::now(),
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
