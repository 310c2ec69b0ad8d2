use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::database::executor::{ExecOutcome, RowMap, SqlExecutor};
use crate::filter::SqlValue;
use crate::mq::{MessageClient, MqError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    Query,
    Execute,
}

/// A statement the fake pool was asked to run.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub kind: CallKind,
    pub sql: String,
    pub params: Vec<SqlValue>,
}

#[derive(Default)]
struct FakeState {
    rows: Vec<RowMap>,
    outcome: ExecOutcome,
    error: Option<String>,
    calls: Vec<RecordedCall>,
}

/// Scripted stand-in for the MySQL pool. Clones share state, so a test can
/// keep one copy to inspect after handing another to the gateway.
#[derive(Clone, Default)]
pub struct FakeExecutor {
    state: Arc<Mutex<FakeState>>,
}

impl FakeExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every query returns these rows; each value must be a JSON object.
    pub fn with_rows(rows: Vec<Value>) -> Self {
        let fake = Self::new();
        fake.state.lock().unwrap().rows = rows
            .into_iter()
            .map(|r| r.as_object().cloned().expect("fake rows must be objects"))
            .collect();
        fake
    }

    /// Every write reports this outcome.
    pub fn with_outcome(last_insert_id: u64, rows_affected: u64) -> Self {
        let fake = Self::new();
        fake.state.lock().unwrap().outcome = ExecOutcome { last_insert_id, rows_affected };
        fake
    }

    /// Every call fails with a protocol error carrying `message`.
    pub fn failing(message: &str) -> Self {
        let fake = Self::new();
        fake.state.lock().unwrap().error = Some(message.to_string());
        fake
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state.lock().unwrap().calls.clone()
    }

    fn record(&self, kind: CallKind, sql: &str, params: &[SqlValue]) -> Result<(), sqlx::Error> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(RecordedCall {
            kind,
            sql: sql.to_string(),
            params: params.to_vec(),
        });
        match &state.error {
            Some(message) => Err(sqlx::Error::Protocol(message.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl SqlExecutor for FakeExecutor {
    async fn query(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<RowMap>, sqlx::Error> {
        self.record(CallKind::Query, sql, params)?;
        Ok(self.state.lock().unwrap().rows.clone())
    }

    async fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<ExecOutcome, sqlx::Error> {
        self.record(CallKind::Execute, sql, params)?;
        Ok(self.state.lock().unwrap().outcome)
    }
}

#[derive(Default)]
struct FakeBusState {
    replies: VecDeque<Vec<u8>>,
    published: Vec<(String, String, Vec<u8>)>,
    requested: Vec<(String, Vec<u8>)>,
    delay: Option<Duration>,
}

/// In-process message client: answers requests from a queue of canned
/// replies and records everything sent.
#[derive(Clone, Default)]
pub struct FakeMessageClient {
    state: Arc<Mutex<FakeBusState>>,
}

impl FakeMessageClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply_with(self, reply: Value) -> Self {
        let bytes = serde_json::to_vec(&reply).unwrap();
        self.state.lock().unwrap().replies.push_back(bytes);
        self
    }

    /// Hold every request this long before answering.
    pub fn delayed(self, delay: Duration) -> Self {
        self.state.lock().unwrap().delay = Some(delay);
        self
    }

    pub fn published(&self) -> Vec<(String, String, Vec<u8>)> {
        self.state.lock().unwrap().published.clone()
    }

    pub fn requested(&self) -> Vec<(String, Vec<u8>)> {
        self.state.lock().unwrap().requested.clone()
    }
}

#[async_trait]
impl MessageClient for FakeMessageClient {
    async fn request(&self, subject: &str, payload: Vec<u8>) -> Result<Vec<u8>, MqError> {
        let delay = {
            let mut state = self.state.lock().unwrap();
            state.requested.push((subject.to_string(), payload));
            state.delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.state
            .lock()
            .unwrap()
            .replies
            .pop_front()
            .ok_or_else(|| MqError::Client(format!("no responders on {}", subject)))
    }

    async fn publish_request(&self, subject: &str, reply: &str, payload: Vec<u8>) -> Result<(), MqError> {
        self.state
            .lock()
            .unwrap()
            .published
            .push((subject.to_string(), reply.to_string(), payload));
        Ok(())
    }
}
