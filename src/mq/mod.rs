//! Request/reply on top of a publish/subscribe client.
//!
//! [`MessageClient`] is the transport seam; the embedding application supplies
//! the broker connection. [`RequestReply`] adds JSON encoding, timeouts and
//! cancellation on top of it.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum MqError {
    #[error("request on {subject} timed out after {timeout:?}")]
    Timeout { subject: String, timeout: Duration },

    #[error("request on {0} was cancelled")]
    Cancelled(String),

    #[error("message encoding error: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("message client error: {0}")]
    Client(String),
}

#[async_trait]
pub trait MessageClient: Send + Sync {
    /// Publish `payload` on `subject` with a private reply inbox and wait for
    /// the first answer.
    async fn request(&self, subject: &str, payload: Vec<u8>) -> Result<Vec<u8>, MqError>;

    /// Publish `payload` on `subject` asking responders to answer on `reply`.
    async fn publish_request(&self, subject: &str, reply: &str, payload: Vec<u8>) -> Result<(), MqError>;
}

/// Unique reply subject.
pub fn new_inbox() -> String {
    format!("_INBOX.{}", Uuid::new_v4().simple())
}

pub struct RequestReply<C> {
    client: C,
}

impl<C: MessageClient> RequestReply<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Send `msg` and wait up to `timeout` for the decoded reply.
    pub async fn request<Req, Resp>(&self, subject: &str, msg: &Req, timeout: Duration) -> Result<Resp, MqError>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned,
    {
        let payload = serde_json::to_vec(msg)?;
        let reply = tokio::time::timeout(timeout, self.client.request(subject, payload))
            .await
            .map_err(|_| MqError::Timeout {
                subject: subject.to_string(),
                timeout,
            })??;
        Ok(serde_json::from_slice(&reply)?)
    }

    /// Fire `msg` with an explicit reply subject; answers are collected by
    /// whoever subscribes to `reply`.
    pub async fn publish_request<Req>(&self, subject: &str, reply: &str, msg: &Req) -> Result<(), MqError>
    where
        Req: Serialize + Sync,
    {
        let payload = serde_json::to_vec(msg)?;
        self.client.publish_request(subject, reply, payload).await
    }

    /// Like [`request`](Self::request) but bounded by `cancel` instead of a
    /// fixed timeout: whichever finishes first wins.
    pub async fn request_with_cancel<Req, Resp, F>(&self, subject: &str, msg: &Req, cancel: F) -> Result<Resp, MqError>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned,
        F: Future<Output = ()>,
    {
        let payload = serde_json::to_vec(msg)?;
        let reply = tokio::select! {
            reply = self.client.request(subject, payload) => reply?,
            _ = cancel => return Err(MqError::Cancelled(subject.to_string())),
        };
        Ok(serde_json::from_slice(&reply)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeMessageClient;
    use serde_json::{json, Value};

    #[tokio::test]
    async fn request_round_trips_json() {
        let client = FakeMessageClient::new().reply_with(json!({ "answer": "I can help!" }));
        let rr = RequestReply::new(client.clone());

        let resp: Value = rr
            .request("help", &json!({ "q": "help me" }), Duration::from_secs(1))
            .await
            .unwrap();

        assert_eq!(resp["answer"], "I can help!");
        let sent = client.requested();
        assert_eq!(sent[0].0, "help");
        assert_eq!(serde_json::from_slice::<Value>(&sent[0].1).unwrap(), json!({ "q": "help me" }));
    }

    #[tokio::test]
    async fn request_times_out() {
        let client = FakeMessageClient::new()
            .reply_with(json!("late"))
            .delayed(Duration::from_millis(200));
        let rr = RequestReply::new(client);

        let err = rr
            .request::<_, Value>("slow", &"ping", Duration::from_millis(10))
            .await
            .unwrap_err();

        assert!(matches!(err, MqError::Timeout { .. }));
    }

    #[tokio::test]
    async fn cancellation_wins_over_a_pending_reply() {
        let client = FakeMessageClient::new()
            .reply_with(json!("late"))
            .delayed(Duration::from_millis(200));
        let rr = RequestReply::new(client);

        let err = rr
            .request_with_cancel::<_, Value, _>("slow", &"ping", tokio::time::sleep(Duration::from_millis(10)))
            .await
            .unwrap_err();

        assert!(matches!(err, MqError::Cancelled(s) if s == "slow"));
    }

    #[tokio::test]
    async fn request_with_cancel_returns_reply_when_first() {
        let client = FakeMessageClient::new().reply_with(json!(3));
        let rr = RequestReply::new(client);

        let n: i32 = rr
            .request_with_cancel("sum", &[1, 2], std::future::pending::<()>())
            .await
            .unwrap();

        assert_eq!(n, 3);
    }

    #[tokio::test]
    async fn publish_request_forwards_reply_subject() {
        let client = FakeMessageClient::new();
        let rr = RequestReply::new(client.clone());
        let inbox = new_inbox();

        rr.publish_request("jobs", &inbox, &json!({ "id": 1 })).await.unwrap();

        let published = client.published();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].0, "jobs");
        assert_eq!(published[0].1, inbox);
        assert!(inbox.starts_with("_INBOX."));
    }

    #[tokio::test]
    async fn missing_responder_is_a_client_error() {
        let rr = RequestReply::new(FakeMessageClient::new());
        let err = rr
            .request::<_, Value>("nobody", &"hi", Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, MqError::Client(_)));
    }
}
