//! Remote transport: one full-state read and one full-state write

use std::future::Future;
use std::sync::Arc;

use reqwest::header::{ACCEPT, CACHE_CONTROL, CONTENT_TYPE};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::TransportError;
use crate::models::Record;
use crate::util::compact_text;

/// Member photos longer than this are blanked in the outgoing payload.
pub const MAX_SYNCED_PHOTO_CHARS: usize = 45_000;

/// Full state exchanged with the remote endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default, deserialize_with = "lenient_records")]
    pub members: Vec<Record>,
    #[serde(default, deserialize_with = "lenient_records")]
    pub tasks: Vec<Record>,
}

impl Snapshot {
    /// Decode a remote response body.
    ///
    /// The body must be a JSON object; fields that are missing or not arrays
    /// decode as empty collections.
    pub fn from_json(body: &str) -> Result<Self, TransportError> {
        let value: Value = serde_json::from_str(body)
            .map_err(|error| TransportError::Decode(format!("{error}: {}", compact_text(body))))?;
        if !value.is_object() {
            return Err(TransportError::Decode(
                "expected a JSON object with members and tasks".to_string(),
            ));
        }
        serde_json::from_value(value).map_err(|error| TransportError::Decode(error.to_string()))
    }

    /// Copy of this snapshot fit for the wire: oversized member photos are
    /// replaced by an empty string. `self` is left untouched.
    #[must_use]
    pub fn sanitized(&self) -> Self {
        Self {
            members: sanitize_members(&self.members),
            tasks: self.tasks.clone(),
        }
    }
}

fn sanitize_members(members: &[Record]) -> Vec<Record> {
    members
        .iter()
        .map(|member| {
            let mut member = member.clone();
            if let Some(Value::String(photo)) = member.fields.get_mut("photo") {
                if photo.chars().count() > MAX_SYNCED_PHOTO_CHARS {
                    photo.clear();
                }
            }
            member
        })
        .collect()
}

fn lenient_records<'de, D>(deserializer: D) -> Result<Vec<Record>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    let Some(Value::Array(items)) = value else {
        return Ok(Vec::new());
    };

    Ok(items
        .into_iter()
        .filter(Value::is_object)
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect())
}

/// The remote side of a sync.
///
/// Implementations perform exactly one request per call and never retry.
pub trait RemoteTransport: Send + Sync + 'static {
    /// Read the full remote state
    fn fetch(&self, endpoint: &str)
        -> impl Future<Output = Result<Snapshot, TransportError>> + Send;

    /// Replace the full remote state with `snapshot`
    fn push(
        &self,
        endpoint: &str,
        snapshot: &Snapshot,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;
}

impl<T: RemoteTransport> RemoteTransport for Arc<T> {
    fn fetch(&self, endpoint: &str)
        -> impl Future<Output = Result<Snapshot, TransportError>> + Send {
        (**self).fetch(endpoint)
    }

    fn push(
        &self,
        endpoint: &str,
        snapshot: &Snapshot,
    ) -> impl Future<Output = Result<(), TransportError>> + Send {
        (**self).push(endpoint, snapshot)
    }
}

/// JSON-over-HTTP transport
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self, TransportError> {
        Ok(Self {
            client: reqwest::Client::builder().build()?,
        })
    }
}

impl RemoteTransport for HttpTransport {
    async fn fetch(&self, endpoint: &str) -> Result<Snapshot, TransportError> {
        let response = self
            .client
            .get(endpoint)
            .header(CACHE_CONTROL, "no-store")
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::debug!("GET {} answered {}: {}", endpoint, status, compact_text(&body));
            return Err(TransportError::Status {
                method: "GET",
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        Snapshot::from_json(&body)
    }

    async fn push(&self, endpoint: &str, snapshot: &Snapshot) -> Result<(), TransportError> {
        let body = serde_json::to_vec(snapshot)
            .map_err(|error| TransportError::Decode(error.to_string()))?;
        let response = self
            .client
            .post(endpoint)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::debug!("POST {} answered {}: {}", endpoint, status, compact_text(&body));
            return Err(TransportError::Status {
                method: "POST",
                status: status.as_u16(),
            });
        }

        Ok(())
    }
}
