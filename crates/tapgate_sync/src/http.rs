//! HTTP-backed authority client.
//!
//! The actual HTTP machinery is injected through [`HttpClient`] so the
//! core carries no HTTP library of its own; hosts plug in whatever
//! client their platform provides (reqwest, ureq, a platform webview).
//! The wire format is JSON - the authority is an external collaborator
//! and JSON is its contract.

use crate::authority::AuthorityClient;
use crate::error::{SyncError, SyncResult};
use chrono::{DateTime, SecondsFormat, Utc};
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use tapgate_core::{
    AccessDecision, AccessEvent, CachedRule, ControlPointId, EventId, HolderId,
};

/// HTTP client abstraction.
///
/// Implementations perform one request and return the raw response
/// body; any non-success HTTP status should map to `Err` with a
/// diagnostic string.
pub trait HttpClient: Send + Sync {
    /// Sends a GET request.
    fn get(&self, url: &str) -> Result<Vec<u8>, String>;

    /// Sends a POST request with a JSON body.
    fn post(&self, url: &str, body: Vec<u8>) -> Result<Vec<u8>, String>;

    /// Returns true if the client believes the network is up.
    fn is_healthy(&self) -> bool;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireDecision {
    granted: bool,
    reason: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireRule {
    holder: u64,
    control_point: u64,
    allowed_days: Vec<u8>,
    start: chrono::NaiveTime,
    end: chrono::NaiveTime,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireEvent {
    id: u64,
    holder: u64,
    control_point: u64,
    occurred_at: DateTime<Utc>,
    granted: bool,
    reason: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WirePush<'a> {
    holder: u64,
    control_point: u64,
    occurred_at: DateTime<Utc>,
    granted: bool,
    reason: &'a str,
    device_id: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WirePushAck {
    id: u64,
}

/// An [`AuthorityClient`] speaking the authority's JSON HTTP interface.
pub struct HttpAuthority<C: HttpClient> {
    base_url: String,
    device_id: String,
    client: C,
    connected: AtomicBool,
    last_error: RwLock<Option<String>>,
}

impl<C: HttpClient> HttpAuthority<C> {
    /// Creates a new authority client.
    pub fn new(base_url: impl Into<String>, device_id: impl Into<String>, client: C) -> Self {
        Self {
            base_url: base_url.into(),
            device_id: device_id.into(),
            client,
            connected: AtomicBool::new(true),
            last_error: RwLock::new(None),
        }
    }

    /// Returns the base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the last transport error, if any.
    #[must_use]
    pub fn last_error(&self) -> Option<String> {
        self.last_error.read().clone()
    }

    fn record_failure(&self, message: &str) {
        *self.last_error.write() = Some(message.to_string());
        self.connected.store(false, Ordering::SeqCst);
    }

    fn record_success(&self) {
        *self.last_error.write() = None;
        self.connected.store(true, Ordering::SeqCst);
    }

    fn get_json<Res: DeserializeOwned>(&self, path_and_query: &str) -> SyncResult<Res> {
        let url = format!("{}{}", self.base_url, path_and_query);
        let body = self.client.get(&url).map_err(|e| {
            self.record_failure(&e);
            SyncError::transport_retryable(e)
        })?;
        self.record_success();
        serde_json::from_slice(&body)
            .map_err(|e| SyncError::Protocol(format!("undecodable response from {url}: {e}")))
    }

    fn post_json<Req: Serialize, Res: DeserializeOwned>(
        &self,
        path: &str,
        request: &Req,
    ) -> SyncResult<Res> {
        let url = format!("{}{}", self.base_url, path);
        let body = serde_json::to_vec(request)
            .map_err(|e| SyncError::Protocol(format!("unencodable request: {e}")))?;
        let response = self.client.post(&url, body).map_err(|e| {
            self.record_failure(&e);
            SyncError::transport_retryable(e)
        })?;
        self.record_success();
        serde_json::from_slice(&response)
            .map_err(|e| SyncError::Protocol(format!("undecodable response from {url}: {e}")))
    }
}

impl<C: HttpClient> AuthorityClient for HttpAuthority<C> {
    fn validate(
        &self,
        holder: HolderId,
        control_point: ControlPointId,
        at: DateTime<Utc>,
    ) -> SyncResult<AccessDecision> {
        let decision: WireDecision = self.get_json(&format!(
            "/validate?holder={}&controlPoint={}&at={}",
            holder.as_u64(),
            control_point.as_u64(),
            at.to_rfc3339_opts(SecondsFormat::Secs, true),
        ))?;
        Ok(AccessDecision {
            granted: decision.granted,
            reason: decision.reason,
        })
    }

    fn pull_rules(&self, holder: HolderId) -> SyncResult<Vec<CachedRule>> {
        let rules: Vec<WireRule> =
            self.get_json(&format!("/access-rules?holder={}", holder.as_u64()))?;
        let pulled_at = Utc::now();
        Ok(rules
            .into_iter()
            .map(|rule| CachedRule {
                holder: HolderId::new(rule.holder),
                control_point: ControlPointId::new(rule.control_point),
                allowed_days: rule.allowed_days.into_iter().collect(),
                start: rule.start,
                end: rule.end,
                last_synced_at: pulled_at,
            })
            .collect())
    }

    fn pull_events(&self, holder: HolderId) -> SyncResult<Vec<AccessEvent>> {
        let events: Vec<WireEvent> =
            self.get_json(&format!("/access-events?holder={}", holder.as_u64()))?;
        Ok(events
            .into_iter()
            .map(|event| AccessEvent {
                // Local ids are reassigned by the store on install.
                id: EventId::new(0),
                backend_id: Some(event.id),
                holder: HolderId::new(event.holder),
                control_point: ControlPointId::new(event.control_point),
                occurred_at: event.occurred_at,
                granted: event.granted,
                reason: event.reason,
                synced: true,
            })
            .collect())
    }

    fn push_event(&self, event: &AccessEvent) -> SyncResult<u64> {
        let ack: WirePushAck = self.post_json(
            "/access-events",
            &WirePush {
                holder: event.holder.as_u64(),
                control_point: event.control_point.as_u64(),
                occurred_at: event.occurred_at,
                granted: event.granted,
                reason: &event.reason,
                device_id: &self.device_id,
            },
        )?;
        Ok(ack.id)
    }

    fn is_reachable(&self) -> bool {
        self.connected.load(Ordering::SeqCst) && self.client.is_healthy()
    }
}
