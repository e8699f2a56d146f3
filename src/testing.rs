//! Test support: sample payloads and in-memory source/sink fakes.
//!
//! The fakes implement the same seams the loop runs against in production
//! ([`MessageSource`], [`EventSink`]) so loop-level behavior can be tested
//! without a broker or a database.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::consumer::{MessageSource, SourcedMessage};
use crate::error::{IngestError, Result};
use crate::record::ActivityEvent;
use crate::sink::EventSink;

/// A well-formed event payload as the upstream tracker would produce it.
pub fn sample_event_json(activity_uuid: &str, user_id: &str) -> String {
    format!(
        r#"{{
            "activity_uuid": "{activity_uuid}",
            "user_id": "{user_id}",
            "organization_id": "org-1",
            "timestamp": "2025-01-01T00:00:00Z",
            "app_name": "firefox",
            "url": "https://example.com/dashboard",
            "page_title": "Dashboard",
            "productivity_status": "productive",
            "meridian": "AM",
            "ip_address": "10.0.0.7",
            "mac_address": "aa:bb:cc:dd:ee:ff",
            "mouse_movement": true,
            "mouse_clicks": 12,
            "keys_clicks": 240,
            "status": 1,
            "cpu_usage": "17%",
            "ram_usage": "42%",
            "screenshot_uid": "shot-1",
            "thumbnail_uid": "thumb-1",
            "device_user_name": "alice"
        }}"#
    )
}

/// One scripted outcome for [`ScriptedSource::read_next`].
pub enum SourceStep {
    /// A message payload; offsets are assigned sequentially.
    Message(Vec<u8>),
    /// The bounded wait elapses with no message.
    Timeout,
    /// A non-timeout read failure.
    Error(String),
}

/// A [`MessageSource`] that replays a fixed script, then times out forever.
pub struct ScriptedSource {
    steps: Mutex<VecDeque<SourceStep>>,
    next_offset: AtomicI64,
}

impl ScriptedSource {
    pub fn new(steps: Vec<SourceStep>) -> Self {
        Self {
            steps: Mutex::new(steps.into()),
            next_offset: AtomicI64::new(0),
        }
    }
}

#[async_trait]
impl MessageSource for ScriptedSource {
    async fn read_next(&self, _timeout: Duration) -> Result<Option<SourcedMessage>> {
        let step = self.steps.lock().unwrap().pop_front();
        match step {
            Some(SourceStep::Message(payload)) => {
                let offset = self.next_offset.fetch_add(1, Ordering::SeqCst);
                Ok(Some(SourcedMessage { payload, offset }))
            }
            Some(SourceStep::Timeout) | None => Ok(None),
            Some(SourceStep::Error(message)) => Err(IngestError::Read(message)),
        }
    }
}

/// An in-memory [`EventSink`] with the gateway's create-once semantics.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<ActivityEvent>>,
    /// Persist calls for these activity ids fail with an insert error.
    failing_ids: Vec<String>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_for(ids: &[&str]) -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            failing_ids: ids.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Persisted events in insertion order.
    pub fn events(&self) -> Vec<ActivityEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Persisted activity ids in insertion order.
    pub fn persisted_ids(&self) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|e| e.activity_uuid.clone())
            .collect()
    }
}

#[async_trait]
impl EventSink for RecordingSink {
    async fn persist(&self, event: &ActivityEvent) -> Result<bool> {
        if self.failing_ids.contains(&event.activity_uuid) {
            return Err(IngestError::Insert(
                format!("injected failure for {}", event.activity_uuid).into(),
            ));
        }

        let mut events = self.events.lock().unwrap();
        if events.iter().any(|e| e.activity_uuid == event.activity_uuid) {
            return Ok(false);
        }
        events.push(event.clone());
        Ok(true)
    }

    async fn total_rows(&self) -> Result<i64> {
        Ok(self.events.lock().unwrap().len() as i64)
    }
}
