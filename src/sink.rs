//! Destinations for access records.

use std::sync::{Mutex, PoisonError};

use tracing::Level;

use crate::record::AccessRecord;

/// Anything that can write a structured record at a severity level.
///
/// Implementations are shared by every in-flight request and must tolerate
/// concurrent calls.
pub trait LogSink: Send + Sync {
    fn write(&self, level: Level, message: &str, record: &AccessRecord);
}

/// Forwards records to the global `tracing` dispatcher under the
/// `access_log` target, one event field per record field.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

macro_rules! access_event {
    ($level:expr, $message:expr, $record:expr) => {{
        let record: &AccessRecord = $record;
        tracing::event!(
            target: "access_log",
            $level,
            http_host = %record.http_host,
            http_uri = %record.http_uri,
            http_proto = %record.http_proto,
            http_method = %record.http_method,
            http_scheme = %record.http_scheme,
            http_addr = %record.http_addr,
            remote_addr = %record.remote_addr,
            user_agent = %record.user_agent,
            resp_status = record.resp_status,
            resp_elapsed = record.resp_elapsed,
            resp_elapsed_ms = %record.resp_elapsed_ms,
            resp_bytes_length = record.resp_bytes_length,
            ts = %record.ts,
            category = %record.category,
            request_id = record.request_id.as_deref(),
            "{}",
            $message
        )
    }};
}

impl LogSink for TracingSink {
    fn write(&self, level: Level, message: &str, record: &AccessRecord) {
        if level == Level::ERROR {
            access_event!(Level::ERROR, message, record);
        } else if level == Level::WARN {
            access_event!(Level::WARN, message, record);
        } else if level == Level::INFO {
            access_event!(Level::INFO, message, record);
        } else if level == Level::DEBUG {
            access_event!(Level::DEBUG, message, record);
        } else {
            access_event!(Level::TRACE, message, record);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedEntry {
    pub level: Level,
    pub message: String,
    pub record: AccessRecord,
}

/// Keeps every written record in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    entries: Mutex<Vec<CapturedEntry>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<CapturedEntry> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn records(&self) -> Vec<AccessRecord> {
        self.entries().into_iter().map(|entry| entry.record).collect()
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl LogSink for MemorySink {
    fn write(&self, level: Level, message: &str, record: &AccessRecord) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(CapturedEntry {
                level,
                message: message.to_string(),
                record: record.clone(),
            });
    }
}
