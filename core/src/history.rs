use parking_lot::Mutex;
use serde::Serialize;
use std::collections::VecDeque;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

#[derive(Debug, Clone, Serialize)]
pub struct QueryRecord {
    pub query: String,
    /// RFC 3339, UTC.
    pub timestamp: String,
    pub sources: Vec<String>,
    pub query_time: f64,
}

impl QueryRecord {
    pub fn now(query: &str, sources: Vec<String>, query_time: f64) -> Self {
        let timestamp = OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_else(|_| "".into());
        Self { query: query.to_string(), timestamp, sources, query_time }
    }
}

/// Ring of the most recent queries; the oldest record is dropped once full.
pub struct QueryHistory {
    records: Mutex<VecDeque<QueryRecord>>,
    limit: usize,
}

impl QueryHistory {
    pub fn new(limit: usize) -> Self {
        Self { records: Mutex::new(VecDeque::with_capacity(limit.min(1024))), limit }
    }

    pub fn push(&self, record: QueryRecord) {
        if self.limit == 0 {
            return;
        }
        let mut records = self.records.lock();
        while records.len() >= self.limit {
            records.pop_front();
        }
        records.push_back(record);
    }

    /// Newest `n` records, oldest first.
    pub fn recent(&self, n: usize) -> Vec<QueryRecord> {
        let records = self.records.lock();
        let skip = records.len().saturating_sub(n);
        records.iter().skip(skip).cloned().collect()
    }

    pub fn len(&self) -> usize { self.records.lock().len() }

    pub fn is_empty(&self) -> bool { self.len() == 0 }
}
