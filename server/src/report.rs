//! Plain-text and JSON renderings of a search answer for download.

use rag_core::SearchOutcome;
use serde::Serialize;
use std::collections::BTreeMap;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::OffsetDateTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Text,
    Json,
}

impl ReportFormat {
    /// `None` for anything other than `txt` or `json` (PDF rendering is not available).
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "txt" => Some(Self::Text),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            Self::Text => "text/plain; charset=utf-8",
            Self::Json => "application/json",
        }
    }

    fn extension(self) -> &'static str {
        match self {
            Self::Text => "txt",
            Self::Json => "json",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportMetadata {
    pub query: String,
    pub query_time: f64,
    pub total_documents_searched: usize,
    pub sources: Vec<String>,
    pub timestamp: String,
}

pub struct Report<'a> {
    pub query: &'a str,
    pub outcome: &'a SearchOutcome,
    pub metadata: ReportMetadata,
    pub include_sources: bool,
    pub include_metadata: bool,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    query: &'a str,
    answer: &'a str,
    sources: &'a [String],
    document_specific_answers: &'a BTreeMap<String, String>,
    metadata: &'a ReportMetadata,
}

impl<'a> Report<'a> {
    pub fn new(query: &'a str, outcome: &'a SearchOutcome) -> Self {
        let timestamp = OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_else(|_| "".into());
        let metadata = ReportMetadata {
            query: query.to_string(),
            query_time: outcome.elapsed_seconds(),
            total_documents_searched: outcome.documents_searched,
            sources: outcome.sources.clone(),
            timestamp,
        };
        Self { query, outcome, metadata, include_sources: true, include_metadata: true }
    }

    pub fn render(&self, format: ReportFormat) -> String {
        match format {
            ReportFormat::Text => self.render_text(),
            ReportFormat::Json => self.render_json(),
        }
    }

    fn render_text(&self) -> String {
        let mut out = format!("RAG System Answer\n{}\n\n", "=".repeat(50));
        out.push_str(&format!("Query: {}\n", self.query));
        out.push_str(&format!("Timestamp: {}\n", self.metadata.timestamp));
        out.push_str(&format!("Query Time: {:.2} seconds\n\n", self.metadata.query_time));
        out.push_str(&format!("Answer:\n{}\n\n", self.outcome.answer));

        if self.include_sources && !self.outcome.sources.is_empty() {
            out.push_str(&format!("Sources: {}\n", self.outcome.sources.join(", ")));
        }
        if self.include_metadata {
            let m = &self.metadata;
            out.push_str("\nMetadata:\n");
            out.push_str(&format!("  query: {}\n", m.query));
            out.push_str(&format!("  query_time: {}\n", m.query_time));
            out.push_str(&format!("  total_documents_searched: {}\n", m.total_documents_searched));
            out.push_str(&format!("  sources: {}\n", m.sources.join(", ")));
            out.push_str(&format!("  timestamp: {}\n", m.timestamp));
        }
        out
    }

    fn render_json(&self) -> String {
        let report = JsonReport {
            query: self.query,
            answer: &self.outcome.answer,
            sources: &self.outcome.sources,
            document_specific_answers: &self.outcome.document_answers,
            metadata: &self.metadata,
        };
        serde_json::to_string_pretty(&report).unwrap_or_else(|_| "{}".into())
    }

    /// Attachment file name such as `rag_answer_20240101_120000.txt`.
    pub fn file_name(format: ReportFormat) -> String {
        let stamp = OffsetDateTime::now_utc()
            .format(format_description!("[year][month][day]_[hour][minute][second]"))
            .unwrap_or_else(|_| "answer".into());
        format!("rag_answer_{stamp}.{}", format.extension())
    }
}
