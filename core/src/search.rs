use crate::config::BonusTarget;
use crate::error::{EngineError, Result};
use crate::index::{Chunk, ChunkId, Corpus};
use crate::tokenizer::tokenize;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant};

pub const UNSPECIFIC_QUERY: &str = "Please provide a more specific query.";

const EXACT_QUERY_BONUS: u32 = 5;
const ADJACENT_PAIR_BONUS: u32 = 2;
const ANSWER_DIVIDER: &str = "\n\n---\n\n";

/// Cache key for a search: normalized query text, result count and filter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QuerySignature {
    pub query: String,
    pub top_k: usize,
    pub document_filter: Option<String>,
}

impl QuerySignature {
    pub fn new(query: &str, top_k: usize, document_filter: Option<&str>) -> Self {
        Self {
            query: query.trim().to_lowercase(),
            top_k,
            document_filter: document_filter.map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchOutcome {
    /// Owning document of every ranked chunk, best first. May repeat.
    pub sources: Vec<String>,
    pub answer: String,
    /// Document id -> text of the lowest ranked chunk of that document in the result.
    pub document_answers: BTreeMap<String, String>,
    /// Document count of the snapshot the result was computed on.
    pub documents_searched: usize,
    #[serde(rename = "elapsed_seconds", serialize_with = "as_secs_f64")]
    pub elapsed: Duration,
}

fn as_secs_f64<S: serde::Serializer>(d: &Duration, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64())
}

impl SearchOutcome {
    fn message(answer: String, documents_searched: usize) -> Self {
        Self {
            sources: Vec::new(),
            answer,
            document_answers: BTreeMap::new(),
            documents_searched,
            elapsed: Duration::ZERO,
        }
    }

    pub fn elapsed_seconds(&self) -> f64 { self.elapsed.as_secs_f64() }

    /// True when at least one chunk matched.
    pub fn has_matches(&self) -> bool { !self.sources.is_empty() }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoredChunk {
    pub chunk: ChunkId,
    pub score: u32,
}

/// Score and rank chunks of `corpus` for `query`.
///
/// Each query token adds one point per posting of that token, so terms repeated
/// in a chunk or in the query weigh more. Phrase bonuses are then added and the
/// candidates are ordered by score, ties by `(document_id, ordinal)`.
pub fn rank(corpus: &Corpus, query: &str, top_k: usize, document_filter: Option<&str>, bonus: BonusTarget) -> Vec<ScoredChunk> {
    let normalized = query.trim().to_lowercase();
    let terms = tokenize(&normalized);

    let mut scores: HashMap<ChunkId, u32> = HashMap::new();
    for term in &terms {
        for &id in corpus.postings(term) {
            *scores.entry(id).or_insert(0) += 1;
        }
    }

    let pairs: Vec<String> = terms.windows(2).map(|w| format!("{} {}", w[0], w[1])).collect();

    let mut scored: Vec<(&Chunk, ScoredChunk)> = scores
        .into_iter()
        .filter_map(|(id, score)| corpus.chunk(id).map(|c| (c, ScoredChunk { chunk: id, score })))
        .filter(|(c, _)| document_filter.map_or(true, |f| c.document_id == f))
        .map(|(c, mut hit)| {
            let haystack = match bonus {
                BonusTarget::Identifier => c.label(),
                BonusTarget::Content => c.text.to_lowercase(),
            };
            if haystack.contains(&normalized) {
                hit.score += EXACT_QUERY_BONUS;
            }
            hit.score += ADJACENT_PAIR_BONUS * pairs.iter().filter(|p| haystack.contains(p.as_str())).count() as u32;
            (c, hit)
        })
        .collect();

    scored.sort_by(|(ca, a), (cb, b)| {
        b.score
            .cmp(&a.score)
            .then_with(|| ca.document_id.cmp(&cb.document_id))
            .then_with(|| ca.ordinal.cmp(&cb.ordinal))
    });
    scored.truncate(top_k);
    scored.into_iter().map(|(_, hit)| hit).collect()
}

/// Answer `query` from `corpus`. Only an empty corpus is an error; an unspecific
/// query or one with no matches yields an explanatory message and no sources.
pub fn search(corpus: &Corpus, query: &str, top_k: usize, document_filter: Option<&str>, bonus: BonusTarget) -> Result<SearchOutcome> {
    if corpus.is_empty() {
        return Err(EngineError::NoDocuments);
    }
    let start = Instant::now();
    let documents_searched = corpus.document_count();

    if tokenize(query.trim()).is_empty() {
        return Ok(SearchOutcome::message(UNSPECIFIC_QUERY.to_string(), documents_searched));
    }

    let ranked = rank(corpus, query, top_k, document_filter, bonus);
    if ranked.is_empty() {
        let answer = format!("No relevant information found for '{query}' in the documents.");
        return Ok(SearchOutcome::message(answer, documents_searched));
    }

    let mut sources = Vec::with_capacity(ranked.len());
    let mut parts = Vec::with_capacity(ranked.len());
    let mut document_answers = BTreeMap::new();
    for hit in &ranked {
        let Some(chunk) = corpus.chunk(hit.chunk) else { continue };
        sources.push(chunk.document_id.clone());
        parts.push(format!("📄 **{}**\n{}", chunk.document_id, chunk.text));
        // lower ranked chunks of the same document replace earlier ones
        document_answers.insert(chunk.document_id.clone(), chunk.text.clone());
    }

    Ok(SearchOutcome {
        sources,
        answer: parts.join(ANSWER_DIVIDER),
        document_answers,
        documents_searched,
        elapsed: start.elapsed(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus(pairs: &[(&str, &str)], chunk_size: usize) -> Corpus {
        let docs = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Corpus::build(docs, chunk_size, 0, 1)
    }

    #[test]
    fn empty_corpus_is_an_error() {
        let c = Corpus::new();
        assert!(matches!(search(&c, "anything", 3, None, BonusTarget::Identifier), Err(EngineError::NoDocuments)));
    }

    #[test]
    fn short_tokens_only_is_unspecific() {
        let c = corpus(&[("a.txt", "some text here")], 500);
        let out = search(&c, "is a an", 3, None, BonusTarget::Identifier).unwrap();
        assert_eq!(out.answer, UNSPECIFIC_QUERY);
        assert!(out.sources.is_empty());
        assert_eq!(out.elapsed, Duration::ZERO);
    }

    #[test]
    fn unknown_terms_report_no_relevant_information() {
        let c = corpus(&[("a.txt", "some text here")], 500);
        let out = search(&c, "Zebra", 3, None, BonusTarget::Identifier).unwrap();
        assert!(!out.has_matches());
        assert_eq!(out.answer, "No relevant information found for 'Zebra' in the documents.");
    }

    #[test]
    fn repeated_terms_accumulate() {
        let c = corpus(&[("a.txt", "fox fox fox"), ("b.txt", "fox dog")], 500);
        let ranked = rank(&c, "fox", 5, None, BonusTarget::Identifier);
        assert_eq!(ranked.len(), 2);
        assert_eq!(c.chunk(ranked[0].chunk).unwrap().document_id, "a.txt");
        assert_eq!(ranked[0].score, 3);
        assert_eq!(ranked[1].score, 1);
    }

    #[test]
    fn all_terms_outscore_subset() {
        let c = corpus(&[("a.txt", "alpha beta gamma"), ("b.txt", "alpha beta delta")], 500);
        let ranked = rank(&c, "alpha beta gamma", 5, None, BonusTarget::Identifier);
        assert_eq!(c.chunk(ranked[0].chunk).unwrap().document_id, "a.txt");
        assert!(ranked[0].score > ranked[1].score);
    }

    #[test]
    fn ties_break_by_document_then_ordinal() {
        let c = corpus(&[("b.txt", "needle"), ("a.txt", "needle"), ("c.txt", "needle")], 500);
        let ranked = rank(&c, "needle", 3, None, BonusTarget::Identifier);
        let docs: Vec<&str> = ranked.iter().map(|h| c.chunk(h.chunk).unwrap().document_id.as_str()).collect();
        assert_eq!(docs, vec!["a.txt", "b.txt", "c.txt"]);
    }

    #[test]
    fn filter_matches_document_id_exactly() {
        let c = corpus(&[("notes.txt", "shared term"), ("notes.txt.bak", "shared term")], 500);
        let out = search(&c, "shared", 5, Some("notes.txt"), BonusTarget::Identifier).unwrap();
        assert_eq!(out.sources, vec!["notes.txt"]);
    }

    #[test]
    fn identifier_bonus_matches_chunk_label() {
        let c = corpus(&[("release notes", "release notes archive"), ("other.txt", "release notes archive")], 500);
        let ranked = rank(&c, "release notes", 5, None, BonusTarget::Identifier);
        // "release notes" is a substring of "release notes_0": +5 exact, +2 for the pair
        assert_eq!(ranked[0].score, 2 + 5 + 2);
        assert_eq!(ranked[1].score, 2);
    }

    #[test]
    fn content_bonus_matches_chunk_text() {
        let c = corpus(&[("a.txt", "the Quick Fox ran"), ("b.txt", "fox was quick")], 500);
        let ranked = rank(&c, "quick fox", 5, None, BonusTarget::Content);
        assert_eq!(c.chunk(ranked[0].chunk).unwrap().document_id, "a.txt");
        assert_eq!(ranked[0].score, 2 + 5 + 2);
        assert_eq!(ranked[1].score, 2);
    }

    #[test]
    fn later_chunk_of_same_document_wins_document_answer() {
        let text = "apple w001 w002 w003 apple apple w004 w005";
        let c = corpus(&[("a.txt", text)], 20);
        assert!(c.chunk_count() >= 2);
        let out = search(&c, "apple", 5, None, BonusTarget::Identifier).unwrap();
        assert_eq!(out.sources, vec!["a.txt", "a.txt"]);
        // best chunk first, the lower ranked one is what remains per document
        let last = c.chunk(rank(&c, "apple", 5, None, BonusTarget::Identifier)[1].chunk).unwrap();
        assert_eq!(out.document_answers["a.txt"], last.text);
        assert!(out.answer.contains("\n\n---\n\n"));
    }

    #[test]
    fn answer_frames_each_hit_and_joins_with_divider() {
        let c = corpus(&[("a.txt", "fox den"), ("b.txt", "fox fox trail"), ("c.txt", "no match")], 500);
        let out = search(&c, "fox", 3, None, BonusTarget::Identifier).unwrap();
        assert_eq!(out.sources, vec!["b.txt", "a.txt"]);
        assert_eq!(out.answer, "📄 **b.txt**\nfox fox trail\n\n---\n\n📄 **a.txt**\nfox den");
        assert_eq!(out.documents_searched, 3);
    }

    #[test]
    fn message_outcomes_still_report_documents_searched() {
        let c = corpus(&[("a.txt", "some text here"), ("b.txt", "more text")], 500);
        assert_eq!(search(&c, "is a", 3, None, BonusTarget::Identifier).unwrap().documents_searched, 2);
        assert_eq!(search(&c, "zebra", 3, None, BonusTarget::Identifier).unwrap().documents_searched, 2);
    }

    #[test]
    fn signature_normalizes_query_text() {
        assert_eq!(QuerySignature::new("  Quick FOX ", 3, None), QuerySignature::new("quick fox", 3, None));
        assert_ne!(QuerySignature::new("quick fox", 3, None), QuerySignature::new("quick fox", 4, None));
        assert_ne!(QuerySignature::new("quick fox", 3, None), QuerySignature::new("quick fox", 3, Some("a.txt")));
    }
}
