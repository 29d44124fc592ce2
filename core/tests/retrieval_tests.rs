use rag_core::chunker::chunk;
use rag_core::search::UNSPECIFIC_QUERY;
use rag_core::{Corpus, Engine, EngineConfig, EngineError};
use std::collections::BTreeMap;

fn sample_text(n: usize) -> String {
    (0..n).map(|i| format!("word{}", i % 37)).collect::<Vec<_>>().join(" ")
}

fn corpus_docs() -> BTreeMap<String, String> {
    let mut docs = BTreeMap::new();
    docs.insert("a.txt".to_string(), sample_text(400));
    docs.insert("b.md".to_string(), "rust ownership borrowing lifetimes ".repeat(60));
    docs
}

#[test]
fn building_twice_yields_identical_index() {
    let first = Corpus::build(corpus_docs(), 120, 5, 1);
    let second = Corpus::build(corpus_docs(), 120, 5, 2);
    assert_eq!(first.term_map(), second.term_map());
    assert_eq!(first.chunk_count(), second.chunk_count());
}

#[test]
fn chunks_reconstruct_token_sequence() {
    let text = sample_text(500);
    for overlap in [0usize, 1, 4, 10] {
        let chunks = chunk(&text, 90, overlap);
        let mut rebuilt: Vec<&str> = Vec::new();
        let mut previous_len = 0usize;
        for (i, c) in chunks.iter().enumerate() {
            let tokens: Vec<&str> = c.split_whitespace().collect();
            let skip = if i == 0 { 0 } else { overlap.min(previous_len - 1) };
            rebuilt.extend(&tokens[skip..]);
            previous_len = tokens.len();
        }
        let original: Vec<&str> = text.split_whitespace().collect();
        assert_eq!(rebuilt, original, "overlap {overlap}");
    }
}

#[test]
fn consecutive_chunks_share_overlap_tokens() {
    let text = sample_text(300);
    let k = 3;
    let chunks = chunk(&text, 80, k);
    assert!(chunks.len() > 2);
    for pair in chunks.windows(2) {
        let left: Vec<&str> = pair[0].split_whitespace().collect();
        let right: Vec<&str> = pair[1].split_whitespace().collect();
        assert_eq!(&left[left.len() - k..], &right[..k]);
    }
}

#[test]
fn chunk_is_pure() {
    let text = sample_text(250);
    assert_eq!(chunk(&text, 100, 7), chunk(&text, 100, 7));
}

#[test]
fn single_chunk_document_answers_quick_fox() {
    let engine = Engine::new(EngineConfig::default()).unwrap();
    let text = "the quick brown fox jumps over the lazy dog";
    engine.load_corpus([("a.txt".to_string(), text.to_string())]);

    let out = engine.search("quick fox", 1, None).unwrap();
    assert_eq!(out.sources, vec!["a.txt"]);
    assert_eq!(out.document_answers.len(), 1);
    assert_eq!(out.document_answers["a.txt"], text);
    assert_eq!(out.answer, format!("📄 **a.txt**\n{text}"));
}

#[test]
fn empty_corpus_signals_no_documents() {
    let engine = Engine::new(EngineConfig::default()).unwrap();
    engine.load_corpus(Vec::<(String, String)>::new());
    let err = engine.search("anything", 3, None).unwrap_err();
    assert!(matches!(err, EngineError::NoDocuments));
}

#[test]
fn short_word_query_is_too_unspecific() {
    let engine = Engine::new(EngineConfig::default()).unwrap();
    engine.load_corpus([("a.txt".to_string(), "is a an".to_string())]);
    let out = engine.search("is a an", 3, None).unwrap();
    assert_eq!(out.answer, UNSPECIFIC_QUERY);
    assert!(out.sources.is_empty());
    assert_eq!(out.elapsed_seconds(), 0.0);
}

#[test]
fn top_k_bounds_result_count() {
    let engine = Engine::new(EngineConfig { chunk_size: 60, chunk_overlap: 2, ..Default::default() }).unwrap();
    engine.load_corpus(corpus_docs());
    let out = engine.search("rust ownership", 4, None).unwrap();
    assert_eq!(out.sources.len(), 4);
    assert!(out.sources.iter().all(|s| s == "b.md"));
    assert_eq!(out.answer.matches("\n\n---\n\n").count(), 3);
}
