use crate::chunker::chunk;
use crate::tokenizer::tokenize;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Position of a chunk in [`Corpus::chunks`]. Only meaningful within one generation.
pub type ChunkId = u32;

#[derive(Debug, Clone, Serialize)]
pub struct Document {
    pub id: String,
    pub text: String,
    /// Chunk ids in ordinal order.
    pub chunks: Vec<ChunkId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Chunk {
    pub document_id: String,
    pub ordinal: usize,
    pub text: String,
}

impl Chunk {
    /// Identifier string of the chunk, e.g. `report.txt_3`.
    pub fn label(&self) -> String {
        format!("{}_{}", self.document_id, self.ordinal)
    }
}

/// One immutable generation of the corpus: documents, their chunks and the
/// term index over those chunks. Built wholesale, never updated in place.
#[derive(Debug, Default)]
pub struct Corpus {
    generation: u64,
    documents: BTreeMap<String, Document>,
    chunks: Vec<Chunk>,
    /// term -> chunk ids, one entry per occurrence
    postings: HashMap<String, Vec<ChunkId>>,
}

impl Corpus {
    pub fn new() -> Self { Self::default() }

    /// Chunk every document and index the chunks. Documents are processed in
    /// ascending id order, so chunk ids follow `(document_id, ordinal)` order.
    pub fn build(documents: BTreeMap<String, String>, chunk_size: usize, overlap: usize, generation: u64) -> Self {
        let mut corpus = Corpus { generation, ..Default::default() };

        for (doc_id, text) in documents {
            let mut ids = Vec::new();
            for (ordinal, piece) in chunk(&text, chunk_size, overlap).into_iter().enumerate() {
                let chunk_id = corpus.chunks.len() as ChunkId;
                for term in tokenize(&piece) {
                    corpus.postings.entry(term).or_default().push(chunk_id);
                }
                corpus.chunks.push(Chunk { document_id: doc_id.clone(), ordinal, text: piece });
                ids.push(chunk_id);
            }
            corpus.documents.insert(doc_id.clone(), Document { id: doc_id, text, chunks: ids });
        }

        tracing::info!(
            generation,
            documents = corpus.documents.len(),
            chunks = corpus.chunks.len(),
            terms = corpus.postings.len(),
            "built search index"
        );
        corpus
    }

    pub fn generation(&self) -> u64 { self.generation }

    pub fn is_empty(&self) -> bool { self.documents.is_empty() }

    pub fn document_count(&self) -> usize { self.documents.len() }

    pub fn chunk_count(&self) -> usize { self.chunks.len() }

    pub fn term_count(&self) -> usize { self.postings.len() }

    pub fn document(&self, id: &str) -> Option<&Document> { self.documents.get(id) }

    pub fn documents(&self) -> impl Iterator<Item = &Document> { self.documents.values() }

    pub fn chunk(&self, id: ChunkId) -> Option<&Chunk> { self.chunks.get(id as usize) }

    /// Chunks of one document in ordinal order.
    pub fn chunks_of<'a>(&'a self, document_id: &str) -> impl Iterator<Item = &'a Chunk> + 'a {
        self.documents
            .get(document_id)
            .into_iter()
            .flat_map(move |doc| doc.chunks.iter().filter_map(move |&id| self.chunk(id)))
    }

    /// Posting list for an already normalized term; empty when the term is unknown.
    pub fn postings(&self, term: &str) -> &[ChunkId] {
        self.postings.get(term).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Term -> chunk identities, for comparing index contents across generations.
    pub fn term_map(&self) -> BTreeMap<&str, Vec<(&str, usize)>> {
        self.postings
            .iter()
            .map(|(term, ids)| {
                let owners = ids
                    .iter()
                    .filter_map(|&id| self.chunk(id))
                    .map(|c| (c.document_id.as_str(), c.ordinal))
                    .collect();
                (term.as_str(), owners)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn docs(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn empty_corpus_has_empty_index() {
        let corpus = Corpus::build(BTreeMap::new(), 500, 50, 1);
        assert!(corpus.is_empty());
        assert_eq!(corpus.term_count(), 0);
        assert_eq!(corpus.chunk_count(), 0);
    }

    #[test]
    fn postings_keep_one_entry_per_occurrence() {
        let corpus = Corpus::build(docs(&[("a.txt", "rust rust Rust is fun")]), 500, 50, 1);
        assert_eq!(corpus.postings("rust"), &[0, 0, 0]);
        assert_eq!(corpus.postings("fun"), &[0]);
        // two-letter tokens are not indexed
        assert!(corpus.postings("is").is_empty());
    }

    #[test]
    fn every_posting_resolves_to_a_chunk() {
        let text = (0..200).map(|i| format!("token{i}")).collect::<Vec<_>>().join(" ");
        let corpus = Corpus::build(docs(&[("a.txt", &text), ("b.txt", "short one")]), 100, 3, 1);
        assert!(corpus.chunk_count() > 2);
        for owners in corpus.term_map().values() {
            for (doc, ordinal) in owners {
                assert!(corpus.chunks_of(doc).any(|c| c.ordinal == *ordinal));
            }
        }
    }

    #[test]
    fn ordinals_follow_emission_order() {
        let text = (0..50).map(|i| format!("w{i:03}")).collect::<Vec<_>>().join(" ");
        let corpus = Corpus::build(docs(&[("a.txt", &text)]), 20, 0, 1);
        let ordinals: Vec<usize> = corpus.chunks_of("a.txt").map(|c| c.ordinal).collect();
        assert_eq!(ordinals, (0..ordinals.len()).collect::<Vec<_>>());
        assert_eq!(corpus.chunk(0).map(Chunk::label).as_deref(), Some("a.txt_0"));
    }
}
