use crate::cache::ResultCache;
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::history::{QueryHistory, QueryRecord};
use crate::index::Corpus;
use crate::search::{self, QuerySignature, SearchOutcome};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Cache key: the generation pins a result to the snapshot it was computed on.
type CacheKey = (u64, QuerySignature);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EngineStats {
    pub generation: u64,
    pub documents: usize,
    pub chunks: usize,
    pub terms: usize,
    pub cache_entries: usize,
    pub queries_served: u64,
}

/// Owns the current corpus snapshot and answers queries against it.
///
/// Rebuilds construct a whole new [`Corpus`] off-lock and swap it in; searches
/// clone the `Arc` of the snapshot that is current when they start and use it to
/// the end, so a query never mixes chunks from two generations.
pub struct Engine {
    config: EngineConfig,
    current: RwLock<Arc<Corpus>>,
    next_generation: AtomicU64,
    served: AtomicU64,
    cache: ResultCache<CacheKey, Arc<SearchOutcome>>,
    history: QueryHistory,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            cache: ResultCache::new(config.cache_max_entries, config.cache_ttl()),
            history: QueryHistory::new(config.history_limit),
            current: RwLock::new(Arc::new(Corpus::new())),
            next_generation: AtomicU64::new(1),
            served: AtomicU64::new(0),
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig { &self.config }

    /// Replace the whole corpus with `documents` (id -> raw text) and drop every
    /// cached result. Returns the generation that is current afterwards: the new
    /// one, or a newer one installed by a concurrent rebuild that finished first.
    pub fn load_corpus<I>(&self, documents: I) -> u64
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let documents: BTreeMap<String, String> = documents.into_iter().collect();
        let generation = self.next_generation.fetch_add(1, Ordering::SeqCst);
        let corpus = Corpus::build(documents, self.config.chunk_size, self.config.chunk_overlap, generation);
        if corpus.is_empty() {
            tracing::warn!(generation, "corpus rebuilt with no documents");
        }

        self.install(corpus)
    }

    /// Swap `corpus` in unless a newer generation is already current.
    fn install(&self, corpus: Corpus) -> u64 {
        let generation = corpus.generation();
        {
            let mut current = self.current.write();
            // a slower concurrent rebuild must not replace a newer snapshot
            if current.generation() >= generation {
                tracing::debug!(generation, current = current.generation(), "rebuild superseded");
                return current.generation();
            }
            *current = Arc::new(corpus);
        }
        self.cache.clear();
        generation
    }

    /// The snapshot current at the time of the call.
    pub fn snapshot(&self) -> Arc<Corpus> { self.current.read().clone() }

    /// Answer `query`, serving repeated identical queries from the result cache.
    ///
    /// Surrounding whitespace in `document_filter` is ignored and a blank filter
    /// means no filter.
    pub fn search(&self, query: &str, top_k: usize, document_filter: Option<&str>) -> Result<Arc<SearchOutcome>> {
        let corpus = self.snapshot();
        self.search_snapshot(&corpus, query, top_k, document_filter)
    }

    fn search_snapshot(
        &self,
        corpus: &Arc<Corpus>,
        query: &str,
        top_k: usize,
        document_filter: Option<&str>,
    ) -> Result<Arc<SearchOutcome>> {
        if top_k == 0 {
            return Err(EngineError::InvalidTopK);
        }
        if corpus.is_empty() {
            return Err(EngineError::NoDocuments);
        }
        let document_filter = document_filter.map(str::trim).filter(|f| !f.is_empty());

        let generation = corpus.generation();
        let key = (generation, QuerySignature::new(query, top_k, document_filter));
        let outcome = self.cache.get_or_compute_if(
            key,
            || search::search(corpus, query, top_k, document_filter, self.config.bonus_target).map(Arc::new),
            // only results of the current generation are stored
            |_| self.current.read().generation() == generation,
        )?;

        self.served.fetch_add(1, Ordering::Relaxed);
        self.history.push(QueryRecord::now(query, outcome.sources.clone(), outcome.elapsed_seconds()));
        Ok(outcome)
    }

    pub fn history(&self) -> &QueryHistory { &self.history }

    pub fn stats(&self) -> EngineStats {
        let corpus = self.snapshot();
        EngineStats {
            generation: corpus.generation(),
            documents: corpus.document_count(),
            chunks: corpus.chunk_count(),
            terms: corpus.term_count(),
            cache_entries: self.cache.len(),
            queries_served: self.served.load(Ordering::Relaxed),
        }
    }
}
