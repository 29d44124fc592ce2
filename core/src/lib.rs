pub mod cache;
pub mod chunker;
pub mod config;
pub mod engine;
pub mod error;
pub mod history;
pub mod index;
pub mod loader;
pub mod search;
pub mod tokenizer;

pub use config::{BonusTarget, EngineConfig};
pub use engine::{Engine, EngineStats};
pub use error::{EngineError, Result};
pub use index::{Chunk, ChunkId, Corpus, Document};
pub use search::{QuerySignature, SearchOutcome};
