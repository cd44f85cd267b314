//! Token-bounded text splitting
//!
//! Splitters cut text at the coarsest boundary that keeps chunks under the
//! configured token budget, then merge small pieces back together with a
//! bounded overlap between neighbours.

pub mod balanced;
pub mod config;
pub mod error;
pub mod recursive;
pub mod sentence;
pub mod splitter;
pub mod types;

// Re-export main public interfaces
pub use balanced::BalancedTextSplitter;
pub use config::{Separator, SeparatorAffinity, TextSplitConfiguration, TextSplitSettings};
pub use error::{Result, TextSplitterError};
pub use recursive::RecursiveCharacterTextSplitter;
pub use sentence::SentenceTextSplitter;
pub use splitter::TextSplitter;
pub use types::{PlainTextSplit, SplitStatistics};
