//! Text chunking and vector indexing for retrieval pipelines
//!
//! [`text`] turns documents into token-budgeted chunks that keep track of
//! where they came from; [`index`] stores chunk embeddings and answers
//! similarity queries.

pub mod index;
pub mod text;
pub mod util;
