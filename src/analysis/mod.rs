//! Analysis modules.
//!
//! Attribution of cost to entities and ranking of the result.

pub mod aggregator;
pub mod summarizer;

pub use aggregator::*;
pub use summarizer::*;
