// Keyword extraction — ranks the most frequent meaningful words in result titles.

pub mod extractor;
pub mod stoplist;

pub use extractor::{KeywordExtractor, DEFAULT_TOP_N, LEGACY_TOP_N};
