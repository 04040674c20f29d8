// Default noise filter for result titles.
//
// Titles of reverse-image-search hits are full of marketplace, social and
// commerce vocabulary that says nothing about what the object is. Generic
// collectible-toy words are filtered too, since a plush Charmander and a
// Charmander figure are both "Charmander".

/// English function words.
pub const FUNCTION_WORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by",
    "is", "are", "was", "were", "be", "been",
];

/// Commerce terms and marketplace / social platform names.
pub const COMMERCE_WORDS: &[&str] = &[
    "buy", "sell", "shop", "online", "store", "price", "best", "review", "images", "photos",
    "video", "youtube", "com", "www", "http", "https", "reddit", "ebay", "amazon", "pinterest",
    "twitter", "facebook", "instagram", "new", "used", "sale", "free", "shipping", "official",
    "licensed", "authentic",
];

/// Generic collectible-toy terms.
pub const COLLECTIBLE_WORDS: &[&str] = &[
    "stuffed", "animal", "toy", "plush", "soft", "doll", "figure", "figurine", "japan", "center",
    "collection",
];

/// All default stop words, in one iterator.
pub fn default_stop_words() -> impl Iterator<Item = &'static str> {
    FUNCTION_WORDS
        .iter()
        .chain(COMMERCE_WORDS)
        .chain(COLLECTIBLE_WORDS)
        .copied()
}
