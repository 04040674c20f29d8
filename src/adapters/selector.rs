// Shared title-selector cell for the scraped Lens adapter.
//
// Google Lens renames its obfuscated CSS classes without notice. The selector
// that last worked lives here for the lifetime of the process and is replaced
// when calibration finds a new one. Updates go through compare-and-swap:
// a request only replaces the selector it actually saw fail, so two requests
// recalibrating at once cannot clobber each other with a stale value.

use std::sync::{Arc, PoisonError, RwLock};

/// Lens title class observed when this adapter was written.
pub const DEFAULT_TITLE_SELECTOR: &str = ".Yt787";

/// Process-wide, cloneable handle to the current title selector.
#[derive(Debug, Clone)]
pub struct SelectorRegistry {
    current: Arc<RwLock<String>>,
}

impl Default for SelectorRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_TITLE_SELECTOR)
    }
}

impl SelectorRegistry {
    pub fn new(initial: &str) -> Self {
        Self {
            current: Arc::new(RwLock::new(initial.to_string())),
        }
    }

    /// The selector to try first.
    pub fn current(&self) -> String {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the selector only if it is still `expected`.
    ///
    /// Returns false when another caller already changed it; the caller
    /// should then re-read `current()`.
    pub fn compare_and_swap(&self, expected: &str, new: &str) -> bool {
        let mut current = self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if *current != expected {
            return false;
        }
        *current = new.to_string();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_with_default() {
        assert_eq!(SelectorRegistry::default().current(), DEFAULT_TITLE_SELECTOR);
    }

    #[test]
    fn swap_succeeds_when_expected_matches() {
        let registry = SelectorRegistry::new(".old");
        assert!(registry.compare_and_swap(".old", ".new"));
        assert_eq!(registry.current(), ".new");
    }

    #[test]
    fn swap_fails_after_another_writer() {
        let registry = SelectorRegistry::new(".old");
        let other = registry.clone();
        assert!(other.compare_and_swap(".old", ".winner"));
        assert!(!registry.compare_and_swap(".old", ".loser"));
        assert_eq!(registry.current(), ".winner");
    }

    #[test]
    fn independent_registries_do_not_share_state() {
        let a = SelectorRegistry::new(".a");
        let b = SelectorRegistry::new(".a");
        assert!(a.compare_and_swap(".a", ".changed"));
        assert_eq!(b.current(), ".a");
    }
}
