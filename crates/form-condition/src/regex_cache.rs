use std::{cell::RefCell, num::NonZeroUsize, rc::Rc};

use lru::LruCache;
use regex::Regex;

/// Default maximum number of cached compiled regexes.
const DEFAULT_CAPACITY: usize = 128;

/// Size-bounded cache of compiled regular expressions for one evaluator.
pub struct RegexCache {
    /// Compiled patterns keyed by source.
    map: RefCell<LruCache<String, Rc<Regex>>>,
}

impl Default for RegexCache {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl RegexCache {
    /// Create a cache holding at most `capacity` patterns (at least one).
    pub fn with_capacity(capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            map: RefCell::new(LruCache::new(cap)),
        }
    }

    /// Get a compiled regex for `pattern`, compiling and caching on miss.
    pub fn get_or_compile(&self, pattern: &str) -> Result<Rc<Regex>, regex::Error> {
        if let Some(found) = self.map.borrow_mut().get(pattern).cloned() {
            return Ok(found);
        }
        let compiled = Rc::new(Regex::new(pattern)?);
        self.map
            .borrow_mut()
            .put(pattern.to_string(), compiled.clone());
        Ok(compiled)
    }

    /// Number of cached patterns.
    pub fn len(&self) -> usize {
        self.map.borrow().len()
    }

    /// True when nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reuses_compiled_patterns_and_evicts() {
        let cache = RegexCache::with_capacity(2);
        let a = cache.get_or_compile("^a").unwrap();
        let again = cache.get_or_compile("^a").unwrap();
        assert!(Rc::ptr_eq(&a, &again));
        cache.get_or_compile("^b").unwrap();
        cache.get_or_compile("^c").unwrap();
        assert_eq!(cache.len(), 2);
        assert!(cache.get_or_compile("(").is_err());
        assert_eq!(cache.len(), 2);
    }
}
