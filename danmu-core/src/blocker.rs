//! Item blockers
//!
//! A blocker hides items without touching them. The configured set is
//! combined with a logical OR: an item is hidden when any blocker claims it.

use crate::item::OverlayItem;
use crate::kind::KindTag;
use std::fmt;
use std::sync::Arc;

/// Predicate deciding whether an item must be hidden
pub trait Blocker: Send + Sync {
    fn blocks(&self, item: &OverlayItem) -> bool;

    /// Short label used in logs
    fn name(&self) -> &str {
        "custom"
    }
}

impl<F> Blocker for F
where
    F: Fn(&OverlayItem) -> bool + Send + Sync,
{
    fn blocks(&self, item: &OverlayItem) -> bool {
        self(item)
    }
}

/// Hides items whose text contains any of the given keywords
#[derive(Debug, Clone, Default)]
pub struct KeywordBlocker {
    keywords: Vec<String>,
}

impl KeywordBlocker {
    /// Keywords are matched case-insensitively; empty keywords are ignored
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            keywords: keywords
                .into_iter()
                .map(|k| k.as_ref().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
        }
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }
}

impl Blocker for KeywordBlocker {
    fn blocks(&self, item: &OverlayItem) -> bool {
        if self.keywords.is_empty() {
            return false;
        }
        let text = item.text.to_lowercase();
        self.keywords.iter().any(|k| text.contains(k.as_str()))
    }

    fn name(&self) -> &str {
        "keyword"
    }
}

/// Hides every item of the given concrete kinds
#[derive(Debug, Clone, Default)]
pub struct KindBlocker {
    kinds: Vec<KindTag>,
}

impl KindBlocker {
    pub fn new(kinds: impl IntoIterator<Item = KindTag>) -> Self {
        Self {
            kinds: kinds.into_iter().collect(),
        }
    }
}

impl Blocker for KindBlocker {
    fn blocks(&self, item: &OverlayItem) -> bool {
        self.kinds.contains(&item.tag_kind())
    }

    fn name(&self) -> &str {
        "kind"
    }
}

/// Ordered collection of blockers
#[derive(Clone, Default)]
pub struct BlockerSet {
    blockers: Vec<Arc<dyn Blocker>>,
}

impl BlockerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, blocker: impl Blocker + 'static) {
        self.blockers.push(Arc::new(blocker));
    }

    pub fn push_shared(&mut self, blocker: Arc<dyn Blocker>) {
        self.blockers.push(blocker);
    }

    /// True when any blocker claims the item
    pub fn blocks(&self, item: &OverlayItem) -> bool {
        self.blockers.iter().any(|b| b.blocks(item))
    }

    pub fn len(&self) -> usize {
        self.blockers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blockers.is_empty()
    }
}

impl fmt::Debug for BlockerSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.blockers.iter().map(|b| b.name()))
            .finish()
    }
}
