//! Live index of focusable page elements for tab-traversal actions.
//!
//! The index is rebuilt wholesale whenever the host reports a DOM mutation;
//! handlers only ever see a complete snapshot. Element handles must not be
//! cached across a rebuild, so all access goes through the cursor API here.

use crate::browser::page::{ElementHandle, FocusCandidate, PageDom};
use std::cmp::Ordering;
use tracing::debug;

/// Direction of cursor movement through the tabbable sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraversalDirection {
    Forward,
    Backward,
}

/// Ordered sequence of focusable elements plus a traversal cursor.
#[derive(Debug, Default)]
pub struct TabbableIndex {
    snapshot: Vec<ElementHandle>,
    cursor: usize,
}

impl TabbableIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds the snapshot from the page's current candidates.
    ///
    /// The previous snapshot is replaced atomically and the cursor clamped
    /// back into range, so a shrinking document never leaves the cursor
    /// dangling.
    pub fn refresh(&mut self, page: &dyn PageDom) {
        let mut candidates = page.tabbable_candidates();
        candidates.sort_by(tab_order_cmp);

        self.snapshot = candidates
            .into_iter()
            .map(|candidate| candidate.element)
            .collect();

        if self.cursor >= self.snapshot.len() {
            self.cursor = self.snapshot.len().saturating_sub(1);
        }

        debug!("Tabbable index rebuilt: {} elements", self.snapshot.len());
    }

    /// Element under the cursor, if any.
    pub fn current(&self) -> Option<&ElementHandle> {
        self.snapshot.get(self.cursor)
    }

    /// Moves the cursor one step, wrapping at either end. Returns the new
    /// current element; a no-op on an empty snapshot.
    pub fn advance(&mut self, direction: TraversalDirection) -> Option<&ElementHandle> {
        if self.snapshot.is_empty() {
            return None;
        }

        let len = self.snapshot.len();
        self.cursor = match direction {
            TraversalDirection::Forward => (self.cursor + 1) % len,
            TraversalDirection::Backward => (self.cursor + len - 1) % len,
        };
        self.current()
    }

    pub fn len(&self) -> usize {
        self.snapshot.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot.is_empty()
    }
}

/// Ordering rule for tab traversal: elements with an explicit positive tab
/// order come first, ascending; everything else keeps document order (the
/// comparator reports Equal and the stable sort preserves input order).
fn tab_order_cmp(a: &FocusCandidate, b: &FocusCandidate) -> Ordering {
    let a_order = a.tab_order.filter(|order| *order > 0);
    let b_order = b.tab_order.filter(|order| *order > 0);

    match (a_order, b_order) {
        (Some(a_value), Some(b_value)) => a_value.cmp(&b_value),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
