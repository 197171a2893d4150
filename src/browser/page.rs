//! Page-side collaborator interface: DOM queries and viewport commands
//!
//! The mapping engine never touches a real DOM. The host delivers focusable
//! candidates through a shared snapshot and receives viewport/focus commands
//! over a channel. `PageDom` is the seam the engine and the tests program
//! against.

use std::sync::{Arc, RwLock};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::warn;

/// Opaque reference to a DOM element owned by the host page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementHandle(pub u64);

/// A focusable element as reported by the host, in document order.
///
/// `tab_order` carries the element's explicit tabindex value if it has one.
/// Only positive values influence traversal order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FocusCandidate {
    pub element: ElementHandle,
    pub tab_order: Option<i32>,
}

impl FocusCandidate {
    pub fn new(element: ElementHandle, tab_order: Option<i32>) -> Self {
        Self { element, tab_order }
    }
}

/// Errors for page-side operations
#[derive(Debug, Error)]
pub enum PageError {
    /// The focus target left the document between selection and the focus call
    #[error("focus target is no longer attached to the document")]
    StaleElement,

    /// The host side of the page bridge is gone
    #[error("page command channel closed")]
    BridgeClosed,
}

/// Interface to the page the navigator is driving.
///
/// Implementations must not block; commands are fire-and-forget and queries
/// read the most recent host-published state.
pub trait PageDom: Send + Sync + 'static {
    /// Focusable elements in document order, as last published by the host.
    fn tabbable_candidates(&self) -> Vec<FocusCandidate>;

    /// Moves keyboard focus to the given element.
    fn focus(&self, element: &ElementHandle) -> Result<(), PageError>;

    /// Clicks whatever element currently holds focus.
    fn click_active(&self);

    /// Scrolls the viewport by the given deltas (positive = right/down).
    fn scroll_by(&self, dx: f32, dy: f32);
}

/// Command sent to the host page.
#[derive(Debug, Clone, PartialEq)]
pub enum PageCommand {
    ScrollBy { dx: f32, dy: f32 },
    Focus(ElementHandle),
    ClickActive,
}

/// Host-published view of the page's focusable elements.
///
/// The host replaces the whole candidate list on every DOM change; readers
/// always observe a complete snapshot.
#[derive(Debug, Clone, Default)]
pub struct PageSnapshot {
    inner: Arc<RwLock<Vec<FocusCandidate>>>,
}

impl PageSnapshot {
    pub fn publish(&self, candidates: Vec<FocusCandidate>) {
        match self.inner.write() {
            Ok(mut guard) => *guard = candidates,
            Err(e) => warn!("Page snapshot lock poisoned: {}", e),
        }
    }

    pub fn read(&self) -> Vec<FocusCandidate> {
        match self.inner.read() {
            Ok(guard) => guard.clone(),
            Err(e) => {
                warn!("Page snapshot lock poisoned: {}", e);
                Vec::new()
            }
        }
    }
}

/// Channel-backed `PageDom` implementation handed to the mapping engine.
#[derive(Debug, Clone)]
pub struct PageBridge {
    commands: mpsc::UnboundedSender<PageCommand>,
    snapshot: PageSnapshot,
}

/// Creates the page bridge plus the host-side ends: the command receiver and
/// the snapshot the host publishes candidates into.
pub fn page_bridge() -> (PageBridge, mpsc::UnboundedReceiver<PageCommand>, PageSnapshot) {
    let (tx, rx) = mpsc::unbounded_channel();
    let snapshot = PageSnapshot::default();
    let bridge = PageBridge {
        commands: tx,
        snapshot: snapshot.clone(),
    };
    (bridge, rx, snapshot)
}

impl PageBridge {
    fn send(&self, command: PageCommand) {
        if self.commands.send(command).is_err() {
            warn!("Page command dropped, host side closed");
        }
    }
}

impl PageDom for PageBridge {
    fn tabbable_candidates(&self) -> Vec<FocusCandidate> {
        self.snapshot.read()
    }

    fn focus(&self, element: &ElementHandle) -> Result<(), PageError> {
        // The snapshot is the authority on liveness: an element the host no
        // longer reports cannot receive focus.
        let known = self
            .snapshot
            .read()
            .iter()
            .any(|candidate| candidate.element == *element);
        if !known {
            return Err(PageError::StaleElement);
        }

        self.send(PageCommand::Focus(*element));
        Ok(())
    }

    fn click_active(&self) {
        self.send(PageCommand::ClickActive);
    }

    fn scroll_by(&self, dx: f32, dy: f32) {
        self.send(PageCommand::ScrollBy { dx, dy });
    }
}
