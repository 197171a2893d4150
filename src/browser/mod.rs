//! Browser-side collaborators of the mapping engine.
//!
//! Two seams live here: `BrowserControl` for tab/window/history plumbing that
//! only the host browser can perform, and `PageDom` (in [`page`]) for
//! viewport and focus work inside the current page. The engine talks to trait
//! objects; the channel bridges below forward every call as a command to the
//! host process.

pub mod page;

pub use page::{
    page_bridge, ElementHandle, FocusCandidate, PageBridge, PageCommand, PageDom, PageError,
};

use std::fmt::Display;
use tokio::sync::mpsc;
use tracing::warn;

/// Direction for cycling through tabs or windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleDirection {
    Previous,
    Next,
}

impl Display for CycleDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CycleDirection::Previous => write!(f, "previous"),
            CycleDirection::Next => write!(f, "next"),
        }
    }
}

/// Tab, window, and history operations delegated to the host browser.
///
/// Calls are fire-and-forget: the engine must stay live whether or not the
/// host honors a command, so nothing here returns an error.
pub trait BrowserControl: Send + Sync + 'static {
    fn open_tab(&self, active: bool, url: &str);
    fn switch_tab(&self, direction: CycleDirection);
    fn close_current_tab(&self);
    fn open_window(&self);
    fn close_current_window(&self);
    fn switch_window(&self, direction: CycleDirection);
    fn go_back(&self);
    fn go_forward(&self);
}

/// Command sent to the host browser.
#[derive(Debug, Clone, PartialEq)]
pub enum BrowserCommand {
    OpenTab { active: bool, url: String },
    SwitchTab(CycleDirection),
    CloseCurrentTab,
    OpenWindow,
    CloseCurrentWindow,
    SwitchWindow(CycleDirection),
    GoBack,
    GoForward,
}

/// Channel-backed `BrowserControl` implementation handed to the engine.
#[derive(Debug, Clone)]
pub struct BrowserBridge {
    commands: mpsc::UnboundedSender<BrowserCommand>,
}

/// Creates the browser bridge plus the host-side command receiver.
pub fn browser_bridge() -> (BrowserBridge, mpsc::UnboundedReceiver<BrowserCommand>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (BrowserBridge { commands: tx }, rx)
}

impl BrowserBridge {
    fn send(&self, command: BrowserCommand) {
        if self.commands.send(command).is_err() {
            warn!("Browser command dropped, host side closed");
        }
    }
}

impl BrowserControl for BrowserBridge {
    fn open_tab(&self, active: bool, url: &str) {
        self.send(BrowserCommand::OpenTab {
            active,
            url: url.to_string(),
        });
    }

    fn switch_tab(&self, direction: CycleDirection) {
        self.send(BrowserCommand::SwitchTab(direction));
    }

    fn close_current_tab(&self) {
        self.send(BrowserCommand::CloseCurrentTab);
    }

    fn open_window(&self) {
        self.send(BrowserCommand::OpenWindow);
    }

    fn close_current_window(&self) {
        self.send(BrowserCommand::CloseCurrentWindow);
    }

    fn switch_window(&self, direction: CycleDirection) {
        self.send(BrowserCommand::SwitchWindow(direction));
    }

    fn go_back(&self) {
        self.send(BrowserCommand::GoBack);
    }

    fn go_forward(&self) {
        self.send(BrowserCommand::GoForward);
    }
}
