//! Action identifiers and the handler registry.
//!
//! Each action is either discrete (fires once per press edge) or continuous
//! (fires repeatedly while held, driven by the repeat scheduler). The
//! registry is built once at mapper construction and never changes; a lookup
//! miss means the slot is silently inert, because user-edited configuration
//! must never crash navigation.

use crate::browser::{BrowserControl, CycleDirection, PageDom};
use crate::mapping::tabbable::{TabbableIndex, TraversalDirection};
use crate::mapping::SCROLL_INPUT_MULTIPLIER;
use std::collections::HashMap;
use std::fmt::Display;
use tracing::debug;

/// Identifier of one navigation action, named as the configuration panel
/// stores them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Click,
    PreviousPageInHistory,
    NextPageInHistory,
    ReverseTab,
    ForwardTab,
    ScrollUp,
    ScrollDown,
    ScrollLeft,
    ScrollRight,
    ScrollHorizontally,
    ScrollVertically,
    ThumbstickHistoryNavigation,
    ThumbstickTabbing,
    GoToPreviousTab,
    GoToNextTab,
    OpenNewTab,
    OpenNewWindow,
    CloseCurrentTab,
    CloseCurrentWindow,
    GoToPreviousWindow,
    GoToNextWindow,
}

impl Action {
    pub const ALL: [Action; 21] = [
        Action::Click,
        Action::PreviousPageInHistory,
        Action::NextPageInHistory,
        Action::ReverseTab,
        Action::ForwardTab,
        Action::ScrollUp,
        Action::ScrollDown,
        Action::ScrollLeft,
        Action::ScrollRight,
        Action::ScrollHorizontally,
        Action::ScrollVertically,
        Action::ThumbstickHistoryNavigation,
        Action::ThumbstickTabbing,
        Action::GoToPreviousTab,
        Action::GoToNextTab,
        Action::OpenNewTab,
        Action::OpenNewWindow,
        Action::CloseCurrentTab,
        Action::CloseCurrentWindow,
        Action::GoToPreviousWindow,
        Action::GoToNextWindow,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Action::Click => "click",
            Action::PreviousPageInHistory => "previousPageInHistory",
            Action::NextPageInHistory => "nextPageInHistory",
            Action::ReverseTab => "reverseTab",
            Action::ForwardTab => "forwardTab",
            Action::ScrollUp => "scrollUp",
            Action::ScrollDown => "scrollDown",
            Action::ScrollLeft => "scrollLeft",
            Action::ScrollRight => "scrollRight",
            Action::ScrollHorizontally => "scrollHorizontally",
            Action::ScrollVertically => "scrollVertically",
            Action::ThumbstickHistoryNavigation => "thumbstickHistoryNavigation",
            Action::ThumbstickTabbing => "thumbstickTabbing",
            Action::GoToPreviousTab => "goToPreviousTab",
            Action::GoToNextTab => "goToNextTab",
            Action::OpenNewTab => "openNewTab",
            Action::OpenNewWindow => "openNewWindow",
            Action::CloseCurrentTab => "closeCurrentTab",
            Action::CloseCurrentWindow => "closeCurrentWindow",
            Action::GoToPreviousWindow => "goToPreviousWindow",
            Action::GoToNextWindow => "goToNextWindow",
        }
    }

    /// Resolves a stored action name. Unknown names yield `None`; the caller
    /// treats the slot as inert.
    pub fn from_name(name: &str) -> Option<Action> {
        Action::ALL.iter().copied().find(|action| action.name() == name)
    }
}

impl Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Firing discipline of an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionClass {
    /// Fires once when the control crosses the cutoff upward.
    Discrete,
    /// Fires immediately on engagement, then repeatedly on a timer until
    /// the control drops back below the cutoff.
    Continuous,
}

/// Input values handed to a handler for one fire.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionInput {
    /// Sample magnitude with axis inversion already applied.
    pub value: f32,
    /// Per-slot speed factor (0.5–2.5).
    pub speed_factor: f32,
    /// Effective sign after inversion; axes only.
    pub direction: Option<f32>,
    /// Open-in-background flag; buttons only.
    pub background: bool,
}

/// Collaborators a handler may touch during one fire.
pub struct ActionContext<'a> {
    pub tabbable: &'a mut TabbableIndex,
    pub page: &'a dyn PageDom,
    pub browser: &'a dyn BrowserControl,
    pub new_tab_url: &'a str,
}

pub type ActionHandler = for<'a> fn(&mut ActionContext<'a>, &ActionInput);

/// Registry entry: classification plus handler.
#[derive(Debug, Clone, Copy)]
pub struct ActionEntry {
    pub class: ActionClass,
    pub run: ActionHandler,
}

/// Immutable action table. Built once, no runtime registration.
pub struct ActionRegistry {
    entries: HashMap<Action, ActionEntry>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        let mut entries: HashMap<Action, ActionEntry> = HashMap::new();
        let mut discrete = |action: Action, run: ActionHandler| {
            entries.insert(action, ActionEntry { class: ActionClass::Discrete, run });
        };

        discrete(Action::Click, click);
        discrete(Action::PreviousPageInHistory, previous_page_in_history);
        discrete(Action::NextPageInHistory, next_page_in_history);
        discrete(Action::ThumbstickHistoryNavigation, thumbstick_history_navigation);
        discrete(Action::GoToPreviousTab, go_to_previous_tab);
        discrete(Action::GoToNextTab, go_to_next_tab);
        discrete(Action::OpenNewTab, open_new_tab);
        discrete(Action::OpenNewWindow, open_new_window);
        discrete(Action::CloseCurrentTab, close_current_tab);
        discrete(Action::CloseCurrentWindow, close_current_window);
        discrete(Action::GoToPreviousWindow, go_to_previous_window);
        discrete(Action::GoToNextWindow, go_to_next_window);

        let mut continuous = |action: Action, run: ActionHandler| {
            entries.insert(action, ActionEntry { class: ActionClass::Continuous, run });
        };

        continuous(Action::ReverseTab, reverse_tab);
        continuous(Action::ForwardTab, forward_tab);
        continuous(Action::ScrollUp, scroll_up);
        continuous(Action::ScrollDown, scroll_down);
        continuous(Action::ScrollLeft, scroll_left);
        continuous(Action::ScrollRight, scroll_right);
        continuous(Action::ScrollHorizontally, scroll_horizontally);
        continuous(Action::ScrollVertically, scroll_vertically);
        continuous(Action::ThumbstickTabbing, thumbstick_tabbing);

        Self { entries }
    }

    pub fn lookup(&self, action: Action) -> Option<ActionEntry> {
        self.entries.get(&action).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for ActionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn scroll_amount(input: &ActionInput) -> f32 {
    input.value * input.speed_factor * SCROLL_INPUT_MULTIPLIER
}

fn axis_sign(input: &ActionInput) -> f32 {
    input.direction.unwrap_or_else(|| input.value.signum())
}

/// Steps keyboard focus one element in the given direction.
///
/// A target can vanish between cursor movement and the focus call; in that
/// case the snapshot is rebuilt and the focus retried once against the fresh
/// cursor position, then given up.
fn step_focus(ctx: &mut ActionContext<'_>, direction: TraversalDirection) {
    let Some(target) = ctx.tabbable.advance(direction).copied() else {
        return;
    };

    if ctx.page.focus(&target).is_ok() {
        return;
    }

    ctx.tabbable.refresh(ctx.page);
    let Some(retry) = ctx.tabbable.current().copied() else {
        return;
    };
    if let Err(e) = ctx.page.focus(&retry) {
        debug!("Focus retry failed after refresh: {}", e);
    }
}

fn click(ctx: &mut ActionContext<'_>, _input: &ActionInput) {
    ctx.page.click_active();
}

fn previous_page_in_history(ctx: &mut ActionContext<'_>, _input: &ActionInput) {
    ctx.browser.go_back();
}

fn next_page_in_history(ctx: &mut ActionContext<'_>, _input: &ActionInput) {
    ctx.browser.go_forward();
}

fn reverse_tab(ctx: &mut ActionContext<'_>, _input: &ActionInput) {
    step_focus(ctx, TraversalDirection::Backward);
}

fn forward_tab(ctx: &mut ActionContext<'_>, _input: &ActionInput) {
    step_focus(ctx, TraversalDirection::Forward);
}

fn scroll_up(ctx: &mut ActionContext<'_>, input: &ActionInput) {
    ctx.page.scroll_by(0.0, -scroll_amount(input));
}

fn scroll_down(ctx: &mut ActionContext<'_>, input: &ActionInput) {
    ctx.page.scroll_by(0.0, scroll_amount(input));
}

fn scroll_left(ctx: &mut ActionContext<'_>, input: &ActionInput) {
    ctx.page.scroll_by(-scroll_amount(input), 0.0);
}

fn scroll_right(ctx: &mut ActionContext<'_>, input: &ActionInput) {
    ctx.page.scroll_by(scroll_amount(input), 0.0);
}

fn scroll_horizontally(ctx: &mut ActionContext<'_>, input: &ActionInput) {
    ctx.page.scroll_by(scroll_amount(input), 0.0);
}

fn scroll_vertically(ctx: &mut ActionContext<'_>, input: &ActionInput) {
    ctx.page.scroll_by(0.0, scroll_amount(input));
}

fn thumbstick_history_navigation(ctx: &mut ActionContext<'_>, input: &ActionInput) {
    if axis_sign(input) < 0.0 {
        ctx.browser.go_back();
    } else {
        ctx.browser.go_forward();
    }
}

fn thumbstick_tabbing(ctx: &mut ActionContext<'_>, input: &ActionInput) {
    let direction = if axis_sign(input) < 0.0 {
        TraversalDirection::Backward
    } else {
        TraversalDirection::Forward
    };
    step_focus(ctx, direction);
}

fn go_to_previous_tab(ctx: &mut ActionContext<'_>, _input: &ActionInput) {
    ctx.browser.switch_tab(CycleDirection::Previous);
}

fn go_to_next_tab(ctx: &mut ActionContext<'_>, _input: &ActionInput) {
    ctx.browser.switch_tab(CycleDirection::Next);
}

fn open_new_tab(ctx: &mut ActionContext<'_>, input: &ActionInput) {
    ctx.browser.open_tab(!input.background, ctx.new_tab_url);
}

fn open_new_window(ctx: &mut ActionContext<'_>, _input: &ActionInput) {
    ctx.browser.open_window();
}

fn close_current_tab(ctx: &mut ActionContext<'_>, _input: &ActionInput) {
    ctx.browser.close_current_tab();
}

fn close_current_window(ctx: &mut ActionContext<'_>, _input: &ActionInput) {
    ctx.browser.close_current_window();
}

fn go_to_previous_window(ctx: &mut ActionContext<'_>, _input: &ActionInput) {
    ctx.browser.switch_window(CycleDirection::Previous);
}

fn go_to_next_window(ctx: &mut ActionContext<'_>, _input: &ActionInput) {
    ctx.browser.switch_window(CycleDirection::Next);
}
