//! The input mapper: owns slot configuration and all engine state.
//!
//! Every raw sample flows through [`InputMapper::on_input_change`], which
//! resolves the slot's effective action, applies the cutoff threshold, and
//! either fires a discrete handler on the press edge or drives the repeat
//! scheduler for continuous actions. [`InputMapper::tick`] dispatches due
//! repeat fires; the service loop sleeps until [`InputMapper::next_deadline`].
//!
//! All processing is synchronous: by the time a call returns, its effects on
//! timers and the tabbable index are visible, so a release observed later in
//! the same scheduling turn always wins over a pending tick.

use crate::browser::{BrowserControl, PageDom};
use crate::mapping::actions::{ActionClass, ActionHandler, ActionInput, ActionRegistry};
use crate::mapping::repeat::{repeat_interval, RepeatScheduler};
use crate::mapping::slots::{resolve_slots, ControlSlot, InputSample, SlotId, SlotKind};
use crate::mapping::tabbable::TabbableIndex;
use crate::persistence::NavigatorConfig;
use std::collections::HashMap;
use tokio::time::Instant;
use tracing::{debug, info};

/// Orchestrator translating input samples into navigation effects.
pub struct InputMapper {
    slots: HashMap<SlotId, ControlSlot>,
    cutoff: f32,
    new_tab_url: String,
    registry: ActionRegistry,
    scheduler: RepeatScheduler,
    tabbable: TabbableIndex,
    page: Box<dyn PageDom>,
    browser: Box<dyn BrowserControl>,
    disposed: bool,
}

impl InputMapper {
    /// Builds a mapper from stored configuration and its two collaborators.
    ///
    /// Slot resolution happens here, once: after construction every sample
    /// lookup hits a precomputed effective action. The tabbable index is
    /// primed immediately so focus traversal works before the first DOM
    /// mutation arrives.
    pub fn new(
        config: &NavigatorConfig,
        page: Box<dyn PageDom>,
        browser: Box<dyn BrowserControl>,
    ) -> Self {
        let slots = resolve_slots(&config.gamepad_configuration);
        let bound = slots.values().filter(|slot| slot.action.is_some()).count();
        info!("Input mapper created: {} of {} slots bound", bound, slots.len());

        let mut tabbable = TabbableIndex::new();
        tabbable.refresh(page.as_ref());

        Self {
            slots,
            cutoff: config.cutoff_value,
            new_tab_url: config.new_tab_url.clone(),
            registry: ActionRegistry::new(),
            scheduler: RepeatScheduler::new(),
            tabbable,
            page,
            browser,
            disposed: false,
        }
    }

    /// Processes one input-change notification.
    pub fn on_input_change(&mut self, sample: InputSample, now: Instant) {
        if self.disposed {
            debug!("Sample after dispose ignored");
            return;
        }
        if !sample.is_well_formed() {
            debug!("Dropping malformed sample: {:?}", sample);
            return;
        }

        let Some(slot) = self.slots.get_mut(&(sample.kind, sample.index)) else {
            debug!("Dropping sample for unknown slot: {:?}", sample);
            return;
        };

        let engaged = sample.value.abs() >= self.cutoff;
        let was_engaged = slot.engaged;
        slot.engaged = engaged;

        let Some(action) = slot.action else {
            return;
        };
        let speed_factor = slot.speed_factor;
        let invert = slot.invert;
        let background = slot.background;

        // An action id without a registered handler is silently inert:
        // user-editable configuration must never crash navigation.
        let Some(entry) = self.registry.lookup(action) else {
            return;
        };

        let value = if invert { -sample.value } else { sample.value };
        let input = ActionInput {
            value,
            speed_factor,
            direction: matches!(sample.kind, SlotKind::Axis).then(|| value.signum()),
            background,
        };

        match entry.class {
            ActionClass::Discrete => {
                // Fires on the rising edge only; holding above the cutoff
                // does not re-fire.
                if engaged && !was_engaged {
                    self.dispatch(entry.run, &input);
                }
            }
            ActionClass::Continuous => {
                if engaged {
                    let interval = repeat_interval(speed_factor);
                    if self.scheduler.start(action, interval, input.clone(), now) {
                        self.dispatch(entry.run, &input);
                    }
                } else if was_engaged {
                    self.scheduler.stop(action);
                }
            }
        }
    }

    /// Dispatches every repeat fire due at `now`.
    pub fn tick(&mut self, now: Instant) {
        if self.disposed {
            return;
        }
        for (action, drive) in self.scheduler.poll_due(now) {
            if let Some(entry) = self.registry.lookup(action) {
                self.dispatch(entry.run, &drive);
            }
        }
    }

    /// Earliest pending repeat deadline.
    pub fn next_deadline(&self) -> Option<Instant> {
        if self.disposed {
            None
        } else {
            self.scheduler.next_deadline()
        }
    }

    /// Rebuilds the tabbable index; called for every DOM mutation notice.
    pub fn on_mutation(&mut self) {
        if self.disposed {
            return;
        }
        self.tabbable.refresh(self.page.as_ref());
    }

    /// Device went away: cancel everything, exactly like `dispose`.
    pub fn on_device_disconnected(&mut self) {
        info!("Device disconnected, tearing down mapper");
        self.dispose();
    }

    /// Cancels all repeat timers and makes the mapper inert. Idempotent.
    /// After this returns no handler can be invoked again.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.scheduler.stop_all();
        self.disposed = true;
        info!("Input mapper disposed");
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn active_timer_count(&self) -> usize {
        self.scheduler.active_count()
    }

    fn dispatch(&mut self, run: ActionHandler, input: &ActionInput) {
        let mut ctx = crate::mapping::actions::ActionContext {
            tabbable: &mut self.tabbable,
            page: self.page.as_ref(),
            browser: self.browser.as_ref(),
            new_tab_url: &self.new_tab_url,
        };
        run(&mut ctx, input);
    }
}

impl Drop for InputMapper {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::page::{page_bridge, ElementHandle, FocusCandidate, PageCommand, PageSnapshot};
    use crate::browser::{browser_bridge, BrowserCommand};
    use crate::persistence::StoredBinding;
    use pretty_assertions::assert_eq;
    use std::time::Duration;
    use tokio::sync::mpsc::error::TryRecvError;
    use tokio::sync::mpsc::UnboundedReceiver;

    struct Fixture {
        mapper: InputMapper,
        page_rx: UnboundedReceiver<PageCommand>,
        browser_rx: UnboundedReceiver<BrowserCommand>,
        snapshot: PageSnapshot,
        t0: Instant,
    }

    impl Fixture {
        fn new() -> Self {
            Self::with_config(&NavigatorConfig::default())
        }

        fn with_config(config: &NavigatorConfig) -> Self {
            let (page, page_rx, snapshot) = page_bridge();
            let (browser, browser_rx) = browser_bridge();
            let mapper = InputMapper::new(config, Box::new(page), Box::new(browser));
            Self {
                mapper,
                page_rx,
                browser_rx,
                snapshot,
                t0: Instant::now(),
            }
        }

        fn at(&self, ms: u64) -> Instant {
            self.t0 + Duration::from_millis(ms)
        }

        fn drain_page(&mut self) -> Vec<PageCommand> {
            let mut commands = Vec::new();
            while let Ok(command) = self.page_rx.try_recv() {
                commands.push(command);
            }
            commands
        }

        fn drain_browser(&mut self) -> Vec<BrowserCommand> {
            let mut commands = Vec::new();
            while let Ok(command) = self.browser_rx.try_recv() {
                commands.push(command);
            }
            commands
        }
    }

    // Button 0 is bound to click by default; it is the discrete probe.
    // Axis 1 is bound to scrollVertically; it is the continuous probe.

    #[test]
    fn discrete_action_fires_once_per_rising_edge() {
        let mut fixture = Fixture::new();

        fixture.mapper.on_input_change(InputSample::button(0, 0.25), fixture.at(0));
        assert_eq!(fixture.drain_page(), vec![PageCommand::ClickActive]);

        // Still held above the cutoff: no re-fire.
        fixture.mapper.on_input_change(InputSample::button(0, 1.0), fixture.at(10));
        fixture.mapper.on_input_change(InputSample::button(0, 0.9), fixture.at(20));
        assert_eq!(fixture.drain_page(), vec![]);

        // Release and press again: a new edge, a new fire.
        fixture.mapper.on_input_change(InputSample::button(0, 0.0), fixture.at(30));
        fixture.mapper.on_input_change(InputSample::button(0, 1.0), fixture.at(40));
        assert_eq!(fixture.drain_page(), vec![PageCommand::ClickActive]);
    }

    #[test]
    fn below_cutoff_samples_never_trigger() {
        let mut fixture = Fixture::new();

        fixture.mapper.on_input_change(InputSample::button(0, 0.19), fixture.at(0));
        fixture.mapper.on_input_change(InputSample::axis(1, 0.1), fixture.at(5));

        assert_eq!(fixture.drain_page(), vec![]);
        assert_eq!(fixture.mapper.active_timer_count(), 0);
    }

    #[test]
    fn continuous_action_fires_immediately_then_on_cadence() {
        let mut fixture = Fixture::new();

        // Axis 1 at full deflection, speed factor 1.0 => 100ms period.
        fixture.mapper.on_input_change(InputSample::axis(1, 1.0), fixture.at(0));
        assert_eq!(
            fixture.drain_page(),
            vec![PageCommand::ScrollBy { dx: 0.0, dy: 50.0 }]
        );
        assert_eq!(fixture.mapper.next_deadline(), Some(fixture.at(100)));

        fixture.mapper.tick(fixture.at(100));
        fixture.mapper.tick(fixture.at(200));
        assert_eq!(
            fixture.drain_page(),
            vec![
                PageCommand::ScrollBy { dx: 0.0, dy: 50.0 },
                PageCommand::ScrollBy { dx: 0.0, dy: 50.0 },
            ]
        );
    }

    #[test]
    fn higher_speed_factor_shortens_the_cadence() {
        let mut config = NavigatorConfig::default();
        config.gamepad_configuration.axes.insert(
            "1".to_string(),
            StoredBinding {
                speed_factor: Some(2.0),
                ..StoredBinding::default()
            },
        );
        let mut fixture = Fixture::with_config(&config);

        fixture.mapper.on_input_change(InputSample::axis(1, 1.0), fixture.at(0));
        assert_eq!(fixture.mapper.next_deadline(), Some(fixture.at(50)));
    }

    #[test]
    fn deeper_deflection_accelerates_without_phase_restart() {
        let mut fixture = Fixture::new();

        fixture.mapper.on_input_change(InputSample::axis(1, 0.5), fixture.at(0));
        fixture.drain_page();

        // Same action, new magnitude while held: the stored drive updates,
        // the pending deadline stays derived from the first fire.
        fixture.mapper.on_input_change(InputSample::axis(1, 1.0), fixture.at(30));
        assert_eq!(fixture.drain_page(), vec![]);
        assert_eq!(fixture.mapper.active_timer_count(), 1);
        assert_eq!(fixture.mapper.next_deadline(), Some(fixture.at(100)));

        fixture.mapper.tick(fixture.at(100));
        assert_eq!(
            fixture.drain_page(),
            vec![PageCommand::ScrollBy { dx: 0.0, dy: 50.0 }]
        );
    }

    #[test]
    fn release_cancels_pending_fires() {
        let mut fixture = Fixture::new();

        fixture.mapper.on_input_change(InputSample::axis(1, 1.0), fixture.at(0));
        fixture.drain_page();

        fixture.mapper.on_input_change(InputSample::axis(1, 0.05), fixture.at(40));
        assert_eq!(fixture.mapper.active_timer_count(), 0);
        assert_eq!(fixture.mapper.next_deadline(), None);

        fixture.mapper.tick(fixture.at(500));
        assert_eq!(fixture.drain_page(), vec![]);
    }

    #[test]
    fn invert_negates_the_handler_value_only() {
        let mut config = NavigatorConfig::default();
        config.gamepad_configuration.axes.insert(
            "1".to_string(),
            StoredBinding {
                invert: Some(true),
                ..StoredBinding::default()
            },
        );
        let mut fixture = Fixture::with_config(&config);

        fixture.mapper.on_input_change(InputSample::axis(1, 1.0), fixture.at(0));
        assert_eq!(
            fixture.drain_page(),
            vec![PageCommand::ScrollBy { dx: 0.0, dy: -50.0 }]
        );
        // Timing is untouched by inversion.
        assert_eq!(fixture.mapper.next_deadline(), Some(fixture.at(100)));
    }

    #[test]
    fn dispose_guarantees_no_further_invocations() {
        let mut fixture = Fixture::new();

        fixture.mapper.on_input_change(InputSample::axis(1, 1.0), fixture.at(0));
        fixture.drain_page();

        fixture.mapper.dispose();
        assert_eq!(fixture.mapper.active_timer_count(), 0);

        fixture.mapper.tick(fixture.at(1000));
        fixture.mapper.on_input_change(InputSample::button(0, 1.0), fixture.at(1001));
        assert_eq!(fixture.drain_page(), vec![]);

        // Double dispose is fine.
        fixture.mapper.dispose();
    }

    #[test]
    fn device_disconnect_equals_dispose() {
        let mut fixture = Fixture::new();

        fixture.mapper.on_input_change(InputSample::axis(1, 1.0), fixture.at(0));
        fixture.drain_page();

        fixture.mapper.on_device_disconnected();
        assert!(fixture.mapper.is_disposed());

        fixture.mapper.tick(fixture.at(500));
        assert_eq!(fixture.drain_page(), vec![]);
    }

    #[test]
    fn malformed_and_unknown_samples_are_dropped() {
        let mut fixture = Fixture::new();

        fixture.mapper.on_input_change(InputSample::axis(1, 7.5), fixture.at(0));
        fixture.mapper.on_input_change(InputSample::axis(9, 1.0), fixture.at(1));
        fixture.mapper.on_input_change(InputSample::button(16, 1.0), fixture.at(2));
        fixture.mapper.on_input_change(InputSample::button(0, f32::NAN), fixture.at(3));

        assert_eq!(fixture.drain_page(), vec![]);
        assert_eq!(fixture.drain_browser(), vec![]);
        assert_eq!(fixture.mapper.active_timer_count(), 0);
    }

    #[test]
    fn unbound_slot_is_inert() {
        let mut fixture = Fixture::new();

        // Button 1 has no default action.
        fixture.mapper.on_input_change(InputSample::button(1, 1.0), fixture.at(0));
        assert_eq!(fixture.drain_page(), vec![]);
        assert_eq!(fixture.drain_browser(), vec![]);
    }

    #[test]
    fn mutation_notice_rebuilds_the_tabbable_index() {
        let mut config = NavigatorConfig::default();
        // Bind button 5 (forwardTab by default) at speed 1.0 for a clean probe.
        config.gamepad_configuration.buttons.insert(
            "5".to_string(),
            StoredBinding {
                speed_factor: Some(1.0),
                ..StoredBinding::default()
            },
        );
        let mut fixture = Fixture::with_config(&config);

        fixture.snapshot.publish(vec![
            FocusCandidate::new(ElementHandle(1), None),
            FocusCandidate::new(ElementHandle(2), None),
        ]);
        fixture.mapper.on_mutation();

        fixture.mapper.on_input_change(InputSample::button(5, 1.0), fixture.at(0));
        assert_eq!(
            fixture.drain_page(),
            vec![PageCommand::Focus(ElementHandle(2))]
        );
    }

    #[test]
    fn discrete_history_navigation_from_thumbstick_edge() {
        let mut fixture = Fixture::new();

        // Axis 2 defaults to thumbstickHistoryNavigation.
        fixture.mapper.on_input_change(InputSample::axis(2, -0.9), fixture.at(0));
        assert_eq!(fixture.drain_browser(), vec![BrowserCommand::GoBack]);

        // Held deflection does not repeat a discrete action.
        fixture.mapper.on_input_change(InputSample::axis(2, -1.0), fixture.at(10));
        assert_eq!(fixture.drain_browser(), vec![]);
        assert_eq!(fixture.mapper.active_timer_count(), 0);

        // Flick the other way: release then engage.
        fixture.mapper.on_input_change(InputSample::axis(2, 0.0), fixture.at(20));
        fixture.mapper.on_input_change(InputSample::axis(2, 0.9), fixture.at(30));
        assert_eq!(fixture.drain_browser(), vec![BrowserCommand::GoForward]);
    }

    #[test]
    fn release_in_same_turn_beats_pending_tick() {
        let mut fixture = Fixture::new();

        fixture.mapper.on_input_change(InputSample::axis(1, 1.0), fixture.at(0));
        fixture.drain_page();

        // Both the release and the tick deadline land at t=100ms. The
        // release is processed first in arrival order and must win.
        fixture.mapper.on_input_change(InputSample::axis(1, 0.0), fixture.at(100));
        fixture.mapper.tick(fixture.at(100));
        assert_eq!(fixture.drain_page(), vec![]);
    }

    #[test]
    fn empty_page_makes_focus_traversal_a_no_op() {
        let mut fixture = Fixture::new();

        fixture.mapper.on_input_change(InputSample::button(5, 1.0), fixture.at(0));
        assert_eq!(fixture.drain_page(), vec![]);
        // The repeat timer still runs; it just has nothing to focus.
        assert_eq!(fixture.mapper.active_timer_count(), 1);
    }

    #[test]
    fn try_recv_on_drained_channel_reports_empty() {
        let mut fixture = Fixture::new();
        assert_eq!(fixture.page_rx.try_recv().unwrap_err(), TryRecvError::Empty);
    }
}
