//! Gamepad event collection.
//!
//! Polls gilrs on a dedicated blocking thread, translates events into
//! [`DeviceEvent`]s and forwards them to the engine channel. Disconnect of
//! the active gamepad is forwarded as [`DeviceEvent::Disconnected`] so the
//! engine can tear its timers down.

use crate::device::{axis_slot, button_slot, DeviceEvent};
use crate::mapping::slots::InputSample;
use chrono::Local;
use gilrs::{Event, EventType, Gamepad, GamepadId, Gilrs};
use statum::{machine, state};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    #[error("Failed to initialize gamepad backend: {0}")]
    InitializationError(String),

    #[error("Failed to send event: {0}")]
    EventSendError(String),
}

#[state]
#[derive(Debug, Clone)]
pub enum CollectionState {
    Initializing,
    Collecting,
}

#[machine]
#[derive(Debug)]
pub struct DeviceCollector<S: CollectionState> {
    gilrs: Gilrs,
    active_gamepad: Option<GamepadId>,
    event_sender: mpsc::Sender<DeviceEvent>,
    cancel: CancellationToken,
}

impl DeviceCollector<Initializing> {
    pub fn create(
        event_sender: mpsc::Sender<DeviceEvent>,
        cancel: CancellationToken,
    ) -> Result<Self, DeviceError> {
        info!("Initializing gilrs controller interface");
        let gilrs = match Gilrs::new() {
            Ok(g) => {
                info!("Successfully initialized gilrs");
                g
            }
            Err(e) => {
                error!("Failed to initialize gilrs: {}", e);
                return Err(DeviceError::InitializationError(e.to_string()));
            }
        };

        Ok(Self::new(gilrs, None, event_sender, cancel))
    }

    /// Picks the active gamepad and transitions to the collecting state.
    pub fn initialize(mut self) -> DeviceCollector<Collecting> {
        let gamepads: Vec<(GamepadId, Gamepad<'_>)> = self.gilrs.gamepads().collect();

        if gamepads.is_empty() {
            warn!("No gamepad connected, waiting for one to appear");
        } else {
            info!("Found {} gamepads:", gamepads.len());
            for (id, gamepad) in &gamepads {
                info!("  ID: {}, Name: {}", id, gamepad.name());
            }
            let (id, gamepad) = &gamepads[0];
            self.active_gamepad = Some(*id);
            info!("Selected gamepad: {} ({})", gamepad.name(), id);
        }

        info!("Device Collector initialized, transitioning to Collecting state");
        self.transition()
    }
}

impl DeviceCollector<Collecting> {
    /// Drains pending gilrs events and forwards the translated ones.
    pub fn collect_pending_events(&mut self) -> Result<(), DeviceError> {
        while let Some(Event { id, event, time, .. }) = self.gilrs.next_event() {
            debug!("Processing gilrs event: {:?} at time: {:?}", event, time);

            match event {
                EventType::Connected => {
                    // First gamepad to show up becomes the active one.
                    if self.active_gamepad.is_none() {
                        self.active_gamepad = Some(id);
                        info!("Gamepad connected and selected: {}", id);
                    }
                    continue;
                }
                EventType::Disconnected => {
                    if self.active_gamepad == Some(id) {
                        warn!("Active gamepad disconnected: {}", id);
                        self.active_gamepad = None;
                        self.send(DeviceEvent::Disconnected)?;
                    }
                    continue;
                }
                _ => {}
            }

            if self.active_gamepad != Some(id) {
                debug!("Skipping event from non-active gamepad: {:?}", id);
                continue;
            }

            if let Some(sample) = convert_gilrs_event(event) {
                self.send(DeviceEvent::Sample {
                    sample,
                    timestamp: Local::now(),
                })?;
            }
        }

        Ok(())
    }

    fn send(&self, event: DeviceEvent) -> Result<(), DeviceError> {
        match self.event_sender.try_send(event) {
            Ok(_) => Ok(()),
            Err(e) => {
                error!("Failed to send event to engine: {}", e);
                Err(DeviceError::EventSendError(e.to_string()))
            }
        }
    }

    /// Runs until cancelled or the engine side of the channel goes away.
    pub fn run_collection_loop(&mut self) {
        info!("Starting Device Collector loop");

        loop {
            if self.cancel.is_cancelled() {
                info!("Device Collector cancelled, shutting down");
                return;
            }

            if let Err(e) = self.collect_pending_events() {
                error!("Stopping collection: {}", e);
                return;
            }

            // Small sleep to prevent 100% CPU usage
            std::thread::sleep(std::time::Duration::from_millis(2));
        }
    }
}

/// Translates a gilrs event into a normalized input sample. Events from
/// controls without a slot ordinal are dropped.
fn convert_gilrs_event(event: EventType) -> Option<InputSample> {
    match event {
        EventType::ButtonChanged(button, value, _) => translate_button(button, value),
        EventType::AxisChanged(axis, value, _) => translate_axis(axis, value),
        _ => None,
    }
}

fn translate_button(button: gilrs::Button, value: f32) -> Option<InputSample> {
    let index = button_slot(button)?;
    Some(InputSample::button(index, value.clamp(0.0, 1.0)))
}

fn translate_axis(axis: gilrs::Axis, value: f32) -> Option<InputSample> {
    let (index, flip) = axis_slot(axis)?;
    let value = if flip { -value } else { value };
    Some(InputSample::axis(index, value.clamp(-1.0, 1.0)))
}

/// Handle owning the collector's blocking task and its cancellation token.
pub struct DeviceHandle {
    cancel: CancellationToken,
    task_handle: Option<tokio::task::JoinHandle<()>>,
}

impl DeviceHandle {
    /// Creates the collector and spawns its polling loop on the blocking
    /// thread pool.
    pub fn spawn(event_sender: mpsc::Sender<DeviceEvent>) -> Result<Self, DeviceError> {
        let cancel = CancellationToken::new();
        let collector = DeviceCollector::create(event_sender, cancel.clone())?;

        let task_handle = tokio::task::spawn_blocking(move || {
            let mut collecting = collector.initialize();
            collecting.run_collection_loop();
        });

        info!("Device Collector successfully started");
        Ok(Self {
            cancel,
            task_handle: Some(task_handle),
        })
    }

    /// Cancels the polling loop and waits for the thread to finish.
    pub async fn stop(&mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.task_handle.take() {
            if let Err(e) = handle.await {
                error!("Device Collector task join failed: {}", e);
            }
        }
    }
}
