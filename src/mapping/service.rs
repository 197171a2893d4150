//! Navigator engine with statum state machine around the input mapper.
//!
//! Implements a 5-state lifecycle with compile-time state safety. The engine
//! runs in its own tokio task and multiplexes three inputs: device samples,
//! page mutation notices and the repeat scheduler's next deadline.
//!
//! # State Machine
//!
//! ```text
//! Initializing ──► Configured ──► Active ──► Deactivating ──► Deactivated
//!                     │              │           ▲
//!                     └──────────────┘           │
//!                       (activate/deactivate)    │
//!                                              (shutdown)
//! ```

use crate::browser::{BrowserControl, PageDom};
use crate::device::DeviceEvent;
use crate::mapping::{InputMapper, MapperError};
use crate::persistence::NavigatorConfig;
use statum::{machine, state};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// States for navigator engine lifecycle using statum
#[state]
#[derive(Debug, Clone)]
pub enum NavigatorState {
    Initializing, // Setting up engine structure
    Configured,   // Mapper built from stored configuration
    Active,       // Processing events in main loop
    Deactivating, // Shutting down gracefully
    Deactivated,  // Fully stopped, timers released
}

/// Navigator engine with compile-time state safety via statum
///
/// Wraps the input mapper and manages its lifecycle through distinct states.
/// Each state has specific allowed operations enforced at compile time.
#[machine]
pub struct NavigatorEngine<S: NavigatorState> {
    event_receiver: mpsc::Receiver<DeviceEvent>,
    mutation_receiver: mpsc::Receiver<()>,
    name: String,
    mapper: Option<InputMapper>,
}

impl<S: NavigatorState> NavigatorEngine<S> {
    pub fn get_name(&self) -> &str {
        &self.name
    }
}

impl NavigatorEngine<Initializing> {
    pub fn create(
        event_receiver: mpsc::Receiver<DeviceEvent>,
        mutation_receiver: mpsc::Receiver<()>,
        name: String,
    ) -> Self {
        info!("Initializing new navigator engine: {}", name);

        Self::new(
            event_receiver,
            mutation_receiver,
            name,
            None, // mapper
        )
    }

    /// Builds the input mapper from stored configuration and transitions to
    /// Configured state.
    pub fn configure(
        mut self,
        config: &NavigatorConfig,
        page: Box<dyn PageDom>,
        browser: Box<dyn BrowserControl>,
    ) -> NavigatorEngine<Configured> {
        info!("Configuring navigator engine: {}", self.name);

        self.mapper = Some(InputMapper::new(config, page, browser));

        info!("Engine configured successfully: {}", self.name);
        self.transition()
    }
}

impl NavigatorEngine<Configured> {
    pub fn activate(self) -> NavigatorEngine<Active> {
        info!("Activating navigator engine: {}", self.name);
        self.transition()
    }
}

impl NavigatorEngine<Active> {
    /// Main processing loop with graceful shutdown support
    ///
    /// Runs until shutdown signal, device disconnect, or channel loss. The
    /// select is biased: pending samples and mutation notices always drain
    /// before a due repeat timer fires, so a release processed in the same
    /// turn cancels the tick instead of racing it.
    pub async fn run_until_shutdown(
        mut self,
        mut shutdown_rx: oneshot::Receiver<()>,
    ) -> Result<NavigatorEngine<Deactivating>, MapperError> {
        info!("Starting event processing loop for: {}", self.name);

        loop {
            let deadline = self.mapper.as_ref().and_then(InputMapper::next_deadline);

            tokio::select! {
                biased;

                _ = &mut shutdown_rx => {
                    info!("Shutdown signal received for: {}", self.name);
                    break;
                }

                event = self.event_receiver.recv() => match event {
                    Some(DeviceEvent::Sample { sample, timestamp }) => {
                        debug!("Sample {:?} captured at {}", sample, timestamp.format("%H:%M:%S.%3f"));
                        if let Some(mapper) = self.mapper.as_mut() {
                            mapper.on_input_change(sample, Instant::now());
                        }
                    }
                    Some(DeviceEvent::Disconnected) => {
                        warn!("Device disconnected, tearing down: {}", self.name);
                        if let Some(mapper) = self.mapper.as_mut() {
                            mapper.on_device_disconnected();
                        }
                        break;
                    }
                    None => {
                        error!("Input channel closed for: {}", self.name);
                        if let Some(mapper) = self.mapper.as_mut() {
                            mapper.dispose();
                        }
                        return Err(MapperError::ChannelClosed);
                    }
                },

                notice = self.mutation_receiver.recv() => match notice {
                    Some(()) => {
                        if let Some(mapper) = self.mapper.as_mut() {
                            mapper.on_mutation();
                        }
                    }
                    None => {
                        warn!("Mutation channel closed for: {}", self.name);
                        if let Some(mapper) = self.mapper.as_mut() {
                            mapper.dispose();
                        }
                        break;
                    }
                },

                _ = sleep_until_deadline(deadline) => {
                    if let Some(mapper) = self.mapper.as_mut() {
                        mapper.tick(Instant::now());
                    }
                }
            }
        }

        info!("Transitioning to Deactivating state: {}", self.name);
        Ok(self.transition())
    }

    pub fn deactivate(self) -> NavigatorEngine<Deactivating> {
        info!("Deactivating navigator engine: {}", self.name);
        self.transition()
    }
}

impl NavigatorEngine<Deactivating> {
    /// Cancels all timers and transitions to Deactivated state
    pub fn shutdown(mut self) -> NavigatorEngine<Deactivated> {
        info!("Shutting down navigator engine: {}", self.name);

        if let Some(mapper) = self.mapper.as_mut() {
            debug!("Disposing input mapper");
            mapper.dispose();
        }

        info!("Engine shut down successfully: {}", self.name);
        self.transition()
    }
}

impl NavigatorEngine<Deactivated> {}

/// Sleeps until the next repeat deadline, or forever when no timer runs.
async fn sleep_until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Handle for managing the navigator engine in a tokio task
///
/// Provides lifecycle management for the engine running in a background task.
/// Handles task spawning, graceful shutdown, and resource cleanup.
#[derive(Debug)]
pub struct NavigatorHandle {
    pub name: String,

    task_handle: Option<JoinHandle<Result<(), MapperError>>>,

    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl NavigatorHandle {
    pub fn new(name: String) -> Self {
        Self {
            name,
            task_handle: None,
            shutdown_tx: None,
        }
    }

    /// Starts the engine in a tokio task and returns communication channels
    ///
    /// Creates the engine, configures it from stored settings, activates it,
    /// and spawns the main processing loop in a background task.
    ///
    /// # Returns
    ///
    /// * Sender for device events
    /// * Sender for page mutation notices
    pub fn start(
        &mut self,
        config: &NavigatorConfig,
        page: Box<dyn PageDom>,
        browser: Box<dyn BrowserControl>,
    ) -> (mpsc::Sender<DeviceEvent>, mpsc::Sender<()>) {
        let (event_sender, event_receiver) = mpsc::channel(1000);
        let (mutation_sender, mutation_receiver) = mpsc::channel(100);
        let engine_name = self.name.clone();

        let active_engine = NavigatorEngine::create(event_receiver, mutation_receiver, engine_name.clone())
            .configure(config, page, browser)
            .activate();

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        self.shutdown_tx = Some(shutdown_tx);
        let task_handle = tokio::spawn(async move {
            info!("Spawning running engine: {}", engine_name);
            match active_engine.run_until_shutdown(shutdown_rx).await {
                Ok(deactivating_engine) => {
                    info!("Engine entering deactivating state: {}", engine_name);
                    let _ = deactivating_engine.shutdown();
                    Ok(())
                }
                Err(e) => {
                    error!("Error running engine: {} - {}", engine_name, e);
                    Err(e)
                }
            }
        });

        self.task_handle = Some(task_handle);

        info!("Navigator engine activated: {}", self.name);
        (event_sender, mutation_sender)
    }

    /// Gracefully shuts down the engine and waits for task completion
    pub async fn shutdown(&mut self) -> Result<(), MapperError> {
        debug!("Sending shutdown signal to engine: {}", self.name);

        if let Some(tx) = self.shutdown_tx.take() {
            if tx.send(()).is_err() {
                warn!("Engine task already terminated: {}", self.name);
            }
        }

        if let Some(handle) = self.task_handle.take() {
            match handle.await {
                Ok(result) => {
                    debug!("Engine task completed: {}", self.name);
                    result
                }
                Err(e) => {
                    error!("Engine task panicked: {} - {}", self.name, e);
                    Err(MapperError::TaskError(format!(
                        "Engine task panicked: {}",
                        e
                    )))
                }
            }
        } else {
            debug!("Engine already shut down: {}", self.name);
            Ok(())
        }
    }
}
