pub mod browser;
pub mod device;
pub mod mapping;
pub mod persistence;

use crate::browser::{browser_bridge, page_bridge, BrowserCommand, PageCommand};
use crate::device::DeviceHandle;
use crate::mapping::NavigatorHandle;
use crate::persistence::config_store::ConfigStore;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use tokio::sync::mpsc;
use tracing::{debug, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    setup()?;

    info!("Loading navigator configuration");
    let config_store = ConfigStore::default_location()?;
    config_store.ensure_default_config()?;
    let config = config_store.load();

    // Bridges toward the page and the browser chrome. The command receivers
    // go to the host task below; a real embedding forwards them to the DOM
    // and the tab/window manager, publishes focusable candidates into the
    // snapshot, and sends mutation notices. This binary has no page, so the
    // snapshot stays empty and focus traversal is a no-op.
    let (page, page_commands, _snapshot) = page_bridge();
    let (browser, browser_commands) = browser_bridge();
    let _host_handle = tokio::spawn(run_host_sink(page_commands, browser_commands));

    let mut navigator = NavigatorHandle::new("navigator".to_string());
    let (event_sender, _mutation_sender) =
        navigator.start(&config, Box::new(page), Box::new(browser));

    info!("Starting gamepad collector");
    let mut device = DeviceHandle::spawn(event_sender)
        .map_err(|e| eyre!("Failed to spawn device collector: {}", e))?;

    tokio::signal::ctrl_c().await?;
    info!("Ctrl-C received, shutting down");

    device.stop().await;
    navigator.shutdown().await?;

    info!("Navigator stopped");
    Ok(())
}

/// Drains page and browser commands. Stands in for the host embedding that
/// would apply them to a live page.
async fn run_host_sink(
    mut page_commands: mpsc::UnboundedReceiver<PageCommand>,
    mut browser_commands: mpsc::UnboundedReceiver<BrowserCommand>,
) {
    loop {
        tokio::select! {
            command = page_commands.recv() => match command {
                Some(command) => debug!("Page command: {:?}", command),
                None => {
                    warn!("Page command channel closed");
                    break;
                }
            },
            command = browser_commands.recv() => match command {
                Some(command) => info!("Browser command: {:?}", command),
                None => {
                    warn!("Browser command channel closed");
                    break;
                }
            },
        }
    }
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    setup_logging_env();
    Ok(())
}

fn setup_logging_env() {
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .pretty()
        .init();
}
