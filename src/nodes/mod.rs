// The three robot nodes and the startup plumbing they share

pub mod autonomous;
pub mod remote;
pub mod web;

use std::fmt::Display;
use std::future::Future;
use std::io;
use std::time::Duration;

use tracing::{info, warn};

/// Keep calling `attempt` until it succeeds, waiting `delay` between tries
///
/// Used for the connection phase before a control loop starts; nothing else
/// runs until the link is up.
pub async fn retry_until_ok<T, E, F, Fut>(what: &str, delay: Duration, mut attempt: F) -> T
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let mut tries: u32 = 1;
    loop {
        match attempt().await {
            Ok(value) => {
                if tries > 1 {
                    info!("{} succeeded after {} attempts", what, tries);
                }
                return value;
            }
            Err(e) => {
                warn!("{} failed (attempt {}): {}", what, tries, e);
                tries += 1;
                tokio::time::sleep(delay).await;
            }
        }
    }
}

/// Resolve once Ctrl-C is pressed
pub async fn shutdown_signal() {
    wait_for_shutdown(tokio::signal::ctrl_c()).await
}

/// Resolve when `signal` fires
///
/// If the signal handler could not be installed this never resolves, so the
/// node keeps running instead of shutting down on the spot.
pub async fn wait_for_shutdown<F>(signal: F)
where
    F: Future<Output = io::Result<()>>,
{
    match signal.await {
        Ok(()) => info!("Shutdown requested"),
        Err(e) => {
            warn!("Failed to listen for Ctrl-C, running until killed: {}", e);
            std::future::pending::<()>().await
        }
    }
}
