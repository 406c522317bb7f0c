use std::future::Future;
use std::thread;

use diarscribe_core::shared::cancellation::CancellationToken;

/// Exit status for a second interrupt, following the shell convention.
const INTERRUPTED_EXIT_CODE: i32 = 130;

/// Cancel `token` on the first Ctrl-C so the run stops at its next safe
/// point and removes its working files. A second Ctrl-C exits immediately.
pub fn cancel_on_ctrl_c(token: CancellationToken) {
    let spawned = thread::Builder::new()
        .name("diarscribe-signal".to_string())
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(runtime) => runtime,
                Err(e) => {
                    log::warn!("Ctrl-C handling unavailable: {e}");
                    return;
                }
            };
            runtime.block_on(async {
                if cancel_on(tokio::signal::ctrl_c(), &token).await {
                    let _ = tokio::signal::ctrl_c().await;
                    eprintln!("\nInterrupted again, exiting without cleanup");
                    std::process::exit(INTERRUPTED_EXIT_CODE);
                }
            });
        });
    if let Err(e) = spawned {
        log::warn!("Failed to spawn signal listener: {e}");
    }
}

/// Wait for `signal`, then cancel. Returns whether cancellation was requested.
async fn cancel_on<F>(signal: F, token: &CancellationToken) -> bool
where
    F: Future<Output = std::io::Result<()>>,
{
    match signal.await {
        Ok(()) => {
            eprintln!("\nCancelling, cleaning up...");
            log::info!("Interrupt received, cancelling run");
            token.cancel();
            true
        }
        Err(e) => {
            log::warn!("Failed to listen for Ctrl-C: {e}");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_signal_cancels_token() {
        let token = CancellationToken::new();
        let observer = token.clone();

        assert!(cancel_on(async { Ok::<(), std::io::Error>(()) }, &token).await);
        assert!(observer.is_cancelled());
    }

    #[tokio::test]
    async fn test_listener_failure_leaves_run_alone() {
        let token = CancellationToken::new();
        let failed = async { Err(std::io::Error::new(std::io::ErrorKind::Other, "no signals")) };

        assert!(!cancel_on(failed, &token).await);
        assert!(!token.is_cancelled());
    }
}
