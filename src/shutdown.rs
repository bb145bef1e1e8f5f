//! Stop signal for `sync`.
//!
//! The first Ctrl+C (or SIGTERM on Unix) cancels the returned token. The
//! watch loop selects on it, so both the interval wait and a running check
//! end right away.

#[cfg(unix)]
use anyhow::Context;
use tokio_util::sync::CancellationToken;

pub(crate) fn stop_token() -> anyhow::Result<CancellationToken> {
    let token = CancellationToken::new();

    #[cfg(unix)]
    let mut terminate = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        .context("failed to listen for SIGTERM")?;

    let stop = token.clone();
    tokio::spawn(async move {
        #[cfg(unix)]
        let received = tokio::select! {
            r = tokio::signal::ctrl_c() => r.map(|()| "SIGINT"),
            _ = terminate.recv() => Ok("SIGTERM"),
        };
        #[cfg(not(unix))]
        let received = tokio::signal::ctrl_c().await.map(|()| "Ctrl+C");

        match received {
            Ok(signal) => {
                tracing::info!(signal, "Stopping sync");
                stop.cancel();
            }
            Err(e) => tracing::error!(error = %e, "Cannot listen for Ctrl+C"),
        }
    });

    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_token_starts_live() {
        let token = stop_token().unwrap();
        assert!(!token.is_cancelled());
    }
}
