//! Daemon - the call attendant service
//!
//! Opens the modem, wires the screening and journal services to the
//! attendant, and keeps the line reader and attendant threads running until
//! a shutdown signal arrives.

use std::sync::Arc;
use std::thread::JoinHandle;

use tokio::sync::oneshot;

use crate::attendant::{Attendant, Collaborators};
use crate::indicator::Indicators;
use crate::journal::Journal;
use crate::modem::Modem;
use crate::queue::{CallerSender, caller_queue};
use crate::screening::{CallerIdPatterns, FileNextCallFlag, PatternScreener};
use crate::{Config, Error, Result};

/// The call attendant daemon
pub struct Daemon {
    config: Config,
    indicators: Indicators,
    journal: Arc<Journal>,
}

impl Daemon {
    /// Create a new daemon instance
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config,
            indicators: Indicators::logging(),
            journal: Arc::new(Journal::new()),
        }
    }

    /// Replace the status indicators
    #[must_use]
    pub fn with_indicators(mut self, indicators: Indicators) -> Self {
        self.indicators = indicators;
        self
    }

    /// Calls and messages recorded so far
    #[must_use]
    pub fn journal(&self) -> Arc<Journal> {
        Arc::clone(&self.journal)
    }

    fn collaborators(&self) -> Result<Collaborators> {
        let screening = &self.config.screening;
        let patterns = CallerIdPatterns::load(&screening.patterns_file)?;
        let screener = PatternScreener::new(screening.mode, patterns)
            .with_permitted(screening.permitted_numbers.iter())
            .with_blocked(screening.blocked_numbers.iter());

        Ok(Collaborators {
            classifier: Arc::new(screener),
            logger: self.journal.clone(),
            messages: self.journal.clone(),
            next_call: Arc::new(FileNextCallFlag::new(&screening.permit_next_call_flag)),
            indicators: self.indicators.clone(),
        })
    }

    /// Run the daemon until interrupted
    ///
    /// Without a modem the daemon stays up in a degraded state and only
    /// waits for shutdown.
    ///
    /// # Errors
    ///
    /// Returns error if the services cannot be built or the attendant fails
    pub async fn run(self) -> Result<()> {
        let services = self.collaborators()?;

        let devices = self.config.modem.devices.clone();
        let settings = self.config.modem.settings();
        let opened = tokio::task::spawn_blocking(move || Modem::open(&devices, settings))
            .await
            .map_err(|e| Error::Modem(format!("modem detection task failed: {e}")))?;

        let modem = match opened {
            Ok(modem) => Arc::new(modem),
            Err(e) => {
                tracing::error!(error = %e, "modem unavailable");
                tracing::warn!("running without a modem - calls will not be screened");
                shutdown_signal().await;
                self.indicators.close();
                tracing::info!("daemon stopped");
                return Ok(());
            }
        };

        tracing::info!(session = ?modem.session(), "daemon running");

        let (sender, queue) = caller_queue();
        let reader = spawn_reader(Arc::clone(&modem), sender.clone(), &self.indicators)?;

        let attendant = Attendant::new(Arc::clone(&modem), queue, services, &self.config);
        let (done_tx, done_rx) = oneshot::channel();
        let worker = std::thread::Builder::new()
            .name("attendant".to_string())
            .spawn(move || {
                let _ = done_tx.send(attendant.run());
            })?;

        let outcome = tokio::select! {
            result = done_rx => {
                result.unwrap_or_else(|_| Err(Error::Modem("attendant thread panicked".to_string())))
            }
            () = shutdown_signal() => {
                tracing::info!("shutdown requested");
                Ok(())
            }
        };

        stop(&modem, &sender, reader, worker).await;
        self.indicators.close();

        tracing::info!("daemon stopped");
        outcome
    }
}

impl std::fmt::Debug for Daemon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Daemon")
            .field("data_dir", &self.config.data_dir)
            .field("devices", &self.config.modem.devices)
            .finish_non_exhaustive()
    }
}

fn spawn_reader(
    modem: Arc<Modem>,
    sender: CallerSender,
    indicators: &Indicators,
) -> Result<JoinHandle<()>> {
    let ring = Arc::clone(&indicators.ring);
    let handle = std::thread::Builder::new()
        .name("line-reader".to_string())
        .spawn(move || modem.run_reader(&sender, ring.as_ref()))?;
    Ok(handle)
}

/// Stop both threads and wait for them to finish
async fn stop(modem: &Modem, sender: &CallerSender, reader: JoinHandle<()>, worker: JoinHandle<()>) {
    sender.shutdown();
    modem.stop();

    let joined = tokio::task::spawn_blocking(move || (reader.join(), worker.join())).await;
    match joined {
        Ok((Ok(()), Ok(()))) => tracing::debug!("worker threads joined"),
        Ok(_) => tracing::error!("a worker thread panicked"),
        Err(e) => tracing::error!(error = %e, "failed to join worker threads"),
    }
}

/// Resolve on Ctrl-C or, on Unix, SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::file::AttendantConfigFile;
    use crate::modem::CallerRecord;

    #[test]
    fn test_collaborators_share_the_daemon_journal() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::from_file(AttendantConfigFile::default(), Some(dir.path().to_path_buf())).unwrap();
        let daemon = Daemon::new(config);
        let caller = CallerRecord {
            number: "8055554567".to_string(),
            name: "Test1".to_string(),
            date: "0801".to_string(),
            time: "1801".to_string(),
        };

        let services = daemon.collaborators().unwrap();
        let call_id = services.logger.log(&caller, "Screened", "Not found").unwrap();
        services.messages.save(call_id, &caller, &dir.path().join("m.wav")).unwrap();

        let journal = daemon.journal();
        assert_eq!(journal.calls().len(), 1);
        assert_eq!(journal.messages().len(), 1);
        assert_eq!(services.messages.unplayed_count().unwrap(), 1);
    }
}
