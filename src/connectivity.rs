// ============================================================================
// Connectivité réseau
// ============================================================================
// Publie un signal booléen "est connecté" dans un canal watch.
//
// Le contrôleur ne sonde jamais le réseau lui-même : il s'abonne au
// watch::Receiver<bool> et réagit aux transitions. La sonde ici est une
// simple tentative de connexion TCP vers l'hôte de l'API, répétée à
// intervalle fixe dans une tâche de fond.
// ============================================================================

use std::time::Duration;

use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Hôte sondé par défaut (celui de l'API Bitfinex)
pub const DEFAULT_PROBE_ADDR: &str = "api-pub.bitfinex.com:443";

/// Intervalle entre deux sondes
pub const DEFAULT_PROBE_INTERVAL: Duration = Duration::from_secs(3);

/// Timeout d'une tentative de connexion
const PROBE_TIMEOUT: Duration = Duration::from_secs(3);

/// Moniteur de connectivité
///
/// Possède la tâche de sonde ; la laisser tomber (Drop) arrête la sonde
/// et ferme le canal côté émetteur.
pub struct ConnectivityMonitor {
    rx: watch::Receiver<bool>,
    task: JoinHandle<()>,
}

impl ConnectivityMonitor {
    /// Lance la sonde en tâche de fond
    ///
    /// Le canal démarre à `true` (connecté) : la première sonde part
    /// immédiatement et corrige la valeur si besoin.
    pub fn spawn(probe_addr: impl Into<String>, probe_interval: Duration) -> Self {
        let (tx, rx) = watch::channel(true);
        let task = tokio::spawn(probe_loop(tx, probe_addr.into(), probe_interval));
        Self { rx, task }
    }

    /// Lance la sonde avec l'hôte et l'intervalle par défaut
    pub fn spawn_default() -> Self {
        Self::spawn(DEFAULT_PROBE_ADDR, DEFAULT_PROBE_INTERVAL)
    }

    /// Retourne un nouvel abonnement au signal de connectivité
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.rx.clone()
    }
}

impl Drop for ConnectivityMonitor {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Boucle de sonde : connexion TCP → publication de l'état
async fn probe_loop(tx: watch::Sender<bool>, addr: String, interval: Duration) {
    let mut ticker = time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!(addr = %addr, "Connectivity probe started");

    loop {
        ticker.tick().await;

        let connected = matches!(
            time::timeout(PROBE_TIMEOUT, TcpStream::connect(addr.as_str())).await,
            Ok(Ok(_))
        );
        debug!(connected, "Connectivity probe result");

        // Ne réveille les abonnés que sur transition
        let changed = tx.send_if_modified(|current| {
            if *current != connected {
                *current = connected;
                true
            } else {
                false
            }
        });

        if changed {
            if connected {
                info!("Network connection restored");
            } else {
                warn!("Network connection lost");
            }
        }

        // Plus aucun abonné : inutile de continuer à sonder
        if tx.is_closed() {
            debug!("All connectivity subscribers dropped, stopping probe");
            break;
        }
    }
}

// ============================================================================
// Tests unitaires
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_monitor_starts_connected() {
        // Adresse non routable : la sonde finira par publier false,
        // mais la valeur initiale observable est true
        let monitor = ConnectivityMonitor::spawn("127.0.0.1:1", Duration::from_secs(3600));
        assert!(*monitor.subscribe().borrow());
    }

    #[tokio::test]
    async fn test_subscribers_share_the_same_signal() {
        let monitor = ConnectivityMonitor::spawn("127.0.0.1:1", Duration::from_secs(3600));
        let a = monitor.subscribe();
        let b = monitor.subscribe();
        assert_eq!(*a.borrow(), *b.borrow());
    }
}
