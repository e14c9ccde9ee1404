// ============================================================================
// Contrôleur d'état
// ============================================================================
// Source de vérité unique pour ce que l'interface doit afficher.
//
// Trois activités concurrentes alimentent le contrôleur : le timer de
// polling, le signal de connectivité et les commandes de recherche de
// l'UI. Tout passe par la même boucle select! dans une unique tâche :
// les transitions d'état sont donc appliquées une par une, sans course.
//
// Le cache (dernier fetch réussi) appartient exclusivement à cette tâche.
// Il n'est écrasé que sur succès et jamais vidé sur échec : en cas de
// coupure réseau on continue d'afficher les données périmées avec un
// indicateur hors-ligne.
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::api::TickerSource;
use crate::models::Ticker;

/// Message affiché quand le réseau est coupé mais que le cache est utilisable
pub const OFFLINE_MESSAGE: &str = "Vous êtes hors ligne";

/// Message affiché quand le chargement échoue sans cache disponible
pub const FETCH_FAILED_MESSAGE: &str = "Échec du chargement des tickers";

/// Intervalle de rafraîchissement par défaut
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_millis(5000);

/// Fenêtre de debounce des commandes de recherche
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

/// Commandes acceptées par le contrôleur
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Recharger les tickers depuis la source
    Load,

    /// Filtrer le cache avec une nouvelle requête de recherche
    Search(String),
}

/// Ce que l'interface doit afficher à un instant donné
///
/// Exactement une valeur est courante à tout moment ; elle est publiée
/// dans un canal watch, donc toujours disponible pour un nouvel abonné.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewState {
    /// Chargement initial en cours, rien à afficher encore
    Loading,

    /// Données à jour, éventuellement filtrées par la recherche courante
    Showing(Vec<Ticker>),

    /// Données périmées du cache + indicateur d'erreur
    Degraded { tickers: Vec<Ticker>, reason: String },

    /// Aucune donnée disponible, seulement un message d'erreur
    Failed(String),
}

/// Configuration du contrôleur
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Période du polling automatique
    pub refresh_interval: Duration,

    /// Période de silence avant d'appliquer une recherche
    pub debounce: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            debounce: DEFAULT_DEBOUNCE,
        }
    }
}

/// Poignée publique du contrôleur
///
/// `submit` est à effet de bord uniquement : les erreurs de fetch sont
/// toujours traduites en ViewState, jamais remontées à l'appelant.
/// Laisser tomber la poignée (Drop) arrête la boucle de polling.
pub struct Controller {
    cmd_tx: mpsc::UnboundedSender<Command>,
    state_rx: watch::Receiver<ViewState>,
    task: JoinHandle<()>,
}

impl Controller {
    /// Démarre le contrôleur dans une tâche tokio
    ///
    /// Un premier chargement part immédiatement, puis le polling continue
    /// à la période configurée jusqu'à l'arrêt du contrôleur.
    pub fn spawn(
        source: Arc<dyn TickerSource>,
        connectivity: watch::Receiver<bool>,
        config: ControllerConfig,
    ) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(ViewState::Loading);

        let inner = Inner {
            source,
            state_tx,
            cache: Vec::new(),
            query: String::new(),
            initial_load: true,
        };
        let task = tokio::spawn(inner.run(cmd_rx, connectivity, config));

        Self {
            cmd_tx,
            state_rx,
            task,
        }
    }

    /// Soumet une commande au contrôleur
    pub fn submit(&self, command: Command) {
        if self.cmd_tx.send(command).is_err() {
            warn!("Controller task is gone, command dropped");
        }
    }

    /// Retourne un abonnement à l'état courant
    ///
    /// Le flux est infini et non rejouable : un nouvel abonné voit la
    /// dernière valeur publiée, pas l'historique.
    pub fn observe_state(&self) -> watch::Receiver<ViewState> {
        self.state_rx.clone()
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// État interne, propriété exclusive de la tâche du contrôleur
struct Inner {
    source: Arc<dyn TickerSource>,
    state_tx: watch::Sender<ViewState>,

    /// Dernier fetch réussi ; jamais vidé sur échec
    cache: Vec<Ticker>,

    /// Requête de recherche courante
    query: String,

    /// Vrai tant qu'aucun fetch n'a abouti (pilote l'émission de Loading)
    initial_load: bool,
}

impl Inner {
    /// Boucle principale : sérialise polling, connectivité et commandes
    async fn run(
        mut self,
        mut cmd_rx: mpsc::UnboundedReceiver<Command>,
        mut connectivity: watch::Receiver<bool>,
        config: ControllerConfig,
    ) {
        let mut poll = time::interval(config.refresh_interval);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);

        // Timer de debounce : armé à chaque Search, ne se déclenche que
        // si la garde pending_search.is_some() est vraie
        let debounce = time::sleep(config.debounce);
        tokio::pin!(debounce);
        let mut pending_search: Option<String> = None;

        let mut connected = *connectivity.borrow();
        let mut connectivity_alive = true;

        info!(
            refresh_ms = config.refresh_interval.as_millis() as u64,
            debounce_ms = config.debounce.as_millis() as u64,
            "Controller started"
        );

        loop {
            tokio::select! {
                // Polling automatique ; le premier tick part immédiatement
                _ = poll.tick() => {
                    self.handle_load(connected).await;
                }

                // Commandes de l'UI
                command = cmd_rx.recv() => match command {
                    Some(Command::Load) => {
                        self.handle_load(connected).await;
                    }
                    Some(Command::Search(query)) => {
                        // Coalesce : seule la dernière recherche de la
                        // rafale sera appliquée, après la fenêtre de calme
                        debug!(query = %query, "Search queued (debouncing)");
                        pending_search = Some(query);
                        debounce.as_mut().reset(Instant::now() + config.debounce);
                    }
                    None => {
                        debug!("Command channel closed, controller stopping");
                        break;
                    }
                },

                // Transitions de connectivité
                changed = connectivity.changed(), if connectivity_alive => match changed {
                    Ok(()) => {
                        let now_connected = *connectivity.borrow_and_update();
                        if connected && !now_connected {
                            // Passage hors ligne : dégrade immédiatement
                            // l'affichage, le cache est conservé
                            info!("Connectivity lost, degrading view");
                            self.emit_degraded();
                        }
                        // Retour en ligne : aucun état forcé, le prochain
                        // tick de polling rafraîchira naturellement
                        connected = now_connected;
                    }
                    Err(_) => {
                        warn!("Connectivity signal dropped");
                        connectivity_alive = false;
                    }
                },

                // Fin de la fenêtre de calme : applique la dernière recherche
                () = &mut debounce, if pending_search.is_some() => {
                    if let Some(query) = pending_search.take() {
                        self.handle_search(query);
                    }
                }
            }
        }
    }

    /// Traite une commande Load
    ///
    /// Hors ligne, aucun fetch n'est tenté : on applique directement la
    /// politique d'échec (le cache décide entre Failed et Degraded).
    async fn handle_load(&mut self, connected: bool) {
        if !connected {
            debug!("Offline, skipping fetch");
            self.emit_fetch_failure();
            return;
        }

        if self.initial_load {
            self.set_state(ViewState::Loading);
        }

        match self.source.fetch_tickers().await {
            Ok(tickers) => {
                info!(count = tickers.len(), "Tickers loaded");
                self.cache = tickers;
                self.initial_load = false;
                self.emit_filtered();
            }
            Err(error) => {
                warn!(error = ?error, "Fetch failed");
                self.emit_fetch_failure();
            }
        }
    }

    /// Traite une commande Search (après debounce)
    ///
    /// Refiltre le cache, ne déclenche jamais de fetch.
    fn handle_search(&mut self, query: String) {
        debug!(query = %query, "Applying search");
        self.query = query;
        self.emit_filtered();
    }

    /// Publie le cache filtré par la requête courante
    fn emit_filtered(&mut self) {
        let filtered = filter_tickers(&self.cache, &self.query);
        self.set_state(ViewState::Showing(filtered));
    }

    /// Politique d'échec : Failed sans cache, Degraded avec cache
    fn emit_fetch_failure(&mut self) {
        if self.cache.is_empty() {
            self.set_state(ViewState::Failed(FETCH_FAILED_MESSAGE.to_string()));
        } else {
            self.emit_degraded();
        }
    }

    /// Publie l'état dégradé : cache conservé + indicateur hors-ligne
    fn emit_degraded(&mut self) {
        self.set_state(ViewState::Degraded {
            tickers: self.cache.clone(),
            reason: OFFLINE_MESSAGE.to_string(),
        });
    }

    fn set_state(&mut self, state: ViewState) {
        self.state_tx.send_replace(state);
    }
}

/// Filtre les tickers par sous-chaîne, insensible à la casse
///
/// La correspondance porte sur le symbole d'affichage normalisé
/// ("BTC"), pas sur le symbole brut de la paire ("tBTCUSD").
/// Une requête vide retourne le cache entier.
pub fn filter_tickers(tickers: &[Ticker], query: &str) -> Vec<Ticker> {
    let needle = query.to_lowercase();
    tickers
        .iter()
        .filter(|ticker| ticker.display_symbol().to_lowercase().contains(&needle))
        .cloned()
        .collect()
}

// ============================================================================
// Tests unitaires
// ============================================================================
// Les tests du contrôleur tournent sur l'horloge virtuelle de tokio
// (start_paused) : le temps avance automatiquement dès que toutes les
// tâches sont en attente, ce qui rend le debounce et le polling
// déterministes sans attente réelle.
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Source factice : rejoue une file de réponses préparées
    struct FakeSource {
        responses: Mutex<VecDeque<anyhow::Result<Vec<Ticker>>>>,
        calls: AtomicUsize,
    }

    impl FakeSource {
        fn new(responses: Vec<anyhow::Result<Vec<Ticker>>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                calls: AtomicUsize::new(0),
            })
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TickerSource for FakeSource {
        async fn fetch_tickers(&self) -> anyhow::Result<Vec<Ticker>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(anyhow!("no scripted response left")))
        }
    }

    fn btc() -> Ticker {
        Ticker::new("tBTCUSD", 45000.0, 100.0, 0.05, 50000.0)
    }

    fn eth() -> Ticker {
        Ticker::new("tETHUSD", 3200.0, 50.0, 0.03, 30000.0)
    }

    /// Config de test : polling quasi désactivé (une heure) pour que seul
    /// le chargement initial parte automatiquement
    fn test_config() -> ControllerConfig {
        ControllerConfig {
            refresh_interval: Duration::from_secs(3600),
            debounce: DEFAULT_DEBOUNCE,
        }
    }

    fn spawn_controller(
        source: Arc<FakeSource>,
    ) -> (Controller, watch::Sender<bool>) {
        let (conn_tx, conn_rx) = watch::channel(true);
        let controller = Controller::spawn(source, conn_rx, test_config());
        (controller, conn_tx)
    }

    /// Laisse la tâche du contrôleur traiter ce qui est en attente
    async fn settle() {
        time::sleep(Duration::from_millis(1)).await;
    }

    #[test]
    fn test_filter_empty_query_returns_everything() {
        let cache = vec![btc(), eth()];
        assert_eq!(filter_tickers(&cache, ""), cache);
    }

    #[test]
    fn test_filter_is_case_insensitive() {
        let cache = vec![btc(), eth()];
        assert_eq!(filter_tickers(&cache, "btc"), vec![btc()]);
        assert_eq!(filter_tickers(&cache, "BTC"), vec![btc()]);
    }

    #[test]
    fn test_filter_matches_display_symbol_not_raw() {
        // "t" et "USD" n'existent pas dans le symbole normalisé
        let cache = vec![btc(), eth()];
        assert!(filter_tickers(&cache, "usd").is_empty());
        assert_eq!(filter_tickers(&cache, "ET"), vec![eth()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_initial_state_is_loading() {
        let source = FakeSource::new(vec![]);
        let (controller, _conn) = spawn_controller(source);

        // Avant que la tâche n'ait tourné, l'état publié est Loading
        assert_eq!(*controller.observe_state().borrow(), ViewState::Loading);
    }

    #[tokio::test(start_paused = true)]
    async fn test_startup_load_emits_showing() {
        let source = FakeSource::new(vec![Ok(vec![btc(), eth()])]);
        let (controller, _conn) = spawn_controller(source);

        settle().await;

        assert_eq!(
            *controller.observe_state().borrow(),
            ViewState::Showing(vec![btc(), eth()])
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_load_failure_with_empty_cache_is_failed() {
        let source = FakeSource::new(vec![Err(anyhow!("timeout"))]);
        let (controller, _conn) = spawn_controller(source);

        settle().await;

        assert_eq!(
            *controller.observe_state().borrow(),
            ViewState::Failed(FETCH_FAILED_MESSAGE.to_string())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_failure_with_cache_degrades_and_keeps_data() {
        let source = FakeSource::new(vec![Ok(vec![btc(), eth()]), Err(anyhow!("timeout"))]);
        let (controller, _conn) = spawn_controller(source);
        settle().await;

        controller.submit(Command::Load);
        settle().await;

        assert_eq!(
            *controller.observe_state().borrow(),
            ViewState::Degraded {
                tickers: vec![btc(), eth()],
                reason: OFFLINE_MESSAGE.to_string(),
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_connectivity_loss_degrades_with_cached_tickers() {
        let source = FakeSource::new(vec![Ok(vec![btc(), eth()])]);
        let (controller, conn_tx) = spawn_controller(source);
        settle().await;

        conn_tx.send(false).unwrap();
        settle().await;

        assert_eq!(
            *controller.observe_state().borrow(),
            ViewState::Degraded {
                tickers: vec![btc(), eth()],
                reason: OFFLINE_MESSAGE.to_string(),
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_load_while_offline_skips_fetch() {
        let source = FakeSource::new(vec![]);
        let (conn_tx, conn_rx) = watch::channel(false);
        let controller = Controller::spawn(source.clone(), conn_rx, test_config());

        settle().await;
        controller.submit(Command::Load);
        settle().await;

        // Aucun fetch tenté, et sans cache l'état est Failed
        assert_eq!(source.call_count(), 0);
        assert_eq!(
            *controller.observe_state().borrow(),
            ViewState::Failed(FETCH_FAILED_MESSAGE.to_string())
        );
        drop(conn_tx);
    }

    #[tokio::test(start_paused = true)]
    async fn test_search_filters_cache_without_fetching() {
        let source = FakeSource::new(vec![Ok(vec![btc(), eth()])]);
        let (controller, _conn) = spawn_controller(source.clone());
        settle().await;
        assert_eq!(source.call_count(), 1);

        controller.submit(Command::Search("BTC".to_string()));
        time::sleep(DEFAULT_DEBOUNCE + Duration::from_millis(50)).await;

        assert_eq!(
            *controller.observe_state().borrow(),
            ViewState::Showing(vec![btc()])
        );
        // La recherche n'a pas redéclenché de fetch
        assert_eq!(source.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rapid_searches_collapse_to_the_last_one() {
        let source = FakeSource::new(vec![Ok(vec![btc(), eth()])]);
        let (controller, _conn) = spawn_controller(source);
        settle().await;

        controller.submit(Command::Search("ETH".to_string()));
        time::sleep(Duration::from_millis(100)).await;

        // Fenêtre de calme pas encore écoulée : rien n'a été appliqué
        assert_eq!(
            *controller.observe_state().borrow(),
            ViewState::Showing(vec![btc(), eth()])
        );

        // Deuxième recherche dans la fenêtre : remplace la première
        controller.submit(Command::Search("BTC".to_string()));
        time::sleep(DEFAULT_DEBOUNCE + Duration::from_millis(50)).await;

        assert_eq!(
            *controller.observe_state().borrow(),
            ViewState::Showing(vec![btc()])
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_reapplies_current_query() {
        // Deux fetchs : la recherche active doit filtrer aussi le second
        let source = FakeSource::new(vec![Ok(vec![btc(), eth()]), Ok(vec![btc(), eth()])]);
        let (controller, _conn) = spawn_controller(source);
        settle().await;

        controller.submit(Command::Search("ETH".to_string()));
        time::sleep(DEFAULT_DEBOUNCE + Duration::from_millis(50)).await;
        assert_eq!(
            *controller.observe_state().borrow(),
            ViewState::Showing(vec![eth()])
        );

        controller.submit(Command::Load);
        settle().await;

        assert_eq!(
            *controller.observe_state().borrow(),
            ViewState::Showing(vec![eth()])
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_successful_load_recovers_from_failed() {
        let source = FakeSource::new(vec![Err(anyhow!("timeout")), Ok(vec![btc()])]);
        let (controller, _conn) = spawn_controller(source);
        settle().await;
        assert!(matches!(
            *controller.observe_state().borrow(),
            ViewState::Failed(_)
        ));

        controller.submit(Command::Load);
        settle().await;

        assert_eq!(
            *controller.observe_state().borrow(),
            ViewState::Showing(vec![btc()])
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnection_forces_no_state_change() {
        let source = FakeSource::new(vec![Ok(vec![btc()])]);
        let (controller, conn_tx) = spawn_controller(source);
        settle().await;

        conn_tx.send(false).unwrap();
        settle().await;
        let degraded = controller.observe_state().borrow().clone();
        assert!(matches!(degraded, ViewState::Degraded { .. }));

        // Retour en ligne : l'état reste dégradé jusqu'au prochain poll
        conn_tx.send(true).unwrap();
        settle().await;
        assert_eq!(*controller.observe_state().borrow(), degraded);
    }

    #[tokio::test(start_paused = true)]
    async fn test_polling_fetches_again_after_interval() {
        let source = FakeSource::new(vec![Ok(vec![btc()]), Ok(vec![btc(), eth()])]);
        let (conn_tx, conn_rx) = watch::channel(true);
        let config = ControllerConfig {
            refresh_interval: Duration::from_secs(5),
            debounce: DEFAULT_DEBOUNCE,
        };
        let controller = Controller::spawn(source.clone(), conn_rx, config);
        settle().await;
        assert_eq!(source.call_count(), 1);

        time::sleep(Duration::from_secs(6)).await;

        assert_eq!(source.call_count(), 2);
        assert_eq!(
            *controller.observe_state().borrow(),
            ViewState::Showing(vec![btc(), eth()])
        );
        drop(conn_tx);
    }
}
