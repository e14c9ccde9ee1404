// ============================================================================
// LazyTicker - Suivi de tickers crypto dans le terminal
// ============================================================================
// Programme TUI qui interroge l'API publique Bitfinex à intervalle fixe,
// garde en cache le dernier résultat réussi, filtre côté client par
// sous-chaîne et reflète les coupures réseau dans l'interface.
//
// Architecture :
// - Le contrôleur (tâche tokio) possède l'état : polling, cache, filtre
// - La sonde de connectivité publie un booléen dans un canal watch
// - La boucle TUI reste synchrone et observe l'état via un watch::Receiver
// ============================================================================

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::{debug, error, info};

use lazyticker::api::BitfinexClient;
use lazyticker::app::App;
use lazyticker::connectivity::ConnectivityMonitor;
use lazyticker::controller::{Command, Controller, ControllerConfig};
use lazyticker::ui::{events::EventHandler, render, Event};

// ============================================================================
// Initialisation du logging
// ============================================================================
// Les println! ne fonctionnent pas une fois le TUI lancé : on log vers
// un fichier avec rotation quotidienne.
// ============================================================================

/// Initialise le système de logging vers fichier
///
/// Les logs sont écrits dans :
/// - Linux/WSL : ~/.local/share/lazyticker/logs/lazyticker.log
/// - macOS : ~/Library/Application Support/lazyticker/logs/lazyticker.log
/// - Windows : C:\Users\<user>\AppData\Local\lazyticker\logs\lazyticker.log
///
/// # Utilisation
/// ```bash
/// # Voir les logs en temps réel
/// tail -f ~/.local/share/lazyticker/logs/lazyticker.log
///
/// # Contrôler le niveau de log
/// RUST_LOG=debug cargo run
/// RUST_LOG=lazyticker=trace cargo run
/// ```
fn init_logging() -> Result<()> {
    use tracing_appender::rolling::{RollingFileAppender, Rotation};
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("lazyticker")
        .join("logs");

    std::fs::create_dir_all(&log_dir).context("Échec de la création du répertoire de logs")?;

    let file_appender =
        RollingFileAppender::new(Rotation::DAILY, log_dir.clone(), "lazyticker.log");

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(file_appender)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(true)
                .with_line_number(true),
        )
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lazyticker=debug,info".into()),
        )
        .init();

    info!(?log_dir, "Logging initialisé");
    Ok(())
}

// ============================================================================
// Point d'entrée du programme
// ============================================================================

fn main() -> Result<()> {
    init_logging().unwrap_or_else(|e| {
        eprintln!("⚠️  Warning: Failed to initialize logging: {}", e);
        eprintln!("   Continuing without logging...");
    });

    info!("LazyTicker starting up");

    // Runtime tokio pour le contrôleur et la sonde de connectivité ;
    // la boucle TUI elle-même reste synchrone
    let runtime = tokio::runtime::Runtime::new()?;
    let _guard = runtime.enter();

    // Câblage explicite au démarrage : client → sonde → contrôleur
    let source = Arc::new(BitfinexClient::new()?);
    let monitor = ConnectivityMonitor::spawn_default();
    let controller = Controller::spawn(source, monitor.subscribe(), ControllerConfig::default());

    debug!("Setting up terminal");
    let mut terminal = setup_terminal()?;

    let events = EventHandler::new();

    info!("Starting event loop");
    let result = run(&mut terminal, &controller, &events);

    debug!("Restoring terminal");
    restore_terminal(&mut terminal)?;

    match &result {
        Ok(_) => info!("Application exited normally"),
        Err(e) => error!(error = ?e, "Application exited with error"),
    }

    result
}

// ============================================================================
// Event Loop Principal
// ============================================================================
// À chaque itération :
//   1. Récupérer le dernier état publié par le contrôleur
//   2. Dessiner l'interface
//   3. Traiter l'événement clavier (ou le tick)
// ============================================================================

/// Exécute la boucle principale de l'application
fn run(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    controller: &Controller,
    events: &EventHandler,
) -> Result<()> {
    let mut app = App::new();
    let mut state_rx = controller.observe_state();

    while app.is_running() {
        // Nouvelle valeur publiée par le contrôleur ?
        if state_rx.has_changed().unwrap_or(false) {
            let state = state_rx.borrow_and_update().clone();
            debug!(state = ?std::mem::discriminant(&state), "Applying new view state");
            app.apply_state(state);
        }

        terminal.draw(|frame| render(frame, &app))?;

        match events.next() {
            Ok(event) => handle_event(&mut app, event, controller),
            Err(error) => {
                error!(error = ?error, "Failed to read terminal event");
            }
        }
    }

    Ok(())
}

// ============================================================================
// Gestion des événements
// ============================================================================

/// Traite un événement clavier et met à jour l'état de l'interface
///
/// Les commandes qui touchent aux données (recherche, rechargement)
/// partent vers le contrôleur ; tout le reste est local à l'App.
fn handle_event(app: &mut App, event: Event, controller: &Controller) {
    use lazyticker::ui::events::{
        get_char_from_event, is_backspace_event, is_down_event, is_enter_event, is_escape_event,
        is_query_char_event, is_quit_event, is_refresh_event, is_search_event, is_up_event,
    };

    match event {
        // ========================================
        // Mode recherche : capture des touches en priorité
        // ========================================

        // ESC : efface le filtre et rend le focus à la liste
        Event::Key(_) if is_escape_event(&event) && app.is_searching() => {
            debug!("User cleared search");
            app.clear_query();
            controller.submit(Command::Search(String::new()));
        }

        // Enter : valide, le filtre courant reste appliqué
        Event::Key(_) if is_enter_event(&event) && app.is_searching() => {
            debug!(query = %app.query, "User confirmed search");
            app.stop_search();
        }

        // Backspace : supprime le dernier caractère et refiltre
        Event::Key(_) if is_backspace_event(&event) && app.is_searching() => {
            app.backspace_query();
            controller.submit(Command::Search(app.query.clone()));
        }

        // Caractères : chaque frappe part vers le contrôleur, qui
        // coalesce la rafale via son debounce
        Event::Key(_) if is_query_char_event(&event) && app.is_searching() => {
            if let Some(c) = get_char_from_event(&event) {
                app.append_query_char(c);
                controller.submit(Command::Search(app.query.clone()));
            }
        }

        // ========================================
        // Navigation et commandes globales
        // ========================================

        // 'q' : quit en deux temps
        Event::Key(_) if is_quit_event(&event) => {
            if app.is_awaiting_quit_confirmation() {
                info!("User confirmed quit");
                app.quit();
            } else {
                info!("User requested quit (awaiting confirmation)");
                app.request_quit();
            }
        }

        // '/' : focus sur la barre de recherche
        Event::Key(_) if is_search_event(&event) => {
            app.cancel_quit();
            debug!("User focused search bar");
            app.start_search();
        }

        // 'r' : rechargement manuel sans attendre le prochain poll
        Event::Key(_) if is_refresh_event(&event) => {
            app.cancel_quit();
            info!("User requested manual refresh");
            controller.submit(Command::Load);
        }

        Event::Key(_) if is_up_event(&event) => {
            app.cancel_quit();
            app.navigate_up();
        }

        Event::Key(_) if is_down_event(&event) => {
            app.cancel_quit();
            app.navigate_down();
        }

        // ESC hors mode recherche : efface le filtre courant s'il y en a un
        Event::Key(_) if is_escape_event(&event) => {
            app.cancel_quit();
            if !app.query.is_empty() {
                debug!("User cleared search filter");
                app.clear_query();
                controller.submit(Command::Search(String::new()));
            }
        }

        Event::Tick => {
            // Tick régulier : la boucle redessine avec l'état courant
        }

        Event::Key(_) => {
            // Toute autre touche : annule la confirmation de quit si active
            app.cancel_quit();
        }
    }
}

// ============================================================================
// Setup et restauration du terminal
// ============================================================================
// IMPORTANT : toujours restaurer le terminal avant de quitter !
// ============================================================================

/// Configure le terminal en mode TUI (raw mode + écran alternatif)
fn setup_terminal() -> Result<Terminal<CrosstermBackend<io::Stdout>>> {
    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;

    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend).map_err(|e| e.into())
}

/// Restaure le terminal à son état normal
fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode()?;

    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;

    terminal.show_cursor()?;

    Ok(())
}
