// ============================================================================
// Structure : App
// ============================================================================
// État de l'interface TUI.
//
// L'App ne possède pas la vérité sur les données : elle garde seulement
// le dernier ViewState publié par le contrôleur, plus l'état purement
// local à l'interface (buffer de recherche, ligne sélectionnée,
// confirmation de quit).
// ============================================================================

use crate::controller::ViewState;
use crate::models::Ticker;

/// État de l'application TUI
pub struct App {
    /// Indique si l'application doit continuer à tourner
    pub running: bool,

    /// Dernier état publié par le contrôleur
    pub view: ViewState,

    /// Buffer de saisie de la recherche
    pub query: String,

    /// Vrai quand le focus est sur la barre de recherche
    pub searching: bool,

    /// Index de la ligne sélectionnée dans la liste
    pub selected_index: usize,

    /// Vrai après une première pression de 'q' (quit en deux temps)
    pub confirm_quit: bool,
}

impl App {
    /// Crée l'état initial : en chargement, recherche vide
    pub fn new() -> Self {
        Self {
            running: true,
            view: ViewState::Loading,
            query: String::new(),
            searching: false,
            selected_index: 0,
            confirm_quit: false,
        }
    }

    /// Quitte l'application
    pub fn quit(&mut self) {
        self.running = false;
    }

    /// Vérifie si l'application doit continuer
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Applique un nouvel état publié par le contrôleur
    ///
    /// La sélection est bornée à la nouvelle taille de liste : un
    /// rafraîchissement ou un filtre peut réduire le nombre de lignes.
    pub fn apply_state(&mut self, state: ViewState) {
        self.view = state;
        let max_index = self.visible_tickers().len().saturating_sub(1);
        self.selected_index = self.selected_index.min(max_index);
    }

    /// Tickers actuellement affichables selon l'état courant
    ///
    /// En mode dégradé, ce sont les données périmées du cache.
    pub fn visible_tickers(&self) -> &[Ticker] {
        match &self.view {
            ViewState::Showing(tickers) => tickers,
            ViewState::Degraded { tickers, .. } => tickers,
            ViewState::Loading | ViewState::Failed(_) => &[],
        }
    }

    /// Navigue vers le haut dans la liste
    pub fn navigate_up(&mut self) {
        self.selected_index = self.selected_index.saturating_sub(1);
    }

    /// Navigue vers le bas dans la liste
    pub fn navigate_down(&mut self) {
        let max_index = self.visible_tickers().len().saturating_sub(1);
        self.selected_index = (self.selected_index + 1).min(max_index);
    }

    // ========================================================================
    // Barre de recherche
    // ========================================================================

    /// Donne le focus à la barre de recherche
    pub fn start_search(&mut self) {
        self.searching = true;
    }

    /// Rend le focus à la liste (le filtre courant reste appliqué)
    pub fn stop_search(&mut self) {
        self.searching = false;
    }

    /// Vérifie si la barre de recherche a le focus
    pub fn is_searching(&self) -> bool {
        self.searching
    }

    /// Ajoute un caractère au buffer de recherche
    pub fn append_query_char(&mut self, c: char) {
        self.query.push(c);
    }

    /// Supprime le dernier caractère du buffer de recherche
    pub fn backspace_query(&mut self) {
        self.query.pop();
    }

    /// Vide le buffer de recherche et rend le focus à la liste
    pub fn clear_query(&mut self) {
        self.query.clear();
        self.searching = false;
    }

    // ========================================================================
    // Confirmation de quit (deux temps)
    // ========================================================================

    /// Demande la confirmation de quitter (première pression de 'q')
    pub fn request_quit(&mut self) {
        self.confirm_quit = true;
    }

    /// Annule la demande de quit
    pub fn cancel_quit(&mut self) {
        self.confirm_quit = false;
    }

    /// Vérifie si on attend la confirmation de quit
    pub fn is_awaiting_quit_confirmation(&self) -> bool {
        self.confirm_quit
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests unitaires
// ============================================================================
