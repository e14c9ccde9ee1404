// ============================================================================
// Gestion des événements
// ============================================================================
// Gère les événements clavier et les ticks de l'application
// ============================================================================

use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, Event as CrosstermEvent, KeyCode, KeyEvent, KeyEventKind};

/// Événements de l'application
#[derive(Debug, Clone)]
pub enum Event {
    /// Touche pressée
    Key(KeyEvent),

    /// Tick régulier (pas d'événement clavier pendant le timeout)
    Tick,
}

/// Gestionnaire d'événements (stateless)
pub struct EventHandler;

impl EventHandler {
    /// Crée un nouveau gestionnaire d'événements
    pub fn new() -> Self {
        Self
    }

    /// Lit le prochain événement (bloquant avec timeout de 250ms)
    ///
    /// Sans événement clavier pendant le timeout, retourne Tick : la
    /// boucle principale en profite pour redessiner l'état courant.
    pub fn next(&self) -> Result<Event> {
        if event::poll(Duration::from_millis(250))? {
            match event::read()? {
                CrosstermEvent::Key(key) => {
                    // Sur certains OS on reçoit Press ET Release ;
                    // on ne garde que Press pour éviter les doublons
                    if key.kind == KeyEventKind::Press {
                        Ok(Event::Key(key))
                    } else {
                        Ok(Event::Tick)
                    }
                }

                // Autres événements (resize, mouse, etc.) ignorés
                _ => Ok(Event::Tick),
            }
        } else {
            Ok(Event::Tick)
        }
    }
}

impl Default for EventHandler {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Helpers : identifier les touches
// ============================================================================

/// Vérifie si l'événement est la touche 'q' (quitter)
pub fn is_quit_event(event: &Event) -> bool {
    if let Event::Key(key) = event {
        matches!(key.code, KeyCode::Char('q') | KeyCode::Char('Q'))
    } else {
        false
    }
}

/// Vérifie si l'événement est '/' (focus sur la recherche)
pub fn is_search_event(event: &Event) -> bool {
    if let Event::Key(key) = event {
        matches!(key.code, KeyCode::Char('/'))
    } else {
        false
    }
}

/// Vérifie si l'événement est 'r' (rechargement manuel)
pub fn is_refresh_event(event: &Event) -> bool {
    if let Event::Key(key) = event {
        matches!(key.code, KeyCode::Char('r') | KeyCode::Char('R'))
    } else {
        false
    }
}

/// Vérifie si l'événement est Échap
pub fn is_escape_event(event: &Event) -> bool {
    if let Event::Key(key) = event {
        matches!(key.code, KeyCode::Esc)
    } else {
        false
    }
}

/// Vérifie si l'événement est Entrée
pub fn is_enter_event(event: &Event) -> bool {
    if let Event::Key(key) = event {
        matches!(key.code, KeyCode::Enter)
    } else {
        false
    }
}

/// Vérifie si l'événement est la flèche vers le haut ou 'k' (vim)
pub fn is_up_event(event: &Event) -> bool {
    if let Event::Key(key) = event {
        matches!(
            key.code,
            KeyCode::Up | KeyCode::Char('k') | KeyCode::Char('K')
        )
    } else {
        false
    }
}

/// Vérifie si l'événement est la flèche vers le bas ou 'j' (vim)
pub fn is_down_event(event: &Event) -> bool {
    if let Event::Key(key) = event {
        matches!(
            key.code,
            KeyCode::Down | KeyCode::Char('j') | KeyCode::Char('J')
        )
    } else {
        false
    }
}

/// Vérifie si l'événement est Backspace
pub fn is_backspace_event(event: &Event) -> bool {
    if let Event::Key(key) = event {
        matches!(key.code, KeyCode::Backspace)
    } else {
        false
    }
}

/// Vérifie si l'événement est un caractère valide pour la recherche
pub fn is_query_char_event(event: &Event) -> bool {
    if let Event::Key(key) = event {
        matches!(key.code, KeyCode::Char(c) if c.is_alphanumeric() || c == '-' || c == ':')
    } else {
        false
    }
}

/// Extrait le caractère d'un événement clavier si c'est un caractère
pub fn get_char_from_event(event: &Event) -> Option<char> {
    if let Event::Key(key) = event {
        if let KeyCode::Char(c) = key.code {
            return Some(c);
        }
    }
    None
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;

    fn key(code: KeyCode) -> Event {
        Event::Key(KeyEvent::new(code, KeyModifiers::empty()))
    }

    #[test]
    fn test_is_quit_event() {
        assert!(is_quit_event(&key(KeyCode::Char('q'))));
        assert!(is_quit_event(&key(KeyCode::Char('Q'))));
        assert!(!is_quit_event(&key(KeyCode::Char('a'))));
        assert!(!is_quit_event(&Event::Tick));
    }

    #[test]
    fn test_is_search_event() {
        assert!(is_search_event(&key(KeyCode::Char('/'))));
        assert!(!is_search_event(&key(KeyCode::Char('s'))));
    }

    #[test]
    fn test_is_query_char_event() {
        assert!(is_query_char_event(&key(KeyCode::Char('b'))));
        assert!(is_query_char_event(&key(KeyCode::Char('3'))));
        assert!(is_query_char_event(&key(KeyCode::Char(':'))));
        assert!(!is_query_char_event(&key(KeyCode::Char('/'))));
        assert!(!is_query_char_event(&key(KeyCode::Enter)));
    }

    #[test]
    fn test_navigation_events() {
        assert!(is_up_event(&key(KeyCode::Up)));
        assert!(is_up_event(&key(KeyCode::Char('k'))));
        assert!(is_down_event(&key(KeyCode::Down)));
        assert!(is_down_event(&key(KeyCode::Char('j'))));
    }
}
