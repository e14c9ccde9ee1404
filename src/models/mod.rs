// ============================================================================
// Module : models
// ============================================================================
// Ce module contient toutes les structures de données de l'application
// ============================================================================

pub mod ticker; // Déclaration du module ticker (fichier ticker.rs)

// Re-export des structures principales pour simplifier les imports
// Au lieu de : use lazyticker::models::ticker::Ticker;
// On peut faire : use lazyticker::models::Ticker;
pub use ticker::{normalize_symbol, Ticker};
