// ============================================================================
// LazyTicker - Library
// ============================================================================
// Expose les modules publics pour les tests et le binaire
// ============================================================================

pub mod api;          // Source de tickers (API Bitfinex)
pub mod app;          // État de l'interface
pub mod connectivity; // Signal de connectivité réseau
pub mod controller;   // Contrôleur d'état (intent → fetch/filter → state)
pub mod models;       // Structures de données
pub mod ui;           // Interface utilisateur
