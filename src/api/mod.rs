// ============================================================================
// Module : api
// ============================================================================
// Ce module contient les sources de données de marché. Le contrôleur ne
// dépend que du trait TickerSource ; l'implémentation HTTP (Bitfinex) est
// injectée au démarrage, ce qui permet de brancher une source factice
// dans les tests.
// ============================================================================

use anyhow::Result;
use async_trait::async_trait;

use crate::models::Ticker;

pub mod bitfinex; // Client API Bitfinex

// Re-export du client principal
pub use bitfinex::BitfinexClient;

/// Source de tickers abstraite
///
/// Un seul contrat : récupérer la liste complète des tickers suivis.
/// Toute erreur (transport, statut HTTP, décodage) est remontée comme
/// une erreur de fetch uniforme, traduite en état affichable par le
/// contrôleur — jamais propagée plus loin.
#[async_trait]
pub trait TickerSource: Send + Sync {
    async fn fetch_tickers(&self) -> Result<Vec<Ticker>>;
}
