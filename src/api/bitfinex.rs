// ============================================================================
// API Client : Bitfinex
// ============================================================================
// Récupère les tickers depuis l'API publique Bitfinex (REST v2)
//
// L'endpoint /tickers retourne un tableau de tableaux hétérogènes :
// chaque ligne mélange une string (symbole) et des nombres, aux positions
// documentées ci-dessous. On décode donc positionnellement via
// serde_json::Value plutôt qu'avec une structure dérivée.
// ============================================================================

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, error, info, instrument};

use crate::api::TickerSource;
use crate::models::Ticker;

/// URL de base de l'API publique Bitfinex
const DEFAULT_BASE_URL: &str = "https://api-pub.bitfinex.com/v2";

/// Timeout des requêtes HTTP
const HTTP_TIMEOUT: Duration = Duration::from_secs(15);

/// Liste fixe des marchés suivis (paires de trading Bitfinex)
pub const TICKER_SYMBOLS: &[&str] = &[
    "tBTCUSD",
    "tETHUSD",
    "tCHSB:USD",
    "tLTCUSD",
    "tXRPUSD",
    "tDSHUSD",
    "tRRTUSD",
    "tEOSUSD",
    "tSANUSD",
    "tDATUSD",
    "tSNTUSD",
    "tDOGE:USD",
    "tLUNA:USD",
    "tMATIC:USD",
    "tNEXO:USD",
    "tOCEAN:USD",
    "tBEST:USD",
    "tAAVE:USD",
    "tPLUUSD",
    "tFILUSD",
];

// Positions des champs dans une ligne de la réponse /tickers
// [SYMBOL, BID, BID_SIZE, ASK, ASK_SIZE, DAILY_CHANGE,
//  DAILY_CHANGE_RELATIVE, LAST_PRICE, VOLUME, HIGH, LOW]
const IDX_SYMBOL: usize = 0;
const IDX_DAILY_CHANGE: usize = 5;
const IDX_DAILY_CHANGE_RELATIVE: usize = 6;
const IDX_LAST_PRICE: usize = 7;
const IDX_VOLUME: usize = 8;

/// Client HTTP pour l'API Bitfinex
///
/// Le client reqwest est construit une seule fois et réutilisé pour
/// toutes les requêtes (pool de connexions).
pub struct BitfinexClient {
    http: reqwest::Client,
    base_url: String,
}

impl BitfinexClient {
    /// Crée un client pointant sur l'API publique Bitfinex
    pub fn new() -> Result<Self> {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Crée un client avec une URL de base explicite (utile pour les tests)
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self> {
        // User-Agent navigateur pour éviter le blocage par l'API
        let http = reqwest::Client::builder()
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .timeout(HTTP_TIMEOUT)
            .build()
            .context("Échec de la création du client HTTP")?;

        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }

    /// Construit l'URL de l'endpoint /tickers avec la liste fixe de symboles
    fn tickers_url(&self) -> String {
        format!(
            "{}/tickers?symbols={}",
            self.base_url,
            TICKER_SYMBOLS.join(",")
        )
    }
}

#[async_trait]
impl TickerSource for BitfinexClient {
    #[instrument(skip(self))]
    async fn fetch_tickers(&self) -> Result<Vec<Ticker>> {
        let url = self.tickers_url();
        debug!(url = %url, "Sending HTTP request to Bitfinex");

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .context("Échec de la requête HTTP vers Bitfinex")?;

        let status = response.status();
        debug!(status = %status, "Received HTTP response");

        if !status.is_success() {
            error!(status = %status, "Bitfinex returned error status");
            anyhow::bail!("Bitfinex a retourné une erreur : HTTP {}", status);
        }

        let rows: Vec<Vec<Value>> = response
            .json()
            .await
            .context("Échec du parsing JSON de la réponse Bitfinex")?;

        let tickers = rows
            .iter()
            .map(|row| decode_row(row))
            .collect::<Result<Vec<_>>>()?;

        info!(count = tickers.len(), "Successfully fetched tickers");
        Ok(tickers)
    }
}

/// Décode une ligne de la réponse /tickers en Ticker
///
/// Toute ligne mal formée fait échouer le fetch entier : le contrôleur
/// traite une réponse partiellement décodable comme une erreur réseau.
fn decode_row(row: &[Value]) -> Result<Ticker> {
    let symbol = row
        .get(IDX_SYMBOL)
        .and_then(Value::as_str)
        .with_context(|| format!("Symbole manquant à l'index {}", IDX_SYMBOL))?;

    let number = |index: usize| -> Result<f64> {
        row.get(index)
            .and_then(Value::as_f64)
            .with_context(|| format!("Champ numérique manquant à l'index {} pour {}", index, symbol))
    };

    Ok(Ticker {
        symbol: symbol.to_string(),
        daily_change: number(IDX_DAILY_CHANGE)?,
        daily_relative_change: number(IDX_DAILY_CHANGE_RELATIVE)?,
        last_price: number(IDX_LAST_PRICE)?,
        volume: number(IDX_VOLUME)?,
    })
}

// ============================================================================
// Tests unitaires
// ============================================================================
