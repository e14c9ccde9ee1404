// ============================================================================
// Structure : Ticker
// ============================================================================
// Représente l'instantané prix/volume d'un marché crypto (ex: tBTCUSD)
//
// Valeur immuable : le formatage d'affichage (symbole court, prix en dollars,
// variation en pourcentage) est dérivé à la demande, jamais stocké.
// ============================================================================

use serde::{Deserialize, Serialize};

/// Instantané d'un marché : prix, variation journalière et volume
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticker {
    /// Symbole brut de la paire (ex: "tBTCUSD", "tDOGE:USD")
    pub symbol: String,

    /// Dernier prix échangé
    pub last_price: f64,

    /// Variation absolue sur 24h
    pub daily_change: f64,

    /// Variation relative sur 24h (fraction, ex: 0.05 pour +5%)
    pub daily_relative_change: f64,

    /// Volume échangé sur 24h
    pub volume: f64,
}

impl Ticker {
    /// Crée un nouveau Ticker
    pub fn new(
        symbol: impl Into<String>,
        last_price: f64,
        daily_change: f64,
        daily_relative_change: f64,
        volume: f64,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            last_price,
            daily_change,
            daily_relative_change,
            volume,
        }
    }

    /// Symbole court pour l'affichage (ex: "tBTCUSD" → "BTC")
    ///
    /// C'est sur ce symbole normalisé que porte la recherche,
    /// pas sur le symbole brut de la paire.
    pub fn display_symbol(&self) -> String {
        normalize_symbol(&self.symbol)
    }

    /// Prix formaté avec symbole dollar et séparateurs de milliers
    /// (ex: 45000.0 → "$45,000.00")
    pub fn formatted_price(&self) -> String {
        format!("${}", format_decimal(self.last_price))
    }

    /// Variation journalière relative formatée en pourcentage
    /// (ex: 0.05 → "5.00%")
    pub fn formatted_daily_change(&self) -> String {
        format!("{}%", format_decimal(self.daily_relative_change * 100.0))
    }

    /// Retourne true si le ticker est en hausse sur 24h
    pub fn is_positive(&self) -> bool {
        self.daily_change > 0.0
    }
}

/// Normalise un symbole de paire en symbole court d'affichage
///
/// Règles :
/// - supprime un unique 't' en tête (marqueur de paire de trading Bitfinex)
/// - supprime le suffixe de devise de cotation "USD" et le séparateur ':'
///
/// La fonction est idempotente : normaliser un symbole déjà normalisé
/// le laisse inchangé.
pub fn normalize_symbol(symbol: &str) -> String {
    let stripped = symbol.strip_prefix('t').unwrap_or(symbol);
    stripped.replace("USD", "").replace(':', "")
}

/// Formate un nombre avec deux décimales et séparateurs de milliers
/// (équivalent du pattern "#,##0.00")
fn format_decimal(value: f64) -> String {
    let rounded = format!("{:.2}", value);

    // Sépare le signe pour ne pas grouper le '-'
    let (sign, digits) = match rounded.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", rounded.as_str()),
    };

    let (int_part, frac_part) = digits.split_once('.').unwrap_or((digits, "00"));

    // Insère une virgule tous les trois chiffres en partant de la droite
    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    format!("{}{}.{}", sign, grouped, frac_part)
}

// ============================================================================
// Tests unitaires
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn ticker(symbol: &str) -> Ticker {
        Ticker::new(symbol, 45000.0, 100.0, 0.05, 50000.0)
    }

    #[test]
    fn test_display_symbol_strips_prefix_and_usd() {
        assert_eq!(ticker("tBTCUSD").display_symbol(), "BTC");
    }

    #[test]
    fn test_display_symbol_strips_usd_and_colon() {
        assert_eq!(ticker("BTC:USD").display_symbol(), "BTC");
        assert_eq!(ticker("tDOGE:USD").display_symbol(), "DOGE");
    }

    #[test]
    fn test_display_symbol_unchanged_without_prefix_or_usd() {
        assert_eq!(ticker("ETH").display_symbol(), "ETH");
    }

    #[test]
    fn test_normalize_symbol_is_idempotent() {
        for raw in ["tBTCUSD", "BTC:USD", "tDOGE:USD", "ETH", ""] {
            let once = normalize_symbol(raw);
            assert_eq!(normalize_symbol(&once), once, "non idempotent pour {raw:?}");
        }
    }

    #[test]
    fn test_btc_display_scenario() {
        let t = Ticker::new("tBTCUSD", 45000.0, 100.0, 0.05, 50000.0);
        assert_eq!(t.display_symbol(), "BTC");
        assert_eq!(t.formatted_price(), "$45,000.00");
    }

    #[test]
    fn test_formatted_price_with_commas() {
        let t = Ticker::new("BTC", 45000.123, 100.0, 0.05, 50000.0);
        assert_eq!(t.formatted_price(), "$45,000.12");
    }

    #[test]
    fn test_formatted_price_large_number() {
        let t = Ticker::new("BTC", 123456789.987, 100.0, 0.05, 50000.0);
        assert_eq!(t.formatted_price(), "$123,456,789.99");
    }

    #[test]
    fn test_formatted_price_small_number() {
        let t = Ticker::new("XRP", 0.5, 0.01, 0.02, 1000.0);
        assert_eq!(t.formatted_price(), "$0.50");
    }

    #[test]
    fn test_formatted_daily_change_percentage() {
        let t = Ticker::new("BTC", 45000.0, 100.0, 0.05, 50000.0);
        assert_eq!(t.formatted_daily_change(), "5.00%");
    }

    #[test]
    fn test_formatted_daily_change_negative() {
        let t = Ticker::new("BTC", 45000.0, -100.0, -0.025, 50000.0);
        assert_eq!(t.formatted_daily_change(), "-2.50%");
    }

    #[test]
    fn test_formatted_daily_change_rounding() {
        let t = Ticker::new("BTC", 45000.0, 100.0, 0.04567, 50000.0);
        assert_eq!(t.formatted_daily_change(), "4.57%");
    }

    #[test]
    fn test_is_positive() {
        assert!(Ticker::new("BTC", 45000.0, 100.0, 0.05, 50000.0).is_positive());
        assert!(!Ticker::new("BTC", 45000.0, -100.0, -0.05, 50000.0).is_positive());
    }
}
