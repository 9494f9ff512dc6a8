//! Pip arithmetic for forex symbols.

/// Pip size for a symbol: 0.01 for JPY-quoted pairs, 0.0001 otherwise.
pub fn pip_size(symbol: &str) -> f64 {
    if symbol.trim().to_ascii_uppercase().ends_with("JPY") {
        0.01
    } else {
        0.0001
    }
}

pub fn price_to_pips(price_distance: f64, pip_size: f64) -> f64 {
    if pip_size <= 0.0 {
        return 0.0;
    }
    price_distance / pip_size
}

pub fn pips_to_price(pips: f64, pip_size: f64) -> f64 {
    pips * pip_size
}
