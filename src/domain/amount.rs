/// Amounts coming from the explorer are integer satoshis.
/// 1 BTC = 100_000_000 sat, so 5_000_000_000 sat = 50 BTC.
pub type Satoshis = u64;

pub const SATS_PER_BTC: u64 = 100_000_000;

/// Convert a base-unit amount into its BTC display value.
/// Example: 5_000_000_000 -> 50.0
pub fn to_display_unit(sats: Satoshis) -> f64 {
    sats as f64 / SATS_PER_BTC as f64
}

/// Convert a signed base-unit amount (e.g. a net balance change) into BTC.
pub fn signed_to_display_unit(sats: i64) -> f64 {
    sats as f64 / SATS_PER_BTC as f64
}

/// Convert a BTC display value back into satoshis.
///
/// Rounds half away from zero. Negative inputs and NaN clamp to zero.
pub fn to_base_unit(btc: f64) -> Satoshis {
    let sats = (btc * SATS_PER_BTC as f64).round();
    if sats.is_nan() || sats <= 0.0 {
        0
    } else {
        sats as Satoshis
    }
}

/// Signed variant of [`to_base_unit`], for net amounts.
pub fn signed_to_base_unit(btc: f64) -> i64 {
    let sats = (btc * SATS_PER_BTC as f64).round();
    if sats.is_nan() { 0 } else { sats as i64 }
}

/// Format satoshis as a fixed 8-decimal BTC string.
/// Example: 150_000_000 -> "1.50000000", 1 -> "0.00000001"
pub fn format_btc(sats: Satoshis) -> String {
    format!("{}.{:08}", sats / SATS_PER_BTC, sats % SATS_PER_BTC)
}

/// Signed variant of [`format_btc`].
pub fn format_signed_btc(sats: i64) -> String {
    let sign = if sats < 0 { "-" } else { "" };
    format!("{}{}", sign, format_btc(sats.unsigned_abs()))
}
