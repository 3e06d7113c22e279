//! Pure price and quantity arithmetic
//!
//! Prices are quoted in fund base units per whole token; `unit` is the number
//! of token base units in one whole token. Every helper uses checked
//! arithmetic and reports overflow as [`MetroError::Overflow`].
//!
//! Within a window the price falls linearly, one step per tick, from the
//! window's opening price to the floor, which it reaches on the window's last
//! tick. A window that opens at or below the floor stays at the floor.

use metro_core::{Amount, MetroError, Result, UnixTime};

/// Tick index of `at`, counted from `genesis` in steps of `time_scale` seconds.
///
/// Instants before genesis map to tick zero.
pub fn which_tick(genesis: UnixTime, at: UnixTime, time_scale: u64) -> u64 {
    at.saturating_since(genesis) / time_scale.max(1)
}

/// Price after `elapsed_ticks` of a window that lasts `window_ticks`
pub fn decayed_price(
    opening: Amount,
    floor: Amount,
    elapsed_ticks: u64,
    window_ticks: u64,
) -> Result<Amount> {
    if opening <= floor {
        return Ok(floor);
    }
    let last_tick = window_ticks.saturating_sub(1);
    if last_tick == 0 || elapsed_ticks >= last_tick {
        return Ok(floor);
    }
    let span = opening - floor;
    let drop = span
        .checked_mul(Amount::from(elapsed_ticks))
        .ok_or_else(|| MetroError::overflow("price decay"))?
        / Amount::from(last_tick);
    Ok(opening.saturating_sub(drop).max(floor))
}

/// Opening price of a daily window: twice the last purchase price, kept
/// within `[floor, ceiling]`. Without any prior purchase it opens at `ceiling`.
pub fn daily_opening_price(
    last_purchase_price: Option<Amount>,
    floor: Amount,
    ceiling: Amount,
) -> Amount {
    match last_purchase_price {
        Some(last) => last.saturating_mul(2).clamp(floor, ceiling.max(floor)),
        None => ceiling.max(floor),
    }
}

/// Whole base units of token that `funds` buys at `price` (truncating)
pub fn tokens_for_funds(funds: Amount, price: Amount, unit: Amount) -> Result<Amount> {
    if price == 0 {
        return Err(MetroError::invalid("Price must be positive"));
    }
    // funds * unit / price, split so the product never needs more than u128
    let whole = (funds / price)
        .checked_mul(unit)
        .ok_or_else(|| MetroError::overflow("funds scaling"))?;
    let part = (funds % price)
        .checked_mul(unit)
        .ok_or_else(|| MetroError::overflow("funds remainder scaling"))?
        / price;
    whole
        .checked_add(part)
        .ok_or_else(|| MetroError::overflow("token quantity"))
}

/// Funds needed for `tokens` base units at `price`, rounded up so a buyer is
/// never undercharged
pub fn cost_of_tokens(tokens: Amount, price: Amount, unit: Amount) -> Result<Amount> {
    if unit == 0 {
        return Err(MetroError::invalid("Token unit must be positive"));
    }
    let whole = (tokens / unit)
        .checked_mul(price)
        .ok_or_else(|| MetroError::overflow("purchase cost"))?;
    let part = (tokens % unit)
        .checked_mul(price)
        .ok_or_else(|| MetroError::overflow("purchase cost remainder"))?
        .div_ceil(unit);
    whole
        .checked_add(part)
        .ok_or_else(|| MetroError::overflow("purchase cost"))
}
