//! Linear vesting math for claims against a pooled escrow balance.

/// Amount a receiver may claim from `balance` at ledger time `now`.
///
/// Vesting is linear over `[start_time, start_time + length_in_seconds]` and is
/// applied to the balance currently held, not to any original deposit:
///
/// - `now > start_time + length_in_seconds`: the whole `balance`.
/// - otherwise: `floor((now - start_time) * balance / length_in_seconds)`.
///
/// A `now` earlier than `start_time` vests nothing. A zero length is treated as
/// fully vested. Non-positive balances yield 0.
///
/// The multiplication is split as `q * elapsed + floor(r * elapsed / length)`
/// with `balance = q * length + r`, which is exact and cannot overflow `u128`
/// because `elapsed <= length` and `r < length <= u64::MAX`.
pub fn claim_amount(balance: i128, start_time: u64, length_in_seconds: u64, now: u64) -> i128 {
    if balance <= 0 {
        return 0;
    }
    if length_in_seconds == 0 {
        return balance;
    }

    let end_time = start_time.saturating_add(length_in_seconds);
    if now > end_time {
        return balance;
    }

    let elapsed = now.saturating_sub(start_time) as u128;
    let length = length_in_seconds as u128;
    let total = balance as u128;

    let whole = total / length;
    let remainder = total % length;
    let vested = whole * elapsed + remainder * elapsed / length;

    // vested <= total <= i128::MAX
    vested as i128
}
