//! Monetary amount rules shared by the ledger and the transfer engine

use rust_decimal::Decimal;

use super::result::{Error, Result};

/// Decimal places stored for every balance (DECIMAL(15, 2))
pub const SCALE: u32 = 2;

/// Largest balance the account column can hold: 9_999_999_999_999.99
pub const MAX_BALANCE: Decimal = Decimal::from_parts(2_764_472_319, 232_830, 0, false, SCALE);

/// Rescale to the stored precision so values print as `70.00`
pub fn to_cents_scale(value: Decimal) -> Decimal {
    let mut scaled = value;
    scaled.rescale(SCALE);
    scaled
}

/// Validate a transfer amount: strictly positive, at most two decimal places
pub fn validate_transfer_amount(amount: Decimal) -> Result<Decimal> {
    if amount <= Decimal::ZERO {
        return Err(Error::invalid_amount(format!(
            "amount must be greater than zero, got {}",
            amount
        )));
    }
    check_precision(amount)?;
    if amount > MAX_BALANCE {
        return Err(Error::invalid_amount(format!("amount {} is too large", amount)));
    }
    Ok(to_cents_scale(amount))
}

/// Validate a signed balance adjustment
pub fn validate_delta(delta: Decimal) -> Result<Decimal> {
    check_precision(delta)?;
    if delta.abs() > MAX_BALANCE {
        return Err(Error::invalid_amount(format!("adjustment {} is too large", delta)));
    }
    Ok(to_cents_scale(delta))
}

/// Apply `delta` to `balance`, enforcing the non-negative and capacity invariants
pub fn apply_delta(balance: Decimal, delta: Decimal) -> Result<Decimal> {
    let updated = balance + delta;
    if updated < Decimal::ZERO {
        return Err(Error::InsufficientFunds {
            available: balance,
            requested: delta.abs(),
        });
    }
    if updated > MAX_BALANCE {
        return Err(Error::invalid_amount(format!(
            "balance would exceed the maximum of {}",
            MAX_BALANCE
        )));
    }
    Ok(to_cents_scale(updated))
}

fn check_precision(value: Decimal) -> Result<()> {
    if value.normalize().scale() > SCALE {
        return Err(Error::invalid_amount(format!(
            "{} has more than two decimal places",
            value
        )));
    }
    Ok(())
}
