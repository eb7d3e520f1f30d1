//! Validation utilities for the Rice Inventory Management System

use rust_decimal::Decimal;

use crate::error::{LedgerError, LedgerResult};

// ============================================================================
// Weight Validations
// ============================================================================

/// Decimal places stored for every weight column
pub const WEIGHT_SCALE: u32 = 2;

/// Column precision of `stocks.weight_kg`
pub const STOCK_WEIGHT_PRECISION: u32 = 12;

/// Column precision of `milling_outputs.unit_weight_kg`
pub const UNIT_WEIGHT_PRECISION: u32 = 10;

/// Column precision of `milling_outputs.total_weight_kg`
pub const TOTAL_WEIGHT_PRECISION: u32 = 14;

/// Reject weights the `NUMERIC(precision, 2)` column would round or refuse
pub fn validate_weight_column(field: &str, value: Decimal, precision: u32) -> LedgerResult<()> {
    if value.normalize().scale() > WEIGHT_SCALE {
        return Err(LedgerError::validation(
            field,
            format!("{} allows at most {} decimal places, got {}", field, WEIGHT_SCALE, value),
        ));
    }
    let limit = Decimal::from(10_i64.pow(precision - WEIGHT_SCALE));
    if value.abs() >= limit {
        return Err(LedgerError::validation(
            field,
            format!("{} must be below {}, got {}", field, limit, value),
        ));
    }
    Ok(())
}

// ============================================================================
// Bulk Request Validations
// ============================================================================

/// Reject bulk requests that are empty or exceed the per-call item budget
pub fn validate_bulk_size(field: &str, len: usize, max_items: usize) -> LedgerResult<()> {
    if len == 0 {
        return Err(LedgerError::validation(field, "Nothing selected"));
    }
    if len > max_items {
        return Err(LedgerError::validation(
            field,
            format!("At most {} items can be processed per request, got {}", max_items, len),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn bulk_size_accepts_exactly_one_to_max(len in 0usize..2000, max in 1usize..1000) {
            let ok = validate_bulk_size("ids", len, max).is_ok();
            prop_assert_eq!(ok, len >= 1 && len <= max);
        }
    }

    #[test]
    fn weight_column_scale_and_bound() {
        assert!(validate_weight_column("unit_weight_kg", "20.50".parse().unwrap(), UNIT_WEIGHT_PRECISION).is_ok());
        assert!(validate_weight_column("unit_weight_kg", "20.500".parse().unwrap(), UNIT_WEIGHT_PRECISION).is_ok());
        assert!(validate_weight_column("unit_weight_kg", "0.333".parse().unwrap(), UNIT_WEIGHT_PRECISION).is_err());
        assert!(validate_weight_column("unit_weight_kg", "99999999.99".parse().unwrap(), UNIT_WEIGHT_PRECISION).is_ok());
        assert!(validate_weight_column("unit_weight_kg", "100000000".parse().unwrap(), UNIT_WEIGHT_PRECISION).is_err());
    }

    #[test]
    fn bulk_size_bounds() {
        assert!(validate_bulk_size("ids", 0, 10).is_err());
        assert!(validate_bulk_size("ids", 10, 10).is_ok());
        assert!(validate_bulk_size("ids", 11, 10).is_err());
    }
}
