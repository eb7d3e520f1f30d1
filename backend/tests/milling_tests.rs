//! Milling batch tests
//!
//! Tests for the milling batch engine including:
//! - Consuming stock and computing the input total
//! - Closed batches reject changes, removal after packaging is blocked
//! - Packaging validation and replace-all idempotence
//! - Yield only once closed with output

use chrono::{NaiveDate, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::{
    batch_yield, ensure_all_available, ensure_member_of, milling_yield, total_weight,
    validate_packaging, yield_percent, LedgerError, MillingBatch, NewMillingBatch, OutputPackage,
    PackagingLine, Stock, StockStatus,
};
use std::str::FromStr;
use uuid::Uuid;

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn stock(bag_no: i32, weight: &str) -> Stock {
    let now = Utc::now();
    Stock {
        id: Uuid::new_v4(),
        production_year: 2024,
        producer_id: Uuid::new_v4(),
        variety_id: Uuid::new_v4(),
        bag_no,
        weight_kg: dec(weight),
        incoming_date: NaiveDate::from_ymd_opt(2024, 10, 1).unwrap(),
        status: StockStatus::Available,
        lot_code: None,
        milling_batch_id: None,
        release_id: None,
        created_at: now,
        updated_at: now,
    }
}

fn batch(total_input: &str, closed: bool) -> MillingBatch {
    let now = Utc::now();
    MillingBatch {
        id: Uuid::new_v4(),
        milling_date: NaiveDate::from_ymd_opt(2024, 11, 1).unwrap(),
        title: "11월 백미 도정".to_string(),
        remarks: None,
        milling_type: "백미".to_string(),
        total_input_kg: dec(total_input),
        is_closed: closed,
        created_at: now,
        updated_at: now,
    }
}

fn line(package_type: &str, unit: &str, count: i32, total: Option<&str>) -> PackagingLine {
    PackagingLine {
        package_type: package_type.to_string(),
        unit_weight_kg: dec(unit),
        package_count: count,
        total_weight_kg: total.map(dec),
    }
}

fn outputs_for(batch: &MillingBatch, lines: &[PackagingLine]) -> Vec<OutputPackage> {
    validate_packaging(lines)
        .unwrap()
        .into_iter()
        .map(|(l, total)| OutputPackage {
            id: Uuid::new_v4(),
            batch_id: batch.id,
            package_type: l.package_type.clone(),
            unit_weight_kg: l.unit_weight_kg,
            package_count: l.package_count,
            total_weight_kg: total,
        })
        .collect()
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// Two stocks of 500 and 300 go to milling: total 800, both consumed
    #[test]
    fn test_start_batch_consumes_selection() {
        let mut stocks = vec![stock(1, "500"), stock(2, "300")];
        let ids: Vec<Uuid> = stocks.iter().map(|s| s.id).collect();

        let total = ensure_all_available(&ids, &stocks).unwrap();
        assert_eq!(total, dec("800"));

        let b = batch("800", false);
        for s in stocks.iter_mut() {
            s.consume(b.id).unwrap();
        }
        assert!(stocks
            .iter()
            .all(|s| s.status == StockStatus::Consumed && s.milling_batch_id == Some(b.id)));
    }

    #[test]
    fn test_blank_batch_labels_are_rejected() {
        let mut input = NewMillingBatch {
            milling_date: NaiveDate::from_ymd_opt(2024, 11, 1).unwrap(),
            title: "   ".to_string(),
            remarks: Some("  ".to_string()),
            milling_type: " 백미 ".to_string(),
            stock_ids: vec![Uuid::new_v4()],
        };
        let err = input.labels().unwrap_err();
        assert!(matches!(err, LedgerError::Validation { ref field, .. } if field == "title"));

        input.title = " 11월 도정 ".to_string();
        let labels = input.labels().unwrap();
        assert_eq!(labels.title, "11월 도정");
        assert_eq!(labels.milling_type, "백미");
        assert_eq!(labels.remarks, None);

        input.milling_type = "\t".to_string();
        assert!(input.labels().is_err());
    }

    /// 20kg x 30 = 600 out of 800 in: 75% once closed
    #[test]
    fn test_yield_after_close() {
        let open = batch("800", false);
        let lines = vec![line("20kg", "20", 30, Some("600"))];
        let outputs = outputs_for(&open, &lines);

        assert_eq!(milling_yield(&open, &outputs), None);

        let closed = MillingBatch {
            is_closed: true,
            ..open
        };
        assert_eq!(milling_yield(&closed, &outputs), Some(dec("75")));
        assert_eq!(milling_yield(&closed, &[]), None);
    }

    #[test]
    fn test_yield_is_rounded_and_needs_input() {
        assert_eq!(yield_percent(dec("200"), dec("300")), Some(dec("66.67")));
        assert_eq!(yield_percent(dec("200"), Decimal::ZERO), None);
        let closed = batch("0", true);
        assert_eq!(batch_yield(&closed, 1, dec("10")), None);
    }

    #[test]
    fn test_removal_blocked_once_packaged() {
        let b = batch("800", false);
        let err = b.ensure_input_removable(1).unwrap_err();
        assert!(matches!(err, LedgerError::Conflict(_)));
        assert!(b.ensure_input_removable(0).is_ok());
    }

    #[test]
    fn test_closed_batch_is_locked() {
        let b = batch("800", true);
        assert!(matches!(b.ensure_open(), Err(LedgerError::Locked(_))));
        assert!(matches!(b.ensure_deletable(), Err(LedgerError::Locked(_))));
        assert!(matches!(b.ensure_input_removable(0), Err(LedgerError::Locked(_))));
    }

    /// Removing the last stock after clearing packaging leaves a zero total
    #[test]
    fn test_remove_last_stock_recomputes_to_zero() {
        let b = batch("500", false);
        let mut a = stock(1, "500");
        a.consume(b.id).unwrap();

        b.ensure_input_removable(0).unwrap();
        ensure_member_of(&b, &a).unwrap();
        a.return_to_available();

        let remaining: Vec<&Stock> = Vec::new();
        assert_eq!(total_weight(remaining), Decimal::ZERO);
        assert_eq!(a.status, StockStatus::Available);
    }

    #[test]
    fn test_only_members_can_leave() {
        let b = batch("500", false);
        let mut other = stock(1, "500");
        other.consume(Uuid::new_v4()).unwrap();
        assert!(matches!(ensure_member_of(&b, &other), Err(LedgerError::InvalidState(_))));
    }

    #[test]
    fn test_packaging_validation() {
        assert!(validate_packaging(&[line("20kg", "20", 30, Some("600"))]).is_ok());
        assert!(validate_packaging(&[line("20kg", "20", 30, None)]).is_ok());
        assert!(validate_packaging(&[line("20kg", "20", 30, Some("500"))]).is_err());
        assert!(validate_packaging(&[line(" ", "20", 30, None)]).is_err());
        assert!(validate_packaging(&[line("20kg", "0", 30, None)]).is_err());
        assert!(validate_packaging(&[line("20kg", "20", -1, None)]).is_err());
        assert!(validate_packaging(&[]).unwrap().is_empty());
    }

    /// Unit weights are stored with two decimals, so anything finer would
    /// be rounded and break total = count × unit
    #[test]
    fn test_packaging_rejects_unstorable_weights() {
        let err = validate_packaging(&[line("소포장", "0.333", 3, None)]).unwrap_err();
        assert!(matches!(err, LedgerError::Validation { ref field, .. } if field == "unit_weight_kg"));
        assert!(validate_packaging(&[line("소포장", "0.330", 3, Some("0.99"))]).is_ok());

        let huge = PackagingLine {
            package_type: "대포장".to_string(),
            unit_weight_kg: Decimal::MAX,
            package_count: 100_000_000,
            total_weight_kg: None,
        };
        assert!(matches!(validate_packaging(&[huge]), Err(LedgerError::Validation { .. })));

        let err = validate_packaging(&[line("톤백", "99999999.99", i32::MAX, None)]).unwrap_err();
        assert!(matches!(err, LedgerError::Validation { ref field, .. } if field == "total_weight_kg"));
    }

    #[test]
    fn test_yield_out_of_range_is_unavailable() {
        assert_eq!(yield_percent(Decimal::MAX, dec("0.01")), None);
    }
}

// ============================================================================
// Property Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    fn line_strategy() -> impl Strategy<Value = PackagingLine> {
        (1i64..5000, 0i32..500, any::<bool>()).prop_map(|(unit_cents, count, with_total)| {
            let unit = Decimal::new(unit_cents, 2);
            PackagingLine {
                package_type: format!("{}kg", unit),
                unit_weight_kg: unit,
                package_count: count,
                total_weight_kg: with_total.then(|| unit * Decimal::from(count)),
            }
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Saving the same packaging twice yields the same rows
        #[test]
        fn prop_replace_all_is_idempotent(lines in prop::collection::vec(line_strategy(), 0..8)) {
            let b = batch("1000", false);
            let first: Vec<(String, Decimal)> = outputs_for(&b, &lines)
                .into_iter()
                .map(|o| (o.package_type, o.total_weight_kg))
                .collect();
            let second: Vec<(String, Decimal)> = outputs_for(&b, &lines)
                .into_iter()
                .map(|o| (o.package_type, o.total_weight_kg))
                .collect();
            prop_assert_eq!(first, second);
        }

        /// Batch total equals the sum of member weights after any removal
        #[test]
        fn prop_total_is_sum_of_members(
            weights in prop::collection::vec(0i64..100_000, 1..12),
            remove in 0usize..12
        ) {
            let b = batch("0", false);
            let mut members: Vec<Stock> = weights
                .iter()
                .enumerate()
                .map(|(i, cents)| {
                    let mut s = stock(i as i32 + 1, "0");
                    s.weight_kg = Decimal::new(*cents, 2);
                    s.consume(b.id).unwrap();
                    s
                })
                .collect();

            if remove < members.len() {
                let mut gone = members.remove(remove);
                gone.return_to_available();
            }
            let recomputed = total_weight(members.iter().filter(|s| s.milling_batch_id == Some(b.id)));
            let expected: Decimal = members.iter().map(|s| s.weight_kg).sum();
            prop_assert_eq!(recomputed, expected);
        }
    }
}
