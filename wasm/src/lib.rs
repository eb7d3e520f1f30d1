//! WebAssembly module for the Rice Inventory Management System
//!
//! Provides client-side computation for:
//! - Lot code previews while registering stock
//! - Milling yield and packaging totals
//! - Group summaries over rows already loaded in the browser

use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use wasm_bindgen::prelude::*;

use shared::{
    generate_lot_code, validate_packaging, yield_percent, GroupOverview, GroupingRow,
    PackagingLine,
};

fn to_js(message: String) -> JsValue {
    JsValue::from_str(&message)
}

fn lot_code_preview(
    harvest_date: &str,
    variety_type: &str,
    variety_name: &str,
    milling_type: &str,
    certification_number: &str,
    group_code: &str,
    producer_no: i32,
) -> Result<String, String> {
    let date = NaiveDate::parse_from_str(harvest_date, "%Y-%m-%d")
        .map_err(|e| format!("Invalid harvest date '{}': {}", harvest_date, e))?;
    generate_lot_code(
        date,
        variety_type,
        variety_name,
        milling_type,
        certification_number,
        group_code,
        producer_no,
    )
    .map_err(|e| e.to_string())
}

fn packaging_total(lines_json: &str) -> Result<Decimal, String> {
    let lines: Vec<PackagingLine> = serde_json::from_str(lines_json)
        .map_err(|e| format!("Invalid packaging JSON: {}", e))?;
    let validated = validate_packaging(&lines).map_err(|e| e.to_string())?;
    Ok(validated.iter().map(|(_, total)| *total).sum())
}

fn group_summary(rows_json: &str) -> Result<GroupOverview, String> {
    let rows: Vec<GroupingRow> =
        serde_json::from_str(rows_json).map_err(|e| format!("Invalid rows JSON: {}", e))?;
    Ok(GroupOverview::from_rows(&rows))
}

/// Preview the lot code a stock would get (date as `YYYY-MM-DD`)
#[wasm_bindgen]
pub fn preview_lot_code(
    harvest_date: &str,
    variety_type: &str,
    variety_name: &str,
    milling_type: &str,
    certification_number: &str,
    group_code: &str,
    producer_no: i32,
) -> Result<String, JsValue> {
    lot_code_preview(
        harvest_date,
        variety_type,
        variety_name,
        milling_type,
        certification_number,
        group_code,
        producer_no,
    )
    .map_err(to_js)
}

/// Milling yield in percent, or `undefined` without input weight
#[wasm_bindgen]
pub fn calculate_milling_yield(total_output_kg: f64, total_input_kg: f64) -> Option<f64> {
    let output = Decimal::try_from(total_output_kg).ok()?;
    let input = Decimal::try_from(total_input_kg).ok()?;
    yield_percent(output, input)?.to_f64()
}

/// Total weight of a packaging set given as a JSON array of lines
#[wasm_bindgen]
pub fn package_total(lines_json: &str) -> Result<String, JsValue> {
    packaging_total(lines_json)
        .map(|total| total.to_string())
        .map_err(to_js)
}

/// Group summaries (JSON) for a JSON array of grouping rows
#[wasm_bindgen]
pub fn summarize_groups(rows_json: &str) -> Result<String, JsValue> {
    let overview = group_summary(rows_json).map_err(to_js)?;
    serde_json::to_string(&overview).map_err(|e| to_js(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lot_code_preview() {
        let code = lot_code_preview("2024-09-15", "메벼", "신동진", "벼", "12-34567", "JB01", 7)
            .unwrap();
        assert_eq!(code, "240915-12-1234567-JB010007");
        assert!(lot_code_preview("15/09/2024", "메벼", "신동진", "벼", "", "JB01", 7).is_err());
        assert!(lot_code_preview("2024-09-15", "메벼", "신동진", "벼", "", "JB01", 10000).is_err());
    }

    #[test]
    fn test_milling_yield() {
        assert_eq!(calculate_milling_yield(600.0, 800.0), Some(75.0));
        assert_eq!(calculate_milling_yield(600.0, 0.0), None);
        assert_eq!(calculate_milling_yield(1e27, 0.01), None);
    }

    #[test]
    fn test_packaging_total() {
        let json = r#"[
            {"package_type": "20kg", "unit_weight_kg": "20", "package_count": 30, "total_weight_kg": "600"},
            {"package_type": "10kg", "unit_weight_kg": "10", "package_count": 5, "total_weight_kg": null}
        ]"#;
        assert_eq!(packaging_total(json).unwrap(), Decimal::from(650));

        let mismatch = r#"[{"package_type": "20kg", "unit_weight_kg": "20", "package_count": 30, "total_weight_kg": "500"}]"#;
        assert!(packaging_total(mismatch).is_err());

        let overflow = r#"[{"package_type": "big", "unit_weight_kg": "79228162514264337593543950335", "package_count": 100000000, "total_weight_kg": null}]"#;
        assert!(packaging_total(overflow).is_err());
    }

    #[test]
    fn test_group_summary() {
        let json = r#"[
            {"stock_id": "6f1c1f4e-0000-4000-8000-000000000001", "production_year": 2024,
             "variety_name": "신동진", "certification_type": null,
             "producer_id": "6f1c1f4e-0000-4000-8000-0000000000a1", "weight_kg": "500"},
            {"stock_id": "6f1c1f4e-0000-4000-8000-000000000002", "production_year": 2024,
             "variety_name": "신동진", "certification_type": "일반",
             "producer_id": "6f1c1f4e-0000-4000-8000-0000000000a2", "weight_kg": "300"}
        ]"#;
        let overview = group_summary(json).unwrap();
        assert_eq!(overview.groups.len(), 1);
        assert_eq!(overview.groups[0].producer_count, 2);
        assert_eq!(overview.totals.total_weight_kg, Decimal::from(800));
    }
}
