//! Grouped aggregation over stock rows
//!
//! Groups are keyed by (production year, variety name, certification type).
//! Producers without a group are folded into the general bucket. Group
//! summaries are computed eagerly from a lightweight projection; members of
//! one group are resolved on demand.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{certification_or_general, is_general_certification, StockView};

/// Composite key of one stock group
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupKey {
    pub production_year: i32,
    pub variety_name: String,
    pub certification_type: String,
}

impl GroupKey {
    pub fn new(production_year: i32, variety_name: &str, certification_type: Option<&str>) -> Self {
        Self {
            production_year,
            variety_name: variety_name.to_string(),
            certification_type: certification_or_general(certification_type),
        }
    }

    pub fn is_general(&self) -> bool {
        is_general_certification(&self.certification_type)
    }

    pub fn of_row(row: &GroupingRow) -> Self {
        Self::new(row.production_year, &row.variety_name, row.certification_type.as_deref())
    }

    pub fn of_view(view: &StockView) -> Self {
        Self::new(
            view.stock.production_year,
            &view.variety_name,
            Some(view.certification_type.as_str()),
        )
    }

    pub fn contains(&self, view: &StockView) -> bool {
        GroupKey::of_view(view) == *self
    }
}

/// Group presentation order: year descending, certified before general,
/// then variety name and certification type ascending
pub fn compare_group_keys(a: &GroupKey, b: &GroupKey) -> Ordering {
    b.production_year
        .cmp(&a.production_year)
        .then_with(|| a.is_general().cmp(&b.is_general()))
        .then_with(|| a.variety_name.cmp(&b.variety_name))
        .then_with(|| a.certification_type.cmp(&b.certification_type))
}

/// Lightweight projection of a stock row used to compute groups
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupingRow {
    pub stock_id: Uuid,
    pub production_year: i32,
    pub variety_name: String,
    /// Certification type of the producer's group, `None` without a group
    pub certification_type: Option<String>,
    pub producer_id: Uuid,
    pub weight_kg: Decimal,
}

/// Summary of one group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockGroup {
    #[serde(flatten)]
    pub key: GroupKey,
    pub total_weight_kg: Decimal,
    pub item_count: i64,
    pub producer_count: i64,
}

#[derive(Default)]
struct GroupAccumulator {
    total_weight_kg: Decimal,
    item_count: i64,
    producers: HashSet<Uuid>,
}

/// Aggregate projection rows into sorted group summaries
pub fn aggregate_groups(rows: &[GroupingRow]) -> Vec<StockGroup> {
    let mut groups: HashMap<GroupKey, GroupAccumulator> = HashMap::new();
    for row in rows {
        let acc = groups.entry(GroupKey::of_row(row)).or_default();
        acc.total_weight_kg += row.weight_kg;
        acc.item_count += 1;
        acc.producers.insert(row.producer_id);
    }

    let mut summaries: Vec<StockGroup> = groups
        .into_iter()
        .map(|(key, acc)| StockGroup {
            key,
            total_weight_kg: acc.total_weight_kg,
            item_count: acc.item_count,
            producer_count: acc.producers.len() as i64,
        })
        .collect();
    summaries.sort_by(|a, b| compare_group_keys(&a.key, &b.key));
    summaries
}

/// Fixed drill-down order: producer name, then bag number
pub fn order_group_members(members: &mut [StockView]) {
    members.sort_by(|a, b| {
        a.producer_name
            .cmp(&b.producer_name)
            .then_with(|| a.stock.bag_no.cmp(&b.stock.bag_no))
            .then_with(|| a.stock.id.cmp(&b.stock.id))
    });
}

/// Members of one group among already-filtered rows, in drill-down order
pub fn members_of(key: &GroupKey, rows: &[StockView]) -> Vec<StockView> {
    let mut members: Vec<StockView> = rows.iter().filter(|r| key.contains(r)).cloned().collect();
    order_group_members(&mut members);
    members
}

/// Totals across all groups, for the overview footer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupTotals {
    pub group_count: usize,
    pub item_count: i64,
    pub total_weight_kg: Decimal,
}

impl GroupTotals {
    pub fn of(groups: &[StockGroup]) -> Self {
        Self {
            group_count: groups.len(),
            item_count: groups.iter().map(|g| g.item_count).sum(),
            total_weight_kg: groups.iter().map(|g| g.total_weight_kg).sum(),
        }
    }
}

/// Group summaries with their footer totals
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupOverview {
    pub groups: Vec<StockGroup>,
    pub totals: GroupTotals,
}

impl GroupOverview {
    pub fn from_rows(rows: &[GroupingRow]) -> Self {
        let groups = aggregate_groups(rows);
        let totals = GroupTotals::of(&groups);
        Self { groups, totals }
    }
}
