//! Grouped stock overview and on-demand group member lookup

use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use shared::{order_group_members, GroupKey, GroupOverview, GroupingRow, StockFilter, StockView};

use crate::error::AppResult;
use crate::services::stock::{
    cert_expr, into_views, push_stock_filters, stock_view_select, StockViewRow, STOCK_VIEW_FROM,
};

/// Projection row used to build group summaries
#[derive(Debug, FromRow)]
struct ProjectionRow {
    stock_id: Uuid,
    production_year: i32,
    variety_name: String,
    certification_type: Option<String>,
    producer_id: Uuid,
    weight_kg: Decimal,
}

impl From<ProjectionRow> for GroupingRow {
    fn from(row: ProjectionRow) -> Self {
        GroupingRow {
            stock_id: row.stock_id,
            production_year: row.production_year,
            variety_name: row.variety_name,
            certification_type: row.certification_type,
            producer_id: row.producer_id,
            weight_kg: row.weight_kg,
        }
    }
}

/// Restrict a filtered stock query to one group
fn push_group_key(qb: &mut QueryBuilder<'_, Postgres>, key: &GroupKey) {
    qb.push(" AND s.production_year = ").push_bind(key.production_year);
    qb.push(" AND v.name = ").push_bind(key.variety_name.clone());
    qb.push(format!(" AND {} = ", cert_expr()))
        .push_bind(key.certification_type.clone());
}

/// Grouping service
#[derive(Clone)]
pub struct GroupingService {
    db: PgPool,
}

impl GroupingService {
    /// Create a new GroupingService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Summaries of every group among the filtered stock
    pub async fn compute_groups(&self, filter: &StockFilter) -> AppResult<GroupOverview> {
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT s.id AS stock_id, s.production_year, v.name AS variety_name, \
             {} AS certification_type, s.producer_id, s.weight_kg{}",
            cert_expr(),
            STOCK_VIEW_FROM
        ));
        push_stock_filters(&mut qb, filter);

        let rows: Vec<GroupingRow> = qb
            .build_query_as::<ProjectionRow>()
            .fetch_all(&self.db)
            .await?
            .into_iter()
            .map(GroupingRow::from)
            .collect();

        let overview = GroupOverview::from_rows(&rows);
        tracing::debug!(
            rows = rows.len(),
            groups = overview.totals.group_count,
            "stock groups computed"
        );
        Ok(overview)
    }

    /// Members of one group under the same filters used for the summary
    pub async fn resolve_members(
        &self,
        key: &GroupKey,
        filter: &StockFilter,
    ) -> AppResult<Vec<StockView>> {
        let mut qb = QueryBuilder::<Postgres>::new(stock_view_select());
        push_stock_filters(&mut qb, filter);
        push_group_key(&mut qb, key);

        let rows = qb.build_query_as::<StockViewRow>().fetch_all(&self.db).await?;
        let mut members = into_views(rows)?;
        order_group_members(&mut members);
        Ok(members)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_key_binds_follow_filters() {
        let filter = StockFilter {
            year: Some(2024),
            ..Default::default()
        };
        let key = GroupKey::new(2024, "신동진", None);

        let mut qb = QueryBuilder::<Postgres>::new("SELECT 1");
        push_stock_filters(&mut qb, &filter);
        push_group_key(&mut qb, &key);

        let sql = qb.sql();
        assert!(sql.contains("s.production_year = $1"));
        assert!(sql.contains("s.production_year = $2"));
        assert!(sql.contains("v.name = $3"));
        assert!(sql.ends_with(&format!("{} = $4", cert_expr())));
    }

    mod with_database {
        use super::*;
        use std::collections::HashSet;

        use crate::services::test_fixtures::*;
        use crate::services::StockService;
        use shared::NewStock;

        /// Groups whose certification type carries stray whitespace still
        /// resolve to exactly the members counted in their summary
        #[sqlx::test]
        async fn members_of_every_group_cover_the_filtered_stock(pool: PgPool) {
            let tab = insert_group(&pool, "T1", 2024, "유기농\t").await;
            let ideographic = insert_group(&pool, "I1", 2024, "\u{3000}유기농\u{3000}").await;
            let pesticide_free = insert_group(&pool, "N1", 2024, "무농약").await;
            let general = insert_group(&pool, "G1", 2024, "일반").await;
            let shindongjin = insert_variety(&pool, "신동진").await;
            let chucheong = insert_variety(&pool, "추청").await;
            let producers = [
                insert_producer(&pool, Some(tab), 1, "김철수").await,
                insert_producer(&pool, Some(ideographic), 2, "이영희").await,
                insert_producer(&pool, Some(pesticide_free), 3, "박민수").await,
                insert_producer(&pool, Some(general), 4, "최지은").await,
                insert_producer(&pool, None, 5, "정하늘").await,
            ];

            let stocks = StockService::new(pool.clone(), limits());
            let mut all = HashSet::new();
            for (i, producer_id) in producers.iter().enumerate() {
                for (bag_no, variety_id) in [(1, shindongjin), (2, chucheong)] {
                    let view = stocks
                        .create(NewStock {
                            production_year: 2024,
                            producer_id: *producer_id,
                            variety_id,
                            bag_no,
                            weight_kg: kg(&format!("{}00", i + 1)),
                            incoming_date: day(2024, 10, 1),
                        })
                        .await
                        .unwrap();
                    all.insert(view.stock.id);
                }
            }

            let service = GroupingService::new(pool.clone());
            let filter = StockFilter::default();
            let overview = service.compute_groups(&filter).await.unwrap();

            // 유기농, 무농약 and 일반, each for two varieties
            assert_eq!(overview.groups.len(), 6);
            assert_eq!(overview.totals.item_count, 10);

            let mut union = HashSet::new();
            for group in &overview.groups {
                let members = service.resolve_members(&group.key, &filter).await.unwrap();
                assert_eq!(members.len() as i64, group.item_count, "{:?}", group.key);
                for member in &members {
                    assert!(group.key.contains(member));
                    assert!(union.insert(member.stock.id));
                }
                let again = service.resolve_members(&group.key, &filter).await.unwrap();
                assert_eq!(again, members);
            }
            assert_eq!(union, all);

            let organic = overview
                .groups
                .iter()
                .find(|g| g.key.certification_type == "유기농" && g.key.variety_name == "신동진")
                .unwrap();
            assert_eq!(organic.item_count, 2);
            assert_eq!(organic.producer_count, 2);
        }
    }
}
