//! Read access to producers, producer groups and varieties

use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use shared::{Producer, ProducerGroup, ProducerProfile, Variety};

use crate::error::{AppError, AppResult};

const PROFILE_SELECT: &str = r#"
    SELECT p.id, p.group_id, p.producer_no, p.name,
           pg.code AS group_code, pg.name AS group_name, pg.year AS group_year,
           pg.certification_type, pg.certification_number
    FROM producers p
    LEFT JOIN producer_groups pg ON pg.id = p.group_id
"#;

/// Database row for a producer joined with its group
#[derive(Debug, FromRow)]
struct ProfileRow {
    id: Uuid,
    group_id: Option<Uuid>,
    producer_no: i32,
    name: String,
    group_code: Option<String>,
    group_name: Option<String>,
    group_year: Option<i32>,
    certification_type: Option<String>,
    certification_number: Option<String>,
}

impl From<ProfileRow> for ProducerProfile {
    fn from(row: ProfileRow) -> Self {
        let group = match (row.group_id, row.group_code, row.group_year) {
            (Some(id), Some(code), Some(year)) => Some(ProducerGroup {
                id,
                code,
                name: row.group_name.unwrap_or_default(),
                year,
                certification_type: row.certification_type.unwrap_or_default(),
                certification_number: row.certification_number,
            }),
            _ => None,
        };
        ProducerProfile {
            producer: Producer {
                id: row.id,
                group_id: row.group_id,
                producer_no: row.producer_no,
                name: row.name,
            },
            group,
        }
    }
}

/// Database row for a variety
#[derive(Debug, FromRow)]
struct VarietyRow {
    id: Uuid,
    name: String,
    variety_type: String,
}

impl From<VarietyRow> for Variety {
    fn from(row: VarietyRow) -> Self {
        Variety {
            id: row.id,
            name: row.name,
            variety_type: row.variety_type,
        }
    }
}

pub(crate) async fn producer_profile(
    conn: &mut PgConnection,
    producer_id: Uuid,
) -> AppResult<ProducerProfile> {
    sqlx::query_as::<_, ProfileRow>(&format!("{} WHERE p.id = $1", PROFILE_SELECT))
        .bind(producer_id)
        .fetch_optional(&mut *conn)
        .await?
        .map(ProducerProfile::from)
        .ok_or_else(|| AppError::NotFound("Producer".to_string()))
}

/// Every producer registered under `name` (names are not unique)
pub(crate) async fn producers_named(
    conn: &mut PgConnection,
    name: &str,
) -> AppResult<Vec<ProducerProfile>> {
    let rows = sqlx::query_as::<_, ProfileRow>(&format!(
        "{} WHERE p.name = $1 ORDER BY pg.year DESC NULLS LAST, p.producer_no",
        PROFILE_SELECT
    ))
    .bind(name)
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows.into_iter().map(ProducerProfile::from).collect())
}

pub(crate) async fn variety(conn: &mut PgConnection, variety_id: Uuid) -> AppResult<Variety> {
    sqlx::query_as::<_, VarietyRow>("SELECT id, name, variety_type FROM varieties WHERE id = $1")
        .bind(variety_id)
        .fetch_optional(&mut *conn)
        .await?
        .map(Variety::from)
        .ok_or_else(|| AppError::NotFound("Variety".to_string()))
}

pub(crate) async fn variety_named(conn: &mut PgConnection, name: &str) -> AppResult<Option<Variety>> {
    Ok(
        sqlx::query_as::<_, VarietyRow>("SELECT id, name, variety_type FROM varieties WHERE name = $1")
            .bind(name)
            .fetch_optional(&mut *conn)
            .await?
            .map(Variety::from),
    )
}

/// Reference data service (read-only)
#[derive(Clone)]
pub struct ReferenceService {
    db: PgPool,
}

impl ReferenceService {
    /// Create a new ReferenceService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// All producers with their groups
    pub async fn list_producers(&self) -> AppResult<Vec<ProducerProfile>> {
        let rows = sqlx::query_as::<_, ProfileRow>(&format!(
            "{} ORDER BY p.name, p.producer_no",
            PROFILE_SELECT
        ))
        .fetch_all(&self.db)
        .await?;
        Ok(rows.into_iter().map(ProducerProfile::from).collect())
    }

    /// All varieties
    pub async fn list_varieties(&self) -> AppResult<Vec<Variety>> {
        let rows = sqlx::query_as::<_, VarietyRow>(
            "SELECT id, name, variety_type FROM varieties ORDER BY name",
        )
        .fetch_all(&self.db)
        .await?;
        Ok(rows.into_iter().map(Variety::from).collect())
    }
}
