//! The catalogue of services a clinic offers.

use super::shared::{conflict_on_reference, like_pattern, now_timestamp, Page, PageRequest};
use crate::validation::{optional_money, optional_text, required_text};
use crate::{ClinicError, ClinicResult};
use api_shared::{Service, ServiceReq};
use clinica_types::{Money, NonEmptyText};
use sqlx::SqlitePool;

const SERVICE_COLUMNS: &str = "id, name, description, category, duration_minutes, price_cents, \
     preparation_instructions, aftercare_instructions, is_active, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct ServiceRow {
    id: i64,
    name: String,
    description: Option<String>,
    category: Option<String>,
    duration_minutes: i64,
    price_cents: i64,
    preparation_instructions: Option<String>,
    aftercare_instructions: Option<String>,
    is_active: bool,
    created_at: String,
    updated_at: Option<String>,
}

impl From<ServiceRow> for Service {
    fn from(row: ServiceRow) -> Self {
        Service {
            id: row.id,
            name: row.name,
            description: row.description,
            category: row.category,
            duration_minutes: row.duration_minutes,
            price: Money::from_cents(row.price_cents).as_decimal(),
            preparation_instructions: row.preparation_instructions,
            aftercare_instructions: row.aftercare_instructions,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServiceInput {
    pub name: NonEmptyText,
    pub description: Option<String>,
    pub category: Option<String>,
    pub duration_minutes: i64,
    pub price: Money,
    pub preparation_instructions: Option<String>,
    pub aftercare_instructions: Option<String>,
    pub is_active: bool,
}

impl ServiceInput {
    pub fn from_request(req: &ServiceReq) -> ClinicResult<Self> {
        let name = required_text("name", req.name.as_deref())?;

        let duration_minutes = req
            .duration_minutes
            .ok_or_else(|| ClinicError::validation("Field duration_minutes is required"))?;
        if duration_minutes <= 0 {
            return Err(ClinicError::validation(
                "Field duration_minutes must be greater than zero",
            ));
        }

        let price = optional_money("price", req.price)?
            .ok_or_else(|| ClinicError::validation("Field price is required"))?;

        Ok(Self {
            name,
            description: optional_text(req.description.as_deref()),
            category: optional_text(req.category.as_deref()),
            duration_minutes,
            price,
            preparation_instructions: optional_text(req.preparation_instructions.as_deref()),
            aftercare_instructions: optional_text(req.aftercare_instructions.as_deref()),
            is_active: req.is_active.unwrap_or(true),
        })
    }
}

fn not_found() -> ClinicError {
    ClinicError::not_found("Service not found")
}

#[derive(Clone)]
pub struct ServiceCatalog {
    pool: SqlitePool,
}

impl ServiceCatalog {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, input: &ServiceInput) -> ClinicResult<Service> {
        let sql = format!(
            "INSERT INTO services (name, description, category, duration_minutes, price_cents, \
             preparation_instructions, aftercare_instructions, is_active, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?) RETURNING {SERVICE_COLUMNS}"
        );
        let row: ServiceRow = sqlx::query_as(&sql)
            .bind(input.name.as_str())
            .bind(input.description.as_deref())
            .bind(input.category.as_deref())
            .bind(input.duration_minutes)
            .bind(input.price.cents())
            .bind(input.preparation_instructions.as_deref())
            .bind(input.aftercare_instructions.as_deref())
            .bind(input.is_active)
            .bind(now_timestamp())
            .fetch_one(&self.pool)
            .await?;

        tracing::info!(service_id = row.id, "service created");
        Ok(row.into())
    }

    pub async fn get(&self, id: i64) -> ClinicResult<Service> {
        let sql = format!("SELECT {SERVICE_COLUMNS} FROM services WHERE id = ?");
        sqlx::query_as::<_, ServiceRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Service::from)
            .ok_or_else(not_found)
    }

    /// Lists services by name, optionally filtered on a name fragment.
    pub async fn list(
        &self,
        search: Option<&str>,
        page: PageRequest,
    ) -> ClinicResult<Page<Service>> {
        const FILTER: &str = r"(?1 IS NULL OR name LIKE ?1 ESCAPE '\')";

        let pattern = like_pattern(search);

        let count = format!("SELECT COUNT(*) FROM services WHERE {FILTER}");
        let total: i64 = sqlx::query_scalar(&count)
            .bind(pattern.as_deref())
            .fetch_one(&self.pool)
            .await?;

        let sql = format!(
            "SELECT {SERVICE_COLUMNS} FROM services WHERE {FILTER} \
             ORDER BY name COLLATE NOCASE, id LIMIT ?2 OFFSET ?3"
        );
        let rows: Vec<ServiceRow> = sqlx::query_as(&sql)
            .bind(pattern.as_deref())
            .bind(page.per_page())
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;

        Ok(Page::new(rows.into_iter().map(Service::from).collect(), total, page))
    }

    pub async fn update(&self, id: i64, input: &ServiceInput) -> ClinicResult<Service> {
        let sql = format!(
            "UPDATE services SET name = ?, description = ?, category = ?, duration_minutes = ?, \
             price_cents = ?, preparation_instructions = ?, aftercare_instructions = ?, \
             is_active = ?, updated_at = ? WHERE id = ? RETURNING {SERVICE_COLUMNS}"
        );
        let row: Option<ServiceRow> = sqlx::query_as(&sql)
            .bind(input.name.as_str())
            .bind(input.description.as_deref())
            .bind(input.category.as_deref())
            .bind(input.duration_minutes)
            .bind(input.price.cents())
            .bind(input.preparation_instructions.as_deref())
            .bind(input.aftercare_instructions.as_deref())
            .bind(input.is_active)
            .bind(now_timestamp())
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        let row = row.ok_or_else(not_found)?;
        tracing::info!(service_id = id, "service updated");
        Ok(row.into())
    }

    /// Deletes a service. Services used by an appointment cannot be deleted.
    pub async fn delete(&self, id: i64) -> ClinicResult<()> {
        let result = sqlx::query("DELETE FROM services WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                conflict_on_reference(e, "Service is used by appointments and cannot be deleted")
            })?;

        if result.rows_affected() == 0 {
            return Err(not_found());
        }
        tracing::info!(service_id = id, "service deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connect_in_memory;

    fn request(name: &str, price: f64) -> ServiceReq {
        ServiceReq {
            name: Some(name.into()),
            duration_minutes: Some(50),
            price: Some(price),
            ..Default::default()
        }
    }

    #[test]
    fn input_requires_positive_duration_and_price() {
        let mut req = request("Music therapy", 150.0);
        req.duration_minutes = Some(0);
        assert_eq!(
            ServiceInput::from_request(&req).unwrap_err().to_string(),
            "Field duration_minutes must be greater than zero"
        );

        let mut req = request("Music therapy", 150.0);
        req.price = None;
        assert_eq!(
            ServiceInput::from_request(&req).unwrap_err().to_string(),
            "Field price is required"
        );

        assert!(ServiceInput::from_request(&request("Music therapy", -1.0)).is_err());
        let free = ServiceInput::from_request(&request("Screening", 0.0)).unwrap();
        assert_eq!(free.price, Money::ZERO);
        assert!(free.is_active);
    }

    #[tokio::test]
    async fn create_get_update_delete() {
        let catalog = ServiceCatalog::new(connect_in_memory().await.unwrap());
        let created = catalog
            .create(&ServiceInput::from_request(&request("Music therapy", 150.5)).unwrap())
            .await
            .unwrap();
        assert_eq!(created.price, 150.5);
        assert_eq!(catalog.get(created.id).await.unwrap(), created);

        let mut req = request("Group session", 80.0);
        req.is_active = Some(false);
        let updated = catalog
            .update(created.id, &ServiceInput::from_request(&req).unwrap())
            .await
            .unwrap();
        assert_eq!(updated.name, "Group session");
        assert!(!updated.is_active);

        catalog.delete(created.id).await.unwrap();
        assert!(matches!(catalog.get(created.id).await, Err(ClinicError::NotFound(_))));
    }

    #[tokio::test]
    async fn list_orders_by_name() {
        let catalog = ServiceCatalog::new(connect_in_memory().await.unwrap());
        for name in ["Voice lessons", "assessment", "Music therapy"] {
            catalog
                .create(&ServiceInput::from_request(&request(name, 10.0)).unwrap())
                .await
                .unwrap();
        }
        let page = catalog.list(None, PageRequest::default()).await.unwrap();
        let names: Vec<&str> = page.items.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["assessment", "Music therapy", "Voice lessons"]);

        let page = catalog.list(Some("music"), PageRequest::default()).await.unwrap();
        assert_eq!(page.total, 1);
    }
}
