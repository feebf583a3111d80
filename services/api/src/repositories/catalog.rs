//! Categories, catalog services and content pages

use common::{error::DatabaseResult, response::Pagination};
use serde::Serialize;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::info;

use super::{push_catalog_joins, push_search};
use crate::models::catalog::{AdminService, Category, ContentPage, Service, ServiceScope};

const SERVICE_SELECT: &str = r#"
    SELECT s.id, s.category_id,
           COALESCE(sct.translated_name, sc.category_name) AS category_name,
           COALESCE(st.translated_name, s.service_name) AS service_name,
           COALESCE(st.translated_description, s.description) AS description,
           s.service_image, s.base_price, s.duration_minutes, s.is_active,
           s.is_popular, s.is_featured, s.total_bookings, s.average_rating, s.created_at
"#;

const SEARCH_COLUMNS: [&str; 4] = [
    "s.service_name",
    "s.description",
    "st.translated_name",
    "st.translated_description",
];

/// Which catalog services a listing covers
#[derive(Debug, Clone, Default)]
pub struct ServiceFilter {
    pub lang: String,
    pub category_id: Option<i64>,
    /// `%term%` pattern
    pub search: Option<String>,
    pub active: Option<bool>,
}

impl ServiceFilter {
    /// `WHERE` clause shared by the page and its count
    fn push_conditions(&self, builder: &mut QueryBuilder<'_, Postgres>) {
        builder.push(" WHERE TRUE");
        if let Some(active) = self.active {
            builder.push(" AND s.is_active = ").push_bind(active);
        }
        if let Some(category_id) = self.category_id {
            builder.push(" AND s.category_id = ").push_bind(category_id);
        }
        if let Some(pattern) = &self.search {
            push_search(builder, &SEARCH_COLUMNS, pattern);
        }
    }
}

/// What deactivating a catalog service touched
#[derive(Debug, Clone, Serialize)]
pub struct DeactivatedService {
    pub service_id: i64,
    pub service_name: String,
    pub was_active: bool,
}

/// Catalog repository
#[derive(Clone)]
pub struct CatalogRepository {
    pool: PgPool,
}

impl CatalogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Active categories with their active service counts
    pub async fn categories(&self, lang: &str) -> DatabaseResult<Vec<Category>> {
        let categories = sqlx::query_as(
            r#"
            SELECT c.id,
                   COALESCE(ct.translated_name, c.category_name) AS category_name,
                   COALESCE(ct.translated_description, c.description) AS description,
                   c.icon, c.display_order,
                   COUNT(s.id) AS service_count
            FROM service_categories c
            LEFT JOIN service_category_translations ct
                   ON ct.category_id = c.id AND ct.language_code = $1
            LEFT JOIN services s ON s.category_id = c.id AND s.is_active
            WHERE c.is_active
            GROUP BY c.id, ct.translated_name, ct.translated_description
            ORDER BY c.display_order, c.id
            "#,
        )
        .bind(lang)
        .fetch_all(&self.pool)
        .await?;
        Ok(categories)
    }

    /// A page of services, featured and popular first
    pub async fn services(
        &self,
        filter: &ServiceFilter,
        page: Pagination,
    ) -> DatabaseResult<(Vec<Service>, i64)> {
        let mut builder = QueryBuilder::<Postgres>::new(SERVICE_SELECT);
        builder.push(" FROM services s");
        push_catalog_joins(&mut builder, &filter.lang);
        filter.push_conditions(&mut builder);
        builder
            .push(" ORDER BY s.is_featured DESC, s.is_popular DESC, service_name LIMIT ")
            .push_bind(page.limit)
            .push(" OFFSET ")
            .push_bind(page.offset());
        let services = builder
            .build_query_as::<Service>()
            .fetch_all(&self.pool)
            .await?;

        let total = self.count_services(filter, None).await?;
        Ok((services, total))
    }

    async fn count_services(
        &self,
        filter: &ServiceFilter,
        offered: Option<Option<bool>>,
    ) -> DatabaseResult<i64> {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM services s");
        push_catalog_joins(&mut builder, &filter.lang);
        filter.push_conditions(&mut builder);
        if let Some(offer_active) = offered {
            push_offered(&mut builder, offer_active);
        }
        let total = builder
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;
        Ok(total)
    }

    /// Active services flagged popular
    pub async fn popular_services(
        &self,
        lang: &str,
        category_id: Option<i64>,
        limit: i64,
    ) -> DatabaseResult<Vec<Service>> {
        let mut builder = QueryBuilder::<Postgres>::new(SERVICE_SELECT);
        builder.push(" FROM services s");
        push_catalog_joins(&mut builder, lang);
        builder.push(" WHERE s.is_active AND s.is_popular");
        if let Some(category_id) = category_id {
            builder.push(" AND s.category_id = ").push_bind(category_id);
        }
        builder
            .push(" ORDER BY s.total_bookings DESC, s.average_rating DESC, service_name LIMIT ")
            .push_bind(limit);
        let services = builder
            .build_query_as::<Service>()
            .fetch_all(&self.pool)
            .await?;
        Ok(services)
    }

    /// An active service
    pub async fn service(&self, id: i64, lang: &str) -> DatabaseResult<Option<Service>> {
        let mut builder = QueryBuilder::<Postgres>::new(SERVICE_SELECT);
        builder.push(" FROM services s");
        push_catalog_joins(&mut builder, lang);
        builder.push(" WHERE s.is_active AND s.id = ").push_bind(id);
        let service = builder
            .build_query_as::<Service>()
            .fetch_optional(&self.pool)
            .await?;
        Ok(service)
    }

    pub async fn is_active_service(&self, id: i64) -> DatabaseResult<bool> {
        let exists =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM services WHERE id = $1 AND is_active)")
                .bind(id)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    /// Catalog listing for administrators, optionally limited to offered services
    ///
    /// With [`ServiceScope::Offered`], `offer_active` narrows which offerings
    /// count and the price range is taken over those.
    pub async fn admin_services(
        &self,
        filter: &ServiceFilter,
        scope: ServiceScope,
        offer_active: Option<bool>,
        page: Pagination,
    ) -> DatabaseResult<(Vec<AdminService>, i64)> {
        let mut builder = QueryBuilder::<Postgres>::new(SERVICE_SELECT);
        match scope {
            ServiceScope::Catalog => {
                builder.push(
                    ", NULL::BIGINT AS providers_offering, \
                     NULL::DOUBLE PRECISION AS min_price, \
                     NULL::DOUBLE PRECISION AS max_price \
                     FROM services s",
                );
            }
            ServiceScope::Offered => {
                builder.push(
                    ", o.providers_offering, o.min_price, o.max_price FROM services s \
                     JOIN (SELECT ps.service_id, COUNT(DISTINCT ps.provider_id) AS providers_offering, \
                     MIN(ps.price) AS min_price, MAX(ps.price) AS max_price \
                     FROM provider_services ps",
                );
                if let Some(active) = offer_active {
                    builder.push(" WHERE ps.is_active = ").push_bind(active);
                }
                builder.push(" GROUP BY ps.service_id) o ON o.service_id = s.id");
            }
        }
        push_catalog_joins(&mut builder, &filter.lang);
        filter.push_conditions(&mut builder);
        builder
            .push(" ORDER BY s.category_id, service_name LIMIT ")
            .push_bind(page.limit)
            .push(" OFFSET ")
            .push_bind(page.offset());
        let services = builder
            .build_query_as::<AdminService>()
            .fetch_all(&self.pool)
            .await?;

        let offered = (scope == ServiceScope::Offered).then_some(offer_active);
        let total = self.count_services(filter, offered).await?;
        Ok((services, total))
    }

    /// Take a service and all its offerings off the market
    pub async fn deactivate_service(&self, id: i64) -> DatabaseResult<Option<DeactivatedService>> {
        let mut tx = self.pool.begin().await?;

        let existing: Option<(String, bool)> =
            sqlx::query_as("SELECT service_name, is_active FROM services WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        let Some((service_name, was_active)) = existing else {
            return Ok(None);
        };

        sqlx::query(
            "UPDATE services SET is_active = FALSE, is_popular = FALSE, is_featured = FALSE WHERE id = $1",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        let offerings = sqlx::query(
            "UPDATE provider_services SET is_active = FALSE, updated_at = NOW() WHERE service_id = $1",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(
            "Deactivated service {} and {} offerings",
            id,
            offerings.rows_affected()
        );
        Ok(Some(DeactivatedService {
            service_id: id,
            service_name,
            was_active,
        }))
    }

    /// A published page, translated when a translation exists
    pub async fn content_page(&self, slug: &str, lang: &str) -> DatabaseResult<Option<ContentPage>> {
        let page = sqlx::query_as(
            r#"
            SELECT p.slug,
                   COALESCE(t.translated_title, p.title) AS title,
                   COALESCE(t.translated_content, p.content) AS content,
                   CASE WHEN t.page_id IS NULL THEN 'en' ELSE $2 END AS language,
                   p.updated_at
            FROM content_pages p
            LEFT JOIN content_page_translations t
                   ON t.page_id = p.id AND t.language_code = $2
            WHERE p.slug = $1 AND p.is_published
            "#,
        )
        .bind(slug)
        .bind(lang)
        .fetch_optional(&self.pool)
        .await?;
        Ok(page)
    }
}

/// Keep services with at least one offering, optionally of a given state
fn push_offered(builder: &mut QueryBuilder<'_, Postgres>, offer_active: Option<bool>) {
    builder.push(" AND EXISTS (SELECT 1 FROM provider_services ps WHERE ps.service_id = s.id");
    if let Some(active) = offer_active {
        builder.push(" AND ps.is_active = ").push_bind(active);
    }
    builder.push(")");
}
