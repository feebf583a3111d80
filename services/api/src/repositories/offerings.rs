//! Provider offerings and their images

use std::collections::HashMap;

use common::{error::DatabaseResult, response::Pagination};
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};
use tracing::info;

use super::{push_catalog_joins, push_search};
use crate::models::catalog::{NewImage, NewOffering, Offer, OfferImage, Offering, OfferingUpdate};

const OFFER_SELECT: &str = r#"
    SELECT ps.id AS provider_service_id, ps.provider_id, ps.service_id,
           ps.price AS base_price, ps.price_type, ps.total_bookings, ps.created_at,
           COALESCE(ps.description, st.translated_description, s.description) AS description,
           COALESCE(st.translated_name, s.service_name) AS service_name,
           s.duration_minutes, s.category_id,
           COALESCE(sct.translated_name, sc.category_name) AS category_name,
           s.service_image,
           (SELECT psi.image_url FROM provider_service_images psi
             WHERE psi.provider_service_id = ps.id
             ORDER BY psi.sort_order, psi.id LIMIT 1) AS primary_image,
           a.first_name, a.last_name, pp.business_name,
           a.profile_picture AS provider_avatar, a.city AS provider_city,
           pp.provider_type, pp.verification_status, pp.availability_status,
           pp.average_rating, pp.total_reviews
    FROM provider_services ps
    JOIN services s ON s.id = ps.service_id
    JOIN accounts a ON a.id = ps.provider_id AND a.role = 'provider'
    LEFT JOIN provider_profiles pp ON pp.account_id = a.id
"#;

const OFFER_SEARCH_COLUMNS: [&str; 5] = [
    "s.service_name",
    "st.translated_name",
    "a.first_name",
    "a.last_name",
    "pp.business_name",
];

const OFFERING_SELECT: &str = r#"
    SELECT ps.id, ps.service_id, s.service_name, s.description AS service_description,
           ps.price, ps.price_type, ps.description, ps.is_active, ps.total_bookings,
           ps.created_at, ps.updated_at
    FROM provider_services ps
    JOIN services s ON s.id = ps.service_id
"#;

/// Which public offerings a listing covers
#[derive(Debug, Clone, Default)]
pub struct OfferFilter {
    pub lang: String,
    pub provider_service_id: Option<i64>,
    pub category_id: Option<i64>,
    /// `%term%` pattern
    pub search: Option<String>,
}

impl OfferFilter {
    fn push_conditions(&self, builder: &mut QueryBuilder<'_, Postgres>) {
        builder.push(" WHERE ps.is_active AND s.is_active AND a.account_status = 'active'");
        if let Some(id) = self.provider_service_id {
            builder.push(" AND ps.id = ").push_bind(id);
        }
        if let Some(category_id) = self.category_id {
            builder.push(" AND s.category_id = ").push_bind(category_id);
        }
        if let Some(pattern) = &self.search {
            push_search(builder, &OFFER_SEARCH_COLUMNS, pattern);
        }
    }
}

/// Offering repository
#[derive(Clone)]
pub struct OfferingRepository {
    pool: PgPool,
}

impl OfferingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Bookable offerings, best rated first
    pub async fn offers(
        &self,
        filter: &OfferFilter,
        page: Pagination,
    ) -> DatabaseResult<(Vec<Offer>, i64)> {
        let mut builder = QueryBuilder::<Postgres>::new(OFFER_SELECT);
        push_catalog_joins(&mut builder, &filter.lang);
        filter.push_conditions(&mut builder);
        builder
            .push(" ORDER BY pp.average_rating DESC NULLS LAST, ps.created_at DESC LIMIT ")
            .push_bind(page.limit)
            .push(" OFFSET ")
            .push_bind(page.offset());
        let offers = builder
            .build_query_as::<Offer>()
            .fetch_all(&self.pool)
            .await?;

        let mut count = QueryBuilder::<Postgres>::new(
            "SELECT COUNT(*) FROM provider_services ps \
             JOIN services s ON s.id = ps.service_id \
             JOIN accounts a ON a.id = ps.provider_id AND a.role = 'provider' \
             LEFT JOIN provider_profiles pp ON pp.account_id = a.id",
        );
        push_catalog_joins(&mut count, &filter.lang);
        filter.push_conditions(&mut count);
        let total = count
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        Ok((offers, total))
    }

    /// Most booked offerings
    pub async fn popular_offers(
        &self,
        lang: &str,
        category_id: Option<i64>,
        limit: i64,
    ) -> DatabaseResult<Vec<Offer>> {
        let filter = OfferFilter {
            lang: lang.to_string(),
            category_id,
            ..Default::default()
        };
        let mut builder = QueryBuilder::<Postgres>::new(OFFER_SELECT);
        push_catalog_joins(&mut builder, lang);
        filter.push_conditions(&mut builder);
        builder
            .push(
                " ORDER BY ps.total_bookings DESC, pp.average_rating DESC NULLS LAST, \
                 ps.created_at DESC LIMIT ",
            )
            .push_bind(limit);
        let offers = builder
            .build_query_as::<Offer>()
            .fetch_all(&self.pool)
            .await?;
        Ok(offers)
    }

    /// Images for several offerings in display order
    pub async fn images_for(&self, offering_ids: &[i64]) -> DatabaseResult<Vec<OfferImage>> {
        if offering_ids.is_empty() {
            return Ok(Vec::new());
        }
        let images = sqlx::query_as(
            r#"
            SELECT provider_service_id, image_url AS url, public_id, sort_order
            FROM provider_service_images
            WHERE provider_service_id = ANY($1)
            ORDER BY provider_service_id, sort_order, id
            "#,
        )
        .bind(offering_ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(images)
    }

    /// Fill `images` on each offer
    pub async fn attach_images(&self, offers: &mut [Offer]) -> DatabaseResult<()> {
        let ids: Vec<i64> = offers.iter().map(|o| o.provider_service_id).collect();
        let mut grouped = group_images(self.images_for(&ids).await?);
        for offer in offers.iter_mut() {
            offer.images = Some(grouped.remove(&offer.provider_service_id).unwrap_or_default());
        }
        Ok(())
    }

    /// Every offering a provider has, active or not
    pub async fn for_provider(&self, provider_id: i64) -> DatabaseResult<Vec<Offering>> {
        let sql = format!(
            "{} WHERE ps.provider_id = $1 ORDER BY ps.created_at DESC",
            OFFERING_SELECT
        );
        let mut offerings: Vec<Offering> = sqlx::query_as(&sql)
            .bind(provider_id)
            .fetch_all(&self.pool)
            .await?;

        let ids: Vec<i64> = offerings.iter().map(|o| o.id).collect();
        let mut grouped = group_images(self.images_for(&ids).await?);
        for offering in offerings.iter_mut() {
            offering.images = grouped.remove(&offering.id).unwrap_or_default();
        }
        Ok(offerings)
    }

    pub async fn find_for_provider(
        &self,
        provider_id: i64,
        id: i64,
    ) -> DatabaseResult<Option<Offering>> {
        let sql = format!("{} WHERE ps.provider_id = $1 AND ps.id = $2", OFFERING_SELECT);
        let offering: Option<Offering> = sqlx::query_as(&sql)
            .bind(provider_id)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match offering {
            Some(mut offering) => {
                offering.images = self.images_for(&[offering.id]).await?;
                Ok(Some(offering))
            }
            None => Ok(None),
        }
    }

    /// Insert an offering with its images
    ///
    /// Offering the same service twice surfaces as
    /// [`common::error::DatabaseError::UniqueViolation`].
    pub async fn create(&self, provider_id: i64, offering: &NewOffering) -> DatabaseResult<i64> {
        let mut tx = self.pool.begin().await?;

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO provider_services (provider_id, service_id, price, price_type, description, is_active)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(provider_id)
        .bind(offering.service_id)
        .bind(offering.price)
        .bind(&offering.price_type)
        .bind(&offering.description)
        .bind(offering.is_active)
        .fetch_one(&mut *tx)
        .await?;

        insert_images(&mut tx, id, &offering.images).await?;
        tx.commit().await?;

        info!(
            "Provider {} now offers service {} as offering {}",
            provider_id, offering.service_id, id
        );
        Ok(id)
    }

    /// Apply an update to an owned offering; `false` when it is not the caller's
    pub async fn update(
        &self,
        provider_id: i64,
        id: i64,
        update: &OfferingUpdate,
    ) -> DatabaseResult<bool> {
        let mut tx = self.pool.begin().await?;

        let mut builder = QueryBuilder::<Postgres>::new("UPDATE provider_services SET ");
        if !update.changes.is_empty() {
            update.changes.push_assignments(&mut builder);
            builder.push(", ");
        }
        builder
            .push("updated_at = NOW() WHERE id = ")
            .push_bind(id)
            .push(" AND provider_id = ")
            .push_bind(provider_id);
        let result = builder.build().execute(&mut *tx).await?;
        if result.rows_affected() == 0 {
            return Ok(false);
        }

        if let Some(images) = &update.images {
            sqlx::query("DELETE FROM provider_service_images WHERE provider_service_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            insert_images(&mut tx, id, images).await?;
        }

        tx.commit().await?;
        Ok(true)
    }

    pub async fn deactivate(&self, provider_id: i64, id: i64) -> DatabaseResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE provider_services SET is_active = FALSE, updated_at = NOW()
            WHERE id = $1 AND provider_id = $2
            "#,
        )
        .bind(id)
        .bind(provider_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

async fn insert_images(
    tx: &mut Transaction<'_, Postgres>,
    offering_id: i64,
    images: &[NewImage],
) -> DatabaseResult<()> {
    if images.is_empty() {
        return Ok(());
    }

    let mut builder = QueryBuilder::<Postgres>::new(
        "INSERT INTO provider_service_images (provider_service_id, image_url, public_id, sort_order) ",
    );
    builder.push_values(images.iter().enumerate(), |mut row, (position, image)| {
        row.push_bind(offering_id)
            .push_bind(image.url.clone())
            .push_bind(image.public_id.clone())
            .push_bind(position as i32);
    });
    builder.build().execute(&mut **tx).await?;
    Ok(())
}

fn group_images(images: Vec<OfferImage>) -> HashMap<i64, Vec<OfferImage>> {
    let mut grouped: HashMap<i64, Vec<OfferImage>> = HashMap::new();
    for image in images {
        grouped.entry(image.provider_service_id).or_default().push(image);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(offering: i64, sort_order: i32) -> OfferImage {
        OfferImage {
            provider_service_id: offering,
            url: format!("https://res.cloudinary.com/demo/{offering}/{sort_order}.jpg"),
            public_id: None,
            sort_order,
        }
    }

    #[test]
    fn images_group_by_offering_in_order() {
        let grouped = group_images(vec![image(1, 0), image(2, 0), image(1, 1)]);
        assert_eq!(grouped[&1], vec![image(1, 0), image(1, 1)]);
        assert_eq!(grouped[&2].len(), 1);
        assert!(!grouped.contains_key(&3));
    }

    #[test]
    fn public_listing_hides_inactive_rows() {
        let filter = OfferFilter {
            lang: "en".into(),
            provider_service_id: Some(5),
            ..Default::default()
        };
        let mut builder = QueryBuilder::<Postgres>::new("SELECT 1");
        filter.push_conditions(&mut builder);
        assert_eq!(
            builder.sql(),
            "SELECT 1 WHERE ps.is_active AND s.is_active AND a.account_status = 'active' AND ps.id = $1"
        );
    }
}
