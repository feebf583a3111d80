//! Booking repository

use common::{accounts::AccountRole, error::DatabaseResult, response::Pagination};
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::info;

use crate::models::booking::{BookableOffering, Booking, BookingDetail, BookingStatus, NewBooking};

const BOOKING_COLUMNS: &str = r#"
    b.id, b.booking_reference, b.user_id, b.provider_id, b.service_id, b.provider_service_id,
    b.booking_date, b.booking_time, b.address, b.city, b.notes, b.price, b.booking_status,
    b.cancellation_reason, b.confirmed_at, b.completed_at, b.cancelled_at, b.created_at, b.updated_at
"#;

const DETAIL_FROM: &str = r#"
    , s.service_name,
      u.first_name AS customer_first_name, u.last_name AS customer_last_name,
      u.email AS customer_email,
      p.first_name AS provider_first_name, p.last_name AS provider_last_name,
      p.email AS provider_email, pp.business_name, p.profile_picture AS provider_picture
    FROM bookings b
    JOIN services s ON s.id = b.service_id
    JOIN accounts u ON u.id = b.user_id
    JOIN accounts p ON p.id = b.provider_id
    LEFT JOIN provider_profiles pp ON pp.account_id = b.provider_id
"#;

/// Whose bookings a listing shows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Participant {
    Customer(i64),
    Provider(i64),
    Anyone,
}

impl Participant {
    /// The side of the booking `role` sits on
    pub fn of(role: AccountRole, account_id: i64) -> Self {
        match role {
            AccountRole::User => Participant::Customer(account_id),
            AccountRole::Provider => Participant::Provider(account_id),
            AccountRole::Admin => Participant::Anyone,
        }
    }
}

fn push_filters(
    builder: &mut QueryBuilder<'_, Postgres>,
    participant: Participant,
    statuses: &[BookingStatus],
) {
    builder.push(" WHERE TRUE");
    match participant {
        Participant::Customer(id) => {
            builder.push(" AND b.user_id = ").push_bind(id);
        }
        Participant::Provider(id) => {
            builder.push(" AND b.provider_id = ").push_bind(id);
        }
        Participant::Anyone => {}
    }
    if !statuses.is_empty() {
        let names: Vec<String> = statuses.iter().map(|s| s.as_str().to_string()).collect();
        builder.push(" AND b.booking_status = ANY(").push_bind(names).push(")");
    }
}

/// Booking repository
#[derive(Clone)]
pub struct BookingRepository {
    pool: PgPool,
}

impl BookingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// An active offering of an active service from an active provider
    pub async fn bookable_offering(&self, id: i64) -> DatabaseResult<Option<BookableOffering>> {
        let offering = sqlx::query_as(
            r#"
            SELECT ps.id, ps.provider_id, ps.service_id, ps.price
            FROM provider_services ps
            JOIN services s ON s.id = ps.service_id
            JOIN accounts a ON a.id = ps.provider_id
            WHERE ps.id = $1 AND ps.is_active AND s.is_active AND a.account_status = 'active'
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(offering)
    }

    /// Insert a pending booking and bump the booking counters
    pub async fn create(
        &self,
        user_id: i64,
        reference: &str,
        offering: &BookableOffering,
        booking: &NewBooking,
    ) -> DatabaseResult<Booking> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            r#"
            INSERT INTO bookings AS b (booking_reference, user_id, provider_id, service_id,
                                       provider_service_id, booking_date, booking_time,
                                       address, city, notes, price)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {}
            "#,
            BOOKING_COLUMNS
        );
        let created: Booking = sqlx::query_as(&sql)
            .bind(reference)
            .bind(user_id)
            .bind(offering.provider_id)
            .bind(offering.service_id)
            .bind(offering.id)
            .bind(booking.booking_date)
            .bind(booking.booking_time)
            .bind(&booking.address)
            .bind(&booking.city)
            .bind(&booking.notes)
            .bind(offering.price)
            .fetch_one(&mut *tx)
            .await?;

        sqlx::query("UPDATE services SET total_bookings = total_bookings + 1 WHERE id = $1")
            .bind(offering.service_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            "UPDATE provider_services SET total_bookings = total_bookings + 1 WHERE id = $1",
        )
        .bind(offering.id)
        .execute(&mut *tx)
        .await?;
        sqlx::query(
            "UPDATE provider_profiles SET total_bookings = total_bookings + 1 WHERE account_id = $1",
        )
        .bind(offering.provider_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!("Booking {} created by user {}", created.booking_reference, user_id);
        Ok(created)
    }

    /// A page of bookings, newest first
    pub async fn list(
        &self,
        participant: Participant,
        statuses: &[BookingStatus],
        page: Pagination,
    ) -> DatabaseResult<(Vec<BookingDetail>, i64)> {
        let bookings = self
            .fetch_page(participant, statuses, "b.created_at DESC", page.limit, page.offset())
            .await?;

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM bookings b");
        push_filters(&mut count, participant, statuses);
        let total = count
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        Ok((bookings, total))
    }

    /// Soonest pending or confirmed bookings of a customer
    pub async fn upcoming(&self, user_id: i64, limit: i64) -> DatabaseResult<Vec<BookingDetail>> {
        self.fetch_page(
            Participant::Customer(user_id),
            &[BookingStatus::Pending, BookingStatus::Confirmed],
            "b.booking_date ASC, b.booking_time ASC",
            limit,
            0,
        )
        .await
    }

    /// Newest bookings first, bounded by `limit`/`offset`
    pub async fn recent(
        &self,
        participant: Participant,
        statuses: &[BookingStatus],
        limit: i64,
        offset: i64,
    ) -> DatabaseResult<Vec<BookingDetail>> {
        self.fetch_page(participant, statuses, "b.created_at DESC", limit, offset)
            .await
    }

    async fn fetch_page(
        &self,
        participant: Participant,
        statuses: &[BookingStatus],
        order: &str,
        limit: i64,
        offset: i64,
    ) -> DatabaseResult<Vec<BookingDetail>> {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT ");
        builder.push(BOOKING_COLUMNS).push(DETAIL_FROM);
        push_filters(&mut builder, participant, statuses);
        builder
            .push(" ORDER BY ")
            .push(order)
            .push(" LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);
        let bookings = builder
            .build_query_as::<BookingDetail>()
            .fetch_all(&self.pool)
            .await?;
        Ok(bookings)
    }

    pub async fn detail(&self, id: i64) -> DatabaseResult<Option<BookingDetail>> {
        let sql = format!("SELECT {} {} WHERE b.id = $1", BOOKING_COLUMNS, DETAIL_FROM);
        let booking = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(booking)
    }

    pub async fn find(&self, id: i64) -> DatabaseResult<Option<Booking>> {
        let sql = format!("SELECT {} FROM bookings b WHERE b.id = $1", BOOKING_COLUMNS);
        let booking = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(booking)
    }

    /// Move a booking from `from` to `to`, stamping the matching timestamp
    ///
    /// `None` when the booking left `from` in the meantime.
    pub async fn transition(
        &self,
        booking: &Booking,
        from: BookingStatus,
        to: BookingStatus,
        reason: Option<&str>,
    ) -> DatabaseResult<Option<Booking>> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            r#"
            UPDATE bookings AS b SET
                booking_status = $1,
                confirmed_at = CASE WHEN $1 = 'confirmed' THEN NOW() ELSE b.confirmed_at END,
                completed_at = CASE WHEN $1 = 'completed' THEN NOW() ELSE b.completed_at END,
                cancelled_at = CASE WHEN $1 IN ('cancelled', 'rejected') THEN NOW() ELSE b.cancelled_at END,
                cancellation_reason = CASE WHEN $1 IN ('cancelled', 'rejected')
                                           THEN COALESCE($2, b.cancellation_reason)
                                           ELSE b.cancellation_reason END,
                updated_at = NOW()
            WHERE b.id = $3 AND b.booking_status = $4
            RETURNING {}
            "#,
            BOOKING_COLUMNS
        );
        let updated: Option<Booking> = sqlx::query_as(&sql)
            .bind(to.as_str())
            .bind(reason)
            .bind(booking.id)
            .bind(from.as_str())
            .fetch_optional(&mut *tx)
            .await?;
        let Some(updated) = updated else {
            return Ok(None);
        };

        let counter = match to {
            BookingStatus::Completed => Some("completed_bookings"),
            BookingStatus::Cancelled => Some("cancelled_bookings"),
            _ => None,
        };
        if let Some(column) = counter {
            let sql = format!(
                "UPDATE provider_profiles SET {column} = {column} + 1 WHERE account_id = $1"
            );
            sqlx::query(&sql)
                .bind(booking.provider_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        info!("Booking {} moved from {} to {}", booking.id, from, to);
        Ok(Some(updated))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn participants_follow_roles() {
        assert_eq!(Participant::of(AccountRole::User, 3), Participant::Customer(3));
        assert_eq!(Participant::of(AccountRole::Provider, 4), Participant::Provider(4));
        assert_eq!(Participant::of(AccountRole::Admin, 1), Participant::Anyone);
    }

    #[test]
    fn status_filter_binds_one_array() {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT 1 FROM bookings b");
        push_filters(
            &mut builder,
            Participant::Provider(9),
            &[BookingStatus::Pending, BookingStatus::Confirmed],
        );
        assert_eq!(
            builder.sql(),
            "SELECT 1 FROM bookings b WHERE TRUE AND b.provider_id = $1 AND b.booking_status = ANY($2)"
        );
    }
}
