//! Repositories for database operations

use sqlx::{Postgres, QueryBuilder};

pub mod accounts;
pub mod admin;
pub mod bookings;
pub mod catalog;
pub mod messages;
pub mod offerings;

pub use accounts::AccountRepository;
pub use admin::AdminRepository;
pub use bookings::BookingRepository;
pub use catalog::CatalogRepository;
pub use messages::MessageRepository;
pub use offerings::OfferingRepository;

/// Every repository the API handlers use, sharing one pool
#[derive(Clone)]
pub struct Repositories {
    pub accounts: AccountRepository,
    pub admin: AdminRepository,
    pub bookings: BookingRepository,
    pub catalog: CatalogRepository,
    pub messages: MessageRepository,
    pub offerings: OfferingRepository,
}

impl Repositories {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self {
            accounts: AccountRepository::new(pool.clone()),
            admin: AdminRepository::new(pool.clone()),
            bookings: BookingRepository::new(pool.clone()),
            catalog: CatalogRepository::new(pool.clone()),
            messages: MessageRepository::new(pool.clone()),
            offerings: OfferingRepository::new(pool),
        }
    }
}

/// Join the category and service translations for `lang`
///
/// Expects `services` aliased as `s`; adds `sc`, `sct` and `st`.
pub(crate) fn push_catalog_joins(builder: &mut QueryBuilder<'_, Postgres>, lang: &str) {
    builder
        .push(
            " LEFT JOIN service_categories sc ON sc.id = s.category_id \
             LEFT JOIN service_category_translations sct \
             ON sct.category_id = s.category_id AND sct.language_code = ",
        )
        .push_bind(lang.to_string())
        .push(
            " LEFT JOIN service_translations st \
             ON st.service_id = s.id AND st.language_code = ",
        )
        .push_bind(lang.to_string());
}

/// `ILIKE` the bound pattern against each column, OR-ed inside parentheses.
/// The pattern escapes literal wildcards with a backslash.
pub(crate) fn push_search(
    builder: &mut QueryBuilder<'_, Postgres>,
    columns: &[&str],
    pattern: &str,
) {
    builder.push(" AND (");
    let mut alternatives = builder.separated(" OR ");
    for column in columns {
        alternatives.push(format!("{} ILIKE ", column));
        alternatives.push_bind_unseparated(pattern.to_string());
        alternatives.push_unseparated(r" ESCAPE '\'");
    }
    builder.push(")");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_joins_bind_the_language_twice() {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT s.id FROM services s");
        push_catalog_joins(&mut builder, "fr");
        let sql = builder.sql();
        assert!(sql.contains("sct.language_code = $1"));
        assert!(sql.contains("st.language_code = $2"));
    }

    #[test]
    fn search_ors_every_column() {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT 1 WHERE TRUE");
        push_search(&mut builder, &["s.service_name", "s.description"], "%clean%");
        assert_eq!(
            builder.sql(),
            r"SELECT 1 WHERE TRUE AND (s.service_name ILIKE $1 ESCAPE '\' OR s.description ILIKE $2 ESCAPE '\')"
        );
    }
}
