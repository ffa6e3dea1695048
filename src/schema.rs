// Mirrors the DDL in repository::context::DbContext::init_schema.

diesel::table! {
    catalog_records (id) {
        id -> Integer,
        title -> Text,
        rating -> Text,
        category -> Text,
        price_cents -> BigInt,
        availability -> Text,
        observed_at -> Text,
    }
}
