//! SQL schema for the quality-cost SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

-- One row per submitted record. The JSON payload is authoritative; the
-- scalar columns duplicate it for filtering and ordering.
CREATE TABLE IF NOT EXISTS cost_records (
    record_id    TEXT PRIMARY KEY,
    recorded_at  TEXT NOT NULL,   -- RFC 3339 UTC; set on insert only
    updated_at   TEXT NOT NULL,
    category     TEXT NOT NULL,
    cost_date    TEXT NOT NULL,   -- YYYY-MM-DD
    unit         TEXT,
    supplier_id  TEXT,            -- NULL for internally sourced costs
    amount       REAL NOT NULL,
    payload_json TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS cost_records_date_idx     ON cost_records(cost_date);
CREATE INDEX IF NOT EXISTS cost_records_category_idx ON cost_records(category);
CREATE INDEX IF NOT EXISTS cost_records_supplier_idx ON cost_records(supplier_id);

CREATE TABLE IF NOT EXISTS unit_costs (
    unit_name       TEXT PRIMARY KEY,
    cost_per_minute REAL NOT NULL
);

CREATE TABLE IF NOT EXISTS material_costs (
    material_name         TEXT PRIMARY KEY,
    purchase_price_per_kg REAL NOT NULL,
    scrap_price_per_kg    REAL NOT NULL
);

CREATE TABLE IF NOT EXISTS suppliers (
    supplier_id TEXT PRIMARY KEY,
    name        TEXT NOT NULL,
    status      TEXT NOT NULL DEFAULT 'approved'
);

PRAGMA user_version = 1;
";
