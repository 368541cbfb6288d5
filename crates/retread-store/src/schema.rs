//! Change history database schema.
//!
//! Mirrors the files under `migrations/`. The tests below fail when the two
//! drift apart.

use retread_core::table::TableName;

/// SQL to create the journal table.
pub const CREATE_CHANGE_HISTORY_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS change_history (
    id              UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    operation_kind  VARCHAR(16) NOT NULL,
    table_name      VARCHAR(64) NOT NULL,
    record_id       TEXT NOT NULL,
    prior_state     JSONB,
    new_state       JSONB,
    description     TEXT NOT NULL DEFAULT '',
    occurred_at     TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE INDEX IF NOT EXISTS idx_change_history_occurred_at
    ON change_history (occurred_at);
";

/// SQL to add the insertion sequence that orders entries sharing a timestamp.
pub const ADD_CHANGE_HISTORY_SEQ: &str = r"
ALTER TABLE change_history
    ADD COLUMN IF NOT EXISTS seq BIGSERIAL;

CREATE INDEX IF NOT EXISTS idx_change_history_occurred_at_seq
    ON change_history (occurred_at, seq);
";

/// SQL to create the row table backing `table`.
#[must_use]
pub fn create_row_table(table: TableName) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {table} (
    id          TEXT PRIMARY KEY,
    data        JSONB NOT NULL,
    updated_at  TIMESTAMPTZ NOT NULL DEFAULT NOW()
);"
    )
}
