//! Schema creation for the marketplace tables

use sqlx::PgPool;

use super::DbError;

const STATEMENTS: &[(&str, &str)] = &[
    (
        "users",
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id UUID PRIMARY KEY,
            name TEXT,
            email TEXT NOT NULL UNIQUE,
            role TEXT NOT NULL DEFAULT 'CLIENT',
            password_hash TEXT,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    ),
    (
        "labs",
        r#"
        CREATE TABLE IF NOT EXISTS labs (
            id UUID PRIMARY KEY,
            owner_id UUID NOT NULL UNIQUE REFERENCES users(id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            description TEXT,
            location JSONB,
            certifications TEXT[] NOT NULL DEFAULT '{}',
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    ),
    (
        "lab_services",
        r#"
        CREATE TABLE IF NOT EXISTS lab_services (
            id UUID PRIMARY KEY,
            lab_id UUID NOT NULL REFERENCES labs(id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            description TEXT,
            category TEXT NOT NULL,
            pricing_mode TEXT NOT NULL DEFAULT 'QUOTE_REQUIRED',
            price_per_unit NUMERIC(12,2),
            unit_type TEXT NOT NULL DEFAULT 'per_sample',
            turnaround_days INTEGER,
            sample_requirements TEXT,
            active BOOLEAN NOT NULL DEFAULT TRUE,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    ),
    (
        "orders",
        r#"
        CREATE TABLE IF NOT EXISTS orders (
            id UUID PRIMARY KEY,
            client_id UUID NOT NULL REFERENCES users(id),
            lab_id UUID NOT NULL REFERENCES labs(id),
            service_id UUID NOT NULL REFERENCES lab_services(id),
            status TEXT NOT NULL,
            client_details JSONB NOT NULL,
            sample_description TEXT NOT NULL,
            special_instructions TEXT,
            quoted_price NUMERIC(12,2),
            quoted_at TIMESTAMPTZ,
            quote_notes TEXT,
            estimated_turnaround_days INTEGER,
            quote_approved_at TIMESTAMPTZ,
            quote_rejected_at TIMESTAMPTZ,
            quote_rejected_reason TEXT,
            acknowledged_at TIMESTAMPTZ,
            completed_at TIMESTAMPTZ,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    ),
    (
        "attachments",
        r#"
        CREATE TABLE IF NOT EXISTS attachments (
            id UUID PRIMARY KEY,
            order_id UUID NOT NULL REFERENCES orders(id) ON DELETE CASCADE,
            uploaded_by_id UUID NOT NULL REFERENCES users(id),
            file_name TEXT NOT NULL,
            file_url TEXT NOT NULL,
            file_type TEXT NOT NULL,
            file_size BIGINT,
            attachment_type TEXT NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    ),
    (
        "indexes",
        r#"
        CREATE INDEX IF NOT EXISTS idx_lab_services_lab ON lab_services(lab_id);
        CREATE INDEX IF NOT EXISTS idx_lab_services_active_category ON lab_services(active, category);
        CREATE INDEX IF NOT EXISTS idx_orders_client ON orders(client_id, created_at DESC);
        CREATE INDEX IF NOT EXISTS idx_orders_lab_status ON orders(lab_id, status);
        CREATE INDEX IF NOT EXISTS idx_orders_lab_created ON orders(lab_id, created_at DESC);
        CREATE INDEX IF NOT EXISTS idx_attachments_order ON attachments(order_id)
        "#,
    ),
];

/// Create every table and index. Safe to run repeatedly.
pub async fn run(pool: &PgPool) -> Result<(), DbError> {
    tracing::info!("running migrations");

    for (name, sql) in STATEMENTS {
        // raw_sql allows the multi-statement index block
        sqlx::raw_sql(sql).execute(pool).await?;
        tracing::debug!(step = name, "migration step applied");
    }

    tracing::info!("migrations complete");
    Ok(())
}
