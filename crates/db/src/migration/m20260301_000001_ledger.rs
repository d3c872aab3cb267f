//! Ledger schema: tenants, chart, periods, journal, rates, FIFO lots, sales
//! returns, approvals, restatement records and the audit outbox.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        // ============================================================
        // PART 1: TENANTS & CHART OF ACCOUNTS
        // ============================================================
        db.execute_unprepared(TENANTS_SQL).await?;
        db.execute_unprepared(ACCOUNTS_SQL).await?;

        // ============================================================
        // PART 2: PERIODS & JOURNAL
        // ============================================================
        db.execute_unprepared(ACCOUNTING_PERIODS_SQL).await?;
        db.execute_unprepared(JOURNAL_SQL).await?;

        // ============================================================
        // PART 3: EXCHANGE RATES
        // ============================================================
        db.execute_unprepared(EXCHANGE_RATES_SQL).await?;

        // ============================================================
        // PART 4: FIFO COST LOTS
        // ============================================================
        db.execute_unprepared(COST_LOTS_SQL).await?;
        db.execute_unprepared(SALES_RETURNS_SQL).await?;

        // ============================================================
        // PART 5: APPROVALS, RESTATEMENT, AUDIT
        // ============================================================
        db.execute_unprepared(APPROVAL_REQUESTS_SQL).await?;
        db.execute_unprepared(AMOUNT_RECORDS_SQL).await?;
        db.execute_unprepared(AUDIT_OUTBOX_SQL).await?;

        // ============================================================
        // PART 6: TRIGGERS & VIEWS
        // ============================================================
        db.execute_unprepared(TRIGGERS_SQL).await?;
        db.execute_unprepared(VIEWS_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_ALL_SQL).await?;
        Ok(())
    }
}

// ============================================================
// SQL CONSTANTS
// ============================================================

const TENANTS_SQL: &str = r"
CREATE TABLE tenants (
    id              UUID PRIMARY KEY,
    name            TEXT NOT NULL,
    base_currency   CHAR(3) NOT NULL,
    created_at      TIMESTAMPTZ NOT NULL DEFAULT NOW()
);
";

const ACCOUNTS_SQL: &str = r"
CREATE TABLE accounts (
    id                          UUID PRIMARY KEY,
    tenant_id                   UUID NOT NULL REFERENCES tenants(id),
    code                        TEXT NOT NULL,
    name                        TEXT NOT NULL,
    account_type                TEXT NOT NULL
        CHECK (account_type IN ('asset', 'liability', 'equity', 'income', 'expense')),
    subtype                     TEXT,
    normal_balance              TEXT NOT NULL CHECK (normal_balance IN ('debit', 'credit')),
    is_active                   BOOLEAN NOT NULL DEFAULT TRUE,
    parent_id                   UUID REFERENCES accounts(id),
    opening_balance             NUMERIC(28, 8) NOT NULL DEFAULT 0,
    opening_display_currency    CHAR(3),
    opening_display_amount      NUMERIC(28, 8),
    opening_display_rate        NUMERIC(28, 12),
    UNIQUE (tenant_id, code)
);

CREATE INDEX idx_accounts_tenant_subtype ON accounts(tenant_id, subtype) WHERE is_active;
";

const ACCOUNTING_PERIODS_SQL: &str = r"
CREATE TABLE accounting_periods (
    id          UUID PRIMARY KEY,
    tenant_id   UUID NOT NULL REFERENCES tenants(id),
    name        TEXT NOT NULL,
    start_date  DATE NOT NULL,
    end_date    DATE NOT NULL,
    status      TEXT NOT NULL DEFAULT 'open' CHECK (status IN ('open', 'closed', 'locked')),
    CHECK (start_date <= end_date)
);

CREATE INDEX idx_periods_tenant_start ON accounting_periods(tenant_id, start_date);
";

const JOURNAL_SQL: &str = r"
CREATE TABLE journal_entries (
    id              UUID PRIMARY KEY,
    tenant_id       UUID NOT NULL REFERENCES tenants(id),
    entry_date      DATE NOT NULL,
    reference_type  TEXT NOT NULL,
    reference_id    UUID,
    description     TEXT NOT NULL,
    status          TEXT NOT NULL CHECK (status IN ('draft', 'posted', 'reversed')),
    is_deleted      BOOLEAN NOT NULL DEFAULT FALSE,
    reversal_of     UUID REFERENCES journal_entries(id),
    created_at      TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at      TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

-- One live entry per source document.
CREATE UNIQUE INDEX uq_journal_entries_reference
    ON journal_entries(tenant_id, reference_type, reference_id)
    WHERE NOT is_deleted AND reference_id IS NOT NULL;

CREATE INDEX idx_journal_entries_tenant_date ON journal_entries(tenant_id, entry_date);

CREATE TABLE journal_lines (
    id                  UUID PRIMARY KEY,
    entry_id            UUID NOT NULL REFERENCES journal_entries(id) ON DELETE CASCADE,
    line_no             INTEGER NOT NULL,
    account_id          UUID NOT NULL REFERENCES accounts(id),
    debit               NUMERIC(28, 8) NOT NULL DEFAULT 0 CHECK (debit >= 0),
    credit              NUMERIC(28, 8) NOT NULL DEFAULT 0 CHECK (credit >= 0),
    original_currency   CHAR(3),
    original_amount     NUMERIC(28, 8),
    original_rate       NUMERIC(28, 12),
    display_currency    CHAR(3),
    display_amount      NUMERIC(28, 8),
    display_rate        NUMERIC(28, 12),
    description         TEXT,
    CHECK ((debit > 0 AND credit = 0) OR (credit > 0 AND debit = 0)),
    UNIQUE (entry_id, line_no)
);

CREATE INDEX idx_journal_lines_account ON journal_lines(account_id);

CREATE TABLE source_document_links (
    tenant_id       UUID NOT NULL REFERENCES tenants(id),
    reference_type  TEXT NOT NULL,
    reference_id    UUID NOT NULL,
    entry_id        UUID NOT NULL REFERENCES journal_entries(id),
    linked_at       TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    PRIMARY KEY (tenant_id, reference_type, reference_id)
);
";

const EXCHANGE_RATES_SQL: &str = r"
CREATE TABLE exchange_rates (
    id              UUID PRIMARY KEY,
    tenant_id       UUID REFERENCES tenants(id),
    from_currency   CHAR(3) NOT NULL,
    to_currency     CHAR(3) NOT NULL,
    rate            NUMERIC(28, 12) NOT NULL CHECK (rate > 0),
    effective_date  DATE NOT NULL,
    source          TEXT NOT NULL CHECK (source IN ('api', 'manual', 'same_currency')),
    manual_override BOOLEAN NOT NULL DEFAULT FALSE,
    override_reason TEXT,
    created_at      TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    CHECK (from_currency <> to_currency)
);

CREATE INDEX idx_exchange_rates_pair_date
    ON exchange_rates(from_currency, to_currency, effective_date DESC);
";

const COST_LOTS_SQL: &str = r"
CREATE TABLE cost_lots (
    id                  UUID PRIMARY KEY,
    tenant_id           UUID NOT NULL REFERENCES tenants(id),
    product_id          UUID NOT NULL,
    lot_date            DATE NOT NULL,
    original_quantity   NUMERIC(28, 8) NOT NULL CHECK (original_quantity > 0),
    remaining_quantity  NUMERIC(28, 8) NOT NULL,
    unit_cost           NUMERIC(28, 8) NOT NULL CHECK (unit_cost >= 0),
    source              TEXT NOT NULL
        CHECK (source IN ('purchase', 'adjustment', 'reconciliation', 'return')),
    source_ref_type     TEXT,
    source_ref_id       UUID,
    sequence            BIGINT NOT NULL,
    CHECK (remaining_quantity >= 0 AND remaining_quantity <= original_quantity)
);

CREATE INDEX idx_cost_lots_fifo ON cost_lots(tenant_id, product_id, lot_date, sequence);
CREATE INDEX idx_cost_lots_source ON cost_lots(tenant_id, source_ref_type, source_ref_id);

CREATE TABLE lot_consumptions (
    id          UUID PRIMARY KEY,
    lot_id      UUID NOT NULL REFERENCES cost_lots(id),
    tenant_id   UUID NOT NULL REFERENCES tenants(id),
    product_id  UUID NOT NULL,
    source_type TEXT NOT NULL,
    source_id   UUID,
    quantity    NUMERIC(28, 8) NOT NULL CHECK (quantity > 0),
    unit_cost   NUMERIC(28, 8) NOT NULL
);

CREATE INDEX idx_lot_consumptions_source ON lot_consumptions(tenant_id, source_type, source_id);
";

const SALES_RETURNS_SQL: &str = r"
CREATE TABLE sales_returns (
    tenant_id           UUID NOT NULL REFERENCES tenants(id),
    return_id           UUID NOT NULL,
    invoice_id          UUID NOT NULL,
    currency            CHAR(3) NOT NULL,
    returned_subtotal   NUMERIC(28, 8) NOT NULL CHECK (returned_subtotal > 0),
    items               JSONB NOT NULL DEFAULT '[]',
    updated_at          TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    PRIMARY KEY (tenant_id, return_id)
);

CREATE INDEX idx_sales_returns_invoice ON sales_returns(tenant_id, invoice_id);
";

const APPROVAL_REQUESTS_SQL: &str = r"
CREATE TABLE approval_requests (
    id                      UUID PRIMARY KEY,
    tenant_id               UUID NOT NULL REFERENCES tenants(id),
    kind                    TEXT NOT NULL CHECK (kind IN ('refund', 'dividend')),
    amount                  NUMERIC(28, 8) NOT NULL CHECK (amount > 0),
    currency                CHAR(3) NOT NULL,
    source_type             TEXT,
    source_id               UUID,
    status                  TEXT NOT NULL,
    required_approvers      JSONB NOT NULL,
    approvals               JSONB NOT NULL DEFAULT '[]',
    disbursement_voucher    UUID UNIQUE REFERENCES journal_entries(id),
    rejection_reason        TEXT,
    created_by              UUID NOT NULL,
    created_at              TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at              TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE INDEX idx_approval_requests_tenant_status ON approval_requests(tenant_id, status);
";

const AMOUNT_RECORDS_SQL: &str = r"
CREATE TABLE amount_records (
    kind                TEXT NOT NULL
                        CHECK (kind IN ('invoice', 'bill', 'payment', 'product_price')),
    id                  UUID NOT NULL,
    tenant_id           UUID NOT NULL REFERENCES tenants(id),
    amount              NUMERIC(28, 8) NOT NULL,
    currency            CHAR(3) NOT NULL,
    display_currency    CHAR(3),
    display_amount      NUMERIC(28, 8),
    display_rate        NUMERIC(28, 12),
    PRIMARY KEY (kind, id)
);

CREATE INDEX idx_amount_records_tenant ON amount_records(tenant_id);
";

const AUDIT_OUTBOX_SQL: &str = r"
CREATE TABLE audit_outbox (
    id              UUID PRIMARY KEY,
    tenant_id       UUID NOT NULL REFERENCES tenants(id),
    action          TEXT NOT NULL,
    subject_id      UUID NOT NULL,
    actor           UUID,
    payload         JSONB NOT NULL,
    created_at      TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    delivered_at    TIMESTAMPTZ
);

CREATE INDEX idx_audit_outbox_pending ON audit_outbox(created_at) WHERE delivered_at IS NULL;
";

const TRIGGERS_SQL: &str = r"
-- ============================================================
-- FUNCTION: prevent_locked_period_writes
-- Journal rows dated inside a locked period are immutable
-- ============================================================
CREATE OR REPLACE FUNCTION prevent_locked_period_writes()
RETURNS TRIGGER AS $$
DECLARE
    row_tenant UUID;
    row_date DATE;
BEGIN
    IF TG_OP = 'DELETE' THEN
        row_tenant := OLD.tenant_id;
        row_date := OLD.entry_date;
    ELSE
        row_tenant := NEW.tenant_id;
        row_date := NEW.entry_date;
    END IF;

    IF EXISTS (
        SELECT 1 FROM accounting_periods
        WHERE tenant_id = row_tenant
          AND status = 'locked'
          AND row_date BETWEEN start_date AND end_date
    ) THEN
        RAISE EXCEPTION 'Period containing % is locked', row_date;
    END IF;

    IF TG_OP = 'UPDATE' AND OLD.entry_date <> NEW.entry_date AND EXISTS (
        SELECT 1 FROM accounting_periods
        WHERE tenant_id = OLD.tenant_id
          AND status = 'locked'
          AND OLD.entry_date BETWEEN start_date AND end_date
    ) THEN
        RAISE EXCEPTION 'Period containing % is locked', OLD.entry_date;
    END IF;

    IF TG_OP = 'DELETE' THEN
        RETURN OLD;
    END IF;
    RETURN NEW;
END;
$$ LANGUAGE plpgsql;

CREATE TRIGGER trg_locked_period_entries
BEFORE INSERT OR UPDATE OR DELETE ON journal_entries
FOR EACH ROW
EXECUTE FUNCTION prevent_locked_period_writes();

-- ============================================================
-- FUNCTION: touch_updated_at
-- ============================================================
CREATE OR REPLACE FUNCTION touch_updated_at()
RETURNS TRIGGER AS $$
BEGIN
    NEW.updated_at := NOW();
    RETURN NEW;
END;
$$ LANGUAGE plpgsql;

CREATE TRIGGER trg_touch_journal_entries
BEFORE UPDATE ON journal_entries
FOR EACH ROW
EXECUTE FUNCTION touch_updated_at();

CREATE TRIGGER trg_touch_approval_requests
BEFORE UPDATE ON approval_requests
FOR EACH ROW
EXECUTE FUNCTION touch_updated_at();
";

const VIEWS_SQL: &str = r"
-- Posted and reversed entries per account, drafts excluded.
CREATE VIEW trial_balance_view AS
SELECT
    a.tenant_id,
    a.id AS account_id,
    a.code,
    a.name,
    a.account_type,
    COALESCE(SUM(l.debit), 0) AS total_debit,
    COALESCE(SUM(l.credit), 0) AS total_credit
FROM accounts a
LEFT JOIN journal_lines l ON l.account_id = a.id
LEFT JOIN journal_entries e ON e.id = l.entry_id
WHERE e.id IS NULL OR (NOT e.is_deleted AND e.status <> 'draft')
GROUP BY a.tenant_id, a.id, a.code, a.name, a.account_type;
";

const DROP_ALL_SQL: &str = r"
DROP VIEW IF EXISTS trial_balance_view CASCADE;

DROP TRIGGER IF EXISTS trg_touch_approval_requests ON approval_requests;
DROP TRIGGER IF EXISTS trg_touch_journal_entries ON journal_entries;
DROP TRIGGER IF EXISTS trg_locked_period_entries ON journal_entries;
DROP FUNCTION IF EXISTS touch_updated_at();
DROP FUNCTION IF EXISTS prevent_locked_period_writes();

DROP TABLE IF EXISTS audit_outbox CASCADE;
DROP TABLE IF EXISTS amount_records CASCADE;
DROP TABLE IF EXISTS approval_requests CASCADE;
DROP TABLE IF EXISTS sales_returns CASCADE;
DROP TABLE IF EXISTS lot_consumptions CASCADE;
DROP TABLE IF EXISTS cost_lots CASCADE;
DROP TABLE IF EXISTS exchange_rates CASCADE;
DROP TABLE IF EXISTS source_document_links CASCADE;
DROP TABLE IF EXISTS journal_lines CASCADE;
DROP TABLE IF EXISTS journal_entries CASCADE;
DROP TABLE IF EXISTS accounting_periods CASCADE;
DROP TABLE IF EXISTS accounts CASCADE;
DROP TABLE IF EXISTS tenants CASCADE;
";
