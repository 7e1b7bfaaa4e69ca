//! Ledger schema.
//!
//! Chart of accounts, journals with their entries, domain records,
//! inventory lots, fixed assets and recurring rules. Money columns are
//! `NUMERIC(19, 4)`; balances are enforced by a deferred constraint trigger.

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
        db.execute_unprepared(TENANT_PROFILES_SQL).await?;
        db.execute_unprepared(ACCOUNTS_SQL).await?;

        // ============================================================
        // PART 2: JOURNALS & LEDGER
        // ============================================================
        db.execute_unprepared(JOURNALS_SQL).await?;
        db.execute_unprepared(LEDGER_ENTRIES_SQL).await?;

        // ============================================================
        // PART 3: DOMAIN RECORDS
        // ============================================================
        db.execute_unprepared(EXPENSES_SQL).await?;
        db.execute_unprepared(INVOICES_SQL).await?;

        // ============================================================
        // PART 4: INVENTORY
        // ============================================================
        db.execute_unprepared(INVENTORY_SQL).await?;

        // ============================================================
        // PART 5: FIXED ASSETS & RECURRING RULES
        // ============================================================
        db.execute_unprepared(ASSETS_SQL).await?;
        db.execute_unprepared(RECURRING_RULES_SQL).await?;

        // ============================================================
        // PART 6: TRIGGERS
        // ============================================================
        db.execute_unprepared(TRIGGERS_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_ALL_SQL).await?;
        Ok(())
    }
}

const TENANT_PROFILES_SQL: &str = r"
CREATE TABLE tenant_profiles (
    tenant_id UUID PRIMARY KEY,
    tax_regime VARCHAR(20) NOT NULL DEFAULT 'sales_tax',
    time_zone VARCHAR(64),
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_tax_regime CHECK (tax_regime IN ('sales_tax', 'vat'))
);
";

const ACCOUNTS_SQL: &str = r"
CREATE TABLE accounts (
    id UUID PRIMARY KEY,
    tenant_id UUID NOT NULL,
    code VARCHAR(20) NOT NULL,
    name VARCHAR(255) NOT NULL,
    account_type VARCHAR(20) NOT NULL,
    normal_balance VARCHAR(10) NOT NULL,
    parent_code VARCHAR(20),
    is_active BOOLEAN NOT NULL DEFAULT true,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT accounts_tenant_code_key UNIQUE (tenant_id, code),
    CONSTRAINT chk_account_type CHECK (
        account_type IN ('asset', 'liability', 'equity', 'revenue', 'expense')
    ),
    CONSTRAINT chk_normal_balance CHECK (normal_balance IN ('debit', 'credit'))
);

CREATE INDEX idx_accounts_tenant ON accounts(tenant_id) WHERE is_active;
";

const JOURNALS_SQL: &str = r"
CREATE TABLE journals (
    id UUID PRIMARY KEY,
    tenant_id UUID NOT NULL,
    date DATE NOT NULL,
    description TEXT NOT NULL,
    reference VARCHAR(255) NOT NULL,
    amount NUMERIC(19, 4) NOT NULL,
    kind VARCHAR(20) NOT NULL,
    metadata JSONB NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT journals_tenant_reference_key UNIQUE (tenant_id, reference),
    CONSTRAINT chk_journal_kind CHECK (
        kind IN ('expense', 'invoice', 'payment', 'void', 'depreciation')
    )
);

CREATE INDEX idx_journals_tenant_date ON journals(tenant_id, date);
";

const LEDGER_ENTRIES_SQL: &str = r"
CREATE TABLE ledger_entries (
    id UUID PRIMARY KEY,
    journal_id UUID NOT NULL REFERENCES journals(id) ON DELETE CASCADE,
    tenant_id UUID NOT NULL,
    line_no INTEGER NOT NULL,
    account_id UUID NOT NULL REFERENCES accounts(id),
    account_code VARCHAR(20) NOT NULL,
    side VARCHAR(10) NOT NULL,
    amount NUMERIC(19, 4) NOT NULL,
    description TEXT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT ledger_entries_journal_line_key UNIQUE (journal_id, line_no),
    CONSTRAINT chk_entry_side CHECK (side IN ('debit', 'credit')),
    CONSTRAINT chk_entry_amount_positive CHECK (amount > 0)
);

CREATE INDEX idx_le_account ON ledger_entries(account_id);
";

const EXPENSES_SQL: &str = r"
CREATE TABLE expenses (
    id UUID PRIMARY KEY,
    tenant_id UUID NOT NULL,
    journal_id UUID NOT NULL REFERENCES journals(id),
    vendor VARCHAR(255) NOT NULL,
    description TEXT,
    total NUMERIC(19, 4) NOT NULL,
    amount_paid NUMERIC(19, 4) NOT NULL DEFAULT 0,
    status VARCHAR(20) NOT NULL,
    is_refund BOOLEAN NOT NULL DEFAULT false,
    date DATE NOT NULL,
    due_date DATE,
    tax JSONB,
    line_items JSONB NOT NULL DEFAULT '[]',
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX idx_expenses_tenant ON expenses(tenant_id, date);
";

const INVOICES_SQL: &str = r"
CREATE TABLE invoices (
    id UUID PRIMARY KEY,
    tenant_id UUID NOT NULL,
    journal_id UUID NOT NULL REFERENCES journals(id),
    customer VARCHAR(255) NOT NULL,
    invoice_number VARCHAR(100),
    normalized_number VARCHAR(100),
    total NUMERIC(19, 4) NOT NULL,
    amount_paid NUMERIC(19, 4) NOT NULL DEFAULT 0,
    status VARCHAR(20) NOT NULL,
    discount NUMERIC(19, 4) NOT NULL DEFAULT 0,
    date DATE NOT NULL,
    due_date DATE,
    tax JSONB,
    line_items JSONB NOT NULL DEFAULT '[]',
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT invoices_tenant_number_key UNIQUE (tenant_id, normalized_number)
);

CREATE INDEX idx_invoices_tenant ON invoices(tenant_id, date);
";

const INVENTORY_SQL: &str = r"
CREATE TABLE inventory_lots (
    id UUID PRIMARY KEY,
    tenant_id UUID NOT NULL,
    product_id UUID NOT NULL,
    received_on DATE NOT NULL,
    received_at TIMESTAMPTZ NOT NULL,
    quantity NUMERIC(19, 4) NOT NULL,
    remaining_qty NUMERIC(19, 4) NOT NULL,
    unit_cost NUMERIC(19, 4) NOT NULL,
    journal_id UUID REFERENCES journals(id),
    CONSTRAINT chk_lot_remaining CHECK (remaining_qty >= 0 AND remaining_qty <= quantity)
);

-- FIFO order
CREATE INDEX idx_lots_fifo ON inventory_lots(tenant_id, product_id, received_on, received_at, id);

CREATE TABLE inventory_txns (
    id UUID PRIMARY KEY,
    tenant_id UUID NOT NULL,
    lot_id UUID NOT NULL REFERENCES inventory_lots(id),
    product_id UUID NOT NULL,
    journal_id UUID NOT NULL REFERENCES journals(id),
    kind VARCHAR(20) NOT NULL,
    quantity NUMERIC(19, 4) NOT NULL,
    unit_cost NUMERIC(19, 4) NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_txn_kind CHECK (kind IN ('receipt', 'consumption')),
    CONSTRAINT chk_txn_quantity CHECK (quantity > 0)
);

CREATE INDEX idx_inventory_txns_lot ON inventory_txns(lot_id);
";

const ASSETS_SQL: &str = r"
CREATE TABLE assets (
    id UUID PRIMARY KEY,
    tenant_id UUID NOT NULL,
    name VARCHAR(255) NOT NULL,
    category VARCHAR(100),
    cost NUMERIC(19, 4) NOT NULL,
    residual_value NUMERIC(19, 4) NOT NULL DEFAULT 0,
    useful_life_months INTEGER NOT NULL,
    method VARCHAR(20) NOT NULL DEFAULT 'straight_line',
    accumulated_depreciation NUMERIC(19, 4) NOT NULL DEFAULT 0,
    status VARCHAR(20) NOT NULL DEFAULT 'active',
    next_run_on DATE NOT NULL,
    schedule_day SMALLINT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_asset_schedule_day CHECK (schedule_day BETWEEN 1 AND 31),
    CONSTRAINT chk_asset_life CHECK (useful_life_months > 0),
    CONSTRAINT chk_asset_status CHECK (status IN ('active', 'fully_depreciated')),
    CONSTRAINT chk_asset_residual CHECK (residual_value >= 0 AND residual_value <= cost)
);

CREATE INDEX idx_assets_due ON assets(next_run_on) WHERE status = 'active';
";

const RECURRING_RULES_SQL: &str = r"
CREATE TABLE recurring_rules (
    id UUID PRIMARY KEY,
    tenant_id UUID NOT NULL,
    name VARCHAR(255) NOT NULL,
    cadence VARCHAR(20) NOT NULL,
    start_date DATE NOT NULL,
    end_date DATE,
    options JSONB NOT NULL DEFAULT '{}',
    next_run_at TIMESTAMPTZ NOT NULL,
    last_run_at TIMESTAMPTZ,
    is_active BOOLEAN NOT NULL DEFAULT true,
    template JSONB NOT NULL,
    run_log JSONB NOT NULL DEFAULT '[]',
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_cadence CHECK (cadence IN ('daily', 'weekly', 'monthly', 'annual')),
    CONSTRAINT chk_rule_dates CHECK (end_date IS NULL OR end_date >= start_date)
);

CREATE INDEX idx_rules_due ON recurring_rules(next_run_at) WHERE is_active;
CREATE INDEX idx_rules_resume ON recurring_rules(tenant_id)
    WHERE NOT is_active AND (options->>'resume_on') IS NOT NULL;
";

const TRIGGERS_SQL: &str = r"
-- ============================================================
-- FUNCTION: check_journal_balance
-- Debits equal credits (within 0.01) for every journal at commit
-- ============================================================
CREATE OR REPLACE FUNCTION check_journal_balance()
RETURNS TRIGGER AS $$
DECLARE
    total_debit NUMERIC(19, 4);
    total_credit NUMERIC(19, 4);
BEGIN
    SELECT
        COALESCE(SUM(amount) FILTER (WHERE side = 'debit'), 0),
        COALESCE(SUM(amount) FILTER (WHERE side = 'credit'), 0)
    INTO total_debit, total_credit
    FROM ledger_entries
    WHERE journal_id = NEW.journal_id;

    IF abs(total_debit - total_credit) > 0.01 THEN
        RAISE EXCEPTION 'Journal is not balanced. Debit: %, Credit: %',
            total_debit, total_credit;
    END IF;

    RETURN NEW;
END;
$$ LANGUAGE plpgsql;

CREATE CONSTRAINT TRIGGER trg_check_journal_balance
AFTER INSERT OR UPDATE ON ledger_entries
DEFERRABLE INITIALLY DEFERRED
FOR EACH ROW
EXECUTE FUNCTION check_journal_balance();

-- ============================================================
-- FUNCTION: prevent_ledger_modification
-- Posted entries are append-only; corrections are reversing journals
-- ============================================================
CREATE OR REPLACE FUNCTION prevent_ledger_modification()
RETURNS TRIGGER AS $$
BEGIN
    RAISE EXCEPTION 'Ledger entries are immutable. Post a reversing journal instead.';
END;
$$ LANGUAGE plpgsql;

CREATE TRIGGER trg_prevent_ledger_mod
BEFORE UPDATE OR DELETE ON ledger_entries
FOR EACH ROW
EXECUTE FUNCTION prevent_ledger_modification();
";

const DROP_ALL_SQL: &str = r"
DROP TABLE IF EXISTS recurring_rules CASCADE;
DROP TABLE IF EXISTS assets CASCADE;
DROP TABLE IF EXISTS inventory_txns CASCADE;
DROP TABLE IF EXISTS inventory_lots CASCADE;
DROP TABLE IF EXISTS invoices CASCADE;
DROP TABLE IF EXISTS expenses CASCADE;
DROP TABLE IF EXISTS ledger_entries CASCADE;
DROP TABLE IF EXISTS journals CASCADE;
DROP TABLE IF EXISTS accounts CASCADE;
DROP TABLE IF EXISTS tenant_profiles CASCADE;
DROP FUNCTION IF EXISTS check_journal_balance CASCADE;
DROP FUNCTION IF EXISTS prevent_ledger_modification CASCADE;
";
