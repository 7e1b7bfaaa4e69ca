//! Standard chart of accounts and the system accounts the writer posts to.

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tally_shared::types::TenantId;

use super::account::{Account, AccountType};

/// Standard account codes seeded for every tenant.
pub mod codes {
    /// Cash and bank.
    pub const CASH: &str = "1000";
    /// Accounts receivable.
    pub const ACCOUNTS_RECEIVABLE: &str = "1100";
    /// Inventory.
    pub const INVENTORY: &str = "1200";
    /// VAT receivable (input tax).
    pub const VAT_RECEIVABLE: &str = "1300";
    /// Fixed assets at cost.
    pub const FIXED_ASSETS: &str = "1500";
    /// Accumulated depreciation (contra-asset).
    pub const ACCUMULATED_DEPRECIATION: &str = "1510";
    /// Accounts payable.
    pub const ACCOUNTS_PAYABLE: &str = "2000";
    /// Sales tax payable.
    pub const SALES_TAX_PAYABLE: &str = "2100";
    /// VAT payable (output tax).
    pub const VAT_PAYABLE: &str = "2110";
    /// Customer credits (overpayments held for customers).
    pub const CUSTOMER_CREDITS: &str = "2300";
    /// Owner's equity.
    pub const OWNER_EQUITY: &str = "3000";
    /// Sales revenue.
    pub const SALES_REVENUE: &str = "4000";
    /// Sales discounts (contra-revenue).
    pub const SALES_DISCOUNTS: &str = "4900";
    /// Cost of goods sold.
    pub const COST_OF_GOODS_SOLD: &str = "5000";
    /// Operating expenses (secondary default).
    pub const OPERATING_EXPENSES: &str = "6000";
    /// Office supplies.
    pub const OFFICE_SUPPLIES: &str = "6100";
    /// Software and subscriptions.
    pub const SOFTWARE: &str = "6200";
    /// Cloud hosting.
    pub const HOSTING: &str = "6250";
    /// Utilities.
    pub const UTILITIES: &str = "6300";
    /// Telephone and internet.
    pub const TELEPHONE: &str = "6350";
    /// Bank and payment-processor fees.
    pub const BANK_FEES: &str = "6400";
    /// Travel.
    pub const TRAVEL: &str = "6500";
    /// Meals and entertainment.
    pub const MEALS: &str = "6550";
    /// Rent.
    pub const RENT: &str = "6600";
    /// Advertising and marketing.
    pub const ADVERTISING: &str = "6700";
    /// Professional services.
    pub const PROFESSIONAL_SERVICES: &str = "6800";
    /// Insurance.
    pub const INSURANCE: &str = "6850";
    /// Sales tax paid on purchases.
    pub const SALES_TAX_EXPENSE: &str = "6900";
    /// Depreciation expense.
    pub const DEPRECIATION_EXPENSE: &str = "6950";
    /// Catch-all expense.
    pub const GENERAL_EXPENSE: &str = "6999";
}

/// The seed chart as `(code, name, type)` rows.
pub const STANDARD_ACCOUNTS: &[(&str, &str, AccountType)] = &[
    (codes::CASH, "Cash", AccountType::Asset),
    (codes::ACCOUNTS_RECEIVABLE, "Accounts Receivable", AccountType::Asset),
    (codes::INVENTORY, "Inventory", AccountType::Asset),
    (codes::VAT_RECEIVABLE, "VAT Receivable", AccountType::Asset),
    (codes::FIXED_ASSETS, "Fixed Assets", AccountType::Asset),
    (codes::ACCUMULATED_DEPRECIATION, "Accumulated Depreciation", AccountType::Asset),
    (codes::ACCOUNTS_PAYABLE, "Accounts Payable", AccountType::Liability),
    (codes::SALES_TAX_PAYABLE, "Sales Tax Payable", AccountType::Liability),
    (codes::VAT_PAYABLE, "VAT Payable", AccountType::Liability),
    (codes::CUSTOMER_CREDITS, "Customer Credits", AccountType::Liability),
    (codes::OWNER_EQUITY, "Owner's Equity", AccountType::Equity),
    (codes::SALES_REVENUE, "Sales Revenue", AccountType::Revenue),
    (codes::SALES_DISCOUNTS, "Sales Discounts", AccountType::Revenue),
    (codes::COST_OF_GOODS_SOLD, "Cost of Goods Sold", AccountType::Expense),
    (codes::OPERATING_EXPENSES, "Operating Expenses", AccountType::Expense),
    (codes::OFFICE_SUPPLIES, "Office Supplies", AccountType::Expense),
    (codes::SOFTWARE, "Software & Subscriptions", AccountType::Expense),
    (codes::HOSTING, "Cloud Hosting", AccountType::Expense),
    (codes::UTILITIES, "Utilities", AccountType::Expense),
    (codes::TELEPHONE, "Telephone & Internet", AccountType::Expense),
    (codes::BANK_FEES, "Bank & Processing Fees", AccountType::Expense),
    (codes::TRAVEL, "Travel", AccountType::Expense),
    (codes::MEALS, "Meals & Entertainment", AccountType::Expense),
    (codes::RENT, "Rent", AccountType::Expense),
    (codes::ADVERTISING, "Advertising & Marketing", AccountType::Expense),
    (codes::PROFESSIONAL_SERVICES, "Professional Services", AccountType::Expense),
    (codes::INSURANCE, "Insurance", AccountType::Expense),
    (codes::SALES_TAX_EXPENSE, "Sales Tax Expense", AccountType::Expense),
    (codes::DEPRECIATION_EXPENSE, "Depreciation Expense", AccountType::Expense),
    (codes::GENERAL_EXPENSE, "General Expenses", AccountType::Expense),
];

/// Builds the standard chart for a tenant.
#[must_use]
pub fn standard_chart(tenant_id: TenantId) -> Vec<Account> {
    STANDARD_ACCOUNTS
        .iter()
        .map(|(code, name, account_type)| Account::new(tenant_id, code, name, *account_type))
        .collect()
}

/// Which tax account purchases and sales post to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaxRegime {
    /// Purchase tax is a cost; sales tax collected is a liability.
    #[default]
    SalesTax,
    /// Purchase tax is recoverable (receivable); output tax is a liability.
    Vat,
}

impl TaxRegime {
    /// Storage name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SalesTax => "sales_tax",
            Self::Vat => "vat",
        }
    }

    /// Parses a storage name, defaulting to sales tax.
    #[must_use]
    pub fn parse_or_default(s: &str) -> Self {
        match s {
            "vat" => Self::Vat,
            _ => Self::SalesTax,
        }
    }
}

/// Per-tenant posting settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantProfile {
    /// The tenant.
    pub tenant_id: TenantId,
    /// Tax regime deciding purchase/sales tax accounts.
    pub tax_regime: TaxRegime,
    /// Time zone for scheduler midnight alignment.
    pub time_zone: Option<Tz>,
}

impl TenantProfile {
    /// Profile used when a tenant has none stored.
    #[must_use]
    pub const fn default_for(tenant_id: TenantId) -> Self {
        Self {
            tenant_id,
            tax_regime: TaxRegime::SalesTax,
            time_zone: None,
        }
    }
}

/// System accounts used by the posting builders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostingAccounts {
    /// Cash and bank.
    pub cash: String,
    /// Accounts receivable.
    pub receivable: String,
    /// Accounts payable.
    pub payable: String,
    /// Inventory asset.
    pub inventory: String,
    /// Cost of goods sold.
    pub cost_of_goods_sold: String,
    /// Default revenue.
    pub sales_revenue: String,
    /// Contra-revenue for discounts.
    pub sales_discounts: String,
    /// Liability for customer overpayments.
    pub customer_credits: String,
    /// Purchase tax under the sales-tax regime.
    pub sales_tax_expense: String,
    /// Purchase tax under the VAT regime.
    pub vat_receivable: String,
    /// Collected tax under the sales-tax regime.
    pub sales_tax_payable: String,
    /// Collected tax under the VAT regime.
    pub vat_payable: String,
    /// Depreciation expense.
    pub depreciation_expense: String,
    /// Accumulated depreciation.
    pub accumulated_depreciation: String,
    /// Catch-all expense used by the resolver fallback.
    pub fallback_expense: String,
    /// Known-good default when the catch-all is missing.
    pub secondary_expense: String,
}

impl PostingAccounts {
    /// Account debited for tax on purchases.
    #[must_use]
    pub fn purchase_tax(&self, regime: TaxRegime) -> &str {
        match regime {
            TaxRegime::SalesTax => &self.sales_tax_expense,
            TaxRegime::Vat => &self.vat_receivable,
        }
    }

    /// Account credited for tax on sales.
    #[must_use]
    pub fn sales_tax(&self, regime: TaxRegime) -> &str {
        match regime {
            TaxRegime::SalesTax => &self.sales_tax_payable,
            TaxRegime::Vat => &self.vat_payable,
        }
    }
}

impl Default for PostingAccounts {
    fn default() -> Self {
        Self {
            cash: codes::CASH.to_string(),
            receivable: codes::ACCOUNTS_RECEIVABLE.to_string(),
            payable: codes::ACCOUNTS_PAYABLE.to_string(),
            inventory: codes::INVENTORY.to_string(),
            cost_of_goods_sold: codes::COST_OF_GOODS_SOLD.to_string(),
            sales_revenue: codes::SALES_REVENUE.to_string(),
            sales_discounts: codes::SALES_DISCOUNTS.to_string(),
            customer_credits: codes::CUSTOMER_CREDITS.to_string(),
            sales_tax_expense: codes::SALES_TAX_EXPENSE.to_string(),
            vat_receivable: codes::VAT_RECEIVABLE.to_string(),
            sales_tax_payable: codes::SALES_TAX_PAYABLE.to_string(),
            vat_payable: codes::VAT_PAYABLE.to_string(),
            depreciation_expense: codes::DEPRECIATION_EXPENSE.to_string(),
            accumulated_depreciation: codes::ACCUMULATED_DEPRECIATION.to_string(),
            fallback_expense: codes::GENERAL_EXPENSE.to_string(),
            secondary_expense: codes::OPERATING_EXPENSES.to_string(),
        }
    }
}
