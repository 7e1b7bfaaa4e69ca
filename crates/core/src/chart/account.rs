//! Account and chart-of-accounts domain types.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tally_shared::types::{AccountId, TenantId};

use crate::ledger::types::Side;

/// Account types for the five elements of the accounting equation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    /// Resources owned (cash, receivables, inventory).
    Asset,
    /// Obligations owed (payables, tax collected, customer credits).
    Liability,
    /// Owner's residual interest.
    Equity,
    /// Income from sales.
    Revenue,
    /// Costs incurred.
    Expense,
}

impl AccountType {
    /// The side that increases an account of this type.
    ///
    /// - Asset/Expense: debit-normal
    /// - Liability/Equity/Revenue: credit-normal
    #[must_use]
    pub const fn normal_balance(self) -> Side {
        match self {
            Self::Asset | Self::Expense => Side::Debit,
            Self::Liability | Self::Equity | Self::Revenue => Side::Credit,
        }
    }

    /// Lowercase storage name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Asset => "asset",
            Self::Liability => "liability",
            Self::Equity => "equity",
            Self::Revenue => "revenue",
            Self::Expense => "expense",
        }
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccountType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "asset" => Ok(Self::Asset),
            "liability" => Ok(Self::Liability),
            "equity" => Ok(Self::Equity),
            "revenue" => Ok(Self::Revenue),
            "expense" => Ok(Self::Expense),
            _ => Err(format!("Unknown account type: {s}")),
        }
    }
}

/// A chart of accounts entry.
///
/// Unique per `(tenant_id, code)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Unique identifier.
    pub id: AccountId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Account code, unique within the tenant.
    pub code: String,
    /// Display name.
    pub name: String,
    /// Element of the accounting equation.
    pub account_type: AccountType,
    /// Side that increases the balance.
    pub normal_balance: Side,
    /// Code of the parent account, if any.
    pub parent_code: Option<String>,
    /// Inactive accounts stay in the chart but are not offered to resolution.
    pub is_active: bool,
}

impl Account {
    /// Creates an active account with the type's normal balance.
    #[must_use]
    pub fn new(tenant_id: TenantId, code: &str, name: &str, account_type: AccountType) -> Self {
        Self {
            id: AccountId::new(),
            tenant_id,
            code: code.to_string(),
            name: name.to_string(),
            account_type,
            normal_balance: account_type.normal_balance(),
            parent_code: None,
            is_active: true,
        }
    }
}

/// Immutable snapshot of one tenant's chart of accounts.
///
/// Read-mostly and cheap to share behind an `Arc`.
#[derive(Debug, Clone, Default)]
pub struct ChartOfAccounts {
    accounts: Vec<Account>,
    by_code: HashMap<String, usize>,
}

impl ChartOfAccounts {
    /// Builds a snapshot from a list of accounts.
    #[must_use]
    pub fn new(accounts: Vec<Account>) -> Self {
        let by_code = accounts
            .iter()
            .enumerate()
            .map(|(index, account)| (account.code.clone(), index))
            .collect();
        Self { accounts, by_code }
    }

    /// Looks up an account by code.
    #[must_use]
    pub fn get(&self, code: &str) -> Option<&Account> {
        self.by_code.get(code).map(|&index| &self.accounts[index])
    }

    /// Returns true if an active account with this code exists.
    #[must_use]
    pub fn contains(&self, code: &str) -> bool {
        self.get(code).is_some_and(|account| account.is_active)
    }

    /// All accounts in insertion order.
    #[must_use]
    pub fn accounts(&self) -> &[Account] {
        &self.accounts
    }

    /// Codes from `codes` that are not active accounts in this chart.
    #[must_use]
    pub fn missing<'a, I>(&self, codes: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut missing: Vec<String> = codes
            .into_iter()
            .filter(|code| !self.contains(code))
            .map(ToString::to_string)
            .collect();
        missing.sort();
        missing.dedup();
        missing
    }

    /// Number of accounts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    /// Returns true if the chart has no accounts.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}
