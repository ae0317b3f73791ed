//! Outward views
//!
//! The shapes exchanged with clients, and the mapping between them and
//! the persisted entities. Field names are camelCase on the wire.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::models::{Account, User};

/// Client-facing account.
///
/// `owner_username` and `calculated_balance` are output-only; they are
/// ignored when a view is merged into an entity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountView {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub owner_username: Option<String>,
    #[serde(default)]
    pub calculated_balance: Option<Decimal>,
}

impl AccountView {
    /// Map an entity to its view. No balance is attached.
    pub fn from_entity(account: &Account) -> Self {
        Self {
            id: account.id,
            name: Some(account.name.clone()),
            description: account.description.clone(),
            user_id: account.user_id,
            owner_username: None,
            calculated_balance: None,
        }
    }

    pub fn with_owner_username(mut self, username: Option<String>) -> Self {
        self.owner_username = username;
        self
    }

    pub fn with_balance(mut self, balance: Decimal) -> Self {
        self.calculated_balance = Some(balance);
        self
    }

    /// Build a fresh entity from this view. The id is left unset so
    /// storage assigns one.
    pub fn to_new_entity(&self) -> Account {
        let mut account = Account::default();
        self.merge_into(&mut account);
        account.id = None;
        account
    }

    /// Overwrite the fields of `account` that this view specifies.
    /// The entity's id is never touched.
    pub fn merge_into(&self, account: &mut Account) {
        if let Some(ref name) = self.name {
            account.name = name.clone();
        }
        if let Some(ref description) = self.description {
            account.description = Some(description.clone());
        }
        if let Some(user_id) = self.user_id {
            account.user_id = Some(user_id);
        }
    }
}

/// Client-facing user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl UserView {
    pub fn from_entity(user: &User) -> Self {
        Self {
            id: user.id,
            username: Some(user.username.clone()),
            email: user.email.clone(),
        }
    }

    pub fn merge_into(&self, user: &mut User) {
        if let Some(ref username) = self.username {
            user.username = username.clone();
        }
        if let Some(ref email) = self.email {
            user.email = Some(email.clone());
        }
    }
}

/// One page of balance-annotated accounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountPage {
    pub accounts: Vec<AccountView>,
    pub current_page: u32,
    pub total_items: u64,
    pub total_pages: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn persisted() -> Account {
        Account {
            id: Some(7),
            name: "Checking".to_string(),
            description: Some("Main account".to_string()),
            user_id: Some(1),
        }
    }

    #[test]
    fn test_merge_incoming_wins_for_specified_fields() {
        let mut account = persisted();
        let view = AccountView {
            id: Some(7),
            name: Some("Savings".to_string()),
            ..Default::default()
        };
        view.merge_into(&mut account);

        assert_eq!(account.id, Some(7));
        assert_eq!(account.name, "Savings");
        assert_eq!(account.description, Some("Main account".to_string()));
        assert_eq!(account.user_id, Some(1));
    }

    #[test]
    fn test_merge_ignores_output_only_fields() {
        let mut account = persisted();
        let view = AccountView {
            owner_username: Some("mallory".to_string()),
            calculated_balance: Some(dec!(1000000)),
            ..Default::default()
        };
        view.merge_into(&mut account);
        assert_eq!(account, persisted());
    }

    #[test]
    fn test_to_new_entity_drops_id() {
        let view = AccountView {
            id: Some(99),
            name: Some("Travel".to_string()),
            user_id: Some(3),
            ..Default::default()
        };
        let account = view.to_new_entity();
        assert_eq!(account.id, None);
        assert_eq!(account.name, "Travel");
        assert_eq!(account.user_id, Some(3));
    }

    #[test]
    fn test_account_view_wire_format() {
        let view = AccountView::from_entity(&persisted()).with_balance(dec!(75));
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["id"], 7);
        assert_eq!(json["userId"], 1);
        assert_eq!(json["calculatedBalance"], "75");
    }

    #[test]
    fn test_account_view_deserialize_partial() {
        let view: AccountView = serde_json::from_str(r#"{"name": "Cash"}"#).unwrap();
        assert_eq!(view.id, None);
        assert_eq!(view.name, Some("Cash".to_string()));
        assert!(view.calculated_balance.is_none());
    }
}
