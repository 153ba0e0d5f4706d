use serde::{Deserialize, Serialize};

/// A single owner-scoped shopping list document.
///
/// Serialized field names match the store's document shape
/// (`{id, ownerId, name, items}`), which is also what the cache persists.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ShoppingList {
    /// Store-assigned identifier, present only once the list has been persisted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Identifier of the authenticated user who owns the list.
    pub owner_id: String,

    /// Display name of the list.
    pub name: String,

    /// Items on the list (two in this version).
    pub items: Vec<String>,
}

/// Ordered sequence of lists: most-recently-added-first for local inserts,
/// store order for remote snapshots.
pub type ListCollection = Vec<ShoppingList>;

impl ShoppingList {
    /// Build a list that has not been persisted yet.
    pub fn new(
        owner_id: impl Into<String>,
        name: impl Into<String>,
        items: Vec<String>,
    ) -> Self {
        Self {
            id: None,
            owner_id: owner_id.into(),
            name: name.into(),
            items,
        }
    }

    /// Shallow pre-insert validation: the fields must be present. Individual
    /// item strings may be blank.
    pub fn is_insertable(&self) -> bool {
        !self.owner_id.is_empty() && !self.name.is_empty() && !self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_store_field_names() {
        let list = ShoppingList::new("u1", "Groceries", vec!["Milk".into(), "Eggs".into()]);
        let json = serde_json::to_value(&list).unwrap();
        assert_eq!(json["ownerId"], "u1");
        assert_eq!(json["name"], "Groceries");
        assert_eq!(json["items"][1], "Eggs");
        // No id slot until the store assigns one.
        assert!(json.get("id").is_none());
    }

    #[test]
    fn deserializes_persisted_document() {
        let json = r#"{"id":"1","ownerId":"u1","name":"Groceries","items":["Milk","Eggs"]}"#;
        let list: ShoppingList = serde_json::from_str(json).unwrap();
        assert_eq!(list.id.as_deref(), Some("1"));
        assert_eq!(list.owner_id, "u1");
    }

    #[test]
    fn validation_checks_presence_only() {
        let ok = ShoppingList::new("u1", "Hardware", vec!["Nails".into(), "Hammer".into()]);
        assert!(ok.is_insertable());

        // Blank item strings are accepted.
        let blank_items = ShoppingList::new("u1", "Hardware", vec![String::new(), String::new()]);
        assert!(blank_items.is_insertable());

        let no_name = ShoppingList::new("u1", "", vec!["Nails".into()]);
        assert!(!no_name.is_insertable());

        let no_owner = ShoppingList::new("", "Hardware", vec!["Nails".into()]);
        assert!(!no_owner.is_insertable());

        let no_items = ShoppingList::new("u1", "Hardware", vec![]);
        assert!(!no_items.is_insertable());
    }
}
