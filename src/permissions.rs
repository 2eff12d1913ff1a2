//! Create/edit form state for admin config items.
//!
//! Access groups are inherited from the parent by copying them into the
//! draft at the moment the parent is chosen or inheritance is switched on.
//! Nothing links the two afterwards: later edits to the parent do not reach
//! the child, and switching inheritance off keeps whatever was copied.

use crate::errors::{AppError, AppResult};
use crate::models::{ConfigItem, ConfigItemType};
use serde_json::Value;
use std::collections::BTreeMap;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub struct ConfigItemDraft {
    pub id: Option<String>,
    pub name: String,
    pub description: String,
    pub published: bool,
    pub order: i64,
    pub url: String,
    pub item_type: ConfigItemType,
    pub admin_groups: Vec<String>,
    pub user_groups: Vec<String>,
    parent_id: Option<String>,
    inherit_permissions: bool,
    metadata: Option<BTreeMap<String, Value>>,
}

/// One entry of the parent selector.
#[derive(Debug, Clone, PartialEq)]
pub struct ParentOption<'a> {
    pub item: &'a ConfigItem,
    pub disabled: bool,
}

impl ConfigItemDraft {
    pub fn new(item_type: ConfigItemType) -> Self {
        Self {
            id: None,
            name: String::new(),
            description: String::new(),
            published: true,
            order: 0,
            url: String::new(),
            item_type,
            admin_groups: Vec::new(),
            user_groups: Vec::new(),
            parent_id: None,
            inherit_permissions: false,
            metadata: None,
        }
    }

    /// Opens an existing item. Inheritance starts on iff it has a parent.
    pub fn from_item(item: &ConfigItem) -> Self {
        Self {
            id: Some(item.id.clone()),
            name: item.name.clone(),
            description: item.description.clone().unwrap_or_default(),
            published: item.published,
            order: item.order,
            url: item.url.clone().unwrap_or_default(),
            item_type: item.item_type,
            admin_groups: item.admin_groups.clone(),
            user_groups: item.user_groups.clone(),
            parent_id: item.parent_id.clone(),
            inherit_permissions: item.parent_id.is_some(),
            metadata: item.metadata.clone(),
        }
    }

    pub fn is_edit(&self) -> bool {
        self.id.is_some()
    }

    pub fn parent_id(&self) -> Option<&str> {
        self.parent_id.as_deref()
    }

    pub fn inherit_permissions(&self) -> bool {
        self.inherit_permissions
    }

    /// Sets the parent from `candidates`; `None` or an empty id clears it.
    ///
    /// With inheritance on, the parent's groups are copied immediately.
    pub fn select_parent(&mut self, parent_id: Option<&str>, candidates: &[ConfigItem]) -> AppResult<()> {
        let Some(parent_id) = parent_id.filter(|id| !id.is_empty()) else {
            self.parent_id = None;
            return Ok(());
        };

        if self.id.as_deref() == Some(parent_id) {
            return Err(AppError::Validation(format!(
                "config item {parent_id} cannot be its own parent"
            )));
        }
        let parent = candidates
            .iter()
            .find(|candidate| candidate.id == parent_id)
            .ok_or_else(|| AppError::NotFound(format!("parent config item {parent_id}")))?;

        self.parent_id = Some(parent.id.clone());
        if self.inherit_permissions {
            self.copy_groups_from(parent);
        }
        Ok(())
    }

    /// Switching on with a parent selected copies its groups; switching off
    /// leaves the current groups alone.
    pub fn set_inherit_permissions(&mut self, enabled: bool, candidates: &[ConfigItem]) {
        self.inherit_permissions = enabled;
        if !enabled {
            return;
        }
        let parent = self
            .parent_id
            .as_deref()
            .and_then(|parent_id| candidates.iter().find(|candidate| candidate.id == parent_id));
        if let Some(parent) = parent {
            self.copy_groups_from(parent);
        }
    }

    fn copy_groups_from(&mut self, parent: &ConfigItem) {
        self.admin_groups = parent.admin_groups.clone();
        self.user_groups = parent.user_groups.clone();
    }

    /// Every candidate, with the item being edited disabled.
    pub fn parent_options<'a>(&self, candidates: &'a [ConfigItem]) -> Vec<ParentOption<'a>> {
        candidates
            .iter()
            .map(|item| ParentOption {
                item,
                disabled: self.id.as_deref() == Some(item.id.as_str()),
            })
            .collect()
    }

    pub fn can_submit(&self) -> bool {
        !self.name.trim().is_empty()
    }

    /// Produces the item to save, generating `<type>-<uuid>` for new items.
    pub fn build(self) -> AppResult<ConfigItem> {
        if !self.can_submit() {
            return Err(AppError::Validation("config item name is required".to_string()));
        }

        let id = self
            .id
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| format!("{}-{}", self.item_type.as_str(), Uuid::new_v4().simple()));

        Ok(ConfigItem {
            id,
            name: self.name,
            description: Some(self.description).filter(|value| !value.is_empty()),
            published: self.published,
            parent_id: self.parent_id,
            order: self.order,
            url: Some(self.url).filter(|value| !value.is_empty()),
            admin_groups: self.admin_groups,
            user_groups: self.user_groups,
            item_type: self.item_type,
            metadata: self.metadata,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, admin: &[&str], users: &[&str]) -> ConfigItem {
        ConfigItem {
            id: id.to_string(),
            name: id.to_string(),
            description: None,
            published: true,
            parent_id: None,
            order: 1,
            url: None,
            admin_groups: admin.iter().map(|group| group.to_string()).collect(),
            user_groups: users.iter().map(|group| group.to_string()).collect(),
            item_type: ConfigItemType::Service,
            metadata: None,
        }
    }

    #[test]
    fn toggling_inherit_copies_parent_groups_once() {
        let mut parents = vec![item("service-1", &["admin"], &["users"])];
        let mut draft = ConfigItemDraft::new(ConfigItemType::Service);
        draft.select_parent(Some("service-1"), &parents).expect("select parent");
        assert!(draft.admin_groups.is_empty());

        draft.set_inherit_permissions(true, &parents);
        assert_eq!(draft.admin_groups, vec!["admin"]);
        assert_eq!(draft.user_groups, vec!["users"]);

        parents[0].admin_groups = vec!["hr".to_string()];
        assert_eq!(draft.admin_groups, vec!["admin"]);

        draft.set_inherit_permissions(false, &parents);
        assert_eq!(draft.admin_groups, vec!["admin"]);
    }

    #[test]
    fn selecting_parent_with_inherit_on_copies_groups() {
        let parents = vec![
            item("service-1", &["admin"], &["users"]),
            item("service-2", &["managers"], &["hr", "developers"]),
        ];
        let mut draft = ConfigItemDraft::new(ConfigItemType::Service);
        draft.set_inherit_permissions(true, &parents);
        draft.select_parent(Some("service-2"), &parents).expect("select parent");
        assert_eq!(draft.admin_groups, vec!["managers"]);
        assert_eq!(draft.user_groups, vec!["hr", "developers"]);

        draft.select_parent(Some(""), &parents).expect("clear parent");
        assert_eq!(draft.parent_id(), None);
        assert_eq!(draft.admin_groups, vec!["managers"]);
    }

    #[test]
    fn item_cannot_be_its_own_parent() {
        let items = vec![item("service-1", &["admin"], &[]), item("service-2", &[], &[])];
        let mut draft = ConfigItemDraft::from_item(&items[0]);
        assert!(!draft.inherit_permissions());

        let error = draft.select_parent(Some("service-1"), &items).expect_err("self parent");
        assert!(error.to_string().starts_with("VALIDATION"));
        assert!(draft.select_parent(Some("unknown"), &items).is_err());

        let disabled: Vec<bool> = draft.parent_options(&items).iter().map(|option| option.disabled).collect();
        assert_eq!(disabled, vec![true, false]);
    }

    #[test]
    fn editing_child_starts_with_inherit_on() {
        let mut child = item("service-9", &["admin"], &["users"]);
        child.parent_id = Some("service-1".to_string());
        let draft = ConfigItemDraft::from_item(&child);
        assert!(draft.inherit_permissions());
        assert!(draft.is_edit());
        assert_eq!(draft.build().expect("build"), child);
    }

    #[test]
    fn build_requires_name_and_generates_typed_id() {
        let mut draft = ConfigItemDraft::new(ConfigItemType::System);
        assert!(!draft.can_submit());
        assert!(draft.clone().build().is_err());

        draft.name = "EDMS".to_string();
        let built = draft.build().expect("build");
        assert!(built.id.starts_with("system-"));
        assert_eq!(built.item_type, ConfigItemType::System);
        assert_eq!(built.description, None);
        assert!(built.published);
    }
}
