use crate::errors::{AppError, AppResult};
use crate::models::{ConfigItem, ConfigItemType, GlobalParameter, UserGroup};
use crate::permissions::ConfigItemDraft;
use crate::services::admin;
use crate::store::KeyValueStore;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AdminTab {
    #[default]
    Services,
    Systems,
    Requests,
    Tasks,
    Parameters,
}

impl AdminTab {
    /// Config item type listed on the tab; the parameters tab has none.
    pub fn item_type(self) -> Option<ConfigItemType> {
        match self {
            Self::Services => Some(ConfigItemType::Service),
            Self::Systems => Some(ConfigItemType::System),
            Self::Requests => Some(ConfigItemType::Request),
            Self::Tasks => Some(ConfigItemType::Task),
            Self::Parameters => None,
        }
    }
}

pub struct AdminPage {
    store: Arc<KeyValueStore>,
    tab: AdminTab,
    draft: Option<ConfigItemDraft>,
}

impl AdminPage {
    pub fn new(store: Arc<KeyValueStore>) -> Self {
        Self {
            store,
            tab: AdminTab::default(),
            draft: None,
        }
    }

    pub fn tab(&self) -> AdminTab {
        self.tab
    }

    /// Switching tabs discards an open form.
    pub fn set_tab(&mut self, tab: AdminTab) {
        self.tab = tab;
        self.draft = None;
    }

    /// Items of the active tab's type, sorted by `order`.
    pub fn items(&self) -> Vec<ConfigItem> {
        let Some(item_type) = self.tab.item_type() else {
            return Vec::new();
        };
        let mut items = admin::get_config_items_by_type(&self.store, item_type);
        admin::sort_by_order(&mut items);
        items
    }

    pub fn draft(&self) -> Option<&ConfigItemDraft> {
        self.draft.as_ref()
    }

    pub fn draft_mut(&mut self) -> Option<&mut ConfigItemDraft> {
        self.draft.as_mut()
    }

    pub fn open_create(&mut self) -> AppResult<&mut ConfigItemDraft> {
        let item_type = self
            .tab
            .item_type()
            .ok_or_else(|| AppError::Validation("the parameters tab has no config items".to_string()))?;
        Ok(self.draft.insert(ConfigItemDraft::new(item_type)))
    }

    pub fn open_edit(&mut self, item_id: &str) -> AppResult<&mut ConfigItemDraft> {
        let item = admin::get_config_item_by_id(&self.store, item_id)
            .ok_or_else(|| AppError::NotFound(format!("config item {item_id}")))?;
        Ok(self.draft.insert(ConfigItemDraft::from_item(&item)))
    }

    pub fn cancel_draft(&mut self) {
        self.draft = None;
    }

    /// Items of the draft's type that may be offered as its parent.
    pub fn parent_candidates(&self) -> Vec<ConfigItem> {
        match &self.draft {
            Some(draft) => admin::get_config_items_by_type(&self.store, draft.item_type),
            None => Vec::new(),
        }
    }

    pub fn select_parent(&mut self, parent_id: Option<&str>) -> AppResult<()> {
        let candidates = self.parent_candidates();
        let draft = self.draft_or_err()?;
        draft.select_parent(parent_id, &candidates)
    }

    pub fn set_inherit_permissions(&mut self, enabled: bool) -> AppResult<()> {
        let candidates = self.parent_candidates();
        let draft = self.draft_or_err()?;
        draft.set_inherit_permissions(enabled, &candidates);
        Ok(())
    }

    /// Persists the open form and closes it. An invalid form stays open.
    pub fn save_draft(&mut self) -> AppResult<ConfigItem> {
        let draft = self
            .draft
            .clone()
            .ok_or_else(|| AppError::Validation("no config item form is open".to_string()))?;
        let item = draft.build()?;
        self.draft = None;
        Ok(admin::save_config_item(&self.store, item))
    }

    fn draft_or_err(&mut self) -> AppResult<&mut ConfigItemDraft> {
        self.draft
            .as_mut()
            .ok_or_else(|| AppError::Validation("no config item form is open".to_string()))
    }

    pub fn delete_item(&mut self, item_id: &str) {
        admin::delete_config_item(&self.store, item_id);
    }

    pub fn toggle_published(&mut self, item_id: &str, published: bool) {
        admin::toggle_item_published(&self.store, item_id, published);
    }

    /// Saves a duplicate under a fresh id, named "Copy: ...".
    pub fn copy_item(&mut self, item_id: &str) -> Option<ConfigItem> {
        let mut item = admin::get_config_item_by_id(&self.store, item_id)?;
        item.id = format!("{}-{}", item.item_type.as_str(), Uuid::new_v4().simple());
        item.name = format!("Copy: {}", item.name);
        Some(admin::save_config_item(&self.store, item))
    }

    pub fn global_params(&self) -> Vec<GlobalParameter> {
        admin::get_all_global_params(&self.store)
    }

    /// Parses form text according to the parameter's type and stores it.
    pub fn update_param(&mut self, param_id: &str, raw: &str) -> AppResult<GlobalParameter> {
        let mut param = admin::get_global_param_by_id(&self.store, param_id)
            .ok_or_else(|| AppError::NotFound(format!("global parameter {param_id}")))?;
        param.value = admin::parse_param_input(param.param_type, raw)?;
        admin::update_global_param_value(&self.store, param_id, param.value.clone());
        Ok(param)
    }

    pub fn user_groups(&self) -> Vec<UserGroup> {
        admin::get_all_user_groups(&self.store)
    }
}
