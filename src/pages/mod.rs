//! Page controllers: the state each screen holds and the transitions its
//! controls trigger, expressed over the data services.

pub mod admin;
pub mod requests;
pub mod services;
pub mod support;
pub mod systems;
pub mod tasks;

pub use admin::{AdminPage, AdminTab};
pub use requests::{RequestGroup, RequestsPage};
pub use services::{CatalogTab, CatalogView, ServicesCatalogPage};
pub use support::{SupportPage, SupportTab};
pub use systems::SystemsCatalogPage;
pub use tasks::{TaskTab, TasksPage};

use crate::models::System;
use crate::services::systems as system_service;
use crate::store::KeyValueStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Systems,
    Services,
    Requests,
    Tasks,
    Support,
    Admin,
}

impl Route {
    pub const ALL: [Route; 6] = [
        Route::Systems,
        Route::Services,
        Route::Requests,
        Route::Tasks,
        Route::Support,
        Route::Admin,
    ];

    /// Resolves a URL path. `/` lands on the services catalog.
    pub fn resolve(path: &str) -> Option<Self> {
        let trimmed = path.trim();
        let normalized = trimmed.trim_end_matches('/');
        match normalized {
            "" if trimmed.starts_with('/') => Some(Self::Services),
            "/systems" => Some(Self::Systems),
            "/services" => Some(Self::Services),
            "/requests" => Some(Self::Requests),
            "/tasks" => Some(Self::Tasks),
            "/support" => Some(Self::Support),
            "/admin" => Some(Self::Admin),
            _ => None,
        }
    }

    pub fn path(self) -> &'static str {
        match self {
            Self::Systems => "/systems",
            Self::Services => "/services",
            Self::Requests => "/requests",
            Self::Tasks => "/tasks",
            Self::Support => "/support",
            Self::Admin => "/admin",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::Systems => "Systems",
            Self::Services => "Service catalog",
            Self::Requests => "Requests",
            Self::Tasks => "My tasks",
            Self::Support => "Support desk",
            Self::Admin => "Administration",
        }
    }
}

/// `(id, name)` pairs for the system selector in request filters.
pub fn system_options(store: &KeyValueStore) -> Vec<(String, String)> {
    system_service::get_all_systems(store)
        .into_iter()
        .map(|System { id, name, .. }| (id, name))
        .collect()
}
