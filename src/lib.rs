//! Assetdesk - client core for a role-based IT asset management console.
//!
//! Assetdesk provides the non-visual machinery behind the console's screens:
//!
//! - **Permission**: Role → capability matrix and per-principal queries
//! - **Guard**: Navigation decisions for restricted routes
//! - **Interceptor**: Credential, error, busy-tracking and timeout stages around every request
//! - **Search**: Debounced free-text search plus immediate filter commits
//! - **Table**: Server-paginated, sortable lists with role-gated row actions
//! - **Config**: Layered configuration (file → env → overrides)
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use assetdesk::{ApiClient, ConfigLoader, DataTableController, HyperTransport, LoadingCounter,
//!     Overrides, SearchFilterController, Session, TableCommand, TracingNotifier};
//!
//! #[tokio::main]
//! async fn main() -> assetdesk::Result<()> {
//!     let config = ConfigLoader::new("ASSETDESK").load(None, &Overrides::default())?;
//!
//!     let session = Arc::new(Session::new());
//!     let api = Arc::new(ApiClient::from_config(
//!         &config,
//!         Arc::new(HyperTransport::new()),
//!         Arc::clone(&session),
//!         Arc::new(TracingNotifier),
//!         LoadingCounter::new(),
//!     )?);
//!     api.login(&assetdesk::api::Credentials::new("admin@example.com", "secret")).await?;
//!
//!     let search = SearchFilterController::new(Vec::new(), config.lists.debounce());
//!     let mut assets = DataTableController::<serde_json::Value>::new(
//!         Vec::new(),
//!         api.page_source("/assets"),
//!         config.lists.page_size,
//!     );
//!     let (commands, mut inbox) = tokio::sync::mpsc::channel(16);
//!     commands.send(TableCommand::Reload).await.ok();
//!     assets.drive(&mut search.subscribe(), &mut inbox).await;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod auth;
pub mod authority;
pub mod config;
pub mod debounce;
pub mod error;
pub mod filter;
pub mod guard;
pub mod http;
pub mod interceptor;
pub mod loading;
pub mod notify;
pub mod permission;
pub mod routes;
pub mod search;
pub mod table;

// Re-export main types at crate root
pub use api::ApiClient;
pub use auth::{Principal, Session};
pub use authority::RoleAuthority;
pub use config::{Config, ConfigLoader, Overrides};
pub use error::{Error, Result};
pub use filter::{FilterOption, FilterQuery, FilterState, FilterValue};
pub use guard::{Decision, NavigationGuard};
pub use http::{HttpFailure, HyperTransport, Request, Response, Transport};
pub use interceptor::{Chain, Interceptor};
pub use loading::LoadingCounter;
pub use notify::{Notifier, TracingNotifier};
pub use permission::{Capability, CapabilitySet, PermissionMatrix, Role};
pub use routes::RouteTable;
pub use search::SearchFilterController;
pub use table::{DataTableController, Page, PageQuery, PageSource, SortState, TableCommand};

// Re-export commonly used dependencies for convenience
pub use hyper::{Method, StatusCode};
