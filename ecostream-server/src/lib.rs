//! eco-stream server library - REST API components for users, items and files
//!
//! This library exposes the server components for use in integration tests.
//! The main binary uses these same components.

pub mod auth;
pub mod config;
pub mod db;
pub mod deadline;
pub mod error;
pub mod handlers;
pub mod multipart;
pub mod object_store;
pub mod openapi;
pub mod routes;
pub mod state;
pub mod validation;

pub use auth::{SessionKeys, SessionUser, StaticToken};
pub use config::Config;
pub use db::{
    Item, ItemRepository, KeyValueStore, PostgresStore, StoreBackend, StoreError, UpdateItem,
    UpdateUser, User, UserRepository, UserResponse,
};
pub use deadline::{Deadline, DeadlineExceeded};
pub use error::ApiError;
pub use object_store::{ObjectStore, ObjectStoreError, StoredObject};
pub use openapi::ApiDoc;
pub use routes::{create_router, create_router_with_state};
pub use state::AppState;
