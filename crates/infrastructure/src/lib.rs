//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod file_session_store;
mod hosted_auth_service;
mod hosted_backend;
mod hosted_role_store;
mod in_memory_auth_service;
mod in_memory_role_store;

pub use file_session_store::FileSessionStore;
pub use hosted_auth_service::HostedAuthService;
pub use hosted_backend::HostedBackend;
pub use hosted_role_store::HostedRoleStore;
pub use in_memory_auth_service::InMemoryAuthService;
pub use in_memory_role_store::InMemoryRoleStore;
