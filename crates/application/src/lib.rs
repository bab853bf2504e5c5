//! Application services and ports.

#![forbid(unsafe_code)]

pub mod route_guard;
mod session_authority;
mod session_ports;

pub use route_guard::GuardDecision;
pub use session_authority::{
    AuthorityConfig, AuthorityState, AuthoritySnapshot, SessionAuthority, SignUpRequest,
};
pub use session_ports::{
    RemoteAuthService, RoleStore, SessionChange, SessionEvent, SessionSubscription,
    SignUpOptions,
};
