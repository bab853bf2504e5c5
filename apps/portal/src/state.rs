use techdesk_application::SessionAuthority;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub authority: SessionAuthority,
}
