pub mod auth;
pub mod dashboards;
pub mod health;
pub mod public;

#[cfg(test)]
mod tests;
