use axum::Json;
use axum::extract::Query;

use crate::dto::{GenericMessageResponse, PublicEntryQuery};
use crate::handlers::dashboards::UNAUTHORIZED_NOTICE;

/// GET / - Public entry point.
pub async fn public_entry_handler(
    Query(query): Query<PublicEntryQuery>,
) -> Json<GenericMessageResponse> {
    let message = match query.notice.as_deref() {
        Some(UNAUTHORIZED_NOTICE) => "you do not have access to that page",
        _ => "welcome to techdesk",
    };

    Json(GenericMessageResponse {
        message: message.to_owned(),
    })
}
