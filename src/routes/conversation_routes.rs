use axum::{Router, routing::get};
use crate::{AppState, controllers::conversations_controller};

pub fn add_routes(router: Router<AppState>) -> Router<AppState> {
    router
        .route(
            "/api/conversations",
            get(conversations_controller::list_conversations)
                .post(conversations_controller::create_conversation),
        )
        .route(
            "/api/conversations/:id",
            get(conversations_controller::get_conversation)
                .delete(conversations_controller::delete_conversation),
        )
}
