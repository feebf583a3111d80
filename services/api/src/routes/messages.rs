use axum::{
    Json, Router,
    extract::{Query, State},
    routing::{get, post},
};
use common::{
    auth::AuthUser,
    response::{ApiError, ApiResponse, ApiResult, Pagination},
    validation::Payload,
};
use tracing::debug;

use crate::{
    models::{
        PageQuery,
        message::{Conversation, Message, OutgoingMessage, Party, ThreadQuery},
    },
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/messages/conversations", get(conversations))
        .route("/messages/thread", get(thread))
        .route("/messages/send", post(send))
}

fn me(user: &AuthUser) -> Party {
    Party {
        role: user.role,
        id: user.id,
    }
}

async fn conversations(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<PageQuery>,
) -> ApiResult<ApiResponse<Vec<Conversation>>> {
    let page = Pagination::new(query.page, query.limit, 20, 50);
    let (rows, total) = state.repos.messages.conversations(me(&user), page).await?;
    let conversations = rows.into_iter().map(Conversation::from).collect();
    Ok(ApiResponse::paginated(conversations, page.meta(total)))
}

/// The exchange with one counterpart; everything they sent becomes read
async fn thread(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<ThreadQuery>,
) -> ApiResult<ApiResponse<Vec<Message>>> {
    let other = query.counterpart()?;
    let page = Pagination::new(query.page, query.limit, 50, 200);

    let messages = &state.repos.messages;
    let thread = messages.thread(me(&user), other, page).await?;
    let read = messages.mark_read(me(&user), other).await?;
    debug!("Marked {} messages from {} {} as read", read, other.role, other.id);

    Ok(ApiResponse::ok(thread))
}

async fn send(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<Payload>,
) -> ApiResult<ApiResponse<Message>> {
    let outgoing = OutgoingMessage::from_payload(&payload)?;
    let sender = me(&user);
    if outgoing.receiver == sender {
        return Err(ApiError::BadRequest(
            "Cannot send a message to yourself".to_string(),
        ));
    }

    let messages = &state.repos.messages;
    if !messages.party_exists(outgoing.receiver).await? {
        return Err(ApiError::not_found("Recipient"));
    }
    if let Some(booking_id) = outgoing.booking_id {
        state
            .repos
            .bookings
            .find(booking_id)
            .await?
            .filter(|booking| booking.is_visible_to(user.role, user.id))
            .ok_or_else(|| ApiError::not_found("Booking"))?;
    }

    let message = messages.send(sender, &outgoing).await?;
    Ok(ApiResponse::created(message).with_message("Message sent"))
}
