use axum::{extract::State, http::StatusCode, Json};
use ninegeek_api::{Comment, LoginRequest, LoginResponse, NewComment, NewThread, Thread};

use crate::{extractors::*, Error};

pub async fn login(ValidJson(data): ValidJson<LoginRequest>) -> Json<LoginResponse> {
    Json(LoginResponse::logged_in(data.username))
}

pub async fn create_thread(
    State(store): State<DynStore>,
    ValidJson(data): ValidJson<NewThread>,
) -> Result<(StatusCode, Json<Thread>), Error> {
    let thread = store.create_thread(data).await?;
    tracing::info!(id = ?thread.id, "created thread");
    Ok((StatusCode::CREATED, Json(thread)))
}

pub async fn list_threads(State(store): State<DynStore>) -> Result<Json<Vec<Thread>>, Error> {
    Ok(Json(store.list_threads().await?))
}

pub async fn get_thread(
    State(store): State<DynStore>,
    ThreadIdParam(id): ThreadIdParam,
) -> Result<Json<Thread>, Error> {
    Ok(Json(store.get_thread(id).await?))
}

pub async fn create_comment(
    State(store): State<DynStore>,
    ThreadIdParam(thread): ThreadIdParam,
    ValidJson(data): ValidJson<NewComment>,
) -> Result<(StatusCode, Json<Comment>), Error> {
    let comment = store.create_comment(thread, data).await?;
    tracing::info!(?thread, id = ?comment.id, "created comment");
    Ok((StatusCode::CREATED, Json(comment)))
}

pub async fn list_comments(
    State(store): State<DynStore>,
    ThreadIdParam(thread): ThreadIdParam,
) -> Result<Json<Vec<Comment>>, Error> {
    Ok(Json(store.list_comments(thread).await?))
}
