//! Account endpoints: registration and the caller's own profile.

use api_types::user::{ProfileUpdate, Register, UserView};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use engine::{NewUser, ProfileChanges, User, UserProfile};

use crate::{ServerError, server::ServerState};

fn user_view(profile: UserProfile, with_email: bool) -> UserView {
    let UserProfile { user, ads_count } = profile;
    UserView {
        username: user.username,
        email: with_email.then_some(user.email),
        first_name: user.first_name,
        last_name: user.last_name,
        date_joined: user.date_joined,
        ads_count,
    }
}

/// Handle requests for creating a new account
pub async fn register(
    State(state): State<ServerState>,
    Json(payload): Json<Register>,
) -> Result<(StatusCode, Json<UserView>), ServerError> {
    if payload.password != payload.password2 {
        return Err(ServerError::Generic("passwords do not match".to_string()));
    }

    let user = state
        .engine
        .register(NewUser {
            username: payload.username,
            email: payload.email,
            password: payload.password,
            first_name: payload.first_name,
            last_name: payload.last_name,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(user_view(
            UserProfile {
                user,
                ads_count: 0,
            },
            true,
        )),
    ))
}

pub async fn me(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
) -> Result<Json<UserView>, ServerError> {
    let profile = state.engine.user_profile(&user.username).await?;
    Ok(Json(user_view(profile, true)))
}

pub async fn update_me(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Json(payload): Json<ProfileUpdate>,
) -> Result<Json<UserView>, ServerError> {
    state
        .engine
        .update_profile(
            &user.username,
            ProfileChanges {
                email: payload.email,
                first_name: payload.first_name,
                last_name: payload.last_name,
            },
        )
        .await?;
    let profile = state.engine.user_profile(&user.username).await?;
    Ok(Json(user_view(profile, true)))
}

/// Delete the caller's account with all of its ads and their proposals
pub async fn delete_me(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
) -> Result<StatusCode, ServerError> {
    state.engine.delete_account(&user.username).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Public profile, without the email address
pub async fn profile(
    State(state): State<ServerState>,
    Path(username): Path<String>,
) -> Result<Json<UserView>, ServerError> {
    let profile = state.engine.user_profile(&username).await?;
    Ok(Json(user_view(profile, false)))
}
