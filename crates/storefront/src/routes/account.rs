//! Account route handlers.
//!
//! These routes require authentication.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Multipart, State},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::filters;
use crate::identity::{self, Identity, SessionCredential};
use crate::middleware::auth::RequireAuth;
use crate::models::flash::{self, Notice};
use crate::state::AppState;
use crate::stores::user::{AvatarUpload, CredentialStore, ProfileUpdate};

/// Cascades auth failures from the user store into the session.
struct SessionCredentials<'a> {
    session: &'a Session,
}

impl CredentialStore for SessionCredentials<'_> {
    async fn clear_credential(&self) {
        if let Err(e) = identity::clear_credential(self.session).await {
            tracing::warn!("failed to clear session credential: {e}");
        }
    }
}

/// Profile display data for templates.
#[derive(Clone)]
pub struct ProfileView {
    pub email: String,
    pub display_name: String,
    pub phone: Option<String>,
    pub avatar_url: Option<String>,
}

/// Account overview page template.
#[derive(Template, WebTemplate)]
#[template(path = "account/index.html")]
pub struct AccountIndexTemplate {
    pub profile: Option<ProfileView>,
    pub error: Option<String>,
    pub notices: Vec<Notice>,
}

/// Display account overview page.
///
/// An auth failure while fetching the profile clears the credential (the
/// store cascades it) and bounces back to login.
#[instrument(skip(state, session))]
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
) -> Result<Response> {
    let store = state
        .user_store(Identity::User(SessionCredential::new(user.token)));

    let view = store.fetch(&SessionCredentials { session: &session }).await;

    // Credential was invalidated mid-request; re-authenticate.
    if view.data.is_none()
        && session
            .get::<crate::models::CurrentUser>(crate::models::session_keys::CURRENT_USER)
            .await
            .map_err(AppError::Session)?
            .is_none()
    {
        flash::push_notice(
            &session,
            Notice::error("Your session has expired. Please sign in again."),
        )
        .await;
        return Ok(Redirect::to("/auth/login").into_response());
    }

    let profile = view.data.map(|profile| ProfileView {
        email: profile.email.to_string(),
        display_name: profile.display_name(),
        phone: profile.phone.clone(),
        avatar_url: profile.avatar_url.clone(),
    });

    Ok(AccountIndexTemplate {
        profile,
        error: view.error,
        notices: flash::take_notices(&session).await,
    }
    .into_response())
}

/// Update the profile from a multipart form (optional avatar upload).
#[instrument(skip_all)]
pub async fn update_profile(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    mut multipart: Multipart,
) -> Result<Redirect> {
    let mut update = ProfileUpdate::default();
    let mut avatar = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        match field.name() {
            Some("first_name") => {
                update.first_name = Some(read_text(field).await?);
            }
            Some("last_name") => {
                update.last_name = Some(read_text(field).await?);
            }
            Some("phone") => {
                update.phone = Some(read_text(field).await?);
            }
            Some("avatar") => {
                let file_name = field.file_name().unwrap_or("avatar").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                // An empty file input still submits a part; skip it.
                if !bytes.is_empty() {
                    avatar = Some(AvatarUpload {
                        file_name,
                        content_type,
                        bytes: bytes.to_vec(),
                    });
                }
            }
            _ => {}
        }
    }

    let store = state
        .user_store(Identity::User(SessionCredential::new(user.token)));
    let view = store.update_profile(update, avatar).await;

    let notice = match view.error {
        Some(message) => Notice::error(message),
        None => Notice::success("Profile updated."),
    };
    flash::push_notice(&session, notice).await;

    Ok(Redirect::to("/account"))
}

async fn read_text(field: axum::extract::multipart::Field<'_>) -> Result<String> {
    field
        .text()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))
}
