//! Authentication route handlers.
//!
//! Login delegates entirely to the backend session endpoint; the storefront
//! only caches the issued bearer token in the session.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::Redirect,
};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use driftwood_core::Email;

use crate::error::Result;
use crate::filters;
use crate::identity::{clear_credential, ensure_identity};
use crate::models::flash::{self, Notice};
use crate::models::{CurrentUser, session_keys};
use crate::state::AppState;

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub notices: Vec<Notice>,
}

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

/// Response of `POST /accounts/login`.
#[derive(Debug, Deserialize)]
struct LoginResponse {
    token: String,
    email: Email,
    #[serde(default)]
    staff: bool,
}

/// Display login page.
pub async fn login_page(session: Session) -> LoginTemplate {
    LoginTemplate {
        notices: flash::take_notices(&session).await,
    }
}

/// Log in against the backend.
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Result<Redirect> {
    // The guest identity rides along so the backend can adopt the guest cart.
    let identity = ensure_identity(&session, state.api()).await?;

    let response: std::result::Result<LoginResponse, _> = state
        .api()
        .post(
            "/accounts/login",
            &identity,
            &LoginRequest {
                email: &form.email,
                password: &form.password,
            },
        )
        .await;

    match response {
        Ok(login) => {
            session
                .insert(
                    session_keys::CURRENT_USER,
                    &CurrentUser {
                        email: login.email,
                        token: login.token,
                        staff: login.staff,
                    },
                )
                .await
                .map_err(crate::error::AppError::Session)?;
            Ok(Redirect::to("/account"))
        }
        Err(err) => {
            flash::push_notice(&session, Notice::error(err.user_message())).await;
            Ok(Redirect::to("/auth/login"))
        }
    }
}

/// Log out: drop the cached credential and silently return home.
///
/// The guest token survives so the visitor keeps a working identity.
#[instrument(skip_all)]
pub async fn logout(session: Session) -> Result<Redirect> {
    clear_credential(&session).await?;
    Ok(Redirect::to("/"))
}
