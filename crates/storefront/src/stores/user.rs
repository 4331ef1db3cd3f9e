//! User store: cached profile with cascading auth invalidation.

use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::instrument;

use driftwood_core::Email;

use crate::api::{ApiClient, ApiError};
use crate::identity::Identity;

use super::{Slice, SliceView, lock};

/// Where the cached credential lives.
///
/// Injected so the store can cascade an auth failure into credential
/// invalidation without knowing about sessions; tests supply a recording
/// fake.
pub trait CredentialStore {
    /// Drop the cached credential so subsequent requests re-authenticate.
    fn clear_credential(&self) -> impl Future<Output = ()> + Send;
}

/// Profile record owned by the backend; the client holds a cached copy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub email: Email,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub avatar_url: Option<String>,
}

impl Profile {
    /// Display name: full name if present, otherwise the email.
    #[must_use]
    pub fn display_name(&self) -> String {
        match (&self.first_name, &self.last_name) {
            (Some(first), Some(last)) => format!("{first} {last}"),
            (Some(first), None) => first.clone(),
            _ => self.email.to_string(),
        }
    }
}

/// Fields a profile update may change. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// An avatar image uploaded alongside a profile update.
#[derive(Debug, Clone)]
pub struct AvatarUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Store for the authenticated user's profile.
pub struct UserStore {
    client: ApiClient,
    identity: Identity,
    slice: Mutex<Slice<Profile>>,
}

impl UserStore {
    /// Create a user store bound to one identity.
    #[must_use]
    pub fn new(client: ApiClient, identity: Identity) -> Self {
        Self {
            client,
            identity,
            slice: Mutex::new(Slice::default()),
        }
    }

    /// Snapshot the slice for rendering.
    #[must_use]
    pub fn view(&self) -> SliceView<Profile> {
        lock(&self.slice).view()
    }

    /// Fetch the profile.
    ///
    /// An auth failure cascades: the cached profile is dropped (the error
    /// stays on the slice) AND the session credential is cleared, so the
    /// next request re-authenticates instead of repeatedly failing.
    #[instrument(skip_all)]
    pub async fn fetch<C: CredentialStore>(&self, credentials: &C) -> SliceView<Profile> {
        let ticket = lock(&self.slice).begin();
        let result: Result<Profile, ApiError> =
            self.client.get("/accounts/me", &self.identity).await;

        let invalidated = matches!(&result, Err(err) if err.is_auth());
        let applied = {
            let mut slice = lock(&self.slice);
            let applied = slice.resolve(ticket, result);
            // A stale auth failure must not wipe a fresher operation's data.
            if applied && invalidated {
                slice.clear_data();
            }
            applied
        };
        if applied && invalidated {
            tracing::info!("auth failure on profile fetch; clearing credential");
            credentials.clear_credential().await;
        }

        self.view()
    }

    /// Update the profile, multipart when an avatar upload is present.
    #[instrument(skip_all)]
    pub async fn update_profile(
        &self,
        update: ProfileUpdate,
        avatar: Option<AvatarUpload>,
    ) -> SliceView<Profile> {
        let ticket = lock(&self.slice).begin();

        let result: Result<Profile, ApiError> = match avatar {
            Some(upload) => {
                let form = build_profile_form(&update, upload);
                match form {
                    Ok(form) => {
                        self.client
                            .patch_multipart("/accounts/me", &self.identity, form)
                            .await
                    }
                    Err(err) => Err(err),
                }
            }
            None => self.client.patch("/accounts/me", &self.identity, &update).await,
        };

        let mut slice = lock(&self.slice);
        slice.resolve(ticket, result);
        slice.view()
    }

    /// Drop the cached profile (logout, identity loss).
    pub fn clear(&self) {
        lock(&self.slice).clear();
    }
}

fn build_profile_form(
    update: &ProfileUpdate,
    avatar: AvatarUpload,
) -> Result<reqwest::multipart::Form, ApiError> {
    let mut form = reqwest::multipart::Form::new();
    if let Some(first_name) = &update.first_name {
        form = form.text("first_name", first_name.clone());
    }
    if let Some(last_name) = &update.last_name {
        form = form.text("last_name", last_name.clone());
    }
    if let Some(phone) = &update.phone {
        form = form.text("phone", phone.clone());
    }
    let part = reqwest::multipart::Part::bytes(avatar.bytes)
        .file_name(avatar.file_name)
        .mime_str(&avatar.content_type)
        .map_err(ApiError::Network)?;
    Ok(form.part("avatar", part))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(email: &str) -> Profile {
        Profile {
            email: Email::parse(email).expect("valid email"),
            first_name: None,
            last_name: None,
            phone: None,
            avatar_url: None,
        }
    }

    #[test]
    fn test_display_name_prefers_full_name() {
        let mut p = profile("jo@example.com");
        assert_eq!(p.display_name(), "jo@example.com");

        p.first_name = Some("Jo".to_string());
        assert_eq!(p.display_name(), "Jo");

        p.last_name = Some("Reyes".to_string());
        assert_eq!(p.display_name(), "Jo Reyes");
    }

    #[test]
    fn test_profile_update_skips_unset_fields() {
        let update = ProfileUpdate {
            first_name: Some("Jo".to_string()),
            ..ProfileUpdate::default()
        };
        let json = serde_json::to_string(&update).expect("serialize");
        assert_eq!(json, r#"{"first_name":"Jo"}"#);
    }
}
