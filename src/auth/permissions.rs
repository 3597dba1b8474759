use crate::db::models::User;
use crate::error::{AppError, AppResult};
use crate::extractors::CurrentUser;

pub const DENIED: &str = "Vous n'avez pas la permission d'accéder à cette page.";
pub const PROFILE_DENIED: &str = "Vous n'avez pas la permission de voir ce profil.";

/// What a request is about to do on behalf of a user.
#[derive(Debug, Clone, Copy)]
pub enum Capability<'a> {
    /// Moderation, authoring and the admin views. Staff only.
    Administer,
    /// Acting on something created by the given user id.
    Own(i64),
    /// Looking at another account's profile.
    ViewProfile(&'a User),
}

impl Capability<'_> {
    pub fn allows(&self, user: &CurrentUser) -> bool {
        match self {
            Capability::Administer => user.is_admin(),
            Capability::Own(creator_id) => user.id == *creator_id,
            Capability::ViewProfile(target) => {
                user.id == target.id || user.is_privileged() || !target.is_privileged()
            }
        }
    }

    fn denial(&self) -> &'static str {
        match self {
            Capability::ViewProfile(_) => PROFILE_DENIED,
            _ => DENIED,
        }
    }
}

/// Gate a handler. A refusal becomes a flash and a redirect home.
pub fn check(user: &CurrentUser, capability: Capability<'_>) -> AppResult<()> {
    if capability.allows(user) {
        Ok(())
    } else {
        tracing::warn!(user = %user.username, ?capability, "permission denied");
        Err(AppError::PermissionDenied(capability.denial().to_string()))
    }
}
