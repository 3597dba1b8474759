use askama::Template;
use axum::extract::FromRequestParts;
use axum::http::header;
use axum::http::request::Parts;
use axum::response::{AppendHeaders, IntoResponse, Response};
use rusqlite::{params, Connection};

use crate::auth::cookie_value;
use crate::db::optional;
use crate::error::{AppError, AppResult};
use crate::flash::{self, Flash};
use crate::routes::home::Html;
use crate::state::AppState;

/// Represents the currently authenticated user.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: i64,
    pub username: String,
    pub is_staff: bool,
    pub is_superuser: bool,
}

impl CurrentUser {
    /// The single administrative predicate.
    pub fn is_admin(&self) -> bool {
        self.is_staff
    }

    /// Sees staff and superuser accounts in the directory.
    pub fn is_privileged(&self) -> bool {
        self.is_staff || self.is_superuser
    }
}

/// Resolve a session token to its active account.
pub fn lookup_session(conn: &Connection, token: &str) -> rusqlite::Result<Option<CurrentUser>> {
    optional(conn.query_row(
        "SELECT u.id, u.username, u.is_staff, u.is_superuser FROM sessions s \
         JOIN users u ON u.id = s.user_id \
         WHERE s.token = ?1 AND s.expires_at > datetime('now') AND u.is_active = 1",
        params![token],
        |row| {
            Ok(CurrentUser {
                id: row.get(0)?,
                username: row.get(1)?,
                is_staff: row.get(2)?,
                is_superuser: row.get(3)?,
            })
        },
    ))
}

/// Extractor that requires authentication.
/// Rejects with [`AppError::Unauthorized`], which redirects to the login page.
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = cookie_value(&parts.headers, &state.config.auth.cookie_name)
            .ok_or(AppError::Unauthorized)?;

        let conn = state.db.get()?;
        lookup_session(&conn, token)?.ok_or(AppError::Unauthorized)
    }
}

/// Optional user extractor. `None` instead of a redirect when not authenticated.
pub struct MaybeUser(pub Option<CurrentUser>);

impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match CurrentUser::from_request_parts(parts, state).await {
            Ok(user) => Ok(MaybeUser(Some(user))),
            Err(AppError::Unauthorized) => Ok(MaybeUser(None)),
            Err(e) => Err(e),
        }
    }
}

/// Everything the base layout needs: who is browsing and which messages to
/// show. Rendering through it consumes the pending flash cookie.
pub struct PageContext {
    pub user: Option<CurrentUser>,
    pub messages: Vec<Flash>,
    clear_flash: bool,
}

impl FromRequestParts<AppState> for PageContext {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let MaybeUser(user) = MaybeUser::from_request_parts(parts, state).await?;
        let clear_flash =
            cookie_value(&parts.headers, flash::COOKIE).is_some_and(|raw| !raw.is_empty());
        let messages = Flash::from_headers(&parts.headers).into_iter().collect();
        Ok(PageContext {
            user,
            messages,
            clear_flash,
        })
    }
}

impl PageContext {
    /// The signed-in user, or a redirect to the login page.
    pub fn require_user(&self) -> AppResult<CurrentUser> {
        self.user.clone().ok_or(AppError::Unauthorized)
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    pub fn is_admin(&self) -> bool {
        self.user.as_ref().is_some_and(CurrentUser::is_admin)
    }

    pub fn username(&self) -> &str {
        self.user.as_ref().map_or("", |u| u.username.as_str())
    }

    /// Show a message on the page being rendered right now.
    pub fn push(&mut self, flash: Flash) {
        self.messages.push(flash);
    }

    pub fn render<T, F>(self, build: F) -> Response
    where
        T: Template,
        F: FnOnce(PageContext) -> T,
    {
        let clear = self
            .clear_flash
            .then(|| (header::SET_COOKIE, flash::clear_cookie()));
        (AppendHeaders(clear), Html(build(self))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::session::create_session;
    use crate::db::test_support::migrated_pool;
    use crate::db::users::{insert_plain, Roles};

    #[test]
    fn lookup_resolves_live_sessions_of_active_users() {
        let (_tmp, pool) = migrated_pool();
        let conn = pool.get().unwrap();
        let id = insert_plain(
            &conn,
            "coach",
            Roles {
                is_staff: true,
                is_superuser: false,
            },
        );
        let token = create_session(&conn, id, 1).unwrap();

        let user = lookup_session(&conn, &token).unwrap().unwrap();
        assert_eq!(user.username, "coach");
        assert!(user.is_admin());
        assert!(lookup_session(&conn, "nope").unwrap().is_none());

        conn.execute("UPDATE users SET is_active = 0 WHERE id = ?1", [id])
            .unwrap();
        assert!(lookup_session(&conn, &token).unwrap().is_none());
    }

    #[test]
    fn superuser_without_staff_is_privileged_but_not_admin() {
        let user = CurrentUser {
            id: 1,
            username: "root".into(),
            is_staff: false,
            is_superuser: true,
        };
        assert!(user.is_privileged());
        assert!(!user.is_admin());
    }
}
