use askama::Template;
use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use crate::db::models::Badge;
use crate::db::{rewards, statistics};
use crate::error::AppResult;
use crate::extractors::PageContext;
use crate::leaderboard::{self, RankedEntry, SortKey};
use crate::progress::challenge_complete;
use crate::state::AppState;

/// Wrapper to render askama templates as axum responses
pub struct Html<T: Template>(pub T);

impl<T: Template> IntoResponse for Html<T> {
    fn into_response(self) -> Response {
        match self.0.render() {
            Ok(body) => (
                StatusCode::OK,
                [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
                body,
            )
                .into_response(),
            Err(e) => {
                tracing::error!("Template render error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Template error").into_response()
            }
        }
    }
}

pub struct SortLink {
    pub query_name: &'static str,
    pub label: &'static str,
    pub active: bool,
}

pub struct ChallengeView {
    pub id: i64,
    pub name: String,
    pub deadline: String,
    pub badges: Vec<Badge>,
    /// False for anonymous visitors, who get no completion status.
    pub show_status: bool,
    pub complete: bool,
}

#[derive(Template)]
#[template(path = "pages/index.html")]
pub struct IndexTemplate {
    pub ctx: PageContext,
    pub sort_links: Vec<SortLink>,
    pub entries: Vec<RankedEntry>,
    pub challenges: Vec<ChallengeView>,
}

#[derive(Deserialize)]
pub struct IndexParams {
    pub sort: Option<String>,
}

/// GET /: leaderboard and active challenges
pub async fn index(
    State(state): State<AppState>,
    Query(params): Query<IndexParams>,
    ctx: PageContext,
) -> AppResult<Response> {
    let key = SortKey::parse(params.sort.as_deref());
    let conn = state.db.get()?;

    let entries = leaderboard::rank(statistics::ordered_by(&conn, key)?);

    let viewer = ctx.user.as_ref().map(|u| u.id);
    let mut challenges = Vec::new();
    for challenge in rewards::active_challenges(&conn)? {
        let badges = rewards::challenge_badges(&conn, challenge.id)?;
        let complete = match viewer {
            Some(user_id) => challenge_complete(
                rewards::completed_count(&conn, user_id, challenge.id)?,
                badges.len() as i64,
            ),
            None => false,
        };
        challenges.push(ChallengeView {
            id: challenge.id,
            name: challenge.name,
            deadline: challenge.deadline,
            badges,
            show_status: viewer.is_some(),
            complete,
        });
    }

    let sort_links = SortKey::ALL
        .into_iter()
        .map(|k| SortLink {
            query_name: k.query_name(),
            label: k.label(),
            active: k == key,
        })
        .collect();

    Ok(ctx.render(|ctx| IndexTemplate {
        ctx,
        sort_links,
        entries,
        challenges,
    }))
}
