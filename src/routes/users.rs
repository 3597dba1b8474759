use askama::Template;
use axum::extract::{Path, Query, State};
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use url::form_urlencoded;

use crate::auth::{check, Capability};
use crate::db::models::User;
use crate::db::users::DirectoryQuery;
use crate::db::{statistics, users};
use crate::error::{found, AppResult};
use crate::extractors::PageContext;
use crate::forms::{account, FormData};
use crate::pagination::{Page, PAGE_SIZE};
use crate::routes::profile::{ProfileTemplate, ProfileView};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", get(search))
        .route("/users/{id}", get(other_profile))
}

#[derive(Template)]
#[template(path = "pages/users.html")]
pub struct UserSearchTemplate {
    pub ctx: PageContext,
    pub search: String,
    pub users: Vec<User>,
    pub page: Page,
    pub previous_href: String,
    pub next_href: String,
}

#[derive(Deserialize)]
pub struct SearchParams {
    pub username: Option<String>,
    pub page: Option<String>,
}

fn page_href(search: &str, page: i64) -> String {
    let mut query = form_urlencoded::Serializer::new(String::new());
    if !search.is_empty() {
        query.append_pair("username", search);
    }
    query.append_pair("page", &page.to_string());
    format!("/users?{}", query.finish())
}

/// GET /users: directory search, 15 per page
pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
    ctx: PageContext,
) -> AppResult<Response> {
    let viewer = ctx.require_user()?;
    let data = FormData::from_pairs([(account::USERNAME, params.username.unwrap_or_default())]);
    let search = account::search_term(&data).unwrap_or_default();

    let query = DirectoryQuery {
        username: (!search.is_empty()).then_some(search.as_str()),
        include_privileged: viewer.is_privileged(),
    };

    let conn = state.db.get()?;
    let total = query.count(&conn)?;
    let page = Page::clamp(params.page.as_deref(), total, PAGE_SIZE);
    let users = query.fetch(&conn, page.size, page.offset())?;

    let previous_href = page_href(&search, page.previous());
    let next_href = page_href(&search, page.next());
    Ok(ctx.render(|ctx| UserSearchTemplate {
        ctx,
        search,
        users,
        page,
        previous_href,
        next_href,
    }))
}

/// GET /users/{id}: someone else's profile and statistics
pub async fn other_profile(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    ctx: PageContext,
) -> AppResult<Response> {
    let viewer = ctx.require_user()?;
    let conn = state.db.get()?;
    let target = found(users::find(&conn, id)?)?;
    check(&viewer, Capability::ViewProfile(&target))?;

    let stats = statistics::get_or_create(&conn, target.id)?;
    let own = target.id == viewer.id;
    Ok(ctx.render(|ctx| ProfileTemplate {
        ctx,
        profile: ProfileView::new(&target),
        stats,
        own,
    }))
}
