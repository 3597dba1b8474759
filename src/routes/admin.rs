use askama::Template;
use axum::extract::{Path, Query, State};
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use url::form_urlencoded;

use crate::admin::{self, ListRequest, ModelAdmin, MODELS};
use crate::auth::{check, Capability};
use crate::error::{found, AppResult};
use crate::extractors::PageContext;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin", get(index))
        .route("/admin/{model}", get(list))
}

#[derive(Template)]
#[template(path = "pages/admin_index.html")]
pub struct AdminIndexTemplate {
    pub ctx: PageContext,
    pub models: &'static [ModelAdmin],
}

/// GET /admin
pub async fn index(ctx: PageContext) -> AppResult<Response> {
    check(&ctx.require_user()?, Capability::Administer)?;
    Ok(ctx.render(|ctx| AdminIndexTemplate {
        ctx,
        models: MODELS,
    }))
}

pub struct FilterLink {
    pub label: String,
    pub href: String,
    pub selected: bool,
}

pub struct FilterGroup {
    pub param: &'static str,
    pub links: Vec<FilterLink>,
}

#[derive(Template)]
#[template(path = "pages/admin_list.html")]
pub struct AdminListTemplate {
    pub ctx: PageContext,
    pub slug: &'static str,
    pub title: &'static str,
    pub search: String,
    pub filters: Vec<FilterGroup>,
    pub headers: Vec<&'static str>,
    pub rows: Vec<Vec<String>>,
}

/// Link to the same list with `param` set to `value`, or dropped when `None`.
fn filter_href(model: &ModelAdmin, req: &ListRequest<'_>, param: &str, value: Option<&str>) -> String {
    let mut query = form_urlencoded::Serializer::new(String::new());
    if let Some(q) = &req.search {
        query.append_pair("q", q);
    }
    for (f, v) in &req.filters {
        if f.param != param {
            query.append_pair(f.param, v);
        }
    }
    if let Some(value) = value {
        query.append_pair(param, value);
    }
    format!("/admin/{}?{}", model.slug, query.finish())
}

/// GET /admin/{model}: `q` searches, every other known parameter filters
pub async fn list(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(params): Query<Vec<(String, String)>>,
    ctx: PageContext,
) -> AppResult<Response> {
    check(&ctx.require_user()?, Capability::Administer)?;
    let model = found(admin::find(&slug))?;
    let req = model.request(&params);

    let conn = state.db.get()?;
    let rows = model.list(&conn, &req)?;

    let mut filters = Vec::with_capacity(model.filters.len());
    for f in model.filters {
        let selected = req.selected(f.param);
        let mut links = vec![FilterLink {
            label: "Tout".to_string(),
            href: filter_href(model, &req, f.param, None),
            selected: selected.is_none(),
        }];
        for value in model.filter_values(&conn, f)? {
            links.push(FilterLink {
                href: filter_href(model, &req, f.param, Some(&value)),
                selected: selected == Some(value.as_str()),
                label: value,
            });
        }
        filters.push(FilterGroup {
            param: f.param,
            links,
        });
    }

    let search = req.search.clone().unwrap_or_default();
    Ok(ctx.render(|ctx| AdminListTemplate {
        ctx,
        slug: model.slug,
        title: model.title,
        search,
        filters,
        headers: model.headers(),
        rows,
    }))
}
