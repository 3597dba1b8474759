use askama::Template;
use axum::extract::{Path, RawForm, State};
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use rusqlite::Connection;

use crate::auth::{check, Capability};
use crate::db::models::{Badge, Challenge};
use crate::db::rewards;
use crate::error::{found, AppResult};
use crate::extractors::PageContext;
use crate::flash::{self, Flash};
use crate::forms::rewards::{self as rewards_form, *};
use crate::forms::{BoundForm, FormData};
use crate::routes::FormSpec;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/badges", get(badge_list))
        .route("/badges/new", get(badge_page).post(create_badge))
        .route("/challenges/new", get(challenge_page).post(create_challenge))
        .route("/challenges/{id}/award", get(award_page).post(award))
}

#[derive(Template)]
#[template(path = "pages/badges.html")]
pub struct BadgeListTemplate {
    pub ctx: PageContext,
    pub badges: Vec<Badge>,
}

/// GET /badges: admin only, by category then name
pub async fn badge_list(State(state): State<AppState>, ctx: PageContext) -> AppResult<Response> {
    check(&ctx.require_user()?, Capability::Administer)?;
    let conn = state.db.get()?;
    let badges = rewards::badges(&conn)?;
    Ok(ctx.render(|ctx| BadgeListTemplate { ctx, badges }))
}

fn badge_form(ctx: PageContext, form: BoundForm) -> Response {
    let fields = vec![
        form.input(NAME, "Nom", "text"),
        form.input(CATEGORY, "Catégorie", "text"),
        form.textarea(DESCRIPTION, "Description"),
    ];
    FormSpec::new("Créer un badge", "/badges/new", "Créer")
        .intro("Le code du badge est dérivé de son nom.")
        .render(ctx, &form, fields)
}

/// GET /badges/new
pub async fn badge_page(ctx: PageContext) -> AppResult<Response> {
    check(&ctx.require_user()?, Capability::Administer)?;
    Ok(badge_form(ctx, BoundForm::blank()))
}

/// POST /badges/new
pub async fn create_badge(
    State(state): State<AppState>,
    ctx: PageContext,
    RawForm(body): RawForm,
) -> AppResult<Response> {
    check(&ctx.require_user()?, Capability::Administer)?;
    let data = FormData::from_bytes(&body);
    let conn = state.db.get()?;

    match rewards_form::validate_badge(&conn, &data)? {
        Ok(fields) => {
            let id = rewards::insert_badge(&conn, &fields)?;
            tracing::info!(badge_id = id, code = %fields.code, "badge created");
            Ok(flash::redirect("/badges", Flash::success("Badge créé avec succès !")))
        }
        Err(errors) => Ok(badge_form(ctx, BoundForm::new(data, errors))),
    }
}

fn challenge_form(conn: &Connection, ctx: PageContext, form: BoundForm) -> AppResult<Response> {
    let badges = rewards::badges(conn)?
        .into_iter()
        .map(|b| (b.id, format!("{} ({})", b.name, b.category)));
    let fields = vec![
        form.input(NAME, "Nom", "text"),
        form.input(DEADLINE, "Date limite", "datetime-local"),
        form.checkboxes(BADGES, "Badges", form.choices(BADGES, badges)),
    ];
    Ok(FormSpec::new("Créer un défi", "/challenges/new", "Créer").render(ctx, &form, fields))
}

/// GET /challenges/new
pub async fn challenge_page(State(state): State<AppState>, ctx: PageContext) -> AppResult<Response> {
    check(&ctx.require_user()?, Capability::Administer)?;
    let conn = state.db.get()?;
    challenge_form(&conn, ctx, BoundForm::blank())
}

/// POST /challenges/new: the challenge and its badge links together
pub async fn create_challenge(
    State(state): State<AppState>,
    ctx: PageContext,
    RawForm(body): RawForm,
) -> AppResult<Response> {
    check(&ctx.require_user()?, Capability::Administer)?;
    let data = FormData::from_bytes(&body);
    let conn = state.db.get()?;

    match rewards_form::validate_challenge(&conn, &data)? {
        Ok(fields) => {
            let id = rewards::insert_challenge(&conn, &fields)?;
            tracing::info!(challenge_id = id, badges = fields.badge_ids.len(), "challenge created");
            Ok(flash::redirect("/", Flash::success("Défi créé avec succès !")))
        }
        Err(errors) => challenge_form(&conn, ctx, BoundForm::new(data, errors)),
    }
}

fn award_form(ctx: PageContext, challenge: &Challenge, linked: &[Badge], form: BoundForm) -> Response {
    let badges = linked.iter().map(|b| (b.id, b.name.clone()));
    let fields = vec![
        form.input(USERNAME, "Nom d'utilisateur", "text"),
        form.select(BADGE, "Badge", form.choices(BADGE, badges)),
    ];
    FormSpec::new(
        format!("Attribuer un badge : {}", challenge.name),
        format!("/challenges/{}/award", challenge.id),
        "Attribuer",
    )
    .render(ctx, &form, fields)
}

/// GET /challenges/{id}/award
pub async fn award_page(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    ctx: PageContext,
) -> AppResult<Response> {
    check(&ctx.require_user()?, Capability::Administer)?;
    let conn = state.db.get()?;
    let challenge = found(rewards::find_challenge(&conn, id)?)?;
    let linked = rewards::challenge_badges(&conn, id)?;
    Ok(award_form(ctx, &challenge, &linked, BoundForm::blank()))
}

/// POST /challenges/{id}/award: marks one badge of the challenge complete
/// for a user. Statistics are left alone.
pub async fn award(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    ctx: PageContext,
    RawForm(body): RawForm,
) -> AppResult<Response> {
    check(&ctx.require_user()?, Capability::Administer)?;
    let data = FormData::from_bytes(&body);
    let conn = state.db.get()?;
    let challenge = found(rewards::find_challenge(&conn, id)?)?;
    let linked = rewards::challenge_badges(&conn, id)?;

    match rewards_form::validate_award(&conn, &data, &linked)? {
        Ok(award) => {
            let progress = rewards::record_completion(&conn, award.user.id, challenge.id, award.badge_id)?;
            tracing::info!(
                user = %award.user.username,
                challenge_id = challenge.id,
                badge_id = award.badge_id,
                completed_at = ?progress.completed_at,
                "badge awarded"
            );
            Ok(flash::redirect("/", Flash::success("Badge attribué !")))
        }
        Err(errors) => Ok(award_form(ctx, &challenge, &linked, BoundForm::new(data, errors))),
    }
}
