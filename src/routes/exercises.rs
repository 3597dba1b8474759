use askama::Template;
use axum::extract::{Query, RawForm, State};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::Router;
use rusqlite::Connection;
use serde::Deserialize;

use crate::auth::{check, Capability};
use crate::db::exercises::{self, BankFilter};
use crate::db::models::Exercise;
use crate::error::AppResult;
use crate::extractors::PageContext;
use crate::flash::{self, Flash};
use crate::forms::exercise::{self as exercise_form, *};
use crate::forms::{BoundForm, Choice, Field, FormData};
use crate::routes::FormSpec;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/exercises", get(bank))
        .route("/exercises/new", get(create_page).post(create))
        .route("/exercises/propose", get(propose_page).post(propose))
        .route("/exercises/review", get(review_page).post(review))
}

fn exercise_fields(conn: &Connection, form: &BoundForm) -> rusqlite::Result<Vec<Field>> {
    let groups = exercises::muscle_groups(conn)?
        .into_iter()
        .map(|g| (g.id, g.name));
    Ok(vec![
        form.input(NAME, "Nom", "text"),
        form.select(MUSCLE_GROUP, "Groupe musculaire", form.choices(MUSCLE_GROUP, groups)),
        form.input(SUGGESTED_SETS, "Séries suggérées", "number"),
        form.input(SUGGESTED_REPS, "Répétitions suggérées", "number"),
        form.textarea(DESCRIPTION, "Description"),
        form.input(IMAGE, "Image (URL)", "text"),
    ])
}

#[derive(Template)]
#[template(path = "pages/bank.html")]
pub struct BankTemplate {
    pub ctx: PageContext,
    pub search: String,
    pub groups: Vec<Choice>,
    pub exercises: Vec<Exercise>,
}

#[derive(Deserialize)]
pub struct BankParams {
    pub recherche: Option<String>,
    pub groupemusculaire: Option<String>,
}

/// GET /exercises: approved exercises, filtered by name and muscle group
pub async fn bank(
    State(state): State<AppState>,
    Query(params): Query<BankParams>,
    ctx: PageContext,
) -> AppResult<Response> {
    ctx.require_user()?;

    let search = params.recherche.as_deref().map(str::trim).unwrap_or("");
    // A non-numeric group is ignored rather than rejected
    let muscle_group_id = params
        .groupemusculaire
        .as_deref()
        .and_then(|raw| raw.trim().parse::<i64>().ok());

    let conn = state.db.get()?;
    let filter = BankFilter {
        search: (!search.is_empty()).then_some(search),
        muscle_group_id,
    };
    let exercises = exercises::bank(&conn, &filter)?;
    let groups = exercises::muscle_groups(&conn)?
        .into_iter()
        .map(|g| Choice {
            selected: Some(g.id) == muscle_group_id,
            value: g.id.to_string(),
            label: g.name,
        })
        .collect();

    let search = search.to_string();
    Ok(ctx.render(|ctx| BankTemplate {
        ctx,
        search,
        groups,
        exercises,
    }))
}

fn render_create(conn: &Connection, ctx: PageContext, form: BoundForm) -> AppResult<Response> {
    let fields = exercise_fields(conn, &form)?;
    Ok(FormSpec::new("Créer un exercice", "/exercises/new", "Créer").render(ctx, &form, fields))
}

/// GET /exercises/new: admin only
pub async fn create_page(State(state): State<AppState>, ctx: PageContext) -> AppResult<Response> {
    check(&ctx.require_user()?, Capability::Administer)?;
    let conn = state.db.get()?;
    render_create(&conn, ctx, BoundForm::blank())
}

/// POST /exercises/new: saved already approved
pub async fn create(
    State(state): State<AppState>,
    ctx: PageContext,
    RawForm(body): RawForm,
) -> AppResult<Response> {
    check(&ctx.require_user()?, Capability::Administer)?;
    let data = FormData::from_bytes(&body);
    let conn = state.db.get()?;

    match exercise_form::validate(&conn, &data)? {
        Ok(fields) => {
            let id = exercises::insert(&conn, &fields, true)?;
            tracing::info!(exercise_id = id, name = %fields.name, "exercise created");
            Ok(flash::redirect(
                "/exercises",
                Flash::success("L'exercice a été créé avec succès"),
            ))
        }
        Err(errors) => render_create(&conn, ctx, BoundForm::new(data, errors)),
    }
}

fn render_propose(conn: &Connection, ctx: PageContext, form: BoundForm) -> AppResult<Response> {
    let fields = exercise_fields(conn, &form)?;
    Ok(FormSpec::new("Proposer un exercice", "/exercises/propose", "Proposer")
        .intro("Un administrateur validera votre exercice avant qu'il apparaisse dans la banque.")
        .render(ctx, &form, fields))
}

/// GET /exercises/propose: admins create directly instead
pub async fn propose_page(State(state): State<AppState>, ctx: PageContext) -> AppResult<Response> {
    if ctx.require_user()?.is_admin() {
        return Ok(Redirect::to("/exercises/new").into_response());
    }
    let conn = state.db.get()?;
    render_propose(&conn, ctx, BoundForm::blank())
}

/// POST /exercises/propose: saved pending review
pub async fn propose(
    State(state): State<AppState>,
    ctx: PageContext,
    RawForm(body): RawForm,
) -> AppResult<Response> {
    let user = ctx.require_user()?;
    if user.is_admin() {
        return Ok(Redirect::to("/exercises/new").into_response());
    }
    let data = FormData::from_bytes(&body);
    let conn = state.db.get()?;

    match exercise_form::validate(&conn, &data)? {
        Ok(fields) => {
            let id = exercises::insert(&conn, &fields, false)?;
            tracing::info!(exercise_id = id, user = %user.username, "exercise proposed");
            Ok(flash::redirect(
                "/exercises",
                Flash::success(
                    "Votre exercice a été proposé et est en attente de validation par un administrateur.",
                ),
            ))
        }
        Err(errors) => render_propose(&conn, ctx, BoundForm::new(data, errors)),
    }
}

#[derive(Template)]
#[template(path = "pages/review.html")]
pub struct ReviewTemplate {
    pub ctx: PageContext,
    pub pending_count: i64,
    pub has_pending: bool,
    pub fields: Vec<Field>,
    pub non_field_errors: Vec<String>,
}

fn render_review(conn: &Connection, ctx: PageContext, form: Option<BoundForm>) -> AppResult<Response> {
    let pending_count = exercises::pending_count(conn)?;
    let (fields, non_field_errors) = match &form {
        Some(form) => (exercise_fields(conn, form)?, form.non_field_errors()),
        None => (Vec::new(), Vec::new()),
    };
    let has_pending = form.is_some();
    Ok(ctx.render(|ctx| ReviewTemplate {
        ctx,
        pending_count,
        has_pending,
        fields,
        non_field_errors,
    }))
}

/// GET /exercises/review: the oldest pending exercise, pre-filled
pub async fn review_page(State(state): State<AppState>, ctx: PageContext) -> AppResult<Response> {
    check(&ctx.require_user()?, Capability::Administer)?;
    let conn = state.db.get()?;
    let form = exercises::first_pending(&conn)?
        .map(|exercise| BoundForm::initial(exercise_form::initial(&exercise)));
    render_review(&conn, ctx, form)
}

/// POST /exercises/review: `action` is ACCEPTER or REFUSER
pub async fn review(
    State(state): State<AppState>,
    ctx: PageContext,
    RawForm(body): RawForm,
) -> AppResult<Response> {
    check(&ctx.require_user()?, Capability::Administer)?;
    let data = FormData::from_bytes(&body);
    let conn = state.db.get()?;

    let Some(pending) = exercises::first_pending(&conn)? else {
        return Ok(Redirect::to("/exercises/review").into_response());
    };

    let action = data.get("action").to_string();
    match action.as_str() {
        "ACCEPTER" => match exercise_form::validate(&conn, &data)? {
            Ok(fields) => {
                exercises::approve(&conn, pending.id, &fields)?;
                tracing::info!(exercise_id = pending.id, "exercise approved");
                Ok(flash::redirect("/exercises/review", Flash::success("Exercice accepté !")))
            }
            Err(errors) => render_review(&conn, ctx, Some(BoundForm::new(data, errors))),
        },
        "REFUSER" => {
            exercises::delete(&conn, pending.id)?;
            tracing::info!(exercise_id = pending.id, "exercise rejected");
            Ok(flash::redirect("/exercises/review", Flash::success("Exercice refusé!")))
        }
        _ => Ok(Redirect::to("/exercises/review").into_response()),
    }
}
