use askama::Template;
use axum::extract::{Path, Query, RawForm, State};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::Router;
use rusqlite::Connection;
use serde::Deserialize;

use crate::auth::{check, Capability};
use crate::db::exercises::{self, BankFilter};
use crate::db::models::{Workout, WorkoutExercise};
use crate::db::{statistics, workouts};
use crate::error::{found, AppResult};
use crate::extractors::{CurrentUser, PageContext};
use crate::flash::{self, Flash};
use crate::forms::workout::{self as workout_form, slot_fields, NAME};
use crate::forms::{BoundForm, Field, FormData, FormErrors, NON_FIELD};
use crate::progress::WorkoutTotals;
use crate::routes::FormSpec;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/workouts", get(list))
        .route("/workouts/new", get(new_page).post(create))
        .route("/workouts/{id}/edit", get(edit_page).post(edit))
        .route("/workouts/{id}/delete", get(back_to_list).post(delete))
        .route("/workouts/{id}/complete", get(back_to_list).post(complete))
}

/// Name plus three fields per slot. Only approved exercises are offered.
fn workout_fields(conn: &Connection, form: &BoundForm) -> rusqlite::Result<Vec<Field>> {
    let approved = exercises::bank(conn, &BankFilter::default())?;
    let mut fields = vec![form.input(NAME, "Nom de l'entraînement", "text")];
    for n in 1..=workouts::SLOT_COUNT {
        let (exercise, sets, reps) = slot_fields(n);
        let choices = form.choices(&exercise, approved.iter().map(|e| (e.id, e.name.clone())));
        fields.push(form.select(&exercise, &format!("Exercice {n}"), choices));
        fields.push(form.input(&sets, "Séries", "number"));
        fields.push(form.input(&reps, "Répétitions", "number"));
    }
    Ok(fields)
}

/// Form-wide problems (a repeated exercise) go to the page messages; field
/// errors stay next to their inputs.
fn show_form_errors(ctx: &mut PageContext, errors: &mut FormErrors) {
    for message in errors.take(NON_FIELD) {
        ctx.push(Flash::error(message));
    }
}

pub struct WorkoutCard {
    pub workout: Workout,
    pub slots: Vec<WorkoutExercise>,
}

#[derive(Template)]
#[template(path = "pages/workouts.html")]
pub struct WorkoutListTemplate {
    pub ctx: PageContext,
    pub search: String,
    pub workouts: Vec<WorkoutCard>,
}

#[derive(Deserialize)]
pub struct ListParams {
    pub recherche: Option<String>,
}

/// GET /workouts: the signed-in user's workouts
pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
    ctx: PageContext,
) -> AppResult<Response> {
    let user = ctx.require_user()?;
    let search = params.recherche.unwrap_or_default().trim().to_string();

    let conn = state.db.get()?;
    let workouts = workouts::list_for_creator(&conn, user.id, Some(&search))?
        .into_iter()
        .map(|(workout, slots)| WorkoutCard { workout, slots })
        .collect();

    Ok(ctx.render(|ctx| WorkoutListTemplate {
        ctx,
        search,
        workouts,
    }))
}

fn render_new(conn: &Connection, ctx: PageContext, form: BoundForm) -> AppResult<Response> {
    let fields = workout_fields(conn, &form)?;
    Ok(FormSpec::new("Nouvel entraînement", "/workouts/new", "Créer").render(ctx, &form, fields))
}

/// GET /workouts/new
pub async fn new_page(State(state): State<AppState>, ctx: PageContext) -> AppResult<Response> {
    ctx.require_user()?;
    let conn = state.db.get()?;
    render_new(&conn, ctx, BoundForm::blank())
}

/// POST /workouts/new: one workout and its four slots, or nothing
pub async fn create(
    State(state): State<AppState>,
    mut ctx: PageContext,
    RawForm(body): RawForm,
) -> AppResult<Response> {
    let user = ctx.require_user()?;
    let data = FormData::from_bytes(&body);
    let conn = state.db.get()?;

    match workout_form::validate(&conn, &data)? {
        Ok(fields) => {
            let id = workouts::create(&conn, user.id, &fields)?;
            tracing::info!(workout_id = id, user = %user.username, "workout created");
            Ok(flash::redirect(
                "/workouts",
                Flash::success("Entraînement créé avec succès!"),
            ))
        }
        Err(mut errors) => {
            show_form_errors(&mut ctx, &mut errors);
            render_new(&conn, ctx, BoundForm::new(data, errors))
        }
    }
}

fn render_edit(
    conn: &Connection,
    ctx: PageContext,
    workout: &Workout,
    form: BoundForm,
) -> AppResult<Response> {
    let fields = workout_fields(conn, &form)?;
    Ok(FormSpec::new(
        format!("Modifier « {} »", workout.name),
        format!("/workouts/{}/edit", workout.id),
        "Enregistrer",
    )
    .render(ctx, &form, fields))
}

/// Load a workout and make sure the user created it.
fn owned_workout(conn: &Connection, user: &CurrentUser, id: i64) -> AppResult<Workout> {
    let workout = found(workouts::find(conn, id)?)?;
    check(user, Capability::Own(workout.creator_id))?;
    Ok(workout)
}

/// GET /workouts/{id}/edit: creator only
pub async fn edit_page(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    ctx: PageContext,
) -> AppResult<Response> {
    let user = ctx.require_user()?;
    let conn = state.db.get()?;
    let workout = owned_workout(&conn, &user, id)?;
    let slots = workouts::slots(&conn, id)?;
    let form = BoundForm::initial(workout_form::initial(&workout, &slots));
    render_edit(&conn, ctx, &workout, form)
}

/// POST /workouts/{id}/edit: rename and rewrite the slots in place
pub async fn edit(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    mut ctx: PageContext,
    RawForm(body): RawForm,
) -> AppResult<Response> {
    let user = ctx.require_user()?;
    let conn = state.db.get()?;
    let workout = owned_workout(&conn, &user, id)?;
    let data = FormData::from_bytes(&body);

    match workout_form::validate(&conn, &data)? {
        Ok(fields) => {
            workouts::update(&conn, id, &fields)?;
            tracing::info!(workout_id = id, "workout updated");
            Ok(flash::redirect("/workouts", Flash::success("Entraînement modifié !")))
        }
        Err(mut errors) => {
            show_form_errors(&mut ctx, &mut errors);
            render_edit(&conn, ctx, &workout, BoundForm::new(data, errors))
        }
    }
}

/// GET on delete/complete changes nothing, but still only for the creator.
pub async fn back_to_list(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    user: CurrentUser,
) -> AppResult<Response> {
    let conn = state.db.get()?;
    owned_workout(&conn, &user, id)?;
    Ok(Redirect::to("/workouts").into_response())
}

/// POST /workouts/{id}/delete
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    user: CurrentUser,
) -> AppResult<Response> {
    let conn = state.db.get()?;
    owned_workout(&conn, &user, id)?;
    workouts::delete(&conn, id)?;
    tracing::info!(workout_id = id, "workout deleted");
    Ok(flash::redirect(
        "/workouts",
        Flash::success("Entraînement supprimé avec succès!"),
    ))
}

/// POST /workouts/{id}/complete: adds the workout's totals to the user's
/// statistics, every time it is posted
pub async fn complete(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    user: CurrentUser,
) -> AppResult<Response> {
    let conn = state.db.get()?;
    owned_workout(&conn, &user, id)?;

    let totals = WorkoutTotals::for_workout(&workouts::slots(&conn, id)?);
    statistics::add_workout(&conn, user.id, &totals)?;
    tracing::info!(workout_id = id, sets = totals.sets, reps = totals.reps, "workout completed");

    Ok(flash::redirect(
        "/workouts",
        Flash::success(format!(
            "Entraînement complété! +{} sets, +{} reps",
            totals.sets, totals.reps
        )),
    ))
}
