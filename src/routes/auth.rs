use axum::extract::{RawForm, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;

use crate::auth::{cookie_value, password, session};
use crate::db::models::Sex;
use crate::db::users::{self, Roles};
use crate::error::AppResult;
use crate::extractors::PageContext;
use crate::flash::{self, Flash};
use crate::forms::account::{self, *};
use crate::forms::{BoundForm, Field, FormData};
use crate::routes::FormSpec;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", get(register_page).post(register))
        .route("/login", get(login_page).post(login))
        .route("/logout", post(logout))
}

/// Account fields shared by registration and profile edit.
pub(crate) fn account_fields(form: &BoundForm) -> Vec<Field> {
    let sexes = form.choices(SEX, Sex::ALL.map(|s| (s.code(), s.label())));
    vec![
        form.input(USERNAME, "Nom d'utilisateur", "text"),
        form.input(EMAIL, "Adresse e-mail", "email"),
        form.input(FIRST_NAME, "Prénom", "text"),
        form.input(LAST_NAME, "Nom", "text"),
        form.input(HEIGHT, "Taille (cm)", "text"),
        form.input(WEIGHT, "Poids (kg)", "text"),
        form.select(SEX, "Sexe", sexes),
        form.input(BIRTH_DATE, "Date de naissance", "date"),
        form.input(AVATAR, "Avatar (URL)", "text"),
    ]
}

fn register_form(ctx: PageContext, form: BoundForm) -> Response {
    let mut fields = account_fields(&form);
    fields.push(form.password(PASSWORD1, "Mot de passe"));
    fields.push(form.password(PASSWORD2, "Confirmation du mot de passe"));
    FormSpec::new("Inscription", "/register", "S'inscrire").render(ctx, &form, fields)
}

fn login_form(ctx: PageContext, form: BoundForm) -> Response {
    let fields = vec![
        form.input(USERNAME, "Nom d'utilisateur", "text"),
        form.password(PASSWORD, "Mot de passe"),
    ];
    FormSpec::new("Connexion", "/login", "Se connecter").render(ctx, &form, fields)
}

/// GET /register
pub async fn register_page(ctx: PageContext) -> Response {
    register_form(ctx, BoundForm::blank())
}

/// POST /register
pub async fn register(
    State(state): State<AppState>,
    ctx: PageContext,
    RawForm(body): RawForm,
) -> AppResult<Response> {
    let data = FormData::from_bytes(&body);
    let conn = state.db.get()?;

    match account::validate_registration(&conn, &data)? {
        Ok(reg) => {
            let id = password::create_user(&conn, &reg.fields, &reg.password, Roles::default())?;
            tracing::info!(user_id = id, username = %reg.fields.username, "account created");
            Ok(flash::redirect("/login", Flash::success("Compte créé avec succès!")))
        }
        Err(errors) => {
            let data = data.without(PASSWORD1).without(PASSWORD2);
            Ok(register_form(ctx, BoundForm::new(data, errors)))
        }
    }
}

/// GET /login
pub async fn login_page(ctx: PageContext) -> Response {
    login_form(ctx, BoundForm::blank())
}

/// POST /login
pub async fn login(
    State(state): State<AppState>,
    ctx: PageContext,
    RawForm(body): RawForm,
) -> AppResult<Response> {
    let data = FormData::from_bytes(&body);

    let creds = match account::validate_login(&data) {
        Ok(creds) => creds,
        Err(errors) => return Ok(login_form(ctx, BoundForm::new(data.without(PASSWORD), errors))),
    };

    let conn = state.db.get()?;
    let Some(user_id) = password::authenticate(&conn, &creds.username, &creds.password)? else {
        tracing::info!(username = %creds.username, "failed login");
        return Ok(login_form(
            ctx,
            BoundForm::new(data.without(PASSWORD), account::bad_login()),
        ));
    };

    users::touch_last_login(&conn, user_id)?;
    let token = session::create_session(&conn, user_id, state.config.auth.session_hours)?;
    tracing::info!(user_id, "logged in");

    Ok((
        StatusCode::SEE_OTHER,
        [
            (header::LOCATION, "/".to_string()),
            (
                header::SET_COOKIE,
                session::session_cookie(
                    &state.config.auth.cookie_name,
                    &token,
                    state.config.auth.session_hours,
                ),
            ),
        ],
    )
        .into_response())
}

/// POST /logout
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> AppResult<Response> {
    let cookie_name = &state.config.auth.cookie_name;
    if let Some(token) = cookie_value(&headers, cookie_name) {
        let conn = state.db.get()?;
        session::delete_session(&conn, token)?;
    }

    Ok((
        StatusCode::SEE_OTHER,
        [
            (header::LOCATION, "/".to_string()),
            (header::SET_COOKIE, session::clear_session_cookie(cookie_name)),
        ],
    )
        .into_response())
}
