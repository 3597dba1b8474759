use askama::Template;
use axum::extract::{RawForm, State};
use axum::response::Response;
use axum::routing::get;
use axum::Router;

use crate::db::models::{Statistics, User};
use crate::db::{statistics, users};
use crate::error::{found, AppResult};
use crate::extractors::PageContext;
use crate::flash::{self, Flash};
use crate::forms::account;
use crate::forms::{BoundForm, FormData};
use crate::routes::auth::account_fields;
use crate::routes::FormSpec;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/profile", get(own_profile))
        .route("/profile/edit", get(edit_page).post(edit))
}

/// What a profile page shows about an account, already formatted.
pub struct ProfileView {
    pub username: String,
    pub avatar: String,
    pub details: Vec<(&'static str, String)>,
}

impl ProfileView {
    pub fn new(user: &User) -> Self {
        let or_dash = |value: Option<String>| value.unwrap_or_else(|| "-".to_string());
        let full_name = user.full_name();
        Self {
            username: user.username.clone(),
            avatar: user.avatar.clone().unwrap_or_default(),
            details: vec![
                ("Nom", if full_name.is_empty() { "-".to_string() } else { full_name }),
                ("E-mail", user.email.clone()),
                ("Taille", or_dash(user.height_cm.map(|h| format!("{h} cm")))),
                ("Poids", or_dash(user.weight_kg.map(|w| format!("{w} kg")))),
                ("Sexe", or_dash(user.sex.map(|s| s.label().to_string()))),
                ("Date de naissance", or_dash(user.birth_date.clone())),
                ("Membre depuis", user.date_joined.clone()),
            ],
        }
    }
}

#[derive(Template)]
#[template(path = "pages/profile.html")]
pub struct ProfileTemplate {
    pub ctx: PageContext,
    pub profile: ProfileView,
    pub stats: Statistics,
    pub own: bool,
}

/// GET /profile
pub async fn own_profile(State(state): State<AppState>, ctx: PageContext) -> AppResult<Response> {
    let user = ctx.require_user()?;
    let conn = state.db.get()?;
    let account = found(users::find(&conn, user.id)?)?;
    let stats = statistics::get_or_create(&conn, user.id)?;

    Ok(ctx.render(|ctx| ProfileTemplate {
        ctx,
        profile: ProfileView::new(&account),
        stats,
        own: true,
    }))
}

fn edit_form(ctx: PageContext, form: BoundForm) -> Response {
    let fields = account_fields(&form);
    FormSpec::new("Modifier mon profil", "/profile/edit", "Enregistrer").render(ctx, &form, fields)
}

/// GET /profile/edit
pub async fn edit_page(State(state): State<AppState>, ctx: PageContext) -> AppResult<Response> {
    let user = ctx.require_user()?;
    let conn = state.db.get()?;
    let account = found(users::find(&conn, user.id)?)?;
    Ok(edit_form(ctx, BoundForm::initial(account::initial_profile(&account))))
}

/// POST /profile/edit
pub async fn edit(
    State(state): State<AppState>,
    ctx: PageContext,
    RawForm(body): RawForm,
) -> AppResult<Response> {
    let user = ctx.require_user()?;
    let data = FormData::from_bytes(&body);
    let conn = state.db.get()?;

    match account::validate_profile(&conn, &data, user.id)? {
        Ok(fields) => {
            users::update_profile(&conn, user.id, &fields)?;
            tracing::info!(user_id = user.id, "profile updated");
            Ok(flash::redirect(
                "/profile",
                Flash::success("Profil modifié avec succès!"),
            ))
        }
        Err(errors) => Ok(edit_form(ctx, BoundForm::new(data, errors))),
    }
}
