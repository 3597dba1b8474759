use chrono::{NaiveDate, Utc};
use rusqlite::Connection;

use crate::db::models::{Sex, User};
use crate::db::users::{self, UserFields};
use crate::forms::{FormData, FormErrors, Validator, INVALID_CHOICE, NON_FIELD};

pub const USERNAME: &str = "username";
pub const EMAIL: &str = "email";
pub const FIRST_NAME: &str = "first_name";
pub const LAST_NAME: &str = "last_name";
pub const HEIGHT: &str = "taille";
pub const WEIGHT: &str = "poids";
pub const SEX: &str = "sexe";
pub const BIRTH_DATE: &str = "date_naissance";
pub const AVATAR: &str = "avatar";
pub const PASSWORD: &str = "password";
pub const PASSWORD1: &str = "password1";
pub const PASSWORD2: &str = "password2";

pub const MIN_PASSWORD_LEN: usize = 8;

pub const BAD_LOGIN: &str = "Saisissez un nom d'utilisateur et un mot de passe valides. \
     Remarquez que chacun de ces champs est sensible à la casse.";

fn valid_username(name: &str) -> bool {
    name.chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
}

fn valid_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && domain.contains('.')
                && !email.contains(char::is_whitespace)
                && !domain.contains('@')
        }
        None => false,
    }
}

/// The profile fields shared by registration and profile edit. `except` is the
/// account being edited, so it may keep its own username.
fn profile_fields(
    conn: &Connection,
    v: &mut Validator<'_>,
    data: &FormData,
    except: Option<i64>,
) -> rusqlite::Result<UserFields> {
    let username = v.required(USERNAME, 150);
    if !v.has_error(USERNAME) {
        if !valid_username(&username) {
            v.error(
                USERNAME,
                "Saisissez un nom d'utilisateur valide. Il ne peut contenir que des lettres, \
                 des nombres ou les caractères « @ », « . », « + », « - » et « _ ».",
            );
        } else if users::username_taken(conn, &username, except)? {
            v.error(USERNAME, "Un utilisateur avec ce nom existe déjà.");
        }
    }

    let email = v.required(EMAIL, 254);
    if !v.has_error(EMAIL) && !valid_email(&email) {
        v.error(EMAIL, "Saisissez une adresse e-mail valide.");
    }

    let first_name = v.text(FIRST_NAME, 150);
    let last_name = v.text(LAST_NAME, 150);
    let height_cm = v.positive_decimal(HEIGHT);
    let weight_kg = v.positive_decimal(WEIGHT);

    let sex = match data.get(SEX) {
        "" => None,
        code => {
            let sex = Sex::from_code(code);
            if sex.is_none() {
                v.error(SEX, INVALID_CHOICE);
            }
            sex
        }
    };

    let birth_date = v.date(BIRTH_DATE);
    if let Some(date) = birth_date {
        if date > Utc::now().date_naive() {
            v.error(BIRTH_DATE, "La date de naissance ne peut pas être dans le futur.");
        }
    }

    let avatar = v.optional(AVATAR, 255);

    Ok(UserFields {
        username,
        email,
        first_name,
        last_name,
        height_cm,
        weight_kg,
        sex,
        birth_date: birth_date.map(|d: NaiveDate| d.format("%Y-%m-%d").to_string()),
        avatar,
    })
}

/// A validated registration: the account fields and the chosen password.
#[derive(Debug, Clone)]
pub struct Registration {
    pub fields: UserFields,
    pub password: String,
}

pub fn validate_registration(
    conn: &Connection,
    data: &FormData,
) -> rusqlite::Result<Result<Registration, FormErrors>> {
    let mut v = Validator::new(data);
    let fields = profile_fields(conn, &mut v, data, None)?;

    let password = data.raw(PASSWORD1).to_string();
    let confirmation = data.raw(PASSWORD2);
    if password.is_empty() {
        v.error(PASSWORD1, super::REQUIRED);
    }
    if confirmation.is_empty() {
        v.error(PASSWORD2, super::REQUIRED);
    }
    if !password.is_empty() && !confirmation.is_empty() {
        if password != confirmation {
            v.error(PASSWORD2, "Les deux mots de passe ne correspondent pas.");
        } else if password.chars().count() < MIN_PASSWORD_LEN {
            v.error(
                PASSWORD2,
                format!(
                    "Ce mot de passe est trop court. Il doit contenir au minimum {MIN_PASSWORD_LEN} caractères."
                ),
            );
        } else if password.chars().all(|c| c.is_ascii_digit()) {
            v.error(PASSWORD2, "Ce mot de passe est entièrement numérique.");
        }
    }

    Ok(v.finish(Registration { fields, password }))
}

pub fn validate_profile(
    conn: &Connection,
    data: &FormData,
    user_id: i64,
) -> rusqlite::Result<Result<UserFields, FormErrors>> {
    let mut v = Validator::new(data);
    let fields = profile_fields(conn, &mut v, data, Some(user_id))?;
    Ok(v.finish(fields))
}

/// Profile form pre-filled from the stored account.
pub fn initial_profile(user: &User) -> FormData {
    let decimal = |n: Option<f64>| n.map(|n| n.to_string()).unwrap_or_default();
    FormData::from_pairs([
        (USERNAME, user.username.clone()),
        (EMAIL, user.email.clone()),
        (FIRST_NAME, user.first_name.clone()),
        (LAST_NAME, user.last_name.clone()),
        (HEIGHT, decimal(user.height_cm)),
        (WEIGHT, decimal(user.weight_kg)),
        (SEX, user.sex.map(|s| s.code().to_string()).unwrap_or_default()),
        (BIRTH_DATE, user.birth_date.clone().unwrap_or_default()),
        (AVATAR, user.avatar.clone().unwrap_or_default()),
    ])
}

#[derive(Debug, Clone)]
pub struct Login {
    pub username: String,
    pub password: String,
}

/// Shape-only check. Whether the password matches is the caller's business,
/// and a mismatch is reported with [`bad_login`].
pub fn validate_login(data: &FormData) -> Result<Login, FormErrors> {
    let mut v = Validator::new(data);
    let username = v.required(USERNAME, 150);
    let password = data.raw(PASSWORD).to_string();
    if password.is_empty() {
        v.error(PASSWORD, super::REQUIRED);
    }
    v.finish(Login { username, password })
}

pub fn bad_login() -> FormErrors {
    let mut errors = FormErrors::default();
    errors.add(NON_FIELD, BAD_LOGIN);
    errors
}

/// The directory search box. Blank means no filter.
pub fn search_term(data: &FormData) -> Option<String> {
    let term = data.get(USERNAME);
    if term.is_empty() {
        None
    } else {
        Some(term.chars().take(150).collect())
    }
}
