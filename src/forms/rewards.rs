use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::Connection;

use crate::db::models::{Badge, User};
use crate::db::rewards::{self, BadgeFields, ChallengeFields};
use crate::db::users;
use crate::forms::{slugify, FormData, FormErrors, Validator, INVALID_CHOICE, REQUIRED};

pub const NAME: &str = "nom";
pub const CATEGORY: &str = "categorie";
pub const DESCRIPTION: &str = "description";
pub const DEADLINE: &str = "date_limite";
pub const BADGES: &str = "badges";
pub const BADGE: &str = "badge";
pub const USERNAME: &str = "username";

/// Storage format for deadlines, comparable with SQLite's `datetime('now')`.
pub const DEADLINE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn validate_badge(
    conn: &Connection,
    data: &FormData,
) -> rusqlite::Result<Result<BadgeFields, FormErrors>> {
    let mut v = Validator::new(data);
    let name = v.required(NAME, 100);
    let category = v.required(CATEGORY, 50);
    let description = v.text(DESCRIPTION, 2000);

    let code = slugify(&name);
    if !v.has_error(NAME) {
        if code.is_empty() {
            v.error(NAME, "Le nom doit contenir au moins une lettre ou un chiffre.");
        } else if rewards::badge_code_taken(conn, &code)? {
            v.error(NAME, "Un badge avec ce code existe déjà.");
        }
    }

    Ok(v.finish(BadgeFields {
        name,
        category,
        code,
        description,
    }))
}

/// Accepts `datetime-local` input (`2025-06-01T18:30`), with or without seconds,
/// or a bare date meaning the end of that day.
pub fn parse_deadline(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    ["%Y-%m-%dT%H:%M", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%d %H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(23, 59, 59))
        })
}

pub fn validate_challenge(
    conn: &Connection,
    data: &FormData,
) -> rusqlite::Result<Result<ChallengeFields, FormErrors>> {
    let mut v = Validator::new(data);
    let name = v.required(NAME, 100);

    let deadline = match data.get(DEADLINE) {
        "" => {
            v.error(DEADLINE, REQUIRED);
            String::new()
        }
        raw => match parse_deadline(raw) {
            Some(dt) => dt.format(DEADLINE_FORMAT).to_string(),
            None => {
                v.error(DEADLINE, "Saisissez une date et une heure valides.");
                String::new()
            }
        },
    };

    let mut badge_ids: Vec<i64> = Vec::new();
    let picked = data.get_all(BADGES);
    if picked.is_empty() {
        v.error(BADGES, REQUIRED);
    }
    for raw in picked {
        match raw.parse::<i64>() {
            Ok(id) if rewards::badge_exists(conn, id)? => {
                if !badge_ids.contains(&id) {
                    badge_ids.push(id);
                }
            }
            _ => {
                v.error(
                    BADGES,
                    format!("Sélectionnez un choix valide. {raw} n'en fait pas partie."),
                );
            }
        }
    }

    Ok(v.finish(ChallengeFields {
        name,
        deadline,
        badge_ids,
    }))
}

/// Who completed which badge of a challenge.
#[derive(Debug, Clone)]
pub struct Award {
    pub user: User,
    pub badge_id: i64,
}

/// `linked` are the badges of the challenge being awarded.
pub fn validate_award(
    conn: &Connection,
    data: &FormData,
    linked: &[Badge],
) -> rusqlite::Result<Result<Award, FormErrors>> {
    let mut v = Validator::new(data);

    let username = v.required(USERNAME, 150);
    let user = if v.has_error(USERNAME) {
        None
    } else {
        let user = users::find_by_username(conn, &username)?;
        if user.is_none() {
            v.error(USERNAME, "Aucun utilisateur ne porte ce nom.");
        }
        user
    };

    let badge_id = v.choice_id(BADGE);
    if !v.has_error(BADGE) && !linked.iter().any(|b| b.id == badge_id) {
        v.error(BADGE, INVALID_CHOICE);
    }

    // A missing user has already been reported as a field error
    let checked = v.finish(());
    Ok(checked.and_then(|()| {
        user.map(|user| Award { user, badge_id })
            .ok_or_else(FormErrors::default)
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::rewards::insert_badge_named;
    use crate::db::test_support::migrated_pool;
    use crate::db::users::{insert_plain, Roles};

    #[test]
    fn badge_code_is_derived_from_name() {
        let (_tmp, pool) = migrated_pool();
        let conn = pool.get().unwrap();
        let data = FormData::from_pairs([(NAME, "Roi du Squat"), (CATEGORY, "Force")]);

        let fields = validate_badge(&conn, &data).unwrap().unwrap();
        assert_eq!(fields.code, "roi-du-squat");
    }

    #[test]
    fn colliding_badge_code_is_rejected() {
        let (_tmp, pool) = migrated_pool();
        let conn = pool.get().unwrap();
        insert_badge_named(&conn, "Roi du squat");
        let data = FormData::from_pairs([(NAME, "ROI DU SQUAT"), (CATEGORY, "Force")]);

        let errors = validate_badge(&conn, &data).unwrap().unwrap_err();
        assert!(errors.has(NAME));
    }

    #[test]
    fn deadlines_accept_browser_formats() {
        assert_eq!(
            parse_deadline("2030-05-01T18:30").unwrap().format(DEADLINE_FORMAT).to_string(),
            "2030-05-01 18:30:00"
        );
        assert_eq!(
            parse_deadline("2030-05-01").unwrap().format(DEADLINE_FORMAT).to_string(),
            "2030-05-01 23:59:59"
        );
        assert!(parse_deadline("demain").is_none());
    }

    #[test]
    fn challenge_badges_collapse_duplicates() {
        let (_tmp, pool) = migrated_pool();
        let conn = pool.get().unwrap();
        let a = insert_badge_named(&conn, "A");
        let b = insert_badge_named(&conn, "B");
        let (a_s, b_s) = (a.to_string(), b.to_string());
        let data = FormData::from_pairs([
            (NAME, "Défi"),
            (DEADLINE, "2030-01-01T00:00"),
            (BADGES, a_s.as_str()),
            (BADGES, b_s.as_str()),
            (BADGES, a_s.as_str()),
        ]);

        let fields = validate_challenge(&conn, &data).unwrap().unwrap();
        assert_eq!(fields.badge_ids, vec![a, b]);
    }

    #[test]
    fn challenge_needs_badges_and_known_ids() {
        let (_tmp, pool) = migrated_pool();
        let conn = pool.get().unwrap();
        let empty = FormData::from_pairs([(NAME, "Défi"), (DEADLINE, "2030-01-01")]);
        assert!(validate_challenge(&conn, &empty).unwrap().unwrap_err().has(BADGES));

        let unknown = FormData::from_pairs([(NAME, "Défi"), (DEADLINE, "2030-01-01"), (BADGES, "42")]);
        assert!(validate_challenge(&conn, &unknown).unwrap().unwrap_err().has(BADGES));
    }

    #[test]
    fn award_requires_a_linked_badge() {
        let (_tmp, pool) = migrated_pool();
        let conn = pool.get().unwrap();
        insert_plain(&conn, "alice", Roles::default());
        let linked = insert_badge_named(&conn, "Lié");
        let other = insert_badge_named(&conn, "Autre");
        let badges = crate::db::rewards::badges(&conn).unwrap();
        let linked_only: Vec<Badge> = badges.into_iter().filter(|b| b.id == linked).collect();

        let ok = FormData::from_pairs([(USERNAME, "alice".to_string()), (BADGE, linked.to_string())]);
        let award = validate_award(&conn, &ok, &linked_only).unwrap().unwrap();
        assert_eq!(award.user.username, "alice");

        let wrong = FormData::from_pairs([(USERNAME, "alice".to_string()), (BADGE, other.to_string())]);
        assert!(validate_award(&conn, &wrong, &linked_only).unwrap().unwrap_err().has(BADGE));

        let nobody = FormData::from_pairs([(USERNAME, "ghost".to_string()), (BADGE, linked.to_string())]);
        assert!(validate_award(&conn, &nobody, &linked_only).unwrap().unwrap_err().has(USERNAME));
    }
}
