//! Read-only list views over every entity, for staff.
//!
//! Each model is described once by a [`ModelAdmin`]: which columns to show,
//! which ones can be filtered on exactly, and which ones the `q` search box
//! looks into. All SQL fragments are static; user input is only ever bound.

use rusqlite::types::ValueRef;
use rusqlite::{params_from_iter, Connection};

use crate::db::contains_pattern;

/// Most rows a list view shows.
pub const MAX_ROWS: usize = 200;

#[derive(Debug)]
pub struct Column {
    pub label: &'static str,
    pub sql: &'static str,
}

#[derive(Debug)]
pub struct Filter {
    /// Query-string parameter name.
    pub param: &'static str,
    pub sql: &'static str,
}

#[derive(Debug)]
pub struct ModelAdmin {
    pub slug: &'static str,
    pub title: &'static str,
    from: &'static str,
    pub columns: &'static [Column],
    pub filters: &'static [Filter],
    search: &'static [&'static str],
    order_by: &'static str,
}

const fn col(label: &'static str, sql: &'static str) -> Column {
    Column { label, sql }
}

const fn filter(param: &'static str, sql: &'static str) -> Filter {
    Filter { param, sql }
}

pub static MODELS: &[ModelAdmin] = &[
    ModelAdmin {
        slug: "users",
        title: "Utilisateurs",
        from: "users u",
        columns: &[
            col("id", "u.id"),
            col("avatar", "u.avatar"),
            col("username", "u.username"),
            col("email", "u.email"),
            col("first_name", "u.first_name"),
            col("last_name", "u.last_name"),
            col("taille", "u.height_cm"),
            col("poids", "u.weight_kg"),
            col("sexe", "u.sex"),
            col("date_naissance", "u.birth_date"),
            col("is_superuser", "u.is_superuser"),
            col("is_staff", "u.is_staff"),
            col("is_active", "u.is_active"),
            col("last_login", "u.last_login"),
            col("date_joined", "u.date_joined"),
        ],
        filters: &[
            filter("sexe", "u.sex"),
            filter("last_login", "date(u.last_login)"),
            filter("is_superuser", "u.is_superuser"),
            filter("is_staff", "u.is_staff"),
            filter("is_active", "u.is_active"),
            filter("date_joined", "date(u.date_joined)"),
        ],
        search: &["u.username", "u.email", "u.first_name", "u.last_name"],
        order_by: "u.id",
    },
    ModelAdmin {
        slug: "muscle-groups",
        title: "Groupes musculaires",
        from: "muscle_groups g",
        columns: &[col("id", "g.id"), col("nom", "g.name")],
        filters: &[],
        search: &["g.name"],
        order_by: "g.id",
    },
    ModelAdmin {
        slug: "exercises",
        title: "Exercices",
        from: "exercises e JOIN muscle_groups g ON g.id = e.muscle_group_id",
        columns: &[
            col("id", "e.id"),
            col("nom", "e.name"),
            col("groupe_musculaire", "g.name"),
            col("series_sugg", "e.suggested_sets"),
            col("reps_sugg", "e.suggested_reps"),
            col("description", "e.description"),
            col("image", "e.image"),
            col("est_approuve", "e.is_approved"),
        ],
        filters: &[
            filter("groupe_musculaire", "g.name"),
            filter("series_sugg", "e.suggested_sets"),
            filter("reps_sugg", "e.suggested_reps"),
            filter("est_approuve", "e.is_approved"),
        ],
        search: &["e.name"],
        order_by: "e.id",
    },
    ModelAdmin {
        slug: "workouts",
        title: "Entraînements",
        from: "workouts w JOIN users u ON u.id = w.creator_id",
        columns: &[
            col("id", "w.id"),
            col("nom", "w.name"),
            col("date_creation", "w.created_at"),
            col("createur", "u.username"),
        ],
        filters: &[
            filter("date_creation", "date(w.created_at)"),
            filter("createur", "u.username"),
        ],
        search: &[
            "w.name",
            "u.username",
            "(SELECT group_concat(x.name, ' ') FROM workout_exercises we \
              JOIN exercises x ON x.id = we.exercise_id WHERE we.workout_id = w.id)",
        ],
        order_by: "w.id",
    },
    ModelAdmin {
        slug: "workout-exercises",
        title: "Exercices d'entraînement",
        from: "workout_exercises we \
               JOIN workouts w ON w.id = we.workout_id \
               JOIN exercises x ON x.id = we.exercise_id",
        columns: &[
            col("id", "we.id"),
            col("entrainement", "w.name"),
            col("exercice", "x.name"),
            col("sets", "we.sets"),
            col("reps", "we.reps"),
        ],
        filters: &[filter("entrainement", "w.name"), filter("exercice", "x.name")],
        search: &["w.name", "x.name"],
        order_by: "we.id",
    },
    ModelAdmin {
        slug: "badges",
        title: "Badges",
        from: "badges b",
        columns: &[
            col("nom", "b.name"),
            col("categorie", "b.category"),
            col("code", "b.code"),
            col("description", "b.description"),
        ],
        filters: &[filter("categorie", "b.category")],
        search: &["b.name", "b.description"],
        order_by: "b.id",
    },
    ModelAdmin {
        slug: "statistics",
        title: "Statistiques",
        from: "statistics s JOIN users u ON u.id = s.user_id",
        columns: &[
            col("id", "s.id"),
            col("user_id", "u.username"),
            col("sets_effectues", "s.sets_done"),
            col("reps_effectuees", "s.reps_done"),
            col("entrainements_completes", "s.workouts_completed"),
            col("exercices_completes", "s.exercises_completed"),
            col("badges_obtenus", "s.badges_earned"),
        ],
        filters: &[filter("user_id", "u.username")],
        search: &["u.username"],
        order_by: "s.id",
    },
    ModelAdmin {
        slug: "badge-progress",
        title: "Progression des badges",
        from: "user_badge_progress p \
               JOIN users u ON u.id = p.user_id \
               JOIN badges b ON b.id = p.badge_id \
               JOIN challenges c ON c.id = p.challenge_id",
        columns: &[
            col("id", "p.id"),
            col("user", "u.username"),
            col("badge", "b.name"),
            col("defi", "c.name"),
            col("est_complete", "p.is_complete"),
            col("date_completion", "p.completed_at"),
        ],
        filters: &[filter("defi", "c.name"), filter("badge", "b.name")],
        search: &["u.username", "b.name", "c.name"],
        order_by: "p.id",
    },
];

pub fn find(slug: &str) -> Option<&'static ModelAdmin> {
    MODELS.iter().find(|m| m.slug == slug)
}

/// Search term plus the exact-match filters picked from the query string.
#[derive(Debug, Default)]
pub struct ListRequest<'m> {
    pub search: Option<String>,
    pub filters: Vec<(&'m Filter, String)>,
}

impl ListRequest<'_> {
    pub fn selected(&self, param: &str) -> Option<&str> {
        self.filters
            .iter()
            .find(|(f, _)| f.param == param)
            .map(|(_, v)| v.as_str())
    }
}

fn display(value: ValueRef<'_>) -> String {
    match value {
        ValueRef::Null => "-".to_string(),
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(r) => r.to_string(),
        ValueRef::Text(t) => String::from_utf8_lossy(t).into_owned(),
        ValueRef::Blob(b) => format!("<{} octets>", b.len()),
    }
}

impl ModelAdmin {
    /// Pick `q` and this model's filter parameters out of the query string.
    /// Unknown parameters and blank values are ignored.
    pub fn request<'m>(&'m self, params: &[(String, String)]) -> ListRequest<'m> {
        let mut req = ListRequest::default();
        for (key, value) in params {
            let value = value.trim();
            if value.is_empty() {
                continue;
            }
            if key == "q" {
                req.search = Some(value.to_string());
            } else if let Some(f) = self.filters.iter().find(|f| f.param == key) {
                req.filters.push((f, value.to_string()));
            }
        }
        req
    }

    pub fn headers(&self) -> Vec<&'static str> {
        self.columns.iter().map(|c| c.label).collect()
    }

    pub fn list(&self, conn: &Connection, req: &ListRequest<'_>) -> rusqlite::Result<Vec<Vec<String>>> {
        let select = self
            .columns
            .iter()
            .map(|c| c.sql)
            .collect::<Vec<_>>()
            .join(", ");
        let mut sql = format!("SELECT {select} FROM {} WHERE 1 = 1", self.from);
        let mut values: Vec<String> = Vec::new();

        if let (Some(term), false) = (&req.search, self.search.is_empty()) {
            values.push(contains_pattern(term));
            let n = values.len();
            let any = self
                .search
                .iter()
                .map(|expr| format!("{expr} LIKE ?{n} ESCAPE '\\'"))
                .collect::<Vec<_>>()
                .join(" OR ");
            sql.push_str(&format!(" AND ({any})"));
        }
        for (f, value) in &req.filters {
            values.push(value.clone());
            sql.push_str(&format!(" AND {} = ?{}", f.sql, values.len()));
        }
        sql.push_str(&format!(" ORDER BY {} LIMIT {MAX_ROWS}", self.order_by));

        let width = self.columns.len();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(values.iter()), |row| {
                (0..width)
                    .map(|i| row.get_ref(i).map(display))
                    .collect::<rusqlite::Result<Vec<_>>>()
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Distinct values a filter can take, for the sidebar links.
    pub fn filter_values(&self, conn: &Connection, filter: &Filter) -> rusqlite::Result<Vec<String>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT DISTINCT {sql} FROM {from} WHERE {sql} IS NOT NULL ORDER BY 1 LIMIT 50",
            sql = filter.sql,
            from = self.from
        ))?;
        let values = stmt
            .query_map([], |row| row.get_ref(0).map(display))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::exercises::insert_named;
    use crate::db::test_support::migrated_pool;
    use crate::db::users::{insert_plain, Roles};

    fn params(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn slugs_are_unique_and_resolvable() {
        for model in MODELS {
            assert_eq!(find(model.slug).map(|m| m.slug), Some(model.slug));
            assert_eq!(MODELS.iter().filter(|m| m.slug == model.slug).count(), 1);
        }
        assert!(find("sessions").is_none());
    }

    #[test]
    fn every_model_lists_on_an_empty_database() {
        let (_tmp, pool) = migrated_pool();
        let conn = pool.get().unwrap();
        for model in MODELS {
            let req = model.request(&params(&[("q", "x")]));
            model.list(&conn, &req).unwrap();
            for f in model.filters {
                model.filter_values(&conn, f).unwrap();
            }
        }
    }

    #[test]
    fn users_search_and_filter() {
        let (_tmp, pool) = migrated_pool();
        let conn = pool.get().unwrap();
        insert_plain(&conn, "alice", Roles::default());
        insert_plain(
            &conn,
            "alfred",
            Roles {
                is_staff: true,
                is_superuser: false,
            },
        );
        insert_plain(&conn, "bob", Roles::default());
        let users = find("users").unwrap();

        let rows = users.list(&conn, &users.request(&params(&[("q", "AL")]))).unwrap();
        assert_eq!(rows.len(), 2);

        let req = users.request(&params(&[("q", "al"), ("is_staff", "1"), ("bogus", "1")]));
        assert_eq!(req.filters.len(), 1);
        assert_eq!(req.selected("is_staff"), Some("1"));
        let rows = users.list(&conn, &req).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0][2], "alfred");
        // Null avatar
        assert_eq!(rows[0][1], "-");
    }

    #[test]
    fn exercises_filter_by_approval() {
        let (_tmp, pool) = migrated_pool();
        let conn = pool.get().unwrap();
        insert_named(&conn, "Squat", true);
        insert_named(&conn, "Pending", false);
        let exercises = find("exercises").unwrap();

        let rows = exercises
            .list(&conn, &exercises.request(&params(&[("est_approuve", "0")])))
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0][1], "Pending");
        assert_eq!(rows[0][2], "Pectoraux");

        let values = exercises.filter_values(&conn, &exercises.filters[3]).unwrap();
        assert_eq!(values, vec!["0", "1"]);
    }
}
