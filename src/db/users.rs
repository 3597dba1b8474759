use rusqlite::{params, Connection, Row};

use crate::db::models::{Sex, User};
use crate::db::{contains_pattern, optional};

const USER_COLUMNS: &str = "id, username, email, first_name, last_name, height_cm, weight_kg, \
     sex, birth_date, avatar, is_staff, is_superuser, is_active, last_login, date_joined";

/// The editable part of an account, shared by registration and profile edit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserFields {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub height_cm: Option<f64>,
    pub weight_kg: Option<f64>,
    pub sex: Option<Sex>,
    pub birth_date: Option<String>,
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Roles {
    pub is_staff: bool,
    pub is_superuser: bool,
}

/// What the login check needs, and nothing else.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub id: i64,
    pub password_hash: String,
    pub is_active: bool,
}

fn from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    let sex: Option<String> = row.get(7)?;
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        first_name: row.get(3)?,
        last_name: row.get(4)?,
        height_cm: row.get(5)?,
        weight_kg: row.get(6)?,
        sex: sex.as_deref().and_then(Sex::from_code),
        birth_date: row.get(8)?,
        avatar: row.get(9)?,
        is_staff: row.get(10)?,
        is_superuser: row.get(11)?,
        is_active: row.get(12)?,
        last_login: row.get(13)?,
        date_joined: row.get(14)?,
    })
}

pub fn insert(
    conn: &Connection,
    fields: &UserFields,
    password_hash: &str,
    roles: Roles,
) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO users (username, email, first_name, last_name, height_cm, weight_kg, sex, \
         birth_date, avatar, password_hash, is_staff, is_superuser) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            fields.username,
            fields.email,
            fields.first_name,
            fields.last_name,
            fields.height_cm,
            fields.weight_kg,
            fields.sex.map(Sex::code),
            fields.birth_date,
            fields.avatar,
            password_hash,
            roles.is_staff,
            roles.is_superuser,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn update_profile(conn: &Connection, id: i64, fields: &UserFields) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE users SET username = ?1, email = ?2, first_name = ?3, last_name = ?4, \
         height_cm = ?5, weight_kg = ?6, sex = ?7, birth_date = ?8, avatar = ?9 WHERE id = ?10",
        params![
            fields.username,
            fields.email,
            fields.first_name,
            fields.last_name,
            fields.height_cm,
            fields.weight_kg,
            fields.sex.map(Sex::code),
            fields.birth_date,
            fields.avatar,
            id,
        ],
    )?;
    Ok(())
}

pub fn find(conn: &Connection, id: i64) -> rusqlite::Result<Option<User>> {
    optional(conn.query_row(
        &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
        params![id],
        from_row,
    ))
}

pub fn find_by_username(conn: &Connection, username: &str) -> rusqlite::Result<Option<User>> {
    optional(conn.query_row(
        &format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?1"),
        params![username],
        from_row,
    ))
}

pub fn credentials(conn: &Connection, username: &str) -> rusqlite::Result<Option<Credentials>> {
    optional(conn.query_row(
        "SELECT id, password_hash, is_active FROM users WHERE username = ?1",
        params![username],
        |row| {
            Ok(Credentials {
                id: row.get(0)?,
                password_hash: row.get(1)?,
                is_active: row.get(2)?,
            })
        },
    ))
}

/// Whether `username` belongs to an account other than `except`.
pub fn username_taken(
    conn: &Connection,
    username: &str,
    except: Option<i64>,
) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT COUNT(*) > 0 FROM users WHERE username = ?1 AND id IS NOT ?2",
        params![username, except],
        |row| row.get(0),
    )
}

pub fn touch_last_login(conn: &Connection, id: i64) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE users SET last_login = datetime('now') WHERE id = ?1",
        params![id],
    )?;
    Ok(())
}

/// Directory query: optional case-insensitive username substring. Staff and
/// superuser accounts are only included when `include_privileged` is set.
pub struct DirectoryQuery<'a> {
    pub username: Option<&'a str>,
    pub include_privileged: bool,
}

impl DirectoryQuery<'_> {
    fn where_clause(&self) -> (&'static str, String) {
        let pattern = contains_pattern(self.username.unwrap_or(""));
        let clause = if self.include_privileged {
            "WHERE username LIKE ?1 ESCAPE '\\'"
        } else {
            "WHERE username LIKE ?1 ESCAPE '\\' AND is_staff = 0 AND is_superuser = 0"
        };
        (clause, pattern)
    }

    pub fn count(&self, conn: &Connection) -> rusqlite::Result<i64> {
        let (clause, pattern) = self.where_clause();
        conn.query_row(
            &format!("SELECT COUNT(*) FROM users {clause}"),
            params![pattern],
            |row| row.get(0),
        )
    }

    pub fn fetch(&self, conn: &Connection, limit: i64, offset: i64) -> rusqlite::Result<Vec<User>> {
        let (clause, pattern) = self.where_clause();
        let mut stmt = conn.prepare(&format!(
            "SELECT {USER_COLUMNS} FROM users {clause} ORDER BY username LIMIT ?2 OFFSET ?3"
        ))?;
        let users = stmt
            .query_map(params![pattern, limit, offset], from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(users)
    }
}

#[cfg(test)]
pub(crate) fn insert_plain(conn: &Connection, username: &str, roles: Roles) -> i64 {
    let fields = UserFields {
        username: username.to_string(),
        email: format!("{username}@example.com"),
        ..UserFields::default()
    };
    insert(conn, &fields, "not-a-real-hash", roles).unwrap()
}
