use rand::Rng;
use rusqlite::{params, Connection};

/// Create a new session for a user. Returns the session token.
pub fn create_session(conn: &Connection, user_id: i64, hours: u64) -> Result<String, rusqlite::Error> {
    let token = generate_token();
    let id = uuid::Uuid::now_v7().to_string();

    conn.execute(
        "INSERT INTO sessions (id, user_id, token, expires_at) VALUES (?1, ?2, ?3, datetime('now', ?4))",
        params![id, user_id, token, format!("+{} hours", hours)],
    )?;

    Ok(token)
}

/// Delete a session by token.
pub fn delete_session(conn: &Connection, token: &str) -> Result<(), rusqlite::Error> {
    conn.execute("DELETE FROM sessions WHERE token = ?1", params![token])?;
    Ok(())
}

/// Drop every expired session. Returns how many went.
pub fn purge_expired(conn: &Connection) -> Result<usize, rusqlite::Error> {
    conn.execute("DELETE FROM sessions WHERE expires_at <= datetime('now')", [])
}

/// Generate a cryptographically random 32-byte hex token.
fn generate_token() -> String {
    let mut rng = rand::thread_rng();
    let bytes: [u8; 32] = rng.gen();
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

pub fn session_cookie(name: &str, token: &str, max_age_hours: u64) -> String {
    let max_age_secs = max_age_hours * 3600;
    format!(
        "{}={}; HttpOnly; SameSite=Strict; Path=/; Max-Age={}",
        name, token, max_age_secs
    )
}

pub fn clear_session_cookie(name: &str) -> String {
    format!("{}=; HttpOnly; SameSite=Strict; Path=/; Max-Age=0", name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::migrated_pool;
    use crate::db::users::{insert_plain, Roles};

    #[test]
    fn generate_token_is_64_hex_chars() {
        let token = generate_token();
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn generate_token_is_unique() {
        let t1 = generate_token();
        let t2 = generate_token();
        assert_ne!(t1, t2);
    }

    #[test]
    fn sessions_can_be_created_and_deleted() {
        let (_tmp, pool) = migrated_pool();
        let conn = pool.get().unwrap();
        let user = insert_plain(&conn, "alice", Roles::default());

        let token = create_session(&conn, user, 1).unwrap();
        let count = |conn: &Connection| -> i64 {
            conn.query_row("SELECT COUNT(*) FROM sessions", [], |row| row.get(0))
                .unwrap()
        };
        assert_eq!(count(&conn), 1);
        assert_eq!(purge_expired(&conn).unwrap(), 0);

        delete_session(&conn, &token).unwrap();
        assert_eq!(count(&conn), 0);
    }

    #[test]
    fn purge_removes_expired_sessions() {
        let (_tmp, pool) = migrated_pool();
        let conn = pool.get().unwrap();
        let user = insert_plain(&conn, "alice", Roles::default());
        conn.execute(
            "INSERT INTO sessions (id, user_id, token, expires_at) \
             VALUES ('old', ?1, 'stale', datetime('now', '-1 hours'))",
            params![user],
        )
        .unwrap();

        assert_eq!(purge_expired(&conn).unwrap(), 1);
    }

    #[test]
    fn cookies_carry_expected_attributes() {
        let cookie = session_cookie("halteres_session", "abc", 2);
        assert!(cookie.starts_with("halteres_session=abc;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Max-Age=7200"));
        assert!(clear_session_cookie("halteres_session").contains("Max-Age=0"));
    }
}
