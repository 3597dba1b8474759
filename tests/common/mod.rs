#![allow(dead_code)]

use axum::body::Body;
use axum::http::{header, Request, Response, StatusCode};
use axum::Router;
use tempfile::TempDir;
use tower::ServiceExt;

use halteres::auth::session;
use halteres::config::Config;
use halteres::db;
use halteres::db::exercises::{self, ExerciseFields};
use halteres::db::users::{self, Roles, UserFields};
use halteres::state::{AppState, DbPool};

pub struct TestApp {
    _tmp: TempDir,
    pub pool: DbPool,
    pub router: Router,
}

pub fn setup() -> TestApp {
    let tmp = TempDir::new().unwrap();
    let pool = db::create_pool(&tmp.path().join("test.db")).expect("Failed to create test database");
    db::run_migrations(&pool).expect("Failed to run migrations");
    let state = AppState {
        db: pool.clone(),
        config: Config::default(),
    };
    TestApp {
        _tmp: tmp,
        pool,
        router: halteres::app(state),
    }
}

impl TestApp {
    /// Insert an account and open a session for it. Returns the id and the
    /// `Cookie` header value.
    pub fn login_as(&self, username: &str, roles: Roles) -> (i64, String) {
        let conn = self.pool.get().unwrap();
        let fields = UserFields {
            username: username.to_string(),
            email: format!("{username}@example.com"),
            ..UserFields::default()
        };
        let id = users::insert(&conn, &fields, "not-a-real-hash", roles).unwrap();
        let token = session::create_session(&conn, id, 1).unwrap();
        (id, format!("halteres_session={token}"))
    }

    pub fn exercise(&self, name: &str, approved: bool) -> i64 {
        let conn = self.pool.get().unwrap();
        let fields = ExerciseFields {
            name: name.to_string(),
            muscle_group_id: 1,
            suggested_sets: 3,
            suggested_reps: 10,
            description: String::new(),
            image: None,
        };
        exercises::insert(&conn, &fields, approved).unwrap()
    }

    pub fn count(&self, table: &str) -> i64 {
        let conn = self.pool.get().unwrap();
        conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
            .unwrap()
    }

    pub async fn get(&self, path: &str, cookie: Option<&str>) -> Response<Body> {
        let mut request = Request::builder().uri(path);
        if let Some(cookie) = cookie {
            request = request.header(header::COOKIE, cookie);
        }
        self.router
            .clone()
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    pub async fn post(&self, path: &str, cookie: Option<&str>, form: &str) -> Response<Body> {
        let mut request = Request::builder()
            .method("POST")
            .uri(path)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            request = request.header(header::COOKIE, cookie);
        }
        self.router
            .clone()
            .oneshot(request.body(Body::from(form.to_string())).unwrap())
            .await
            .unwrap()
    }
}

pub fn staff() -> Roles {
    Roles {
        is_staff: true,
        is_superuser: false,
    }
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub fn location(response: &Response<Body>) -> &str {
    response.headers()[header::LOCATION].to_str().unwrap()
}

/// The `name=value` part of the flash cookie a response sets.
pub fn flash_cookie(response: &Response<Body>) -> String {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with("halteres_flash="))
        .and_then(|v| v.split(';').next())
        .expect("no flash cookie set")
        .to_string()
}

pub fn assert_redirect(response: &Response<Body>, to: &str) {
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(response), to);
}
