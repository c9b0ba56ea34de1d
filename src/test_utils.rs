#[cfg(test)]
pub mod test_utils {
    use crate::auth::{TokenIssuer, TokenType, hash_password};
    use crate::router::create_router;
    use crate::schemas::AppState;
    use axum::Router;
    use axum::http::{HeaderName, HeaderValue, header::AUTHORIZATION};
    use migration::{Migrator, MigratorTrait};
    use model::entities::user::{self, Role};
    use sea_orm::{ActiveModelTrait, Database, DatabaseConnection, Set};
    use tracing::Level;
    use tracing_subscriber::FmtSubscriber;

    pub const TEST_PASSWORD: &str = "correct-horse-battery";

    /// Create an in-memory SQLite database for testing
    pub async fn setup_test_db() -> DatabaseConnection {
        let db = Database::connect("sqlite::memory:")
            .await
            .expect("Failed to connect to in-memory database");

        Migrator::up(&db, None)
            .await
            .expect("Failed to run migrations");

        db
    }

    /// Create AppState for testing
    pub async fn setup_test_app_state() -> AppState {
        let db = setup_test_db().await;
        let tokens = TokenIssuer::new("test-signing-secret", 3_600, 86_400);
        AppState { db, tokens }
    }

    /// Initialize tracing for tests with output to STDERR.
    ///
    /// The log level comes from RUST_LOG, defaulting to WARN.
    fn init_test_tracing() -> tracing::subscriber::DefaultGuard {
        let log_level = std::env::var("RUST_LOG")
            .ok()
            .and_then(|level| match level.to_uppercase().as_str() {
                "ERROR" => Some(Level::ERROR),
                "WARN" => Some(Level::WARN),
                "INFO" => Some(Level::INFO),
                "DEBUG" => Some(Level::DEBUG),
                "TRACE" => Some(Level::TRACE),
                _ => None,
            })
            .unwrap_or(Level::WARN);

        let subscriber = FmtSubscriber::builder()
            .with_max_level(log_level)
            .with_writer(std::io::stderr)
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    /// Create axum app for testing, returning the state so tests can seed data
    pub async fn setup_test_app() -> (Router, AppState) {
        let _ = init_test_tracing();

        let state = setup_test_app_state().await;
        let router = create_router(state.clone());
        (router, state)
    }

    /// Inserts an active user whose password is [`TEST_PASSWORD`].
    pub async fn create_test_user(db: &DatabaseConnection, username: &str, role: Role) -> user::Model {
        user::ActiveModel {
            username: Set(username.to_string()),
            email: Set(format!("{username}@example.com")),
            password_hash: Set(hash_password(TEST_PASSWORD).expect("Failed to hash password")),
            first_name: Set(username.to_string()),
            last_name: Set("Test".to_string()),
            role: Set(role),
            must_change_password: Set(false),
            is_active: Set(true),
            ..Default::default()
        }
        .insert(db)
        .await
        .expect("Failed to create test user")
    }

    /// `Authorization` header carrying a fresh access token for `user_id`.
    pub fn bearer(state: &AppState, user_id: i32) -> (HeaderName, HeaderValue) {
        let token = state
            .tokens
            .issue(user_id, TokenType::Access)
            .expect("Failed to issue test token");
        let value = HeaderValue::from_str(&format!("Bearer {token}")).expect("Invalid header value");
        (AUTHORIZATION, value)
    }
}
