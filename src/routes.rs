// src/routes.rs

use axum::{
    Router,
    http::{Method, header},
    middleware,
    routing::{get, post},
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    handlers::{auth, google, quiz},
    state::AppState,
    utils::jwt::auth_middleware,
};

/// Assembles the main application router.
///
/// * Merges the auth, Google sign-in and quiz routes.
/// * Applies global middleware (Trace, CORS).
/// * Injects the shared `AppState`.
pub fn create_router(state: AppState) -> Router {
    let origins = [
        state.config.public_base_url.as_str(),
        "http://localhost:3000",
        "http://127.0.0.1:3000",
    ]
    .into_iter()
    .filter_map(|origin| origin.parse().ok())
    .collect::<Vec<_>>();

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let auth_routes = Router::new()
        .route("/signup", post(auth::signup))
        .route("/verify-email", post(auth::verify_email))
        .route("/resend-verification", post(auth::resend_verification))
        .route("/login", post(auth::login))
        .route("/verify-otp", post(auth::verify_otp))
        .route("/forgot-password", post(auth::forgot_password))
        .route("/reset-password", post(auth::reset_password))
        .route("/reset-password/{token}", get(auth::reset_password_page))
        .route("/auth/google", get(google::google_login))
        .route("/auth/google/callback", get(google::google_callback))
        // Protected routes
        .merge(
            Router::new()
                .route("/me", get(auth::me))
                .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware)),
        );

    let quiz_routes = Router::new()
        .route("/save-basic-quiz", post(quiz::save_basic_quiz))
        .route("/save-advance-quiz", post(quiz::save_advance_quiz))
        .route("/fetchquizscores", post(quiz::fetch_quiz_scores))
        .route("/quiz-history", get(quiz::quiz_history))
        .route("/download-quiz-history", get(quiz::download_quiz_history));

    Router::new()
        .merge(auth_routes)
        .merge(quiz_routes)
        // Global Middleware (applied from outside in)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
