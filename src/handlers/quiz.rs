// src/handlers/quiz.rs

use axum::{
    Json,
    extract::State,
    http::header,
    response::IntoResponse,
};
use chrono::Utc;
use serde_json::{Value, json};

use crate::{
    error::AppError,
    extract::{ValidJson, ValidQuery},
    ledger::{LedgerWrite, admit},
    models::{
        quiz_attempt::{EmailQuery, QuizKind, SaveQuizRequest},
        user::normalize_email,
    },
    ranking::{max_scores, rank_top3},
    report::render_history_html,
    state::{AppState, SharedStore},
};

/// Runs one submission through the capped ledger.
///
/// The per-email lock is held from the read to the write, so concurrent
/// submissions for the same user see each other's result.
async fn record_score(
    state: &AppState,
    kind: QuizKind,
    req: SaveQuizRequest,
) -> Result<Json<Value>, AppError> {
    let email = normalize_email(&req.email);
    let _guard = state.ledger_locks.acquire(&email).await;

    let attempts = state.store.find_attempts_by_email(&email).await?;
    let decision = admit(&attempts, kind, req.score, state.config.quiz_attempt_cap);
    let today = Utc::now().date_naive();

    match decision.apply(&attempts, &email, kind, req.score, today) {
        Some(LedgerWrite::Insert(attempt)) => {
            state.store.insert_attempt(attempt).await?;
        }
        Some(LedgerWrite::Save(attempt)) => {
            state.store.save_attempt(&attempt).await?;
        }
        None => {
            tracing::info!(
                email = %email,
                quiz = kind.label(),
                score = req.score,
                "Quiz score rejected by ledger"
            );
            return Err(AppError::PolicyRejected(decision.message().to_string()));
        }
    }

    tracing::info!(
        email = %email,
        quiz = kind.label(),
        score = req.score,
        outcome = decision.outcome(),
        "Quiz score recorded"
    );

    Ok(Json(json!({
        "message": decision.message(),
        "outcome": decision.outcome(),
    })))
}

/// Saves a basic quiz score.
pub async fn save_basic_quiz(
    State(state): State<AppState>,
    ValidJson(req): ValidJson<SaveQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    record_score(&state, QuizKind::Basic, req).await
}

/// Saves an advanced quiz score.
pub async fn save_advance_quiz(
    State(state): State<AppState>,
    ValidJson(req): ValidJson<SaveQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    record_score(&state, QuizKind::Advance, req).await
}

/// Best basic and advanced score across all of the user's attempts.
pub async fn fetch_quiz_scores(
    State(store): State<SharedStore>,
    ValidJson(req): ValidJson<EmailQuery>,
) -> Result<impl IntoResponse, AppError> {
    let attempts = store
        .find_attempts_by_email(&normalize_email(&req.email))
        .await?;

    Ok(Json(max_scores(&attempts)))
}

/// Top three attempts by combined score.
pub async fn quiz_history(
    State(store): State<SharedStore>,
    ValidQuery(query): ValidQuery<EmailQuery>,
) -> Result<impl IntoResponse, AppError> {
    let attempts = store
        .find_attempts_by_email(&normalize_email(&query.email))
        .await?;
    let history = rank_top3(&attempts);

    let message = if history.is_empty() {
        "No quiz history found"
    } else {
        "Quiz history fetched successfully"
    };

    Ok(Json(json!({
        "message": message,
        "history": history,
    })))
}

/// Full attempt table as a printable HTML page.
pub async fn download_quiz_history(
    State(store): State<SharedStore>,
    ValidQuery(query): ValidQuery<EmailQuery>,
) -> Result<impl IntoResponse, AppError> {
    let email = normalize_email(&query.email);
    let attempts = store.find_attempts_by_email(&email).await?;
    let html = render_history_html(&email, &attempts, Utc::now().date_naive());

    Ok((
        [
            (header::CONTENT_TYPE, "text/html; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "inline; filename=\"quiz-history.html\"",
            ),
        ],
        html,
    ))
}
