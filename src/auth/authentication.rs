use rocket::Request;
use rocket::http::Status;
use rocket::request::{FromRequest, Outcome};
use rocket::response::status::Custom;
use rocket::serde::json::Json;
use sqlx::SqlitePool;
use tracing::Instrument;

use crate::db::{find_user_by_clerk_id, get_session_by_token, get_user};
use crate::error::{AppError, ErrorBody};

use super::{ClerkVerifier, SESSION_COOKIE, User, bearer_token};

async fn authenticate(request: &Request<'_>) -> Result<Option<User>, AppError> {
    let db = request
        .rocket()
        .state::<SqlitePool>()
        .ok_or_else(|| AppError::Internal("Database pool not found in managed state".into()))?;

    let token = request
        .cookies()
        .get_private(SESSION_COOKIE)
        .map(|c| c.value().to_string());

    if let Some(token) = token {
        match get_session_by_token(db, &token).await {
            Ok(session) if session.is_valid() => {
                let user = get_user(db, session.user_id).await?;
                tracing::info!(username = %user.username, role = %user.role, "User authenticated via session token");
                return Ok(Some(user));
            }
            Ok(_) => tracing::warn!("Session token expired"),
            Err(err) => tracing::warn!(error = ?err, "Invalid session token"),
        }
    }

    let Some(bearer) = bearer_token(request) else {
        return Ok(None);
    };

    let Some(verifier) = request.rocket().state::<ClerkVerifier>() else {
        return Ok(None);
    };

    let claims = verifier.verify(bearer)?;

    match find_user_by_clerk_id(db, &claims.sub).await? {
        Some(user) => {
            tracing::info!(username = %user.username, "User authenticated via Clerk token");
            Ok(Some(user))
        }
        None => {
            tracing::warn!(clerk_id = %claims.sub, "Clerk user has not been synced yet");
            Ok(None)
        }
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for User {
    type Error = ();

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let result = authenticate(request)
            .instrument(tracing::info_span!("user_auth_guard"))
            .await;

        match result {
            Ok(Some(user)) => Outcome::Success(user),
            Ok(None) => Outcome::Error((Status::Unauthorized, ())),
            Err(err) => {
                err.log_and_record("User request guard");
                let status = match err {
                    AppError::Authentication(_) | AppError::NotFound(_) => Status::Unauthorized,
                    _ => err.status_code(),
                };
                Outcome::Error((status, ()))
            }
        }
    }
}

fn error_response(status: Status, message: &str) -> Custom<Json<ErrorBody>> {
    Custom(status, Json(ErrorBody::new(status, message)))
}

#[catch(400)]
pub fn bad_request_api(_req: &Request) -> Custom<Json<ErrorBody>> {
    error_response(Status::BadRequest, "Bad request")
}

#[catch(401)]
pub fn unauthorized_api(req: &Request) -> Custom<Json<ErrorBody>> {
    tracing::warn!(uri = %req.uri(), "Unauthorized access attempt");
    error_response(Status::Unauthorized, "Authentication required")
}

#[catch(403)]
pub fn forbidden_api(req: &Request) -> Custom<Json<ErrorBody>> {
    tracing::warn!(uri = %req.uri(), "Forbidden access attempt");
    error_response(
        Status::Forbidden,
        "You don't have permission to perform this action",
    )
}

#[catch(404)]
pub fn not_found_api(_req: &Request) -> Custom<Json<ErrorBody>> {
    error_response(Status::NotFound, "Resource not found")
}

#[catch(422)]
pub fn unprocessable_api(_req: &Request) -> Custom<Json<ErrorBody>> {
    error_response(Status::UnprocessableEntity, "Malformed request body")
}

#[catch(default)]
pub fn default_api(status: Status, _req: &Request) -> Custom<Json<ErrorBody>> {
    error_response(status, status.reason().unwrap_or("An error occurred"))
}
