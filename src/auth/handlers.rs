use crate::{
    auth::{
        jwt::{Subject, issue_token, verify_token},
        password::verify_password,
    },
    config::Config,
    error::AppError,
    models::{Claims, LoginReqDto, TokenPair, TokenType, UserSql},
};
use actix_web::{HttpRequest, HttpResponse, web};
use sqlx::MySqlPool;
use tracing::{debug, info, instrument, warn};

fn bearer(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
}

fn unauthorized() -> HttpResponse {
    HttpResponse::Unauthorized().json(serde_json::json!({ "message": "Invalid credentials" }))
}

/// Issues an access/refresh pair and records the refresh jti.
async fn issue_pair(
    pool: &MySqlPool,
    config: &Config,
    subject: &Subject,
) -> Result<TokenPair, AppError> {
    let (access_token, _) = issue_token(subject, TokenType::Access, &config.jwt_secret, config.access_token_ttl)
        .map_err(|e| AppError::Internal(e.into()))?;
    let (refresh_token, refresh_claims) =
        issue_token(subject, TokenType::Refresh, &config.jwt_secret, config.refresh_token_ttl)
            .map_err(|e| AppError::Internal(e.into()))?;

    sqlx::query(
        r#"
        INSERT INTO refresh_tokens (user_id, jti, expires_at)
        VALUES (?, ?, FROM_UNIXTIME(?))
        "#,
    )
    .bind(subject.user_id)
    .bind(&refresh_claims.jti)
    .bind(refresh_claims.exp as i64)
    .execute(pool)
    .await?;

    Ok(TokenPair {
        access_token,
        refresh_token,
    })
}

#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginReqDto,
    responses(
        (status = 200, description = "Token pair", body = TokenPair),
        (status = 400, description = "Username or password missing"),
        (status = 401, description = "Invalid credentials")
    ),
    tag = "Auth"
)]
#[instrument(name = "auth_login", skip(pool, config, user), fields(username = %user.username))]
pub async fn login(
    user: web::Json<LoginReqDto>,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> Result<HttpResponse, AppError> {
    if user.username.trim().is_empty() || user.password.is_empty() {
        return Err(AppError::BadRequest("Username or password required".into()));
    }

    let db_user = sqlx::query_as::<_, UserSql>(
        r#"
        SELECT id, username, password, role_id, employee_id, is_active
        FROM users
        WHERE username = ?
        "#,
    )
    .bind(user.username.trim())
    .fetch_optional(pool.get_ref())
    .await?;

    let Some(db_user) = db_user.filter(|u| u.is_active) else {
        info!("Invalid credentials: unknown or inactive user");
        return Ok(unauthorized());
    };

    if let Err(e) = verify_password(&user.password, &db_user.password) {
        info!(error = %e, "Invalid credentials: password mismatch");
        return Ok(unauthorized());
    }

    let subject = Subject {
        user_id: db_user.id,
        username: db_user.username,
        role: db_user.role_id,
        employee_id: db_user.employee_id,
    };
    let pair = issue_pair(pool.get_ref(), &config, &subject).await?;

    if let Err(e) = sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = ?")
        .bind(subject.user_id)
        .execute(pool.get_ref())
        .await
    {
        // not worth failing the login over
        warn!(error = %e, "Failed to update last_login_at");
    }

    info!(user_id = subject.user_id, "Login successful");
    Ok(HttpResponse::Ok().json(pair))
}

/// Rotates a refresh token: the old jti is revoked, a new pair is issued.
#[utoipa::path(
    post,
    path = "/auth/refresh",
    responses(
        (status = 200, description = "New token pair", body = TokenPair),
        (status = 401, description = "Refresh token invalid, expired or revoked")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn refresh_token(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> Result<HttpResponse, AppError> {
    let claims: Claims = match bearer(&req).map(|t| verify_token(t, &config.jwt_secret)) {
        Some(Ok(c)) if c.token_type == TokenType::Refresh => c,
        _ => return Ok(HttpResponse::Unauthorized().finish()),
    };

    let mut tx = pool.begin().await?;

    let revoked = sqlx::query(
        "UPDATE refresh_tokens SET revoked = 1 WHERE jti = ? AND revoked = 0",
    )
    .bind(&claims.jti)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    if revoked == 0 {
        debug!(jti = %claims.jti, "Refresh token unknown or already revoked");
        return Ok(HttpResponse::Unauthorized().finish());
    }

    tx.commit().await?;

    let pair = issue_pair(pool.get_ref(), &config, &Subject::from(&claims)).await?;
    Ok(HttpResponse::Ok().json(pair))
}

#[utoipa::path(
    post,
    path = "/auth/logout",
    responses((status = 204, description = "Refresh token revoked (idempotent)")),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn logout(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> Result<HttpResponse, AppError> {
    let claims = match bearer(&req).map(|t| verify_token(t, &config.jwt_secret)) {
        Some(Ok(c)) if c.token_type == TokenType::Refresh => c,
        _ => return Ok(HttpResponse::NoContent().finish()),
    };

    sqlx::query("UPDATE refresh_tokens SET revoked = 1 WHERE jti = ?")
        .bind(&claims.jti)
        .execute(pool.get_ref())
        .await?;

    Ok(HttpResponse::NoContent().finish())
}
