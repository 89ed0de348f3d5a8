use axum::{
    Json,
    extract::State,
    http::{HeaderName, HeaderValue, StatusCode, header},
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use ts_rs::TS;
use utoipa::ToSchema;

use crate::{
    AppState,
    auth::{
        AuthUser, GoogleIdentity, clear_session_cookie, hash_password, issue_token,
        reject_password, session_cookie, verify_password,
    },
    error::{ApiResult, AppError},
    forms::{JsonBody, Violations},
    models::{
        AdminSummary, ApiResponse, ChangePasswordRequest, GoogleSigninRequest, NewUser,
        SigninRequest, SignupRequest, User, UserProfile,
    },
};

/// Minimum accepted password length.
pub const MIN_PASSWORD_LEN: usize = 8;

const INVALID_SIGNIN: &str = "Invalid email or password";

/// AuthPayload
///
/// Returned by every sign-in flow. The token is also set as the session cookie;
/// it is included in the body for clients that use the bearer header.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct AuthPayload {
    pub user: UserProfile,
    pub token: String,
}

type SessionResponse = (
    StatusCode,
    [(HeaderName, HeaderValue); 1],
    Json<ApiResponse<AuthPayload>>,
);

/// Issues a token for `user` and packages it as cookie plus body.
fn start_session(
    state: &AppState,
    user: &User,
    status: StatusCode,
    message: &str,
) -> ApiResult<SessionResponse> {
    let token = issue_token(user, &state.config.jwt_secret)?;
    let cookie = session_cookie(&token, state.config.is_production())?;
    Ok((
        status,
        [(header::SET_COOKIE, cookie)],
        Json(ApiResponse::with_message(
            AuthPayload {
                user: UserProfile::from(user),
                token,
            },
            message,
        )),
    ))
}

fn looks_like_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
        }
        None => false,
    }
}

fn check_new_password(field: &str, password: &str, v: &mut Violations) {
    if password.chars().count() < MIN_PASSWORD_LEN {
        v.push(
            field,
            format!("Password must be at least {MIN_PASSWORD_LEN} characters"),
        );
    }
}

/// signup
///
/// [Public Route] Creates a password account. The role comes from the role
/// policy, never from the request body.
#[utoipa::path(
    post,
    path = "/auth/signup",
    tag = "auth",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "Account created and signed in", body = AuthPayload),
        (status = 400, description = "Validation failed"),
        (status = 409, description = "Email already registered")
    )
)]
pub async fn signup(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<SignupRequest>,
) -> ApiResult<SessionResponse> {
    let name = payload.name.trim().to_string();
    let email = payload.email.trim().to_lowercase();

    let mut v = Violations::new();
    if name.is_empty() {
        v.push("name", "name is required");
    }
    if email.is_empty() {
        v.push("email", "email is required");
    } else if !looks_like_email(&email) {
        v.push("email", "email is not a valid address");
    }
    check_new_password("password", &payload.password, &mut v);
    v.into_result()?;

    if state.repo.find_user_by_email(&email).await?.is_some() {
        return Err(AppError::Conflict(
            "An account with this email already exists".to_string(),
        ));
    }

    let role = state.roles.role_for(&email, payload.invite_code.as_deref());
    let password_hash = hash_password(payload.password).await?;

    let user = state
        .repo
        .create_user(NewUser {
            email,
            password_hash: Some(password_hash),
            name,
            role,
            google_id: None,
            avatar_url: None,
        })
        .await?;
    info!(user_id = %user.id, role = %user.role.as_str(), "account created");

    start_session(&state, &user, StatusCode::CREATED, "Account created successfully")
}

/// signin
///
/// [Public Route] Unknown email, wrong password and password-less accounts all
/// produce the same 401.
#[utoipa::path(
    post,
    path = "/auth/signin",
    tag = "auth",
    request_body = SigninRequest,
    responses(
        (status = 200, description = "Signed in", body = AuthPayload),
        (status = 401, description = "Invalid email or password")
    )
)]
pub async fn signin(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<SigninRequest>,
) -> ApiResult<SessionResponse> {
    let invalid = || AppError::InvalidCredential(INVALID_SIGNIN.to_string());

    let email = payload.email.trim();
    if email.is_empty() || payload.password.is_empty() {
        return Err(invalid());
    }

    let user = state.repo.find_user_by_email(email).await?;
    let Some((user, hash)) = user.and_then(|u| u.password_hash.clone().map(|h| (u, h))) else {
        reject_password(payload.password).await;
        warn!("sign-in rejected");
        return Err(invalid());
    };

    if !verify_password(payload.password, hash).await {
        warn!(user_id = %user.id, "sign-in rejected");
        return Err(invalid());
    }

    info!(user_id = %user.id, "signed in");
    start_session(&state, &user, StatusCode::OK, "Signed in successfully")
}

/// google_signin
///
/// [Public Route] Verifies a Google ID token, then signs in the matching
/// account, links a password account that has the same email, or creates a
/// new account.
#[utoipa::path(
    post,
    path = "/auth/google",
    tag = "auth",
    request_body = GoogleSigninRequest,
    responses(
        (status = 200, description = "Signed in", body = AuthPayload),
        (status = 401, description = "Credential rejected"),
        (status = 502, description = "Identity provider unavailable")
    )
)]
pub async fn google_signin(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<GoogleSigninRequest>,
) -> ApiResult<SessionResponse> {
    let credential = payload.credential.trim();
    if credential.is_empty() {
        return Err(AppError::invalid("credential", "credential is required"));
    }

    let identity = state.identity.verify(credential).await?;
    let user = upsert_google_user(&state, &identity, payload.invite_code.as_deref()).await?;

    info!(user_id = %user.id, "signed in with Google");
    start_session(&state, &user, StatusCode::OK, "Signed in successfully")
}

async fn upsert_google_user(
    state: &AppState,
    identity: &GoogleIdentity,
    invite_code: Option<&str>,
) -> ApiResult<User> {
    if let Some(user) = state.repo.find_user_by_google_id(&identity.subject).await? {
        return Ok(user);
    }

    if let Some(user) = state.repo.find_user_by_email(&identity.email).await? {
        if user.google_id.is_some() {
            // Same email, different Google account.
            return Err(AppError::Conflict(
                "This email is linked to a different Google account".to_string(),
            ));
        }
        let linked = state
            .repo
            .link_google_account(user.id, &identity.subject, identity.picture.as_deref())
            .await?
            .ok_or_else(|| AppError::Internal("linked account vanished".to_string()))?;
        info!(user_id = %linked.id, "linked Google account to existing user");
        return Ok(linked);
    }

    let name = identity
        .name
        .clone()
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| identity.email.split('@').next().unwrap_or_default().to_string());

    let user = state
        .repo
        .create_user(NewUser {
            email: identity.email.clone(),
            password_hash: None,
            name,
            role: state.roles.role_for(&identity.email, invite_code),
            google_id: Some(identity.subject.clone()),
            avatar_url: identity.picture.clone(),
        })
        .await?;
    info!(user_id = %user.id, role = %user.role.as_str(), "account created from Google identity");
    Ok(user)
}

/// me
///
/// [Authenticated Route] The caller's profile.
#[utoipa::path(
    get,
    path = "/auth/me",
    tag = "auth",
    responses(
        (status = 200, description = "Profile", body = UserProfile),
        (status = 401, description = "No session")
    )
)]
pub async fn me(
    user: AuthUser,
    State(state): State<AppState>,
) -> ApiResult<Json<ApiResponse<UserProfile>>> {
    let user = state
        .repo
        .find_user_by_id(user.id)
        .await?
        .ok_or_else(|| AppError::Unauthenticated("Account no longer exists".to_string()))?;
    Ok(Json(ApiResponse::data(UserProfile::from(&user))))
}

/// logout
///
/// [Authenticated Route] Expires the session cookie. Tokens are stateless, so
/// a copied bearer token stays valid until it expires.
#[utoipa::path(
    post,
    path = "/auth/logout",
    tag = "auth",
    responses((status = 200, description = "Signed out"))
)]
pub async fn logout(
    user: AuthUser,
    State(state): State<AppState>,
) -> ApiResult<([(HeaderName, HeaderValue); 1], Json<ApiResponse<()>>)> {
    let cookie = clear_session_cookie(state.config.is_production())?;
    info!(user_id = %user.id, "signed out");
    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(ApiResponse::<()>::message("Signed out successfully")),
    ))
}

/// list_admins
///
/// [Public Route] Admin accounts for contributor pickers. No emails.
#[utoipa::path(
    get,
    path = "/auth/admins",
    tag = "auth",
    responses((status = 200, description = "Admins", body = [AdminSummary]))
)]
pub async fn list_admins(
    State(state): State<AppState>,
) -> ApiResult<Json<ApiResponse<Vec<AdminSummary>>>> {
    let admins = state.repo.list_admins().await?;
    Ok(Json(ApiResponse::data(
        admins.iter().map(AdminSummary::from).collect(),
    )))
}

/// change_password
///
/// [Authenticated Route] Requires the current password; accounts created
/// through Google sign-in have none to change.
#[utoipa::path(
    post,
    path = "/auth/change-password",
    tag = "auth",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed"),
        (status = 400, description = "Validation failed"),
        (status = 401, description = "Current password is incorrect")
    )
)]
pub async fn change_password(
    user: AuthUser,
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<ChangePasswordRequest>,
) -> ApiResult<Json<ApiResponse<()>>> {
    let mut v = Violations::new();
    if payload.current_password.is_empty() {
        v.push("current_password", "current_password is required");
    }
    check_new_password("new_password", &payload.new_password, &mut v);
    v.into_result()?;

    let account = state
        .repo
        .find_user_by_id(user.id)
        .await?
        .ok_or_else(|| AppError::Unauthenticated("Account no longer exists".to_string()))?;

    let Some(current_hash) = account.password_hash else {
        return Err(AppError::BadRequest(
            "This account signs in with Google and has no password to change".to_string(),
        ));
    };

    if !verify_password(payload.current_password, current_hash).await {
        warn!(user_id = %user.id, "password change rejected");
        return Err(AppError::InvalidCredential(
            "Current password is incorrect".to_string(),
        ));
    }

    let new_hash = hash_password(payload.new_password).await?;
    if !state.repo.update_password_hash(user.id, &new_hash).await? {
        return Err(AppError::Unauthenticated(
            "Account no longer exists".to_string(),
        ));
    }

    info!(user_id = %user.id, "password changed");
    Ok(Json(ApiResponse::<()>::message("Password changed successfully")))
}
