use crate::accounts::{self, ChangePasswordDto, LoginDto, UpdateUserDto, UserDto};

use super::prelude::*;

#[post("/api/accounts/CreateUser")]
pub async fn post_create_user(req: HttpRequest, dto: web::Json<UserDto>) -> HttpResult {
    let state = server_state(&req)?;
    let user = accounts::register(
        &state.db,
        state.photos.as_ref(),
        state.mailer.as_ref(),
        &state.accounts,
        &dto,
    )
    .await?;
    ok(user)
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmEmailQuery {
    user_id: i64,
    token: String,
}

#[get("/api/accounts/ConfirmEmail")]
pub async fn get_confirm_email(
    req: HttpRequest,
    query: web::Query<ConfirmEmailQuery>,
) -> HttpResult {
    let state = server_state(&req)?;
    accounts::confirm_email(&state.db, query.user_id, &query.token).await?;
    ok(true)
}

#[post("/api/accounts/Login")]
pub async fn post_login(req: HttpRequest, dto: web::Json<LoginDto>) -> HttpResult {
    let state = server_state(&req)?;
    ok(accounts::login(&state.db, &state.accounts, &dto).await?)
}

#[derive(Deserialize, Debug)]
pub struct ResendTokenDto {
    email: String,
    #[serde(default)]
    language: String,
}

#[post("/api/accounts/ResendToken")]
pub async fn post_resend_token(req: HttpRequest, dto: web::Json<ResendTokenDto>) -> HttpResult {
    let state = server_state(&req)?;
    accounts::resend_token(
        &state.db,
        state.mailer.as_ref(),
        &state.accounts,
        &dto.email,
        &dto.language,
    )
    .await?;
    ok(true)
}

#[get("/api/accounts")]
pub async fn get_account(req: HttpRequest) -> HttpResult {
    let claims = authenticate(&req)?;
    let state = server_state(&req)?;
    ok(accounts::get_user(&state.db, &claims.sub).await?)
}

#[put("/api/accounts")]
pub async fn put_account(req: HttpRequest, dto: web::Json<UpdateUserDto>) -> HttpResult {
    let claims = authenticate(&req)?;
    let state = server_state(&req)?;
    let token = accounts::update_user(
        &state.db,
        state.photos.as_ref(),
        &state.accounts,
        &claims.sub,
        &dto,
    )
    .await?;
    ok(token)
}

#[post("/api/accounts/changePassword")]
pub async fn post_change_password(
    req: HttpRequest,
    dto: web::Json<ChangePasswordDto>,
) -> HttpResult {
    let claims = authenticate(&req)?;
    let state = server_state(&req)?;
    accounts::change_password(&state.db, &claims.sub, &dto).await?;
    ok(true)
}
