use crate::error::{Error, Lookup};
use crate::groups::{self, GroupDto};

use super::prelude::*;

#[get("/api/groups")]
pub async fn get_groups(req: HttpRequest, p: web::Query<Pagination>) -> HttpResult {
    let claims = authenticate(&req)?;
    let state = server_state(&req)?;
    ok(groups::list_groups_for_user(&state.db, &claims.sub, &p).await?)
}

#[get("/api/groups/totalRecords")]
pub async fn get_groups_total(req: HttpRequest, p: web::Query<Pagination>) -> HttpResult {
    let claims = authenticate(&req)?;
    let state = server_state(&req)?;
    ok(groups::total_groups_for_user(&state.db, &claims.sub, &p).await?)
}

#[get("/api/groups/all")]
pub async fn get_active_groups(req: HttpRequest) -> HttpResult {
    authenticate(&req)?;
    let state = server_state(&req)?;
    ok(groups::active_groups(&state.db).await?)
}

#[get("/api/groups/{id:\\d+}")]
pub async fn get_group(req: HttpRequest, id: web::Path<i64>) -> HttpResult {
    authenticate(&req)?;
    let state = server_state(&req)?;
    ok(groups::get_group(&state.db, *id).await?)
}

#[get("/api/groups/code/{code}")]
pub async fn get_group_by_code(req: HttpRequest, code: web::Path<String>) -> HttpResult {
    authenticate(&req)?;
    let state = server_state(&req)?;
    ok(groups::get_group_by_code(&state.db, &code).await?)
}

/// The caller becomes the admin of the new group.
#[post("/api/groups/full")]
pub async fn post_group(req: HttpRequest, dto: web::Json<GroupDto>) -> HttpResult {
    let claims = authenticate(&req)?;
    let state = server_state(&req)?;
    let new = dto.into_inner().into_new_group(claims.uid);
    ok(groups::create_group(&state.db, state.photos.as_ref(), &new).await?)
}

#[put("/api/groups/full")]
pub async fn put_group(req: HttpRequest, dto: web::Json<GroupDto>) -> HttpResult {
    let claims = authenticate(&req)?;
    let state = server_state(&req)?;
    let existing = groups::get_group(&state.db, dto.id)
        .await
        .map_err(|e| match e {
            Error::NotFound(_) => Error::NotFound(Lookup::GroupUpdate),
            e => e,
        })?;
    if existing.admin_id != claims.uid && !claims.is_admin() {
        return Err(Error::NotAllowed.into());
    }
    ok(groups::update_group(&state.db, state.photos.as_ref(), &dto).await?)
}

#[derive(Deserialize, Debug)]
pub struct JoinDto {
    code: String,
}

#[post("/api/groups/join")]
pub async fn post_join(req: HttpRequest, dto: web::Json<JoinDto>) -> HttpResult {
    let claims = authenticate(&req)?;
    let state = server_state(&req)?;
    ok(groups::join_group(&state.db, &dto.code, claims.uid).await?)
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct MemberDto {
    user_id: i64,
    is_active: bool,
}

#[put("/api/groups/{id}/members")]
pub async fn put_member(
    req: HttpRequest,
    id: web::Path<i64>,
    dto: web::Json<MemberDto>,
) -> HttpResult {
    let claims = authenticate(&req)?;
    let state = server_state(&req)?;
    let view =
        groups::set_member_active(&state.db, *id, claims.uid, dto.user_id, dto.is_active).await?;
    ok(view)
}
