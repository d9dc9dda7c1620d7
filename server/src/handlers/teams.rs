use crate::teams::{self, TeamDto};

use super::prelude::*;

#[get("/api/teams")]
pub async fn get_teams(req: HttpRequest, p: web::Query<Pagination>) -> HttpResult {
    let state = server_state(&req)?;
    ok(teams::list(&state.db, &p).await?)
}

#[get("/api/teams/totalRecords")]
pub async fn get_teams_total(req: HttpRequest, p: web::Query<Pagination>) -> HttpResult {
    let state = server_state(&req)?;
    ok(teams::total(&state.db, &p).await?)
}

#[get("/api/teams/combo/{country_id}")]
pub async fn get_teams_combo(req: HttpRequest, country_id: web::Path<i64>) -> HttpResult {
    let state = server_state(&req)?;
    ok(teams::combo(&state.db, *country_id).await?)
}

#[get("/api/teams/{id:\\d+}")]
pub async fn get_team(req: HttpRequest, id: web::Path<i64>) -> HttpResult {
    let state = server_state(&req)?;
    ok(teams::get(&state.db, *id).await?)
}

#[post("/api/teams/full")]
pub async fn post_team(req: HttpRequest, dto: web::Json<TeamDto>) -> HttpResult {
    require_admin(&req)?;
    let state = server_state(&req)?;
    ok(teams::create(&state.db, state.photos.as_ref(), &dto).await?)
}

#[put("/api/teams/full")]
pub async fn put_team(req: HttpRequest, dto: web::Json<TeamDto>) -> HttpResult {
    require_admin(&req)?;
    let state = server_state(&req)?;
    ok(teams::update(&state.db, state.photos.as_ref(), &dto).await?)
}

#[delete("/api/teams/{id:\\d+}")]
pub async fn delete_team(req: HttpRequest, id: web::Path<i64>) -> HttpResult {
    require_admin(&req)?;
    let state = server_state(&req)?;
    teams::delete(&state.db, *id).await?;
    ok(true)
}
