use crate::matches::{self, MatchDto};

use super::prelude::*;

#[get("/api/matches/tournament/{tournament_id}")]
pub async fn get_tournament_matches(
    req: HttpRequest,
    tournament_id: web::Path<i64>,
) -> HttpResult {
    let state = server_state(&req)?;
    ok(matches::list_for_tournament(&state.db, *tournament_id).await?)
}

#[get("/api/matches/{id:\\d+}")]
pub async fn get_match(req: HttpRequest, id: web::Path<i64>) -> HttpResult {
    let state = server_state(&req)?;
    ok(matches::get(&state.db, *id).await?)
}

#[post("/api/matches/full")]
pub async fn post_match(req: HttpRequest, dto: web::Json<MatchDto>) -> HttpResult {
    require_admin(&req)?;
    let state = server_state(&req)?;
    ok(matches::create(&state.db, &dto).await?)
}

#[put("/api/matches/full")]
pub async fn put_match(req: HttpRequest, dto: web::Json<MatchDto>) -> HttpResult {
    require_admin(&req)?;
    let state = server_state(&req)?;
    ok(matches::update(&state.db, &dto).await?)
}
