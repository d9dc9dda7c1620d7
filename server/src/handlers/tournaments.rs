use crate::tournaments::{self, TournamentDto};

use super::prelude::*;

#[get("/api/tournaments")]
pub async fn get_tournaments(req: HttpRequest, p: web::Query<Pagination>) -> HttpResult {
    let state = server_state(&req)?;
    ok(tournaments::list(&state.db, &p).await?)
}

#[get("/api/tournaments/totalRecords")]
pub async fn get_tournaments_total(req: HttpRequest, p: web::Query<Pagination>) -> HttpResult {
    let state = server_state(&req)?;
    ok(tournaments::total(&state.db, &p).await?)
}

#[get("/api/tournaments/combo")]
pub async fn get_tournaments_combo(req: HttpRequest) -> HttpResult {
    let state = server_state(&req)?;
    ok(tournaments::combo(&state.db).await?)
}

#[get("/api/tournaments/{id:\\d+}")]
pub async fn get_tournament(req: HttpRequest, id: web::Path<i64>) -> HttpResult {
    let state = server_state(&req)?;
    ok(tournaments::get(&state.db, *id).await?)
}

#[post("/api/tournaments/full")]
pub async fn post_tournament(req: HttpRequest, dto: web::Json<TournamentDto>) -> HttpResult {
    require_admin(&req)?;
    let state = server_state(&req)?;
    ok(tournaments::create(&state.db, state.photos.as_ref(), &dto).await?)
}

#[put("/api/tournaments/full")]
pub async fn put_tournament(req: HttpRequest, dto: web::Json<TournamentDto>) -> HttpResult {
    require_admin(&req)?;
    let state = server_state(&req)?;
    ok(tournaments::update(&state.db, state.photos.as_ref(), &dto).await?)
}

#[post("/api/tournaments/{id}/teams/{team_id}")]
pub async fn post_tournament_team(req: HttpRequest, path: web::Path<(i64, i64)>) -> HttpResult {
    require_admin(&req)?;
    let state = server_state(&req)?;
    let (tournament_id, team_id) = path.into_inner();
    tournaments::add_team(&state.db, tournament_id, team_id).await?;
    ok(true)
}
