use crate::countries::{self, CountryDto};

use super::prelude::*;

#[get("/api/countries")]
pub async fn get_countries(req: HttpRequest, p: web::Query<Pagination>) -> HttpResult {
    let state = server_state(&req)?;
    ok(countries::list(&state.db, &p).await?)
}

#[get("/api/countries/totalRecords")]
pub async fn get_countries_total(req: HttpRequest, p: web::Query<Pagination>) -> HttpResult {
    let state = server_state(&req)?;
    ok(countries::total(&state.db, &p).await?)
}

#[get("/api/countries/combo")]
pub async fn get_countries_combo(req: HttpRequest) -> HttpResult {
    let state = server_state(&req)?;
    ok(countries::combo(&state.db).await?)
}

#[get("/api/countries/{id:\\d+}")]
pub async fn get_country(req: HttpRequest, id: web::Path<i64>) -> HttpResult {
    let state = server_state(&req)?;
    ok(countries::get(&state.db, *id).await?)
}

#[post("/api/countries")]
pub async fn post_country(req: HttpRequest, dto: web::Json<CountryDto>) -> HttpResult {
    require_admin(&req)?;
    let state = server_state(&req)?;
    ok(countries::create(&state.db, &dto).await?)
}

#[put("/api/countries")]
pub async fn put_country(req: HttpRequest, dto: web::Json<CountryDto>) -> HttpResult {
    require_admin(&req)?;
    let state = server_state(&req)?;
    ok(countries::update(&state.db, &dto).await?)
}

#[delete("/api/countries/{id:\\d+}")]
pub async fn delete_country(req: HttpRequest, id: web::Path<i64>) -> HttpResult {
    require_admin(&req)?;
    let state = server_state(&req)?;
    countries::delete(&state.db, *id).await?;
    ok(true)
}
