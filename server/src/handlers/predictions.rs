use crate::predictions::{self, PredictionDto};

use super::prelude::*;

#[get("/api/predictions/group/{group_id}")]
pub async fn get_group_predictions(req: HttpRequest, group_id: web::Path<i64>) -> HttpResult {
    let claims = authenticate(&req)?;
    let state = server_state(&req)?;
    ok(predictions::predictions_for_user(&state.db, *group_id, claims.uid).await?)
}

#[put("/api/predictions")]
pub async fn put_prediction(req: HttpRequest, dto: web::Json<PredictionDto>) -> HttpResult {
    let claims = authenticate(&req)?;
    let state = server_state(&req)?;
    ok(predictions::submit_prediction(&state.db, claims.uid, &dto).await?)
}
