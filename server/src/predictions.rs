//! Keeps predictions consistent with group membership: every active member
//! of a group owns exactly one prediction per match of the group's
//! tournament.

use std::collections::{HashMap, HashSet};

use sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QuerySelect, Set,
};
use serde::{Deserialize, Serialize};

use fantasy_db::{groups, matches, predictions, tournaments, user_groups};

use crate::error::{db_err, Error, Lookup};
use crate::matches::MatchView;
use crate::validation::{Rule, Validate};

/// Keeps multi-row inserts under SQLite's bound-parameter limit.
const INSERT_CHUNK: usize = 100;

/// (match_id, user_id) pairs with no prediction yet.
pub fn missing_predictions(
    members: &[i64],
    match_ids: &[i64],
    existing: &HashSet<(i64, i64)>,
) -> Vec<(i64, i64)> {
    match_ids
        .iter()
        .flat_map(|&m| members.iter().map(move |&u| (m, u)))
        .filter(|key| !existing.contains(key))
        .collect()
}

/// Inserts the missing predictions of `group_id` and returns how many rows
/// were added. Unknown groups or tournaments are a no-op.
pub async fn reconcile<C: ConnectionTrait>(db: &C, group_id: i64) -> Result<u64, Error> {
    let Some(group) = groups::Entity::find_by_id(group_id)
        .one(db)
        .await
        .map_err(db_err("Failed to fetch group"))?
    else {
        log::warn!("Reconcile: group {group_id} does not exist");
        return Ok(0);
    };
    let tournament_exists = tournaments::Entity::find_by_id(group.tournament_id)
        .count(db)
        .await
        .map_err(db_err("Failed to fetch tournament"))?
        > 0;
    if !tournament_exists {
        log::warn!(
            "Reconcile: tournament {} of group {group_id} does not exist",
            group.tournament_id
        );
        return Ok(0);
    }
    let members: Vec<i64> = user_groups::Entity::find()
        .select_only()
        .column(user_groups::Column::UserId)
        .filter(user_groups::Column::GroupId.eq(group_id))
        .filter(user_groups::Column::IsActive.eq(true))
        .into_tuple()
        .all(db)
        .await
        .map_err(db_err("Failed to fetch group members"))?;
    let match_ids: Vec<i64> = matches::Entity::find()
        .select_only()
        .column(matches::Column::Id)
        .filter(matches::Column::TournamentId.eq(group.tournament_id))
        .into_tuple()
        .all(db)
        .await
        .map_err(db_err("Failed to fetch tournament matches"))?;
    let existing: HashSet<(i64, i64)> = predictions::Entity::find()
        .select_only()
        .column(predictions::Column::MatchId)
        .column(predictions::Column::UserId)
        .filter(predictions::Column::GroupId.eq(group_id))
        .into_tuple::<(i64, i64)>()
        .all(db)
        .await
        .map_err(db_err("Failed to fetch existing predictions"))?
        .into_iter()
        .collect();

    let missing = missing_predictions(&members, &match_ids, &existing);
    let mut inserted = 0;
    for chunk in missing.chunks(INSERT_CHUNK) {
        let rows = chunk.iter().map(|&(match_id, user_id)| predictions::ActiveModel {
            group_id: Set(group_id),
            tournament_id: Set(group.tournament_id),
            match_id: Set(match_id),
            user_id: Set(user_id),
            goals_local: Set(None),
            goals_visitor: Set(None),
            ..Default::default()
        });
        // A concurrent reconcile may have inserted some of these already.
        inserted += predictions::Entity::insert_many(rows)
            .on_conflict(
                OnConflict::columns([
                    predictions::Column::GroupId,
                    predictions::Column::MatchId,
                    predictions::Column::UserId,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec_without_returning(db)
            .await
            .map_err(db_err("Failed to insert predictions"))?;
    }
    if inserted > 0 {
        log::info!("Reconcile: added {inserted} predictions to group {group_id}");
    }
    Ok(inserted)
}

async fn reconcile_groups<C: ConnectionTrait>(db: &C, group_ids: Vec<i64>) -> Result<u64, Error> {
    let mut inserted = 0;
    for id in group_ids {
        inserted += reconcile(db, id).await?;
    }
    Ok(inserted)
}

/// Reconciles every group playing `tournament_id`.
pub async fn reconcile_tournament<C: ConnectionTrait>(
    db: &C,
    tournament_id: i64,
) -> Result<u64, Error> {
    let ids: Vec<i64> = groups::Entity::find()
        .select_only()
        .column(groups::Column::Id)
        .filter(groups::Column::TournamentId.eq(tournament_id))
        .into_tuple()
        .all(db)
        .await
        .map_err(db_err("Failed to fetch tournament groups"))?;
    reconcile_groups(db, ids).await
}

pub async fn reconcile_all<C: ConnectionTrait>(db: &C) -> Result<u64, Error> {
    let ids: Vec<i64> = groups::Entity::find()
        .select_only()
        .column(groups::Column::Id)
        .into_tuple()
        .all(db)
        .await
        .map_err(db_err("Failed to fetch groups"))?;
    reconcile_groups(db, ids).await
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionView {
    pub id: i64,
    pub group_id: i64,
    pub tournament_id: i64,
    pub user_id: i64,
    pub goals_local: Option<i32>,
    pub goals_visitor: Option<i32>,
    #[serde(rename = "match")]
    pub match_: MatchView,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionDto {
    pub group_id: i64,
    pub match_id: i64,
    #[serde(default)]
    pub goals_local: Option<i32>,
    #[serde(default)]
    pub goals_visitor: Option<i32>,
}

impl Validate for PredictionDto {
    fn rules(&self) -> Vec<(&'static str, Rule<'_>)> {
        vec![
            ("goalsLocal", Rule::NonNegative(self.goals_local)),
            ("goalsVisitor", Rule::NonNegative(self.goals_visitor)),
        ]
    }
}

/// Sets the goals of `user_id`'s prediction. The row must already exist and
/// the match must not have started.
pub async fn submit_prediction<C: ConnectionTrait>(
    db: &C,
    user_id: i64,
    dto: &PredictionDto,
) -> Result<PredictionView, Error> {
    dto.validate()?;
    let prediction = predictions::Entity::find()
        .filter(predictions::Column::GroupId.eq(dto.group_id))
        .filter(predictions::Column::MatchId.eq(dto.match_id))
        .filter(predictions::Column::UserId.eq(user_id))
        .one(db)
        .await
        .map_err(db_err("Failed to fetch prediction"))?
        .ok_or(Error::NotFound(Lookup::Get))?;
    let m = matches::Entity::find_by_id(dto.match_id)
        .one(db)
        .await
        .map_err(db_err("Failed to fetch match"))?
        .ok_or(Error::NotFound(Lookup::Get))?;
    if m.date <= time::OffsetDateTime::now_utc() {
        return Err(Error::PredictionClosed);
    }
    let mut update: predictions::ActiveModel = prediction.into();
    update.goals_local = Set(dto.goals_local);
    update.goals_visitor = Set(dto.goals_visitor);
    let prediction = update
        .update(db)
        .await
        .map_err(db_err("Failed to update prediction"))?;
    let mut views = with_matches(db, vec![prediction]).await?;
    views
        .pop()
        .ok_or_else(|| Error::Internal("empty prediction view".to_owned()))
}

async fn with_matches<C: ConnectionTrait>(
    db: &C,
    rows: Vec<predictions::Model>,
) -> Result<Vec<PredictionView>, Error> {
    let match_rows = matches::Entity::find()
        .filter(matches::Column::Id.is_in(rows.iter().map(|p| p.match_id)))
        .all(db)
        .await
        .map_err(db_err("Failed to fetch prediction matches"))?;
    let by_id: HashMap<i64, MatchView> = crate::matches::views(db, match_rows)
        .await?
        .into_iter()
        .map(|m| (m.id, m))
        .collect();
    let mut views: Vec<PredictionView> = rows
        .into_iter()
        .filter_map(|p| {
            let m = by_id.get(&p.match_id)?.clone();
            Some(PredictionView {
                id: p.id,
                group_id: p.group_id,
                tournament_id: p.tournament_id,
                user_id: p.user_id,
                goals_local: p.goals_local,
                goals_visitor: p.goals_visitor,
                match_: m,
            })
        })
        .collect();
    views.sort_by_key(|v| (v.match_.date, v.match_.id));
    Ok(views)
}

/// The caller's predictions in a group, ordered by match date.
pub async fn predictions_for_user<C: ConnectionTrait>(
    db: &C,
    group_id: i64,
    user_id: i64,
) -> Result<Vec<PredictionView>, Error> {
    let rows = predictions::Entity::find()
        .filter(predictions::Column::GroupId.eq(group_id))
        .filter(predictions::Column::UserId.eq(user_id))
        .all(db)
        .await
        .map_err(db_err("Failed to fetch predictions"))?;
    with_matches(db, rows).await
}
