use std::collections::HashMap;

use sea_orm::prelude::TimeDateTimeWithTimeZone;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};

use fantasy_db::{matches, teams, tournaments};

use crate::error::{db_err, Error, Lookup, Reference};
use crate::predictions;
use crate::validation::{Rule, Validate};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamRef {
    pub id: i64,
    pub name: String,
    pub image: String,
}

impl From<teams::Model> for TeamRef {
    fn from(t: teams::Model) -> Self {
        Self {
            id: t.id,
            name: t.name,
            image: t.image,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchView {
    pub id: i64,
    pub tournament_id: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub date: TimeDateTimeWithTimeZone,
    pub is_active: bool,
    pub local: TeamRef,
    pub visitor: TeamRef,
    pub goals_local: Option<i32>,
    pub goals_visitor: Option<i32>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchDto {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub tournament_id: i64,
    #[serde(default)]
    pub local_id: i64,
    #[serde(default)]
    pub visitor_id: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub date: TimeDateTimeWithTimeZone,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub goals_local: Option<i32>,
    #[serde(default)]
    pub goals_visitor: Option<i32>,
}

fn default_active() -> bool {
    true
}

impl Validate for MatchDto {
    fn rules(&self) -> Vec<(&'static str, Rule<'_>)> {
        vec![
            ("goalsLocal", Rule::NonNegative(self.goals_local)),
            ("goalsVisitor", Rule::NonNegative(self.goals_visitor)),
        ]
    }
}

fn create_rules(dto: &MatchDto) -> Vec<(&'static str, Rule<'_>)> {
    let mut rules = dto.rules();
    rules.extend([
        ("tournamentId", Rule::Positive(dto.tournament_id)),
        ("localId", Rule::Positive(dto.local_id)),
        ("visitorId", Rule::Positive(dto.visitor_id)),
        ("visitorId", Rule::Different(dto.local_id, dto.visitor_id)),
    ]);
    rules
}

async fn team_refs<C: ConnectionTrait>(
    db: &C,
    ids: impl IntoIterator<Item = i64>,
) -> Result<HashMap<i64, TeamRef>, Error> {
    Ok(teams::Entity::find()
        .filter(teams::Column::Id.is_in(ids))
        .all(db)
        .await
        .map_err(db_err("Failed to fetch match teams"))?
        .into_iter()
        .map(|t| (t.id, TeamRef::from(t)))
        .collect())
}

pub(crate) async fn views<C: ConnectionTrait>(
    db: &C,
    rows: Vec<matches::Model>,
) -> Result<Vec<MatchView>, Error> {
    let teams = team_refs(db, rows.iter().flat_map(|m| [m.local_id, m.visitor_id])).await?;
    let team = |id: i64| {
        teams.get(&id).cloned().ok_or_else(|| {
            log::error!("Match references missing team {id}");
            Error::Internal(format!("missing team {id}"))
        })
    };
    rows.into_iter()
        .map(|m| {
            Ok(MatchView {
                local: team(m.local_id)?,
                visitor: team(m.visitor_id)?,
                id: m.id,
                tournament_id: m.tournament_id,
                date: m.date,
                is_active: m.is_active,
                goals_local: m.goals_local,
                goals_visitor: m.goals_visitor,
            })
        })
        .collect()
}

async fn view<C: ConnectionTrait>(db: &C, m: matches::Model) -> Result<MatchView, Error> {
    views(db, vec![m])
        .await?
        .pop()
        .ok_or_else(|| Error::Internal("empty match view".to_owned()))
}

/// Creates the match and back-fills predictions for every group of its
/// tournament.
pub async fn create<C: ConnectionTrait>(db: &C, dto: &MatchDto) -> Result<MatchView, Error> {
    crate::validation::check_rules(&create_rules(dto))?;
    tournaments::Entity::find_by_id(dto.tournament_id)
        .one(db)
        .await
        .map_err(db_err("Failed to fetch tournament"))?
        .ok_or(Error::InvalidReference(Reference::Tournament))?;
    let found = team_refs(db, [dto.local_id, dto.visitor_id]).await?;
    if found.len() != 2 {
        return Err(Error::InvalidReference(Reference::Team));
    }
    let m = matches::ActiveModel {
        tournament_id: Set(dto.tournament_id),
        date: Set(dto.date),
        is_active: Set(dto.is_active),
        local_id: Set(dto.local_id),
        visitor_id: Set(dto.visitor_id),
        goals_local: Set(dto.goals_local),
        goals_visitor: Set(dto.goals_visitor),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(db_err("Failed to insert match"))?;
    let inserted = predictions::reconcile_tournament(db, m.tournament_id).await?;
    log::info!(
        "Created match {} in tournament {}; {inserted} predictions added",
        m.id,
        m.tournament_id
    );
    view(db, m).await
}

/// Only the date, the active flag and the final score can change.
pub async fn update<C: ConnectionTrait>(db: &C, dto: &MatchDto) -> Result<MatchView, Error> {
    dto.validate()?;
    let existing = matches::Entity::find_by_id(dto.id)
        .one(db)
        .await
        .map_err(db_err("Failed to fetch match"))?
        .ok_or(Error::NotFound(Lookup::Update))?;
    let mut update: matches::ActiveModel = existing.into();
    update.date = Set(dto.date);
    update.is_active = Set(dto.is_active);
    update.goals_local = Set(dto.goals_local);
    update.goals_visitor = Set(dto.goals_visitor);
    let m = update
        .update(db)
        .await
        .map_err(db_err("Failed to update match"))?;
    view(db, m).await
}

pub async fn get<C: ConnectionTrait>(db: &C, id: i64) -> Result<MatchView, Error> {
    let m = matches::Entity::find_by_id(id)
        .one(db)
        .await
        .map_err(db_err("Failed to fetch match"))?
        .ok_or(Error::NotFound(Lookup::Get))?;
    view(db, m).await
}

pub async fn list_for_tournament<C: ConnectionTrait>(
    db: &C,
    tournament_id: i64,
) -> Result<Vec<MatchView>, Error> {
    let rows = matches::Entity::find()
        .filter(matches::Column::TournamentId.eq(tournament_id))
        .order_by_asc(matches::Column::Date)
        .order_by_asc(matches::Column::Id)
        .all(db)
        .await
        .map_err(db_err("Failed to list matches"))?;
    views(db, rows).await
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::testing;
    use fantasy_db::predictions as db_predictions;
    use sea_orm::PaginatorTrait;

    fn dto(tournament_id: i64, local_id: i64, visitor_id: i64, days: i64) -> MatchDto {
        MatchDto {
            id: 0,
            tournament_id,
            local_id,
            visitor_id,
            date: testing::days_from_now(days),
            is_active: true,
            goals_local: None,
            goals_visitor: None,
        }
    }

    #[tokio::test]
    async fn create_checks_references() {
        let db = testing::test_db().await;
        let w = testing::world(&db).await;
        assert!(matches!(
            create(&db, &dto(w.tournament.id, w.local.id, w.local.id, 1)).await,
            Err(Error::ValidationFailed(_))
        ));
        assert_eq!(
            create(&db, &dto(999, w.local.id, w.visitor.id, 1)).await,
            Err(Error::InvalidReference(Reference::Tournament))
        );
        assert_eq!(
            create(&db, &dto(w.tournament.id, w.local.id, 999, 1)).await,
            Err(Error::InvalidReference(Reference::Team))
        );
        assert_eq!(matches::Entity::find().count(&db).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn create_backfills_group_predictions() {
        let db = testing::test_db().await;
        let w = testing::world(&db).await;
        let group = testing::group(&db, w.admin.id, w.tournament.id).await;
        testing::join(&db, &group.code, w.member.id).await;
        assert_eq!(db_predictions::Entity::find().count(&db).await.unwrap(), 0);

        let m = create(&db, &dto(w.tournament.id, w.local.id, w.visitor.id, 2))
            .await
            .unwrap();
        assert_eq!(m.local.name, w.local.name);
        assert_eq!(
            db_predictions::Entity::find()
                .filter(db_predictions::Column::MatchId.eq(m.id))
                .count(&db)
                .await
                .unwrap(),
            2
        );
    }

    #[tokio::test]
    async fn update_sets_score_and_list_is_by_date() {
        let db = testing::test_db().await;
        let w = testing::world(&db).await;
        let late = create(&db, &dto(w.tournament.id, w.local.id, w.visitor.id, 5))
            .await
            .unwrap();
        let early = create(&db, &dto(w.tournament.id, w.visitor.id, w.local.id, 1))
            .await
            .unwrap();
        let ids: Vec<_> = list_for_tournament(&db, w.tournament.id)
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.id)
            .collect();
        assert_eq!(ids, [early.id, late.id]);

        let mut change = dto(0, 0, 0, -1);
        change.id = late.id;
        change.goals_local = Some(2);
        change.goals_visitor = Some(1);
        let updated = update(&db, &change).await.unwrap();
        assert_eq!(updated.goals_local, Some(2));
        assert_eq!(updated.local.id, w.local.id);
        assert_eq!(get(&db, late.id).await.unwrap(), updated);

        change.goals_visitor = Some(-1);
        assert!(matches!(
            update(&db, &change).await,
            Err(Error::ValidationFailed(_))
        ));
        change.id = 999;
        change.goals_visitor = None;
        assert_eq!(
            update(&db, &change).await,
            Err(Error::NotFound(Lookup::Update))
        );
    }
}
