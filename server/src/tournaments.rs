use std::collections::HashMap;

use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use serde::{Deserialize, Serialize};

use fantasy_db::{countries, matches, teams, tournament_teams, tournaments};

use crate::error::{db_err, write_err, Error, Lookup, Reference};
use crate::pagination::Pagination;
use crate::photo_store::{upload_base64, PhotoStore};
use crate::teams::TeamView;
use crate::validation::{Rule, Validate};

pub const PHOTO_CATEGORY: &str = "tournaments";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TournamentView {
    pub id: i64,
    pub name: String,
    pub image: String,
    pub is_active: bool,
    pub remarks: Option<String>,
    pub teams_number: u64,
    pub matches_number: u64,
}

impl TournamentView {
    fn new(t: tournaments::Model, teams_number: u64, matches_number: u64) -> Self {
        Self {
            id: t.id,
            name: t.name,
            image: t.image,
            is_active: t.is_active,
            remarks: t.remarks,
            teams_number,
            matches_number,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TournamentDetails {
    #[serde(flatten)]
    pub tournament: TournamentView,
    pub teams: Vec<TeamView>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TournamentDto {
    #[serde(default)]
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub remarks: Option<String>,
    /// Ignored on create: tournaments start inactive.
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub image: Option<String>,
}

impl Validate for TournamentDto {
    fn rules(&self) -> Vec<(&'static str, Rule<'_>)> {
        vec![
            ("name", Rule::Required(&self.name)),
            ("name", Rule::MaxLength(&self.name, 100)),
        ]
    }
}

pub async fn create<C: ConnectionTrait>(
    db: &C,
    photos: &dyn PhotoStore,
    dto: &TournamentDto,
) -> Result<TournamentView, Error> {
    dto.validate()?;
    let image = upload_base64(photos, dto.image.as_deref(), PHOTO_CATEGORY).await;
    let t = tournaments::ActiveModel {
        name: Set(dto.name.trim().to_owned()),
        image: Set(image),
        is_active: Set(false),
        remarks: Set(dto.remarks.clone()),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(write_err("Failed to insert tournament", Error::Conflict))?;
    log::info!("Created tournament {} ({})", t.name, t.id);
    Ok(TournamentView::new(t, 0, 0))
}

pub async fn update<C: ConnectionTrait>(
    db: &C,
    photos: &dyn PhotoStore,
    dto: &TournamentDto,
) -> Result<TournamentView, Error> {
    dto.validate()?;
    let existing = tournaments::Entity::find_by_id(dto.id)
        .one(db)
        .await
        .map_err(db_err("Failed to fetch tournament"))?
        .ok_or(Error::NotFound(Lookup::Update))?;
    let mut update: tournaments::ActiveModel = existing.into();
    update.name = Set(dto.name.trim().to_owned());
    update.remarks = Set(dto.remarks.clone());
    update.is_active = Set(dto.is_active);
    if dto.image.is_some() {
        update.image = Set(upload_base64(photos, dto.image.as_deref(), PHOTO_CATEGORY).await);
    }
    let t = update
        .update(db)
        .await
        .map_err(write_err("Failed to update tournament", Error::Conflict))?;
    let counts = counts(db, &[t.id]).await?;
    let (teams_number, matches_number) = counts.get(&t.id).copied().unwrap_or_default();
    Ok(TournamentView::new(t, teams_number, matches_number))
}

/// (teams, matches) per tournament id.
async fn counts<C: ConnectionTrait>(
    db: &C,
    ids: &[i64],
) -> Result<HashMap<i64, (u64, u64)>, Error> {
    let team_counts: Vec<(i64, i64)> = tournament_teams::Entity::find()
        .select_only()
        .column(tournament_teams::Column::TournamentId)
        .column_as(tournament_teams::Column::Id.count(), "n")
        .filter(tournament_teams::Column::TournamentId.is_in(ids.iter().copied()))
        .group_by(tournament_teams::Column::TournamentId)
        .into_tuple()
        .all(db)
        .await
        .map_err(db_err("Failed to count tournament teams"))?;
    let match_counts: Vec<(i64, i64)> = matches::Entity::find()
        .select_only()
        .column(matches::Column::TournamentId)
        .column_as(matches::Column::Id.count(), "n")
        .filter(matches::Column::TournamentId.is_in(ids.iter().copied()))
        .group_by(matches::Column::TournamentId)
        .into_tuple()
        .all(db)
        .await
        .map_err(db_err("Failed to count tournament matches"))?;
    let mut result: HashMap<i64, (u64, u64)> = HashMap::new();
    for (id, n) in team_counts {
        result.entry(id).or_default().0 = n as u64;
    }
    for (id, n) in match_counts {
        result.entry(id).or_default().1 = n as u64;
    }
    Ok(result)
}

async fn with_counts<C: ConnectionTrait>(
    db: &C,
    rows: Vec<tournaments::Model>,
) -> Result<Vec<TournamentView>, Error> {
    let ids: Vec<i64> = rows.iter().map(|t| t.id).collect();
    let counts = counts(db, &ids).await?;
    Ok(rows
        .into_iter()
        .map(|t| {
            let (teams_number, matches_number) = counts.get(&t.id).copied().unwrap_or_default();
            TournamentView::new(t, teams_number, matches_number)
        })
        .collect())
}

fn filtered(p: &Pagination) -> sea_orm::Select<tournaments::Entity> {
    let mut q = tournaments::Entity::find();
    if let Some(f) = p.name_filter((tournaments::Entity, tournaments::Column::SearchName)) {
        q = q.filter(f);
    }
    q
}

pub async fn list<C: ConnectionTrait>(
    db: &C,
    p: &Pagination,
) -> Result<Vec<TournamentView>, Error> {
    let rows = filtered(p)
        .order_by_asc(tournaments::Column::Name)
        .offset(p.offset())
        .limit(p.limit())
        .all(db)
        .await
        .map_err(db_err("Failed to list tournaments"))?;
    with_counts(db, rows).await
}

pub async fn total<C: ConnectionTrait>(db: &C, p: &Pagination) -> Result<u64, Error> {
    filtered(p)
        .count(db)
        .await
        .map_err(db_err("Failed to count tournaments"))
}

/// Active tournaments ordered by name.
pub async fn combo<C: ConnectionTrait>(db: &C) -> Result<Vec<TournamentView>, Error> {
    let rows = tournaments::Entity::find()
        .filter(tournaments::Column::IsActive.eq(true))
        .order_by_asc(tournaments::Column::Name)
        .all(db)
        .await
        .map_err(db_err("Failed to list active tournaments"))?;
    with_counts(db, rows).await
}

pub async fn get<C: ConnectionTrait>(db: &C, id: i64) -> Result<TournamentDetails, Error> {
    let t = tournaments::Entity::find_by_id(id)
        .one(db)
        .await
        .map_err(db_err("Failed to fetch tournament"))?
        .ok_or(Error::NotFound(Lookup::Get))?;
    let team_ids: Vec<i64> = tournament_teams::Entity::find()
        .select_only()
        .column(tournament_teams::Column::TeamId)
        .filter(tournament_teams::Column::TournamentId.eq(id))
        .into_tuple()
        .all(db)
        .await
        .map_err(db_err("Failed to fetch tournament teams"))?;
    let teams: Vec<TeamView> = teams::Entity::find()
        .filter(teams::Column::Id.is_in(team_ids))
        .find_also_related(countries::Entity)
        .order_by_asc(teams::Column::Name)
        .all(db)
        .await
        .map_err(db_err("Failed to fetch teams"))?
        .into_iter()
        .filter_map(|(team, country)| {
            country.map(|c| TeamView {
                id: team.id,
                name: team.name,
                image: team.image,
                country: c.into(),
            })
        })
        .collect();
    let matches_number = matches::Entity::find()
        .filter(matches::Column::TournamentId.eq(id))
        .count(db)
        .await
        .map_err(db_err("Failed to count matches"))?;
    Ok(TournamentDetails {
        tournament: TournamentView::new(t, teams.len() as u64, matches_number),
        teams,
    })
}

pub async fn add_team<C: ConnectionTrait>(
    db: &C,
    tournament_id: i64,
    team_id: i64,
) -> Result<(), Error> {
    tournaments::Entity::find_by_id(tournament_id)
        .one(db)
        .await
        .map_err(db_err("Failed to fetch tournament"))?
        .ok_or(Error::InvalidReference(Reference::Tournament))?;
    teams::Entity::find_by_id(team_id)
        .one(db)
        .await
        .map_err(db_err("Failed to fetch team"))?
        .ok_or(Error::InvalidReference(Reference::Team))?;
    tournament_teams::ActiveModel {
        tournament_id: Set(tournament_id),
        team_id: Set(team_id),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(write_err("Failed to add tournament team", Error::Conflict))?;
    Ok(())
}
