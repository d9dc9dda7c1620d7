use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use serde::{Deserialize, Serialize};

use fantasy_db::{countries, teams};

use crate::countries::CountryView;
use crate::error::{db_err, is_foreign_key_violation, write_err, Error, Lookup, Reference};
use crate::pagination::Pagination;
use crate::photo_store::{upload_base64, PhotoStore};
use crate::validation::{Rule, Validate};

pub const PHOTO_CATEGORY: &str = "teams";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamView {
    pub id: i64,
    pub name: String,
    pub image: String,
    pub country: CountryView,
}

impl TeamView {
    fn new(team: teams::Model, country: countries::Model) -> Self {
        Self {
            id: team.id,
            name: team.name,
            image: team.image,
            country: country.into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamDto {
    #[serde(default)]
    pub id: i64,
    pub name: String,
    pub country_id: i64,
    /// Base64 image; on update the current image is kept when absent.
    #[serde(default)]
    pub image: Option<String>,
}

impl Validate for TeamDto {
    fn rules(&self) -> Vec<(&'static str, Rule<'_>)> {
        vec![
            ("name", Rule::Required(&self.name)),
            ("name", Rule::MaxLength(&self.name, 100)),
            ("countryId", Rule::Positive(self.country_id)),
        ]
    }
}

async fn find_country<C: ConnectionTrait>(db: &C, id: i64) -> Result<countries::Model, Error> {
    countries::Entity::find_by_id(id)
        .one(db)
        .await
        .map_err(db_err("Failed to fetch country"))?
        .ok_or(Error::InvalidReference(Reference::Country))
}

pub async fn create<C: ConnectionTrait>(
    db: &C,
    photos: &dyn PhotoStore,
    dto: &TeamDto,
) -> Result<TeamView, Error> {
    dto.validate()?;
    let country = find_country(db, dto.country_id).await?;
    let image = upload_base64(photos, dto.image.as_deref(), PHOTO_CATEGORY).await;
    let team = teams::ActiveModel {
        name: Set(dto.name.trim().to_owned()),
        image: Set(image),
        country_id: Set(country.id),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(write_err("Failed to insert team", Error::Conflict))?;
    log::info!("Created team {} ({}) of {}", team.name, team.id, country.name);
    Ok(TeamView::new(team, country))
}

pub async fn update<C: ConnectionTrait>(
    db: &C,
    photos: &dyn PhotoStore,
    dto: &TeamDto,
) -> Result<TeamView, Error> {
    dto.validate()?;
    let existing = teams::Entity::find_by_id(dto.id)
        .one(db)
        .await
        .map_err(db_err("Failed to fetch team"))?
        .ok_or(Error::NotFound(Lookup::Update))?;
    let country = find_country(db, dto.country_id).await?;
    let mut update: teams::ActiveModel = existing.into();
    update.name = Set(dto.name.trim().to_owned());
    update.country_id = Set(country.id);
    if dto.image.is_some() {
        update.image = Set(upload_base64(photos, dto.image.as_deref(), PHOTO_CATEGORY).await);
    }
    let team = update
        .update(db)
        .await
        .map_err(write_err("Failed to update team", Error::Conflict))?;
    Ok(TeamView::new(team, country))
}

pub async fn get<C: ConnectionTrait>(db: &C, id: i64) -> Result<TeamView, Error> {
    let (team, country) = teams::Entity::find_by_id(id)
        .find_also_related(countries::Entity)
        .one(db)
        .await
        .map_err(db_err("Failed to fetch team"))?
        .ok_or(Error::NotFound(Lookup::Get))?;
    let country = country.ok_or_else(|| {
        log::error!("Team {id} has no country");
        Error::Internal(format!("team {id} has no country"))
    })?;
    Ok(TeamView::new(team, country))
}

fn filtered(p: &Pagination) -> sea_orm::Select<teams::Entity> {
    let mut q = teams::Entity::find();
    if let Some(f) = p.name_filter((teams::Entity, teams::Column::SearchName)) {
        q = q.filter(f);
    }
    q
}

fn views(rows: Vec<(teams::Model, Option<countries::Model>)>) -> Vec<TeamView> {
    rows.into_iter()
        .filter_map(|(team, country)| country.map(|c| TeamView::new(team, c)))
        .collect()
}

pub async fn list<C: ConnectionTrait>(db: &C, p: &Pagination) -> Result<Vec<TeamView>, Error> {
    let rows = filtered(p)
        .find_also_related(countries::Entity)
        .order_by_asc(teams::Column::Name)
        .offset(p.offset())
        .limit(p.limit())
        .all(db)
        .await
        .map_err(db_err("Failed to list teams"))?;
    Ok(views(rows))
}

pub async fn total<C: ConnectionTrait>(db: &C, p: &Pagination) -> Result<u64, Error> {
    filtered(p)
        .count(db)
        .await
        .map_err(db_err("Failed to count teams"))
}

/// Teams of one country ordered by name.
pub async fn combo<C: ConnectionTrait>(db: &C, country_id: i64) -> Result<Vec<TeamView>, Error> {
    let rows = teams::Entity::find()
        .filter(teams::Column::CountryId.eq(country_id))
        .find_also_related(countries::Entity)
        .order_by_asc(teams::Column::Name)
        .all(db)
        .await
        .map_err(db_err("Failed to list teams"))?;
    Ok(views(rows))
}

pub async fn delete<C: ConnectionTrait>(db: &C, id: i64) -> Result<(), Error> {
    let res = teams::Entity::delete_by_id(id).exec(db).await.map_err(|e| {
        if is_foreign_key_violation(&e) {
            Error::InUse
        } else {
            log::error!("Failed to delete team {id}: {e}");
            Error::Db(e)
        }
    })?;
    if res.rows_affected == 0 {
        return Err(Error::NotFound(Lookup::Get));
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::testing::{self, FailingPhotoStore, MemoryPhotoStore};

    fn dto(country_id: i64, name: &str, image: Option<&str>) -> TeamDto {
        TeamDto {
            id: 0,
            name: name.to_owned(),
            country_id,
            image: image.map(str::to_owned),
        }
    }

    #[tokio::test]
    async fn missing_country_writes_nothing() {
        let db = testing::test_db().await;
        let photos = MemoryPhotoStore::default();
        assert_eq!(
            create(&db, &photos, &dto(42, "Talleres", None)).await,
            Err(Error::InvalidReference(Reference::Country))
        );
        assert_eq!(teams::Entity::find().count(&db).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn create_uploads_image() {
        let db = testing::test_db().await;
        let photos = MemoryPhotoStore::default();
        let ar = testing::country(&db, "Argentina").await;
        let team = create(&db, &photos, &dto(ar.id, "Belgrano", Some("aGVsbG8=")))
            .await
            .unwrap();
        assert!(team.image.starts_with("~/images/teams/"));
        assert_eq!(team.country.name, "Argentina");
        assert_eq!(photos.uploads(), vec![("teams".to_owned(), b"hello".to_vec())]);
        assert_eq!(get(&db, team.id).await.unwrap(), team);
    }

    #[tokio::test]
    async fn failing_store_leaves_image_empty() {
        let db = testing::test_db().await;
        let ar = testing::country(&db, "Argentina").await;
        let team = create(&db, &FailingPhotoStore, &dto(ar.id, "Instituto", Some("aGVsbG8=")))
            .await
            .unwrap();
        assert_eq!(team.image, "");

        let photos = MemoryPhotoStore::default();
        let with_image = update(
            &db,
            &photos,
            &TeamDto {
                id: team.id,
                ..dto(ar.id, "Instituto", Some("aGVsbG8="))
            },
        )
        .await
        .unwrap();
        assert!(!with_image.image.is_empty());

        let kept = update(
            &db,
            &FailingPhotoStore,
            &TeamDto {
                id: team.id,
                ..dto(ar.id, "Instituto AC", None)
            },
        )
        .await
        .unwrap();
        assert_eq!(kept.image, with_image.image);
        assert_eq!(kept.name, "Instituto AC");

        let failed = update(
            &db,
            &FailingPhotoStore,
            &TeamDto {
                id: team.id,
                ..dto(ar.id, "Instituto AC", Some("aGVsbG8="))
            },
        )
        .await
        .unwrap();
        assert_eq!(failed.image, "");
    }

    #[tokio::test]
    async fn unique_per_country() {
        let db = testing::test_db().await;
        let photos = MemoryPhotoStore::default();
        let ar = testing::country(&db, "Argentina").await;
        let uy = testing::country(&db, "Uruguay").await;
        create(&db, &photos, &dto(ar.id, "Nacional", None)).await.unwrap();
        create(&db, &photos, &dto(uy.id, "Nacional", None)).await.unwrap();
        assert_eq!(
            create(&db, &photos, &dto(ar.id, "Nacional", None)).await,
            Err(Error::Conflict)
        );
        assert_eq!(combo(&db, ar.id).await.unwrap().len(), 1);
        let p = Pagination::new(1, 10, Some("nac"));
        assert_eq!(total(&db, &p).await.unwrap(), 2);
        assert_eq!(list(&db, &p).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn update_errors() {
        let db = testing::test_db().await;
        let photos = MemoryPhotoStore::default();
        let ar = testing::country(&db, "Argentina").await;
        let team = create(&db, &photos, &dto(ar.id, "Boca Juniors", None))
            .await
            .unwrap();
        assert_eq!(
            update(&db, &photos, &TeamDto { id: 999, ..dto(ar.id, "x", None) }).await,
            Err(Error::NotFound(Lookup::Update))
        );
        assert_eq!(
            update(&db, &photos, &TeamDto { id: team.id, ..dto(77, "x", None) }).await,
            Err(Error::InvalidReference(Reference::Country))
        );
        delete(&db, team.id).await.unwrap();
        assert_eq!(get(&db, team.id).await, Err(Error::NotFound(Lookup::Get)));
    }
}
