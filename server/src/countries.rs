use sea_orm::{
    ActiveModelTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use serde::{Deserialize, Serialize};

use fantasy_db::countries;

use crate::error::{db_err, is_foreign_key_violation, write_err, Error, Lookup};
use crate::pagination::Pagination;
use crate::validation::{Rule, Validate};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CountryView {
    pub id: i64,
    pub name: String,
}

impl From<countries::Model> for CountryView {
    fn from(c: countries::Model) -> Self {
        Self {
            id: c.id,
            name: c.name,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountryDto {
    #[serde(default)]
    pub id: i64,
    pub name: String,
}

impl Validate for CountryDto {
    fn rules(&self) -> Vec<(&'static str, Rule<'_>)> {
        vec![
            ("name", Rule::Required(&self.name)),
            ("name", Rule::MaxLength(&self.name, 100)),
        ]
    }
}

fn filtered(p: &Pagination) -> sea_orm::Select<countries::Entity> {
    let mut q = countries::Entity::find();
    if let Some(f) = p.name_filter((countries::Entity, countries::Column::SearchName)) {
        q = q.filter(f);
    }
    q
}

pub async fn list<C: ConnectionTrait>(db: &C, p: &Pagination) -> Result<Vec<CountryView>, Error> {
    let rows = filtered(p)
        .order_by_asc(countries::Column::Name)
        .offset(p.offset())
        .limit(p.limit())
        .all(db)
        .await
        .map_err(db_err("Failed to list countries"))?;
    Ok(rows.into_iter().map(CountryView::from).collect())
}

pub async fn total<C: ConnectionTrait>(db: &C, p: &Pagination) -> Result<u64, Error> {
    filtered(p)
        .count(db)
        .await
        .map_err(db_err("Failed to count countries"))
}

/// All countries ordered by name.
pub async fn combo<C: ConnectionTrait>(db: &C) -> Result<Vec<CountryView>, Error> {
    let rows = countries::Entity::find()
        .order_by_asc(countries::Column::Name)
        .all(db)
        .await
        .map_err(db_err("Failed to list countries"))?;
    Ok(rows.into_iter().map(CountryView::from).collect())
}

pub async fn get<C: ConnectionTrait>(db: &C, id: i64) -> Result<CountryView, Error> {
    countries::Entity::find_by_id(id)
        .one(db)
        .await
        .map_err(db_err("Failed to fetch country"))?
        .map(CountryView::from)
        .ok_or(Error::NotFound(Lookup::Get))
}

pub async fn create<C: ConnectionTrait>(db: &C, dto: &CountryDto) -> Result<CountryView, Error> {
    dto.validate()?;
    let country = countries::ActiveModel {
        name: Set(dto.name.trim().to_owned()),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(write_err("Failed to insert country", Error::Conflict))?;
    log::info!("Created country {} ({})", country.name, country.id);
    Ok(country.into())
}

pub async fn update<C: ConnectionTrait>(db: &C, dto: &CountryDto) -> Result<CountryView, Error> {
    dto.validate()?;
    let existing = countries::Entity::find_by_id(dto.id)
        .one(db)
        .await
        .map_err(db_err("Failed to fetch country"))?
        .ok_or(Error::NotFound(Lookup::Update))?;
    let mut update: countries::ActiveModel = existing.into();
    update.name = Set(dto.name.trim().to_owned());
    let country = update
        .update(db)
        .await
        .map_err(write_err("Failed to update country", Error::Conflict))?;
    Ok(country.into())
}

pub async fn delete<C: ConnectionTrait>(db: &C, id: i64) -> Result<(), Error> {
    let res = countries::Entity::delete_by_id(id)
        .exec(db)
        .await
        .map_err(|e| {
            if is_foreign_key_violation(&e) {
                Error::InUse
            } else {
                log::error!("Failed to delete country {id}: {e}");
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
    use crate::testing;

    fn dto(name: &str) -> CountryDto {
        CountryDto {
            id: 0,
            name: name.to_owned(),
        }
    }

    #[tokio::test]
    async fn crud() {
        let db = testing::test_db().await;
        let ar = create(&db, &dto("Argentina")).await.unwrap();
        create(&db, &dto("Colombia")).await.unwrap();
        create(&db, &dto("Brasil")).await.unwrap();

        let names: Vec<_> = combo(&db).await.unwrap().into_iter().map(|c| c.name).collect();
        assert_eq!(names, ["Argentina", "Brasil", "Colombia"]);

        let p = Pagination::new(1, 10, Some("BRA"));
        assert_eq!(total(&db, &p).await.unwrap(), 1);
        assert_eq!(list(&db, &p).await.unwrap()[0].name, "Brasil");

        let p = Pagination::new(2, 2, None);
        assert_eq!(list(&db, &p).await.unwrap().len(), 1);

        let renamed = update(
            &db,
            &CountryDto {
                id: ar.id,
                name: "República Argentina".to_owned(),
            },
        )
        .await
        .unwrap();
        assert_eq!(get(&db, ar.id).await.unwrap(), renamed);

        delete(&db, ar.id).await.unwrap();
        assert_eq!(get(&db, ar.id).await, Err(Error::NotFound(Lookup::Get)));
        assert_eq!(delete(&db, ar.id).await, Err(Error::NotFound(Lookup::Get)));
    }

    #[tokio::test]
    async fn duplicates_and_missing() {
        let db = testing::test_db().await;
        create(&db, &dto("Chile")).await.unwrap();
        assert_eq!(create(&db, &dto("Chile")).await, Err(Error::Conflict));
        let missing = CountryDto {
            id: 99,
            name: "Perú".to_owned(),
        };
        assert_eq!(
            update(&db, &missing).await,
            Err(Error::NotFound(Lookup::Update))
        );
        assert!(matches!(
            create(&db, &dto("")).await,
            Err(Error::ValidationFailed(_))
        ));
    }

    #[tokio::test]
    async fn referenced_country_is_in_use() {
        let db = testing::test_db().await;
        let country = testing::country(&db, "Uruguay").await;
        testing::team(&db, country.id, "Peñarol").await;
        assert_eq!(delete(&db, country.id).await, Err(Error::InUse));
    }
}
