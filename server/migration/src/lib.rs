pub use sea_orm_migration::prelude::*;

mod m20241105_101500_create_reference_tables;
mod m20241105_102000_create_groups_tables;
mod m20241112_180000_create_email_tokens;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20241105_101500_create_reference_tables::Migration),
            Box::new(m20241105_102000_create_groups_tables::Migration),
            Box::new(m20241112_180000_create_email_tokens::Migration),
        ]
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use fantasy_db::{countries, teams};
    use sea_orm::{ActiveModelTrait, Database, Set, SqlErr};

    #[tokio::test]
    async fn up_is_idempotent_and_enforces_unique_teams() {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        Migrator::up(&db, None).await.unwrap();
        Migrator::up(&db, None).await.unwrap();

        let country = countries::ActiveModel {
            name: Set("Argentina".to_owned()),
            ..Default::default()
        }
        .insert(&db)
        .await
        .unwrap();
        let team = |name: &str| teams::ActiveModel {
            name: Set(name.to_owned()),
            image: Set(String::new()),
            country_id: Set(country.id),
            ..Default::default()
        };
        team("Talleres").insert(&db).await.unwrap();
        let err = team("Talleres").insert(&db).await.unwrap_err();
        assert!(matches!(
            err.sql_err(),
            Some(SqlErr::UniqueConstraintViolation(_))
        ));
    }
}
