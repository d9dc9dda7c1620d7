use fantasy_db::{predictions, prelude::*};
use sea_orm::EntityTrait;
use sea_orm_migration::prelude::*;

use crate::m20241105_101500_create_reference_tables::log_err;

#[derive(DeriveMigrationName)]
pub struct Migration;

fn idx<E: EntityTrait>(s: &sea_orm::Schema, e: E) -> Vec<IndexCreateStatement> {
    s.create_index_from_entity(e)
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, m: &SchemaManager) -> Result<(), DbErr> {
        let s = sea_orm::Schema::new(m.get_database_backend());
        let mut tables = [
            s.create_table_from_entity(Groups),
            s.create_table_from_entity(UserGroups),
            s.create_table_from_entity(Predictions),
        ];
        for t in tables.iter_mut() {
            t.if_not_exists();
            m.create_table(t.to_owned()).await?;
        }
        let s = &s;
        let all_idx = [idx(s, Groups), idx(s, UserGroups), idx(s, Predictions)]
            .into_iter()
            .flatten();
        for mut i in all_idx {
            i.if_not_exists();
            m.create_index(i).await?;
        }
        let mut prediction_key_index = Index::create();
        prediction_key_index
            .name("predictions-group-id-match-id-user-id-index")
            .if_not_exists()
            .table(Predictions)
            .col(predictions::Column::GroupId)
            .col(predictions::Column::MatchId)
            .col(predictions::Column::UserId)
            .unique();
        m.create_index(prediction_key_index).await?;
        Ok(())
    }

    async fn down(&self, m: &SchemaManager) -> Result<(), DbErr> {
        m.drop_table(Table::drop().table(Predictions).if_exists().to_owned())
            .await
            .inspect_err(log_err("drop predictions"))?;
        m.drop_table(Table::drop().table(UserGroups).if_exists().to_owned())
            .await
            .inspect_err(log_err("drop user_groups"))?;
        m.drop_table(Table::drop().table(Groups).if_exists().to_owned())
            .await
            .inspect_err(log_err("drop groups"))?;
        Ok(())
    }
}
