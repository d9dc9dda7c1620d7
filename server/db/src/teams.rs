use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, ConnectionTrait};

// (country_id, name) is unique; the index is created by the migration.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "teams")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub name: String,
    #[sea_orm(indexed)]
    pub search_name: String,
    pub image: String,
    #[sea_orm(indexed)]
    pub country_id: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::countries::Entity",
        from = "Column::CountryId",
        to = "super::countries::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Countries,
    #[sea_orm(has_many = "super::tournament_teams::Entity")]
    TournamentTeams,
}

impl Related<super::countries::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Countries.def()
    }
}

impl Related<super::tournament_teams::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TournamentTeams.def()
    }
}

impl Related<super::tournaments::Entity> for Entity {
    fn to() -> RelationDef {
        super::tournament_teams::Relation::Tournaments.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::tournament_teams::Relation::Teams.def().rev())
    }
}

#[async_trait::async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(mut self, _db: &C, _insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        if let ActiveValue::Set(name) = &self.name {
            self.search_name = ActiveValue::Set(crate::common::search_key(name));
        }
        Ok(self)
    }
}
