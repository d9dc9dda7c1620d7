use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, ConnectionTrait};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "tournaments")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    pub name: String,
    #[sea_orm(indexed)]
    pub search_name: String,
    pub image: String,
    #[sea_orm(indexed)]
    pub is_active: bool,
    pub remarks: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::tournament_teams::Entity")]
    TournamentTeams,
    #[sea_orm(has_many = "super::matches::Entity")]
    Matches,
    #[sea_orm(has_many = "super::groups::Entity")]
    Groups,
}

impl Related<super::tournament_teams::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TournamentTeams.def()
    }
}

impl Related<super::matches::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Matches.def()
    }
}

impl Related<super::groups::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Groups.def()
    }
}

impl Related<super::teams::Entity> for Entity {
    fn to() -> RelationDef {
        super::tournament_teams::Relation::Teams.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::tournament_teams::Relation::Tournaments.def().rev())
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
