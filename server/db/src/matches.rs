use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "matches")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(indexed)]
    pub tournament_id: i64,
    pub date: TimeDateTimeWithTimeZone,
    pub is_active: bool,
    pub local_id: i64,
    pub visitor_id: i64,
    pub goals_local: Option<i32>,
    pub goals_visitor: Option<i32>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::tournaments::Entity",
        from = "Column::TournamentId",
        to = "super::tournaments::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    Tournaments,
    #[sea_orm(
        belongs_to = "super::teams::Entity",
        from = "Column::LocalId",
        to = "super::teams::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Local,
    #[sea_orm(
        belongs_to = "super::teams::Entity",
        from = "Column::VisitorId",
        to = "super::teams::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Visitor,
    #[sea_orm(has_many = "super::predictions::Entity")]
    Predictions,
}

impl Related<super::tournaments::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Tournaments.def()
    }
}

impl Related<super::predictions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Predictions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
