use fantasy_db::{prelude::*, teams, tournament_teams};
use sea_orm::EntityTrait;
use sea_orm_migration::prelude::*;

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
            s.create_table_from_entity(Countries),
            s.create_table_from_entity(Users),
            s.create_table_from_entity(Teams),
            s.create_table_from_entity(Tournaments),
            s.create_table_from_entity(TournamentTeams),
            s.create_table_from_entity(Matches),
        ];
        for t in tables.iter_mut() {
            t.if_not_exists();
            m.create_table(t.to_owned()).await?;
        }
        let s = &s;
        let all_idx = [
            idx(s, Countries),
            idx(s, Users),
            idx(s, Teams),
            idx(s, Tournaments),
            idx(s, TournamentTeams),
            idx(s, Matches),
        ]
        .into_iter()
        .flatten();
        for mut i in all_idx {
            i.if_not_exists();
            m.create_index(i).await?;
        }
        let mut team_name_index = Index::create();
        team_name_index
            .name("teams-country-id-name-index")
            .if_not_exists()
            .table(Teams)
            .col(teams::Column::CountryId)
            .col(teams::Column::Name)
            .unique();
        m.create_index(team_name_index).await?;
        let mut tournament_team_index = Index::create();
        tournament_team_index
            .name("tournament-teams-tournament-id-team-id-index")
            .if_not_exists()
            .table(TournamentTeams)
            .col(tournament_teams::Column::TournamentId)
            .col(tournament_teams::Column::TeamId)
            .unique();
        m.create_index(tournament_team_index).await?;
        Ok(())
    }

    async fn down(&self, m: &SchemaManager) -> Result<(), DbErr> {
        m.drop_table(Table::drop().table(Matches).if_exists().to_owned())
            .await
            .inspect_err(log_err("drop matches"))?;
        m.drop_table(Table::drop().table(TournamentTeams).if_exists().to_owned())
            .await
            .inspect_err(log_err("drop tournament_teams"))?;
        m.drop_table(Table::drop().table(Tournaments).if_exists().to_owned())
            .await
            .inspect_err(log_err("drop tournaments"))?;
        m.drop_table(Table::drop().table(Teams).if_exists().to_owned())
            .await
            .inspect_err(log_err("drop teams"))?;
        m.drop_table(Table::drop().table(Users).if_exists().to_owned())
            .await
            .inspect_err(log_err("drop users"))?;
        m.drop_table(Table::drop().table(Countries).if_exists().to_owned())
            .await
            .inspect_err(log_err("drop countries"))?;
        Ok(())
    }
}

pub(crate) fn log_err<'a>(ctx: &'a str) -> impl FnOnce(&DbErr) + 'a {
    move |e| {
        eprintln!("{ctx}: {e}");
    }
}
