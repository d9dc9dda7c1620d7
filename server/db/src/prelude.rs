pub use super::countries::Entity as Countries;
pub use super::email_tokens::Entity as EmailTokens;
pub use super::groups::Entity as Groups;
pub use super::matches::Entity as Matches;
pub use super::predictions::Entity as Predictions;
pub use super::teams::Entity as Teams;
pub use super::tournament_teams::Entity as TournamentTeams;
pub use super::tournaments::Entity as Tournaments;
pub use super::user_groups::Entity as UserGroups;
pub use super::users::Entity as Users;
