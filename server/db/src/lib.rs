pub mod prelude;

pub mod common;
pub mod countries;
pub mod email_tokens;
pub mod groups;
pub mod matches;
pub mod predictions;
pub mod teams;
pub mod tournament_teams;
pub mod tournaments;
pub mod user_groups;
pub mod users;
