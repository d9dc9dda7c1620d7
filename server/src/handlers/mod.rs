mod prelude;

pub mod accounts;
pub mod countries;
pub mod groups;
pub mod matches;
pub mod predictions;
pub mod teams;
pub mod tournaments;

use actix_web::web;

/// Registers every `/api` route.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(accounts::post_create_user)
        .service(accounts::get_confirm_email)
        .service(accounts::post_login)
        .service(accounts::post_resend_token)
        .service(accounts::get_account)
        .service(accounts::put_account)
        .service(accounts::post_change_password)
        .service(countries::get_countries)
        .service(countries::get_countries_total)
        .service(countries::get_countries_combo)
        .service(countries::get_country)
        .service(countries::post_country)
        .service(countries::put_country)
        .service(countries::delete_country)
        .service(teams::get_teams)
        .service(teams::get_teams_total)
        .service(teams::get_teams_combo)
        .service(teams::get_team)
        .service(teams::post_team)
        .service(teams::put_team)
        .service(teams::delete_team)
        .service(tournaments::get_tournaments)
        .service(tournaments::get_tournaments_total)
        .service(tournaments::get_tournaments_combo)
        .service(tournaments::get_tournament)
        .service(tournaments::post_tournament)
        .service(tournaments::put_tournament)
        .service(tournaments::post_tournament_team)
        .service(matches::get_tournament_matches)
        .service(matches::get_match)
        .service(matches::post_match)
        .service(matches::put_match)
        .service(groups::get_groups)
        .service(groups::get_groups_total)
        .service(groups::get_active_groups)
        .service(groups::get_group)
        .service(groups::get_group_by_code)
        .service(groups::post_group)
        .service(groups::put_group)
        .service(groups::post_join)
        .service(groups::put_member)
        .service(predictions::get_group_predictions)
        .service(predictions::put_prediction);
}
