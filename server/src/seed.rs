//! Idempotent demo data loaded at startup. Every step only runs when its
//! table is still empty, so restarting the server never duplicates rows.

use std::collections::HashMap;
use std::path::Path;

use migration::MigratorTrait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    Set,
};

use fantasy_db::common::{search_key, UserType};
use fantasy_db::{countries, groups, teams, tournament_teams, tournaments, users};

use crate::auth;
use crate::config::SeedConfig;
use crate::error::{db_err, Error};
use crate::groups::NewGroup;
use crate::matches::MatchDto;
use crate::photo_store::{photo_path, PhotoStore};

const COUNTRIES: &[&str] = &[
    "Alemania",
    "Argentina",
    "Bolivia",
    "Brasil",
    "Canadá",
    "Chile",
    "Colombia",
    "Croacia",
    "Ecuador",
    "España",
    "Estados Unidos",
    "Francia",
    "Inglaterra",
    "Italia",
    "Japón",
    "Marruecos",
    "México",
    "Paraguay",
    "Perú",
    "Portugal",
    "Uruguay",
    "Venezuela",
];

const ARGENTINE_CLUBS: &[&str] = &[
    "Talleres",
    "Belgrano",
    "Instituto",
    "River Plate",
    "Boca Juniors",
];

struct DemoUser {
    email: &'static str,
    first_name: &'static str,
    last_name: &'static str,
    country: &'static str,
    user_type: UserType,
}

const USERS: &[DemoUser] = &[
    DemoUser {
        email: "admin@yopmail.com",
        first_name: "Juan",
        last_name: "Zuluaga",
        country: "Colombia",
        user_type: UserType::Admin,
    },
    DemoUser {
        email: "ledys@yopmail.com",
        first_name: "Ledys",
        last_name: "Bedoya",
        country: "Colombia",
        user_type: UserType::User,
    },
    DemoUser {
        email: "pablo@yopmail.com",
        first_name: "Pablo",
        last_name: "Aimar",
        country: "Argentina",
        user_type: UserType::User,
    },
    DemoUser {
        email: "lucia@yopmail.com",
        first_name: "Lucía",
        last_name: "Fernández",
        country: "Uruguay",
        user_type: UserType::User,
    },
    DemoUser {
        email: "marcos@yopmail.com",
        first_name: "Marcos",
        last_name: "Silva",
        country: "Brasil",
        user_type: UserType::User,
    },
];

struct DemoTournament {
    name: &'static str,
    remarks: &'static str,
    teams: &'static [&'static str],
    /// (local, visitor, days from today, final score if already played)
    matches: &'static [(&'static str, &'static str, i64, Option<(i32, i32)>)],
}

const TOURNAMENTS: &[DemoTournament] = &[
    DemoTournament {
        name: "Liga Profesional Argentina",
        remarks: "Torneo local",
        teams: ARGENTINE_CLUBS,
        matches: &[
            ("Belgrano", "River Plate", -2, Some((1, 1))),
            ("Boca Juniors", "Instituto", -1, Some((2, 0))),
            ("Talleres", "Belgrano", 1, None),
            ("River Plate", "Boca Juniors", 2, None),
            ("Instituto", "Talleres", 3, None),
        ],
    },
    DemoTournament {
        name: "Copa América",
        remarks: "Selecciones de América",
        teams: &["Argentina", "Brasil", "Chile", "Colombia", "Perú", "Uruguay"],
        matches: &[
            ("Argentina", "Brasil", 5, None),
            ("Uruguay", "Colombia", 6, None),
            ("Chile", "Perú", 7, None),
            ("Argentina", "Uruguay", 10, None),
        ],
    },
];

struct DemoGroup {
    name: &'static str,
    remarks: &'static str,
    tournament: &'static str,
    admin: &'static str,
    members: &'static [&'static str],
}

const GROUPS: &[DemoGroup] = &[
    DemoGroup {
        name: "Amigos del Barrio",
        remarks: "El que pierde paga el asado",
        tournament: "Liga Profesional Argentina",
        admin: "pablo@yopmail.com",
        members: &["admin@yopmail.com", "lucia@yopmail.com"],
    },
    DemoGroup {
        name: "Oficina",
        remarks: "Copa de la oficina",
        tournament: "Copa América",
        admin: "admin@yopmail.com",
        members: &["ledys@yopmail.com", "marcos@yopmail.com", "pablo@yopmail.com"],
    },
    DemoGroup {
        name: "Familia",
        remarks: "",
        tournament: "Copa América",
        admin: "lucia@yopmail.com",
        members: &["marcos@yopmail.com"],
    },
];

pub async fn run(
    db: &DatabaseConnection,
    photos: &dyn PhotoStore,
    cfg: &SeedConfig,
) -> Result<(), Error> {
    migration::Migrator::up(db, None).await.map_err(|e| {
        log::error!("Failed to apply migrations: {e}");
        Error::Db(e)
    })?;
    check_countries(db).await?;
    check_teams(db, photos, cfg.flags_dir.as_deref()).await?;
    check_users(db, &cfg.demo_password).await?;
    check_tournaments(db).await?;
    check_groups(db, photos).await?;
    if cfg.reconcile_predictions {
        let inserted = crate::predictions::reconcile_all(db).await?;
        log::info!("Seed: reconciliation added {inserted} predictions");
    }
    Ok(())
}

async fn is_empty<E>(db: &DatabaseConnection) -> Result<bool, Error>
where
    E: EntityTrait,
    E::Model: Sync,
{
    let n = E::find()
        .count(db)
        .await
        .map_err(db_err("Failed to count seed table"))?;
    Ok(n == 0)
}

async fn check_countries(db: &DatabaseConnection) -> Result<(), Error> {
    if !is_empty::<countries::Entity>(db).await? {
        return Ok(());
    }
    // insert_many skips the save hooks, so the search key is set here.
    let rows = COUNTRIES.iter().map(|name| countries::ActiveModel {
        name: Set((*name).to_owned()),
        search_name: Set(search_key(name)),
        ..Default::default()
    });
    countries::Entity::insert_many(rows)
        .exec_without_returning(db)
        .await
        .map_err(db_err("Failed to seed countries"))?;
    log::info!("Seed: {} countries", COUNTRIES.len());
    Ok(())
}

async fn country_ids(db: &DatabaseConnection) -> Result<HashMap<String, i64>, Error> {
    Ok(countries::Entity::find()
        .all(db)
        .await
        .map_err(db_err("Failed to fetch countries"))?
        .into_iter()
        .map(|c| (c.name, c.id))
        .collect())
}

/// Uploads `{flags_dir}/{country}.png` as `teams/{country}.jpg`.
async fn flag_image(photos: &dyn PhotoStore, flags_dir: Option<&Path>, country: &str) -> String {
    let Some(dir) = flags_dir else {
        return String::new();
    };
    let path = dir.join(format!("{country}.png"));
    let content = match tokio::fs::read(&path).await {
        Ok(c) => c,
        Err(e) => {
            log::debug!("No flag for {country} at {path:?}: {e}");
            return String::new();
        }
    };
    let file_name = format!("{country}.jpg");
    if photos
        .upload_photo(&content, crate::teams::PHOTO_CATEGORY, &file_name)
        .await
    {
        photo_path(crate::teams::PHOTO_CATEGORY, &file_name)
    } else {
        String::new()
    }
}

async fn check_teams(
    db: &DatabaseConnection,
    photos: &dyn PhotoStore,
    flags_dir: Option<&Path>,
) -> Result<(), Error> {
    if !is_empty::<teams::Entity>(db).await? {
        return Ok(());
    }
    let all_countries = countries::Entity::find()
        .all(db)
        .await
        .map_err(db_err("Failed to fetch countries"))?;
    let mut rows = Vec::new();
    for country in all_countries {
        if country.name == "Argentina" {
            rows.extend(ARGENTINE_CLUBS.iter().map(|club| teams::ActiveModel {
                name: Set((*club).to_owned()),
                search_name: Set(search_key(club)),
                image: Set(String::new()),
                country_id: Set(country.id),
                ..Default::default()
            }));
        }
        let image = flag_image(photos, flags_dir, &country.name).await;
        rows.push(teams::ActiveModel {
            name: Set(country.name.clone()),
            search_name: Set(search_key(&country.name)),
            image: Set(image),
            country_id: Set(country.id),
            ..Default::default()
        });
    }
    let n = rows.len();
    teams::Entity::insert_many(rows)
        .exec_without_returning(db)
        .await
        .map_err(db_err("Failed to seed teams"))?;
    log::info!("Seed: {n} teams");
    Ok(())
}

async fn check_users(db: &DatabaseConnection, password: &str) -> Result<(), Error> {
    let country_ids = country_ids(db).await?;
    for demo in USERS {
        let exists = users::Entity::find()
            .filter(users::Column::Email.eq(demo.email))
            .count(db)
            .await
            .map_err(db_err("Failed to check demo user"))?
            > 0;
        if exists {
            continue;
        }
        let Some(&country_id) = country_ids.get(demo.country) else {
            log::warn!("Seed: unknown country {} for {}", demo.country, demo.email);
            continue;
        };
        users::ActiveModel {
            email: Set(demo.email.to_owned()),
            first_name: Set(demo.first_name.to_owned()),
            last_name: Set(demo.last_name.to_owned()),
            phone_number: Set(None),
            photo: Set(String::new()),
            country_id: Set(country_id),
            user_type: Set(demo.user_type),
            password_hash: Set(auth::hash_password(password)?),
            email_confirmed: Set(true),
            access_failed_count: Set(0),
            lockout_end: Set(None),
            ..Default::default()
        }
        .insert(db)
        .await
        .map_err(db_err("Failed to seed user"))?;
        log::info!("Seed: user {}", demo.email);
    }
    Ok(())
}

async fn check_tournaments(db: &DatabaseConnection) -> Result<(), Error> {
    if !is_empty::<tournaments::Entity>(db).await? {
        return Ok(());
    }
    let team_ids: HashMap<String, i64> = teams::Entity::find()
        .all(db)
        .await
        .map_err(db_err("Failed to fetch teams"))?
        .into_iter()
        .map(|t| (t.name, t.id))
        .collect();
    let today = time::OffsetDateTime::now_utc()
        .replace_time(time::macros::time!(20:00));
    for demo in TOURNAMENTS {
        let t = tournaments::ActiveModel {
            name: Set(demo.name.to_owned()),
            image: Set(String::new()),
            is_active: Set(true),
            remarks: Set(Some(demo.remarks.to_owned())),
            ..Default::default()
        }
        .insert(db)
        .await
        .map_err(db_err("Failed to seed tournament"))?;
        for name in demo.teams {
            let Some(&team_id) = team_ids.get(*name) else {
                log::warn!("Seed: unknown team {name}");
                continue;
            };
            tournament_teams::ActiveModel {
                tournament_id: Set(t.id),
                team_id: Set(team_id),
                ..Default::default()
            }
            .insert(db)
            .await
            .map_err(db_err("Failed to seed tournament team"))?;
        }
        for (local, visitor, days, score) in demo.matches {
            let (Some(&local_id), Some(&visitor_id)) = (team_ids.get(*local), team_ids.get(*visitor))
            else {
                log::warn!("Seed: unknown teams for {local} - {visitor}");
                continue;
            };
            crate::matches::create(
                db,
                &MatchDto {
                    id: 0,
                    tournament_id: t.id,
                    local_id,
                    visitor_id,
                    date: today + time::Duration::days(*days),
                    is_active: true,
                    goals_local: score.map(|s| s.0),
                    goals_visitor: score.map(|s| s.1),
                },
            )
            .await?;
        }
        log::info!("Seed: tournament {}", demo.name);
    }
    Ok(())
}

async fn check_groups(db: &DatabaseConnection, photos: &dyn PhotoStore) -> Result<(), Error> {
    if !is_empty::<groups::Entity>(db).await? {
        return Ok(());
    }
    let user_ids: HashMap<String, i64> = users::Entity::find()
        .all(db)
        .await
        .map_err(db_err("Failed to fetch users"))?
        .into_iter()
        .map(|u| (u.email, u.id))
        .collect();
    let tournament_ids: HashMap<String, i64> = tournaments::Entity::find()
        .all(db)
        .await
        .map_err(db_err("Failed to fetch tournaments"))?
        .into_iter()
        .map(|t| (t.name, t.id))
        .collect();
    for demo in GROUPS {
        let (Some(&admin_id), Some(&tournament_id)) =
            (user_ids.get(demo.admin), tournament_ids.get(demo.tournament))
        else {
            log::warn!("Seed: skipping group {}", demo.name);
            continue;
        };
        let group = crate::groups::create_group(
            db,
            photos,
            &NewGroup {
                admin_id,
                tournament_id,
                name: demo.name.to_owned(),
                remarks: Some(demo.remarks.to_owned()).filter(|r| !r.is_empty()),
                image: None,
            },
        )
        .await?;
        for member in demo.members {
            if let Some(&user_id) = user_ids.get(*member) {
                crate::groups::join_group(db, &group.code, user_id).await?;
            }
        }
        log::info!("Seed: group {} ({})", group.name, group.code);
    }
    Ok(())
}
