//! Shared fixtures for unit tests.

use std::sync::Mutex;

use migration::MigratorTrait;
use sea_orm::{ActiveModelTrait, Database, DatabaseConnection, Set};

use fantasy_db::{common::UserType, countries, matches, teams, tournament_teams, tournaments, users};

use crate::accounts;
use crate::config::{AuthConfig, MailConfig};
use crate::groups::{self, GroupView, NewGroup};
use crate::mailer::{MailError, MailSender};
use crate::photo_store::PhotoStore;

pub async fn test_db() -> DatabaseConnection {
    let _ = env_logger::builder().is_test(true).try_init();
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    db
}

pub fn auth_config() -> AuthConfig {
    AuthConfig {
        jwt_key: "test-signing-key-0123456789abcdefghijkl".to_owned(),
        token_lifetime_days: 30,
        max_failed_access_attempts: 3,
        lockout_minutes: 5,
        email_token_lifetime_hours: 24,
    }
}

pub fn settings() -> accounts::Settings {
    accounts::Settings {
        auth: auth_config(),
        mail: MailConfig::default(),
        frontend_url: "http://localhost:4200".to_owned(),
    }
}

pub fn days_from_now(days: i64) -> time::OffsetDateTime {
    time::OffsetDateTime::now_utc() + time::Duration::days(days)
}

pub struct FailingPhotoStore;

#[async_trait::async_trait]
impl PhotoStore for FailingPhotoStore {
    async fn upload_photo(&self, _: &[u8], _: &str, _: &str) -> bool {
        false
    }
}

#[derive(Default)]
pub struct MemoryPhotoStore {
    stored: Mutex<Vec<(String, String, Vec<u8>)>>,
}

impl MemoryPhotoStore {
    /// (category, content) of every upload in order.
    pub fn uploads(&self) -> Vec<(String, Vec<u8>)> {
        self.stored
            .lock()
            .unwrap()
            .iter()
            .map(|(category, _, content)| (category.clone(), content.clone()))
            .collect()
    }

    pub fn file_names(&self) -> Vec<String> {
        self.stored
            .lock()
            .unwrap()
            .iter()
            .map(|(_, name, _)| name.clone())
            .collect()
    }
}

#[async_trait::async_trait]
impl PhotoStore for MemoryPhotoStore {
    async fn upload_photo(&self, content: &[u8], category: &str, file_name: &str) -> bool {
        self.stored.lock().unwrap().push((
            category.to_owned(),
            file_name.to_owned(),
            content.to_vec(),
        ));
        true
    }
}

#[derive(Clone, Debug)]
pub struct SentMail {
    pub to_name: String,
    pub to_email: String,
    pub subject: String,
    pub body: String,
    pub language: String,
}

#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<SentMail>>,
}

impl RecordingMailer {
    pub fn last(&self) -> Option<SentMail> {
        self.sent.lock().unwrap().last().cloned()
    }
}

impl MailSender for RecordingMailer {
    fn send_mail(
        &self,
        to_name: &str,
        to_email: &str,
        subject: &str,
        body: &str,
        language: &str,
    ) -> Result<(), MailError> {
        self.sent.lock().unwrap().push(SentMail {
            to_name: to_name.to_owned(),
            to_email: to_email.to_owned(),
            subject: subject.to_owned(),
            body: body.to_owned(),
            language: language.to_owned(),
        });
        Ok(())
    }
}

pub struct FailingMailer;

impl MailSender for FailingMailer {
    fn send_mail(&self, _: &str, _: &str, _: &str, _: &str, _: &str) -> Result<(), MailError> {
        Err(MailError::Delivery("relay unreachable".to_owned()))
    }
}

pub async fn country(db: &DatabaseConnection, name: &str) -> countries::Model {
    countries::ActiveModel {
        name: Set(name.to_owned()),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap()
}

pub async fn team(db: &DatabaseConnection, country_id: i64, name: &str) -> teams::Model {
    teams::ActiveModel {
        name: Set(name.to_owned()),
        image: Set(String::new()),
        country_id: Set(country_id),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap()
}

pub async fn tournament(db: &DatabaseConnection, name: &str) -> tournaments::Model {
    tournaments::ActiveModel {
        name: Set(name.to_owned()),
        image: Set(String::new()),
        is_active: Set(true),
        remarks: Set(None),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap()
}

/// A confirmed user whose password hash never verifies.
pub async fn user(db: &DatabaseConnection, email: &str, country_id: i64) -> users::Model {
    users::ActiveModel {
        email: Set(email.to_owned()),
        first_name: Set("Test".to_owned()),
        last_name: Set(email.split('@').next().unwrap_or_default().to_owned()),
        phone_number: Set(None),
        photo: Set(String::new()),
        country_id: Set(country_id),
        user_type: Set(UserType::User),
        password_hash: Set("-".to_owned()),
        email_confirmed: Set(true),
        access_failed_count: Set(0),
        lockout_end: Set(None),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap()
}

/// Inserts the match row only; predictions are left to the caller.
pub async fn fixture_match(
    db: &DatabaseConnection,
    tournament_id: i64,
    local_id: i64,
    visitor_id: i64,
    days: i64,
) -> matches::Model {
    matches::ActiveModel {
        tournament_id: Set(tournament_id),
        date: Set(days_from_now(days)),
        is_active: Set(true),
        local_id: Set(local_id),
        visitor_id: Set(visitor_id),
        goals_local: Set(None),
        goals_visitor: Set(None),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap()
}

pub async fn group(db: &DatabaseConnection, admin_id: i64, tournament_id: i64) -> GroupView {
    groups::create_group(
        db,
        &MemoryPhotoStore::default(),
        &NewGroup {
            admin_id,
            tournament_id,
            name: "Amigos".to_owned(),
            remarks: None,
            image: None,
        },
    )
    .await
    .unwrap()
}

pub async fn join(db: &DatabaseConnection, code: &str, user_id: i64) {
    groups::join_group(db, code, user_id).await.unwrap();
}

pub struct World {
    pub country: countries::Model,
    pub local: teams::Model,
    pub visitor: teams::Model,
    pub tournament: tournaments::Model,
    pub admin: users::Model,
    pub member: users::Model,
}

/// A country, two teams playing in one active tournament and two users.
pub async fn world(db: &DatabaseConnection) -> World {
    let country = country(db, "Argentina").await;
    let local = team(db, country.id, "Talleres").await;
    let visitor = team(db, country.id, "Belgrano").await;
    let tournament = tournament(db, "Copa de la Liga").await;
    for team_id in [local.id, visitor.id] {
        tournament_teams::ActiveModel {
            tournament_id: Set(tournament.id),
            team_id: Set(team_id),
            ..Default::default()
        }
        .insert(db)
        .await
        .unwrap();
    }
    let admin = user(db, "admin@example.com", country.id).await;
    let member = user(db, "member@example.com", country.id).await;
    World {
        country,
        local,
        visitor,
        tournament,
        admin,
        member,
    }
}
