use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use fantasy_db::{common::UserType, countries, email_tokens, users};

use crate::auth::{self, TokenDto};
use crate::config::{AuthConfig, Config, MailConfig};
use crate::error::{db_err, write_err, Error, Lookup, Reference};
use crate::mailer::{self, MailSender};
use crate::photo_store::{upload_base64, PhotoStore};
use crate::validation::{Rule, Validate};

pub const PHOTO_CATEGORY: &str = "users";

/// What the account service needs from the configuration.
#[derive(Clone, Debug)]
pub struct Settings {
    pub auth: AuthConfig,
    pub mail: MailConfig,
    pub frontend_url: String,
}

impl Settings {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            auth: cfg.auth_config.clone(),
            mail: cfg.mail_config.clone(),
            frontend_url: cfg.server_config.frontend_url.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: i64,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub phone_number: Option<String>,
    pub photo: String,
    pub country_id: i64,
    pub user_type: UserType,
    pub email_confirmed: bool,
}

impl From<users::Model> for UserView {
    fn from(u: users::Model) -> Self {
        Self {
            full_name: u.full_name(),
            id: u.id,
            email: u.email,
            first_name: u.first_name,
            last_name: u.last_name,
            phone_number: u.phone_number,
            photo: u.photo,
            country_id: u.country_id,
            user_type: u.user_type,
            email_confirmed: u.email_confirmed,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDto {
    pub email: String,
    pub password: String,
    pub password_confirm: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub phone_number: Option<String>,
    pub country_id: i64,
    /// Base64 image.
    #[serde(default)]
    pub photo: Option<String>,
    #[serde(default)]
    pub language: String,
}

fn name_rules<'a>(first_name: &'a str, last_name: &'a str) -> Vec<(&'static str, Rule<'a>)> {
    vec![
        ("firstName", Rule::Required(first_name)),
        ("firstName", Rule::MaxLength(first_name, 50)),
        ("lastName", Rule::Required(last_name)),
        ("lastName", Rule::MaxLength(last_name, 50)),
    ]
}

impl Validate for UserDto {
    fn rules(&self) -> Vec<(&'static str, Rule<'_>)> {
        // Checked as stored: padding is trimmed before the lookup.
        let email = self.email.trim();
        let mut rules = vec![
            ("email", Rule::Required(email)),
            ("email", Rule::Email(email)),
            ("password", Rule::Length(&self.password, 6, 20)),
            (
                "passwordConfirm",
                Rule::SameAs(&self.password_confirm, &self.password),
            ),
            ("countryId", Rule::Positive(self.country_id)),
        ];
        rules.extend(name_rules(&self.first_name, &self.last_name));
        if let Some(phone) = &self.phone_number {
            rules.push(("phoneNumber", Rule::MaxLength(phone, 20)));
        }
        rules
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserDto {
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub phone_number: Option<String>,
    pub country_id: i64,
    /// Base64 image; the current photo is kept when absent.
    #[serde(default)]
    pub photo: Option<String>,
}

impl Validate for UpdateUserDto {
    fn rules(&self) -> Vec<(&'static str, Rule<'_>)> {
        let mut rules = name_rules(&self.first_name, &self.last_name);
        rules.push(("countryId", Rule::Positive(self.country_id)));
        if let Some(phone) = &self.phone_number {
            rules.push(("phoneNumber", Rule::MaxLength(phone, 20)));
        }
        rules
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginDto {
    pub email: String,
    pub password: String,
}

impl Validate for LoginDto {
    fn rules(&self) -> Vec<(&'static str, Rule<'_>)> {
        let email = self.email.trim();
        vec![
            ("email", Rule::Required(email)),
            ("email", Rule::Email(email)),
            ("password", Rule::Required(&self.password)),
        ]
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordDto {
    pub current_password: String,
    pub new_password: String,
    pub confirm: String,
}

impl Validate for ChangePasswordDto {
    fn rules(&self) -> Vec<(&'static str, Rule<'_>)> {
        vec![
            ("currentPassword", Rule::Required(&self.current_password)),
            ("newPassword", Rule::Length(&self.new_password, 6, 20)),
            ("confirm", Rule::SameAs(&self.confirm, &self.new_password)),
        ]
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

async fn find_by_email<C: ConnectionTrait>(
    db: &C,
    email: &str,
) -> Result<Option<users::Model>, Error> {
    users::Entity::find()
        .filter(users::Column::Email.eq(normalize_email(email)))
        .one(db)
        .await
        .map_err(db_err("Failed to fetch user by email"))
}

async fn check_country<C: ConnectionTrait>(db: &C, id: i64) -> Result<(), Error> {
    countries::Entity::find_by_id(id)
        .one(db)
        .await
        .map_err(db_err("Failed to fetch country"))?
        .ok_or(Error::InvalidReference(Reference::Country))?;
    Ok(())
}

/// Registers an unconfirmed user and mails a confirmation link.
/// Self-registration always creates plain users.
pub async fn register<C: ConnectionTrait>(
    db: &C,
    photos: &dyn PhotoStore,
    mailer: &dyn MailSender,
    settings: &Settings,
    dto: &UserDto,
) -> Result<UserView, Error> {
    dto.validate()?;
    check_country(db, dto.country_id).await?;
    let email = normalize_email(&dto.email);
    if find_by_email(db, &email).await?.is_some() {
        return Err(Error::DuplicateEmail);
    }
    let photo = upload_base64(photos, dto.photo.as_deref(), PHOTO_CATEGORY).await;
    let user = users::ActiveModel {
        email: Set(email),
        first_name: Set(dto.first_name.trim().to_owned()),
        last_name: Set(dto.last_name.trim().to_owned()),
        phone_number: Set(dto.phone_number.clone()),
        photo: Set(photo),
        country_id: Set(dto.country_id),
        user_type: Set(UserType::User),
        password_hash: Set(auth::hash_password(&dto.password)?),
        email_confirmed: Set(false),
        access_failed_count: Set(0),
        lockout_end: Set(None),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(write_err("Failed to insert user", Error::DuplicateEmail))?;
    log::info!("Registered user {} ({})", user.email, user.id);
    send_confirmation(db, mailer, settings, &user, &dto.language).await?;
    Ok(user.into())
}

async fn send_confirmation<C: ConnectionTrait>(
    db: &C,
    mailer: &dyn MailSender,
    settings: &Settings,
    user: &users::Model,
    language: &str,
) -> Result<(), Error> {
    let token = auth::random_email_token();
    let expires_at =
        OffsetDateTime::now_utc() + time::Duration::hours(settings.auth.email_token_lifetime_hours);
    email_tokens::ActiveModel {
        user_id: Set(user.id),
        token: Set(token.clone()),
        expires_at: Set(expires_at),
        used: Set(false),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(db_err("Failed to store email token"))?;
    let link = mailer::confirmation_link(&settings.frontend_url, user.id, &token);
    let (subject, body) = mailer::confirmation_message(&settings.mail, language, &link);
    mailer
        .send_mail(&user.full_name(), &user.email, &subject, &body, language)
        .map_err(|e| {
            log::warn!("Confirmation mail to {} failed: {e}", user.email);
            Error::MailFailed(e.to_string())
        })
}

pub async fn resend_token<C: ConnectionTrait>(
    db: &C,
    mailer: &dyn MailSender,
    settings: &Settings,
    email: &str,
    language: &str,
) -> Result<(), Error> {
    let user = find_by_email(db, email)
        .await?
        .ok_or(Error::NotFound(Lookup::Get))?;
    send_confirmation(db, mailer, settings, &user, language).await
}

/// Consumes a confirmation token and marks the account confirmed.
pub async fn confirm_email<C: ConnectionTrait + TransactionTrait>(
    db: &C,
    user_id: i64,
    token: &str,
) -> Result<(), Error> {
    let user = users::Entity::find_by_id(user_id)
        .one(db)
        .await
        .map_err(db_err("Failed to fetch user"))?
        .ok_or(Error::NotFound(Lookup::Get))?;
    let token = token.to_owned();
    db.transaction::<_, (), Error>(|txn| {
        Box::pin(async move {
            let row = email_tokens::Entity::find()
                .filter(email_tokens::Column::UserId.eq(user.id))
                .filter(email_tokens::Column::Token.eq(token))
                .filter(email_tokens::Column::Used.eq(false))
                .one(txn)
                .await
                .map_err(db_err("Failed to fetch email token"))?
                .ok_or(Error::InvalidToken)?;
            if row.expires_at <= OffsetDateTime::now_utc() {
                return Err(Error::InvalidToken);
            }
            let res = email_tokens::Entity::update_many()
                .col_expr(email_tokens::Column::Used, true.into())
                .filter(email_tokens::Column::Id.eq(row.id))
                .filter(email_tokens::Column::Used.eq(false))
                .exec(txn)
                .await
                .map_err(db_err("Failed to consume email token"))?;
            if res.rows_affected == 0 {
                return Err(Error::InvalidToken);
            }
            let mut update: users::ActiveModel = user.into();
            update.email_confirmed = Set(true);
            update
                .update(txn)
                .await
                .map_err(db_err("Failed to confirm user"))?;
            Ok(())
        })
    })
    .await?;
    log::info!("User {user_id} confirmed their email");
    Ok(())
}

/// Checks credentials, applying the failed-attempt lockout.
pub async fn login<C: ConnectionTrait>(
    db: &C,
    settings: &Settings,
    dto: &LoginDto,
) -> Result<TokenDto, Error> {
    dto.validate()?;
    let Some(user) = find_by_email(db, &dto.email).await? else {
        return Err(Error::InvalidCredentials);
    };
    if !user.email_confirmed {
        return Err(Error::NotAllowed);
    }
    let now = OffsetDateTime::now_utc();
    if user.lockout_end.is_some_and(|end| end > now) {
        return Err(Error::LockedOut);
    }
    let cfg = &settings.auth;
    let mut update: users::ActiveModel = user.clone().into();
    if !auth::verify_password(&dto.password, &user.password_hash) {
        let failures = user.access_failed_count + 1;
        let outcome = if failures >= cfg.max_failed_access_attempts {
            log::warn!("Locking out {} after {failures} failed attempts", user.email);
            update.access_failed_count = Set(0);
            update.lockout_end = Set(Some(now + time::Duration::minutes(cfg.lockout_minutes)));
            Error::LockedOut
        } else {
            update.access_failed_count = Set(failures);
            Error::InvalidCredentials
        };
        update
            .update(db)
            .await
            .map_err(db_err("Failed to record failed login"))?;
        return Err(outcome);
    }
    if user.access_failed_count != 0 || user.lockout_end.is_some() {
        update.access_failed_count = Set(0);
        update.lockout_end = Set(None);
        update
            .update(db)
            .await
            .map_err(db_err("Failed to reset login failures"))?;
    }
    auth::issue_token(&user, cfg)
}

pub async fn get_user<C: ConnectionTrait>(db: &C, email: &str) -> Result<UserView, Error> {
    find_by_email(db, email)
        .await?
        .map(UserView::from)
        .ok_or(Error::NotFound(Lookup::Get))
}

/// Updates the profile and returns a token carrying the new claims.
pub async fn update_user<C: ConnectionTrait>(
    db: &C,
    photos: &dyn PhotoStore,
    settings: &Settings,
    email: &str,
    dto: &UpdateUserDto,
) -> Result<TokenDto, Error> {
    dto.validate()?;
    let user = find_by_email(db, email)
        .await?
        .ok_or(Error::NotFound(Lookup::Update))?;
    check_country(db, dto.country_id).await?;
    let mut update: users::ActiveModel = user.into();
    update.first_name = Set(dto.first_name.trim().to_owned());
    update.last_name = Set(dto.last_name.trim().to_owned());
    update.phone_number = Set(dto.phone_number.clone());
    update.country_id = Set(dto.country_id);
    if dto.photo.is_some() {
        update.photo = Set(upload_base64(photos, dto.photo.as_deref(), PHOTO_CATEGORY).await);
    }
    let user = update
        .update(db)
        .await
        .map_err(db_err("Failed to update user"))?;
    auth::issue_token(&user, &settings.auth)
}

pub async fn change_password<C: ConnectionTrait>(
    db: &C,
    email: &str,
    dto: &ChangePasswordDto,
) -> Result<(), Error> {
    dto.validate()?;
    let user = find_by_email(db, email)
        .await?
        .ok_or(Error::NotFound(Lookup::Get))?;
    if !auth::verify_password(&dto.current_password, &user.password_hash) {
        return Err(Error::InvalidCurrentPassword);
    }
    let mut update: users::ActiveModel = user.into();
    update.password_hash = Set(auth::hash_password(&dto.new_password)?);
    update
        .update(db)
        .await
        .map_err(db_err("Failed to change password"))?;
    Ok(())
}

pub async fn user_count<C: ConnectionTrait>(db: &C) -> Result<u64, Error> {
    users::Entity::find()
        .count(db)
        .await
        .map_err(db_err("Failed to count users"))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::testing::{self, FailingMailer, MemoryPhotoStore, RecordingMailer};

    fn registration(country_id: i64, email: &str) -> UserDto {
        UserDto {
            email: email.to_owned(),
            password: "secret1".to_owned(),
            password_confirm: "secret1".to_owned(),
            first_name: "Lionel".to_owned(),
            last_name: "Messi".to_owned(),
            phone_number: None,
            country_id,
            photo: None,
            language: "es".to_owned(),
        }
    }

    fn login_dto(email: &str, password: &str) -> LoginDto {
        LoginDto {
            email: email.to_owned(),
            password: password.to_owned(),
        }
    }

    /// Extracts the token from the last confirmation link sent.
    fn sent_token(mailer: &RecordingMailer) -> (i64, String) {
        let mail = mailer.last().unwrap();
        let query = mail.body.split("ConfirmEmail?").nth(1).unwrap();
        let query = query.split('>').next().unwrap();
        let mut user_id = 0;
        let mut token = String::new();
        for kv in query.split('&') {
            match kv.split_once('=').unwrap() {
                ("userId", v) => user_id = v.parse().unwrap(),
                ("token", v) => token = v.to_owned(),
                _ => {}
            }
        }
        (user_id, token)
    }

    async fn registered(db: &sea_orm::DatabaseConnection, mailer: &RecordingMailer) -> UserView {
        let country = testing::country(db, "Argentina").await;
        register(
            db,
            &MemoryPhotoStore::default(),
            mailer,
            &testing::settings(),
            &registration(country.id, " Leo@Example.com "),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn register_then_confirm_once() {
        let db = testing::test_db().await;
        let mailer = RecordingMailer::default();
        let user = registered(&db, &mailer).await;
        assert_eq!(user.email, "leo@example.com");
        assert_eq!(user.user_type, UserType::User);
        assert!(!user.email_confirmed);

        let mail = mailer.last().unwrap();
        assert_eq!(mail.to_email, "leo@example.com");
        assert_eq!(mail.language, "es");
        assert!(mail.subject.contains("Confirmación"));

        let (user_id, token) = sent_token(&mailer);
        assert_eq!(user_id, user.id);
        assert_eq!(
            confirm_email(&db, user.id, "wrong").await,
            Err(Error::InvalidToken)
        );
        confirm_email(&db, user.id, &token).await.unwrap();
        assert!(get_user(&db, "leo@example.com").await.unwrap().email_confirmed);
        assert_eq!(
            confirm_email(&db, user.id, &token).await,
            Err(Error::InvalidToken)
        );
        assert_eq!(
            confirm_email(&db, 999, &token).await,
            Err(Error::NotFound(Lookup::Get))
        );
    }

    #[tokio::test]
    async fn expired_token_is_rejected() {
        let db = testing::test_db().await;
        let mailer = RecordingMailer::default();
        let user = registered(&db, &mailer).await;
        let (_, token) = sent_token(&mailer);
        email_tokens::Entity::update_many()
            .col_expr(
                email_tokens::Column::ExpiresAt,
                testing::days_from_now(-1).into(),
            )
            .exec(&db)
            .await
            .unwrap();
        assert_eq!(
            confirm_email(&db, user.id, &token).await,
            Err(Error::InvalidToken)
        );

        resend_token(&db, &mailer, &testing::settings(), &user.email, "en")
            .await
            .unwrap();
        let (_, fresh) = sent_token(&mailer);
        assert_ne!(fresh, token);
        confirm_email(&db, user.id, &fresh).await.unwrap();
        assert_eq!(
            resend_token(&db, &mailer, &testing::settings(), "nobody@example.com", "en").await,
            Err(Error::NotFound(Lookup::Get))
        );
    }

    #[test]
    fn padded_email_passes_validation() {
        assert_eq!(registration(1, "  Leo@Example.com ").validate(), Ok(()));
        assert_eq!(login_dto("\tleo@example.com ", "secret1").validate(), Ok(()));
        assert!(login_dto("leo @example.com", "secret1").validate().is_err());
    }

    #[tokio::test]
    async fn register_rejects_bad_input() {
        let db = testing::test_db().await;
        let mailer = RecordingMailer::default();
        let photos = MemoryPhotoStore::default();
        let settings = testing::settings();
        let country = testing::country(&db, "Chile").await;

        let mut dto = registration(country.id, "a@example.com");
        dto.password_confirm = "other1".to_owned();
        dto.email = "not-an-email".to_owned();
        let Err(Error::ValidationFailed(v)) = register(&db, &photos, &mailer, &settings, &dto).await
        else {
            panic!("expected validation failure");
        };
        let fields: Vec<_> = v.iter().map(|v| v.field.as_str()).collect();
        assert_eq!(fields, ["email", "passwordConfirm"]);

        assert_eq!(
            register(&db, &photos, &mailer, &settings, &registration(77, "a@example.com")).await,
            Err(Error::InvalidReference(Reference::Country))
        );
        register(&db, &photos, &mailer, &settings, &registration(country.id, "a@example.com"))
            .await
            .unwrap();
        assert_eq!(
            register(&db, &photos, &mailer, &settings, &registration(country.id, "A@example.com"))
                .await,
            Err(Error::DuplicateEmail)
        );
        assert_eq!(user_count(&db).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn mail_failure_keeps_account() {
        let db = testing::test_db().await;
        let country = testing::country(&db, "Chile").await;
        assert!(matches!(
            register(
                &db,
                &MemoryPhotoStore::default(),
                &FailingMailer,
                &testing::settings(),
                &registration(country.id, "b@example.com"),
            )
            .await,
            Err(Error::MailFailed(_))
        ));
        assert_eq!(user_count(&db).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn login_outcomes() {
        let db = testing::test_db().await;
        let mailer = RecordingMailer::default();
        let settings = testing::settings();
        let user = registered(&db, &mailer).await;

        assert_eq!(
            login(&db, &settings, &login_dto("leo@example.com", "secret1")).await,
            Err(Error::NotAllowed)
        );
        let (_, token) = sent_token(&mailer);
        confirm_email(&db, user.id, &token).await.unwrap();

        assert_eq!(
            login(&db, &settings, &login_dto("ghost@example.com", "secret1")).await,
            Err(Error::InvalidCredentials)
        );
        let ok = login(&db, &settings, &login_dto(" LEO@example.com\t", "secret1"))
            .await
            .unwrap();
        let claims = auth::decode_token(&ok.token, &settings.auth).unwrap();
        assert_eq!(claims.sub, "leo@example.com");
        assert_eq!(claims.first_name, "Lionel");

        for _ in 1..settings.auth.max_failed_access_attempts {
            assert_eq!(
                login(&db, &settings, &login_dto("leo@example.com", "wrong1")).await,
                Err(Error::InvalidCredentials)
            );
        }
        assert_eq!(
            login(&db, &settings, &login_dto("leo@example.com", "wrong1")).await,
            Err(Error::LockedOut)
        );
        assert_eq!(
            login(&db, &settings, &login_dto("leo@example.com", "secret1")).await,
            Err(Error::LockedOut)
        );

        // Lockout expired: a good password succeeds and clears the state.
        users::Entity::update_many()
            .col_expr(
                users::Column::LockoutEnd,
                Some(testing::days_from_now(-1)).into(),
            )
            .exec(&db)
            .await
            .unwrap();
        login(&db, &settings, &login_dto("leo@example.com", "secret1"))
            .await
            .unwrap();
        let stored = users::Entity::find_by_id(user.id)
            .one(&db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.access_failed_count, 0);
        assert_eq!(stored.lockout_end, None);
    }

    #[tokio::test]
    async fn successful_login_resets_failures() {
        let db = testing::test_db().await;
        let mailer = RecordingMailer::default();
        let settings = testing::settings();
        let user = registered(&db, &mailer).await;
        let (_, token) = sent_token(&mailer);
        confirm_email(&db, user.id, &token).await.unwrap();
        for _ in 0..settings.auth.max_failed_access_attempts - 1 {
            login(&db, &settings, &login_dto("leo@example.com", "nope00"))
                .await
                .unwrap_err();
        }
        login(&db, &settings, &login_dto("leo@example.com", "secret1"))
            .await
            .unwrap();
        assert_eq!(
            login(&db, &settings, &login_dto("leo@example.com", "nope00")).await,
            Err(Error::InvalidCredentials)
        );
    }

    #[tokio::test]
    async fn profile_and_password() {
        let db = testing::test_db().await;
        let mailer = RecordingMailer::default();
        let settings = testing::settings();
        let user = registered(&db, &mailer).await;
        let uy = testing::country(&db, "Uruguay").await;
        let photos = MemoryPhotoStore::default();

        let dto = UpdateUserDto {
            first_name: "Luis".to_owned(),
            last_name: "Suárez".to_owned(),
            phone_number: Some("+598 1234".to_owned()),
            country_id: uy.id,
            photo: Some("aGVsbG8=".to_owned()),
        };
        let token = update_user(&db, &photos, &settings, &user.email, &dto)
            .await
            .unwrap();
        let claims = auth::decode_token(&token.token, &settings.auth).unwrap();
        assert_eq!(claims.first_name, "Luis");
        assert_eq!(claims.country_id, uy.id);
        assert!(claims.photo.starts_with("~/images/users/"));
        assert_eq!(
            update_user(
                &db,
                &photos,
                &settings,
                &user.email,
                &UpdateUserDto {
                    country_id: 999,
                    ..dto.clone()
                }
            )
            .await,
            Err(Error::InvalidReference(Reference::Country))
        );

        let change = |current: &str, new: &str| ChangePasswordDto {
            current_password: current.to_owned(),
            new_password: new.to_owned(),
            confirm: new.to_owned(),
        };
        assert_eq!(
            change_password(&db, &user.email, &change("wrong1", "newpass1")).await,
            Err(Error::InvalidCurrentPassword)
        );
        assert!(matches!(
            change_password(&db, &user.email, &change("secret1", "123")).await,
            Err(Error::ValidationFailed(_))
        ));
        change_password(&db, &user.email, &change("secret1", "newpass1"))
            .await
            .unwrap();
        let stored = users::Entity::find_by_id(user.id)
            .one(&db)
            .await
            .unwrap()
            .unwrap();
        assert!(auth::verify_password("newpass1", &stored.password_hash));
    }
}
