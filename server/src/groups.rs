use std::collections::HashMap;

use rand::Rng;
use sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, RelationTrait, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};

use fantasy_db::{groups, tournaments, user_groups, users};

use crate::error::{db_err, is_unique_violation, write_err, Error, Lookup, Reference};
use crate::pagination::Pagination;
use crate::photo_store::{upload_base64, PhotoStore};
use crate::predictions;
use crate::validation::{Rule, Validate};

pub const PHOTO_CATEGORY: &str = "groups";
pub const CODE_LENGTH: usize = 6;
pub const MAX_CODE_ATTEMPTS: usize = 16;
const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

pub fn random_code() -> String {
    let mut rng = rand::thread_rng();
    (0..CODE_LENGTH)
        .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}

pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberView {
    pub user_id: i64,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub photo: String,
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TournamentRef {
    pub id: i64,
    pub name: String,
    pub image: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupView {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub remarks: Option<String>,
    pub image: String,
    pub is_active: bool,
    pub admin_id: i64,
    pub tournament: TournamentRef,
    pub members: Vec<MemberView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupSummary {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub remarks: Option<String>,
    pub image: String,
    pub is_active: bool,
    pub admin_id: i64,
    pub tournament_id: i64,
    pub tournament_name: String,
    pub members_number: u64,
}

/// Input for group creation; the admin is the authenticated caller.
#[derive(Debug, Clone)]
pub struct NewGroup {
    pub admin_id: i64,
    pub tournament_id: i64,
    pub name: String,
    pub remarks: Option<String>,
    pub image: Option<String>,
}

impl Validate for NewGroup {
    fn rules(&self) -> Vec<(&'static str, Rule<'_>)> {
        vec![
            ("name", Rule::Required(&self.name)),
            ("name", Rule::MaxLength(&self.name, 100)),
            ("tournamentId", Rule::Positive(self.tournament_id)),
        ]
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupDto {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub tournament_id: i64,
    pub name: String,
    #[serde(default)]
    pub remarks: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub image: Option<String>,
}

fn default_active() -> bool {
    true
}

impl Validate for GroupDto {
    fn rules(&self) -> Vec<(&'static str, Rule<'_>)> {
        vec![
            ("name", Rule::Required(&self.name)),
            ("name", Rule::MaxLength(&self.name, 100)),
        ]
    }
}

impl GroupDto {
    pub fn into_new_group(self, admin_id: i64) -> NewGroup {
        NewGroup {
            admin_id,
            tournament_id: self.tournament_id,
            name: self.name,
            remarks: self.remarks,
            image: self.image,
        }
    }
}

pub async fn create_group<C: ConnectionTrait + TransactionTrait>(
    db: &C,
    photos: &dyn PhotoStore,
    new: &NewGroup,
) -> Result<GroupView, Error> {
    create_group_with_codes(db, photos, new, random_code).await
}

/// Creates a group under a fresh join code drawn from `next_code`, with the
/// admin as its first active member, then back-fills predictions.
pub async fn create_group_with_codes<C: ConnectionTrait + TransactionTrait>(
    db: &C,
    photos: &dyn PhotoStore,
    new: &NewGroup,
    mut next_code: impl FnMut() -> String,
) -> Result<GroupView, Error> {
    new.validate()?;
    users::Entity::find_by_id(new.admin_id)
        .one(db)
        .await
        .map_err(db_err("Failed to fetch group admin"))?
        .ok_or(Error::InvalidReference(Reference::Admin))?;
    tournaments::Entity::find_by_id(new.tournament_id)
        .one(db)
        .await
        .map_err(db_err("Failed to fetch tournament"))?
        .ok_or(Error::InvalidReference(Reference::Tournament))?;
    let image = upload_base64(photos, new.image.as_deref(), PHOTO_CATEGORY).await;

    let mut group = None;
    for attempt in 0..MAX_CODE_ATTEMPTS {
        let code = normalize_code(&next_code());
        let taken = groups::Entity::find()
            .filter(groups::Column::Code.eq(code.as_str()))
            .count(db)
            .await
            .map_err(db_err("Failed to check group code"))?
            > 0;
        if taken {
            log::debug!("Group code {code} taken (attempt {attempt})");
            continue;
        }
        let row = groups::ActiveModel {
            code: Set(code.clone()),
            name: Set(new.name.trim().to_owned()),
            remarks: Set(new.remarks.clone()),
            image: Set(image.clone()),
            is_active: Set(true),
            admin_id: Set(new.admin_id),
            tournament_id: Set(new.tournament_id),
            ..Default::default()
        };
        let admin_id = new.admin_id;
        // Ok(None): the code was claimed between the check and the insert.
        let inserted = db
            .transaction::<_, Option<groups::Model>, Error>(|txn| {
                Box::pin(async move {
                    let group = match row.insert(txn).await {
                        Ok(g) => g,
                        Err(e) if is_unique_violation(&e) => return Ok(None),
                        Err(e) => {
                            log::error!("Failed to insert group: {e}");
                            return Err(Error::Db(e));
                        }
                    };
                    user_groups::ActiveModel {
                        group_id: Set(group.id),
                        user_id: Set(admin_id),
                        is_active: Set(true),
                    }
                    .insert(txn)
                    .await
                    .map_err(write_err("Failed to add group admin", Error::Conflict))?;
                    Ok(Some(group))
                })
            })
            .await?;
        if let Some(g) = inserted {
            group = Some(g);
            break;
        }
        log::info!("Group code {code} collided on insert (attempt {attempt})");
    }
    let Some(group) = group else {
        log::error!("No free group code after {MAX_CODE_ATTEMPTS} attempts");
        return Err(Error::CodeExhausted);
    };
    log::info!(
        "Created group {} ({}) with code {}",
        group.name,
        group.id,
        group.code
    );
    predictions::reconcile(db, group.id).await?;
    get_group(db, group.id).await
}

/// Overwrites name, remarks and the active flag; the image only when given.
pub async fn update_group<C: ConnectionTrait>(
    db: &C,
    photos: &dyn PhotoStore,
    dto: &GroupDto,
) -> Result<GroupView, Error> {
    dto.validate()?;
    let existing = groups::Entity::find_by_id(dto.id)
        .one(db)
        .await
        .map_err(db_err("Failed to fetch group"))?
        .ok_or(Error::NotFound(Lookup::GroupUpdate))?;
    let mut update: groups::ActiveModel = existing.into();
    update.name = Set(dto.name.trim().to_owned());
    update.remarks = Set(dto.remarks.clone());
    update.is_active = Set(dto.is_active);
    if dto.image.is_some() {
        update.image = Set(upload_base64(photos, dto.image.as_deref(), PHOTO_CATEGORY).await);
    }
    let group = update
        .update(db)
        .await
        .map_err(write_err("Failed to update group", Error::Conflict))?;
    get_group(db, group.id).await
}

/// Adds `user_id` as an active member; joining twice is a no-op.
pub async fn join_group<C: ConnectionTrait>(
    db: &C,
    code: &str,
    user_id: i64,
) -> Result<GroupView, Error> {
    let group = find_by_code(db, code).await?;
    users::Entity::find_by_id(user_id)
        .one(db)
        .await
        .map_err(db_err("Failed to fetch user"))?
        .ok_or(Error::InvalidReference(Reference::User))?;
    let added = user_groups::Entity::insert(user_groups::ActiveModel {
        group_id: Set(group.id),
        user_id: Set(user_id),
        is_active: Set(true),
    })
    .on_conflict(
        OnConflict::columns([user_groups::Column::GroupId, user_groups::Column::UserId])
            .do_nothing()
            .to_owned(),
    )
    .exec_without_returning(db)
    .await
    .map_err(db_err("Failed to join group"))?;
    if added > 0 {
        log::info!("User {user_id} joined group {}", group.id);
    }
    predictions::reconcile(db, group.id).await?;
    get_group(db, group.id).await
}

/// Lets the group admin deactivate or reactivate a member.
pub async fn set_member_active<C: ConnectionTrait>(
    db: &C,
    group_id: i64,
    caller_id: i64,
    user_id: i64,
    is_active: bool,
) -> Result<GroupView, Error> {
    let group = groups::Entity::find_by_id(group_id)
        .one(db)
        .await
        .map_err(db_err("Failed to fetch group"))?
        .ok_or(Error::NotFound(Lookup::Get))?;
    if group.admin_id != caller_id {
        return Err(Error::NotAllowed);
    }
    let membership = user_groups::Entity::find_by_id((group_id, user_id))
        .one(db)
        .await
        .map_err(db_err("Failed to fetch membership"))?
        .ok_or(Error::NotFound(Lookup::Update))?;
    let mut update: user_groups::ActiveModel = membership.into();
    update.is_active = Set(is_active);
    update
        .update(db)
        .await
        .map_err(db_err("Failed to update membership"))?;
    if is_active {
        predictions::reconcile(db, group_id).await?;
    }
    get_group(db, group_id).await
}

async fn find_by_code<C: ConnectionTrait>(db: &C, code: &str) -> Result<groups::Model, Error> {
    groups::Entity::find()
        .filter(groups::Column::Code.eq(normalize_code(code)))
        .one(db)
        .await
        .map_err(db_err("Failed to fetch group by code"))?
        .ok_or(Error::NotFound(Lookup::Get))
}

pub async fn get_group<C: ConnectionTrait>(db: &C, id: i64) -> Result<GroupView, Error> {
    let (group, tournament) = groups::Entity::find_by_id(id)
        .find_also_related(tournaments::Entity)
        .one(db)
        .await
        .map_err(db_err("Failed to fetch group"))?
        .ok_or(Error::NotFound(Lookup::Get))?;
    let tournament = tournament.ok_or_else(|| {
        log::error!("Group {id} has no tournament");
        Error::Internal(format!("group {id} has no tournament"))
    })?;
    let members = user_groups::Entity::find()
        .filter(user_groups::Column::GroupId.eq(id))
        .find_also_related(users::Entity)
        .order_by_asc(user_groups::Column::UserId)
        .all(db)
        .await
        .map_err(db_err("Failed to fetch group members"))?
        .into_iter()
        .filter_map(|(m, u)| {
            u.map(|u| MemberView {
                user_id: u.id,
                email: u.email,
                first_name: u.first_name,
                last_name: u.last_name,
                photo: u.photo,
                is_active: m.is_active,
            })
        })
        .collect();
    Ok(GroupView {
        id: group.id,
        code: group.code,
        name: group.name,
        remarks: group.remarks,
        image: group.image,
        is_active: group.is_active,
        admin_id: group.admin_id,
        tournament: TournamentRef {
            id: tournament.id,
            name: tournament.name,
            image: tournament.image,
        },
        members,
    })
}

pub async fn get_group_by_code<C: ConnectionTrait>(
    db: &C,
    code: &str,
) -> Result<GroupView, Error> {
    let group = find_by_code(db, code).await?;
    get_group(db, group.id).await
}

async fn summaries<C: ConnectionTrait>(
    db: &C,
    rows: Vec<(groups::Model, Option<tournaments::Model>)>,
) -> Result<Vec<GroupSummary>, Error> {
    let ids: Vec<i64> = rows.iter().map(|(g, _)| g.id).collect();
    let counts: HashMap<i64, i64> = user_groups::Entity::find()
        .select_only()
        .column(user_groups::Column::GroupId)
        .column_as(user_groups::Column::UserId.count(), "n")
        .filter(user_groups::Column::GroupId.is_in(ids))
        .filter(user_groups::Column::IsActive.eq(true))
        .group_by(user_groups::Column::GroupId)
        .into_tuple::<(i64, i64)>()
        .all(db)
        .await
        .map_err(db_err("Failed to count group members"))?
        .into_iter()
        .collect();
    Ok(rows
        .into_iter()
        .map(|(g, t)| GroupSummary {
            members_number: counts.get(&g.id).copied().unwrap_or_default() as u64,
            tournament_name: t.map(|t| t.name).unwrap_or_default(),
            id: g.id,
            code: g.code,
            name: g.name,
            remarks: g.remarks,
            image: g.image,
            is_active: g.is_active,
            admin_id: g.admin_id,
            tournament_id: g.tournament_id,
        })
        .collect())
}

fn for_user(user_id: i64, p: &Pagination) -> sea_orm::Select<groups::Entity> {
    let mut q = groups::Entity::find()
        .join(
            sea_orm::JoinType::InnerJoin,
            groups::Relation::UserGroups.def(),
        )
        .filter(user_groups::Column::UserId.eq(user_id));
    if let Some(f) = p.name_filter((groups::Entity, groups::Column::SearchName)) {
        q = q.filter(f);
    }
    q
}

async fn user_id_by_email<C: ConnectionTrait>(db: &C, email: &str) -> Result<Option<i64>, Error> {
    users::Entity::find()
        .select_only()
        .column(users::Column::Id)
        .filter(users::Column::Email.eq(email.trim().to_lowercase()))
        .into_tuple()
        .one(db)
        .await
        .map_err(db_err("Failed to fetch user"))
}

/// Groups the user belongs to, ordered by name.
pub async fn list_groups_for_user<C: ConnectionTrait>(
    db: &C,
    email: &str,
    p: &Pagination,
) -> Result<Vec<GroupSummary>, Error> {
    let Some(user_id) = user_id_by_email(db, email).await? else {
        return Ok(vec![]);
    };
    let rows = for_user(user_id, p)
        .find_also_related(tournaments::Entity)
        .order_by_asc(groups::Column::Name)
        .offset(p.offset())
        .limit(p.limit())
        .all(db)
        .await
        .map_err(db_err("Failed to list groups"))?;
    summaries(db, rows).await
}

pub async fn total_groups_for_user<C: ConnectionTrait>(
    db: &C,
    email: &str,
    p: &Pagination,
) -> Result<u64, Error> {
    let Some(user_id) = user_id_by_email(db, email).await? else {
        return Ok(0);
    };
    for_user(user_id, p)
        .count(db)
        .await
        .map_err(db_err("Failed to count groups"))
}

/// All active groups ordered by name.
pub async fn active_groups<C: ConnectionTrait>(db: &C) -> Result<Vec<GroupSummary>, Error> {
    let rows = groups::Entity::find()
        .filter(groups::Column::IsActive.eq(true))
        .find_also_related(tournaments::Entity)
        .order_by_asc(groups::Column::Name)
        .all(db)
        .await
        .map_err(db_err("Failed to list active groups"))?;
    summaries(db, rows).await
}
