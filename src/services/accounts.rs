use chrono::{DateTime, NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::{
    auth::{hash_password, verify_password, AuthError, AuthService, TokenPair},
    entities::{
        order::{self, OrderStatus},
        user::{self, UserRole},
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::{icontains, pricing},
};

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^[a-z0-9._%+-]+@(gmail|hotmail|umail)\.com$").unwrap_or_else(|_| unreachable!())
});

static PHONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:\+230|230|0)?5\d{7}$").unwrap_or_else(|_| unreachable!()));

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email.trim())
}

pub fn is_valid_phone(phone: &str) -> bool {
    PHONE_RE.is_match(phone.trim())
}

fn validate_email_domain(email: &str) -> Result<(), ValidationError> {
    if is_valid_email(email) {
        Ok(())
    } else {
        let mut err = ValidationError::new("email");
        err.message = Some("Use a gmail.com, hotmail.com or umail.com address".into());
        Err(err)
    }
}

fn validate_phone(phone: &str) -> Result<(), ValidationError> {
    if is_valid_phone(phone) {
        Ok(())
    } else {
        let mut err = ValidationError::new("phone");
        err.message = Some("Enter a mobile number such as 5XXXXXXX".into());
        Err(err)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 50, message = "First name is required"))]
    pub first_name: String,
    #[validate(length(min = 1, max = 50, message = "Last name is required"))]
    pub last_name: String,
    #[validate(custom = "validate_email_domain")]
    pub email: String,
    #[validate(custom = "validate_phone")]
    pub phone: String,
    #[validate(length(max = 300))]
    pub address: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "Email is required"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate, ToSchema)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 50))]
    pub first_name: Option<String>,
    #[validate(length(min = 1, max = 50))]
    pub last_name: Option<String>,
    #[validate(custom = "validate_email_domain")]
    pub email: Option<String>,
    #[validate(custom = "validate_phone")]
    pub phone: Option<String>,
}

/// Account data safe to return to clients.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub address: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
}

impl From<user::Model> for UserProfile {
    fn from(u: user::Model) -> Self {
        Self {
            id: u.id,
            email: u.email,
            first_name: u.first_name,
            last_name: u.last_name,
            phone: u.phone,
            address: u.address,
            date_of_birth: u.date_of_birth,
            role: u.role,
            created_at: u.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    pub user: UserProfile,
    pub tokens: TokenPair,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub enum CustomerTier {
    #[serde(rename = "VIP")]
    Vip,
    Active,
    Regular,
}

/// VIP from ten completed orders, Active from one, Regular otherwise.
pub fn customer_tier(completed_orders: u64) -> CustomerTier {
    match completed_orders {
        n if n >= 10 => CustomerTier::Vip,
        0 => CustomerTier::Regular,
        _ => CustomerTier::Active,
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AccountRow {
    pub user: UserProfile,
    pub completed_orders: u64,
    #[serde(serialize_with = "crate::entities::money::serialize")]
    pub total_spent: Decimal,
    pub tier: CustomerTier,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RoleChange {
    MakeAdmin,
    MakeStaff,
    RemoveAccess,
}

impl RoleChange {
    pub fn target(self) -> UserRole {
        match self {
            RoleChange::MakeAdmin => UserRole::Admin,
            RoleChange::MakeStaff => UserRole::Staff,
            RoleChange::RemoveAccess => UserRole::Customer,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct RoleChangeRequest {
    pub action: RoleChange,
}

fn role_rank(role: UserRole) -> u8 {
    match role {
        UserRole::Customer => 0,
        UserRole::Staff => 1,
        UserRole::Admin => 2,
    }
}

#[derive(Clone)]
pub struct AccountService {
    db: Arc<DatabaseConnection>,
    auth: Arc<AuthService>,
    event_sender: Arc<EventSender>,
}

impl AccountService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        auth: Arc<AuthService>,
        event_sender: Arc<EventSender>,
    ) -> Self {
        Self {
            db,
            auth,
            event_sender,
        }
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<user::Model>, ServiceError> {
        Ok(user::Entity::find()
            .filter(user::Column::Email.eq(email.trim().to_lowercase()))
            .one(&*self.db)
            .await?)
    }

    pub async fn get(&self, id: Uuid) -> Result<user::Model, ServiceError> {
        user::Entity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("User {} not found", id)))
    }

    /// Creates a customer account
    #[instrument(skip(self, request))]
    pub async fn register(&self, request: RegisterRequest) -> Result<UserProfile, ServiceError> {
        request.validate()?;
        let email = request.email.trim().to_lowercase();
        if self.find_by_email(&email).await?.is_some() {
            warn!("Registration with an existing email");
            return Err(ServiceError::Conflict(
                "An account with this email already exists".into(),
            ));
        }

        let password_hash = hash_password(&request.password)?;
        let created = user::ActiveModel {
            email: Set(email),
            password_hash: Set(password_hash),
            first_name: Set(request.first_name.trim().to_string()),
            last_name: Set(request.last_name.trim().to_string()),
            phone: Set(request.phone.trim().to_string()),
            address: Set(request
                .address
                .map(|a| a.trim().to_string())
                .filter(|a| !a.is_empty())),
            date_of_birth: Set(request.date_of_birth),
            role: Set(UserRole::Customer),
            is_active: Set(true),
            ..Default::default()
        }
        .insert(&*self.db)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to create account");
            ServiceError::DatabaseError(e)
        })?;

        info!(user_id = %created.id, "Account registered");
        self.event_sender
            .send_or_log(Event::UserRegistered(created.id))
            .await;
        Ok(created.into())
    }

    /// Verifies credentials and issues a token pair.
    #[instrument(skip(self, request))]
    pub async fn login(&self, request: LoginRequest) -> Result<LoginResponse, ServiceError> {
        request.validate()?;
        let account = match self.find_by_email(&request.email).await? {
            Some(account) if verify_password(&request.password, &account.password_hash) => account,
            _ => {
                warn!("Failed login attempt");
                return Err(AuthError::InvalidCredentials.into());
            }
        };
        if !account.is_active {
            warn!(user_id = %account.id, "Login on a deactivated account");
            return Err(ServiceError::Forbidden("This account has been deactivated".into()));
        }

        let tokens = self.auth.generate_token(&account)?;
        info!(user_id = %account.id, role = %account.role, "User logged in");
        Ok(LoginResponse {
            user: account.into(),
            tokens,
        })
    }

    pub async fn profile(&self, id: Uuid) -> Result<UserProfile, ServiceError> {
        Ok(self.get(id).await?.into())
    }

    #[instrument(skip(self, request))]
    pub async fn update_profile(
        &self,
        id: Uuid,
        request: UpdateProfileRequest,
    ) -> Result<UserProfile, ServiceError> {
        request.validate()?;
        let current = self.get(id).await?;

        if let Some(email) = request.email.as_deref() {
            let email = email.trim().to_lowercase();
            if email != current.email {
                if let Some(other) = self.find_by_email(&email).await? {
                    if other.id != id {
                        return Err(ServiceError::Conflict(
                            "An account with this email already exists".into(),
                        ));
                    }
                }
            }
        }

        let mut active: user::ActiveModel = current.into();
        if let Some(first_name) = request.first_name {
            active.first_name = Set(first_name.trim().to_string());
        }
        if let Some(last_name) = request.last_name {
            active.last_name = Set(last_name.trim().to_string());
        }
        if let Some(email) = request.email {
            active.email = Set(email.trim().to_lowercase());
        }
        if let Some(phone) = request.phone {
            active.phone = Set(phone.trim().to_string());
        }
        let updated = active.update(&*self.db).await?;
        info!(user_id = %id, "Profile updated");
        Ok(updated.into())
    }

    /// Completed-order count and spend per user.
    async fn completed_totals(
        &self,
        user_ids: Vec<Uuid>,
    ) -> Result<HashMap<Uuid, (u64, Decimal)>, ServiceError> {
        let mut totals: HashMap<Uuid, (u64, Decimal)> = HashMap::new();
        if user_ids.is_empty() {
            return Ok(totals);
        }
        let rows: Vec<(Option<Uuid>, Decimal)> = order::Entity::find()
            .select_only()
            .column(order::Column::UserId)
            .column(order::Column::Total)
            .filter(order::Column::Status.eq(OrderStatus::Completed))
            .filter(order::Column::UserId.is_in(user_ids))
            .into_tuple()
            .all(&*self.db)
            .await?;
        for (user_id, total) in rows {
            if let Some(user_id) = user_id {
                let entry = totals.entry(user_id).or_insert((0, Decimal::ZERO));
                entry.0 += 1;
                entry.1 += total;
            }
        }
        Ok(totals)
    }

    async fn rows(&self, users: Vec<user::Model>) -> Result<Vec<AccountRow>, ServiceError> {
        let totals = self
            .completed_totals(users.iter().map(|u| u.id).collect())
            .await?;
        Ok(users
            .into_iter()
            .map(|u| {
                let (completed_orders, spent) =
                    totals.get(&u.id).copied().unwrap_or((0, Decimal::ZERO));
                AccountRow {
                    user: u.into(),
                    completed_orders,
                    total_spent: pricing::round_money(spent),
                    tier: customer_tier(completed_orders),
                }
            })
            .collect())
    }

    /// Accounts filtered by role and a name/email search.
    pub async fn list_accounts(
        &self,
        roles: &[UserRole],
        search: Option<&str>,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<AccountRow>, u64), ServiceError> {
        let mut query = user::Entity::find();
        if !roles.is_empty() {
            query = query.filter(user::Column::Role.is_in(roles.to_vec()));
        }
        if let Some(q) = search.map(str::trim).filter(|q| !q.is_empty()) {
            query = query.filter(
                Condition::any()
                    .add(icontains(user::Column::FirstName, q))
                    .add(icontains(user::Column::LastName, q))
                    .add(icontains(user::Column::Email, q)),
            );
        }
        let paginator = query
            .order_by_desc(user::Column::CreatedAt)
            .order_by_asc(user::Column::Email)
            .paginate(&*self.db, per_page.max(1));
        let total = paginator.num_items().await?;
        let users = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((self.rows(users).await?, total))
    }

    /// Applies a role change. Admins cannot lower their own role.
    #[instrument(skip(self))]
    pub async fn change_role(
        &self,
        actor_id: Uuid,
        target_id: Uuid,
        change: RoleChange,
    ) -> Result<UserProfile, ServiceError> {
        let target = self.get(target_id).await?;
        let new_role = change.target();

        if actor_id == target_id && role_rank(new_role) < role_rank(target.role) {
            warn!(user_id = %actor_id, "Admin attempted to demote themselves");
            return Err(ServiceError::Forbidden(
                "You cannot remove your own admin rights".into(),
            ));
        }
        if target.role == new_role {
            return Ok(target.into());
        }

        let old_role = target.role;
        let mut active: user::ActiveModel = target.into();
        active.role = Set(new_role);
        let updated = active.update(&*self.db).await?;
        info!(user_id = %target_id, from = %old_role, to = %new_role, "Account role changed");
        Ok(updated.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_domains() {
        assert!(is_valid_email("Ana.Lee@Gmail.com"));
        assert!(is_valid_email("dev+test@umail.com"));
        assert!(!is_valid_email("ana@yahoo.com"));
        assert!(!is_valid_email("ana@gmail.co"));
    }

    #[test]
    fn phone_numbers() {
        assert!(is_valid_phone("57123456"));
        assert!(is_valid_phone("+23057123456"));
        assert!(is_valid_phone("23057123456"));
        assert!(is_valid_phone("057123456"));
        assert!(!is_valid_phone("47123456"));
        assert!(!is_valid_phone("5712345"));
    }

    #[test]
    fn tiers() {
        assert_eq!(customer_tier(0), CustomerTier::Regular);
        assert_eq!(customer_tier(1), CustomerTier::Active);
        assert_eq!(customer_tier(9), CustomerTier::Active);
        assert_eq!(customer_tier(10), CustomerTier::Vip);
    }

    #[test]
    fn registration_rules() {
        let request = RegisterRequest {
            first_name: "Ana".into(),
            last_name: "Lee".into(),
            email: "ana@yahoo.com".into(),
            phone: "123".into(),
            address: None,
            date_of_birth: None,
            password: "short".into(),
        };
        let errors = request.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("phone"));
        assert!(fields.contains_key("password"));
    }

    #[test]
    fn role_changes() {
        assert_eq!(RoleChange::RemoveAccess.target(), UserRole::Customer);
        assert_eq!(
            serde_json::from_str::<RoleChange>("\"make_admin\"").unwrap(),
            RoleChange::MakeAdmin
        );
        assert!(role_rank(UserRole::Admin) > role_rank(UserRole::Staff));
    }
}
