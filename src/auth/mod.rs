//! Accounts, passwords and bearer tokens.

use std::sync::Arc;

use actix_web::dev::Payload;
use actix_web::http::header::AUTHORIZATION;
use actix_web::{web, FromRequest, HttpRequest};
use chrono::{Duration, Utc};
use futures::future::{FutureExt, LocalBoxFuture};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, TransportError};
use crate::models::validation::{email, min_length, mobile, one_of, required};
use crate::models::{Account, Role, DEPARTMENTS};
use crate::storage::Storage;

const BCRYPT_COST: u32 = 10;
const MIN_PASSWORD_LENGTH: usize = 6;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

/// Signs and checks HS256 tokens.
pub struct TokenAuthority {
    encoding: EncodingKey,
    decoding: DecodingKey,
    expire_days: i64,
}

impl TokenAuthority {
    pub fn new(secret: &str, expire_days: i64) -> TokenAuthority {
        TokenAuthority {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            expire_days,
        }
    }

    pub fn issue(&self, account: &Account) -> Result<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: account.id.to_string(),
            role: account.role,
            iat: now.timestamp(),
            exp: (now + Duration::days(self.expire_days)).timestamp(),
        };
        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| TransportError::Internal(format!("token signing: {e}")))
    }

    pub fn verify(&self, token: &str) -> Result<Claims> {
        Ok(decode::<Claims>(token, &self.decoding, &Validation::default())?.claims)
    }
}

pub fn hash_password(password: &str) -> Result<String> {
    Ok(bcrypt::hash(password, BCRYPT_COST)?)
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    Ok(bcrypt::verify(password, hash)?)
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationForm {
    pub name: Option<String>,
    pub register_number: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub mobile: Option<String>,
    pub department: Option<String>,
    pub city: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
pub struct LoginForm {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct PasswordChange {
    pub current_password: Option<String>,
    pub new_password: Option<String>,
}

/// What register and login hand back to the client.
#[derive(Serialize, Debug)]
pub struct Session {
    pub token: String,
    pub user: Account,
}

fn not_authorized() -> TransportError {
    TransportError::Unauthorized(String::from("Not authorized to access this route"))
}

pub struct AuthService {
    storage: Arc<dyn Storage>,
    tokens: TokenAuthority,
}

impl AuthService {
    pub fn new(storage: Arc<dyn Storage>, tokens: TokenAuthority) -> AuthService {
        AuthService { storage, tokens }
    }

    /// Self-service sign up. Always creates a student.
    pub fn register(&self, form: RegistrationForm) -> Result<Session> {
        let name = required("name", form.name.as_deref())?;
        let register_number =
            required("registerNumber", form.register_number.as_deref())?.to_uppercase();
        let email = email("email", form.email.as_deref())?;
        let password = min_length("password", form.password.as_deref(), MIN_PASSWORD_LENGTH)?;
        let mobile = mobile("mobile", form.mobile.as_deref())?;
        let department = one_of("department", form.department.as_deref(), &DEPARTMENTS)?;
        let city = required("city", form.city.as_deref())?;

        if self.storage.find_account_by_email(&email)?.is_some()
            || self
                .storage
                .find_account_by_register_number(&register_number)?
                .is_some()
        {
            return Err(TransportError::Conflict(String::from("User already exists")));
        }

        let account = self.storage.insert_account(Account {
            id: Uuid::new_v4(),
            name,
            register_number,
            email,
            password_hash: hash_password(&password)?,
            mobile,
            department,
            city,
            role: Role::Student,
            is_active: true,
            created_at: Utc::now(),
            last_login: None,
        })?;
        info!("[Auth] registered {} ({})", account.register_number, account.id);

        Ok(Session {
            token: self.tokens.issue(&account)?,
            user: account,
        })
    }

    pub fn login(&self, form: LoginForm) -> Result<Session> {
        let email = email("email", form.email.as_deref())?;
        let password = required("password", form.password.as_deref())?;
        let invalid = || TransportError::Unauthorized(String::from("Invalid credentials"));

        let mut account = self
            .storage
            .find_account_by_email(&email)?
            .ok_or_else(invalid)?;
        if !verify_password(&password, &account.password_hash)? {
            warn!("[Auth] failed login for {}", email);
            return Err(invalid());
        }
        if !account.is_active {
            return Err(TransportError::Unauthorized(String::from(
                "Account is deactivated",
            )));
        }

        let now = Utc::now();
        self.storage.record_login(account.id, now)?;
        account.last_login = Some(now);

        Ok(Session {
            token: self.tokens.issue(&account)?,
            user: account,
        })
    }

    pub fn who_am_i(&self, id: Uuid) -> Result<Account> {
        self.storage
            .find_account(id)?
            .ok_or_else(|| TransportError::not_found("User"))
    }

    pub fn change_password(&self, id: Uuid, change: PasswordChange) -> Result<()> {
        let current = required("currentPassword", change.current_password.as_deref())?;
        let new_password = min_length(
            "newPassword",
            change.new_password.as_deref(),
            MIN_PASSWORD_LENGTH,
        )?;

        let account = self.who_am_i(id)?;
        if !verify_password(&current, &account.password_hash)? {
            return Err(TransportError::Unauthorized(String::from(
                "Current password is incorrect",
            )));
        }
        self.storage
            .update_password(id, &hash_password(&new_password)?)?;
        info!("[Auth] password changed for {}", id);
        Ok(())
    }

    /// Resolves a bearer token to a live, active account.
    pub fn authenticate(&self, token: &str) -> Result<Account> {
        let claims = self.tokens.verify(token)?;
        let id = Uuid::parse_str(&claims.sub).map_err(|_| not_authorized())?;
        match self.storage.find_account(id)? {
            Some(account) if account.is_active => Ok(account),
            _ => Err(not_authorized()),
        }
    }

    /// Creates the first administrator when nobody has an account yet.
    pub fn bootstrap_admin(&self, email_address: &str, password: &str) -> Result<Option<Account>> {
        if self.storage.has_accounts()? {
            return Ok(None);
        }

        let account = self.storage.insert_account(Account {
            id: Uuid::new_v4(),
            name: String::from("Administrator"),
            register_number: String::from("ADMIN"),
            email: email("ADMIN_EMAIL", Some(email_address))?,
            password_hash: hash_password(password)?,
            mobile: String::from("0000000000"),
            department: String::from("Transport Office"),
            city: String::from("Coimbatore"),
            role: Role::Administrator,
            is_active: true,
            created_at: Utc::now(),
            last_login: None,
        })?;
        info!("[Auth] bootstrapped administrator {}", account.email);
        Ok(Some(account))
    }
}

fn bearer_token(req: &HttpRequest) -> Option<String> {
    req.headers()
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
}

/// Any signed-in account.
pub struct AuthSession(pub Account);

impl FromRequest for AuthSession {
    type Error = TransportError;
    type Future = LocalBoxFuture<'static, Result<Self>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let auth = req.app_data::<web::Data<AuthService>>().cloned();
        let token = bearer_token(req);

        async move {
            let auth = auth.ok_or_else(|| {
                TransportError::Internal(String::from("auth service not registered"))
            })?;
            let token = token.ok_or_else(not_authorized)?;
            let account = web::block(move || auth.authenticate(&token)).await??;
            Ok(AuthSession(account))
        }
        .boxed_local()
    }
}

/// A signed-in administrator.
pub struct AdminSession(pub Account);

impl FromRequest for AdminSession {
    type Error = TransportError;
    type Future = LocalBoxFuture<'static, Result<Self>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let session = AuthSession::from_request(req, payload);

        async move {
            let AuthSession(account) = session.await?;
            if !account.is_admin() {
                return Err(TransportError::Forbidden(String::from(
                    "User role student is not authorized to access this route",
                )));
            }
            Ok(AdminSession(account))
        }
        .boxed_local()
    }
}
