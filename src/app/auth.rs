use anyhow::{anyhow, Result};
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use pasetors::claims::{Claims, ClaimsValidationRules};
use pasetors::keys::SymmetricKey;
use pasetors::token::UntrustedToken;
use pasetors::{local, version4::V4, Local};
use uuid::Uuid;

use crate::app::error::{ServiceError, ServiceResult};
use crate::app::forms::{FormErrors, LoginForm, SignupForm, NON_FIELD};
use crate::domain::repo::Repositories;
use crate::domain::user::{NewUser, User};

const TOKEN_PARTY: &str = "yatube";
const SESSION_TOKEN: &str = "session";

const BAD_CREDENTIALS: &str =
    "Please enter a correct username and password. Note that both fields may be case-sensitive.";

/// Accounts, passwords and the session tokens carried in the session cookie.
#[derive(Clone)]
pub struct AuthService {
    repos: Repositories,
    session_key: [u8; 32],
    session_ttl_hours: u64,
}

impl AuthService {
    pub fn new(repos: Repositories, session_key: [u8; 32], session_ttl_hours: u64) -> Self {
        Self {
            repos,
            session_key,
            session_ttl_hours,
        }
    }

    /// Registers an account. The caller is not logged in as a side effect.
    pub async fn signup(&self, form: SignupForm) -> ServiceResult<User> {
        let mut errors = form.check();
        let username = form.username.trim().to_string();

        if !errors.has("username") && self.repos.users.get_by_username(&username).await?.is_some()
        {
            errors.add("username", "A user with that username already exists.");
        }
        if !errors.is_empty() {
            return Err(ServiceError::Validation(errors));
        }

        let password_hash = hash_password(&form.password1)?;
        let user = self
            .repos
            .users
            .create(NewUser {
                username,
                first_name: form.first_name.trim().to_string(),
                last_name: form.last_name.trim().to_string(),
                email: form.email.trim().to_string(),
                password_hash,
            })
            .await?
            // lost a race with a concurrent signup
            .ok_or_else(|| {
                ServiceError::Validation(FormErrors::single(
                    "username",
                    "A user with that username already exists.",
                ))
            })?;

        tracing::info!(user_id = %user.id, username = %user.username, "user signed up");
        Ok(user)
    }

    pub async fn login(&self, form: &LoginForm) -> ServiceResult<User> {
        let errors = form.check();
        if !errors.is_empty() {
            return Err(ServiceError::Validation(errors));
        }

        let credentials = self.repos.users.credentials(form.username.trim()).await?;
        let (user, password_hash) = match credentials {
            Some(found) => found,
            None => {
                return Err(ServiceError::Validation(FormErrors::single(
                    NON_FIELD,
                    BAD_CREDENTIALS,
                )))
            }
        };
        if password_hash.is_empty() || !verify_password(&form.password, &password_hash)? {
            tracing::debug!(username = %user.username, "rejected login");
            return Err(ServiceError::Validation(FormErrors::single(
                NON_FIELD,
                BAD_CREDENTIALS,
            )));
        }

        tracing::info!(user_id = %user.id, "user logged in");
        Ok(user)
    }

    pub fn issue_session(&self, user_id: Uuid) -> Result<String> {
        let duration = std::time::Duration::from_secs(self.session_ttl_hours * 60 * 60);
        let mut claims = Claims::new_expires_in(&duration)?;
        claims.issuer(TOKEN_PARTY)?;
        claims.audience(TOKEN_PARTY)?;
        claims.subject(&user_id.to_string())?;
        claims.add_additional("typ", SESSION_TOKEN)?;

        let key = SymmetricKey::<V4>::from(&self.session_key)?;
        Ok(local::encrypt(&key, &claims, None, None)?)
    }

    /// The user a session token belongs to. Tampered, expired or foreign
    /// tokens and deleted accounts all yield `None`.
    pub async fn authenticate(&self, token: &str) -> Result<Option<User>> {
        let claims = match self.decrypt_claims(token)? {
            Some(claims) => claims,
            None => return Ok(None),
        };
        if !has_token_type(&claims, SESSION_TOKEN) {
            return Ok(None);
        }
        let user_id = match claim_uuid(&claims, "sub") {
            Ok(user_id) => user_id,
            Err(_) => return Ok(None),
        };
        self.repos.users.get(user_id).await
    }

    fn decrypt_claims(&self, token: &str) -> Result<Option<Claims>> {
        let key = SymmetricKey::<V4>::from(&self.session_key)?;
        let mut rules = ClaimsValidationRules::new();
        rules.validate_issuer_with(TOKEN_PARTY);
        rules.validate_audience_with(TOKEN_PARTY);

        let untrusted = match UntrustedToken::<Local, V4>::try_from(token) {
            Ok(token) => token,
            Err(_) => return Ok(None),
        };
        let trusted = match local::decrypt(&key, &untrusted, &rules, None, None) {
            Ok(token) => token,
            Err(_) => return Ok(None),
        };
        Ok(trusted.payload_claims().cloned())
    }
}

pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut argon2::password_hash::rand_core::OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|err| anyhow!("failed to hash password: {}", err))?;
    Ok(hash.to_string())
}

fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed = PasswordHash::new(hash)
        .map_err(|err| anyhow!("failed to parse password hash: {}", err))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

fn claim_uuid(claims: &Claims, name: &str) -> Result<Uuid> {
    let value = claims
        .get_claim(name)
        .and_then(|value| value.as_str())
        .ok_or_else(|| anyhow!("missing {} claim", name))?;
    Ok(Uuid::parse_str(value)?)
}

fn has_token_type(claims: &Claims, expected: &str) -> bool {
    claims
        .get_claim("typ")
        .and_then(|value| value.as_str())
        .map(|value| value == expected)
        .unwrap_or(false)
}
