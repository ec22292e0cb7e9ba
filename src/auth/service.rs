//! Account operations: registration, login, profile, address book and
//! password reset

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::auth::password::{hash_password, verify_password};
use crate::auth::{CurrentUser, JwtService};
use crate::db::DbService;
use crate::db::models::{Address, Role, User, sqlite_timestamp};
use crate::utils::{AppError, AppResult};

/// Reset tokens are consumable for one hour
const RESET_TOKEN_TTL_MINUTES: i64 = 60;

#[derive(Clone, Debug)]
pub struct AuthService {
    db: DbService,
    jwt: Arc<JwtService>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterInput {
    #[validate(length(min = 2, message = "Nome deve ter pelo menos 2 caracteres"))]
    pub name: String,
    #[validate(email(message = "E-mail inválido"))]
    pub email: String,
    #[validate(length(min = 6, message = "Senha deve ter pelo menos 6 caracteres"))]
    pub password: String,
    pub role: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginInput {
    #[validate(email(message = "E-mail inválido"))]
    pub email: String,
    #[validate(length(min = 1, message = "Senha é obrigatória"))]
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AddressInput {
    #[validate(custom(function = "validate_cep"))]
    pub cep: String,
    #[validate(length(min = 1, message = "Rua é obrigatória"))]
    pub street: String,
    #[validate(length(min = 1, message = "Número é obrigatório"))]
    pub number: String,
    pub complement: Option<String>,
    #[serde(rename = "type", default = "default_address_type")]
    pub kind: String,
}

fn default_address_type() -> String {
    "Residencial".to_string()
}

/// Brazilian postal code: 8 digits, optional dash (01310-100 or 01310100)
fn validate_cep(cep: &str) -> Result<(), validator::ValidationError> {
    let digits = cep.bytes().filter(u8::is_ascii_digit).count();
    let separators_ok = cep.bytes().all(|b| b.is_ascii_digit() || b == b'-');
    if digits == 8 && separators_ok {
        Ok(())
    } else {
        Err(validator::ValidationError::new("cep").with_message("CEP inválido".into()))
    }
}

/// User as exposed over the API, without the password hash
#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserProfile,
}

fn validated<T: Validate>(input: &T) -> AppResult<()> {
    input
        .validate()
        .map_err(|e| AppError::validation(e.to_string()))
}

impl AuthService {
    pub fn new(db: DbService, jwt: Arc<JwtService>) -> Self {
        Self { db, jwt }
    }

    /// Register a new account. Role defaults to Cliente.
    pub async fn register(&self, input: RegisterInput) -> AppResult<LoginResponse> {
        validated(&input)?;

        let role = match input.role.as_deref() {
            None | Some("") => Role::Cliente,
            Some(raw) => Role::parse(raw).ok_or_else(|| {
                AppError::validation("Papel deve ser Cliente, Vendedor ou Admin")
            })?,
        };

        let email = input.email.trim().to_lowercase();
        let existing: Option<i64> = sqlx::query_scalar("SELECT id FROM users WHERE email = ?")
            .bind(&email)
            .fetch_optional(self.db.read())
            .await?;
        if existing.is_some() {
            return Err(AppError::Conflict("E-mail já cadastrado".to_string()));
        }

        let password_hash = hash_password(&input.password)?;
        let user_id = sqlx::query(
            "INSERT INTO users (name, email, password_hash, role) VALUES (?, ?, ?, ?)",
        )
        .bind(input.name.trim())
        .bind(&email)
        .bind(&password_hash)
        .bind(role.as_str())
        .execute(self.db.write())
        .await
        .map_err(|e| match &e {
            // Racing registration with the same email
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                AppError::Conflict("E-mail já cadastrado".to_string())
            }
            _ => e.into(),
        })?
        .last_insert_rowid();

        let user = self.fetch_user(user_id).await?;
        let token = self
            .jwt
            .generate_token(&user)
            .map_err(|e| AppError::internal(e.to_string()))?;

        tracing::info!(user_id, role = role.as_str(), "User registered");

        Ok(LoginResponse {
            token,
            user: user.into(),
        })
    }

    pub async fn login(&self, input: LoginInput) -> AppResult<LoginResponse> {
        validated(&input)?;

        let email = input.email.trim().to_lowercase();
        let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE email = ?")
            .bind(&email)
            .fetch_optional(self.db.read())
            .await?;
        // Same error for unknown email and wrong password
        let user = user.ok_or(AppError::InvalidCredentials)?;
        if !user.is_active || !verify_password(&input.password, &user.password_hash) {
            return Err(AppError::InvalidCredentials);
        }

        let token = self
            .jwt
            .generate_token(&user)
            .map_err(|e| AppError::internal(e.to_string()))?;

        tracing::info!(user_id = user.id, "User logged in");

        Ok(LoginResponse {
            token,
            user: user.into(),
        })
    }

    pub async fn profile(&self, user: &CurrentUser) -> AppResult<UserProfile> {
        Ok(self.fetch_user(user.id).await?.into())
    }

    pub async fn create_address(
        &self,
        user: &CurrentUser,
        input: AddressInput,
    ) -> AppResult<Address> {
        validated(&input)?;

        let address_id = sqlx::query(
            "INSERT INTO addresses (user_id, cep, street, number, complement, type)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(user.id)
        .bind(input.cep.trim())
        .bind(input.street.trim())
        .bind(input.number.trim())
        .bind(input.complement.as_deref().map(str::trim))
        .bind(input.kind.trim())
        .execute(self.db.write())
        .await?
        .last_insert_rowid();

        let address: Address = sqlx::query_as("SELECT * FROM addresses WHERE id = ?")
            .bind(address_id)
            .fetch_one(self.db.read())
            .await?;
        Ok(address)
    }

    pub async fn list_addresses(&self, user: &CurrentUser) -> AppResult<Vec<Address>> {
        let addresses: Vec<Address> =
            sqlx::query_as("SELECT * FROM addresses WHERE user_id = ? ORDER BY created_at DESC, id DESC")
                .bind(user.id)
                .fetch_all(self.db.read())
                .await?;
        Ok(addresses)
    }

    /// Issue a password-reset token.
    ///
    /// Always succeeds from the caller's point of view so the endpoint
    /// cannot be used to probe which e-mails exist. Delivery is a log line;
    /// there is no mail integration.
    pub async fn forgot_password(&self, email: &str) -> AppResult<()> {
        let email = email.trim().to_lowercase();
        let user_id: Option<i64> =
            sqlx::query_scalar("SELECT id FROM users WHERE email = ? AND is_active = 1")
                .bind(&email)
                .fetch_optional(self.db.read())
                .await?;
        let Some(user_id) = user_id else {
            tracing::debug!("Password reset requested for unknown e-mail");
            return Ok(());
        };

        let token = Uuid::new_v4().simple().to_string();
        let expires_at = sqlite_timestamp(Utc::now() + Duration::minutes(RESET_TOKEN_TTL_MINUTES));

        let mut tx = self.db.write().begin().await?;
        // One live token per user
        sqlx::query("UPDATE password_reset_tokens SET used = 1 WHERE user_id = ? AND used = 0")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            "INSERT INTO password_reset_tokens (user_id, token, expires_at) VALUES (?, ?, ?)",
        )
        .bind(user_id)
        .bind(&token)
        .bind(&expires_at)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        // Stands in for the reset e-mail, which is never actually sent
        tracing::info!(user_id, token, "Password reset token issued");

        Ok(())
    }

    pub async fn reset_password(&self, token: &str, new_password: &str) -> AppResult<()> {
        if new_password.len() < 6 {
            return Err(AppError::validation(
                "Senha deve ter pelo menos 6 caracteres",
            ));
        }

        let mut tx = self.db.write().begin().await?;

        let user_id: Option<i64> = sqlx::query_scalar(
            "SELECT user_id FROM password_reset_tokens
             WHERE token = ? AND used = 0 AND datetime(expires_at) > datetime('now')",
        )
        .bind(token)
        .fetch_optional(&mut *tx)
        .await?;
        let user_id =
            user_id.ok_or_else(|| AppError::validation("Token inválido ou expirado"))?;

        let password_hash = hash_password(new_password)?;
        sqlx::query(
            "UPDATE users SET password_hash = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?",
        )
        .bind(&password_hash)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;
        sqlx::query("UPDATE password_reset_tokens SET used = 1 WHERE token = ?")
            .bind(token)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(user_id, "Password reset completed");

        Ok(())
    }

    /// Purge expired and consumed reset tokens. Runs from the scheduler.
    pub async fn cleanup_reset_tokens(&self) -> AppResult<u64> {
        let removed = sqlx::query(
            "DELETE FROM password_reset_tokens
             WHERE used = 1 OR datetime(expires_at) <= datetime('now')",
        )
        .execute(self.db.write())
        .await?
        .rows_affected();
        if removed > 0 {
            tracing::debug!(removed, "Expired reset tokens purged");
        }
        Ok(removed)
    }

    async fn fetch_user(&self, user_id: i64) -> AppResult<User> {
        let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_optional(self.db.read())
            .await?;
        user.ok_or_else(|| AppError::not_found("Usuário não encontrado"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::JwtConfig;
    use crate::db::models::Role;
    use crate::db::testutil::*;

    fn jwt() -> Arc<JwtService> {
        Arc::new(JwtService::with_config(JwtConfig {
            secret: "test-secret-which-is-long-enough!!".into(),
            expiration_minutes: 30,
            issuer: "commerce-server".into(),
            audience: "commerce-clients".into(),
        }))
    }

    async fn setup() -> (crate::db::DbService, AuthService) {
        let db = mem_db().await;
        let service = AuthService::new(db.clone(), jwt());
        (db, service)
    }

    fn register_input(email: &str) -> RegisterInput {
        RegisterInput {
            name: "Maria Silva".into(),
            email: email.into(),
            password: "segredo123".into(),
            role: None,
        }
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let (_db, service) = setup().await;

        let registered = service
            .register(register_input("maria@example.com"))
            .await
            .unwrap();
        assert_eq!(registered.user.role, Role::Cliente);
        assert!(!registered.token.is_empty());

        let session = service
            .login(LoginInput {
                email: "maria@example.com".into(),
                password: "segredo123".into(),
            })
            .await
            .unwrap();
        assert_eq!(session.user.name, "Maria Silva");

        let err = service
            .login(LoginInput {
                email: "maria@example.com".into(),
                password: "errada".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidCredentials));
        let err = service
            .login(LoginInput {
                email: "ninguem@example.com".into(),
                password: "segredo123".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_register_validation_and_conflict() {
        let (_db, service) = setup().await;

        let mut bad = register_input("maria@example.com");
        bad.password = "123".into();
        let err = service.register(bad).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let mut bad = register_input("not-an-email");
        bad.password = "segredo123".into();
        let err = service.register(bad).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let mut bad = register_input("carlos@example.com");
        bad.role = Some("Gerente".into());
        let err = service.register(bad).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        service
            .register(register_input("maria@example.com"))
            .await
            .unwrap();
        let err = service
            .register(register_input("MARIA@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_register_with_explicit_role() {
        let (_db, service) = setup().await;
        let mut input = register_input("carlos@example.com");
        input.role = Some("Vendedor".into());
        let registered = service.register(input).await.unwrap();
        assert_eq!(registered.user.role, Role::Vendedor);
    }

    #[tokio::test]
    async fn test_address_book() {
        let (_db, service) = setup().await;
        let registered = service
            .register(register_input("maria@example.com"))
            .await
            .unwrap();
        let user = CurrentUser {
            id: registered.user.id,
            name: registered.user.name.clone(),
            role: registered.user.role,
        };

        let address = service
            .create_address(
                &user,
                AddressInput {
                    cep: "01310-100".into(),
                    street: "Av. Paulista".into(),
                    number: "1000".into(),
                    complement: Some("Apto 42".into()),
                    kind: "Residencial".into(),
                },
            )
            .await
            .unwrap();
        assert_eq!(address.user_id, user.id);

        let err = service
            .create_address(
                &user,
                AddressInput {
                    cep: "1310".into(),
                    street: "Av. Paulista".into(),
                    number: "1000".into(),
                    complement: None,
                    kind: "Residencial".into(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let addresses = service.list_addresses(&user).await.unwrap();
        assert_eq!(addresses.len(), 1);
    }

    #[tokio::test]
    async fn test_password_reset_flow() {
        let (db, service) = setup().await;
        service
            .register(register_input("maria@example.com"))
            .await
            .unwrap();

        // Unknown e-mail leaks nothing
        service.forgot_password("ninguem@example.com").await.unwrap();

        service.forgot_password("maria@example.com").await.unwrap();
        // A second request invalidates the first token
        service.forgot_password("maria@example.com").await.unwrap();
        let live: Vec<String> = sqlx::query_scalar(
            "SELECT token FROM password_reset_tokens WHERE used = 0",
        )
        .fetch_all(db.read())
        .await
        .unwrap();
        assert_eq!(live.len(), 1);
        let token = live[0].clone();

        let err = service.reset_password(&token, "123").await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        service.reset_password(&token, "novasenha1").await.unwrap();
        service
            .login(LoginInput {
                email: "maria@example.com".into(),
                password: "novasenha1".into(),
            })
            .await
            .unwrap();

        // Tokens are single-use
        let err = service.reset_password(&token, "outrasenha").await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_cleanup_reset_tokens() {
        let (db, service) = setup().await;
        service
            .register(register_input("maria@example.com"))
            .await
            .unwrap();
        service.forgot_password("maria@example.com").await.unwrap();
        service.forgot_password("maria@example.com").await.unwrap();

        // One used (invalidated) token and one live token
        let removed = service.cleanup_reset_tokens().await.unwrap();
        assert_eq!(removed, 1);
        let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM password_reset_tokens")
            .fetch_one(db.read())
            .await
            .unwrap();
        assert_eq!(remaining, 1);
    }
}
