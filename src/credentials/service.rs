use anyhow::anyhow;
use secrecy::SecretString;
use std::sync::Arc;
use tokio::{sync::OnceCell, time::sleep};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use super::clock::{expiry_after, Clock, SystemClock};
use super::config::CredentialConfig;
use super::error::{CredentialError, CredentialResult};
use super::notify::{build_link, dispatch, Notification, Notifier, Template};
use super::password::{hash_password, verify_password};
use super::session::SessionIssuer;
use super::tokens::{generate_token, TokenGrant, TokenKind, TokenStore};
use super::types::{Ack, AuthPayload, PublicUser};
use crate::storage::{CreateOutcome, NewUser, UserRecord, UserStore};

pub const FORGOT_PASSWORD_MESSAGE: &str = "If an account exists, you will receive an email.";
pub const PASSWORD_RESET_MESSAGE: &str = "Password has been reset.";
pub const EMAIL_VERIFIED_MESSAGE: &str = "Email verified successfully.";
pub const PASSWORD_CHANGED_MESSAGE: &str = "Password changed successfully.";

const TOKEN_INSERT_ATTEMPTS: usize = 3;

/// Hashed once and checked against on logins for unknown emails.
const DUMMY_PASSWORD: &str = "keyward-timing-equalizer";

/// Normalize an email for lookup/uniqueness checks.
#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Owns password hashing, session signing, and the single-use token lifecycle.
pub struct CredentialService {
    config: CredentialConfig,
    users: Arc<dyn UserStore>,
    tokens: Arc<dyn TokenStore>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    sessions: SessionIssuer,
    dummy_hash: OnceCell<String>,
}

impl CredentialService {
    pub fn new(
        config: CredentialConfig,
        session_secret: &SecretString,
        users: Arc<dyn UserStore>,
        tokens: Arc<dyn TokenStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let sessions = SessionIssuer::new(session_secret, config.session_ttl_seconds());
        Self {
            config,
            users,
            tokens,
            notifier,
            clock: Arc::new(SystemClock),
            sessions,
            dummy_hash: OnceCell::new(),
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn config(&self) -> &CredentialConfig {
        &self.config
    }

    #[must_use]
    pub fn users(&self) -> &dyn UserStore {
        self.users.as_ref()
    }

    /// Create an unverified account, email a verification link, and sign a session.
    ///
    /// Once the account row exists, failing to issue or deliver the verification
    /// link is logged and does not fail the sign-up.
    ///
    /// # Errors
    /// `DuplicateAccount` if the normalized email is taken.
    #[instrument(skip(self, name, password))]
    pub async fn sign_up(
        &self,
        email: &str,
        name: &str,
        password: &str,
    ) -> CredentialResult<AuthPayload> {
        let email = normalize_email(email);
        if self.users.find_by_email(&email).await?.is_some() {
            return Err(CredentialError::DuplicateAccount);
        }

        let password_hash = hash_password(password, self.config.bcrypt_cost()).await?;
        let outcome = self
            .users
            .create(NewUser {
                email,
                name: name.trim().to_string(),
                password_hash,
                email_verified: false,
            })
            .await?;

        // A concurrent sign-up can win between the lookup and the insert.
        let user = match outcome {
            CreateOutcome::Created(user) => user,
            CreateOutcome::Conflict => return Err(CredentialError::DuplicateAccount),
        };

        match self.issue_token(TokenKind::Verification, &user.email).await {
            Ok(token) => self.notify(Template::VerifyEmail, &user.email, &token),
            Err(err) => {
                error!(user_id = %user.id, "failed to issue verification token: {err:#}");
            }
        }

        info!(user_id = %user.id, "account created");

        self.auth_payload(&user)
    }

    /// # Errors
    /// `InvalidCredentials` for an unknown email or a wrong password alike.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> CredentialResult<AuthPayload> {
        let email = normalize_email(email);
        let Some(user) = self.users.find_by_email(&email).await? else {
            self.spend_password_check(password).await;
            return Err(CredentialError::InvalidCredentials);
        };

        if !self.password_matches(&user, password).await {
            return Err(CredentialError::InvalidCredentials);
        }

        self.auth_payload(&user)
    }

    /// Always acknowledges with the same message, whether or not the account exists.
    #[instrument(skip(self))]
    pub async fn forgot_password(&self, email: &str) -> Ack {
        let email = normalize_email(email);
        match self.users.find_by_email(&email).await {
            Ok(Some(user)) => match self.issue_token(TokenKind::Reset, &user.email).await {
                Ok(token) => self.notify(Template::ResetPassword, &user.email, &token),
                Err(err) => error!("failed to issue reset token: {err:#}"),
            },
            Ok(None) => debug!("forgot-password for unknown account"),
            // Failures stay invisible to the caller, same as an unknown account.
            Err(err) => error!("failed to lookup user for forgot-password: {err:#}"),
        }

        Ack::ok(FORGOT_PASSWORD_MESSAGE)
    }

    /// # Errors
    /// `InvalidOrExpiredToken` if the token is unknown, expired, already used,
    /// or its account no longer exists.
    #[instrument(skip_all)]
    pub async fn reset_password(&self, token: &str, new_password: &str) -> CredentialResult<Ack> {
        let kind = TokenKind::Reset;
        let user = self.resolve_token(kind, token).await?;
        let password_hash = hash_password(new_password, self.config.bcrypt_cost()).await?;

        self.consume_token(kind, token).await?;

        if !self
            .users
            .update_password_hash(user.id, &password_hash)
            .await?
        {
            return Err(CredentialError::InvalidOrExpiredToken(kind));
        }

        info!(user_id = %user.id, "password reset");

        Ok(Ack::ok(PASSWORD_RESET_MESSAGE))
    }

    /// # Errors
    /// `InvalidOrExpiredToken` under the same conditions as `reset_password`.
    #[instrument(skip_all)]
    pub async fn verify_email(&self, token: &str) -> CredentialResult<Ack> {
        let kind = TokenKind::Verification;
        let user = self.resolve_token(kind, token).await?;

        self.consume_token(kind, token).await?;

        if !self.users.mark_email_verified(user.id).await? {
            return Err(CredentialError::InvalidOrExpiredToken(kind));
        }

        info!(user_id = %user.id, "email verified");

        Ok(Ack::ok(EMAIL_VERIFIED_MESSAGE))
    }

    /// Resolve a signed session to the current state of its user.
    ///
    /// # Errors
    /// `InvalidSession` if the token is forged, expired, or its user is gone.
    #[instrument(skip_all)]
    pub async fn authenticate(&self, access_token: &str) -> CredentialResult<PublicUser> {
        let user = self.session_user(access_token).await?;
        Ok(PublicUser::from(&user))
    }

    /// # Errors
    /// `InvalidSession` for a bad session, `InvalidCredentials` if
    /// `current_password` does not match.
    #[instrument(skip_all)]
    pub async fn change_password(
        &self,
        access_token: &str,
        current_password: &str,
        new_password: &str,
    ) -> CredentialResult<Ack> {
        let user = self.session_user(access_token).await?;

        if !self.password_matches(&user, current_password).await {
            return Err(CredentialError::InvalidCredentials);
        }

        let password_hash = hash_password(new_password, self.config.bcrypt_cost()).await?;
        if !self
            .users
            .update_password_hash(user.id, &password_hash)
            .await?
        {
            return Err(CredentialError::InvalidSession);
        }

        info!(user_id = %user.id, "password changed");

        Ok(Ack::ok(PASSWORD_CHANGED_MESSAGE))
    }

    /// Drop expired tokens from both namespaces.
    ///
    /// # Errors
    /// Returns an error if the token store fails.
    pub async fn purge_expired_tokens(&self) -> anyhow::Result<u64> {
        self.tokens.purge_expired(self.clock.now()).await
    }

    async fn issue_token(&self, kind: TokenKind, email: &str) -> anyhow::Result<String> {
        let expires_at = expiry_after(self.clock.now(), self.config.token_ttl_seconds())?;
        for _ in 0..TOKEN_INSERT_ATTEMPTS {
            let token = generate_token()?;
            let grant = TokenGrant {
                email: email.to_string(),
                expires_at,
            };
            if self.tokens.insert(kind, &token, grant).await? {
                return Ok(token);
            }
        }

        Err(anyhow!("failed to generate unique {kind} token"))
    }

    /// Look up a live grant and re-resolve its user by email, without consuming.
    async fn resolve_token(&self, kind: TokenKind, token: &str) -> CredentialResult<UserRecord> {
        let now = self.clock.now();
        let grant = match self.tokens.find(kind, token).await? {
            Some(grant) if !grant.is_expired(now) => grant,
            _ => return Err(CredentialError::InvalidOrExpiredToken(kind)),
        };

        self.users
            .find_by_email(&grant.email)
            .await?
            .ok_or(CredentialError::InvalidOrExpiredToken(kind))
    }

    /// Atomically take the token; losing a race reads as an invalid token.
    async fn consume_token(&self, kind: TokenKind, token: &str) -> CredentialResult<()> {
        match self.tokens.consume(kind, token, self.clock.now()).await? {
            Some(_) => Ok(()),
            None => Err(CredentialError::InvalidOrExpiredToken(kind)),
        }
    }

    async fn session_user(&self, access_token: &str) -> CredentialResult<UserRecord> {
        let claims = self
            .sessions
            .verify(access_token, self.clock.now())
            .map_err(|err| {
                debug!("session rejected: {err:#}");
                CredentialError::InvalidSession
            })?;
        let user_id =
            Uuid::parse_str(&claims.sub).map_err(|_| CredentialError::InvalidSession)?;

        self.users
            .find_by_id(user_id)
            .await?
            .ok_or(CredentialError::InvalidSession)
    }

    /// A stored hash that bcrypt cannot parse counts as a mismatch.
    async fn password_matches(&self, user: &UserRecord, password: &str) -> bool {
        match verify_password(password, &user.password_hash).await {
            Ok(matches) => matches,
            Err(err) => {
                warn!(user_id = %user.id, "unusable password hash: {err:#}");
                false
            }
        }
    }

    /// Run a bcrypt verify against a throwaway hash so unknown emails cost the same.
    async fn spend_password_check(&self, password: &str) {
        let hash = self
            .dummy_hash
            .get_or_try_init(|| hash_password(DUMMY_PASSWORD, self.config.bcrypt_cost()))
            .await;
        match hash {
            Ok(hash) => {
                let _ = verify_password(password, hash).await;
            }
            Err(err) => warn!("failed to prepare dummy password hash: {err:#}"),
        }
    }

    fn auth_payload(&self, user: &UserRecord) -> CredentialResult<AuthPayload> {
        let access_token =
            self.sessions
                .sign(&user.id.to_string(), &user.email, self.clock.now())?;
        Ok(AuthPayload {
            access_token,
            user: PublicUser::from(user),
        })
    }

    fn notify(&self, template: Template, email: &str, token: &str) {
        let path = match template {
            Template::VerifyEmail => "verify-email",
            Template::ResetPassword => "reset-password",
        };
        let notification = Notification {
            to: email.to_string(),
            template,
            link: build_link(self.config.frontend_base_url(), path, token),
        };
        dispatch(self.notifier.clone(), notification);
    }
}

impl std::fmt::Debug for CredentialService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialService")
            .field("config", &self.config)
            .field("sessions", &self.sessions)
            .finish_non_exhaustive()
    }
}

/// Spawn a background task that periodically drops expired tokens.
/// Returns `None` when the sweep interval is disabled.
pub fn spawn_token_sweeper(
    service: Arc<CredentialService>,
) -> Option<tokio::task::JoinHandle<()>> {
    let interval = service.config().token_sweep_interval()?;

    Some(tokio::spawn(async move {
        loop {
            sleep(interval).await;

            match service.purge_expired_tokens().await {
                Ok(0) => {}
                Ok(count) => debug!("purged {count} expired tokens"),
                Err(err) => error!("token sweep failed: {err:#}"),
            }
        }
    }))
}
