//! Authentication session.
//!
//! Holds the signed-in user and bearer token, restored at startup from a
//! [`SessionStore`] and replaced wholesale by [`AuthSession::login`] and
//! [`AuthSession::register`]. The token is never validated client-side:
//! the session counts as authenticated whenever both entries are present.

mod error;
mod form;
mod store;

pub use error::{AuthError, AuthFlow};
pub use form::RegisterForm;
pub use store::{FileSessionStore, MemorySessionStore, SessionStore, StoreError, keys};

use secrecy::{ExposeSecret, SecretString};
use tracing::{info, instrument, warn};

use shopfront_core::{Email, UserRole};

use crate::api::{AuthGateway, AuthResponse, UserProfile};

/// The signed-in identity, if any.
pub struct AuthSession<S> {
    store: S,
    token: Option<SecretString>,
    user: Option<UserProfile>,
    last_error: Option<String>,
}

impl<S> std::fmt::Debug for AuthSession<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSession")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("user", &self.user)
            .field("last_error", &self.last_error)
            .finish_non_exhaustive()
    }
}

impl<S: SessionStore> AuthSession<S> {
    /// Restore the session persisted in `store`.
    ///
    /// A session is only restored when both the token and the user are
    /// present. A user entry that no longer parses is discarded along with
    /// the token.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the store cannot be read.
    pub fn restore(mut store: S) -> Result<Self, StoreError> {
        let token = store.get(keys::TOKEN)?;
        let user = store.get(keys::USER)?;

        let (token, user) = match (token, user) {
            (Some(token), Some(raw)) => match serde_json::from_str::<UserProfile>(&raw) {
                Ok(user) => (Some(SecretString::from(token)), Some(user)),
                Err(e) => {
                    warn!(error = %e, "Discarding unreadable persisted user");
                    store.remove(keys::TOKEN)?;
                    store.remove(keys::USER)?;
                    (None, None)
                }
            },
            _ => (None, None),
        };

        Ok(Self {
            store,
            token,
            user,
            last_error: None,
        })
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Token and user are both present.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.token.is_some() && self.user.is_some()
    }

    #[must_use]
    pub const fn user(&self) -> Option<&UserProfile> {
        self.user.as_ref()
    }

    #[must_use]
    pub const fn token(&self) -> Option<&SecretString> {
        self.token.as_ref()
    }

    /// Whether the signed-in user has the `ADMIN` role.
    ///
    /// Only the exact wire value counts. Other casings are logged and denied.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        match self.user.as_ref().map(|user| &user.role) {
            Some(UserRole::Admin) => true,
            Some(role) if role.is_miscased_admin() => {
                warn!(role = %role, "User role looks like admin but is not exactly ADMIN; denying");
                false
            }
            _ => false,
        }
    }

    /// Message of the last failed login or registration.
    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn clear_error(&mut self) {
        self.last_error = None;
    }

    // =========================================================================
    // Transitions
    // =========================================================================

    /// Sign in. On failure the current session is left as it was.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MissingField` or `AuthError::InvalidEmail` before
    /// calling the API, `AuthError::Rejected` if the API refuses, or
    /// `AuthError::Api` if the request fails.
    #[instrument(skip(self, gateway, password))]
    pub async fn login<G: AuthGateway>(
        &mut self,
        gateway: &G,
        email: &str,
        password: &str,
    ) -> Result<&UserProfile, AuthError> {
        let result = attempt_login(gateway, email, password).await;

        self.settle(result)
    }

    /// Create an account and sign in. On failure the current session is left
    /// as it was.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Invalid` with every failed field before calling
    /// the API, otherwise the same as [`AuthSession::login`].
    #[instrument(skip(self, gateway, form), fields(email = %form.email))]
    pub async fn register<G: AuthGateway>(
        &mut self,
        gateway: &G,
        form: &RegisterForm,
    ) -> Result<&UserProfile, AuthError> {
        let result = attempt_register(gateway, form).await;

        self.settle(result)
    }

    /// Sign out and remove the persisted entries. Never fails.
    pub fn logout(&mut self) {
        if let Some(user) = self.user.take() {
            info!(email = %user.email, "User signed out");
        }
        self.token = None;
        for key in [keys::TOKEN, keys::USER] {
            if let Err(e) = self.store.remove(key) {
                warn!(error = %e, key, "Failed to remove persisted session entry");
            }
        }
    }

    fn settle(
        &mut self,
        result: Result<(SecretString, UserProfile), AuthError>,
    ) -> Result<&UserProfile, AuthError> {
        match result {
            Ok((token, user)) => {
                self.persist(&token, &user);
                info!(email = %user.email, "User signed in");
                self.last_error = None;
                self.token = Some(token);
                Ok(&*self.user.insert(user))
            }
            Err(e) => {
                warn!(error = %e, "Authentication failed");
                self.last_error = Some(e.user_message());
                Err(e)
            }
        }
    }

    /// Write the new session to the store. The in-memory session stands even
    /// if this fails.
    fn persist(&mut self, token: &SecretString, user: &UserProfile) {
        let user_json = match serde_json::to_string(user) {
            Ok(json) => json,
            Err(e) => {
                warn!(error = %e, "Failed to serialize user for the session store");
                return;
            }
        };
        let written = self
            .store
            .set(keys::TOKEN, token.expose_secret())
            .and_then(|()| self.store.set(keys::USER, &user_json));
        if let Err(e) = written {
            warn!(error = %e, "Failed to persist session");
        }
    }
}

async fn attempt_login<G: AuthGateway>(
    gateway: &G,
    email: &str,
    password: &str,
) -> Result<(SecretString, UserProfile), AuthError> {
    let email = parse_email(email)?;
    require(password, "password")?;
    let response = gateway
        .login(email.as_str(), password)
        .await
        .map_err(|e| AuthError::from_api(AuthFlow::Login, e))?;
    accepted(AuthFlow::Login, response)
}

async fn attempt_register<G: AuthGateway>(
    gateway: &G,
    form: &RegisterForm,
) -> Result<(SecretString, UserProfile), AuthError> {
    let errors = form.validate();
    if !errors.is_empty() {
        return Err(AuthError::Invalid(errors));
    }
    let email = parse_email(&form.email)?;
    let response = gateway
        .register(form.name.trim(), email.as_str(), &form.password)
        .await
        .map_err(|e| AuthError::from_api(AuthFlow::Register, e))?;
    accepted(AuthFlow::Register, response)
}

fn parse_email(email: &str) -> Result<Email, AuthError> {
    require(email, "email")?;
    Ok(Email::parse(email.trim())?)
}

fn require(value: &str, field: &'static str) -> Result<(), AuthError> {
    if value.trim().is_empty() {
        return Err(AuthError::MissingField(field));
    }
    Ok(())
}

fn accepted(
    flow: AuthFlow,
    response: AuthResponse,
) -> Result<(SecretString, UserProfile), AuthError> {
    match response {
        AuthResponse {
            token: Some(token),
            user: Some(user),
            ..
        } if !token.is_empty() => Ok((SecretString::from(token), user)),
        AuthResponse {
            message: Some(message),
            ..
        } => Err(AuthError::Rejected(message)),
        _ => Err(AuthError::IncompleteResponse(flow)),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;

    use shopfront_core::UserId;

    use super::*;
    use crate::api::ApiError;
    use crate::checkout::Field;

    fn profile(role: &str) -> UserProfile {
        UserProfile {
            id: Some(UserId::new(1)),
            name: "Ana".to_string(),
            email: "ana@example.com".to_string(),
            role: UserRole::from(role.to_string()),
        }
    }

    /// Answers every call with the next scripted result.
    struct ScriptedAuth {
        responses: Mutex<Vec<Result<AuthResponse, ApiError>>>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedAuth {
        fn new(responses: Vec<Result<AuthResponse, ApiError>>) -> Self {
            Self {
                responses: Mutex::new(responses),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn next(&self, call: String) -> Result<AuthResponse, ApiError> {
            self.calls.lock().unwrap().push(call);
            self.responses.lock().unwrap().remove(0)
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    impl AuthGateway for ScriptedAuth {
        async fn login(&self, email: &str, _password: &str) -> Result<AuthResponse, ApiError> {
            self.next(format!("login {email}"))
        }

        async fn register(
            &self,
            name: &str,
            email: &str,
            _password: &str,
        ) -> Result<AuthResponse, ApiError> {
            self.next(format!("register {name} {email}"))
        }
    }

    fn ok(token: &str, role: &str) -> Result<AuthResponse, ApiError> {
        Ok(AuthResponse {
            token: Some(token.to_string()),
            user: Some(profile(role)),
            message: None,
        })
    }

    fn empty_session() -> AuthSession<MemorySessionStore> {
        AuthSession::restore(MemorySessionStore::new()).unwrap()
    }

    #[test]
    fn test_restore_requires_both_entries() {
        let mut store = MemorySessionStore::new();
        store.set(keys::TOKEN, "tok").unwrap();
        let session = AuthSession::restore(store).unwrap();
        assert!(!session.is_authenticated());

        let mut store = MemorySessionStore::new();
        store.set(keys::TOKEN, "tok").unwrap();
        store
            .set(keys::USER, &serde_json::to_string(&profile("USER")).unwrap())
            .unwrap();
        let session = AuthSession::restore(store).unwrap();
        assert!(session.is_authenticated());
        assert_eq!(session.user().unwrap().name, "Ana");
    }

    #[test]
    fn test_restore_discards_unreadable_user() {
        let mut store = MemorySessionStore::new();
        store.set(keys::TOKEN, "tok").unwrap();
        store.set(keys::USER, "{not json").unwrap();
        let session = AuthSession::restore(store).unwrap();
        assert!(!session.is_authenticated());
        assert_eq!(session.store.get(keys::TOKEN).unwrap(), None);
    }

    #[tokio::test]
    async fn test_login_persists_session() {
        let gateway = ScriptedAuth::new(vec![ok("tok-1", "USER")]);
        let mut session = empty_session();

        let user = session
            .login(&gateway, "ana@example.com", "secret")
            .await
            .unwrap();
        assert_eq!(user.email, "ana@example.com");
        assert!(session.is_authenticated());
        assert_eq!(session.token().unwrap().expose_secret(), "tok-1");
        assert_eq!(
            session.store.get(keys::TOKEN).unwrap().as_deref(),
            Some("tok-1")
        );
        let stored: UserProfile =
            serde_json::from_str(&session.store.get(keys::USER).unwrap().unwrap()).unwrap();
        assert_eq!(stored, profile("USER"));
    }

    #[tokio::test]
    async fn test_failed_login_keeps_existing_session() {
        let gateway = ScriptedAuth::new(vec![
            ok("tok-1", "USER"),
            Err(ApiError::Unauthorized {
                message: Some("Credenciales inválidas".to_string()),
            }),
        ]);
        let mut session = empty_session();
        session
            .login(&gateway, "ana@example.com", "secret")
            .await
            .unwrap();

        let err = session
            .login(&gateway, "other@example.com", "wrong")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Rejected(_)));
        assert_eq!(session.last_error(), Some("Credenciales inválidas"));
        assert_eq!(session.token().unwrap().expose_secret(), "tok-1");
        assert_eq!(session.user().unwrap().email, "ana@example.com");

        session.clear_error();
        assert_eq!(session.last_error(), None);
    }

    #[tokio::test]
    async fn test_login_without_message_uses_default() {
        let gateway = ScriptedAuth::new(vec![Err(ApiError::Status {
            status: 500,
            message: None,
        })]);
        let mut session = empty_session();
        session
            .login(&gateway, "ana@example.com", "secret")
            .await
            .unwrap_err();
        assert_eq!(session.last_error(), Some("Could not sign in"));
    }

    #[tokio::test]
    async fn test_login_checks_inputs_before_calling() {
        let gateway = ScriptedAuth::new(vec![]);
        let mut session = empty_session();

        let err = session.login(&gateway, "", "secret").await.unwrap_err();
        assert!(matches!(err, AuthError::MissingField("email")));
        let err = session
            .login(&gateway, "not-an-email", "secret")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidEmail(_)));
        let err = session
            .login(&gateway, "ana@example.com", "  ")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::MissingField("password")));

        assert_eq!(gateway.call_count(), 0);
    }

    #[tokio::test]
    async fn test_register_signs_in() {
        let gateway = ScriptedAuth::new(vec![ok("tok-2", "USER")]);
        let mut session = empty_session();
        let form = RegisterForm::new(" Ana ", "ana@example.com", "secret", "secret");
        session.register(&gateway, &form).await.unwrap();
        assert!(session.is_authenticated());
        assert_eq!(
            gateway.calls.lock().unwrap().as_slice(),
            ["register Ana ana@example.com"]
        );
    }

    #[tokio::test]
    async fn test_register_validates_form_before_calling() {
        let gateway = ScriptedAuth::new(vec![]);
        let mut session = empty_session();

        let form = RegisterForm::new("A", "a@b.co", "1", "1");
        let err = session.register(&gateway, &form).await.unwrap_err();
        let AuthError::Invalid(errors) = err else {
            panic!("expected field errors, got {err:?}");
        };
        assert!(errors.contains(Field::Name));
        assert!(errors.contains(Field::Password));
        assert!(!errors.contains(Field::Email));

        let form = RegisterForm::new("Ana", "ana@example.com", "secret", "secreto");
        session.register(&gateway, &form).await.unwrap_err();
        assert_eq!(session.last_error(), Some("Passwords do not match"));

        assert_eq!(gateway.call_count(), 0);
        assert!(!session.is_authenticated());
    }

    #[tokio::test]
    async fn test_register_rejected_with_server_message_in_body() {
        let gateway = ScriptedAuth::new(vec![Ok(AuthResponse {
            token: None,
            user: None,
            message: Some("El email ya está registrado".to_string()),
        })]);
        let mut session = empty_session();
        let form = RegisterForm::new("Ana", "ana@example.com", "secret", "secret");
        session.register(&gateway, &form).await.unwrap_err();
        assert_eq!(session.last_error(), Some("El email ya está registrado"));
        assert!(!session.is_authenticated());
    }

    #[tokio::test]
    async fn test_logout_clears_store() {
        let gateway = ScriptedAuth::new(vec![ok("tok-1", "USER")]);
        let mut session = empty_session();
        session
            .login(&gateway, "ana@example.com", "secret")
            .await
            .unwrap();

        session.logout();
        assert!(!session.is_authenticated());
        assert_eq!(session.store.get(keys::TOKEN).unwrap(), None);
        assert_eq!(session.store.get(keys::USER).unwrap(), None);

        // Logging out twice is harmless.
        session.logout();
    }

    #[tokio::test]
    async fn test_is_admin_exact_role_only() {
        let gateway = ScriptedAuth::new(vec![ok("a", "ADMIN"), ok("b", "admin")]);
        let mut session = empty_session();
        assert!(!session.is_admin());

        session.login(&gateway, "ana@example.com", "x").await.unwrap();
        assert!(session.is_admin());

        session.login(&gateway, "ana@example.com", "x").await.unwrap();
        assert!(!session.is_admin());
    }
}
