use crate::config::Config;
use crate::error::{AppError, Result};
use crate::models::{
    AuthEvent, AuthState, CallbackOutcome, CallbackParams, PendingAuthorization, Session,
    TokenResponse,
};
use crate::services::pkce;
use crate::services::storage::{
    KeyValueStore, ACCESS_TOKEN_KEY, CODE_VERIFIER_KEY, EXPIRES_AT_KEY, REFRESH_TOKEN_KEY,
    STATE_KEY,
};
use chrono::Utc;
use reqwest::{Client, Url};
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Owns the PKCE authorization-code flow and the resulting token lifecycle.
pub struct AuthService {
    client: Client,
    client_id: String,
    redirect_uri: String,
    scopes: Vec<String>,
    accounts_url: String,
    session: RwLock<Session>,
    state: RwLock<AuthState>,
    durable: Arc<dyn KeyValueStore>,
    transient: Arc<dyn KeyValueStore>,
    events: broadcast::Sender<AuthEvent>,
}

impl AuthService {
    /// Loads any stored session and derives the starting state from storage alone.
    pub fn new(
        config: &Config,
        durable: Arc<dyn KeyValueStore>,
        transient: Arc<dyn KeyValueStore>,
    ) -> Self {
        let session = Session {
            access_token: durable.get(ACCESS_TOKEN_KEY),
            refresh_token: durable.get(REFRESH_TOKEN_KEY),
            expires_at_ms: durable.get(EXPIRES_AT_KEY).and_then(|v| v.parse().ok()),
        };

        let pending =
            transient.get(STATE_KEY).is_some() && transient.get(CODE_VERIFIER_KEY).is_some();

        let state = if pending {
            AuthState::AwaitingCallback
        } else if session.is_authenticated_at(now_ms()) {
            AuthState::LoggedIn
        } else {
            AuthState::LoggedOut
        };

        let (events, _) = broadcast::channel(16);

        Self {
            client: Client::new(),
            client_id: config.client_id.clone(),
            redirect_uri: config.redirect_uri.clone(),
            scopes: config.scopes.clone(),
            accounts_url: config.accounts_url.trim_end_matches('/').to_string(),
            session: RwLock::new(session),
            state: RwLock::new(state),
            durable,
            transient,
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }

    pub async fn state(&self) -> AuthState {
        *self.state.read().await
    }

    pub async fn session(&self) -> Session {
        self.session.read().await.clone()
    }

    /// Startup step: announce a usable stored session, or try one refresh with a stored refresh token.
    pub async fn restore(&self) -> AuthState {
        match self.state().await {
            AuthState::AwaitingCallback => {
                tracing::info!("Authorization in progress; waiting for callback");
            }
            AuthState::LoggedIn => {
                tracing::info!("Restored stored session");
                self.notify(true);
            }
            AuthState::LoggedOut | AuthState::Refreshing => {
                let has_refresh_token = self.session.read().await.refresh_token.is_some();
                if has_refresh_token {
                    tracing::info!("Stored access token expired; refreshing");
                    self.refresh_access_token().await;
                }
            }
        }

        self.state().await
    }

    pub fn pending_authorization(&self) -> Option<PendingAuthorization> {
        Some(PendingAuthorization {
            state: self.transient.get(STATE_KEY)?,
            code_verifier: self.transient.get(CODE_VERIFIER_KEY)?,
        })
    }

    /// Starts a new authorization and returns the URL the user must visit.
    pub async fn login(&self) -> Result<Url> {
        let state = pkce::generate_state();
        let code_verifier = pkce::generate_code_verifier();
        let code_challenge = pkce::code_challenge(&code_verifier);

        self.transient.set(CODE_VERIFIER_KEY, &code_verifier)?;
        self.transient.set(STATE_KEY, &state)?;

        let url = self.authorize_url(&state, &code_challenge)?;
        *self.state.write().await = AuthState::AwaitingCallback;

        tracing::info!("Authorization started; awaiting callback on {}", self.redirect_uri);

        Ok(url)
    }

    pub fn authorize_url(&self, state: &str, code_challenge: &str) -> Result<Url> {
        let scope = self.scopes.join(" ");
        let params = [
            ("response_type", "code"),
            ("client_id", self.client_id.as_str()),
            ("scope", scope.as_str()),
            ("redirect_uri", self.redirect_uri.as_str()),
            ("state", state),
            ("code_challenge_method", "S256"),
            ("code_challenge", code_challenge),
        ];

        Url::parse_with_params(&format!("{}/authorize", self.accounts_url), &params)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Invalid authorize URL: {}", e)))
    }

    /// Completes an authorization from the redirect parameters. Failures are also broadcast so
    /// the front end can report them.
    pub async fn handle_callback(&self, params: CallbackParams) -> Result<CallbackOutcome> {
        let result = self.complete_callback(params).await;
        if result.is_err() {
            let authenticated = self.is_authenticated().await;
            self.send_event(AuthEvent {
                authenticated,
                failed: true,
            });
        }
        result
    }

    async fn complete_callback(&self, params: CallbackParams) -> Result<CallbackOutcome> {
        if let Some(error) = params.error {
            tracing::error!("Authorization error from provider: {}", error);
            self.clear_pending();
            self.settle_state().await;
            return Err(AppError::AuthorizationDenied(error));
        }

        let (code, state) = match (params.code, params.state) {
            (Some(code), Some(state)) => (code, state),
            _ => {
                tracing::debug!("Callback without code or state; ignoring");
                return Ok(CallbackOutcome::Ignored);
            }
        };

        let stored_state = self.transient.get(STATE_KEY);
        if stored_state.as_deref() != Some(state.as_str()) {
            tracing::error!("State mismatch on authorization callback");
            return Err(AppError::AuthStateMismatch);
        }

        self.exchange_code_for_token(&code).await.map_err(|e| {
            tracing::error!("Token exchange failed: {}", e);
            e
        })?;

        Ok(CallbackOutcome::Authenticated)
    }

    pub async fn exchange_code_for_token(&self, code: &str) -> Result<()> {
        let code_verifier = self
            .transient
            .get(CODE_VERIFIER_KEY)
            .ok_or(AppError::MissingCodeVerifier)?;

        let form = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.redirect_uri.as_str()),
            ("client_id", self.client_id.as_str()),
            ("code_verifier", code_verifier.as_str()),
        ];

        let tokens = match self.post_token_form(&form).await {
            Ok(tokens) => tokens,
            Err(e) => {
                self.settle_state().await;
                return Err(match e {
                    AppError::RequestFailed { status } => AppError::TokenExchangeFailed { status },
                    other => other,
                });
            }
        };

        self.set_tokens(tokens).await?;
        self.clear_pending();

        Ok(())
    }

    /// Returns a token, refreshing first when it expires within the refresh window.
    pub async fn get_access_token(&self) -> Option<String> {
        let needs_refresh = {
            let session = self.session.read().await;
            session.access_token.as_ref()?;
            session.needs_refresh_at(now_ms())
        };

        if needs_refresh {
            tracing::debug!("Access token expired or about to expire; refreshing");
            self.refresh_access_token().await;
        }

        self.session.read().await.access_token.clone()
    }

    /// Single refresh attempt. Any failure ends the session.
    pub async fn refresh_access_token(&self) -> bool {
        let refresh_token = self.session.read().await.refresh_token.clone();
        let Some(refresh_token) = refresh_token else {
            tracing::warn!("No refresh token available; logging out");
            self.logout().await;
            return false;
        };

        *self.state.write().await = AuthState::Refreshing;

        match self.try_refresh(&refresh_token).await {
            Ok(()) => {
                tracing::info!("Access token refreshed");
                true
            }
            Err(e) => {
                tracing::error!("{}", e);
                self.logout().await;
                false
            }
        }
    }

    async fn try_refresh(&self, refresh_token: &str) -> Result<()> {
        let form = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", self.client_id.as_str()),
        ];

        let tokens = self
            .post_token_form(&form)
            .await
            .map_err(|e| AppError::RefreshFailed(e.to_string()))?;

        self.set_tokens(tokens).await
    }

    pub async fn logout(&self) {
        *self.session.write().await = Session::default();

        for key in [ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, EXPIRES_AT_KEY] {
            if let Err(e) = self.durable.remove(key) {
                tracing::error!("Failed to remove {} from storage: {}", key, e);
            }
        }

        *self.state.write().await = AuthState::LoggedOut;
        tracing::info!("Logged out");
        self.notify(false);
    }

    pub async fn is_authenticated(&self) -> bool {
        self.session.read().await.is_authenticated_at(now_ms())
    }

    async fn post_token_form(&self, form: &[(&str, &str)]) -> Result<TokenResponse> {
        let response = self
            .client
            .post(format!("{}/api/token", self.accounts_url))
            .form(form)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!("Token endpoint error: {} - {}", status, body);
            return Err(AppError::RequestFailed {
                status: status.as_u16(),
            });
        }

        Ok(response.json().await?)
    }

    /// Stores a token response. A missing refresh token keeps the one already held.
    async fn set_tokens(&self, tokens: TokenResponse) -> Result<()> {
        let expires_at_ms = now_ms().saturating_add(tokens.expires_in.saturating_mul(1000));

        {
            let mut session = self.session.write().await;
            session.access_token = Some(tokens.access_token);
            if let Some(refresh_token) = tokens.refresh_token {
                session.refresh_token = Some(refresh_token);
            }
            session.expires_at_ms = Some(expires_at_ms);

            if let Some(access_token) = &session.access_token {
                self.durable.set(ACCESS_TOKEN_KEY, access_token)?;
            }
            if let Some(refresh_token) = &session.refresh_token {
                self.durable.set(REFRESH_TOKEN_KEY, refresh_token)?;
            }
            self.durable.set(EXPIRES_AT_KEY, &expires_at_ms.to_string())?;
        }

        *self.state.write().await = AuthState::LoggedIn;
        self.notify(true);

        Ok(())
    }

    fn clear_pending(&self) {
        for key in [CODE_VERIFIER_KEY, STATE_KEY] {
            if let Err(e) = self.transient.remove(key) {
                tracing::error!("Failed to remove {} from storage: {}", key, e);
            }
        }
    }

    /// Leaves `AwaitingCallback` for whatever the stored session supports.
    async fn settle_state(&self) {
        let authenticated = self.is_authenticated().await;
        *self.state.write().await = if authenticated {
            AuthState::LoggedIn
        } else {
            AuthState::LoggedOut
        };
    }

    fn notify(&self, authenticated: bool) {
        self.send_event(AuthEvent {
            authenticated,
            failed: false,
        });
    }

    fn send_event(&self, event: AuthEvent) {
        if self.events.send(event).is_err() {
            tracing::trace!("No auth subscribers");
        }
    }
}
