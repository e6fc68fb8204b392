use base64::{Engine, engine::general_purpose::STANDARD};
use reqwest::Url;

use super::{SpotifyClient, SpotifyError, parse_response};
use crate::types::{SpotifyProfile, SpotifyToken};

impl SpotifyClient {
    /// Builds the Spotify authorization URL for the authorization code flow.
    ///
    /// # Arguments
    ///
    /// * `state` - CSRF state echoed back to the callback; the account-linking
    ///   flow prefixes it with `link:`
    ///
    /// The consent dialog is always shown so that users can switch Spotify
    /// accounts.
    ///
    /// # Example
    ///
    /// ```
    /// let url = spotify.authorization_url(&utils::generate_state(secret))?;
    /// // https://accounts.spotify.com/authorize?client_id=...&response_type=code&...
    /// ```
    pub fn authorization_url(&self, state: &str) -> Result<String, SpotifyError> {
        let cfg = &self.config;
        let url = Url::parse_with_params(
            &cfg.auth_url,
            &[
                ("client_id", cfg.client_id.as_str()),
                ("response_type", "code"),
                ("redirect_uri", cfg.redirect_uri.as_str()),
                ("scope", cfg.scope.as_str()),
                ("state", state),
                ("show_dialog", "true"),
            ],
        )
        .map_err(|e| SpotifyError::Config(format!("SPOTIFY_API_AUTH_URL: {e}")))?;
        Ok(url.to_string())
    }

    fn basic_auth(&self) -> String {
        let raw = format!("{}:{}", self.config.client_id, self.config.client_secret);
        format!("Basic {}", STANDARD.encode(raw))
    }

    /// Exchanges an authorization code for user tokens.
    ///
    /// # Errors
    ///
    /// Returns [`SpotifyError::Api`] with the accounts service's
    /// `error_description` for an invalid or reused code.
    pub async fn exchange_code(&self, code: &str) -> Result<SpotifyToken, SpotifyError> {
        let res = self
            .http
            .post(&self.config.token_url)
            .header(reqwest::header::AUTHORIZATION, self.basic_auth())
            .form(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", self.config.redirect_uri.as_str()),
            ])
            .send()
            .await?;

        parse_response(res).await
    }

    /// Refreshes a user access token.
    ///
    /// Spotify may or may not rotate the refresh token; when it does not,
    /// `refresh_token` in the result is `None` and the stored one stays valid.
    pub async fn refresh_access_token(
        &self,
        refresh_token: &str,
    ) -> Result<SpotifyToken, SpotifyError> {
        let res = self
            .http
            .post(&self.config.token_url)
            .header(reqwest::header::AUTHORIZATION, self.basic_auth())
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
            ])
            .send()
            .await?;

        parse_response(res).await
    }

    /// Requests an application token with the client credentials grant.
    pub(crate) async fn client_credentials(&self) -> Result<SpotifyToken, SpotifyError> {
        let res = self
            .http
            .post(&self.config.token_url)
            .header(reqwest::header::AUTHORIZATION, self.basic_auth())
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?;

        parse_response(res).await
    }

    /// Fetches the profile of the user owning `access_token` (`GET /me`).
    pub async fn current_user(&self, access_token: &str) -> Result<SpotifyProfile, SpotifyError> {
        let res = self
            .http
            .get(self.api_url("/me"))
            .bearer_auth(access_token)
            .send()
            .await?;

        parse_response(res).await
    }
}
