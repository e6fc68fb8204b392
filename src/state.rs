use std::sync::Arc;

use sqlx::PgPool;

use crate::{
    config::AppConfig, emotion::EmotionDetector, mail::Mailer, spotify::SpotifyClient,
};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<AppConfig>,
    pub spotify: Arc<SpotifyClient>,
    pub detector: Arc<dyn EmotionDetector>,
    pub mailer: Arc<dyn Mailer>,
}

impl AppState {
    pub fn new(
        pool: PgPool,
        config: AppConfig,
        spotify: SpotifyClient,
        detector: Arc<dyn EmotionDetector>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        Self {
            pool,
            config: Arc::new(config),
            spotify: Arc::new(spotify),
            detector,
            mailer,
        }
    }

    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }
}
