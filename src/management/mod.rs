pub mod accounts;
pub mod history;
pub mod music;
pub mod password_reset;
pub mod playlists;
pub mod spotify_link;

pub use accounts::AccountManager;
pub use history::{HistoryManager, PageRequest};
pub use music::RecommendationManager;
pub use password_reset::PasswordResetManager;
pub use playlists::SpotifyPlaylistManager;
pub use spotify_link::SpotifyLinkManager;
