/// Application name
pub const APP_NAME: &str = "OfferApp";

/// A post expires as soon as its total score drops below this value.
pub const EXPIRY_SCORE_THRESHOLD: i64 = -15;

/// Active posts older than this are flipped to expired by the sweep.
pub const POST_MAX_AGE_DAYS: i64 = 30;

/// Posts fetched per feed page
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Minimum password length accepted at sign-up
pub const MIN_PASSWORD_LEN: usize = 6;

/// Password reset tickets are valid for this long
pub const PASSWORD_RESET_TTL_MINUTES: i64 = 60;

/// Store name used when the author leaves it blank
pub const UNKNOWN_STORE: &str = "desconocido";

/// Maximum uploaded image size in bytes (10 MiB)
pub const MAX_IMAGE_SIZE: usize = 10 * 1024 * 1024;

/// Attempts for a vote transaction before giving up on a busy database
pub const MAX_VOTE_TX_ATTEMPTS: u32 = 5;

/// Local notification channel for post pushes
pub const NOTIFICATION_CHANNEL_ID: &str = "post_notifications";
pub const NOTIFICATION_CHANNEL_NAME: &str = "Notificaciones de Posts";
pub const DEFAULT_NOTIFICATION_TITLE: &str = "Nuevo Post";
pub const DEFAULT_NOTIFICATION_BODY: &str = "Alguien que sigues ha publicado una oferta.";
