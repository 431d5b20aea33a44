/// Maximum username length.
pub const USERNAME_MAX_LEN: usize = 150;

/// Maximum email length.
pub const EMAIL_MAX_LEN: usize = 254;

/// Maximum name length for titles, genres and categories.
pub const NAME_MAX_LEN: usize = 256;

/// Username reserved for the self-profile route.
pub const RESERVED_USERNAME: &str = "me";

/// Inclusive review score bounds.
pub const SCORE_MIN: i16 = 1;
pub const SCORE_MAX: i16 = 10;
