use hmac::{Hmac, Mac};
use sea_orm::ActiveEnum;
use sha2::Sha256;

use crate::entities::users;

type HmacSha256 = Hmac<Sha256>;

/// Tolerated clock drift between code issue and verification, in seconds.
const CLOCK_SKEW_SECONDS: i64 = 60;

/// Issues and verifies confirmation codes without storing them.
///
/// A code is `"{timestamp_hex}.{hex(hmac)}"` where the MAC covers the
/// user's persisted identity fields plus the timestamp. Changing any bound
/// field (email, role, even the join date on re-creation) invalidates all
/// previously issued codes. A code is NOT invalidated by use; it stays
/// verifiable until it expires or the user record changes.
#[derive(Clone)]
pub struct ConfirmationCodeIssuer {
    secret: Vec<u8>,
    ttl_seconds: i64,
}

impl ConfirmationCodeIssuer {
    #[must_use]
    pub fn new(secret: &str, ttl_seconds: i64) -> Self {
        Self {
            secret: secret.as_bytes().to_vec(),
            ttl_seconds,
        }
    }

    #[must_use]
    pub fn make_code(&self, user: &users::Model) -> String {
        self.make_code_at(user, chrono::Utc::now().timestamp())
    }

    fn make_code_at(&self, user: &users::Model, issued_at: i64) -> String {
        let tag = self.tag(user, issued_at);
        format!("{issued_at:x}.{}", hex::encode(tag))
    }

    #[must_use]
    pub fn verify(&self, user: &users::Model, code: &str) -> bool {
        self.verify_at(user, code, chrono::Utc::now().timestamp())
    }

    fn verify_at(&self, user: &users::Model, code: &str, now: i64) -> bool {
        let Some((ts_hex, tag_hex)) = code.split_once('.') else {
            return false;
        };
        let Ok(issued_at) = i64::from_str_radix(ts_hex, 16) else {
            return false;
        };
        if issued_at > now + CLOCK_SKEW_SECONDS || now - issued_at > self.ttl_seconds {
            return false;
        }
        let Ok(tag) = hex::decode(tag_hex) else {
            return false;
        };

        let mut mac = self.mac();
        mac.update(Self::message(user, issued_at).as_bytes());
        mac.verify_slice(&tag).is_ok()
    }

    fn tag(&self, user: &users::Model, issued_at: i64) -> Vec<u8> {
        let mut mac = self.mac();
        mac.update(Self::message(user, issued_at).as_bytes());
        mac.finalize().into_bytes().to_vec()
    }

    fn mac(&self) -> HmacSha256 {
        HmacSha256::new_from_slice(&self.secret).expect("HMAC accepts keys of any length")
    }

    /// The user state a code is bound to.
    fn message(user: &users::Model, issued_at: i64) -> String {
        format!(
            "{}\n{}\n{}\n{}\n{}\n{issued_at}",
            user.id,
            user.username,
            user.email,
            user.role.to_value(),
            user.date_joined,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::users::Role;

    fn sample_user() -> users::Model {
        users::Model {
            id: 7,
            username: "bob".to_string(),
            email: "bob@example.com".to_string(),
            first_name: String::new(),
            last_name: String::new(),
            bio: String::new(),
            role: Role::User,
            is_superuser: false,
            date_joined: "2026-01-01T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn fresh_code_verifies() {
        let issuer = ConfirmationCodeIssuer::new("secret", 3600);
        let user = sample_user();
        let code = issuer.make_code(&user);
        assert!(issuer.verify(&user, code.as_str()));
    }

    #[test]
    fn code_survives_repeated_verification() {
        let issuer = ConfirmationCodeIssuer::new("secret", 3600);
        let user = sample_user();
        let code = issuer.make_code(&user);
        assert!(issuer.verify(&user, code.as_str()));
        assert!(issuer.verify(&user, code.as_str()));
    }

    #[test]
    fn tampered_code_fails() {
        let issuer = ConfirmationCodeIssuer::new("secret", 3600);
        let user = sample_user();
        let mut code = issuer.make_code(&user);
        code.pop();
        code.push('0');
        assert!(!issuer.verify(&user, code.as_str()));
        assert!(!issuer.verify(&user, "not-a-code"));
        assert!(!issuer.verify(&user, ""));
    }

    #[test]
    fn expired_code_fails() {
        let issuer = ConfirmationCodeIssuer::new("secret", 3600);
        let user = sample_user();
        let issued_at = 1_000_000;
        let code = issuer.make_code_at(&user, issued_at);
        assert!(issuer.verify_at(&user, &code, issued_at + 3599));
        assert!(!issuer.verify_at(&user, &code, issued_at + 3601));
    }

    #[test]
    fn code_from_the_future_fails() {
        let issuer = ConfirmationCodeIssuer::new("secret", 3600);
        let user = sample_user();
        let code = issuer.make_code_at(&user, 2_000_000);
        assert!(!issuer.verify_at(&user, &code, 1_000_000));
    }

    #[test]
    fn state_change_invalidates_code() {
        let issuer = ConfirmationCodeIssuer::new("secret", 3600);
        let user = sample_user();
        let code = issuer.make_code(&user);

        let mut changed = user.clone();
        changed.email = "new@example.com".to_string();
        assert!(!issuer.verify(&changed, code.as_str()));

        let mut promoted = user;
        promoted.role = Role::Admin;
        assert!(!issuer.verify(&promoted, code.as_str()));
    }

    #[test]
    fn different_secret_fails() {
        let issuer = ConfirmationCodeIssuer::new("secret", 3600);
        let other = ConfirmationCodeIssuer::new("other", 3600);
        let user = sample_user();
        let code = issuer.make_code(&user);
        assert!(!other.verify(&user, code.as_str()));
    }
}
