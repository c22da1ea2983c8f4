//! Session cookie transport.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use magicstream_auth::{AuthConfig, TokenPair};

pub const ACCESS_COOKIE: &str = "access_token";
pub const REFRESH_COOKIE: &str = "refresh_token";

#[derive(Debug, Clone)]
pub struct CookiePolicy {
    secure: bool,
    access_max_age: time::Duration,
    refresh_max_age: time::Duration,
}

impl CookiePolicy {
    pub fn new(secure: bool, auth: &AuthConfig) -> Self {
        Self {
            secure,
            access_max_age: max_age(auth.access_token_lifetime_secs),
            refresh_max_age: max_age(auth.refresh_token_lifetime_secs),
        }
    }

    fn cookie(&self, name: &'static str, value: String, max_age: time::Duration) -> Cookie<'static> {
        Cookie::build((name, value))
            .path("/")
            .http_only(true)
            .secure(self.secure)
            .same_site(SameSite::Strict)
            .max_age(max_age)
            .build()
    }

    /// Set both cookies to the new pair.
    pub fn store(&self, jar: CookieJar, tokens: &TokenPair) -> CookieJar {
        jar.add(self.cookie(ACCESS_COOKIE, tokens.access_token.clone(), self.access_max_age))
            .add(self.cookie(REFRESH_COOKIE, tokens.refresh_token.clone(), self.refresh_max_age))
    }

    /// Overwrite both cookies with empty, immediately expiring values.
    pub fn clear(&self, jar: CookieJar) -> CookieJar {
        jar.add(self.cookie(ACCESS_COOKIE, String::new(), time::Duration::ZERO))
            .add(self.cookie(REFRESH_COOKIE, String::new(), time::Duration::ZERO))
    }
}

fn max_age(secs: u64) -> time::Duration {
    time::Duration::seconds(i64::try_from(secs).unwrap_or(i64::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> CookiePolicy {
        CookiePolicy::new(true, &AuthConfig::default())
    }

    #[test]
    fn stored_cookies_carry_ttl_and_flags() {
        let tokens = TokenPair {
            access_token: "a".into(),
            refresh_token: "r".into(),
        };
        let jar = policy().store(CookieJar::new(), &tokens);

        let access = jar.get(ACCESS_COOKIE).unwrap();
        assert_eq!(access.value(), "a");
        assert_eq!(access.max_age(), Some(time::Duration::seconds(86_400)));
        assert_eq!(access.http_only(), Some(true));
        assert_eq!(access.secure(), Some(true));
        assert_eq!(access.same_site(), Some(SameSite::Strict));

        let refresh = jar.get(REFRESH_COOKIE).unwrap();
        assert_eq!(refresh.max_age(), Some(time::Duration::seconds(604_800)));
    }

    #[test]
    fn oversized_lifetime_does_not_wrap() {
        let auth = AuthConfig {
            refresh_token_lifetime_secs: u64::MAX,
            ..AuthConfig::default()
        };
        let policy = CookiePolicy::new(false, &auth);
        assert_eq!(policy.refresh_max_age, time::Duration::seconds(i64::MAX));
        assert!(policy.refresh_max_age.is_positive());
    }

    #[test]
    fn cleared_cookies_expire_immediately() {
        let jar = policy().clear(CookieJar::new());
        let access = jar.get(ACCESS_COOKIE).unwrap();
        assert_eq!(access.value(), "");
        assert_eq!(access.max_age(), Some(time::Duration::ZERO));
    }
}
