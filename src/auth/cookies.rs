use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use time::Duration;

use super::claims::SessionScope;
use crate::config::AppConfig;

const ALL_SCOPES: [SessionScope; 3] = [
    SessionScope::User,
    SessionScope::Admin,
    SessionScope::Organization,
];

fn same_site(scope: SessionScope) -> SameSite {
    match scope {
        SessionScope::User => SameSite::Lax,
        SessionScope::Admin | SessionScope::Organization => SameSite::Strict,
    }
}

pub fn session_cookie(config: &AppConfig, scope: SessionScope, token: String) -> Cookie<'static> {
    Cookie::build((scope.cookie_name(), token))
        .path("/")
        .http_only(true)
        .secure(config.cookie_secure)
        .same_site(same_site(scope))
        .max_age(Duration::days(config.jwt.session_ttl_days))
        .build()
}

/// Expires every session cookie. Removal cookies are added outright, so they are sent even
/// when the request carried none of them.
pub fn clear_sessions(config: &AppConfig, jar: CookieJar) -> CookieJar {
    ALL_SCOPES.into_iter().fold(jar, |jar, scope| {
        let mut cookie = session_cookie(config, scope, String::new());
        cookie.make_removal();
        jar.add(cookie)
    })
}
