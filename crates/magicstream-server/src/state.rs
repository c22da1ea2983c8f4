//! Shared application state.

use std::sync::Arc;
use std::time::Duration;

use magicstream_auth::{AuthenticationGate, OpContext, SessionLifecycleService};
use magicstream_core::repository::{SessionStore, UserRepository};

use crate::config::ServerConfig;
use crate::cookies::CookiePolicy;

pub struct AppState<U: UserRepository, S: SessionStore> {
    service: Arc<SessionLifecycleService<U, S>>,
    gate: AuthenticationGate,
    cookies: CookiePolicy,
    request_timeout: Duration,
}

// Derived Clone would require `U: Clone` and `S: Clone`.
impl<U: UserRepository, S: SessionStore> Clone for AppState<U, S> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            gate: self.gate.clone(),
            cookies: self.cookies.clone(),
            request_timeout: self.request_timeout,
        }
    }
}

impl<U: UserRepository, S: SessionStore> AppState<U, S> {
    pub fn new(service: SessionLifecycleService<U, S>, server: &ServerConfig) -> Self {
        let cookies = CookiePolicy::new(server.secure_cookies, service.config());
        Self {
            gate: service.gate(),
            service: Arc::new(service),
            cookies,
            request_timeout: server.request_timeout(),
        }
    }

    pub fn service(&self) -> &SessionLifecycleService<U, S> {
        &self.service
    }

    pub fn gate(&self) -> &AuthenticationGate {
        &self.gate
    }

    pub fn cookies(&self) -> &CookiePolicy {
        &self.cookies
    }

    /// A fresh context bounded by the request timeout.
    pub fn context(&self) -> OpContext {
        OpContext::with_timeout(self.request_timeout)
    }
}
