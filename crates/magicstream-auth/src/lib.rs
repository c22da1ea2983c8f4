//! MagicStream Auth: signed token codec, credential issuance,
//! request authentication and the session lifecycle (login, refresh,
//! logout).

pub mod clock;
pub mod config;
pub mod context;
pub mod error;
pub mod gate;
pub mod issuer;
pub mod password;
pub mod service;
pub mod token;

pub use config::{AuthConfig, RevocationMode, SigningSecret};
pub use context::OpContext;
pub use error::{AuthError, Outcome};
pub use gate::{AuthenticatedUser, AuthenticationGate};
pub use issuer::{CredentialIssuer, TokenPair};
pub use service::{LoginInput, LoginOutput, RegisterInput, SessionLifecycleService};
pub use token::Claims;
