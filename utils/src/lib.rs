#![cfg_attr(feature = "strict", deny(warnings))]

pub mod auth;
pub mod configuration_utils;
pub mod errors;

mod guards;
pub use guards::EnvVarGuard;

pub use auth::{
    CredentialProvider, Credentials, EnvCredentialProvider, RotatingCredentialProvider, StaticCredentialProvider,
};
pub use configuration_utils::ParsableConfigValue;
