use eyre::{eyre, Report};
use secrecy::SecretString;
use std::env;

pub const MIN_JWT_SECRET_LEN: usize = 32;

/// Verification parameters for tokens issued by the auth layer.
#[derive(Clone, Debug)]
pub struct JWTInfo {
    pub jwt_secret: SecretString,
    pub jwt_issuer: String,
    pub jwt_audience: String,
}

impl JWTInfo {
    pub fn new() -> Result<JWTInfo, Report> {
        let jwt_secret =
            env::var("JWT_SECRET").map_err(|_| eyre!("JWT_SECRET must be set"))?;

        if jwt_secret.len() < MIN_JWT_SECRET_LEN {
            return Err(eyre!(
                "JWT_SECRET must be at least {} characters long",
                MIN_JWT_SECRET_LEN
            ));
        }

        Ok(Self {
            jwt_secret: SecretString::new(jwt_secret.into()),
            jwt_issuer: env::var("ISSUER")
                .map_err(|e| eyre!("ISSUER environment variable not set: {}", e))?,
            jwt_audience: env::var("AUDIENCE")
                .map_err(|e| eyre!("AUDIENCE environment variable not set: {}", e))?,
        })
    }
}
