use std::{env, path::PathBuf};

use crate::errors::AppError;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://expense_tracker.db";
pub const DEFAULT_API_URL: &str = "http://localhost:5000";
pub const DEFAULT_TOKEN_FILE: &str = ".expense_token";

/// Server settings read from the environment (after `dotenvy` has loaded `.env`).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub database_url: String,
    pub jwt_secret: String,
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let jwt_secret =
            env::var("JWT_SECRET").map_err(|e| AppError::EnvVarError("JWT_SECRET", e))?;
        if jwt_secret.is_empty() {
            return Err(AppError::Validation("JWT_SECRET must not be empty".into()));
        }
        let port = match env::var("PORT") {
            Ok(raw) => raw
                .parse()
                .map_err(|_| AppError::Validation(format!("PORT is not a valid port: {}", raw)))?,
            Err(_) => 5000,
        };
        Ok(Self {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_owned()),
            jwt_secret,
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_owned()),
            port,
        })
    }
}

/// Where the terminal client talks to and keeps its token.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_url: String,
    pub token_file: PathBuf,
}

impl ClientConfig {
    pub fn from_env() -> Self {
        Self {
            api_url: env::var("EXPENSE_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_owned()),
            token_file: env::var("EXPENSE_TOKEN_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_TOKEN_FILE)),
        }
    }
}
