use std::{fs, io::ErrorKind, path::PathBuf};

use super::ClientError;

/// Bearer credential for one logged-in user. Created by a successful login,
/// passed to every API call, and invalidated on logout or a 401.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    token: Option<String>,
}

impl Session {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn is_active(&self) -> bool {
        self.token.is_some()
    }

    pub fn invalidate(&mut self) {
        self.token = None;
    }
}

/// Keeps the token between CLI invocations. Removing the file forces a new login.
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn load(&self) -> Result<Session, ClientError> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => {
                let token = raw.trim();
                if token.is_empty() {
                    Ok(Session::anonymous())
                } else {
                    Ok(Session::new(token))
                }
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Session::anonymous()),
            Err(e) => Err(e.into()),
        }
    }

    /// Writes an active session; an invalidated one clears the file instead.
    pub fn save(&self, session: &Session) -> Result<(), ClientError> {
        match session.token() {
            Some(token) => {
                fs::write(&self.path, token)?;
                log::debug!("Token saved to {}", self.path.display());
                Ok(())
            }
            None => self.clear(),
        }
    }

    pub fn clear(&self) -> Result<(), ClientError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
