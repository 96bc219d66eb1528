//! Identity provider: account creation and password sign-in.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Shortest password the provider will accept
pub const MIN_PASSWORD_LEN: usize = 6;

/// Why the identity provider refused a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    EmailAlreadyInUse,
    WeakPassword,
    InvalidCredentials,
    UserNotFound,
    InvalidResetCode,
    Storage(String),
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmailAlreadyInUse => {
                write!(f, "The email address is already in use by another account")
            }
            Self::WeakPassword => write!(
                f,
                "Password should be at least {} characters",
                MIN_PASSWORD_LEN
            ),
            Self::InvalidCredentials => write!(f, "The email or password is incorrect"),
            Self::UserNotFound => write!(f, "There is no user record corresponding to this email"),
            Self::InvalidResetCode => write!(f, "The password reset code is invalid or expired"),
            Self::Storage(msg) => write!(f, "Account storage error: {}", msg),
        }
    }
}

impl std::error::Error for AuthError {}

/// Creates accounts and verifies credentials
pub trait IdentityProvider {
    /// Create an account and return its uid
    fn create_account(&mut self, email: &str, password: &str) -> Result<String, AuthError>;

    /// Verify credentials and return the account's uid
    fn sign_in(&self, email: &str, password: &str) -> Result<String, AuthError>;

    /// Issue a one-time reset code for the account, delivered out of band
    fn request_password_reset(&mut self, email: &str) -> Result<String, AuthError>;

    /// Replace the password using a code from `request_password_reset`
    fn confirm_password_reset(
        &mut self,
        email: &str,
        code: &str,
        new_password: &str,
    ) -> Result<(), AuthError>;
}

/// A stored account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub uid: String,
    pub email: String,
    pub password_hash: String,
    pub salt: String,
    pub created_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reset_code: Option<String>,
}

fn hash_password(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

impl Account {
    fn new(email: &str, password: &str) -> Self {
        let salt = uuid::Uuid::new_v4().simple().to_string();
        Self {
            uid: uuid::Uuid::new_v4().to_string(),
            email: email.to_lowercase(),
            password_hash: hash_password(&salt, password),
            salt,
            created_at: chrono::Utc::now().timestamp_millis(),
            reset_code: None,
        }
    }

    fn set_password(&mut self, password: &str) {
        self.salt = uuid::Uuid::new_v4().simple().to_string();
        self.password_hash = hash_password(&self.salt, password);
    }

    fn check_password(&self, password: &str) -> bool {
        hash_password(&self.salt, password) == self.password_hash
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct AccountsFile {
    #[serde(default)]
    accounts: BTreeMap<String, Account>,
}

/// Identity provider persisted as a single JSON file, keyed by lowercased email
pub struct FileIdentityProvider {
    path: PathBuf,
    data: AccountsFile,
}

impl FileIdentityProvider {
    /// Open the accounts file, treating a missing file as empty
    pub fn open(path: &Path) -> Result<Self> {
        let data = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            serde_json::from_str(&content)
                .with_context(|| format!("parsing {}", path.display()))?
        } else {
            AccountsFile::default()
        };

        Ok(Self {
            path: path.to_path_buf(),
            data,
        })
    }

    pub fn len(&self) -> usize {
        self.data.accounts.len()
    }

    fn save_or_restore(&mut self, key: &str, previous: Option<Account>) -> Result<(), AuthError> {
        if let Err(e) = self.save() {
            match previous {
                Some(account) => self.data.accounts.insert(key.to_string(), account),
                None => self.data.accounts.remove(key),
            };
            return Err(AuthError::Storage(e.to_string()));
        }
        Ok(())
    }

    fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(&self.data)?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }
}

impl IdentityProvider for FileIdentityProvider {
    fn create_account(&mut self, email: &str, password: &str) -> Result<String, AuthError> {
        let key = email.to_lowercase();
        if self.data.accounts.contains_key(&key) {
            return Err(AuthError::EmailAlreadyInUse);
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::WeakPassword);
        }

        let account = Account::new(email, password);
        let uid = account.uid.clone();
        self.data.accounts.insert(key.clone(), account);
        self.save_or_restore(&key, None)?;
        Ok(uid)
    }

    fn sign_in(&self, email: &str, password: &str) -> Result<String, AuthError> {
        match self.data.accounts.get(&email.to_lowercase()) {
            Some(account) if account.check_password(password) => Ok(account.uid.clone()),
            _ => Err(AuthError::InvalidCredentials),
        }
    }

    fn request_password_reset(&mut self, email: &str) -> Result<String, AuthError> {
        let key = email.to_lowercase();
        let Some(account) = self.data.accounts.get_mut(&key) else {
            return Err(AuthError::UserNotFound);
        };
        let previous = account.clone();
        let code = uuid::Uuid::new_v4().simple().to_string();
        account.reset_code = Some(code.clone());
        self.save_or_restore(&key, Some(previous))?;
        Ok(code)
    }

    fn confirm_password_reset(
        &mut self,
        email: &str,
        code: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        let key = email.to_lowercase();
        let Some(account) = self.data.accounts.get_mut(&key) else {
            return Err(AuthError::InvalidResetCode);
        };
        if account.reset_code.as_deref() != Some(code) {
            return Err(AuthError::InvalidResetCode);
        }
        if new_password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::WeakPassword);
        }
        let previous = account.clone();
        account.set_password(new_password);
        account.reset_code = None;
        self.save_or_restore(&key, Some(previous))
    }
}
