//! Registration and sign-in workflows.
//!
//! Sign-up runs the validator first and only contacts the identity provider
//! when the form is acceptable. A created account is followed by a profile
//! document keyed by the new uid.

use crate::accounts::{AuthError, IdentityProvider};
use crate::audit::AuditLog;
use crate::profiles::{ProfileStore, UserProfile};
use crate::validation::{SignUpError, SignUpForm};
use anyhow::{anyhow, Result};

/// Result of a sign-up attempt that reached a decision
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignUpOutcome {
    /// The form failed validation; nothing was submitted
    Rejected(SignUpError),
    Created(UserProfile),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginError {
    MissingCredentials,
    MissingEmail,
}

impl std::fmt::Display for LoginError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingCredentials => write!(f, "Please enter email and password"),
            Self::MissingEmail => write!(f, "Enter your email first"),
        }
    }
}

impl std::error::Error for LoginError {}

/// Email and password entered on the login form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

impl LoginForm {
    pub fn new(email: &str, password: &str) -> Self {
        Self {
            email: email.trim().to_string(),
            password: password.trim().to_string(),
        }
    }

    pub fn validate(&self) -> Option<LoginError> {
        if self.email.trim().is_empty() || self.password.trim().is_empty() {
            Some(LoginError::MissingCredentials)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignInOutcome {
    Rejected(LoginError),
    Failed(AuthError),
    SignedIn(String),
}

/// Result of a password reset request or confirmation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResetOutcome {
    Rejected(LoginError),
    Failed(AuthError),
    /// Reset code issued; `None` once the new password is set
    Done(Option<String>),
}

/// Ties the identity provider, profile store and audit log together
pub struct Registration<'a, I, S> {
    identity: &'a mut I,
    profiles: &'a mut S,
    audit: Option<&'a mut AuditLog>,
}

impl<'a, I: IdentityProvider, S: ProfileStore> Registration<'a, I, S> {
    pub fn new(identity: &'a mut I, profiles: &'a mut S) -> Self {
        Self {
            identity,
            profiles,
            audit: None,
        }
    }

    pub fn with_audit(mut self, audit: &'a mut AuditLog) -> Self {
        self.audit = Some(audit);
        self
    }

    fn record(&mut self, f: impl FnOnce(&mut AuditLog) -> Result<()>) {
        if let Some(audit) = self.audit.as_deref_mut() {
            if let Err(e) = f(audit) {
                eprintln!("Warning: failed to write audit event: {}", e);
            }
        }
    }

    /// Validate the form, create the account and write its profile
    pub fn sign_up(&mut self, form: &SignUpForm) -> Result<SignUpOutcome> {
        if let Some(err) = form.validate() {
            self.record(|a| a.signup_rejected(&form.email, err.as_str()));
            return Ok(SignUpOutcome::Rejected(err));
        }

        let uid = match self.identity.create_account(&form.email, &form.password) {
            Ok(uid) => uid,
            Err(e) => {
                self.record(|a| a.account_failed(&form.email, &e.to_string()));
                return Err(anyhow!(e).context("Sign up failed"));
            }
        };
        self.record(|a| a.account_created(&uid, &form.email));

        let profile = UserProfile::new(&uid, &form.email, &form.display_name);
        if let Err(e) = self.profiles.put_profile(&profile) {
            self.record(|a| a.profile_failed(&uid, &e.to_string()));
            return Err(e.context("Profile store error"));
        }
        self.record(|a| a.profile_written(&uid));

        Ok(SignUpOutcome::Created(profile))
    }

    /// Check the login form and verify credentials with the identity provider
    pub fn sign_in(&mut self, form: &LoginForm) -> SignInOutcome {
        if let Some(err) = form.validate() {
            return SignInOutcome::Rejected(err);
        }

        match self.identity.sign_in(&form.email, &form.password) {
            Ok(uid) => {
                self.record(|a| a.sign_in(&form.email, Some(&uid), None));
                SignInOutcome::SignedIn(uid)
            }
            Err(e) => {
                self.record(|a| a.sign_in(&form.email, None, Some(&e.to_string())));
                SignInOutcome::Failed(e)
            }
        }
    }

    /// Start a password reset for the email on the login form
    pub fn request_password_reset(&mut self, email: &str) -> ResetOutcome {
        let email = email.trim();
        if email.is_empty() {
            return ResetOutcome::Rejected(LoginError::MissingEmail);
        }

        let result = self.identity.request_password_reset(email);
        let error = result.as_ref().err().map(|e| e.to_string());
        self.record(|a| a.password_reset_requested(email, error.as_deref()));
        match result {
            Ok(code) => ResetOutcome::Done(Some(code)),
            Err(e) => ResetOutcome::Failed(e),
        }
    }

    /// Finish a password reset with the issued code
    pub fn confirm_password_reset(
        &mut self,
        email: &str,
        code: &str,
        new_password: &str,
    ) -> ResetOutcome {
        let email = email.trim();
        if email.is_empty() {
            return ResetOutcome::Rejected(LoginError::MissingEmail);
        }
        if code.trim().is_empty() || new_password.trim().is_empty() {
            return ResetOutcome::Rejected(LoginError::MissingCredentials);
        }

        let result = self
            .identity
            .confirm_password_reset(email, code.trim(), new_password.trim());
        let error = result.as_ref().err().map(|e| e.to_string());
        self.record(|a| a.password_reset_confirmed(email, error.as_deref()));
        match result {
            Ok(()) => ResetOutcome::Done(None),
            Err(e) => ResetOutcome::Failed(e),
        }
    }

    pub fn profile(&self, uid: &str) -> Result<Option<UserProfile>> {
        self.profiles.get_profile(uid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[derive(Default)]
    struct MockIdentity {
        accounts: HashMap<String, (String, String)>,
        calls: usize,
    }

    impl IdentityProvider for MockIdentity {
        fn create_account(&mut self, email: &str, password: &str) -> Result<String, AuthError> {
            self.calls += 1;
            if self.accounts.contains_key(email) {
                return Err(AuthError::EmailAlreadyInUse);
            }
            let uid = format!("uid-{}", self.accounts.len() + 1);
            self.accounts
                .insert(email.to_string(), (uid.clone(), password.to_string()));
            Ok(uid)
        }

        fn sign_in(&self, email: &str, password: &str) -> Result<String, AuthError> {
            match self.accounts.get(email) {
                Some((uid, pw)) if pw == password => Ok(uid.clone()),
                _ => Err(AuthError::InvalidCredentials),
            }
        }

        fn request_password_reset(&mut self, email: &str) -> Result<String, AuthError> {
            if !self.accounts.contains_key(email) {
                return Err(AuthError::UserNotFound);
            }
            Ok(format!("code-{}", email))
        }

        fn confirm_password_reset(
            &mut self,
            email: &str,
            code: &str,
            new_password: &str,
        ) -> Result<(), AuthError> {
            if code != format!("code-{}", email) {
                return Err(AuthError::InvalidResetCode);
            }
            match self.accounts.get_mut(email) {
                Some((_, pw)) => {
                    *pw = new_password.to_string();
                    Ok(())
                }
                None => Err(AuthError::InvalidResetCode),
            }
        }
    }

    #[derive(Default)]
    struct MockStore {
        docs: HashMap<String, UserProfile>,
        fail: bool,
    }

    impl ProfileStore for MockStore {
        fn put_profile(&mut self, profile: &UserProfile) -> Result<()> {
            if self.fail {
                anyhow::bail!("store offline");
            }
            self.docs.insert(profile.uid.clone(), profile.clone());
            Ok(())
        }

        fn get_profile(&self, uid: &str) -> Result<Option<UserProfile>> {
            Ok(self.docs.get(uid).cloned())
        }
    }

    #[test]
    fn test_rejected_form_submits_nothing() {
        let mut identity = MockIdentity::default();
        let mut store = MockStore::default();
        let mut reg = Registration::new(&mut identity, &mut store);

        let form = SignUpForm::new("test", "user", "123456", "123456");
        let outcome = reg.sign_up(&form).unwrap();
        assert_eq!(outcome, SignUpOutcome::Rejected(SignUpError::InvalidEmail));

        drop(reg);
        assert_eq!(identity.calls, 0);
        assert!(store.docs.is_empty());
    }

    #[test]
    fn test_successful_sign_up_writes_profile() {
        let mut identity = MockIdentity::default();
        let mut store = MockStore::default();
        let mut reg = Registration::new(&mut identity, &mut store);

        let form = SignUpForm::new(" test@gmail.com", "user ", "123456", "123456");
        let SignUpOutcome::Created(profile) = reg.sign_up(&form).unwrap() else {
            panic!("expected account to be created");
        };
        assert_eq!(profile.uid, "uid-1");
        assert_eq!(profile.email, "test@gmail.com");
        assert_eq!(profile.username, "user");
        assert!(profile.created_at > 0);
        assert_eq!(reg.profile("uid-1").unwrap(), Some(profile));
    }

    #[test]
    fn test_provider_error_is_reported() {
        let mut identity = MockIdentity::default();
        let mut store = MockStore::default();
        let mut reg = Registration::new(&mut identity, &mut store);

        let form = SignUpForm::new("test@gmail.com", "user", "123456", "123456");
        reg.sign_up(&form).unwrap();
        let err = reg.sign_up(&form).unwrap_err();
        assert!(err.to_string().contains("Sign up failed"));
        assert_eq!(
            err.downcast_ref::<AuthError>(),
            Some(&AuthError::EmailAlreadyInUse)
        );
    }

    #[test]
    fn test_store_error_is_reported() {
        let mut identity = MockIdentity::default();
        let mut store = MockStore {
            fail: true,
            ..Default::default()
        };
        let mut reg = Registration::new(&mut identity, &mut store);

        let form = SignUpForm::new("test@gmail.com", "user", "123456", "123456");
        let err = reg.sign_up(&form).unwrap_err();
        assert!(err.to_string().contains("Profile store error"));
    }

    #[test]
    fn test_sign_in() {
        let mut identity = MockIdentity::default();
        let mut store = MockStore::default();
        let mut reg = Registration::new(&mut identity, &mut store);

        reg.sign_up(&SignUpForm::new("a@b.co", "user", "123456", "123456"))
            .unwrap();

        assert_eq!(
            reg.sign_in(&LoginForm::new("a@b.co", "123456")),
            SignInOutcome::SignedIn("uid-1".to_string())
        );
        assert_eq!(
            reg.sign_in(&LoginForm::new("a@b.co", "nope")),
            SignInOutcome::Failed(AuthError::InvalidCredentials)
        );
        assert_eq!(
            reg.sign_in(&LoginForm::new("  ", "123456")),
            SignInOutcome::Rejected(LoginError::MissingCredentials)
        );
        assert_eq!(
            LoginError::MissingCredentials.to_string(),
            "Please enter email and password"
        );
    }

    #[test]
    fn test_password_reset_requires_email() {
        let mut identity = MockIdentity::default();
        let mut store = MockStore::default();
        let mut reg = Registration::new(&mut identity, &mut store);

        assert_eq!(
            reg.request_password_reset("   "),
            ResetOutcome::Rejected(LoginError::MissingEmail)
        );
        assert_eq!(LoginError::MissingEmail.to_string(), "Enter your email first");
        assert_eq!(
            reg.request_password_reset("nobody@b.co"),
            ResetOutcome::Failed(AuthError::UserNotFound)
        );
    }

    #[test]
    fn test_password_reset_flow() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("audit.jsonl");
        let mut audit = AuditLog::new(&path, "s").unwrap();
        let mut identity = MockIdentity::default();
        let mut store = MockStore::default();
        let mut reg = Registration::new(&mut identity, &mut store).with_audit(&mut audit);

        reg.sign_up(&SignUpForm::new("a@b.co", "user", "123456", "123456"))
            .unwrap();

        let ResetOutcome::Done(Some(code)) = reg.request_password_reset(" a@b.co ") else {
            panic!("expected a reset code");
        };
        assert_eq!(
            reg.confirm_password_reset("a@b.co", "bogus", "abcdef"),
            ResetOutcome::Failed(AuthError::InvalidResetCode)
        );
        assert_eq!(
            reg.confirm_password_reset("a@b.co", &code, ""),
            ResetOutcome::Rejected(LoginError::MissingCredentials)
        );
        assert_eq!(
            reg.confirm_password_reset("a@b.co", &code, "abcdef"),
            ResetOutcome::Done(None)
        );
        assert_eq!(
            reg.sign_in(&LoginForm::new("a@b.co", "abcdef")),
            SignInOutcome::SignedIn("uid-1".to_string())
        );
        drop(reg);

        let events: Vec<serde_json::Value> = std::fs::read_to_string(&path)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        let requested: Vec<_> = events
            .iter()
            .filter(|e| e["type"] == "password_reset_requested")
            .collect();
        assert_eq!(requested.len(), 1);
        assert_eq!(requested[0]["ok"], true);
        let confirmed: Vec<_> = events
            .iter()
            .filter(|e| e["type"] == "password_reset_confirmed")
            .collect();
        assert_eq!(confirmed.len(), 2);
        assert_eq!(confirmed[0]["ok"], false);
        assert_eq!(confirmed[1]["ok"], true);
    }

    #[test]
    fn test_audit_trail() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("audit.jsonl");
        let mut audit = AuditLog::new(&path, "s").unwrap();
        let mut identity = MockIdentity::default();
        let mut store = MockStore::default();

        {
            let mut reg = Registration::new(&mut identity, &mut store).with_audit(&mut audit);
            reg.sign_up(&SignUpForm::new("", "user", "1", "1")).unwrap();
            reg.sign_up(&SignUpForm::new("a@b.co", "user", "123456", "123456"))
                .unwrap();
        }

        let types: Vec<String> = std::fs::read_to_string(&path)
            .unwrap()
            .lines()
            .map(|l| {
                let v: serde_json::Value = serde_json::from_str(l).unwrap();
                v["type"].as_str().unwrap().to_string()
            })
            .collect();
        assert_eq!(
            types,
            vec!["signup_rejected", "account_created", "profile_written"]
        );
    }
}
