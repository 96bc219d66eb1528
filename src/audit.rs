use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Append-only JSONL log of sign-up and sign-in events
pub struct AuditLog {
    pub path: PathBuf,
    session_id: String,
    file: File,
}

#[derive(Serialize)]
struct Event<'a> {
    ts: DateTime<Utc>,
    session_id: &'a str,
    #[serde(rename = "type")]
    event_type: &'a str,
    #[serde(flatten)]
    data: serde_json::Value,
}

impl AuditLog {
    pub fn new(path: &Path, session_id: &str) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            path: path.to_path_buf(),
            session_id: session_id.to_string(),
            file,
        })
    }

    pub fn log(&mut self, event_type: &str, data: serde_json::Value) -> Result<()> {
        let event = Event {
            ts: Utc::now(),
            session_id: &self.session_id,
            event_type,
            data,
        };
        let line = serde_json::to_string(&event)?;
        writeln!(self.file, "{}", line)?;
        self.file.flush()?;
        Ok(())
    }

    pub fn signup_rejected(&mut self, email: &str, reason: &str) -> Result<()> {
        self.log(
            "signup_rejected",
            serde_json::json!({ "email": email, "reason": reason }),
        )
    }

    pub fn account_created(&mut self, uid: &str, email: &str) -> Result<()> {
        self.log(
            "account_created",
            serde_json::json!({ "uid": uid, "email": email }),
        )
    }

    pub fn account_failed(&mut self, email: &str, error: &str) -> Result<()> {
        self.log(
            "account_failed",
            serde_json::json!({ "email": email, "error": error }),
        )
    }

    pub fn profile_written(&mut self, uid: &str) -> Result<()> {
        self.log("profile_written", serde_json::json!({ "uid": uid }))
    }

    pub fn profile_failed(&mut self, uid: &str, error: &str) -> Result<()> {
        self.log(
            "profile_failed",
            serde_json::json!({ "uid": uid, "error": error }),
        )
    }

    /// Log a sign-in attempt; `uid` is set on success
    pub fn sign_in(&mut self, email: &str, uid: Option<&str>, error: Option<&str>) -> Result<()> {
        self.log(
            "sign_in",
            serde_json::json!({
                "email": email,
                "ok": uid.is_some(),
                "uid": uid,
                "error": error,
            }),
        )
    }

    /// Log a reset-code request; the code itself is never written
    pub fn password_reset_requested(&mut self, email: &str, error: Option<&str>) -> Result<()> {
        self.log(
            "password_reset_requested",
            serde_json::json!({ "email": email, "ok": error.is_none(), "error": error }),
        )
    }

    pub fn password_reset_confirmed(&mut self, email: &str, error: Option<&str>) -> Result<()> {
        self.log(
            "password_reset_confirmed",
            serde_json::json!({ "email": email, "ok": error.is_none(), "error": error }),
        )
    }
}
