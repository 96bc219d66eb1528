mod accounts;
mod audit;
mod cli;
mod config;
mod profiles;
mod registration;
mod validation;

use anyhow::Result;
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "goshop", about = "GoShop account sign-up and sign-in")]
pub struct Args {
    #[arg(long, help = "Config file path")]
    pub config: Option<PathBuf>,

    #[arg(long, env = "GOSHOP_DATA_DIR", help = "Directory for accounts, profiles and audit log")]
    pub data_dir: Option<PathBuf>,

    #[arg(long, help = "Validate field text exactly as entered, without trimming")]
    pub no_trim: bool,

    #[arg(long, help = "Disable the audit log")]
    pub no_audit: bool,

    #[arg(long, help = "Verbose output (print each workflow step)")]
    pub verbose: bool,

    #[arg(long, help = "Debug output (print resolved settings)")]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Clone)]
pub enum Command {
    /// Check sign-up fields without creating an account
    Validate(SignUpFields),
    /// Create an account and its profile
    Signup(SignUpFields),
    /// Sign in with email and password
    Login {
        #[arg(long, default_value = "")]
        email: String,
        #[arg(long, default_value = "", env = "GOSHOP_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Send a password reset code
    ResetPassword {
        #[arg(long, default_value = "")]
        email: String,
    },
    /// Set a new password with a reset code
    ConfirmReset {
        #[arg(long, default_value = "")]
        email: String,
        #[arg(long, default_value = "")]
        code: String,
        #[arg(long, default_value = "", env = "GOSHOP_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Interactive prompt (default)
    Shell,
}

#[derive(ClapArgs, Clone)]
pub struct SignUpFields {
    #[arg(long, default_value = "")]
    pub email: String,
    #[arg(long, default_value = "")]
    pub name: String,
    #[arg(long, default_value = "")]
    pub password: String,
    #[arg(long, default_value = "")]
    pub confirm: String,
}

fn main() -> Result<ExitCode> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let mut cfg = if let Some(config_path) = &args.config {
        config::Config::load_from(config_path)?
    } else {
        config::Config::load()?
    };

    // CLI overrides
    if let Some(dir) = &args.data_dir {
        cfg.storage.data_dir = Some(dir.clone());
    }
    if args.no_trim {
        cfg.form.trim_inputs = Some(false);
    }
    if args.no_audit {
        cfg.audit.enabled = Some(false);
    }

    if let Err(errors) = cfg.validate() {
        for e in &errors {
            eprintln!("Config error {}", e);
        }
        return Err(anyhow::anyhow!(
            "Invalid configuration ({} error(s))",
            errors.len()
        ));
    }

    if args.debug {
        eprintln!("[DEBUG] Data dir: {}", cfg.data_dir().display());
        eprintln!("[DEBUG] Accounts: {}", cfg.accounts_path().display());
        eprintln!("[DEBUG] Trim inputs: {}", cfg.form.trim_inputs());
        eprintln!(
            "[DEBUG] Audit log: {}",
            if cfg.audit.enabled() {
                cfg.audit_path().display().to_string()
            } else {
                "disabled".to_string()
            }
        );
    }

    let session_id = uuid::Uuid::new_v4().to_string();
    let audit = if cfg.audit.enabled() {
        Some(audit::AuditLog::new(&cfg.audit_path(), &session_id)?)
    } else {
        None
    };

    let identity = accounts::FileIdentityProvider::open(&cfg.accounts_path())?;
    let profiles = profiles::DirProfileStore::new(&cfg.data_dir());

    let command = args.command.clone().unwrap_or(Command::Shell);
    let mut ctx = cli::Context {
        args,
        config: cfg,
        session_id,
        identity,
        profiles,
        audit,
    };

    let status = match command {
        Command::Validate(fields) => cli::run_validate(&ctx, &fields)?,
        Command::Signup(fields) => cli::run_signup(&mut ctx, &fields)?,
        Command::Login { email, password } => cli::run_login(&mut ctx, &email, &password)?,
        Command::ResetPassword { email } => cli::run_reset(&mut ctx, &email)?,
        Command::ConfirmReset {
            email,
            code,
            password,
        } => cli::run_confirm_reset(&mut ctx, &email, &code, &password)?,
        Command::Shell => cli::run_shell(ctx)?,
    };
    Ok(status.into())
}
