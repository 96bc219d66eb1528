use crate::{
    accounts::FileIdentityProvider,
    audit::AuditLog,
    config::Config,
    profiles::DirProfileStore,
    registration::{LoginForm, Registration, ResetOutcome, SignInOutcome, SignUpOutcome},
    validation::SignUpForm,
    Args, SignUpFields,
};
use anyhow::Result;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::process::ExitCode;

pub struct Context {
    pub args: Args,
    pub config: Config,
    pub session_id: String,
    pub identity: FileIdentityProvider,
    pub profiles: DirProfileStore,
    pub audit: Option<AuditLog>,
}

/// Whether a one-shot command's input was accepted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Accepted,
    Rejected,
}

impl Status {
    fn from_accepted(accepted: bool) -> Self {
        if accepted {
            Self::Accepted
        } else {
            Self::Rejected
        }
    }
}

impl From<Status> for ExitCode {
    fn from(status: Status) -> Self {
        match status {
            Status::Accepted => ExitCode::SUCCESS,
            Status::Rejected => ExitCode::FAILURE,
        }
    }
}

fn verbose(ctx: &Context, message: &str) {
    if ctx.args.verbose || ctx.args.debug {
        eprintln!("[VERBOSE] {}", message);
    }
}

fn registration(ctx: &mut Context) -> Registration<'_, FileIdentityProvider, DirProfileStore> {
    let reg = Registration::new(&mut ctx.identity, &mut ctx.profiles);
    match ctx.audit.as_mut() {
        Some(audit) => reg.with_audit(audit),
        None => reg,
    }
}

fn build_form(ctx: &Context, fields: &SignUpFields) -> SignUpForm {
    SignUpForm::with_policy(
        ctx.config.form.trim_inputs(),
        &fields.email,
        &fields.name,
        &fields.password,
        &fields.confirm,
    )
}

pub fn run_validate(ctx: &Context, fields: &SignUpFields) -> Result<Status> {
    let err = build_form(ctx, fields).validate();
    match err {
        None => println!("ok"),
        Some(err) => println!("{}", err),
    }
    Ok(Status::from_accepted(err.is_none()))
}

pub fn run_signup(ctx: &mut Context, fields: &SignUpFields) -> Result<Status> {
    signup(ctx, fields).map(Status::from_accepted)
}

pub fn run_login(ctx: &mut Context, email: &str, password: &str) -> Result<Status> {
    login(ctx, email, password).map(Status::from_accepted)
}

pub fn run_reset(ctx: &mut Context, email: &str) -> Result<Status> {
    Ok(Status::from_accepted(request_reset(ctx, email)))
}

pub fn run_confirm_reset(
    ctx: &mut Context,
    email: &str,
    code: &str,
    password: &str,
) -> Result<Status> {
    Ok(Status::from_accepted(confirm_reset(
        ctx, email, code, password,
    )))
}

/// Returns true when an account was created
fn signup(ctx: &mut Context, fields: &SignUpFields) -> Result<bool> {
    let form = build_form(ctx, fields);
    verbose(ctx, &format!("Signing up {}", form.email));

    let outcome = registration(ctx).sign_up(&form)?;
    match outcome {
        SignUpOutcome::Rejected(err) => {
            println!("{}", err);
            Ok(false)
        }
        SignUpOutcome::Created(profile) => {
            verbose(ctx, &format!("Profile written for uid {}", profile.uid));
            println!("Account created successfully!");
            println!("  uid: {}", profile.uid);
            println!("  username: {}", profile.username);
            Ok(true)
        }
    }
}

/// Returns true when the credentials were accepted
fn login(ctx: &mut Context, email: &str, password: &str) -> Result<bool> {
    let form = LoginForm::new(email, password);
    verbose(ctx, &format!("Signing in {}", form.email));

    let mut reg = registration(ctx);
    match reg.sign_in(&form) {
        SignInOutcome::Rejected(err) => {
            println!("{}", err);
            Ok(false)
        }
        SignInOutcome::Failed(err) => {
            println!("Login failed: {}", err);
            Ok(false)
        }
        SignInOutcome::SignedIn(uid) => {
            match reg.profile(&uid)? {
                Some(profile) => println!("Welcome back, {}!", profile.username),
                None => println!("Welcome back!"),
            }
            Ok(true)
        }
    }
}

/// Returns true when a reset code was issued
fn request_reset(ctx: &mut Context, email: &str) -> bool {
    verbose(ctx, &format!("Requesting password reset for {}", email.trim()));
    match registration(ctx).request_password_reset(email) {
        ResetOutcome::Done(code) => {
            println!("Reset link sent to your email");
            if let Some(code) = code {
                println!("  code: {}", code);
            }
            true
        }
        ResetOutcome::Rejected(err) => {
            println!("{}", err);
            false
        }
        ResetOutcome::Failed(err) => {
            println!("Error: {}", err);
            false
        }
    }
}

/// Returns true when the new password was set
fn confirm_reset(ctx: &mut Context, email: &str, code: &str, password: &str) -> bool {
    match registration(ctx).confirm_password_reset(email, code, password) {
        ResetOutcome::Done(_) => {
            println!("Password updated");
            true
        }
        ResetOutcome::Rejected(err) => {
            println!("{}", err);
            false
        }
        ResetOutcome::Failed(err) => {
            println!("Error: {}", err);
            false
        }
    }
}

fn prompt(rl: &mut DefaultEditor, label: &str) -> Result<Option<String>> {
    match rl.readline(label) {
        Ok(line) => Ok(Some(line)),
        Err(ReadlineError::Interrupted | ReadlineError::Eof) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn prompt_signup_fields(rl: &mut DefaultEditor) -> Result<Option<SignUpFields>> {
    let Some(email) = prompt(rl, "Email: ")? else {
        return Ok(None);
    };
    let Some(name) = prompt(rl, "Username: ")? else {
        return Ok(None);
    };
    let Some(password) = prompt(rl, "Password: ")? else {
        return Ok(None);
    };
    let Some(confirm) = prompt(rl, "Confirm password: ")? else {
        return Ok(None);
    };
    Ok(Some(SignUpFields {
        email,
        name,
        password,
        confirm,
    }))
}

fn prompt_login(ctx: &mut Context, rl: &mut DefaultEditor) -> Result<()> {
    let Some(email) = prompt(rl, "Email: ")? else {
        return Ok(());
    };
    let Some(password) = prompt(rl, "Password: ")? else {
        return Ok(());
    };
    login(ctx, &email, &password)?;
    Ok(())
}

fn prompt_reset(ctx: &mut Context, rl: &mut DefaultEditor) -> Result<()> {
    let Some(email) = prompt(rl, "Email: ")? else {
        return Ok(());
    };
    if !request_reset(ctx, &email) {
        return Ok(());
    }
    let Some(code) = prompt(rl, "Reset code: ")? else {
        return Ok(());
    };
    let Some(password) = prompt(rl, "New password: ")? else {
        return Ok(());
    };
    confirm_reset(ctx, &email, &code, &password);
    Ok(())
}

pub fn run_shell(mut ctx: Context) -> Result<Status> {
    let mut rl = DefaultEditor::new()?;

    println!("goshop - type /help for commands, /exit to quit");

    loop {
        match rl.readline("goshop> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                rl.add_history_entry(line)?;

                if handle_command(&mut ctx, &mut rl, line) {
                    break;
                }
            }
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("Input error: {}", e);
                break;
            }
        }
    }

    Ok(Status::Accepted)
}

fn handle_command(ctx: &mut Context, rl: &mut DefaultEditor, cmd: &str) -> bool {
    let parts: Vec<&str> = cmd.splitn(2, ' ').collect();
    let result = match parts[0] {
        "/exit" | "/quit" => return true,
        "/help" => {
            println!("Commands:");
            println!("  /signup         - create an account");
            println!("  /validate       - check sign-up fields without submitting");
            println!("  /login          - sign in with email and password");
            println!("  /reset          - reset a forgotten password");
            println!("  /session        - show session info");
            println!("  /config         - show resolved settings");
            println!("  /help           - show commands");
            println!("  /exit           - quit");
            Ok(())
        }
        "/signup" => match prompt_signup_fields(rl) {
            Ok(Some(fields)) => signup(ctx, &fields).map(|_| ()),
            Ok(None) => Ok(()),
            Err(e) => Err(e),
        },
        "/validate" => match prompt_signup_fields(rl) {
            Ok(Some(fields)) => {
                match build_form(ctx, &fields).validate() {
                    None => println!("ok"),
                    Some(err) => println!("{}", err),
                }
                Ok(())
            }
            Ok(None) => Ok(()),
            Err(e) => Err(e),
        },
        "/login" => prompt_login(ctx, rl),
        "/reset" => prompt_reset(ctx, rl),
        "/session" => {
            println!("Session: {}", ctx.session_id);
            match &ctx.audit {
                Some(audit) => println!("Audit log: {:?}", audit.path),
                None => println!("Audit log: disabled"),
            }
            Ok(())
        }
        "/config" => {
            println!("Data dir: {}", ctx.config.data_dir().display());
            println!(
                "Accounts: {} ({} stored)",
                ctx.config.accounts_path().display(),
                ctx.identity.len()
            );
            println!("Trim inputs: {}", ctx.config.form.trim_inputs());
            Ok(())
        }
        _ => {
            println!("Unknown command: {}", parts[0]);
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
    }
    false
}
