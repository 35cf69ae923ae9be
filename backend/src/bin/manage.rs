//! Management commands for operators:
//!
//! ```text
//! manage init-db
//! manage create-user <username> <email> <password> [--staff] [--full-name NAME]
//! manage backfill [--limit N] [--recipe-id ID]
//! ```
//!
//! `backfill` re-upserts published recipes into the search index, for
//! initial seeding or recovery after index loss.

use std::env;
use std::process::ExitCode;

use env_logger::Env;

use backend::accounts::{self, NewUser};
use backend::state::AppState;
use backend::sync;

fn usage() -> ExitCode {
    eprintln!("Usage:");
    eprintln!("  manage init-db");
    eprintln!("  manage create-user <username> <email> <password> [--staff] [--full-name NAME]");
    eprintln!("  manage backfill [--limit N] [--recipe-id ID]");
    ExitCode::from(2)
}

fn take_flag(args: &mut Vec<String>, flag: &str) -> bool {
    match args.iter().position(|arg| arg == flag) {
        Some(index) => {
            args.remove(index);
            true
        }
        None => false,
    }
}

fn take_option(args: &mut Vec<String>, flag: &str) -> Result<Option<String>, ExitCode> {
    match args.iter().position(|arg| arg == flag) {
        Some(index) => {
            if index + 1 >= args.len() {
                eprintln!("{flag} requires a value");
                return Err(ExitCode::from(2));
            }
            args.remove(index);
            Ok(Some(args.remove(index)))
        }
        None => Ok(None),
    }
}

#[actix_web::main]
async fn main() -> ExitCode {
    env_logger::init_from_env(Env::default().default_filter_or("info"));

    let mut args: Vec<String> = env::args().skip(1).collect();
    let Some(command) = args.first().cloned() else {
        return usage();
    };
    args.remove(0);

    let state = match AppState::new() {
        Ok(state) => state,
        Err(e) => {
            eprintln!("Failed to initialize: {e}");
            return ExitCode::FAILURE;
        }
    };

    match command.as_str() {
        "init-db" => {
            // Schema bootstrap already ran in AppState::new.
            println!("Database ready at {}", state.config.database_path);
            ExitCode::SUCCESS
        }
        "create-user" => {
            let is_staff = take_flag(&mut args, "--staff");
            let full_name = match take_option(&mut args, "--full-name") {
                Ok(value) => value.unwrap_or_default(),
                Err(code) => return code,
            };
            let (username, email, password) = match args.as_slice() {
                [username, email, password] => {
                    (username.as_str(), email.as_str(), password.as_str())
                }
                _ => return usage(),
            };

            let conn = match state.db() {
                Ok(conn) => conn,
                Err(e) => {
                    eprintln!("Database error: {e}");
                    return ExitCode::FAILURE;
                }
            };
            match accounts::create_user(
                &conn,
                &NewUser {
                    username,
                    email,
                    password,
                    full_name: &full_name,
                    is_staff,
                },
            ) {
                Ok(user) => {
                    accounts::send_welcome_email(
                        &conn,
                        state.mailer.as_ref(),
                        &state.config,
                        &user,
                    );
                    println!("Created user #{} ({})", user.id, user.username);
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    eprintln!("Failed to create user: {e}");
                    ExitCode::FAILURE
                }
            }
        }
        "backfill" => {
            let limit = match take_option(&mut args, "--limit") {
                Ok(value) => match value.map(|raw| raw.parse::<u32>()).transpose() {
                    Ok(limit) => limit,
                    Err(e) => {
                        eprintln!("Invalid --limit: {e}");
                        return ExitCode::from(2);
                    }
                },
                Err(code) => return code,
            };
            let recipe_id = match take_option(&mut args, "--recipe-id") {
                Ok(value) => match value.map(|raw| raw.parse::<i64>()).transpose() {
                    Ok(id) => id,
                    Err(e) => {
                        eprintln!("Invalid --recipe-id: {e}");
                        return ExitCode::from(2);
                    }
                },
                Err(code) => return code,
            };
            if !args.is_empty() {
                return usage();
            }
            if !state.search.enabled() {
                eprintln!("Search index is disabled or missing credentials; nothing to do");
                return ExitCode::FAILURE;
            }

            let conn = match state.db() {
                Ok(conn) => conn,
                Err(e) => {
                    eprintln!("Database error: {e}");
                    return ExitCode::FAILURE;
                }
            };
            match sync::backfill(&state.search, &conn, limit, recipe_id).await {
                Ok(processed) => {
                    println!("Backfill done ({processed} recipes)");
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    eprintln!("Backfill failed: {e}");
                    ExitCode::FAILURE
                }
            }
        }
        _ => usage(),
    }
}
