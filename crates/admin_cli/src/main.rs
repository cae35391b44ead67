use std::{error::Error, io::Write};

use clap::{Args, Parser, Subcommand};
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent, KeyModifiers},
    execute,
    style::Print,
    terminal,
    terminal::ClearType,
};
use engine::{AdCategory, AdCondition, AdDraft, Engine, NewUser, check_password_policy};
use migration::MigratorTrait;
use sea_orm::{Database, DatabaseConnection};
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "barter_admin")]
#[command(about = "Admin utilities for Barter (bootstrap users/ads)")]
struct Cli {
    /// Database connection string (also read from `DATABASE_URL`).
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "sqlite:./barter.db?mode=rwc"
    )]
    database_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    User(User),
    Ad(Ad),
}

#[derive(Args, Debug)]
struct User {
    #[command(subcommand)]
    command: UserCommand,
}

#[derive(Subcommand, Debug)]
enum UserCommand {
    Create(UserCreateArgs),
    Delete(UserDeleteArgs),
}

#[derive(Args, Debug)]
struct UserCreateArgs {
    #[arg(long)]
    username: String,
    #[arg(long)]
    email: String,
    #[arg(long)]
    first_name: Option<String>,
    #[arg(long)]
    last_name: Option<String>,
}

#[derive(Args, Debug)]
struct UserDeleteArgs {
    #[arg(long)]
    username: String,
}

#[derive(Args, Debug)]
struct Ad {
    #[command(subcommand)]
    command: AdCommand,
}

#[derive(Subcommand, Debug)]
enum AdCommand {
    Create(AdCreateArgs),
    Delete(AdDeleteArgs),
}

#[derive(Args, Debug)]
struct AdCreateArgs {
    #[arg(long)]
    owner: String,
    #[arg(long)]
    title: String,
    #[arg(long)]
    description: String,
    #[arg(long, value_parser = parse_category, default_value = "other")]
    category: AdCategory,
    #[arg(long, value_parser = parse_condition, default_value = "used")]
    condition: AdCondition,
    #[arg(long)]
    image_url: Option<String>,
}

#[derive(Args, Debug)]
struct AdDeleteArgs {
    #[arg(long)]
    owner: String,
    #[arg(long)]
    id: Uuid,
}

fn parse_category(raw: &str) -> Result<AdCategory, String> {
    AdCategory::try_from(raw.to_lowercase().as_str()).map_err(|err| err.to_string())
}

fn parse_condition(raw: &str) -> Result<AdCondition, String> {
    AdCondition::try_from(raw.to_lowercase().as_str()).map_err(|err| err.to_string())
}

struct RawModeGuard;

impl RawModeGuard {
    fn enter() -> Result<Self, Box<dyn Error + Send + Sync>> {
        terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

fn prompt_password(prompt: &str) -> Result<String, Box<dyn Error + Send + Sync>> {
    let _raw = RawModeGuard::enter()?;

    let mut out = std::io::stderr();
    execute!(
        out,
        cursor::MoveToColumn(0),
        terminal::Clear(ClearType::CurrentLine),
        Print(prompt)
    )?;
    out.flush()?;

    let mut buf = String::new();
    loop {
        let Event::Key(KeyEvent {
            code, modifiers, ..
        }) = event::read()?
        else {
            continue;
        };

        match code {
            KeyCode::Enter => {
                execute!(out, Print("\r\n"))?;
                out.flush()?;
                break;
            }
            KeyCode::Backspace => {
                if buf.pop().is_some() {
                    execute!(out, cursor::MoveLeft(1), Print(" "), cursor::MoveLeft(1))?;
                    out.flush()?;
                }
            }
            KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
                execute!(out, Print("\r\n"))?;
                out.flush()?;
                return Err("interrupted".into());
            }
            KeyCode::Char(ch) if !modifiers.contains(KeyModifiers::CONTROL) => {
                buf.push(ch);
                execute!(out, Print("*"))?;
                out.flush()?;
            }
            _ => {}
        }
    }

    Ok(buf)
}

fn prompt_password_twice() -> Result<String, Box<dyn Error + Send + Sync>> {
    let mut out = std::io::stderr();
    for _ in 0..3 {
        let p1 = prompt_password("Password: ")?;
        if let Err(err) = check_password_policy(&p1) {
            execute!(
                out,
                cursor::MoveToColumn(0),
                terminal::Clear(ClearType::CurrentLine),
                Print(format!("{err}\r\n"))
            )?;
            continue;
        }

        let p2 = prompt_password("Confirm password: ")?;
        if p1 == p2 {
            return Ok(p1);
        }

        execute!(
            out,
            cursor::MoveToColumn(0),
            terminal::Clear(ClearType::CurrentLine),
            Print("Passwords do not match. Try again.\r\n")
        )?;
    }

    Err("too many attempts".into())
}

async fn connect_db(
    database_url: &str,
) -> Result<DatabaseConnection, Box<dyn Error + Send + Sync>> {
    let db = Database::connect(database_url).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let cli = Cli::parse();

    let db = connect_db(&cli.database_url).await?;
    let engine = Engine::builder().database(db).build().await?;

    match cli.command {
        Command::User(User {
            command: UserCommand::Create(args),
        }) => {
            let password = prompt_password_twice()?;
            let user = engine
                .register(NewUser {
                    username: args.username,
                    email: args.email,
                    password,
                    first_name: args.first_name,
                    last_name: args.last_name,
                })
                .await?;

            println!("created user: {}", user.username);
        }
        Command::User(User {
            command: UserCommand::Delete(args),
        }) => {
            engine.delete_account(&args.username).await?;
            println!("deleted user: {}", args.username);
        }
        Command::Ad(Ad {
            command: AdCommand::Create(args),
        }) => {
            let ad = engine
                .new_ad(
                    &args.owner,
                    AdDraft {
                        title: args.title,
                        description: args.description,
                        category: args.category,
                        condition: args.condition,
                        image_url: args.image_url,
                    },
                )
                .await?;
            println!("created ad: {} ({})", ad.title, ad.id);
        }
        Command::Ad(Ad {
            command: AdCommand::Delete(args),
        }) => {
            engine.delete_ad(args.id, &args.owner).await?;
            println!("deleted ad: {}", args.id);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_ad_create() {
        let cli = Cli::try_parse_from([
            "barter_admin",
            "--database-url",
            "sqlite::memory:",
            "ad",
            "create",
            "--owner",
            "alice",
            "--title",
            "Bike",
            "--description",
            "A red city bike",
            "--category",
            "Vehicles",
        ])
        .unwrap();
        let Command::Ad(Ad {
            command: AdCommand::Create(args),
        }) = cli.command
        else {
            panic!("expected ad create");
        };
        assert_eq!(args.category, AdCategory::Vehicles);
        assert_eq!(args.condition, AdCondition::Used);
    }

    #[test]
    fn rejects_unknown_category() {
        assert!(parse_category("weapons").is_err());
    }

    #[test]
    fn prompt_uses_registration_password_policy() {
        assert!(check_password_policy("Secret123").is_ok());
        assert!(check_password_policy("secret123").is_err());
        assert!(check_password_policy("Secret").is_err());
    }
}
