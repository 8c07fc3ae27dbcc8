use std::{error::Error, io, path::PathBuf, process::exit};

use clap::Parser;
use rusqlite::Connection;

use propman_rs::{
    Error as AppError, PasswordHash, Role, ValidatedPassword, create_user, initialize_db,
};

/// A utility for adding a user who can log in to the API.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to the application SQLite database. It is created if it does
    /// not exist.
    #[arg(long, env = "DATABASE_PATH")]
    db_path: PathBuf,

    /// The name the user will log in with.
    #[arg(long)]
    username: String,

    /// The role to give the user.
    #[arg(long, default_value = Role::DEFAULT)]
    role: String,
}

fn main() -> Result<(), Box<dyn Error>> {
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let conn = Connection::open(&args.db_path)?;
    initialize_db(&conn)?;

    let password_hash = match get_new_password_hash(&args.username) {
        Some(password_hash) => password_hash,
        None => return Ok(()),
    };

    match create_user(&args.username, password_hash, Role::new(&args.role), &conn) {
        Ok(user) => {
            println!(
                "Created user {:?} with ID {} and role {:?}.",
                user.username, user.id, user.role.as_str()
            );
            Ok(())
        }
        Err(AppError::DuplicateUsername) => {
            print_error(format!("The username {:?} is already taken.", args.username));
            exit(1);
        }
        Err(error) => Err(error.into()),
    }
}

fn get_new_password_hash(username: &str) -> Option<PasswordHash> {
    loop {
        println!();

        let first_password = match rpassword::prompt_password("Enter a password: ") {
            Ok(string) => string,
            Err(error) if error.kind() == io::ErrorKind::UnexpectedEof => {
                return None;
            }
            Err(error) => {
                print_error(format!("Could not read password from stdin: {error}"));
                return None;
            }
        };

        let validated_password = match ValidatedPassword::new(&first_password, &[username]) {
            Ok(password) => password,
            Err(error) => {
                print_error(error);
                continue;
            }
        };

        let second_password = match rpassword::prompt_password("Enter the same password again: ") {
            Ok(string) => string,
            Err(error) if error.kind() == io::ErrorKind::UnexpectedEof => {
                return None;
            }
            Err(error) => {
                print_error(format!("Could not read password from stdin: {error}"));
                return None;
            }
        };

        if first_password != second_password {
            print_error("Passwords must match, try again.");
            continue;
        }

        match PasswordHash::new(validated_password, PasswordHash::DEFAULT_COST) {
            Ok(password_hash) => return Some(password_hash),
            Err(error) => {
                print_error(format!("Could not hash password: {error}. Try again."));
                continue;
            }
        };
    }
}

fn print_error(error: impl ToString) {
    eprintln!(
        "\x1b[31;1m{}\x1b[0m",
        capitalise_first_char(&error.to_string())
    )
}

fn capitalise_first_char(string: &str) -> String {
    let mut chars = string.chars();
    let Some(first) = chars.next() else {
        return String::with_capacity(0);
    };
    first.to_uppercase().chain(chars).collect()
}
