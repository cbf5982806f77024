//! Command implementations for the `roomies` binary.

use std::io::{self, Write};

use anyhow::{bail, Context, Result};
use roomies_core::models::{balances, unread_count, NewChore, NewExpense};
use roomies_core::{ApiClient, AuthService, Config};
use tracing::warn;

use crate::format::{format_date, format_money, format_optional, truncate_string};

/// Width of the description column in chore listings
const DESCRIPTION_WIDTH: usize = 32;

fn prompt(label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

fn prompt_password(label: &str) -> Result<String> {
    let password = rpassword::prompt_password(label)?;
    Ok(password)
}

/// API client for commands that need a session
fn signed_in(auth: &AuthService) -> Result<ApiClient> {
    auth.require_api()
        .context("No saved session. Run `roomies login` first.")
}

/// The positional argument at `index`, or an error naming it
pub fn arg<'a>(args: &'a [String], index: usize, name: &str) -> Result<&'a str> {
    args.get(index)
        .map(String::as_str)
        .ok_or_else(|| anyhow::anyhow!("Missing argument: <{}>", name))
}

pub fn parse_id(value: &str) -> Result<i64> {
    value
        .parse()
        .with_context(|| format!("Not a valid id: {}", value))
}

/// Value following `--name` in `args`, if present
pub fn option_value<'a>(args: &'a [String], name: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == name)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

pub async fn login(auth: &AuthService, config: &mut Config) -> Result<()> {
    let username = match config.last_username.clone() {
        Some(last) => {
            let entered = prompt(&format!("Username [{}]: ", last))?;
            if entered.is_empty() {
                last
            } else {
                entered
            }
        }
        None => prompt("Username: ")?,
    };
    let password = prompt_password("Password: ")?;

    if username.is_empty() || password.is_empty() {
        bail!("Username and password required");
    }

    auth.sign_in(&username, &password).await?;

    config.last_username = Some(username.clone());
    if let Err(e) = config.save() {
        warn!(error = %e, "Failed to save config");
    }

    match auth.user_id() {
        Some(id) => println!("Signed in as {} (user {})", username, id),
        None => println!("Signed in as {}", username),
    }
    Ok(())
}

pub fn logout(auth: &AuthService) -> Result<()> {
    auth.sign_out();
    println!("Signed out");
    Ok(())
}

pub async fn register(auth: &AuthService) -> Result<()> {
    let first_name = prompt("First name: ")?;
    let last_name = prompt("Last name: ")?;
    let username = prompt("Username: ")?;
    let password = prompt_password("Password: ")?;
    let confirm = prompt_password("Confirm password: ")?;

    if first_name.is_empty() || last_name.is_empty() || username.is_empty() || password.is_empty() {
        bail!("All fields are required");
    }
    if password != confirm {
        bail!("Passwords do not match");
    }

    auth.create_account(&first_name, &last_name, &username, &password)
        .await?;
    println!("Account created. Run `roomies login` to sign in.");
    Ok(())
}

pub async fn whoami(auth: &AuthService) -> Result<()> {
    let Some(api) = auth.api() else {
        println!("Not signed in");
        return Ok(());
    };

    match auth.identity() {
        Some(identity) => match identity.user_id() {
            Some(id) => println!("User id: {}", id),
            None => println!("User: {:?}", identity),
        },
        None => println!("Signed in (session token could not be read)"),
    }

    let room = api.fetch_room().await?;
    println!("Room:    {}", room.display_name());
    if let Some(code) = room.invite_code {
        println!("Invite:  {}", code);
    }
    Ok(())
}

pub async fn room(auth: &AuthService, args: &[String]) -> Result<()> {
    let api = signed_in(auth)?;

    match args.first().map(String::as_str) {
        None => {
            let room = api.fetch_room().await?;
            if !room.is_member() {
                println!("You are not in a room. Create one with `roomies room create <name>`.");
                return Ok(());
            }
            println!("{}", room.display_name());
            println!("Invite code: {}", format_optional(&room.invite_code, "-"));
        }
        Some("create") => {
            let name = arg(args, 1, "name")?;
            let room = api.create_room(name).await?;
            println!("Created {}", room.display_name());
            println!("Invite code: {}", format_optional(&room.invite_code, "-"));
        }
        Some("join") => {
            let code = arg(args, 1, "invite code")?;
            let room = api.join_room(code).await?;
            println!(
                "{}",
                room.message
                    .clone()
                    .unwrap_or_else(|| format!("Joined {}", room.display_name()))
            );
        }
        Some("leave") => {
            let result = api.leave_room().await?;
            println!("{}", format_optional(&result.message, "Left the room"));
        }
        Some(other) => bail!("Unknown room command: {}", other),
    }
    Ok(())
}

pub async fn chores(auth: &AuthService) -> Result<()> {
    let api = signed_in(auth)?;
    let me = auth.user_id();
    let chores = api.fetch_chores().await?;

    if chores.is_empty() {
        println!("No chores");
        return Ok(());
    }

    for chore in &chores {
        let status = if chore.is_completed() { "x" } else { " " };
        let mine = match me {
            Some(id) if chore.is_assigned_to(id) => "*",
            _ => " ",
        };
        let description = chore.description.as_deref().unwrap_or("(no description)");
        println!(
            "[{}]{} {:>4}  {:<width$}  due {}",
            status,
            mine,
            chore.id,
            truncate_string(description, DESCRIPTION_WIDTH),
            chore
                .end_date
                .as_deref()
                .map(format_date)
                .unwrap_or_else(|| "-".to_string()),
            width = DESCRIPTION_WIDTH,
        );
    }
    Ok(())
}

pub async fn chore(auth: &AuthService, args: &[String]) -> Result<()> {
    let api = signed_in(auth)?;

    match args.first().map(String::as_str) {
        Some("add") => {
            let description = arg(args, 1, "description")?;
            let start_date = arg(args, 2, "start")?;
            let end_date = arg(args, 3, "end")?;
            let me = auth
                .user_id()
                .context("Session token has no user id; sign in again")?;

            let mut rotation_order: Vec<i64> = api
                .fetch_roommates()
                .await?
                .into_iter()
                .map(|r| r.id)
                .filter(|&id| id != me)
                .collect();
            rotation_order.insert(0, me);

            let chore = api
                .create_chore(&NewChore {
                    description: description.to_string(),
                    start_date: start_date.to_string(),
                    end_date: end_date.to_string(),
                    is_task: args.iter().any(|a| a == "--task"),
                    recurrence: option_value(args, "--recurrence")
                        .unwrap_or("none")
                        .to_string(),
                    assigned_roommate_id: me,
                    rotation_order,
                })
                .await?;
            println!("Created chore {}", chore.id);
        }
        Some("done") => {
            let id = parse_id(arg(args, 1, "id")?)?;
            let chore = api.complete_chore(id).await?;
            println!("Completed chore {}", chore.id);
        }
        Some("delete") => {
            let id = parse_id(arg(args, 1, "id")?)?;
            api.delete_chore(id).await?;
            println!("Deleted chore {}", id);
        }
        Some(other) => bail!("Unknown chore command: {}", other),
        None => bail!("Usage: roomies chore <add|done|delete> ..."),
    }
    Ok(())
}

pub async fn roommates(auth: &AuthService) -> Result<()> {
    let api = signed_in(auth)?;
    let roommates = api.fetch_roommates_with_pictures(auth.user_id()).await?;

    if roommates.is_empty() {
        println!("No roommates");
        return Ok(());
    }

    for entry in &roommates {
        let picture = if entry.picture.is_failed() {
            "picture unavailable"
        } else if entry.picture.data_uri().is_some() {
            "has picture"
        } else {
            "no picture"
        };
        println!("{:>4}  {}  ({})", entry.roommate.id, entry.roommate.full_name(), picture);
    }
    Ok(())
}

pub async fn expenses(auth: &AuthService) -> Result<()> {
    let api = signed_in(auth)?;
    let periods = api.fetch_expense_periods().await?;

    let Some(period) = periods.iter().find(|p| p.open).or_else(|| periods.last()) else {
        println!("No expense periods");
        return Ok(());
    };

    println!(
        "Period {} ({}) from {}",
        period.id,
        if period.open { "open" } else { "closed" },
        period
            .start_date
            .as_deref()
            .map(format_date)
            .unwrap_or_else(|| "-".to_string())
    );

    for expense in &period.expenses {
        println!(
            "{:>4}  {:<24}  {:>10}",
            expense.id,
            truncate_string(expense.title.as_deref().unwrap_or("(untitled)"), 24),
            format_money(expense.cost)
        );
    }
    println!("Total: {}", format_money(period.total_cost()));

    let roommate_ids: Vec<i64> = api.fetch_roommates().await?.iter().map(|r| r.id).collect();
    let sheet = balances(&period.expenses, &roommate_ids);
    if !sheet.is_empty() {
        println!();
        println!("Balances:");
        for (id, balance) in &sheet {
            let marker = if Some(*id) == auth.user_id() { " (you)" } else { "" };
            println!("  {:>4}{}  {}", id, marker, format_money(*balance));
        }
    }
    Ok(())
}

pub async fn notifications(auth: &AuthService) -> Result<()> {
    let api = signed_in(auth)?;
    let me = auth
        .user_id()
        .context("Session token has no user id; sign in again")?;
    let notifications = api.fetch_notifications_for(me).await?;

    if notifications.is_empty() {
        println!("No notifications");
        return Ok(());
    }

    let now = chrono::Utc::now().naive_utc();
    println!("{} unread", unread_count(&notifications));
    for n in &notifications {
        println!(
            "{} {:<10} {}: {}",
            if n.is_read { " " } else { "*" },
            n.age_display(now),
            format_optional(&n.title, "(untitled)"),
            format_optional(&n.description, "")
        );
    }
    Ok(())
}

/// Add an expense split evenly across the room
pub async fn expense(auth: &AuthService, args: &[String]) -> Result<()> {
    let api = signed_in(auth)?;

    match args.first().map(String::as_str) {
        Some("add") => {
            let title = arg(args, 1, "title")?;
            let cost: f64 = arg(args, 2, "cost")?
                .parse()
                .context("Cost must be a number")?;
            let description = option_value(args, "--description").unwrap_or("");
            let roommate_ids: Vec<i64> = api.fetch_roommates().await?.iter().map(|r| r.id).collect();

            let expense = api
                .create_expense(&NewExpense::split_evenly(title, cost, description, &roommate_ids))
                .await?;
            println!("Added expense {} ({})", expense.id, format_money(expense.cost));
        }
        Some("delete") => {
            let id = parse_id(arg(args, 1, "id")?)?;
            api.delete_expense(id).await?;
            println!("Deleted expense {}", id);
        }
        Some("close") => {
            let period = api.close_expense_period().await?;
            println!("Closed expense period {}", period.id);
        }
        Some(other) => bail!("Unknown expense command: {}", other),
        None => bail!("Usage: roomies expense <add|delete|close> ..."),
    }
    Ok(())
}
