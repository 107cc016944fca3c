use std::{
    io::{self, BufRead, Write},
    path::PathBuf,
};

use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};

use crate::{
    client::{
        api::Registration, dashboard::Summary, export::export_csv, ApiClient, ClientError,
        Session, TokenStore,
    },
    config::ClientConfig,
    structs::{parse_date, Category, Expense, ExpenseChanges, NewExpense},
};

#[derive(Debug, Parser)]
#[command(name = "expense_tracker", version, about = "Personal expense tracker")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the REST API server
    Serve,
    Register {
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        occupation: String,
        #[arg(long)]
        email: String,
        #[arg(long, env = "EXPENSE_PASSWORD")]
        password: String,
    },
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "EXPENSE_PASSWORD")]
        password: String,
    },
    Logout,
    Profile,
    /// List expenses, most recent first
    List,
    Add {
        #[arg(long)]
        title: String,
        #[arg(long)]
        amount: f64,
        #[arg(long, default_value_t = Category::Food)]
        category: Category,
        /// YYYY-MM-DD
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    Edit {
        id: i64,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        amount: Option<f64>,
        #[arg(long)]
        category: Option<Category>,
        /// YYYY-MM-DD, or an empty string to clear
        #[arg(long)]
        date: Option<String>,
    },
    Delete {
        id: i64,
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// Totals, this month's spending and per-category bars
    Summary,
    /// Write all expenses to a CSV file
    Export {
        #[arg(long, default_value = "expenses.csv")]
        output: PathBuf,
    },
}

/// Runs one client command. The session is loaded from the token file and
/// written back afterwards, so a 401 logs the user out for good.
pub async fn run(command: Command, config: ClientConfig) -> Result<(), ClientError> {
    let api = ApiClient::new(config.api_url);
    let store = TokenStore::new(config.token_file);
    let mut session = store.load()?;

    let result = dispatch(command, &api, &store, &mut session).await;
    if !session.is_active() {
        store.clear()?;
    }
    result
}

async fn dispatch(
    command: Command,
    api: &ApiClient,
    store: &TokenStore,
    session: &mut Session,
) -> Result<(), ClientError> {
    match command {
        Command::Serve => return Err(ClientError::Form("serve is not a client command")),
        Command::Register {
            name,
            occupation,
            email,
            password,
        } => {
            let message = api
                .register(&Registration {
                    name: &name,
                    occupation: &occupation,
                    email: &email,
                    password: &password,
                })
                .await?;
            println!("{}", message);
        }
        Command::Login { email, password } => {
            *session = api.login(&email, &password).await?;
            store.save(session)?;
            println!("Logged in successfully");
        }
        Command::Logout => {
            session.invalidate();
            println!("Logged out");
        }
        Command::Profile => {
            let user = api.profile(session).await?;
            println!("Welcome, {}", user.name);
            if !user.occupation.is_empty() {
                println!("{}", user.occupation);
            }
            println!("{}", user.email);
        }
        Command::List => {
            let expenses = api.list_expenses(session).await?;
            if expenses.is_empty() {
                println!("No expenses yet. Add your first expense to see your spending here.");
            }
            for expense in &expenses {
                println!("{}", format_row(expense));
            }
        }
        Command::Add {
            title,
            amount,
            category,
            date,
        } => {
            let expense = api
                .create_expense(
                    session,
                    &NewExpense {
                        title,
                        amount,
                        category: Some(category.to_string()),
                        date,
                    },
                )
                .await?;
            println!("Expense added");
            println!("{}", format_row(&expense));
        }
        Command::Edit {
            id,
            title,
            amount,
            category,
            date,
        } => {
            let date = match date.as_deref().map(str::trim) {
                None => None,
                Some("") => Some(None),
                Some(raw) => Some(Some(parse_date(raw).map_err(|_| {
                    ClientError::Form("Date must be YYYY-MM-DD")
                })?)),
            };
            let changes = ExpenseChanges {
                title,
                amount,
                category: category.map(|c| c.to_string()),
                date,
            };
            if changes.is_empty() {
                return Err(ClientError::Form("Nothing to update"));
            }
            let expense = api.update_expense(session, id, &changes).await?;
            println!("Expense updated");
            println!("{}", format_row(&expense));
        }
        Command::Delete { id, yes } => {
            if !yes && !confirm("Delete this expense?")? {
                println!("Cancelled");
                return Ok(());
            }
            let message = api.delete_expense(session, id).await?;
            println!("{}", message);
        }
        Command::Summary => {
            let user = api.profile(session).await?;
            let expenses = api.list_expenses(session).await?;
            println!("Welcome, {}\n", user.name);
            print!("{}", Summary::compute(&expenses, Local::now().date_naive()).render());
        }
        Command::Export { output } => {
            let expenses = api.list_expenses(session).await?;
            if export_csv(&expenses, &output)? {
                println!("Exported {} expenses to {}", expenses.len(), output.display());
            } else {
                println!("No expenses to export");
            }
        }
    }
    Ok(())
}

pub fn format_row(expense: &Expense) -> String {
    let date = expense
        .date
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "----------".to_owned());
    let look = Category::from_label(&expense.category);
    format!(
        "{:>5}  {}  {:<24} {:<14} {:>10}  {}",
        expense.id,
        date,
        expense.title,
        expense.category,
        expense.amount,
        look.icon()
    )
}

fn confirm(prompt: &str) -> Result<bool, ClientError> {
    print!("{} [y/N] ", prompt);
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}
