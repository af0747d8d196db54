use std::{path::PathBuf, sync::Arc};

use clap::{Parser, Subcommand};
use time::{Date, OffsetDateTime, macros::format_description};
use tracing_subscriber::EnvFilter;

use spendlog::{
    Database, Error,
    budget::{get_monthly_budgets, set_monthly_budget},
    category::{CategoryName, NewCategory, get_all_categories},
    db,
    expense::NewExpense,
    export::export_data,
    repository::{ExpenseRepository, SQLiteExpenseRepository},
    store::{ExpenseStore, Period, SyncStrategy},
    summary::{daily_spending, monthly_summary, round_currency, total_spent},
};

/// A local expense tracker backed by SQLite.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to the SQLite database.
    #[arg(long, default_value = "spendlog.db")]
    db_path: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the database schema and seed the default categories.
    Init,
    /// List all categories with their budgets.
    Categories,
    /// Create a new category.
    AddCategory {
        /// The category name, unique across categories.
        name: String,
        /// The planned monthly spend.
        #[arg(long, default_value_t = 0.0)]
        budget: f64,
        /// A display icon, e.g. an emoji.
        #[arg(long)]
        icon: Option<String>,
        /// A display color, e.g. a hex string.
        #[arg(long)]
        color: Option<String>,
    },
    /// Record an expense.
    AddExpense {
        /// The ID of the category to record the expense under.
        category_id: i64,
        /// The amount spent, must be positive.
        amount: f64,
        /// What the money was spent on.
        description: String,
        /// The day of the expense as YYYY-MM-DD, defaults to today.
        #[arg(long)]
        date: Option<String>,
    },
    /// List expenses, all or for one month.
    Expenses {
        /// Restrict to a month given as YYYY-MM.
        #[arg(long)]
        month: Option<String>,
    },
    /// Show per-category spending against budgets for a month.
    Summary {
        /// The month given as YYYY-MM, defaults to the current month.
        #[arg(long)]
        month: Option<String>,
    },
    /// Show per-day totals for a month.
    Daily {
        /// The month given as YYYY-MM, defaults to the current month.
        #[arg(long)]
        month: Option<String>,
    },
    /// Show the total spent in a month.
    Total {
        /// The month given as YYYY-MM, defaults to the current month.
        #[arg(long)]
        month: Option<String>,
    },
    /// Set the planned budget for a category in a month.
    SetBudget {
        /// The ID of the category to budget for.
        category_id: i64,
        /// The planned amount.
        amount: f64,
        /// The month given as YYYY-MM, defaults to the current month.
        #[arg(long)]
        month: Option<String>,
    },
    /// List the planned budgets for a month.
    Budgets {
        /// The month given as YYYY-MM, defaults to the current month.
        #[arg(long)]
        month: Option<String>,
    },
    /// Remove duplicate category rows left over from older databases.
    CleanupDuplicates,
    /// Delete all data and re-seed the default categories.
    Reset,
    /// Print the full database contents as JSON.
    Export,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let database = Database::open(&args.db_path)?;

    match args.command {
        Command::Init => {
            println!("Initialized database at {}", args.db_path.display());
        }
        Command::Categories => {
            let connection = database.connection();
            let guard = connection.lock().map_err(|_| Error::DatabaseLock)?;
            for category in get_all_categories(&guard)? {
                println!(
                    "{:>4}  {} {}  budget {:.2}",
                    category.id, category.icon, category.name, category.monthly_budget
                );
            }
        }
        Command::AddCategory {
            name,
            budget,
            icon,
            color,
        } => {
            let mut fields = NewCategory::new(CategoryName::new(&name)?, budget)?;
            if let Some(icon) = icon {
                fields = fields.with_icon(&icon);
            }
            if let Some(color) = color {
                fields = fields.with_color(&color);
            }

            let connection = database.connection();
            let guard = connection.lock().map_err(|_| Error::DatabaseLock)?;
            let category = spendlog::category::create_category(fields, &guard)?;
            println!("Created category {} with ID {}", category.name, category.id);
        }
        Command::AddExpense {
            category_id,
            amount,
            description,
            date,
        } => {
            let mut fields = NewExpense::new(category_id, amount, &description)?;
            if let Some(raw) = date {
                fields = fields.with_date(parse_day(&raw)?.midnight().assume_utc());
            }

            let repository = Arc::new(SQLiteExpenseRepository::new(database.connection()));
            let store =
                ExpenseStore::for_current_month(repository, SyncStrategy::AsyncLifecycle);
            let expense = store.add(fields).await?;
            println!("Recorded expense {} for {:.2}", expense.id, expense.amount);
        }
        Command::Expenses { month } => {
            let repository = SQLiteExpenseRepository::new(database.connection());
            let expenses = match month {
                Some(raw) => {
                    let period = parse_period(&raw)?;
                    repository.get_for_month(period.year, period.month)?
                }
                None => repository.get_all()?,
            };
            for entry in expenses {
                println!(
                    "{:>4}  {}  {:>10.2}  {}  [{}]",
                    entry.expense.id,
                    entry.expense.date.date(),
                    entry.expense.amount,
                    entry.expense.description,
                    entry.category_name.as_deref().unwrap_or("uncategorized"),
                );
            }
        }
        Command::Summary { month } => {
            let period = period_or_current(month.as_deref())?;
            let connection = database.connection();
            let guard = connection.lock().map_err(|_| Error::DatabaseLock)?;
            for row in monthly_summary(period.year, period.month, &guard)? {
                println!(
                    "{} {:<16} {:>10.2} / {:<10.2} ({} transactions)",
                    row.icon,
                    row.name,
                    round_currency(row.spent),
                    row.monthly_budget,
                    row.transaction_count,
                );
            }
        }
        Command::Daily { month } => {
            let period = period_or_current(month.as_deref())?;
            let connection = database.connection();
            let guard = connection.lock().map_err(|_| Error::DatabaseLock)?;
            for row in daily_spending(period.year, period.month, &guard)? {
                println!("{}  {:>10.2}", row.day, round_currency(row.total));
            }
        }
        Command::Total { month } => {
            let period = period_or_current(month.as_deref())?;
            let connection = database.connection();
            let guard = connection.lock().map_err(|_| Error::DatabaseLock)?;
            let total = total_spent(period.year, period.month, &guard)?;
            println!("{:.2}", round_currency(total));
        }
        Command::SetBudget {
            category_id,
            amount,
            month,
        } => {
            let period = period_or_current(month.as_deref())?;
            let connection = database.connection();
            let guard = connection.lock().map_err(|_| Error::DatabaseLock)?;
            set_monthly_budget(period.year, period.month, category_id, amount, &guard)?;
            println!(
                "Set budget for category {category_id} in {}-{:02} to {amount:.2}",
                period.year, period.month
            );
        }
        Command::Budgets { month } => {
            let period = period_or_current(month.as_deref())?;
            let connection = database.connection();
            let guard = connection.lock().map_err(|_| Error::DatabaseLock)?;
            for entry in get_monthly_budgets(period.year, period.month, &guard)? {
                println!(
                    "{} {:<16} {:>10.2}",
                    entry.category_icon.as_deref().unwrap_or(" "),
                    entry.category_name.as_deref().unwrap_or("(deleted)"),
                    entry.budget.planned_amount,
                );
            }
        }
        Command::CleanupDuplicates => {
            let connection = database.connection();
            let guard = connection.lock().map_err(|_| Error::DatabaseLock)?;
            let removed = db::remove_duplicate_categories(&guard)?;
            println!("Removed {removed} duplicate categories");
        }
        Command::Reset => {
            let connection = database.connection();
            let guard = connection.lock().map_err(|_| Error::DatabaseLock)?;
            db::clear_all_data(&guard)?;
            println!("Cleared all data and re-seeded the default categories");
        }
        Command::Export => {
            let connection = database.connection();
            let guard = connection.lock().map_err(|_| Error::DatabaseLock)?;
            let export = export_data(&guard)?;
            let json = serde_json::to_string_pretty(&export)
                .map_err(|error| Error::Serialization(error.to_string()))?;
            println!("{json}");
        }
    }

    Ok(())
}

fn parse_day(raw: &str) -> Result<Date, Error> {
    let day_format = format_description!("[year]-[month]-[day]");
    Date::parse(raw, &day_format)
        .map_err(|error| Error::InvalidDateFormat(error.to_string(), raw.to_string()))
}

fn parse_period(raw: &str) -> Result<Period, Error> {
    let first_of_month = format!("{raw}-01");
    let day = parse_day(&first_of_month)?;

    Ok(Period {
        year: day.year(),
        month: u8::from(day.month()),
    })
}

fn period_or_current(month: Option<&str>) -> Result<Period, Error> {
    match month {
        Some(raw) => parse_period(raw),
        None => {
            let now = OffsetDateTime::now_utc();
            Ok(Period {
                year: now.year(),
                month: u8::from(now.month()),
            })
        }
    }
}
