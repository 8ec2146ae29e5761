use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use libraryhub::models::{Book, BorrowRecord, Role, User, parse_date};
use libraryhub::net::api::BookForm;
use libraryhub::session::{FileTokenStorage, MemoryTokenStorage, TokenStorage};
use libraryhub::views::admin_books::AdminBooksView;
use libraryhub::views::admin_users::AdminUsersView;
use libraryhub::views::auth::{LoginForm, RegisterForm};
use libraryhub::views::books::{BooksView, CATEGORIES};
use libraryhub::views::borrow_history::{BorrowHistoryView, DueStatus, HistoryTab};
use libraryhub::views::profile::{PasswordForm, ProfileForm, ProfileView};
use libraryhub::views::{Notice, ViewError};
use libraryhub::{ApiError, App, ClientConfig, ConfigError, ConfigOverrides, DeploymentMode, Route};
use serde::Serialize;
use time::{Date, OffsetDateTime};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("{0}")]
    Api(#[from] ApiError),
    #[error("{0}")]
    View(#[from] ViewError),
    #[error("{requested} is not available; redirected to {landed}")]
    Redirected { requested: Route, landed: Route },
    #[error("no state directory; pass --state-dir, set LIBRARYHUB_STATE_DIR, or use --ephemeral")]
    NoStateDir,
    #[error("book {0} not found")]
    UnknownBook(String),
    #[error("not signed in")]
    NotSignedIn,
    #[error("invalid JSON output: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "libraryhub", about = "LibraryHub command-line client")]
struct Cli {
    /// `development` or `production`; picks the default API URL. Overrides LIBRARYHUB_MODE.
    #[arg(long, value_parser = DeploymentMode::parse)]
    mode: Option<DeploymentMode>,

    /// Overrides LIBRARYHUB_API_URL.
    #[arg(long)]
    api_url: Option<String>,

    /// Overrides LIBRARYHUB_TIMEOUT_SECS (default 10).
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Where the session token is kept between runs. Overrides LIBRARYHUB_STATE_DIR.
    #[arg(long)]
    state_dir: Option<PathBuf>,

    /// Keep the session in memory only.
    #[arg(long, default_value_t = false)]
    ephemeral: bool,

    /// Print results as JSON.
    #[arg(long, global = true, default_value_t = false)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        /// Defaults to --password.
        #[arg(long)]
        confirm_password: Option<String>,
    },
    Logout,
    Whoami,
    Books(BooksCommand),
    History(HistoryCommand),
    Profile(ProfileCommand),
    Admin(AdminCommand),
}

#[derive(Args, Debug)]
struct BooksCommand {
    #[command(subcommand)]
    command: BooksSubcommand,
}

#[derive(Subcommand, Debug)]
enum BooksSubcommand {
    List {
        #[arg(long)]
        search: Option<String>,
        #[arg(long, help = "Fiction, Non-fiction, Science, History, Biography or all")]
        category: Option<String>,
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    Borrow {
        book_id: String,
        /// Due date, YYYY-MM-DD.
        #[arg(long, value_parser = parse_day)]
        due: Option<Date>,
    },
}

#[derive(Args, Debug)]
struct HistoryCommand {
    #[command(subcommand)]
    command: HistorySubcommand,
}

#[derive(Subcommand, Debug)]
enum HistorySubcommand {
    List {
        /// borrowed, returned or all.
        #[arg(long, default_value = "borrowed")]
        tab: HistoryTab,
    },
    Return {
        record_id: String,
    },
}

#[derive(Args, Debug)]
struct ProfileCommand {
    #[command(subcommand)]
    command: ProfileSubcommand,
}

#[derive(Subcommand, Debug)]
enum ProfileSubcommand {
    Show,
    Update {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        image: Option<PathBuf>,
    },
    Password {
        #[arg(long)]
        current: String,
        #[arg(long)]
        new: String,
        #[arg(long)]
        confirm: String,
    },
}

#[derive(Args, Debug)]
struct AdminCommand {
    #[command(subcommand)]
    command: AdminSubcommand,
}

#[derive(Subcommand, Debug)]
enum AdminSubcommand {
    Books(AdminBooksCommand),
    Users(AdminUsersCommand),
}

#[derive(Args, Debug)]
struct AdminBooksCommand {
    #[command(subcommand)]
    command: AdminBooksSubcommand,
}

#[derive(Args, Debug, Default)]
struct BookFields {
    #[arg(long)]
    title: Option<String>,
    #[arg(long)]
    author: Option<String>,
    #[arg(long)]
    isbn: Option<String>,
    #[arg(long)]
    description: Option<String>,
    #[arg(long)]
    year: Option<i32>,
    #[arg(long)]
    total: Option<u32>,
    /// Defaults to --total.
    #[arg(long)]
    available: Option<u32>,
    #[arg(long)]
    category: Option<String>,
    #[arg(long)]
    cover: Option<PathBuf>,
}

impl BookFields {
    fn apply(self, form: &mut BookForm) {
        if let Some(title) = self.title {
            form.title = title;
        }
        if let Some(author) = self.author {
            form.author = author;
        }
        if let Some(isbn) = self.isbn {
            form.isbn = isbn;
        }
        if self.description.is_some() {
            form.description = self.description;
        }
        if self.year.is_some() {
            form.published_year = self.year;
        }
        if let Some(total) = self.total {
            form.total_copies = total;
        }
        if self.available.is_some() {
            form.available_copies = self.available;
        }
        if self.category.is_some() {
            form.category = self.category;
        }
        if self.cover.is_some() {
            form.cover_image = self.cover;
        }
    }
}

#[derive(Subcommand, Debug)]
enum AdminBooksSubcommand {
    List {
        #[arg(long)]
        search: Option<String>,
    },
    Create(BookFields),
    Update {
        book_id: String,
        #[command(flatten)]
        fields: BookFields,
    },
    Delete {
        book_id: String,
    },
}

#[derive(Args, Debug)]
struct AdminUsersCommand {
    #[command(subcommand)]
    command: AdminUsersSubcommand,
}

#[derive(Subcommand, Debug)]
enum AdminUsersSubcommand {
    List {
        #[arg(long)]
        search: Option<String>,
    },
    Stats,
    ToggleStatus {
        user_id: String,
    },
    SetRole {
        user_id: String,
        /// member, librarian or admin.
        role: Role,
    },
    Delete {
        user_id: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = match ConfigOverrides::from_env().map_err(CliError::from).and_then(|env| resolve_config(&cli, env)) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(cli, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Flags win over the environment; the state dir defaults to the user config dir.
fn resolve_config(cli: &Cli, env: ConfigOverrides) -> Result<ClientConfig, CliError> {
    let flags = ConfigOverrides {
        mode: cli.mode,
        api_url: cli.api_url.clone(),
        timeout_secs: cli.timeout_secs,
        state_dir: cli.state_dir.clone(),
    };
    let defaults = ConfigOverrides {
        state_dir: dirs::config_dir().map(|dir| dir.join("libraryhub")),
        ..ConfigOverrides::default()
    };
    Ok(ClientConfig::from_overrides(flags.or(env).or(defaults))?)
}

async fn run(cli: Cli, config: ClientConfig) -> Result<(), CliError> {
    let storage: Box<dyn TokenStorage> = if cli.ephemeral {
        Box::new(MemoryTokenStorage::default())
    } else {
        let dir = config.state_dir.as_deref().ok_or(CliError::NoStateDir)?;
        Box::new(FileTokenStorage::in_dir(dir))
    };

    let app = App::new(&config, storage)?;
    app.startup().await;
    let out = Output { json: cli.json, config: &config };

    match cli.command {
        Command::Login { email, password } => {
            enter(&app, Route::Login)?;
            let notice = LoginForm { email, password }.submit(&app).await?;
            out.notice(&notice)
        }
        Command::Register { name, email, password, confirm_password } => {
            enter(&app, Route::Register)?;
            let confirm_password = confirm_password.unwrap_or_else(|| password.clone());
            let form = RegisterForm { name, email, password, confirm_password };
            let notice = form.submit(&app).await?;
            out.notice(&notice)
        }
        Command::Logout => {
            app.logout();
            out.notice(&Notice::success("Signed out"))
        }
        Command::Whoami => {
            let user = app.session().user().ok_or(CliError::NotSignedIn)?;
            out.user(&user)
        }
        Command::Books(books) => run_books(&app, &out, books).await,
        Command::History(history) => run_history(&app, &out, history).await,
        Command::Profile(profile) => run_profile(&app, &out, profile).await,
        Command::Admin(admin) => match admin.command {
            AdminSubcommand::Books(books) => run_admin_books(&app, &out, books).await,
            AdminSubcommand::Users(users) => run_admin_users(&app, &out, users).await,
        },
    }
}

/// Navigate through the guard; a redirect aborts the command.
fn enter(app: &App, route: Route) -> Result<(), CliError> {
    let landed = app.navigate(route);
    if landed == route {
        Ok(())
    } else {
        Err(CliError::Redirected { requested: route, landed })
    }
}

async fn run_books(app: &App, out: &Output<'_>, books: BooksCommand) -> Result<(), CliError> {
    enter(app, Route::Books)?;
    let mut view = BooksView::new(app.api().clone());
    match books.command {
        BooksSubcommand::List { search, category, page } => {
            if let Some(category) = &category {
                if !category.eq_ignore_ascii_case("all") && !CATEGORIES.contains(&category.as_str()) {
                    tracing::warn!(%category, "category is not one of the standard choices");
                }
            }
            view.open(search.as_deref().unwrap_or_default(), category.as_deref(), page)
                .await?;
            out.books(view.books())?;
            if !out.json {
                println!("page {} of {}", view.page(), view.total_pages());
            }
            Ok(())
        }
        BooksSubcommand::Borrow { book_id, due } => {
            view.load().await?;
            let today = OffsetDateTime::now_utc().date();
            let notice = view.borrow(&book_id, due, today).await?;
            out.notice(&notice)
        }
    }
}

async fn run_history(app: &App, out: &Output<'_>, history: HistoryCommand) -> Result<(), CliError> {
    enter(app, Route::BorrowHistory)?;
    let mut view = BorrowHistoryView::new(app.api().clone());
    match history.command {
        HistorySubcommand::List { tab } => {
            view.select_tab(tab).await?;
            out.records(view.records())
        }
        HistorySubcommand::Return { record_id } => {
            let notice = view.return_book(&record_id).await?;
            out.notice(&notice)
        }
    }
}

async fn run_profile(app: &App, out: &Output<'_>, profile: ProfileCommand) -> Result<(), CliError> {
    enter(app, Route::Profile)?;
    let mut view = ProfileView::new(app.api().clone());
    match profile.command {
        ProfileSubcommand::Show => {
            let user = view.load().await?.clone();
            out.user(&user)
        }
        ProfileSubcommand::Update { name, email, image } => {
            let mut form = ProfileForm::from_user(view.load().await?);
            if let Some(name) = name {
                form.name = name;
            }
            if let Some(email) = email {
                form.email = email;
            }
            form.profile_image = image;
            let notice = view.update(&form).await?;
            out.notice(&notice)
        }
        ProfileSubcommand::Password { current, new, confirm } => {
            let form = PasswordForm { current_password: current, new_password: new, confirm_password: confirm };
            let notice = view.change_password(&form).await?;
            out.notice(&notice)
        }
    }
}

async fn run_admin_books(app: &App, out: &Output<'_>, books: AdminBooksCommand) -> Result<(), CliError> {
    enter(app, Route::AdminBooks)?;
    let mut view = AdminBooksView::new(app.api().clone());
    match books.command {
        AdminBooksSubcommand::List { search } => {
            view.set_search(search.as_deref().unwrap_or_default()).await?;
            out.books(view.books())
        }
        AdminBooksSubcommand::Create(fields) => {
            let mut form = BookForm::default();
            fields.apply(&mut form);
            let notice = view.create(form).await?;
            out.notice(&notice)
        }
        AdminBooksSubcommand::Update { book_id, fields } => {
            view.load().await?;
            let book = view.find(&book_id).ok_or_else(|| CliError::UnknownBook(book_id.clone()))?;
            let mut form = BookForm::from_book(book);
            fields.apply(&mut form);
            let notice = view.update(&book_id, form).await?;
            out.notice(&notice)
        }
        AdminBooksSubcommand::Delete { book_id } => {
            let notice = view.delete(&book_id).await?;
            out.notice(&notice)
        }
    }
}

async fn run_admin_users(app: &App, out: &Output<'_>, users: AdminUsersCommand) -> Result<(), CliError> {
    enter(app, Route::AdminUsers)?;
    let mut view = AdminUsersView::new(app.api().clone());
    let notice = match users.command {
        AdminUsersSubcommand::List { search } => {
            view.set_search(search.as_deref().unwrap_or_default()).await?;
            return out.users(view.users());
        }
        AdminUsersSubcommand::Stats => {
            view.load().await?;
            return match view.stats() {
                Some(stats) if out.json => print_json(stats),
                Some(stats) => {
                    println!(
                        "users: {} (active {}, inactive {})",
                        stats.total_users, stats.active_users, stats.inactive_users
                    );
                    println!(
                        "roles: admin {}, librarian {}, member {}",
                        stats.users_by_role.admin, stats.users_by_role.librarian, stats.users_by_role.member
                    );
                    Ok(())
                }
                None => out.notice(&Notice::error("Statistics unavailable")),
            };
        }
        AdminUsersSubcommand::ToggleStatus { user_id } => view.toggle_status(&user_id).await?,
        AdminUsersSubcommand::SetRole { user_id, role } => view.change_role(&user_id, role).await?,
        AdminUsersSubcommand::Delete { user_id } => view.delete(&user_id).await?,
    };
    out.notice(&notice)
}

struct Output<'a> {
    json: bool,
    config: &'a ClientConfig,
}

impl Output<'_> {
    fn notice(&self, notice: &Notice) -> Result<(), CliError> {
        println!("{}", self.render_notice(notice)?);
        Ok(())
    }

    fn render_notice(&self, notice: &Notice) -> Result<String, CliError> {
        if self.json {
            return Ok(serde_json::to_string(notice)?);
        }
        Ok(notice.to_string())
    }

    fn user(&self, user: &User) -> Result<(), CliError> {
        if self.json {
            return print_json(user);
        }
        let status = if user.is_active { "active" } else { "inactive" };
        println!("{} <{}> [{}] {} (id {})", user.name, user.email, user.role, status, user.id);
        if let Some(image) = &user.profile_image {
            println!("image: {}", self.config.asset_url(image));
        }
        Ok(())
    }

    fn users(&self, users: &[User]) -> Result<(), CliError> {
        if self.json {
            return print_json(&users);
        }
        for user in users {
            let status = if user.is_active { "active" } else { "inactive" };
            println!("{:>6}  {:<24} {:<32} {:<10} {}", user.id, user.name, user.email, user.role, status);
        }
        Ok(())
    }

    fn books(&self, books: &[Book]) -> Result<(), CliError> {
        if self.json {
            return print_json(&books);
        }
        for book in books {
            println!(
                "{:>6}  {:<36} {:<24} {}/{} available{}",
                book.id,
                book.title,
                book.author,
                book.available_copies,
                book.total_copies,
                book.category.as_deref().map(|c| format!("  [{c}]")).unwrap_or_default()
            );
        }
        Ok(())
    }

    fn records(&self, records: &[BorrowRecord]) -> Result<(), CliError> {
        if self.json {
            return print_json(&records);
        }
        let now = OffsetDateTime::now_utc();
        for record in records {
            println!(
                "{:>6}  {:<36} due {}  {}",
                record.id,
                record.title(),
                record.due_date.date(),
                DueStatus::of(record, now)
            );
        }
        Ok(())
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), CliError> {
    let pretty = serde_json::to_string_pretty(value)?;
    println!("{pretty}");
    Ok(())
}

fn parse_day(raw: &str) -> Result<Date, String> {
    parse_date(raw).ok_or_else(|| format!("invalid date `{raw}`; expected YYYY-MM-DD"))
}
