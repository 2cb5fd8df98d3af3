use anyhow::{anyhow, bail, Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use client::{
    CachedApi, ClientConfig, HttpApi, ListApi, ListController, Phase, Session, TableView,
};
use log::{debug, info};
use shared::dto::refund::{RefundDecision, RefundDecisionForm};
use shared::error::ClientError;
use shared::filter::{DateRange, FilterPatch, FilterState};
use shared::models::auth::Role;
use shared::query::SortOrder;
use shared::resource::ListResource;
use shared::{Refunds, Registrations, Teams, Tickets};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::time::Instant;

/// Filter fields matched exactly; everything else, including season labels
/// such as "Spring 2024", is matched as free text.
const CHOICE_FIELDS: [&str; 3] = ["status", "grade", "gender"];

type Api = CachedApi<HttpApi>;

#[derive(Parser, Debug)]
#[command(name = "courtside-admin")]
#[command(about = "Browse and manage the club's ticket, team, registration and refund lists")]
struct Cli {
    /// Backend origin, e.g. https://club.example
    #[arg(long, env = "COURTSIDE_API_URL")]
    api_url: Option<String>,
    /// Admin session token
    #[arg(long, env = "COURTSIDE_TOKEN", hide_env_values = true)]
    token: Option<String>,
    /// Role of the token's user
    #[arg(long, env = "COURTSIDE_ROLE", default_value = "admin")]
    role: Role,
    #[arg(long, env = "COURTSIDE_PAGE_SIZE")]
    page_size: Option<u32>,
    /// Quiet window for filter edits in watch mode
    #[arg(long, env = "COURTSIDE_DEBOUNCE_MS")]
    debounce_ms: Option<u64>,
    #[arg(long, env = "COURTSIDE_REQUEST_TIMEOUT_SECS")]
    timeout_secs: Option<u64>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print one page of a list
    List {
        resource: Resource,
        #[command(flatten)]
        query: QueryArgs,
        /// Print the page as JSON instead of a table
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Delete a row on the selected page
    Delete {
        resource: Resource,
        id: String,
        #[command(flatten)]
        query: QueryArgs,
        /// Skip the confirmation prompt
        #[arg(long, short, default_value_t = false)]
        yes: bool,
    },
    /// Download the CSV export for the current filters
    Export {
        resource: Resource,
        #[command(flatten)]
        query: QueryArgs,
        #[arg(long, short)]
        out: PathBuf,
    },
    /// Approve or deny a pending refund request
    Refund {
        decision: Decision,
        id: String,
        #[arg(long)]
        note: Option<String>,
        /// Email the customer about the decision
        #[arg(long, default_value_t = false)]
        notify: bool,
        #[command(flatten)]
        query: QueryArgs,
        #[arg(long, short, default_value_t = false)]
        yes: bool,
    },
    /// Interactive list: edit filters, page and sort from stdin
    Watch {
        resource: Resource,
        #[command(flatten)]
        query: QueryArgs,
    },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Resource {
    Tickets,
    Teams,
    Registrations,
    Refunds,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Decision {
    Approve,
    Deny,
}

impl From<Decision> for RefundDecision {
    fn from(decision: Decision) -> Self {
        match decision {
            Decision::Approve => RefundDecision::Approve,
            Decision::Deny => RefundDecision::Deny,
        }
    }
}

#[derive(Args, Debug, Clone, Default)]
struct QueryArgs {
    /// Filter as field=value; repeatable
    #[arg(long = "filter", short = 'f', value_parser = parse_filter)]
    filters: Vec<(String, String)>,
    /// Earliest date, YYYY-MM-DD
    #[arg(long, value_parser = parse_date)]
    from: Option<NaiveDate>,
    /// Latest date, YYYY-MM-DD
    #[arg(long, value_parser = parse_date)]
    to: Option<NaiveDate>,
    /// dateDesc, dateAsc, amountDesc, amountAsc, nameAsc or nameDesc
    #[arg(long)]
    sort: Option<SortOrder>,
    #[arg(long, default_value_t = 1)]
    page: u32,
}

impl QueryArgs {
    fn filter_state(&self) -> FilterState {
        let state = self
            .filters
            .iter()
            .fold(FilterState::new(), |state, (field, value)| {
                if CHOICE_FIELDS.contains(&field.as_str()) {
                    state.with_choice(field, value)
                } else {
                    state.with_text(field, value)
                }
            });
        state.with_date_range(DateRange::new(self.from, self.to))
    }
}

fn parse_filter(raw: &str) -> Result<(String, String), String> {
    let (field, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected field=value, got {}", raw))?;
    let field = field.trim();
    if field.is_empty() {
        return Err(format!("missing field name in {}", raw));
    }
    Ok((field.to_lowercase(), value.trim().to_string()))
}

fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|e| format!("invalid date {}: {}", raw, e))
}

fn patch_for(field: &str, value: &str) -> FilterPatch {
    let field = field.to_lowercase();
    if CHOICE_FIELDS.contains(&field.as_str()) {
        FilterPatch::new().choice(&field, value)
    } else {
        FilterPatch::new().text(&field, value)
    }
}

fn title<L: ListResource>() -> String {
    let mut chars = L::NAME.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Runs `$func::<Resource>(args)` for the chosen resource.
macro_rules! dispatch {
    ($resource:expr, $func:ident($($arg:expr),* $(,)?)) => {
        match $resource {
            Resource::Tickets => $func::<Tickets>($($arg),*).await,
            Resource::Teams => $func::<Teams>($($arg),*).await,
            Resource::Registrations => $func::<Registrations>($($arg),*).await,
            Resource::Refunds => $func::<Refunds>($($arg),*).await,
        }
    };
}

fn build_config(cli: &Cli) -> Result<ClientConfig> {
    let mut config = ClientConfig::load().map_err(|e| anyhow!("{}", e))?;
    if let Some(url) = &cli.api_url {
        config.api_url = url.trim().trim_end_matches('/').to_string();
    }
    if let Some(token) = &cli.token {
        config.token = Some(token.clone());
    }
    if let Some(size) = cli.page_size.filter(|size| *size > 0) {
        config.page_size = size;
    }
    if let Some(ms) = cli.debounce_ms {
        config.debounce = Duration::from_millis(ms);
    }
    if let Some(secs) = cli.timeout_secs.filter(|secs| *secs > 0) {
        config.request_timeout = Duration::from_secs(secs);
    }
    config.validate().map_err(|e| anyhow!("{}", e))?;
    if config.api_url.is_empty() {
        bail!("COURTSIDE_API_URL (or --api-url) must be set to the backend origin");
    }
    Ok(config)
}

struct App {
    api: Api,
    session: Session,
    config: ClientConfig,
}

impl App {
    fn controller<L: ListResource>(&self) -> ListController<L, Api> {
        ListController::new(self.api.clone(), self.session.clone(), &self.config)
    }
}

async fn open<L: ListResource>(app: &App, query: &QueryArgs) -> Result<ListController<L, Api>> {
    let controller = app.controller::<L>();
    controller
        .open(query.filter_state(), query.sort, query.page)
        .await
        .into_result()?;
    Ok(controller)
}

fn print_table<L: ListResource, A: ListApi>(controller: &ListController<L, A>) {
    let table = TableView::from_view(&title::<L>(), &controller.view(), &controller.available_actions());
    println!("{}", table);
}

async fn list<L: ListResource>(app: &App, query: &QueryArgs, json: bool) -> Result<()> {
    let controller = open::<L>(app, query).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&controller.view().data)?);
    } else {
        print_table(&controller);
    }
    Ok(())
}

async fn ask(question: &str) -> Result<bool> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(format!("{} [y/N] ", question).as_bytes()).await?;
    stdout.flush().await?;

    let mut answer = String::new();
    BufReader::new(tokio::io::stdin()).read_line(&mut answer).await?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

async fn confirm_pending<L: ListResource>(
    controller: &ListController<L, Api>,
    prompt: &str,
    yes: bool,
) -> Result<bool> {
    if !yes && !ask(prompt).await? {
        controller.cancel_action();
        println!("Cancelled.");
        return Ok(false);
    }
    controller.confirm().await?;
    if let Some(banner) = controller.banner() {
        println!("{} {}", banner.level.icon(), banner.message);
    }
    Ok(true)
}

async fn delete<L: ListResource>(app: &App, id: &str, query: &QueryArgs, yes: bool) -> Result<()> {
    let controller = open::<L>(app, query).await?;
    let pending = controller.request_delete(id)?;
    if confirm_pending(&controller, &pending.prompt(), yes).await? {
        print_table(&controller);
    }
    Ok(())
}

async fn export<L: ListResource>(app: &App, query: &QueryArgs, out: &PathBuf) -> Result<()> {
    let controller = app.controller::<L>();
    controller.configure(query.filter_state(), query.sort, 1);
    let bytes = controller.export_csv().await?;
    tokio::fs::write(out, &bytes)
        .await
        .with_context(|| format!("writing {}", out.display()))?;
    println!("Wrote {} bytes to {}", bytes.len(), out.display());
    Ok(())
}

async fn refund(
    app: &App,
    decision: RefundDecision,
    id: &str,
    form: RefundDecisionForm,
    query: &QueryArgs,
    yes: bool,
) -> Result<()> {
    let controller = open::<Refunds>(app, query).await?;
    let pending = controller.request_refund_decision(id, decision, form)?;
    if confirm_pending(&controller, &pending.prompt(), yes).await? {
        print_table(&controller);
    }
    Ok(())
}

const WATCH_HELP: &str = "\
commands:
  set <field> <value>   edit a filter (applied after the quiet window)
  clear <field>         remove a filter
  from <date|->         set or clear the start date
  to <date|->           set or clear the end date
  search                apply pending edits now
  sort <order|none>     change the sort order
  next | prev | page N  move between pages
  refresh               reload, bypassing the cache
  show                  print the list
  quit";

/// Waits until pending edits have been dispatched and the load has finished.
async fn wait_settled<L: ListResource, A: ListApi>(controller: &ListController<L, A>, limit: Duration) {
    let deadline = Instant::now() + limit;
    tokio::time::sleep(Duration::from_millis(20)).await;
    while (controller.phase() == Phase::Loading || controller.has_pending_edit())
        && Instant::now() < deadline
    {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}

async fn watch<L: ListResource>(app: &App, query: &QueryArgs) -> Result<()> {
    let controller = Arc::new(open::<L>(app, query).await?);
    controller.start();
    print_table(&*controller);
    println!("{}", WATCH_HELP);

    let settle = app.config.request_timeout + app.config.debounce;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let mut words = line.split_whitespace();
        let Some(command) = words.next() else {
            continue;
        };
        let rest: Vec<&str> = words.collect();
        debug!("watch command {} {:?}", command, rest);

        match (command, rest.as_slice()) {
            ("quit" | "exit", _) => break,
            ("help", _) => println!("{}", WATCH_HELP),
            ("set", [field, value @ ..]) if !value.is_empty() => {
                controller.edit_filter(patch_for(field, &value.join(" ")));
                println!("(queued; applies after {:?} or on `search`)", app.config.debounce);
            }
            ("clear", [field]) => {
                controller.edit_filter(FilterPatch::new().clear(&field.to_lowercase()));
                println!("(queued)");
            }
            ("from" | "to", [raw]) => {
                let date = if *raw == "-" {
                    None
                } else {
                    match parse_date(raw) {
                        Ok(date) => Some(date),
                        Err(e) => {
                            println!("{}", e);
                            continue;
                        }
                    }
                };
                let current = controller.view().filters.date_range();
                let range = if command == "from" {
                    DateRange::new(date, current.end)
                } else {
                    DateRange::new(current.start, date)
                };
                controller.edit_filter(FilterPatch::new().date_range(range));
                println!("(queued)");
            }
            ("search", _) => {
                controller.search();
                wait_settled(&*controller, settle).await;
                print_table(&*controller);
            }
            ("sort", [token]) => {
                let sort = if token.eq_ignore_ascii_case("none") {
                    None
                } else {
                    match token.parse::<SortOrder>() {
                        Ok(sort) => Some(sort),
                        Err(e) => {
                            println!("{}", e);
                            continue;
                        }
                    }
                };
                controller.set_sort(sort).await;
                print_table(&*controller);
            }
            ("next", _) => {
                controller.next_page().await;
                print_table(&*controller);
            }
            ("prev", _) => {
                controller.prev_page().await;
                print_table(&*controller);
            }
            ("page", [n]) => match n.parse::<u32>() {
                Ok(page) => {
                    controller.set_page(page).await;
                    print_table(&*controller);
                }
                Err(_) => println!("page needs a number"),
            },
            ("refresh", _) => {
                controller.refresh().await;
                print_table(&*controller);
            }
            ("show", _) => {
                wait_settled(&*controller, settle).await;
                print_table(&*controller);
            }
            _ => println!("unknown command; type `help`"),
        }
    }

    controller.shutdown();
    info!("Watch session ended");
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    let config = build_config(&cli)?;
    let session = Session::new();
    if let Some(token) = &config.token {
        session.login(token.clone(), cli.role, None);
    }
    let api = CachedApi::new(HttpApi::new(&config)?, config.cache_ttl);
    let app = App {
        api,
        session,
        config,
    };

    match cli.command {
        Command::List {
            resource,
            query,
            json,
        } => dispatch!(resource, list(&app, &query, json)),
        Command::Delete {
            resource,
            id,
            query,
            yes,
        } => dispatch!(resource, delete(&app, &id, &query, yes)),
        Command::Export {
            resource,
            query,
            out,
        } => dispatch!(resource, export(&app, &query, &out)),
        Command::Refund {
            decision,
            id,
            note,
            notify,
            query,
            yes,
        } => {
            let form = RefundDecisionForm {
                note,
                notify_customer: notify,
            };
            refund(&app, decision.into(), &id, form, &query, yes).await
        }
        Command::Watch { resource, query } => dispatch!(resource, watch(&app, &query)),
    }
}

#[tokio::main]
async fn main() {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        match e.downcast_ref::<ClientError>() {
            Some(error) if error.is_auth() => {
                eprintln!("{}", error.user_message());
                eprintln!("Set COURTSIDE_TOKEN (or pass --token) to a valid admin session token.");
                std::process::exit(2);
            }
            Some(error) => {
                eprintln!("Error: {}", error.user_message());
                std::process::exit(1);
            }
            None => {
                eprintln!("Error: {:#}", e);
                std::process::exit(1);
            }
        }
    }
}
