use std::{path::PathBuf, process::ExitCode, sync::Arc};

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use cinema_promotions::{
    config::{self, AppConfig},
    errors::ServiceError,
    events::{self, EventSender},
    models::{
        DiscountType, ListQuery, Promotion, PromotionDraft, PromotionPatch, SortKey,
    },
    notifications::{Notification, NotificationLevel},
    queries::PromotionFilter,
    services::{
        assess,
        promotion_status::{assess_promotion, StatusFilter},
        reconciliation::drift,
        usage::remaining_uses,
        PromotionService,
    },
    session::{self, StoredSession},
    store::HttpPromotionStore,
};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::debug;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let json = cli.json;

    match run(cli).await {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(err) => match err.downcast_ref::<ServiceError>() {
            Some(service_err) => {
                render_notification(&Notification::from_error(service_err), json)?;
                Ok(ExitCode::FAILURE)
            }
            None => Err(err),
        },
    }
}

async fn run(cli: Cli) -> Result<()> {
    // commands that never touch the network
    match cli.command {
        Commands::Status(args) => return handle_status(args, cli.json),
        Commands::Session(command) => {
            let config = config::load_config().context("failed to load application config")?;
            return handle_session_command(&config, command, cli.json);
        }
        _ => {}
    }

    let context = CliContext::initialize().await?;
    let service = context.service();

    match cli.command {
        Commands::List(args) => handle_list(&context, &service, args, cli.json).await,
        Commands::Show(args) => handle_show(&service, args, cli.json).await,
        Commands::Create(args) => handle_create(&context, &service, args, cli.json).await,
        Commands::Edit(args) => handle_edit(&context, &service, args, cli.json).await,
        Commands::Toggle(args) => {
            let updated = service.toggle_status(&args.slug).await?;
            render_mutation(&updated, "Promotion status updated", cli.json)
        }
        Commands::Delete(args) => {
            service.delete(&args.slug, args.yes).await?;
            if cli.json {
                print_json(&Notification::success(format!("Deleted {}", args.slug)))
            } else {
                println!("Deleted {}", args.slug);
                Ok(())
            }
        }
        Commands::Redeem(args) => {
            let updated = service.record_redemption(&args.slug).await?;
            render_mutation(&updated, "Redemption recorded", cli.json)?;
            if !cli.json {
                println!("{} redemptions left", remaining_uses(&updated));
            }
            Ok(())
        }
        Commands::Resync(args) => match service.resync_status(&args.slug).await? {
            Some(updated) => render_mutation(&updated, "Status resynced", cli.json),
            None if cli.json => print_json(&Notification::info("Status already in sync")),
            None => {
                println!("{}: status already in sync", args.slug);
                Ok(())
            }
        },
        Commands::Share(args) => {
            let share_count = service.share(&args.slug).await?;
            if cli.json {
                print_json(&serde_json::json!({ "slug": args.slug, "shareCount": share_count }))
            } else {
                println!("{} shared {} times", args.slug, share_count);
                Ok(())
            }
        }
        Commands::Status(_) | Commands::Session(_) => Ok(()),
    }
}

#[derive(Parser)]
#[command(
    name = "promotions-cli",
    about = "Manage cinema promotions from the command line",
    version
)]
struct Cli {
    #[arg(
        long,
        global = true,
        action = ArgAction::SetTrue,
        help = "Render command output as pretty JSON when available"
    )]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List promotions with bucket statistics
    List(ListArgs),
    /// Show one promotion and how its status is derived
    Show(SlugArgs),
    Create(CreateArgs),
    /// Edit fields; the status is re-derived
    Edit(EditArgs),
    /// Flip between active and expired
    Toggle(SlugArgs),
    Delete(DeleteArgs),
    /// Record one redemption of the promotion code
    Redeem(SlugArgs),
    /// Persist the derived status if it drifted
    Resync(SlugArgs),
    Share(SlugArgs),
    /// Derive a status locally without contacting the API
    Status(StatusArgs),
    #[command(subcommand)]
    Session(SessionCommands),
}

#[derive(Subcommand)]
enum SessionCommands {
    /// Store a bearer token for mutating calls
    Set(SessionSetArgs),
    Show,
    Clear,
}

#[derive(Args)]
struct SessionSetArgs {
    #[arg(long, help = "Bearer token issued by the cinema backend")]
    token: String,
    #[arg(long, help = "Account the token belongs to")]
    email: Option<String>,
}

#[derive(Args)]
struct SlugArgs {
    slug: String,
}

#[derive(Args)]
struct DeleteArgs {
    slug: String,
    #[arg(long, action = ArgAction::SetTrue, help = "Confirm the deletion")]
    yes: bool,
}

#[derive(Args)]
struct ListArgs {
    #[arg(long, default_value_t = 1)]
    page: u32,
    #[arg(long, help = "Page size; defaults to the configured page size")]
    limit: Option<u32>,
    #[arg(long, default_value = "-createdAt", help = "Sort key, prefix with - for descending")]
    sort: SortKey,
    #[arg(long, default_value = "all", help = "all, active or expired")]
    status: StatusFilter,
    #[arg(long, help = "Match title, code or slug")]
    search: Option<String>,
}

#[derive(Clone, Copy, ValueEnum)]
enum DiscountTypeArg {
    Percentage,
    Fixed,
    FreeItem,
}

impl From<DiscountTypeArg> for DiscountType {
    fn from(value: DiscountTypeArg) -> Self {
        match value {
            DiscountTypeArg::Percentage => DiscountType::Percentage,
            DiscountTypeArg::Fixed => DiscountType::Fixed,
            DiscountTypeArg::FreeItem => DiscountType::FreeItem,
        }
    }
}

#[derive(Args)]
struct CreateArgs {
    #[arg(long)]
    title: String,
    #[arg(long)]
    code: String,
    #[arg(long, value_enum)]
    discount_type: DiscountTypeArg,
    #[arg(long)]
    discount_value: Decimal,
    #[arg(long, help = "RFC 3339 start, e.g. 2026-10-18T00:00:00Z")]
    start: DateTime<Utc>,
    #[arg(long, help = "RFC 3339 end")]
    end: DateTime<Utc>,
    #[arg(long)]
    max_usage: u32,
    #[arg(long)]
    description: Option<String>,
    #[arg(long)]
    image: Option<String>,
}

#[derive(Args)]
struct EditArgs {
    slug: String,
    #[arg(long)]
    title: Option<String>,
    #[arg(long)]
    code: Option<String>,
    #[arg(long, value_enum)]
    discount_type: Option<DiscountTypeArg>,
    #[arg(long)]
    discount_value: Option<Decimal>,
    #[arg(long)]
    start: Option<DateTime<Utc>>,
    #[arg(long)]
    end: Option<DateTime<Utc>>,
    #[arg(long)]
    max_usage: Option<u32>,
    #[arg(long)]
    description: Option<String>,
    #[arg(long)]
    image: Option<String>,
}

#[derive(Args)]
struct StatusArgs {
    #[arg(long)]
    start: DateTime<Utc>,
    #[arg(long)]
    end: DateTime<Utc>,
    #[arg(long, default_value_t = 0)]
    current_usage: u32,
    #[arg(long)]
    max_usage: u32,
    #[arg(long, help = "Evaluate at this instant instead of now")]
    at: Option<DateTime<Utc>>,
}

struct CliContext {
    config: AppConfig,
    store: Arc<HttpPromotionStore>,
    event_sender: Arc<EventSender>,
}

impl CliContext {
    async fn initialize() -> Result<Self> {
        let config = config::load_config().context("failed to load application config")?;
        config::init_tracing(config.log_level(), config.log_json);

        let token = session::resolve_token(&config).context("failed to read saved session")?;
        let store = HttpPromotionStore::from_config(&config, token)
            .context("failed to build promotions client")?;
        debug!(base_url = %store.base_url(), "promotions client ready");

        let (event_sender, event_rx) = events::channel(config.event_channel_capacity);
        tokio::spawn(events::process_events(event_rx, None));

        Ok(Self {
            config,
            store: Arc::new(store),
            event_sender: Arc::new(event_sender),
        })
    }

    fn service(&self) -> PromotionService {
        PromotionService::from_config(&self.config, self.store.clone(), self.event_sender.clone())
    }
}

async fn handle_list(
    context: &CliContext,
    service: &PromotionService,
    args: ListArgs,
    json: bool,
) -> Result<()> {
    let query = ListQuery {
        page: args.page,
        limit: args.limit.unwrap_or(context.config.default_page_size),
        sort: args.sort,
    };
    let page = service.load(&query).await?;
    let filter = PromotionFilter {
        status: args.status,
        search: args.search,
    };
    let promotions = service.filtered(&filter).await;
    let stats = service.stats().await;

    if json {
        return print_json(&ListOutput {
            promotions: &promotions,
            pagination: &page.pagination,
            active: stats.active,
            expired: stats.expired,
        });
    }

    println!(
        "Page {}/{} • {} promotions • {} active • {} expired",
        page.pagination.current_page,
        page.pagination.total_pages.max(1),
        page.pagination.total_items,
        stats.active,
        stats.expired
    );
    if promotions.is_empty() {
        println!("No promotions match.");
    }
    for promotion in &promotions {
        render_promotion(promotion);
    }
    Ok(())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ListOutput<'a> {
    promotions: &'a [Promotion],
    pagination: &'a cinema_promotions::models::Pagination,
    active: usize,
    expired: usize,
}

async fn handle_show(service: &PromotionService, args: SlugArgs, json: bool) -> Result<()> {
    let promotion = service.get(&args.slug).await?;
    let now = Utc::now();
    let assessment = assess_promotion(&promotion, now);
    let lag = drift(&promotion, now);

    if json {
        return print_json(&serde_json::json!({
            "promotion": promotion,
            "derived": assessment,
            "drift": lag,
        }));
    }

    render_promotion(&promotion);
    if let Some(description) = &promotion.description {
        println!("  {}", description);
    }
    println!(
        "  discount {} {} • shared {} times • {} redemptions left",
        promotion.discount_value,
        promotion.discount_type,
        promotion.share_count,
        remaining_uses(&promotion)
    );
    println!(
        "  derived status now: {} ({})",
        assessment.status, assessment.reason
    );
    if lag.is_some() {
        println!("  persisted status differs; run `promotions-cli resync {}`", promotion.slug);
    }
    Ok(())
}

async fn handle_create(
    context: &CliContext,
    service: &PromotionService,
    args: CreateArgs,
    json: bool,
) -> Result<()> {
    let draft = PromotionDraft {
        title: args.title,
        description: args.description,
        image: args.image,
        code: args.code,
        discount_type: args.discount_type.into(),
        discount_value: args.discount_value,
        start_date: args.start,
        end_date: args.end,
        max_usage: args.max_usage,
        content: Vec::new(),
    };

    // duplicate codes are checked against the current listing
    service
        .load(&ListQuery::page(1, context.config.max_page_size))
        .await
        .context("failed to load existing promotions")?;
    let created = service.create(draft).await?;
    render_mutation(&created, "Promotion created", json)
}

async fn handle_edit(
    context: &CliContext,
    service: &PromotionService,
    args: EditArgs,
    json: bool,
) -> Result<()> {
    let changes = PromotionPatch {
        title: args.title,
        code: args.code,
        discount_type: args.discount_type.map(Into::into),
        discount_value: args.discount_value,
        start_date: args.start,
        end_date: args.end,
        max_usage: args.max_usage,
        description: args.description,
        image: args.image,
        ..Default::default()
    };
    if changes.code.is_some() {
        service
            .load(&ListQuery::page(1, context.config.max_page_size))
            .await
            .context("failed to load existing promotions")?;
    }
    let updated = service.edit(&args.slug, changes).await?;
    render_mutation(&updated, "Promotion updated", json)
}

fn handle_status(args: StatusArgs, json: bool) -> Result<()> {
    let at = args.at.unwrap_or_else(Utc::now);
    let assessment = assess(at, args.start, args.end, args.current_usage, args.max_usage);
    if json {
        return print_json(&assessment);
    }
    println!("{} ({})", assessment.status, assessment.reason);
    Ok(())
}

fn handle_session_command(config: &AppConfig, command: SessionCommands, json: bool) -> Result<()> {
    let path: PathBuf = session::session_path(config)
        .ok_or_else(|| anyhow!("no session location; set HOME or session_file"))?;

    match command {
        SessionCommands::Set(args) => {
            let stored = StoredSession::new(args.token, args.email);
            session::save_session(&path, &stored)?;
            if json {
                print_json(&Notification::success(format!("Session saved to {}", path.display())))
            } else {
                println!("Session saved to: {}", path.display());
                Ok(())
            }
        }
        SessionCommands::Show => {
            let stored = session::read_session(&path)?;
            if json {
                return print_json(&stored.map(|s| {
                    serde_json::json!({ "email": s.email, "savedAt": s.saved_at })
                }));
            }
            match stored {
                Some(s) => println!(
                    "Signed in as {} (saved {})",
                    s.email.as_deref().unwrap_or("unknown account"),
                    s.saved_at
                ),
                None => println!("No saved session at {}", path.display()),
            }
            Ok(())
        }
        SessionCommands::Clear => {
            let removed = session::clear_session_file(&path)?;
            if !json {
                if removed {
                    println!("Cleared session file {}", path.display());
                } else {
                    println!("No saved session at {}", path.display());
                }
            }
            Ok(())
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn render_mutation(promotion: &Promotion, message: &str, json: bool) -> Result<()> {
    if json {
        return print_json(promotion);
    }
    println!("{}", message);
    render_promotion(promotion);
    Ok(())
}

fn render_promotion(promotion: &Promotion) {
    println!(
        "- {} • {} • code {} • {} [{}] • {}/{} used • {} → {}",
        promotion.slug,
        promotion.title,
        promotion.code,
        promotion.status,
        promotion.status.bucket(),
        promotion.current_usage,
        promotion.max_usage,
        promotion.start_date.format("%Y-%m-%d %H:%M"),
        promotion.end_date.format("%Y-%m-%d %H:%M"),
    );
}

fn render_notification(notification: &Notification, json: bool) -> Result<()> {
    if json {
        return print_json(notification);
    }
    let label = match notification.level {
        NotificationLevel::Success => "ok",
        NotificationLevel::Info => "note",
        NotificationLevel::Warning => "warning",
        NotificationLevel::Error => "error",
    };
    eprintln!("{}: {}", label, notification.message);
    for field in &notification.fields {
        eprintln!("  {}: {}", field.field, field.message);
    }
    Ok(())
}
