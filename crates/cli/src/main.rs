use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use cardex_core::CardId;
use cardex_fetch::{
    DiscoveryError, HttpClient, JpParser, Locale, Pipeline, PipelineConfig, RateLimiter,
    SearchParams, TwParser,
};
use cardex_storage::{CardStore, SqliteInitError, SqliteRepository, StorageError, copy_cards};
use clap::{Args, Parser, Subcommand, ValueEnum};
use thiserror::Error;

/// `cardex` — a local `SQLite` mirror of PTCG card detail pages (§6).
#[derive(Parser)]
#[command(name = "cardex", about = "PTCG card data ingestion tool")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create/initialize the SQLite schema.
    InitDb(InitDbArgs),
    /// Fetch cards from the upstream search or a single id, and upsert them.
    Sync(SyncArgs),
    /// Copy cards from a source DB into a destination DB, optionally filtered by regulation mark.
    CopyCards(CopyCardsArgs),
    /// Fuzzy-search cards by name.
    Query(QueryArgs),
    /// Print one card's detail.
    Show(ShowArgs),
}

#[derive(Args)]
struct InitDbArgs {
    #[arg(long, default_value = "cardex.sqlite")]
    db: PathBuf,
}

#[derive(Args)]
struct SyncArgs {
    #[arg(long, default_value = "cardex.sqlite")]
    db: PathBuf,

    #[arg(long, value_enum, default_value = "tw")]
    locale: LocaleArg,

    #[arg(long)]
    card_id: Option<u64>,
    #[arg(long, value_enum, default_value = "all")]
    card_type: CardTypeArg,
    #[arg(long, default_value = "all")]
    regulation: String,
    #[arg(long = "regulation-mark")]
    regulation_mark: Vec<String>,
    #[arg(long, default_value = "")]
    keyword: String,

    #[arg(long, default_value_t = 1)]
    start_page: u32,
    #[arg(long)]
    end_page: Option<u32>,
    #[arg(long)]
    limit: Option<usize>,

    #[arg(long, default_value_t = 4)]
    workers: usize,
    #[arg(long = "list-workers", default_value_t = 8)]
    list_workers: usize,
    #[arg(long, default_value_t = 0.1)]
    delay: f64,

    #[arg(long = "no-skip-existing")]
    no_skip_existing: bool,
}

#[derive(Args)]
struct CopyCardsArgs {
    #[arg(long)]
    src: PathBuf,
    #[arg(long)]
    dst: PathBuf,
    #[arg(long = "regulation-mark")]
    regulation_mark: Vec<String>,
}

#[derive(Args)]
struct QueryArgs {
    #[arg(long, default_value = "cardex.sqlite")]
    db: PathBuf,
    #[arg(long)]
    name: String,
    #[arg(long, default_value_t = 20)]
    limit: u32,
}

#[derive(Args)]
struct ShowArgs {
    #[arg(long, default_value = "cardex.sqlite")]
    db: PathBuf,
    #[arg(long)]
    card_id: u64,
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LocaleArg {
    Tw,
    Jp,
}

impl From<LocaleArg> for Locale {
    fn from(arg: LocaleArg) -> Self {
        match arg {
            LocaleArg::Tw => Locale::Tw,
            LocaleArg::Jp => Locale::Jp,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CardTypeArg {
    All,
    Pokemon,
    Trainer,
    Energy,
}

impl CardTypeArg {
    /// The raw token the upstream search form expects, mirroring
    /// `_parse_card_type_arg` in `__main__.py`.
    fn upstream_token(self) -> &'static str {
        match self {
            CardTypeArg::All => "all",
            CardTypeArg::Pokemon => "1",
            CardTypeArg::Trainer => "2",
            CardTypeArg::Energy => "3",
        }
    }
}

/// Failures detected before any worker starts (§7).
#[derive(Debug, Error)]
enum PrecondError {
    #[error("source DB not found: {0}")]
    SourceDbMissing(PathBuf),

    #[error("--card-id is required when --locale jp is given; jp has no search endpoint")]
    JpRequiresCardId,
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Precond(#[from] PrecondError),

    #[error(transparent)]
    SqliteInit(#[from] SqliteInitError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Splits each `--regulation-mark` value on comma/whitespace, trims, and
/// upper-cases, matching `cmd_sync`/`cmd_copy_cards`'s `str.replace(" ",
/// ",").split(",")` normalization in `__main__.py`. Returns `None` when no
/// marks were given, so callers can distinguish "no filter" from "filter to
/// nothing".
fn normalize_marks(raw: &[String]) -> Option<Vec<String>> {
    let mut marks = BTreeSet::new();
    for item in raw {
        for part in item.replace(' ', ",").split(',') {
            let part = part.trim();
            if !part.is_empty() {
                marks.insert(part.to_uppercase());
            }
        }
    }
    if marks.is_empty() {
        None
    } else {
        Some(marks.into_iter().collect())
    }
}

fn sqlite_url(path: &Path) -> std::io::Result<String> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(format!("sqlite://{}?mode=rwc", path.display()))
}

async fn open_store(path: &Path) -> Result<Arc<SqliteRepository>, CliError> {
    let url = sqlite_url(path)?;
    let repo = SqliteRepository::connect(&url).await?;
    Ok(Arc::new(repo))
}

async fn cmd_init_db(args: InitDbArgs) -> Result<i32, CliError> {
    open_store(&args.db).await?;
    println!("DB initialized: {}", args.db.display());
    Ok(0)
}

async fn cmd_copy_cards(args: CopyCardsArgs) -> Result<i32, CliError> {
    if !args.src.exists() {
        return Err(PrecondError::SourceDbMissing(args.src.clone()).into());
    }

    let source = open_store(&args.src).await?;
    let dest = open_store(&args.dst).await?;

    let marks = normalize_marks(&args.regulation_mark).unwrap_or_default();
    let copied = copy_cards(source.as_ref(), dest.as_ref(), &marks).await?;

    eprintln!(
        "copied {copied} cards from {} to {}",
        args.src.display(),
        args.dst.display()
    );
    if !marks.is_empty() {
        eprintln!("regulation marks: {}", marks.join(","));
    }
    Ok(0)
}

async fn cmd_sync(args: SyncArgs) -> Result<i32, CliError> {
    let locale: Locale = args.locale.into();
    if !locale.supports_discovery() && args.card_id.is_none() {
        return Err(PrecondError::JpRequiresCardId.into());
    }

    let store = open_store(&args.db).await?;
    let limiter = Arc::new(RateLimiter::new(Duration::from_secs_f64(args.delay)));
    let client = HttpClient::new(limiter, 3, Duration::from_millis(500));
    let parser: Arc<dyn cardex_fetch::DetailParser + Send + Sync> = match locale {
        Locale::Tw => Arc::new(TwParser),
        Locale::Jp => Arc::new(JpParser),
    };
    let pipeline = Pipeline::new(client, locale, parser, store.clone());

    let allowed_marks = normalize_marks(&args.regulation_mark);
    let config = PipelineConfig {
        start_page: args.start_page.max(1),
        end_page: args.end_page,
        workers: args.workers,
        list_workers: args.list_workers,
        allowed_regulation_marks: allowed_marks.clone(),
        skip_existing: !args.no_skip_existing,
        limit: args.limit,
    };

    let keyword = if args.keyword.trim().is_empty() { None } else { Some(args.keyword.clone()) };
    let params = SearchParams::new(keyword, args.card_type.upstream_token(), Some(args.regulation.clone()));
    let params_ref = if args.card_id.is_some() { None } else { Some(&params) };

    let summary = pipeline
        .run(params_ref, args.card_id, &config, |ok| {
            eprintln!("[ok] {ok}");
        })
        .await?;

    if let Some(total_pages) = summary.total_pages {
        eprintln!("total pages: {total_pages}");
    }

    if let Some(marks) = &allowed_marks {
        eprintln!(
            "done: ok={} skipped={} fail={} marks={} db={}",
            summary.ok,
            summary.skipped,
            summary.fail,
            marks.join(","),
            args.db.display()
        );
    } else {
        eprintln!(
            "done: ok={} fail={} db={}",
            summary.ok,
            summary.fail,
            args.db.display()
        );
    }

    Ok(if summary.fail == 0 { 0 } else { 2 })
}

async fn cmd_query(args: QueryArgs) -> Result<i32, CliError> {
    let store = open_store(&args.db).await?;
    let name = args.name.trim();
    if name.is_empty() {
        eprintln!("--name is required");
        return Ok(2);
    }

    let cards = store.query_by_name(name, args.limit).await?;
    for card in &cards {
        println!(
            "{}\t{}\t{}\t{}\t{}",
            card.card_id,
            card.name,
            card.expansion_code.as_deref().unwrap_or(""),
            card.collector_number.as_deref().unwrap_or(""),
            card.card_type,
        );
    }
    Ok(0)
}

async fn cmd_show(args: ShowArgs) -> Result<i32, CliError> {
    let store = open_store(&args.db).await?;
    let Some(with_skills) = store.get_card(CardId::new(args.card_id)).await? else {
        eprintln!("card not found: {}", args.card_id);
        return Ok(2);
    };

    if args.json {
        print_card_json(&with_skills);
        return Ok(0);
    }

    print_card_human(&with_skills);
    Ok(0)
}

fn print_card_json(with_skills: &cardex_storage::CardWithSkills) {
    let card = &with_skills.card;
    let skills: Vec<serde_json::Value> = with_skills
        .skills
        .iter()
        .map(|s| {
            serde_json::json!({
                "idx": s.idx,
                "kind": s.kind,
                "name": s.name,
                "cost": s.cost,
                "damage": s.damage,
                "effect": s.effect,
            })
        })
        .collect();

    let payload = serde_json::json!({
        "card_id": card.card_id.value(),
        "name": card.name,
        "source_url": card.source_url,
        "fetched_at": card.fetched_at.to_rfc3339(),
        "card_type": card.card_type.as_str(),
        "evolve_marker": card.evolve_marker,
        "regulation_mark": card.regulation_mark,
        "expansion_code": card.expansion_code,
        "expansion_name": card.expansion_name,
        "expansion_symbol_url": card.expansion_symbol_url,
        "collector_number": card.collector_number,
        "illustrator": card.illustrator,
        "image_url": card.image_url,
        "hp": card.hp,
        "retreat_cost": card.retreat_cost,
        "pokedex_no": card.pokedex_no,
        "height_m": card.height_m,
        "weight_kg": card.weight_kg,
        "element_code": card.element_code,
        "element": card.element,
        "weakness_code": card.weakness_code,
        "weakness_value": card.weakness_value,
        "resistance_code": card.resistance_code,
        "resistance_value": card.resistance_value,
        "description": card.description,
        "skills": skills,
    });

    println!("{}", serde_json::to_string_pretty(&payload).unwrap_or_default());
}

fn fmt_energy(code: Option<&str>) -> String {
    code.map(|c| format!("[{c}]")).unwrap_or_default()
}

fn print_card_human(with_skills: &cardex_storage::CardWithSkills) {
    let card = &with_skills.card;
    println!("{}  (card_id={})", card.name, card.card_id);

    let mut header_bits = Vec::new();
    header_bits.push(card.card_type.to_string());
    if let Some(hp) = card.hp {
        header_bits.push(format!("HP {hp}"));
    }
    if card.element_code.is_some() || card.element.is_some() {
        header_bits.push(format!(
            "{}{}",
            fmt_energy(card.element_code.as_deref()),
            card.element.as_deref().unwrap_or("")
        ));
    }
    if let Some(marker) = &card.evolve_marker {
        header_bits.push(marker.clone());
    }
    println!(" - {}", header_bits.join(" / "));

    let line = |label: &str, value: Option<String>| {
        if let Some(v) = value {
            let v = v.trim();
            if !v.is_empty() && v != "--" {
                println!("{label}: {v}");
            }
        }
    };

    let expansion = format!(
        "{} {}",
        card.expansion_code.as_deref().unwrap_or(""),
        card.expansion_name.as_deref().unwrap_or("")
    );
    line("系列", Some(expansion).filter(|s| !s.trim().is_empty()));
    line("卡號", card.collector_number.clone());
    line("規則標記", card.regulation_mark.clone());
    line("插畫家", card.illustrator.clone());
    line("圖片", card.image_url.clone());
    line("來源", Some(card.source_url.clone()));
    line("抓取時間", Some(card.fetched_at.to_rfc3339()));

    if let Some(value) = &card.weakness_value {
        line("弱點", Some(format!("{} {value}", fmt_energy(card.weakness_code.as_deref()))));
    }
    if let Some(value) = &card.resistance_value {
        line("抵抗力", Some(format!("{} {value}", fmt_energy(card.resistance_code.as_deref()))));
    }
    if let Some(retreat) = card.retreat_cost {
        line("撤退", Some(retreat.to_string()));
    }
    if let Some(no) = card.pokedex_no {
        line("No.", Some(format!("No.{no}")));
    }
    if let Some(h) = card.height_m {
        line("身高", Some(format!("{h} m")));
    }
    if let Some(w) = card.weight_kg {
        line("體重", Some(format!("{w} kg")));
    }
    if let Some(desc) = &card.description {
        println!("說明:");
        println!("{desc}");
    }

    if !with_skills.skills.is_empty() {
        println!("\n招式/效果:");
        for skill in &with_skills.skills {
            let left = [skill.kind.as_deref(), skill.name.as_deref()]
                .into_iter()
                .flatten()
                .collect::<Vec<_>>()
                .join(" ");
            let cost_txt: String = skill.cost.iter().map(|c| fmt_energy(Some(c))).collect();
            let right = [Some(cost_txt).filter(|s| !s.is_empty()), skill.damage.clone()]
                .into_iter()
                .flatten()
                .collect::<Vec<_>>()
                .join(" ");
            println!("- {left}");
            if !right.is_empty() {
                println!("  {right}");
            }
            if let Some(effect) = &skill.effect {
                for line in effect.lines() {
                    println!("  {line}");
                }
            }
        }
    }
}

async fn run(cli: Cli) -> Result<i32, CliError> {
    match cli.command {
        Command::InitDb(args) => cmd_init_db(args).await,
        Command::Sync(args) => cmd_sync(args).await,
        Command::CopyCards(args) => cmd_copy_cards(args).await,
        Command::Query(args) => cmd_query(args).await,
        Command::Show(args) => cmd_show(args).await,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let code = match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{err}");
            1
        }
    };
    std::process::exit(code);
}
