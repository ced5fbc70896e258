use anyhow::{Context as AnyhowContext, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use config::AppConfig;
use github::{GitHubConfig, GitHubSource};
use repowiki_generation::{OpenAiChat, OpenAiChatConfig, TextGeneration};
use repowiki_pipeline::{JsonFileStore, Strategy, WikiGenerator, WikiStore};
use repowiki_protocol::{serialize_json, serialize_json_pretty, RepoId, SubsystemId};
use repowiki_vector_store::{
    EmbeddingCapability, EmbeddingMode, OpenAiEmbedder, OpenAiEmbedderConfig, StubEmbedder,
};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

mod archive;
mod config;
mod github;
mod http_api;
mod server_security;

fn print_stdout(text: &str) -> Result<()> {
    use std::io::Write;

    let mut stdout = io::stdout().lock();
    if let Err(err) = stdout
        .write_all(text.as_bytes())
        .and_then(|_| stdout.write_all(b"\n"))
        .and_then(|_| stdout.flush())
    {
        if err.kind() == io::ErrorKind::BrokenPipe {
            return Ok(());
        }
        return Err(err.into());
    }
    Ok(())
}

#[derive(Parser)]
#[command(name = "repowiki")]
#[command(about = "Generate subsystem wikis for GitHub repositories", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors (stdout is reserved for JSON)
    #[arg(long, global = true)]
    quiet: bool,

    /// Config file (defaults to ./repowiki.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Wiki store file (overrides REPOWIKI_STORE and [store].path)
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    /// Override embedding backend in this process
    #[arg(long, global = true, value_enum)]
    embed_mode: Option<EmbedMode>,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate (or regenerate) the wiki page of a repository
    Generate(GenerateArgs),

    /// Write the markdown deep dive of one stored subsystem
    Detail(DetailArgs),

    /// Print the stored wiki page of a repository
    Show(ShowArgs),

    /// Serve the generation API over HTTP
    Serve(ServeArgs),
}

#[derive(Args)]
struct GenerateArgs {
    /// GitHub repository URL
    repo_url: String,

    /// How files are grouped into subsystems
    #[arg(long, value_enum, default_value_t = StrategyArg::Paths)]
    strategy: StrategyArg,
}

#[derive(Args)]
struct DetailArgs {
    /// Stored subsystem id
    subsystem_id: SubsystemId,
}

#[derive(Args)]
struct ShowArgs {
    /// GitHub repository URL
    repo_url: String,

    /// Pretty-print the page
    #[arg(long)]
    pretty: bool,
}

#[derive(Args)]
struct ServeArgs {
    /// Address to bind
    #[arg(long, default_value = "127.0.0.1:8080")]
    bind: String,

    /// Allow binding to non-loopback addresses (requires an auth token)
    #[arg(long)]
    public: bool,

    /// Bearer token required on every request (or REPOWIKI_AUTH_TOKEN)
    #[arg(long)]
    auth_token: Option<String>,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum StrategyArg {
    Paths,
    Content,
}

impl From<StrategyArg> for Strategy {
    fn from(value: StrategyArg) -> Self {
        match value {
            StrategyArg::Paths => Strategy::Paths,
            StrategyArg::Content => Strategy::Content,
        }
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum EmbedMode {
    Openai,
    Stub,
}

impl EmbedMode {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Openai => "openai",
            Self::Stub => "stub",
        }
    }
}

pub async fn main_entry() -> Result<()> {
    let cli = Cli::parse();

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    if !cli.verbose {
        builder.filter_module("reqwest", log::LevelFilter::Warn);
        builder.filter_module("hyper", log::LevelFilter::Warn);
    }
    builder.target(env_logger::Target::Stderr).init();

    let mut config = AppConfig::load(cli.config.as_deref())?;
    if let Some(store) = cli.store {
        config.store.path = store;
    }
    if let Some(mode) = cli.embed_mode {
        config.openai.embedding_mode = mode.as_str().to_string();
    }

    match cli.command {
        Commands::Generate(args) => run_generate(args, &config).await?,
        Commands::Detail(args) => run_detail(args, &config).await?,
        Commands::Show(args) => run_show(args, &config).await?,
        Commands::Serve(args) => serve_http(args, &config).await?,
    }

    Ok(())
}

async fn run_generate(args: GenerateArgs, config: &AppConfig) -> Result<()> {
    let wiki = build_generator(config).await?;
    let id = wiki
        .generate(&args.repo_url, args.strategy.into())
        .await
        .map_err(|err| anyhow::anyhow!("{} ({})", err.message, err.kind.as_str()))?;
    print_stdout(&serialize_json(&serde_json::json!({ "id": id }))?)
}

async fn run_detail(args: DetailArgs, config: &AppConfig) -> Result<()> {
    let wiki = build_generator(config).await?;
    let detail = wiki
        .generate_subsystem_detail(args.subsystem_id)
        .await
        .map_err(|err| anyhow::anyhow!("{} ({})", err.message, err.kind.as_str()))?;
    print_stdout(&serialize_json(&detail)?)
}

async fn run_show(args: ShowArgs, config: &AppConfig) -> Result<()> {
    let repo = RepoId::parse(&args.repo_url)?;
    let store = JsonFileStore::open(&config.store.path)
        .await
        .with_context(|| format!("Failed to open wiki store {}", config.store.path.display()))?;
    let Some(page) = store.find_page_by_repo_url(&repo.canonical_url()).await? else {
        anyhow::bail!("No wiki page stored for {repo}");
    };
    let text = if args.pretty {
        serialize_json_pretty(&page)?
    } else {
        serialize_json(&page)?
    };
    print_stdout(&text)
}

async fn serve_http(args: ServeArgs, config: &AppConfig) -> Result<()> {
    let auth = server_security::ApiToken::resolve(
        args.auth_token,
        std::env::var(server_security::AUTH_TOKEN_ENV).ok(),
    )?;
    let addr =
        server_security::guarded_listen_addr(&args.bind, args.public, auth.as_ref()).await?;

    let state = http_api::HttpState {
        wiki: Arc::new(build_generator(config).await?),
        auth,
    };
    let has_auth = state.auth.is_some();
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let base_url = format!("http://{}", listener.local_addr()?);

    log::info!("Serving wiki API on {base_url}");
    print_stdout(&format!("Serving wiki API: {base_url}/generate"))?;
    print_stdout(&format!("Health endpoint: {base_url}/health"))?;
    if has_auth {
        print_stdout(&format!(
            "Auth enabled: add header 'Authorization: Bearer ${}'",
            server_security::AUTH_TOKEN_ENV
        ))?;
    }

    axum::serve(listener, http_api::router(state)).await?;
    Ok(())
}

async fn build_generator(config: &AppConfig) -> Result<WikiGenerator> {
    let api_key = config
        .openai
        .api_key
        .clone()
        .context("OPENAI_API_KEY is not set (or [openai].api_key in the config file)")?;

    let generator: Arc<dyn TextGeneration> = Arc::new(OpenAiChat::new(OpenAiChatConfig {
        api_key: api_key.clone(),
        base_url: config.openai.base_url.clone(),
        model: config.openai.model.clone(),
        timeout: Duration::from_secs(config.openai.timeout_secs),
        max_retries: config.openai.max_retries,
    })?);

    let embedder: Arc<dyn EmbeddingCapability> =
        match EmbeddingMode::parse(&config.openai.embedding_mode.to_ascii_lowercase())? {
            EmbeddingMode::Stub => Arc::new(StubEmbedder::default()),
            EmbeddingMode::OpenAi => Arc::new(OpenAiEmbedder::new(OpenAiEmbedderConfig {
                api_key,
                base_url: config.openai.base_url.clone(),
                model: config.openai.embedding_model.clone(),
                dimensions: None,
                timeout: Duration::from_secs(config.openai.timeout_secs),
                max_retries: config.openai.max_retries,
            })?),
        };

    let source = Arc::new(GitHubSource::new(GitHubConfig {
        token: config.github.token.clone(),
        api_base: config.github.api_base.clone(),
        timeout: Duration::from_secs(config.github.timeout_secs),
    })?);

    let store = Arc::new(
        JsonFileStore::open(&config.store.path)
            .await
            .with_context(|| {
                format!("Failed to open wiki store {}", config.store.path.display())
            })?,
    );

    Ok(WikiGenerator::new(
        generator,
        embedder,
        source,
        store,
        config.pipeline.clone(),
    )?)
}
