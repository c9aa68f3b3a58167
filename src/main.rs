use std::{path::PathBuf, sync::Arc};

use clap::{Parser, Subcommand};
use color_eyre::{
    Result,
    eyre::{Context, eyre},
};
use zproxy::{
    Dispatcher, FileSystemAdapter, GracefulShutdown, HttpClientAdapter, RoutingTable,
    RoutingTableBuilder,
    config::{
        DEFAULT_CONFIG_DIR, DEFAULT_LISTEN_ADDR, LogFormat, ServerConfig, SiteConfig, SiteRoute,
        loader::load_sites,
    },
    ports::http_client::HttpClient,
    server, tracing_setup,
};

#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    #[clap(subcommand)]
    command: Option<Commands>,

    /// Directory holding one site file per host
    #[clap(
        short = 'd',
        long,
        env = "ZPROXY_CONFIG_DIR",
        default_value = DEFAULT_CONFIG_DIR,
        global = true
    )]
    config_dir: PathBuf,

    /// Address to listen on
    #[clap(short, long, env = "ZPROXY_LISTEN", default_value = DEFAULT_LISTEN_ADDR, global = true)]
    listen: String,

    #[clap(long, env = "ZPROXY_LOG_FORMAT", value_enum, default_value = "json", global = true)]
    log_format: LogFormat,

    /// Log filter directive, e.g. `info` or `zproxy=debug`
    #[clap(long, env = "ZPROXY_LOG", default_value = "info", global = true)]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the router (default)
    Serve,
    /// Load and register every site file, print a summary and exit
    Validate,
}

impl Args {
    fn server_config(&self) -> ServerConfig {
        ServerConfig {
            listen_addr: self.listen.clone(),
            config_dir: self.config_dir.clone(),
            log_format: self.log_format,
            log_level: self.log_level.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::parse();
    let config = args.server_config();

    match args.command.unwrap_or(Commands::Serve) {
        Commands::Validate => validate_command(&config),
        Commands::Serve => serve_command(config).await,
    }
}

/// Load every site file and register it. Any failure aborts.
fn build_routing_table(
    config: &ServerConfig,
    http_client: Arc<dyn HttpClient>,
) -> Result<(Vec<SiteConfig>, RoutingTable)> {
    tracing::info!("Loading site files from {}", config.config_dir.display());
    let sites = load_sites(&config.config_dir)
        .wrap_err_with(|| format!("Failed to load sites from {}", config.config_dir.display()))?;

    let mut builder = RoutingTableBuilder::new(http_client);
    for site in &sites {
        builder.register_site(site).wrap_err_with(|| {
            let file = site
                .source
                .as_ref()
                .map_or_else(|| "<unknown>".to_string(), |p| p.display().to_string());
            format!("Failed to register host '{}' from {}", site.host, file)
        })?;
    }

    Ok((sites, builder.build()))
}

async fn serve_command(config: ServerConfig) -> Result<()> {
    tracing_setup::init_tracing_with_config(&config.log_level, config.log_format)
        .map_err(|e| eyre!("Failed to initialize tracing: {}", e))?;

    let http_client: Arc<dyn HttpClient> =
        Arc::new(HttpClientAdapter::new().context("Failed to create HTTP client adapter")?);

    let (_, table) = build_routing_table(&config, http_client)?;
    if table.is_empty() {
        tracing::warn!("No sites configured; every request will get 404");
    }

    let dispatcher = Dispatcher::new(Arc::new(table), Arc::new(FileSystemAdapter::new()));

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .with_context(|| format!("Failed to bind to address {}", config.listen_addr))?;

    let graceful_shutdown = Arc::new(GracefulShutdown::new());
    {
        let shutdown = graceful_shutdown.clone();
        tokio::spawn(async move {
            if let Err(e) = shutdown.run_signal_handler().await {
                tracing::error!("Signal handler error: {:?}", e);
            }
        });
    }

    server::serve(listener, dispatcher, graceful_shutdown).await?;
    Ok(())
}

/// Validate the site directory and exit
fn validate_command(config: &ServerConfig) -> Result<()> {
    println!(
        "🔍 Validating site files in: {}",
        config.config_dir.display()
    );

    let http_client: Arc<dyn HttpClient> =
        Arc::new(HttpClientAdapter::new().context("Failed to create HTTP client adapter")?);

    let (sites, table) = match build_routing_table(config, http_client) {
        Ok(result) => {
            println!("✅ Site files: OK");
            result
        }
        Err(e) => {
            eprintln!("❌ Site configuration is invalid:");
            eprintln!("   {e:#}");
            println!();
            println!("💡 Common fixes:");
            println!("   • Every file needs 'host' and 'type' keys");
            println!("   • 'type' is one of NotFound, Redirect, Proxy, Static");
            println!("   • Redirect and Proxy need 'to', Static needs 'dir'");
            println!("   • Proxy targets must be absolute http:// or https:// URLs");
            std::process::exit(1);
        }
    };

    println!();
    println!("📋 Site Summary:");
    for site in &sites {
        let target = match &site.route {
            SiteRoute::NotFound => "not found".to_string(),
            SiteRoute::Redirect { to } => format!("redirect -> {to}"),
            SiteRoute::Proxy { to } => format!("proxy -> {to}"),
            SiteRoute::Static { dir } => format!("static -> {dir}"),
        };
        println!("   • {}: {}", site.host, target);
    }
    println!("   • Distinct hosts: {}", table.len());

    let overlaps = table.overlapping_hosts();
    if !overlaps.is_empty() {
        println!();
        println!("⚠️  Hosts registered under more than one type:");
        for (host, kinds) in overlaps {
            let kinds: Vec<String> = kinds.iter().map(ToString::to_string).collect();
            println!("   • {}: {} (serving {})", host, kinds.join(", "), kinds[0]);
        }
    }

    println!();
    println!("🎉 Site configuration is valid and ready to use!");
    Ok(())
}
