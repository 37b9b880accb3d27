//! Follow Directory - admin API for users and their follow graph.
//!
//! This binary starts the HTTP server and configures all components.

use clap::Parser;
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use follow_directory::{
    config::{CheckConfig, Cli, Command, DatabaseArgs, MigrateConfig, ServeConfig, StorageArgs},
    directory::DirectoryService,
    server::{create_router, RouterConfig},
    storage::{create_s3_client, ObjectStore, S3ObjectStore},
    store::{connect_pool, Directory, PostgresDirectory},
};

#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env file is fine; real environment variables still apply
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    match cli.into_command() {
        Command::Serve(config) => run_serve(config).await,
        Command::Migrate(config) => run_migrate(config).await,
        Command::Check(config) => run_check(config).await,
    }
}

// =============================================================================
// Serve Command
// =============================================================================

async fn run_serve(config: ServeConfig) -> ExitCode {
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    print_banner();

    let public_base_url = config.storage.resolved_public_base_url();

    info!("Configuration:");
    info!("  S3 bucket: {}", config.storage.s3_bucket);
    if let Some(ref endpoint) = config.storage.s3_endpoint {
        info!("  S3 endpoint: {}", endpoint);
    }
    info!("  S3 region: {}", config.storage.s3_region);
    info!("  Image base URL: {}", public_base_url);
    info!("  Max upload: {} KiB", config.max_upload_bytes / 1024);

    if config.auth_enabled {
        info!("  Auth: enabled");
    } else {
        warn!("  Auth: DISABLED - all endpoints are publicly accessible");
        warn!("        Enable for production: --auth-enabled true --admin-token=<token>");
    }

    // Database
    info!("");
    info!("Connecting to database...");
    let directory = match open_directory(&config.database).await {
        Ok(directory) => directory,
        Err(code) => return code,
    };
    info!("  Connected successfully");

    if config.migrate {
        info!("Applying schema...");
        if let Err(e) = directory.migrate().await {
            error!("  Migration failed: {}", e);
            return ExitCode::FAILURE;
        }
        info!("  Schema is up to date");
    }

    // Object storage
    let object_store = build_object_store(&config.storage, public_base_url).await;
    info!("Connecting to S3...");
    if let Err(e) = object_store.ping().await {
        error!("  Failed to reach bucket '{}': {}", config.storage.s3_bucket, e);
        error!("");
        error!("  Please check:");
        error!("    - Your storage credentials are configured correctly");
        error!("    - The bucket exists and is accessible");
        error!("    - The S3 endpoint is correct (if using MinIO/custom S3)");
        return ExitCode::FAILURE;
    }
    info!("  Connected successfully");

    let service =
        DirectoryService::with_upload_limit(directory, object_store, config.max_upload_bytes);
    let router = create_router(service, build_router_config(&config));

    let addr = config.bind_address();

    info!("");
    info!("────────────────────────────────────────────────────────────────");
    info!("  Server listening on: http://{}", addr);
    info!("");
    info!("  Try these endpoints:");
    info!("    curl http://{}/health", addr);
    if config.auth_enabled {
        info!(
            "    curl -H 'Authorization: Bearer <token>' http://{}/users",
            addr
        );
    } else {
        info!("    curl http://{}/users", addr);
    }
    info!("────────────────────────────────────────────────────────────────");
    info!("");

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    info!("Server stopped");
    ExitCode::SUCCESS
}

/// Print the startup banner.
fn print_banner() {
    let version = env!("CARGO_PKG_VERSION");
    info!("");
    info!("┌─┐┌─┐┬  ┬  ┌─┐┬ ┬  ┌┬┐┬┬─┐┌─┐┌─┐┌┬┐┌─┐┬─┐┬ ┬");
    info!("├┤ │ ││  │  │ ││││   │││├┬┘├┤ │   │ │ │├┬┘└┬┘");
    info!("└  └─┘┴─┘┴─┘└─┘└┴┘  ─┴┘┴┴└─└─┘└─┘ ┴ └─┘┴└─ ┴ ");
    info!("                                       v{}", version);
}

/// Resolve when the process receives Ctrl-C.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "follow_directory=debug,tower_http=debug"
    } else {
        "follow_directory=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Build RouterConfig from the application ServeConfig.
fn build_router_config(config: &ServeConfig) -> RouterConfig {
    let mut router_config = if config.auth_enabled {
        RouterConfig::new(config.admin_token_or_empty())
    } else {
        RouterConfig::without_auth()
    };

    if let Some(ref origins) = config.cors_origins {
        router_config = router_config.with_cors_origins(origins.clone());
    }

    router_config.with_tracing(!config.no_tracing)
}

async fn open_directory(database: &DatabaseArgs) -> Result<PostgresDirectory, ExitCode> {
    match connect_pool(
        &database.database_url,
        database.db_max_connections,
        database.connect_timeout(),
    )
    .await
    {
        Ok(pool) => Ok(PostgresDirectory::new(pool)),
        Err(e) => {
            error!("  Failed to connect to database: {}", e);
            Err(ExitCode::FAILURE)
        }
    }
}

async fn build_object_store(storage: &StorageArgs, public_base_url: String) -> S3ObjectStore {
    let client = create_s3_client(storage.s3_endpoint.as_deref(), &storage.s3_region).await;
    S3ObjectStore::new(
        client,
        storage.s3_bucket.clone(),
        storage.key_prefix(),
        public_base_url,
    )
}

// =============================================================================
// Migrate Command
// =============================================================================

async fn run_migrate(config: MigrateConfig) -> ExitCode {
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    info!("Connecting to database...");
    let directory = match open_directory(&config.database).await {
        Ok(directory) => directory,
        Err(code) => return code,
    };

    match directory.migrate().await {
        Ok(()) => {
            info!("Schema is up to date");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Migration failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

// =============================================================================
// Check Command
// =============================================================================

async fn run_check(config: CheckConfig) -> ExitCode {
    // Initialize minimal logging for check command
    if config.verbose {
        init_logging(true);
    }

    println!("Follow Directory Configuration Check");
    println!("════════════════════════════════════");
    println!();

    if let Err(e) = config.validate() {
        println!("✗ Configuration: {}", e);
        return ExitCode::FAILURE;
    }

    println!("✓ Bucket: {}", config.storage.s3_bucket);
    if let Some(ref endpoint) = config.storage.s3_endpoint {
        println!("✓ Endpoint: {}", endpoint);
    }
    println!("✓ Region: {}", config.storage.s3_region);
    println!(
        "✓ Image base URL: {}",
        config.storage.resolved_public_base_url()
    );
    println!();

    let mut ok = true;

    print!("Testing database connection... ");
    match connect_pool(
        &config.database.database_url,
        1,
        config.database.connect_timeout(),
    )
    .await
    {
        Ok(pool) => match PostgresDirectory::new(pool).ping().await {
            Ok(()) => println!("✓ success"),
            Err(e) => {
                println!("✗ failed");
                println!("  Error: {}", e);
                ok = false;
            }
        },
        Err(e) => {
            println!("✗ failed");
            println!("  Error: {}", e);
            ok = false;
        }
    }

    print!("Testing S3 connection... ");
    let object_store =
        build_object_store(&config.storage, config.storage.resolved_public_base_url()).await;
    match object_store.ping().await {
        Ok(()) => println!("✓ success"),
        Err(e) => {
            println!("✗ failed");
            println!();
            println!("Error: {}", e);
            println!();
            println!("Please check:");
            println!("  - Your storage credentials are configured correctly");
            println!(
                "  - The bucket '{}' exists and is accessible",
                config.storage.s3_bucket
            );
            if config.storage.s3_endpoint.is_some() {
                println!("  - The S3 endpoint is correct and reachable");
            }
            ok = false;
        }
    }

    println!();
    println!("════════════════════════════════════");
    if ok {
        println!("✓ All checks passed!");
        ExitCode::SUCCESS
    } else {
        println!("✗ Some checks failed");
        ExitCode::FAILURE
    }
}
