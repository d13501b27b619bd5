//! Maya CLI - terminal front end for the storefront client.
//!
//! # Usage
//!
//! ```bash
//! # Show the signed-in user's cart
//! MAYA_USER_ID=u1 maya cart show
//!
//! # Add two units of a product
//! maya cart add 675a1f9c2b3e4d5f6a7b8c01 -q 2
//!
//! # Warehouse view: pending orders matching "ana"
//! maya orders all --filter pendiente --search ana
//!
//! # Advance a scanned order
//! maya orders advance 675a1f9c2b3e4d5f6a7b8c9d
//!
//! # Print an order's QR symbol
//! maya qr show 675a1f9c2b3e4d5f6a7b8c9d
//!
//! # Pay for the cart (paste return URLs from the browser)
//! maya checkout
//! ```
//!
//! # Environment Variables
//!
//! See [`maya_client::config`]. `MAYA_USER_ID` selects the signed-in user.

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use maya_client::config::ClientConfig;
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::{CliError, Context};

#[derive(Parser)]
#[command(name = "maya")]
#[command(author, version, about = "Maya storefront client")]
struct Cli {
    /// Override the API root (`MAYA_API_BASE_URL`)
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect and edit the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// List and advance orders
    Orders {
        #[command(subcommand)]
        action: OrdersAction,
    },
    /// Encode and verify order QR symbols
    Qr {
        #[command(subcommand)]
        action: QrAction,
    },
    /// Pay for the cart through the hosted checkout
    Checkout,
}

#[derive(Subcommand)]
enum CartAction {
    /// Show cart lines and total
    Show,
    /// Add a product
    Add {
        /// Product ID
        product_id: String,

        /// Units to add
        #[arg(short, long, default_value_t = 1)]
        quantity: i64,
    },
    /// Set a line's quantity
    Set {
        /// Product ID
        product_id: String,

        /// New quantity (values below 1 become 1)
        #[arg(allow_negative_numbers = true)]
        quantity: i64,
    },
    /// Remove a line
    Remove {
        /// Product ID
        product_id: String,
    },
    /// Remove every line
    Clear,
}

#[derive(Subcommand)]
enum OrdersAction {
    /// The signed-in user's orders
    Mine {
        #[command(flatten)]
        view: commands::orders::ViewArgs,
    },
    /// Every order (warehouse view)
    All {
        #[command(flatten)]
        view: commands::orders::ViewArgs,
    },
    /// Move an order to its next status
    Advance {
        /// Order ID or scanned QR payload
        order: String,
    },
}

#[derive(Subcommand)]
enum QrAction {
    /// Print an order's QR symbol
    Show {
        /// Order ID
        order_id: String,

        /// Print SVG markup instead of terminal blocks
        #[arg(long)]
        svg: bool,
    },
    /// Check that a scanned payload is an order ID
    Verify {
        /// Scanned payload
        payload: String,
    },
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &ClientConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    // Logs go to stderr so command output stays pipeable
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "maya_client=info,maya_cli=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let cli = Cli::parse();

    let mut config = match ClientConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid configuration: {e}");
            std::process::exit(2);
        }
    };
    if let Some(api_url) = &cli.api_url {
        match ClientConfig::with_base_url(api_url) {
            Ok(overridden) => config.base_url = overridden.base_url,
            Err(e) => {
                tracing::error!("Invalid --api-url: {e}");
                std::process::exit(2);
            }
        }
    }

    let _sentry_guard = init_sentry(&config);

    if let Err(e) = run(cli.command, config).await {
        sentry::capture_error(&e);
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(command: Commands, config: ClientConfig) -> Result<(), CliError> {
    let ctx = Context::new(config)?;
    match command {
        Commands::Cart { action } => match action {
            CartAction::Show => commands::cart::show(&ctx).await?,
            CartAction::Add {
                product_id,
                quantity,
            } => commands::cart::add(&ctx, &product_id, quantity).await?,
            CartAction::Set {
                product_id,
                quantity,
            } => commands::cart::set(&ctx, &product_id, quantity).await?,
            CartAction::Remove { product_id } => commands::cart::remove(&ctx, &product_id).await?,
            CartAction::Clear => commands::cart::clear(&ctx).await?,
        },
        Commands::Orders { action } => match action {
            OrdersAction::Mine { view } => commands::orders::mine(&ctx, &view).await?,
            OrdersAction::All { view } => commands::orders::all(&ctx, &view).await?,
            OrdersAction::Advance { order } => commands::orders::advance(&ctx, &order).await?,
        },
        Commands::Qr { action } => match action {
            QrAction::Show { order_id, svg } => commands::qr::show(&order_id, svg)?,
            QrAction::Verify { payload } => commands::qr::verify(&payload)?,
        },
        Commands::Checkout => commands::checkout::pay(&ctx).await?,
    }
    Ok(())
}
