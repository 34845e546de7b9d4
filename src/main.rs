//! `GenziKart` cart CLI

use std::{process::ExitCode, sync::Arc};

use genzikart::{
    api::ApiError,
    cart::{AddOutcome, CartContext, CartEngine, CheckoutDecision},
    config::{CartCommand, CartConfig, ConfigError},
    http::HttpApi,
    notify::TracingNotifier,
    observability::{self, ObservabilityError},
    products::ProductId,
    session::{Session, StoredSession},
    storage::{CartStore, FileStore, KeyValueStore, StorageError},
};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Observability(#[from] ObservabilityError),

    #[error("local storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("api client error: {0}")]
    Api(#[from] ApiError),

    #[error("cart could not be loaded")]
    NotLoaded,

    #[error("unknown product: {0}")]
    UnknownProduct(ProductId),
}

/// `GenziKart` CLI entry point
#[tokio::main]
pub async fn main() -> ExitCode {
    let config = CartConfig::load().unwrap_or_else(|error| error.exit());

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            #[expect(
                clippy::print_stderr,
                reason = "errors must reach the user even when logging is filtered out"
            )]
            {
                eprintln!("{error}");
            }

            ExitCode::FAILURE
        }
    }
}

async fn run(config: CartConfig) -> Result<(), CliError> {
    observability::init_subscriber(&config.logging)?;

    let currency = config.promotion.currency()?;
    let promotion = config.promotion.promotion()?;

    let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::open(&config.storage.storage_dir)?);
    let session = Arc::new(StoredSession::new(Arc::clone(&store)));

    debug!(storage_dir = %config.storage.storage_dir.display(), "opened local storage");

    match config.command {
        CartCommand::Login { token } => {
            session.remember(&token)?;
            say("signed in");
            Ok(())
        }
        CartCommand::Logout => {
            session.invalidate();
            say("signed out");
            Ok(())
        }
        command => {
            let timeout = config.api.timeout();
            let api = Arc::new(HttpApi::new(config.api.api_url, currency, timeout)?);

            let context = CartContext {
                catalog: api.clone(),
                remote: api,
                store: CartStore::new(store),
                session,
                notifier: Arc::new(TracingNotifier),
            };

            let mut engine = CartEngine::new(context, promotion);
            engine.load().await;

            let result = apply(&mut engine, command);

            print_summary(&engine);
            engine.shutdown().await;

            result
        }
    }
}

fn apply(engine: &mut CartEngine, command: CartCommand) -> Result<(), CliError> {
    if !engine.is_loaded() {
        return Err(CliError::NotLoaded);
    }

    match command {
        CartCommand::Add {
            product_id,
            quantity,
        } => match engine.add_by_id(&product_id, quantity) {
            AddOutcome::Added | AddOutcome::Incremented => say("added to cart"),
            AddOutcome::AuthenticationRequired => {
                say("sign in first: genzikart login <token>");
            }
            AddOutcome::CoolingDown => say("slow down: try again in a second"),
            AddOutcome::Rejected => return Err(CliError::UnknownProduct(product_id)),
            AddOutcome::NotLoaded => return Err(CliError::NotLoaded),
        },
        CartCommand::Quantity { product_id, delta } => {
            engine.change_quantity(&product_id, delta);
        }
        CartCommand::Remove { product_id } => engine.remove(&product_id),
        CartCommand::Checkout => match engine.checkout() {
            CheckoutDecision::EmptyCart => say("cart is empty"),
            CheckoutDecision::LoginRequired => say("sign in to check out"),
            CheckoutDecision::Proceed => say("ready for checkout"),
        },
        CartCommand::Show | CartCommand::Login { .. } | CartCommand::Logout => {}
    }

    Ok(())
}

#[expect(clippy::print_stdout, reason = "CLI output")]
fn say(line: &str) {
    println!("{line}");
}

#[expect(clippy::print_stdout, reason = "CLI output")]
fn print_summary(engine: &CartEngine) {
    if engine.lines().is_empty() {
        println!("(empty cart)");
    }

    for line in engine.lines() {
        if line.is_gift() {
            println!("  {} x{}  FREE", line.display_name(), line.quantity());
        } else {
            println!(
                "  {} x{}  {}",
                line.display_name(),
                line.quantity(),
                line.line_total()
            );
        }
    }

    let progress = engine.gift_progress();

    println!("items: {}", engine.total_quantity());
    println!("subtotal: {}", engine.subtotal());
    println!("{} ({}%)", progress.message(), progress.percent());
}
