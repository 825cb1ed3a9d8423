//! # Shopfront CLI
//!
//! Drives the cart manager and checkout pipeline from the command line.
//! Every command prints JSON on stdout; failures print an error payload on
//! stderr and exit non-zero.
//!
//! ## Usage
//! ```bash
//! # Guest cart on this device
//! shopfront cart add --product-id p1 --name "Mug" --price-cents 1000 -q 2
//! shopfront cart show
//!
//! # Signed in (guest lines are merged into the customer cart)
//! SHOPFRONT_USER_ID=alice SHOPFRONT_TOKEN=... shopfront cart show
//!
//! # Checkout
//! shopfront checkout shipping --full-name "Ada Lovelace" --address-line1 "12 St James's Sq" \
//!     --city London --state-province "Greater London" --postal-code "SW1Y 4JH" \
//!     --country UK --phone "+44 20 7946 0000"
//! shopfront checkout payment credit_card
//! shopfront checkout review
//! shopfront checkout place
//!
//! # Order history (signed in)
//! shopfront orders list
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use shopfront::commands;
use shopfront::error::ErrorPayload;
use shopfront::state::StorefrontConfig;
use shopfront::Storefront;
use shopfront_core::validation::ShippingForm;
use shopfront_core::{CheckoutStage, Product};

#[derive(Parser)]
#[command(name = "shopfront")]
#[command(author, version, about = "Shopfront cart and checkout")]
struct Cli {
    /// Config file (default: shopfront.toml in the platform config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Signed-in user id. Without it the device's guest cart is used.
    #[arg(long, env = "SHOPFRONT_USER_ID", global = true)]
    user_id: Option<String>,

    /// Bearer token for the signed-in user
    #[arg(long, env = "SHOPFRONT_TOKEN", global = true, hide_env_values = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show or change the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Walk through checkout
    Checkout {
        #[command(subcommand)]
        action: CheckoutAction,
    },
    /// Order history
    Orders {
        #[command(subcommand)]
        action: OrdersAction,
    },
    /// Print the loaded configuration
    Config,
}

#[derive(Subcommand)]
enum CartAction {
    /// Print the cart and its totals
    Show,
    /// Add a product
    Add {
        #[arg(long)]
        product_id: String,

        #[arg(long)]
        name: String,

        /// Unit price in cents
        #[arg(long)]
        price_cents: i64,

        #[arg(short, long)]
        quantity: Option<i64>,

        #[arg(long)]
        image_url: Option<String>,

        #[arg(long)]
        slug: Option<String>,

        #[arg(long)]
        sku: Option<String>,
    },
    /// Set a line's quantity (0 removes it)
    Update { product_id: String, quantity: i64 },
    /// Remove a line
    Remove { product_id: String },
    /// Empty the cart
    Clear,
}

#[derive(Subcommand)]
enum CheckoutAction {
    /// Current stage and staged data
    Status,
    /// Go to a stage (guards may redirect)
    Enter { stage: StageArg },
    /// Stage the shipping address
    Shipping(ShippingArgs),
    /// Stage the payment method (`credit_card`, `paypal`, `cod`)
    Payment { method: String },
    /// Show items, address, method and totals
    Review,
    /// Submit the order
    Place,
}

/// Empty values are accepted here so validation can report every missing
/// field at once.
#[derive(clap::Args)]
struct ShippingArgs {
    #[arg(long, default_value = "")]
    full_name: String,
    #[arg(long, default_value = "")]
    address_line1: String,
    #[arg(long, default_value = "")]
    address_line2: String,
    #[arg(long, default_value = "")]
    city: String,
    #[arg(long, default_value = "")]
    state_province: String,
    #[arg(long, default_value = "")]
    postal_code: String,
    #[arg(long, default_value = "")]
    country: String,
    #[arg(long, default_value = "")]
    phone: String,
}

impl From<ShippingArgs> for ShippingForm {
    fn from(args: ShippingArgs) -> Self {
        ShippingForm {
            full_name: args.full_name,
            address_line1: args.address_line1,
            address_line2: args.address_line2,
            city: args.city,
            state_province: args.state_province,
            postal_code: args.postal_code,
            country: args.country,
            phone: args.phone,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum StageArg {
    Shipping,
    Payment,
    Review,
}

impl From<StageArg> for CheckoutStage {
    fn from(stage: StageArg) -> Self {
        match stage {
            StageArg::Shipping => CheckoutStage::ShippingEntry,
            StageArg::Payment => CheckoutStage::PaymentSelection,
            StageArg::Review => CheckoutStage::OrderReview,
        }
    }
}

#[derive(Subcommand)]
enum OrdersAction {
    /// All orders, newest first
    List,
    /// One order
    Show { order_id: String },
}

#[tokio::main]
async fn main() -> ExitCode {
    shopfront::init_tracing();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(value) => {
            println!("{}", pretty(&value));
            ExitCode::SUCCESS
        }
        Err(payload) => {
            let value = serde_json::to_value(&payload).unwrap_or(Value::Null);
            eprintln!("{}", pretty(&value));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<Value, ErrorPayload> {
    let config = StorefrontConfig::load(cli.config)?;

    if let Commands::Config = cli.command {
        return to_json(commands::config::get_config(&config));
    }

    let storefront = Storefront::connect(config).await?;
    let result = match start_session(&storefront, cli.user_id, cli.token).await {
        Ok(()) => dispatch(&storefront, cli.command).await,
        Err(e) => Err(e),
    };
    storefront.close().await;
    result
}

/// Signs in when credentials were given, else loads the guest cart.
async fn start_session(
    storefront: &Storefront,
    user_id: Option<String>,
    token: Option<String>,
) -> Result<(), ErrorPayload> {
    let cart = storefront.cart();
    match (user_id, token) {
        (Some(user_id), Some(token)) => {
            let response = commands::cart::sign_in(cart, &user_id, &token).await?;
            if response.merge.retained > 0 {
                warn!(
                    retained = response.merge.retained,
                    "Some guest cart lines could not be merged"
                );
            }
            Ok(())
        }
        (Some(_), None) => Err(ErrorPayload::validation(
            "--token (or SHOPFRONT_TOKEN) is required with --user-id",
        )),
        _ => {
            // The snapshot carries the failure as lastError.
            if let Err(e) = cart.load_cart().await {
                warn!(error = %e, "Cart load failed");
            }
            Ok(())
        }
    }
}

async fn dispatch(storefront: &Storefront, command: Commands) -> Result<Value, ErrorPayload> {
    let cart = storefront.cart();
    let checkout = storefront.checkout();

    match command {
        Commands::Cart { action } => match action {
            CartAction::Show => to_json(commands::cart::get_cart(cart)),
            CartAction::Add {
                product_id,
                name,
                price_cents,
                quantity,
                image_url,
                slug,
                sku,
            } => {
                let product = Product {
                    id: product_id,
                    name,
                    price_cents,
                    image_url,
                    slug,
                    sku,
                };
                to_json(commands::cart::add_to_cart(cart, &product, quantity).await?)
            }
            CartAction::Update {
                product_id,
                quantity,
            } => to_json(commands::cart::update_cart_item(cart, &product_id, quantity).await?),
            CartAction::Remove { product_id } => {
                to_json(commands::cart::remove_from_cart(cart, &product_id).await?)
            }
            CartAction::Clear => to_json(commands::cart::clear_cart(cart).await?),
        },
        Commands::Checkout { action } => match action {
            CheckoutAction::Status => to_json(commands::checkout::get_checkout(checkout).await?),
            CheckoutAction::Enter { stage } => {
                to_json(commands::checkout::enter_stage(checkout, stage.into()).await?)
            }
            CheckoutAction::Shipping(args) => {
                let form = ShippingForm::from(args);
                to_json(commands::checkout::submit_shipping(checkout, &form).await?)
            }
            CheckoutAction::Payment { method } => {
                to_json(commands::checkout::select_payment_method(checkout, &method).await?)
            }
            CheckoutAction::Review => to_json(commands::checkout::get_review(checkout).await?),
            CheckoutAction::Place => to_json(commands::checkout::place_order(checkout).await?),
        },
        Commands::Orders { action } => match action {
            OrdersAction::List => to_json(commands::orders::list_orders(storefront.orders()).await?),
            OrdersAction::Show { order_id } => {
                to_json(commands::orders::get_order(storefront.orders(), &order_id).await?)
            }
        },
        Commands::Config => to_json(commands::config::get_config(storefront.config())),
    }
}

fn to_json(value: impl Serialize) -> Result<Value, ErrorPayload> {
    serde_json::to_value(value).map_err(|e| ErrorPayload::internal(e.to_string()))
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}
