// Replate CLI
//
// Each invocation loads the marketplace from the data directory, runs one
// operation as the given account, and saves the result.
//
// Usage:
//   replate signup ana "Ana" Austin
//   replate --as ana post "Lentil soup" --servings 4 --location "12 Oak St" --chosen 0.4
//   replate --as bo claim <listing-id> --mode bike
//   replate --as ana complete 4821

use clap::{Parser, Subcommand};
use replate::listing::{ListingDetails, ListingId};
use replate::market::CreditListingId;
use replate::pickup::{parse_distance_km, PickupImpactCalculator, TransportMode};
use replate::storage::{MarketStore, StoreError};
use replate::trade::OfferId;
use replate::{AccountId, MarketConfig, MarketError, Marketplace, Role, Session};
use std::path::PathBuf;
use thiserror::Error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "replate", version, about = "Surplus food exchange and carbon-credit marketplace")]
struct Cli {
    /// Directory holding the marketplace database
    #[arg(long, default_value = "./replate-data", global = true)]
    data_dir: PathBuf,

    /// Account handle to act as
    #[arg(long = "as", global = true)]
    account: Option<String>,

    /// Enable logging (filter with RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create an account
    Signup {
        handle: String,
        name: String,
        region: String,
        /// individual or enterprise
        #[arg(long, default_value = "individual")]
        role: String,
    },
    /// Show balance and history
    Balance,
    /// Earn points
    Earn { amount: u64, description: String },
    /// Redeem points
    Redeem { amount: u64, description: String },
    /// Rate another account (1-5)
    Rate { handle: String, stars: u8 },
    /// Mark your enterprise account as KYC-verified
    Verify,
    /// Post surplus food
    Post {
        title: String,
        #[arg(long)]
        servings: u32,
        #[arg(long)]
        location: String,
        /// Distance to the pickup, e.g. "2.5 km"
        #[arg(long)]
        distance: Option<String>,
        /// Disposal emissions reported by the estimator, kg CO2e
        #[arg(long)]
        baseline: Option<f64>,
        /// Emissions of the chosen sharing action, kg CO2e
        #[arg(long)]
        chosen: f64,
        #[arg(long = "tag")]
        tags: Vec<String>,
    },
    /// Claim a listing and receive its pickup code
    Claim {
        listing: String,
        #[arg(long, default_value = "walk")]
        mode: String,
    },
    /// Confirm a pickup with the receiver's code
    Complete { code: String },
    /// Remove one of your listings
    Delete { listing: String },
    /// Send a message on a listing's thread
    Message { listing: String, text: String },
    /// Compare transport modes for picking up a listing
    Pickup { listing: String },
    /// List food listings
    Listings,
    /// Trade offers
    #[command(subcommand)]
    Offer(OfferCommand),
    /// B2B credit market
    #[command(subcommand)]
    B2b(B2bCommand),
}

#[derive(Subcommand, Debug)]
enum OfferCommand {
    Broadcast { region: String, price: u64 },
    Reprice { offer: String, price: u64 },
    Accept { offer: String },
    Reject { offer: String },
    List,
}

#[derive(Subcommand, Debug)]
enum B2bCommand {
    List {
        amount: u64,
        price: u64,
        #[arg(long)]
        vintage: u16,
        #[arg(long)]
        project: String,
    },
    Buy {
        listing: String,
        amount: u64,
        #[arg(long)]
        retire: bool,
    },
    Withdraw { listing: String },
    Market,
    Portfolio,
}

#[derive(Error, Debug)]
enum CliError {
    #[error(transparent)]
    Market(#[from] MarketError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("this command needs --as <handle>")]
    NoAccount,
}

impl CliError {
    fn exit_code(&self) -> i32 {
        match self {
            CliError::Market(_) => 1,
            CliError::Store(_) => 2,
            CliError::NoAccount => 64,
        }
    }
}

fn main() {
    let cli = Cli::parse();

    if cli.verbose {
        init_logging();
    }

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(e.exit_code());
    }
}

/// Initialize logging with tracing
fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "replate=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn run(cli: Cli) -> Result<(), CliError> {
    let store = MarketStore::open(&cli.data_dir)?;
    let market = store.load_marketplace(MarketConfig::default())?;

    let session = match &cli.account {
        Some(handle) => Some(market.session(handle)?),
        None => None,
    };

    execute(&market, session.as_ref(), cli.command)?;
    store.save_marketplace(&market)?;
    Ok(())
}

fn execute(market: &Marketplace, session: Option<&Session>, command: Command) -> Result<(), CliError> {
    if let Command::Signup { handle, name, region, role } = &command {
        let role: Role = role.parse()?;
        let account = market.signup(handle, name, region, role)?;
        let session = market.session(account.id().as_str())?;
        println!("created {} ({}) with {} points", account.id(), account.role(), market.balance(&session)?);
        return Ok(());
    }

    let session = session.ok_or(CliError::NoAccount)?;
    match command {
        Command::Signup { .. } => {}
        Command::Verify => {
            market.verify_enterprise(session)?;
            println!("verified {}", session.account_id());
        }
        Command::Balance => {
            println!("balance: {}", market.balance(session)?);
            for entry in market.history(session)? {
                println!("  {:>+6}  {}  {}", entry.signed_amount(), entry.timestamp().format("%Y-%m-%d %H:%M"), entry.description());
            }
        }
        Command::Earn { amount, description } => {
            market.earn_points(session, amount, &description)?;
            println!("balance: {}", market.balance(session)?);
        }
        Command::Redeem { amount, description } => {
            if market.redeem_points(session, amount, &description)? {
                println!("balance: {}", market.balance(session)?);
            } else {
                println!("not enough points (balance {})", market.balance(session)?);
            }
        }
        Command::Rate { handle, stars } => {
            let rating = market.submit_rating(session, &AccountId::new(handle)?, stars)?;
            println!("rating now {:.2}", rating);
        }
        Command::Post { title, servings, location, distance, baseline, chosen, tags } => {
            let mut details = ListingDetails::new(title, servings, location).with_tags(tags);
            if let Some(distance) = distance {
                details = details.with_distance_km(parse_distance_km(&distance));
            }
            let listing = market.post_listing(session, details, baseline, chosen)?;
            println!("posted {} saving {:.2} kg CO2e", listing.id(), listing.carbon_saved());
        }
        Command::Claim { listing, mode } => {
            let listing: ListingId = listing.parse()?;
            let mode: TransportMode = mode.parse()?;
            let code = market.claim_listing(session, &listing, mode)?;
            println!("pickup code: {}", code);
        }
        Command::Complete { code } => {
            let completion = market.complete_listing(session, &code)?;
            println!(
                "completed {}: {} points each",
                completion.listing.title(),
                completion.payout.share()
            );
        }
        Command::Delete { listing } => {
            let listing = market.delete_listing(session, &listing.parse()?)?;
            println!("deleted {}", listing.title());
        }
        Command::Message { listing, text } => {
            market.send_message(session, &listing.parse()?, &text)?;
        }
        Command::Pickup { listing } => {
            let listing = market.listings().get(&listing.parse()?)?;
            for (mode, analysis) in PickupImpactCalculator::compare(listing.carbon_saved(), listing.distance_km()) {
                let analysis = analysis.rounded();
                println!(
                    "  {:<8} travel {:>6.2} kg  net {:>6.2} kg  {}",
                    mode,
                    analysis.travel_emissions,
                    analysis.net_impact,
                    if analysis.is_worth_it { "worth it" } else { "not worth it" }
                );
            }
        }
        Command::Listings => {
            for listing in market.listings().all() {
                println!(
                    "{}  {:<10} {:<24} {} servings  {:.2} kg",
                    listing.id(),
                    listing.status(),
                    listing.title(),
                    listing.servings(),
                    listing.carbon_saved()
                );
            }
        }
        Command::Offer(command) => execute_offer(market, session, command)?,
        Command::B2b(command) => execute_b2b(market, session, command)?,
    }
    Ok(())
}

fn execute_offer(market: &Marketplace, session: &Session, command: OfferCommand) -> Result<(), CliError> {
    match command {
        OfferCommand::Broadcast { region, price } => {
            let offer = market.broadcast_offer(session, &region, price)?;
            println!("offer {} to {} at {}", offer.id(), offer.region(), offer.price());
        }
        OfferCommand::Reprice { offer, price } => {
            let offer: OfferId = offer.parse()?;
            let offer = market.update_offer_price(session, &offer, price)?;
            println!("offer {} now {}", offer.id(), offer.price());
        }
        OfferCommand::Accept { offer } => {
            let offer = market.accept_trade_offer(session, &offer.parse()?)?;
            println!("accepted {} for {} points", offer.id(), offer.price());
        }
        OfferCommand::Reject { offer } => {
            let offer = market.reject_trade_offer(session, &offer.parse()?)?;
            println!("rejected {}", offer.id());
        }
        OfferCommand::List => {
            for offer in market.offers(session)? {
                println!("{}  {:<9} {:<12} {:>6}  {}", offer.id(), offer.status(), offer.region(), offer.price(), offer.enterprise());
            }
        }
    }
    Ok(())
}

fn execute_b2b(market: &Marketplace, session: &Session, command: B2bCommand) -> Result<(), CliError> {
    match command {
        B2bCommand::List { amount, price, vintage, project } => {
            let listing = market.create_b2b_listing(session, amount, price, vintage, &project)?;
            println!("listed {} credits as {}", listing.remaining(), listing.id());
        }
        B2bCommand::Buy { listing, amount, retire } => {
            let listing: CreditListingId = listing.parse()?;
            let fill = market.buy_b2b_listing(session, &listing, amount, retire)?;
            println!(
                "bought {} for {} ({} left)",
                fill.holding.amount(),
                fill.holding.cost(),
                fill.listing.remaining()
            );
        }
        B2bCommand::Withdraw { listing } => {
            let listing = market.withdraw_b2b_listing(session, &listing.parse()?)?;
            println!("withdrew {}", listing.id());
        }
        B2bCommand::Market => {
            for listing in market.b2b_listings(session)? {
                println!(
                    "{}  {:>6} @ {:<5} {} {}{}",
                    listing.id(),
                    listing.remaining(),
                    listing.price_per_unit(),
                    listing.vintage(),
                    listing.project(),
                    if listing.seller_verified() { " (verified)" } else { "" }
                );
            }
        }
        B2bCommand::Portfolio => {
            let portfolio = market.portfolio(session);
            println!(
                "active {}  retired {}  spent {}",
                portfolio.active, portfolio.retired, portfolio.spent
            );
        }
    }
    Ok(())
}
