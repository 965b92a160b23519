use clap::{Parser, Subcommand};
use nearby::geo::Coordinate;
use nearby::overpass::{DEFAULT_ENDPOINT, OverpassClient};
use nearby::ranker::{DEFAULT_MAX_RESULTS, DEFAULT_RADIUS_M, Ranker};
use nearby::{Keyword, PointOfInterest};
use std::io::{BufRead, BufReader, Write};
use std::net::Shutdown;
use std::os::unix::net::UnixStream;
use std::time::Duration;

const SOCKET_PATH: &str = "/tmp/foodwheel.sock";

#[derive(Parser, Debug)]
#[command(name = "nearby", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Food to look for (e.g., "ramen"); matched against name and cuisine tags
    keyword: Option<String>,

    /// Latitude to search around (defaults to Kuala Lumpur)
    #[arg(long, allow_hyphen_values = true, default_value_t = Coordinate::KUALA_LUMPUR.latitude)]
    lat: f64,

    /// Longitude to search around (defaults to Kuala Lumpur)
    #[arg(long, allow_hyphen_values = true, default_value_t = Coordinate::KUALA_LUMPUR.longitude)]
    lng: f64,

    /// Search radius in metres
    #[arg(short, long, default_value_t = DEFAULT_RADIUS_M)]
    radius: u32,

    /// Maximum number of places to list
    #[arg(short, long, default_value_t = DEFAULT_MAX_RESULTS)]
    max: usize,

    /// Overpass interpreter endpoint
    #[arg(long, default_value = DEFAULT_ENDPOINT)]
    endpoint: String,

    /// HTTP timeout in seconds
    #[arg(long, default_value_t = 30)]
    timeout: u64,
}

#[derive(Subcommand, Debug, Clone)]
enum Commands {
    /// Spin the wheel on the running foodwheel daemon
    Spin,
    /// Repeat the daemon's last search without spinning
    Retry,
    /// Ask the daemon for every restaurant nearby, whatever the food
    All,
    /// Show the daemon's session state
    Status,
    /// Check that the Overpass API answers
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Spin) => send_command("spin"),
        Some(Commands::Retry) => send_command("retry"),
        Some(Commands::All) => send_command("all"),
        Some(Commands::Status) => send_command("status"),
        Some(Commands::Check) => check(&cli).await,
        None => {
            if let Some(keyword) = &cli.keyword {
                search(&cli, keyword).await
            } else {
                use clap::CommandFactory;
                Cli::command().print_help()?;
                Ok(())
            }
        }
    }
}

fn ranker(cli: &Cli) -> anyhow::Result<Ranker<OverpassClient>> {
    let client = OverpassClient::new(&cli.endpoint, Duration::from_secs(cli.timeout))?;
    Ok(Ranker::new(client))
}

async fn search(cli: &Cli, raw: &str) -> anyhow::Result<()> {
    let keyword = Keyword::parse(raw)?;
    let origin = Coordinate::try_new(cli.lat, cli.lng)?;

    let places = ranker(cli)?
        .find_nearby(origin, &keyword, cli.radius, cli.max)
        .await?;

    if places.is_empty() {
        println!("No {keyword} places within {}m", cli.radius);
        return Ok(());
    }

    for (i, place) in places.iter().enumerate() {
        print_place(i + 1, place);
    }
    Ok(())
}

fn print_place(rank: usize, place: &PointOfInterest) {
    println!("{rank}. {} ({})", place.name, place.distance_label());
    println!("   {}", place.details());
    if !place.opening_hours.is_empty() {
        println!("   🕒 {}", place.opening_hours);
    }
    if !place.phone.is_empty() {
        println!("   ☎ {}", place.phone);
    }
    if !place.website.is_empty() {
        println!("   🔗 {}", place.website);
    }
    println!("   📍 {}", place.maps_url());
}

async fn check(cli: &Cli) -> anyhow::Result<()> {
    match ranker(cli)?.probe().await {
        Ok(Some(name)) => {
            println!("✅ API connection working ({})", cli.endpoint);
            println!("Found test restaurant: {name}");
            Ok(())
        }
        Ok(None) => {
            println!("⚠️ API works but no restaurants found in test area");
            Ok(())
        }
        Err(e) => anyhow::bail!("API connection failed: {}", e),
    }
}

fn send_command(cmd: &str) -> anyhow::Result<()> {
    let mut stream = UnixStream::connect(SOCKET_PATH).map_err(|e| {
        anyhow::anyhow!(
            "Failed to connect to foodwheel daemon at {}: {}. Is foodwheel running?",
            SOCKET_PATH,
            e
        )
    })?;

    writeln!(stream, "{}", cmd)?;
    stream.shutdown(Shutdown::Write)?;

    for line in BufReader::new(stream).lines() {
        println!("{}", line?);
    }
    Ok(())
}
