use std::fmt::{Display, Write};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf, absolute};
use std::sync::LazyLock;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::builder::styling::Styles;
use clap::{Args, ColorChoice, Parser, Subcommand, ValueEnum, crate_version};
use clap_cargo::style::{ERROR, HEADER, INVALID, LITERAL, PLACEHOLDER, USAGE, VALID};
use dimensioned::f64prefixes::KILO;
use dimensioned::si::{M, Meter};
use roadside::internal::{Kilometers, Miles};
use roadside::osm::{DEFAULT_NOMINATIM_URL, DEFAULT_OSRM_URL, DEFAULT_OVERPASS_URL};
use roadside::{EnrichmentOptions, HttpOptions, RoadsideError, RouteEnrichment};
use strum::Display;
use sys_locale::get_locale;
use tracing::level_filters::LevelFilter;
use tracing::{Level, debug, error, info, instrument, warn};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{Layer, Registry, fmt};

pub const CLAP_STYLING: Styles = Styles::styled()
    .header(HEADER)
    .usage(USAGE)
    .literal(LITERAL)
    .placeholder(PLACEHOLDER)
    .error(ERROR)
    .valid(VALID)
    .invalid(INVALID);

static LONG_VERSION: LazyLock<String> =
    LazyLock::new(|| format!("{} (rustc {})", crate_version!(), env!("RUSTC_VERSION")));

/// Find the towns and cities along a driving route
///
/// Given a list of places to visit in order, finds a driving route between
/// each consecutive pair, looks for towns and cities near points sampled
/// along the way, and draws everything on an HTML map.
///
/// Place names, routes and settlements are looked up with OpenStreetMap
/// services (Nominatim, OSRM and Overpass). Please respect their usage
/// policies.
#[derive(Parser)]
#[command(
    name = "roadside",
    version,
    long_version = LONG_VERSION.as_str(),
    about,
    color = ColorChoice::Auto,
    styles = CLAP_STYLING,
)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,

    /// Configure diagnostic logging level
    ///
    /// Set to DEBUG to see a performance summary following execution.
    #[clap(long, short = 'L', default_value_t = Level::ERROR)]
    log_level: Level,

    /// Log to a file
    #[clap(long)]
    log_file: Option<PathBuf>,

    /// The unit of distance used in output on the command line.
    ///
    /// If unspecified, this will default to either km or mi based on your
    /// system locale.
    #[clap(long, short = 'u', default_value_t = DistUnit::Autodetect)]
    distance_unit: DistUnit,
}

#[derive(Copy, Clone, Display, ValueEnum)]
#[strum(serialize_all = "kebab-case")]
#[clap(rename_all = "kebab-case")]
enum DistUnit {
    Autodetect,
    M,
    Km,
    Mi,
}

impl DistUnit {
    fn get(self) -> DistUnit {
        match self {
            Self::Autodetect => Self::auto_detect(),
            _ => self,
        }
    }

    fn auto_detect() -> DistUnit {
        let locale = get_locale().unwrap_or_else(|| String::from("en-US"));
        match locale.as_str() {
            "en-US" | "en-GB" => Self::Mi,
            _ => Self::Km,
        }
    }
}

#[derive(Args, Debug)]
struct MapArgs {
    /// Places to visit, in order
    ///
    /// Each is a free-text place name such as "Calgary, Alberta, Canada".
    /// These are visited after any places read from --waypoints-file.
    waypoints: Vec<String>,

    /// Read places to visit from a file, one per line
    ///
    /// Blank lines and lines starting with # are ignored.
    #[clap(long, short = 'w')]
    waypoints_file: Option<PathBuf>,

    /// HTML map output path
    #[clap(long, short, default_value = "route_map.html")]
    output: PathBuf,

    /// Force overwriting the output file, if it already exists.
    #[clap(long, short, action)]
    force: bool,

    /// Distance traveled between settlement searches, in kilometers
    #[clap(long, short, default_value = "100.0")]
    interval: f64,

    /// Diameter of the area searched for settlements around each sample
    /// point, in kilometers
    #[clap(long, short, default_value = "125.0")]
    diameter: f64,

    /// Timeout for each request to an external service, in seconds
    #[clap(long, short, default_value = "30")]
    timeout: u64,

    /// User agent sent to external services
    #[clap(long)]
    user_agent: Option<String>,

    /// Base URL of the Nominatim geocoding service
    #[clap(long, default_value = DEFAULT_NOMINATIM_URL)]
    nominatim_url: String,

    /// Base URL of the OSRM routing service
    #[clap(long, default_value = DEFAULT_OSRM_URL)]
    osrm_url: String,

    /// URL of the Overpass API interpreter
    #[clap(long, default_value = DEFAULT_OVERPASS_URL)]
    overpass_url: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Map the towns and cities along a route
    ///
    /// Resolves each place, fetches a driving route for each leg between
    /// consecutive places, and writes an HTML map with the route and every
    /// town or city found within range of it.
    Map(MapArgs),

    /// Print software license info
    License,
}

fn read_waypoints_file(path: &Path) -> Result<Vec<String>> {
    let contents = fs::read_to_string(path)
        .context("Reading the --waypoints-file. Check that it exists and can be accessed.")?;
    Ok(contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_owned)
        .collect())
}

#[instrument(level = "trace", skip_all)]
fn map_cmd(args: &Cli, sub_args: &MapArgs) -> Result<String> {
    debug!("map args: {:?}", sub_args);

    if !(sub_args.interval > 0.0) {
        bail!("Interval must be positive");
    }

    if !(sub_args.diameter > 0.0) {
        bail!("Diameter must be positive");
    }

    if sub_args.timeout == 0 {
        bail!("Timeout must be at least one second");
    }

    let mut waypoints = match &sub_args.waypoints_file {
        Some(path) => read_waypoints_file(path)?,
        None => Vec::new(),
    };
    waypoints.extend(sub_args.waypoints.iter().cloned());
    if waypoints.is_empty() {
        bail!("No waypoints given. Pass place names as arguments or with --waypoints-file.");
    }
    info!("Mapping {} waypoints", waypoints.len());

    // Fail before any network requests if the output can't be written, but
    // only create the file once there is a map to put in it.
    let output = &sub_args.output;
    if output.exists() {
        if sub_args.force {
            warn!("Output file exists and will be overwritten: {:?}", output);
        } else {
            bail!(
                "Output file already exists and may not be overwritten: {:?}. Use --force to \
                 overwrite it.",
                output
            );
        }
    }
    let open_output = || -> std::io::Result<BufWriter<File>> {
        let file = if sub_args.force {
            File::create(output)?
        } else {
            File::create_new(output)?
        };
        info!("Created HTML output file: {:?}", absolute(output)?);
        Ok(BufWriter::new(file))
    };

    let options = EnrichmentOptions::default()
        .with_waypoints(waypoints)
        .with_sample_interval(sub_args.interval * KILO * M)
        .with_search_diameter(sub_args.diameter * KILO * M);
    let mut http_options = HttpOptions::default()
        .with_timeout(Duration::from_secs(sub_args.timeout))
        .with_nominatim_url(sub_args.nominatim_url.clone())
        .with_osrm_url(sub_args.osrm_url.clone())
        .with_overpass_url(sub_args.overpass_url.clone());
    if let Some(user_agent) = &sub_args.user_agent {
        http_options = http_options.with_user_agent(user_agent.clone());
    }

    let res = roadside::map_route(&options, &http_options, open_output);
    let enrichment = match &res {
        Err(RoadsideError::NoWaypointsResolved) => res.context(concat!(
            "None of the places could be found. Check their spelling and your network ",
            "connection, and run with --log-level=WARN for details."
        )),

        Err(RoadsideError::Render(_)) | Err(RoadsideError::Io(_)) => res.context(concat!(
            "Writing the map to the filesystem. Ensure the output path exists and ",
            "that you have access permissions to write there."
        )),

        _ => res.map_err(anyhow::Error::from),
    }?;

    match args.distance_unit.get() {
        DistUnit::M => generate_report::<Meter<f64>>(&enrichment, output),
        DistUnit::Km => generate_report::<Kilometers<f64>>(&enrichment, output),
        DistUnit::Mi => generate_report::<Miles<f64>>(&enrichment, output),
        _ => {
            error!(
                "Failed to detect distance unit for report: {}",
                args.distance_unit
            );
            Ok("".to_string())
        }
    }
}

fn generate_report<T>(enrichment: &RouteEnrichment, output: &Path) -> Result<String>
where
    T: From<Meter<f64>> + Display,
{
    let mut r = roadside::internal::report::enrichment_report::<T>(enrichment)?;
    writeln!(
        &mut r,
        "\nMap saved as {}",
        absolute(output)
            .unwrap_or(output.to_path_buf())
            .to_string_lossy()
    )?;
    Ok(r)
}

fn license_cmd() -> Result<String> {
    let mut r = include_str!("../../LICENSE.txt").to_string();
    writeln!(
        &mut r,
        r#"
===

Map data retrieved at runtime is © OpenStreetMap contributors, available
under the Open Database License: https://www.openstreetmap.org/copyright
"#,
    )?;
    Ok(r)
}

fn main() -> Result<()> {
    // Intentionally avoid wrapping argument parsing errors in anyhow::Result so
    // we preserve Clap's pretty formatting of usage info.
    let args = Cli::parse();

    let log_w: Box<dyn std::io::Write + Send> = match &args.log_file {
        Some(path) => Box::new(File::create(path).context("Creating the log file")?),
        None => Box::new(std::io::stderr()),
    };
    let (appender, _guard) = tracing_appender::non_blocking(log_w);

    // Enable the TRACE-level span tree layer for fmt logging level DEBUG.
    let fmt_layer = fmt::Layer::new()
        .with_writer(appender)
        .with_ansi(args.log_file.is_none())
        .with_target(false)
        .with_span_events(FmtSpan::ENTER | FmtSpan::CLOSE)
        .with_filter(LevelFilter::from_level(args.log_level));
    if args.log_level >= Level::DEBUG {
        let span_tree_layer = tracing_span_tree::SpanTree::default().aggregate(true);
        tracing::subscriber::set_global_default(
            Registry::default().with(fmt_layer).with(span_tree_layer),
        )?;
    } else {
        tracing::subscriber::set_global_default(Registry::default().with(fmt_layer))?;
    }

    debug!("roadside {}", clap::crate_version!());

    let report = match &args.cmd {
        Commands::Map(sub_args) => map_cmd(&args, sub_args),
        Commands::License => license_cmd(),
    }?;

    print!("{report}");
    Ok(())
}
