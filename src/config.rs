use std::path::PathBuf;

use clap::{App,Arg,ArgMatches};
use log::debug;
use serde::de::DeserializeOwned;

use super::error::Result;
use super::integrate::Engine;
use super::session::{ForecastParameters,Session};


pub fn app() -> App<'static,'static> {
    App::new("covid19-notebook-rs")
	.version("0.1.0")
	.about("Normalizes NYT county data and projects compartment model forecasts")
	.arg(Arg::with_name("populations")
	     .long("populations")
	     .help("CSV file with fips,population columns")
	     .takes_value(true)
	     .default_value("data/populations.csv"))
	.arg(Arg::with_name("cache")
	     .long("cache")
	     .help("Directory holding the normalized datasets")
	     .takes_value(true)
	     .default_value("artifacts"))
	.arg(Arg::with_name("graphs")
	     .long("graphs")
	     .help("Output directory for the charts")
	     .takes_value(true)
	     .default_value("graphs"))
	.arg(Arg::with_name("geojson")
	     .long("geojson")
	     .help("County boundaries for the map chart (default: data/counties.geojson if present)")
	     .takes_value(true))
	.arg(Arg::with_name("county")
	     .long("county")
	     .help("County identifier (FIPS or unique:*) to chart and forecast")
	     .takes_value(true))
	.arg(Arg::with_name("source")
	     .long("source")
	     .help("Dataset variant")
	     .takes_value(true)
	     .possible_values(&["cumulative", "rolling"]))
	.arg(Arg::with_name("statistic")
	     .long("statistic")
	     .takes_value(true)
	     .possible_values(&["cases", "fatalities", "fatality-rate"]))
	.arg(Arg::with_name("map")
	     .long("map")
	     .takes_value(true)
	     .possible_values(&["contiguous", "alaska", "hawaii", "puerto-rico", "mariana-islands"]))
	.arg(Arg::with_name("scenario")
	     .long("scenario")
	     .takes_value(true)
	     .possible_values(&["low", "average", "high"]))
	.arg(Arg::with_name("model")
	     .long("model")
	     .takes_value(true)
	     .possible_values(&["sir", "seir", "sird", "seird"]))
	.arg(Arg::with_name("extent")
	     .long("extent")
	     .help("Forecast extent")
	     .takes_value(true)
	     .possible_values(&["none", "historical", "comprehensive"]))
	.arg(Arg::with_name("engine")
	     .long("engine")
	     .help("Integration engine for projections")
	     .takes_value(true)
	     .possible_values(&["difference", "runge-kutta"]))
	.arg(Arg::with_name("recovery-rate")
	     .long("recovery-rate")
	     .help("Daily rate of leaving the infectious state")
	     .takes_value(true))
	.arg(Arg::with_name("delay")
	     .long("delay")
	     .help("Reporting delay in days")
	     .takes_value(true))
	.arg(Arg::with_name("undercount")
	     .long("undercount")
	     .help("Factor reported counts are divided by")
	     .takes_value(true))
}


#[derive(Debug,Clone)]
pub struct Arguments {
    pub population_file: PathBuf,
    pub cache_dir: PathBuf,
    pub graph_dir: PathBuf,
    pub geojson: Option<PathBuf>,
    pub county: Option<String>,
    pub engine: Engine,
    pub session: Session,
}

fn label<T: DeserializeOwned>(matches: &ArgMatches, name: &str, default: T) -> Result<T> {
    match matches.value_of(name) {
	Some(val) => Ok(serde_plain::from_str(val)?),
	None => Ok(default),
    }
}

fn path(matches: &ArgMatches, name: &str) -> Option<PathBuf> {
    matches.value_of(name).map(PathBuf::from)
}

impl Arguments {

    pub fn load_from_arguments() -> Result<Self> {
	Self::from_matches(&app().get_matches())
    }

    pub fn from_matches(matches: &ArgMatches) -> Result<Self> {

	let defaults = ForecastParameters::default();
	let forecast = ForecastParameters {
	    scenario: label(matches, "scenario", defaults.scenario)?,
	    family: label(matches, "model", defaults.family)?,
	    extent: label(matches, "extent", defaults.extent)?,
	    recovery_rate: match matches.value_of("recovery-rate") {
		Some(val) => val.parse()?,
		None => defaults.recovery_rate,
	    },
	    reporting_delay: match matches.value_of("delay") {
		Some(val) => val.parse()?,
		None => defaults.reporting_delay,
	    },
	    undercount_factor: match matches.value_of("undercount") {
		Some(val) => val.parse()?,
		None => defaults.undercount_factor,
	    },
	};
	forecast.validate()?;

	let session = Session {
	    source: label(matches, "source", Default::default())?,
	    statistic: label(matches, "statistic", Default::default())?,
	    map_view: label(matches, "map", Default::default())?,
	    forecast,
	};

	let geojson = path(matches, "geojson").or_else(|| {
	    let fallback = PathBuf::from("data/counties.geojson");
	    match fallback.exists() {
		true => Some(fallback),
		false => None,
	    }
	});

	let arguments = Self {
	    population_file: path(matches, "populations").unwrap_or_default(),
	    cache_dir: path(matches, "cache").unwrap_or_default(),
	    graph_dir: path(matches, "graphs").unwrap_or_default(),
	    county: matches.value_of("county").map(str::to_string),
	    engine: label(matches, "engine", Engine::default())?,
	    geojson, session,
	};
	debug!("{:?}", arguments);
	Ok(arguments)

    }

}
