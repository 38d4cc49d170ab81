mod config;
mod county;
mod deconvolve;
mod error;
mod forecast;
mod graph;
mod integrate;
mod model;
mod normalize;
mod nyt;
mod registry;
mod series;
mod session;

use std::fs;

use chrono::Utc;
use log::info;

use config::Arguments;
use county::NormalizedRecord;
use error::Result;
use nyt::{Cache,Nyt};
use registry::Registry;


fn main() -> Result<()> {

    pretty_env_logger::init();

    let args = Arguments::load_from_arguments()?;
    let registry = Registry::load(&args.population_file)?;
    let cache = Cache::new(&args.cache_dir);
    let session = &args.session;

    fs::create_dir_all(&args.graph_dir)?;

    let today = cache.current(session.source, &Nyt, &registry, Utc::now())?;
    info!("{}", session.info());

    if let Err(err) = map_graph(&args, &today) {
	eprintln!("Error: map graph: {}", err);
    }

    if let Some(fips) = &args.county {
	if let Err(err) = county_graph(&args, &cache, fips) {
	    eprintln!("Error: county graph for {}: {}", fips, err);
	}
    }

    Ok(())

}


fn map_graph(args: &Arguments, today: &[NormalizedRecord]) -> Result<()> {
    match &args.geojson {
	Some(geojson) => {
	    let path = graph::map_graph(&args.graph_dir, geojson, today, &args.session)?;
	    info!("Map written to {}", path.display());
	},
	None => info!("No boundary file, skipping map"),
    }
    Ok(())
}

fn county_graph(args: &Arguments, cache: &Cache, fips: &str) -> Result<()> {
    let history = cache.historical(fips, args.session.source)?;
    let integrator = args.engine.integrator();
    let forecast = forecast::forecast(&history, &args.session, integrator.as_ref())?;
    if let Some(last) = forecast.last_date() {
	info!("{} charted through {}", forecast.county, last);
    }
    let path = graph::county_graph(&args.graph_dir, &forecast, &args.session)?;
    info!("Chart written to {}", path.display());
    Ok(())
}
