use std::{io,fs};
use std::fs::File;
use std::io::Write;
use std::path::{Path,PathBuf};

use serde_json::{Value,json};
use unidecode::unidecode;

use super::county::NormalizedRecord;
use super::error::Result;
use super::forecast::{Forecast,ForecastExtent,NamedSeries};
use super::normalize::DataSource;
use super::registry::MapView;
use super::series::Series;
use super::session::{Session,Statistic};


/// ASCII file stem for a county name: "Doña Ana, New Mexico" -> "dona-ana-new-mexico".
pub fn file_stem(name: &str) -> String {
    unidecode(name).to_lowercase()
	.split(|c: char| !c.is_ascii_alphanumeric())
	.filter(|part| !part.is_empty())
	.collect::<Vec<_>>().join("-")
}

fn axis_format(statistic: Statistic, source: DataSource) -> &'static str {
    match (statistic, source) {
	(Statistic::FatalityRate, _) | (_, DataSource::Cumulative) => ".1%",
	(_, DataSource::Rolling) => ".1f",
    }
}

fn points(label: &str, kind: &str, series: &Series) -> Vec<Value> {
    series.iter().filter_map(|(date,val)| match val.is_finite() {
	false => None,
	true => Some(json!({
	    "Date": format!("{}", date.format("%Y-%m-%d")),
	    "Series": label,
	    "Kind": kind,
	    "Value": val
	}))
    }).collect()
}

fn named_points(kind: &str, named: &[NamedSeries]) -> Vec<Value> {
    named.iter().flat_map(|s| points(&s.name.to_string(), kind, &s.points)).collect()
}


/// Writes the chart of one county and returns its path.
pub fn county_graph(graph_path: &Path, forecast: &Forecast, session: &Session) -> Result<PathBuf> {

    let stat = session.statistic.name();
    let mut values = points(stat, "observed", &forecast.observed);
    values.extend(named_points("historical", &forecast.historical));
    values.extend(named_points("projected", &forecast.projected));

    let title = match session.forecast.extent {
	ForecastExtent::None => format!("{}: {}", forecast.county, stat),
	_ => format!("{}: {} forecast ({} scenario)", forecast.county,
		     session.forecast.family.name(),
		     serde_plain::to_string(&session.forecast.scenario)?),
    };

    let filename = format!("{}.html", file_stem(&forecast.county));
    page(graph_path, &filename, &title, &json!({
	"data": {"values": values},
	"mark": {"type": "line", "tooltip": true},
	"selection": {
	    "Highlight": {"bind":"legend","type":"multi","fields":["Series"]},
	    "Grid": {"bind":"scales","type":"interval"}
	},
	"encoding": {
	    "x": {
		"field": "Date",
		"timeUnit": "utcyearmonthdate",
		"title": "Date",
		"type": "temporal"
	    },
	    "y": {
		"field": "Value",
		"title": stat,
		"axis": {"format": axis_format(session.statistic, session.source)},
		"type": "quantitative"
	    },
	    "color": {"field": "Series", "type": "nominal"},
	    "detail": {"field": "Kind", "type": "nominal"},
	    "strokeDash": {
		"field": "Kind",
		"type": "nominal",
		"scale": {
		    "domain": ["observed", "historical", "projected"],
		    "range": [[1, 0], [1, 0], [6, 4]]
		}
	    },
	    "opacity": {"value":0.2,"condition":{"value":1,"selection":"Highlight"}}
	}
    }))?;
    Ok(graph_path.join(filename))

}


fn projection(view: MapView) -> Value {
    match view {
	MapView::Contiguous => json!({"type": "albersUsa"}),
	_ => {
	    let (lat, lon) = view.center();
	    json!({
		"type": "mercator",
		"center": [lon, lat],
		"scale": 256.0 * 2f64.powf(view.zoom()) / (2.0 * std::f64::consts::PI)
	    })
	}
    }
}

/// Writes the map of today's statistic over the county boundaries and
/// returns its path.
pub fn map_graph(graph_path: &Path, geojson: &Path, records: &[NormalizedRecord],
		 session: &Session) -> Result<PathBuf> {

    let stat = session.statistic;
    let values = records.iter().filter_map(|r| {
	let val = stat.value(session.source, r).filter(|v| v.is_finite())?;
	Some(json!({
	    "id": r.fips,
	    "County": r.name(),
	    "Value": val,
	    "Label": stat.format(session.source, val)
	}))
    }).collect::<Vec<_>>();

    let filename = format!("map-{}.html", serde_plain::to_string(&session.map_view)?);
    page(graph_path, &filename, &session.info(), &json!({
	"data": {
	    "url": geojson.display().to_string(),
	    "format": {"type": "json", "property": "features"}
	},
	"transform": [{
	    "lookup": "id",
	    "from": {
		"data": {"values": values},
		"key": "id",
		"fields": ["County", "Value", "Label"]
	    }
	}],
	"projection": projection(session.map_view),
	"mark": {"type": "geoshape", "stroke": "white", "strokeWidth": 0.2},
	"encoding": {
	    "color": {
		"field": "Value",
		"type": "quantitative",
		"title": stat.name(),
		"scale": {"domain": [0, stat.zmax(session.source)], "clamp": true},
		"legend": {"format": axis_format(stat, session.source)}
	    },
	    "tooltip": [
		{"field": "County", "type": "nominal"},
		{"field": "Label", "type": "nominal", "title": stat.name()}
	    ]
	}
    }))?;
    Ok(graph_path.join(filename))

}


fn page(graph_path: &Path, path: &str, title: &str, spec: &Value) -> Result<()> {

    fs::create_dir_all(graph_path)?;
    let mut out = io::BufWriter::new(File::create(graph_path.join(path))?);

    let mut spec = spec.clone();
    if let Some(obj) = spec.as_object_mut() {
	obj.insert("$schema".to_string(), json!("https://vega.github.io/schema/vega-lite/v4.json"));
	obj.insert("height".to_string(), json!("container"));
	obj.insert("width".to_string(), json!("container"));
	obj.insert("title".to_string(), json!(title));
    }

    write!(out, "<!DOCTYPE html><html><head>")?;
    write!(out, "<meta charset=\"UTF-8\">")?;
    write!(out, "<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">")?;
    write!(out, "<title>{}</title>", title)?;
    write!(out, "<script src=\"https://cdn.jsdelivr.net/npm/vega@5\"></script>")?;
    write!(out, "<script src=\"https://cdn.jsdelivr.net/npm/vega-lite@4\"></script>")?;
    write!(out, "<script src=\"https://cdn.jsdelivr.net/npm/vega-embed\"></script>")?;
    write!(out, "</head>")?;
    write!(out, "<body>")?;
    write!(out, "<div id=\"vis\" style=\"overflow: hidden; position: absolute;top: 0; left: 0; right: 0; bottom: 0;\"></div>")?;
    write!(out, "<script type=\"text/javascript\">")?;
    write!(out, "var spec = ")?;
    serde_json::to_writer_pretty(out.by_ref(), &spec)?;
    write!(out, ";vegaEmbed('#vis', spec,{{}}).then(function(result) {{")?;
    write!(out, "}}).catch(console.error);")?;
    write!(out, "</script>")?;
    write!(out, "</body></html>")?;
    out.flush()?;

    Ok(())

}
