use std::fmt;

use serde::{Serialize,Deserialize};

use super::deconvolve::Observed;
use super::error::{Result,Error};


#[derive(Serialize,Deserialize,Debug,Clone,Copy,PartialEq,Eq)]
#[serde(rename_all = "lowercase")]
pub enum Scenario {
    Low,
    Average,
    High,
}

/// Rates of a transmission scenario, all per day.
#[derive(Debug,Clone,Copy,PartialEq)]
pub struct ScenarioParameters {
    pub r_0: f64,
    pub recovery_rate: f64,
    pub incubation_rate: f64,
    pub fatality_fraction: f64,
    pub fatality_rate: f64,
}

impl Scenario {
    pub fn parameters(&self, recovery_rate: f64) -> ScenarioParameters {
	let (r_0, fatality_fraction) = match self {
	    Self::Low => (0.8, 0.01),
	    Self::Average => (1.2, 0.015),
	    Self::High => (2.0, 0.02),
	};
	ScenarioParameters {
	    r_0, recovery_rate, fatality_fraction,
	    incubation_rate: 1.0 / 5.0,
	    fatality_rate: 1.0 / 14.0,
	}
    }
}

impl ScenarioParameters {

    pub fn transmission_rate(&self) -> f64 {
	self.r_0 * self.recovery_rate
    }

    /// I -> R rate for models that fork into recovery and death, chosen
    /// so that the two branches weighted by the fatality fraction leave
    /// the infectious state at the overall recovery rate.
    pub fn survivor_recovery_rate(&self) -> f64 {
	let (alpha, rho) = (self.fatality_fraction, self.fatality_rate);
	(self.recovery_rate - alpha * rho) / (1.0 - alpha)
    }

    fn validate(&self, family: ModelFamily) -> Result<()> {
	let positive = |name: &str, val: f64| match val.is_finite() && val > 0.0 {
	    true => Ok(()),
	    false => Err(Error::configuration(format!("{} must be positive, got {}", name, val))),
	};
	positive("recovery rate", self.recovery_rate)?;
	positive("incubation rate", self.incubation_rate)?;
	if !(self.r_0.is_finite() && self.r_0 >= 0.0) {
	    return Err(Error::configuration(format!("invalid R0: {}", self.r_0)));
	}
	if family.has(Compartment::Dead) {
	    positive("fatality rate", self.fatality_rate)?;
	    if !(0.0..1.0).contains(&self.fatality_fraction) {
		return Err(Error::configuration(format!(
		    "fatality fraction must lie in [0,1), got {}", self.fatality_fraction)));
	    }
	    if self.survivor_recovery_rate() <= 0.0 {
		return Err(Error::configuration(format!(
		    "fatality fraction {} at rate {} leaves no recoveries at rate {}",
		    self.fatality_fraction, self.fatality_rate, self.recovery_rate)));
	    }
	}
	Ok(())
    }

}


#[derive(Serialize,Deserialize,Debug,Clone,Copy,PartialEq,Eq,Hash)]
pub enum Compartment {
    Susceptible,
    Exposed,
    Infected,
    Recovered,
    Dead,
}

#[derive(Serialize,Deserialize,Debug,Clone,Copy,PartialEq,Eq)]
#[serde(rename_all = "lowercase")]
pub enum ModelFamily {
    Sir,
    Seir,
    Sird,
    Seird,
}

impl ModelFamily {

    pub fn compartments(&self) -> &'static [Compartment] {
	use Compartment::*;
	match self {
	    Self::Sir => &[Susceptible, Infected, Recovered],
	    Self::Seir => &[Susceptible, Exposed, Infected, Recovered],
	    Self::Sird => &[Susceptible, Infected, Recovered, Dead],
	    Self::Seird => &[Susceptible, Exposed, Infected, Recovered, Dead],
	}
    }

    pub fn has(&self, compartment: Compartment) -> bool {
	self.compartments().contains(&compartment)
    }

    pub fn name(&self) -> &'static str {
	match self {
	    Self::Sir => "SIR",
	    Self::Seir => "SEIR",
	    Self::Sird => "SIRD",
	    Self::Seird => "SEIRD",
	}
    }

}


#[derive(Debug,Clone,Copy,PartialEq,Eq)]
pub enum Flow {
    /// Proportional to the source and to the infected share of the population.
    Contact,
    /// Proportional to the source only.
    Linear,
}

#[derive(Debug,Clone,Copy,PartialEq)]
pub struct Edge {
    pub target: usize,
    pub probability: f64,
    pub rate: f64,
    pub flow: Flow,
}

/// Transition graph of one model: `edges[i]` leaves compartment `i` of the
/// family layout.
#[derive(Debug,Clone,PartialEq)]
pub struct ModelConfig {
    pub family: ModelFamily,
    pub population: f64,
    pub edges: Vec<Vec<Edge>>,
}

impl ModelConfig {

    pub fn build(family: ModelFamily, params: &ScenarioParameters, population: f64) -> Result<Self> {

	check_population(population)?;
	params.validate(family)?;

	let layout = family.compartments();
	let index = |c: Compartment| layout.iter().position(|l| *l == c);
	let mut edges = vec![Vec::new(); layout.len()];
	let mut add = |source: Compartment, target: Compartment, probability: f64, rate: f64, flow: Flow| {
	    if let (Some(source), Some(target)) = (index(source), index(target)) {
		edges[source].push(Edge { target, probability, rate, flow });
	    }
	};

	use Compartment::*;
	let infection_target = if family.has(Exposed) {Exposed} else {Infected};
	add(Susceptible, infection_target, 1.0, params.transmission_rate(), Flow::Contact);
	add(Exposed, Infected, 1.0, params.incubation_rate, Flow::Linear);
	match family.has(Dead) {
	    false => add(Infected, Recovered, 1.0, params.recovery_rate, Flow::Linear),
	    true => {
		let alpha = params.fatality_fraction;
		add(Infected, Recovered, 1.0 - alpha, params.survivor_recovery_rate(), Flow::Linear);
		add(Infected, Dead, alpha, params.fatality_rate, Flow::Linear);
	    }
	}

	Ok(Self { family, population, edges })

    }

    fn infected(&self) -> usize {
	self.family.compartments().iter().position(|c| *c == Compartment::Infected).unwrap_or(0)
    }

    /// Flow along every edge at `state`, grouped by source compartment
    /// in the order of `edges`.
    pub fn flows(&self, state: &[f64]) -> Vec<Vec<f64>> {
	let contact = state[self.infected()] / self.population;
	self.edges.iter().enumerate().map(|(source, edges)| edges.iter().map(|edge| {
	    edge.probability * edge.rate * state[source] * match edge.flow {
		Flow::Contact => contact,
		Flow::Linear => 1.0,
	    }
	}).collect()).collect()
    }

    /// Net daily change of every compartment at `state`.
    pub fn derivative(&self, state: &[f64]) -> Vec<f64> {
	let mut change = vec![0.0; state.len()];
	for (source, (edges, flows)) in self.edges.iter().zip(self.flows(state)).enumerate() {
	    for (edge, flow) in edges.iter().zip(flows) {
		change[source] -= flow;
		change[edge.target] += flow;
	    }
	}
	change
    }

    /// Combined rate out of a compartment, weighted by edge probability.
    pub fn exit_rate(&self, compartment: Compartment) -> f64 {
	self.family.compartments().iter().position(|c| *c == compartment)
	    .map_or(0.0, |i| self.edges[i].iter().map(|e| e.probability * e.rate).sum())
    }

}

fn check_population(population: f64) -> Result<()> {
    match population.is_finite() && population > 0.0 {
	true => Ok(()),
	false => Err(Error::configuration(format!("population must be positive, got {}", population))),
    }
}


/// Named series shown for a model.
#[derive(Serialize,Deserialize,Debug,Clone,Copy,PartialEq,Eq,PartialOrd,Ord,Hash)]
#[serde(rename_all = "lowercase")]
pub enum SeriesName {
    Exposed,
    Infected,
    Removed,
    Recovered,
    Fatalities,
}

impl fmt::Display for SeriesName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
	write!(f, "{}", match self {
	    Self::Exposed => "Exposed",
	    Self::Infected => "Infected",
	    Self::Removed => "Removed",
	    Self::Recovered => "Recovered",
	    Self::Fatalities => "Fatalities",
	})
    }
}


/// State of one model family. The field order of the integrator rows
/// belongs to the implementing type.
pub trait CompartmentState: Sized + Copy + fmt::Debug + PartialEq {

    const FAMILY: ModelFamily;

    /// Seeds a state from observed occupancy, with nobody exposed.
    fn seed(observed: &Observed, susceptible: f64) -> Self;

    fn to_row(&self) -> Vec<f64>;

    fn from_slice(row: &[f64]) -> Self;

    fn display(&self) -> Vec<(SeriesName,f64)>;

    fn from_row(row: &[f64]) -> Result<Self> {
	let expected = Self::FAMILY.compartments().len();
	match row.len() == expected {
	    true => Ok(Self::from_slice(row)),
	    false => Err(Error::configuration(format!(
		"{} state needs {} compartments, got {}",
		Self::FAMILY.name(), expected, row.len()))),
	}
    }

    fn initial(observed: &Observed, population: f64) -> Result<Self> {
	check_population(population)?;
	let susceptible = population - (observed.active + observed.fatalities + observed.recovered);
	match susceptible >= 0.0 {
	    true => Ok(Self::seed(observed, susceptible)),
	    false => Err(Error::configuration(format!(
		"{} active, {} recovered and {} dead exceed a population of {}",
		observed.active, observed.recovered, observed.fatalities, population))),
	}
    }

}

#[derive(Debug,Clone,Copy,PartialEq)]
pub struct Sir { pub s: f64, pub i: f64, pub r: f64 }

#[derive(Debug,Clone,Copy,PartialEq)]
pub struct Seir { pub s: f64, pub e: f64, pub i: f64, pub r: f64 }

#[derive(Debug,Clone,Copy,PartialEq)]
pub struct Sird { pub s: f64, pub i: f64, pub r: f64, pub d: f64 }

#[derive(Debug,Clone,Copy,PartialEq)]
pub struct Seird { pub s: f64, pub e: f64, pub i: f64, pub r: f64, pub d: f64 }

impl CompartmentState for Sir {
    const FAMILY: ModelFamily = ModelFamily::Sir;
    fn seed(o: &Observed, s: f64) -> Self {
	Self { s, i: o.active, r: o.recovered + o.fatalities }
    }
    fn to_row(&self) -> Vec<f64> {
	vec![self.s, self.i, self.r]
    }
    fn from_slice(row: &[f64]) -> Self {
	Self { s: row[0], i: row[1], r: row[2] }
    }
    fn display(&self) -> Vec<(SeriesName,f64)> {
	vec![(SeriesName::Infected, self.i), (SeriesName::Removed, self.r)]
    }
}

impl CompartmentState for Seir {
    const FAMILY: ModelFamily = ModelFamily::Seir;
    fn seed(o: &Observed, s: f64) -> Self {
	Self { s, e: 0.0, i: o.active, r: o.recovered + o.fatalities }
    }
    fn to_row(&self) -> Vec<f64> {
	vec![self.s, self.e, self.i, self.r]
    }
    fn from_slice(row: &[f64]) -> Self {
	Self { s: row[0], e: row[1], i: row[2], r: row[3] }
    }
    fn display(&self) -> Vec<(SeriesName,f64)> {
	vec![(SeriesName::Exposed, self.e), (SeriesName::Infected, self.i),
	     (SeriesName::Removed, self.r)]
    }
}

impl CompartmentState for Sird {
    const FAMILY: ModelFamily = ModelFamily::Sird;
    fn seed(o: &Observed, s: f64) -> Self {
	Self { s, i: o.active, r: o.recovered, d: o.fatalities }
    }
    fn to_row(&self) -> Vec<f64> {
	vec![self.s, self.i, self.r, self.d]
    }
    fn from_slice(row: &[f64]) -> Self {
	Self { s: row[0], i: row[1], r: row[2], d: row[3] }
    }
    fn display(&self) -> Vec<(SeriesName,f64)> {
	vec![(SeriesName::Infected, self.i), (SeriesName::Recovered, self.r),
	     (SeriesName::Fatalities, self.d)]
    }
}

impl CompartmentState for Seird {
    const FAMILY: ModelFamily = ModelFamily::Seird;
    fn seed(o: &Observed, s: f64) -> Self {
	Self { s, e: 0.0, i: o.active, r: o.recovered, d: o.fatalities }
    }
    fn to_row(&self) -> Vec<f64> {
	vec![self.s, self.e, self.i, self.r, self.d]
    }
    fn from_slice(row: &[f64]) -> Self {
	Self { s: row[0], e: row[1], i: row[2], r: row[3], d: row[4] }
    }
    fn display(&self) -> Vec<(SeriesName,f64)> {
	vec![(SeriesName::Exposed, self.e), (SeriesName::Infected, self.i),
	     (SeriesName::Recovered, self.r), (SeriesName::Fatalities, self.d)]
    }
}


#[cfg(test)]
mod tests {

    use super::*;

    const FAMILIES: [ModelFamily; 4] = [ModelFamily::Sir, ModelFamily::Seir,
					ModelFamily::Sird, ModelFamily::Seird];

    fn observed() -> Observed {
	Observed { active: 120.0, fatalities: 3.0, recovered: 40.0 }
    }

    fn assert_close(a: f64, b: f64) {
	assert!((a - b).abs() < 1e-12, "{} != {}", a, b);
    }

    #[test]
    fn fork_reproduces_recovery_rate() {
	for (alpha, rho, gamma) in vec![(0.01, 1.0 / 14.0, 0.1), (0.3, 0.05, 0.2),
					(0.5, 0.9, 1.0), (0.99, 0.01, 0.5)] {
	    let params = ScenarioParameters {
		r_0: 1.5, recovery_rate: gamma, incubation_rate: 0.2,
		fatality_fraction: alpha, fatality_rate: rho,
	    };
	    assert_close((1.0 - alpha) * params.survivor_recovery_rate() + alpha * rho, gamma);
	    for family in vec![ModelFamily::Sird, ModelFamily::Seird] {
		let config = ModelConfig::build(family, &params, 1000.0).unwrap();
		assert_close(config.exit_rate(Compartment::Infected), gamma);
	    }
	}
    }

    #[test]
    fn presets_are_valid_for_every_family() {
	for scenario in vec![Scenario::Low, Scenario::Average, Scenario::High] {
	    for family in FAMILIES.iter() {
		let config = ModelConfig::build(*family, &scenario.parameters(0.1), 1e5).unwrap();
		assert_eq!(config.edges.len(), family.compartments().len());
	    }
	}
    }

    #[test]
    fn graph_follows_family_layout() {
	let params = Scenario::High.parameters(0.1);
	let config = ModelConfig::build(ModelFamily::Seird, &params, 1000.0).unwrap();
	// S -> E -> I -> {R, D}
	assert_eq!(config.edges[0], vec![Edge { target: 1, probability: 1.0,
						 rate: 0.2, flow: Flow::Contact }]);
	assert_eq!(config.edges[1][0].target, 2);
	let targets : Vec<_> = config.edges[2].iter().map(|e| e.target).collect();
	assert_eq!(targets, vec![3, 4]);
	assert!(config.edges[3].is_empty() && config.edges[4].is_empty());

	let config = ModelConfig::build(ModelFamily::Sir, &params, 1000.0).unwrap();
	assert_eq!(config.edges[0][0].target, 1);
	assert_eq!(config.edges[1], vec![Edge { target: 2, probability: 1.0,
						 rate: 0.1, flow: Flow::Linear }]);
    }

    #[test]
    fn derivative_conserves_population() {
	let params = Scenario::Average.parameters(0.1);
	for family in FAMILIES.iter() {
	    let config = ModelConfig::build(*family, &params, 1000.0).unwrap();
	    let state = vec![100.0; family.compartments().len()];
	    assert!(config.derivative(&state).iter().sum::<f64>().abs() < 1e-9);
	}
    }

    #[test]
    fn invalid_rates_are_rejected() {
	let mut params = Scenario::Average.parameters(0.1);
	params.fatality_fraction = 0.5;
	params.fatality_rate = 0.5;
	assert!(ModelConfig::build(ModelFamily::Sird, &params, 1000.0).is_err());
	assert!(ModelConfig::build(ModelFamily::Sir, &params, 1000.0).is_ok());

	let params = Scenario::Average.parameters(0.0);
	assert!(ModelConfig::build(ModelFamily::Sir, &params, 1000.0).is_err());
    }

    #[test]
    fn initial_state_sums_to_population() {
	let o = observed();
	let total = |row: Vec<f64>| row.iter().sum::<f64>();
	assert_eq!(total(Sir::initial(&o, 1000.0).unwrap().to_row()), 1000.0);
	assert_eq!(total(Seir::initial(&o, 1000.0).unwrap().to_row()), 1000.0);
	assert_eq!(total(Sird::initial(&o, 1000.0).unwrap().to_row()), 1000.0);
	assert_eq!(total(Seird::initial(&o, 1000.0).unwrap().to_row()), 1000.0);

	let state = Seird::initial(&o, 1000.0).unwrap();
	assert_eq!(state, Seird { s: 837.0, e: 0.0, i: 120.0, r: 40.0, d: 3.0 });
	assert_eq!(Sir::initial(&o, 1000.0).unwrap().r, 43.0);
    }

    #[test]
    fn inconsistent_population_is_rejected() {
	let o = observed();
	for population in vec![0.0, -5.0, 100.0] {
	    match Sird::initial(&o, population) {
		Err(Error::Configuration(_)) => (),
		other => panic!("unexpected: {:?}", other),
	    }
	}
	assert!(ModelConfig::build(ModelFamily::Sir, &Scenario::Low.parameters(0.1), 0.0).is_err());
    }

    #[test]
    fn rows_round_trip_through_states() {
	let row = vec![1.0, 2.0, 3.0, 4.0, 5.0];
	assert_eq!(Seird::from_row(&row).unwrap().to_row(), row);
	assert!(Sir::from_row(&row).is_err());
    }

}
