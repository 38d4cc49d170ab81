use log::debug;
use serde::{Serialize,Deserialize};

use super::error::{Result,Error};
use super::model::ModelConfig;


/// Stepping engine that runs a model forward one day per step. The result
/// holds `steps + 1` rows, the first being the initial state.
pub trait Integrator {
    fn integrate(&self, config: &ModelConfig, initial: &[f64], steps: usize) -> Result<Vec<Vec<f64>>>;
}


/// Daily forward differences. A compartment never loses more in one day
/// than it holds: when the summed outflow exceeds the occupancy, every
/// outgoing edge is scaled down so the compartment empties exactly.
#[derive(Debug,Clone,Copy,Default)]
pub struct DifferenceEquations;

impl DifferenceEquations {
    fn step(config: &ModelConfig, state: &[f64]) -> Vec<f64> {
	let mut next = state.to_vec();
	for (source, (edges, flows)) in config.edges.iter().zip(config.flows(state)).enumerate() {
	    let total : f64 = flows.iter().sum();
	    let share = match total > state[source] {
		true => {
		    next[source] -= state[source];
		    state[source] / total
		},
		false => {
		    next[source] -= total;
		    1.0
		},
	    };
	    for (edge, flow) in edges.iter().zip(flows) {
		next[edge.target] += flow * share;
	    }
	}
	next
    }
}

impl Integrator for DifferenceEquations {
    fn integrate(&self, config: &ModelConfig, initial: &[f64], steps: usize) -> Result<Vec<Vec<f64>>> {
	check_width(config, initial)?;
	for compartment in config.family.compartments() {
	    let rate = config.exit_rate(*compartment);
	    if rate > 1.0 {
		debug!("{:?} exit rate {} exceeds one per day, daily outflow capped", compartment, rate);
	    }
	}
	let mut rows = Vec::with_capacity(steps + 1);
	let mut state = initial.to_vec();
	rows.push(state.clone());
	for _ in 0..steps {
	    state = Self::step(config, &state);
	    rows.push(state.clone());
	}
	Ok(rows)
    }
}


/// Classic fourth order Runge-Kutta with `substeps` steps per day.
#[derive(Debug,Clone,Copy)]
pub struct RungeKutta {
    pub substeps: usize,
}

impl Default for RungeKutta {
    fn default() -> Self {
	Self { substeps: 4 }
    }
}

impl Integrator for RungeKutta {
    fn integrate(&self, config: &ModelConfig, initial: &[f64], steps: usize) -> Result<Vec<Vec<f64>>> {

	check_width(config, initial)?;
	if self.substeps == 0 {
	    return Err(Error::configuration("Runge-Kutta needs at least one substep per day"));
	}

	let dt = 1.0 / self.substeps as f64;
	let along = |state: &[f64], slope: &[f64], h: f64| -> Vec<f64> {
	    state.iter().zip(slope).map(|(s,k)| s + h * k).collect()
	};

	let mut rows = Vec::with_capacity(steps + 1);
	let mut state = initial.to_vec();
	rows.push(state.clone());
	for _ in 0..steps {
	    for _ in 0..self.substeps {
		let k1 = config.derivative(&state);
		let k2 = config.derivative(&along(&state, &k1, dt / 2.0));
		let k3 = config.derivative(&along(&state, &k2, dt / 2.0));
		let k4 = config.derivative(&along(&state, &k3, dt));
		for i in 0..state.len() {
		    state[i] += dt / 6.0 * (k1[i] + 2.0 * k2[i] + 2.0 * k3[i] + k4[i]);
		}
	    }
	    rows.push(state.clone());
	}
	Ok(rows)

    }
}


/// Engine selection for the command line.
#[derive(Serialize,Deserialize,Debug,Clone,Copy,PartialEq,Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Engine {
    Difference,
    RungeKutta,
}

impl Default for Engine {
    fn default() -> Self {
	Self::Difference
    }
}

impl Engine {
    pub fn integrator(&self) -> Box<dyn Integrator> {
	match self {
	    Self::Difference => Box::new(DifferenceEquations),
	    Self::RungeKutta => Box::new(RungeKutta::default()),
	}
    }
}


fn check_width(config: &ModelConfig, initial: &[f64]) -> Result<()> {
    match initial.len() == config.edges.len() {
	true => Ok(()),
	false => Err(Error::configuration(format!(
	    "{} model has {} compartments, initial state has {}",
	    config.family.name(), config.edges.len(), initial.len()))),
    }
}
