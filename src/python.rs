//! Python bindings, built with the `python` feature.
//!
//! Vectors cross the boundary as `(x, y)` tuples. Out-of-range ids raise
//! `IndexError`, an invalid time step or time horizon raises `ValueError`,
//! and a malformed obstacle returns `-1`.

use pyo3::exceptions::{PyIndexError, PyValueError};
use pyo3::prelude::*;

use crate::config::{AgentParams, SimulatorConfig};
use crate::error::SimulatorError;
use crate::simulator::Simulator;
use crate::structs::Vector2D;

impl From<SimulatorError> for PyErr {
    fn from(err: SimulatorError) -> PyErr {
        match err {
            SimulatorError::InvalidTimeStep(_) | SimulatorError::InvalidTimeHorizon(_) => {
                PyValueError::new_err(err.to_string())
            }
            SimulatorError::AgentOutOfRange { .. } | SimulatorError::ObstacleOutOfRange { .. } => {
                PyIndexError::new_err(err.to_string())
            }
        }
    }
}

#[pyclass(name = "Simulator")]
pub struct PySimulator {
    inner: Simulator,
}

#[pymethods]
impl PySimulator {
    #[new]
    #[pyo3(signature = (time_step = 0.25, parallel = true))]
    fn new(time_step: f64, parallel: bool) -> PyResult<Self> {
        let mut inner = Simulator::with_config(SimulatorConfig {
            parallel,
            ..SimulatorConfig::default()
        });
        inner.set_time_step(time_step)?;
        Ok(PySimulator { inner })
    }

    #[allow(clippy::too_many_arguments)]
    #[pyo3(signature = (
        neighbor_dist,
        max_neighbors,
        time_horizon,
        time_horizon_obst,
        radius,
        max_speed,
        velocity = (0.0, 0.0)
    ))]
    fn set_agent_defaults(
        &mut self,
        neighbor_dist: f64,
        max_neighbors: usize,
        time_horizon: f64,
        time_horizon_obst: f64,
        radius: f64,
        max_speed: f64,
        velocity: (f64, f64),
    ) -> PyResult<()> {
        Ok(self.inner.set_agent_defaults(AgentParams::new(
            neighbor_dist,
            max_neighbors,
            time_horizon,
            time_horizon_obst,
            radius,
            max_speed,
            velocity.into(),
        ))?)
    }

    fn add_agent(&mut self, position: (f64, f64)) -> usize {
        self.inner.add_agent(position.into())
    }

    /// Returns the first vertex id, or -1 for fewer than two vertices.
    fn add_obstacle(&mut self, vertices: Vec<(f64, f64)>) -> i64 {
        let vertices: Vec<Vector2D> = vertices.into_iter().map(Vector2D::from).collect();
        match self.inner.add_obstacle(&vertices) {
            Some(id) => id as i64,
            None => -1,
        }
    }

    fn process_obstacles(&mut self) -> usize {
        self.inner.process_obstacles()
    }

    fn set_agent_pref_velocity(&mut self, id: usize, x: f64, y: f64) -> PyResult<()> {
        Ok(self.inner.set_agent_pref_velocity(id, Vector2D::new(x, y))?)
    }

    fn set_agent_goal(&mut self, id: usize, x: f64, y: f64) -> PyResult<()> {
        Ok(self.inner.set_agent_goal(id, Vector2D::new(x, y))?)
    }

    fn get_agent_position(&self, id: usize) -> PyResult<(f64, f64)> {
        Ok(self.inner.agent_position(id)?.into())
    }

    fn get_agent_velocity(&self, id: usize) -> PyResult<(f64, f64)> {
        Ok(self.inner.agent_velocity(id)?.into())
    }

    fn get_agent_pref_velocity(&self, id: usize) -> PyResult<(f64, f64)> {
        Ok(self.inner.agent_pref_velocity(id)?.into())
    }

    fn get_num_agents(&self) -> usize {
        self.inner.num_agents()
    }

    fn get_num_obstacle_vertices(&self) -> usize {
        self.inner.num_obstacle_vertices()
    }

    fn get_obstacle_vertex(&self, id: usize) -> PyResult<(f64, f64)> {
        Ok(self.inner.obstacle_vertex(id)?.into())
    }

    fn get_time_step(&self) -> f64 {
        self.inner.time_step()
    }

    fn set_time_step(&mut self, time_step: f64) -> PyResult<()> {
        Ok(self.inner.set_time_step(time_step)?)
    }

    fn get_global_time(&self) -> f64 {
        self.inner.global_time()
    }

    fn do_step(&mut self) {
        self.inner.step();
    }

    /// Runs `steps` steps, or until every goal is reached.
    #[pyo3(signature = (steps, stop_at_goal = false))]
    fn run(&mut self, steps: usize, stop_at_goal: bool) -> usize {
        for done in 0..steps {
            if stop_at_goal && self.inner.reached_goal() {
                return done;
            }
            self.inner.step();
        }
        steps
    }

    fn reached_goal(&self) -> bool {
        self.inner.reached_goal()
    }

    fn query_visibility(&self, p1: (f64, f64), p2: (f64, f64), radius: f64) -> bool {
        self.inner.query_visibility(p1.into(), p2.into(), radius)
    }
}

#[pymodule]
fn rvo_core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PySimulator>()?;
    Ok(())
}
