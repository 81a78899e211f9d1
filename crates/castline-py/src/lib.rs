//! # Castline Python Bindings
//!
//! PyO3 bindings exposing the Castline black mage environment to Python.
//!
//! ## Usage
//!
//! ```python
//! import numpy as np
//! from castline import BlackMageEnv, Stats
//!
//! env = BlackMageEnv(seed=7, stats=Stats(ss_multiplier=0.95, potency_multiplier=30.0))
//! state = env.reset()
//!
//! while env.time < 60_000:
//!     if env.at_decision_point:
//!         legal = env.legal_actions()
//!         env.apply(int(np.random.choice(legal)))
//!     env.advance()
//!
//! print(f"DPS: {env.dps:.1f}")
//! for t in env.transitions():
//!     print(t.opened_at, t.action, t.reward)
//! ```

use castline_core::black_mage::{Action, BlackMage, Element, STATE_LEN};
use castline_core::config::{Opener, RunConfig, StatSource, DEFAULT_HORIZON};
use castline_core::stats::{Attributes, Stats};
use castline_core::transition::Transition;
use castline_core::{batch, Job, JobAction, SimError};
use numpy::{PyArray1, ToPyArray};
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

fn to_py_err(err: SimError) -> PyErr {
    PyValueError::new_err(err.to_string())
}

fn parse_opener(name: &str) -> PyResult<Opener> {
    serde_json::from_value(serde_json::Value::String(name.to_string()))
        .map_err(|_| PyValueError::new_err(format!("unknown opener: {name}")))
}

fn element_name(element: Element) -> &'static str {
    match element {
        Element::Neutral => "neutral",
        Element::UmbralIce => "umbral_ice",
        Element::AstralFire => "astral_fire",
    }
}

/// Stat multipliers for Python.
#[pyclass(name = "Stats", frozen)]
#[derive(Clone, Copy)]
pub struct PyStats {
    inner: Stats,
}

#[pymethods]
impl PyStats {
    /// Create stats from explicit multipliers.
    ///
    /// Raises `ValueError` if any multiplier is non-finite or not positive.
    #[new]
    #[pyo3(signature = (ss_multiplier=1.0, potency_multiplier=1.0, expected_multiplier=1.0, dot_multiplier=1.0))]
    fn new(
        ss_multiplier: f64,
        potency_multiplier: f64,
        expected_multiplier: f64,
        dot_multiplier: f64,
    ) -> PyResult<Self> {
        Stats::new(
            ss_multiplier,
            potency_multiplier,
            expected_multiplier,
            dot_multiplier,
        )
        .map(|inner| Self { inner })
        .map_err(to_py_err)
    }

    /// Derive multipliers from raw gear attributes.
    ///
    /// # Example
    ///
    /// ```python
    /// stats = Stats.from_attributes(
    ///     weapon_damage=120, intelligence=3500, determination=1800,
    ///     critical_hit=2200, direct_hit=1400, spell_speed=900,
    /// )
    /// ```
    #[staticmethod]
    fn from_attributes(
        weapon_damage: u32,
        intelligence: u32,
        determination: u32,
        critical_hit: u32,
        direct_hit: u32,
        spell_speed: u32,
    ) -> PyResult<Self> {
        let attributes = Attributes {
            weapon_damage,
            intelligence,
            determination,
            critical_hit,
            direct_hit,
            spell_speed,
        };
        Stats::from_attributes(&attributes)
            .map(|inner| Self { inner })
            .map_err(to_py_err)
    }

    #[getter]
    fn ss_multiplier(&self) -> f64 {
        self.inner.ss_multiplier
    }

    #[getter]
    fn potency_multiplier(&self) -> f64 {
        self.inner.potency_multiplier
    }

    #[getter]
    fn expected_multiplier(&self) -> f64 {
        self.inner.expected_multiplier
    }

    #[getter]
    fn dot_multiplier(&self) -> f64 {
        self.inner.dot_multiplier
    }

    fn __repr__(&self) -> String {
        format!(
            "Stats(ss={:.3}, potency={:.3}, expected={:.3}, dot={:.3})",
            self.inner.ss_multiplier,
            self.inner.potency_multiplier,
            self.inner.expected_multiplier,
            self.inner.dot_multiplier
        )
    }
}

/// One recorded decision, with actions given as indices.
#[pyclass(name = "Transition", frozen)]
#[derive(Clone)]
pub struct PyTransition {
    /// Encoded state at the decision point.
    #[pyo3(get)]
    pub state: Vec<f32>,
    /// Indices of the legal actions.
    #[pyo3(get)]
    pub legal_actions: Vec<usize>,
    /// Index of the chosen action, if one was applied.
    #[pyo3(get)]
    pub action: Option<usize>,
    /// Damage dealt until the next decision point.
    #[pyo3(get)]
    pub reward: f64,
    /// Tick at which the decision point opened.
    #[pyo3(get)]
    pub opened_at: u64,
    /// Ticks until the next decision point; zero for the open tail.
    #[pyo3(get)]
    pub elapsed: u64,
}

impl From<&Transition<Action>> for PyTransition {
    fn from(t: &Transition<Action>) -> Self {
        Self {
            state: t.state.clone(),
            legal_actions: t.legal_actions.iter().map(|a| a.index()).collect(),
            action: t.action.map(JobAction::index),
            reward: t.reward,
            opened_at: t.opened_at,
            elapsed: t.elapsed,
        }
    }
}

#[pymethods]
impl PyTransition {
    fn __repr__(&self) -> String {
        format!(
            "Transition(opened_at={}, action={:?}, reward={:.1}, elapsed={})",
            self.opened_at, self.action, self.reward, self.elapsed
        )
    }
}

/// Black mage environment for Python.
///
/// The caller owns the loop: apply an action whenever `at_decision_point`
/// holds, then call `advance()` to jump to the next scheduled event.
#[pyclass]
pub struct BlackMageEnv {
    inner: BlackMage,
}

#[pymethods]
impl BlackMageEnv {
    /// Create a new environment.
    ///
    /// `opener` is `"precast_blizzard3"` (default) or `"neutral"`.
    #[new]
    #[pyo3(signature = (seed=0, stats=None, opener="precast_blizzard3"))]
    fn new(seed: u64, stats: Option<PyStats>, opener: &str) -> PyResult<Self> {
        let stats = stats.map_or_else(Stats::default, |s| s.inner);
        let inner = BlackMage::with_opener(stats, seed, parse_opener(opener)?).map_err(to_py_err)?;
        Ok(Self { inner })
    }

    /// Create an environment from a JSON run configuration.
    #[staticmethod]
    fn from_config(json: &str) -> PyResult<Self> {
        let config = RunConfig::from_json_str(json).map_err(to_py_err)?;
        let inner = BlackMage::from_config(&config).map_err(to_py_err)?;
        Ok(Self { inner })
    }

    /// Reset to the start of the fight and return the initial state.
    ///
    /// With a seed, the environment is re-seeded first; without one, the
    /// previous seed replays the same server ticks and procs.
    #[pyo3(signature = (seed=None))]
    fn reset<'py>(&mut self, py: Python<'py>, seed: Option<u64>) -> Bound<'py, PyArray1<f32>> {
        match seed {
            Some(seed) => self.inner.reset_with_seed(seed),
            None => self.inner.reset(),
        }
        self.inner.encode_state().to_pyarray(py)
    }

    /// Jump to the next scheduled event and return the ticks elapsed.
    fn advance(&mut self) -> PyResult<u64> {
        let delta = self
            .inner
            .next_event_delta()
            .ok_or_else(|| PyValueError::new_err("no pending events"))?;
        self.inner.advance(delta);
        Ok(delta)
    }

    /// Advance until the next non-trivial decision point or `horizon`.
    ///
    /// Releases the GIL while the clock runs. Returns the ticks elapsed.
    #[pyo3(signature = (horizon=DEFAULT_HORIZON))]
    fn advance_to_decision(&mut self, py: Python, horizon: u64) -> u64 {
        let inner = &mut self.inner;
        py.allow_threads(|| {
            let start = inner.now();
            loop {
                if inner.now() >= horizon {
                    break;
                }
                let Some(delta) = inner.next_event_delta() else {
                    break;
                };
                inner.advance(delta);
                if inner.at_decision_point() {
                    break;
                }
            }
            inner.now() - start
        })
    }

    /// Apply an action by index.
    ///
    /// Raises `ValueError` for an unknown index or an action outside the
    /// legal set; the state is unchanged in that case.
    fn apply(&mut self, action: usize) -> PyResult<()> {
        let action = Action::from_index(action).ok_or(SimError::UnknownAction(action));
        action
            .and_then(|action| self.inner.try_apply(action))
            .map_err(to_py_err)
    }

    /// Indices of the currently legal actions.
    fn legal_actions(&self) -> Vec<usize> {
        self.inner
            .legal_actions()
            .into_iter()
            .map(JobAction::index)
            .collect()
    }

    /// Boolean mask over all action indices.
    fn action_mask<'py>(&self, py: Python<'py>) -> Bound<'py, PyArray1<bool>> {
        let mask = self.inner.legal_mask();
        let flags: Vec<bool> = Action::ALL.iter().map(|a| mask.has(*a)).collect();
        flags.to_pyarray(py)
    }

    /// Encoded state vector.
    fn state<'py>(&self, py: Python<'py>) -> Bound<'py, PyArray1<f32>> {
        self.inner.encode_state().to_pyarray(py)
    }

    /// Recorded transitions so far.
    fn transitions(&self) -> Vec<PyTransition> {
        self.inner.transitions().iter().map(PyTransition::from).collect()
    }

    /// Cast counters as a JSON object string.
    fn metrics_json(&self) -> PyResult<String> {
        serde_json::to_string(&self.inner.metrics())
            .map_err(|err| PyValueError::new_err(err.to_string()))
    }

    /// Whether the job is waiting on a choice.
    #[getter]
    fn at_decision_point(&self) -> bool {
        self.inner.at_decision_point()
    }

    /// Current tick (centiseconds).
    #[getter]
    fn time(&self) -> u64 {
        self.inner.now()
    }

    #[getter]
    fn seed(&self) -> u64 {
        self.inner.seed()
    }

    #[getter]
    fn mana(&self) -> u32 {
        self.inner.mana()
    }

    #[getter]
    fn element(&self) -> &'static str {
        element_name(self.inner.element())
    }

    #[getter]
    fn total_damage(&self) -> f64 {
        self.inner.total_damage()
    }

    #[getter]
    fn dps(&self) -> f64 {
        self.inner.dps()
    }

    /// Length of the state vector.
    #[staticmethod]
    fn state_len() -> usize {
        STATE_LEN
    }

    /// Action names in index order.
    #[staticmethod]
    fn action_names() -> Vec<&'static str> {
        Action::ALL.iter().map(|a| a.name()).collect()
    }

    fn __repr__(&self) -> String {
        format!(
            "BlackMageEnv(time={}, mana={}, element={}, damage={:.0})",
            self.inner.now(),
            self.inner.mana(),
            self.element(),
            self.inner.total_damage()
        )
    }
}

/// Run the uniform random rotation once per seed and return each run's DPS.
///
/// Runs execute in parallel with the GIL released.
#[pyfunction]
#[pyo3(signature = (seeds, horizon=DEFAULT_HORIZON, stats=None, opener="precast_blizzard3"))]
fn evaluate_random(
    py: Python,
    seeds: Vec<u64>,
    horizon: u64,
    stats: Option<PyStats>,
    opener: &str,
) -> PyResult<Vec<f64>> {
    let config = RunConfig {
        horizon,
        stats: StatSource::Multipliers(stats.map_or_else(Stats::default, |s| s.inner)),
        opener: parse_opener(opener)?,
        ..RunConfig::default()
    };
    let runs = py
        .allow_threads(|| batch::evaluate_random(&config, &seeds))
        .map_err(to_py_err)?;
    Ok(runs.iter().map(|run| run.dps).collect())
}

/// Python module definition.
#[pymodule]
fn _castline(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyStats>()?;
    m.add_class::<PyTransition>()?;
    m.add_class::<BlackMageEnv>()?;
    m.add_function(wrap_pyfunction!(evaluate_random, m)?)?;
    m.add("STATE_LEN", STATE_LEN)?;
    m.add("DEFAULT_HORIZON", DEFAULT_HORIZON)?;
    Ok(())
}
