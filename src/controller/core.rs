use crate::constants::DEGREES_OF_FREEDOM;
use crate::controller::config::ControllerConfig;
use crate::errors::BalanceError;
use crate::independence::{density_curve, DensityCurve, IndependenceTester, TestResult};
use crate::population::{JointDistribution, Level, NormalizationPolicy, Variable};
use crate::sampler::{build_balanced, BalancedSample, RandomBalancedSampler, Sampler};
use crate::utils::{validate_positive_float_parameter, Table2x2};
use log::{debug, info, warn};
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

/// The two ways a population can be described.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq)]
pub enum Parameterization {
    /// Joint cell weights `[[A∧B, A∧¬B], [¬A∧B, ¬A∧¬B]]`, interpreted through
    /// the configured `NormalizationPolicy`.
    Joint(Table2x2),
    /// Marginal of `A` and the conditional of `B` on each level of `A`.
    Marginals {
        p_a: f64,
        p_b_given_a: f64,
        p_b_given_not_a: f64,
    },
}

impl Parameterization {
    /// Build the joint distribution this parameterization describes.
    pub fn build(&self, policy: NormalizationPolicy, tolerance: f64) -> Result<JointDistribution, BalanceError> {
        match *self {
            Parameterization::Joint(weights) => JointDistribution::from_counts(weights, policy, tolerance),
            Parameterization::Marginals {
                p_a,
                p_b_given_a,
                p_b_given_not_a,
            } => JointDistribution::from_marginals(p_a, p_b_given_a, p_b_given_not_a),
        }
    }
}

/// One cell of the joint table.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
pub enum Cell {
    AB,
    ANotB,
    NotAB,
    NotANotB,
}

impl Cell {
    /// `(row, column)` of the cell, rows indexed by `A`.
    pub fn position(&self) -> (usize, usize) {
        match self {
            Cell::AB => (0, 0),
            Cell::ANotB => (0, 1),
            Cell::NotAB => (1, 0),
            Cell::NotANotB => (1, 1),
        }
    }
}

/// A single input event.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq)]
pub enum ParameterChange {
    PopulationSize(f64),
    Joint { cell: Cell, value: f64 },
    JointTable(Table2x2),
    MarginalA(f64),
    ConditionalB { given: Level, value: f64 },
}

/// The complete parameter set owned by the controller.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq)]
pub struct Parameters {
    pub population: Parameterization,
    pub total_population_size: f64,
}

impl Parameters {
    /// Parameters after `change`. `model` is the population currently in
    /// effect, used when a change switches between parameterizations.
    pub fn apply(&self, change: &ParameterChange, model: &JointDistribution) -> Result<Parameters, BalanceError> {
        let mut next = *self;
        match *change {
            ParameterChange::PopulationSize(size) => {
                validate_positive_float_parameter(size, "total_population_size")?;
                next.total_population_size = size;
            }
            ParameterChange::Joint { cell, value } => {
                let mut weights = match self.population {
                    Parameterization::Joint(weights) => weights,
                    Parameterization::Marginals { .. } => model.table(),
                };
                let (row, col) = cell.position();
                weights[row][col] = value;
                next.population = Parameterization::Joint(weights);
            }
            ParameterChange::JointTable(weights) => {
                next.population = Parameterization::Joint(weights);
            }
            ParameterChange::MarginalA(value) => {
                let (_, p_b_given_a, p_b_given_not_a) = self.marginal_inputs(model)?;
                next.population = Parameterization::Marginals {
                    p_a: value,
                    p_b_given_a,
                    p_b_given_not_a,
                };
            }
            ParameterChange::ConditionalB { given, value } => {
                let (p_a, mut p_b_given_a, mut p_b_given_not_a) = self.marginal_inputs(model)?;
                match given {
                    Level::Yes => p_b_given_a = value,
                    Level::No => p_b_given_not_a = value,
                }
                next.population = Parameterization::Marginals {
                    p_a,
                    p_b_given_a,
                    p_b_given_not_a,
                };
            }
        }
        Ok(next)
    }

    fn marginal_inputs(&self, model: &JointDistribution) -> Result<(f64, f64, f64), BalanceError> {
        match self.population {
            Parameterization::Marginals {
                p_a,
                p_b_given_a,
                p_b_given_not_a,
            } => Ok((p_a, p_b_given_a, p_b_given_not_a)),
            Parameterization::Joint(_) => Ok((
                model.marginal(Variable::A, Level::Yes),
                model.conditional(Variable::B, Level::Yes, Level::Yes)?,
                model.conditional(Variable::B, Level::Yes, Level::No)?,
            )),
        }
    }
}

/// Result of testing one balanced sample.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub enum BranchOutcome {
    Tested(TestResult),
    /// The sample is empty or its table is degenerate.
    NotApplicable(BalanceError),
}

/// Everything computed for one balancing variable.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Branch {
    pub balance_on: Variable,
    /// `None` when one level of `balance_on` has no members.
    pub sample: Option<BalancedSample>,
    pub outcome: BranchOutcome,
}

impl Branch {
    pub fn test_result(&self) -> Option<&TestResult> {
        match &self.outcome {
            BranchOutcome::Tested(result) => Some(result),
            BranchOutcome::NotApplicable(_) => None,
        }
    }

    /// Chi-square density around this branch's statistic, for plotting.
    pub fn density_curve(&self, points: usize) -> Option<Result<DensityCurve, BalanceError>> {
        self.test_result()
            .map(|result| density_curve(result.statistic, DEGREES_OF_FREEDOM, points))
    }
}

/// Output of one full recomputation.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Snapshot {
    pub parameters: Parameters,
    pub model: JointDistribution,
    pub balanced_on_a: Branch,
    pub balanced_on_b: Branch,
}

impl Snapshot {
    pub fn branch(&self, balance_on: Variable) -> &Branch {
        match balance_on {
            Variable::A => &self.balanced_on_a,
            Variable::B => &self.balanced_on_b,
        }
    }
}

/// Presentation collaborator receiving the controller's results.
pub trait View {
    /// Called after every accepted update.
    fn render(&mut self, snapshot: &Snapshot);

    /// Called when an update or a recomputation fails. `change` is `None` for
    /// a recomputation. The previous snapshot stays current.
    fn reject(&mut self, _change: Option<&ParameterChange>, _error: &BalanceError) {}
}

impl View for () {
    fn render(&mut self, _snapshot: &Snapshot) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Idle,
    Recomputing,
}

/// Build the population, both balanced samples and both tests.
///
/// Population errors abort the whole run. Empty samples and degenerate tables
/// only mark their own branch as not applicable.
pub fn run_pipeline(parameters: &Parameters, cfg: &ControllerConfig) -> Result<Snapshot, BalanceError> {
    let model = parameters.population.build(cfg.normalization, cfg.tolerance)?;
    let tester = IndependenceTester::new(cfg.alpha, cfg.continuity_correction)?;
    debug!("Rebuilt population {:?}", model.table());
    Ok(Snapshot {
        parameters: *parameters,
        model,
        balanced_on_a: run_branch(&model, Variable::A, parameters.total_population_size, &tester)?,
        balanced_on_b: run_branch(&model, Variable::B, parameters.total_population_size, &tester)?,
    })
}

fn run_branch(
    model: &JointDistribution,
    balance_on: Variable,
    total_population_size: f64,
    tester: &IndependenceTester,
) -> Result<Branch, BalanceError> {
    let sample = match build_balanced(model, balance_on, total_population_size) {
        Ok(sample) => sample,
        Err(e) if e.is_branch_local() => {
            return Ok(Branch {
                balance_on,
                sample: None,
                outcome: BranchOutcome::NotApplicable(e),
            })
        }
        Err(e) => return Err(e),
    };
    let outcome = match tester.test(&sample.table, sample.sample_size) {
        Ok(result) => BranchOutcome::Tested(result),
        Err(e) if e.is_branch_local() => BranchOutcome::NotApplicable(e),
        Err(e) => return Err(e),
    };
    Ok(Branch {
        balance_on,
        sample: Some(sample),
        outcome,
    })
}

/// Owns the current parameters and recomputes everything on each change.
pub struct ReactiveController<V: View> {
    pub cfg: ControllerConfig,
    parameters: Parameters,
    snapshot: Snapshot,
    state: State,
    view: V,
}

impl<V: View> ReactiveController<V> {
    /// Validate `cfg`, compute the initial snapshot and render it.
    pub fn new(cfg: ControllerConfig, mut view: V) -> Result<Self, BalanceError> {
        cfg.validate()?;
        let parameters = Parameters {
            population: cfg.population,
            total_population_size: cfg.total_population_size,
        };
        let snapshot = run_pipeline(&parameters, &cfg)?;
        view.render(&snapshot);
        Ok(ReactiveController {
            cfg,
            parameters,
            snapshot,
            state: State::Idle,
            view,
        })
    }

    /// Apply one parameter change.
    ///
    /// On error the previous parameters and snapshot are kept and the view is
    /// told about the rejection.
    pub fn apply(&mut self, change: ParameterChange) -> Result<&Snapshot, BalanceError> {
        self.state = State::Recomputing;
        let outcome = self
            .parameters
            .apply(&change, &self.snapshot.model)
            .and_then(|parameters| run_pipeline(&parameters, &self.cfg));
        self.state = State::Idle;

        match outcome {
            Ok(snapshot) => {
                info!("Accepted {:?}", change);
                self.commit(snapshot);
                Ok(&self.snapshot)
            }
            Err(e) => {
                warn!("Rejected {:?}: {}", change, e);
                self.view.reject(Some(&change), &e);
                Err(e)
            }
        }
    }

    /// Recompute from the current parameters. Yields the same snapshot every
    /// time unless `cfg` was changed in between.
    pub fn recompute(&mut self) -> Result<&Snapshot, BalanceError> {
        self.state = State::Recomputing;
        let outcome = run_pipeline(&self.parameters, &self.cfg);
        self.state = State::Idle;

        match outcome {
            Ok(snapshot) => {
                self.commit(snapshot);
                Ok(&self.snapshot)
            }
            Err(e) => {
                warn!("Recomputation failed: {}", e);
                self.view.reject(None, &e);
                Err(e)
            }
        }
    }

    fn commit(&mut self, snapshot: Snapshot) {
        for branch in [&snapshot.balanced_on_a, &snapshot.balanced_on_b] {
            if let BranchOutcome::NotApplicable(e) = &branch.outcome {
                warn!("Test balanced on {} not applicable: {}", branch.balance_on, e);
            }
        }
        self.parameters = snapshot.parameters;
        self.snapshot = snapshot;
        self.view.render(&self.snapshot);
    }

    /// Draw an actual random balanced sample from the current population,
    /// rounded to whole individuals.
    pub fn draw_sample(&self, rng: &mut StdRng, balance_on: Variable) -> Result<[[u64; 2]; 2], BalanceError> {
        let size = self.parameters.total_population_size;
        let counts = self.snapshot.model.table().map(|row| row.map(|p| (p * size).round() as u64));
        RandomBalancedSampler::new(balance_on).sample(rng, &counts)
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn into_view(self) -> V {
        self.view
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::independence::Significance;
    use rand::SeedableRng;

    #[derive(Default)]
    struct RecordingView {
        rendered: Vec<Snapshot>,
        rejected: Vec<(Option<ParameterChange>, BalanceError)>,
    }

    impl View for RecordingView {
        fn render(&mut self, snapshot: &Snapshot) {
            self.rendered.push(snapshot.clone());
        }

        fn reject(&mut self, change: Option<&ParameterChange>, error: &BalanceError) {
            self.rejected.push((change.copied(), error.clone()));
        }
    }

    #[test]
    fn test_initial_render() {
        let controller = ReactiveController::new(ControllerConfig::default(), RecordingView::default()).unwrap();
        assert_eq!(controller.view().rendered.len(), 1);
        assert_eq!(controller.state(), State::Idle);

        let snapshot = controller.snapshot();
        let on_a = snapshot.branch(Variable::A);
        assert!((on_a.sample.unwrap().sample_size - 600.0).abs() < 1e-9);
        let on_b = snapshot.branch(Variable::B);
        assert!((on_b.sample.unwrap().sample_size - 900.0).abs() < 1e-9);
        assert!((on_a.test_result().unwrap().statistic - 40.0 / 13.0).abs() < 1e-9);
        assert!((on_b.test_result().unwrap().statistic - 90.0 / 23.0).abs() < 1e-9);
        assert_eq!(on_b.test_result().unwrap().significance, Significance::Reject);
    }

    #[test]
    fn test_population_size_change() {
        let mut controller = ReactiveController::new(ControllerConfig::default(), RecordingView::default()).unwrap();
        let snapshot = controller.apply(ParameterChange::PopulationSize(2000.0)).unwrap();
        let result = snapshot.balanced_on_a.test_result().unwrap();
        assert!((result.sample_size - 1200.0).abs() < 1e-9);
        // The statistic scales linearly with the sample size.
        assert!((result.statistic - 80.0 / 13.0).abs() < 1e-9);
        assert_eq!(controller.view().rendered.len(), 2);
    }

    #[test]
    fn test_rejected_update_keeps_previous_state() {
        let cfg = ControllerConfig::default().set_normalization(NormalizationPolicy::Reject);
        let mut controller = ReactiveController::new(cfg, RecordingView::default()).unwrap();
        let before = controller.snapshot().clone();

        let res = controller.apply(ParameterChange::Joint {
            cell: Cell::NotANotB,
            value: 0.30,
        });
        assert!(matches!(res, Err(BalanceError::InvalidDistribution(_))));
        assert_eq!(controller.snapshot(), &before);
        assert_eq!(controller.parameters(), &before.parameters);
        assert_eq!(controller.state(), State::Idle);

        let view = controller.into_view();
        assert_eq!(view.rendered.len(), 1);
        assert_eq!(view.rejected.len(), 1);
    }

    #[test]
    fn test_failed_recompute_reaches_view() {
        let mut controller = ReactiveController::new(ControllerConfig::default(), RecordingView::default()).unwrap();
        let before = controller.snapshot().clone();
        controller.cfg.alpha = 2.0;

        let res = controller.recompute();
        assert!(matches!(res, Err(BalanceError::InvalidParameter(..))));
        assert_eq!(controller.snapshot(), &before);
        assert_eq!(controller.state(), State::Idle);

        let view = controller.into_view();
        assert_eq!(view.rendered.len(), 1);
        assert_eq!(view.rejected.len(), 1);
        assert!(view.rejected[0].0.is_none());
    }

    #[test]
    fn test_overflowing_population_size_rejected() {
        let mut controller = ReactiveController::new(ControllerConfig::default(), RecordingView::default()).unwrap();
        let res = controller.apply(ParameterChange::PopulationSize(1e300));
        assert!(matches!(res, Err(BalanceError::InvalidParameter(..))));
        assert_eq!(controller.parameters().total_population_size, 1000.0);
        for var in [Variable::A, Variable::B] {
            assert!(controller.snapshot().branch(var).test_result().unwrap().statistic.is_finite());
        }
        let view = controller.into_view();
        assert_eq!(view.rejected[0].0, Some(ParameterChange::PopulationSize(1e300)));
    }

    #[test]
    fn test_draw_sample_too_large() {
        let mut controller = ReactiveController::new(ControllerConfig::default(), ()).unwrap();
        controller.apply(ParameterChange::PopulationSize(1e20)).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        let res = controller.draw_sample(&mut rng, Variable::A);
        assert!(matches!(res, Err(BalanceError::InvalidParameter(..))));
    }

    #[test]
    fn test_negative_population_size_rejected() {
        let mut controller = ReactiveController::new(ControllerConfig::default(), ()).unwrap();
        let res = controller.apply(ParameterChange::PopulationSize(-10.0));
        assert!(matches!(res, Err(BalanceError::InvalidParameter(..))));
        assert_eq!(controller.parameters().total_population_size, 1000.0);
    }

    #[test]
    fn test_free_sliders_normalized() {
        let mut controller = ReactiveController::new(ControllerConfig::default(), ()).unwrap();
        let snapshot = controller
            .apply(ParameterChange::Joint {
                cell: Cell::AB,
                value: 0.35,
            })
            .unwrap();
        // Weights 0.35/0.15/0.30/0.40 are divided by 1.2.
        assert!((snapshot.model.joint(Level::Yes, Level::Yes) - 0.35 / 1.2).abs() < 1e-12);
        assert_eq!(
            snapshot.parameters.population,
            Parameterization::Joint([[0.35, 0.15], [0.30, 0.40]])
        );
    }

    #[test]
    fn test_marginal_inputs() {
        let mut controller = ReactiveController::new(ControllerConfig::default(), ()).unwrap();
        let snapshot = controller.apply(ParameterChange::MarginalA(0.5)).unwrap();
        match snapshot.parameters.population {
            Parameterization::Marginals {
                p_a,
                p_b_given_a,
                p_b_given_not_a,
            } => {
                assert_eq!(p_a, 0.5);
                assert!((p_b_given_a - 0.5).abs() < 1e-12);
                assert!((p_b_given_not_a - 3.0 / 7.0).abs() < 1e-12);
            }
            other => panic!("unexpected parameterization {:?}", other),
        }
        // A balanced population needs no subsampling on A.
        let on_a = snapshot.balanced_on_a.sample.unwrap();
        assert!((on_a.sample_size - 1000.0).abs() < 1e-9);

        let snapshot = controller
            .apply(ParameterChange::ConditionalB {
                given: Level::No,
                value: 0.5,
            })
            .unwrap();
        // p(B|A) = p(B|¬A), so the variables are independent.
        for var in [Variable::A, Variable::B] {
            assert!(snapshot.branch(var).test_result().unwrap().statistic < 1e-9);
        }

        let res = controller.apply(ParameterChange::ConditionalB {
            given: Level::Yes,
            value: 1.5,
        });
        assert!(matches!(res, Err(BalanceError::InvalidDistribution(_))));
    }

    #[test]
    fn test_undefined_conditional_rejects_update() {
        let cfg = ControllerConfig::default().set_population(Parameterization::Joint([[0.0, 0.0], [0.6, 0.4]]));
        let mut controller = ReactiveController::new(cfg, ()).unwrap();
        let res = controller.apply(ParameterChange::MarginalA(0.2));
        assert!(matches!(res, Err(BalanceError::UndefinedConditional(_))));
    }

    #[test]
    fn test_not_applicable_branch() {
        let cfg = ControllerConfig::default().set_population(Parameterization::Joint([[0.6, 0.4], [0.0, 0.0]]));
        let controller = ReactiveController::new(cfg, ()).unwrap();
        let snapshot = controller.snapshot();
        assert!(matches!(
            snapshot.balanced_on_a.outcome,
            BranchOutcome::NotApplicable(BalanceError::EmptyBalancedSample(_))
        ));
        assert!(snapshot.balanced_on_a.sample.is_none());
        // Balanced on B every individual is treated, so the untreated column is empty.
        assert!(matches!(
            snapshot.balanced_on_b.outcome,
            BranchOutcome::NotApplicable(BalanceError::DegenerateTable(_))
        ));
        assert!(snapshot.balanced_on_b.sample.is_some());
    }

    #[test]
    fn test_zero_population_not_applicable() {
        let mut controller = ReactiveController::new(ControllerConfig::default(), ()).unwrap();
        let snapshot = controller.apply(ParameterChange::PopulationSize(0.0)).unwrap();
        for var in [Variable::A, Variable::B] {
            assert!(matches!(
                snapshot.branch(var).outcome,
                BranchOutcome::NotApplicable(BalanceError::DegenerateTable(_))
            ));
        }
    }

    #[test]
    fn test_recompute_idempotent() {
        let mut controller = ReactiveController::new(ControllerConfig::default(), RecordingView::default()).unwrap();
        let first = controller.recompute().unwrap().clone();
        let second = controller.recompute().unwrap().clone();
        assert_eq!(first, second);
        assert_eq!(controller.view().rendered.len(), 3);
        assert_eq!(controller.view().rendered[0], first);
    }

    #[test]
    fn test_density_curve_for_branch() {
        let controller = ReactiveController::new(ControllerConfig::default(), ()).unwrap();
        let curve = controller.snapshot().balanced_on_a.density_curve(100).unwrap().unwrap();
        assert_eq!(curve.x.len(), 100);
        assert!((curve.tail_mass - controller.snapshot().balanced_on_a.test_result().unwrap().p_value).abs() < 1e-12);
    }

    #[test]
    fn test_draw_sample() {
        let controller = ReactiveController::new(ControllerConfig::default(), ()).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        let drawn = controller.draw_sample(&mut rng, Variable::A).unwrap();
        assert_eq!(drawn[0], [150, 150]);
        assert_eq!(drawn[1][0] + drawn[1][1], 300);
    }
}
