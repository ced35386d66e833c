//! Computation nodes for common feature model metrics.
//!
//! Leaves are either assignment lists (sampled or enumerated configurations)
//! or snapshots of constraint formulas, see [`FeatureModel::formulas`].
//!
//! [`FeatureModel::formulas`]: crate::domain::FeatureModel::formulas

use std::collections::{BTreeMap, BTreeSet};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use itertools::Itertools;
use tracing::debug;

use crate::analysis::compute::{Analysis, CancelToken, Computation, Progress, Source};
use crate::analysis::error::AnalysisError;
use crate::analysis::outcome::Outcome;
use crate::analysis::traverse::{traverse, traverse_all};
use crate::analysis::visitors::{ConnectiveCounter, TerminalCounter};
use crate::domain::assignment::AssignmentList;
use crate::domain::formula::Node;

/// Number of configurations in an assignment list.
pub struct CountConfigurations {
    inputs: (Source<AssignmentList>,),
}

impl CountConfigurations {
    pub fn new(list: impl Into<Source<AssignmentList>>) -> Computation<usize> {
        Computation::new(Self {
            inputs: (list.into(),),
        })
    }
}

impl Analysis for CountConfigurations {
    type Output = usize;
    type Dependencies = (Source<AssignmentList>,);
    const KIND: &'static str = "count-configurations";

    fn dependencies(&self) -> &Self::Dependencies {
        &self.inputs
    }

    fn compute(
        &self,
        (list,): (Arc<AssignmentList>,),
        _progress: &Progress,
        _cancel: &CancelToken,
    ) -> Outcome<usize> {
        Outcome::Value(list.len())
    }
}

/// Keeps the configurations that select every required feature.
pub struct SelectConfigurations {
    inputs: (Source<AssignmentList>,),
    required: BTreeSet<String>,
}

impl SelectConfigurations {
    pub fn new(
        list: impl Into<Source<AssignmentList>>,
        required: impl IntoIterator<Item = impl Into<String>>,
    ) -> Computation<AssignmentList> {
        Computation::new(Self {
            inputs: (list.into(),),
            required: required.into_iter().map(Into::into).collect(),
        })
    }
}

impl Analysis for SelectConfigurations {
    type Output = AssignmentList;
    type Dependencies = (Source<AssignmentList>,);
    const KIND: &'static str = "select-configurations";

    fn dependencies(&self) -> &Self::Dependencies {
        &self.inputs
    }

    fn parameters<H: Hasher>(&self, state: &mut H) {
        self.required.hash(state);
    }

    fn compute(
        &self,
        (list,): (Arc<AssignmentList>,),
        progress: &Progress,
        cancel: &CancelToken,
    ) -> Outcome<AssignmentList> {
        let mut indices = Vec::with_capacity(self.required.len());
        for name in &self.required {
            match list.index_of(name) {
                Some(i) => indices.push(i + 1),
                None => {
                    return Outcome::Failure(AnalysisError::computation(
                        Self::KIND,
                        format!("unknown variable: {name}"),
                    ))
                }
            }
        }

        progress.set_total(list.len() as u64);
        let mut selected = AssignmentList::new(list.variables().iter().cloned());
        for assignment in list.assignments() {
            if let Err(error) = cancel.check() {
                return Outcome::Failure(error);
            }
            if indices.iter().all(|&i| assignment.is_selected(i)) {
                selected.push(assignment.clone());
            }
            progress.step();
        }
        debug!("compute: kept {} of {} configurations", selected.len(), list.len());
        Outcome::Value(selected)
    }
}

/// How many configurations select each variable, in variable order.
pub struct FeatureFrequency {
    inputs: (Source<AssignmentList>,),
}

impl FeatureFrequency {
    pub fn new(list: impl Into<Source<AssignmentList>>) -> Computation<Vec<(String, usize)>> {
        Computation::new(Self {
            inputs: (list.into(),),
        })
    }
}

impl Analysis for FeatureFrequency {
    type Output = Vec<(String, usize)>;
    type Dependencies = (Source<AssignmentList>,);
    const KIND: &'static str = "feature-frequency";

    fn dependencies(&self) -> &Self::Dependencies {
        &self.inputs
    }

    fn compute(
        &self,
        (list,): (Arc<AssignmentList>,),
        progress: &Progress,
        cancel: &CancelToken,
    ) -> Outcome<Self::Output> {
        let variables = list.variables();
        let mut counts = vec![0usize; variables.len()];

        progress.set_total(list.len() as u64);
        for assignment in list.assignments() {
            if let Err(error) = cancel.check() {
                return Outcome::Failure(error);
            }
            for &literal in assignment.literals() {
                let index = literal.unsigned_abs() as usize;
                if index > variables.len() {
                    return Outcome::Failure(AnalysisError::computation(
                        Self::KIND,
                        format!("literal {literal} out of range for {} variables", variables.len()),
                    ));
                }
                if literal > 0 {
                    counts[index - 1] += 1;
                }
            }
            progress.step();
        }

        Outcome::Value(variables.iter().cloned().zip(counts).collect())
    }
}

/// Terminal counts over a set of constraint formulas.
#[derive(Debug, Clone, PartialEq)]
pub struct AtomStatistics {
    pub constraints: usize,
    pub atoms: usize,
    pub min: usize,
    pub max: usize,
    pub mean: f64,
}

/// Summarises how many atoms the constraints of a model contain.
///
/// `Empty` for a model without constraints.
pub struct ConstraintAtoms {
    inputs: (Source<Vec<Node>>,),
}

impl ConstraintAtoms {
    pub fn new(formulas: impl Into<Source<Vec<Node>>>) -> Computation<AtomStatistics> {
        Computation::new(Self {
            inputs: (formulas.into(),),
        })
    }
}

impl Analysis for ConstraintAtoms {
    type Output = AtomStatistics;
    type Dependencies = (Source<Vec<Node>>,);
    const KIND: &'static str = "constraint-atoms";

    fn dependencies(&self) -> &Self::Dependencies {
        &self.inputs
    }

    fn compute(
        &self,
        (formulas,): (Arc<Vec<Node>>,),
        progress: &Progress,
        cancel: &CancelToken,
    ) -> Outcome<AtomStatistics> {
        if formulas.is_empty() {
            return Outcome::Empty;
        }

        progress.set_total(formulas.len() as u64);
        let mut counter = TerminalCounter::new();
        let mut counts = Vec::with_capacity(formulas.len());
        for formula in formulas.iter() {
            if let Err(error) = cancel.check() {
                return Outcome::Failure(error);
            }
            match traverse(formula, &mut counter) {
                Outcome::Value(count) => counts.push(count),
                Outcome::Empty => counts.push(0),
                Outcome::Failure(error) => return Outcome::Failure(error),
            }
            progress.step();
        }

        let (min, max) = counts
            .iter()
            .copied()
            .minmax()
            .into_option()
            .unwrap_or((0, 0));
        let atoms: usize = counts.iter().sum();
        Outcome::Value(AtomStatistics {
            constraints: counts.len(),
            atoms,
            min,
            max,
            mean: atoms as f64 / counts.len() as f64,
        })
    }
}

/// Connective usage across all constraint formulas, by operator name.
///
/// `Empty` when no formula contains a connective.
pub struct OperatorDistribution {
    inputs: (Source<Vec<Node>>,),
}

impl OperatorDistribution {
    pub fn new(
        formulas: impl Into<Source<Vec<Node>>>,
    ) -> Computation<BTreeMap<String, usize>> {
        Computation::new(Self {
            inputs: (formulas.into(),),
        })
    }
}

impl Analysis for OperatorDistribution {
    type Output = BTreeMap<String, usize>;
    type Dependencies = (Source<Vec<Node>>,);
    const KIND: &'static str = "operator-distribution";

    fn dependencies(&self) -> &Self::Dependencies {
        &self.inputs
    }

    fn compute(
        &self,
        (formulas,): (Arc<Vec<Node>>,),
        progress: &Progress,
        _cancel: &CancelToken,
    ) -> Outcome<Self::Output> {
        let outcome = traverse_all(formulas.iter(), &mut ConnectiveCounter::default());
        progress.finish();
        outcome.map(|counts| {
            counts
                .into_iter()
                .map(|(name, count)| (name.to_string(), count))
                .collect()
        })
    }
}

/// Share of configurations that select each variable, 0.0 to 1.0.
///
/// Combines [`FeatureFrequency`] with [`CountConfigurations`] over the same list.
pub struct SelectionRatio {
    inputs: (Source<Vec<(String, usize)>>, Source<usize>),
}

impl SelectionRatio {
    pub fn new(list: impl Into<Source<AssignmentList>>) -> Computation<Vec<(String, f64)>> {
        let list = list.into();
        Computation::new(Self {
            inputs: (
                FeatureFrequency::new(list.clone()).into(),
                CountConfigurations::new(list).into(),
            ),
        })
    }
}

impl Analysis for SelectionRatio {
    type Output = Vec<(String, f64)>;
    type Dependencies = (Source<Vec<(String, usize)>>, Source<usize>);
    const KIND: &'static str = "selection-ratio";

    fn dependencies(&self) -> &Self::Dependencies {
        &self.inputs
    }

    fn compute(
        &self,
        (frequency, total): (Arc<Vec<(String, usize)>>, Arc<usize>),
        _progress: &Progress,
        _cancel: &CancelToken,
    ) -> Outcome<Self::Output> {
        if *total == 0 {
            return Outcome::Empty;
        }
        Outcome::Value(
            frequency
                .iter()
                .map(|(name, count)| (name.clone(), *count as f64 / *total as f64))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::compute::Session;
    use crate::domain::assignment::BooleanAssignment;

    fn configurations() -> AssignmentList {
        let mut list = AssignmentList::new(["A", "B", "C"]);
        list.push_named(&["A", "B"], &["C"]);
        list.push_named(&["A", "C"], &["B"]);
        list.push_named(&["B"], &["A", "C"]);
        list
    }

    #[test]
    fn given_configurations_when_counting_frequency_then_counts_positive_literals() {
        let node = FeatureFrequency::new(Source::constant(configurations()));
        let frequency = node.evaluate().cloned().value().unwrap();
        assert_eq!(
            frequency,
            vec![("A".to_string(), 2), ("B".to_string(), 2), ("C".to_string(), 1)]
        );
    }

    #[test]
    fn given_out_of_range_literal_when_counting_frequency_then_fails() {
        let list = AssignmentList::new(["A"]).with(BooleanAssignment::new([1, 2]));
        let outcome = FeatureFrequency::new(Source::constant(list)).evaluate();
        assert!(matches!(
            outcome,
            Outcome::Failure(AnalysisError::ComputationFailed { kind: "feature-frequency", .. })
        ));
    }

    #[test]
    fn given_required_feature_when_selecting_then_only_matching_configurations_remain() {
        let selected = SelectConfigurations::new(Source::constant(configurations()), ["A"]);
        let count = CountConfigurations::new(selected);
        assert_eq!(count.evaluate().cloned(), Outcome::Value(2));
    }

    #[test]
    fn given_unknown_required_feature_when_selecting_then_dependents_fail_with_same_cause() {
        let selected = SelectConfigurations::new(Source::constant(configurations()), ["Z"]);
        let count = CountConfigurations::new(&selected);
        let session = Session::new();

        let direct = session.evaluate(&selected);
        let dependent = session.evaluate(&count);
        assert_eq!(direct.error(), dependent.error());
        assert_eq!(session.compute_count(CountConfigurations::KIND), 0);
    }

    #[test]
    fn given_different_parameters_when_building_nodes_then_identities_differ() {
        let list = Source::constant(configurations());
        let a = SelectConfigurations::new(list.clone(), ["A"]);
        let b = SelectConfigurations::new(list.clone(), ["B"]);
        let a_again = SelectConfigurations::new(list, ["A"]);
        assert_ne!(a.key(), b.key());
        assert_eq!(a.key(), a_again.key());
    }

    #[test]
    fn given_formulas_when_computing_atom_statistics_then_summarises_terminals() {
        let formulas = vec![
            Node::and([Node::var("A"), Node::var("B")]),
            Node::implies(Node::or([Node::var("A"), Node::var("B")]), Node::var("C")),
            Node::var("D"),
        ];
        let stats = ConstraintAtoms::new(Source::constant(formulas))
            .evaluate()
            .cloned()
            .value()
            .unwrap();
        assert_eq!(stats.constraints, 3);
        assert_eq!(stats.atoms, 6);
        assert_eq!((stats.min, stats.max), (1, 3));
        assert!((stats.mean - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn given_no_formulas_when_computing_atom_statistics_then_empty() {
        let outcome = ConstraintAtoms::new(Source::constant(Vec::<Node>::new())).evaluate();
        assert!(outcome.is_empty());
    }

    #[test]
    fn given_formulas_when_computing_operator_distribution_then_counts_across_all() {
        let formulas = vec![
            Node::and([Node::var("A"), Node::not(Node::var("B"))]),
            Node::or([Node::var("A"), Node::var("C")]),
            Node::var("D"),
        ];
        let distribution = OperatorDistribution::new(Source::constant(formulas))
            .evaluate()
            .cloned()
            .value()
            .unwrap();
        let expected: BTreeMap<String, usize> = [("and", 1), ("not", 1), ("or", 1)]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        assert_eq!(distribution, expected);
    }

    #[test]
    fn given_configurations_when_computing_ratio_then_shares_list_dependency() {
        let session = Session::new();
        let ratio = SelectionRatio::new(Source::constant(configurations()));
        let ratios = session.evaluate(&ratio).cloned().value().unwrap();

        assert_eq!(ratios[2].0, "C");
        assert!((ratios[2].1 - 1.0 / 3.0).abs() < 1e-9);
        assert_eq!(session.compute_count(FeatureFrequency::KIND), 1);
        assert_eq!(session.compute_count(CountConfigurations::KIND), 1);
    }

    #[test]
    fn given_empty_list_when_computing_ratio_then_empty() {
        let ratio = SelectionRatio::new(Source::constant(AssignmentList::new(["A"])));
        assert!(ratio.evaluate().is_empty());
    }
}
