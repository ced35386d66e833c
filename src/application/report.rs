//! Model report service
//!
//! Summarises a feature model: hierarchy shape plus constraint metrics
//! evaluated through the computation graph.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, instrument};

use crate::analysis::compute::{Evaluator, Source};
use crate::analysis::metrics::{AtomStatistics, ConstraintAtoms, OperatorDistribution};
use crate::application::ApplicationResult;
use crate::config::Settings;
use crate::domain::FeatureModel;

/// Summary of one feature model.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelReport {
    pub features: usize,
    /// Levels in the hierarchy, 1 for a lone root
    pub depth: usize,
    pub leaves: usize,
    pub constraints: usize,
    /// Constraints referencing a hidden feature or a feature below one
    pub hidden_constraints: usize,
    /// None for a model without constraints
    pub atoms: Option<AtomStatistics>,
    pub operators: BTreeMap<String, usize>,
}

impl fmt::Display for ModelReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "features: {} (depth {}, {} leaves)",
            self.features, self.depth, self.leaves
        )?;
        writeln!(
            f,
            "constraints: {} ({} touching hidden features)",
            self.constraints, self.hidden_constraints
        )?;
        if let Some(atoms) = &self.atoms {
            writeln!(
                f,
                "atoms: {} (min {}, max {}, mean {:.2})",
                atoms.atoms, atoms.min, atoms.max, atoms.mean
            )?;
        }
        for (operator, count) in &self.operators {
            writeln!(f, "  {operator}: {count}")?;
        }
        Ok(())
    }
}

/// Service for building model reports.
pub struct ReportService {
    evaluator: Arc<Evaluator>,
}

impl ReportService {
    pub fn new(evaluator: Arc<Evaluator>) -> Self {
        Self { evaluator }
    }

    pub fn from_settings(settings: &Settings) -> ApplicationResult<Self> {
        Ok(Self::new(Arc::new(Evaluator::from_settings(settings)?)))
    }

    /// Evaluate hierarchy and constraint metrics for `model`.
    ///
    /// Atom statistics and operator distribution run in one session over the
    /// same formula snapshot.
    #[instrument(level = "debug", skip_all)]
    pub fn build(&self, model: &FeatureModel) -> ApplicationResult<ModelReport> {
        let formulas = Source::constant(model.formulas());
        let atoms = ConstraintAtoms::new(formulas.clone());
        let operators = OperatorDistribution::new(formulas);

        let session = self.evaluator.session();
        let (atoms, operators) = self.evaluator.evaluate_both(&session, &atoms, &operators);
        let atoms = atoms.cloned().into_result()?;
        let operators = operators.cloned().into_result()?.unwrap_or_default();
        debug!("build: {} nodes evaluated", session.cached_nodes());

        let tree = model.tree();
        Ok(ModelReport {
            features: tree.len(),
            depth: tree.depth(),
            leaves: tree.leaf_features().len(),
            constraints: model.constraints().len(),
            hidden_constraints: model
                .constraints()
                .iter()
                .filter(|c| c.has_referenced_hidden_feature())
                .count(),
            atoms,
            operators,
        })
    }
}
