use std::fmt;
use std::sync::Arc;

use crate::error::{QpError, QpResult};
use crate::factors::LinearInequality;

/// Activation flags over a QP's inequality constraints.
///
/// The inequalities themselves are shared and immutable; only the flags
/// change. [`WorkingSet::activated`] and [`WorkingSet::deactivated`] return
/// modified copies, so every iteration state owns its own working set.
#[derive(Debug, Clone)]
pub struct WorkingSet {
    inequalities: Vec<Arc<LinearInequality>>,
    active: Vec<bool>,
}

impl WorkingSet {
    /// Working set with every inequality inactive
    pub fn new(inequalities: Vec<Arc<LinearInequality>>) -> Self {
        let active = vec![false; inequalities.len()];
        Self {
            inequalities,
            active,
        }
    }

    /// Working set with explicit flags, one per inequality
    pub fn with_flags(inequalities: Vec<Arc<LinearInequality>>, active: Vec<bool>) -> QpResult<Self> {
        if active.len() != inequalities.len() {
            return Err(QpError::DimensionMismatch(format!(
                "{} activation flags for {} inequalities",
                active.len(),
                inequalities.len()
            )));
        }
        Ok(Self {
            inequalities,
            active,
        })
    }

    pub fn len(&self) -> usize {
        self.inequalities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inequalities.is_empty()
    }

    pub fn at(&self, index: usize) -> Option<&LinearInequality> {
        self.inequalities.get(index).map(|i| i.as_ref())
    }

    pub fn is_active(&self, index: usize) -> bool {
        self.active.get(index).copied().unwrap_or(false)
    }

    pub fn flags(&self) -> &[bool] {
        &self.active
    }

    pub fn num_active(&self) -> usize {
        self.active.iter().filter(|a| **a).count()
    }

    /// `(index, inequality, is_active)` in index order
    pub fn iter(&self) -> impl Iterator<Item = (usize, &Arc<LinearInequality>, bool)> {
        self.inequalities
            .iter()
            .zip(&self.active)
            .enumerate()
            .map(|(i, (inequality, active))| (i, inequality, *active))
    }

    /// Active inequalities in index order
    pub fn active(&self) -> impl Iterator<Item = (usize, &Arc<LinearInequality>)> {
        self.iter()
            .filter(|(_, _, active)| *active)
            .map(|(i, inequality, _)| (i, inequality))
    }

    /// Inactive inequalities in index order
    pub fn inactive(&self) -> impl Iterator<Item = (usize, &Arc<LinearInequality>)> {
        self.iter()
            .filter(|(_, _, active)| !*active)
            .map(|(i, inequality, _)| (i, inequality))
    }

    /// Copy with inequality `index` active
    pub fn activated(&self, index: usize) -> QpResult<Self> {
        self.with_flag(index, true)
    }

    /// Copy with inequality `index` inactive
    pub fn deactivated(&self, index: usize) -> QpResult<Self> {
        self.with_flag(index, false)
    }

    fn with_flag(&self, index: usize, flag: bool) -> QpResult<Self> {
        if index >= self.active.len() {
            return Err(QpError::InvalidInput(format!(
                "inequality index {index} out of range for {} inequalities",
                self.active.len()
            )));
        }
        let mut copy = self.clone();
        copy.active[index] = flag;
        Ok(copy)
    }
}

impl fmt::Display for WorkingSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let active: Vec<String> = self.active().map(|(i, _)| i.to_string()).collect();
        write!(
            f,
            "{}/{} active [{}]",
            active.len(),
            self.len(),
            active.join(", ")
        )
    }
}
