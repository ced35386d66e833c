//! Configurations as signed literal lists.

/// One configuration: 1-based variable indices, positive if selected,
/// negative if deselected. Variables not mentioned are unassigned.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BooleanAssignment(Vec<i32>);

impl BooleanAssignment {
    pub fn new(literals: impl IntoIterator<Item = i32>) -> Self {
        Self(literals.into_iter().filter(|&l| l != 0).collect())
    }

    pub fn literals(&self) -> &[i32] {
        &self.0
    }

    /// Whether the 1-based `variable` is assigned `true`.
    pub fn is_selected(&self, variable: usize) -> bool {
        self.0.iter().any(|&l| l > 0 && l as usize == variable)
    }
}

/// Ordered collection of configurations over a fixed variable list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct AssignmentList {
    variables: Vec<String>,
    assignments: Vec<BooleanAssignment>,
}

impl AssignmentList {
    pub fn new(variables: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            variables: variables.into_iter().map(Into::into).collect(),
            assignments: Vec::new(),
        }
    }

    /// Add a configuration given as selected/deselected variable names.
    /// Names not in the variable list are ignored.
    pub fn push_named(&mut self, selected: &[&str], deselected: &[&str]) {
        let literal = |name: &&str, sign: i32| {
            self.index_of(name).map(|i| sign * (i as i32 + 1))
        };
        let literals: Vec<i32> = selected
            .iter()
            .filter_map(|n| literal(n, 1))
            .chain(deselected.iter().filter_map(|n| literal(n, -1)))
            .collect();
        self.assignments.push(BooleanAssignment::new(literals));
    }

    pub fn push(&mut self, assignment: BooleanAssignment) {
        self.assignments.push(assignment);
    }

    pub fn with(mut self, assignment: BooleanAssignment) -> Self {
        self.push(assignment);
        self
    }

    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    /// 0-based position of `name` in the variable list.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.variables.iter().position(|v| v == name)
    }

    pub fn assignments(&self) -> &[BooleanAssignment] {
        &self.assignments
    }

    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }
}
