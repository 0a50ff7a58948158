//! Suites of root contexts
//!
//! A [`Suite`] groups trees with different root fixture types into one run.
//! Once a suite starts running it is sealed and rejects further roots.

use crate::runner::{PlannedRoot, Runner};
use crate::tree::{plan_root, validate_root, Node, PlannedCase, TestTree};
use nestspec_core::{ConstructionError, RunError, TestResult};

/// An ordered collection of root contexts run together
pub struct Suite {
    name: String,
    roots: Vec<Box<dyn Node<()>>>,
    sealed: bool,
}

impl Suite {
    /// Create an empty, unsealed suite
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            roots: Vec::new(),
            sealed: false,
        }
    }

    /// Name reported for the run
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Append a root context. Fails once the suite is sealed.
    pub fn add<F: 'static>(&mut self, tree: TestTree<F>) -> Result<&mut Self, ConstructionError> {
        if self.sealed {
            return Err(ConstructionError::Sealed {
                name: tree.name().to_string(),
            });
        }
        self.roots.push(Box::new(tree.into_root()));
        Ok(self)
    }

    /// Stop accepting roots
    pub fn seal(&mut self) {
        self.sealed = true;
    }

    /// Whether the suite has started running
    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// Number of root contexts
    pub fn len(&self) -> usize {
        self.roots.len()
    }

    /// Whether no roots have been added
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Leaf tests of every root, in the order the roots were added
    pub fn plan(&self) -> Vec<PlannedCase> {
        self.roots
            .iter()
            .flat_map(|root| plan_root(root.as_ref()))
            .collect()
    }

    /// Seal the suite, validate every root and run them all in order
    pub fn run(&mut self, runner: &mut Runner) -> Result<Vec<TestResult>, RunError> {
        self.seal();
        for root in &self.roots {
            if let Err(error) = validate_root(root.as_ref()) {
                tracing::error!(root = root.name(), %error, "suite root failed validation");
                return Err(error.into());
            }
        }

        let planned: Vec<_> = self
            .roots
            .iter()
            .map(|root| PlannedRoot::new(root.as_ref()))
            .collect();
        runner.run_planned(&self.name, &planned)
    }
}

impl std::fmt::Debug for Suite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let roots: Vec<_> = self.roots.iter().map(|root| root.name()).collect();
        f.debug_struct("Suite")
            .field("name", &self.name)
            .field("roots", &roots)
            .field("sealed", &self.sealed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn numbers() -> TestTree<u32> {
        TestTree::build("numbers", |root| {
            root.fixture(|_| 41);
            root.test("answer", |n, _| assert_eq!(*n + 1, 42));
        })
        .unwrap()
    }

    fn words() -> TestTree<String> {
        TestTree::build("words", |root| {
            root.fixture(|_| "hello".to_string());
            root.test("greeting", |s, _| assert_eq!(s, "hello"));
            root.test("length", |s, _| assert_eq!(s.len(), 5));
        })
        .unwrap()
    }

    #[test]
    fn test_roots_of_different_fixture_types_run_in_order() {
        let mut suite = Suite::new("mixed");
        suite.add(numbers()).unwrap().add(words()).unwrap();
        assert_eq!(suite.len(), 2);

        let results = suite.run(&mut Runner::default()).unwrap();
        let paths: Vec<_> = results.iter().map(|r| r.descriptor.to_string()).collect();
        assert_eq!(
            paths,
            ["numbers / answer", "words / greeting", "words / length"]
        );
        assert!(results.iter().all(TestResult::is_passed));
    }

    #[test]
    fn test_sealed_suite_rejects_roots() {
        let mut suite = Suite::new("sealed");
        suite.add(numbers()).unwrap();
        suite.run(&mut Runner::default()).unwrap();

        assert!(suite.is_sealed());
        assert_matches!(
            suite.add(words()),
            Err(ConstructionError::Sealed { name }) if name == "words"
        );
    }
}
