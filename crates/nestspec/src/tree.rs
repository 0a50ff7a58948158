//! Test tree
//!
//! A tree is built once, immutably, and then planned and executed any number of
//! times. Each context is generic over its parent's fixture type and its own, so
//! a derivation from one fixture type to another is checked by the compiler when
//! the tree is declared. Children of different fixture types are stored behind
//! the [`Node`] trait, keyed only by the fixture type they receive.

use crate::builder::ContextBuilder;
use crate::resolve::{self, Execution, Slot};
use nestspec_core::{ConstructionError, ResolutionError, RunError, StepKind, TestDescriptor};
use std::any::type_name;

/// Derivation step: reads the working fixture and produces the next one
pub(crate) type Step<F> = Box<dyn Fn(&F, &TestDescriptor) -> F + Send + Sync>;

/// Setup action, teardown action or test body
pub(crate) type Action<F> = Box<dyn Fn(&mut F, &TestDescriptor) -> Result<(), String> + Send + Sync>;

/// Lends a same-type child context its parent's working fixture
pub(crate) type Inherit<PF, F> = fn(&mut Slot<PF>) -> &mut Slot<F>;

/// Base fixture factory of a context; at most one per context
pub(crate) enum FixtureFactory<PF, F> {
    /// Ignores any inherited fixture
    Fresh(Box<dyn Fn(&TestDescriptor) -> F + Send + Sync>),
    /// Builds the fixture from the parent's
    FromParent(Box<dyn Fn(&mut PF, &TestDescriptor) -> F + Send + Sync>),
}

/// Skip and focus marks; both are inherited by every descendant
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Marks {
    pub(crate) skip: bool,
    pub(crate) focus: bool,
}

impl Marks {
    fn under(self, parent: Marks) -> Marks {
        Marks {
            skip: self.skip || parent.skip,
            focus: self.focus || parent.focus,
        }
    }
}

pub(crate) struct LeafTest<F> {
    pub(crate) name: String,
    pub(crate) body: Action<F>,
    pub(crate) marks: Marks,
}

impl<F> LeafTest<F> {
    fn run(&self, slot: &mut Slot<F>, exec: &mut Execution<'_>) -> Result<(), RunError> {
        let descriptor = exec.descriptor();
        let fixture = slot.get_mut().ok_or_else(|| {
            RunError::unrecoverable(format!("no fixture reached the body of '{descriptor}'"))
        })?;
        let outcome = resolve::guarded_action(nestspec_core::FailurePhase::Body, || {
            (self.body)(fixture, descriptor)
        });
        exec.body_finished(outcome);
        Ok(())
    }
}

pub(crate) enum Child<F> {
    Context(Box<dyn Node<F>>),
    Test(LeafTest<F>),
}

/// A context node whose parent holds fixtures of type `PF`
pub(crate) trait Node<PF>: Send + Sync {
    fn name(&self) -> &str;

    /// Append one planned case per descendant leaf, depth-first in declaration order
    fn plan(
        &self,
        parent: &TestDescriptor,
        inherited: Marks,
        route: &mut Vec<usize>,
        out: &mut Vec<PlannedCase>,
    );

    /// Check names and fixture availability; `parent_fixture` tells whether the
    /// parent has a fixture when this context is entered
    fn validate(&self, parent: &TestDescriptor, parent_fixture: bool) -> Result<(), ConstructionError>;

    /// Resolve this level, descend along `route`, then tear this level down
    fn execute(
        &self,
        route: &[usize],
        parent: &mut Slot<PF>,
        exec: &mut Execution<'_>,
    ) -> Result<(), RunError>;
}

pub(crate) struct Context<PF, F> {
    pub(crate) name: String,
    pub(crate) inherit: Option<Inherit<PF, F>>,
    pub(crate) factory: Option<FixtureFactory<PF, F>>,
    pub(crate) steps: Vec<Step<F>>,
    pub(crate) befores: Vec<Action<F>>,
    pub(crate) afters: Vec<Action<F>>,
    pub(crate) children: Vec<Child<F>>,
    pub(crate) marks: Marks,
}

impl<PF, F> Context<PF, F> {
    pub(crate) fn new(name: String, inherit: Option<Inherit<PF, F>>) -> Self {
        Self {
            name,
            inherit,
            factory: None,
            steps: Vec::new(),
            befores: Vec::new(),
            afters: Vec::new(),
            children: Vec::new(),
            marks: Marks::default(),
        }
    }
}

fn no_antecedent<F>(descriptor: &TestDescriptor, step: StepKind) -> ConstructionError {
    ResolutionError::NoAntecedent {
        path: descriptor.to_string(),
        step,
        fixture_type: type_name::<F>(),
    }
    .into()
}

impl<PF: 'static, F: 'static> Node<PF> for Context<PF, F> {
    fn name(&self) -> &str {
        &self.name
    }

    fn plan(
        &self,
        parent: &TestDescriptor,
        inherited: Marks,
        route: &mut Vec<usize>,
        out: &mut Vec<PlannedCase>,
    ) {
        let descriptor = parent.child(self.name.as_str());
        let marks = self.marks.under(inherited);

        for (index, child) in self.children.iter().enumerate() {
            route.push(index);
            match child {
                Child::Test(test) => out.push(PlannedCase {
                    descriptor: descriptor.child(test.name.as_str()),
                    route: route.clone(),
                    marks: test.marks.under(marks),
                }),
                Child::Context(node) => node.plan(&descriptor, marks, route, out),
            }
            route.pop();
        }
    }

    fn validate(&self, parent: &TestDescriptor, parent_fixture: bool) -> Result<(), ConstructionError> {
        if self.name.trim().is_empty() {
            return Err(ConstructionError::EmptyName {
                parent: parent.to_string(),
            });
        }
        let descriptor = parent.child(self.name.as_str());

        if matches!(self.factory, Some(FixtureFactory::FromParent(_))) && !parent_fixture {
            return Err(no_antecedent::<PF>(&descriptor, StepKind::ParentFactory));
        }

        let inherited = self.inherit.is_some() && parent_fixture;
        let available = self.factory.is_some() || inherited || resolve::is_unit::<F>();

        if !available {
            let registered = [
                (StepKind::Derivation, !self.steps.is_empty()),
                (StepKind::Setup, !self.befores.is_empty()),
                (StepKind::Teardown, !self.afters.is_empty()),
            ];
            if let Some((step, _)) = registered.into_iter().find(|(_, present)| *present) {
                return Err(no_antecedent::<F>(&descriptor, step));
            }
        }

        for child in &self.children {
            match child {
                Child::Test(test) => {
                    if test.name.trim().is_empty() {
                        return Err(ConstructionError::EmptyName {
                            parent: descriptor.to_string(),
                        });
                    }
                    if !available {
                        return Err(ConstructionError::MissingFixture {
                            path: descriptor.child(test.name.as_str()).to_string(),
                            fixture_type: type_name::<F>(),
                        });
                    }
                }
                Child::Context(node) => node.validate(&descriptor, available)?,
            }
        }
        Ok(())
    }

    fn execute(
        &self,
        route: &[usize],
        parent: &mut Slot<PF>,
        exec: &mut Execution<'_>,
    ) -> Result<(), RunError> {
        let (index, rest) = route.split_first().ok_or_else(|| {
            RunError::unrecoverable(format!("route ends at context '{}'", self.name))
        })?;
        let child = self.children.get(*index).ok_or_else(|| {
            RunError::unrecoverable(format!(
                "context '{}' has no child at index {index}",
                self.name
            ))
        })?;

        let produced = resolve::base_fixture(self.factory.as_ref(), parent, exec)?;
        if exec.failed() {
            return Ok(());
        }

        // A context owns a fixture once its factory or a derivation step has
        // produced one; until then a same-type context works on its parent's.
        let mut own: Slot<F> = Slot::empty();
        match produced {
            Some(fixture) => own.put(fixture),
            None if self.inherit.is_none() => {
                if let Some(unit) = resolve::unit_fixture::<F>() {
                    own.put(unit);
                }
            }
            None => {}
        }

        let inherited = match self.inherit {
            Some(inherit) => Some(&*inherit(parent)),
            None => None,
        };
        resolve::apply_steps(&self.steps, &mut own, inherited, exec)?;
        if exec.failed() {
            return Ok(());
        }

        let slot = match self.inherit {
            _ if own.is_filled() => &mut own,
            Some(inherit) => inherit(parent),
            None => {
                return Err(RunError::unrecoverable(format!(
                    "context '{}' has no fixture to run with",
                    self.name
                )))
            }
        };

        resolve::run_setup(&self.befores, slot, exec)?;
        if !exec.failed() {
            match child {
                Child::Test(test) if rest.is_empty() => test.run(slot, exec)?,
                Child::Context(node) if !rest.is_empty() => node.execute(rest, slot, exec)?,
                _ => {
                    return Err(RunError::unrecoverable(format!(
                        "route does not match the shape of context '{}'",
                        self.name
                    )))
                }
            }
        }

        resolve::run_teardown(&self.afters, slot, exec)
    }
}

/// One leaf test as the driver will run it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedCase {
    pub(crate) descriptor: TestDescriptor,
    pub(crate) route: Vec<usize>,
    pub(crate) marks: Marks,
}

impl PlannedCase {
    /// Full path of the test
    pub fn descriptor(&self) -> &TestDescriptor {
        &self.descriptor
    }

    /// Marked skipped itself or through an ancestor
    pub fn is_skipped(&self) -> bool {
        self.marks.skip
    }

    /// Focused itself or through an ancestor
    pub fn is_focused(&self) -> bool {
        self.marks.focus
    }
}

pub(crate) fn plan_root(root: &dyn Node<()>) -> Vec<PlannedCase> {
    let mut cases = Vec::new();
    root.plan(
        &TestDescriptor::default(),
        Marks::default(),
        &mut Vec::new(),
        &mut cases,
    );
    cases
}

pub(crate) fn validate_root(root: &dyn Node<()>) -> Result<(), ConstructionError> {
    root.validate(&TestDescriptor::default(), true)
}

/// A validated, immutable tree of contexts whose root fixture has type `F`
pub struct TestTree<F: 'static> {
    root: Context<(), F>,
}

impl<F: 'static> TestTree<F> {
    /// Declare a root context and validate the resulting tree.
    ///
    /// `body` receives the builder for the root context; nested contexts get
    /// their own builders through [`ContextBuilder::context`] and
    /// [`ContextBuilder::derived_context`]. Construction and fixture resolution
    /// errors are reported here, before anything runs.
    pub fn build(
        name: impl Into<String>,
        body: impl FnOnce(&mut ContextBuilder<(), F>),
    ) -> Result<Self, ConstructionError> {
        let mut builder = ContextBuilder::new(Context::new(name.into(), None));
        body(&mut builder);
        let tree = Self {
            root: builder.finish(),
        };
        tree.validate()?;
        Ok(tree)
    }

    /// Name of the root context
    pub fn name(&self) -> &str {
        &self.root.name
    }

    /// Re-run construction validation
    pub fn validate(&self) -> Result<(), ConstructionError> {
        validate_root(&self.root)
    }

    /// Flatten the tree into leaf tests in execution order
    pub fn plan(&self) -> Vec<PlannedCase> {
        plan_root(&self.root)
    }

    /// Number of leaf tests
    pub fn test_count(&self) -> usize {
        self.plan().len()
    }

    pub(crate) fn root_node(&self) -> &dyn Node<()> {
        &self.root
    }

    pub(crate) fn into_root(self) -> Context<(), F> {
        self.root
    }
}

impl<F: 'static> std::fmt::Debug for TestTree<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestTree")
            .field("name", &self.root.name)
            .field("fixture", &type_name::<F>())
            .finish_non_exhaustive()
    }
}

/// Declare a root context; shorthand for [`TestTree::build`]
pub fn root_context<F: 'static>(
    name: impl Into<String>,
    body: impl FnOnce(&mut ContextBuilder<(), F>),
) -> Result<TestTree<F>, ConstructionError> {
    TestTree::build(name, body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_routes_follow_declaration_order() {
        let tree = TestTree::<()>::build("root", |root| {
            root.test("a", |_, _| {});
            root.context("inner", |inner| {
                inner.test("b", |_, _| {});
                inner.test("c", |_, _| {});
            });
            root.test("d", |_, _| {});
        })
        .unwrap();

        let plan = tree.plan();
        let routes: Vec<_> = plan.iter().map(|case| case.route.clone()).collect();
        assert_eq!(routes, vec![vec![0], vec![1, 0], vec![1, 1], vec![2]]);
        assert_eq!(
            plan[2].descriptor().path(),
            ["root", "inner", "c"]
        );
    }

    #[test]
    fn test_marks_are_inherited() {
        let tree = TestTree::<()>::build("root", |root| {
            root.skip_context("skipped", |ctx| {
                ctx.test("inside", |_, _| {});
            });
            root.context("focused", |ctx| {
                ctx.focus();
                ctx.test("inside", |_, _| {});
            });
        })
        .unwrap();

        let plan = tree.plan();
        assert!(plan[0].is_skipped());
        assert!(!plan[0].is_focused());
        assert!(plan[1].is_focused());
        assert!(!plan[1].is_skipped());
    }

    #[test]
    fn test_unit_tree_needs_no_factory() {
        let tree = TestTree::<()>::build("root", |root| {
            root.before(|_, _| {});
            root.test("runs", |_, _| {});
        });
        assert!(tree.is_ok());
    }

    #[test]
    fn test_debug_names_fixture_type() {
        let tree = TestTree::<u32>::build("numbers", |root| {
            root.fixture(|_| 7);
        })
        .unwrap();
        let rendered = format!("{tree:?}");
        assert!(rendered.contains("numbers"));
        assert!(rendered.contains("u32"));
    }
}
