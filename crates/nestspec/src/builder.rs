//! Context Tree Builder
//!
//! Trees are declared through nested closures, each receiving an explicit
//! `&mut ContextBuilder` for the context it declares:
//!
//! ```rust
//! use nestspec::TestTree;
//!
//! let tree = TestTree::<Vec<i32>>::build("a list", |root| {
//!     root.fixture(|_| Vec::new());
//!     root.test("starts empty", |list, _| assert!(list.is_empty()));
//!
//!     root.context("with one item", |ctx| {
//!         ctx.modify_fixture(|list, _| list.push(1));
//!         ctx.test("has length one", |list, _| assert_eq!(list.len(), 1));
//!     });
//! })
//! .unwrap();
//!
//! assert_eq!(tree.test_count(), 2);
//! ```
//!
//! Registration order is significant: children run in declaration order,
//! derivation steps and setup actions compose in registration order, and
//! teardown actions run in reverse.
//!
//! Bodies, setup and teardown actions return `()` or a `Result`. A closure
//! whose body is nothing but `panic!` has no return type to infer, so give it
//! one through a helper that returns `()`:
//!
//! ```rust
//! use nestspec::TestTree;
//!
//! fn unsupported(reason: &str) {
//!     panic!("unsupported: {reason}");
//! }
//!
//! let tree = TestTree::<()>::build("parser", |root| {
//!     root.test("rejects tabs", |_, _| unsupported("tabs"));
//! })
//! .unwrap();
//! assert_eq!(tree.test_count(), 1);
//! ```

use crate::resolve::Slot;
use crate::tree::{Child, Context, FixtureFactory, Inherit, LeafTest, Marks};
use nestspec_core::{IntoOutcome, TestDescriptor};

/// Registration surface for one context.
///
/// `PF` is the fixture type of the parent context (`()` at the root), `F` the
/// fixture type of this context and its same-type descendants.
pub struct ContextBuilder<PF, F> {
    context: Context<PF, F>,
}

fn same_fixture<F>(slot: &mut Slot<F>) -> &mut Slot<F> {
    slot
}

impl<PF: 'static, F: 'static> ContextBuilder<PF, F> {
    pub(crate) fn new(context: Context<PF, F>) -> Self {
        Self { context }
    }

    pub(crate) fn finish(self) -> Context<PF, F> {
        self.context
    }

    /// Name of the context being declared
    pub fn name(&self) -> &str {
        &self.context.name
    }

    /// Register the base fixture factory for this context.
    ///
    /// The factory replaces whatever fixture was inherited. A later call
    /// replaces an earlier one, including one made with
    /// [`fixture_from_parent`](Self::fixture_from_parent).
    pub fn fixture(
        &mut self,
        factory: impl Fn(&TestDescriptor) -> F + Send + Sync + 'static,
    ) -> &mut Self {
        self.context.factory = Some(FixtureFactory::Fresh(Box::new(factory)));
        self
    }

    /// Register a base fixture factory that builds this context's fixture from
    /// the parent's. Shares the single base-factory slot with [`fixture`](Self::fixture).
    pub fn fixture_from_parent(
        &mut self,
        factory: impl Fn(&mut PF, &TestDescriptor) -> F + Send + Sync + 'static,
    ) -> &mut Self {
        self.context.factory = Some(FixtureFactory::FromParent(Box::new(factory)));
        self
    }

    /// Register a derivation step producing the next fixture from the working one.
    ///
    /// The inherited fixture stays with the context that owns it, so ancestor
    /// teardown still sees it if a step fails.
    pub fn derive_fixture(
        &mut self,
        step: impl Fn(&F, &TestDescriptor) -> F + Send + Sync + 'static,
    ) -> &mut Self {
        self.context.steps.push(Box::new(step));
        self
    }

    /// Register a derivation step that edits a copy of the working fixture
    pub fn modify_fixture(
        &mut self,
        step: impl Fn(&mut F, &TestDescriptor) + Send + Sync + 'static,
    ) -> &mut Self
    where
        F: Clone,
    {
        self.derive_fixture(move |fixture, descriptor| {
            let mut next = fixture.clone();
            step(&mut next, descriptor);
            next
        })
    }

    /// Register a setup action, run after fixture resolution and before the body
    pub fn before<R: IntoOutcome>(
        &mut self,
        action: impl Fn(&mut F, &TestDescriptor) -> R + Send + Sync + 'static,
    ) -> &mut Self {
        self.context
            .befores
            .push(Box::new(move |fixture: &mut F, descriptor: &TestDescriptor| {
                action(fixture, descriptor).into_outcome()
            }));
        self
    }

    /// Register a teardown action, run after the body whatever its outcome
    pub fn after<R: IntoOutcome>(
        &mut self,
        action: impl Fn(&mut F, &TestDescriptor) -> R + Send + Sync + 'static,
    ) -> &mut Self {
        self.context
            .afters
            .push(Box::new(move |fixture: &mut F, descriptor: &TestDescriptor| {
                action(fixture, descriptor).into_outcome()
            }));
        self
    }

    /// Register a leaf test
    pub fn test<R: IntoOutcome>(
        &mut self,
        name: impl Into<String>,
        body: impl Fn(&mut F, &TestDescriptor) -> R + Send + Sync + 'static,
    ) -> &mut Self {
        self.push_test(name.into(), body, Marks::default())
    }

    /// Register a leaf test that is reported skipped without running
    pub fn skip_test<R: IntoOutcome>(
        &mut self,
        name: impl Into<String>,
        body: impl Fn(&mut F, &TestDescriptor) -> R + Send + Sync + 'static,
    ) -> &mut Self {
        let marks = Marks {
            skip: true,
            ..Marks::default()
        };
        self.push_test(name.into(), body, marks)
    }

    /// Register a focused leaf test
    pub fn focus_test<R: IntoOutcome>(
        &mut self,
        name: impl Into<String>,
        body: impl Fn(&mut F, &TestDescriptor) -> R + Send + Sync + 'static,
    ) -> &mut Self {
        let marks = Marks {
            focus: true,
            ..Marks::default()
        };
        self.push_test(name.into(), body, marks)
    }

    fn push_test<R: IntoOutcome>(
        &mut self,
        name: String,
        body: impl Fn(&mut F, &TestDescriptor) -> R + Send + Sync + 'static,
        marks: Marks,
    ) -> &mut Self {
        self.context.children.push(Child::Test(LeafTest {
            name,
            body: Box::new(move |fixture: &mut F, descriptor: &TestDescriptor| {
                body(fixture, descriptor).into_outcome()
            }),
            marks,
        }));
        self
    }

    /// Open a nested context that inherits this context's fixture
    pub fn context(
        &mut self,
        name: impl Into<String>,
        body: impl FnOnce(&mut ContextBuilder<F, F>),
    ) -> &mut Self {
        let inherit: Inherit<F, F> = same_fixture::<F>;
        let mut child = ContextBuilder::new(Context::<F, F>::new(name.into(), Some(inherit)));
        body(&mut child);
        self.context
            .children
            .push(Child::Context(Box::new(child.finish())));
        self
    }

    /// Open a nested context with a different fixture type.
    ///
    /// Unless `G` is `()`, the child must register a factory, usually
    /// [`fixture_from_parent`](ContextBuilder::fixture_from_parent).
    pub fn derived_context<G: 'static>(
        &mut self,
        name: impl Into<String>,
        body: impl FnOnce(&mut ContextBuilder<F, G>),
    ) -> &mut Self {
        let mut child = ContextBuilder::new(Context::<F, G>::new(name.into(), None));
        body(&mut child);
        self.context
            .children
            .push(Child::Context(Box::new(child.finish())));
        self
    }

    /// Open a nested context whose tests are all reported skipped.
    ///
    /// The body still runs, so the subtree is declared and validated as usual.
    pub fn skip_context(
        &mut self,
        name: impl Into<String>,
        body: impl FnOnce(&mut ContextBuilder<F, F>),
    ) -> &mut Self {
        self.context(name, |ctx| {
            ctx.skip();
            body(ctx);
        })
    }

    /// Mark this context skipped
    pub fn skip(&mut self) -> &mut Self {
        self.context.marks.skip = true;
        self
    }

    /// Mark this context focused
    pub fn focus(&mut self) -> &mut Self {
        self.context.marks.focus = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_factory_wins() {
        let mut builder = ContextBuilder::<(), u32>::new(Context::new("root".into(), None));
        builder.fixture(|_| 1);
        builder.fixture_from_parent(|_, _| 2);
        builder.fixture(|_| 3);

        let context = builder.finish();
        match context.factory {
            Some(FixtureFactory::Fresh(make)) => {
                assert_eq!(make(&TestDescriptor::root("root")), 3);
            }
            _ => panic!("expected the last registered factory"),
        }
    }

    #[test]
    fn test_registrations_accumulate_in_order() {
        let mut builder = ContextBuilder::<(), Vec<u8>>::new(Context::new("root".into(), None));
        builder
            .fixture(|_| Vec::new())
            .derive_fixture(|v, _| {
                let mut next = v.clone();
                next.push(1);
                next
            })
            .modify_fixture(|v, _| v.push(2))
            .before(|_, _| {})
            .after(|_, _| {})
            .test("one", |_, _| {})
            .context("nested", |_| {});

        let context = builder.finish();
        assert_eq!(context.steps.len(), 2);
        assert_eq!(context.befores.len(), 1);
        assert_eq!(context.afters.len(), 1);
        assert_eq!(context.children.len(), 2);
        assert!(matches!(context.children[0], Child::Test(_)));
        assert!(matches!(context.children[1], Child::Context(_)));

        let descriptor = TestDescriptor::root("root");
        let folded = context
            .steps
            .iter()
            .fold(Vec::new(), |fixture, step| step(&fixture, &descriptor));
        assert_eq!(folded, vec![1, 2]);
    }

    #[test]
    fn test_skip_context_still_declares_children() {
        let mut builder = ContextBuilder::<(), ()>::new(Context::new("root".into(), None));
        builder.skip_context("later", |ctx| {
            ctx.test("pending", |_, _| {});
        });

        let context = builder.finish();
        assert_eq!(context.children.len(), 1);
    }
}
