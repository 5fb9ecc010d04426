use std::sync::Arc;

use async_trait::async_trait;

use super::context::{Action, Context};
use super::error::CallbackError;

/// A hook run by the controller: authorizer, validator or cleaner.
///
/// Hooks run inline in the request task, in the order the controller calls
/// them; returning an error short-circuits the request.
#[async_trait]
pub trait Callback: Send + Sync {
    /// Name for logging and debugging
    fn name(&self) -> &'static str {
        "callback"
    }

    async fn run(&self, ctx: &mut Context) -> Result<(), CallbackError>;
}

/// Adapter turning a plain closure into a `Callback`.
pub struct FnCallback<F> {
    name: &'static str,
    f: F,
}

#[async_trait]
impl<F> Callback for FnCallback<F>
where
    F: Fn(&mut Context) -> Result<(), CallbackError> + Send + Sync,
{
    fn name(&self) -> &'static str {
        self.name
    }

    async fn run(&self, ctx: &mut Context) -> Result<(), CallbackError> {
        (self.f)(ctx)
    }
}

/// Wrap a closure as a hook.
///
/// ```ignore
/// let deny_deletes = callback(|ctx| match ctx.action {
///     Action::Delete => Err(CallbackError::denied("read only")),
///     _ => Ok(()),
/// });
/// ```
pub fn callback<F>(f: F) -> Arc<dyn Callback>
where
    F: Fn(&mut Context) -> Result<(), CallbackError> + Send + Sync + 'static,
{
    Arc::new(FnCallback { name: "closure", f })
}

/// Same as `callback`, with a name that shows up in logs.
pub fn named<F>(name: &'static str, f: F) -> Arc<dyn Callback>
where
    F: Fn(&mut Context) -> Result<(), CallbackError> + Send + Sync + 'static,
{
    Arc::new(FnCallback { name, f })
}

/// Runs hooks in order; the first failure wins and the rest are skipped.
pub struct Combined {
    callbacks: Vec<Arc<dyn Callback>>,
}

#[async_trait]
impl Callback for Combined {
    fn name(&self) -> &'static str {
        "combined"
    }

    async fn run(&self, ctx: &mut Context) -> Result<(), CallbackError> {
        for cb in &self.callbacks {
            if let Err(e) = cb.run(ctx).await {
                tracing::debug!(callback = cb.name(), error = %e, "Callback failed");
                return Err(e);
            }
        }
        Ok(())
    }
}

pub fn combine(callbacks: Vec<Arc<dyn Callback>>) -> Arc<dyn Callback> {
    Arc::new(Combined { callbacks })
}

/// Runs the inner hook only for (or, inverted, except for) some actions.
pub struct Gated {
    actions: Vec<Action>,
    invert: bool,
    inner: Arc<dyn Callback>,
}

#[async_trait]
impl Callback for Gated {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    async fn run(&self, ctx: &mut Context) -> Result<(), CallbackError> {
        if self.actions.contains(&ctx.action) == self.invert {
            return Ok(());
        }
        self.inner.run(ctx).await
    }
}

pub fn only(actions: &[Action], inner: Arc<dyn Callback>) -> Arc<dyn Callback> {
    Arc::new(Gated {
        actions: actions.to_vec(),
        invert: false,
        inner,
    })
}

pub fn except(actions: &[Action], inner: Arc<dyn Callback>) -> Arc<dyn Callback> {
    Arc::new(Gated {
        actions: actions.to_vec(),
        invert: true,
        inner,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::callback::context::RawRequest;
    use crate::database::MemoryStore;
    use crate::model::{get_meta, Base, Declaration, Model};

    #[derive(Debug, Clone, Default)]
    struct Thing {
        base: Base,
    }

    impl Model for Thing {
        fn declare(m: &mut Declaration<Self>) {
            m.base(r#"fire:"thing:things""#, |t| &t.base, |t| &mut t.base);
        }
    }

    fn context(action: Action) -> Context {
        Context::new(action, get_meta::<Thing>(), RawRequest::default(), Arc::new(MemoryStore::new()))
    }

    fn counting(counter: Arc<AtomicUsize>, result: Result<(), CallbackError>) -> Arc<dyn Callback> {
        callback(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            result.clone()
        })
    }

    #[tokio::test]
    async fn combine_stops_at_first_failure() {
        let calls = Arc::new(AtomicUsize::new(0));
        let chain = combine(vec![
            counting(calls.clone(), Ok(())),
            counting(calls.clone(), Err(CallbackError::user("stop"))),
            counting(calls.clone(), Ok(())),
        ]);

        let err = chain.run(&mut context(Action::Create)).await.unwrap_err();
        assert_eq!(err, CallbackError::user("stop"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn empty_combination_succeeds() {
        assert!(combine(vec![]).run(&mut context(Action::List)).await.is_ok());
    }

    #[tokio::test]
    async fn only_and_except_gate_by_action() {
        let deny = || callback(|_| Err(CallbackError::denied("no")));

        let on_delete = only(&[Action::Delete], deny());
        assert!(on_delete.run(&mut context(Action::List)).await.is_ok());
        assert!(on_delete.run(&mut context(Action::Delete)).await.is_err());

        let unless_read = except(&[Action::List, Action::Find], deny());
        assert!(unless_read.run(&mut context(Action::Find)).await.is_ok());
        assert!(unless_read.run(&mut context(Action::Update)).await.is_err());
    }

    #[tokio::test]
    async fn closures_can_mutate_context() {
        let tag = callback(|ctx| {
            ctx.set_metadata(String::from("seen"));
            Ok(())
        });
        let mut ctx = context(Action::Find);
        tag.run(&mut ctx).await.unwrap();
        assert_eq!(ctx.get_metadata::<String>().map(String::as_str), Some("seen"));
    }
}
