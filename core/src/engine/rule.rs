use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use recce_common::event::Event;

pub type Condition = Arc<dyn Fn(&Event) -> bool + Send + Sync>;
pub type Action = Arc<dyn Fn(Event) -> BoxFuture<'static, ()> + Send + Sync>;

/// A condition/action pair evaluated against every event.
///
/// The condition runs inline on the dispatch loop and must be cheap. The action
/// always runs as its own task.
#[derive(Clone)]
pub struct Rule {
    pub name: String,
    condition: Condition,
    action: Action,
}

impl Rule {
    pub fn new<C, A, Fut>(name: impl Into<String>, condition: C, action: A) -> Self
    where
        C: Fn(&Event) -> bool + Send + Sync + 'static,
        A: Fn(Event) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self {
            name: name.into(),
            condition: Arc::new(condition),
            action: Arc::new(move |event| Box::pin(action(event))),
        }
    }

    pub fn matches(&self, event: &Event) -> bool {
        (self.condition)(event)
    }

    pub fn action(&self) -> Action {
        Arc::clone(&self.action)
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule").field("name", &self.name).finish_non_exhaustive()
    }
}
