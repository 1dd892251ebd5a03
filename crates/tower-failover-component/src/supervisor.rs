//! Running several components side by side.

use crate::component::Component;
use crate::error::{ComponentError, Done};
use crate::run_loop::RunLoop;
use futures::future::join_all;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;

/// The components handed to [`supervise`] or [`run`]: one or many.
#[derive(Debug, Default)]
pub struct ComponentSet {
    components: Vec<Component>,
}

impl ComponentSet {
    /// Number of components.
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Returns true if the set holds no component.
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

impl From<Component> for ComponentSet {
    fn from(component: Component) -> Self {
        Self {
            components: vec![component],
        }
    }
}

impl From<Vec<Component>> for ComponentSet {
    fn from(components: Vec<Component>) -> Self {
        Self { components }
    }
}

impl FromIterator<Component> for ComponentSet {
    fn from_iter<I: IntoIterator<Item = Component>>(iter: I) -> Self {
        Self {
            components: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for ComponentSet {
    type Item = Component;
    type IntoIter = std::vec::IntoIter<Component>;

    fn into_iter(self) -> Self::IntoIter {
        self.components.into_iter()
    }
}

/// How one supervised component ended.
#[derive(Debug)]
pub struct ComponentReport {
    /// Component name.
    pub name: String,
    /// The component's terminal result.
    pub result: Result<Done, ComponentError>,
}

impl ComponentReport {
    /// Returns true if the component ended without error.
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Outcome of every supervised component, in the order they were given.
#[derive(Debug, Default)]
pub struct SupervisorReport {
    components: Vec<ComponentReport>,
}

impl SupervisorReport {
    /// Iterates over all component reports.
    pub fn iter(&self) -> std::slice::Iter<'_, ComponentReport> {
        self.components.iter()
    }

    /// Components that ended without error (success, exhaustion, cancellation).
    pub fn succeeded(&self) -> impl Iterator<Item = &ComponentReport> {
        self.components.iter().filter(|report| report.is_ok())
    }

    /// Components that ended with an error.
    pub fn failed(&self) -> impl Iterator<Item = &ComponentReport> {
        self.components.iter().filter(|report| !report.is_ok())
    }

    /// Returns true if no component ended with an error.
    pub fn all_succeeded(&self) -> bool {
        self.components.iter().all(ComponentReport::is_ok)
    }

    /// Looks up a component's report by name.
    pub fn get(&self, name: &str) -> Option<&ComponentReport> {
        self.components.iter().find(|report| report.name == name)
    }

    /// Number of reports.
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Returns true if nothing was supervised.
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

impl IntoIterator for SupervisorReport {
    type Item = ComponentReport;
    type IntoIter = std::vec::IntoIter<ComponentReport>;

    fn into_iter(self) -> Self::IntoIter {
        self.components.into_iter()
    }
}

impl<'a> IntoIterator for &'a SupervisorReport {
    type Item = &'a ComponentReport;
    type IntoIter = std::slice::Iter<'a, ComponentReport>;

    fn into_iter(self) -> Self::IntoIter {
        self.components.iter()
    }
}

/// Runs every component concurrently on the current task and waits for all
/// of them to settle.
///
/// A failing (or panicking) component never cancels the others. Failures are
/// logged and collected in the returned report, never propagated.
pub async fn supervise<R, C>(run_loop: &R, components: C) -> SupervisorReport
where
    R: RunLoop + ?Sized,
    C: Into<ComponentSet>,
{
    let components = components.into().components;

    #[cfg(feature = "tracing")]
    tracing::debug!(components = components.len(), "starting components");

    let runs = components.into_iter().map(|component| {
        let name = component.name().to_string();
        async move {
            let result = match AssertUnwindSafe(component.start(run_loop))
                .catch_unwind()
                .await
            {
                Ok(result) => result,
                Err(payload) => Err(ComponentError::Panicked {
                    component: name.clone(),
                    message: panic_message(payload.as_ref()),
                }),
            };

            #[cfg(feature = "tracing")]
            if let Err(error) = &result {
                tracing::error!(component = %name, error = %error, "component failed");
            }

            ComponentReport { name, result }
        }
    });

    let report = SupervisorReport {
        components: join_all(runs).await,
    };

    #[cfg(feature = "tracing")]
    tracing::debug!(
        succeeded = report.succeeded().count(),
        failed = report.failed().count(),
        "all components ended"
    );

    report
}

/// Runs components to completion on a dedicated current-thread runtime.
///
/// The runtime is the hosting run loop: it is created here, drives
/// [`supervise`] and is shut down once every component has settled. The only
/// error is failing to build the runtime.
pub fn run<C>(components: C) -> std::io::Result<SupervisorReport>
where
    C: Into<ComponentSet>,
{
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    let handle = runtime.handle().clone();
    let report = runtime.block_on(supervise(&handle, components));
    runtime.shutdown_background();

    Ok(report)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        String::from("non-string panic payload")
    }
}
