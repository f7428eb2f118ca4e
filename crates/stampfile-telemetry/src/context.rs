//! Process-wide tracing span helpers.

use tracing::{Span, span::Entered};

use crate::init::build_sha;

/// Keeps the application span entered for the lifetime of the process.
pub struct GlobalContextGuard {
    _guard: Entered<'static>,
}

impl GlobalContextGuard {
    /// Enter a span tagged with the component name and build SHA.
    #[must_use]
    pub fn new(component: impl Into<String>) -> Self {
        let component = component.into();
        let span: &'static Span = Box::leak(Box::new(tracing::info_span!(
            "stampfile",
            component = %component,
            build_sha = %build_sha()
        )));
        Self {
            _guard: span.enter(),
        }
    }
}
