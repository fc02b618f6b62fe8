use std::time::Duration;

use tower::ServiceBuilder;
use tower::layer::util::Stack;

use crate::TimeoutLayer;

/// Service Builder Extension with additional useful functions for tower::ServiceBuilder.
pub trait ServiceBuilderExt<L> {
    /// Add a handler timeout layer with the default fallback response
    fn handler_timeout(self, dt: Duration) -> ServiceBuilder<Stack<TimeoutLayer, L>>;
}

impl<L> ServiceBuilderExt<L> for ServiceBuilder<L> {
    fn handler_timeout(self, dt: Duration) -> ServiceBuilder<Stack<TimeoutLayer, L>> {
        self.layer(TimeoutLayer::new(dt))
    }
}
