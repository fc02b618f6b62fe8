use std::fmt;
use std::time::Duration;

use http::Extensions;

use crate::error::RouteError;

/// Disables the handler timeout when used as a global or per-route value.
pub const NO_TIMEOUT: Duration = Duration::ZERO;

/// A duration-valued annotation looked up by its type.
pub trait TimeoutAnnotation: Clone + Send + Sync + 'static {
    fn duration(&self) -> Duration;
}

/// Overrides the global handler timeout for a single route.
///
/// A value of [`NO_TIMEOUT`] disables the timeout for this route only.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HandlerTimeout(Duration);

/// Read deadline for the underlying connection, relative to request start.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReadDeadline(Duration);

/// Write deadline for the underlying connection, relative to request start.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WriteDeadline(Duration);

impl TimeoutAnnotation for HandlerTimeout {
    fn duration(&self) -> Duration {
        self.0
    }
}

impl TimeoutAnnotation for ReadDeadline {
    fn duration(&self) -> Duration {
        self.0
    }
}

impl TimeoutAnnotation for WriteDeadline {
    fn duration(&self) -> Duration {
        self.0
    }
}

/// Attaches an annotation to a [`Route`] at registration time.
pub struct RouteOption(Box<dyn FnOnce(&mut Extensions) + Send + Sync>);

impl RouteOption {
    /// Stores `value` on the route, keyed by its type.
    pub fn annotation<T>(value: T) -> Self
    where
        T: Clone + Send + Sync + 'static,
    {
        RouteOption(Box::new(move |annotations| {
            annotations.insert(value);
        }))
    }
}

impl fmt::Debug for RouteOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteOption").finish_non_exhaustive()
    }
}

/// Sets a custom handler timeout for a specific route.
///
/// Passing [`NO_TIMEOUT`] disables the timeout for this route even when a
/// global timeout is configured.
pub fn override_handler(dt: Duration) -> RouteOption {
    RouteOption::annotation(HandlerTimeout(dt))
}

/// Sets the read deadline applied to the connection before the handler runs.
///
/// This bounds how long reading the request body may take. Zero is rejected.
pub fn override_read(dt: Duration) -> Result<RouteOption, RouteError> {
    if dt.is_zero() {
        return Err(RouteError::ZeroDeadline {
            tag: "read deadline",
            value: dt,
        });
    }
    Ok(RouteOption::annotation(ReadDeadline(dt)))
}

/// Sets the write deadline applied to the connection before the handler runs.
///
/// This bounds how long writing the response may take. Zero is rejected.
pub fn override_write(dt: Duration) -> Result<RouteOption, RouteError> {
    if dt.is_zero() {
        return Err(RouteError::ZeroDeadline {
            tag: "write deadline",
            value: dt,
        });
    }
    Ok(RouteOption::annotation(WriteDeadline(dt)))
}

/// A registered route and its immutable annotations.
#[derive(Clone, Debug)]
pub struct Route {
    pattern: String,
    annotations: Extensions,
}

impl Route {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            annotations: Extensions::new(),
        }
    }

    /// Apply a registration option. Only available while building the route.
    pub fn with(mut self, option: RouteOption) -> Self {
        (option.0)(&mut self.annotations);
        self
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Returns the annotation of type `T`, if the route declares one.
    pub fn annotation<T>(&self) -> Option<&T>
    where
        T: Send + Sync + 'static,
    {
        self.annotations.get::<T>()
    }
}

/// Looks up a duration annotation on an optional route.
///
/// `None` means the route is absent or has no such annotation, which is
/// distinct from an annotation holding zero.
pub fn route_timeout<T>(route: Option<&Route>) -> Option<Duration>
where
    T: TimeoutAnnotation,
{
    route
        .and_then(|r| r.annotation::<T>())
        .map(TimeoutAnnotation::duration)
}
