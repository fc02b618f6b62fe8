use std::time::Duration;

use timebox::Context;
use timebox::HandlerTimeout;
use timebox::ReadDeadline;
use timebox::Route;
use timebox::WriteDeadline;
use timebox::route_timeout;
use tokio::time::Instant;

/// The handler timeout for `route`: its override if it declares one, else
/// `global`.
pub(crate) fn resolve_timeout(route: Option<&Route>, global: Duration) -> Duration {
    route_timeout::<HandlerTimeout>(route).unwrap_or(global)
}

/// Apply the route's read and write deadlines to the connection.
pub(crate) fn set_deadlines(c: &mut Context) {
    let read = route_timeout::<ReadDeadline>(c.route());
    let write = route_timeout::<WriteDeadline>(c.route());

    // Errors are ignored: the transport may not support deadlines and there
    // is nothing to recover at this point. A deadline past the clock's range
    // is the same as none.
    if let Some(dt) = read
        && let Some(deadline) = Instant::now().checked_add(dt)
        && let Err(err) = c.writer().set_read_deadline(deadline)
    {
        tracing::trace!(%err, "read deadline not applied");
    }
    if let Some(dt) = write
        && let Some(deadline) = Instant::now().checked_add(dt)
        && let Err(err) = c.writer().set_write_deadline(deadline)
    {
        tracing::trace!(%err, "write deadline not applied");
    }
}
