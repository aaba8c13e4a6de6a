use std::{fmt, sync::Arc};

/// Destination for diagnostic messages emitted by the procedures.
///
/// Procedures receive their sink at construction instead of reaching for a
/// global logger, so hosts and tests can capture what was reported.
pub trait DiagnosticSink {
    fn debug(&self, message: fmt::Arguments<'_>);
}

/// Forwards diagnostics to `tracing` at debug level.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn debug(&self, message: fmt::Arguments<'_>) {
        tracing::debug!(target: "graphprocs::fulltext", "{}", message);
    }
}

impl<'a, D> DiagnosticSink for &'a D
where
    D: DiagnosticSink + ?Sized,
{
    fn debug(&self, message: fmt::Arguments<'_>) {
        (*self).debug(message)
    }
}

impl<D> DiagnosticSink for Arc<D>
where
    D: DiagnosticSink + ?Sized,
{
    fn debug(&self, message: fmt::Arguments<'_>) {
        (**self).debug(message)
    }
}
