//! Named-site registry: the substrate reference implementation.
//!
//! Purpose
//! -------
//! Stand in for an external inference engine during prior simulation and
//! testing. A [`Trace`] accepts pre-evaluated site registrations — latent
//! draws, observations conditioned on data, and scalar factors — enforces
//! site-name uniqueness, hands out deterministic sub-keys in registration
//! order, and accumulates the joint log-density.
//!
//! Key behaviors
//! -------------
//! - `draw_key` derives a fresh sub-key per request; repeated executions
//!   of the same model against fresh traces see identical key sequences,
//!   so site ↔ draw correspondence is stable across calls.
//! - Values and log-probabilities are computed by the caller (the model
//!   layer), keeping this registry agnostic of distribution types.
//! - Duplicate site names are rejected; there is no overwrite mode.
//!
//! Invariants & assumptions
//! ------------------------
//! - Registration order is the deterministic evaluation order of the
//!   model; the trace never reorders sites.
//! - `log_density()` is the sum of all site log-probabilities and factor
//!   values registered so far.

use ndarray::{Array1, Array2};

use crate::probability::errors::{TraceError, TraceResult};
use crate::probability::key::RandomKey;

/// Value recorded at a site.
#[derive(Debug, Clone, PartialEq)]
pub enum SiteValue {
    Scalar(f64),
    Vector(Array1<f64>),
    Matrix(Array2<f64>),
}

/// What kind of site a record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiteKind {
    /// A stochastic draw from a prior.
    Latent,
    /// A site conditioned on observed data.
    Observed,
    /// A bare additive log-density term.
    Factor,
}

/// One registered probabilistic site.
#[derive(Debug, Clone, PartialEq)]
pub struct Site {
    pub name: String,
    pub kind: SiteKind,
    pub value: SiteValue,
    /// This site's contribution to the joint log-density.
    pub log_prob: f64,
}

/// Ordered registry of probabilistic sites for one model execution.
#[derive(Debug, Clone)]
pub struct Trace {
    key: RandomKey,
    streams: u64,
    sites: Vec<Site>,
}

impl Trace {
    /// Start an empty trace rooted at `key`.
    pub fn new(key: RandomKey) -> Self {
        Trace { key, streams: 0, sites: Vec::new() }
    }

    /// Derive the next sub-key in this trace's deterministic sequence.
    pub fn draw_key(&mut self) -> RandomKey {
        self.streams += 1;
        self.key.derive(self.streams)
    }

    /// Record a latent draw under `name`.
    ///
    /// # Errors
    /// - [`TraceError::DuplicateSite`] if `name` is already registered.
    pub fn record_sample(&mut self, name: &str, value: SiteValue, log_prob: f64) -> TraceResult<()> {
        self.push(name, SiteKind::Latent, value, log_prob)
    }

    /// Record a site conditioned on observed data under `name`.
    ///
    /// # Errors
    /// - [`TraceError::DuplicateSite`] if `name` is already registered.
    pub fn record_observed(&mut self, name: &str, value: SiteValue, log_prob: f64) -> TraceResult<()> {
        self.push(name, SiteKind::Observed, value, log_prob)
    }

    /// Record an additive log-density factor under `name`.
    ///
    /// A `-inf` factor is legal (it zeroes the model's probability); NaN is
    /// always a caller bug and is rejected.
    ///
    /// # Errors
    /// - [`TraceError::DuplicateSite`] if `name` is already registered.
    /// - [`TraceError::NanFactor`] if `value` is NaN.
    pub fn record_factor(&mut self, name: &str, value: f64) -> TraceResult<()> {
        if value.is_nan() {
            return Err(TraceError::NanFactor { name: name.to_string() });
        }
        self.push(name, SiteKind::Factor, SiteValue::Scalar(value), value)
    }

    /// Joint log-density of everything registered so far.
    pub fn log_density(&self) -> f64 {
        self.sites.iter().map(|s| s.log_prob).sum()
    }

    /// All sites in registration order.
    pub fn sites(&self) -> &[Site] {
        &self.sites
    }

    /// Look up a site by name.
    pub fn site(&self, name: &str) -> Option<&Site> {
        self.sites.iter().find(|s| s.name == name)
    }

    /// Number of registered sites.
    pub fn len(&self) -> usize {
        self.sites.len()
    }

    /// Whether no site has been registered yet.
    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    fn push(&mut self, name: &str, kind: SiteKind, value: SiteValue, log_prob: f64) -> TraceResult<()> {
        if self.sites.iter().any(|s| s.name == name) {
            return Err(TraceError::DuplicateSite { name: name.to_string() });
        }
        self.sites.push(Site { name: name.to_string(), kind, value, log_prob });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn log_density_sums_sites_and_factors() {
        let mut trace = Trace::new(RandomKey::new(1));
        trace.record_sample("a", SiteValue::Scalar(0.5), -1.25).unwrap();
        trace.record_observed("b", SiteValue::Scalar(2.0), -0.75).unwrap();
        trace.record_factor("c", 0.5).unwrap();
        assert_relative_eq!(trace.log_density(), -1.5, max_relative = 1e-12);
        assert_eq!(trace.len(), 3);
    }

    #[test]
    fn duplicate_site_names_are_rejected() {
        let mut trace = Trace::new(RandomKey::new(1));
        trace.record_sample("a", SiteValue::Scalar(0.0), 0.0).unwrap();
        let err = trace.record_sample("a", SiteValue::Scalar(1.0), 0.0).unwrap_err();
        assert_eq!(err, TraceError::DuplicateSite { name: "a".into() });
    }

    #[test]
    fn nan_factor_is_rejected_but_neg_infinity_is_legal() {
        let mut trace = Trace::new(RandomKey::new(1));
        assert!(trace.record_factor("bad", f64::NAN).is_err());
        trace.record_factor("zero-mass", f64::NEG_INFINITY).unwrap();
        assert_eq!(trace.log_density(), f64::NEG_INFINITY);
    }

    #[test]
    fn key_sequence_is_deterministic_across_traces() {
        let mut a = Trace::new(RandomKey::new(9));
        let mut b = Trace::new(RandomKey::new(9));
        let ka: Vec<_> = (0..4).map(|_| a.draw_key()).collect();
        let kb: Vec<_> = (0..4).map(|_| b.draw_key()).collect();
        assert_eq!(ka, kb);
    }
}
