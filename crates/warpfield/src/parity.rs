//! Parity gate between the physically exact engine and the display engine.
//!
//! A [`LockedEngine`] owns two fields of its inner engine's state: `parity`
//! and `derivedScale`. Whatever a caller sends for them is dropped with a
//! warning naming the call site, and the locked values are written instead.

use std::ops::Deref;
use std::panic::Location;

use crate::backend::GpuBackend;
use crate::bus::{Subscription, UniformBus, UNIFORMS_TOPIC};
use crate::config::ShowBoost;
use crate::deform::DeformStats;
use crate::engine::{Destroy, UniformSink, WarpEngine};
use crate::uniforms::WarpParams;

/// Fixed identity of a locked engine.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Parity {
    /// Physically exact: parity on, derived scale 1.
    Real,
    /// Display boosted: parity off, derived scale from `displayGain`.
    Show { default_gain: f64 },
}

impl Parity {
    pub fn is_parity(self) -> bool {
        matches!(self, Parity::Real)
    }

    fn derived_scale(self, display_gain: Option<f64>) -> f64 {
        match self {
            Parity::Real => 1.0,
            Parity::Show { default_gain } => display_gain
                .filter(|g| g.is_finite() && *g > 0.0)
                .unwrap_or(default_gain),
        }
    }
}

/// Engine whose parity identity cannot change after construction.
pub struct LockedEngine<E: UniformSink> {
    inner: E,
    parity: Parity,
}

impl<E: UniformSink> LockedEngine<E> {
    fn new(mut inner: E, parity: Parity) -> Self {
        let scale = parity.derived_scale(inner.params().display_gain);
        inner.update_uniforms(WarpParams {
            parity: Some(parity.is_parity()),
            derived_scale: Some(scale),
            ..Default::default()
        });
        Self { inner, parity }
    }

    pub fn parity(&self) -> Parity {
        self.parity
    }
}

impl<E: UniformSink> Deref for LockedEngine<E> {
    type Target = E;

    fn deref(&self) -> &E {
        &self.inner
    }
}

impl<E: UniformSink> LockedEngine<E> {
    /// Merge `patch` through the gate, blaming `origin` for any field it
    /// had to drop.
    pub fn update_uniforms_from(&mut self, mut patch: WarpParams, origin: &Location<'_>) {
        for warning in strip_locked_fields(&mut patch, self.parity, origin) {
            log::warn!("{}", warning);
        }
        let gain = patch.display_gain.or(self.inner.params().display_gain);
        patch.parity = Some(self.parity.is_parity());
        patch.derived_scale = Some(self.parity.derived_scale(gain));
        self.inner.update_uniforms(patch);
    }
}

/// Take the locked fields out of `patch`, one warning per field dropped.
fn strip_locked_fields(patch: &mut WarpParams, parity: Parity, origin: &Location<'_>) -> Vec<String> {
    let mut warnings = Vec::new();
    if let Some(p) = patch.parity.take() {
        warnings.push(format!(
            "{}: ignoring parity={} on locked {:?} engine",
            origin, p, parity
        ));
    }
    if let Some(s) = patch.derived_scale.take() {
        warnings.push(format!(
            "{}: ignoring derivedScale={} on locked {:?} engine",
            origin, s, parity
        ));
    }
    warnings
}

impl<E: UniformSink> UniformSink for LockedEngine<E> {
    #[track_caller]
    fn update_uniforms(&mut self, patch: WarpParams) {
        self.update_uniforms_from(patch, Location::caller());
    }

    fn params(&self) -> &WarpParams {
        self.inner.params()
    }
}

impl<E: UniformSink + Destroy> Destroy for LockedEngine<E> {
    fn destroy(&mut self) {
        self.inner.destroy();
    }
}

/// Wrap an engine in the parity gate. Locking a locked engine is a no-op.
pub trait LockParity: Sized {
    type Locked: UniformSink;

    fn lock_parity(self, parity: Parity) -> Self::Locked;
}

impl<B: GpuBackend> LockParity for WarpEngine<B> {
    type Locked = LockedEngine<WarpEngine<B>>;

    fn lock_parity(self, parity: Parity) -> Self::Locked {
        LockedEngine::new(self, parity)
    }
}

impl<E: UniformSink> LockParity for LockedEngine<E> {
    type Locked = Self;

    fn lock_parity(self, parity: Parity) -> Self {
        if parity != self.parity {
            log::warn!(
                "engine already locked as {:?}; keeping it (asked for {:?})",
                self.parity,
                parity
            );
        }
        self
    }
}

impl<B: GpuBackend> LockedEngine<WarpEngine<B>> {
    pub fn draw(&mut self, time: f64) {
        self.inner.draw(time);
    }

    pub fn update_grid(&mut self) -> DeformStats {
        self.inner.update_grid()
    }

    pub fn set_render_enabled(&mut self, enabled: bool) {
        self.inner.set_render_enabled(enabled);
    }

    pub fn backend_mut(&mut self) -> Option<&mut B> {
        self.inner.backend_mut()
    }
}

/// REAL and SHOW engines fed from one upstream topic.
pub struct DualEngine<B: GpuBackend> {
    real: LockedEngine<WarpEngine<B>>,
    show: LockedEngine<WarpEngine<B>>,
    boost: ShowBoost,
    subscription: Subscription,
}

impl<B: GpuBackend> DualEngine<B> {
    pub fn new(
        real: WarpEngine<B>,
        show: WarpEngine<B>,
        boost: ShowBoost,
        bus: &mut UniformBus,
    ) -> Self {
        Self {
            real: real.lock_parity(Parity::Real),
            show: show.lock_parity(Parity::Show {
                default_gain: boost.display_gain,
            }),
            boost,
            subscription: bus.subscribe(UNIFORMS_TOPIC),
        }
    }

    pub fn real(&self) -> &LockedEngine<WarpEngine<B>> {
        &self.real
    }

    pub fn show(&self) -> &LockedEngine<WarpEngine<B>> {
        &self.show
    }

    pub fn real_mut(&mut self) -> &mut LockedEngine<WarpEngine<B>> {
        &mut self.real
    }

    pub fn show_mut(&mut self) -> &mut LockedEngine<WarpEngine<B>> {
        &mut self.show
    }

    /// Forward one canonical set: verbatim to REAL, with the display
    /// overrides to SHOW.
    #[track_caller]
    pub fn feed(&mut self, canonical: WarpParams) {
        self.feed_from(canonical, Location::caller());
    }

    fn feed_from(&mut self, canonical: WarpParams, origin: &Location<'_>) {
        let boosted = self.boost.apply(&canonical);
        self.real.update_uniforms_from(canonical, origin);
        self.show.update_uniforms_from(boosted, origin);
    }

    /// Drain everything published since the last call. Returns how many
    /// patches were forwarded. Gate warnings name the publishing line.
    pub fn pump(&mut self) -> usize {
        let mut n = 0;
        while let Some((patch, origin)) = self.subscription.try_next_traced() {
            self.feed_from(patch, origin);
            n += 1;
        }
        if n > 0 {
            log::trace!("{} patches from '{}'", n, self.subscription.topic());
        }
        n
    }

    pub fn draw(&mut self, time: f64) {
        self.real.draw(time);
        self.show.draw(time);
    }

    pub fn set_render_enabled(&mut self, enabled: bool) {
        self.real.set_render_enabled(enabled);
        self.show.set_render_enabled(enabled);
    }
}

impl<B: GpuBackend> Destroy for DualEngine<B> {
    fn destroy(&mut self) {
        self.real.destroy();
        self.show.destroy();
    }
}
