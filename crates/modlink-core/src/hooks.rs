//! Structural hooks around original host behavior.
//!
//! Extension stages must never replace the host's own handling of a
//! lifecycle event, only surround it. [`LifecycleHook`] encodes that as the
//! shape of the call: `fire` runs the before-stages, then the original
//! behavior, then the after-stages, and there is no way to call the stages
//! without the original.

type Stage<Ctx> = Box<dyn FnMut(&mut Ctx)>;

/// Before/after stage lists for one lifecycle event.
pub struct LifecycleHook<Ctx> {
    before: Vec<Stage<Ctx>>,
    after: Vec<Stage<Ctx>>,
}

impl<Ctx> Default for LifecycleHook<Ctx> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Ctx> LifecycleHook<Ctx> {
    pub fn new() -> Self {
        Self {
            before: Vec::new(),
            after: Vec::new(),
        }
    }

    /// Adds a stage that runs before the original behavior.
    pub fn before(&mut self, stage: impl FnMut(&mut Ctx) + 'static) {
        self.before.push(Box::new(stage));
    }

    /// Adds a stage that runs after the original behavior. Resolution passes
    /// are after-stages: they need the host's own handling done first.
    pub fn after(&mut self, stage: impl FnMut(&mut Ctx) + 'static) {
        self.after.push(Box::new(stage));
    }

    pub fn is_empty(&self) -> bool {
        self.before.is_empty() && self.after.is_empty()
    }

    /// Runs before-stages, the original behavior, then after-stages, in
    /// stage-registration order. The original's return value passes through.
    pub fn fire<R>(&mut self, ctx: &mut Ctx, original: impl FnOnce(&mut Ctx) -> R) -> R {
        for stage in &mut self.before {
            stage(ctx);
        }
        let result = original(ctx);
        for stage in &mut self.after {
            stage(ctx);
        }
        result
    }
}
