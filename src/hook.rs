//! Thread-scoped step hook.
//!
//! At most one hook is installed per thread at a time. Every probe on that
//! thread is delivered to it, whichever function it comes from; filtering is
//! the hook's job. Nested installation is not supported and is rejected.

use crate::Result;
use crate::frame::{Frame, Locals};
use anyhow::bail;
use std::cell::RefCell;
use std::marker::PhantomData;
use std::rc::Rc;
use tracing::debug;

/// One executed line boundary.
pub struct Step<'s, 'l> {
    pub frame: &'s Frame,
    /// Source file of the probe, as `file!()` reports it.
    pub file: &'s str,
    pub line: u32,
    pub locals: &'s Locals<'l>,
}

pub trait StepHook {
    fn on_step(&mut self, step: &Step<'_, '_>);
}

pub type SharedHook = Rc<RefCell<dyn StepHook>>;

thread_local! {
    static ACTIVE: RefCell<Option<SharedHook>> = const { RefCell::new(None) };
}

/// Uninstalls the hook when dropped, including while unwinding.
#[must_use = "the hook is removed as soon as the guard is dropped"]
pub struct HookGuard {
    // tied to the installing thread
    _thread: PhantomData<Rc<()>>,
}

impl Drop for HookGuard {
    fn drop(&mut self) {
        ACTIVE.with(|slot| slot.borrow_mut().take());
        debug!("step hook removed");
    }
}

/// Install `hook` for the current thread.
pub fn install(hook: SharedHook) -> Result<HookGuard> {
    ACTIVE.with(|slot| {
        let mut slot = slot.borrow_mut();
        if slot.is_some() {
            bail!("a step hook is already installed on this thread; nested traced calls are not supported");
        }
        *slot = Some(hook);
        Ok(())
    })?;
    debug!("step hook installed");
    Ok(HookGuard {
        _thread: PhantomData,
    })
}

pub fn is_installed() -> bool {
    ACTIVE.with(|slot| slot.borrow().is_some())
}

pub(crate) fn dispatch<'l>(
    frame: &Frame,
    file: &str,
    line: u32,
    bind: impl FnOnce(&mut Locals<'l>),
) {
    let Some(hook) = ACTIVE.with(|slot| slot.borrow().clone()) else {
        return;
    };
    let mut locals = Locals::new();
    bind(&mut locals);
    let step = Step {
        frame,
        file,
        line,
        locals: &locals,
    };
    match hook.try_borrow_mut() {
        Ok(mut hook) => hook.on_step(&step),
        // a probe reached from inside the hook itself (e.g. an instrumented
        // ToValue impl)
        Err(_) => debug!(frame = frame.name(), file, line, "step hook busy; probe skipped"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[derive(Default)]
    struct Lines(Vec<(String, String, u32, Vec<String>)>);

    impl StepHook for Lines {
        fn on_step(&mut self, step: &Step<'_, '_>) {
            self.0.push((
                step.frame.name().to_string(),
                step.file.to_string(),
                step.line,
                step.locals.names().map(str::to_string).collect(),
            ));
        }
    }

    #[test]
    fn probes_reach_installed_hook_only() {
        let frame = crate::frame!("probe");
        let x = 1;
        frame.step("a.rs", 1, |l| {
            l.bind("x", &x);
        });

        let lines = Rc::new(RefCell::new(Lines::default()));
        {
            let _guard = install(lines.clone()).unwrap();
            assert!(is_installed());
            frame.step("a.rs", 2, |l| {
                l.bind("x", &x);
            });
        }
        assert!(!is_installed());
        frame.step("a.rs", 3, |_| {});

        assert_eq!(
            lines.borrow().0,
            vec![("probe".to_string(), "a.rs".to_string(), 2, vec!["x".to_string()])]
        );
    }

    #[test]
    fn second_install_is_rejected() {
        let first = install(Rc::new(RefCell::new(Lines::default()))).unwrap();
        assert!(install(Rc::new(RefCell::new(Lines::default()))).is_err());
        drop(first);
        assert!(install(Rc::new(RefCell::new(Lines::default()))).is_ok());
    }

    #[test]
    fn guard_releases_on_panic() {
        let result = std::panic::catch_unwind(|| {
            let _guard = install(Rc::new(RefCell::new(Lines::default()))).unwrap();
            panic!("boom");
        });
        assert!(result.is_err());
        assert!(!is_installed());
    }
}
