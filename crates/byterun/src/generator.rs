//! Generator objects: a suspended frame plus its lifecycle flags.
//!
//! The suspended frame is moved into the generator when the frame yields and moved back out
//! while it runs. A generator whose frame is missing but which has not finished is therefore
//! currently executing, which is how re-entrant resumption is detected.

use std::{cell::RefCell, rc::Rc};

use crate::frame::Frame;

/// A generator created by calling a function whose code has the generator flag.
#[derive(Debug)]
pub struct Generator {
    name: Rc<str>,
    pub(crate) frame: Option<Frame>,
    pub(crate) started: bool,
    pub(crate) finished: bool,
}

impl Generator {
    /// Wraps a freshly built frame, linking the frame back to its generator.
    pub(crate) fn new(name: Rc<str>, mut frame: Frame) -> Rc<RefCell<Self>> {
        Rc::new_cyclic(|weak| {
            frame.generator = Some(weak.clone());
            RefCell::new(Self {
                name,
                frame: Some(frame),
                started: false,
                finished: false,
            })
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn is_started(&self) -> bool {
        self.started
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// True while the frame is out of the generator being run.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.frame.is_none() && !self.finished
    }

    /// Marks the generator exhausted and drops its frame, as `close()` does.
    pub(crate) fn close(&mut self) {
        self.frame = None;
        self.finished = true;
    }
}
