//! Ordered teardown of subscriptions and resources

/// Something that can release what it holds
///
/// Terminating twice must be harmless.
pub trait Terminable {
    fn terminate(&mut self);
}

impl<F: FnOnce()> Terminable for Option<F> {
    fn terminate(&mut self) {
        if let Some(f) = self.take() {
            f();
        }
    }
}

/// Collects terminables and releases them in reverse order of registration
#[derive(Default)]
pub struct Terminator {
    terminables: Vec<Box<dyn Terminable>>,
}

impl Terminator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a terminable
    pub fn with(&mut self, terminable: impl Terminable + 'static) {
        self.terminables.push(Box::new(terminable));
    }

    /// Register a closure to run on termination
    pub fn with_fn(&mut self, f: impl FnOnce() + 'static) {
        self.with(Some(f));
    }

    pub fn len(&self) -> usize {
        self.terminables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terminables.is_empty()
    }
}

impl Terminable for Terminator {
    fn terminate(&mut self) {
        while let Some(mut terminable) = self.terminables.pop() {
            terminable.terminate();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_terminates_in_reverse_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut terminator = Terminator::new();
        for i in 0..3 {
            let log = Rc::clone(&log);
            terminator.with_fn(move || log.borrow_mut().push(i));
        }
        assert_eq!(terminator.len(), 3);

        terminator.terminate();
        assert_eq!(*log.borrow(), vec![2, 1, 0]);
        assert!(terminator.is_empty());
    }

    #[test]
    fn test_terminate_twice_is_harmless() {
        let count = Rc::new(RefCell::new(0));
        let mut terminator = Terminator::new();
        let counter = Rc::clone(&count);
        terminator.with_fn(move || *counter.borrow_mut() += 1);

        terminator.terminate();
        terminator.terminate();
        assert_eq!(*count.borrow(), 1);
    }
}
