use std::cell::RefCell;
use std::rc::Rc;

use gloo_timers::callback::Timeout;

pub const SEARCH_DEBOUNCE_MS: u32 = 250;

/// Raw input goes to `pending` immediately; `effective` follows only after
/// `delay_ms` of quiet. Time is passed in so the state machine stays pure.
#[derive(Debug, Clone)]
pub struct Debounced<T> {
    effective: T,
    pending: Option<T>,
    deadline_ms: Option<f64>,
    delay_ms: f64,
}

impl<T: Clone + PartialEq> Debounced<T> {
    pub fn new(initial: T, delay_ms: u32) -> Self {
        Self {
            effective: initial,
            pending: None,
            deadline_ms: None,
            delay_ms: f64::from(delay_ms),
        }
    }

    /// Record a keystroke and restart the quiet period. Returns the new deadline.
    pub fn input(&mut self, value: T, now_ms: f64) -> f64 {
        let deadline = now_ms + self.delay_ms;
        self.pending = Some(value);
        self.deadline_ms = Some(deadline);
        deadline
    }

    /// Promote the pending value once its deadline has passed. Returns the
    /// new effective value only when it actually changed.
    pub fn poll(&mut self, now_ms: f64) -> Option<T> {
        match self.deadline_ms {
            Some(deadline) if now_ms >= deadline => self.flush(),
            _ => None,
        }
    }

    /// Promote the pending value now, ignoring the deadline.
    pub fn flush(&mut self) -> Option<T> {
        self.deadline_ms = None;
        let value = self.pending.take()?;
        if value == self.effective {
            return None;
        }
        self.effective = value.clone();
        Some(value)
    }

    /// Drop the pending value; `effective` is untouched.
    pub fn cancel(&mut self) {
        self.pending = None;
        self.deadline_ms = None;
    }

    #[cfg(test)]
    pub fn effective(&self) -> &T {
        &self.effective
    }

    #[cfg(test)]
    pub fn pending(&self) -> Option<&T> {
        self.pending.as_ref()
    }

    pub fn deadline_ms(&self) -> Option<f64> {
        self.deadline_ms
    }
}

/// Clock and one-shot timer behind a [`TimedDebounce`]. Scheduling replaces
/// (and so cancels) whatever was armed before.
pub trait Scheduler {
    fn now_ms(&self) -> f64;
    fn schedule(&mut self, delay_ms: u32, on_fire: Box<dyn FnOnce()>);
    fn cancel(&mut self);
}

/// Browser clock plus a gloo `Timeout`.
#[derive(Default)]
pub struct DebounceTimer {
    timeout: Option<Timeout>,
}

impl Scheduler for DebounceTimer {
    fn now_ms(&self) -> f64 {
        js_sys::Date::now()
    }

    fn schedule(&mut self, delay_ms: u32, on_fire: Box<dyn FnOnce()>) {
        self.timeout = Some(Timeout::new(delay_ms, on_fire));
    }

    fn cancel(&mut self) {
        if let Some(timeout) = self.timeout.take() {
            timeout.cancel();
        }
    }
}

struct Shared<T, S> {
    state: Debounced<T>,
    scheduler: S,
    on_settle: Rc<dyn Fn(T)>,
}

/// A [`Debounced`] value driven by a [`Scheduler`]: each input restarts the
/// quiet period and `on_settle` sees the value once the deadline has passed.
pub struct TimedDebounce<T, S: Scheduler = DebounceTimer> {
    shared: Rc<RefCell<Shared<T, S>>>,
    delay_ms: u32,
}

impl<T: Clone + PartialEq + 'static, S: Scheduler + 'static> TimedDebounce<T, S> {
    pub fn new(initial: T, delay_ms: u32, scheduler: S, on_settle: impl Fn(T) + 'static) -> Self {
        Self {
            shared: Rc::new(RefCell::new(Shared {
                state: Debounced::new(initial, delay_ms),
                scheduler,
                on_settle: Rc::new(on_settle),
            })),
            delay_ms,
        }
    }

    pub fn input(&self, value: T) {
        {
            let mut shared = self.shared.borrow_mut();
            let now = shared.scheduler.now_ms();
            shared.state.input(value, now);
        }
        arm(&self.shared, self.delay_ms);
    }

    pub fn cancel(&self) {
        let mut shared = self.shared.borrow_mut();
        shared.scheduler.cancel();
        shared.state.cancel();
    }
}

fn arm<T, S>(shared: &Rc<RefCell<Shared<T, S>>>, delay_ms: u32)
where
    T: Clone + PartialEq + 'static,
    S: Scheduler + 'static,
{
    let weak = Rc::downgrade(shared);
    let on_fire = Box::new(move || {
        if let Some(shared) = weak.upgrade() {
            fire(&shared);
        }
    });
    shared.borrow_mut().scheduler.schedule(delay_ms, on_fire);
}

fn fire<T, S>(shared: &Rc<RefCell<Shared<T, S>>>)
where
    T: Clone + PartialEq + 'static,
    S: Scheduler + 'static,
{
    let (settled, remaining, on_settle) = {
        let mut guard = shared.borrow_mut();
        let now = guard.scheduler.now_ms();
        let settled = guard.state.poll(now);
        // Timers can fire a little early; wait out the rest of the deadline.
        let remaining = guard.state.deadline_ms().map(|deadline| (deadline - now).ceil().max(1.0) as u32);
        (settled, remaining, Rc::clone(&guard.on_settle))
    };
    if let Some(delay_ms) = remaining {
        arm(shared, delay_ms);
    }
    if let Some(value) = settled {
        on_settle(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn typed(keys: &[(f64, &str)]) -> Debounced<String> {
        let mut d = Debounced::new(String::new(), SEARCH_DEBOUNCE_MS);
        for &(t, text) in keys {
            d.input(text.to_string(), t);
        }
        d
    }

    #[test]
    fn effective_waits_for_quiet_after_last_keystroke() {
        let mut d = typed(&[(0.0, "g"), (50.0, "ga"), (100.0, "gan")]);
        assert_eq!(d.deadline_ms(), Some(350.0));
        assert_eq!(d.pending().map(String::as_str), Some("gan"));

        assert_eq!(d.poll(250.0), None);
        assert_eq!(d.poll(349.9), None);
        assert_eq!(d.effective(), "");

        assert_eq!(d.poll(350.0).as_deref(), Some("gan"));
        assert_eq!(d.effective(), "gan");
        assert!(d.pending().is_none());
    }

    #[test]
    fn keystroke_restarts_timer() {
        let mut d = typed(&[(0.0, "a")]);
        d.input("ab".into(), 200.0);
        assert_eq!(d.poll(260.0), None);
        assert_eq!(d.poll(450.0).as_deref(), Some("ab"));
    }

    #[test]
    fn same_value_is_not_reported_as_change() {
        let mut d = typed(&[(0.0, "a")]);
        d.poll(300.0);
        d.input("a".into(), 400.0);
        assert_eq!(d.poll(700.0), None);
        assert_eq!(d.effective(), "a");
    }

    #[test]
    fn cancel_keeps_effective() {
        let mut d = typed(&[(0.0, "a")]);
        d.poll(300.0);
        d.input("abc".into(), 400.0);
        d.cancel();
        assert_eq!(d.poll(10_000.0), None);
        assert_eq!(d.effective(), "a");
    }

    #[test]
    fn flush_promotes_immediately() {
        let mut d = typed(&[(0.0, "seoul")]);
        assert_eq!(d.flush().as_deref(), Some("seoul"));
        assert_eq!(d.deadline_ms(), None);
        assert_eq!(d.flush(), None);
    }

    #[derive(Default)]
    struct Clock {
        now: f64,
        armed: Option<(f64, Box<dyn FnOnce()>)>,
    }

    /// Hand-cranked scheduler; clones share one clock.
    #[derive(Clone, Default)]
    struct ManualScheduler(Rc<RefCell<Clock>>);

    impl Scheduler for ManualScheduler {
        fn now_ms(&self) -> f64 {
            self.0.borrow().now
        }

        fn schedule(&mut self, delay_ms: u32, on_fire: Box<dyn FnOnce()>) {
            let mut clock = self.0.borrow_mut();
            let at = clock.now + f64::from(delay_ms);
            clock.armed = Some((at, on_fire));
        }

        fn cancel(&mut self) {
            self.0.borrow_mut().armed = None;
        }
    }

    impl ManualScheduler {
        /// Run every timer due up to `now`, in order.
        fn advance_to(&self, now: f64) {
            loop {
                let due = {
                    let mut clock = self.0.borrow_mut();
                    match clock.armed.take() {
                        Some((at, on_fire)) if at <= now => {
                            clock.now = at;
                            Some(on_fire)
                        }
                        other => {
                            clock.armed = other;
                            clock.now = now;
                            None
                        }
                    }
                };
                match due {
                    Some(on_fire) => on_fire(),
                    None => break,
                }
            }
        }

        /// Fire the armed timer at `now` even if it is not due yet.
        fn fire_at(&self, now: f64) {
            let armed = {
                let mut clock = self.0.borrow_mut();
                clock.now = now;
                clock.armed.take()
            };
            if let Some((_, on_fire)) = armed {
                on_fire();
            }
        }
    }

    fn timed() -> (TimedDebounce<String, ManualScheduler>, ManualScheduler, Rc<RefCell<Vec<String>>>) {
        let scheduler = ManualScheduler::default();
        let settled = Rc::new(RefCell::new(Vec::new()));
        let sink = settled.clone();
        let debounce = TimedDebounce::new(String::new(), SEARCH_DEBOUNCE_MS, scheduler.clone(), move |v| {
            sink.borrow_mut().push(v)
        });
        (debounce, scheduler, settled)
    }

    #[test]
    fn timer_settles_quiet_period_after_last_keystroke() {
        let (debounce, clock, settled) = timed();
        for (t, text) in [(0.0, "g"), (50.0, "ga"), (100.0, "gan")] {
            clock.advance_to(t);
            debounce.input(text.to_string());
        }
        clock.advance_to(349.0);
        assert!(settled.borrow().is_empty());

        clock.advance_to(350.0);
        assert_eq!(*settled.borrow(), vec!["gan".to_string()]);

        clock.advance_to(5_000.0);
        assert_eq!(settled.borrow().len(), 1);
    }

    #[test]
    fn early_timer_waits_out_the_deadline() {
        let (debounce, clock, settled) = timed();
        debounce.input("seoul".into());
        clock.fire_at(240.0);
        assert!(settled.borrow().is_empty());

        clock.advance_to(249.0);
        assert!(settled.borrow().is_empty());
        clock.advance_to(250.0);
        assert_eq!(*settled.borrow(), vec!["seoul".to_string()]);
    }

    #[test]
    fn repeating_the_settled_value_does_not_fire() {
        let (debounce, clock, settled) = timed();
        debounce.input("a".into());
        clock.advance_to(300.0);
        debounce.input("a".into());
        clock.advance_to(600.0);
        assert_eq!(settled.borrow().len(), 1);
    }

    #[test]
    fn cancelled_or_dropped_debounce_never_settles() {
        let (debounce, clock, settled) = timed();
        debounce.input("ab".into());
        debounce.cancel();
        clock.advance_to(1_000.0);
        assert!(settled.borrow().is_empty());

        debounce.input("abc".into());
        drop(debounce);
        clock.advance_to(2_000.0);
        assert!(settled.borrow().is_empty());
    }
}
