//! Delayed task queue: a fixed-capacity FIFO with one live countdown.
//!
//! Only the head task counts down; every other task waits its turn. A
//! task's delay therefore runs from the moment it becomes head, and a
//! queued task fires after the sum of all preceding tasks' delays plus
//! its own. That is exactly what the press-then-release emulation
//! sequences need, and it keeps the scheduler to a countdown and a ring.

use heapless::Deque;

use crate::error::Error;

/// Bounded FIFO of `(delay, item)` pairs fired through [`tick`](Self::tick).
pub struct DelayQueue<T, const N: usize> {
    queue: Deque<(u16, T), N>,
    /// Remaining delay of the head task; zero when the queue is idle.
    countdown: u16,
}

impl<T, const N: usize> DelayQueue<T, N> {
    pub const fn new() -> Self {
        Self {
            queue: Deque::new(),
            countdown: 0,
        }
    }

    /// Append a task to fire `delay` ticks after it becomes head.
    ///
    /// Fails with [`Error::QueueFull`] at capacity, leaving the queue
    /// untouched. An idle queue starts counting down immediately.
    pub fn schedule(&mut self, delay: u16, item: T) -> Result<(), Error> {
        self.queue
            .push_back((delay, item))
            .map_err(|_| Error::QueueFull)?;

        if self.countdown == 0 {
            if let Some((head_delay, _)) = self.queue.front() {
                self.countdown = *head_delay;
            }
        }

        Ok(())
    }

    /// Advance the countdown by one timer period.
    ///
    /// Returns the head task when its delay elapses; the next task's
    /// countdown starts from its own stored delay.
    pub fn tick(&mut self) -> Option<T> {
        if self.countdown == 0 {
            return None;
        }

        self.countdown -= 1;
        if self.countdown != 0 {
            return None;
        }

        let (_, item) = self.queue.pop_front()?;
        if let Some((head_delay, _)) = self.queue.front() {
            self.countdown = *head_delay;
        }
        Some(item)
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

impl<T, const N: usize> Default for DelayQueue<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Tick until a task fires, returning (elapsed ticks, task).
    fn next_fire<T, const N: usize>(queue: &mut DelayQueue<T, N>, limit: u16) -> Option<(u16, T)> {
        for elapsed in 1..=limit {
            if let Some(item) = queue.tick() {
                return Some((elapsed, item));
            }
        }
        None
    }

    #[test]
    fn single_task_fires_after_its_delay() {
        let mut queue: DelayQueue<u8, 10> = DelayQueue::new();
        queue.schedule(5, 42).unwrap();

        assert_eq!(next_fire(&mut queue, 100), Some((5, 42)));
        assert!(queue.is_empty());
    }

    #[test]
    fn tasks_fire_in_fifo_order_at_cumulative_delays() {
        let mut queue: DelayQueue<u8, 10> = DelayQueue::new();
        queue.schedule(2, 1).unwrap();
        queue.schedule(3, 2).unwrap();
        queue.schedule(1, 3).unwrap();

        // Delays run from becoming head: 2, then 2+3, then 2+3+1.
        let mut elapsed = 0;
        let mut fired = Vec::new();
        for _ in 0..10 {
            elapsed += 1;
            if let Some(item) = queue.tick() {
                fired.push((elapsed, item));
            }
        }
        assert_eq!(fired, vec![(2, 1), (5, 2), (6, 3)]);
    }

    #[test]
    fn each_task_fires_exactly_once() {
        let mut queue: DelayQueue<u8, 10> = DelayQueue::new();
        queue.schedule(1, 7).unwrap();

        assert_eq!(next_fire(&mut queue, 10), Some((1, 7)));
        for _ in 0..100 {
            assert_eq!(queue.tick(), None);
        }
    }

    #[test]
    fn schedule_fails_at_capacity_without_state_change() {
        let mut queue: DelayQueue<u8, 10> = DelayQueue::new();
        for i in 0..10 {
            queue.schedule(1, i).unwrap();
        }

        assert_eq!(queue.schedule(1, 99), Err(Error::QueueFull));
        assert_eq!(queue.len(), 10);

        // All ten queued tasks still fire, one per tick, in order.
        for i in 0..10 {
            assert_eq!(queue.tick(), Some(i));
        }
        assert_eq!(queue.tick(), None);
    }

    #[test]
    fn idle_queue_restarts_on_schedule() {
        let mut queue: DelayQueue<u8, 10> = DelayQueue::new();
        queue.schedule(2, 1).unwrap();
        assert_eq!(next_fire(&mut queue, 10), Some((2, 1)));

        // Queue drained and idle; a new task gets a fresh countdown.
        queue.schedule(4, 2).unwrap();
        assert_eq!(next_fire(&mut queue, 10), Some((4, 2)));
    }

    #[test]
    fn capacity_frees_up_after_firing() {
        let mut queue: DelayQueue<u8, 2> = DelayQueue::new();
        queue.schedule(1, 1).unwrap();
        queue.schedule(1, 2).unwrap();
        assert_eq!(queue.schedule(1, 3), Err(Error::QueueFull));

        assert_eq!(queue.tick(), Some(1));
        queue.schedule(1, 3).unwrap();

        assert_eq!(queue.tick(), Some(2));
        assert_eq!(queue.tick(), Some(3));
    }
}
