//! 调度器接口
//!
//! 睡眠锁需要"挂起当前上下文直到被唤醒"的能力，这由宿主内核的调度器提供。

/// 执行上下文标识（线程/进程）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ContextId(pub u64);

/// 调度器 trait
///
/// 以"通道"（一个地址大小的整数）为键实现 sleep/wakeup。
///
/// # 实现要求
///
/// `sleep` 必须在与 `wakeup` 互斥的条件下求值 `still_blocked`，并在同一临界区内
/// 登记为等待者，否则会丢失唤醒。
///
/// # 示例
///
/// ```rust,ignore
/// struct KernelSched;
///
/// impl Scheduler for KernelSched {
///     fn current(&self) -> ContextId {
///         ContextId(my_proc().pid as u64)
///     }
///     fn sleep(&self, chan: usize, still_blocked: &dyn Fn() -> bool) {
///         let guard = WAIT_LOCK.lock();
///         if still_blocked() {
///             my_proc().sleep(chan, guard);
///         }
///     }
///     fn wakeup(&self, chan: usize) {
///         let _guard = WAIT_LOCK.lock();
///         proc_table().wakeup(chan);
///     }
/// }
/// ```
pub trait Scheduler: Send + Sync {
    /// 当前执行上下文
    fn current(&self) -> ContextId;

    /// 若 `still_blocked()` 为真，挂起当前上下文直到 `chan` 上发生 `wakeup`
    ///
    /// 允许虚假返回，调用者须自行循环重试。
    fn sleep(&self, chan: usize, still_blocked: &dyn Fn() -> bool);

    /// 唤醒所有在 `chan` 上睡眠的上下文
    fn wakeup(&self, chan: usize);
}

#[cfg(any(feature = "std", test))]
mod thread {
    use super::{ContextId, Scheduler};
    use alloc::collections::BTreeMap;
    use core::sync::atomic::{AtomicU64, Ordering};
    use std::sync::{Condvar, Mutex, PoisonError};

    static NEXT_CONTEXT: AtomicU64 = AtomicU64::new(1);

    std::thread_local! {
        static CONTEXT: u64 = NEXT_CONTEXT.fetch_add(1, Ordering::Relaxed);
    }

    /// 基于操作系统线程的调度器
    ///
    /// 每个线程是一个上下文；每个通道维护一个唤醒代数，`sleep` 在代数变化前阻塞于条件变量。
    #[derive(Debug, Default)]
    pub struct ThreadScheduler {
        generations: Mutex<BTreeMap<usize, u64>>,
        cond: Condvar,
    }

    impl ThreadScheduler {
        /// 创建调度器
        pub fn new() -> Self {
            Self::default()
        }
    }

    impl Scheduler for ThreadScheduler {
        fn current(&self) -> ContextId {
            ContextId(CONTEXT.with(|id| *id))
        }

        fn sleep(&self, chan: usize, still_blocked: &dyn Fn() -> bool) {
            let mut generations = self.generations.lock().unwrap_or_else(PoisonError::into_inner);
            if !still_blocked() {
                return;
            }
            let seen = generations.get(&chan).copied().unwrap_or(0);
            while generations.get(&chan).copied().unwrap_or(0) == seen {
                generations = self.cond.wait(generations).unwrap_or_else(PoisonError::into_inner);
            }
        }

        fn wakeup(&self, chan: usize) {
            let mut generations = self.generations.lock().unwrap_or_else(PoisonError::into_inner);
            let generation = generations.entry(chan).or_insert(0);
            *generation = generation.wrapping_add(1);
            drop(generations);
            self.cond.notify_all();
        }
    }
}

#[cfg(any(feature = "std", test))]
pub use thread::ThreadScheduler;

/// 测试用调度器：当前上下文可手动切换，sleep 让出 CPU 轮询
#[cfg(test)]
pub(crate) struct ManualScheduler {
    current: core::sync::atomic::AtomicU64,
}

#[cfg(test)]
impl ManualScheduler {
    pub(crate) fn new() -> Self {
        Self { current: core::sync::atomic::AtomicU64::new(1) }
    }

    pub(crate) fn switch_to(&self, id: u64) {
        self.current.store(id, core::sync::atomic::Ordering::Relaxed);
    }
}

#[cfg(test)]
impl Scheduler for ManualScheduler {
    fn current(&self) -> ContextId {
        ContextId(self.current.load(core::sync::atomic::Ordering::Relaxed))
    }

    fn sleep(&self, _chan: usize, still_blocked: &dyn Fn() -> bool) {
        while still_blocked() {
            std::thread::yield_now();
        }
    }

    fn wakeup(&self, _chan: usize) {}
}
