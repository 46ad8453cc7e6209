//! 同步原语
//!
//! 块缓存依赖两类语义不同的锁：
//!
//! - [`SpinLock`] - 短临界区、不可休眠，用于保护桶链表与帧元数据
//! - [`SleepLock`] - 可长期持有、争用时挂起当前上下文，用于保护帧内容（可跨越磁盘 I/O）
//!
//! 挂起与唤醒通过 [`Scheduler`] trait 交给宿主环境实现；在 `std` 下可直接使用
//! [`ThreadScheduler`]。

mod sched;
mod sleeplock;
mod spinlock;

pub use sched::{ContextId, Scheduler};
#[cfg(any(feature = "std", test))]
pub use sched::ThreadScheduler;
pub use sleeplock::{SleepLock, SleepLockGuard};
pub use spinlock::{SpinLock, SpinLockGuard};

#[cfg(test)]
pub(crate) use sched::ManualScheduler;
