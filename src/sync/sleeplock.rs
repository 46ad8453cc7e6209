//! 睡眠锁
//!
//! 争用时通过 [`Scheduler`] 挂起当前上下文而不是忙等待，适合跨越磁盘 I/O 持有。
//!
//! 内部状态（是否被持有、持有者）由一个自旋锁保护；数据本身放在另一个
//! 自旋互斥量中，只有赢得睡眠锁的上下文才会去获取它，因此那把锁永远不会争用。

use core::ops::{Deref, DerefMut};

use super::sched::{ContextId, Scheduler};
use super::spinlock::SpinLock;

struct SleepState {
    locked: bool,
    holder: Option<ContextId>,
}

/// 睡眠锁
pub struct SleepLock<T> {
    state: SpinLock<SleepState>,
    name: &'static str,
    data: spin::Mutex<T>,
}

impl<T> SleepLock<T> {
    /// 创建睡眠锁
    pub const fn new(data: T, name: &'static str) -> Self {
        Self {
            state: SpinLock::new(
                SleepState {
                    locked: false,
                    holder: None,
                },
                "sleeplock",
            ),
            name,
            data: spin::Mutex::new(data),
        }
    }

    /// 获取锁；锁被占用时挂起当前上下文
    pub fn lock<'a>(&'a self, sched: &'a dyn Scheduler) -> SleepLockGuard<'a, T> {
        loop {
            {
                let mut state = self.state.lock();
                if !state.locked {
                    state.locked = true;
                    state.holder = Some(sched.current());
                    break;
                }
            }
            sched.sleep(self.chan(), &|| self.state.lock().locked);
        }

        SleepLockGuard {
            lock: self,
            sched,
            data: self.data.lock(),
        }
    }

    /// 当前上下文是否持有此锁
    pub fn holding(&self, sched: &dyn Scheduler) -> bool {
        let state = self.state.lock();
        state.locked && state.holder == Some(sched.current())
    }

    /// 锁是否被任意上下文持有
    pub fn is_locked(&self) -> bool {
        self.state.lock().locked
    }

    /// 锁名字
    pub fn name(&self) -> &'static str {
        self.name
    }

    fn chan(&self) -> usize {
        &self.state as *const SpinLock<SleepState> as usize
    }

    fn unlock(&self, sched: &dyn Scheduler) {
        {
            let mut state = self.state.lock();
            state.locked = false;
            state.holder = None;
        }
        sched.wakeup(self.chan());
    }
}

/// 睡眠锁守卫
///
/// 离开作用域时释放锁并唤醒等待者。数据守卫在 `drop` 返回后才释放，
/// 新持有者最多在数据互斥量上短暂自旋。
pub struct SleepLockGuard<'a, T> {
    lock: &'a SleepLock<T>,
    sched: &'a dyn Scheduler,
    data: spin::MutexGuard<'a, T>,
}

impl<'a, T> SleepLockGuard<'a, T> {
    /// 当前上下文是否仍是持有者
    ///
    /// 守卫被移交给其他上下文时返回 `false`。
    pub fn holding(&self) -> bool {
        self.lock.holding(self.sched)
    }
}

impl<'a, T> Deref for SleepLockGuard<'a, T> {
    type Target = T;
    fn deref(&self) -> &T {
        &self.data
    }
}

impl<'a, T> DerefMut for SleepLockGuard<'a, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.data
    }
}

impl<'a, T> Drop for SleepLockGuard<'a, T> {
    fn drop(&mut self) {
        self.lock.unlock(self.sched);
    }
}
