//! 自旋锁
//!
//! 忙等待互斥锁，不会挂起上下文。只能用于极短的临界区，持有期间不得进行
//! 磁盘 I/O 或获取睡眠锁。

use spin::Mutex;

/// 自旋锁守卫，离开作用域时释放
pub type SpinLockGuard<'a, T> = spin::MutexGuard<'a, T>;

/// 带名字的自旋锁
pub struct SpinLock<T> {
    name: &'static str,
    inner: Mutex<T>,
}

impl<T> SpinLock<T> {
    /// 创建自旋锁
    pub const fn new(data: T, name: &'static str) -> Self {
        Self {
            name,
            inner: Mutex::new(data),
        }
    }

    /// 获取锁（忙等待）
    #[inline]
    pub fn lock(&self) -> SpinLockGuard<'_, T> {
        self.inner.lock()
    }

    /// 尝试获取锁，失败立即返回 `None`
    #[inline]
    pub fn try_lock(&self) -> Option<SpinLockGuard<'_, T>> {
        self.inner.try_lock()
    }

    /// 锁当前是否被持有
    pub fn is_locked(&self) -> bool {
        self.inner.is_locked()
    }

    /// 锁名字
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl<T> core::fmt::Debug for SpinLock<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SpinLock")
            .field("name", &self.name)
            .field("locked", &self.is_locked())
            .finish()
    }
}
