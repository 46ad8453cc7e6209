//! 检出句柄 - RAII 风格的缓存块访问
//!
//! [`Buf`] 代表一次检出：持有帧的内容锁和一次引用计数。丢弃（或调用
//! [`Buf::release`]）时先放开内容锁，再在桶锁下归还引用。

use super::block_cache::BufferCache;
use super::frame::{BlockData, Frame};
use crate::block::{BlockDevice, Direction};
use crate::error::Result;
use crate::sync::{Scheduler, SleepLockGuard};
use crate::types::BlockId;

/// 已检出的缓存块
///
/// 在持有期间，调用者独占帧内容；其他请求同一块的上下文会在内容锁上挂起。
///
/// # 示例
///
/// ```rust,ignore
/// // 读穿
/// let mut buf = cache.read(dev, 33)?;
/// let magic = buf.data()[0];
///
/// // 修改并写回
/// buf.data_mut()[0] = magic + 1;
/// buf.flush()?;
///
/// // 日志层：保证块在提交前不被淘汰
/// buf.pin();
/// buf.release();
/// ```
pub struct Buf<'a, D: BlockDevice, S: Scheduler> {
    // 字段顺序即释放顺序：先放开内容锁，再归还引用
    data: SleepLockGuard<'a, BlockData>,
    checkout: Checkout<'a, D, S>,
}

struct Checkout<'a, D: BlockDevice, S: Scheduler> {
    cache: &'a BufferCache<D, S>,
    index: usize,
    id: BlockId,
}

impl<D: BlockDevice, S: Scheduler> Drop for Checkout<'_, D, S> {
    fn drop(&mut self) {
        self.cache.brelse(self.index);
    }
}

impl<'a, D: BlockDevice, S: Scheduler> Buf<'a, D, S> {
    pub(super) fn new(
        cache: &'a BufferCache<D, S>,
        index: usize,
        id: BlockId,
        data: SleepLockGuard<'a, BlockData>,
    ) -> Self {
        Self {
            data,
            checkout: Checkout { cache, index, id },
        }
    }

    fn frame(&self) -> &'a Frame {
        self.checkout.cache.frame(self.checkout.index)
    }

    /// 块标识
    pub fn id(&self) -> BlockId {
        self.checkout.id
    }

    /// 设备号
    pub fn dev(&self) -> u32 {
        self.checkout.id.dev
    }

    /// 块号
    pub fn blockno(&self) -> u32 {
        self.checkout.id.blockno
    }

    /// 内容是否与磁盘块一致
    pub fn is_valid(&self) -> bool {
        self.frame().is_valid()
    }

    /// 块数据
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// 可变块数据
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// 内容无效时从设备读取；已有效时不做任何 I/O
    pub fn fill(&mut self) -> Result<()> {
        let frame = self.frame();
        if frame.is_valid() {
            return Ok(());
        }
        let cache = self.checkout.cache;
        cache.transfer(self.checkout.id, &mut self.data, Direction::Read)?;
        frame.set_valid();
        Ok(())
    }

    /// 无条件把内容写回设备
    ///
    /// 成功后内容与磁盘一致，帧标记为有效。
    ///
    /// # Panics
    ///
    /// 当前上下文不持有内容锁时 panic（调用者绕过了检出协议）。
    pub fn flush(&mut self) -> Result<()> {
        if !self.data.holding() {
            log::error!("[BCACHE] flush of block {} without content lock", self.checkout.id);
            panic!("bwrite: content lock not held");
        }
        let cache = self.checkout.cache;
        cache.transfer(self.checkout.id, &mut self.data, Direction::Write)?;
        self.frame().set_valid();
        Ok(())
    }

    /// 额外增加一次引用，使块在本次检出结束后仍不会被淘汰
    pub fn pin(&self) {
        self.checkout.cache.bpin(self.checkout.index);
    }

    /// 去掉一次 [`pin`](Self::pin) 增加的引用
    ///
    /// # Panics
    ///
    /// 没有与之对应的 pin 时 panic。
    pub fn unpin(&self) {
        self.checkout.cache.bunpin(self.checkout.index);
    }

    /// 结束检出
    ///
    /// 与直接丢弃句柄等价。
    pub fn release(self) {
        drop(self);
    }
}

impl<D: BlockDevice, S: Scheduler> Drop for Buf<'_, D, S> {
    fn drop(&mut self) {
        if !self.data.holding() {
            log::error!("[BCACHE] release of block {} without content lock", self.checkout.id);
            panic!("brelse: content lock not held");
        }
    }
}

impl<D: BlockDevice, S: Scheduler> core::fmt::Debug for Buf<'_, D, S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Buf")
            .field("id", &self.checkout.id)
            .field("frame", &self.checkout.index)
            .field("valid", &self.is_valid())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use crate::block::RamDisk;
    use crate::cache::BufferCache;
    use crate::sync::ThreadScheduler;
    use crate::types::{BlockId, CacheConfig};

    fn cache() -> BufferCache<RamDisk, ThreadScheduler> {
        let config = CacheConfig::new(2, 2).with_block_size(32);
        BufferCache::new(config, RamDisk::new(32, 16), ThreadScheduler::new()).unwrap()
    }

    #[test]
    fn test_accessors() {
        let cache = cache();
        let buf = cache.acquire(3, 11);
        assert_eq!(buf.dev(), 3);
        assert_eq!(buf.blockno(), 11);
        assert_eq!(buf.id(), BlockId::new(3, 11));
        assert_eq!(buf.data().len(), 32);
    }

    #[test]
    fn test_content_lock_held_during_checkout() {
        let cache = cache();
        let buf = cache.acquire(0, 1);
        let frame = buf.frame();
        assert!(frame.data.is_locked());
        assert_eq!(frame.refcnt(), 1);

        buf.release();
        assert!(!frame.data.is_locked());
        assert_eq!(frame.refcnt(), 0);
    }

    #[test]
    fn test_pin_counts() {
        let cache = cache();
        let buf = cache.acquire(0, 1);
        let frame = buf.frame();

        buf.pin();
        buf.pin();
        assert_eq!(frame.refcnt(), 3);
        buf.unpin();
        assert_eq!(frame.refcnt(), 2);
        buf.release();
        assert_eq!(frame.refcnt(), 1);
        assert!(!frame.data.is_locked());
    }

    #[test]
    fn test_write_without_flush_stays_in_cache() {
        let cache = cache();
        let mut buf = cache.read(0, 2).unwrap();
        buf.data_mut().fill(9);
        buf.release();

        assert!(cache.device().snapshot(BlockId::new(0, 2)).is_none());
        let buf = cache.read(0, 2).unwrap();
        assert_eq!(buf.data()[31], 9);
    }
}
