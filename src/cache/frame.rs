//! 缓存帧
//!
//! 帧在初始化时一次性分配，永不销毁；淘汰时只是被重新绑定到新的块标识。

use core::sync::atomic::{AtomicU32, AtomicU8, Ordering};

use alloc::boxed::Box;
use alloc::vec;
use bitflags::bitflags;

use crate::sync::SleepLock;
use crate::types::BlockId;

bitflags! {
    /// 帧状态标志
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CacheFlags: u8 {
        /// 帧已绑定到某个块标识
        const BOUND = 0x01;
        /// 内容与磁盘块一致
        const VALID = 0x02;
    }
}

/// 帧内容：一个设备块大小的字节数组
pub type BlockData = Box<[u8]>;

/// 缓存帧
///
/// `dev`、`blockno`、`refcnt`、`pins` 以及 `BOUND` 标志只在持有帧当前所在桶的锁时修改；
/// `VALID` 由内容锁持有者设置。原子类型只是为了能通过 `&self` 共享，
/// 真正的先后关系由锁保证，因此一律使用 `Relaxed`。
pub(crate) struct Frame {
    dev: AtomicU32,
    blockno: AtomicU32,
    refcnt: AtomicU32,
    /// `refcnt` 中由 pin 贡献的部分
    pins: AtomicU32,
    flags: AtomicU8,
    /// 内容锁
    pub(crate) data: SleepLock<BlockData>,
}

impl Frame {
    pub(crate) fn new(block_size: usize) -> Self {
        Self {
            dev: AtomicU32::new(0),
            blockno: AtomicU32::new(0),
            refcnt: AtomicU32::new(0),
            pins: AtomicU32::new(0),
            flags: AtomicU8::new(0),
            data: SleepLock::new(vec![0u8; block_size].into_boxed_slice(), "buffer"),
        }
    }

    pub(crate) fn id(&self) -> BlockId {
        BlockId::new(
            self.dev.load(Ordering::Relaxed),
            self.blockno.load(Ordering::Relaxed),
        )
    }

    pub(crate) fn blockno(&self) -> u32 {
        self.blockno.load(Ordering::Relaxed)
    }

    pub(crate) fn flags(&self) -> CacheFlags {
        CacheFlags::from_bits_truncate(self.flags.load(Ordering::Relaxed))
    }

    pub(crate) fn is_bound(&self) -> bool {
        self.flags().contains(CacheFlags::BOUND)
    }

    /// 是否绑定到 `id`
    pub(crate) fn matches(&self, id: BlockId) -> bool {
        self.is_bound() && self.id() == id
    }

    pub(crate) fn is_valid(&self) -> bool {
        self.flags().contains(CacheFlags::VALID)
    }

    pub(crate) fn set_valid(&self) {
        self.flags.fetch_or(CacheFlags::VALID.bits(), Ordering::Relaxed);
    }

    pub(crate) fn refcnt(&self) -> u32 {
        self.refcnt.load(Ordering::Relaxed)
    }

    /// 引用计数为 0 的帧才可被淘汰
    pub(crate) fn is_free(&self) -> bool {
        self.refcnt() == 0
    }

    /// 增加引用计数，返回新值
    pub(crate) fn get(&self) -> u32 {
        self.refcnt.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// 减少引用计数，返回新值；已为 0 时返回 `None`
    pub(crate) fn put(&self) -> Option<u32> {
        let rc = self.refcnt();
        if rc == 0 {
            return None;
        }
        self.refcnt.store(rc - 1, Ordering::Relaxed);
        Some(rc - 1)
    }

    pub(crate) fn pins(&self) -> u32 {
        self.pins.load(Ordering::Relaxed)
    }

    /// 记录一次 pin，同时增加引用计数
    pub(crate) fn pin(&self) {
        self.pins.fetch_add(1, Ordering::Relaxed);
        self.get();
    }

    /// 撤销一次 pin；没有未撤销的 pin 时返回 `false` 且不做任何修改
    pub(crate) fn unpin(&self) -> bool {
        let pins = self.pins();
        if pins == 0 {
            return false;
        }
        self.pins.store(pins - 1, Ordering::Relaxed);
        self.put();
        true
    }

    /// 重新绑定到 `id`：内容失效，引用计数为 1（调用者自身的检出）
    pub(crate) fn rebind(&self, id: BlockId) {
        self.dev.store(id.dev, Ordering::Relaxed);
        self.blockno.store(id.blockno, Ordering::Relaxed);
        self.flags.store(CacheFlags::BOUND.bits(), Ordering::Relaxed);
        self.refcnt.store(1, Ordering::Relaxed);
        self.pins.store(0, Ordering::Relaxed);
    }
}

impl core::fmt::Debug for Frame {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Frame")
            .field("id", &self.id())
            .field("refcnt", &self.refcnt())
            .field("pins", &self.pins())
            .field("flags", &self.flags())
            .field("locked", &self.data.is_locked())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_creation() {
        let frame = Frame::new(512);
        assert_eq!(frame.refcnt(), 0);
        assert_eq!(frame.flags(), CacheFlags::empty());
        assert!(frame.is_free());
        assert!(!frame.is_bound());
        // 未绑定的帧不匹配任何标识，包括 (0, 0)
        assert!(!frame.matches(BlockId::new(0, 0)));
    }

    #[test]
    fn test_rebind() {
        let frame = Frame::new(512);
        frame.rebind(BlockId::new(1, 7));
        assert!(frame.matches(BlockId::new(1, 7)));
        assert!(!frame.matches(BlockId::new(2, 7)));
        assert_eq!(frame.blockno(), 7);
        assert_eq!(frame.refcnt(), 1);
        assert!(!frame.is_valid());

        frame.set_valid();
        assert!(frame.is_valid());
        assert_eq!(frame.flags(), CacheFlags::BOUND | CacheFlags::VALID);

        // 重新绑定清除 VALID
        assert_eq!(frame.put(), Some(0));
        frame.rebind(BlockId::new(1, 8));
        assert!(!frame.is_valid());
        assert!(frame.is_bound());
    }

    #[test]
    fn test_reference_counting() {
        let frame = Frame::new(512);
        assert_eq!(frame.put(), None);

        assert_eq!(frame.get(), 1);
        assert_eq!(frame.get(), 2);
        assert!(!frame.is_free());

        assert_eq!(frame.put(), Some(1));
        assert_eq!(frame.put(), Some(0));
        assert!(frame.is_free());
        assert_eq!(frame.put(), None);
    }

    #[test]
    fn test_pin_counter() {
        let frame = Frame::new(512);
        frame.rebind(BlockId::new(1, 3));

        // 没有 pin 时 unpin 不改动引用计数
        assert!(!frame.unpin());
        assert_eq!(frame.refcnt(), 1);

        frame.pin();
        frame.pin();
        assert_eq!(frame.pins(), 2);
        assert_eq!(frame.refcnt(), 3);

        assert!(frame.unpin());
        assert_eq!(frame.pins(), 1);
        assert_eq!(frame.refcnt(), 2);

        // 等待者贡献的引用不算作 pin
        frame.get();
        assert!(frame.unpin());
        assert!(!frame.unpin());
        assert_eq!(frame.refcnt(), 2);
    }
}
