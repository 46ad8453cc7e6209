//! 块设备核心类型

use crate::error::Result;
use crate::types::BlockId;

/// 传输方向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// 设备 -> 内存
    Read,
    /// 内存 -> 设备
    Write,
}

/// 块设备接口
///
/// 缓存把它当作同步、阻塞的传输原语：调用返回时传输已经完成。
/// 重试策略由实现自行决定，缓存不做隐式重试，错误原样返回给调用者。
///
/// 多个上下文可能同时对不同的块发起传输，因此方法只接收 `&self`，
/// 实现需要自行处理内部同步。
///
/// # 示例
///
/// ```rust,ignore
/// use bcache_core::{BlockDevice, BlockId, Result};
///
/// struct VirtioDisk {
///     // ...
/// }
///
/// impl BlockDevice for VirtioDisk {
///     fn block_size(&self) -> usize {
///         1024
///     }
///
///     fn read_block(&self, id: BlockId, buf: &mut [u8]) -> Result<()> {
///         self.rw(id.blockno, buf.as_mut_ptr(), false)
///     }
///
///     fn write_block(&self, id: BlockId, buf: &[u8]) -> Result<()> {
///         self.rw(id.blockno, buf.as_ptr() as *mut u8, true)
///     }
/// }
/// ```
pub trait BlockDevice: Send + Sync {
    /// 块大小（字节）
    fn block_size(&self) -> usize;

    /// 读取一个块
    ///
    /// `buf` 长度等于 `block_size()`
    fn read_block(&self, id: BlockId, buf: &mut [u8]) -> Result<()>;

    /// 写入一个块
    ///
    /// `buf` 长度等于 `block_size()`
    fn write_block(&self, id: BlockId, buf: &[u8]) -> Result<()>;

    /// 按方向传输一个块
    fn transfer(&self, id: BlockId, buf: &mut [u8], direction: Direction) -> Result<()> {
        match direction {
            Direction::Read => self.read_block(id, buf),
            Direction::Write => self.write_block(id, buf),
        }
    }
}

impl<D: BlockDevice + ?Sized> BlockDevice for &D {
    fn block_size(&self) -> usize {
        (**self).block_size()
    }

    fn read_block(&self, id: BlockId, buf: &mut [u8]) -> Result<()> {
        (**self).read_block(id, buf)
    }

    fn write_block(&self, id: BlockId, buf: &[u8]) -> Result<()> {
        (**self).write_block(id, buf)
    }
}

impl<D: BlockDevice + ?Sized> BlockDevice for alloc::sync::Arc<D> {
    fn block_size(&self) -> usize {
        (**self).block_size()
    }

    fn read_block(&self, id: BlockId, buf: &mut [u8]) -> Result<()> {
        (**self).read_block(id, buf)
    }

    fn write_block(&self, id: BlockId, buf: &[u8]) -> Result<()> {
        (**self).write_block(id, buf)
    }
}
