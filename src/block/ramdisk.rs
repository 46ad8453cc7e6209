//! 内存块设备

use core::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use spin::Mutex;

use super::device::BlockDevice;
use crate::error::{Error, ErrorKind, Result};
use crate::types::BlockId;

/// 内存块设备
///
/// 按 `(设备号, 块号)` 存储块内容，首次读取未写过的块返回全零。
/// 记录物理读写次数，并支持注入读/写失败，便于验证缓存的 I/O 行为。
pub struct RamDisk {
    block_size: usize,
    /// 每个设备的块数
    nblocks: u32,
    blocks: Mutex<BTreeMap<BlockId, Box<[u8]>>>,
    reads: AtomicU64,
    writes: AtomicU64,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl RamDisk {
    /// 创建内存块设备
    ///
    /// # 参数
    ///
    /// * `block_size` - 块大小（字节）
    /// * `nblocks` - 每个设备的块数
    pub fn new(block_size: usize, nblocks: u32) -> Self {
        Self {
            block_size,
            nblocks,
            blocks: Mutex::new(BTreeMap::new()),
            reads: AtomicU64::new(0),
            writes: AtomicU64::new(0),
            fail_reads: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
        }
    }

    /// 物理读取次数
    pub fn reads(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }

    /// 物理写入次数
    pub fn writes(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    /// 打开/关闭读失败注入
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::Relaxed);
    }

    /// 打开/关闭写失败注入
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::Relaxed);
    }

    /// 直接读取设备上的块内容（绕过缓存）
    pub fn snapshot(&self, id: BlockId) -> Option<Box<[u8]>> {
        self.blocks.lock().get(&id).cloned()
    }

    fn check(&self, id: BlockId, len: usize) -> Result<()> {
        if id.blockno >= self.nblocks {
            log::error!("[RAMDISK] block {} out of range (nblocks={})", id, self.nblocks);
            return Err(Error::new(ErrorKind::Io, "block number out of range"));
        }
        if len != self.block_size {
            return Err(Error::new(ErrorKind::InvalidInput, "buffer length must equal block size"));
        }
        Ok(())
    }
}

impl BlockDevice for RamDisk {
    fn block_size(&self) -> usize {
        self.block_size
    }

    fn read_block(&self, id: BlockId, buf: &mut [u8]) -> Result<()> {
        self.check(id, buf.len())?;
        if self.fail_reads.load(Ordering::Relaxed) {
            log::error!("[RAMDISK] injected read failure on block {}", id);
            return Err(Error::new(ErrorKind::Io, "injected read failure"));
        }

        self.reads.fetch_add(1, Ordering::Relaxed);
        match self.blocks.lock().get(&id) {
            Some(data) => buf.copy_from_slice(data),
            None => buf.fill(0),
        }
        log::trace!("[RAMDISK] read block {}", id);
        Ok(())
    }

    fn write_block(&self, id: BlockId, buf: &[u8]) -> Result<()> {
        self.check(id, buf.len())?;
        if self.fail_writes.load(Ordering::Relaxed) {
            log::error!("[RAMDISK] injected write failure on block {}", id);
            return Err(Error::new(ErrorKind::Io, "injected write failure"));
        }

        self.writes.fetch_add(1, Ordering::Relaxed);
        self.blocks.lock().insert(id, Box::from(buf));
        log::trace!("[RAMDISK] write block {}", id);
        Ok(())
    }
}

impl core::fmt::Debug for RamDisk {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RamDisk")
            .field("block_size", &self.block_size)
            .field("nblocks", &self.nblocks)
            .field("reads", &self.reads())
            .field("writes", &self.writes())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unwritten_block_reads_zero() {
        let disk = RamDisk::new(16, 4);
        let mut buf = [0xffu8; 16];
        disk.read_block(BlockId::new(0, 2), &mut buf).unwrap();
        assert_eq!(buf, [0u8; 16]);
        assert!(disk.snapshot(BlockId::new(0, 2)).is_none());
    }

    #[test]
    fn test_devices_are_independent() {
        let disk = RamDisk::new(16, 4);
        disk.write_block(BlockId::new(1, 0), &[1u8; 16]).unwrap();
        disk.write_block(BlockId::new(2, 0), &[2u8; 16]).unwrap();

        assert_eq!(&*disk.snapshot(BlockId::new(1, 0)).unwrap(), &[1u8; 16]);
        assert_eq!(&*disk.snapshot(BlockId::new(2, 0)).unwrap(), &[2u8; 16]);
        assert_eq!(disk.writes(), 2);
    }

    #[test]
    fn test_out_of_range() {
        let disk = RamDisk::new(16, 4);
        let mut buf = [0u8; 16];
        let err = disk.read_block(BlockId::new(0, 4), &mut buf).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
        assert_eq!(disk.reads(), 0);
    }

    #[test]
    fn test_length_mismatch() {
        let disk = RamDisk::new(16, 4);
        let err = disk.write_block(BlockId::new(0, 0), &[0u8; 8]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_failure_injection() {
        let disk = RamDisk::new(16, 4);
        let mut buf = [0u8; 16];

        disk.set_fail_reads(true);
        assert!(disk.read_block(BlockId::new(0, 0), &mut buf).unwrap_err().is_io());
        disk.set_fail_reads(false);
        assert!(disk.read_block(BlockId::new(0, 0), &mut buf).is_ok());

        disk.set_fail_writes(true);
        assert!(disk.write_block(BlockId::new(0, 0), &buf).unwrap_err().is_io());
        assert_eq!(disk.writes(), 0);
    }
}
