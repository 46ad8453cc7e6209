//! 公共数据类型
//!
//! 块标识与缓存配置。

use crate::consts::{BSIZE, NBUCKETS, NBUF};
use crate::error::{Error, ErrorKind, Result};
use core::fmt;

/// 块标识：`(设备号, 块号)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockId {
    /// 设备号
    pub dev: u32,
    /// 块号
    pub blockno: u32,
}

impl BlockId {
    /// 创建块标识
    pub const fn new(dev: u32, blockno: u32) -> Self {
        Self { dev, blockno }
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.dev, self.blockno)
    }
}

/// 块缓存配置
///
/// 帧池大小在初始化时固定，之后不可变。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    /// 哈希桶数量
    pub bucket_count: usize,
    /// 帧数量
    pub frame_count: usize,
    /// 每帧数据大小（字节），必须等于设备块大小
    pub block_size: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            bucket_count: NBUCKETS,
            frame_count: NBUF,
            block_size: BSIZE,
        }
    }
}

impl CacheConfig {
    /// 以默认块大小创建配置
    pub const fn new(bucket_count: usize, frame_count: usize) -> Self {
        Self {
            bucket_count,
            frame_count,
            block_size: BSIZE,
        }
    }

    /// 设置块大小
    pub const fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size;
        self
    }

    /// 校验配置
    pub fn validate(&self) -> Result<()> {
        if self.bucket_count == 0 {
            return Err(Error::new(ErrorKind::InvalidInput, "bucket_count must be non-zero"));
        }
        if self.frame_count == 0 {
            return Err(Error::new(ErrorKind::InvalidInput, "frame_count must be non-zero"));
        }
        if self.block_size == 0 {
            return Err(Error::new(ErrorKind::InvalidInput, "block_size must be non-zero"));
        }
        Ok(())
    }
}
