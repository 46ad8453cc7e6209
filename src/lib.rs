//! bcache_core: 分桶块缓存
//!
//! 教学内核的块缓存层，位于文件系统与磁盘驱动之间：
//! - **固定帧池**：初始化时一次性分配，帧只会被重新绑定，从不释放
//! - **分桶加锁**：按块号哈希到各桶，互不相关的查找不互相阻塞
//! - **近似 LRU**：桶内维护最近使用顺序，目标桶无空闲帧时才跨桶借帧
//! - **两级锁**：短持有的桶自旋锁 + 可跨越 I/O 的帧睡眠锁
//!
//! # 示例
//!
//! ```rust,ignore
//! use bcache_core::{BufferCache, CacheConfig, RamDisk, ThreadScheduler, Result};
//!
//! fn main() -> Result<()> {
//!     let disk = RamDisk::new(1024, 2000);
//!     let cache = BufferCache::new(CacheConfig::default(), disk, ThreadScheduler::new())?;
//!
//!     // 读穿
//!     let mut buf = cache.read(1, 33)?;
//!     buf.data_mut()[0] = 0x42;
//!
//!     // 写回并结束检出
//!     buf.flush()?;
//!     buf.release();
//!
//!     Ok(())
//! }
//! ```
//!
//! # 模块结构
//!
//! - [`error`] - 错误类型定义
//! - [`consts`] - 常量定义
//! - [`types`] - 块标识与缓存配置
//! - [`sync`] - 自旋锁、睡眠锁与调度器接口
//! - [`block`] - 块设备抽象
//! - [`cache`] - 块缓存

#![cfg_attr(not(any(feature = "std", test)), no_std)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]

extern crate alloc;

// ===== 核心模块 =====

/// 错误处理
pub mod error;

/// 常量定义
pub mod consts;

/// 数据结构定义
pub mod types;

/// 同步原语
pub mod sync;

/// 块设备抽象
pub mod block;

/// 块缓存
pub mod cache;

// ===== 公共导出 =====

// 错误处理
pub use error::{Error, ErrorKind, Result};

// 类型
pub use types::{BlockId, CacheConfig};

// 同步
pub use sync::{ContextId, Scheduler, SleepLock, SpinLock};
#[cfg(feature = "std")]
pub use sync::ThreadScheduler;

// 块设备
pub use block::{BlockDevice, Direction, RamDisk};

// Cache
pub use cache::{BlockData, Buf, BufferCache, CacheFlags, CacheStats};
