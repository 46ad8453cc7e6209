//! 块缓存模块
//!
//! 固定大小的帧池，按块号分桶，桶内近似 LRU 淘汰，两级锁（桶自旋锁 + 帧睡眠锁）。
//!
//! # 主要组件
//!
//! - [`BufferCache`] - 块缓存管理器：查找、装入、跨桶淘汰
//! - [`Buf`] - 检出句柄：持有内容锁，提供读穿、写回、pin/unpin
//! - [`CacheFlags`] - 帧状态标志
//! - [`CacheStats`] - 缓存统计信息
//!
//! # 使用流程
//!
//! ```text
//! acquire/read ──► 桶锁下查找或装入帧 ──► 获取内容锁 ──► (无效时) 读设备
//!      │
//!      ▼
//!  读写 data / flush ──► release: 放开内容锁 ──► 桶锁下减引用, 归零则移到最近使用端
//! ```
//!
//! # 错误分类
//!
//! - 设备 I/O 失败：作为 [`Error`](crate::Error) 返回给 `read`/`fill`/`flush` 的调用者
//! - 无帧可淘汰、无内容锁写回/释放、unpin 下溢：直接 panic，属于调用者的逻辑错误
//!
//! # 内存分配要求
//!
//! 本模块依赖 `alloc` crate，帧池在构造时一次性分配。

mod block_cache;
mod bucket;
mod buf;
mod frame;
mod stats;

pub use block_cache::BufferCache;
pub use buf::Buf;
pub use frame::{BlockData, CacheFlags};
pub use stats::CacheStats;
