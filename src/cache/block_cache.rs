//! 分桶块缓存实现
//!
//! 固定大小的帧池按 `blockno % bucket_count` 分到若干桶中，每个桶一把自旋锁、
//! 一条 LRU 链表。查找只锁目标桶；未命中时先在目标桶内从最久未使用端找可淘汰帧，
//! 找不到再按循环顺序去其他桶"借"一帧并迁入目标桶。
//!
//! # 两级锁
//!
//! - 桶锁：保护链表结构与帧元数据（标识、引用计数），从不跨越 I/O 持有
//! - 内容锁：每帧一把睡眠锁，检出期间一直持有，可跨越磁盘 I/O
//!
//! # 锁顺序
//!
//! 借帧时需要同时持有目标桶和被扫描桶两把锁。桶锁只按下标递增顺序嵌套：
//! 被扫描桶下标更小时，先放开目标桶，按序重新获取两把锁，然后重新检查目标桶
//! （放锁期间其他上下文可能已装入同一块，或者目标桶出现了空闲帧）。
//!
//! # 近似 LRU
//!
//! 最近使用顺序只在桶内维护，没有全局顺序：淘汰优先发生在目标桶内，
//! 目标桶全部被占用时才溢出到相邻桶。

use alloc::boxed::Box;

use super::bucket::{BucketList, Links};
use super::buf::Buf;
use super::frame::Frame;
use super::stats::{CacheStats, StatCounters};
use crate::block::{BlockDevice, Direction};
use crate::consts::INITIAL_BUCKET;
use crate::error::{Error, ErrorKind, Result};
use crate::sync::{Scheduler, SpinLock};
use crate::types::{BlockId, CacheConfig};

/// 块缓存
///
/// 在启动阶段构造一次，之后以共享引用交给所有调用者。
///
/// # 示例
///
/// ```rust,ignore
/// let cache = BufferCache::new(CacheConfig::default(), disk, ThreadScheduler::new())?;
///
/// let mut buf = cache.read(ROOTDEV, 1)?;
/// buf.data_mut()[0] = 0x42;
/// buf.flush()?;
/// buf.release();
/// ```
pub struct BufferCache<D: BlockDevice, S: Scheduler> {
    config: CacheConfig,
    frames: Box<[Frame]>,
    links: Links,
    buckets: Box<[SpinLock<BucketList>]>,
    device: D,
    sched: S,
    stats: StatCounters,
}

impl<D: BlockDevice, S: Scheduler> BufferCache<D, S> {
    /// 创建块缓存
    ///
    /// 所有帧都放进同一个桶（桶 0），之后随着块被请求与淘汰逐步迁移到各自的桶。
    ///
    /// # 错误
    ///
    /// - 配置非法（桶数、帧数或块大小为 0）
    /// - 设备块大小与配置不一致
    pub fn new(config: CacheConfig, device: D, sched: S) -> Result<Self> {
        config.validate()?;
        if device.block_size() != config.block_size {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                "device block size does not match cache block size",
            ));
        }

        let links = Links::new(config.frame_count, config.bucket_count);
        let buckets: Box<[SpinLock<BucketList>]> = (0..config.bucket_count)
            .map(|b| SpinLock::new(BucketList::new(links.sentinel(b)), "bcache.bucket"))
            .collect();
        let frames: Box<[Frame]> = (0..config.frame_count)
            .map(|_| Frame::new(config.block_size))
            .collect();

        {
            let mut initial = buckets[INITIAL_BUCKET].lock();
            for index in 0..frames.len() {
                initial.push_front(&links, index);
            }
        }

        log::debug!(
            "[BCACHE] init: {} frames x {} bytes, {} buckets",
            config.frame_count,
            config.block_size,
            config.bucket_count
        );

        Ok(Self {
            config,
            frames,
            links,
            buckets,
            device,
            sched,
            stats: StatCounters::default(),
        })
    }

    /// 检出块，不读取磁盘
    ///
    /// 返回时帧已绑定到 `(dev, blockno)`，引用计数已加一，调用者持有内容锁。
    /// 内容可能尚未有效（见 [`Buf::is_valid`] / [`Buf::fill`]）。
    /// 内容锁被占用时挂起当前上下文。
    ///
    /// # Panics
    ///
    /// 所有帧都被引用、无帧可淘汰时 panic（容量规划错误，不可恢复）。
    pub fn acquire(&self, dev: u32, blockno: u32) -> Buf<'_, D, S> {
        let id = BlockId::new(dev, blockno);
        let index = self.bget(id);
        let data = self.frames[index].data.lock(&self.sched);
        Buf::new(self, index, id, data)
    }

    /// 检出块并保证内容有效（读穿）
    ///
    /// 设备读取失败时检出会被释放，错误原样返回。
    pub fn read(&self, dev: u32, blockno: u32) -> Result<Buf<'_, D, S>> {
        let mut buf = self.acquire(dev, blockno);
        buf.fill()?;
        Ok(buf)
    }

    /// 块是否已缓存（不增加引用，不改变最近使用顺序）
    pub fn contains(&self, dev: u32, blockno: u32) -> bool {
        let id = BlockId::new(dev, blockno);
        let list = self.buckets[self.bucket_of(blockno)].lock();
        list.iter_mru(&self.links).any(|i| self.frames[i].matches(id))
    }

    /// 块号对应的桶
    pub fn bucket_of(&self, blockno: u32) -> usize {
        blockno as usize % self.buckets.len()
    }

    /// 桶中当前链接的帧数
    pub fn bucket_len(&self, bucket: usize) -> usize {
        self.buckets[bucket].lock().len()
    }

    /// 缓存配置
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// 底层块设备
    pub fn device(&self) -> &D {
        &self.device
    }

    /// 获取缓存统计信息
    pub fn stats(&self) -> CacheStats {
        self.stats.snapshot()
    }

    /// 查找或分配帧，返回帧下标
    fn bget(&self, id: BlockId) -> usize {
        StatCounters::bump(&self.stats.total_accesses);

        let target = self.bucket_of(id.blockno);
        let mut home = self.buckets[target].lock();

        if let Some(index) = self.lookup(&mut home, id) {
            return index;
        }
        if let Some(index) = self.victim(&home) {
            home.move_to_front(&self.links, index);
            self.bind(index, id);
            return index;
        }

        let nbuckets = self.buckets.len();
        for step in 1..nbuckets {
            let bucket = (target + step) % nbuckets;
            let mut other = if bucket > target {
                self.buckets[bucket].lock()
            } else {
                drop(home);
                let other = self.buckets[bucket].lock();
                home = self.buckets[target].lock();

                if let Some(index) = self.lookup(&mut home, id) {
                    return index;
                }
                if let Some(index) = self.victim(&home) {
                    home.move_to_front(&self.links, index);
                    self.bind(index, id);
                    return index;
                }
                other
            };

            if let Some(index) = self.victim(&other) {
                other.unlink(&self.links, index);
                drop(other);
                home.push_front(&self.links, index);
                StatCounters::bump(&self.stats.steals);
                log::warn!("[BCACHE] steal frame {} from bucket {} into bucket {}", index, bucket, target);
                self.bind(index, id);
                return index;
            }
        }

        log::error!("[BCACHE] no evictable frame for block {}: all {} frames referenced", id, self.frames.len());
        panic!("bget: no buffers");
    }

    /// 在目标桶里查找已绑定到 `id` 的帧；找到则加引用并移到最近使用端
    fn lookup(&self, home: &mut BucketList, id: BlockId) -> Option<usize> {
        let index = home.iter_mru(&self.links).find(|&i| self.frames[i].matches(id))?;
        self.frames[index].get();
        home.move_to_front(&self.links, index);
        StatCounters::bump(&self.stats.hits);
        log::trace!("[BCACHE] block {} HIT frame {}", id, index);
        Some(index)
    }

    /// 从最久未使用端寻找引用计数为 0 的帧
    fn victim(&self, list: &BucketList) -> Option<usize> {
        list.iter_lru(&self.links).find(|&i| self.frames[i].is_free())
    }

    /// 把帧绑定到新标识，调用者持有帧所在（新）桶的锁
    fn bind(&self, index: usize, id: BlockId) {
        let frame = &self.frames[index];
        if frame.is_bound() {
            StatCounters::bump(&self.stats.evictions);
            log::debug!("[BCACHE] evict block {} from frame {}", frame.id(), index);
        }
        frame.rebind(id);
        StatCounters::bump(&self.stats.misses);
        log::debug!("[BCACHE] block {} MISS, bound to frame {}", id, index);
    }

    pub(super) fn frame(&self, index: usize) -> &Frame {
        &self.frames[index]
    }

    #[cfg(test)]
    pub(super) fn scheduler(&self) -> &S {
        &self.sched
    }

    /// 调用设备传输一个块
    pub(super) fn transfer(&self, id: BlockId, data: &mut [u8], direction: Direction) -> Result<()> {
        let counter = match direction {
            Direction::Read => &self.stats.reads,
            Direction::Write => &self.stats.writes,
        };
        StatCounters::bump(counter);
        self.device.transfer(id, data, direction).map_err(|e| {
            log::error!("[BCACHE] {:?} block {} failed: {}", direction, id, e);
            e
        })
    }

    /// 归还一次引用；计数归零时移到所在桶的最近使用端
    ///
    /// 调用前内容锁必须已经释放。
    pub(super) fn brelse(&self, index: usize) {
        let frame = &self.frames[index];
        let mut list = self.buckets[self.bucket_of(frame.blockno())].lock();
        match frame.put() {
            Some(0) => list.move_to_front(&self.links, index),
            Some(_) => {}
            None => {
                log::error!("[BCACHE] release of unreferenced frame {}", index);
                panic!("brelse: reference underflow");
            }
        }
    }

    pub(super) fn bpin(&self, index: usize) {
        let frame = &self.frames[index];
        let _list = self.buckets[self.bucket_of(frame.blockno())].lock();
        frame.pin();
    }

    /// 去掉一次 pin；引用计数里还包含检出者和等待内容锁的上下文，只能按 pin 计数判断
    pub(super) fn bunpin(&self, index: usize) {
        let frame = &self.frames[index];
        let _list = self.buckets[self.bucket_of(frame.blockno())].lock();
        if !frame.unpin() {
            log::error!("[BCACHE] unpin without matching pin on block {}", frame.id());
            panic!("bunpin: reference underflow");
        }
    }
}

impl<D: BlockDevice, S: Scheduler> core::fmt::Debug for BufferCache<D, S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BufferCache")
            .field("config", &self.config)
            .field("stats", &self.stats.snapshot())
            .finish()
    }
}
