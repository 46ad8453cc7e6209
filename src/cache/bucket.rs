//! 哈希桶与按下标链接的 LRU 链表
//!
//! 所有帧和各桶的哨兵共用一张链接表 [`Links`]：下标 `[0, nframes)` 是帧，
//! `[nframes, nframes + nbuckets)` 是各桶的哨兵。帧在桶之间迁移时只改链接，
//! 不移动帧本身。
//!
//! 修改某个节点的链接需要持有它当前所在桶的锁，`&mut BucketList` 即是该凭证。
//! 哨兵的 `next` 指向最近使用的一端，`prev` 指向最久未使用的一端。

use core::sync::atomic::{AtomicUsize, Ordering};

use alloc::boxed::Box;

struct Link {
    prev: AtomicUsize,
    next: AtomicUsize,
}

/// 帧与哨兵的链接表
pub(crate) struct Links {
    nodes: Box<[Link]>,
    nframes: usize,
}

impl Links {
    pub(crate) fn new(nframes: usize, nbuckets: usize) -> Self {
        let nodes = (0..nframes + nbuckets)
            .map(|i| Link {
                prev: AtomicUsize::new(i),
                next: AtomicUsize::new(i),
            })
            .collect();
        Self { nodes, nframes }
    }

    /// 桶 `bucket` 的哨兵下标
    pub(crate) fn sentinel(&self, bucket: usize) -> usize {
        self.nframes + bucket
    }

    fn next(&self, i: usize) -> usize {
        self.nodes[i].next.load(Ordering::Relaxed)
    }

    fn prev(&self, i: usize) -> usize {
        self.nodes[i].prev.load(Ordering::Relaxed)
    }

    fn set_next(&self, i: usize, next: usize) {
        self.nodes[i].next.store(next, Ordering::Relaxed);
    }

    fn set_prev(&self, i: usize, prev: usize) {
        self.nodes[i].prev.store(prev, Ordering::Relaxed);
    }
}

/// 一个桶的链表，存放在该桶的自旋锁里
#[derive(Debug)]
pub(crate) struct BucketList {
    head: usize,
    len: usize,
}

impl BucketList {
    pub(crate) fn new(head: usize) -> Self {
        Self { head, len: 0 }
    }

    /// 链表中的帧数
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    /// 插入到最近使用端
    pub(crate) fn push_front(&mut self, links: &Links, index: usize) {
        let first = links.next(self.head);
        links.set_next(index, first);
        links.set_prev(index, self.head);
        links.set_prev(first, index);
        links.set_next(self.head, index);
        self.len += 1;
    }

    /// 从链表摘下 `index`，它必须属于本链表
    pub(crate) fn unlink(&mut self, links: &Links, index: usize) {
        let prev = links.prev(index);
        let next = links.next(index);
        links.set_next(prev, next);
        links.set_prev(next, prev);
        links.set_next(index, index);
        links.set_prev(index, index);
        self.len -= 1;
    }

    /// 移到最近使用端
    pub(crate) fn move_to_front(&mut self, links: &Links, index: usize) {
        if links.next(self.head) != index {
            self.unlink(links, index);
            self.push_front(links, index);
        }
    }

    /// 从最近使用端向最久未使用端遍历
    pub(crate) fn iter_mru<'a>(&self, links: &'a Links) -> Iter<'a> {
        Iter {
            links,
            head: self.head,
            cur: links.next(self.head),
            forward: true,
        }
    }

    /// 从最久未使用端向最近使用端遍历
    pub(crate) fn iter_lru<'a>(&self, links: &'a Links) -> Iter<'a> {
        Iter {
            links,
            head: self.head,
            cur: links.prev(self.head),
            forward: false,
        }
    }
}

/// 桶链表迭代器，产出帧下标
pub(crate) struct Iter<'a> {
    links: &'a Links,
    head: usize,
    cur: usize,
    forward: bool,
}

impl Iterator for Iter<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.cur == self.head {
            return None;
        }
        let index = self.cur;
        self.cur = if self.forward {
            self.links.next(index)
        } else {
            self.links.prev(index)
        };
        Some(index)
    }
}
