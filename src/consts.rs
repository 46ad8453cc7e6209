//! 块缓存常量定义

/// 块大小（字节）
pub const BSIZE: usize = 1024;

/// 每次文件系统操作最多写入的块数
pub const MAXOPBLOCKS: usize = 10;

/// 缓存块（帧）数量
pub const NBUF: usize = MAXOPBLOCKS * 3;

/// 哈希桶数量（取素数以分散块号）
pub const NBUCKETS: usize = 13;

/// 初始化时容纳全部空闲帧的桶
pub const INITIAL_BUCKET: usize = 0;
