//! 块设备抽象
//!
//! block/device.rs 定义缓存向下调用的磁盘传输接口 [`BlockDevice`]
//!
//! block/ramdisk.rs 提供一个内存块设备 [`RamDisk`]，用于测试和没有真实磁盘的环境

mod device;
mod ramdisk;

pub use device::{BlockDevice, Direction};
pub use ramdisk::RamDisk;
