//! 模拟寄存器文件
//!
//! 以 32 位字为单位模拟一段 MMIO 寄存器窗口，并对写入进行插桩：
//!
//! - 每次写入都有一个“写窗口”，两个写窗口重叠即记为一次冲突；
//! - 写窗口内寄存器会短暂呈现半写入的值，读者可能观察到撕裂的位模式；
//! - 记录所有已提交的写入，以及映射解除的时刻。

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::vec::Vec;

/// 上电后寄存器的初始值（未知状态的标记）
pub const POWER_ON_VALUE: u32 = 0xDEAD_BEEF;

/// 模拟寄存器文件
pub struct MockRegisterFile {
    words: Vec<AtomicU32>,
    writing: AtomicBool,
    overlaps: AtomicUsize,
    log: Mutex<Vec<(usize, u32)>>,
    mapped: AtomicBool,
    writes_at_unmap: AtomicUsize,
    access_after_unmap: AtomicUsize,
}

impl MockRegisterFile {
    /// 创建 `len` 字节的寄存器窗口，所有字初始化为 [`POWER_ON_VALUE`]
    pub fn new(len: usize) -> Self {
        Self {
            words: (0..len.div_ceil(4))
                .map(|_| AtomicU32::new(POWER_ON_VALUE))
                .collect(),
            writing: AtomicBool::new(false),
            overlaps: AtomicUsize::new(0),
            log: Mutex::new(Vec::new()),
            mapped: AtomicBool::new(false),
            writes_at_unmap: AtomicUsize::new(0),
            access_after_unmap: AtomicUsize::new(0),
        }
    }

    /// 窗口长度（字节）
    pub fn len(&self) -> usize {
        self.words.len() * 4
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    fn word(&self, offset: usize) -> &AtomicU32 {
        assert!(offset % 4 == 0, "unaligned register access at {:#x}", offset);
        &self.words[offset / 4]
    }

    /// 读取一个 32 位寄存器
    pub fn read32(&self, offset: usize) -> u32 {
        if !self.mapped.load(Ordering::Acquire) {
            self.access_after_unmap.fetch_add(1, Ordering::SeqCst);
        }
        self.word(offset).load(Ordering::SeqCst)
    }

    /// 写入一个 32 位寄存器
    ///
    /// 写入分两步提交（先低半字，再完整值），期间若有其它写入进入即记为冲突。
    pub fn write32(&self, value: u32, offset: usize) {
        if !self.mapped.load(Ordering::Acquire) {
            self.access_after_unmap.fetch_add(1, Ordering::SeqCst);
        }
        if self.writing.swap(true, Ordering::AcqRel) {
            self.overlaps.fetch_add(1, Ordering::SeqCst);
        }

        let word = self.word(offset);
        let old = word.load(Ordering::SeqCst);
        word.store((old & 0xFFFF_0000) | (value & 0xFFFF), Ordering::SeqCst);
        for _ in 0..16 {
            core::hint::spin_loop();
        }
        word.store(value, Ordering::SeqCst);
        self.log.lock().unwrap().push((offset, value));

        self.writing.store(false, Ordering::Release);
    }

    /// 标记窗口已映射
    pub fn map(&self) {
        self.mapped.store(true, Ordering::Release);
    }

    /// 标记窗口已解除映射，并记录此刻已提交的写入数
    pub fn unmap(&self) {
        let n = self.log.lock().unwrap().len();
        self.writes_at_unmap.store(n, Ordering::SeqCst);
        self.mapped.store(false, Ordering::Release);
    }

    /// 窗口当前是否处于映射状态
    pub fn is_mapped(&self) -> bool {
        self.mapped.load(Ordering::Acquire)
    }

    /// 已提交写入的快照，按提交顺序排列
    pub fn writes(&self) -> Vec<(usize, u32)> {
        self.log.lock().unwrap().clone()
    }

    /// 指定偏移处最后一次提交的写入
    pub fn last_write_to(&self, offset: usize) -> Option<u32> {
        self.log
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(off, _)| *off == offset)
            .map(|(_, v)| *v)
    }

    /// 解除映射前指定偏移处最后一次提交的写入
    pub fn last_write_before_unmap(&self, offset: usize) -> Option<u32> {
        let n = self.writes_at_unmap.load(Ordering::SeqCst);
        self.log.lock().unwrap()[..n]
            .iter()
            .rev()
            .find(|(off, _)| *off == offset)
            .map(|(_, v)| *v)
    }

    /// 是否从未被写入过
    pub fn is_untouched(&self) -> bool {
        self.log.lock().unwrap().is_empty()
    }

    /// 写窗口重叠的次数
    pub fn overlapping_writes(&self) -> usize {
        self.overlaps.load(Ordering::SeqCst)
    }

    /// 解除映射后仍发生的访问次数
    pub fn access_after_unmap(&self) -> usize {
        self.access_after_unmap.load(Ordering::SeqCst)
    }
}
