//! 稳定选择
//!
//! 由种子文本确定性地挑选候选项，同一种子永远得到同一结果

/// 对种子的 UTF-16 code units 做位置相关的滚动哈希
///
/// 位置相关保证了反转后的种子会落到不同的候选项上
pub fn stable_hash(seed: &str) -> u32 {
    seed.encode_utf16()
        .fold(0u32, |hash, unit| hash.wrapping_mul(31).wrapping_add(unit as u32))
}

/// 按种子哈希从候选列表中选择一项
///
/// `items` 不可为空
pub fn stable_choice<'a, T>(seed: &str, items: &'a [T]) -> &'a T {
    debug_assert!(!items.is_empty(), "stable_choice on empty list");
    let index = stable_hash(seed) as usize % items.len();
    &items[index]
}
