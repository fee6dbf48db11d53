//! 运行时错误.

use crate::Idx3d;

/// 积分或统计流程的运行时错误.
#[derive(Debug, Clone, PartialEq)]
pub enum ScoreError {
    /// 扫描与标注的几何 (形状或体素分辨率) 不一致.
    ///
    /// 这是整个流程的致命前置错误, 在处理任何切片之前产生;
    /// 不存在部分结果模式.
    GeometryMismatch {
        /// 扫描形状 (z, h, w).
        scan_shape: Idx3d,

        /// 标注形状 (z, h, w).
        label_shape: Idx3d,

        /// 扫描体素分辨率 \[z, h, w\], 毫米.
        scan_pix_dim: [f64; 3],

        /// 标注体素分辨率 \[z, h, w\], 毫米.
        label_pix_dim: [f64; 3],
    },
}

/// 积分 / 统计流程的结果别名.
pub type ScoreResult<T> = Result<T, ScoreError>;
