#![warn(missing_docs)] // <= 合适时移除它.

//! 核心库. 提供心脏冠脉 CT 扫描及其钙化标注的结构化信息和 Agatston 积分算法.
//!
//! 该 crate 目前仅提供 `safe` 接口. 将来可能为部分高性能场景关键路径提供 `unsafe` 接口.
//!
//! # 注意
//!
//! 1. 标注体数据的取值约定为 0 (背景), 1 (仅达阈值、未指派动脉),
//!    2..=5 (四条冠脉分支 LM / LAD / LCX / RCA), 6 (2..=5 的并集, 派生标签).
//! 2. 扫描与标注的几何 (体素个数与分辨率) 必须一致. 积分与统计入口会在处理任何切片前
//!    检查该前置条件, 不一致时返回 [`agatston::ScoreError::GeometryMismatch`].
//! 3. 在非期望情况下 (如索引越界), 程序会直接 panic, 而不会导致内存错误.
//!    As what Rust promises.
//!
//! # 功能总览
//!
//! ### 切片内钙化灶提取 ✅
//!
//! 以 4-邻接规则在单张水平切片上提取同标签连通区域.
//! 连通规则全库固定为 4-邻接, 不随能量模式或标签变化.
//!
//! 实现位于 `ct-agatston/src/data/slice`.
//!
//! ### 逐切片 Agatston 贡献计算 ✅
//!
//! 对每个钙化灶计算面积与峰值 HU, 再由能量模式相关的密度权重表
//! 得到 `面积 × 权重` 贡献. 结果按切片序组织, 每张切片恰好一个贡献列表.
//!
//! 实现位于 `ct-agatston/src/agatston/slicewise.rs`.
//!
//! ### 标签总分汇总 ✅
//!
//! 将逐切片贡献求和得到各标签总分; 标签 0 和 1 恒为 0 分;
//! 合计标签 6 定义为 2..=5 总分之和 (精确相等, 不做并集掩模重算).
//!
//! 实现位于 `ct-agatston/src/agatston/aggregate.rs`.
//!
//! ### 标签统计报表 ✅
//!
//! 对每个非空标签计算体素数、实际体积与 HU 的 min/max/mean/stddev,
//! 并合入预先算好的 Agatston 总分, 形成供展示/导出的报表行.
//!
//! 实现位于 `ct-agatston/src/report.rs`.

/// 二维索引, 同时也可一定程度上用作非负整数向量.
pub type Idx2d = (usize, usize);

/// 三维索引, 同时也可一定程度上用作非负整数向量.
pub type Idx3d = (usize, usize, usize);

type Area2d = Vec<Idx2d>;
type Areas2d = Vec<Area2d>;

/// 3D CT nii 文件基础数据结构.
mod data;

pub use data::{
    CtData3d, CtLabel, CtScan, LabelSlice, LabelSliceMut, NiftiHeaderAttr, OwnedLabelSlice,
    OwnedScanSlice, ScanSlice, ScanSliceMut,
};

pub mod consts;

pub mod agatston;

pub mod report;

pub mod prelude;
