//! Agatston 积分流程.
//!
//! 流程分为两级: [`score_label`] 对单个标签逐切片提取钙化灶并产生贡献列表;
//! [`aggregate`] 将各标签的贡献求和为总分表. [`score_volume`]
//! 将两级串联成一次 "Apply" 动作对应的完整批计算.

mod aggregate;
mod energy;
mod error;
mod slicewise;

pub use aggregate::{aggregate, score_volume, LabelScore};

pub use energy::EnergyMode;

pub use error::{ScoreError, ScoreResult};

pub use slicewise::{label_deposits, score_label, slice_deposits, Deposit};

cfg_if::cfg_if! {
    if #[cfg(feature = "rayon")] {
        pub use aggregate::par_score_volume;
        pub use slicewise::par_score_label;
    }
}
