//! 🫀 涵盖了本 crate 一系列常用的功能.

pub use crate::{Idx2d, Idx3d};

pub use crate::data::{
    CtData3d, CtLabel, CtScan, LabelSlice, LabelSliceMut, NiftiHeaderAttr, OwnedLabelSlice,
    OwnedScanSlice, ScanSlice, ScanSliceMut,
};

pub use crate::consts::label::{
    CORONARY_ALL, CORONARY_BACKGROUND, CORONARY_DEFAULT, CORONARY_LAD, CORONARY_LCX, CORONARY_LM,
    CORONARY_RCA, TERRITORIES,
};

pub use crate::agatston::{
    aggregate, score_label, score_volume, Deposit, EnergyMode, LabelScore, ScoreError, ScoreResult,
};

#[cfg(feature = "rayon")]
pub use crate::agatston::{par_score_label, par_score_volume};

pub use crate::report::{compute_stats, LabelStatRow};
