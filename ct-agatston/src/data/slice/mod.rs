//! CT scan/label 切片对象的操作.

mod core;
mod iter;

pub use core::{
    LabelSlice, LabelSliceMut, OwnedLabelSlice, OwnedScanSlice, ScanSlice, ScanSliceMut,
};
