//! 批量积分入口: 读取一对 (扫描, 标注) nii 文件, 计算 Agatston
//! 总分与标签统计, 并以表格形式打印. 即导出层的命令行替身.

use std::env;
use std::process::exit;

use ct_agatston::prelude::*;

const SEP: &str = "--------------------------------------------------------";

fn usage() -> ! {
    eprintln!("usage: agatston-report <scan.nii[.gz]> <label.nii[.gz]> <80|120>");
    exit(2);
}

fn main() {
    simple_logger::init_with_level(log::Level::Info).expect("Logger init error");

    let args: Vec<String> = env::args().skip(1).collect();
    let [scan_path, label_path, kev] = args.as_slice() else {
        usage();
    };
    // 能量模式必须且只能显式二选一.
    let mode = match kev.as_str() {
        "80" => EnergyMode::Kev80,
        "120" => EnergyMode::Kev120,
        _ => usage(),
    };

    let data = CtData3d::open(scan_path, label_path).expect("Opening nii files error");
    log::info!(
        "shape: {:?}, pix_dim: {:?} mm, threshold: {} HU",
        data.scan.shape(),
        data.scan.pix_dim(),
        mode.hu_threshold()
    );

    let score = match score_volume(&data, mode) {
        Ok(score) => score,
        Err(ScoreError::GeometryMismatch { .. }) => {
            eprintln!("scan/label geometry mismatch, aborting");
            exit(1);
        }
    };
    let rows = compute_stats(&data, &score).expect("Geometry already validated");

    println!("{SEP}");
    println!(
        "{:>5} {:>6} {:>10} {:>8} {:>12} {:>10} {:>8} {:>8} {:>9} {:>9}",
        "Index", "Label", "Agatston", "Count", "Volume mm3", "Volume cc", "Min", "Max", "Mean",
        "StdDev"
    );
    println!("{SEP}");
    for row in &rows {
        println!(
            "{:>5} {:>6} {:>10.2} {:>8} {:>12.2} {:>10.4} {:>8.1} {:>8.1} {:>9.2} {:>9.2}",
            row.label,
            row.name,
            row.agatston,
            row.count,
            row.volume_mm3,
            row.volume_cc,
            row.min_hu,
            row.max_hu,
            row.mean_hu,
            row.stddev_hu
        );
    }
    println!("{SEP}");
}
