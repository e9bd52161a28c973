// 该文件是 Shanan （山南西风） 项目的一部分。
// src/args.rs - 项目参数配置
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::path::PathBuf;

use clap::Parser;

/// 施工现场 PPE 两阶段检测：先检测人员，再在人员区域内检测防护装备
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 输入图像目录（仅处理顶层文件）
  #[arg(value_name = "INPUT_DIR")]
  pub input_dir: PathBuf,

  /// 标注图像输出目录，不存在时自动创建
  #[arg(value_name = "OUTPUT_DIR")]
  pub output_dir: PathBuf,

  /// 人员检测模型
  /// 支持格式:
  /// - 文件路径: models/person.onnx
  /// - URL: yolov8:///abs/person.onnx?conf=0.4&size=640
  #[arg(value_name = "PERSON_MODEL")]
  pub person_model: String,

  /// PPE 检测模型，格式同上
  /// 可通过 labels=<文件> 指定类别名称
  #[arg(value_name = "PPE_MODEL")]
  pub ppe_model: String,
}
