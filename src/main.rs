// 该文件是 Shanan （山南西风） 项目的一部分。
// src/main.rs - 项目主程序
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

mod args;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use shanan_ppe::{
  input::ImageDirectoryInput,
  model::Yolov8Builder,
  output::DirectoryOutput,
  pipeline::TwoStagePipeline,
  task::{BatchTask, Task},
};

fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .init();

  let args = args::Args::parse();

  info!("输入目录: {}", args.input_dir.display());
  info!("输出目录: {}", args.output_dir.display());
  info!("人员检测模型: {}", args.person_model);
  info!("PPE 检测模型: {}", args.ppe_model);

  // 输出目录与模型在处理任何图像之前准备好，失败即退出
  let output = DirectoryOutput::create(&args.output_dir)?;

  info!("正在加载模型...");
  let person_model = Yolov8Builder::from_reference(&args.person_model)?
    .prefer_labels(["person"])
    .build()?;
  let ppe_model = Yolov8Builder::from_reference(&args.ppe_model)?.build()?;
  info!("模型加载完成");

  let input = ImageDirectoryInput::open(&args.input_dir)?;
  let pipeline = TwoStagePipeline::new(person_model, ppe_model);

  let report = BatchTask.run_task(input, &pipeline, output)?;
  info!(
    "处理完成: 保存 {} 张，跳过 {} 个，失败 {} 张",
    report.saved, report.skipped, report.failed
  );

  Ok(())
}
