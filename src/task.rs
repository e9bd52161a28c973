// 该文件是 Shanan （山南西风） 项目的一部分。
// src/task.rs - 批处理任务
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use std::time::Instant;

use image::RgbImage;
use tracing::{error, info, warn};

use crate::{
  frame::ImageFile, input::ImageFileInputError, model::Model, output::Render,
  pipeline::Annotation,
};

pub trait Task<I, M, O>: Sized {
  type Output;
  type Error;
  fn run_task(self, input: I, model: M, output: O) -> Result<Self::Output, Self::Error>;
}

/// 批处理统计
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchReport {
  /// 成功写出的图像数
  pub saved: usize,
  /// 无法读取或解码而跳过的文件数
  pub skipped: usize,
  /// 推理或保存失败的图像数
  pub failed: usize,
}

/// 逐张处理图像；单张图像的错误只记录日志，不中断整个批次
#[derive(Default, Debug)]
pub struct BatchTask;

impl<
  ME: std::error::Error + Sync + Send + 'static,
  RE: std::error::Error + Sync + Send + 'static,
  I: IntoIterator<Item = Result<ImageFile, ImageFileInputError>>,
  M: Model<Input = RgbImage, Output = Vec<Annotation>, Error = ME>,
  O: Render<ImageFile, [Annotation], Error = RE>,
> Task<I, M, O> for BatchTask
{
  type Output = BatchReport;
  type Error = anyhow::Error;

  fn run_task(self, input: I, model: M, output: O) -> Result<Self::Output, Self::Error> {
    info!("开始任务...");
    let mut report = BatchReport::default();

    for (index, item) in input.into_iter().enumerate() {
      let frame = match item {
        Ok(frame) => frame,
        Err(err) => {
          warn!("跳过文件 {}: {}", err.path().display(), err);
          report.skipped += 1;
          continue;
        }
      };

      let name = frame.display_name();
      info!(
        "处理第 {} 个文件 {} ({}x{})",
        index + 1,
        name,
        frame.width(),
        frame.height()
      );

      let now = Instant::now();
      let annotations = match model.infer(&frame.image) {
        Ok(annotations) => annotations,
        Err(err) => {
          error!("图像 {} 处理失败: {}", name, err);
          report.failed += 1;
          continue;
        }
      };
      info!(
        "推理完成，耗时: {:.2?}，共 {} 个标注",
        now.elapsed(),
        annotations.len()
      );

      if let Err(err) = output.render_result(&frame, &annotations) {
        error!("图像 {} 保存失败: {}", name, err);
        report.failed += 1;
        continue;
      }
      report.saved += 1;
    }

    info!(
      "任务完成: 保存 {} 张，跳过 {} 个，失败 {} 张",
      report.saved, report.skipped, report.failed
    );
    Ok(report)
  }
}

#[cfg(test)]
mod tests {
  use std::{cell::RefCell, path::PathBuf};

  use image::Rgb;

  use super::*;
  use crate::{bbox::BBox, model::{Detection, ModelError}};

  /// 宽度为 13 的图像推理失败，其余返回一个固定标注
  struct WidthKeyed;

  impl Model for WidthKeyed {
    type Input = RgbImage;
    type Output = Vec<Annotation>;
    type Error = ModelError;

    fn infer(&self, input: &RgbImage) -> Result<Vec<Annotation>, ModelError> {
      if input.width() == 13 {
        return Err(ModelError::inference("boom"));
      }
      Ok(vec![Annotation {
        person: BBox::new(0.0, 0.0, 4.0, 4.0),
        detection: Detection::new(1, "vest", 0.5, BBox::new(1.0, 1.0, 2.0, 2.0)),
      }])
    }
  }

  #[derive(Default)]
  struct Recorder {
    saved: RefCell<Vec<(String, usize)>>,
  }

  impl Render<ImageFile, [Annotation]> for &Recorder {
    type Error = ModelError;

    fn render_result(&self, frame: &ImageFile, result: &[Annotation]) -> Result<(), Self::Error> {
      if frame.display_name() == "readonly.png" {
        return Err(ModelError::inference("disk full"));
      }
      self
        .saved
        .borrow_mut()
        .push((frame.display_name(), result.len()));
      Ok(())
    }
  }

  fn frame(name: &str, width: u32) -> Result<ImageFile, ImageFileInputError> {
    Ok(ImageFile::new(
      PathBuf::from("/in").join(name),
      RgbImage::from_pixel(width, 8, Rgb([0, 0, 0])),
    ))
  }

  fn undecodable(name: &str) -> Result<ImageFile, ImageFileInputError> {
    let path = PathBuf::from("/in").join(name);
    Err(ImageFileInputError::IoError {
      path,
      source: std::io::Error::other("bad"),
    })
  }

  #[test]
  fn one_failure_does_not_stop_the_batch() {
    let recorder = Recorder::default();
    let input = vec![frame("a.png", 8), frame("b.png", 13), frame("c.png", 8)];

    let report = BatchTask.run_task(input, WidthKeyed, &recorder).unwrap();

    assert_eq!(
      report,
      BatchReport {
        saved: 2,
        skipped: 0,
        failed: 1
      }
    );
    assert_eq!(
      *recorder.saved.borrow(),
      vec![("a.png".to_string(), 1), ("c.png".to_string(), 1)]
    );
  }

  #[test]
  fn unreadable_files_are_skipped() {
    let recorder = Recorder::default();
    let input = vec![undecodable("x.png"), frame("a.png", 8)];

    let report = BatchTask.run_task(input, WidthKeyed, &recorder).unwrap();

    assert_eq!(report.skipped, 1);
    assert_eq!(report.saved, 1);
  }

  #[test]
  fn save_failure_counts_as_failed() {
    let recorder = Recorder::default();
    let input = vec![frame("readonly.png", 8), frame("a.png", 8)];

    let report = BatchTask.run_task(input, WidthKeyed, &recorder).unwrap();

    assert_eq!(report.failed, 1);
    assert_eq!(report.saved, 1);
  }

  #[test]
  fn empty_input_reports_nothing() {
    let recorder = Recorder::default();
    let input: Vec<Result<ImageFile, ImageFileInputError>> = Vec::new();
    let report = BatchTask.run_task(input, WidthKeyed, &recorder).unwrap();
    assert_eq!(report, BatchReport::default());
  }
}
