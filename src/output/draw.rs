// 该文件是 Shanan （山南西风） 项目的一部分。
// src/output/draw.rs - 检测结果可视化
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

use ab_glyph::{FontArc, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;
use thiserror::Error;

use crate::pipeline::Annotation;

// 文本渲染常量
const LABEL_FONT_SIZE: f32 = 16.0;
const LABEL_MARGIN: i32 = 4;
const BOX_COLOR: [u8; 3] = [0, 255, 0]; // 绿色
const BOX_THICKNESS: u32 = 2;

#[derive(Error, Debug)]
pub enum DrawError {
  #[error("无法加载嵌入的字体文件: {0}")]
  FontError(#[from] ab_glyph::InvalidFont),
}

/// 在图像上绘制标注框与 `类别: 置信度` 标签
pub struct Draw {
  font: FontArc,
  font_scale: PxScale,
  color: Rgb<u8>,
}

impl Draw {
  pub fn new() -> Result<Self, DrawError> {
    let font_data: &'static [u8] = include_bytes!("../../assets/DejaVuSans.ttf");
    let font = FontArc::try_from_slice(font_data)?;

    Ok(Self {
      font,
      font_scale: PxScale::from(LABEL_FONT_SIZE),
      color: Rgb(BOX_COLOR),
    })
  }

  /// 在原图副本上绘制全部标注，原图不变
  pub fn render(&self, image: &RgbImage, annotations: &[Annotation]) -> RgbImage {
    let mut canvas = image.clone();
    for annotation in annotations {
      self.draw_annotation(&mut canvas, annotation);
    }
    canvas
  }

  fn draw_annotation(&self, image: &mut RgbImage, annotation: &Annotation) {
    let bbox = annotation.bbox();
    let x_min = bbox.x_min.floor() as i32;
    let y_min = bbox.y_min.floor() as i32;
    let x_max = bbox.x_max.ceil() as i32;
    let y_max = bbox.y_max.ceil() as i32;

    // 右下角包含在内
    let width = (x_max - x_min + 1).max(1) as u32;
    let height = (y_max - y_min + 1).max(1) as u32;

    for t in 0..BOX_THICKNESS {
      if width <= 2 * t || height <= 2 * t {
        break;
      }
      let rect = Rect::at(x_min + t as i32, y_min + t as i32).of_size(width - 2 * t, height - 2 * t);
      draw_hollow_rect_mut(image, rect, self.color);
    }

    let label = annotation.label_text();
    let (_, text_height) = text_size(self.font_scale, &self.font, &label);
    let (label_x, label_y) = label_origin(x_min, y_min, text_height as i32);

    draw_text_mut(
      image,
      self.color,
      label_x,
      label_y,
      self.font_scale,
      &self.font,
      &label,
    );
  }
}

/// 标签位于框上沿之上，且不会超出第 0 行 / 第 0 列
fn label_origin(x_min: i32, y_min: i32, text_height: i32) -> (i32, i32) {
  (x_min.max(0), (y_min - text_height - LABEL_MARGIN).max(0))
}
