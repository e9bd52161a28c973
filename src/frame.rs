// 该文件是 Shanan （山南西风） 项目的一部分。
// src/frame.rs - 图像帧定义
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

use std::ffi::OsString;
use std::path::PathBuf;

use image::{ImageFormat, RgbImage};

/// 从输入目录读取并解码的一张图像
#[derive(Debug, Clone)]
pub struct ImageFile {
  /// 文件名（不含目录），输出时沿用
  pub name: OsString,
  /// 源文件完整路径
  pub path: PathBuf,
  pub image: RgbImage,
  /// 读取时按内容识别出的格式，保存时沿用
  pub format: Option<ImageFormat>,
}

impl ImageFile {
  pub fn new(path: impl Into<PathBuf>, image: RgbImage) -> Self {
    let path = path.into();
    let name = path.file_name().map(OsString::from).unwrap_or_default();
    Self {
      name,
      path,
      image,
      format: None,
    }
  }

  pub fn with_format(mut self, format: Option<ImageFormat>) -> Self {
    self.format = format;
    self
  }

  pub fn width(&self) -> u32 {
    self.image.width()
  }

  pub fn height(&self) -> u32 {
    self.image.height()
  }

  /// 用于日志输出的文件名
  pub fn display_name(&self) -> String {
    self.name.to_string_lossy().into_owned()
  }
}
