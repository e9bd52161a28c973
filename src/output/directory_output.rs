// 该文件是 Shanan （山南西风） 项目的一部分。
// src/output/directory_output.rs - 标注图像目录输出
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

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

use crate::{
  frame::ImageFile,
  output::{
    Render,
    draw::{Draw, DrawError},
  },
  pipeline::Annotation,
};

#[derive(Error, Debug)]
pub enum DirectoryOutputError {
  #[error("无法创建输出目录 {}: {source}", path.display())]
  CreateDirError {
    path: PathBuf,
    source: std::io::Error,
  },
  #[error("绘制器初始化失败: {0}")]
  DrawError(#[from] DrawError),
  #[error("保存图像失败 {}: {source}", path.display())]
  ImageError {
    path: PathBuf,
    source: image::ImageError,
  },
}

/// 将标注后的图像以原文件名写入输出目录
pub struct DirectoryOutput {
  directory: PathBuf,
  draw: Draw,
}

impl DirectoryOutput {
  /// 打开输出目录，不存在时创建
  pub fn create(directory: impl AsRef<Path>) -> Result<Self, DirectoryOutputError> {
    let directory = directory.as_ref().to_path_buf();
    std::fs::create_dir_all(&directory).map_err(|source| DirectoryOutputError::CreateDirError {
      path: directory.clone(),
      source,
    })?;

    Ok(Self {
      directory,
      draw: Draw::new()?,
    })
  }

  pub fn directory(&self) -> &Path {
    &self.directory
  }

  pub fn output_path(&self, frame: &ImageFile) -> PathBuf {
    self.directory.join(&frame.name)
  }
}

impl Render<ImageFile, [Annotation]> for DirectoryOutput {
  type Error = DirectoryOutputError;

  fn render_result(&self, frame: &ImageFile, result: &[Annotation]) -> Result<(), Self::Error> {
    let path = self.output_path(frame);
    let image = self.draw.render(&frame.image, result);

    // 优先按读取时识别的格式保存，没有扩展名的文件也能写出
    let saved = match frame.format {
      Some(format) => image.save_with_format(&path, format),
      None => image.save(&path),
    };
    saved.map_err(|source| DirectoryOutputError::ImageError {
      path: path.clone(),
      source,
    })?;

    info!("保存图像到文件: {} ({} 个标注)", path.display(), result.len());

    Ok(())
  }
}
