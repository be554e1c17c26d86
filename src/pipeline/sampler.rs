// 该文件是 Toukui （头盔巡查） 项目的一部分。
// src/pipeline/sampler.rs - 抽帧
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

use std::num::NonZeroU64;

/// 按固定步长决定哪些帧送去检测。帧序号从 1 开始，序号为步长整数倍的帧被选中。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameSampler {
  stride: NonZeroU64,
}

impl FrameSampler {
  pub fn new(stride: NonZeroU64) -> Self {
    Self { stride }
  }

  pub fn stride(&self) -> u64 {
    self.stride.get()
  }

  pub fn should_sample(&self, frame_index: u64) -> bool {
    frame_index % self.stride.get() == 0
  }

  /// 前 `total_frames` 帧中会被选中的帧数
  pub fn sampled_count(&self, total_frames: u64) -> u64 {
    total_frames / self.stride.get()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn sampler(stride: u64) -> FrameSampler {
    FrameSampler::new(NonZeroU64::new(stride).unwrap())
  }

  #[test]
  fn samples_multiples_of_stride() {
    let sampled: Vec<u64> = (1..=10).filter(|&i| sampler(3).should_sample(i)).collect();
    assert_eq!(sampled, vec![3, 6, 9]);
  }

  #[test]
  fn stride_one_samples_every_frame() {
    assert!((1..=5).all(|i| sampler(1).should_sample(i)));
  }

  #[test]
  fn sampled_count_matches_predicate() {
    for stride in 1..=7 {
      let s = sampler(stride);
      for total in 0..40 {
        let counted = (1..=total).filter(|&i| s.should_sample(i)).count() as u64;
        assert_eq!(s.sampled_count(total), counted);
      }
    }
  }
}
