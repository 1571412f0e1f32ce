//! 齐次变换转换
//!
//! 硬件层以 16 元素列主序数组给出 4x4 齐次变换：
//!
//! ```text
//! | t[0]  t[4]  t[8]   t[12] |
//! | t[1]  t[5]  t[9]   t[13] |
//! | t[2]  t[6]  t[10]  t[14] |
//! | t[3]  t[7]  t[11]  t[15] |
//! ```
//!
//! 第 0-2 列为旋转轴，第 3 列为平移。输入来自硬件层，不做正交性校验。

use crate::TRANSFORM_LEN;
use nalgebra::{Isometry3, Matrix3, Rotation3, Translation3, UnitQuaternion};

/// 16 元素列主序数组 → 刚体变换
///
/// # 示例
///
/// ```rust
/// use armstate_protocol::{IDENTITY_TRANSFORM, convert_array_to_transform};
///
/// let mut t = IDENTITY_TRANSFORM;
/// t[14] = 0.1034;
/// let iso = convert_array_to_transform(&t);
/// assert_eq!(iso.translation.vector.z, 0.1034);
/// ```
pub fn convert_array_to_transform(t: &[f64; TRANSFORM_LEN]) -> Isometry3<f64> {
    let rotation = Matrix3::new(
        t[0], t[4], t[8], //
        t[1], t[5], t[9], //
        t[2], t[6], t[10],
    );
    let translation = Translation3::new(t[12], t[13], t[14]);
    let rotation = UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(rotation));
    Isometry3::from_parts(translation, rotation)
}

/// 刚体变换 → 16 元素列主序数组
pub fn transform_to_array(iso: &Isometry3<f64>) -> [f64; TRANSFORM_LEN] {
    let mut out = [0.0; TRANSFORM_LEN];
    // nalgebra 矩阵本身即列主序存储
    out.copy_from_slice(iso.to_homogeneous().as_slice());
    out
}
