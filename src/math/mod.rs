//! 数学库模块
//!
//! 基于 `nalgebra` 的类型别名，以及着色器常量布局需要的矩阵打包辅助函数。

pub use nalgebra::{Matrix4 as Mat4, Vector3 as Vec3, Vector4 as Vec4};

// 类型别名，使用更简洁的名称
pub type Vector3 = Vec3<f32>;
pub type Vector4 = Vec4<f32>;
pub type Matrix4 = Mat4<f32>;

/// 浮点数比较的 epsilon
pub const EPSILON: f32 = 1e-6;

/// 近似相等比较
pub fn approx_eq(a: f32, b: f32, epsilon: f32) -> bool {
    (a - b).abs() < epsilon
}

/// 将列向量约定的矩阵转换为行向量约定（DirectXMath 风格）的行数组
///
/// 结果的第 `i` 行即原矩阵的第 `i` 列，平移位于第 3 行。
pub fn to_row_vector_rows(matrix: &Matrix4) -> [[f32; 4]; 4] {
    let mut rows = [[0.0; 4]; 4];
    for (i, row) in rows.iter_mut().enumerate() {
        for (j, value) in row.iter_mut().enumerate() {
            *value = matrix[(j, i)];
        }
    }
    rows
}

/// 扩展为 w = 1 的位置向量
pub fn point4(v: &Vector3) -> [f32; 4] {
    [v.x, v.y, v.z, 1.0]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_vector_rows_places_translation_in_last_row() {
        #[rustfmt::skip]
        let m = Matrix4::new(
            1.0, 0.0, 0.0, 5.0,
            0.0, 1.0, 0.0, 6.0,
            0.0, 0.0, 1.0, 7.0,
            0.0, 0.0, 0.0, 1.0,
        );
        let rows = to_row_vector_rows(&m);
        assert_eq!(rows[3], [5.0, 6.0, 7.0, 1.0]);
        assert_eq!(rows[0], [1.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_approx_eq() {
        assert!(approx_eq(1.0, 1.0 + 1e-7, EPSILON));
        assert!(!approx_eq(1.0, 1.1, EPSILON));
    }
}
