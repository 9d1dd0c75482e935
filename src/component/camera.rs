//! Camera 组件
//!
//! 逐帧提供给渲染的相机状态：视图矩阵、位置、朝向和视口尺寸。
//! 相机的动画与输入处理不在本子系统范围内，调用者直接设置这些值。

use crate::math::{Matrix4, Vector3};

/// Camera 组件
///
/// 视图矩阵按需计算，因此所有读取接口都只需要 `&self`。
#[derive(Debug, Clone)]
pub struct Camera {
    /// 相机名称
    name: String,

    /// 世界空间位置
    position: Vector3,

    /// 相机坐标系：右向量
    right: Vector3,

    /// 相机坐标系：上向量
    up: Vector3,

    /// 相机坐标系：前向量（Look）
    look: Vector3,

    /// 视口宽度（像素）
    viewport_width: f32,

    /// 视口高度（像素）
    viewport_height: f32,
}

impl Camera {
    /// 创建新的 Camera，位于原点，朝向 +Z
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            position: Vector3::zeros(),
            right: Vector3::new(1.0, 0.0, 0.0),
            up: Vector3::new(0.0, 1.0, 0.0),
            look: Vector3::new(0.0, 0.0, 1.0),
            viewport_width: 800.0,
            viewport_height: 600.0,
        }
    }

    /// 创建主相机
    pub fn main_camera() -> Self {
        Self::new("MainCamera")
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    // ========== 位置与朝向 ==========

    /// 获取相机位置
    pub fn position(&self) -> Vector3 {
        self.position
    }

    /// 设置相机位置
    pub fn set_position(&mut self, position: Vector3) {
        self.position = position;
    }

    /// 获取相机朝向（归一化的前向量）
    pub fn direction(&self) -> Vector3 {
        self.look
    }

    pub fn right(&self) -> Vector3 {
        self.right
    }

    pub fn up(&self) -> Vector3 {
        self.up
    }

    /// 设置相机朝向目标点
    ///
    /// # 参数
    /// - `position`: 相机位置
    /// - `target`: 目标位置
    /// - `world_up`: 世界上向量（通常是 (0, 1, 0)）
    pub fn look_at(&mut self, position: Vector3, target: Vector3, world_up: Vector3) {
        let look = (target - position).normalize();
        let right = world_up.cross(&look).normalize();
        let up = look.cross(&right);

        self.position = position;
        self.look = look;
        self.right = right;
        self.up = up;
    }

    // ========== 视口 ==========

    /// 设置视口尺寸
    pub fn set_viewport(&mut self, width: f32, height: f32) {
        self.viewport_width = width;
        self.viewport_height = height;
    }

    /// 视口尺寸 (width, height)
    pub fn viewport(&self) -> (f32, f32) {
        (self.viewport_width, self.viewport_height)
    }

    // ========== 矩阵 ==========

    /// 计算视图矩阵（列向量约定，平移位于第 3 列）
    pub fn view_matrix(&self) -> Matrix4 {
        // 保持相机坐标轴正交归一化
        let look = self.look.normalize();
        let up = look.cross(&self.right).normalize();
        let right = up.cross(&look);

        let p = self.position;

        #[rustfmt::skip]
        let view = Matrix4::new(
            right.x, right.y, right.z, -p.dot(&right),
            up.x,    up.y,    up.z,    -p.dot(&up),
            look.x,  look.y,  look.z,  -p.dot(&look),
            0.0,     0.0,     0.0,     1.0,
        );
        view
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::main_camera()
    }
}
