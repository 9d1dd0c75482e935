//! CPU 侧源数据
//!
//! [`Blob`] 是调用者持有的一段字节（着色器字节码、缓冲区内容），
//! 只在创建调用期间有效。需要保留的字节必须由接收方自行复制。

/// 每个 BufferGroup 的顶点流数量
pub const VERTEX_STREAM_COUNT: usize = 3;

/// 不透明字节片段
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Blob<'a> {
    data: &'a [u8],
}

impl<'a> Blob<'a> {
    pub const fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    pub const fn empty() -> Self {
        Self { data: &[] }
    }

    pub const fn data(&self) -> &'a [u8] {
        self.data
    }

    pub const fn len(&self) -> usize {
        self.data.len()
    }

    pub const fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl<'a> From<&'a [u8]> for Blob<'a> {
    fn from(data: &'a [u8]) -> Self {
        Self::new(data)
    }
}

impl<'a> From<&'a Vec<u8>> for Blob<'a> {
    fn from(data: &'a Vec<u8>) -> Self {
        Self::new(data.as_slice())
    }
}

/// 一组共享几何数据：三个顶点流和一个索引流
#[derive(Debug, Clone, Copy, Default)]
pub struct BufferGroup<'a> {
    pub vertex_buffers: [Blob<'a>; VERTEX_STREAM_COUNT],
    pub index_buffer: Blob<'a>,
}

impl<'a> BufferGroup<'a> {
    pub fn new(vertex_buffers: [Blob<'a>; VERTEX_STREAM_COUNT], index_buffer: Blob<'a>) -> Self {
        Self {
            vertex_buffers,
            index_buffer,
        }
    }

    /// 所有顶点流的总字节数
    pub fn vertex_bytes(&self) -> usize {
        self.vertex_buffers.iter().map(Blob::len).sum()
    }
}
